// DCPU-16 Assembler Module
// Two-pass assembler: source text -> AST -> little-endian word image

pub mod ast;
pub mod codegen;
pub mod error;
pub mod expr;
pub mod image;
pub mod lexer;
pub mod parser;
pub mod preprocess;
pub mod resolve;

#[cfg(test)]
mod expr_tests;
#[cfg(test)]
mod preprocess_tests;

use crate::config::AssemblerConfig;
use crate::vm::Word;
use indexmap::IndexMap;
use log::{debug, info};
use std::path::Path;

pub use ast::Program;
pub use codegen::AssemblyContext;
pub use error::{AssemblerError, SourceLocation, Warning};
pub use image::BinaryImage;
pub use preprocess::{FileReader, FsFileReader, SourceMap, DEFAULT_FILE_NAME};

/// Everything produced by a successful assembly
#[derive(Debug, Clone)]
pub struct AssemblyOutput {
    pub image: BinaryImage,
    pub warnings: Vec<Warning>,
    pub address_to_line: IndexMap<Word, SourceLocation>,
    pub line_to_address: IndexMap<SourceLocation, Word>,
    /// Referenceable labels in definition order
    pub labels: IndexMap<String, Word>,
    pub entry_address: Word,
    pub base_address: Word,
}

impl AssemblyOutput {
    /// The image as little-endian bytes
    pub fn bytes(&self) -> Vec<u8> {
        self.image.to_bytes()
    }

    pub fn words(&self) -> &[Word] {
        self.image.words()
    }

    pub fn label(&self, name: &str) -> Option<Word> {
        self.labels.get(name).copied()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Assembler {
    base_address: Word,
}

impl Assembler {
    pub fn new() -> Self {
        Assembler { base_address: 0 }
    }

    pub fn with_base_address(base_address: Word) -> Self {
        Assembler { base_address }
    }

    pub fn from_config(config: &AssemblerConfig) -> Self {
        Assembler::with_base_address(config.base_address)
    }

    pub fn base_address(&self) -> Word {
        self.base_address
    }

    /// Assemble an already parsed program. Nothing is returned unless both
    /// passes succeed.
    pub fn assemble(&self, program: &Program) -> Result<AssemblyOutput, AssemblerError> {
        let mut context = AssemblyContext::new(self.base_address);
        context.emit_program(program)?;
        context.resolve_references()?;

        let labels = context
            .labels
            .iter()
            .filter(|(_, label)| !label.reserved)
            .map(|(name, label)| (name.clone(), label.address))
            .collect();

        info!(
            "assembled {} words, {} labels, {} warnings",
            context.words.len(),
            context.labels.len(),
            context.warnings.len()
        );

        Ok(AssemblyOutput {
            image: BinaryImage::from_words(context.words),
            warnings: context.warnings,
            address_to_line: context.address_to_line,
            line_to_address: context.line_to_address,
            labels,
            entry_address: context.entry_address.unwrap_or(self.base_address),
            base_address: self.base_address,
        })
    }

    /// Preprocess, parse and assemble `text` read from `root_name`.
    /// Includes are resolved against `base_dir` through `reader`.
    pub fn assemble_text(
        &self,
        root_name: &str,
        text: &str,
        base_dir: &Path,
        reader: &dyn FileReader,
    ) -> Result<AssemblyOutput, AssemblerError> {
        let source = preprocess::preprocess(root_name, text, base_dir, reader)?;
        let program = parser::parse(&source.text, &source.map)?;
        debug!("parsed {} statements", program.statements.len());

        let mut output = self.assemble(&program)?;
        let mut warnings = source.warnings;
        warnings.append(&mut output.warnings);
        output.warnings = warnings;
        Ok(output)
    }

    /// Assemble source that is not backed by a file; includes are relative
    /// to the working directory
    pub fn assemble_str(&self, text: &str) -> Result<AssemblyOutput, AssemblerError> {
        self.assemble_text(DEFAULT_FILE_NAME, text, Path::new(""), &FsFileReader)
    }

    /// Assemble a source file; includes are relative to its directory
    pub fn assemble_file(
        &self,
        path: &Path,
        reader: &dyn FileReader,
    ) -> Result<AssemblyOutput, AssemblerError> {
        let name = path.display().to_string();
        let text = reader.read(path).map_err(|e| {
            AssemblerError::Resource(
                format!("Cannot read \"{}\": {}", name, e),
                SourceLocation::new(name.clone(), 0),
            )
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        self.assemble_text(&name, &text, base_dir, reader)
    }
}

/// Assemble a parsed program at `base_address`
pub fn assemble(program: &Program, base_address: Word) -> Result<AssemblyOutput, AssemblerError> {
    Assembler::with_base_address(base_address).assemble(program)
}

/// Assemble a source file from disk at address 0
pub fn assemble_source<P: AsRef<Path>>(path: P) -> Result<AssemblyOutput, AssemblerError> {
    Assembler::new().assemble_file(path.as_ref(), &FsFileReader)
}
