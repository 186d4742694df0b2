//! Include expansion.
//!
//! `.include "path"` and `#include "path"` lines are replaced by the contents
//! of the named file, recursively. Paths are taken relative to the directory
//! of the root file. A file included a second time is replaced by an empty
//! line and reported as a warning. Every line of the expanded text keeps its
//! original (file, line) in a [`SourceMap`].

use crate::assembler::error::{AssemblerError, SourceLocation, Warning};
use log::{debug, warn};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Name used for source that did not come from a file
pub const DEFAULT_FILE_NAME: &str = "default";

/// Source of include file contents
pub trait FileReader {
    fn read(&self, path: &Path) -> io::Result<String>;
}

/// Reads include files from the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsFileReader;

impl FileReader for FsFileReader {
    fn read(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }
}

/// Maps 1-based lines of expanded text back to their origin
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMap {
    lines: Vec<SourceLocation>,
}

impl SourceMap {
    /// Identity map for text that needs no expansion
    pub fn for_text(file: &str, text: &str) -> Self {
        let count = text.split('\n').count();
        SourceMap {
            lines: (1..=count).map(|line| SourceLocation::new(file, line)).collect(),
        }
    }

    pub fn push(&mut self, location: SourceLocation) {
        self.lines.push(location);
    }

    /// Origin of expanded line `line`. Lines past the end map to the last
    /// known file so end-of-input errors still point somewhere useful.
    pub fn location(&self, line: usize) -> SourceLocation {
        match self.lines.get(line.saturating_sub(1)) {
            Some(location) => location.clone(),
            None => match self.lines.last() {
                Some(last) => SourceLocation::new(last.file.clone(), last.line + 1),
                None => SourceLocation::new(DEFAULT_FILE_NAME, line),
            },
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Result of include expansion
#[derive(Debug, Clone)]
pub struct PreprocessedSource {
    pub text: String,
    pub map: SourceMap,
    pub warnings: Vec<Warning>,
}

pub struct Preprocessor<'a> {
    reader: &'a dyn FileReader,
    base_dir: PathBuf,
    seen: HashSet<String>,
    lines: Vec<String>,
    map: SourceMap,
    warnings: Vec<Warning>,
}

impl<'a> Preprocessor<'a> {
    pub fn new(reader: &'a dyn FileReader, base_dir: &Path) -> Self {
        Preprocessor {
            reader,
            base_dir: base_dir.to_path_buf(),
            seen: HashSet::new(),
            lines: Vec::new(),
            map: SourceMap::default(),
            warnings: Vec::new(),
        }
    }

    /// Expand `text`, which was read from `root_name`
    pub fn run(mut self, root_name: &str, text: &str) -> Result<PreprocessedSource, AssemblerError> {
        self.seen.insert(root_name.to_string());
        self.expand(root_name, text)?;
        debug!(
            "preprocessed {} into {} lines ({} files)",
            root_name,
            self.lines.len(),
            self.seen.len()
        );
        Ok(PreprocessedSource {
            text: self.lines.join("\n"),
            map: self.map,
            warnings: self.warnings,
        })
    }

    fn expand(&mut self, file: &str, text: &str) -> Result<(), AssemblerError> {
        for (index, raw) in text.split('\n').enumerate() {
            let raw = raw.strip_suffix('\r').unwrap_or(raw);
            let location = SourceLocation::new(file, index + 1);

            let argument = match include_argument(raw) {
                Some(argument) => argument,
                None => {
                    self.lines.push(raw.to_string());
                    self.map.push(location);
                    continue;
                }
            };

            let name = match quoted_path(argument) {
                Some(name) => name,
                None => {
                    return Err(AssemblerError::Directive(
                        "Not implemented: includes with parameters other than \"<filename>\"."
                            .to_string(),
                        location,
                    ))
                }
            };

            let path = self.base_dir.join(name);
            let key = path.display().to_string();
            if self.seen.contains(&key) {
                let warning = Warning::new(
                    format!("Ignoring \"{}\" because it was included more than once.", key),
                    &location,
                );
                warn!("{}", warning);
                self.warnings.push(warning);
                self.lines.push(String::new());
                self.map.push(location);
                continue;
            }

            let contents = self.reader.read(&path).map_err(|e| {
                AssemblerError::Resource(format!("Cannot include \"{}\": {}", key, e), location.clone())
            })?;
            debug!("including {} from {}", key, location);
            self.seen.insert(key.clone());
            self.expand(&key, &contents)?;
        }
        Ok(())
    }
}

/// The text after `.include` / `#include`, if `line` is an include line
fn include_argument(line: &str) -> Option<&str> {
    let code = line.split(';').next().unwrap_or("").trim();
    let rest = code.strip_prefix('.').or_else(|| code.strip_prefix('#'))?;
    let keyword = rest.get(..7)?;
    if !keyword.eq_ignore_ascii_case("include") {
        return None;
    }
    let argument = &rest[7..];
    if !argument.is_empty() && !argument.starts_with(char::is_whitespace) && !argument.starts_with('"') {
        // `.includes`, `.include_foo`, ... are other directives
        return None;
    }
    Some(argument.trim())
}

fn quoted_path(argument: &str) -> Option<&str> {
    argument
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .filter(|name| !name.is_empty())
}

/// Expand includes in `text` read from `root_name`, resolving paths against `base_dir`
pub fn preprocess(
    root_name: &str,
    text: &str,
    base_dir: &Path,
    reader: &dyn FileReader,
) -> Result<PreprocessedSource, AssemblerError> {
    Preprocessor::new(reader, base_dir).run(root_name, text)
}
