// Assembler Error Handling

use std::fmt;

/// Where a line of source came from after include expansion
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub file: String,
    /// 1-based line number within `file`
    pub line: usize,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: usize) -> Self {
        SourceLocation {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Fatal assembly failure. No image is produced once one of these is raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblerError {
    // Malformed source text
    Syntax(String, SourceLocation),

    // Bad operand count, unknown mnemonic or register, illegal PUSH/POP
    // position, malformed expression shape
    Structural(String, SourceLocation),

    // Label never defined
    Resolution(String, SourceLocation),

    // Include file missing or unreadable
    Resource(String, SourceLocation),

    // Directive recognised but not supported
    Directive(String, SourceLocation),
}

impl AssemblerError {
    pub fn message(&self) -> &str {
        match self {
            AssemblerError::Syntax(msg, _)
            | AssemblerError::Structural(msg, _)
            | AssemblerError::Resolution(msg, _)
            | AssemblerError::Resource(msg, _)
            | AssemblerError::Directive(msg, _) => msg,
        }
    }

    pub fn location(&self) -> &SourceLocation {
        match self {
            AssemblerError::Syntax(_, loc)
            | AssemblerError::Structural(_, loc)
            | AssemblerError::Resolution(_, loc)
            | AssemblerError::Resource(_, loc)
            | AssemblerError::Directive(_, loc) => loc,
        }
    }

    pub fn file(&self) -> &str {
        &self.location().file
    }

    pub fn line(&self) -> usize {
        self.location().line
    }
}

impl fmt::Display for AssemblerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AssemblerError::Syntax(msg, loc) => {
                write!(f, "{}: syntax error: {}", loc, msg)
            }
            AssemblerError::Structural(msg, loc) => {
                write!(f, "{}: error: {}", loc, msg)
            }
            AssemblerError::Resolution(msg, loc) => {
                write!(f, "{}: unresolved reference: {}", loc, msg)
            }
            AssemblerError::Resource(msg, loc) => {
                write!(f, "{}: cannot read input: {}", loc, msg)
            }
            AssemblerError::Directive(msg, loc) => {
                write!(f, "{}: unsupported directive: {}", loc, msg)
            }
        }
    }
}

impl std::error::Error for AssemblerError {}

/// Non-fatal diagnostic returned alongside a successful image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub message: String,
    pub file: String,
    pub line: usize,
}

impl Warning {
    pub fn new(message: impl Into<String>, location: &SourceLocation) -> Self {
        Warning {
            message: message.into(),
            file: location.file.clone(),
            line: location.line,
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}: warning: {}", self.file, self.line, self.message)
    }
}
