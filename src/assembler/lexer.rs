// DCPU-16 Assembly Lexer
// Tokenizes preprocessed source into a line-oriented token stream

use crate::assembler::error::AssemblerError;
use crate::assembler::preprocess::SourceMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// 1-based line of the expanded text
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Number(i64),
    Str(String),
    Identifier(String),

    // Punctuation
    Colon,        // :
    Comma,        // ,
    Dot,          // .
    Hash,         // #
    LeftBracket,  // [
    RightBracket, // ]
    LeftParen,    // (
    RightParen,   // )

    // Operators
    Plus,       // +
    Minus,      // -
    Star,       // *
    Slash,      // /
    Percent,    // %
    Ampersand,  // &
    Pipe,       // |
    Caret,      // ^
    Tilde,      // ~
    ShiftLeft,  // <<
    ShiftRight, // >>

    Newline,
    EOF,
}

pub struct Lexer<'a> {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    current_char: Option<char>,
    map: &'a SourceMap,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &str, map: &'a SourceMap) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let current_char = chars.first().copied();

        Lexer {
            input: chars,
            position: 0,
            line: 1,
            column: 1,
            current_char,
            map,
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, AssemblerError> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::EOF;
            tokens.push(token);
            if done {
                break;
            }
        }

        Ok(tokens)
    }

    fn error(&self, message: String) -> AssemblerError {
        AssemblerError::Syntax(message, self.map.location(self.line))
    }

    fn next_token(&mut self) -> Result<Token, AssemblerError> {
        self.skip_whitespace();

        let start_line = self.line;
        let start_column = self.column;

        let kind = match self.current_char {
            None => TokenKind::EOF,
            Some(ch) => match ch {
                ';' => {
                    self.skip_line_comment();
                    return self.next_token();
                }
                '\n' => {
                    self.advance();
                    TokenKind::Newline
                }
                ':' => self.single(TokenKind::Colon),
                ',' => self.single(TokenKind::Comma),
                '.' => self.single(TokenKind::Dot),
                '#' => self.single(TokenKind::Hash),
                '[' => self.single(TokenKind::LeftBracket),
                ']' => self.single(TokenKind::RightBracket),
                '(' => self.single(TokenKind::LeftParen),
                ')' => self.single(TokenKind::RightParen),
                '+' => self.single(TokenKind::Plus),
                '-' => self.single(TokenKind::Minus),
                '*' => self.single(TokenKind::Star),
                '/' => self.single(TokenKind::Slash),
                '%' => self.single(TokenKind::Percent),
                '&' => self.single(TokenKind::Ampersand),
                '|' => self.single(TokenKind::Pipe),
                '^' => self.single(TokenKind::Caret),
                '~' => self.single(TokenKind::Tilde),
                '<' | '>' => {
                    self.advance();
                    if self.current_char != Some(ch) {
                        return Err(self.error(format!("Unexpected character '{}'", ch)));
                    }
                    self.advance();
                    if ch == '<' {
                        TokenKind::ShiftLeft
                    } else {
                        TokenKind::ShiftRight
                    }
                }
                '"' => {
                    self.advance();
                    TokenKind::Str(self.read_string()?)
                }
                ch if ch.is_ascii_digit() => TokenKind::Number(self.read_number()?),
                ch if ch.is_alphabetic() || ch == '_' => TokenKind::Identifier(self.read_identifier()),
                ch => return Err(self.error(format!("Unexpected character '{}'", ch))),
            },
        };

        Ok(Token {
            kind,
            line: start_line,
            column: start_column,
        })
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    fn advance(&mut self) {
        if let Some('\n') = self.current_char {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        self.position += 1;
        self.current_char = self.input.get(self.position).copied();
    }

    fn peek_next(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char {
            if ch.is_whitespace() && ch != '\n' {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.current_char {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn read_string(&mut self) -> Result<String, AssemblerError> {
        let mut value = String::new();

        while let Some(ch) = self.current_char {
            match ch {
                '"' => {
                    self.advance();
                    return Ok(value);
                }
                '\n' => break,
                '\\' => {
                    self.advance();
                    let escaped = match self.current_char {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('0') => '\0',
                        Some('\\') => '\\',
                        Some('"') => '"',
                        Some('\n') | None => break,
                        Some(other) => other,
                    };
                    value.push(escaped);
                    self.advance();
                }
                ch => {
                    value.push(ch);
                    self.advance();
                }
            }
        }

        Err(self.error("Unterminated string".to_string()))
    }

    fn read_number(&mut self) -> Result<i64, AssemblerError> {
        let radix = if self.current_char == Some('0') && matches!(self.peek_next(), Some('x' | 'X')) {
            self.advance();
            self.advance();
            16
        } else {
            10
        };

        let mut digits = String::new();
        while let Some(ch) = self.current_char {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                digits.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if digits.is_empty() {
            return Err(self.error("Missing digits after '0x'".to_string()));
        }

        let value = u32::from_str_radix(&digits, radix)
            .map_err(|_| self.error(format!("Invalid number '{}'", digits)))?;
        Ok(i64::from(value))
    }

    fn read_identifier(&mut self) -> String {
        let mut identifier = String::new();

        while let Some(ch) = self.current_char {
            if ch.is_alphanumeric() || ch == '_' || ch == '.' {
                identifier.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        identifier
    }
}

/// Tokenize text that did not go through include expansion
pub fn tokenize(input: &str, map: &SourceMap) -> Result<Vec<Token>, AssemblerError> {
    Lexer::new(input, map).tokenize()
}
