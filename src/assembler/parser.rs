// DCPU-16 Assembly Recursive Descent Parser

use crate::assembler::ast::*;
use crate::assembler::error::{AssemblerError, SourceLocation};
use crate::assembler::lexer::{Token, TokenKind};
use crate::assembler::preprocess::SourceMap;
use crate::opcode_tables;

/// Directives that may be written without a leading `.` or `#`
const BARE_DIRECTIVES: &[&str] = &["dat", "dw", "org"];

pub struct Parser<'a> {
    tokens: Vec<Token>,
    current: usize,
    map: &'a SourceMap,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Token>, map: &'a SourceMap) -> Self {
        Parser {
            tokens,
            current: 0,
            map,
        }
    }

    pub fn parse(&mut self) -> Result<Program, AssemblerError> {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            if self.check(&TokenKind::Newline) {
                self.advance();
                continue;
            }

            self.parse_line(&mut statements)?;
        }

        Ok(Program { statements })
    }

    /// label* (instruction | directive)? NEWLINE
    fn parse_line(&mut self, statements: &mut Vec<Statement>) -> Result<(), AssemblerError> {
        while let Some(label) = self.parse_label()? {
            statements.push(label);
        }

        if !self.at_line_end() {
            statements.push(self.parse_statement()?);
        }

        if !self.at_line_end() {
            let token = self.peek().clone();
            return Err(self.error_at(
                &token,
                format!("Unexpected {} at end of statement", describe(&token.kind)),
            ));
        }

        if self.check(&TokenKind::Newline) {
            self.advance();
        }
        Ok(())
    }

    fn parse_label(&mut self) -> Result<Option<Statement>, AssemblerError> {
        let token = self.peek().clone();
        let location = self.location(&token);

        // :name
        if token.kind == TokenKind::Colon {
            self.advance();
            let name = self.consume_identifier("Expected label name after ':'")?;
            return Ok(Some(label(name, location)));
        }

        let name = match &token.kind {
            TokenKind::Identifier(name) => name.clone(),
            _ => return Ok(None),
        };

        // name:
        if self.peek_kind(1) == Some(&TokenKind::Colon) {
            self.advance();
            self.advance();
            return Ok(Some(label(name, location)));
        }

        if opcode_tables::lookup_mnemonic(&name).is_some() || is_bare_directive(&name) {
            return Ok(None);
        }

        // bare label: alone on the line or followed by a statement
        let bare = match self.peek_kind(1) {
            None | Some(TokenKind::Newline) | Some(TokenKind::EOF) => true,
            Some(TokenKind::Dot) | Some(TokenKind::Hash) => true,
            Some(TokenKind::Identifier(next)) => {
                opcode_tables::lookup_mnemonic(next).is_some() || is_bare_directive(next)
            }
            Some(_) => false,
        };
        if bare {
            self.advance();
            return Ok(Some(label(name, location)));
        }

        Ok(None)
    }

    fn parse_statement(&mut self) -> Result<Statement, AssemblerError> {
        let token = self.peek().clone();
        let location = self.location(&token);

        match &token.kind {
            TokenKind::Dot | TokenKind::Hash => {
                self.advance();
                let name = self.consume_identifier("Expected directive name")?;
                let arguments = self.parse_arguments()?;
                Ok(Statement {
                    kind: StatementKind::Directive { name, arguments },
                    location,
                })
            }
            TokenKind::Identifier(name) if is_bare_directive(name) => {
                let name = name.clone();
                self.advance();
                let arguments = self.parse_arguments()?;
                Ok(Statement {
                    kind: StatementKind::Directive { name, arguments },
                    location,
                })
            }
            TokenKind::Identifier(name) => {
                let mnemonic = name.clone();
                self.advance();
                let operands = self.parse_operands()?;
                Ok(Statement {
                    kind: StatementKind::Instruction { mnemonic, operands },
                    location,
                })
            }
            other => Err(self.error_at(
                &token,
                format!("Expected instruction or directive, found {}", describe(other)),
            )),
        }
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expr>, AssemblerError> {
        let mut arguments = Vec::new();
        if self.at_line_end() {
            return Ok(arguments);
        }

        loop {
            arguments.push(self.parse_expression()?);
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        Ok(arguments)
    }

    fn parse_operands(&mut self) -> Result<Vec<Operand>, AssemblerError> {
        let mut operands = Vec::new();
        if self.at_line_end() {
            return Ok(operands);
        }

        loop {
            operands.push(self.parse_operand()?);
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        Ok(operands)
    }

    fn parse_operand(&mut self) -> Result<Operand, AssemblerError> {
        if self.match_token(&TokenKind::LeftBracket) {
            let expr = self.parse_expression()?;
            self.consume(TokenKind::RightBracket, "Expected ']' after dereference")?;
            return Ok(Operand::Indirect(expr));
        }

        if let TokenKind::Identifier(name) = &self.peek().kind {
            if name.eq_ignore_ascii_case("pick") {
                self.advance();
                return Ok(Operand::Pick(self.parse_expression()?));
            }
        }

        Ok(Operand::Direct(self.parse_expression()?))
    }

    // Expression grammar, lowest precedence first:
    // | < ^ < & < shifts < + - < * / % < unary < primary

    fn parse_expression(&mut self) -> Result<Expr, AssemblerError> {
        self.parse_bitwise_or()
    }

    fn parse_bitwise_or(&mut self) -> Result<Expr, AssemblerError> {
        let mut expr = self.parse_bitwise_xor()?;
        while self.match_token(&TokenKind::Pipe) {
            let right = self.parse_bitwise_xor()?;
            expr = Expr::binary(BinaryOp::Or, expr, right);
        }
        Ok(expr)
    }

    fn parse_bitwise_xor(&mut self) -> Result<Expr, AssemblerError> {
        let mut expr = self.parse_bitwise_and()?;
        while self.match_token(&TokenKind::Caret) {
            let right = self.parse_bitwise_and()?;
            expr = Expr::binary(BinaryOp::Xor, expr, right);
        }
        Ok(expr)
    }

    fn parse_bitwise_and(&mut self) -> Result<Expr, AssemblerError> {
        let mut expr = self.parse_shift()?;
        while self.match_token(&TokenKind::Ampersand) {
            let right = self.parse_shift()?;
            expr = Expr::binary(BinaryOp::And, expr, right);
        }
        Ok(expr)
    }

    fn parse_shift(&mut self) -> Result<Expr, AssemblerError> {
        let mut expr = self.parse_term()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::ShiftLeft => BinaryOp::Shl,
                TokenKind::ShiftRight => BinaryOp::Shr,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            expr = Expr::binary(op, expr, right);
        }
        Ok(expr)
    }

    fn parse_term(&mut self) -> Result<Expr, AssemblerError> {
        let mut expr = self.parse_factor()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_factor()?;
            expr = Expr::binary(op, expr, right);
        }
        Ok(expr)
    }

    fn parse_factor(&mut self) -> Result<Expr, AssemblerError> {
        let mut expr = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            expr = Expr::binary(op, expr, right);
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expr, AssemblerError> {
        let op = match self.peek().kind {
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Minus,
            TokenKind::Tilde => UnaryOp::Not,
            _ => return self.parse_primary(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        Ok(Expr::unary(op, operand))
    }

    fn parse_primary(&mut self) -> Result<Expr, AssemblerError> {
        let token = self.peek().clone();
        let location = self.location(&token);
        match token.kind {
            TokenKind::Number(value) => {
                self.advance();
                Ok(Expr::Number(value))
            }
            TokenKind::Str(value) => {
                self.advance();
                Ok(Expr::Str(value))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                match RegisterName::from_name(&name) {
                    Some(register) => Ok(Expr::Register(register)),
                    None => Ok(Expr::Identifier(name)),
                }
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.consume(TokenKind::RightParen, "Expected ')' after expression")?;
                Ok(expr)
            }
            other => Err(AssemblerError::Syntax(
                format!("Expected a value, found {}", describe(&other)),
                location,
            )),
        }
    }

    // Helper methods

    fn location(&self, token: &Token) -> SourceLocation {
        self.map.location(token.line)
    }

    fn error_at(&self, token: &Token, message: String) -> AssemblerError {
        AssemblerError::Syntax(message, self.location(token))
    }

    fn at_line_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Newline | TokenKind::EOF)
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::EOF
    }

    fn peek(&self) -> &Token {
        // the lexer always terminates the stream with EOF
        &self.tokens[self.current.min(self.tokens.len().saturating_sub(1))]
    }

    fn peek_kind(&self, ahead: usize) -> Option<&TokenKind> {
        self.tokens.get(self.current + ahead).map(|t| &t.kind)
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        &self.tokens[self.current - 1]
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> Result<(), AssemblerError> {
        if self.check(&kind) {
            self.advance();
            Ok(())
        } else {
            let token = self.peek().clone();
            Err(self.error_at(
                &token,
                format!("{}, found {}", message, describe(&token.kind)),
            ))
        }
    }

    fn consume_identifier(&mut self, message: &str) -> Result<String, AssemblerError> {
        let token = self.peek().clone();
        if let TokenKind::Identifier(name) = token.kind {
            self.advance();
            Ok(name)
        } else {
            Err(self.error_at(
                &token,
                format!("{}, found {}", message, describe(&token.kind)),
            ))
        }
    }
}

fn label(name: String, location: SourceLocation) -> Statement {
    Statement {
        kind: StatementKind::Label(name),
        location,
    }
}

fn is_bare_directive(name: &str) -> bool {
    BARE_DIRECTIVES
        .iter()
        .any(|directive| directive.eq_ignore_ascii_case(name))
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Number(value) => format!("number {}", value),
        TokenKind::Str(value) => format!("string \"{}\"", value),
        TokenKind::Identifier(name) => format!("'{}'", name),
        TokenKind::Newline => "end of line".to_string(),
        TokenKind::EOF => "end of input".to_string(),
        other => format!("{:?}", other),
    }
}

/// Parse expanded source text into a program
pub fn parse(text: &str, map: &SourceMap) -> Result<Program, AssemblerError> {
    let tokens = crate::assembler::lexer::tokenize(text, map)?;
    Parser::new(tokens, map).parse()
}
