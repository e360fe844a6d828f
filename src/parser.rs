use std::{
    fs,
    io::{self, BufRead},
    mem,
    path::Path,
};

use crate::{
    ast::{BinaryOp, BlockStatement, Expression, Identifier, Program, Statement, UnaryOp},
    diagnostics::{AmaryllisError, Diagnostic, DiagnosticKind, SourcePosition},
    lexer::{Keyword, Lexer, Token, TokenKind},
};

/// Binding strength of infix operators, lowest first. The fold loop in
/// `parse_expression` keeps consuming operators while the peeked one binds
/// tighter than the caller's threshold, which is what makes `*` bind over
/// `+` and call/index bind tightest of all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest,
    Equals,
    LessGreater,
    Sum,
    Product,
    Prefix,
    Call,
    Index,
}

fn precedence_of(kind: &TokenKind) -> Precedence {
    match kind {
        TokenKind::Equals | TokenKind::NotEquals => Precedence::Equals,
        TokenKind::LessThan | TokenKind::GreaterThan => Precedence::LessGreater,
        TokenKind::Plus | TokenKind::Minus => Precedence::Sum,
        TokenKind::Slash | TokenKind::Asterisk => Precedence::Product,
        TokenKind::LParen | TokenKind::Dot => Precedence::Call,
        TokenKind::LBracket => Precedence::Index,
        _ => Precedence::Lowest,
    }
}

/// Parses a whole source file through the line-fed lexer: the first line is
/// read eagerly, the rest are pulled on demand.
pub fn parse_file(path: &Path) -> Result<Program, AmaryllisError> {
    let file = fs::File::open(path)?;
    let mut lines = io::BufReader::new(file).lines();
    let first_line = match lines.next() {
        Some(line) => line?,
        None => String::new(),
    };
    let lexer = Lexer::with_line_source(first_line, move || lines.next().and_then(io::Result::ok));
    let mut parser = Parser::new(lexer);
    let program = parser.parse_program();
    if parser.errors().is_empty() {
        Ok(program)
    } else {
        Err(AmaryllisError::Parse(parser.errors().to_vec()))
    }
}

/// Precedence-climbing parser over a two-token window. Syntax errors
/// accumulate instead of aborting: a statement that cannot be completed is
/// dropped and parsing resumes at the next token.
pub struct Parser {
    lexer: Lexer,
    current: Token,
    peek: Token,
    errors: Vec<Diagnostic>,
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> Self {
        let current = lexer.next_token();
        let peek = lexer.next_token();
        Self {
            lexer,
            current,
            peek,
            errors: Vec::new(),
        }
    }

    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    fn next_token(&mut self) {
        self.current = mem::replace(&mut self.peek, self.lexer.next_token());
    }

    pub fn parse_program(&mut self) -> Program {
        let mut statements = Vec::new();
        while self.current.kind != TokenKind::Eof {
            if let Some(statement) = self.parse_statement() {
                statements.push(statement);
            }
            self.next_token();
        }
        Program { statements }
    }

    // Statements

    fn parse_statement(&mut self) -> Option<Statement> {
        match &self.current.kind {
            TokenKind::Keyword(Keyword::Let) => self.parse_let_statement(),
            TokenKind::Keyword(Keyword::Return) => self.parse_return_statement(),
            TokenKind::Keyword(Keyword::Import) => self.parse_import_statement(),
            TokenKind::Keyword(Keyword::Export) => self.parse_export_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_let_statement(&mut self) -> Option<Statement> {
        if !self.expect_peek(TokenKind::Identifier) {
            return None;
        }
        let name = Identifier {
            name: self.current.literal.clone(),
        };
        if !self.expect_peek(TokenKind::Assign) {
            return None;
        }
        self.next_token();
        let value = self.parse_expression(Precedence::Lowest)?;
        self.skip_semicolons();
        Some(Statement::Let { name, value })
    }

    fn parse_return_statement(&mut self) -> Option<Statement> {
        self.next_token();
        let value = self.parse_expression(Precedence::Lowest)?;
        self.skip_semicolons();
        Some(Statement::Return { value })
    }

    fn parse_import_statement(&mut self) -> Option<Statement> {
        if !self.expect_peek(TokenKind::String) {
            return None;
        }
        let path = self.current.literal.clone();
        if !self.expect_peek(TokenKind::Identifier) {
            return None;
        }
        let binding = Identifier {
            name: self.current.literal.clone(),
        };
        self.skip_semicolons();
        Some(Statement::Import { path, binding })
    }

    fn parse_export_statement(&mut self) -> Option<Statement> {
        if !self.expect_peek(TokenKind::Identifier) {
            return None;
        }
        let name = Identifier {
            name: self.current.literal.clone(),
        };
        self.skip_semicolons();
        Some(Statement::Export { name })
    }

    fn parse_expression_statement(&mut self) -> Option<Statement> {
        let expression = self.parse_expression(Precedence::Lowest)?;
        if self.peek_is(&TokenKind::Semicolon) {
            self.next_token();
        }
        Some(Statement::Expression { expression })
    }

    fn parse_block_statement(&mut self) -> BlockStatement {
        let mut statements = Vec::new();
        self.next_token();
        while !self.current_is(&TokenKind::RBrace) && !self.current_is(&TokenKind::Eof) {
            if let Some(statement) = self.parse_statement() {
                statements.push(statement);
            }
            self.next_token();
        }
        BlockStatement { statements }
    }

    // Expressions

    fn parse_expression(&mut self, precedence: Precedence) -> Option<Expression> {
        let mut left = self.parse_prefix()?;
        while !self.peek_is(&TokenKind::Semicolon) && precedence < precedence_of(&self.peek.kind) {
            self.next_token();
            left = self.parse_infix(left)?;
        }
        Some(left)
    }

    fn parse_prefix(&mut self) -> Option<Expression> {
        match &self.current.kind {
            TokenKind::Identifier => Some(Expression::Identifier(Identifier {
                name: self.current.literal.clone(),
            })),
            TokenKind::Int => self.parse_integer_literal(),
            TokenKind::String => Some(Expression::StringLiteral {
                value: self.current.literal.clone(),
            }),
            TokenKind::Keyword(Keyword::True) => Some(Expression::Boolean { value: true }),
            TokenKind::Keyword(Keyword::False) => Some(Expression::Boolean { value: false }),
            TokenKind::Not => self.parse_prefix_expression(UnaryOp::Not),
            TokenKind::Minus => self.parse_prefix_expression(UnaryOp::Negate),
            TokenKind::LParen => self.parse_grouped_expression(),
            TokenKind::Keyword(Keyword::If) => self.parse_if_expression(),
            TokenKind::Keyword(Keyword::Function) => self.parse_function_literal(),
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::LBrace => self.parse_hash_literal(),
            TokenKind::Illegal => {
                self.illegal_token_error();
                None
            }
            other => {
                let message = format!("no prefix parse rule for {other} token");
                self.error_at_current(message);
                None
            }
        }
    }

    fn parse_infix(&mut self, left: Expression) -> Option<Expression> {
        let operator = match &self.current.kind {
            TokenKind::Equals => BinaryOp::Equal,
            TokenKind::NotEquals => BinaryOp::NotEqual,
            TokenKind::LessThan => BinaryOp::Less,
            TokenKind::GreaterThan => BinaryOp::Greater,
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Sub,
            TokenKind::Asterisk => BinaryOp::Mul,
            TokenKind::Slash => BinaryOp::Div,
            TokenKind::LParen => return self.parse_call_expression(left),
            TokenKind::LBracket => return self.parse_index_expression(left),
            TokenKind::Dot => return self.parse_access_expression(left),
            _ => return Some(left),
        };
        let precedence = precedence_of(&self.current.kind);
        self.next_token();
        let right = self.parse_expression(precedence)?;
        Some(Expression::Infix {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_integer_literal(&mut self) -> Option<Expression> {
        match self.current.literal.parse::<i64>() {
            Ok(value) => Some(Expression::IntegerLiteral { value }),
            Err(_) => {
                let message = format!("could not parse {:?} as integer", self.current.literal);
                self.error_at_current(message);
                None
            }
        }
    }

    fn parse_prefix_expression(&mut self, operator: UnaryOp) -> Option<Expression> {
        self.next_token();
        let right = self.parse_expression(Precedence::Prefix)?;
        Some(Expression::Prefix {
            operator,
            right: Box::new(right),
        })
    }

    fn parse_grouped_expression(&mut self) -> Option<Expression> {
        self.next_token();
        let expression = self.parse_expression(Precedence::Lowest)?;
        if !self.expect_peek(TokenKind::RParen) {
            return None;
        }
        Some(expression)
    }

    fn parse_if_expression(&mut self) -> Option<Expression> {
        if !self.expect_peek(TokenKind::LParen) {
            return None;
        }
        self.next_token();
        let condition = self.parse_expression(Precedence::Lowest)?;
        if !self.expect_peek(TokenKind::RParen) {
            return None;
        }
        if !self.expect_peek(TokenKind::LBrace) {
            return None;
        }
        let consequence = self.parse_block_statement();
        let alternative = if self.peek_is(&TokenKind::Keyword(Keyword::Else)) {
            self.next_token();
            if !self.expect_peek(TokenKind::LBrace) {
                return None;
            }
            Some(self.parse_block_statement())
        } else {
            None
        };
        Some(Expression::If {
            condition: Box::new(condition),
            consequence,
            alternative,
        })
    }

    fn parse_function_literal(&mut self) -> Option<Expression> {
        if !self.expect_peek(TokenKind::LParen) {
            return None;
        }
        let parameters = self.parse_function_parameters()?;
        if !self.expect_peek(TokenKind::LBrace) {
            return None;
        }
        let body = self.parse_block_statement();
        Some(Expression::Function { parameters, body })
    }

    fn parse_function_parameters(&mut self) -> Option<Vec<Identifier>> {
        let mut parameters = Vec::new();
        if self.peek_is(&TokenKind::RParen) {
            self.next_token();
            return Some(parameters);
        }
        self.next_token();
        parameters.push(Identifier {
            name: self.current.literal.clone(),
        });
        while self.peek_is(&TokenKind::Comma) {
            self.next_token();
            self.next_token();
            parameters.push(Identifier {
                name: self.current.literal.clone(),
            });
        }
        if !self.expect_peek(TokenKind::RParen) {
            return None;
        }
        Some(parameters)
    }

    fn parse_call_expression(&mut self, function: Expression) -> Option<Expression> {
        let arguments = self.parse_expression_list(TokenKind::RParen)?;
        Some(Expression::Call {
            function: Box::new(function),
            arguments,
        })
    }

    fn parse_array_literal(&mut self) -> Option<Expression> {
        let elements = self.parse_expression_list(TokenKind::RBracket)?;
        Some(Expression::Array { elements })
    }

    fn parse_expression_list(&mut self, end: TokenKind) -> Option<Vec<Expression>> {
        let mut expressions = Vec::new();
        if self.peek_is(&end) {
            self.next_token();
            return Some(expressions);
        }
        self.next_token();
        expressions.push(self.parse_expression(Precedence::Lowest)?);
        while self.peek_is(&TokenKind::Comma) {
            self.next_token();
            self.next_token();
            expressions.push(self.parse_expression(Precedence::Lowest)?);
        }
        if !self.expect_peek(end) {
            return None;
        }
        Some(expressions)
    }

    fn parse_index_expression(&mut self, left: Expression) -> Option<Expression> {
        self.next_token();
        let index = self.parse_expression(Precedence::Lowest)?;
        if !self.expect_peek(TokenKind::RBracket) {
            return None;
        }
        Some(Expression::Index {
            left: Box::new(left),
            index: Box::new(index),
        })
    }

    fn parse_hash_literal(&mut self) -> Option<Expression> {
        let mut pairs = Vec::new();
        while !self.peek_is(&TokenKind::RBrace) {
            self.next_token();
            let key = self.parse_expression(Precedence::Lowest)?;
            if self.peek_is(&TokenKind::Colon) {
                self.next_token();
                self.next_token();
                let value = self.parse_expression(Precedence::Lowest)?;
                pairs.push((key, value));
            } else {
                // Bare-key shorthand: the key expression doubles as the value.
                let value = key.clone();
                pairs.push((key, value));
            }
            if !self.peek_is(&TokenKind::RBrace) && !self.expect_peek(TokenKind::Comma) {
                return None;
            }
        }
        self.next_token();
        Some(Expression::Hash { pairs })
    }

    /// The right side of `.` folds a trailing call or index into the
    /// accessed expression while looser operators stay outside; whether the
    /// shape makes sense is decided at evaluation time.
    fn parse_access_expression(&mut self, accessor: Expression) -> Option<Expression> {
        self.next_token();
        let accessed = self.parse_expression(Precedence::Prefix)?;
        Some(Expression::Access {
            accessor: Box::new(accessor),
            accessed: Box::new(accessed),
        })
    }

    // Utils

    fn current_is(&self, kind: &TokenKind) -> bool {
        self.current.kind == *kind
    }

    fn peek_is(&self, kind: &TokenKind) -> bool {
        self.peek.kind == *kind
    }

    fn expect_peek(&mut self, kind: TokenKind) -> bool {
        if self.peek_is(&kind) {
            self.next_token();
            true
        } else {
            self.unexpected_token_error(&kind);
            false
        }
    }

    fn skip_semicolons(&mut self) {
        while self.peek_is(&TokenKind::Semicolon) {
            self.next_token();
        }
    }

    // Errors

    fn unexpected_token_error(&mut self, expected: &TokenKind) {
        let message = format!("expected token {expected}, got {}", self.peek.kind);
        let position = SourcePosition::new(self.peek.line, self.peek.column);
        self.errors
            .push(Diagnostic::new(DiagnosticKind::Parser, message).with_position(position));
    }

    fn illegal_token_error(&mut self) {
        let message = format!("illegal token {:?}", self.current.literal);
        let position = SourcePosition::new(self.current.line, self.current.column);
        self.errors
            .push(Diagnostic::new(DiagnosticKind::Lexer, message).with_position(position));
    }

    fn error_at_current(&mut self, message: String) {
        let position = SourcePosition::new(self.current.line, self.current.column);
        self.errors
            .push(Diagnostic::new(DiagnosticKind::Parser, message).with_position(position));
    }
}
