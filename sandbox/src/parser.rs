//! Recursive-descent parser for target code.
//!
//! Precedence, lowest first: lambda, conditional, `or`, `and`, `not`,
//! comparison, additive, multiplicative, unary sign, `**`, postfix.

use crate::ast::*;
use crate::lexer::{Lexer, Token, TokenKind};
use crate::{SandboxError, SandboxResult};
use keel_ast::Span;

/// Parse a single target-code expression.
pub fn parse(code: &str) -> SandboxResult<PyExpr> {
    let mut parser = Parser::new(code)?;
    let expr = parser.parse_expr()?;
    if !parser.check(&TokenKind::Eof) {
        let token = parser.peek();
        return Err(SandboxError::syntax(
            format!("unexpected {} after expression", token.kind.name()),
            token.span,
        ));
    }
    Ok(expr)
}

// ==================== PARSER STATE ====================

/// Parser state.
pub struct Parser {
    tokens: Vec<Token>,
    eof: Token,
    pos: usize,
}

impl Parser {
    /// Create a new parser from target code.
    pub fn new(input: &str) -> SandboxResult<Self> {
        let tokens = Lexer::new(input).tokenize()?;
        let eof = tokens
            .last()
            .cloned()
            .unwrap_or_else(|| Token::eof(input.len(), 1, 1));
        Ok(Self {
            tokens,
            eof,
            pos: 0,
        })
    }
}

// ==================== TOKEN HELPERS ====================

impl Parser {
    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&self.eof)
    }

    fn peek_nth(&self, n: usize) -> &Token {
        self.tokens.get(self.pos + n).unwrap_or(&self.eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> SandboxResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let token = self.peek();
            Err(SandboxError::syntax(
                format!("expected {}, found {}", kind.name(), token.kind.name()),
                token.span,
            ))
        }
    }

    fn expect_ident(&mut self) -> SandboxResult<String> {
        match self.peek().kind.clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(SandboxError::syntax(
                format!("expected identifier, found {}", other.name()),
                self.peek().span,
            )),
        }
    }

    fn span_from(&self, start: Span) -> Span {
        let end = self
            .pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|t| t.span.end)
            .unwrap_or(start.end);
        Span::new(start.start, end, start.line, start.column)
    }
}

// ==================== EXPRESSIONS ====================

impl Parser {
    fn parse_expr(&mut self) -> SandboxResult<PyExpr> {
        if self.check(&TokenKind::Lambda) {
            return self.parse_lambda();
        }
        self.parse_ternary()
    }

    fn parse_lambda(&mut self) -> SandboxResult<PyExpr> {
        let start = self.expect(&TokenKind::Lambda)?.span;
        let mut params = Vec::new();
        if !self.check(&TokenKind::Colon) {
            params.push(self.expect_ident()?);
            while self.eat(&TokenKind::Comma) {
                params.push(self.expect_ident()?);
            }
        }
        self.expect(&TokenKind::Colon)?;
        let body = self.parse_expr()?;
        Ok(PyExpr::Lambda(params, Box::new(body), self.span_from(start)))
    }

    fn parse_ternary(&mut self) -> SandboxResult<PyExpr> {
        let start = self.peek().span;
        let body = self.parse_or()?;
        if !self.eat(&TokenKind::If) {
            return Ok(body);
        }
        let test = self.parse_or()?;
        self.expect(&TokenKind::Else)?;
        let orelse = self.parse_expr()?;
        Ok(PyExpr::IfExp(
            Box::new(test),
            Box::new(body),
            Box::new(orelse),
            self.span_from(start),
        ))
    }

    fn parse_or(&mut self) -> SandboxResult<PyExpr> {
        self.parse_bool_chain(BoolOp::Or)
    }

    fn parse_bool_chain(&mut self, op: BoolOp) -> SandboxResult<PyExpr> {
        let (token, next): (TokenKind, fn(&mut Self) -> SandboxResult<PyExpr>) = match op {
            BoolOp::Or => (TokenKind::Or, |p| p.parse_bool_chain(BoolOp::And)),
            BoolOp::And => (TokenKind::And, Self::parse_not),
        };
        let start = self.peek().span;
        let first = next(self)?;
        if !self.check(&token) {
            return Ok(first);
        }
        let mut values = vec![first];
        while self.eat(&token) {
            values.push(next(self)?);
        }
        Ok(PyExpr::BoolOp(op, values, self.span_from(start)))
    }

    fn parse_not(&mut self) -> SandboxResult<PyExpr> {
        if self.check(&TokenKind::Not) {
            let start = self.advance().span;
            let operand = self.parse_not()?;
            return Ok(PyExpr::UnaryOp(
                UnaryOp::Not,
                Box::new(operand),
                self.span_from(start),
            ));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> SandboxResult<PyExpr> {
        let start = self.peek().span;
        let left = self.parse_additive()?;
        let mut rest = Vec::new();
        while let Some(op) = self.parse_cmp_op() {
            rest.push((op, self.parse_additive()?));
        }
        if rest.is_empty() {
            Ok(left)
        } else {
            Ok(PyExpr::Compare(Box::new(left), rest, self.span_from(start)))
        }
    }

    fn parse_cmp_op(&mut self) -> Option<CmpOp> {
        let op = match self.peek().kind {
            TokenKind::Eq => CmpOp::Eq,
            TokenKind::NotEq => CmpOp::NotEq,
            TokenKind::Lt => CmpOp::Lt,
            TokenKind::LtEq => CmpOp::LtE,
            TokenKind::Gt => CmpOp::Gt,
            TokenKind::GtEq => CmpOp::GtE,
            TokenKind::In => CmpOp::In,
            TokenKind::Not if self.peek_nth(1).kind == TokenKind::In => {
                self.advance();
                CmpOp::NotIn
            }
            TokenKind::Is => {
                if self.peek_nth(1).kind == TokenKind::Not {
                    self.advance();
                    CmpOp::IsNot
                } else {
                    CmpOp::Is
                }
            }
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn parse_additive(&mut self) -> SandboxResult<PyExpr> {
        let start = self.peek().span;
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = PyExpr::BinOp(op, Box::new(left), Box::new(right), self.span_from(start));
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> SandboxResult<PyExpr> {
        let start = self.peek().span;
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinOp::Mult,
                TokenKind::Slash => BinOp::Div,
                TokenKind::DoubleSlash => BinOp::FloorDiv,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = PyExpr::BinOp(op, Box::new(left), Box::new(right), self.span_from(start));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> SandboxResult<PyExpr> {
        let op = match self.peek().kind {
            TokenKind::Minus => UnaryOp::USub,
            TokenKind::Plus => UnaryOp::UAdd,
            _ => return self.parse_power(),
        };
        let start = self.advance().span;
        let operand = self.parse_unary()?;
        Ok(PyExpr::UnaryOp(op, Box::new(operand), self.span_from(start)))
    }

    fn parse_power(&mut self) -> SandboxResult<PyExpr> {
        let start = self.peek().span;
        let base = self.parse_postfix()?;
        if !self.eat(&TokenKind::DoubleStar) {
            return Ok(base);
        }
        // Right-associative, binds tighter than a unary sign on its left only.
        let exponent = self.parse_unary()?;
        Ok(PyExpr::BinOp(
            BinOp::Pow,
            Box::new(base),
            Box::new(exponent),
            self.span_from(start),
        ))
    }

    fn parse_postfix(&mut self) -> SandboxResult<PyExpr> {
        let start = self.peek().span;
        let mut expr = self.parse_atom()?;
        loop {
            match self.peek().kind {
                TokenKind::LParen => {
                    self.advance();
                    let args = self.parse_sequence(&TokenKind::RParen)?;
                    self.expect(&TokenKind::RParen)?;
                    expr = PyExpr::Call(Box::new(expr), args, self.span_from(start));
                }
                TokenKind::LBracket => {
                    self.advance();
                    let key = self.parse_expr()?;
                    self.expect(&TokenKind::RBracket)?;
                    expr = PyExpr::Subscript(Box::new(expr), Box::new(key), self.span_from(start));
                }
                TokenKind::Dot => {
                    self.advance();
                    let attr = self.expect_ident()?;
                    expr = PyExpr::Attribute(Box::new(expr), attr, self.span_from(start));
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// Comma-separated expressions up to (not including) `close`.
    fn parse_sequence(&mut self, close: &TokenKind) -> SandboxResult<Vec<PyExpr>> {
        let mut items = Vec::new();
        while !self.check(close) {
            items.push(self.parse_expr()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(items)
    }

    fn parse_atom(&mut self) -> SandboxResult<PyExpr> {
        let token = self.advance();
        let span = token.span;
        let constant = match token.kind {
            TokenKind::None => Constant::None,
            TokenKind::True => Constant::Bool(true),
            TokenKind::False => Constant::Bool(false),
            TokenKind::Int(i) => Constant::Int(i),
            TokenKind::Float(f) => Constant::Float(f),
            TokenKind::String(mut s) => {
                // Adjacent literals concatenate.
                while let TokenKind::String(next) = self.peek().kind.clone() {
                    s.push_str(&next);
                    self.advance();
                }
                Constant::Str(s)
            }
            TokenKind::Ident(name) => return Ok(PyExpr::Name(name, span)),
            TokenKind::LParen => return self.parse_paren(span),
            TokenKind::LBracket => return self.parse_list(span),
            TokenKind::LBrace => return self.parse_dict(span),
            other => {
                return Err(SandboxError::syntax(
                    format!("expected expression, found {}", other.name()),
                    span,
                ))
            }
        };
        Ok(PyExpr::Constant(constant, self.span_from(span)))
    }

    fn parse_paren(&mut self, start: Span) -> SandboxResult<PyExpr> {
        if self.eat(&TokenKind::RParen) {
            return Ok(PyExpr::Tuple(Vec::new(), self.span_from(start)));
        }
        let first = self.parse_expr()?;
        if self.eat(&TokenKind::RParen) {
            return Ok(first);
        }
        self.expect(&TokenKind::Comma)?;
        let mut items = vec![first];
        items.extend(self.parse_sequence(&TokenKind::RParen)?);
        self.expect(&TokenKind::RParen)?;
        Ok(PyExpr::Tuple(items, self.span_from(start)))
    }

    fn parse_list(&mut self, start: Span) -> SandboxResult<PyExpr> {
        if self.eat(&TokenKind::RBracket) {
            return Ok(PyExpr::List(Vec::new(), self.span_from(start)));
        }
        let first = self.parse_expr()?;
        if self.check(&TokenKind::For) {
            let generator = self.parse_generator()?;
            self.expect(&TokenKind::RBracket)?;
            return Ok(PyExpr::ListComp(
                Box::new(first),
                generator,
                self.span_from(start),
            ));
        }
        let mut items = vec![first];
        if self.eat(&TokenKind::Comma) {
            items.extend(self.parse_sequence(&TokenKind::RBracket)?);
        }
        self.expect(&TokenKind::RBracket)?;
        Ok(PyExpr::List(items, self.span_from(start)))
    }

    fn parse_dict(&mut self, start: Span) -> SandboxResult<PyExpr> {
        if self.eat(&TokenKind::RBrace) {
            return Ok(PyExpr::Dict(Vec::new(), self.span_from(start)));
        }
        let key = self.parse_expr()?;
        self.expect(&TokenKind::Colon)?;
        let value = self.parse_expr()?;
        if self.check(&TokenKind::For) {
            let generator = self.parse_generator()?;
            self.expect(&TokenKind::RBrace)?;
            return Ok(PyExpr::DictComp(
                Box::new(key),
                Box::new(value),
                generator,
                self.span_from(start),
            ));
        }
        let mut entries = vec![(key, value)];
        while self.eat(&TokenKind::Comma) {
            if self.check(&TokenKind::RBrace) {
                break;
            }
            let key = self.parse_expr()?;
            self.expect(&TokenKind::Colon)?;
            let value = self.parse_expr()?;
            entries.push((key, value));
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(PyExpr::Dict(entries, self.span_from(start)))
    }

    fn parse_generator(&mut self) -> SandboxResult<Generator> {
        self.expect(&TokenKind::For)?;
        let target = self.expect_ident()?;
        if self.check(&TokenKind::Comma) {
            return Err(SandboxError::syntax(
                "tuple unpacking in comprehensions is not supported",
                self.peek().span,
            ));
        }
        self.expect(&TokenKind::In)?;
        let iter = self.parse_or()?;
        let mut conds = Vec::new();
        while self.eat(&TokenKind::If) {
            conds.push(self.parse_or()?);
        }
        if self.check(&TokenKind::For) {
            return Err(SandboxError::syntax(
                "nested comprehension loops are not supported",
                self.peek().span,
            ));
        }
        Ok(Generator {
            target,
            iter: Box::new(iter),
            conds,
        })
    }
}
