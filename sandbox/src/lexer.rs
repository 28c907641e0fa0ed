//! Lexer for target code.

use crate::{SandboxError, SandboxResult};
use keel_ast::Span;

/// Token types.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Keywords
    And,
    Or,
    Not,
    In,
    Is,
    If,
    Else,
    For,
    Lambda,
    None,
    True,
    False,

    // Literals
    Ident(String),
    Int(i64),
    Float(f64),
    String(String),

    // Symbols
    LParen,     // (
    RParen,     // )
    LBrace,     // {
    RBrace,     // }
    LBracket,   // [
    RBracket,   // ]
    Comma,      // ,
    Colon,      // :
    Dot,        // .
    Plus,       // +
    Minus,      // -
    Star,       // *
    DoubleStar, // **
    Slash,      // /
    DoubleSlash, // //
    Percent,    // %
    Eq,         // ==
    NotEq,      // !=
    Lt,         // <
    LtEq,       // <=
    Gt,         // >
    GtEq,       // >=

    Eof,
}

impl TokenKind {
    /// Human-readable token name for error messages.
    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::And => "'and'",
            TokenKind::Or => "'or'",
            TokenKind::Not => "'not'",
            TokenKind::In => "'in'",
            TokenKind::Is => "'is'",
            TokenKind::If => "'if'",
            TokenKind::Else => "'else'",
            TokenKind::For => "'for'",
            TokenKind::Lambda => "'lambda'",
            TokenKind::None => "'None'",
            TokenKind::True => "'True'",
            TokenKind::False => "'False'",
            TokenKind::Ident(_) => "identifier",
            TokenKind::Int(_) => "integer",
            TokenKind::Float(_) => "float",
            TokenKind::String(_) => "string",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::Comma => "','",
            TokenKind::Colon => "':'",
            TokenKind::Dot => "'.'",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::DoubleStar => "'**'",
            TokenKind::Slash => "'/'",
            TokenKind::DoubleSlash => "'//'",
            TokenKind::Percent => "'%'",
            TokenKind::Eq => "'=='",
            TokenKind::NotEq => "'!='",
            TokenKind::Lt => "'<'",
            TokenKind::LtEq => "'<='",
            TokenKind::Gt => "'>'",
            TokenKind::GtEq => "'>='",
            TokenKind::Eof => "end of input",
        }
    }
}

/// A token with its span.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn eof(pos: usize, line: usize, column: usize) -> Self {
        Self {
            kind: TokenKind::Eof,
            span: Span::new(pos, pos, line, column),
        }
    }
}

/// Lexer state.
pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.char_indices().peekable(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenize all input into a vector of tokens.
    pub fn tokenize(mut self) -> SandboxResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = matches!(token.kind, TokenKind::Eof);
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn current_span(&self) -> Span {
        Span::new(self.pos, self.pos, self.line, self.column)
    }

    fn span_from(&self, start: usize, start_line: usize, start_col: usize) -> Span {
        Span::new(start, self.pos, start_line, start_col)
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn next_char(&mut self) -> Option<char> {
        let (pos, c) = self.chars.next()?;
        self.pos = pos + c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Consume `expected` if it is next.
    fn eat(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.next_char();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.next_char();
            } else {
                break;
            }
        }
    }

    fn next_token(&mut self) -> SandboxResult<Token> {
        self.skip_whitespace();

        let start = self.pos;
        let start_line = self.line;
        let start_col = self.column;

        let Some(c) = self.next_char() else {
            return Ok(Token::eof(self.pos, self.line, self.column));
        };

        let kind = match c {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '.' => TokenKind::Dot,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '%' => TokenKind::Percent,
            '*' => {
                if self.eat('*') {
                    TokenKind::DoubleStar
                } else {
                    TokenKind::Star
                }
            }
            '/' => {
                if self.eat('/') {
                    TokenKind::DoubleSlash
                } else {
                    TokenKind::Slash
                }
            }
            '=' => {
                if self.eat('=') {
                    TokenKind::Eq
                } else {
                    return Err(SandboxError::syntax(
                        "assignment is not an expression",
                        self.span_from(start, start_line, start_col),
                    ));
                }
            }
            '!' => {
                if self.eat('=') {
                    TokenKind::NotEq
                } else {
                    return Err(SandboxError::syntax(
                        "unexpected character '!'",
                        self.span_from(start, start_line, start_col),
                    ));
                }
            }
            '<' => {
                if self.eat('=') {
                    TokenKind::LtEq
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.eat('=') {
                    TokenKind::GtEq
                } else {
                    TokenKind::Gt
                }
            }
            '\'' | '"' => self.scan_string(c, start, start_line, start_col)?,
            '_' | 'a'..='z' | 'A'..='Z' => self.scan_ident_or_keyword(c),
            '0'..='9' => self.scan_number(c, start, start_line, start_col)?,
            _ => {
                return Err(SandboxError::syntax(
                    format!("unexpected character '{}'", c),
                    self.span_from(start, start_line, start_col),
                ));
            }
        };

        Ok(Token::new(kind, self.span_from(start, start_line, start_col)))
    }

    fn scan_string(
        &mut self,
        quote: char,
        start: usize,
        start_line: usize,
        start_col: usize,
    ) -> SandboxResult<TokenKind> {
        let mut value = String::new();

        loop {
            match self.next_char() {
                None | Some('\n') => {
                    return Err(SandboxError::syntax(
                        "unterminated string literal",
                        self.span_from(start, start_line, start_col),
                    ));
                }
                Some(c) if c == quote => break,
                Some('\\') => {
                    let escaped = match self.next_char() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('0') => '\0',
                        Some('\\') => '\\',
                        Some('\'') => '\'',
                        Some('"') => '"',
                        Some('x') => self.scan_hex_escape()?,
                        Some(c) => {
                            return Err(SandboxError::syntax(
                                format!("invalid escape sequence '\\{}'", c),
                                self.current_span(),
                            ));
                        }
                        None => {
                            return Err(SandboxError::syntax(
                                "unterminated escape sequence",
                                self.current_span(),
                            ));
                        }
                    };
                    value.push(escaped);
                }
                Some(c) => value.push(c),
            }
        }

        Ok(TokenKind::String(value))
    }

    /// Two hex digits after `\x`.
    fn scan_hex_escape(&mut self) -> SandboxResult<char> {
        let mut code = 0u32;
        for _ in 0..2 {
            let digit = self
                .next_char()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| SandboxError::syntax("invalid \\x escape", self.current_span()))?;
            code = code * 16 + digit;
        }
        char::from_u32(code)
            .ok_or_else(|| SandboxError::syntax("invalid \\x escape", self.current_span()))
    }

    fn scan_ident_or_keyword(&mut self, first: char) -> TokenKind {
        let mut ident = String::new();
        ident.push(first);

        while let Some(c) = self.peek_char() {
            if c.is_ascii_alphanumeric() || c == '_' {
                ident.push(c);
                self.next_char();
            } else {
                break;
            }
        }

        // Keywords are case-sensitive in target code
        match ident.as_str() {
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "in" => TokenKind::In,
            "is" => TokenKind::Is,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "lambda" => TokenKind::Lambda,
            "None" => TokenKind::None,
            "True" => TokenKind::True,
            "False" => TokenKind::False,
            _ => TokenKind::Ident(ident),
        }
    }

    fn scan_number(
        &mut self,
        first: char,
        start: usize,
        start_line: usize,
        start_col: usize,
    ) -> SandboxResult<TokenKind> {
        let mut number = String::new();
        number.push(first);
        self.scan_digits(&mut number);

        let mut is_float = false;
        if self.peek_char() == Some('.') {
            let mut lookahead = self.chars.clone();
            lookahead.next();
            if matches!(lookahead.peek(), Some((_, c)) if c.is_ascii_digit()) {
                number.push('.');
                self.next_char();
                self.scan_digits(&mut number);
                is_float = true;
            }
        }

        if matches!(self.peek_char(), Some('e' | 'E')) {
            number.push('e');
            self.next_char();
            if let Some(sign @ ('+' | '-')) = self.peek_char() {
                number.push(sign);
                self.next_char();
            }
            if !matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
                return Err(SandboxError::syntax(
                    "expected digits in exponent",
                    self.current_span(),
                ));
            }
            self.scan_digits(&mut number);
            is_float = true;
        }

        let span = self.span_from(start, start_line, start_col);
        if is_float {
            number
                .parse()
                .map(TokenKind::Float)
                .map_err(|_| SandboxError::syntax(format!("invalid float literal '{}'", number), span))
        } else {
            number.parse().map(TokenKind::Int).map_err(|_| {
                SandboxError::syntax(format!("invalid integer literal '{}'", number), span)
            })
        }
    }

    fn scan_digits(&mut self, number: &mut String) {
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                number.push(c);
                self.next_char();
            } else {
                break;
            }
        }
    }
}
