//! Tokenizer for page bodies. Bodies start in code mode; `?>` drops to
//! literal markup and `<?php` / `<?=` come back.

use super::ScriptError;

#[derive(Debug, Clone, PartialEq)]
pub enum StrPart {
    Lit(String),
    Var { name: String, key: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    InlineHtml(String),
    /// `?>`, which also terminates the statement before it
    CloseTag,
    /// `<?=`
    EchoTag,
    Variable(String),
    Ident(String),
    Int(i64),
    Str(Vec<StrPart>),
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semi,
    Colon,
    Dot,
    Assign,
    EqEq,
    NotEq,
    Bang,
    AndAnd,
    OrOr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub line: usize,
}

pub fn tokenize(source: &str) -> Result<Vec<Spanned>, ScriptError> {
    Lexer::new(source).run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    tokens: Vec<Spanned>,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            tokens: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn starts_with(&self, text: &str) -> bool {
        text.chars()
            .enumerate()
            .all(|(i, c)| self.peek_at(i) == Some(c))
    }

    fn starts_with_ignore_case(&self, text: &str) -> bool {
        text.chars()
            .enumerate()
            .all(|(i, c)| self.peek_at(i).is_some_and(|p| p.eq_ignore_ascii_case(&c)))
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn advance(&mut self, n: usize) {
        for _ in 0..n {
            self.bump();
        }
    }

    fn push(&mut self, token: Token, line: usize) {
        self.tokens.push(Spanned { token, line });
    }

    fn error(&self, message: impl Into<String>) -> ScriptError {
        ScriptError::Syntax {
            line: self.line,
            message: message.into(),
        }
    }

    fn run(mut self) -> Result<Vec<Spanned>, ScriptError> {
        loop {
            self.code()?;
            if self.peek().is_none() {
                break;
            }
            self.markup();
            if self.peek().is_none() {
                break;
            }
        }
        Ok(self.tokens)
    }

    /// Literal text up to the next open tag
    fn markup(&mut self) {
        let line = self.line;
        let mut text = String::new();

        while self.peek().is_some() {
            if self.starts_with("<?=") {
                self.flush_markup(text, line);
                let line = self.line;
                self.advance(3);
                self.push(Token::EchoTag, line);
                return;
            }
            if self.starts_with_ignore_case("<?php") {
                self.flush_markup(text, line);
                self.advance(5);
                return;
            }
            if let Some(c) = self.bump() {
                text.push(c);
            }
        }

        self.flush_markup(text, line);
    }

    fn flush_markup(&mut self, text: String, line: usize) {
        if !text.is_empty() {
            self.push(Token::InlineHtml(text), line);
        }
    }

    /// Code tokens up to `?>` or end of input
    fn code(&mut self) -> Result<(), ScriptError> {
        while let Some(c) = self.peek() {
            let line = self.line;

            if c.is_whitespace() {
                self.bump();
                continue;
            }

            if self.starts_with("?>") {
                self.advance(2);
                self.push(Token::CloseTag, line);
                if self.starts_with("\r\n") {
                    self.advance(2);
                } else if self.peek() == Some('\n') {
                    self.bump();
                }
                return Ok(());
            }

            if self.starts_with("//") || c == '#' {
                while let Some(c) = self.peek() {
                    if c == '\n' || self.starts_with("?>") {
                        break;
                    }
                    self.bump();
                }
                continue;
            }

            if self.starts_with("/*") {
                self.advance(2);
                loop {
                    if self.peek().is_none() {
                        return Err(self.error("unterminated comment"));
                    }
                    if self.starts_with("*/") {
                        self.advance(2);
                        break;
                    }
                    self.bump();
                }
                continue;
            }

            if c == '$' && self.peek_at(1).is_some_and(is_ident_start) {
                self.bump();
                let name = self.ident();
                self.push(Token::Variable(name), line);
                continue;
            }

            if is_ident_start(c) {
                let name = self.ident();
                self.push(Token::Ident(name), line);
                continue;
            }

            if c.is_ascii_digit() {
                let token = self.number()?;
                self.push(token, line);
                continue;
            }

            if c == '\'' {
                let token = self.single_quoted()?;
                self.push(token, line);
                continue;
            }

            if c == '"' {
                let token = self.double_quoted()?;
                self.push(token, line);
                continue;
            }

            let token = self.punct()?;
            self.push(token, line);
        }
        Ok(())
    }

    fn ident(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.peek().filter(|c| is_ident_char(*c)) {
            name.push(c);
            self.bump();
        }
        name
    }

    fn number(&mut self) -> Result<Token, ScriptError> {
        let mut digits = String::new();
        while let Some(c) = self.peek().filter(|c| c.is_ascii_digit()) {
            digits.push(c);
            self.bump();
        }
        digits
            .parse()
            .map(Token::Int)
            .map_err(|_| self.error(format!("integer literal {} out of range", digits)))
    }

    fn single_quoted(&mut self) -> Result<Token, ScriptError> {
        self.bump();
        let mut text = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some('\'') => break,
                Some('\\') if matches!(self.peek(), Some('\'') | Some('\\')) => {
                    if let Some(c) = self.bump() {
                        text.push(c);
                    }
                }
                Some(c) => text.push(c),
            }
        }
        Ok(Token::Str(vec![StrPart::Lit(text)]))
    }

    fn double_quoted(&mut self) -> Result<Token, ScriptError> {
        self.bump();
        let mut parts = Vec::new();
        let mut text = String::new();

        loop {
            match self.peek() {
                None => return Err(self.error("unterminated string")),
                Some('"') => {
                    self.bump();
                    break;
                }
                Some('\\') => {
                    self.bump();
                    match self.bump() {
                        Some('n') => text.push('\n'),
                        Some('t') => text.push('\t'),
                        Some('r') => text.push('\r'),
                        Some('\\') => text.push('\\'),
                        Some('"') => text.push('"'),
                        Some('$') => text.push('$'),
                        Some(other) => {
                            text.push('\\');
                            text.push(other);
                        }
                        None => return Err(self.error("unterminated string")),
                    }
                }
                Some('$') if self.peek_at(1).is_some_and(is_ident_start) => {
                    self.bump();
                    flush_lit(&mut parts, &mut text);
                    let name = self.ident();
                    parts.push(StrPart::Var { name, key: None });
                }
                Some('{') if self.peek_at(1) == Some('$') => {
                    flush_lit(&mut parts, &mut text);
                    parts.push(self.braced_interpolation()?);
                }
                Some(c) => {
                    text.push(c);
                    self.bump();
                }
            }
        }

        flush_lit(&mut parts, &mut text);
        Ok(Token::Str(parts))
    }

    /// `{$name}` or `{$name['key']}` inside a double-quoted string
    fn braced_interpolation(&mut self) -> Result<StrPart, ScriptError> {
        self.advance(2);
        if !self.peek().is_some_and(is_ident_start) {
            return Err(self.error("expected variable name in interpolation"));
        }
        let name = self.ident();

        let key = if self.peek() == Some('[') {
            self.bump();
            let quote = match self.bump() {
                Some(q @ ('\'' | '"')) => q,
                _ => return Err(self.error("expected quoted key in interpolation")),
            };
            let mut key = String::new();
            loop {
                match self.bump() {
                    None => return Err(self.error("unterminated interpolation")),
                    Some(c) if c == quote => break,
                    Some(c) => key.push(c),
                }
            }
            if self.bump() != Some(']') {
                return Err(self.error("expected ] in interpolation"));
            }
            Some(key)
        } else {
            None
        };

        if self.bump() != Some('}') {
            return Err(self.error("expected } to close interpolation"));
        }
        Ok(StrPart::Var { name, key })
    }

    fn punct(&mut self) -> Result<Token, ScriptError> {
        let two = [self.peek(), self.peek_at(1)];
        let (token, width) = match two {
            [Some('='), Some('=')] if self.peek_at(2) == Some('=') => {
                return Err(self.error("strict comparison is not supported"))
            }
            [Some('!'), Some('=')] if self.peek_at(2) == Some('=') => {
                return Err(self.error("strict comparison is not supported"))
            }
            [Some('='), Some('=')] => (Token::EqEq, 2),
            [Some('!'), Some('=')] => (Token::NotEq, 2),
            [Some('&'), Some('&')] => (Token::AndAnd, 2),
            [Some('|'), Some('|')] => (Token::OrOr, 2),
            [Some('('), _] => (Token::LParen, 1),
            [Some(')'), _] => (Token::RParen, 1),
            [Some('{'), _] => (Token::LBrace, 1),
            [Some('}'), _] => (Token::RBrace, 1),
            [Some('['), _] => (Token::LBracket, 1),
            [Some(']'), _] => (Token::RBracket, 1),
            [Some(','), _] => (Token::Comma, 1),
            [Some(';'), _] => (Token::Semi, 1),
            [Some(':'), _] => (Token::Colon, 1),
            [Some('.'), _] => (Token::Dot, 1),
            [Some('='), _] => (Token::Assign, 1),
            [Some('!'), _] => (Token::Bang, 1),
            [Some(c), _] => return Err(self.error(format!("unexpected character '{}'", c))),
            [None, _] => return Err(self.error("unexpected end of input")),
        };
        self.advance(width);
        Ok(token)
    }
}

fn flush_lit(parts: &mut Vec<StrPart>, text: &mut String) {
    if !text.is_empty() {
        parts.push(StrPart::Lit(std::mem::take(text)));
    }
}
