use super::lexer::{Spanned, StrPart, Token};
use super::value::Value;
use super::ScriptError;

#[derive(Debug, Clone, PartialEq)]
pub enum BinOp {
    Concat,
    Eq,
    NotEq,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Lit(Value),
    Interp(Vec<StrPart>),
    Var(String),
    Index(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Call { name: String, args: Vec<Expr>, line: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Html(String),
    Echo(Vec<Expr>),
    Assign(String, Expr),
    If {
        branches: Vec<(Expr, Vec<Stmt>)>,
        otherwise: Option<Vec<Stmt>>,
    },
    Block(Vec<Stmt>),
    Expr(Expr),
    Return(Option<Expr>),
    Empty,
}

/// Deepest allowed nesting of blocks, groups, operators and indexing.
/// Evaluating and dropping the tree recurses once per level.
pub const MAX_NESTING: usize = 256;

pub fn parse(tokens: Vec<Spanned>) -> Result<Vec<Stmt>, ScriptError> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let mut program = Vec::new();
    while !parser.at_end() {
        program.push(parser.statement()?);
    }
    Ok(program)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|s| &s.token)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|s| s.line)
            .unwrap_or(1)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|s| s.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn error(&self, message: impl Into<String>) -> ScriptError {
        ScriptError::Syntax {
            line: self.line(),
            message: message.into(),
        }
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), ScriptError> {
        if self.peek() == Some(&expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected {}", what)))
        }
    }

    fn descend(&mut self) -> Result<(), ScriptError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(self.error("nesting too deep"));
        }
        Ok(())
    }

    fn ascend(&mut self, levels: usize) {
        self.depth -= levels;
    }

    fn keyword(&self) -> Option<String> {
        match self.peek() {
            Some(Token::Ident(name)) => Some(name.to_ascii_lowercase()),
            _ => None,
        }
    }

    fn at_keyword(&self, word: &str) -> bool {
        self.keyword().as_deref() == Some(word)
    }

    /// `;`, `?>` or end of input
    fn terminator(&mut self) -> Result<(), ScriptError> {
        match self.peek() {
            Some(Token::Semi) | Some(Token::CloseTag) => {
                self.pos += 1;
                Ok(())
            }
            None => Ok(()),
            Some(other) => Err(self.error(format!("expected ; but found {:?}", other))),
        }
    }

    fn statement(&mut self) -> Result<Stmt, ScriptError> {
        self.descend()?;
        let stmt = self.statement_inner()?;
        self.ascend(1);
        Ok(stmt)
    }

    fn statement_inner(&mut self) -> Result<Stmt, ScriptError> {
        match self.peek() {
            Some(Token::InlineHtml(_)) => {
                let Some(Token::InlineHtml(text)) = self.next() else {
                    unreachable!("peeked inline markup");
                };
                return Ok(Stmt::Html(text));
            }
            Some(Token::Semi) | Some(Token::CloseTag) => {
                self.pos += 1;
                return Ok(Stmt::Empty);
            }
            Some(Token::EchoTag) => {
                self.pos += 1;
                return self.echo();
            }
            Some(Token::LBrace) => {
                self.pos += 1;
                let body = self.block_until_brace()?;
                return Ok(Stmt::Block(body));
            }
            Some(Token::Variable(_)) if self.peek_at(1) == Some(&Token::Assign) => {
                let Some(Token::Variable(name)) = self.next() else {
                    unreachable!("peeked variable");
                };
                self.pos += 1;
                let value = self.expression()?;
                self.terminator()?;
                return Ok(Stmt::Assign(name, value));
            }
            _ => {}
        }

        match self.keyword().as_deref() {
            Some("echo") => {
                self.pos += 1;
                self.echo()
            }
            Some("print") => {
                self.pos += 1;
                let value = self.expression()?;
                self.terminator()?;
                Ok(Stmt::Echo(vec![value]))
            }
            Some("if") => {
                self.pos += 1;
                self.if_statement()
            }
            Some("return") => {
                self.pos += 1;
                let value = match self.peek() {
                    Some(Token::Semi) | Some(Token::CloseTag) | None => None,
                    _ => Some(self.expression()?),
                };
                self.terminator()?;
                Ok(Stmt::Return(value))
            }
            Some(word @ ("else" | "elseif" | "endif")) => {
                Err(self.error(format!("unexpected '{}'", word)))
            }
            _ => {
                let expr = self.expression()?;
                self.terminator()?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    fn echo(&mut self) -> Result<Stmt, ScriptError> {
        let mut values = vec![self.expression()?];
        while self.peek() == Some(&Token::Comma) {
            self.pos += 1;
            values.push(self.expression()?);
        }
        self.terminator()?;
        Ok(Stmt::Echo(values))
    }

    fn block_until_brace(&mut self) -> Result<Vec<Stmt>, ScriptError> {
        let mut body = Vec::new();
        loop {
            match self.peek() {
                Some(Token::RBrace) => {
                    self.pos += 1;
                    return Ok(body);
                }
                None => return Err(self.error("expected }")),
                _ => body.push(self.statement()?),
            }
        }
    }

    fn condition(&mut self) -> Result<Expr, ScriptError> {
        self.expect(Token::LParen, "( after if")?;
        let cond = self.expression()?;
        self.expect(Token::RParen, ")")?;
        Ok(cond)
    }

    fn if_statement(&mut self) -> Result<Stmt, ScriptError> {
        let cond = self.condition()?;
        if self.peek() == Some(&Token::Colon) {
            self.pos += 1;
            return self.if_alternative(cond);
        }

        let mut branches = vec![(cond, vec![self.statement()?])];
        let mut otherwise = None;

        loop {
            if self.at_keyword("elseif") {
                self.pos += 1;
                let cond = self.condition()?;
                branches.push((cond, vec![self.statement()?]));
            } else if self.at_keyword("else") {
                self.pos += 1;
                if self.at_keyword("if") {
                    self.pos += 1;
                    let cond = self.condition()?;
                    branches.push((cond, vec![self.statement()?]));
                } else {
                    otherwise = Some(vec![self.statement()?]);
                    break;
                }
            } else {
                break;
            }
        }

        Ok(Stmt::If {
            branches,
            otherwise,
        })
    }

    /// `if (c): ... elseif (c): ... else: ... endif;`
    fn if_alternative(&mut self, cond: Expr) -> Result<Stmt, ScriptError> {
        let mut branches = Vec::new();
        let mut otherwise = None;
        let mut current = Some(cond);

        loop {
            let mut body = Vec::new();
            while !(self.at_keyword("elseif") || self.at_keyword("else") || self.at_keyword("endif")) {
                if self.at_end() {
                    return Err(self.error("expected endif"));
                }
                body.push(self.statement()?);
            }

            match current.take() {
                Some(cond) => branches.push((cond, body)),
                None => otherwise = Some(body),
            }

            match self.keyword().as_deref() {
                Some("elseif") if otherwise.is_none() => {
                    self.pos += 1;
                    current = Some(self.condition()?);
                    self.expect(Token::Colon, ": after elseif")?;
                }
                Some("else") if otherwise.is_none() => {
                    self.pos += 1;
                    self.expect(Token::Colon, ": after else")?;
                }
                Some("endif") => {
                    self.pos += 1;
                    self.terminator()?;
                    break;
                }
                _ => return Err(self.error("misplaced else in if block")),
            }
        }

        Ok(Stmt::If {
            branches,
            otherwise,
        })
    }

    fn expression(&mut self) -> Result<Expr, ScriptError> {
        self.descend()?;
        let expr = self.or()?;
        self.ascend(1);
        Ok(expr)
    }

    // Operator chains build left-deep trees, so every operator adds a level.

    fn or(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.and()?;
        let mut levels = 0;
        while self.peek() == Some(&Token::OrOr) {
            self.pos += 1;
            self.descend()?;
            levels += 1;
            let right = self.and()?;
            left = Expr::Binary(BinOp::Or, Box::new(left), Box::new(right));
        }
        self.ascend(levels);
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.equality()?;
        let mut levels = 0;
        while self.peek() == Some(&Token::AndAnd) {
            self.pos += 1;
            self.descend()?;
            levels += 1;
            let right = self.equality()?;
            left = Expr::Binary(BinOp::And, Box::new(left), Box::new(right));
        }
        self.ascend(levels);
        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.concat()?;
        let mut levels = 0;
        loop {
            let op = match self.peek() {
                Some(Token::EqEq) => BinOp::Eq,
                Some(Token::NotEq) => BinOp::NotEq,
                _ => break,
            };
            self.pos += 1;
            self.descend()?;
            levels += 1;
            let right = self.concat()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        self.ascend(levels);
        Ok(left)
    }

    fn concat(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.unary()?;
        let mut levels = 0;
        while self.peek() == Some(&Token::Dot) {
            self.pos += 1;
            self.descend()?;
            levels += 1;
            let right = self.unary()?;
            left = Expr::Binary(BinOp::Concat, Box::new(left), Box::new(right));
        }
        self.ascend(levels);
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, ScriptError> {
        if self.peek() == Some(&Token::Bang) {
            self.pos += 1;
            self.descend()?;
            let inner = self.unary()?;
            self.ascend(1);
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, ScriptError> {
        let mut expr = self.primary()?;
        let mut levels = 0;
        while self.peek() == Some(&Token::LBracket) {
            self.pos += 1;
            self.descend()?;
            levels += 1;
            let key = self.expression()?;
            self.expect(Token::RBracket, "]")?;
            expr = Expr::Index(Box::new(expr), Box::new(key));
        }
        self.ascend(levels);
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, ScriptError> {
        let line = self.line();
        match self.next() {
            Some(Token::Int(i)) => Ok(Expr::Lit(Value::Int(i))),
            Some(Token::Str(parts)) => Ok(match parts.as_slice() {
                [] => Expr::Lit(Value::Str(String::new())),
                [StrPart::Lit(text)] => Expr::Lit(Value::Str(text.clone())),
                _ => Expr::Interp(parts),
            }),
            Some(Token::Variable(name)) => Ok(Expr::Var(name)),
            Some(Token::LParen) => {
                let inner = self.expression()?;
                self.expect(Token::RParen, ")")?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.pos += 1;
                    let args = self.arguments()?;
                    return Ok(Expr::Call { name, args, line });
                }
                match name.to_ascii_lowercase().as_str() {
                    "true" => Ok(Expr::Lit(Value::Bool(true))),
                    "false" => Ok(Expr::Lit(Value::Bool(false))),
                    "null" => Ok(Expr::Lit(Value::Null)),
                    _ => Err(ScriptError::Syntax {
                        line,
                        message: format!("undefined constant {}", name),
                    }),
                }
            }
            Some(other) => Err(ScriptError::Syntax {
                line,
                message: format!("unexpected {:?}", other),
            }),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, ScriptError> {
        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.pos += 1;
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => return Ok(args),
                _ => return Err(self.error("expected , or ) in call")),
            }
        }
    }
}
