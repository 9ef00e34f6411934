use std::collections::HashMap;
use std::time::Instant;

use tracing::debug;

use super::lexer::StrPart;
use super::output::Output;
use super::parser::{BinOp, Expr, Stmt};
use super::value::Value;
use super::{Limits, ScriptError};
use crate::render::helpers::HelperRegistry;

/// Steps between wall-clock checks
const DEADLINE_CHECK_INTERVAL: u64 = 256;

enum Flow {
    Normal,
    Return(Value),
}

/// One evaluation of one page body. Variables live only as long as this value.
pub struct Interpreter<'a> {
    vars: HashMap<String, Value>,
    helpers: &'a HelperRegistry,
    out: Output,
    steps: u64,
    max_steps: u64,
    deadline: Option<Instant>,
}

impl<'a> Interpreter<'a> {
    pub fn new(helpers: &'a HelperRegistry, limits: &Limits) -> Self {
        Self {
            vars: HashMap::new(),
            helpers,
            out: Output::new(limits.max_output_bytes),
            steps: 0,
            max_steps: limits.max_steps,
            deadline: limits.deadline,
        }
    }

    pub fn set_var(&mut self, name: &str, value: Value) {
        self.vars.insert(name.to_string(), value);
    }

    /// Run the program; returns the `return` value, or null when it ran off the end
    pub fn run(&mut self, program: &[Stmt]) -> Result<Value, ScriptError> {
        match self.block(program)? {
            Flow::Normal => Ok(Value::Null),
            Flow::Return(value) => Ok(value),
        }
    }

    pub fn into_output(self) -> String {
        self.out.into_string()
    }

    fn tick(&mut self) -> Result<(), ScriptError> {
        self.steps += 1;
        if self.steps > self.max_steps {
            return Err(ScriptError::StepLimit(self.max_steps));
        }
        if self.steps % DEADLINE_CHECK_INTERVAL == 0 {
            if let Some(deadline) = self.deadline {
                if Instant::now() >= deadline {
                    return Err(ScriptError::Timeout);
                }
            }
        }
        Ok(())
    }

    fn block(&mut self, stmts: &[Stmt]) -> Result<Flow, ScriptError> {
        for stmt in stmts {
            if let Flow::Return(value) = self.statement(stmt)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn statement(&mut self, stmt: &Stmt) -> Result<Flow, ScriptError> {
        self.tick()?;
        match stmt {
            Stmt::Html(text) => self.out.write(text)?,
            Stmt::Echo(values) => {
                for expr in values {
                    let text = self.eval(expr)?.to_output()?;
                    self.out.write(&text)?;
                }
            }
            Stmt::Assign(name, expr) => {
                let value = self.eval(expr)?;
                self.vars.insert(name.clone(), value);
            }
            Stmt::If {
                branches,
                otherwise,
            } => {
                for (cond, body) in branches {
                    if self.eval(cond)?.truthy() {
                        return self.block(body);
                    }
                }
                if let Some(body) = otherwise {
                    return self.block(body);
                }
            }
            Stmt::Block(body) => return self.block(body),
            Stmt::Expr(expr) => {
                self.eval(expr)?;
            }
            Stmt::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Null,
                };
                return Ok(Flow::Return(value));
            }
            Stmt::Empty => {}
        }
        Ok(Flow::Normal)
    }

    fn lookup(&self, name: &str) -> Value {
        match self.vars.get(name) {
            Some(value) => value.clone(),
            None => {
                debug!("Undefined variable ${}", name);
                Value::Null
            }
        }
    }

    fn index(&self, base: Value, key: &Value) -> Result<Value, ScriptError> {
        let key = key.to_output()?;
        match base {
            Value::Map(mut map) => Ok(map.remove(&key).unwrap_or_else(|| {
                debug!("Undefined array key '{}'", key);
                Value::Null
            })),
            Value::Null => Ok(Value::Null),
            other => Err(ScriptError::Type(format!(
                "cannot index a {} with '{}'",
                other.type_name(),
                key
            ))),
        }
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, ScriptError> {
        self.tick()?;
        match expr {
            Expr::Lit(value) => Ok(value.clone()),
            Expr::Var(name) => Ok(self.lookup(name)),
            Expr::Interp(parts) => {
                let mut text = String::new();
                for part in parts {
                    match part {
                        StrPart::Lit(lit) => text.push_str(lit),
                        StrPart::Var { name, key } => {
                            let mut value = self.lookup(name);
                            if let Some(key) = key {
                                value = self.index(value, &Value::Str(key.clone()))?;
                            }
                            text.push_str(&value.to_output()?);
                        }
                    }
                }
                Ok(Value::Str(text))
            }
            Expr::Index(base, key) => {
                let base = self.eval(base)?;
                let key = self.eval(key)?;
                self.index(base, &key)
            }
            Expr::Not(inner) => Ok(Value::Bool(!self.eval(inner)?.truthy())),
            Expr::Binary(op, left, right) => self.binary(op, left, right),
            Expr::Call { name, args, line } => {
                let helpers = self.helpers;
                let helper = helpers.get(name).ok_or_else(|| ScriptError::UnknownHelper {
                    name: name.clone(),
                    line: *line,
                })?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg)?);
                }
                helper.call(&values, &mut self.out)
            }
        }
    }

    fn binary(&mut self, op: &BinOp, left: &Expr, right: &Expr) -> Result<Value, ScriptError> {
        match op {
            BinOp::And => {
                if !self.eval(left)?.truthy() {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(self.eval(right)?.truthy()))
            }
            BinOp::Or => {
                if self.eval(left)?.truthy() {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(self.eval(right)?.truthy()))
            }
            BinOp::Concat => {
                let mut text = self.eval(left)?.to_output()?;
                text.push_str(&self.eval(right)?.to_output()?);
                Ok(Value::Str(text))
            }
            BinOp::Eq => {
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                Ok(Value::Bool(l.loose_eq(&r)?))
            }
            BinOp::NotEq => {
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                Ok(Value::Bool(!l.loose_eq(&r)?))
            }
        }
    }
}
