//! Sandboxed evaluator for the legacy page-body language.
//!
//! Supports the subset hand-authored bodies use: open/close tags with inline
//! markup, `echo`/`print`, assignment, `if`/`elseif`/`else` (braced and
//! `:`/`endif` forms), string interpolation, `.`, `==`, `!=`, `!`, `&&`, `||`
//! and calls into the [`HelperRegistry`]. There is no file, network or
//! database access from a body.

use std::time::Instant;

use thiserror::Error;

use crate::render::helpers::HelperRegistry;

pub mod interp;
pub mod lexer;
pub mod output;
pub mod parser;
pub mod value;

pub use interp::Interpreter;
pub use output::Output;
pub use value::Value;

/// Name of the page metadata map inside a body
pub const PAGE_INFO_VAR: &str = "PAGE_INFO";

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("Call to undefined function {name}() on line {line}")]
    UnknownHelper { name: String, line: usize },

    #[error("Type error: {0}")]
    Type(String),

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error("Step budget of {0} exhausted")]
    StepLimit(u64),

    #[error("Output exceeded {0} bytes")]
    OutputLimit(usize),

    #[error("Evaluation deadline passed")]
    Timeout,
}

#[derive(Debug, Clone)]
pub struct Limits {
    pub max_steps: u64,
    pub max_output_bytes: usize,
    pub deadline: Option<Instant>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_steps: 100_000,
            max_output_bytes: 2 * 1024 * 1024,
            deadline: None,
        }
    }
}

#[derive(Debug)]
pub struct Evaluation {
    pub output: String,
    /// Value of a top-level `return`, null when the body ran to the end
    pub returned: Value,
}

/// Evaluate a body in a fresh scope with `$PAGE_INFO` bound
pub fn evaluate(
    body: &str,
    page_info: &serde_json::Value,
    helpers: &HelperRegistry,
    limits: &Limits,
) -> Result<Evaluation, ScriptError> {
    let program = parser::parse(lexer::tokenize(body)?)?;

    let mut interpreter = Interpreter::new(helpers, limits);
    interpreter.set_var(PAGE_INFO_VAR, Value::from_json(page_info));
    let returned = interpreter.run(&program)?;

    Ok(Evaluation {
        output: interpreter.into_output(),
        returned,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(body: &str) -> Result<String, ScriptError> {
        let info = json!({"path": "about", "title": "About us", "page_id": 3, "secure": false});
        evaluate(body, &info, &HelperRegistry::legacy(), &Limits::default()).map(|e| e.output)
    }

    #[test]
    fn empty_body_renders_empty() {
        assert_eq!(run("").unwrap(), "");
    }

    #[test]
    fn markup_and_page_info() {
        let out = run("?>\n<h1><?= $PAGE_INFO['title'] ?></h1>\n<?php echo \"at {$PAGE_INFO['path']}\";").unwrap();
        assert_eq!(out, "<h1>About us</h1>\nat about");
    }

    #[test]
    fn newline_after_close_tag_is_swallowed() {
        assert_eq!(run("echo 'a'; ?>\nb").unwrap(), "ab");
        assert_eq!(run("echo 'a'; ?>\n\nb").unwrap(), "a\nb");
    }

    #[test]
    fn gallery_shim_in_body() {
        let out = run("?><div><?php showGallery(42); ?></div>").unwrap();
        assert_eq!(out, "<div><!--vps:embed:gallery:42--></div>");
    }

    #[test]
    fn conditionals_and_variables() {
        let body = r#"
            $greeting = 'Hello';
            if ($PAGE_INFO['path'] == 'about' && !$PAGE_INFO['secure']) {
                echo $greeting . ', ' . $PAGE_INFO['title'];
            } elseif ($missing) {
                echo 'nope';
            } else {
                echo 'other';
            }
        "#;
        assert_eq!(run(body).unwrap(), "Hello, About us");
    }

    #[test]
    fn alternative_syntax() {
        let body = "if ($PAGE_INFO['page_id'] != 3): ?>wrong<?php else: ?>right<?php endif; ?>";
        assert_eq!(run(body).unwrap(), "right");
    }

    #[test]
    fn undefined_values_are_null() {
        assert_eq!(run("echo $nothing, $PAGE_INFO['nope'], $nothing['deeper'];").unwrap(), "");
    }

    #[test]
    fn return_stops_evaluation() {
        let info = json!({});
        let eval = evaluate("echo 'a'; return 5; echo 'b';", &info, &HelperRegistry::legacy(), &Limits::default())
            .unwrap();
        assert_eq!(eval.output, "a");
        assert_eq!(eval.returned, Value::Int(5));
    }

    #[test]
    fn faults() {
        assert!(matches!(run("include('x.php');"), Err(ScriptError::UnknownHelper { .. })));
        assert!(matches!(run("echo $PAGE_INFO;"), Err(ScriptError::Type(_))));
        assert!(matches!(run("echo 'unterminated"), Err(ScriptError::Syntax { .. })));
        assert!(matches!(run("<p>not code</p>"), Err(ScriptError::Syntax { .. })));
    }

    #[test]
    fn step_budget_is_enforced() {
        let limits = Limits {
            max_steps: 10,
            ..Limits::default()
        };
        let body = "echo 1; ".repeat(20);
        let err = evaluate(&body, &json!({}), &HelperRegistry::legacy(), &limits).unwrap_err();
        assert!(matches!(err, ScriptError::StepLimit(10)));
    }

    #[test]
    fn output_budget_is_enforced() {
        let limits = Limits {
            max_output_bytes: 8,
            ..Limits::default()
        };
        let err = evaluate("echo '123456789';", &json!({}), &HelperRegistry::legacy(), &limits)
            .unwrap_err();
        assert!(matches!(err, ScriptError::OutputLimit(8)));
    }

    #[test]
    fn deadline_is_enforced() {
        let limits = Limits {
            deadline: Some(Instant::now()),
            ..Limits::default()
        };
        let body = "echo 1; ".repeat(300);
        let err = evaluate(&body, &json!({}), &HelperRegistry::legacy(), &limits).unwrap_err();
        assert!(matches!(err, ScriptError::Timeout));
    }

    #[test]
    fn deeply_nested_body_is_a_syntax_error() {
        let body = format!("echo {}1{};", "(".repeat(200_000), ")".repeat(200_000));
        match run(&body) {
            Err(ScriptError::Syntax { message, .. }) => assert_eq!(message, "nesting too deep"),
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn scopes_do_not_leak_between_evaluations() {
        let helpers = HelperRegistry::legacy();
        evaluate("$leak = 'x';", &json!({}), &helpers, &Limits::default()).unwrap();
        let eval = evaluate("echo $leak;", &json!({}), &helpers, &Limits::default()).unwrap();
        assert_eq!(eval.output, "");
    }
}
