// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagehand contributors

//! Condition expressions over build metadata
//!
//! Stages may carry a `condition:` gating their instantiation, written in the
//! function-call syntax common to hosted CI systems:
//!
//! ```text
//! and(succeeded(), startsWith(variables['Build.SourceBranch'], 'refs/tags/'))
//! ```
//!
//! Expressions evaluate against a fixed set of build-metadata fields plus the
//! variables declared in the descriptor. String comparisons are
//! case-insensitive, matching hosted-CI convention.

use std::collections::{HashMap, HashSet};

use crate::errors::StagehandError;
use crate::trigger::BuildEvent;

/// Metadata fields every condition may reference
pub const METADATA_FIELDS: [&str; 4] = [
    "Build.Reason",
    "Build.SourceBranch",
    "Build.SourceBranchName",
    "Build.DefaultBranch",
];

/// A parsed condition expression
#[derive(Debug, Clone)]
pub struct Condition {
    source: String,
    root: Expr,
}

/// Expression values
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    Str(String),
}

impl Value {
    fn as_comparable(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Str(s) => s.to_lowercase(),
        }
    }
}

#[derive(Debug, Clone)]
enum Expr {
    Literal(Value),
    Variable(String),
    Call(Func, Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Func {
    And,
    Or,
    Not,
    Eq,
    Ne,
    StartsWith,
    EndsWith,
    Contains,
    Succeeded,
}

impl Func {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "and" => Some(Self::And),
            "or" => Some(Self::Or),
            "not" => Some(Self::Not),
            "eq" => Some(Self::Eq),
            "ne" => Some(Self::Ne),
            "startsWith" => Some(Self::StartsWith),
            "endsWith" => Some(Self::EndsWith),
            "contains" => Some(Self::Contains),
            "succeeded" => Some(Self::Succeeded),
            _ => None,
        }
    }

    fn check_arity(&self, len: usize) -> Result<(), String> {
        let ok = match self {
            Self::And | Self::Or => len >= 2,
            Self::Not => len == 1,
            Self::Eq | Self::Ne | Self::StartsWith | Self::EndsWith | Self::Contains => len == 2,
            Self::Succeeded => len == 0,
        };
        if ok {
            Ok(())
        } else {
            Err(format!("wrong number of arguments ({})", len))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Lexer
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Str(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
}

struct SpannedToken {
    token: Token,
    offset: usize,
}

fn lex(input: &str) -> Result<Vec<SpannedToken>, StagehandError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(i, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' | ')' | '[' | ']' | ',' => {
                let token = match c {
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    '[' => Token::LBracket,
                    ']' => Token::RBracket,
                    _ => Token::Comma,
                };
                tokens.push(SpannedToken { token, offset: i });
                chars.next();
            }
            '\'' => {
                chars.next();
                let mut value = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '\'' {
                        closed = true;
                        break;
                    }
                    value.push(c);
                }
                if !closed {
                    return Err(StagehandError::condition_parse(
                        input,
                        i,
                        "unterminated string literal",
                    ));
                }
                tokens.push(SpannedToken { token: Token::Str(value), offset: i });
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut end = i;
                while let Some(&(j, c)) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                        end = j + c.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(SpannedToken {
                    token: Token::Ident(input[i..end].to_string()),
                    offset: i,
                });
            }
            other => {
                return Err(StagehandError::condition_parse(
                    input,
                    i,
                    format!("unexpected character '{}'", other),
                ));
            }
        }
    }

    Ok(tokens)
}

// ─────────────────────────────────────────────────────────────────────────────
// Parser
// ─────────────────────────────────────────────────────────────────────────────

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str, tokens: Vec<SpannedToken>) -> Self {
        Self { input, tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&SpannedToken> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&SpannedToken> {
        let i = self.pos;
        if i < self.tokens.len() {
            self.pos += 1;
            Some(&self.tokens[i])
        } else {
            None
        }
    }

    fn error_at(&self, offset: usize, message: impl Into<String>) -> StagehandError {
        StagehandError::condition_parse(self.input, offset, message)
    }

    fn end_offset(&self) -> usize {
        self.input.len()
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), StagehandError> {
        match self.next() {
            Some(t) if t.token == expected => Ok(()),
            Some(t) => {
                let offset = t.offset;
                Err(self.error_at(offset, format!("expected {}", what)))
            }
            None => Err(self.error_at(self.end_offset(), format!("expected {}", what))),
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, StagehandError> {
        let Some(t) = self.next() else {
            return Err(self.error_at(self.end_offset(), "expected expression"));
        };
        let offset = t.offset;

        match t.token.clone() {
            Token::Str(s) => Ok(Expr::Literal(Value::Str(s))),
            Token::Ident(name) => match name.as_str() {
                "true" => Ok(Expr::Literal(Value::Bool(true))),
                "false" => Ok(Expr::Literal(Value::Bool(false))),
                "variables" => self.parse_variable(),
                _ => self.parse_call(&name, offset),
            },
            _ => Err(self.error_at(offset, "expected expression")),
        }
    }

    /// `variables['Name']`
    fn parse_variable(&mut self) -> Result<Expr, StagehandError> {
        self.expect(Token::LBracket, "'[' after variables")?;
        let name = match self.next() {
            Some(SpannedToken { token: Token::Str(s), .. }) => s.clone(),
            Some(t) => {
                let offset = t.offset;
                return Err(self.error_at(offset, "expected quoted variable name"));
            }
            None => {
                return Err(self.error_at(self.end_offset(), "expected quoted variable name"));
            }
        };
        self.expect(Token::RBracket, "']' after variable name")?;
        Ok(Expr::Variable(name))
    }

    /// `func(arg, ...)`
    fn parse_call(&mut self, name: &str, offset: usize) -> Result<Expr, StagehandError> {
        let Some(func) = Func::from_name(name) else {
            return Err(self.error_at(offset, format!("unknown function '{}'", name)));
        };

        self.expect(Token::LParen, "'(' after function name")?;

        let mut args = Vec::new();
        if matches!(self.peek().map(|t| &t.token), Some(Token::RParen)) {
            self.next();
        } else {
            loop {
                args.push(self.parse_expr()?);
                match self.next() {
                    Some(SpannedToken { token: Token::Comma, .. }) => continue,
                    Some(SpannedToken { token: Token::RParen, .. }) => break,
                    Some(t) => {
                        let o = t.offset;
                        return Err(self.error_at(o, "expected ',' or ')'"));
                    }
                    None => {
                        return Err(self.error_at(self.end_offset(), "expected ',' or ')'"));
                    }
                }
            }
        }

        func.check_arity(args.len())
            .map_err(|m| self.error_at(offset, format!("{}: {}", name, m)))?;

        Ok(Expr::Call(func, args))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Evaluation
// ─────────────────────────────────────────────────────────────────────────────

/// Lookup context for condition evaluation
pub struct EvalContext<'a> {
    pub event: &'a BuildEvent,
    pub variables: &'a HashMap<String, String>,
}

impl EvalContext<'_> {
    fn lookup(&self, field: &str, expression: &str) -> Result<Value, StagehandError> {
        let value = match field {
            "Build.Reason" => Some(self.event.reason.to_string()),
            "Build.SourceBranch" => Some(self.event.source_ref.clone()),
            "Build.SourceBranchName" => Some(self.event.short_name().to_string()),
            "Build.DefaultBranch" => Some(self.event.default_branch_ref()),
            other => self.variables.get(other).cloned(),
        };

        value.map(Value::Str).ok_or_else(|| StagehandError::UnknownMetadataField {
            field: field.to_string(),
            expression: expression.to_string(),
        })
    }
}

impl Condition {
    /// Parse a condition expression
    pub fn parse(input: &str) -> Result<Self, StagehandError> {
        let tokens = lex(input)?;
        let mut parser = Parser::new(input, tokens);
        let root = parser.parse_expr()?;

        if let Some(t) = parser.peek() {
            let offset = t.offset;
            return Err(StagehandError::condition_parse(
                input,
                offset,
                "trailing input after expression",
            ));
        }

        Ok(Self {
            source: input.to_string(),
            root,
        })
    }

    /// The original expression text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against an event; the root must produce a boolean
    pub fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<bool, StagehandError> {
        match self.eval_expr(&self.root, ctx)? {
            Value::Bool(b) => Ok(b),
            Value::Str(_) => Err(StagehandError::ConditionEval {
                expression: self.source.clone(),
                message: "condition must evaluate to a boolean".to_string(),
            }),
        }
    }

    fn eval_expr(&self, expr: &Expr, ctx: &EvalContext<'_>) -> Result<Value, StagehandError> {
        match expr {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Variable(name) => ctx.lookup(name, &self.source),
            Expr::Call(func, args) => self.eval_call(*func, args, ctx),
        }
    }

    fn eval_call(
        &self,
        func: Func,
        args: &[Expr],
        ctx: &EvalContext<'_>,
    ) -> Result<Value, StagehandError> {
        match func {
            Func::And => {
                for arg in args {
                    if !self.eval_bool(arg, ctx)? {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }
            Func::Or => {
                for arg in args {
                    if self.eval_bool(arg, ctx)? {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
            Func::Not => Ok(Value::Bool(!self.eval_bool(&args[0], ctx)?)),
            Func::Eq => {
                let a = self.eval_expr(&args[0], ctx)?;
                let b = self.eval_expr(&args[1], ctx)?;
                Ok(Value::Bool(a.as_comparable() == b.as_comparable()))
            }
            Func::Ne => {
                let a = self.eval_expr(&args[0], ctx)?;
                let b = self.eval_expr(&args[1], ctx)?;
                Ok(Value::Bool(a.as_comparable() != b.as_comparable()))
            }
            Func::StartsWith => {
                let a = self.eval_expr(&args[0], ctx)?;
                let b = self.eval_expr(&args[1], ctx)?;
                Ok(Value::Bool(a.as_comparable().starts_with(&b.as_comparable())))
            }
            Func::EndsWith => {
                let a = self.eval_expr(&args[0], ctx)?;
                let b = self.eval_expr(&args[1], ctx)?;
                Ok(Value::Bool(a.as_comparable().ends_with(&b.as_comparable())))
            }
            Func::Contains => {
                let a = self.eval_expr(&args[0], ctx)?;
                let b = self.eval_expr(&args[1], ctx)?;
                Ok(Value::Bool(a.as_comparable().contains(&b.as_comparable())))
            }
            // Dependency ordering is already enforced by the stage DAG; at plan
            // time upstream stages are assumed to have succeeded.
            Func::Succeeded => Ok(Value::Bool(true)),
        }
    }

    fn eval_bool(&self, expr: &Expr, ctx: &EvalContext<'_>) -> Result<bool, StagehandError> {
        match self.eval_expr(expr, ctx)? {
            Value::Bool(b) => Ok(b),
            Value::Str(s) => Err(StagehandError::ConditionEval {
                expression: self.source.clone(),
                message: format!("expected a boolean, got string '{}'", s),
            }),
        }
    }

    /// Names of all variables the expression references, in first-use order
    pub fn referenced_fields(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut fields = Vec::new();
        collect_fields(&self.root, &mut seen, &mut fields);
        fields
    }

    /// Static check that every referenced field is a known metadata field or a
    /// declared pipeline variable
    pub fn validate_fields(
        &self,
        declared_variables: &HashSet<&str>,
    ) -> Result<(), StagehandError> {
        for field in self.referenced_fields() {
            let known = METADATA_FIELDS.contains(&field.as_str())
                || declared_variables.contains(field.as_str());
            if !known {
                return Err(StagehandError::UnknownMetadataField {
                    field,
                    expression: self.source.clone(),
                });
            }
        }
        Ok(())
    }
}

fn collect_fields(expr: &Expr, seen: &mut HashSet<String>, out: &mut Vec<String>) {
    match expr {
        Expr::Literal(_) => {}
        Expr::Variable(name) => {
            if seen.insert(name.clone()) {
                out.push(name.clone());
            }
        }
        Expr::Call(_, args) => {
            for arg in args {
                collect_fields(arg, seen, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trigger::BuildReason;

    fn ctx_for<'a>(event: &'a BuildEvent, vars: &'a HashMap<String, String>) -> EvalContext<'a> {
        EvalContext { event, variables: vars }
    }

    fn push_event(source_ref: &str) -> BuildEvent {
        BuildEvent::new(BuildReason::Push, source_ref, "main").unwrap()
    }

    #[test]
    fn test_eq_on_build_reason() {
        let cond = Condition::parse("eq(variables['Build.Reason'], 'Push')").unwrap();
        let event = push_event("refs/heads/main");
        let vars = HashMap::new();
        assert!(cond.evaluate(&ctx_for(&event, &vars)).unwrap());
    }

    #[test]
    fn test_starts_with_tag_prefix() {
        let cond =
            Condition::parse("startsWith(variables['Build.SourceBranch'], 'refs/tags/')").unwrap();
        let vars = HashMap::new();

        let tag = push_event("refs/tags/v1.0");
        assert!(cond.evaluate(&ctx_for(&tag, &vars)).unwrap());

        let branch = push_event("refs/heads/main");
        assert!(!cond.evaluate(&ctx_for(&branch, &vars)).unwrap());
    }

    #[test]
    fn test_nested_and_or_not() {
        let cond = Condition::parse(
            "and(succeeded(), or(eq(variables['Build.Reason'], 'Schedule'), \
             not(eq(variables['Build.SourceBranch'], variables['Build.DefaultBranch']))))",
        )
        .unwrap();
        let vars = HashMap::new();

        // Push to default branch: inner or() is false
        let on_default = push_event("refs/heads/main");
        assert!(!cond.evaluate(&ctx_for(&on_default, &vars)).unwrap());

        // Push to another branch: not(eq(...)) is true
        let on_branch = push_event("refs/heads/release-1.x");
        assert!(cond.evaluate(&ctx_for(&on_branch, &vars)).unwrap());
    }

    #[test]
    fn test_pipeline_variable_lookup() {
        let cond = Condition::parse("eq(variables['CI_NAME'], 'stagehand')").unwrap();
        let event = push_event("refs/heads/main");
        let mut vars = HashMap::new();
        vars.insert("CI_NAME".to_string(), "stagehand".to_string());
        assert!(cond.evaluate(&ctx_for(&event, &vars)).unwrap());
    }

    #[test]
    fn test_string_comparison_is_case_insensitive() {
        let cond = Condition::parse("eq(variables['Build.Reason'], 'push')").unwrap();
        let event = push_event("refs/heads/main");
        let vars = HashMap::new();
        assert!(cond.evaluate(&ctx_for(&event, &vars)).unwrap());
    }

    #[test]
    fn test_unknown_field_is_an_error() {
        let cond = Condition::parse("eq(variables['Build.Nope'], 'x')").unwrap();
        let event = push_event("refs/heads/main");
        let vars = HashMap::new();
        assert!(matches!(
            cond.evaluate(&ctx_for(&event, &vars)),
            Err(StagehandError::UnknownMetadataField { .. })
        ));
    }

    #[test]
    fn test_validate_fields_static() {
        let cond = Condition::parse("eq(variables['MY_FLAG'], 'on')").unwrap();

        let mut declared = HashSet::new();
        assert!(cond.validate_fields(&declared).is_err());

        declared.insert("MY_FLAG");
        assert!(cond.validate_fields(&declared).is_ok());
    }

    #[test]
    fn test_unknown_function() {
        let result = Condition::parse("always()");
        assert!(matches!(
            result,
            Err(StagehandError::ConditionParse { .. })
        ));
    }

    #[test]
    fn test_wrong_arity() {
        let result = Condition::parse("eq('a')");
        assert!(matches!(
            result,
            Err(StagehandError::ConditionParse { .. })
        ));
    }

    #[test]
    fn test_unterminated_string() {
        let result = Condition::parse("eq(variables['Build.Reason'], 'Push");
        assert!(matches!(
            result,
            Err(StagehandError::ConditionParse { .. })
        ));
    }

    #[test]
    fn test_trailing_input_rejected() {
        let result = Condition::parse("succeeded() succeeded()");
        assert!(matches!(
            result,
            Err(StagehandError::ConditionParse { .. })
        ));
    }

    #[test]
    fn test_string_root_is_not_a_condition() {
        let cond = Condition::parse("'just a string'").unwrap();
        let event = push_event("refs/heads/main");
        let vars = HashMap::new();
        assert!(matches!(
            cond.evaluate(&ctx_for(&event, &vars)),
            Err(StagehandError::ConditionEval { .. })
        ));
    }

    #[test]
    fn test_referenced_fields_dedup_in_order() {
        let cond = Condition::parse(
            "and(eq(variables['Build.Reason'], 'Push'), \
             ne(variables['Build.SourceBranch'], variables['Build.Reason']))",
        )
        .unwrap();
        assert_eq!(
            cond.referenced_fields(),
            vec!["Build.Reason".to_string(), "Build.SourceBranch".to_string()]
        );
    }
}
