use regex::Regex;
use serde_json::Value;

use crate::error::{Error, Result};

/// Ops available to `assert_element`.
#[derive(Debug, Clone, Copy)]
pub enum ElementOp {
    Exists,
    NotExists,
    Visible,
    Hidden,
}

impl ElementOp {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "exists" => Ok(Self::Exists),
            "not_exists" => Ok(Self::NotExists),
            "visible" => Ok(Self::Visible),
            "hidden" => Ok(Self::Hidden),
            other => Err(Error::InvalidArguments(format!("unknown element op: {other}"))),
        }
    }

    /// Whether a read failure (element lookup errored out) should be
    /// treated as passing, per spec.md §4.6.
    pub fn passes_on_read_failure(self) -> bool {
        matches!(self, Self::NotExists | Self::Hidden)
    }

    pub fn evaluate(self, exists: bool, visible: bool) -> bool {
        match self {
            Self::Exists => exists,
            Self::NotExists => !exists,
            Self::Visible => exists && visible,
            Self::Hidden => !exists || !visible,
        }
    }
}

/// Ops available to `assert_text` / `assert_url`.
#[derive(Debug, Clone, Copy)]
pub enum TextOp {
    Contains,
    Equals,
    Matches,
}

impl TextOp {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "contains" => Ok(Self::Contains),
            "equals" => Ok(Self::Equals),
            "matches" => Ok(Self::Matches),
            other => Err(Error::InvalidArguments(format!("unknown text op: {other}"))),
        }
    }

    pub fn evaluate(self, actual: &str, expected: &str) -> Result<bool> {
        match self {
            Self::Contains => Ok(actual.contains(expected)),
            Self::Equals => Ok(actual == expected),
            Self::Matches => {
                let re = Regex::new(expected)
                    .map_err(|err| Error::InvalidArguments(format!("bad regex: {err}")))?;
                Ok(re.is_match(actual))
            }
        }
    }
}

/// Ops available to `assert_count`.
#[derive(Debug, Clone, Copy)]
pub enum CountOp {
    Equals,
    GreaterThan,
    LessThan,
    AtLeast,
    AtMost,
}

impl CountOp {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "equals" => Ok(Self::Equals),
            "greaterThan" => Ok(Self::GreaterThan),
            "lessThan" => Ok(Self::LessThan),
            "atLeast" => Ok(Self::AtLeast),
            "atMost" => Ok(Self::AtMost),
            other => Err(Error::InvalidArguments(format!("unknown count op: {other}"))),
        }
    }

    pub fn evaluate(self, actual: i64, expected: i64) -> bool {
        match self {
            Self::Equals => actual == expected,
            Self::GreaterThan => actual > expected,
            Self::LessThan => actual < expected,
            Self::AtLeast => actual >= expected,
            Self::AtMost => actual <= expected,
        }
    }
}

/// Truncate a string the same way the audit log does, so assertion results
/// returned to the agent never leak an unbounded field.
pub fn truncate_for_safety(value: &str) -> String {
    if value.chars().count() <= act_protocol::AUDIT_MAX_STRING_LEN {
        return value.to_string();
    }
    let truncated: String = value.chars().take(act_protocol::AUDIT_MAX_STRING_LEN).collect();
    format!("{truncated}{}", act_protocol::AUDIT_TRUNCATION_MARKER)
}

pub fn as_str<'a>(params: &'a Value, field: &str) -> Result<&'a str> {
    params
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::InvalidArguments(format!("missing or non-string field: {field}")))
}

pub fn as_i64(params: &Value, field: &str) -> Result<i64> {
    params
        .get(field)
        .and_then(Value::as_i64)
        .ok_or_else(|| Error::InvalidArguments(format!("missing or non-integer field: {field}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_op_read_failure_semantics() {
        assert!(ElementOp::NotExists.passes_on_read_failure());
        assert!(ElementOp::Hidden.passes_on_read_failure());
        assert!(!ElementOp::Exists.passes_on_read_failure());
        assert!(!ElementOp::Visible.passes_on_read_failure());
    }

    #[test]
    fn text_op_matches_uses_regex() {
        assert!(TextOp::Matches.evaluate("hello world", "^hello").unwrap());
        assert!(!TextOp::Matches.evaluate("hello world", "^world").unwrap());
    }

    #[test]
    fn count_op_comparisons() {
        assert!(CountOp::AtLeast.evaluate(3, 3));
        assert!(!CountOp::GreaterThan.evaluate(3, 3));
        assert!(CountOp::AtMost.evaluate(2, 3));
    }

    #[test]
    fn truncation_matches_audit_log_rule() {
        let long = "x".repeat(act_protocol::AUDIT_MAX_STRING_LEN + 10);
        let truncated = truncate_for_safety(&long);
        assert!(truncated.ends_with(act_protocol::AUDIT_TRUNCATION_MARKER));
        assert_eq!(truncate_for_safety("short"), "short");
    }
}
