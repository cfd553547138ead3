//! Operator registry (C5): parses an operator token from a `rule`
//! directive into a [`CompiledOperator`] and executes it against a
//! candidate variable value.
//!
//! Ports `yy_sec_waf_re_operator.c`'s `str`/`regex`/`eq`/`gt` pairs. A
//! leading `!` negates the operator's result before it reaches the rule
//! (applied by the caller via `op_negative`, not baked into the compiled
//! operator itself, so the same `CompiledOperator` can be reused either
//! way).

use regex::bytes::RegexBuilder;

use crate::types::CompiledOperator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OperatorParseError {
    #[error("empty operator token")]
    Empty,
    #[error("unknown operator name")]
    UnknownOperator,
    #[error("operator is missing its `:` parameter")]
    MissingParam,
    #[error("invalid regex parameter")]
    InvalidRegex,
    #[error("`gt` parameter is not a valid base-10 unsigned integer")]
    InvalidGtParam,
    #[error("`{0}:` parameter must not be empty")]
    EmptyParameter(&'static str),
}

/// Parse `"<op>:<param>"`, optionally prefixed with `!`, into a negation
/// flag and a compiled operator. `op` is one of `str`, `regex`, `eq`,
/// `gt`.
pub fn parse_operator(token: &str) -> Result<(bool, CompiledOperator), OperatorParseError> {
    if token.is_empty() {
        return Err(OperatorParseError::Empty);
    }

    let (negate, rest) = match token.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, token),
    };

    let (name, param) = rest
        .split_once(':')
        .ok_or(OperatorParseError::MissingParam)?;

    let op = match name {
        "str" => {
            if param.is_empty() {
                return Err(OperatorParseError::EmptyParameter("str"));
            }
            CompiledOperator::Str(param.as_bytes().to_vec())
        }
        "regex" => {
            if param.is_empty() {
                return Err(OperatorParseError::EmptyParameter("regex"));
            }
            let re = RegexBuilder::new(param)
                .case_insensitive(true)
                .multi_line(true)
                .build()
                .map_err(|_| OperatorParseError::InvalidRegex)?;
            CompiledOperator::Regex(std::sync::Arc::new(re))
        }
        "eq" => CompiledOperator::Eq(param.as_bytes().to_vec()),
        "gt" => {
            let n: u64 = param.parse().map_err(|_| OperatorParseError::InvalidGtParam)?;
            CompiledOperator::Gt(n)
        }
        _ => return Err(OperatorParseError::UnknownOperator),
    };

    Ok((negate, op))
}

/// Outcome of running a compiled operator against one candidate value,
/// before negation. `Error` covers an operator that cannot be evaluated
/// against the value it was given (e.g. `gt` against non-numeric bytes) —
/// it is distinct from a clean `NoMatch` and propagates to the caller as
/// an [`crate::error::EvalError`] rather than being silently treated as
/// a miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Match,
    NoMatch,
    Error,
}

impl MatchOutcome {
    fn from_bool(b: bool) -> Self {
        if b {
            Self::Match
        } else {
            Self::NoMatch
        }
    }
}

/// Execute a compiled operator against `value`, before negation.
pub fn execute(op: &CompiledOperator, value: &[u8]) -> MatchOutcome {
    match op {
        CompiledOperator::Str(needle) => MatchOutcome::from_bool(
            !needle.is_empty() && value.windows(needle.len()).any(|w| w == needle.as_slice()),
        ),
        CompiledOperator::Regex(re) => MatchOutcome::from_bool(re.is_match(value)),
        CompiledOperator::Eq(expected) => MatchOutcome::from_bool(value == expected.as_slice()),
        CompiledOperator::Gt(threshold) => match std::str::from_utf8(value)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            Some(n) => MatchOutcome::from_bool(n > *threshold),
            None => MatchOutcome::Error,
        },
    }
}
