//! Fatal configuration-load errors (§7). None of these can occur after
//! load — a `RuleEngine` is immutable and known-good once built.

use waf_core::{actions::ActionParseError, operators::OperatorParseError};

#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("line {line}: unknown directive `{directive}`")]
    UnknownDirective { line: usize, directive: String },

    #[error("line {line}: `rule` directive needs at least a variable list and an operator")]
    IncompleteRuleDirective { line: usize },

    #[error("line {line}: unknown variable `{name}`")]
    UnknownVariable { line: usize, name: String },

    #[error("line {line}: invalid operator: {source}")]
    InvalidOperator {
        line: usize,
        #[source]
        source: OperatorParseError,
    },

    #[error("line {line}: invalid action: {source}")]
    InvalidAction {
        line: usize,
        #[source]
        source: ActionParseError,
    },

    #[error("line {line}: `block_list` directive needs a `$VARIABLE` and a regex")]
    IncompleteBlockListDirective { line: usize },

    #[error("line {line}: block_list variable `{name}` must be prefixed with `$`")]
    BlockListVariableMissingSigil { line: usize, name: String },

    #[error("line {line}: block_list regex is invalid: {source}")]
    InvalidBlockListRegex {
        line: usize,
        #[source]
        source: regex::Error,
    },

    #[error("line {line}: `denied_url` directive needs a file path")]
    IncompleteDeniedUrlDirective { line: usize },

    #[error("failed to read denied_url file `{path}`: {source}")]
    DeniedUrlFileUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("rule at line {line} has no id; every rule needs an `id:` action")]
    RuleMissingId { line: usize },
}
