//! WAF Core — Rule Engine and Request Body Processor
//!
//! This crate provides the hot-path pieces of an in-process Web Application
//! Firewall: the request body processor (URI decoding, form splitting,
//! multipart parsing) and the rule engine (variables, operators, actions,
//! evaluator, interceptor) that runs against a loaded [`types::RuleEngine`].
//!
//! # Architecture
//!
//! A `RuleEngine` is built once (by the `waf-loader` crate, from text
//! configuration directives) and is read-only for the lifetime of the
//! process. Each request gets its own `RequestContext`, populated by the
//! body processor and consumed by `evaluator::run_phase`. There is no
//! process-wide mutable state besides the four atomics in `counters`.
//!
//! # Modules
//!
//! - `uri`: percent-decoding (C1)
//! - `formsplit`: `k=v&k=v` splitting (C2)
//! - `multipart`: `multipart/form-data` parsing (C3)
//! - `types`: data model shared across the engine
//! - `variables`: named lazy variable resolution (C4)
//! - `operators`: `str`/`regex`/`eq`/`gt` predicates (C5)
//! - `actions`: rule metadata mutation from action tokens (C6)
//! - `transforms`: transformation registry (ships empty)
//! - `pipeline`: wires C1-C3 together ahead of evaluation
//! - `evaluator`: per-phase rule walk with chain support (C8)
//! - `interceptor`: winning-rule action + block list (C9)
//! - `counters`: process-wide atomic statistics
//! - `error`: error types

pub mod actions;
pub mod counters;
pub mod error;
pub mod evaluator;
pub mod formsplit;
pub mod interceptor;
pub mod multipart;
pub mod operators;
pub mod pipeline;
pub mod transforms;
pub mod types;
pub mod uri;
pub mod variables;

pub use counters::Counters;
pub use error::{EvalError, ProcessBodyError};
pub use evaluator::{run_phase, PhaseOutcome};
pub use interceptor::{intercept, process_block_list, InterceptOutcome};
pub use pipeline::populate_request;
pub use types::{
    ActionLevel, BlockListEntry, Method, Phase, RequestContext, RequestSource, Rule, RuleEngine,
    RuleOutcome,
};
pub use variables::VariableRegistry;
