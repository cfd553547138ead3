//! WAF Configuration Loader (C7)
//!
//! Parses the four text directives a rule file is built from —
//! `rule`, `block_list`, `denied_url`, `conn_processor` — into a
//! [`waf_core::RuleEngine`]. Loading happens once at startup; a
//! malformed line is a fatal [`LoaderError`], never a runtime surprise.

pub mod error;
pub mod parser;

pub use error::LoaderError;
pub use parser::load_engine;
