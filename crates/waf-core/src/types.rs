//! Core type definitions for the WAF rule engine.
//!
//! These map directly onto the data model in spec.md §3.

use std::sync::Arc;

use regex::bytes::Regex;

use crate::counters::Counters;
use crate::transforms::TransformKind;

// =============================================================================
// Phase mask
// =============================================================================

bitflags::bitflags! {
    /// Evaluation phase mask. A rule may run in more than one phase.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Phase: u8 {
        const REQUEST_HEADER = 1 << 0;
        const REQUEST_BODY = 1 << 1;
        const RESPONSE_HEADER = 1 << 2;
        const RESPONSE_BODY = 1 << 3;
    }
}

impl Phase {
    /// Parse the four digits `1,2,3,4` used in the `phase:` action token.
    pub fn from_digit(d: u8) -> Option<Self> {
        match d {
            b'1' => Some(Self::REQUEST_HEADER),
            b'2' => Some(Self::REQUEST_BODY),
            b'3' => Some(Self::RESPONSE_HEADER),
            b'4' => Some(Self::RESPONSE_BODY),
            _ => None,
        }
    }

    /// Index into `RuleEngine`'s four per-phase rule lists.
    pub(crate) fn slot(self) -> usize {
        match self {
            Self::REQUEST_HEADER => 0,
            Self::REQUEST_BODY => 1,
            Self::RESPONSE_HEADER => 2,
            Self::RESPONSE_BODY => 3,
            _ => unreachable!("Phase::slot called on a non-singleton phase"),
        }
    }
}

// =============================================================================
// Action level mask
// =============================================================================

bitflags::bitflags! {
    /// What to do with a matched request.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ActionLevel: u8 {
        const LOG = 1 << 0;
        const BLOCK = 1 << 1;
        const ALLOW = 1 << 2;
    }
}

// =============================================================================
// HTTP method (only what the variable resolver needs)
// =============================================================================

/// Request method, as far as the variable resolver cares (`ARGS`'s
/// `raw_string` selection keys off GET vs. POST per spec.md §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Other,
}

// =============================================================================
// Operator registry value (C5)
// =============================================================================

/// A compiled operator parameter, parsed once at load time and executed
/// once per candidate variable value at evaluation time.
#[derive(Debug, Clone)]
pub enum CompiledOperator {
    /// Case-sensitive substring search.
    Str(Vec<u8>),
    /// Case-insensitive, multiline regex.
    Regex(Arc<Regex>),
    /// Byte-exact equality, including length.
    Eq(Vec<u8>),
    /// Base-10 unsigned integer greater-than compare.
    Gt(u64),
}

// =============================================================================
// Rule (§3)
// =============================================================================

/// An immutable rule record, built once at configuration load.
#[derive(Debug, Clone)]
pub struct Rule {
    pub rule_id: u32,
    pub var_indices: Vec<usize>,
    pub operator: CompiledOperator,
    pub op_negative: bool,
    pub transformation: Option<TransformKind>,
    pub phase_mask: Phase,
    pub action_level: ActionLevel,
    pub gids: String,
    pub msg: String,
    /// HTTP status to return on BLOCK; 0 means "use the default (412)".
    pub status: u16,
    /// If true, the *next* rule in the same phase list is ANDed with this one.
    pub is_chain: bool,
}

impl Rule {
    /// Status to actually send on BLOCK: the rule's `status`, or 412 if unset.
    pub fn effective_status(&self) -> u16 {
        if self.status == 0 {
            412
        } else {
            self.status
        }
    }
}

// =============================================================================
// Block list (post-match secondary filter)
// =============================================================================

#[derive(Debug, Clone)]
pub struct BlockListEntry {
    pub variable_index: usize,
    pub regex: Arc<Regex>,
}

// =============================================================================
// Rule engine (global, read-only after load)
// =============================================================================

/// Owns everything built by `waf-loader`: the four per-phase rule lists,
/// the block list, the variable registry, and the loaded denial page.
/// Read-only after construction — safe to share behind an `Arc` across
/// worker threads (see spec.md §5).
pub struct RuleEngine {
    /// Indexed by `Phase::slot()`.
    pub(crate) phase_rules: [Vec<Rule>; 4],
    pub block_list: Vec<BlockListEntry>,
    pub variables: crate::variables::VariableRegistry,
    pub denied_page: Vec<u8>,
    pub conn_processor: bool,
    pub counters: Arc<Counters>,
}

impl RuleEngine {
    /// Assemble a `RuleEngine` from its already-parsed parts. The loader
    /// crate is the only expected caller; `phase_rules` stays private so
    /// nothing outside this crate can hand back a list indexed by
    /// anything other than `Phase::slot()`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        phase_rules: [Vec<Rule>; 4],
        block_list: Vec<BlockListEntry>,
        variables: crate::variables::VariableRegistry,
        denied_page: Vec<u8>,
        conn_processor: bool,
        counters: Arc<Counters>,
    ) -> Self {
        Self {
            phase_rules,
            block_list,
            variables,
            denied_page,
            conn_processor,
            counters,
        }
    }

    pub fn rules_for(&self, phase: Phase) -> &[Rule] {
        &self.phase_rules[phase.slot()]
    }
}

// =============================================================================
// Request source — the crate's only inbound seam (§6)
// =============================================================================

/// What a host HTTP server hands the engine for a single request. This is
/// the narrow trait a host implements; the engine never touches sockets,
/// buffers, or TLS itself.
pub trait RequestSource {
    fn method(&self) -> Method;
    /// Raw (undecoded) query string, without the leading `?`.
    fn uri_args(&self) -> &[u8];
    fn content_type(&self) -> Option<&[u8]>;
    /// `None` if the host spooled the body to disk (`temp_file`) instead of
    /// buffering it — body rules then see `NOT_FOUND` (§5 suspension points).
    fn body(&self) -> Option<&[u8]>;
    fn real_client_ip(&self) -> Option<&str>;
    fn server_ip(&self) -> Option<&str>;
    fn conn_per_ip(&self) -> u32;
}

// =============================================================================
// Request context (§3 per-request mutable state)
// =============================================================================

/// Which buffer the interceptor truncates for its log line: the query
/// string for GET, the raw body for POST (spec.md §3 `raw_string`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawStringSource {
    Args,
    FullBody,
    None,
}

impl Default for RawStringSource {
    fn default() -> Self {
        Self::None
    }
}

/// Per-request mutable state. Owns every byte buffer it produces; dropping
/// it at end-of-request is the "request-scoped arena" (see DESIGN.md).
#[derive(Debug, Default)]
pub struct RequestContext {
    pub args: Vec<u8>,
    pub post_args: Vec<u8>,
    pub post_args_count: u32,

    pub multipart_name: Vec<Vec<u8>>,
    pub multipart_filename: Vec<Vec<u8>>,
    pub multipart_content_type: Vec<Vec<u8>>,

    pub process_body_error: bool,
    pub process_body_error_msg: Option<crate::error::ProcessBodyError>,

    pub full_body: Option<Vec<u8>>,

    pub raw_string: RawStringSource,
    pub real_client_ip: Option<String>,
    pub server_ip: Option<String>,
    pub conn_per_ip: u32,

    /// Snapshot of the winning rule, set on the first MATCH.
    pub matched: bool,
    pub rule_id: u32,
    pub action_level: ActionLevel,
    pub gids: String,
    pub msg: String,
    pub status: u16,

    pub phase: Option<Phase>,
    pub process_done: bool,
}

/// Outcome of evaluating a single rule against its variables (§4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOutcome {
    Match,
    NoMatch,
    /// A referenced variable was absent. Treated like `NoMatch` for chain
    /// bookkeeping, but reported distinctly to callers (§9 open question).
    Again,
}
