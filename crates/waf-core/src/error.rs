//! Error types surfaced by the body processor and the evaluator.
//!
//! Configuration-load errors (unknown operator/action token, bad regex,
//! missing denied-page file) live in `waf-loader`'s `LoaderError`; those
//! are fatal at load time and never reach this crate.

use std::fmt;

/// One of the closed set of body-parse anomaly tags. Surfaced to rules via
/// the `PROCESS_BODY_ERROR` variable; never fatal to the request (§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessBodyError {
    /// Missing content-type, or a non-form type where a body rule expected one.
    UncommonContentType,
    /// Malformed multipart framing or disposition line.
    UncommonPostFormat,
    /// Boundary bytes inconsistent with the declared boundary.
    UncommonPostBoundary,
    /// `%00` smuggling detected while unescaping a multipart filename.
    UncommonHexEncoding,
    /// Filename/declared-content-type mismatch heuristic tripped.
    UncommonFilename,
}

impl ProcessBodyError {
    /// The literal tag a rule author would match with `str:UNCOMMON...`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UncommonContentType => "UNCOMMON_CONTENT_TYPE",
            Self::UncommonPostFormat => "UNCOMMON_POST_FORMAT",
            Self::UncommonPostBoundary => "UNCOMMON_POST_BOUNDARY",
            Self::UncommonHexEncoding => "UNCOMMON_HEX_ENCODING",
            Self::UncommonFilename => "UNCOMMON_FILENAME",
        }
    }
}

impl fmt::Display for ProcessBodyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime failure from the evaluator. An operator returning
/// [`crate::operators::MatchOutcome::Error`] (e.g. `gt` against a
/// non-numeric value) propagates out of the phase and the host must
/// decide how to decline the request.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("operator execution failed for rule {rule_id}")]
    OperatorFailed { rule_id: u32 },
}
