//! Transformation registry (§4.6 of the original design, carried as an
//! empty registry per SPEC_FULL.md §10: no transformation name is wired
//! to a variable or action today, so `apply` is unreachable in practice,
//! but the type exists so a `Rule`'s `t:` action token has somewhere to
//! land without widening `Rule` later).

/// A parsed `t:<name>` action token. No variants are populated yet — the
/// action parser rejects any `t:` value it sees (§6 action registry).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformKind {}

impl TransformKind {
    /// Apply this transformation to `value`. Unreachable while
    /// `TransformKind` has no variants; kept so callers can be written
    /// against the eventual contract.
    pub fn apply(self, _value: &[u8]) -> Vec<u8> {
        match self {}
    }
}
