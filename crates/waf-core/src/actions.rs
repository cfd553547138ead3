//! Action registry (C6): applies a rule directive's action tokens onto
//! the rule under construction.
//!
//! Ports `yy_sec_waf_re_action.c`'s per-token setters (`id:`, `msg:`,
//! `gids:`, `lev:`, `phase:`, `t:`, `chain`, `status:`). `waf-loader`
//! drives this one token at a time while it builds a `Rule`; the
//! variable list and operator are parsed separately (`variables`,
//! `operators`) since they aren't action tokens.

use crate::transforms::TransformKind;
use crate::types::{ActionLevel, Phase};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionParseError {
    #[error("unknown action name `{0}`")]
    UnknownAction(String),
    #[error("`id:` value is not a valid rule id")]
    InvalidId,
    #[error("`phase:` contains an invalid phase digit")]
    InvalidPhase,
    #[error("`lev:` contains an unknown action level `{0}`")]
    InvalidLevel(String),
    #[error("`status:` value is not a valid HTTP status code")]
    InvalidStatus,
    #[error("transformation `{0}` is not registered")]
    UnsupportedTransform(String),
    #[error("`chain:` value must be `0` or `1`, got `{0}`")]
    InvalidChain(String),
}

/// Accumulates action-token output while a `Rule` is being built.
#[derive(Debug, Clone, Default)]
pub struct ActionState {
    pub rule_id: u32,
    pub gids: String,
    pub msg: String,
    pub action_level: ActionLevel,
    pub phase_mask: Phase,
    pub transformation: Option<TransformKind>,
    pub status: u16,
    pub is_chain: bool,
}

/// Apply one action token (e.g. `id:1001`, `lev:block|log`, `chain`) onto
/// `state`. `chain` is accepted both as a bare flag and as `chain:0`/`chain:1`.
pub fn apply_action(state: &mut ActionState, token: &str) -> Result<(), ActionParseError> {
    if token == "chain" {
        state.is_chain = true;
        return Ok(());
    }

    let (name, value) = token
        .split_once(':')
        .ok_or_else(|| ActionParseError::UnknownAction(token.to_string()))?;

    match name {
        "id" => {
            state.rule_id = value.parse().map_err(|_| ActionParseError::InvalidId)?;
        }
        "msg" => {
            state.msg = unquote(value);
        }
        "gids" => {
            state.gids = unquote(value);
        }
        "lev" => {
            let mut level = ActionLevel::empty();
            for part in value.split('|') {
                level |= match part {
                    "log" => ActionLevel::LOG,
                    "block" => ActionLevel::BLOCK,
                    "allow" => ActionLevel::ALLOW,
                    other => return Err(ActionParseError::InvalidLevel(other.to_string())),
                };
            }
            state.action_level = level;
        }
        "phase" => {
            let mut mask = Phase::empty();
            for digit in value.split(',') {
                let d = digit.trim().as_bytes().first().copied().unwrap_or(0);
                mask |= Phase::from_digit(d).ok_or(ActionParseError::InvalidPhase)?;
            }
            state.phase_mask = mask;
        }
        "t" => {
            return Err(ActionParseError::UnsupportedTransform(value.to_string()));
        }
        "status" => {
            state.status = value.parse().map_err(|_| ActionParseError::InvalidStatus)?;
        }
        "chain" => {
            state.is_chain = match value {
                "0" => false,
                "1" => true,
                other => return Err(ActionParseError::InvalidChain(other.to_string())),
            };
        }
        _ => return Err(ActionParseError::UnknownAction(name.to_string())),
    }

    Ok(())
}

fn unquote(s: &str) -> String {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 && bytes[0] == b'\'' && bytes[bytes.len() - 1] == b'\'' {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}
