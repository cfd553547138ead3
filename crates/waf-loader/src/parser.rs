//! Text-directive parser feeding [`waf_core::RuleEngine`] construction.
//!
//! Four directives, one per non-blank, non-`#`-comment line:
//!
//! ```text
//! rule <var[|var...]> <operator> <action[ action...]>
//! block_list $<var> <regex>
//! denied_url <path>
//! conn_processor on
//! ```
//!
//! A rule's variable list is `|`-separated (e.g. `$ARGS|$ARGS_POST`); each
//! entry's leading `$` is optional and stripped before lookup, so `ARGS`
//! and `$ARGS` name the same variable.
//!
//! `rule`'s operator and actions follow the same token grammar as
//! `waf_core::operators`/`waf_core::actions`; see those modules for the
//! token formats themselves. A rule's `phase:` action may list more than
//! one phase — the rule is registered into every phase list it names, in
//! file order, so chained rules stay adjacent within each list they
//! share. A line is split on whitespace into tokens, except inside a
//! `'...'` span, so `msg:'admin probe attempt'` survives as one token.

use std::fs;
use std::sync::Arc;

use regex::bytes::RegexBuilder;

use waf_core::actions::{apply_action, ActionState};
use waf_core::counters::Counters;
use waf_core::operators::parse_operator;
use waf_core::types::{BlockListEntry, Phase, Rule, RuleEngine};
use waf_core::variables::VariableRegistry;

use crate::error::LoaderError;

/// Parse a complete rule-file source into a ready-to-use `RuleEngine`.
pub fn load_engine(source: &str) -> Result<RuleEngine, LoaderError> {
    let variables = VariableRegistry::new();

    let mut ordered_rules: Vec<Rule> = Vec::new();
    let mut block_list: Vec<BlockListEntry> = Vec::new();
    let mut denied_page: Vec<u8> = default_denied_page();
    let mut conn_processor = false;

    for (idx, raw_line) in source.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let tokens = tokenize(line);
        let directive = tokens.first().copied().unwrap_or("");
        let rest = &tokens[1.min(tokens.len())..];

        match directive {
            "rule" => {
                ordered_rules.push(parse_rule_directive(line_no, &rest, &variables)?);
            }
            "block_list" => {
                block_list.push(parse_block_list_directive(line_no, &rest, &variables)?);
            }
            "denied_url" => {
                let path = rest
                    .first()
                    .ok_or(LoaderError::IncompleteDeniedUrlDirective { line: line_no })?;
                denied_page =
                    fs::read(path).map_err(|source| LoaderError::DeniedUrlFileUnreadable {
                        path: (*path).to_string(),
                        source,
                    })?;
            }
            "conn_processor" => {
                conn_processor = rest.first().copied() == Some("on");
            }
            other => {
                return Err(LoaderError::UnknownDirective {
                    line: line_no,
                    directive: other.to_string(),
                });
            }
        }
    }

    let mut phase_rules: [Vec<Rule>; 4] = Default::default();
    for rule in &ordered_rules {
        for phase in [
            Phase::REQUEST_HEADER,
            Phase::REQUEST_BODY,
            Phase::RESPONSE_HEADER,
            Phase::RESPONSE_BODY,
        ] {
            if rule.phase_mask.contains(phase) {
                phase_rules[phase.slot()].push(rule.clone());
            }
        }
    }

    Ok(RuleEngine::new(
        phase_rules,
        block_list,
        variables,
        denied_page,
        conn_processor,
        Arc::new(Counters::new()),
    ))
}

fn default_denied_page() -> Vec<u8> {
    b"<html><head><title>Forbidden</title></head><body>Request rejected.</body></html>".to_vec()
}

/// Split a directive line on whitespace, except inside a `'...'` span —
/// `msg:'admin probe'` is one token, not two. Unterminated quotes just run
/// to end of line rather than erroring; the unbalanced value is still
/// caught downstream by `unquote`'s exact-match check.
fn tokenize(line: &str) -> Vec<&str> {
    let bytes = line.as_bytes();
    let len = bytes.len();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < len {
        while i < len && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= len {
            break;
        }
        let start = i;
        let mut in_quote = false;
        while i < len {
            match bytes[i] {
                b'\'' => in_quote = !in_quote,
                b if b.is_ascii_whitespace() && !in_quote => break,
                _ => {}
            }
            i += 1;
        }
        tokens.push(&line[start..i]);
    }
    tokens
}

fn parse_rule_directive(
    line_no: usize,
    rest: &[&str],
    variables: &VariableRegistry,
) -> Result<Rule, LoaderError> {
    if rest.len() < 2 {
        return Err(LoaderError::IncompleteRuleDirective { line: line_no });
    }

    let var_indices = rest[0]
        .split('|')
        .map(|raw| {
            let name = raw.strip_prefix('$').unwrap_or(raw);
            variables
                .get_index(name)
                .ok_or_else(|| LoaderError::UnknownVariable {
                    line: line_no,
                    name: name.to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let (op_negative, operator) =
        parse_operator(rest[1]).map_err(|source| LoaderError::InvalidOperator {
            line: line_no,
            source,
        })?;

    let mut state = ActionState::default();
    for token in &rest[2..] {
        apply_action(&mut state, token).map_err(|source| LoaderError::InvalidAction {
            line: line_no,
            source,
        })?;
    }

    if state.rule_id == 0 {
        return Err(LoaderError::RuleMissingId { line: line_no });
    }
    if state.phase_mask.is_empty() {
        state.phase_mask = Phase::REQUEST_HEADER;
    }

    Ok(Rule {
        rule_id: state.rule_id,
        var_indices,
        operator,
        op_negative,
        transformation: state.transformation,
        phase_mask: state.phase_mask,
        action_level: state.action_level,
        gids: state.gids,
        msg: state.msg,
        status: state.status,
        is_chain: state.is_chain,
    })
}

fn parse_block_list_directive(
    line_no: usize,
    rest: &[&str],
    variables: &VariableRegistry,
) -> Result<BlockListEntry, LoaderError> {
    if rest.len() < 2 {
        return Err(LoaderError::IncompleteBlockListDirective { line: line_no });
    }

    let raw_name = rest[0];
    let name = raw_name
        .strip_prefix('$')
        .ok_or_else(|| LoaderError::BlockListVariableMissingSigil {
            line: line_no,
            name: raw_name.to_string(),
        })?;
    let variable_index =
        variables
            .get_index(name)
            .ok_or_else(|| LoaderError::UnknownVariable {
                line: line_no,
                name: name.to_string(),
            })?;

    let pattern = rest[1..].join(" ");
    let regex = RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .multi_line(true)
        .build()
        .map_err(|source| LoaderError::InvalidBlockListRegex {
            line: line_no,
            source,
        })?;

    Ok(BlockListEntry {
        variable_index,
        regex: Arc::new(regex),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use waf_core::types::Phase;

    #[test]
    fn loads_a_simple_rule() {
        let engine =
            load_engine("rule ARGS str:admin id:1001 lev:block msg:'admin probe'\n").unwrap();
        let rules = engine.rules_for(Phase::REQUEST_HEADER);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].rule_id, 1001);
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let engine = load_engine("# a comment\n\n   \nrule ARGS str:x id:1 lev:log\n").unwrap();
        assert_eq!(engine.rules_for(Phase::REQUEST_HEADER).len(), 1);
    }

    #[test]
    fn rule_registers_into_every_named_phase() {
        let engine = load_engine("rule ARGS str:x id:1 phase:1,2 lev:block\n").unwrap();
        assert_eq!(engine.rules_for(Phase::REQUEST_HEADER).len(), 1);
        assert_eq!(engine.rules_for(Phase::REQUEST_BODY).len(), 1);
        assert_eq!(engine.rules_for(Phase::RESPONSE_HEADER).len(), 0);
    }

    #[test]
    fn unknown_directive_is_rejected() {
        let err = load_engine("bogus foo\n").unwrap_err();
        assert!(matches!(err, LoaderError::UnknownDirective { line: 1, .. }));
    }

    #[test]
    fn unknown_variable_is_rejected() {
        let err = load_engine("rule NOT_REAL str:x id:1\n").unwrap_err();
        assert!(matches!(err, LoaderError::UnknownVariable { line: 1, .. }));
    }

    #[test]
    fn rule_without_id_is_rejected() {
        let err = load_engine("rule ARGS str:x lev:block\n").unwrap_err();
        assert!(matches!(err, LoaderError::RuleMissingId { line: 1 }));
    }

    #[test]
    fn block_list_directive_compiles_a_regex() {
        let engine = load_engine("block_list $ARGS (?i)evilbot\n").unwrap();
        assert_eq!(engine.block_list.len(), 1);
    }

    #[test]
    fn block_list_requires_dollar_sigil() {
        let err = load_engine("block_list ARGS evilbot\n").unwrap_err();
        assert!(matches!(
            err,
            LoaderError::BlockListVariableMissingSigil { line: 1, .. }
        ));
    }

    #[test]
    fn conn_processor_on_is_recognized() {
        let engine = load_engine("conn_processor on\n").unwrap();
        assert!(engine.conn_processor);
    }

    #[test]
    fn quoted_msg_with_spaces_stays_one_token() {
        assert_eq!(
            tokenize("rule ARGS str:x id:1 msg:'sql injection attempt' lev:block"),
            vec!["rule", "ARGS", "str:x", "id:1", "msg:'sql injection attempt'", "lev:block"]
        );
    }

    #[test]
    fn pipe_separated_variable_list_resolves_every_entry() {
        let engine =
            load_engine("rule $ARGS|$ARGS_POST str:admin id:1001 lev:block\n").unwrap();
        let rule = &engine.rules_for(Phase::REQUEST_HEADER)[0];
        assert_eq!(rule.var_indices.len(), 2);
        assert_ne!(rule.var_indices[0], rule.var_indices[1]);
    }

    #[test]
    fn quoted_msg_survives_into_the_built_rule() {
        let engine =
            load_engine("rule ARGS str:admin id:1001 lev:block msg:'admin probe attempt'\n")
                .unwrap();
        assert_eq!(
            engine.rules_for(Phase::REQUEST_HEADER)[0].msg,
            "admin probe attempt"
        );
    }
}
