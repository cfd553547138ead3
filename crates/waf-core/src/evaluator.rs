//! Rule evaluator (C8): walks a phase's rule list, honoring chains.
//!
//! Ports `yy_sec_waf_re_process_normal_rules`'s `NEXT_RULE`/`NEXT_CHAIN`
//! state machine. Rules in the same phase list are independent *unless*
//! a rule sets `is_chain`, in which case it and the rules following it
//! up to (and including) the first non-chained rule form one group that
//! must ALL match (logical AND) for the group to count as a match. The
//! first group that matches wins; its head rule's `id`/`msg`/`gids`/
//! `lev`/`status` are the ones recorded onto the request, matching the
//! convention that a chain's head carries the reportable action and its
//! continuations narrow the match.

use crate::error::EvalError;
use crate::operators::{self, MatchOutcome};
use crate::types::{Method, Phase, Rule, RuleEngine, RuleOutcome};
use crate::variables::ResolvedVar;
use crate::RequestContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseOutcome {
    NoMatch,
    Matched,
}

/// Evaluate a single rule's variable list (§4.8's per-variable loop): the
/// rule matches as soon as any resolved variable satisfies the operator;
/// it's `NoMatch` if every variable resolved but none satisfied it, and
/// `Again` if every variable was absent. An operator that can't be
/// evaluated against a resolved value (e.g. `gt` against non-numeric
/// bytes) aborts the rule with `EvalError` rather than being treated as
/// a miss.
fn evaluate_rule(
    rule: &Rule,
    ctx: &mut RequestContext,
    method: Method,
    engine: &RuleEngine,
) -> Result<RuleOutcome, EvalError> {
    let mut any_found = false;

    for &var_index in &rule.var_indices {
        match engine.variables.resolve(var_index, ctx, method) {
            ResolvedVar::NotFound => continue,
            ResolvedVar::Found(value) => {
                any_found = true;
                let raw = match operators::execute(&rule.operator, &value) {
                    MatchOutcome::Match => true,
                    MatchOutcome::NoMatch => false,
                    MatchOutcome::Error => {
                        return Err(EvalError::OperatorFailed {
                            rule_id: rule.rule_id,
                        })
                    }
                };
                if raw ^ rule.op_negative {
                    return Ok(RuleOutcome::Match);
                }
            }
        }
    }

    if any_found {
        Ok(RuleOutcome::NoMatch)
    } else {
        Ok(RuleOutcome::Again)
    }
}

fn record_match(ctx: &mut RequestContext, head: &Rule, phase: Phase) {
    ctx.matched = true;
    ctx.rule_id = head.rule_id;
    ctx.action_level = head.action_level;
    ctx.gids = head.gids.clone();
    ctx.msg = head.msg.clone();
    ctx.status = head.effective_status();
    ctx.phase = Some(phase);
}

/// Run every rule (and chain group) registered for `phase` against `ctx`,
/// stopping at the first group that matches. Propagates the first
/// `EvalError` hit by any rule in the group currently being evaluated —
/// the caller decides how to handle a request whose evaluation couldn't
/// complete.
pub fn run_phase(
    engine: &RuleEngine,
    phase: Phase,
    ctx: &mut RequestContext,
    method: Method,
) -> Result<PhaseOutcome, EvalError> {
    let rules = engine.rules_for(phase);
    let mut i = 0;

    while i < rules.len() {
        let mut j = i;
        let mut group_matched = true;

        loop {
            let outcome = evaluate_rule(&rules[j], ctx, method, engine)?;
            match outcome {
                RuleOutcome::Match => {
                    if rules[j].is_chain && j + 1 < rules.len() {
                        j += 1;
                        continue;
                    }
                    break;
                }
                RuleOutcome::NoMatch | RuleOutcome::Again => {
                    group_matched = false;
                    break;
                }
            }
        }

        if group_matched {
            record_match(ctx, &rules[i], phase);
            return Ok(PhaseOutcome::Matched);
        }

        let mut k = i;
        while k < rules.len() && rules[k].is_chain {
            k += 1;
        }
        i = k + 1;
    }

    Ok(PhaseOutcome::NoMatch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counters::Counters;
    use crate::types::{ActionLevel, CompiledOperator, RuleEngine};
    use crate::variables::VariableRegistry;
    use std::sync::Arc;

    fn rule(id: u32, var_index: usize, needle: &str, is_chain: bool) -> Rule {
        Rule {
            rule_id: id,
            var_indices: vec![var_index],
            operator: CompiledOperator::Str(needle.as_bytes().to_vec()),
            op_negative: false,
            transformation: None,
            phase_mask: Phase::REQUEST_HEADER,
            action_level: ActionLevel::BLOCK,
            gids: "test".to_string(),
            msg: format!("rule {id}"),
            status: 0,
            is_chain,
        }
    }

    fn engine_with(rules: Vec<Rule>) -> RuleEngine {
        let variables = VariableRegistry::new();
        let mut phase_rules: [Vec<Rule>; 4] = Default::default();
        phase_rules[Phase::REQUEST_HEADER.slot()] = rules;
        RuleEngine::new(
            phase_rules,
            Vec::new(),
            variables,
            Vec::new(),
            false,
            Arc::new(Counters::new()),
        )
    }

    #[test]
    fn single_rule_matches() {
        let args_idx = VariableRegistry::new().get_index("ARGS").unwrap();
        let engine = engine_with(vec![rule(1, args_idx, "admin", false)]);
        let mut ctx = RequestContext {
            args: b"user=admin".to_vec(),
            ..Default::default()
        };
        let outcome = run_phase(&engine, Phase::REQUEST_HEADER, &mut ctx, Method::Get).unwrap();
        assert_eq!(outcome, PhaseOutcome::Matched);
        assert_eq!(ctx.rule_id, 1);
    }

    #[test]
    fn no_match_when_nothing_found() {
        let args_idx = VariableRegistry::new().get_index("ARGS").unwrap();
        let engine = engine_with(vec![rule(1, args_idx, "admin", false)]);
        let mut ctx = RequestContext {
            args: b"user=bob".to_vec(),
            ..Default::default()
        };
        let outcome = run_phase(&engine, Phase::REQUEST_HEADER, &mut ctx, Method::Get).unwrap();
        assert_eq!(outcome, PhaseOutcome::NoMatch);
        assert!(!ctx.matched);
    }

    #[test]
    fn chain_requires_all_members_to_match() {
        let args_idx = VariableRegistry::new().get_index("ARGS").unwrap();
        let engine = engine_with(vec![
            rule(1, args_idx, "admin", true),
            rule(2, args_idx, "delete", false),
        ]);
        let mut ctx = RequestContext {
            args: b"user=admin&action=delete".to_vec(),
            ..Default::default()
        };
        let outcome = run_phase(&engine, Phase::REQUEST_HEADER, &mut ctx, Method::Get).unwrap();
        assert_eq!(outcome, PhaseOutcome::Matched);
        // head of the chain group is reported, not the continuation.
        assert_eq!(ctx.rule_id, 1);
    }

    #[test]
    fn chain_fails_closed_when_second_member_misses() {
        let args_idx = VariableRegistry::new().get_index("ARGS").unwrap();
        let engine = engine_with(vec![
            rule(1, args_idx, "admin", true),
            rule(2, args_idx, "delete", false),
        ]);
        let mut ctx = RequestContext {
            args: b"user=admin&action=view".to_vec(),
            ..Default::default()
        };
        let outcome = run_phase(&engine, Phase::REQUEST_HEADER, &mut ctx, Method::Get).unwrap();
        assert_eq!(outcome, PhaseOutcome::NoMatch);
    }

    #[test]
    fn failed_group_does_not_block_a_later_independent_rule() {
        let args_idx = VariableRegistry::new().get_index("ARGS").unwrap();
        let engine = engine_with(vec![
            rule(1, args_idx, "admin", true),
            rule(2, args_idx, "delete", false),
            rule(3, args_idx, "view", false),
        ]);
        let mut ctx = RequestContext {
            args: b"user=admin&action=view".to_vec(),
            ..Default::default()
        };
        let outcome = run_phase(&engine, Phase::REQUEST_HEADER, &mut ctx, Method::Get).unwrap();
        assert_eq!(outcome, PhaseOutcome::Matched);
        assert_eq!(ctx.rule_id, 3);
    }

    #[test]
    fn operator_error_propagates_out_of_run_phase() {
        let args_idx = VariableRegistry::new().get_index("ARGS").unwrap();
        let mut gt_rule = rule(1, args_idx, "unused", false);
        gt_rule.operator = CompiledOperator::Gt(10);
        let engine = engine_with(vec![gt_rule]);
        let mut ctx = RequestContext {
            args: b"not a number".to_vec(),
            ..Default::default()
        };
        let err = run_phase(&engine, Phase::REQUEST_HEADER, &mut ctx, Method::Get).unwrap_err();
        assert!(matches!(err, EvalError::OperatorFailed { rule_id: 1 }));
    }

    #[test]
    fn absent_variable_yields_no_match_not_a_panic() {
        let args_idx = VariableRegistry::new().get_index("ARGS").unwrap();
        let engine = engine_with(vec![rule(1, args_idx, "admin", false)]);
        let mut ctx = RequestContext::default();
        let outcome = run_phase(&engine, Phase::REQUEST_HEADER, &mut ctx, Method::Get).unwrap();
        assert_eq!(outcome, PhaseOutcome::NoMatch);
    }
}
