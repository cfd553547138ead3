//! Interceptor (C9): turns a matched request into an action, runs the
//! block-list post-processor, logs, and counts.
//!
//! Ports `yy_sec_waf_re_perform_interception` and
//! `yy_sec_waf_re_process_block_list`. The block list can only ever
//! strengthen a decision — it strips `ALLOW` and adds `BLOCK|LOG` on a
//! match, but it can never demote an existing `BLOCK` to something
//! weaker, and a variable it can't resolve is simply skipped rather than
//! treated as a mismatch.

use crate::types::{ActionLevel, Method, RawStringSource, RequestContext, RuleEngine};
use crate::variables::ResolvedVar;

/// Longest log excerpt kept from the request's raw string, mirroring the
/// original's `MAX_ERROR_STR - 300` truncation margin.
const MAX_ERROR_STR: usize = 2048;
const TRUNCATION_MARGIN: usize = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterceptOutcome {
    /// No rule matched; request proceeds untouched.
    Pass,
    /// A rule matched and logged, but the request still proceeds.
    Logged,
    /// A rule matched with `BLOCK`; caller should send `body` with `status`.
    Blocked { status: u16, body: Vec<u8> },
}

/// Run the block-list post-processor against `ctx`. Call this after
/// `evaluator::run_phase`, before `intercept`.
pub fn process_block_list(engine: &RuleEngine, ctx: &mut RequestContext, method: Method) {
    for entry in &engine.block_list {
        let value = match engine.variables.resolve(entry.variable_index, ctx, method) {
            ResolvedVar::NotFound => continue,
            ResolvedVar::Found(v) => v,
        };
        if entry.regex.is_match(&value) {
            ctx.action_level.remove(ActionLevel::ALLOW);
            ctx.action_level.insert(ActionLevel::BLOCK | ActionLevel::LOG);
            ctx.matched = true;
        }
    }
}

fn raw_string_excerpt(ctx: &RequestContext) -> Vec<u8> {
    let raw: &[u8] = match ctx.raw_string {
        RawStringSource::Args => &ctx.args,
        RawStringSource::FullBody => ctx.full_body.as_deref().unwrap_or(&[]),
        RawStringSource::None => &[],
    };

    let limit = MAX_ERROR_STR.saturating_sub(TRUNCATION_MARGIN);
    if raw.len() > limit {
        let mut out = raw[..limit].to_vec();
        out.extend_from_slice(b"...");
        out
    } else {
        raw.to_vec()
    }
}

fn log_matched_request(ctx: &RequestContext) {
    let excerpt = raw_string_excerpt(ctx);
    log::warn!(
        "[id \"{}\"][msg \"{}\"][gids \"{}\"] client: {}, server: {}, matched: \"{}\"",
        ctx.rule_id,
        ctx.msg,
        ctx.gids,
        ctx.real_client_ip.as_deref().unwrap_or("-"),
        ctx.server_ip.as_deref().unwrap_or("-"),
        String::from_utf8_lossy(&excerpt),
    );
}

/// Apply the winning rule's action to the request. A no-op if no rule
/// matched (`ctx.matched == false`).
pub fn intercept(
    ctx: &mut RequestContext,
    counters: &crate::counters::Counters,
    denied_page: &[u8],
) -> InterceptOutcome {
    if !ctx.matched {
        return InterceptOutcome::Pass;
    }

    counters.incr_matched();

    if ctx.action_level.contains(ActionLevel::LOG) {
        counters.incr_logged();
        log_matched_request(ctx);
    }

    let allow = ctx.action_level.contains(ActionLevel::ALLOW);
    let block = ctx.action_level.contains(ActionLevel::BLOCK);

    if allow {
        counters.incr_allowed();
    }
    if block {
        counters.incr_blocked();
    }

    // BLOCK always dominates ALLOW when a rule (or the block list) sets
    // both; only a pure ALLOW lets the request through.
    if block {
        return InterceptOutcome::Blocked {
            status: if ctx.status == 0 { 412 } else { ctx.status },
            body: denied_page.to_vec(),
        };
    }
    if allow {
        return InterceptOutcome::Pass;
    }

    InterceptOutcome::Logged
}
