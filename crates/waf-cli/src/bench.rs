//! Throughput benchmark: replays a small fixed corpus of synthetic
//! requests through a loaded engine and reports requests/second.
//!
//! Deliberately has no randomness — a fixed corpus cycled
//! deterministically keeps a run reproducible across machines, at the
//! cost of being a rough proxy rather than a realistic traffic replay.

use std::time::Instant;

use waf_core::types::{Phase, RequestContext, RequestSource, RuleEngine};
use waf_core::{interceptor, pipeline, run_phase, PhaseOutcome};

use crate::eval::FixtureRequest;

fn synthetic_corpus() -> Vec<FixtureRequest> {
    vec![
        FixtureRequest {
            method: "GET".to_string(),
            uri_args: "page=2&sort=name".to_string(),
            content_type: None,
            body: None,
            real_client_ip: Some("203.0.113.10".to_string()),
            server_ip: Some("10.0.0.1".to_string()),
            conn_per_ip: 3,
        },
        FixtureRequest {
            method: "POST".to_string(),
            uri_args: String::new(),
            content_type: Some("application/x-www-form-urlencoded".to_string()),
            body: Some("username=alice&password=hunter2".to_string()),
            real_client_ip: Some("203.0.113.20".to_string()),
            server_ip: Some("10.0.0.1".to_string()),
            conn_per_ip: 1,
        },
        FixtureRequest {
            method: "GET".to_string(),
            uri_args: "q=%27%20OR%20%271%27%3D%271".to_string(),
            content_type: None,
            body: None,
            real_client_ip: Some("203.0.113.30".to_string()),
            server_ip: Some("10.0.0.1".to_string()),
            conn_per_ip: 40,
        },
    ]
}

pub struct BenchReport {
    pub requests: usize,
    pub elapsed_secs: f64,
    pub requests_per_sec: f64,
    pub matched: usize,
}

pub fn run(engine: &RuleEngine, iterations: usize) -> BenchReport {
    let corpus = synthetic_corpus();
    let total = iterations * corpus.len();
    let mut matched = 0usize;

    let start = Instant::now();
    for i in 0..total {
        let fixture = &corpus[i % corpus.len()];
        let mut ctx = RequestContext::default();
        pipeline::populate_request(&mut ctx, fixture);

        let method = fixture.method();
        for phase in [Phase::REQUEST_HEADER, Phase::REQUEST_BODY] {
            match run_phase(engine, phase, &mut ctx, method) {
                Ok(PhaseOutcome::Matched) => break,
                Ok(PhaseOutcome::NoMatch) => {}
                Err(_) => break,
            }
        }
        interceptor::process_block_list(engine, &mut ctx, method);
        let _ = interceptor::intercept(&mut ctx, &engine.counters, &engine.denied_page);

        if ctx.matched {
            matched += 1;
        }
    }
    let elapsed = start.elapsed();

    let elapsed_secs = elapsed.as_secs_f64();
    BenchReport {
        requests: total,
        elapsed_secs,
        requests_per_sec: if elapsed_secs > 0.0 {
            total as f64 / elapsed_secs
        } else {
            f64::INFINITY
        },
        matched,
    }
}
