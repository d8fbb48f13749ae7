// crates/variant-gate-sdk/tests/flow.rs
// ============================================================================
// Module: SDK Flow Tests
// Description: Engine-to-cache flow with impression bookkeeping.
// ============================================================================
//! ## Overview
//! Drives the assignment engine through the sticky session cache the way a
//! page visit would: the first resolve logs one impression and applies the
//! creative, repeat resolves inside the window reuse the cached creative
//! without logging again.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

use variant_gate_core::AssignmentEngine;
use variant_gate_core::ConditionSet;
use variant_gate_core::Creative;
use variant_gate_core::Experiment;
use variant_gate_core::ExperimentId;
use variant_gate_core::InMemoryExperimentStore;
use variant_gate_core::ProjectId;
use variant_gate_core::Timestamp;
use variant_gate_core::VisitorContext;
use variant_gate_sdk::ApplyPlan;
use variant_gate_sdk::CreativeScriptHost;
use variant_gate_sdk::StickySession;

const NOW_MS: i64 = 1_700_000_000_000;

/// Records executed scripts instead of running them.
#[derive(Default)]
struct RecordingHost {
    /// Scripts passed to the host in order.
    executed: Vec<String>,
}

impl CreativeScriptHost for RecordingHost {
    fn execute(&mut self, javascript: &str) {
        self.executed.push(javascript.to_string());
    }
}

fn store_with_single_variant() -> InMemoryExperimentStore {
    let store = InMemoryExperimentStore::new();
    store.upsert_experiment(Experiment {
        id: ExperimentId::new("e1"),
        project_id: ProjectId::new("p1"),
        name: "hero test".to_string(),
        active: true,
        cv_code: String::new(),
        target_url: String::new(),
        exclude_url: String::new(),
        start_date: None,
        end_date: None,
        session_duration: 60,
        conditions: ConditionSet::default(),
        creatives: vec![Creative {
            name: "variant".to_string(),
            distribution: 1.0,
            is_original: false,
            css: "h1 { color: red }".to_string(),
            javascript: "console.log('v')".to_string(),
            image_url: None,
        }],
    });
    store
}

fn visitor() -> VisitorContext {
    VisitorContext {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64)".to_string(),
        browser: "Chrome".to_string(),
        os: "Windows".to_string(),
        language: "en-US".to_string(),
        visit_count: 1,
        referrer: String::new(),
        url: "https://example.com/pricing".to_string(),
    }
}

#[test]
fn repeat_visits_log_exactly_one_impression_per_window() {
    let store = store_with_single_variant();
    let engine = AssignmentEngine::new();
    let mut session = StickySession::new();
    let mut impressions = 0_u32;

    for minute in 0 .. 5 {
        let now = Timestamp::from_unix_millis(NOW_MS + minute * 60_000);
        let result = engine
            .execute(&store, &ProjectId::new("p1"), &visitor(), now)
            .expect("assignment");
        let resolution = session.resolve(&result, now);
        if resolution.impression_due() {
            impressions += 1;
        }
        assert_eq!(resolution.entry().expect("entry").creative.name, "variant");
    }
    assert_eq!(impressions, 1);

    // Past the 60-minute window the assignment is fresh again.
    let later = Timestamp::from_unix_millis(NOW_MS + 61 * 60_000);
    let result = engine
        .execute(&store, &ProjectId::new("p1"), &visitor(), later)
        .expect("assignment");
    assert!(session.resolve(&result, later).impression_due());
}

#[test]
fn even_split_applies_css_only_for_the_variant() {
    let store = InMemoryExperimentStore::new();
    store.upsert_experiment(Experiment {
        id: ExperimentId::new("e1"),
        project_id: ProjectId::new("p1"),
        name: "hero test".to_string(),
        active: true,
        cv_code: String::new(),
        target_url: String::new(),
        exclude_url: String::new(),
        start_date: None,
        end_date: None,
        session_duration: 60,
        conditions: ConditionSet::default(),
        creatives: vec![
            Creative {
                name: "original".to_string(),
                distribution: 1.0,
                is_original: true,
                css: String::new(),
                javascript: String::new(),
                image_url: None,
            },
            Creative {
                name: "variant".to_string(),
                distribution: 1.0,
                is_original: false,
                css: "h1 { color: red }".to_string(),
                javascript: String::new(),
                image_url: None,
            },
        ],
    });
    let engine = AssignmentEngine::new();
    let now = Timestamp::from_unix_millis(NOW_MS);

    let mut originals = 0_u32;
    let mut variants = 0_u32;
    for _ in 0 .. 400 {
        let result = engine
            .execute(&store, &ProjectId::new("p1"), &visitor(), now)
            .expect("assignment");
        let assignment = result.matched().expect("matched");
        let mut plan = ApplyPlan::for_creative(&assignment.creative);
        if assignment.creative.is_original {
            originals += 1;
            assert!(plan.is_empty());
        } else {
            variants += 1;
            assert_eq!(plan.take_css().as_deref(), Some("h1 { color: red }"));
        }
    }
    // Equal weights: both arms must show up over repeated assignments.
    assert!(originals > 0);
    assert!(variants > 0);
}

#[test]
fn cached_creative_applies_css_and_script_once() {
    let store = store_with_single_variant();
    let engine = AssignmentEngine::new();
    let mut session = StickySession::new();
    let now = Timestamp::from_unix_millis(NOW_MS);

    let result = engine
        .execute(&store, &ProjectId::new("p1"), &visitor(), now)
        .expect("assignment");
    let resolution = session.resolve(&result, now);
    let entry = resolution.entry().expect("entry");

    let mut plan = ApplyPlan::for_creative(&entry.creative);
    assert_eq!(plan.take_css().as_deref(), Some("h1 { color: red }"));
    assert!(plan.take_css().is_none());

    let mut host = RecordingHost::default();
    assert!(plan.run_script(&mut host));
    assert_eq!(host.executed, vec!["console.log('v')".to_string()]);
}
