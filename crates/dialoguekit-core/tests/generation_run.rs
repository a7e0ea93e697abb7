use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use dialoguekit_core::export::{dataset_json, read_dataset};
use dialoguekit_core::orchestrator::plan_quotas;
use dialoguekit_core::{
    DialogueSource, GenerationError, GenerationRequest, Orchestrator, PersonaConfig, Provider,
    RunNotice, RunProgress, SettingsSnapshot, Theme,
};
use proptest::prelude::*;

/// Replays a canned response per theme and records every request it sees
struct ScriptedSource {
    responses: HashMap<String, Result<String, GenerationError>>,
    calls: Mutex<Vec<(String, usize)>>,
}

impl ScriptedSource {
    fn new(responses: Vec<(&str, Result<String, GenerationError>)>) -> Self {
        Self {
            responses: responses
                .into_iter()
                .map(|(theme, response)| (theme.to_string(), response))
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<(String, usize)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DialogueSource for ScriptedSource {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.calls
            .lock()
            .unwrap()
            .push((request.theme.to_string(), request.count));
        self.responses
            .get(request.theme.as_str())
            .cloned()
            .unwrap_or_else(|| Ok("[]".to_string()))
    }
}

fn conversation(theme: &str, n: usize) -> String {
    format!(
        r#"{{"theme":"{theme}","conversation":["user: hi {n}","iris: hello","User: how are you","IRIS: great","user: bye","iris: bye!"]}}"#
    )
}

fn valid_batch(theme: &str, count: usize) -> String {
    let items: Vec<String> = (0..count).map(|n| conversation(theme, n)).collect();
    format!("[{}]", items.join(","))
}

fn snapshot(themes: &[&str]) -> SettingsSnapshot {
    SettingsSnapshot {
        persona: PersonaConfig {
            participant_name: "Alex".to_string(),
            assistant_name: "Nova".to_string(),
            personality: "- Dry humor".to_string(),
            style_notes: String::new(),
            active_themes: themes.iter().map(|t| Theme::new(*t)).collect(),
        },
        provider: Provider::Gemini,
        credential_present: true,
    }
}

#[tokio::test]
async fn two_themes_meet_target_after_dropping_bad_item() {
    let theme_a = format!(
        "```json\n[{},{},{},{}]\n```",
        conversation("A", 0),
        r#"{"theme":"A","conversation":["user: hi", 7]}"#,
        conversation("A", 2),
        conversation("A", 3)
    );
    let source = ScriptedSource::new(vec![
        ("A", Ok(theme_a)),
        ("B", Ok(valid_batch("B", 3))),
    ]);
    let orchestrator = Orchestrator::new(source, 6);

    let report = orchestrator.run(snapshot(&["A", "B"]), |_| {}).await;

    assert_eq!(orchestrator.source().calls(), vec![("A".to_string(), 3), ("B".to_string(), 3)]);
    assert_eq!(report.count(), 6);
    assert!(report.is_success());
    assert_eq!(report.message(), None);
    assert_eq!(report.items[0].turns[0], "Alex: hi 0");
    assert_eq!(report.items[0].turns[1], "Nova: hello");
}

#[tokio::test]
async fn empty_array_reports_none_produced() {
    let source = ScriptedSource::new(vec![("A", Ok("[]".to_string()))]);
    let orchestrator = Orchestrator::new(source, 10);

    let report = orchestrator.run(snapshot(&["A"]), |_| {}).await;

    assert_eq!(orchestrator.source().calls(), vec![("A".to_string(), 10)]);
    assert_eq!(report.count(), 0);
    assert_eq!(report.notice, Some(RunNotice::NoneProduced));
    assert!(!report.notice.as_ref().unwrap().is_error());
}

#[tokio::test]
async fn failure_on_third_theme_halts_and_keeps_earlier_items() {
    let source = ScriptedSource::new(vec![
        ("T1", Ok(valid_batch("T1", 2))),
        ("T2", Ok(valid_batch("T2", 2))),
        (
            "T3",
            Err(GenerationError::Transport {
                provider: "Gemini",
                message: "connection reset".to_string(),
            }),
        ),
        ("T4", Ok(valid_batch("T4", 2))),
        ("T5", Ok(valid_batch("T5", 2))),
    ]);
    let orchestrator = Orchestrator::new(source, 10);

    let report = orchestrator
        .run(snapshot(&["T1", "T2", "T3", "T4", "T5"]), |_| {})
        .await;

    let called: Vec<String> = orchestrator.source().calls().into_iter().map(|(t, _)| t).collect();
    assert_eq!(called, vec!["T1", "T2", "T3"]);
    assert_eq!(report.count(), 4);
    assert!(report.items.iter().all(|i| i.theme.as_str() == "T1" || i.theme.as_str() == "T2"));

    let message = report.message().unwrap();
    assert!(message.contains("T3"));
    assert!(message.contains("connection reset"));
    assert!(report.notice.unwrap().is_error());
}

#[tokio::test]
async fn malformed_payload_is_fatal_like_transport_error() {
    let source = ScriptedSource::new(vec![
        ("A", Ok(valid_batch("A", 1))),
        ("B", Ok("{\"theme\":\"B\"}".to_string())),
        ("C", Ok(valid_batch("C", 1))),
    ]);
    let orchestrator = Orchestrator::new(source, 3);

    let report = orchestrator.run(snapshot(&["A", "B", "C"]), |_| {}).await;

    assert_eq!(orchestrator.source().calls().len(), 2);
    assert_eq!(report.count(), 1);
    assert!(matches!(report.notice, Some(RunNotice::Halted { ref theme, .. }) if theme.as_str() == "B"));
}

#[tokio::test]
async fn zero_items_from_a_theme_does_not_stop_the_run() {
    let source = ScriptedSource::new(vec![
        ("A", Ok("[{\"nope\":1}]".to_string())),
        ("B", Ok(valid_batch("B", 2))),
    ]);
    let orchestrator = Orchestrator::new(source, 4);

    let report = orchestrator.run(snapshot(&["A", "B"]), |_| {}).await;

    assert_eq!(orchestrator.source().calls().len(), 2);
    assert_eq!(report.count(), 2);
    assert_eq!(report.notice, Some(RunNotice::Partial { achieved: 2, target: 4 }));
}

#[tokio::test]
async fn over_delivery_is_truncated_and_stops_further_calls() {
    let source = ScriptedSource::new(vec![
        ("A", Ok(valid_batch("A", 9))),
        ("B", Ok(valid_batch("B", 3))),
    ]);
    let orchestrator = Orchestrator::new(source, 6);
    let mut updates: Vec<RunProgress> = Vec::new();

    let report = orchestrator
        .run(snapshot(&["A", "B"]), |p| updates.push(p))
        .await;

    assert_eq!(orchestrator.source().calls(), vec![("A".to_string(), 3)]);
    assert_eq!(report.count(), 6);
    assert!(report.is_success());
    assert_eq!(updates[0].count, 6);
    assert_eq!(updates[0].added.len(), 9);
}

#[tokio::test]
async fn progress_is_reported_after_each_theme() {
    let source = ScriptedSource::new(vec![
        ("A", Ok(valid_batch("A", 2))),
        ("B", Ok(valid_batch("B", 2))),
        ("C", Ok(valid_batch("C", 2))),
    ]);
    let orchestrator = Orchestrator::new(source, 6);
    let mut updates: Vec<RunProgress> = Vec::new();

    orchestrator
        .run(snapshot(&["A", "B", "C"]), |p| updates.push(p))
        .await;

    let counts: Vec<usize> = updates.iter().map(|p| p.count).collect();
    assert_eq!(counts, vec![2, 4, 6, 6]);
    let themes: Vec<Option<String>> = updates
        .iter()
        .map(|p| p.theme.as_ref().map(|t| t.to_string()))
        .collect();
    assert_eq!(
        themes,
        vec![Some("A".to_string()), Some("B".to_string()), Some("C".to_string()), None]
    );
    assert!(updates[..3].iter().all(|p| p.is_active));
    assert!(!updates[3].is_active);
}

#[tokio::test]
async fn themes_run_in_active_order_not_catalog_order() {
    let source = ScriptedSource::new(vec![]);
    let orchestrator = Orchestrator::new(source, 4);

    orchestrator
        .run(snapshot(&["Rainy Day Ramble", "Fashion Talk"]), |_| {})
        .await;

    let called: Vec<String> = orchestrator.source().calls().into_iter().map(|(t, _)| t).collect();
    assert_eq!(called, vec!["Rainy Day Ramble", "Fashion Talk"]);
}

#[tokio::test]
async fn missing_credential_never_contacts_source() {
    let source = ScriptedSource::new(vec![("A", Ok(valid_batch("A", 1)))]);
    let orchestrator = Orchestrator::new(source, 1);
    let mut snap = snapshot(&["A"]);
    snap.credential_present = false;

    let report = orchestrator.run(snap, |_| {}).await;

    assert!(orchestrator.source().calls().is_empty());
    assert!(matches!(
        report.notice,
        Some(RunNotice::Precondition(GenerationError::MissingCredential { .. }))
    ));
}

#[tokio::test]
async fn export_round_trip_preserves_items() {
    let raw = r#"[{"theme":"A","conversation":["Bob: unrecognised tag","iris:  keep  spacing "]}]"#;
    let source = ScriptedSource::new(vec![
        ("A", Ok(raw.to_string())),
        ("B", Ok(valid_batch("B", 2))),
    ]);
    let orchestrator = Orchestrator::new(source, 3);
    let report = orchestrator.run(snapshot(&["A", "B"]), |_| {}).await;
    assert_eq!(report.count(), 3);

    let restored = read_dataset(&dataset_json(&report.items)).unwrap();

    assert_eq!(restored, report.items);
    assert_eq!(restored[0].turns, vec!["Bob: unrecognised tag", "Nova:  keep  spacing "]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The full-delivery schedule never asks for more than the target, nor for zero
    #[test]
    fn planned_requests_fit_target(target in 0usize..500, theme_count in 1usize..25) {
        let themes: Vec<Theme> = (0..theme_count).map(|i| Theme::new(format!("T{i}"))).collect();
        let plan = plan_quotas(target, &themes);
        let total: usize = plan.iter().map(|(_, n)| *n).sum();
        prop_assert_eq!(total, target);
        prop_assert!(plan.iter().all(|(_, n)| *n > 0));
    }

    /// Final count is min(target, validated items from the themes that were called)
    #[test]
    fn final_count_is_capped_sum(
        target in 1usize..60,
        deliveries in prop::collection::vec(0usize..15, 1..8),
    ) {
        let names: Vec<String> = (0..deliveries.len()).map(|i| format!("T{i}")).collect();
        let responses = names
            .iter()
            .zip(&deliveries)
            .map(|(name, n)| (name.as_str(), Ok(valid_batch(name, *n))))
            .collect();
        let source = ScriptedSource::new(responses);
        let orchestrator = Orchestrator::new(source, target);
        let theme_refs: Vec<&str> = names.iter().map(String::as_str).collect();

        let runtime = tokio::runtime::Runtime::new().unwrap();
        let report = runtime.block_on(orchestrator.run(snapshot(&theme_refs), |_| {}));

        let calls = orchestrator.source().calls();
        let delivered: usize = calls
            .iter()
            .map(|(theme, _)| deliveries[names.iter().position(|n| n == theme).unwrap()])
            .sum();
        prop_assert_eq!(report.count(), target.min(delivered));
        prop_assert!(report.count() <= target);

        // Every individual request is positive and within what was still missing
        let mut accumulated = 0usize;
        for (theme, requested) in &calls {
            prop_assert!(*requested > 0);
            prop_assert!(*requested <= target - accumulated.min(target));
            accumulated += deliveries[names.iter().position(|n| n == theme).unwrap()];
        }
    }
}
