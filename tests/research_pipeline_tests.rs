//! End-to-end tests of the research pipeline against scripted backends.

#[path = "common/mocks.rs"]
mod mocks;

use briefsmith::research::assembler::{NO_FINDINGS_SUMMARY, SUMMARY_UNAVAILABLE};
use briefsmith::research::coordinator::ResearchEvent;
use briefsmith::types::{AppError, ErrorKind, FINDINGS_UNAVAILABLE, TaskStatus};
use futures::StreamExt;
use mocks::{ScriptedLlm, ScriptedSearch, coordinator, test_settings};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const SOLAR: &str = "Solar power growth";
const WIND: &str = "Wind energy capacity";
const BATTERY: &str = "Battery storage costs";

fn renewable_llm() -> ScriptedLlm {
    ScriptedLlm::planning(&[SOLAR, WIND, BATTERY])
}

#[tokio::test]
async fn test_renewable_energy_trends_scenario() {
    let llm = Arc::new(renewable_llm());
    let search = Arc::new(
        ScriptedSearch::new()
            .results(
                "solar",
                &[
                    ("IEA Solar Report", "https://iea.org/solar"),
                    ("Solar Outlook", "https://example.com/solar-outlook"),
                ],
            )
            .failing("wind")
            .results("battery", &[("Battery Prices", "https://example.com/batteries")]),
    );

    let brief = coordinator(llm.clone(), search, test_settings())
        .research("Renewable energy trends", &CancellationToken::new(), None)
        .await
        .unwrap();

    assert_eq!(brief.task_reports.len(), 3);
    assert!(brief.task_reports.iter().all(|r| r.status == TaskStatus::Done));

    let wind = &brief.task_reports[1];
    assert!(wind.llm_only);
    assert_eq!(wind.error, Some(ErrorKind::EvidenceUnavailable));
    assert!(wind.findings.starts_with("Based on general knowledge"));
    assert!(!brief.task_reports[0].llm_only);

    let urls: Vec<_> = brief.references.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://iea.org/solar",
            "https://example.com/solar-outlook",
            "https://example.com/batteries"
        ]
    );
    assert_eq!(brief.references[2].task_id, 2);
    assert_eq!(brief.references[0].source, "iea.org");
    assert_eq!(brief.summary, "Executive summary of the research.");
    assert!(!brief.summary_degraded);

    let rendered = brief.render();
    assert!(rendered.starts_with("Research Brief: Renewable energy trends\n"));
    assert!(rendered.contains("1. IEA Solar Report - https://iea.org/solar (iea.org)"));
    assert!(rendered.contains("Research completed with 3 tasks and 3 references"));
    assert!(rendered.contains("Task 2: no external evidence available"));
    assert_eq!(llm.summary_calls(), 1);
}

#[tokio::test]
async fn test_planning_failure_is_fatal() {
    let llm = Arc::new(renewable_llm().failing_plan());
    let search = Arc::new(ScriptedSearch::new());

    let result = coordinator(llm, search.clone(), test_settings())
        .research("Renewable energy trends", &CancellationToken::new(), None)
        .await;

    assert!(matches!(result, Err(AppError::PlanningUnavailable(_))));
    assert!(search.queries().is_empty());
}

#[tokio::test]
async fn test_planning_past_deadline_is_fatal() {
    let llm = Arc::new(renewable_llm().plan_delay(Duration::from_secs(5)));
    let mut settings = test_settings();
    settings.deadline = Duration::from_millis(200);

    let started = Instant::now();
    let result = coordinator(llm, Arc::new(ScriptedSearch::new()), settings)
        .research("Renewable energy trends", &CancellationToken::new(), None)
        .await;

    assert!(matches!(result, Err(AppError::PlanningUnavailable(_))));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_blank_query_is_rejected() {
    let llm = Arc::new(renewable_llm());
    let result = coordinator(llm.clone(), Arc::new(ScriptedSearch::new()), test_settings())
        .research("   ", &CancellationToken::new(), None)
        .await;

    assert!(matches!(result, Err(AppError::InvalidInput(_))));
    assert!(llm.prompts().is_empty());
}

#[tokio::test]
async fn test_unparseable_plan_falls_back_to_query() {
    let llm = Arc::new(ScriptedLlm::with_plan_text("I'd be happy to help with that."));
    let brief = coordinator(llm, Arc::new(ScriptedSearch::new()), test_settings())
        .research("Renewable energy trends", &CancellationToken::new(), None)
        .await
        .unwrap();

    assert_eq!(brief.task_reports.len(), 1);
    assert_eq!(brief.task_reports[0].description, "Renewable energy trends");
}

#[tokio::test]
async fn test_task_count_is_capped() {
    let descriptions = ["A1", "B2", "C3", "D4", "E5", "F6", "G7"];
    let llm = Arc::new(ScriptedLlm::planning(&descriptions));
    let brief = coordinator(llm, Arc::new(ScriptedSearch::new()), test_settings())
        .research("Many angles", &CancellationToken::new(), None)
        .await
        .unwrap();

    let planned: Vec<_> = brief
        .task_reports
        .iter()
        .map(|r| r.description.as_str())
        .collect();
    assert_eq!(planned, vec!["A1", "B2", "C3", "D4", "E5"]);
}

#[tokio::test]
async fn test_no_evidence_anywhere_gives_llm_only_brief() {
    let llm = Arc::new(renewable_llm());
    let brief = coordinator(llm, Arc::new(ScriptedSearch::new()), test_settings())
        .research("Renewable energy trends", &CancellationToken::new(), None)
        .await
        .unwrap();

    assert!(brief.references.is_empty());
    assert!(brief.task_reports.iter().all(|r| r.llm_only));
    assert!(brief.task_reports.iter().all(|r| r.error.is_none()));
    assert!(brief.render().contains("REFERENCES\nNone\n"));
}

#[tokio::test]
async fn test_duplicate_url_is_attributed_to_first_task() {
    let llm = Arc::new(renewable_llm());
    let search = Arc::new(
        ScriptedSearch::new()
            .results(
                "solar",
                &[("A", "https://a.example"), ("Shared", "https://shared.example/")],
            )
            .results("wind", &[("Shared again", "https://shared.example"), ("C", "https://c.example")])
            .results("battery", &[("A again", "https://A.example#top")]),
    );

    let brief = coordinator(llm, search, test_settings())
        .research("Renewable energy trends", &CancellationToken::new(), None)
        .await
        .unwrap();

    let refs: Vec<_> = brief
        .references
        .iter()
        .map(|r| (r.index, r.url.as_str(), r.task_id))
        .collect();
    assert_eq!(
        refs,
        vec![
            (1, "https://a.example", 0),
            (2, "https://shared.example/", 0),
            (3, "https://c.example", 1),
        ]
    );
}

#[tokio::test]
async fn test_order_is_preserved_under_reversed_latency() {
    let llm = Arc::new(
        renewable_llm()
            .task_delay(SOLAR, Duration::from_millis(400))
            .task_delay(WIND, Duration::from_millis(200)),
    );
    let search = Arc::new(
        ScriptedSearch::new()
            .results("solar", &[("S", "https://s.example")])
            .results("wind", &[("W", "https://w.example")])
            .results("battery", &[("B", "https://b.example")]),
    );

    let brief = coordinator(llm, search, test_settings())
        .research("Renewable energy trends", &CancellationToken::new(), None)
        .await
        .unwrap();

    let order: Vec<_> = brief
        .task_reports
        .iter()
        .map(|r| r.description.as_str())
        .collect();
    assert_eq!(order, vec![SOLAR, WIND, BATTERY]);

    let urls: Vec<_> = brief.references.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(urls, vec!["https://s.example", "https://w.example", "https://b.example"]);
}

#[tokio::test]
async fn test_deadline_returns_partial_brief_within_grace() {
    let llm = Arc::new(renewable_llm().task_delay(WIND, Duration::from_secs(30)));
    let mut settings = test_settings();
    settings.deadline = Duration::from_millis(500);

    let started = Instant::now();
    let brief = coordinator(llm, Arc::new(ScriptedSearch::new()), settings)
        .research("Renewable energy trends", &CancellationToken::new(), None)
        .await
        .unwrap();
    let elapsed = started.elapsed();

    // deadline, then at most one grace period for pipelines and one for the summary
    assert!(elapsed < Duration::from_millis(500 + 2 * 200 + 500), "took {:?}", elapsed);

    assert_eq!(brief.task_reports[0].status, TaskStatus::Done);
    assert_eq!(brief.task_reports[2].status, TaskStatus::Done);

    let wind = &brief.task_reports[1];
    assert_eq!(wind.status, TaskStatus::Failed);
    assert_eq!(wind.error, Some(ErrorKind::DeadlineExceeded));
    assert_eq!(wind.findings, FINDINGS_UNAVAILABLE);
    assert!(
        brief
            .render()
            .contains("[findings unavailable] (deadline exceeded)")
    );
}

#[tokio::test]
async fn test_external_cancel_returns_partial_brief() {
    let llm = Arc::new(
        renewable_llm()
            .task_delay(WIND, Duration::from_secs(30))
            .task_delay(BATTERY, Duration::from_secs(30)),
    );
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let brief = coordinator(llm, Arc::new(ScriptedSearch::new()), test_settings())
        .research("Renewable energy trends", &cancel, None)
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(brief.task_reports[0].status, TaskStatus::Done);
    for report in &brief.task_reports[1..] {
        assert_eq!(report.status, TaskStatus::Failed);
        assert_eq!(report.error, Some(ErrorKind::Cancelled));
    }
}

#[tokio::test]
async fn test_concurrency_limit_is_enforced() {
    let descriptions = ["Alpha", "Bravo", "Charlie", "Delta", "Echo"];
    let llm = Arc::new(ScriptedLlm::planning(&descriptions));
    let search = Arc::new(ScriptedSearch::new().delay(Duration::from_millis(100)));
    let gauge = search.gauge();

    let mut settings = test_settings();
    settings.concurrency = 2;

    let brief = coordinator(llm, search, settings)
        .research("Phonetic alphabet", &CancellationToken::new(), None)
        .await
        .unwrap();

    assert_eq!(brief.task_reports.len(), 5);
    assert_eq!(gauge.peak(), 2);
}

#[tokio::test]
async fn test_extreme_overrides_still_produce_a_brief() {
    let llm = Arc::new(ScriptedLlm::planning(&[SOLAR, WIND]));
    let search = Arc::new(ScriptedSearch::new().results("solar", &[("IEA", "https://iea.org/solar")]));
    let settings = test_settings().with_overrides(Some(usize::MAX), Some(u64::MAX));

    let brief = coordinator(llm, search, settings)
        .research("Renewable energy trends", &CancellationToken::new(), None)
        .await
        .unwrap();

    assert_eq!(brief.task_reports.len(), 2);
    assert!(brief.task_reports.iter().all(|r| r.status == TaskStatus::Done));
}

#[tokio::test]
async fn test_failed_synthesis_degrades_one_task() {
    let llm = Arc::new(renewable_llm().failing_task(BATTERY));
    let search = Arc::new(ScriptedSearch::new().results("battery", &[("B", "https://b.example")]));

    let brief = coordinator(llm, search, test_settings())
        .research("Renewable energy trends", &CancellationToken::new(), None)
        .await
        .unwrap();

    let battery = &brief.task_reports[2];
    assert_eq!(battery.status, TaskStatus::Failed);
    assert_eq!(battery.error, Some(ErrorKind::SynthesisUnavailable));
    // evidence gathered before the failure still counts
    assert_eq!(brief.references.len(), 1);
    assert!(!brief.summary_degraded);

    let rendered = brief.render();
    assert!(rendered.contains("[findings unavailable] (synthesis unavailable)"));
    assert!(rendered.contains("Task 3: synthesis unavailable"));
}

#[tokio::test]
async fn test_all_tasks_failed_skips_summary() {
    let llm = Arc::new(
        renewable_llm()
            .failing_task(SOLAR)
            .failing_task(WIND)
            .failing_task(BATTERY),
    );

    let brief = coordinator(llm.clone(), Arc::new(ScriptedSearch::new()), test_settings())
        .research("Renewable energy trends", &CancellationToken::new(), None)
        .await
        .unwrap();

    assert_eq!(brief.summary, NO_FINDINGS_SUMMARY);
    assert_eq!(llm.summary_calls(), 0);
    assert!(
        brief
            .task_reports
            .iter()
            .all(|r| r.status == TaskStatus::Failed)
    );
}

#[tokio::test]
async fn test_summary_failure_is_degraded_not_fatal() {
    let llm = Arc::new(renewable_llm().failing_summary());
    let brief = coordinator(llm, Arc::new(ScriptedSearch::new()), test_settings())
        .research("Renewable energy trends", &CancellationToken::new(), None)
        .await
        .unwrap();

    assert_eq!(brief.summary, SUMMARY_UNAVAILABLE);
    assert!(brief.summary_degraded);
    assert!(
        brief
            .degraded_sections()
            .contains(&"Executive summary: assembly degraded".to_string())
    );
}

#[tokio::test]
async fn test_progress_events_reach_completion() {
    let llm = Arc::new(renewable_llm());
    let (tx, mut rx) = mpsc::unbounded_channel();

    coordinator(llm, Arc::new(ScriptedSearch::new()), test_settings())
        .research("Renewable energy trends", &CancellationToken::new(), Some(tx))
        .await
        .unwrap();

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    let percents: Vec<u8> = events.iter().map(|e| e.percent).collect();
    assert!(percents.windows(2).all(|w| w[0] <= w[1]), "{:?}", percents);
    assert_eq!(percents.last(), Some(&100));

    let done = events
        .iter()
        .filter(|e| e.status == Some(TaskStatus::Done))
        .count();
    assert_eq!(done, 3);
}

#[tokio::test]
async fn test_stream_ends_with_brief() {
    let llm = Arc::new(renewable_llm());
    let coordinator = Arc::new(coordinator(llm, Arc::new(ScriptedSearch::new()), test_settings()));

    let events: Vec<ResearchEvent> = coordinator
        .stream("Renewable energy trends".to_string(), CancellationToken::new())
        .collect()
        .await;

    assert!(matches!(events.first(), Some(ResearchEvent::Progress(_))));
    match events.last() {
        Some(ResearchEvent::Brief(brief)) => assert_eq!(brief.task_reports.len(), 3),
        other => panic!("expected a brief, got {:?}", other),
    }
}

#[tokio::test]
async fn test_stream_reports_planning_failure() {
    let llm = Arc::new(renewable_llm().failing_plan());
    let coordinator = Arc::new(coordinator(llm, Arc::new(ScriptedSearch::new()), test_settings()));

    let events: Vec<ResearchEvent> = coordinator
        .stream("Renewable energy trends".to_string(), CancellationToken::new())
        .collect()
        .await;

    match events.last() {
        Some(ResearchEvent::Error { message }) => {
            assert!(message.contains("planning unavailable"), "{}", message)
        }
        other => panic!("expected an error, got {:?}", other),
    }
}
