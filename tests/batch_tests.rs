//! Seed file to results file, through the batch runner.

mod common;

use common::fixtures::load_fixture;
use common::{empty_registry, registry_with, stub_analyzer, stub_analyzer_with_config, test_config, StubTransport};
use cultural_url_analyzer::analyzer::Analyzer;
use cultural_url_analyzer::batch::{parse_seed_file, BatchRunner, CancelSignal, SeedEntry, SeedPlan};
use cultural_url_analyzer::export::{export_json, read_results};
use cultural_url_analyzer::logger::{AnalysisLogger, VerbosityLevel};
use cultural_url_analyzer::report::{filter_urls, merge_reanalyzed, parse_url_list, summarize};
use cultural_url_analyzer::CulturalContext;
use std::fs;
use std::sync::Arc;
use std::time::Duration;

const KAPWA_PAGE: &str = "<html><body><p>Kapwa and the family circle.</p></body></html>";

const SEEDS_CSV: &str = "\
group,url
indian,https://desi.example.net/joint-family
filipino,https://ph.example.net/pamamanhikan
filipino,https://blocked.example.net/
martian,https://mars.example.net/
filipino,https://ph.example.net/pamamanhikan
filipino,https://www.nuptials.ph/story
";

fn transport() -> Arc<StubTransport> {
    Arc::new(
        StubTransport::new()
            .with_page(
                "https://ph.example.net/pamamanhikan",
                200,
                &load_fixture("pamamanhikan_article.html"),
            )
            .with_page("https://blocked.example.net/", 403, "")
            .with_page(
                "https://desi.example.net/joint-family",
                200,
                "<html><body><p>Advice for a joint family household.</p></body></html>",
            ),
    )
}

fn silent_runner(analyzer: Arc<Analyzer>, concurrency: usize, cancel: CancelSignal) -> BatchRunner {
    let logger = Arc::new(AnalysisLogger::new(VerbosityLevel::Silent));
    BatchRunner::new(analyzer, concurrency, logger, cancel)
}

fn filipino_plan(urls: &[&str]) -> SeedPlan {
    let seeds = urls.iter().map(|url| SeedEntry::new("filipino", *url)).collect();
    SeedPlan::build(seeds, |g| g == "filipino", &[])
}

fn runner(cancel: CancelSignal, concurrency: usize) -> (BatchRunner, SeedPlan) {
    let dir = tempfile::tempdir().unwrap();
    let seeds_path = dir.path().join("seeds.csv");
    fs::write(&seeds_path, SEEDS_CSV).unwrap();

    let registry = registry_with("Philippines", "Filipino", &[], &["nuptials.ph"]);
    let analyzer = Arc::new(stub_analyzer(transport(), registry));
    let seeds = parse_seed_file(&seeds_path).unwrap();
    let plan = SeedPlan::build(seeds, |g| analyzer.concepts().dictionary(g).is_some(), &[]);

    let logger = Arc::new(AnalysisLogger::new(VerbosityLevel::Silent));
    (BatchRunner::new(analyzer, concurrency, logger, cancel), plan)
}

#[tokio::test]
async fn test_batch_keeps_group_and_seed_order() {
    let (runner, plan) = runner(CancelSignal::new(), 4);
    assert_eq!(plan.entries.len(), 4);
    assert_eq!(plan.rejected.len(), 2);

    let outcome = runner.run(&plan).await.unwrap();

    let groups: Vec<&str> = outcome.results.keys().collect();
    assert_eq!(groups, vec!["indian", "filipino"]);

    let filipino: Vec<&str> = outcome
        .results
        .get("filipino")
        .unwrap()
        .iter()
        .map(|r| r.url.as_str())
        .collect();
    assert_eq!(
        filipino,
        vec![
            "https://ph.example.net/pamamanhikan",
            "https://blocked.example.net/",
            "https://www.nuptials.ph/story",
        ]
    );

    let summary = &outcome.summary;
    assert_eq!(summary.total_urls, 4);
    assert_eq!(summary.evaluated, 4);
    assert_eq!(summary.working, 2);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.rejected_seeds, 2);
    assert_eq!(summary.status_counts.get("error_403"), Some(&1));
    assert_eq!(summary.status_counts.get("expired_server"), Some(&1));
    assert!(!summary.interrupted);
}

#[tokio::test]
async fn test_batch_results_round_trip_through_file() {
    let (runner, plan) = runner(CancelSignal::new(), 2);
    let outcome = runner.run(&plan).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.json");
    export_json(&outcome.results, &path).unwrap();

    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let first = &raw["filipino"][0];
    assert_eq!(first["status"], "working");
    assert_eq!(first["status_code"], 200);
    assert_eq!(first["cultural_context"], "addresses_user_dilemma");
    assert_eq!(first["unique_concept_count"], 3);
    assert_eq!(raw["filipino"][2]["status"], "expired_server");
    assert!(raw["filipino"][2]["status_code"].is_null());

    let read_back = read_results(&path).unwrap();
    assert_eq!(read_back, outcome.results);

    let summaries = summarize(&read_back);
    assert_eq!(summaries[1].group, "filipino");
    assert_eq!(summaries[1].total_urls, 3);

    let (filtered, counts) = filter_urls(&read_back, &parse_url_list("https://blocked.example.net/\n"));
    assert_eq!(filtered.get("filipino").unwrap().len(), 2);
    assert_eq!(counts[1].removed, 1);
}

#[tokio::test]
async fn test_cancelled_batch_writes_nothing_pending() {
    let cancel = CancelSignal::new();
    cancel.cancel();
    let (runner, plan) = runner(cancel, 1);

    let outcome = runner.run(&plan).await.unwrap();

    assert!(outcome.summary.interrupted);
    assert_eq!(outcome.summary.evaluated, 0);
    assert!(outcome.results.values().all(|records| records.is_empty()));
}

#[tokio::test]
async fn test_in_flight_fetches_stay_within_cap() {
    let transport = Arc::new(
        StubTransport::new()
            .with_default_page(200, KAPWA_PAGE)
            .with_delay(Duration::from_millis(25)),
    );
    let mut config = test_config();
    config.analysis.max_concurrent_fetches = 2;
    let analyzer = Arc::new(stub_analyzer_with_config(&config, transport.clone(), empty_registry()));
    let urls: Vec<String> = (0..6).map(|i| format!("https://site{}.example.net/", i)).collect();
    let plan = filipino_plan(&urls.iter().map(String::as_str).collect::<Vec<_>>());

    let outcome = silent_runner(analyzer, 6, CancelSignal::new()).run(&plan).await.unwrap();

    assert_eq!(outcome.summary.evaluated, 6);
    assert!(transport.calls() > 6, "sub-pages should have been fetched too");
    assert_eq!(transport.peak(), 2);
}

#[tokio::test]
async fn test_cancel_mid_run_keeps_finished_records() {
    let cancel = CancelSignal::new();
    let transport = Arc::new(
        StubTransport::new()
            .with_default_page(200, KAPWA_PAGE)
            .with_delay(Duration::from_millis(20))
            .cancel_when_requested("https://b.example.net/", cancel.clone()),
    );
    let analyzer = Arc::new(stub_analyzer(transport.clone(), empty_registry()));
    let plan = filipino_plan(&["https://a.example.net/", "https://b.example.net/", "https://c.example.net/"]);

    let outcome = silent_runner(analyzer, 1, cancel).run(&plan).await.unwrap();

    let urls: Vec<&str> = outcome.results.get("filipino").unwrap().iter().map(|r| r.url.as_str()).collect();
    assert_eq!(urls, vec!["https://a.example.net/"]);
    assert!(outcome.summary.interrupted);
    assert_eq!(outcome.summary.evaluated, 1);
    assert!(!transport.requested().iter().any(|u| u.starts_with("https://c.example.net")));
}

#[tokio::test]
async fn test_reanalysis_refreshes_working_records_only() {
    let (runner, plan) = runner(CancelSignal::new(), 2);
    let first = runner.run(&plan).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.json");
    export_json(&first.results, &path).unwrap();
    let existing = read_results(&path).unwrap();

    // The article was rewritten and the blocked site came back.
    let transport = Arc::new(
        StubTransport::new()
            .with_page(
                "https://ph.example.net/pamamanhikan",
                200,
                "<html><body><p>Simmer the chicken in vinegar and soy sauce.</p></body></html>",
            )
            .with_page("https://blocked.example.net/", 200, KAPWA_PAGE)
            .with_page(
                "https://desi.example.net/joint-family",
                200,
                "<html><body><p>Advice for a joint family household.</p></body></html>",
            ),
    );
    let registry = registry_with("Philippines", "Filipino", &[], &["nuptials.ph"]);
    let analyzer = Arc::new(stub_analyzer(transport.clone(), registry));
    let replan = SeedPlan::from_working(&existing, |g| analyzer.concepts().dictionary(g).is_some());
    assert_eq!(replan.entries.len(), 2);

    let fresh = silent_runner(analyzer, 2, CancelSignal::new()).run(&replan).await.unwrap();
    let (merged, changes) = merge_reanalyzed(&existing, &fresh.results);

    assert!(!transport.requested().iter().any(|u| u.contains("blocked.example.net") || u.contains("nuptials.ph")));

    let before = existing.get("filipino").unwrap();
    let after = merged.get("filipino").unwrap();
    assert_eq!(after.len(), 3);
    assert_eq!(after[1], before[1]);
    assert_eq!(after[2], before[2]);
    assert_eq!(after[0].cultural_context, CulturalContext::NotRelated);
    assert_eq!(merged.get("indian"), existing.get("indian"));

    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].url, "https://ph.example.net/pamamanhikan");
    assert_eq!(changes[0].context_before, CulturalContext::AddressesUserDilemma);
    assert_eq!(changes[0].context_after, CulturalContext::NotRelated);
    assert_eq!((changes[0].concepts_before, changes[0].concepts_after), (3, 0));

    export_json(&merged, &path).unwrap();
    assert_eq!(read_results(&path).unwrap(), merged);
}
