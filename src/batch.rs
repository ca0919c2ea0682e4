//! Batch evaluation of seed URLs.
//!
//! Supports:
//! - CSV seed files with a `group,url` header (`cultural_group` accepted for `group`)
//! - JSON seed files, either `[{"group": .., "url": ..}]` or `{"<group>": ["url", ..]}`
//! - Concurrent evaluation bounded by `analysis.concurrency`
//! - Cancellation that keeps every record completed so far

use crate::analyzer::Analyzer;
use crate::domain_utils::host_of;
use crate::logger::AnalysisLogger;
use crate::ordered::OrderedMap;
use crate::record::{EvaluationRecord, GroupedResults};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::warn;

/// One (cultural group, URL) pair from a seed file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeedEntry {
    #[serde(alias = "cultural_group")]
    pub group: String,
    pub url: String,
}

impl SeedEntry {
    pub fn new(group: impl Into<String>, url: impl Into<String>) -> Self {
        Self { group: group.into(), url: url.into() }
    }
}

/// Input format for seed files
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputFormat {
    Csv,
    Json,
}

impl InputFormat {
    /// Detect format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()).map(|e| e.to_lowercase()).as_deref() {
            Some("csv") => Some(Self::Csv),
            Some("json") => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parse seeds from a file (format from extension)
pub fn parse_seed_file(path: &Path) -> Result<Vec<SeedEntry>> {
    let format = InputFormat::from_path(path).with_context(|| {
        format!("Cannot determine seed format from extension, expected .csv or .json: {}", path.display())
    })?;

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed file: {}", path.display()))?;

    match format {
        InputFormat::Csv => parse_csv_seeds(&content),
        InputFormat::Json => parse_json_seeds(&content),
    }
}

/// Parse seeds from CSV content with a `group,url` header
pub fn parse_csv_seeds(content: &str) -> Result<Vec<SeedEntry>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(content.as_bytes());

    let headers = reader.headers().context("Failed to read CSV headers")?.clone();
    let column = |names: &[&str]| headers.iter().position(|h| names.contains(&h.to_lowercase().as_str()));
    let group_idx = column(&["group", "cultural_group"])
        .context("Seed CSV must have a 'group' (or 'cultural_group') column")?;
    let url_idx = column(&["url"]).context("Seed CSV must have a 'url' column")?;

    let mut seeds = Vec::new();
    for record in reader.records() {
        let record = record.context("Failed to parse CSV record")?;
        let group = record.get(group_idx).unwrap_or_default();
        let url = record.get(url_idx).unwrap_or_default();
        if group.is_empty() || url.is_empty() {
            continue;
        }
        seeds.push(SeedEntry::new(group, url));
    }
    Ok(seeds)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SeedDocument {
    Entries(Vec<SeedEntry>),
    Grouped(OrderedMap<Vec<String>>),
}

/// Parse seeds from JSON content
pub fn parse_json_seeds(content: &str) -> Result<Vec<SeedEntry>> {
    let document: SeedDocument = serde_json::from_str(content).context(
        "Seed JSON must be an array of {\"group\", \"url\"} objects or an object mapping groups to URL arrays",
    )?;

    Ok(match document {
        SeedDocument::Entries(entries) => entries,
        SeedDocument::Grouped(groups) => groups
            .into_iter()
            .flat_map(|(group, urls)| urls.into_iter().map(move |url| SeedEntry::new(group.clone(), url)))
            .collect(),
    })
}

/// Why a seed was not scheduled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedRejection {
    NotHttp,
    UnknownGroup,
    Duplicate,
    GroupNotSelected,
}

impl std::fmt::Display for SeedRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeedRejection::NotHttp => write!(f, "not an http(s) URL"),
            SeedRejection::UnknownGroup => write!(f, "no concept dictionary for this group"),
            SeedRejection::Duplicate => write!(f, "duplicate URL in group"),
            SeedRejection::GroupNotSelected => write!(f, "group not selected"),
        }
    }
}

/// Seeds accepted for evaluation, in file order
#[derive(Debug, Clone, Default)]
pub struct SeedPlan {
    pub entries: Vec<SeedEntry>,
    pub rejected: Vec<(SeedEntry, SeedRejection)>,
}

impl SeedPlan {
    /// Validate and deduplicate seeds. `selected` empty means every known group.
    pub fn build(
        seeds: Vec<SeedEntry>,
        is_known_group: impl Fn(&str) -> bool,
        selected: &[String],
    ) -> Self {
        let mut plan = SeedPlan::default();
        let mut seen: HashSet<(String, String)> = HashSet::new();

        for seed in seeds {
            let seed = SeedEntry::new(seed.group.trim(), seed.url.trim());
            let rejection = if !selected.is_empty() && !selected.iter().any(|g| g == &seed.group) {
                Some(SeedRejection::GroupNotSelected)
            } else if !is_known_group(&seed.group) {
                Some(SeedRejection::UnknownGroup)
            } else if host_of(&seed.url).is_none() {
                Some(SeedRejection::NotHttp)
            } else if !seen.insert((seed.group.clone(), seed.url.clone())) {
                Some(SeedRejection::Duplicate)
            } else {
                None
            };

            match rejection {
                Some(reason) => plan.rejected.push((seed, reason)),
                None => plan.entries.push(seed),
            }
        }
        plan
    }

    /// Seeds for re-evaluating the working records of an earlier run.
    /// Failed records are left out; groups without a dictionary are rejected.
    pub fn from_working(results: &GroupedResults, is_known_group: impl Fn(&str) -> bool) -> Self {
        let seeds = results
            .iter()
            .flat_map(|(group, records)| {
                records
                    .iter()
                    .filter(|r| r.status.is_working())
                    .map(move |r| SeedEntry::new(group, r.url.as_str()))
            })
            .collect();
        Self::build(seeds, is_known_group, &[])
    }

    /// Groups in first-seen order.
    pub fn groups(&self) -> Vec<&str> {
        let mut groups: Vec<&str> = Vec::new();
        for entry in &self.entries {
            if !groups.contains(&entry.group.as_str()) {
                groups.push(&entry.group);
            }
        }
        groups
    }
}

/// Run-wide cancellation, triggered from the Ctrl-C handler.
#[derive(Clone, Default)]
pub struct CancelSignal {
    flag: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub async fn cancelled(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Summary of a batch run
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub started_at: String,
    pub completed_at: String,
    pub total_duration_secs: f64,
    pub total_urls: usize,
    pub evaluated: usize,
    pub working: usize,
    pub failed: usize,
    pub rejected_seeds: usize,
    /// Status string -> count
    pub status_counts: BTreeMap<String, usize>,
    pub interrupted: bool,
}

impl BatchSummary {
    fn new(total_urls: usize, rejected_seeds: usize) -> Self {
        Self {
            started_at: Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            completed_at: String::new(),
            total_duration_secs: 0.0,
            total_urls,
            evaluated: 0,
            working: 0,
            failed: 0,
            rejected_seeds,
            status_counts: BTreeMap::new(),
            interrupted: false,
        }
    }

    fn finalize(&mut self, results: &GroupedResults, duration_secs: f64, interrupted: bool) {
        self.completed_at = Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();
        self.total_duration_secs = duration_secs;
        self.interrupted = interrupted;
        for record in results.values().flatten() {
            self.evaluated += 1;
            if record.status.is_working() {
                self.working += 1;
            } else {
                self.failed += 1;
            }
            *self.status_counts.entry(record.status.to_string()).or_insert(0) += 1;
        }
    }

    pub fn print(&self) {
        println!();
        println!("Batch summary:");
        println!("   Started:        {}", self.started_at);
        println!("   Completed:      {}", self.completed_at);
        println!("   Seeds accepted: {}", self.total_urls);
        println!("   Seeds rejected: {}", self.rejected_seeds);
        println!("   Evaluated:      {}", self.evaluated);
        println!("   Working:        {}", self.working);
        println!("   Failed:         {}", self.failed);
        for (status, count) in &self.status_counts {
            println!("      {:<18} {}", status, count);
        }
        println!("   Duration:       {:.1}s", self.total_duration_secs);
        if self.interrupted {
            println!("   Interrupted:    yes");
        }
    }
}

pub struct BatchOutcome {
    pub results: GroupedResults,
    pub summary: BatchSummary,
}

pub struct BatchRunner {
    analyzer: Arc<Analyzer>,
    concurrency: usize,
    logger: Arc<AnalysisLogger>,
    cancel: CancelSignal,
}

impl BatchRunner {
    pub fn new(
        analyzer: Arc<Analyzer>,
        concurrency: usize,
        logger: Arc<AnalysisLogger>,
        cancel: CancelSignal,
    ) -> Self {
        Self { analyzer, concurrency: concurrency.max(1), logger, cancel }
    }

    /// Evaluate every planned seed. Records come back grouped in first-seen
    /// group order and seed order within a group, whatever order they finished in.
    pub async fn run(&self, plan: &SeedPlan) -> Result<BatchOutcome> {
        if plan.entries.is_empty() {
            bail!("No seeds to evaluate ({} rejected)", plan.rejected.len());
        }

        let started = std::time::Instant::now();
        let total = plan.entries.len();
        let mut summary = BatchSummary::new(total, plan.rejected.len());

        self.logger.log_run_start(total, &plan.groups(), self.concurrency);
        self.logger.start_progress(total as u64).await;

        let analyzer = self.analyzer.as_ref();
        let mut evaluations = stream::iter(plan.entries.iter().enumerate().map(|(index, seed)| async move {
            (index, analyzer.analyze(&seed.group, &seed.url).await)
        }))
        .buffer_unordered(self.concurrency);

        let mut finished: Vec<Option<EvaluationRecord>> = vec![None; total];
        let mut completed = 0;
        let mut interrupted = false;

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    interrupted = true;
                    break;
                }
                next = evaluations.next() => {
                    let Some((index, result)) = next else { break };
                    let seed = &plan.entries[index];
                    completed += 1;
                    match result {
                        Ok(record) => {
                            self.logger.log_url_result(completed, total, &seed.group, &record);
                            finished[index] = Some(record);
                        }
                        Err(e) => {
                            warn!("Evaluation of {} failed: {:#}", seed.url, e);
                            self.logger.error(&format!("{}: {:#}", seed.url, e));
                        }
                    }
                    self.logger.advance_progress(&seed.url).await;
                }
            }
        }
        drop(evaluations);

        if interrupted {
            self.logger.log_interrupted(completed, total);
        }
        self.logger.finish_progress(&format!("Evaluated {} of {} URLs", completed, total)).await;

        let mut results = GroupedResults::new();
        for group in plan.groups() {
            results.insert(group, Vec::new());
        }
        for (seed, record) in plan.entries.iter().zip(finished) {
            if let Some(record) = record {
                results.entry_or_default(&seed.group).push(record);
            }
        }

        summary.finalize(&results, started.elapsed().as_secs_f64(), interrupted);
        Ok(BatchOutcome { results, summary })
    }
}
