//! Reports over an existing results file: per-group summaries, URL filtering
//! and merging a re-evaluation back into the file.

use crate::record::{CulturalContext, EvaluationRecord, GroupedResults};
use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Value, count and share of the group's URLs.
#[derive(Debug, Clone, PartialEq)]
pub struct Tally {
    pub value: String,
    pub count: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupSummary {
    pub group: String,
    pub total_urls: usize,
    pub contexts: Vec<Tally>,
    pub countries: Vec<Tally>,
    pub statuses: Vec<Tally>,
}

/// Count values by descending count; ties keep first-seen order.
fn tally<'a>(values: impl Iterator<Item = &'a str>, total: usize) -> Vec<Tally> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for value in values {
        match counts.iter_mut().find(|(v, _)| *v == value) {
            Some((_, n)) => *n += 1,
            None => counts.push((value, 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .map(|(value, count)| Tally {
            value: value.to_string(),
            count,
            percent: if total == 0 { 0.0 } else { count as f64 * 100.0 / total as f64 },
        })
        .collect()
}

pub fn summarize(results: &GroupedResults) -> Vec<GroupSummary> {
    results
        .iter()
        .map(|(group, records)| {
            let total = records.len();
            let statuses: Vec<String> = records.iter().map(|r| r.status.to_string()).collect();
            GroupSummary {
                group: group.to_string(),
                total_urls: total,
                contexts: tally(records.iter().map(|r| r.cultural_context.as_str()), total),
                countries: tally(records.iter().map(|r| r.country.as_str()), total),
                statuses: tally(statuses.iter().map(|s| s.as_str()), total),
            }
        })
        .collect()
}

pub fn print_summary(summaries: &[GroupSummary]) {
    let rule = "=".repeat(80);
    for summary in summaries {
        println!("\n{}", rule);
        println!("{}", summary.group.to_uppercase());
        println!("{}", rule);
        println!("Total URLs: {}", summary.total_urls);

        for (title, tallies) in [
            ("Categories", &summary.contexts),
            ("Countries", &summary.countries),
            ("Statuses", &summary.statuses),
        ] {
            println!("\n{}:", title);
            for t in tallies {
                println!("  {}: {} ({:.1}%)", t.value, t.count, t.percent);
            }
        }
    }
    println!("\n{}", rule);
}

/// URLs listed one per line; blank lines and `#` comments ignored.
pub fn parse_url_list(content: &str) -> HashSet<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

pub fn read_url_list(path: &Path) -> Result<HashSet<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read URL list {}", path.display()))?;
    Ok(parse_url_list(&content))
}

/// Records removed from one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCount {
    pub group: String,
    pub before: usize,
    pub removed: usize,
}

/// Drop every record whose URL is in `remove`. Group order and record order are kept.
pub fn filter_urls(results: &GroupedResults, remove: &HashSet<String>) -> (GroupedResults, Vec<FilterCount>) {
    let mut filtered = GroupedResults::new();
    let mut counts = Vec::new();
    for (group, records) in results.iter() {
        let kept: Vec<_> = records.iter().filter(|r| !remove.contains(&r.url)).cloned().collect();
        counts.push(FilterCount {
            group: group.to_string(),
            before: records.len(),
            removed: records.len() - kept.len(),
        });
        filtered.insert(group, kept);
    }
    (filtered, counts)
}

/// Country or category movement of one re-evaluated record.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordChange {
    pub group: String,
    pub url: String,
    pub country_before: String,
    pub country_after: String,
    pub context_before: CulturalContext,
    pub context_after: CulturalContext,
    pub concepts_before: usize,
    pub concepts_after: usize,
    /// First evidence line of the new record
    pub evidence: Option<String>,
}

impl RecordChange {
    pub fn country_changed(&self) -> bool {
        self.country_before != self.country_after
    }

    pub fn context_changed(&self) -> bool {
        self.context_before != self.context_after
    }
}

/// Replace every working record of `existing` that has a counterpart in
/// `fresh`. Failed records, and working ones that were not re-evaluated, are
/// kept unchanged. Group order and record order follow `existing`.
pub fn merge_reanalyzed(existing: &GroupedResults, fresh: &GroupedResults) -> (GroupedResults, Vec<RecordChange>) {
    let mut updated: HashMap<(&str, &str), &EvaluationRecord> = HashMap::new();
    for (group, records) in fresh.iter() {
        for record in records {
            updated.insert((group, record.url.as_str()), record);
        }
    }

    let mut merged = GroupedResults::new();
    let mut changes = Vec::new();
    for (group, records) in existing.iter() {
        let mut kept = Vec::with_capacity(records.len());
        for old in records {
            let new = if old.status.is_working() {
                updated.get(&(group, old.url.as_str())).copied()
            } else {
                None
            };
            let Some(new) = new else {
                kept.push(old.clone());
                continue;
            };

            let change = RecordChange {
                group: group.to_string(),
                url: old.url.clone(),
                country_before: old.country.clone(),
                country_after: new.country.clone(),
                context_before: old.cultural_context,
                context_after: new.cultural_context,
                concepts_before: old.unique_concept_count(),
                concepts_after: new.unique_concept_count(),
                evidence: new.evidence.first().cloned(),
            };
            if change.country_changed() || change.context_changed() {
                changes.push(change);
            }
            kept.push(new.clone());
        }
        merged.insert(group, kept);
    }
    (merged, changes)
}

fn print_tallies(title: &str, tallies: &[Tally]) {
    println!("\n{}:", title);
    for t in tallies {
        println!("  {}: {}", t.value, t.count);
    }
}

/// Before/after counts per group, then every record whose country or category moved.
pub fn print_reanalysis(before: &[GroupSummary], after: &[GroupSummary], changes: &[RecordChange]) {
    let rule = "=".repeat(80);
    for old in before {
        let Some(new) = after.iter().find(|s| s.group == old.group) else {
            continue;
        };
        println!("\n{}", rule);
        println!("{}", old.group.to_uppercase());
        println!("{}", rule);
        print_tallies("Categories BEFORE", &old.contexts);
        print_tallies("Categories AFTER", &new.contexts);
        print_tallies("Countries BEFORE", &old.countries);
        print_tallies("Countries AFTER", &new.countries);
    }

    println!("\n{}", rule);
    let moved: Vec<&RecordChange> = changes.iter().filter(|c| c.country_changed()).collect();
    if moved.is_empty() {
        println!("No URLs changed location");
    } else {
        println!("{} URLs changed location:", moved.len());
        for change in moved {
            println!("\n  [{}] {}", change.group, change.url);
            println!("    {} -> {}", change.country_before, change.country_after);
            if let Some(evidence) = &change.evidence {
                println!("    Evidence: {}", evidence);
            }
        }
    }

    let recategorized: Vec<&RecordChange> = changes.iter().filter(|c| c.context_changed()).collect();
    if recategorized.is_empty() {
        println!("\nNo URLs changed category");
    } else {
        println!("\n{} URLs changed category:", recategorized.len());
        for change in recategorized {
            println!("\n  [{}] {}", change.group, change.url);
            println!(
                "    {} (concepts: {}) -> {} (concepts: {})",
                change.context_before, change.concepts_before, change.context_after, change.concepts_after
            );
        }
    }
    println!("\n{}", rule);
}
