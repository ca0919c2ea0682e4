use crate::record::EvaluationRecord;
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub enum VerbosityLevel {
    Silent = 0,    // Progress bar and final summary only
    Summary = 1,   // One line per URL (default)
    Detailed = 2,  // Plus evidence and warnings
    Debug = 3,
}

impl VerbosityLevel {
    pub fn from_verbose_count(count: u8) -> Self {
        match count {
            0 => VerbosityLevel::Summary,
            1 => VerbosityLevel::Detailed,
            _ => VerbosityLevel::Debug,
        }
    }
}

#[derive(Clone)]
pub struct AnalysisLogger {
    verbosity: VerbosityLevel,
    progress_bar: Arc<RwLock<Option<ProgressBar>>>,
    run_metadata: Arc<Mutex<RunMetadata>>,
    log_buffer: Arc<Mutex<Vec<String>>>,
    log_file_path: Option<PathBuf>,
}

#[derive(Default, Clone)]
struct RunMetadata {
    start_time: Option<SystemTime>,
    end_time: Option<SystemTime>,
    urls_evaluated: usize,
    urls_working: usize,
    groups: usize,
    interrupted: bool,
    output_file: String,
}

impl AnalysisLogger {
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            progress_bar: Arc::new(RwLock::new(None)),
            run_metadata: Arc::new(Mutex::new(RunMetadata::default())),
            log_buffer: Arc::new(Mutex::new(Vec::new())),
            log_file_path: None,
        }
    }

    pub fn with_log_file(verbosity: VerbosityLevel, log_file_path: impl Into<PathBuf>) -> Self {
        Self {
            log_file_path: Some(log_file_path.into()),
            ..Self::new(verbosity)
        }
    }

    pub fn info(&self, message: &str) {
        if self.verbosity >= VerbosityLevel::Summary {
            self.print_message("INFO", message);
        }
    }

    pub fn warn(&self, message: &str) {
        if self.verbosity >= VerbosityLevel::Detailed {
            self.print_message("WARN", message);
        }
    }

    /// Printed at every verbosity.
    pub fn error(&self, message: &str) {
        self.print_message("ERROR", message);
    }

    pub fn debug(&self, message: &str) {
        if self.verbosity >= VerbosityLevel::Debug {
            self.print_message("DEBUG", message);
        }
    }

    fn print_message(&self, level: &str, message: &str) {
        let msg = format!("[{}] {}: {}", self.get_timestamp(), level, message);

        if self.log_file_path.is_some() {
            if let Ok(mut buffer) = self.log_buffer.lock() {
                buffer.push(msg.clone());
            }
        }

        // Route through the bar so its line is redrawn below the message.
        if let Ok(guard) = self.progress_bar.try_read() {
            if let Some(pb) = guard.as_ref() {
                pb.println(msg);
                return;
            }
        }

        eprintln!("{}", msg);
    }

    fn get_timestamp(&self) -> String {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        let secs = now.as_secs();
        format!(
            "{:02}:{:02}:{:02}.{:03}",
            (secs / 3600) % 24,
            (secs % 3600) / 60,
            secs % 60,
            now.subsec_millis()
        )
    }

    fn with_metadata(&self, update: impl FnOnce(&mut RunMetadata)) {
        if let Ok(mut metadata) = self.run_metadata.lock() {
            update(&mut metadata);
        }
    }

    pub async fn start_progress(&self, total_urls: u64) {
        let pb = if self.verbosity >= VerbosityLevel::Debug {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(total_urls)
        };
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("##-"),
        );
        pb.set_message("Fetching...");

        *self.progress_bar.write().await = Some(pb);
        self.with_metadata(|m| m.start_time = Some(SystemTime::now()));
    }

    pub async fn advance_progress(&self, message: &str) {
        if let Some(pb) = self.progress_bar.read().await.as_ref() {
            pb.set_message(message.to_string());
            pb.inc(1);
        }
    }

    pub async fn finish_progress(&self, final_message: &str) {
        if let Some(pb) = self.progress_bar.write().await.take() {
            pb.finish_and_clear();
        }
        self.with_metadata(|m| m.end_time = Some(SystemTime::now()));
        self.info(final_message);
    }

    pub fn log_run_start(&self, url_count: usize, groups: &[&str], concurrency: usize) {
        self.with_metadata(|m| m.groups = groups.len());
        self.info(&format!(
            "Evaluating {} URLs across {} groups ({}) with {} concurrent evaluations",
            url_count,
            groups.len(),
            groups.join(", "),
            concurrency
        ));
    }

    pub fn log_seed_rejected(&self, group: &str, url: &str, reason: &str) {
        self.warn(&format!("Skipping seed {} [{}]: {}", url, group, reason));
    }

    pub fn log_url_result(&self, index: usize, total: usize, group: &str, record: &EvaluationRecord) {
        self.with_metadata(|m| {
            m.urls_evaluated += 1;
            if record.status.is_working() {
                m.urls_working += 1;
            }
        });

        self.info(&format!(
            "[{}/{}] {} [{}]: {} | {} | {}",
            index,
            total,
            record.url,
            group,
            record.status,
            record.country,
            record.cultural_context
        ));
        for line in &record.evidence {
            self.debug(&format!("    {}", line));
        }
        if record.unique_concept_count() > 0 {
            self.warn(&format!(
                "    concepts: {}",
                record.matched_concepts.keys().collect::<Vec<_>>().join(", ")
            ));
        }
    }

    pub fn log_interrupted(&self, completed: usize, total: usize) {
        self.with_metadata(|m| m.interrupted = true);
        self.error(&format!(
            "Run interrupted: keeping {} of {} completed evaluations",
            completed, total
        ));
    }

    pub fn log_export_success(&self, path: &str) {
        self.with_metadata(|m| m.output_file = path.to_string());
        self.info(&format!("Results written to {}", path));
    }

    pub fn print_final_summary(&self) {
        let Ok(metadata) = self.run_metadata.lock().map(|m| m.clone()) else {
            return;
        };

        // Clear any progress bar remnants
        print!("\x1b[2K\r");
        let _ = io::stdout().flush();

        println!("\n=== ANALYSIS SUMMARY ===");
        if let (Some(start), Some(end)) = (metadata.start_time, metadata.end_time) {
            let duration = end.duration_since(start).unwrap_or_default();
            println!("Analysis Duration: {:.2}s", duration.as_secs_f64());
        }
        println!("Cultural Groups: {}", metadata.groups);
        println!("URLs Evaluated: {}", metadata.urls_evaluated);
        println!("Working Pages: {}", metadata.urls_working);
        println!("Unreachable: {}", metadata.urls_evaluated - metadata.urls_working);
        if !metadata.output_file.is_empty() {
            println!("Results Exported: {}", metadata.output_file);
        }
        println!("========================\n");

        if metadata.interrupted {
            println!("⚠️  Analysis interrupted. Partial results were kept.");
        } else {
            println!("✅ Analysis completed: {} URLs evaluated.", metadata.urls_evaluated);
        }
    }

    /// Write every buffered line to the log file, if one was requested.
    pub fn export_logs(&self) -> Result<()> {
        let Some(path) = self.log_file_path.as_deref() else {
            return Ok(());
        };
        let lines = self.log_buffer.lock().map(|b| b.clone()).unwrap_or_default();
        write_log_file(path, &lines)
            .with_context(|| format!("Failed to write log file {}", path.display()))
    }

    pub fn is_log_export_enabled(&self) -> bool {
        self.log_file_path.is_some()
    }

    pub fn get_log_count(&self) -> usize {
        self.log_buffer.lock().map(|b| b.len()).unwrap_or(0)
    }
}

fn write_log_file(path: &Path, lines: &[String]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).write(true).truncate(true).open(path)?;
    for line in lines {
        writeln!(file, "{}", line)?;
    }
    file.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FetchStatus;

    #[test]
    fn test_verbosity_from_count() {
        assert_eq!(VerbosityLevel::from_verbose_count(0), VerbosityLevel::Summary);
        assert_eq!(VerbosityLevel::from_verbose_count(1), VerbosityLevel::Detailed);
        assert_eq!(VerbosityLevel::from_verbose_count(5), VerbosityLevel::Debug);
    }

    #[test]
    fn test_buffer_only_with_log_file() {
        let plain = AnalysisLogger::new(VerbosityLevel::Summary);
        plain.info("hello");
        assert_eq!(plain.get_log_count(), 0);

        let dir = tempfile::tempdir().unwrap();
        let logger = AnalysisLogger::with_log_file(VerbosityLevel::Summary, dir.path().join("run.log"));
        logger.info("hello");
        logger.debug("hidden at summary level");
        assert_eq!(logger.get_log_count(), 1);
    }

    #[test]
    fn test_export_logs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("run.log");
        let logger = AnalysisLogger::with_log_file(VerbosityLevel::Debug, &path);
        let record = EvaluationRecord::unreachable(
            "https://example.com/",
            FetchStatus::HttpError(403),
            Some(403),
            "Unknown",
            vec!["HTTP status code: 403".to_string()],
        );
        logger.log_url_result(1, 1, "filipino", &record);
        logger.export_logs().unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("INFO: [1/1] https://example.com/ [filipino]: error_403 | Unknown | unknown"));
        assert!(written.contains("DEBUG:     HTTP status code: 403"));
    }
}
