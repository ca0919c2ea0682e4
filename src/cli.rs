use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cultural-url-analyzer")]
#[command(about = "Evaluates advice URLs: publisher country and cultural-concept coverage per cultural group")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Create default configuration file at ./config/cultural-url-analyzer.toml
    #[arg(long, global = true)]
    pub init: bool,

    /// Configuration file (default: ./config/cultural-url-analyzer.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Verbose logging (-v adds evidence detail, -vv debug output)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export console log lines to a file
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate every URL in a seed file
    Analyze {
        /// Seed file: CSV with group,url columns or JSON
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Results file
        #[arg(short, long, value_name = "FILE", default_value = "cultural_url_results.json")]
        output: PathBuf,

        /// URLs evaluated concurrently (overrides config)
        #[arg(short = 'j', long, value_name = "N")]
        parallel_jobs: Option<usize>,

        /// Only evaluate these cultural groups (repeatable)
        #[arg(short, long = "group", value_name = "GROUP")]
        groups: Vec<String>,
    },

    /// Evaluate a single URL and print its record
    Check {
        /// Cultural group whose concept dictionary is used
        group: String,

        url: String,
    },

    /// Print per-group category, country and status counts for a results file
    Summarize {
        results: PathBuf,
    },

    /// Re-evaluate the working URLs of a results file and report what changed
    Reanalyze {
        results: PathBuf,

        /// Write the updated results here instead of overwriting the input
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// URLs evaluated concurrently (overrides config)
        #[arg(short = 'j', long, value_name = "N")]
        parallel_jobs: Option<usize>,
    },

    /// Write a copy of a results file without the listed URLs
    Filter {
        results: PathBuf,

        /// File with one URL per line ('#' starts a comment)
        #[arg(long, value_name = "FILE")]
        remove: PathBuf,

        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
}

impl Cli {
    pub fn validate(&self) -> Result<(), String> {
        match &self.command {
            None if !self.init => {
                Err("A command is required (analyze, check, reanalyze, summarize or filter)".to_string())
            }
            Some(Commands::Analyze { parallel_jobs: Some(0), .. })
            | Some(Commands::Reanalyze { parallel_jobs: Some(0), .. }) => {
                Err("Parallel jobs must be greater than 0".to_string())
            }
            Some(Commands::Analyze { parallel_jobs: Some(n), .. })
            | Some(Commands::Reanalyze { parallel_jobs: Some(n), .. })
                if *n > 100 =>
            {
                Err("Parallel jobs cannot exceed 100".to_string())
            }
            Some(Commands::Check { url, .. }) if url.trim().is_empty() => {
                Err("URL cannot be empty".to_string())
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_args() {
        let cli = Cli::parse_from([
            "cultural-url-analyzer", "-vv", "analyze", "--input", "seeds.csv", "-j", "4", "--group", "filipino",
            "--group", "indian",
        ]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Some(Commands::Analyze { input, output, parallel_jobs, groups }) => {
                assert_eq!(input, PathBuf::from("seeds.csv"));
                assert_eq!(output, PathBuf::from("cultural_url_results.json"));
                assert_eq!(parallel_jobs, Some(4));
                assert_eq!(groups, vec!["filipino", "indian"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_init_without_command() {
        let cli = Cli::parse_from(["cultural-url-analyzer", "--init"]);
        assert!(cli.validate().is_ok());

        let cli = Cli::parse_from(["cultural-url-analyzer"]);
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_zero_jobs_rejected() {
        let cli = Cli::parse_from(["cultural-url-analyzer", "analyze", "-i", "s.json", "-j", "0"]);
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_filter_args() {
        let cli = Cli::parse_from([
            "cultural-url-analyzer", "filter", "results.json", "--remove", "drop.txt", "-o", "out.json",
        ]);
        assert!(matches!(cli.command, Some(Commands::Filter { .. })));
    }

    #[test]
    fn test_reanalyze_args() {
        let cli = Cli::parse_from(["cultural-url-analyzer", "reanalyze", "results.json", "-j", "3"]);
        match cli.command {
            Some(Commands::Reanalyze { results, output, parallel_jobs }) => {
                assert_eq!(results, PathBuf::from("results.json"));
                assert_eq!(output, None);
                assert_eq!(parallel_jobs, Some(3));
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let cli = Cli::parse_from(["cultural-url-analyzer", "reanalyze", "results.json", "-j", "0"]);
        assert!(cli.validate().is_err());
    }
}
