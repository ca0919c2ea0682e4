pub mod address;
pub mod analyzer;
pub mod batch;
pub mod cli;
pub mod concepts;
pub mod config;
pub mod context;
pub mod country;
pub mod domain_utils;
pub mod export;
pub mod fetcher;
pub mod known_orgs;
pub mod link_discovery;
pub mod logger;
pub mod ordered;
pub mod page;
pub mod phone;
pub mod rate_limit;
pub mod record;
pub mod report;

pub use analyzer::Analyzer;
pub use record::{CulturalContext, EvaluationRecord, FetchStatus, GroupedResults};
