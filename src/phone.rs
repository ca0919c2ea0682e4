//! Phone-number detection by numbering plan.
//!
//! Each plan reports at most once per text, in table order. North American
//! numbers cannot be told apart, so they report the combined `US/Canada` plan
//! and the resolver splits their weight.

use once_cell::sync::Lazy;
use regex::Regex;

/// Label reported for North American numbers.
pub const NORTH_AMERICA: &str = "US/Canada";

struct NumberingPlan {
    label: &'static str,
    patterns: Vec<Regex>,
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("static phone pattern"))
        .collect()
}

/// International prefix patterns: `+CC 1`, `(+CC)`, `Tel: +CC`.
fn international(label: &'static str, code: &str) -> NumberingPlan {
    NumberingPlan {
        label,
        patterns: compile(&[
            &format!(r"\+{}[\s\-]?\d", code),
            &format!(r"\(\+{}\)", code),
            &format!(r"Tel:\s*\+{}", code),
        ]),
    }
}

static PLANS: Lazy<Vec<NumberingPlan>> = Lazy::new(|| {
    vec![
        NumberingPlan {
            label: NORTH_AMERICA,
            patterns: compile(&[
                r"\+1[\s\-]?\(?\d{3}\)?[\s\-]?\d{3}[\s\-]?\d{4}",
                r"\(\d{3}\)[\s\-]?\d{3}[\s\-]?\d{4}",
                r"\d{3}[\s\-]\d{3}[\s\-]\d{4}",
                r"\(\+1\)",
                r"Tel:\s*\+1",
            ]),
        },
        international("Philippines", "63"),
        international("India", "91"),
        international("Pakistan", "92"),
        international("Bangladesh", "880"),
        international("Sri Lanka", "94"),
        international("Thailand", "66"),
        international("Vietnam", "84"),
        international("Singapore", "65"),
        international("Malaysia", "60"),
        international("Indonesia", "62"),
        international("Nigeria", "234"),
        international("UK", "44"),
        international("Switzerland", "41"),
        international("Netherlands", "31"),
    ]
});

/// Numbering plans with at least one number in `text`.
pub fn detect_numbering_plans(text: &str) -> Vec<&'static str> {
    PLANS
        .iter()
        .filter(|plan| plan.patterns.iter().any(|re| re.is_match(text)))
        .map(|plan| plan.label)
        .collect()
}
