//! Physical-address extraction from page text.
//!
//! A line counts as an address when it carries a postal code or a city or
//! country name itself, and the text around it (previous line, the line, the
//! next two lines) carries both a postal code accepted for some country and a
//! location for that country. Headings and prose next to an address do not
//! qualify on their neighbours alone. Countries where street addresses
//! commonly omit postal codes are also accepted on a short line with a street
//! word and a local place name.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

const MIN_LINE_CHARS: usize = 5;
const MAX_LINE_CHARS: usize = 150;
const MAX_UNCODED_LINE_CHARS: usize = 80;
const STORED_ADDRESS_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    /// Whitespace-collapsed line, truncated to 100 characters.
    pub text: String,
    pub country: &'static str,
}

struct LocationIndicator {
    country: &'static str,
    patterns: Vec<Regex>,
}

struct PostalRule {
    country: &'static str,
    pattern: Regex,
    needs_local_indicator: bool,
}

fn ci(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .expect("static location pattern")
}

fn cs(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static location pattern")
}

static LOCATIONS: Lazy<Vec<LocationIndicator>> = Lazy::new(|| {
    vec![
        LocationIndicator {
            country: "Philippines",
            patterns: vec![
                ci(r"\b(?:Manila|Quezon City|Makati|Davao|Cebu|Taguig|Pasig|Caloocan|Zamboanga|Antipolo)\b"),
                ci(r"\b(?:Philippines|Philippine)\b"),
            ],
        },
        LocationIndicator {
            country: "India",
            patterns: vec![
                ci(r"\b(?:Mumbai|Delhi|Bangalore|Hyderabad|Chennai|Kolkata|Pune|Ahmedabad)\b"),
                ci(r"\bIndia\b"),
            ],
        },
        LocationIndicator {
            country: "Pakistan",
            patterns: vec![
                ci(r"\b(?:Karachi|Lahore|Islamabad|Rawalpindi|Faisalabad|Multan|Peshawar)\b"),
                ci(r"\bPakistan\b"),
            ],
        },
        LocationIndicator {
            country: "Bangladesh",
            patterns: vec![
                ci(r"\b(?:Dhaka|Chittagong|Khulna|Rajshahi|Sylhet)\b"),
                ci(r"\bBangladesh\b"),
            ],
        },
        LocationIndicator {
            country: "Sri Lanka",
            patterns: vec![
                ci(r"\b(?:Colombo|Kandy|Galle|Jaffna|Negombo)\b"),
                ci(r"\b(?:Sri Lanka|Ceylon)\b"),
            ],
        },
        LocationIndicator {
            country: "Thailand",
            patterns: vec![
                ci(r"\b(?:Bangkok|Chiang Mai|Phuket|Pattaya|Krabi)\b"),
                ci(r"\bThailand\b"),
            ],
        },
        LocationIndicator {
            country: "Vietnam",
            patterns: vec![
                ci(r"\b(?:Hanoi|Ho Chi Minh City|Da Nang|Hue|Nha Trang)\b"),
                ci(r"\b(?:Vietnam|Viet Nam)\b"),
            ],
        },
        LocationIndicator {
            country: "Singapore",
            patterns: vec![ci(r"\bSingapore\b")],
        },
        LocationIndicator {
            country: "Malaysia",
            patterns: vec![
                ci(r"\b(?:Kuala Lumpur|Penang|Johor Bahru|Ipoh|Malacca)\b"),
                ci(r"\bMalaysia\b"),
            ],
        },
        LocationIndicator {
            country: "Indonesia",
            patterns: vec![
                ci(r"\b(?:Jakarta|Surabaya|Bandung|Medan|Bali)\b"),
                ci(r"\bIndonesia\b"),
            ],
        },
        LocationIndicator {
            country: "Nigeria",
            patterns: vec![
                ci(r"\b(?:Lagos|Abuja|Ibadan|Kano|Port Harcourt|Enugu|Benin City)\b"),
                ci(r"\bNigeria\b"),
            ],
        },
        LocationIndicator {
            country: "US",
            patterns: vec![
                // Upper-case only: in a case-insensitive match "in", "or", "me" would all count.
                cs(r"\b(?:AL|AK|AZ|AR|CA|CO|CT|DE|FL|GA|HI|ID|IL|IN|IA|KS|KY|LA|ME|MD|MA|MI|MN|MS|MO|MT|NE|NV|NH|NJ|NM|NY|NC|ND|OH|OK|OR|PA|RI|SC|SD|TN|TX|UT|VT|VA|WA|WV|WI|WY)\b"),
                ci(r"\b(?:California|New York|Texas|Florida|Massachusetts|Illinois|Pennsylvania|Ohio|Michigan|Georgia|North Carolina|New Jersey|Virginia|Washington|Arizona|Colorado|Oregon|South Dakota|Austin|Sioux Falls)\b"),
                ci(r"\b(?:United States|USA|U\.S\.A|U\.S\.)"),
            ],
        },
        LocationIndicator {
            country: "UK",
            patterns: vec![
                ci(r"\b(?:London|Manchester|Birmingham|Edinburgh|Glasgow|Liverpool|Leeds)\b"),
                ci(r"\b(?:United Kingdom|UK|U\.K\.)"),
            ],
        },
        LocationIndicator {
            country: "Canada",
            patterns: vec![
                ci(r"\b(?:Toronto|Vancouver|Montreal|Ottawa|Calgary|Edmonton|Winnipeg|Surrey)\b"),
                cs(r"\b(?:BC|ON|QC|AB|MB|SK|NS|NB|NL|PE)\b"),
                ci(r"\bCanada\b"),
            ],
        },
        LocationIndicator {
            country: "Germany",
            patterns: vec![
                ci(r"\b(?:Munich|Berlin|Hamburg|Frankfurt|Cologne|Stuttgart|Düsseldorf|Dusseldorf|München|Leipzig|Dortmund|Essen|Dresden|Hannover|Nuremberg)\b"),
                ci(r"\b(?:Germany|Deutschland)\b"),
            ],
        },
    ]
});

static POSTAL_RULES: Lazy<Vec<PostalRule>> = Lazy::new(|| {
    vec![
        PostalRule { country: "US", pattern: cs(r"\b\d{5}(?:-\d{4})?\b"), needs_local_indicator: true },
        PostalRule {
            country: "Canada",
            pattern: cs(r"\b[ABCEGHJ-NPRSTVXY]\d[ABCEGHJ-NPRSTV-Z] ?\d[ABCEGHJ-NPRSTV-Z]\d\b"),
            needs_local_indicator: false,
        },
        PostalRule {
            country: "UK",
            pattern: cs(r"\b[A-Z]{1,2}\d{1,2}[A-Z]?\s?\d[A-Z]{2}\b"),
            needs_local_indicator: false,
        },
        PostalRule { country: "Philippines", pattern: cs(r"\b\d{4}\b"), needs_local_indicator: true },
        PostalRule { country: "India", pattern: cs(r"\b\d{6}\b"), needs_local_indicator: true },
        PostalRule { country: "Nigeria", pattern: cs(r"\b\d{6}\b"), needs_local_indicator: true },
        PostalRule { country: "Germany", pattern: cs(r"\b\d{5}\b"), needs_local_indicator: true },
    ]
});

const UNCODED_ADDRESS_COUNTRIES: &[&str] = &["Philippines", "Pakistan", "Bangladesh", "Indonesia", "Nigeria"];

static STREET_WORDS: Lazy<Regex> = Lazy::new(|| {
    ci(r"\b(?:Block|Town|Ward|District|Street|Avenue|Road|Lane|Barangay|Barrio|Zona|Sector|Jalan|Kampung|Close|Crescent)\b")
});

fn collapse_whitespace(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn located_countries(context: &str) -> Vec<&'static str> {
    LOCATIONS
        .iter()
        .filter(|loc| loc.patterns.iter().any(|re| re.is_match(context)))
        .map(|loc| loc.country)
        .collect()
}

fn postal_country(context: &str, located: &[&'static str]) -> Option<&'static str> {
    POSTAL_RULES
        .iter()
        .find(|rule| {
            rule.pattern.is_match(context)
                && (!rule.needs_local_indicator || located.contains(&rule.country))
        })
        .map(|rule| rule.country)
}

fn anchors_address(line: &str) -> bool {
    POSTAL_RULES.iter().any(|rule| rule.pattern.is_match(line))
        || LOCATIONS.iter().any(|loc| loc.patterns.iter().any(|re| re.is_match(line)))
}

/// All address lines in `text`, in document order.
pub fn extract_addresses(text: &str) -> Vec<Address> {
    let lines: Vec<String> = text.lines().map(collapse_whitespace).collect();
    let mut addresses = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let line_chars = line.chars().count();
        if !(MIN_LINE_CHARS..=MAX_LINE_CHARS).contains(&line_chars) || !anchors_address(line) {
            continue;
        }

        let neighbour = |idx: Option<usize>| -> Option<&str> {
            idx.and_then(|j| lines.get(j))
                .map(|l| l.as_str())
                .filter(|l| l.chars().count() < MAX_LINE_CHARS)
        };
        let context = [neighbour(i.checked_sub(1)), Some(line.as_str()), neighbour(Some(i + 1)), neighbour(Some(i + 2))]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");

        let located = located_countries(&context);
        let Some(&first_located) = located.first() else {
            continue;
        };

        let country = match postal_country(&context, &located) {
            Some(country) => Some(country),
            None if line_chars <= MAX_UNCODED_LINE_CHARS
                && UNCODED_ADDRESS_COUNTRIES.contains(&first_located)
                && STREET_WORDS.is_match(line) =>
            {
                Some(first_located)
            }
            None => None,
        };

        if let Some(country) = country {
            addresses.push(Address {
                text: truncate_chars(line, STORED_ADDRESS_CHARS),
                country,
            });
        }
    }

    addresses
}
