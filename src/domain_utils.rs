//! Host and domain helpers shared by the registry, heuristics and rate limiter.

use url::Url;

/// Second-level suffixes under which the registrable domain needs three labels.
const COMPOUND_TLDS: &[&str] = &[
    "co.uk", "org.uk", "ac.uk", "gov.uk", "co.au", "com.au", "net.au", "co.nz",
    "com.ph", "gov.ph", "edu.ph", "org.ph", "co.in", "com.pk", "com.bd", "com.lk",
    "co.th", "com.vn", "com.sg", "com.my", "co.id", "com.ng",
];

/// Lowercased host of an http(s) URL, without port.
pub fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    match parsed.scheme() {
        "http" | "https" => parsed.host_str().map(|h| h.to_lowercase()),
        _ => None,
    }
}

/// Host with a leading `www.` removed.
pub fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// True when `host` is `known` or one of its subdomains.
pub fn matches_domain(host: &str, known: &str) -> bool {
    host == known
        || (host.len() > known.len()
            && host.ends_with(known)
            && host.as_bytes()[host.len() - known.len() - 1] == b'.')
}

/// Extract the registrable domain, e.g. `blog.example.co.uk` -> `example.co.uk`.
pub fn extract_base_domain(host: &str) -> String {
    let host = host.to_lowercase();
    let parts: Vec<&str> = host.split('.').collect();
    if parts.len() <= 2 {
        return host;
    }

    let last_two = format!("{}.{}", parts[parts.len() - 2], parts[parts.len() - 1]);
    if COMPOUND_TLDS.contains(&last_two.as_str()) {
        format!("{}.{}", parts[parts.len() - 3], last_two)
    } else {
        last_two
    }
}

/// True when any label of the host is `bank`, e.g. `firstcitizens.bank`.
pub fn has_bank_label(host: &str) -> bool {
    host.split('.').skip(1).any(|label| label == "bank")
}
