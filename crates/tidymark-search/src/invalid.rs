//! Heuristic detection of links that are probably dead or throwaway.
//!
//! Purely pattern based: nothing here touches the network.

use once_cell::sync::Lazy;
use regex::Regex;

use tidymark_core::{InvalidLink, InvalidReason, MergedRecord};

/// Url rules, checked in order; the first match decides the reason.
static URL_RULES: Lazy<Vec<(Regex, InvalidReason)>> = Lazy::new(|| {
    [
        (
            r"(?i)^https?://(localhost|127\.0\.0\.1|0\.0\.0\.0)(:\d+)?(?:[/?#]|$)",
            InvalidReason::Loopback,
        ),
        (
            r"(?i)^https?://(192\.168|10\.\d+)\.\d+\.\d+(:\d+)?(?:[/?#]|$)",
            InvalidReason::PrivateNetwork,
        ),
        (r"(?i)^file://", InvalidReason::FileScheme),
        (r"(?i)^chrome(-extension)?://", InvalidReason::BrowserInternal),
        (r"(?i)^about:", InvalidReason::AboutPage),
    ]
    .into_iter()
    .map(|(pattern, reason)| (Regex::new(pattern).expect("valid invalid-link pattern"), reason))
    .collect()
});

/// Tokens that mark temporary or test links, matched in title or url.
static SUSPICIOUS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)temp|tmp|test|example\.com|placeholder").expect("valid suspicious-token pattern")
});

/// Reason `record` looks invalid, if any.
pub fn invalid_reason(record: &MergedRecord) -> Option<InvalidReason> {
    let url = record.url();
    URL_RULES
        .iter()
        .find(|(re, _)| re.is_match(url))
        .map(|(_, reason)| *reason)
        .or_else(|| {
            (SUSPICIOUS.is_match(url) || SUSPICIOUS.is_match(record.title()))
                .then_some(InvalidReason::SuspiciousToken)
        })
}

/// Flagged records in input order.
pub fn find_invalid(records: &[MergedRecord]) -> Vec<InvalidLink> {
    records
        .iter()
        .filter_map(|record| {
            invalid_reason(record).map(|reason| InvalidLink {
                record: record.clone(),
                reason,
            })
        })
        .collect()
}
