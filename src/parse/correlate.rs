use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use tracing::warn;

/// First 1-based page on which each student code appears.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageCorrelation {
    pub pages: BTreeMap<String, u32>,
    pub pages_scanned: usize,
    /// Scanning stopped at the page or time budget before every code was
    /// found.
    pub truncated: bool,
}

pub fn correlate_pages(
    pages: &[String],
    codes: &[String],
    max_pages: usize,
    timeout: Duration,
) -> PageCorrelation {
    let started = Instant::now();
    let mut correlation = PageCorrelation::default();

    for (index, page) in pages.iter().enumerate() {
        if correlation.pages.len() == codes.len() {
            break;
        }
        if index >= max_pages || started.elapsed() > timeout {
            correlation.truncated = true;
            warn!(
                pages_scanned = correlation.pages_scanned,
                codes_found = correlation.pages.len(),
                codes_total = codes.len(),
                "page correlation budget exhausted"
            );
            break;
        }

        correlation.pages_scanned += 1;
        let page_number = index as u32 + 1;
        for code in codes {
            if !correlation.pages.contains_key(code) && page.contains(code.as_str()) {
                correlation.pages.insert(code.clone(), page_number);
            }
        }
    }

    correlation
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages() -> Vec<String> {
        vec![
            "Kod: 1004567 Əli".to_string(),
            "davamı 1004567\nKod: 1009876 Leyla".to_string(),
            "Kod: 1005555 Nigar".to_string(),
        ]
    }

    #[test]
    fn records_first_page_for_each_code() {
        let codes = vec!["1004567".to_string(), "1009876".to_string()];
        let correlation = correlate_pages(&pages(), &codes, 10, Duration::from_secs(5));

        assert_eq!(correlation.pages.get("1004567"), Some(&1));
        assert_eq!(correlation.pages.get("1009876"), Some(&2));
        assert_eq!(correlation.pages_scanned, 2);
        assert!(!correlation.truncated);
    }

    #[test]
    fn page_budget_truncates_scan() {
        let codes = vec!["1005555".to_string()];
        let correlation = correlate_pages(&pages(), &codes, 2, Duration::from_secs(5));

        assert!(correlation.pages.is_empty());
        assert!(correlation.truncated);
        assert_eq!(correlation.pages_scanned, 2);
    }
}
