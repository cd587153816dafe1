/// Keywords used to decide whether a page is financially relevant; this
/// keeps general news off the index.
pub const FINANCIAL_KEYWORDS: &[&str] = &[
    "stock", "market", "nse", "bse", "sensex", "nifty", "ipo", "fpo", "equity", "shares",
    "invest", "trading", "rbi", "earnings", "quarter", "profit", "revenue", "economy", "gdp",
    "inflation", "gst", "finance", "brokerage", "fed",
];

const MIN_BODY_CHARS: usize = 300;
const MIN_DISTINCT_KEYWORDS: usize = 2;
const PAYWALL_MARKERS: &[&str] = &["etprime member", "subscribe to read"];

/// True when the article looks like real financial news: long enough, not
/// behind a paywall teaser, and mentioning at least two distinct keywords.
pub fn is_relevant(title: &str, body: &str) -> bool {
    if body.len() < MIN_BODY_CHARS {
        return false;
    }
    let lower_body = body.to_lowercase();
    if PAYWALL_MARKERS.iter().any(|marker| lower_body.contains(marker)) {
        return false;
    }
    let combined = format!("{} {}", title.to_lowercase(), lower_body);
    let found = FINANCIAL_KEYWORDS
        .iter()
        .filter(|keyword| combined.contains(*keyword))
        .count();
    found >= MIN_DISTINCT_KEYWORDS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_body(content: &str) -> String {
        format!("{} {}", content, "filler ".repeat(60))
    }

    #[test]
    fn test_relevant_article_passes() {
        let body = long_body("The sensex rallied as earnings beat estimates across the market.");
        assert!(is_relevant("Markets close higher", &body));
    }

    #[test]
    fn test_short_body_rejected() {
        assert!(!is_relevant("Sensex up, nifty up", "stock market rally"));
    }

    #[test]
    fn test_single_keyword_rejected() {
        let body = long_body("The cricket team won the final in front of a huge crowd. Profit!");
        assert!(!is_relevant("Match report", &body));
    }

    #[test]
    fn test_paywall_marker_rejected() {
        let body = long_body("Subscribe to read this market and earnings analysis.");
        assert!(!is_relevant("Stock deep-dive", &body));
    }

    #[test]
    fn test_keywords_counted_across_title_and_body() {
        let body = long_body("The central bank kept inflation in focus this quarter.");
        assert!(is_relevant("RBI policy review", &body));
    }
}
