//! Keyword admission filter for civic relevance.
//!
//! A coarse filter, not a classifier: an article is admitted when at least
//! one term from a fixed civic/municipal vocabulary appears anywhere in its
//! lowercased title or body. False positives and negatives are acceptable;
//! the keyword list is the tuning knob.
//!
//! Rejected URLs are never recorded, so editing the keyword list takes
//! effect on the next run by re-extracting previously rejected pages.

use once_cell::sync::Lazy;

/// Civic/municipal topic terms, all lowercase.
static KEYWORDS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "city council",
        "ordinance",
        "zoning",
        "budget",
        "millage",
        "public works",
        "sewerage & water board",
        "swbno",
        "dpw",
        "planning commission",
        "permit",
        "tax",
        "mayor",
        "poll",
        "school board",
        "reform",
        "bond",
        "levy",
        "land use",
        "infrastructure",
        "litigation",
        "city hall",
        "municipal",
        "nopd",
        "nofd",
        "crime",
        "public safety",
        "drainage",
        "flooding",
        "affordable housing",
        "rta",
        "streetcar",
        "neighborhood",
        "city attorney",
        "audit",
        "tourism",
        "economic development",
        "property tax",
        "blight",
        "sanitation",
        "street repair",
        "pothole",
        "traffic",
        "parking",
    ]
});

/// Decide whether extracted content is in scope.
///
/// Lower-cases `title` and `body` and returns true iff any keyword is a
/// substring. Case-insensitive, no scoring, no weighting. The two parts
/// join on a newline so a spaced keyword cannot match across the
/// title/body boundary.
pub fn is_relevant(title: &str, body: &str) -> bool {
    !matching_keywords(title, body).is_empty()
}

/// The keywords that matched, for the admission log line.
pub fn matching_keywords(title: &str, body: &str) -> Vec<&'static str> {
    let blob = format!("{title}\n{body}").to_lowercase();
    KEYWORDS
        .iter()
        .filter(|kw| blob.contains(*kw))
        .copied()
        .collect()
}
