//! Filename-based categorization
//!
//! Pure functions mapping an attachment filename to a hierarchical
//! date/category/subcategory path. Deterministic and side-effect free:
//! the same filename always yields the same path.

use regex::Regex;
use std::sync::LazyLock;

/// Marker used when no date token is found in a filename.
pub const NO_DATE: &str = "No-Date";

/// Fallbacks when no pattern matches.
const OTHER_CATEGORY: &str = "Other";
const GENERAL_SUBCATEGORY: &str = "General";

/// Business-unit acronyms. A token match yields a category equal to the
/// matched acronym itself, upper-cased, and outranks every keyword
/// pattern below.
const BUSINESS_UNITS: &[&str] = &["ebo", "mbo", "lfs", "fofo"];

/// A keyword pattern mapping filename tokens to a category.
///
/// Single-word needles match as a whole token or as a substring of the
/// normalized filename; multi-word needles match as substrings only.
struct CategoryPattern {
    needles: &'static [&'static str],
    category: &'static str,
    sub_category: &'static str,
    priority: u8,
}

const CATEGORY_PATTERNS: &[CategoryPattern] = &[
    CategoryPattern {
        needles: &[
            "inventory",
            "receivable",
            "deposit",
            "payment",
            "invoice",
            "balance sheet",
            "p&l",
            "profit",
            "loss",
        ],
        category: "Financial",
        sub_category: "",
        priority: 90,
    },
    CategoryPattern {
        needles: &["mis", "report", "analysis", "summary", "review", "performance"],
        category: "Reports",
        sub_category: "",
        priority: 80,
    },
    CategoryPattern {
        needles: &[
            "sale",
            "revenue",
            "transaction",
            "store wise",
            "like to like",
            "ltl",
            "sssg",
        ],
        category: "Sales",
        sub_category: "",
        priority: 70,
    },
    CategoryPattern {
        needles: &["count", "metrics", "kpi", "statistics", "footfall", "conversion"],
        category: "Metrics",
        sub_category: "",
        priority: 60,
    },
];

const SUB_CATEGORY_PATTERNS: &[CategoryPattern] = &[
    CategoryPattern {
        needles: &["inventory", "receivable", "stock"],
        category: "Financial",
        sub_category: "Assets",
        priority: 90,
    },
    CategoryPattern {
        needles: &["deposit", "payment"],
        category: "Financial",
        sub_category: "Transactions",
        priority: 90,
    },
    CategoryPattern {
        needles: &["like to like", "ltl", "comparison"],
        category: "Sales",
        sub_category: "Comparisons",
        priority: 80,
    },
    CategoryPattern {
        needles: &["store wise", "storewise"],
        category: "Sales",
        sub_category: "Store-Performance",
        priority: 70,
    },
    CategoryPattern {
        needles: &["mis"],
        category: "Reports",
        sub_category: "MIS",
        priority: 90,
    },
    CategoryPattern {
        needles: &["analysis", "detailed"],
        category: "Reports",
        sub_category: "Analysis",
        priority: 80,
    },
];

pub(crate) const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const MONTH_ALTERNATION: &str = "january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sep|oct|nov|dec";

static MONTH_THEN_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"({})[\s_-]*(20\d{{2}}|\d{{2}})", MONTH_ALTERNATION)).unwrap()
});

static YEAR_THEN_MONTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(20\d{{2}}|\d{{2}})[\s_-]*({})", MONTH_ALTERNATION)).unwrap()
});

static NUMERIC_MONTH_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{2})[-_]+(20\d{2}|\d{2})").unwrap());

/// A hierarchical destination derived from one filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryPath {
    /// "YYYY/MonthName", or [`NO_DATE`].
    pub date_path: String,
    pub category: String,
    pub sub_category: String,
}

impl CategoryPath {
    /// Full path: `datePath/category/subCategory`.
    pub fn path(&self) -> String {
        format!("{}/{}/{}", self.date_path, self.category, self.sub_category)
    }
}

/// Categorize one filename.
pub fn categorize(filename: &str) -> CategoryPath {
    let normalized = normalize(filename);
    let words = tokenize(&normalized);

    let date_path = extract_date_path(&normalized);

    let category = match business_unit(&words) {
        Some(unit) => unit.to_uppercase(),
        None => find_match(&normalized, &words, CATEGORY_PATTERNS, None)
            .map(|p| p.category.to_string())
            .unwrap_or_else(|| OTHER_CATEGORY.to_string()),
    };

    let sub_category = find_match(&normalized, &words, SUB_CATEGORY_PATTERNS, Some(&category))
        .map(|p| p.sub_category.to_string())
        .unwrap_or_else(|| GENERAL_SUBCATEGORY.to_string());

    CategoryPath {
        date_path,
        category,
        sub_category,
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Split on whitespace, underscores, and hyphens.
fn tokenize(normalized: &str) -> Vec<&str> {
    normalized
        .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .filter(|t| !t.is_empty())
        .collect()
}

/// First business-unit acronym appearing as a whole token.
fn business_unit<'a>(words: &[&'a str]) -> Option<&'a str> {
    words
        .iter()
        .copied()
        .find(|word| BUSINESS_UNITS.contains(word))
}

/// Highest-priority pattern matching the filename, optionally restricted
/// to patterns declared for one category. Priority order is total; ties
/// resolve by table order, so the result is deterministic.
fn find_match<'a>(
    normalized: &str,
    words: &[&str],
    patterns: &'a [CategoryPattern],
    category_filter: Option<&str>,
) -> Option<&'a CategoryPattern> {
    let mut candidates: Vec<&CategoryPattern> = patterns
        .iter()
        .filter(|p| category_filter.is_none_or(|c| p.category == c))
        .collect();
    candidates.sort_by(|a, b| b.priority.cmp(&a.priority));

    candidates.into_iter().find(|pattern| {
        pattern
            .needles
            .iter()
            .any(|needle| words.contains(needle) || normalized.contains(needle))
    })
}

/// Infer "YYYY/MonthName" from date tokens in the filename.
///
/// Tried in order: month name then year, year then month name, and a
/// two-digit month/year pair separated by dashes or underscores. Two
/// digit years expand with a "20" prefix. Returns [`NO_DATE`] when
/// nothing matches.
fn extract_date_path(normalized: &str) -> String {
    if let Some(caps) = MONTH_THEN_YEAR.captures(normalized) {
        if let Some(month) = month_name(&caps[1]) {
            return format!("{}/{}", expand_year(&caps[2]), month);
        }
    }
    if let Some(caps) = YEAR_THEN_MONTH.captures(normalized) {
        if let Some(month) = month_name(&caps[2]) {
            return format!("{}/{}", expand_year(&caps[1]), month);
        }
    }
    if let Some(caps) = NUMERIC_MONTH_YEAR.captures(normalized) {
        let month_number: usize = caps[1].parse().unwrap_or(0);
        if (1..=12).contains(&month_number) {
            return format!(
                "{}/{}",
                expand_year(&caps[2]),
                MONTH_NAMES[month_number - 1]
            );
        }
    }
    NO_DATE.to_string()
}

/// Map a month token ("mar", "march") to its full name.
fn month_name(token: &str) -> Option<&'static str> {
    let prefix = token.get(..3)?;
    MONTH_NAMES
        .iter()
        .find(|name| name.to_lowercase().starts_with(prefix))
        .copied()
}

/// "24" -> "2024"; four-digit years pass through.
fn expand_year(year: &str) -> String {
    if year.len() == 2 {
        format!("20{}", year)
    } else {
        year.to_string()
    }
}
