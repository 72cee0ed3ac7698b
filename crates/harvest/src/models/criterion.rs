//! Search criterion parsing and predicate construction
//!
//! Turns a free-form user string (email address, bare domain, or company
//! name) into a normalized Gmail search predicate. The company-name path
//! guesses likely domains by enumerating common suffixes; it is a
//! best-effort heuristic, kept behind this type so it can be swapped for
//! a real domain-lookup service without touching the pipeline.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::ValidationError;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9]+([-.][a-zA-Z0-9]+)*\.[a-zA-Z]{2,}$").unwrap()
});

static DOMAIN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9]+([-.][a-zA-Z0-9]+)*\.[a-zA-Z]{2,}$").unwrap());

static COMPANY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9]+([ -][a-zA-Z0-9]+)*$").unwrap());

/// Domain suffixes tried when the user gives a bare company name.
///
/// Intentionally imprecise: the disjunction may over- or under-match,
/// but it catches a company's likely domains without a WHOIS/MX lookup.
const DOMAIN_SUFFIXES: &[&str] = &[".com", ".in", ".co.in", ".io", ".net", ".org", ".co", ".ai"];

/// Which form the user's input took.
///
/// Exactly one kind is selected, in validation order: email address
/// first, then bare domain, then company-name fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CriterionKind {
    EmailAddress,
    Domain,
    CompanyName,
}

/// A validated sender criterion, derived once per user query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCriterion {
    pub kind: CriterionKind,
    pub value: String,
}

impl SearchCriterion {
    /// Classify a raw user string, rejecting anything that matches no
    /// accepted form. No network call is made here or by the caller on
    /// rejection.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::new(input));
        }

        if EMAIL_PATTERN.is_match(trimmed) {
            return Ok(Self {
                kind: CriterionKind::EmailAddress,
                value: trimmed.to_lowercase(),
            });
        }
        if DOMAIN_PATTERN.is_match(trimmed) {
            return Ok(Self {
                kind: CriterionKind::Domain,
                value: trimmed.to_lowercase(),
            });
        }
        if COMPANY_PATTERN.is_match(trimmed) {
            return Ok(Self {
                kind: CriterionKind::CompanyName,
                value: trimmed.to_string(),
            });
        }
        Err(ValidationError::new(input))
    }

    /// Build the mail-store search predicate for this criterion.
    pub fn predicate(&self) -> String {
        match self.kind {
            CriterionKind::EmailAddress => format!("from:{}", self.value),
            CriterionKind::Domain => format!("from:*@{}", self.value),
            CriterionKind::CompanyName => {
                let base = self.normalized_base();
                let terms: Vec<String> = DOMAIN_SUFFIXES
                    .iter()
                    .map(|suffix| format!("from:*@{}{}", base, suffix))
                    .collect();
                terms.join(" OR ")
            }
        }
    }

    /// Company name reduced to its alphanumeric base ("Acme Corp" -> "acmecorp").
    fn normalized_base(&self) -> String {
        self.value
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_email_address() {
        let criterion = SearchCriterion::parse("Billing@Gruhas.com").unwrap();
        assert_eq!(criterion.kind, CriterionKind::EmailAddress);
        assert_eq!(criterion.value, "billing@gruhas.com");
        assert_eq!(criterion.predicate(), "from:billing@gruhas.com");
    }

    #[test]
    fn test_parse_domain() {
        let criterion = SearchCriterion::parse("gruhas.com").unwrap();
        assert_eq!(criterion.kind, CriterionKind::Domain);
        assert_eq!(criterion.predicate(), "from:*@gruhas.com");
    }

    #[test]
    fn test_parse_subdomain() {
        let criterion = SearchCriterion::parse("mail.acme-corp.co.in").unwrap();
        assert_eq!(criterion.kind, CriterionKind::Domain);
        assert_eq!(criterion.predicate(), "from:*@mail.acme-corp.co.in");
    }

    #[test]
    fn test_parse_company_name() {
        let criterion = SearchCriterion::parse("Acme Corp").unwrap();
        assert_eq!(criterion.kind, CriterionKind::CompanyName);

        let predicate = criterion.predicate();
        assert!(predicate.starts_with("from:*@acmecorp.com"));
        assert!(predicate.contains(" OR from:*@acmecorp.in"));
        assert!(predicate.contains(" OR from:*@acmecorp.co.in"));
        assert_eq!(predicate.matches("from:*@").count(), 8);
    }

    #[test]
    fn test_email_wins_over_company() {
        // "a@b.com" also contains company-legal characters; email is
        // checked first so it must win.
        let criterion = SearchCriterion::parse("sales@acme.io").unwrap();
        assert_eq!(criterion.kind, CriterionKind::EmailAddress);
    }

    #[test]
    fn test_domain_wins_over_company() {
        let criterion = SearchCriterion::parse("acme.io").unwrap();
        assert_eq!(criterion.kind, CriterionKind::Domain);
    }

    #[test]
    fn test_single_letter_tld_rejected_as_domain() {
        // "acme.x" fails the domain pattern (TLD needs two letters) and
        // the dot disqualifies it as a company name.
        assert!(SearchCriterion::parse("acme.x").is_err());
    }

    #[test]
    fn test_rejects_invalid_input() {
        assert!(SearchCriterion::parse("").is_err());
        assert!(SearchCriterion::parse("   ").is_err());
        assert!(SearchCriterion::parse("acme!corp").is_err());
        assert!(SearchCriterion::parse("@gruhas.com").is_err());
    }

    #[test]
    fn test_hyphenated_company_name() {
        let criterion = SearchCriterion::parse("north-star retail").unwrap();
        assert_eq!(criterion.kind, CriterionKind::CompanyName);
        assert!(criterion.predicate().contains("from:*@northstarretail.com"));
    }
}
