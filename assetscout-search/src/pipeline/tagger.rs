//! Price and license inference from free text.
//!
//! The tagger only ever sees a title and a snippet, so every tag it produces
//! is a guess. Output labels carry an `(inferred)` suffix for that reason.

use regex::{Regex, RegexBuilder};

use crate::error::SearchError;
use crate::types::{LicenseTag, PriceTag};

/// Pattern tables the tagger is compiled from. All patterns are matched
/// case-insensitively against `title + " " + snippet`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRules {
    pub free: Vec<String>,
    pub paid: Vec<String>,
    /// Checked in order; the first license with a matching pattern wins.
    pub licenses: Vec<(LicenseTag, Vec<String>)>,
}

impl Default for TagRules {
    fn default() -> Self {
        Self {
            free: patterns(&[
                // "free" as a word, but not the tail of "royalty-free".
                r"(?:^|[^\w-])free\b",
                r"name your own price",
                r"pay what you want",
                // `$0` and `$0.00`, but not `$0.99`.
                r"\$0(?:\.00)?(?:[^\d.]|$)",
            ]),
            paid: patterns(&[
                r"[$€£]\s?\d",
                r"\b\d+(?:\.\d{2})?\s?(?:usd|eur|gbp)\b",
                r"\bpaid\b",
            ]),
            licenses: vec![
                (LicenseTag::Cc0, patterns(&[r"\bcc0\b", r"public domain"])),
                (LicenseTag::Mit, patterns(&[r"\bmit\b"])),
                (LicenseTag::Gpl, patterns(&[r"\bgpl"])),
                (
                    LicenseTag::CommercialUse,
                    patterns(&[r"commercial use", r"royalty[- ]free"]),
                ),
            ],
        }
    }
}

/// Compiled [`TagRules`].
#[derive(Debug, Clone)]
pub struct AttributeTagger {
    free: Vec<Regex>,
    paid: Vec<Regex>,
    licenses: Vec<(LicenseTag, Vec<Regex>)>,
}

impl AttributeTagger {
    /// Compile the default rules.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if a pattern does not compile.
    pub fn new() -> Result<Self, SearchError> {
        Self::from_rules(&TagRules::default())
    }

    /// Compile custom rules.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if a pattern does not compile.
    pub fn from_rules(rules: &TagRules) -> Result<Self, SearchError> {
        let licenses = rules
            .licenses
            .iter()
            .map(|(tag, pats)| Ok((*tag, compile_all(pats)?)))
            .collect::<Result<Vec<_>, SearchError>>()?;

        Ok(Self {
            free: compile_all(&rules.free)?,
            paid: compile_all(&rules.paid)?,
            licenses,
        })
    }

    /// Infer price tier and license from a record's text.
    ///
    /// A free signal beats a paid one: listings often show a struck-through
    /// price next to a "free" badge.
    pub fn tag(&self, title: &str, snippet: &str) -> (PriceTag, LicenseTag) {
        let text = format!("{title} {snippet}");

        let price = if any_match(&self.free, &text) {
            PriceTag::Free
        } else if any_match(&self.paid, &text) {
            PriceTag::Paid
        } else {
            PriceTag::Unknown
        };

        let license = self
            .licenses
            .iter()
            .find(|(_, pats)| any_match(pats, &text))
            .map_or(LicenseTag::Unknown, |(tag, _)| *tag);

        (price, license)
    }
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>, SearchError> {
    patterns
        .iter()
        .map(|pattern| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| SearchError::Config(format!("invalid tag pattern {pattern}: {e}")))
        })
        .collect()
}

fn any_match(patterns: &[Regex], text: &str) -> bool {
    patterns.iter().any(|re| re.is_match(text))
}

fn patterns(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}
