//! Fee Schedule Book
//!
//! Maps free-text programme names to canonical fee schedule templates.
//! The book is constructed once at startup (built-in table or YAML file) and
//! resolution is a pure function over it: exact match against canonical
//! names first, then fixed-priority keyword containment on the uppercased
//! input. A miss is a hard stop for callers, never a default template.

use std::path::Path;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::FeeComponent;

/// Keyword rules in priority order: the first rule with any keyword
/// contained in the uppercased programme name wins.
const KEYWORD_RULES: &[(&[&str], &str)] = &[
    (
        &["COMPUTER SCIENCE", "CS"],
        "BACHELOR OF SCIENCE (COMPUTER SCIENCE)",
    ),
    (
        &["INFORMATION TECHNOLOGY", "IT"],
        "BACHELOR OF SCIENCE (INFORMATION TECHNOLOGY)",
    ),
    (
        &["SOFTWARE ENGINEERING"],
        "BACHELOR OF SCIENCE (SOFTWARE ENGINEERING)",
    ),
    (
        &["BUSINESS ADMINISTRATION", "BUSINESS"],
        "BACHELOR OF BUSINESS ADMINISTRATION",
    ),
    (
        &["ACCOUNTING", "ACCOUNTANCY"],
        "BACHELOR OF COMMERCE (ACCOUNTING)",
    ),
];

/// Fee schedule for one programme. Laboratory is present only for
/// science/technical programmes; the total is always recomputed from the
/// present components, never stored independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeScheduleTemplate {
    pub programme: String,
    pub admission: Decimal,
    pub tuition: Decimal,
    pub accommodation: Decimal,
    pub library: Decimal,
    #[serde(default)]
    pub laboratory: Option<Decimal>,
    pub examination: Decimal,
}

impl FeeScheduleTemplate {
    pub fn total(&self) -> Decimal {
        self.admission
            + self.tuition
            + self.accommodation
            + self.library
            + self.laboratory.unwrap_or_default()
            + self.examination
    }

    /// Present components with their amounts, in due-date order.
    pub fn components(&self) -> Vec<(FeeComponent, Decimal)> {
        let mut parts = vec![
            (FeeComponent::Admission, self.admission),
            (FeeComponent::Tuition, self.tuition),
            (FeeComponent::Accommodation, self.accommodation),
            (FeeComponent::Library, self.library),
        ];
        if let Some(laboratory) = self.laboratory {
            parts.push((FeeComponent::Laboratory, laboratory));
        }
        parts.push((FeeComponent::Examination, self.examination));
        parts
    }

    pub fn amount_for(&self, component: FeeComponent) -> Option<Decimal> {
        match component {
            FeeComponent::Admission => Some(self.admission),
            FeeComponent::Tuition => Some(self.tuition),
            FeeComponent::Accommodation => Some(self.accommodation),
            FeeComponent::Library => Some(self.library),
            FeeComponent::Laboratory => self.laboratory,
            FeeComponent::Examination => Some(self.examination),
        }
    }
}

/// Root of a fee book YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FeeBookFile {
    templates: Vec<FeeScheduleTemplate>,
}

/// Immutable fee template lookup, injected into the engine at construction.
#[derive(Debug, Clone)]
pub struct FeeScheduleBook {
    templates: Vec<FeeScheduleTemplate>,
}

impl FeeScheduleBook {
    pub fn from_templates(templates: Vec<FeeScheduleTemplate>) -> Self {
        Self { templates }
    }

    /// The canonical five-programme table shipped with the engine.
    pub fn builtin() -> Self {
        fn d(n: i64) -> Decimal {
            Decimal::new(n, 0)
        }

        let template = |programme: &str, tuition: i64, laboratory: Option<i64>| {
            FeeScheduleTemplate {
                programme: programme.to_string(),
                admission: d(5000),
                tuition: d(tuition),
                accommodation: d(3500),
                library: d(600),
                laboratory: laboratory.map(d),
                examination: d(800),
            }
        };

        Self::from_templates(vec![
            template("BACHELOR OF SCIENCE (COMPUTER SCIENCE)", 20000, Some(1500)),
            template(
                "BACHELOR OF SCIENCE (INFORMATION TECHNOLOGY)",
                18000,
                Some(1200),
            ),
            template(
                "BACHELOR OF SCIENCE (SOFTWARE ENGINEERING)",
                22000,
                Some(1500),
            ),
            template("BACHELOR OF BUSINESS ADMINISTRATION", 15000, None),
            template("BACHELOR OF COMMERCE (ACCOUNTING)", 16000, None),
        ])
    }

    /// Load a book from a YAML file in the builtin shape.
    pub fn load_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fee book {}", path.display()))?;
        let file: FeeBookFile = serde_yaml::from_str(&raw)
            .with_context(|| format!("Failed to parse fee book {}", path.display()))?;
        Ok(Self::from_templates(file.templates))
    }

    pub fn templates(&self) -> &[FeeScheduleTemplate] {
        &self.templates
    }

    /// Resolve a programme name to its template.
    ///
    /// Exact case-sensitive match first; on a miss the uppercased input is
    /// tested against the keyword rules in their fixed order, so a name
    /// matching several rules resolves deterministically to the first.
    pub fn resolve(&self, programme_name: &str) -> Option<&FeeScheduleTemplate> {
        if let Some(exact) = self
            .templates
            .iter()
            .find(|t| t.programme == programme_name)
        {
            return Some(exact);
        }

        let upper = programme_name.to_uppercase();
        for (keywords, canonical) in KEYWORD_RULES {
            if keywords.iter().any(|kw| upper.contains(kw)) {
                return self.templates.iter().find(|t| t.programme == *canonical);
            }
        }
        None
    }
}

impl Default for FeeScheduleBook {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn exact_match_wins_before_keywords() {
        let book = FeeScheduleBook::builtin();
        let template = book
            .resolve("BACHELOR OF SCIENCE (INFORMATION TECHNOLOGY)")
            .expect("IT template");
        assert_eq!(template.tuition, Decimal::new(18000, 0));
        assert_eq!(template.total(), Decimal::new(26100, 0));
    }

    #[test]
    fn computer_science_keyword_matches_any_casing_and_extra_words() {
        let book = FeeScheduleBook::builtin();
        for name in [
            "Bachelor of Science (Computer Science)",
            "bsc computer science - evening programme",
            "DIPLOMA IN COMPUTER SCIENCE",
        ] {
            let template = book.resolve(name).expect("CS template");
            assert_eq!(template.programme, "BACHELOR OF SCIENCE (COMPUTER SCIENCE)");
        }
    }

    #[test]
    fn first_matching_rule_wins_on_multi_keyword_names() {
        let book = FeeScheduleBook::builtin();
        // Contains both CS and BUSINESS keywords; CS is evaluated first.
        let template = book
            .resolve("COMPUTER SCIENCE FOR BUSINESS")
            .expect("template");
        assert_eq!(template.programme, "BACHELOR OF SCIENCE (COMPUTER SCIENCE)");
    }

    #[test]
    fn unknown_programme_is_a_hard_miss() {
        let book = FeeScheduleBook::builtin();
        assert!(book.resolve("BACHELOR OF MEDICINE").is_none());
    }

    #[test]
    fn laboratory_only_on_technical_programmes() {
        let book = FeeScheduleBook::builtin();
        assert!(book
            .resolve("SOFTWARE ENGINEERING")
            .and_then(|t| t.laboratory)
            .is_some());
        assert!(book
            .resolve("BACHELOR OF BUSINESS ADMINISTRATION")
            .and_then(|t| t.laboratory)
            .is_none());
    }

    #[test]
    fn yaml_book_round_trips_resolution() {
        let book = FeeScheduleBook::builtin();
        let file = FeeBookFile {
            templates: book.templates().to_vec(),
        };
        let yaml = serde_yaml::to_string(&file).expect("serialize fee book");

        let mut tmp = tempfile::NamedTempFile::new().expect("temp file");
        tmp.write_all(yaml.as_bytes()).expect("write fee book");

        let loaded = FeeScheduleBook::load_yaml(tmp.path()).expect("load fee book");
        let template = loaded
            .resolve("BACHELOR OF SCIENCE (INFORMATION TECHNOLOGY)")
            .expect("IT template");
        assert_eq!(template.total(), Decimal::new(26100, 0));
        assert!(loaded.resolve("UNKNOWN PROGRAMME OF STUDY").is_none());
    }
}
