//! Heuristic mapping of recognized text fragments to record fields
//!
//! A CNIC front face carries no machine-readable zone, so the mapper works
//! from the shapes of the recognized values themselves: two alphabetic words
//! are a name, `M`/`F` is a gender, `#####-#######-#` is the identity
//! number, and so on. Rules are ordered, first match wins, and each field is
//! assigned at most once.
//!
//! Dates are the one genuinely ambiguous shape: birth, issue, and expiry all
//! print as `dd.mm.yyyy`. They are disambiguated purely by arrival order
//! among date-shaped fragments (birth, then issue, then expiry), which makes
//! the recognizer's reading order load-bearing. This is a known limitation,
//! not a calendar-aware classifier.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::vision::ocr::TextFragment;

/// Structured record extracted from one captured document.
///
/// Unset fields stay `None`; there is no error state for a missing field.
/// Records are never mutated after extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub name: Option<String>,
    pub father_name: Option<String>,
    pub gender: Option<String>,
    pub country_of_stay: Option<String>,
    pub identity_number: Option<String>,
    pub date_of_birth: Option<String>,
    pub date_of_issue: Option<String>,
    pub date_of_expiry: Option<String>,
}

impl IdentityRecord {
    /// A record is complete only when every field holds a non-empty value
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Names of the fields still unset, in schema order
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let fields = [
            ("name", &self.name),
            ("father_name", &self.father_name),
            ("gender", &self.gender),
            ("country_of_stay", &self.country_of_stay),
            ("identity_number", &self.identity_number),
            ("date_of_birth", &self.date_of_birth),
            ("date_of_issue", &self.date_of_issue),
            ("date_of_expiry", &self.date_of_expiry),
        ];

        fields
            .into_iter()
            .filter(|(_, value)| value.as_deref().map_or(true, str::is_empty))
            .map(|(name, _)| name)
            .collect()
    }
}

/// Maps an unordered bag of recognized fragments onto the record schema
pub struct FieldExtractor {
    two_words: Regex,
    father_label: Regex,
    identity_number: Regex,
    date: Regex,
    country: String,
}

impl FieldExtractor {
    /// Create an extractor for the given country-of-stay value
    pub fn new(country: &str) -> Self {
        Self {
            two_words: Regex::new(r"^[A-Za-z]+\s[A-Za-z]+$").expect("valid pattern"),
            // Tolerates the common OCR misreads of the "Father Name" label
            father_label: Regex::new(r"(?i)(Father|ather|Fther)").expect("valid pattern"),
            identity_number: Regex::new(r"^\d{5}-\d{7}-\d$").expect("valid pattern"),
            date: Regex::new(r"^\d{2}\.\d{2}\.\d{4}").expect("valid pattern"),
            country: country.to_string(),
        }
    }

    /// Run the ordered rules over the fragments, in recognizer order
    pub fn extract(&self, fragments: &[TextFragment]) -> IdentityRecord {
        let mut record = IdentityRecord::default();

        for fragment in fragments {
            let text = normalize(&fragment.text);
            if text.is_empty() {
                continue;
            }

            if self.two_words.is_match(&text) && record.name.is_none() {
                record.name = Some(text);
            } else if self.father_label.is_match(&text) {
                // Label noise, not a value
            } else if self.two_words.is_match(&text)
                && record.father_name.is_none()
                && record.name.is_some()
            {
                record.father_name = Some(text);
            } else if (text == "M" || text == "F") && record.gender.is_none() {
                record.gender = Some(text);
            } else if text.eq_ignore_ascii_case(&self.country) && record.country_of_stay.is_none() {
                record.country_of_stay = Some(text);
            } else if self.identity_number.is_match(&text) && record.identity_number.is_none() {
                record.identity_number = Some(text);
            } else if self.date.is_match(&text) {
                // First unset of birth/issue/expiry, in that fixed order
                if record.date_of_birth.is_none() {
                    record.date_of_birth = Some(text);
                } else if record.date_of_issue.is_none() {
                    record.date_of_issue = Some(text);
                } else if record.date_of_expiry.is_none() {
                    record.date_of_expiry = Some(text);
                }
            }
        }

        record
    }
}

/// Collapse embedded line breaks to spaces and trim
fn normalize(text: &str) -> String {
    text.replace('\n', " ").trim().to_string()
}
