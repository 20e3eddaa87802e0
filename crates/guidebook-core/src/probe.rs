//! # Content Probe
//!
//! Looks up one key in one bundle and returns a typed candidate:
//! absent, placeholder, or meaningful with a normalized value.
//!
//! ## Normalization
//!
//! - Strings are trimmed
//! - Arrays keep only meaningful entries; the array is meaningful when one
//!   entry survives
//! - Sections accept `body`, `items` or `list` for their paragraphs and get a
//!   stable id: explicit id, then title slug, then `section-{n}`
//! - FAQs accept `q`/`question` and `a`/`answer` (string or array); an entry
//!   needs a question and at least one answer
//! - ToC rows accept `[{href, label}]` or an `{anchor: label}` map
//!
//! A value of the wrong shape is `Absent`, never an error.

use crate::bundle::Bundle;
use crate::classifier::PlaceholderClassifier;
use crate::primitives::SECTION_ID_PREFIX;
use crate::types::{
    CandidateValue, ContentKey, FaqEntry, FieldShape, FieldValue, PlaceholderReason, Section,
    TocEntry,
};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Probes bundles through a classifier.
#[derive(Debug, Clone, Copy)]
pub struct ContentProbe<'c> {
    classifier: &'c PlaceholderClassifier,
}

impl<'c> ContentProbe<'c> {
    #[must_use]
    pub const fn new(classifier: &'c PlaceholderClassifier) -> Self {
        Self { classifier }
    }

    /// Look up `key` in `bundle` and normalize it to `shape`.
    ///
    /// A missing bundle behaves like a missing key.
    #[must_use]
    pub fn probe(
        &self,
        bundle: Option<&Bundle>,
        key: &ContentKey,
        shape: FieldShape,
    ) -> CandidateValue<FieldValue> {
        match bundle.and_then(|b| b.lookup(key)) {
            Some(value) => self.normalize(value, key, shape),
            None => CandidateValue::Absent,
        }
    }

    /// Normalize a raw bundle value to `shape`.
    #[must_use]
    pub fn normalize(
        &self,
        value: &Value,
        key: &ContentKey,
        shape: FieldShape,
    ) -> CandidateValue<FieldValue> {
        if value.is_null() {
            return CandidateValue::Absent;
        }
        match shape {
            FieldShape::Text => self.text(value, key).map(FieldValue::Text),
            FieldShape::Paragraphs => self.paragraphs(value, key).map(FieldValue::Paragraphs),
            FieldShape::Sections => self.sections(value, key).map(FieldValue::Sections),
            FieldShape::Faqs => self.faqs(value, key).map(FieldValue::Faqs),
            FieldShape::Toc => self.toc(value, key).map(FieldValue::Toc),
        }
    }

    fn text(&self, value: &Value, key: &ContentKey) -> CandidateValue<String> {
        let Some(text) = value.as_str() else {
            return CandidateValue::Absent;
        };
        match self.classifier.classify(text, key) {
            Some(reason) => CandidateValue::Placeholder(reason),
            None => CandidateValue::Meaningful(text.trim().to_string()),
        }
    }

    fn paragraphs(&self, value: &Value, key: &ContentKey) -> CandidateValue<Vec<String>> {
        match value {
            Value::String(_) => self.text(value, key).map(|text| vec![text]),
            Value::Array(items) => {
                let mut tally = Tally::default();
                let kept: Vec<String> = items
                    .iter()
                    .filter_map(|item| tally.observe(self.text(item, key)))
                    .collect();
                tally.finish(kept, items.is_empty())
            }
            _ => CandidateValue::Absent,
        }
    }

    /// Meaningful strings of a string-or-array sub-field.
    fn string_list(&self, value: Option<&Value>, key: &ContentKey) -> Vec<String> {
        match value {
            Some(Value::String(text)) => self.classifier.accept(text, key).into_iter().collect(),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .filter_map(|text| self.classifier.accept(text, key))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn string_field(&self, map: &Map<String, Value>, names: &[&str], key: &ContentKey) -> String {
        names
            .iter()
            .find_map(|name| map.get(*name).and_then(Value::as_str))
            .and_then(|text| self.classifier.accept(text, key))
            .unwrap_or_default()
    }

    fn sections(&self, value: &Value, key: &ContentKey) -> CandidateValue<Vec<Section>> {
        let Some(items) = value.as_array() else {
            return CandidateValue::Absent;
        };

        let mut tally = Tally::default();
        let mut drafts: Vec<(Option<String>, Section)> = Vec::new();
        for item in items {
            let candidate = match item {
                Value::String(_) => self.text(item, key).map(|text| (None, body_only(text))),
                Value::Object(map) => self.section_entry(map, key),
                _ => CandidateValue::Absent,
            };
            if let Some(draft) = tally.observe(candidate) {
                drafts.push(draft);
            }
        }

        let sections = assign_section_ids(drafts);
        tally.finish(sections, items.is_empty())
    }

    fn section_entry(
        &self,
        map: &Map<String, Value>,
        key: &ContentKey,
    ) -> CandidateValue<(Option<String>, Section)> {
        let title = self.string_field(map, &["title"], key);
        let body_source = ["body", "items", "list"]
            .iter()
            .find_map(|name| map.get(*name));
        let body = self.string_list(body_source, key);

        if title.is_empty() && body.is_empty() {
            return CandidateValue::Placeholder(PlaceholderReason::Blank);
        }

        let explicit_id = map
            .get("id")
            .and_then(Value::as_str)
            .map(|id| id.trim().trim_start_matches('#').to_string())
            .filter(|id| !id.is_empty());

        CandidateValue::Meaningful((
            explicit_id,
            Section {
                id: String::new(),
                title,
                body,
            },
        ))
    }

    fn faqs(&self, value: &Value, key: &ContentKey) -> CandidateValue<Vec<FaqEntry>> {
        let Some(items) = value.as_array() else {
            return CandidateValue::Absent;
        };

        let mut tally = Tally::default();
        let entries: Vec<FaqEntry> = items
            .iter()
            .filter_map(|item| {
                let candidate = match item.as_object() {
                    Some(map) => self.faq_entry(map, key),
                    None => CandidateValue::Absent,
                };
                tally.observe(candidate)
            })
            .collect();
        tally.finish(entries, items.is_empty())
    }

    fn faq_entry(&self, map: &Map<String, Value>, key: &ContentKey) -> CandidateValue<FaqEntry> {
        let question = self.string_field(map, &["q", "question"], key);
        let answer_source = ["a", "answer"].iter().find_map(|name| map.get(*name));
        let answers = self.string_list(answer_source, key);

        if question.is_empty() || answers.is_empty() {
            return CandidateValue::Placeholder(PlaceholderReason::Blank);
        }
        CandidateValue::Meaningful(FaqEntry { question, answers })
    }

    fn toc(&self, value: &Value, key: &ContentKey) -> CandidateValue<Vec<TocEntry>> {
        let rows: Vec<(Option<&str>, Option<&str>)> = match value {
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    let map = item.as_object();
                    (
                        map.and_then(|m| m.get("href")).and_then(Value::as_str),
                        map.and_then(|m| m.get("label")).and_then(Value::as_str),
                    )
                })
                .collect(),
            Value::Object(map) => map
                .iter()
                .map(|(anchor, label)| (Some(anchor.as_str()), label.as_str()))
                .collect(),
            _ => return CandidateValue::Absent,
        };

        let mut tally = Tally::default();
        let entries: Vec<TocEntry> = rows
            .iter()
            .filter_map(|(href, label)| {
                let candidate = match label {
                    Some(label) => match self.classifier.classify(label, key) {
                        Some(reason) => CandidateValue::Placeholder(reason),
                        None => CandidateValue::Meaningful(TocEntry {
                            href: href.and_then(normalize_anchor),
                            label: label.trim().to_string(),
                        }),
                    },
                    None => CandidateValue::Absent,
                };
                tally.observe(candidate)
            })
            .collect();
        tally.finish(entries, rows.is_empty())
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Tracks what was seen while filtering array elements.
#[derive(Default)]
struct Tally {
    first_reason: Option<PlaceholderReason>,
}

impl Tally {
    fn observe<T>(&mut self, candidate: CandidateValue<T>) -> Option<T> {
        match candidate {
            CandidateValue::Meaningful(value) => Some(value),
            CandidateValue::Placeholder(reason) => {
                self.first_reason.get_or_insert(reason);
                None
            }
            CandidateValue::Absent => None,
        }
    }

    /// Meaningful when anything survived; otherwise placeholder if an element
    /// looked like one (or the array was empty), else absent.
    fn finish<T>(self, kept: Vec<T>, was_empty: bool) -> CandidateValue<Vec<T>> {
        if !kept.is_empty() {
            return CandidateValue::Meaningful(kept);
        }
        match self.first_reason {
            Some(reason) => CandidateValue::Placeholder(reason),
            None if was_empty => CandidateValue::Placeholder(PlaceholderReason::Blank),
            None => CandidateValue::Absent,
        }
    }
}

fn body_only(text: String) -> Section {
    Section {
        id: String::new(),
        title: String::new(),
        body: vec![text],
    }
}

/// Trim an author href and give it a leading `#`. Blank hrefs become `None`.
#[must_use]
pub fn normalize_anchor(href: &str) -> Option<String> {
    let trimmed = href.trim();
    if trimmed.is_empty() || trimmed == "#" {
        None
    } else if trimmed.starts_with('#') {
        Some(trimmed.to_string())
    } else {
        Some(format!("#{trimmed}"))
    }
}

/// Lowercase, alphanumeric runs joined by `-`.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Explicit id, then title slug, then `section-{n}`; later duplicates get
/// `-2`, `-3`, ... suffixes.
fn assign_section_ids(drafts: Vec<(Option<String>, Section)>) -> Vec<Section> {
    let mut taken: BTreeSet<String> = BTreeSet::new();
    drafts
        .into_iter()
        .enumerate()
        .map(|(position, (explicit, mut section))| {
            let base = explicit
                .or_else(|| Some(slugify(&section.title)).filter(|s| !s.is_empty()))
                .unwrap_or_else(|| format!("{SECTION_ID_PREFIX}{position}"));

            let mut id = base.clone();
            let mut suffix = 2u32;
            while taken.contains(&id) {
                id = format!("{base}-{suffix}");
                suffix = suffix.saturating_add(1);
            }
            taken.insert(id.clone());
            section.id = id;
            section
        })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
