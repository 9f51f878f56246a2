//! PII/PHI redaction: deterministic, pattern-based scrubbing of sensitive
//! identifiers before any conversation content leaves the trust boundary.
//!
//! Categories are applied in a fixed precedence order (most specific first).
//! Once a span is replaced by a `[REDACTED_<CATEGORY>]` placeholder it is
//! never re-scanned, and placeholders already present in the input are
//! treated the same way, so redaction is idempotent.

use std::collections::BTreeMap;

use assistline_core::Message;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

/// Built-in categories in precedence order.
///
/// | # | name          | matches                                             |
/// |---|---------------|-----------------------------------------------------|
/// | 1 | `email`       | `local@domain.tld`                                  |
/// | 2 | `mrn`         | `MRN` + 6–10 digits                                 |
/// | 3 | `patient_id`  | `patient ID` + 6–10 digits                          |
/// | 4 | `policy`      | `policy` + 8–12 digits                              |
/// | 5 | `credit_card` | 16 digits in groups of four                         |
/// | 6 | `ssn`         | `ddd-dd-dddd` or a bare 9-digit run                 |
/// | 7 | `phone`       | `ddd-ddd-dddd`, `(ddd) ddd-dddd`, `ddd-dddd`, ...   |
/// | 8 | `date`        | `d{1,2}[-/]d{1,2}[-/]d{2,4}`                        |
pub const BUILTIN_CATEGORIES: &[(&str, &str)] = &[
    ("email", r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b"),
    ("mrn", r"(?i)\bMRN[:\s#]*\d{6,10}\b"),
    ("patient_id", r"(?i)\bpatient[\s_-]*ID[:\s#]*\d{6,10}\b"),
    ("policy", r"(?i)\bpolicy[:\s#]*\d{8,12}\b"),
    ("credit_card", r"\b\d{4}[-\s]?\d{4}[-\s]?\d{4}[-\s]?\d{4}\b"),
    ("ssn", r"\b\d{3}-\d{2}-\d{4}\b|\b\d{9}\b"),
    (
        "phone",
        r"\(\d{3}\)\s*\d{3}[-.\s]?\d{4}\b|\b\d{3}[-.\s]?\d{3}[-.\s]?\d{4}\b|\b\d{3}-\d{4}\b",
    ),
    ("date", r"\b\d{1,2}[-/]\d{1,2}[-/]\d{2,4}\b"),
];

const PLACEHOLDER_PATTERN: &str = r"\[REDACTED_[A-Z0-9_]+\]";

/// An operator-defined category, applied after the built-ins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomCategory {
    pub name: String,
    pub pattern: String,
}

/// Output of one redaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionResult {
    pub redacted_text: String,
    /// Category name → number of replaced spans. Only nonzero entries.
    pub counts: BTreeMap<String, usize>,
}

impl RedactionResult {
    /// Total replaced spans across all categories.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

/// Invalid category registry. Raised when building a [`Redactor`], never
/// while redacting.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RedactionError {
    #[error("Invalid pattern for redaction category '{name}': {reason}")]
    InvalidPattern { name: String, reason: String },

    #[error("Invalid redaction category name '{0}': use lowercase letters, digits and '_'")]
    InvalidName(String),

    #[error("Duplicate redaction category '{0}'")]
    DuplicateCategory(String),
}

impl From<RedactionError> for assistline_core::Error {
    fn from(err: RedactionError) -> Self {
        Self::Config {
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct Category {
    name: String,
    placeholder: String,
    regex: Regex,
}

#[derive(Debug, Clone)]
struct Segment {
    text: String,
    redacted: bool,
}

/// The category registry. Immutable after construction and safe to share
/// across threads.
#[derive(Debug, Clone)]
pub struct Redactor {
    categories: Vec<Category>,
    placeholder: Regex,
}

impl Redactor {
    /// Registry with the built-in categories only.
    pub fn builtin() -> Result<Self, RedactionError> {
        Self::new(&[])
    }

    /// Built-ins followed by `custom`, in declared order.
    pub fn new(custom: &[CustomCategory]) -> Result<Self, RedactionError> {
        let mut categories: Vec<Category> = Vec::with_capacity(BUILTIN_CATEGORIES.len() + custom.len());

        let builtins = BUILTIN_CATEGORIES.iter().map(|(name, pattern)| (*name, *pattern));
        let customs = custom.iter().map(|c| (c.name.as_str(), c.pattern.as_str()));

        for (name, pattern) in builtins.chain(customs) {
            if name.is_empty()
                || !name
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
            {
                return Err(RedactionError::InvalidName(name.to_string()));
            }
            if categories.iter().any(|c| c.name == name) {
                return Err(RedactionError::DuplicateCategory(name.to_string()));
            }
            let regex = Regex::new(pattern).map_err(|e| RedactionError::InvalidPattern {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
            categories.push(Category {
                name: name.to_string(),
                placeholder: format!("[REDACTED_{}]", name.to_ascii_uppercase()),
                regex,
            });
        }

        let placeholder = Regex::new(PLACEHOLDER_PATTERN).map_err(|e| RedactionError::InvalidPattern {
            name: "placeholder".into(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            categories,
            placeholder,
        })
    }

    pub fn from_config(config: &assistline_config::RedactionConfig) -> Result<Self, RedactionError> {
        let custom: Vec<CustomCategory> = config
            .custom_categories
            .iter()
            .map(|c| CustomCategory {
                name: c.name.clone(),
                pattern: c.pattern.clone(),
            })
            .collect();
        Self::new(&custom)
    }

    /// Category names in precedence order.
    pub fn category_names(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.name.as_str()).collect()
    }

    /// Replace every sensitive span with its placeholder. Never fails.
    pub fn redact(&self, text: &str) -> RedactionResult {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut segments = self.split_placeholders(text);

        // A replacement can expose a new word boundary at a segment edge,
        // so passes repeat until one finds nothing. Every match consumes at
        // least one clear character, which bounds the loop.
        loop {
            let mut matched = 0;
            for category in &self.categories {
                let (next, found) = apply_category(category, segments);
                segments = next;
                if found > 0 {
                    *counts.entry(category.name.clone()).or_default() += found;
                    matched += found;
                }
            }
            if matched == 0 {
                break;
            }
        }

        RedactionResult {
            redacted_text: segments.into_iter().map(|s| s.text).collect(),
            counts,
        }
    }

    /// Whether `text` contains nothing any category would replace.
    pub fn is_clean(&self, text: &str) -> bool {
        self.redact(text).counts.is_empty()
    }

    /// Redact every message of a window, summing the counts.
    pub fn redact_messages(&self, messages: &[Message]) -> (Vec<Message>, BTreeMap<String, usize>) {
        let mut totals: BTreeMap<String, usize> = BTreeMap::new();
        let redacted = messages
            .iter()
            .map(|message| {
                let result = self.redact(&message.text);
                for (name, count) in result.counts {
                    *totals.entry(name).or_default() += count;
                }
                Message {
                    text: result.redacted_text,
                    ..message.clone()
                }
            })
            .collect();
        (redacted, totals)
    }

    fn split_placeholders(&self, text: &str) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut last = 0;
        for m in self.placeholder.find_iter(text) {
            if m.start() > last {
                segments.push(Segment {
                    text: text[last..m.start()].to_string(),
                    redacted: false,
                });
            }
            segments.push(Segment {
                text: m.as_str().to_string(),
                redacted: true,
            });
            last = m.end();
        }
        if last < text.len() || segments.is_empty() {
            segments.push(Segment {
                text: text[last..].to_string(),
                redacted: false,
            });
        }
        segments
    }
}

/// Scan the clear segments for one category, splitting each match out as a
/// redacted placeholder segment.
fn apply_category(category: &Category, segments: Vec<Segment>) -> (Vec<Segment>, usize) {
    let mut out = Vec::with_capacity(segments.len());
    let mut found = 0;

    for segment in segments {
        if segment.redacted {
            out.push(segment);
            continue;
        }

        let mut last = 0;
        for m in category.regex.find_iter(&segment.text) {
            if m.start() == m.end() {
                continue;
            }
            if m.start() > last {
                out.push(Segment {
                    text: segment.text[last..m.start()].to_string(),
                    redacted: false,
                });
            }
            out.push(Segment {
                text: category.placeholder.clone(),
                redacted: true,
            });
            found += 1;
            last = m.end();
        }

        if last == 0 {
            out.push(segment);
        } else if last < segment.text.len() {
            out.push(Segment {
                text: segment.text[last..].to_string(),
                redacted: false,
            });
        }
    }

    (out, found)
}
