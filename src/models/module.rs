//! Module data structures.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// A module record as scraped, before normalization.
///
/// Field order is part of the content fingerprint; do not reorder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RawModule {
    /// Module name from the listing entry
    pub name: String,

    /// Date text as printed on the listing
    pub date: String,

    /// Category labels, possibly padded or mixed case
    pub tags: Vec<String>,

    /// Detail page blurb
    pub description: String,

    /// Illustrative image reference (may be relative)
    pub gif: String,
}

/// A canonical module of the week.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Module {
    /// Module name
    pub name: String,

    /// Publication day, serialized as `YYYY-MM-DD`
    pub date: NaiveDate,

    /// Lowercase, unique tags in source order
    pub tags: Vec<String>,

    /// Free text description
    pub description: String,

    /// Illustrative image reference
    pub gif: String,
}

impl Module {
    /// Whether the module carries exactly this tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Human label for the ISO week this module was published in.
    pub fn week_label(&self) -> String {
        let week = self.date.iso_week();
        format!("Module of the Week #{}, {}", week.week(), week.year())
    }

    /// Fill a URL template.
    ///
    /// Supported placeholders: `{name}`, `{date}`.
    pub fn format(&self, template: &str) -> String {
        template
            .replace("{name}", &self.name)
            .replace("{date}", &self.date.format("%Y-%m-%d").to_string())
    }
}
