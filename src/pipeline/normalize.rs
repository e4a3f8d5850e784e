//! Raw record normalization.
//!
//! Turns a scraped [`RawModule`] into a canonical [`Module`]: the date is
//! parsed with the configured patterns and re-emitted as `YYYY-MM-DD`, tags
//! are trimmed, lowercased, and deduplicated.

use chrono::NaiveDate;

use crate::error::{AppError, Result};
use crate::models::{Module, NormalizeConfig, RawModule};
use crate::utils::normalize_whitespace;

/// Canonical output pattern, always accepted on input as well.
const CANONICAL_DATE: &str = "%Y-%m-%d";

/// Maps raw records to canonical modules.
#[derive(Debug, Clone)]
pub struct Normalizer {
    date_formats: Vec<String>,
}

impl Normalizer {
    pub fn new(config: &NormalizeConfig) -> Self {
        Self {
            date_formats: config.date_formats.clone(),
        }
    }

    /// Normalize one raw record.
    ///
    /// Fails with [`AppError::DateParse`] when no pattern matches.
    pub fn normalize(&self, raw: &RawModule) -> Result<Module> {
        Ok(Module {
            name: raw.name.clone(),
            date: self.parse_date(&raw.name, &raw.date)?,
            tags: normalize_tags(&raw.tags),
            description: raw.description.clone(),
            gif: raw.gif.clone(),
        })
    }

    /// Normalize a whole batch; the first failure aborts it.
    pub fn normalize_all(&self, raws: &[RawModule]) -> Result<Vec<Module>> {
        raws.iter().map(|raw| self.normalize(raw)).collect()
    }

    fn parse_date(&self, name: &str, raw: &str) -> Result<NaiveDate> {
        let cleaned = normalize_whitespace(raw);
        std::iter::once(CANONICAL_DATE)
            .chain(self.date_formats.iter().map(String::as_str))
            .find_map(|fmt| NaiveDate::parse_from_str(&cleaned, fmt).ok())
            .ok_or_else(|| AppError::date_parse(name, raw))
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(&NormalizeConfig::default())
    }
}

/// Trim and lowercase tags, dropping empties and repeats, keeping source order.
pub fn normalize_tags(raw: &[String]) -> Vec<String> {
    let mut tags: Vec<String> = Vec::with_capacity(raw.len());
    for tag in raw {
        let tag = normalize_whitespace(tag).to_lowercase();
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}
