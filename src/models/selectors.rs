// src/models/selectors.rs

//! CSS selectors for scraping the module listing and detail pages.

use serde::{Deserialize, Serialize};

/// CSS selectors for the listing page and each module's detail page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteSelectors {
    /// Selector for each module entry on the listing page
    #[serde(default = "defaults::article")]
    pub article_selector: String,

    /// Selector for the name link within an entry
    #[serde(default = "defaults::name")]
    pub name_selector: String,

    /// Selector for the date element within an entry
    #[serde(default = "defaults::date")]
    pub date_selector: String,

    /// Selector for category labels within an entry
    #[serde(default = "defaults::tag")]
    pub tag_selector: String,

    /// Selector for the description on the detail page
    #[serde(default = "defaults::description")]
    pub description_selector: String,

    /// Selector for the illustrative image on the detail page
    #[serde(default = "defaults::gif")]
    pub gif_selector: String,

    /// HTML attribute holding the detail link (usually "href")
    #[serde(default = "defaults::link_attr")]
    pub link_attr: String,

    /// HTML attribute holding the image reference (usually "src")
    #[serde(default = "defaults::image_attr")]
    pub image_attr: String,
}

impl Default for SiteSelectors {
    fn default() -> Self {
        Self {
            article_selector: defaults::article(),
            name_selector: defaults::name(),
            date_selector: defaults::date(),
            tag_selector: defaults::tag(),
            description_selector: defaults::description(),
            gif_selector: defaults::gif(),
            link_attr: defaults::link_attr(),
            image_attr: defaults::image_attr(),
        }
    }
}

impl SiteSelectors {
    /// All selector strings, paired with their config key.
    pub fn entries(&self) -> [(&'static str, &str); 6] {
        [
            ("article_selector", &self.article_selector),
            ("name_selector", &self.name_selector),
            ("date_selector", &self.date_selector),
            ("tag_selector", &self.tag_selector),
            ("description_selector", &self.description_selector),
            ("gif_selector", &self.gif_selector),
        ]
    }
}

mod defaults {
    pub fn article() -> String {
        "article".into()
    }
    pub fn name() -> String {
        "h3 a".into()
    }
    pub fn date() -> String {
        "span.date".into()
    }
    pub fn tag() -> String {
        ".category".into()
    }
    pub fn description() -> String {
        "blockquote".into()
    }
    pub fn gif() -> String {
        "img[src*='.gif']".into()
    }
    pub fn link_attr() -> String {
        "href".into()
    }
    pub fn image_attr() -> String {
        "src".into()
    }
}
