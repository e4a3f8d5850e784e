//! Service layer for the module-of-the-week application.
//!
//! This module contains the collaborators around the pipeline:
//! - Module scraping (`Extractor`, `HtmlExtractor`)
//! - Callback delivery (`Notifier`, `WebhookNotifier`)
//! - Slash command handling (`CommandBridge`)

mod command;
mod extractor;
mod notifier;

pub use command::{ACKNOWLEDGEMENT, Attachment, CommandBridge, SlackMessage, SlashCommand};
pub use extractor::{
    Extractor, HtmlExtractor, ListingEntry, RawStream, parse_detail, parse_listing,
};
pub use notifier::{Notifier, WebhookNotifier};
