// src/services/command.rs

//! Slash command bridge.
//!
//! The command platform expects an answer within a few seconds, so the
//! invocation is acknowledged at once and the real message is posted to the
//! command's `response_url` later, from a detached task.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::models::{Config, Module};
use crate::pipeline::{RefreshScheduler, latest};
use crate::services::Notifier;
use crate::utils::resolve;

/// Immediate reply to every command invocation.
pub const ACKNOWLEDGEMENT: &str = "Fetching the latest module of the week...";

/// Form fields of a slash command invocation.
#[derive(Debug, Clone, Deserialize)]
pub struct SlashCommand {
    /// Where the delayed message goes
    pub response_url: String,

    #[serde(default)]
    pub command: String,

    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub user_name: String,
}

/// Message posted back to the command's response URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlackMessage {
    pub response_type: String,
    pub text: String,
    pub attachments: Vec<Attachment>,
}

/// Rich card describing one module.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attachment {
    pub title: String,
    pub title_link: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub footer: String,
}

impl SlackMessage {
    /// Card for `module`, with its link from `link_template` and its image
    /// resolved against `image_base`.
    pub fn for_module(module: &Module, link_template: &str, image_base: &str) -> Self {
        let label = module.week_label();
        let image_url = (!module.gif.is_empty())
            .then(|| resolve(image_base, &module.gif).unwrap_or_else(|| module.gif.clone()));

        Self {
            response_type: "in_channel".to_string(),
            text: label.clone(),
            attachments: vec![Attachment {
                title: module.name.clone(),
                title_link: module.format(link_template),
                text: module.description.clone(),
                image_url,
                footer: label,
            }],
        }
    }
}

/// Answers slash commands with the latest module.
#[derive(Clone)]
pub struct CommandBridge {
    scheduler: Arc<RefreshScheduler>,
    notifier: Arc<dyn Notifier>,
    delay: Duration,
    link_template: String,
    image_base: String,
}

impl CommandBridge {
    pub fn new(
        config: &Config,
        scheduler: Arc<RefreshScheduler>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            scheduler,
            notifier,
            delay: config.slack.callback_delay(),
            link_template: config.slack.package_url_template.clone(),
            image_base: config.public_base_url().to_string(),
        }
    }

    /// Acknowledge the command; the module follows via its response URL.
    pub fn handle(&self, command: SlashCommand) -> &'static str {
        log::info!(
            "Slash command {:?} from {:?}",
            command.command,
            command.user_name
        );
        self.schedule_delivery(command.response_url);
        ACKNOWLEDGEMENT
    }

    /// Post the latest module to `response_url` after the configured delay.
    ///
    /// Runs detached; failures are logged and never retried.
    pub fn schedule_delivery(&self, response_url: String) -> JoinHandle<()> {
        let bridge = self.clone();
        tokio::spawn(async move { bridge.deliver_latest(&response_url).await })
    }

    async fn deliver_latest(&self, response_url: &str) {
        let published = self.scheduler.current().unwrap_or_default();
        let module = match latest(&published) {
            Ok(module) => module,
            Err(e) => {
                log::warn!("Skipping delivery to {response_url}: {e}");
                return;
            }
        };

        let message = SlackMessage::for_module(module, &self.link_template, &self.image_base);
        let payload = match serde_json::to_value(&message) {
            Ok(payload) => payload,
            Err(e) => {
                log::error!("Cannot encode message for {}: {e}", module.name);
                return;
            }
        };

        tokio::time::sleep(self.delay).await;

        match self.notifier.deliver(response_url, &payload).await {
            Ok(()) => log::info!("Delivered {} to {response_url}", module.name),
            Err(e) => log::warn!("{e}"),
        }
    }
}
