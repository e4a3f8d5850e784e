// src/lib.rs

//! Module of the Week library.
//!
//! Scrapes the weekly featured module listing, keeps a deduplicated
//! collection in memory, and serves it over HTTP and a Slack slash command.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod server;
pub mod services;
pub mod utils;
