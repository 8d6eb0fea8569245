//! pageforge
//!
//! Turns natural-language prompts into self-contained web pages: a language
//! model drafts and self-reviews each page, a headless browser validates it,
//! and only pages that pass are published and served.

pub mod cli;
pub mod config;
pub mod console;
pub mod error;
pub mod generation;
pub mod harness;
pub mod logging;
pub mod prompts;
pub mod provider;
pub mod queue;
pub mod server;
pub mod store;
