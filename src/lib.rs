//! reply-tracker — correlates sent emails with the replies they received.

pub mod config;
pub mod enrich;
pub mod error;
pub mod mail;
pub mod pipeline;
pub mod report;
pub mod retry;
pub mod stats;
