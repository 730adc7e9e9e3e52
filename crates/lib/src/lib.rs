//! Triage core library: rebuilds support-ticket conversations from raw message rows and
//! classifies each one (subject, sentiment, suggested reply) for human review.

pub mod aggregate;
pub mod classify;
pub mod config;
pub mod filter;
pub mod init;
pub mod llm;
pub mod model;
pub mod parse;
pub mod pipeline;
pub mod prompt;
pub mod rank;
pub mod similarity;
pub mod subject;
pub mod table;
pub mod throttle;
