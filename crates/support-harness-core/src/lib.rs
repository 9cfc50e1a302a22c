//! # Support Harness Core
//!
//! Pure logic for Support Harness: data models, text normalization,
//! chunking, change detection, the escalation decision engine, prompt
//! building, and the collaborator traits (embedding, completion, vector
//! store) that the application crate implements.
//!
//! This crate contains no tokio runtime, sqlx, filesystem I/O, or HTTP
//! client dependencies.

pub mod chunk;
pub mod completion;
pub mod embedding;
pub mod escalation;
pub mod fingerprint;
pub mod index;
pub mod models;
pub mod normalize;
pub mod prompt;
pub mod retrieve;
pub mod session;
pub mod store;
