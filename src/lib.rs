//! # Support Harness
//!
//! A customer-support chat backend: answers questions from an indexed
//! knowledge base (website text, uploaded PDFs, raw text) and hands the
//! conversation to a human agent when the user asks for one, when the
//! answer looks unreliable, or when the user wants to transact.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌─────────────┐   ┌───────────┐
//! │  Website   │──▶│ Normalize + │──▶│  SQLite   │
//! │ PDF / text │   │ Chunk+Embed │   │  vectors  │
//! └────────────┘   └─────────────┘   └─────┬─────┘
//!                                          │ retrieve
//!   /chat ──▶ session ──▶ escalation engine ┴──▶ completion
//!                               │
//!                               ▼ effects
//!                 summary ─▶ record (SQLite) ─▶ notify agent
//! ```
//!
//! Pure logic (chunking, escalation state machine, fingerprints, prompts)
//! lives in `support-harness-core`; this crate adds storage, HTTP clients,
//! the axum server, and the `desk` CLI.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] / [`migrate`] | SQLite pool and schema |
//! | [`sqlite_store`] | Vector store over SQLite |
//! | [`records`] | Append-only escalation records |
//! | [`checkpoint`] | Persisted website fingerprint |
//! | [`embedding`] | Embedding providers |
//! | [`completion`] | Chat-completion client |
//! | [`scrape`] | Website fetch and paragraph extraction |
//! | [`extract`] | PDF text extraction |
//! | [`notify`] | Human-agent notification |
//! | [`sessions`] | Per-session state with locking |
//! | [`dispatch`] | Summary, record, and notification effects |
//! | [`chat`] | The chat turn pipeline |
//! | [`ingest`] | Knowledge-base ingestion |
//! | [`app`] | Service wiring |
//! | [`server`] | HTTP server |

pub mod app;
pub mod chat;
pub mod checkpoint;
pub mod completion;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod embedding;
pub mod extract;
pub mod ingest;
pub mod migrate;
pub mod notify;
pub mod records;
pub mod scrape;
pub mod server;
pub mod sessions;
pub mod sqlite_store;

pub use support_harness_core as core;
