//! # Dyslexify
//!
//! Turns web pages and uploaded documents into clean, readable text with a
//! short plain-language summary, persists the result, and exports it as a
//! dyslexia-friendly PDF.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────┐   ┌───────────┐   ┌──────────┐
//! │  Extractors  │──▶│ Normalize │──▶│ Summarize │──▶│  Store   │
//! │ txt/docx/pdf │   └───────────┘   │ (best     │   │ (SQLite) │
//! │ web page     │                   │  effort)  │   └────┬─────┘
//! └──────────────┘                   └───────────┘        │
//!                                                         ▼
//!                                                   ┌──────────┐
//!                                                   │ PDF      │
//!                                                   │ export   │
//!                                                   └──────────┘
//! ```
//!
//! Extraction failures end a submission with no record. Summary failures
//! never do: the record is saved with a placeholder summary.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`normalize`] | Whitespace and line cleanup |
//! | [`extract`] | Format tags, extractor registry, file extractors |
//! | [`web`] | URL validation, page fetch, main-content extraction |
//! | [`summary`] | Summarizer contract and chat-completion client |
//! | [`pipeline`] | Extract, normalize, summarize, persist |
//! | [`store`] | Storage trait with SQLite and in-memory backends |
//! | [`export`] | PDF rendering of stored records |
//! | [`boundary`] | User input rules (URL scheme, upload size and name) |
//! | [`error`] | Error taxonomy and user-facing messages |
//! | [`models`] | Core data types |
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |
//! | [`get`] | Record retrieval for the CLI |

pub mod boundary;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod extract;
pub mod get;
pub mod migrate;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod store;
pub mod summary;
pub mod web;
