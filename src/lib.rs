//! Crawl New Orleans civic news feeds, extract readable article text,
//! and archive relevant stories to a Box folder.
//!
//! The crate is organized around one pass of the pipeline:
//!
//! - [`feeds`]: poll RSS feeds into [`models::FeedItem`]s
//! - [`ledger`]: URL-derived ids and the remote dedupe ledger
//! - [`extract`]: fetch pages and pull out readable text
//! - [`relevance`]: the civic-news keyword gate
//! - [`outputs`]: Markdown documents, filenames, and the local mirror
//! - [`store`]: the authenticated Box session and OAuth refresh
//! - [`pipeline`]: the crawl driver tying the stages together
//!
//! The `vectorize` binary reuses [`outputs::document`] to load saved
//! articles back into a Chroma collection for semantic search.

pub mod cli;
pub mod error;
pub mod extract;
pub mod feeds;
pub mod ledger;
pub mod models;
pub mod outputs;
pub mod pipeline;
pub mod relevance;
pub mod store;
pub mod utils;
