//! Subway outlet directory with retrieval-augmented question answering.
//!
//! The HTTP server lives in `main.rs`, the locator scraper in `bin/scrape.rs`;
//! both are thin wrappers around this library.

pub mod bootstrap;
pub mod core;
pub mod llm;
pub mod logging;
pub mod memory;
pub mod outlets;
pub mod rag;
pub mod scraper;
pub mod server;
pub mod state;
pub mod vector_math;
