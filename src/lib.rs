//! # Lectern
//!
//! A retrieval-augmented question answering engine for course materials.
//!
//! Lectern ingests structured course documents into a two-collection
//! vector index (a course catalog searchable by title similarity, plus the
//! chunked course content), then answers natural-language questions by
//! driving a tool-calling generative model through a bounded retrieval
//! loop.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────────┐   ┌───────────────┐
//! │ Documents │──▶│   Pipeline   │──▶│    SQLite     │
//! │ (courses) │   │ Parse+Chunk  │   │ catalog+chunks│
//! └───────────┘   │   +Embed     │   └──────┬────────┘
//!                 └──────────────┘          │
//!                                           ▼
//!                 ┌──────────────┐   ┌───────────────┐
//!                 │  Generative  │◀─▶│ Retrieval     │
//!                 │  model loop  │   │ tools         │
//!                 └──────┬───────┘   └───────────────┘
//!                        ▼
//!              ┌──────────┐  ┌──────────┐
//!              │   CLI    │  │   HTTP   │
//!              │(lectern) │  │ (axum)   │
//!              └──────────┘  └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! lectern init                    # create database
//! lectern ingest ./docs           # parse, chunk, embed, index courses
//! lectern courses                 # what's indexed
//! lectern ask "outline of the MCP course?"
//! lectern serve                   # start the HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`document`] | Course document parsing |
//! | [`chunk`] | Sentence-boundary chunking with overlap |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | Two-collection vector index over SQLite |
//! | [`resolver`] | Fuzzy course-name resolution |
//! | [`tools`] | Retrieval tools offered to the model |
//! | [`generator`] | Generative model client |
//! | [`orchestrator`] | Bounded tool-calling loop |
//! | [`session`] | Per-session conversation history |
//! | [`assistant`] | Query facade |
//! | [`ingest`] | Ingestion pipeline |
//! | [`server`] | JSON HTTP server |

pub mod assistant;
pub mod chunk;
pub mod config;
pub mod courses;
pub mod db;
pub mod document;
pub mod embedding;
pub mod generator;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod orchestrator;
pub mod resolver;
pub mod search;
pub mod server;
pub mod session;
pub mod store;
pub mod tools;

#[cfg(test)]
pub mod testutil;
