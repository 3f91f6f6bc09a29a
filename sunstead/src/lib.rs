//! Sunstead: query routing and context assembly for an off-grid solar
//! ranch energy system.
//!
//! A natural-language query enters at `/ask`, is classified into a category
//! with a token budget, gets a cached context bundle assembled from system
//! documents, telemetry, and conversation history, and is answered either by
//! a direct knowledge-base lookup or by one of the specialist reasoner
//! agents. Background pollers feed the telemetry store; the sync pipeline
//! keeps the knowledge base mirrored from the document source.

pub mod agents;
pub mod api;
pub mod cache;
pub mod config;
pub mod context;
pub mod db;
pub mod embeddings;
pub mod error;
pub mod llm;
pub mod models;
pub mod processing;
pub mod quota;
pub mod routing;
pub mod services;
pub mod sync;
pub mod telemetry;
pub mod tokens;
pub mod tools;
