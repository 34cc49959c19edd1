#![deny(missing_docs)]

//! Core library for the docbrief summarization tool.

/// Azure AD application token acquisition.
pub mod auth;
/// File-based configuration management.
pub mod config;
/// Azure DevOps work item creation.
pub mod devops;
/// Plain-text extraction from downloaded documents.
pub mod extract;
/// Microsoft Graph drive access.
pub mod graph;
/// Chat completion abstraction and adapters.
pub mod llm;
/// Structured logging and tracing setup.
pub mod logging;
/// Summarization pipeline counters.
pub mod metrics;
/// Chunked map-reduce summarization pipeline.
pub mod summarize;
