//! Chunked map-reduce summarization pipeline.
//!
//! Large documents are split into fixed-size character windows, each window is
//! summarized through the chat capability (optionally in parallel), and the
//! ordered partial summaries are merged by one final synthesis call. Short
//! documents skip the synthesis step entirely and get a single direct call.

pub mod chunker;
mod pipeline;

pub use chunker::Chunk;
pub use pipeline::{PromptPair, SummarizeError, SummarizeOptions, Summarizer};
