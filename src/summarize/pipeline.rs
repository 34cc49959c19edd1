//! Two-phase summarization over the chat capability.
//!
//! Phase one summarizes every chunk independently, either in a sequential loop
//! or through a bounded worker pool. Phase two merges the partial summaries,
//! presented strictly in chunk order, with a single synthesis call. Documents
//! that fit in one chunk skip phase two and return the model's reply directly.
//!
//! Failure policy is fail-fast: the first chunk that cannot be summarized
//! fails the whole call and aborts any workers still in flight. The pipeline
//! never retries; retry policy belongs to the capability adapter.

use crate::llm::{ChatClientError, ChatCompletion, ChatMessage};
use crate::metrics::{MetricsSnapshot, PipelineMetrics};
use crate::summarize::chunker::{self, Chunk};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

/// Sampling temperature applied to every capability call.
const TEMPERATURE: f32 = 0.2;
/// Output token budget applied to every capability call.
const MAX_OUTPUT_TOKENS: u32 = 300;

const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that writes concise, accurate summaries.";
const DEFAULT_USER_PROMPT: &str =
    "Summarize the following content in 8-12 bullet points with headings and key takeaways.";
const SYNTHESIS_PROMPT: &str = "You will receive multiple partial summaries from segments of a \
     document. Produce the final requested output exactly per the user instructions (which may \
     include returning a title and Markdown body). Keep factual fidelity.";

/// Errors emitted by the summarization pipeline.
#[derive(Debug, Error)]
pub enum SummarizeError {
    /// Options carried an impossible chunk size.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// A per-chunk capability call failed.
    #[error("Failed to summarize chunk {index}/{total}: {source}")]
    Chunk {
        /// 1-based index of the failing chunk.
        index: usize,
        /// Number of chunks in the document.
        total: usize,
        /// Underlying capability error.
        #[source]
        source: ChatClientError,
    },
    /// The synthesis call over the partial summaries failed.
    #[error("Failed to synthesize final summary: {0}")]
    Synthesis(#[source] ChatClientError),
    /// A pipeline worker task panicked or was cancelled.
    #[error("Summarization worker failed: {0}")]
    Worker(#[from] JoinError),
}

/// System and user prompts applied to one summarization call.
#[derive(Debug, Clone)]
pub struct PromptPair {
    /// Instructions framing the model's behavior.
    pub system: String,
    /// Request describing the desired summary shape.
    pub user: String,
}

impl Default for PromptPair {
    fn default() -> Self {
        Self {
            system: DEFAULT_SYSTEM_PROMPT.to_string(),
            user: DEFAULT_USER_PROMPT.to_string(),
        }
    }
}

impl PromptPair {
    /// Build a prompt pair, falling back to the defaults for missing parts.
    pub fn with_overrides(system: Option<String>, user: Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            system: system.unwrap_or(defaults.system),
            user: user.unwrap_or(defaults.user),
        }
    }
}

/// Tuning knobs for the pipeline, read-only for the life of a call.
#[derive(Debug, Clone, Copy)]
pub struct SummarizeOptions {
    /// Upper bound on characters per chunk.
    pub max_chars_per_chunk: usize,
    /// Parallel workers for chunk summaries; 1 keeps dispatch sequential.
    pub chunk_workers: usize,
}

impl Default for SummarizeOptions {
    fn default() -> Self {
        Self {
            max_chars_per_chunk: 12_000,
            chunk_workers: 1,
        }
    }
}

/// Coordinates chunking, per-chunk summarization, and synthesis.
///
/// The capability handle is injected and read-only, so one pipeline value can
/// serve concurrent invocations without shared mutable state. Construct it
/// once and share it through an `Arc` where needed.
pub struct Summarizer {
    chat: Arc<dyn ChatCompletion>,
    options: SummarizeOptions,
    metrics: Arc<PipelineMetrics>,
}

impl Summarizer {
    /// Build a pipeline around the given chat capability.
    pub fn new(chat: Arc<dyn ChatCompletion>, options: SummarizeOptions) -> Self {
        Self {
            chat,
            options,
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    /// Summarize `text`, returning the model's final output verbatim.
    ///
    /// Any capability failure fails the whole call; partial results are never
    /// synthesized. Workers still in flight are aborted as soon as one chunk
    /// fails.
    pub async fn summarize(
        &self,
        text: &str,
        prompts: &PromptPair,
    ) -> Result<String, SummarizeError> {
        if self.options.max_chars_per_chunk == 0 {
            return Err(SummarizeError::InvalidChunkSize);
        }

        let chunks = chunker::chunk(text, self.options.max_chars_per_chunk);
        let total = chunks.len();
        tracing::debug!(
            chars = text.chars().count(),
            chunks = total,
            workers = self.options.chunk_workers,
            "Summarizing document"
        );

        if total == 1 {
            let only = chunks
                .into_iter()
                .next()
                .expect("chunker yields at least one chunk");
            let content = format!("{}\n\nCONTENT:\n{}", prompts.user, only.content);
            let summary = self
                .chat
                .complete(
                    vec![
                        ChatMessage::system(prompts.system.as_str()),
                        ChatMessage::user(content),
                    ],
                    MAX_OUTPUT_TOKENS,
                    TEMPERATURE,
                )
                .await
                .map_err(|source| SummarizeError::Chunk {
                    index: 1,
                    total: 1,
                    source,
                })?;
            self.metrics.record_document(1, 1);
            return Ok(summary);
        }

        let partials = if self.options.chunk_workers > 1 {
            self.summarize_chunks_pooled(chunks, prompts).await?
        } else {
            self.summarize_chunks_sequential(chunks, prompts).await?
        };

        let summary = self.synthesize(&partials, prompts).await?;
        self.metrics
            .record_document(total as u64, total as u64 + 1);
        tracing::info!(chunks = total, "Document summarized");
        Ok(summary)
    }

    /// Snapshot of pipeline counters for diagnostics.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    async fn summarize_chunks_sequential(
        &self,
        chunks: Vec<Chunk>,
        prompts: &PromptPair,
    ) -> Result<Vec<String>, SummarizeError> {
        let total = chunks.len();
        let mut partials = Vec::with_capacity(total);
        for chunk in chunks {
            let index = chunk.index;
            let partial = self
                .chat
                .complete(chunk_request(&chunk, prompts), MAX_OUTPUT_TOKENS, TEMPERATURE)
                .await
                .map_err(|source| SummarizeError::Chunk {
                    index,
                    total,
                    source,
                })?;
            partials.push(partial);
        }
        Ok(partials)
    }

    async fn summarize_chunks_pooled(
        &self,
        chunks: Vec<Chunk>,
        prompts: &PromptPair,
    ) -> Result<Vec<String>, SummarizeError> {
        let total = chunks.len();
        let permits = self.options.chunk_workers.min(total);
        let semaphore = Arc::new(Semaphore::new(permits));
        let prompts = Arc::new(prompts.clone());

        let mut tasks: JoinSet<Result<(usize, String), SummarizeError>> = JoinSet::new();
        for chunk in chunks {
            let chat = Arc::clone(&self.chat);
            let semaphore = Arc::clone(&semaphore);
            let prompts = Arc::clone(&prompts);
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("Semaphore closed");
                let index = chunk.index;
                let partial = chat
                    .complete(chunk_request(&chunk, &prompts), MAX_OUTPUT_TOKENS, TEMPERATURE)
                    .await
                    .map_err(|source| SummarizeError::Chunk {
                        index,
                        total,
                        source,
                    })?;
                Ok((index, partial))
            });
        }

        // Each task owns the slot matching its chunk index, so completion
        // order cannot reorder the partials.
        let mut slots: Vec<Option<String>> = vec![None; total];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok((index, partial))) => {
                    slots[index - 1] = Some(partial);
                }
                Ok(Err(error)) => {
                    tasks.abort_all();
                    return Err(error);
                }
                Err(join_error) => {
                    tasks.abort_all();
                    return Err(SummarizeError::Worker(join_error));
                }
            }
        }

        Ok(slots
            .into_iter()
            .map(|slot| slot.expect("every chunk worker fills its own slot"))
            .collect())
    }

    async fn synthesize(
        &self,
        partials: &[String],
        prompts: &PromptPair,
    ) -> Result<String, SummarizeError> {
        let content = format!(
            "{SYNTHESIS_PROMPT}\n\nPARTIAL SUMMARIES:\n{}",
            partials.join("\n\n")
        );
        self.chat
            .complete(
                vec![
                    ChatMessage::system(prompts.system.as_str()),
                    ChatMessage::user(content),
                ],
                MAX_OUTPUT_TOKENS,
                TEMPERATURE,
            )
            .await
            .map_err(SummarizeError::Synthesis)
    }
}

fn chunk_request(chunk: &Chunk, prompts: &PromptPair) -> Vec<ChatMessage> {
    let content = format!(
        "Chunk {}/{}. {}\n\nCONTENT:\n{}",
        chunk.index, chunk.total, prompts.user, chunk.content
    );
    vec![
        ChatMessage::system(prompts.system.as_str()),
        ChatMessage::user(content),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatRole;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Scripted capability that records every request it receives.
    ///
    /// Chunk calls answer `p{index}`, synthesis calls answer `FINAL`, and
    /// anything else answers `DIRECT`. With `stagger` set, later chunks answer
    /// before earlier ones to exercise out-of-order completion.
    struct RecordingChat {
        calls: Mutex<Vec<Vec<ChatMessage>>>,
        active: AtomicUsize,
        max_active: AtomicUsize,
        stagger: bool,
        fail_chunk: Option<usize>,
    }

    impl RecordingChat {
        fn new(stagger: bool, fail_chunk: Option<usize>) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
                stagger,
                fail_chunk,
            })
        }

        async fn reply_for(&self, user: &str) -> Result<String, ChatClientError> {
            if user.starts_with(SYNTHESIS_PROMPT) {
                return Ok("FINAL".to_string());
            }
            if let Some((index, total)) = chunk_tag(user) {
                if self.stagger {
                    let delay = ((total - index) * 25) as u64;
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
                if self.fail_chunk == Some(index) {
                    return Err(ChatClientError::MalformedResponse(
                        "scripted failure".into(),
                    ));
                }
                return Ok(format!("p{index}"));
            }
            Ok("DIRECT".to_string())
        }
    }

    #[async_trait]
    impl ChatCompletion for RecordingChat {
        async fn complete(
            &self,
            messages: Vec<ChatMessage>,
            _max_tokens: u32,
            _temperature: f32,
        ) -> Result<String, ChatClientError> {
            let user = messages
                .last()
                .map(|message| message.content.clone())
                .unwrap_or_default();
            self.calls.lock().expect("calls lock").push(messages);

            let running = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(running, Ordering::SeqCst);
            let outcome = self.reply_for(&user).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            outcome
        }
    }

    fn chunk_tag(content: &str) -> Option<(usize, usize)> {
        let rest = content.strip_prefix("Chunk ")?;
        let (pair, _) = rest.split_once('.')?;
        let (index, total) = pair.split_once('/')?;
        Some((index.parse().ok()?, total.parse().ok()?))
    }

    fn summarizer(chat: Arc<RecordingChat>, max_chars: usize, workers: usize) -> Summarizer {
        Summarizer::new(
            chat,
            SummarizeOptions {
                max_chars_per_chunk: max_chars,
                chunk_workers: workers,
            },
        )
    }

    fn user_contents(chat: &RecordingChat) -> Vec<String> {
        chat.calls
            .lock()
            .expect("calls lock")
            .iter()
            .map(|messages| messages.last().expect("user message").content.clone())
            .collect()
    }

    fn synthesis_content(chat: &RecordingChat) -> Option<String> {
        user_contents(chat)
            .into_iter()
            .find(|content| content.starts_with(SYNTHESIS_PROMPT))
    }

    #[tokio::test]
    async fn single_chunk_returns_reply_without_synthesis() {
        let chat = RecordingChat::new(false, None);
        let pipeline = summarizer(chat.clone(), 100, 1);

        let summary = pipeline
            .summarize("short document", &PromptPair::default())
            .await
            .expect("summary");

        assert_eq!(summary, "DIRECT");
        let contents = user_contents(&chat);
        assert_eq!(contents.len(), 1);
        assert!(!contents[0].starts_with("Chunk "));
        assert!(contents[0].starts_with(DEFAULT_USER_PROMPT));
        assert!(contents[0].ends_with("\n\nCONTENT:\nshort document"));
    }

    #[tokio::test]
    async fn sequential_dispatch_walks_chunks_in_order() {
        let chat = RecordingChat::new(false, None);
        let pipeline = summarizer(chat.clone(), 4, 1);

        let summary = pipeline
            .summarize("abcdefghijkl", &PromptPair::default())
            .await
            .expect("summary");

        assert_eq!(summary, "FINAL");
        let contents = user_contents(&chat);
        assert_eq!(contents.len(), 4);
        assert!(contents[0].starts_with("Chunk 1/3. "));
        assert!(contents[0].ends_with("\n\nCONTENT:\nabcd"));
        assert!(contents[1].starts_with("Chunk 2/3. "));
        assert!(contents[2].starts_with("Chunk 3/3. "));
        assert!(contents[3].ends_with("\n\nPARTIAL SUMMARIES:\np1\n\np2\n\np3"));
        assert_eq!(chat.max_active.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn pooled_dispatch_restores_index_order() {
        let chat = RecordingChat::new(true, None);
        let pipeline = summarizer(chat.clone(), 4, 4);

        let summary = pipeline
            .summarize("abcdefghijklmnopqrstuvwx", &PromptPair::default())
            .await
            .expect("summary");

        assert_eq!(summary, "FINAL");
        let synthesis = synthesis_content(&chat).expect("synthesis call");
        assert!(
            synthesis.ends_with("\n\nPARTIAL SUMMARIES:\np1\n\np2\n\np3\n\np4\n\np5\n\np6"),
            "partials out of order: {synthesis}"
        );
    }

    #[tokio::test]
    async fn pool_never_exceeds_worker_budget() {
        let chat = RecordingChat::new(true, None);
        let pipeline = summarizer(chat.clone(), 4, 4);

        pipeline
            .summarize("abcdefghijklmnopqrstuvwx", &PromptPair::default())
            .await
            .expect("summary");

        let max_active = chat.max_active.load(Ordering::SeqCst);
        assert!(max_active <= 4, "worker budget exceeded: {max_active}");
        assert!(max_active >= 2, "pool never overlapped calls: {max_active}");
    }

    #[tokio::test]
    async fn pooled_chunk_failure_aborts_without_synthesis() {
        let chat = RecordingChat::new(false, Some(2));
        let pipeline = summarizer(chat.clone(), 4, 2);

        let error = pipeline
            .summarize("abcdefghijkl", &PromptPair::default())
            .await
            .expect_err("chunk failure propagates");

        match error {
            SummarizeError::Chunk { index, total, .. } => {
                assert_eq!(index, 2);
                assert_eq!(total, 3);
            }
            other => panic!("unexpected error variant: {other:?}"),
        }
        assert!(synthesis_content(&chat).is_none());
    }

    #[tokio::test]
    async fn sequential_failure_skips_remaining_chunks() {
        let chat = RecordingChat::new(false, Some(2));
        let pipeline = summarizer(chat.clone(), 4, 1);

        let error = pipeline
            .summarize("abcdefghijkl", &PromptPair::default())
            .await
            .expect_err("chunk failure propagates");

        assert!(matches!(
            error,
            SummarizeError::Chunk { index: 2, total: 3, .. }
        ));
        assert_eq!(user_contents(&chat).len(), 2);
        assert!(synthesis_content(&chat).is_none());
    }

    #[tokio::test]
    async fn zero_chunk_size_is_rejected_before_dispatch() {
        let chat = RecordingChat::new(false, None);
        let pipeline = summarizer(chat.clone(), 0, 1);

        let error = pipeline
            .summarize("anything", &PromptPair::default())
            .await
            .expect_err("invalid chunk size");

        assert!(matches!(error, SummarizeError::InvalidChunkSize));
        assert!(user_contents(&chat).is_empty());
    }

    #[tokio::test]
    async fn empty_input_still_issues_one_call() {
        let chat = RecordingChat::new(false, None);
        let pipeline = summarizer(chat.clone(), 10, 1);

        let summary = pipeline
            .summarize("", &PromptPair::default())
            .await
            .expect("summary");

        assert_eq!(summary, "DIRECT");
        let contents = user_contents(&chat);
        assert_eq!(contents.len(), 1);
        assert!(contents[0].ends_with("\n\nCONTENT:\n"));
    }

    #[tokio::test]
    async fn prompt_overrides_reach_every_call() {
        let chat = RecordingChat::new(false, None);
        let pipeline = summarizer(chat.clone(), 4, 1);
        let prompts =
            PromptPair::with_overrides(Some("Custom system".into()), Some("Custom request".into()));

        pipeline
            .summarize("abcdefghijkl", &prompts)
            .await
            .expect("summary");

        let calls = chat.calls.lock().expect("calls lock");
        for messages in calls.iter() {
            assert_eq!(messages[0].role, ChatRole::System);
            assert_eq!(messages[0].content, "Custom system");
        }
        let first_user = &calls[0].last().expect("user message").content;
        assert!(first_user.starts_with("Chunk 1/3. Custom request"));
    }

    #[tokio::test]
    async fn metrics_count_documents_chunks_and_calls() {
        let chat = RecordingChat::new(false, None);
        let pipeline = summarizer(chat.clone(), 4, 1);

        pipeline
            .summarize("abcdefghijkl", &PromptPair::default())
            .await
            .expect("summary");
        pipeline
            .summarize("hi", &PromptPair::default())
            .await
            .expect("summary");

        let snapshot = pipeline.metrics_snapshot();
        assert_eq!(snapshot.documents_summarized, 2);
        assert_eq!(snapshot.chunks_dispatched, 4);
        assert_eq!(snapshot.capability_calls, 5);
    }

    #[test]
    fn prompt_pair_fills_missing_overrides_with_defaults() {
        let prompts = PromptPair::with_overrides(None, Some("User override".into()));
        assert_eq!(prompts.system, PromptPair::default().system);
        assert_eq!(prompts.user, "User override");
    }
}
