//! Interactive CLI: pick a SharePoint document, summarize it, optionally
//! file an Azure DevOps work item, then apply the deletion policy.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;

use docbrief::auth::GraphAuth;
use docbrief::config::{AppConfig, DeletePolicy};
use docbrief::devops::AzureDevOpsClient;
use docbrief::extract;
use docbrief::graph::{DriveItem, GraphClient};
use docbrief::llm::ChatCompletion;
use docbrief::llm::azure::AzureOpenAiChat;
use docbrief::logging;
use docbrief::summarize::{PromptPair, SummarizeOptions, Summarizer};

#[derive(Parser)]
#[command(
    name = "docbrief",
    about = "Summarize a SharePoint document with Azure OpenAI and optionally file a work item"
)]
struct Cli {
    /// Path to the configuration file (defaults to config.json).
    config: Option<PathBuf>,
    /// Override the configured number of parallel chunk workers.
    #[arg(long)]
    workers: Option<usize>,
    /// Override the configured maximum characters per chunk.
    #[arg(long)]
    max_chars: Option<usize>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    anyhow::ensure!(
        cli.max_chars != Some(0),
        "--max-chars must be greater than zero"
    );

    // Config first: it loads .env, which may carry logging settings.
    let config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    logging::init_tracing();

    let auth = GraphAuth::new(&config);
    let token = auth
        .acquire_token()
        .await
        .context("acquiring Graph token")?;
    let graph = GraphClient::new(&config, token);

    let retrieval_started = Instant::now();
    let target = graph
        .resolve_target()
        .await
        .context("resolving SharePoint site and drive")?;
    let items = graph
        .list_items(&target, config.sharepoint.folder_path.as_deref())
        .await
        .context("listing drive items")?;
    let retrieval_elapsed = retrieval_started.elapsed();

    println!("Files:");
    let files: Vec<&DriveItem> = items.iter().filter(|item| !item.is_folder()).collect();
    for (position, item) in files.iter().enumerate() {
        println!(
            "{}. {}  [{}]  {} bytes  modified {}",
            position + 1,
            item.name,
            item.mime_type().unwrap_or("file"),
            item.size.unwrap_or(0),
            item.last_modified_date_time.as_deref().unwrap_or("unknown"),
        );
    }
    if files.is_empty() {
        println!("No files found to download in the specified location.");
        return Ok(());
    }
    println!("Retrieval Time: {}", format_duration(retrieval_elapsed));

    let Some(choice) = prompt_selection(files.len())? else {
        println!("Cancelled.");
        return Ok(());
    };
    let selected = files[choice - 1];
    let filename = if selected.name.is_empty() {
        "downloaded-file"
    } else {
        selected.name.as_str()
    };
    let working_dir = std::env::current_dir().context("resolving working directory")?;
    let dest = unique_destination(&working_dir, filename);

    println!("Downloading '{filename}' to '{}'...", dest.display());
    let download_started = Instant::now();
    let downloaded = graph
        .download_item(&target, &selected.id, &dest)
        .await
        .context("downloading document")?;
    println!("Download complete.");
    println!(
        "Download Time: {}  |  Downloaded Size: {downloaded} bytes",
        format_duration(download_started.elapsed())
    );

    let deployment = config
        .azure_openai
        .as_ref()
        .map_or("unknown", |openai| openai.deployment.as_str());
    println!(
        "Preparing AI summarization with deployment '{deployment}'... this may take a few moments."
    );

    let summarize_ok =
        match summarize_and_file(&config, cli.workers, cli.max_chars, &dest).await {
            Ok(completed) => completed,
            Err(err) => {
                println!("Summarization failed: {err:#}");
                false
            }
        };

    apply_delete_policy(config.delete_policy(), summarize_ok, &dest);
    Ok(())
}

/// Extract, summarize, print, and optionally file a work item.
///
/// Returns whether a summary was produced; the deletion policy keys off
/// that, and work-item failures never take a finished summary down.
async fn summarize_and_file(
    config: &AppConfig,
    workers_override: Option<usize>,
    max_chars_override: Option<usize>,
    dest: &Path,
) -> Result<bool> {
    let text = {
        let path = dest.to_path_buf();
        tokio::task::spawn_blocking(move || extract::extract_text(&path))
            .await
            .context("extraction task failed")??
    };
    if text.trim().is_empty() {
        println!("Downloaded file appears empty or unreadable for text extraction.");
        return Ok(false);
    }

    let openai = config.azure_openai()?;
    let options = SummarizeOptions {
        max_chars_per_chunk: max_chars_override.unwrap_or(openai.max_chars_per_chunk),
        chunk_workers: workers_override.unwrap_or(openai.chunk_workers).max(1),
    };
    let chat: Arc<dyn ChatCompletion> = Arc::new(AzureOpenAiChat::new(openai));
    let summarizer = Summarizer::new(chat, options);

    let overrides = config.prompts.as_ref().and_then(|p| p.summarize.as_ref());
    let prompts = PromptPair::with_overrides(
        overrides.and_then(|p| p.system.clone()),
        overrides.and_then(|p| p.user.clone()),
    );

    let summarize_started = Instant::now();
    let summary = summarizer.summarize(&text, &prompts).await?;
    let summarize_elapsed = summarize_started.elapsed();

    println!("\n===== SUMMARY (TITLE + MARKDOWN) =====\n");
    println!("{summary}");
    println!("\n======================================\n");
    println!(
        "AI Summarization Time: {} | Input Chars: {} | Output Chars: {}",
        format_duration(summarize_elapsed),
        text.chars().count(),
        summary.chars().count()
    );
    let stats = summarizer.metrics_snapshot();
    println!(
        "Pipeline Stats: Chunks: {} | Capability Calls: {}",
        stats.chunks_dispatched, stats.capability_calls
    );

    if config.azure_devops.is_some() {
        file_work_item(config, &summary).await;
    }
    Ok(true)
}

async fn file_work_item(config: &AppConfig, summary: &str) {
    let Ok(settings) = config.azure_devops() else {
        return;
    };
    let client = AzureDevOpsClient::new(settings);
    let started = Instant::now();
    match client.create_work_item(summary).await {
        Ok(item) => {
            println!(
                "Azure DevOps work item created: {}",
                item.url.as_deref().unwrap_or("(no url returned)")
            );
            println!(
                "Azure DevOps Work Item Creation Time: {} | Work Item: #{}",
                format_duration(started.elapsed()),
                item.id
            );
        }
        Err(err) => {
            println!("Failed to create Azure DevOps work item: {err}");
        }
    }
}

/// Read a 1-based selection from stdin, looping until valid.
///
/// Empty input (or EOF) means the user cancelled.
fn prompt_selection(count: usize) -> Result<Option<usize>> {
    loop {
        print!("Enter the number of the document to download (or press Enter to cancel): ");
        std::io::stdout().flush().context("flushing prompt")?;

        let mut line = String::new();
        let read = std::io::stdin()
            .read_line(&mut line)
            .context("reading selection")?;
        if read == 0 {
            return Ok(None);
        }
        let choice = line.trim();
        if choice.is_empty() {
            return Ok(None);
        }
        match choice.parse::<usize>() {
            Ok(number) if (1..=count).contains(&number) => return Ok(Some(number)),
            Ok(_) => println!("Please enter a number between 1 and {count}."),
            Err(_) => println!("Invalid input. Please enter a number."),
        }
    }
}

/// Pick a destination inside `dir` that does not collide with existing files,
/// suffixing ` (1)`, ` (2)`, ... before the extension when needed.
fn unique_destination(dir: &Path, name: &str) -> PathBuf {
    let dest = dir.join(name);
    if !dest.exists() {
        return dest;
    }

    let stem = Path::new(name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("downloaded-file");
    let extension = Path::new(name).extension().and_then(|ext| ext.to_str());

    let mut attempt = 1u32;
    loop {
        let candidate = match extension {
            Some(ext) => dir.join(format!("{stem} ({attempt}).{ext}")),
            None => dir.join(format!("{stem} ({attempt})")),
        };
        if !candidate.exists() {
            return candidate;
        }
        attempt += 1;
    }
}

fn apply_delete_policy(policy: DeletePolicy, summarize_ok: bool, dest: &Path) {
    let should_delete = match policy {
        DeletePolicy::Always => true,
        DeletePolicy::OnSuccess => summarize_ok,
        DeletePolicy::Never => false,
    };
    if !should_delete {
        return;
    }
    match std::fs::remove_file(dest) {
        Ok(()) => println!("Deleted temporary file: {}", dest.display()),
        Err(err) => println!("Warning: failed to delete '{}': {err}", dest.display()),
    }
}

fn format_duration(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs_f64();
    let minutes = (seconds / 60.0) as u64;
    let remainder = seconds % 60.0;
    format!("{minutes:02}:{remainder:06.4}")
}
