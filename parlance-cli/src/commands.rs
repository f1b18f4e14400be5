use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use parlance_rag::ollama::{OllamaChatModel, OllamaEmbeddingProvider};
use parlance_rag::{
    Answer, Assistant, ChatSession, Document, IngestReport, KnowledgeBase, RagConfig, RagError,
    load_documents,
};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cli::{Cli, CorpusArgs};

type Knowledge = KnowledgeBase<OllamaEmbeddingProvider>;

/// A cancellation token that fires on Ctrl-C until dropped.
struct Interrupt {
    token: CancellationToken,
    watcher: JoinHandle<()>,
}

impl Interrupt {
    fn arm() -> Self {
        let token = CancellationToken::new();
        let trigger = token.clone();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                trigger.cancel();
            }
        });
        Self { token, watcher }
    }

    fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for Interrupt {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}

fn embedder(cli: &Cli, config: &RagConfig) -> Arc<OllamaEmbeddingProvider> {
    Arc::new(
        OllamaEmbeddingProvider::new()
            .with_base_url(&cli.ollama_url)
            .with_model(&config.embedding_model)
            .with_dimensions(cli.embedding_dimensions),
    )
}

fn chat_model(cli: &Cli, config: &RagConfig) -> Arc<OllamaChatModel> {
    Arc::new(
        OllamaChatModel::new().with_base_url(&cli.ollama_url).with_model(&config.language_model),
    )
}

/// Rebuild with Ctrl-C armed only for the duration of the rebuild.
async fn rebuild(
    knowledge: &Knowledge,
    documents: &[Document],
) -> parlance_rag::Result<IngestReport> {
    let interrupt = Interrupt::arm();
    knowledge.rebuild(documents, interrupt.token()).await
}

async fn build_index(knowledge: &Knowledge, docs: &Path, index: &Path) -> anyhow::Result<()> {
    let documents = load_documents(docs)
        .with_context(|| format!("failed to read documents from {}", docs.display()))?;
    if documents.is_empty() {
        bail!("no .txt or .md files with content found in {}", docs.display());
    }

    let report = rebuild(knowledge, &documents).await.context("failed to build the index")?;
    knowledge.save(index).with_context(|| format!("failed to save {}", index.display()))?;

    println!(
        "Indexed {} chunks from {} documents into {}",
        report.chunks,
        report.documents,
        index.display()
    );
    if report.skipped_empty > 0 {
        println!("Skipped {} empty files", report.skipped_empty);
    }
    Ok(())
}

/// Load the persisted index, or build and save one from `--docs`.
async fn open_knowledge(
    cli: &Cli,
    config: RagConfig,
    corpus: &CorpusArgs,
) -> anyhow::Result<Knowledge> {
    let provider = embedder(cli, &config);
    let knowledge = KnowledgeBase::new(config, provider)?;
    let loaded = knowledge
        .load_if_exists(&corpus.index)
        .await
        .with_context(|| format!("failed to load {}", corpus.index.display()))?;

    if loaded {
        if corpus.docs.is_some() {
            info!(index = %corpus.index.display(), "index exists, ignoring --docs");
        }
        return Ok(knowledge);
    }

    match &corpus.docs {
        Some(docs) => {
            info!(docs = %docs.display(), "no index found, building one");
            build_index(&knowledge, docs, &corpus.index).await?;
            Ok(knowledge)
        }
        None => bail!(
            "no index at {}; run `parlance ingest --docs <dir>` or pass --docs",
            corpus.index.display()
        ),
    }
}

pub async fn ingest(
    cli: &Cli,
    config: RagConfig,
    docs: &Path,
    index: &Path,
) -> anyhow::Result<()> {
    let provider = embedder(cli, &config);
    let knowledge = KnowledgeBase::new(config, provider)?;
    build_index(&knowledge, docs, index).await
}

pub async fn ask(
    cli: &Cli,
    config: RagConfig,
    question: &str,
    corpus: &CorpusArgs,
) -> anyhow::Result<()> {
    let llm = chat_model(cli, &config);
    let knowledge = open_knowledge(cli, config, corpus).await?;
    let assistant = Assistant::new(&knowledge, llm);
    let mut session = assistant.new_session();

    let interrupt = Interrupt::arm();
    let answer = assistant.ask(&mut session, question, interrupt.token()).await?;
    print_answer(&answer, true);
    Ok(())
}

pub async fn chat(cli: &Cli, config: RagConfig, corpus: &CorpusArgs) -> anyhow::Result<()> {
    let llm = chat_model(cli, &config);
    let knowledge = open_knowledge(cli, config, corpus).await?;
    let assistant = Assistant::new(&knowledge, llm);
    let mut session = assistant.new_session();
    let mut show_sources = true;

    let mut editor = DefaultEditor::new().context("failed to start the line editor")?;
    println!(
        "Ask about your documents ({} passages indexed). /clear resets the conversation, \
         /sources toggles sources, /exit quits.",
        knowledge.snapshot().len()
    );

    loop {
        let line = match editor.readline("you> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("failed to read input"),
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if let Err(e) = editor.add_history_entry(input) {
            debug!(error = %e, "failed to record history entry");
        }

        match input {
            "/exit" | "/quit" => break,
            "/clear" => {
                session.clear();
                println!("Conversation cleared.");
            }
            "/sources" => {
                show_sources = !show_sources;
                println!("Sources {}.", if show_sources { "on" } else { "off" });
            }
            question => ask_in_session(&assistant, &mut session, question, show_sources).await,
        }
    }
    Ok(())
}

async fn ask_in_session(
    assistant: &Assistant<OllamaEmbeddingProvider, OllamaChatModel>,
    session: &mut ChatSession,
    question: &str,
    show_sources: bool,
) {
    let interrupt = Interrupt::arm();
    match assistant.ask(session, question, interrupt.token()).await {
        Ok(answer) => print_answer(&answer, show_sources),
        Err(RagError::Cancelled { reason, .. }) => println!("(stopped: {reason})"),
        Err(e) if e.is_retryable() => {
            warn!(error = %e, "backend unavailable");
            println!("The model backend is unavailable: {e}. Is Ollama running?");
        }
        Err(e) => println!("error: {e}"),
    }
}

fn print_answer(answer: &Answer, show_sources: bool) {
    println!("\n{}\n", answer.text);
    if show_sources && !answer.sources.is_empty() {
        println!("Sources:");
        for (n, hit) in answer.sources.iter().enumerate() {
            println!(
                "  [{}] {} (chunk {}, score {:.3})",
                n + 1,
                hit.chunk.source_id,
                hit.chunk.chunk_index,
                hit.score
            );
        }
        println!();
    }
}
