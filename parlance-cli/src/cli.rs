use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgAction, Args, Parser, Subcommand};
use parlance_rag::RagConfig;
use parlance_rag::ollama::{DEFAULT_BASE_URL, DEFAULT_EMBEDDING_DIMENSIONS};

/// Where the persisted index lives unless `--index` says otherwise.
pub const DEFAULT_INDEX_PATH: &str = "knowledge_base/index.json";

#[derive(Parser, Debug)]
#[command(name = "parlance", version, about = "Ask questions about a folder of documents")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// JSON config file; flags below override its values.
    #[arg(long, global = true, env = "PARLANCE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Ollama server address.
    #[arg(long, global = true, env = "PARLANCE_OLLAMA_URL", default_value = DEFAULT_BASE_URL)]
    pub ollama_url: String,

    /// Embedding model served by Ollama.
    #[arg(long, global = true, env = "PARLANCE_EMBEDDING_MODEL")]
    pub embedding_model: Option<String>,

    /// Dimensionality of the embedding model's vectors.
    #[arg(long, global = true, default_value_t = DEFAULT_EMBEDDING_DIMENSIONS)]
    pub embedding_dimensions: usize,

    /// Chat model served by Ollama.
    #[arg(long, global = true, env = "PARLANCE_MODEL")]
    pub model: Option<String>,

    /// Number of passages retrieved per question.
    #[arg(long, global = true)]
    pub top_k: Option<usize>,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    pub log_json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the index from a folder of .txt and .md files and save it.
    Ingest {
        /// Folder to index.
        #[arg(long)]
        docs: PathBuf,
        /// Where to write the index.
        #[arg(long, default_value = DEFAULT_INDEX_PATH)]
        index: PathBuf,
    },
    /// Answer a single question and exit.
    Ask {
        /// The question.
        question: String,
        #[command(flatten)]
        corpus: CorpusArgs,
    },
    /// Start an interactive conversation.
    Chat {
        #[command(flatten)]
        corpus: CorpusArgs,
    },
}

/// Locates the index, and the documents to build it from when it is missing.
#[derive(Args, Debug, Clone)]
pub struct CorpusArgs {
    /// Persisted index to load.
    #[arg(long, default_value = DEFAULT_INDEX_PATH)]
    pub index: PathBuf,
    /// Folder to index when the index file does not exist yet.
    #[arg(long)]
    pub docs: Option<PathBuf>,
}

impl Cli {
    /// The effective configuration: the config file (or defaults) with flag
    /// overrides applied, validated.
    pub fn rag_config(&self) -> anyhow::Result<RagConfig> {
        let mut config = match &self.config {
            Some(path) => RagConfig::from_json_file(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => RagConfig::default(),
        };

        if let Some(model) = &self.embedding_model {
            config.embedding_model = model.clone();
        }
        if let Some(model) = &self.model {
            config.language_model = model.clone();
        }
        if let Some(k) = self.top_k {
            config.top_k = k;
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}
