use anyhow::Result;
use clap::{Parser, Subcommand};
use doc_rag::commands::{
    ask_question, chat_session, delete_document, export_report, list_documents, load_config,
    show_document, show_history, upload_document,
};
use doc_rag::config::{run_interactive_config, show_config};
use doc_rag::embeddings::ProviderKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "doc-rag")]
#[command(about = "Ask questions about your documents with retrieval-augmented generation")]
#[command(version)]
struct Cli {
    /// Data directory (defaults to $DOC_RAG_HOME or ~/.doc-rag)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure providers, chunking and retrieval
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Process a PDF, Markdown or HTML file
    Upload {
        /// File to upload
        path: PathBuf,
        /// Embedding provider for this document (openai or google)
        #[arg(long)]
        provider: Option<ProviderKind>,
    },
    /// List uploaded documents
    List,
    /// Ask a single question about a document
    Ask {
        /// Document ID, ID prefix or filename
        document: String,
        /// The question to answer
        question: String,
        /// Number of chunks to retrieve
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Start an interactive conversation about a document
    Chat {
        /// Document ID, ID prefix or filename
        document: String,
        /// Continue from the logged questions for this document
        #[arg(long)]
        resume: bool,
    },
    /// Show previously asked questions
    History {
        /// Only show questions about this document
        document: Option<String>,
        /// Maximum number of entries to show
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Export a chat transcript or document summary as Markdown
    Export {
        /// Document ID, ID prefix or filename
        document: String,
        /// Export a document summary instead of the chat transcript
        #[arg(long)]
        summary: bool,
    },
    /// Show document details and its chunks
    Show {
        /// Document ID, ID prefix or filename
        document: String,
    },
    /// Delete a document and its stored vectors
    Delete {
        /// Document ID, ID prefix or filename
        document: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.data_dir.as_deref())?;

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&config)?;
            } else {
                run_interactive_config(config)?;
            }
        }
        Commands::Upload { path, provider } => {
            upload_document(&config, &path, provider)?;
        }
        Commands::List => {
            list_documents(&config)?;
        }
        Commands::Ask {
            document,
            question,
            top_k,
        } => {
            ask_question(&config, &document, &question, top_k)?;
        }
        Commands::Chat { document, resume } => {
            chat_session(&config, &document, resume)?;
        }
        Commands::History { document, limit } => {
            show_history(&config, document.as_deref(), limit)?;
        }
        Commands::Export { document, summary } => {
            export_report(&config, &document, summary)?;
        }
        Commands::Show { document } => {
            show_document(&config, &document)?;
        }
        Commands::Delete { document } => {
            delete_document(&config, &document)?;
        }
    }

    Ok(())
}
