use std::path::PathBuf;
use std::sync::Arc;

use adaptive_rag::tools::{
    ChatClient, DEFAULT_CHUNK_CHARS, MemoryRetriever, TavilySearch, load_dir,
};
use adaptive_rag::{AdaptiveRag, AnswerStatus, Collaborators, Config};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "adaptive-rag",
    version,
    about = "Answer a question from a local corpus, falling back to web search, with self-checked answers"
)]
struct Args {
    /// The question to answer
    #[arg(value_name = "QUESTION", required_unless_present = "graph")]
    question: Vec<String>,

    /// Directory of .txt/.md files to answer from
    #[arg(short, long, env = "RAG_CORPUS")]
    corpus: Option<PathBuf>,

    /// Chat model to use
    #[arg(short, long)]
    model: Option<String>,

    /// Generate attempts before returning a best-effort answer (0 = no limit)
    #[arg(long)]
    max_generations: Option<u32>,

    /// Print the workflow graph as a Mermaid diagram and exit
    #[arg(long)]
    graph: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) -> Result<()> {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to set logging subscriber: {e}"))
}

fn collaborators(config: &Config, corpus: Vec<adaptive_rag::Document>) -> Collaborators {
    let chat = Arc::new(ChatClient::new(
        config.openai_base_url.clone(),
        config.openai_api_key.clone().unwrap_or_default(),
        config.model.clone(),
        config.http_timeout,
    ));
    let search = TavilySearch::new(
        config.tavily_api_key.clone().unwrap_or_default(),
        config.search_results,
        config.http_timeout,
    );

    Collaborators {
        router: chat.clone(),
        retriever: Arc::new(MemoryRetriever::new(corpus).with_top_k(config.retrieve_top_k)),
        relevance: chat.clone(),
        generator: chat.clone(),
        hallucination: chat.clone(),
        answer: chat,
        web_search: Arc::new(search),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    let mut config = Config::from_env().context("failed to read configuration")?;
    if let Some(model) = args.model {
        config.model = model;
    }
    if let Some(max) = args.max_generations {
        config.max_generations = (max > 0).then_some(max);
    }

    let corpus = match &args.corpus {
        Some(dir) => load_dir(dir, DEFAULT_CHUNK_CHARS)
            .with_context(|| format!("failed to load corpus from {}", dir.display()))?,
        None => {
            warn!("no corpus given; vectorstore questions will fall back to web search");
            Vec::new()
        }
    };

    if args.graph {
        let rag = AdaptiveRag::new(collaborators(&config, corpus));
        print!("{}", rag.workflow()?.to_mermaid());
        return Ok(());
    }

    config.validate().context("invalid configuration")?;
    info!(model = %config.model, documents = corpus.len(), "configuration loaded");

    let rag = AdaptiveRag::new(collaborators(&config, corpus))
        .with_max_generations(config.max_generations)
        .with_max_steps(config.max_steps);

    let question = args.question.join(" ");
    let answer = rag
        .answer_with_progress(&question, |e| println!("Finished running: {}", e.node))
        .context("failed to answer question")?;

    println!();
    println!("{}", answer.generation);
    if answer.status == AnswerStatus::BestEffort {
        println!(
            "\n(best effort: checks did not pass after {} attempts)",
            answer.generations
        );
    }
    Ok(())
}
