//! RAG Eval CLI
//!
//! Runs a question set through retrieval-augmented and vanilla generation and
//! writes a comparative Markdown report.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rag_eval::{
    config::{Config, Provider, RetrievalBackend},
    eval::{AnalysisSynthesizer, ReportBuilder, Scheduler, write_report},
    llm::{build_generator, test_connection},
    persistence::save_run,
    questions::load_questions,
    rag::{AnswerMode, RagPipeline},
    retrieval::build_retriever,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// RAG Eval - compare retrieval-augmented and vanilla LLM answers
#[derive(Parser)]
#[command(name = "rag-eval")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a YAML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer every question with and without retrieval and write a report
    Evaluate {
        /// Markdown file with the numbered question list
        #[arg(short, long)]
        questions: PathBuf,

        /// Output path for the Markdown report
        #[arg(short, long)]
        output: PathBuf,

        /// Number of questions processed in parallel
        #[arg(short = 'j', long)]
        concurrency: Option<usize>,

        /// Skip the model-written analysis section
        #[arg(long)]
        no_analysis: bool,

        /// Also save the raw run as JSON
        #[arg(long)]
        json: Option<PathBuf>,

        #[command(flatten)]
        llm: LlmArgs,

        #[command(flatten)]
        retrieval: RetrievalArgs,
    },

    /// Ask a single question
    Ask {
        /// The question
        question: String,

        /// Answer without retrieved context
        #[arg(long)]
        no_rag: bool,

        #[command(flatten)]
        llm: LlmArgs,

        #[command(flatten)]
        retrieval: RetrievalArgs,
    },

    /// Test LLM connection and retrieval backend
    Test {
        #[command(flatten)]
        llm: LlmArgs,

        #[command(flatten)]
        retrieval: RetrievalArgs,
    },
}

/// Generation overrides shared by every command.
#[derive(Args)]
struct LlmArgs {
    /// LLM provider (openai, ollama, anthropic)
    #[arg(long)]
    provider: Option<Provider>,

    /// Model name
    #[arg(short, long)]
    model: Option<String>,

    /// LLM API base URL
    #[arg(long)]
    url: Option<String>,

    /// LLM API key
    #[arg(long)]
    api_key: Option<String>,
}

/// Retrieval overrides shared by every command.
#[derive(Args)]
struct RetrievalArgs {
    /// Number of passages retrieved per question
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    /// Retrieval backend (qdrant, corpus, none)
    #[arg(long)]
    backend: Option<RetrievalBackend>,

    /// Qdrant server URL
    #[arg(long)]
    qdrant_url: Option<String>,

    /// Qdrant collection name
    #[arg(long)]
    collection: Option<String>,

    /// Directory of .txt/.md reference files (selects the corpus backend)
    #[arg(long)]
    corpus: Option<PathBuf>,
}

impl LlmArgs {
    fn apply(self, config: &mut Config) {
        if let Some(provider) = self.provider {
            config.llm.provider = provider;
        }
        if let Some(model) = self.model {
            config.llm.model = model;
        }
        if let Some(url) = self.url {
            config.llm.api_base = url;
        }
        if let Some(key) = self.api_key {
            config.llm.api_key = key;
        }
    }
}

impl RetrievalArgs {
    fn apply(self, config: &mut Config) {
        if let Some(k) = self.top_k {
            config.evaluation.retrieval_k = k;
        }
        if let Some(backend) = self.backend {
            config.retrieval.backend = backend;
        }
        if let Some(url) = self.qdrant_url {
            config.retrieval.qdrant_url = url;
        }
        if let Some(collection) = self.collection {
            config.retrieval.collection = collection;
        }
        if let Some(corpus) = self.corpus {
            config.retrieval.corpus_path = Some(corpus);
            config.retrieval.backend = RetrievalBackend::Corpus;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over -v
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let loaded = match cli.config.as_deref() {
        Some(path) => Config::load_with(Some(path)),
        None => Config::load(),
    };
    let mut config = loaded.context("Failed to load configuration")?;

    match cli.command {
        Commands::Evaluate {
            questions,
            output,
            concurrency,
            no_analysis,
            json,
            llm,
            retrieval,
        } => {
            llm.apply(&mut config);
            retrieval.apply(&mut config);
            if let Some(concurrency) = concurrency {
                config.evaluation.concurrency = concurrency;
            }
            if no_analysis {
                config.evaluation.include_analysis = false;
            }
            cmd_evaluate(config, questions, output, json).await
        }
        Commands::Ask {
            question,
            no_rag,
            llm,
            retrieval,
        } => {
            llm.apply(&mut config);
            retrieval.apply(&mut config);
            cmd_ask(config, question, no_rag).await
        }
        Commands::Test { llm, retrieval } => {
            llm.apply(&mut config);
            retrieval.apply(&mut config);
            cmd_test(config).await
        }
    }
}

async fn cmd_evaluate(
    config: Config,
    questions_path: PathBuf,
    output: PathBuf,
    json: Option<PathBuf>,
) -> Result<()> {
    config.validate().context("Invalid configuration")?;

    let questions = load_questions(&questions_path).with_context(|| {
        format!("Failed to load questions from '{}'", questions_path.display())
    })?;

    println!(
        "Loaded {} questions from {}",
        questions.len(),
        questions_path.display()
    );
    println!("Using model: {}", config.llm.effective_model());
    println!("Concurrency: {}", config.evaluation.concurrency);

    let generator = build_generator(&config.llm).context("Failed to create LLM client")?;
    let retriever = build_retriever(&config.retrieval).context("Failed to create retriever")?;
    if let Some(retriever) = &retriever {
        info!("Retrieval via {}", retriever.describe());
    }

    let pipeline = RagPipeline::new(
        Arc::clone(&generator),
        retriever,
        config.evaluation.retrieval_k,
    );
    let scheduler = Scheduler::new(Arc::new(pipeline));

    println!("\nRunning evaluation...");
    let run = scheduler
        .run(&questions, config.evaluation.concurrency)
        .await
        .context("Evaluation failed")?;

    run.print_summary();

    let analysis = if config.evaluation.include_analysis {
        println!("Generating analysis...");
        AnalysisSynthesizer::new(generator)
            .with_char_budget(config.evaluation.analysis_char_budget)
            .synthesize(&run.results)
            .await
    } else {
        None
    };

    let report = ReportBuilder::new()
        .with_cell_limit(config.evaluation.summary_cell_limit)
        .render_run(&run, analysis.as_deref());

    write_report(&output, &report).context("Failed to write report")?;
    println!("Report saved to: {}", output.display());

    if let Some(json_path) = json {
        save_run(&run, &json_path).context("Failed to save run")?;
        println!("Run data saved to: {}", json_path.display());
    }

    Ok(())
}

async fn cmd_ask(config: Config, question: String, no_rag: bool) -> Result<()> {
    config.validate().context("Invalid configuration")?;

    let generator = build_generator(&config.llm).context("Failed to create LLM client")?;
    let retriever = if no_rag {
        None
    } else {
        build_retriever(&config.retrieval).context("Failed to create retriever")?
    };

    let pipeline = RagPipeline::new(generator, retriever, config.evaluation.retrieval_k);
    let mode = if no_rag {
        AnswerMode::Baseline
    } else {
        AnswerMode::Augmented
    };

    println!("Asking: \"{}\"", question);
    println!("Using model: {}", config.llm.effective_model());
    println!();

    let start = Instant::now();
    let answer = pipeline
        .ask(&question, mode, &[])
        .await
        .context("Query failed")?;

    println!("{}", answer.text);

    if !answer.passages.is_empty() {
        println!();
        println!("Sources:");
        println!("{}", "─".repeat(60));
        for (i, passage) in answer.passages.iter().enumerate() {
            let source = passage.source.as_deref().unwrap_or("unknown");
            match passage.score {
                Some(score) => println!("{:>2}. {} (score {:.3})", i + 1, source, score),
                None => println!("{:>2}. {}", i + 1, source),
            }
            let preview: String = passage.content.chars().take(200).collect();
            for line in preview.lines().take(3) {
                println!("      {}", line);
            }
            if passage.content.chars().count() > 200 {
                println!("      ...");
            }
        }
        println!("{}", "─".repeat(60));
    }

    println!("Answered in {:.2?}", start.elapsed());
    Ok(())
}

async fn cmd_test(config: Config) -> Result<()> {
    println!("Testing connections...\n");

    println!("Configuration:");
    println!("  Provider:  {}", config.llm.provider);
    println!("  API Base:  {}", config.llm.effective_api_base());
    println!("  Model:     {}", config.llm.effective_model());
    if !config.llm.api_key.is_empty() {
        let prefix: String = config.llm.api_key.chars().take(8).collect();
        println!("  API Key:   {}...", prefix);
    }
    println!();

    if let Err(e) = config.validate() {
        println!("Configuration error: {}", e);
        return Ok(());
    }

    let generator = build_generator(&config.llm).context("Failed to create LLM client")?;

    println!("Sending test request...");
    match test_connection(generator.as_ref()).await {
        Ok(()) => println!("LLM connection successful!"),
        Err(e) => println!("LLM connection failed: {}", e),
    }

    match build_retriever(&config.retrieval) {
        Ok(Some(retriever)) => {
            println!("Checking retriever {}...", retriever.describe());
            match retriever.health_check().await {
                Ok(()) => println!("Retriever reachable!"),
                Err(e) => println!("Retriever check failed: {}", e),
            }
        }
        Ok(None) => println!("Retrieval disabled."),
        Err(e) => println!("Retriever setup failed: {}", e),
    }

    Ok(())
}
