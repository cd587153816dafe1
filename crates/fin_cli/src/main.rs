use std::io::{BufRead, Write};
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;
use fin_core::{EngineConfig, MetadataFilter, Result};
use fin_engine::RagEngine;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct HumanDuration(Duration);

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut total_seconds = 0u64;
        let mut current_number = String::new();
        let mut has_unit = false;

        for c in s.chars() {
            if c.is_ascii_digit() {
                current_number.push(c);
            } else if let Ok(num) = current_number.parse::<u64>() {
                match c {
                    's' => total_seconds += num,
                    'm' => total_seconds += num * 60,
                    'h' => total_seconds += num * 3600,
                    'd' => total_seconds += num * 86400,
                    _ => return Err(format!("Invalid duration unit: {}", c)),
                }
                current_number.clear();
                has_unit = true;
            } else if !c.is_whitespace() {
                return Err(format!("Invalid character in duration: {}", c));
            }
        }

        // A bare number means seconds
        if !current_number.is_empty() {
            match current_number.parse::<u64>() {
                Ok(num) => {
                    total_seconds += num;
                    has_unit = true;
                }
                Err(_) => return Err("Invalid number in duration".to_string()),
            }
        }

        if !has_unit {
            return Err("Duration must include a number".to_string());
        }

        Ok(HumanDuration(Duration::from_secs(total_seconds)))
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a JSON config file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<String>,
    #[arg(long, default_value = "memory")]
    storage: String,
    /// Vector store URL, for backends that need one.
    #[arg(long)]
    backend_url: Option<String>,
    #[arg(
        long,
        default_value = "ollama",
        help = "Model backend. Available: ollama (default), offline"
    )]
    model: String,
    #[arg(long)]
    ollama_url: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Scrape the configured outlets and index new articles.
    Ingest {
        /// Run in periodic mode with the specified interval (e.g. 1h, 30m, 1h15m30s)
        #[arg(long)]
        every: Option<HumanDuration>,
    },
    /// Ask a single question and print the streamed answer.
    Ask {
        question: String,
        /// Restrict retrieval to one outlet, e.g. "Livemint".
        #[arg(long)]
        source: Option<String>,
        /// Number of passages to retrieve.
        #[arg(long)]
        k: Option<usize>,
    },
    /// Interactive multi-turn session on stdin.
    Chat {
        #[arg(long)]
        source: Option<String>,
    },
    /// Print index statistics.
    Stats,
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    if let Some(url) = &cli.ollama_url {
        config.ollama_url = url.clone();
    }
    Ok(config)
}

async fn build_engine(cli: &Cli) -> Result<RagEngine> {
    let config = load_config(cli)?;
    let store = fin_storage::create_store(&cli.storage, cli.backend_url.as_deref())?;
    info!("💾 Storage backend initialized (using {})", cli.storage);
    let (llm, embedder) = fin_inference::create_models(&cli.model, &config)?;
    info!("🧠 Model backend initialized (using {})", llm.name());
    RagEngine::new(config, store, llm, embedder)
}

async fn run_ingest(engine: &RagEngine, every: Option<HumanDuration>) -> Result<()> {
    match every {
        Some(interval) => loop {
            info!("Starting ingestion cycle");
            print_report(&engine.ingest().await);
            info!("Waiting {}s before next cycle", interval.0.as_secs());
            tokio::time::sleep(interval.0).await;
        },
        None => {
            print_report(&engine.ingest().await);
            Ok(())
        }
    }
}

fn print_report(report: &fin_core::IngestReport) {
    println!(
        "Fetched {} articles: {} new ({} chunks), {} duplicates, {} failed",
        report.articles_fetched,
        report.articles_new,
        report.chunks_written,
        report.duplicates_skipped,
        report.articles_failed
    );
    for (source, errors) in &report.source_errors {
        println!("  {} errors from {}", errors, source);
    }
}

async fn ask_once(
    engine: &RagEngine,
    session_id: &str,
    question: &str,
    filter: Option<MetadataFilter>,
    k: Option<usize>,
) -> Result<()> {
    let mut stream = engine.ask(session_id, question, filter, k).await?;
    let mut stdout = std::io::stdout();
    while let Some(token) = stream.next_token().await {
        print!("{}", token);
        stdout.flush()?;
    }
    println!();

    let answer = stream.finish().await?;
    if answer.cited_sources.is_empty() {
        println!("(no sources)");
    } else {
        println!("Sources:");
        for source in &answer.cited_sources {
            println!("  [{}] {} - {}", source.source_name, source.title, source.url);
        }
    }
    Ok(())
}

async fn run_chat(engine: &RagEngine, filter: Option<MetadataFilter>) -> Result<()> {
    let session_id = engine.start_session().await;
    println!("Ask about the indexed financial news. Empty line exits.");

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            break;
        }
        if let Err(e) = ask_once(engine, &session_id, question, filter.clone(), None).await {
            eprintln!("Error: {}", e);
        }
    }
    engine.end_session(&session_id).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();
    let engine = build_engine(&cli).await?;

    match cli.command {
        Commands::Ingest { every } => run_ingest(&engine, every).await?,
        Commands::Ask { question, source, k } => {
            let filter = source.map(|s| MetadataFilter::by_source(&s));
            let session_id = engine.start_session().await;
            ask_once(&engine, &session_id, &question, filter, k).await?;
        }
        Commands::Chat { source } => {
            let filter = source.map(|s| MetadataFilter::by_source(&s));
            run_chat(&engine, filter).await?;
        }
        Commands::Stats => {
            let stats = engine.stats().await?;
            println!("{} chunks indexed", stats.total_chunks);
            for (source, count) in &stats.per_source_counts {
                println!("  {}: {}", source, count);
            }
        }
    }

    Ok(())
}
