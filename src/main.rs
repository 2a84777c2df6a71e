//! Comment Sentiment Service
//!
//! HTTP endpoint that rates comments through a hosted LLM.

use clap::{Parser, Subcommand};
use sentiment_api::{
    config::Config,
    model::{LlmClient, SentimentAnalyzer},
    server::{self, AppState},
    types::CommentRequest,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "sentiment-api")]
#[command(about = "Rate comment sentiment through a hosted LLM")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default)
    Serve {
        /// Bind address
        #[arg(long)]
        host: Option<String>,
        /// Listen port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Analyze a single comment and print the result
    Analyze {
        /// Comment text
        comment: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("sentiment_api=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
    }) {
        Commands::Serve { host, port } => run_server(config, host, port).await,
        Commands::Analyze { comment } => analyze_once(config, comment).await,
    }
}

async fn run_server(mut config: Config, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let client = LlmClient::from_config(&config.llm)?;
    if client.missing_credential() {
        tracing::warn!("No API key configured, provider calls will fail until GROQ_API_KEY is set");
    }

    let state = AppState::new(Arc::new(client));
    server::serve(&config.server, state).await
}

async fn analyze_once(config: Config, comment: String) -> anyhow::Result<()> {
    let client = LlmClient::from_config(&config.llm)?;
    let analyzer = SentimentAnalyzer::new(Arc::new(client));

    let result = analyzer.analyze(&CommentRequest::new(comment)).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
