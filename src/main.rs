use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use lega::{
    analysis::AiAnalyzer,
    api,
    config::{self, Config},
    document::{now_rfc3339, render_report},
    extraction::UploadLimits,
    llm::GeminiClient,
    logging,
    processing::{self, NewRecord, build_analysis, read_upload},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(
    name = "lega",
    version,
    about = "Legal document analysis: risk scoring, plain-language summaries, and Q&A"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server (default).
    Serve,
    /// Analyze one file and print the report without storing it.
    Analyze {
        /// PDF, DOCX, or TXT file.
        file: PathBuf,
        /// Print the analysis as JSON instead of the text report.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::init_config().context("failed to load configuration")?;
    logging::init_tracing(&config.log_level, &config.log_file);
    config.log_loaded();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Analyze { file, json } => analyze(config, &file, json).await,
    }
}

async fn serve(config: &'static Config) -> Result<()> {
    let service = processing::DocumentService::new(config)
        .await
        .context("failed to initialize document service")?;
    let app = api::create_router(
        Arc::new(service),
        config.features,
        config.max_file_size_bytes(),
    );

    let address = format!("{}:{}", config.server_address, config.server_port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    tracing::info!("Listening on http://{address}");
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

async fn analyze(config: &Config, path: &Path, json: bool) -> Result<()> {
    if config.api_key().is_none() {
        bail!("GOOGLE_API_KEY is not set; analysis needs the AI service");
    }
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .context("file path has no usable file name")?;
    let content = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;

    let limits = UploadLimits {
        max_bytes: config.max_file_size_bytes(),
        supported_types: config.supported_file_types.clone(),
    };
    let (kind, text) = read_upload(filename, &content, &limits).await?;
    let analyzer = AiAnalyzer::new(Arc::new(GeminiClient::from_config(config)?));
    let analysis = build_analysis(&analyzer, &text, config.max_risk_factors).await?;

    let record = NewRecord {
        id: "local".to_string(),
        filename,
        file_path: path.display().to_string(),
        kind,
        content: &content,
        text,
        analysis,
    }
    .into_record();

    if json {
        println!("{}", serde_json::to_string_pretty(&record.analysis)?);
    } else {
        println!("{}", render_report(&record, &now_rfc3339()));
    }
    Ok(())
}
