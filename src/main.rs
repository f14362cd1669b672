//! PDF Form Filler - Entry point
//!
//! Serves the MCP tools over stdio, answers single gateway events, or fills a
//! template locally.

use anyhow::Context;
use clap::{Parser, Subcommand};
use pdf_form_filler::source::OutputCache;
use pdf_form_filler::{
    fill_with_options, run_server_with_config, transport, FillService, FormData,
    GatewayRequest, ServerConfig,
};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Fill PDF AcroForm templates from field/value maps")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the MCP server over stdio (default)
    Serve,
    /// Answer one API gateway event and print the response JSON
    Invoke {
        /// Event JSON file; reads stdin when omitted
        #[arg(short, long)]
        event: Option<PathBuf>,
    },
    /// Fill a local template with a JSON object of field values
    Fill {
        #[arg(short, long)]
        template: PathBuf,
        /// JSON file holding either the field map or {"formData": {...}}
        #[arg(short, long)]
        data: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries MCP traffic and command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_form_filler=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = ServerConfig::from_env();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            tracing::info!(templates = ?config.templates, "Starting PDF form filler");
            run_server_with_config(config).await
        }
        Commands::Invoke { event } => invoke(&config, event).await,
        Commands::Fill {
            template,
            data,
            output,
        } => fill_local(&config, &template, &data, &output),
    }
}

async fn invoke(config: &ServerConfig, event: Option<PathBuf>) -> anyhow::Result<()> {
    let raw = match &event {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading event {}", path.display()))?,
        None => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("reading event from stdin")?;
            raw
        }
    };
    let request: GatewayRequest = serde_json::from_str(&raw).context("parsing event JSON")?;

    let store = config.build_store()?;
    let cache = OutputCache::new(config.cache_max_entries, config.cache_max_bytes);
    let service = FillService::new(store, Arc::new(cache), config.fill.clone());

    let response = transport::handle(&service, &request).await;
    println!("{}", serde_json::to_string(&response)?);
    Ok(())
}

fn fill_local(
    config: &ServerConfig,
    template: &Path,
    data: &Path,
    output: &Path,
) -> anyhow::Result<()> {
    let template_bytes =
        std::fs::read(template).with_context(|| format!("reading {}", template.display()))?;
    let raw = std::fs::read(data).with_context(|| format!("reading {}", data.display()))?;

    let value: serde_json::Value = serde_json::from_slice(&raw).context("parsing form data")?;
    let value = value.get("formData").cloned().unwrap_or(value);
    let form = FormData::from_json(&value)?;

    let filled = fill_with_options(&template_bytes, &form, &config.fill)?;
    std::fs::write(output, &filled.data)
        .with_context(|| format!("writing {}", output.display()))?;

    for name in &filled.report.unmatched_keys {
        tracing::warn!(name = %name, "No field matched form data key");
    }
    tracing::info!(
        output = %output.display(),
        filled = filled.report.mutated_count(),
        "Wrote filled PDF"
    );
    Ok(())
}
