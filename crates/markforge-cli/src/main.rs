mod studio;

use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use markforge_contracts::models::ModelRegistry;
use markforge_contracts::Mode;
use markforge_engine::download::save_result;
use markforge_engine::encoder::encode_image_files;
use markforge_engine::{
    ClientController, GeminiProvider, HttpRelayClient, LogoRelay, Relay, RelayConfig,
    ServerConfig, Status,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "markforge", version, about = "AI logo modernization and creation")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the relay HTTP server.
    Serve(ServeArgs),
    /// Generate one logo and save it.
    Generate(GenerateArgs),
    /// Interactive session with per-mode state and history.
    Studio(StudioArgs),
    /// List upstream models that can generate content.
    Models,
}

#[derive(Debug, Parser)]
struct ServeArgs {
    #[arg(long)]
    port: Option<u16>,
    #[arg(long)]
    bind: Option<IpAddr>,
}

#[derive(Debug, Parser)]
struct GenerateArgs {
    #[arg(long, default_value = "create")]
    mode: Mode,
    #[arg(long, default_value = "")]
    prompt: String,
    /// Reference image; repeat for up to five.
    #[arg(long = "image")]
    images: Vec<PathBuf>,
    /// Base URL of a running relay. Without it the model is called directly.
    #[arg(long)]
    relay: Option<String>,
    #[arg(long, default_value = ".")]
    out: PathBuf,
}

#[derive(Debug, Parser)]
struct StudioArgs {
    #[arg(long, default_value = "modernize")]
    mode: Mode,
    #[arg(long)]
    relay: Option<String>,
    #[arg(long, default_value = ".")]
    out: PathBuf,
}

fn main() {
    dotenv::dotenv().ok();
    init_logging();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("markforge error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("MARKFORGE_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(async move {
        match cli.command {
            Command::Serve(args) => run_serve(args).await,
            Command::Generate(args) => run_generate(args).await,
            Command::Studio(args) => studio::run_studio(args.mode, args.relay, args.out).await,
            Command::Models => run_models().await,
        }
    })
}

async fn run_serve(args: ServeArgs) -> Result<i32> {
    let mut config = ServerConfig::from_env()?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    markforge_engine::server::serve(config).await?;
    Ok(0)
}

/// Remote relay when a URL is given, otherwise a local one from the environment.
pub(crate) fn build_relay(remote: Option<&str>) -> Result<Box<dyn Relay>> {
    match remote.map(str::trim).filter(|url| !url.is_empty()) {
        Some(url) => {
            info!(relay = url, "using remote relay");
            Ok(Box::new(HttpRelayClient::new(url)))
        }
        None => {
            let config = RelayConfig::from_env()?;
            Ok(Box::new(LogoRelay::from_config(&config)))
        }
    }
}

async fn run_generate(args: GenerateArgs) -> Result<i32> {
    let relay = build_relay(args.relay.as_deref())?;
    let mut controller = ClientController::new(args.mode);
    controller.set_prompt(args.prompt);
    controller.set_images(encode_image_files(&args.images));

    let status = controller.generate(relay.as_ref()).await;
    let session = controller.active_session();
    match (status, session.result.as_ref()) {
        (Status::Success, Some(result)) => {
            let path = save_result(&args.out, result)?;
            println!("{}", path.display());
            Ok(0)
        }
        _ => {
            eprintln!(
                "{}",
                session
                    .error
                    .as_deref()
                    .unwrap_or("Generation did not produce a logo.")
            );
            Ok(1)
        }
    }
}

async fn run_models() -> Result<i32> {
    let config = RelayConfig::from_env()?;
    let provider = GeminiProvider::new(config.api_base, config.api_key, config.model);
    let registry = ModelRegistry::default();
    let models = provider
        .list_models()
        .await
        .map_err(|err| anyhow::anyhow!("failed listing models: {err}"))?;
    for name in &models {
        match registry.get(name) {
            Some(spec) => println!("{name}\t{:?}", spec.output),
            None => println!("{name}"),
        }
    }
    if models.is_empty() {
        println!("No models support generateContent for this key.");
    }
    Ok(0)
}
