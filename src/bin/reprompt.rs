//! CLI for Reprompt - recover the prompt behind an AI-generated image.

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use reprompt::credential::{CREDENTIAL_KEY, STORAGE_ENV_VAR};
use reprompt::{
    App, CredentialStore, FileCredentialStore, GeminiAnalyzer, GeminiModel, ImagePayload,
    MemoryCredentialStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Fallback key source when nothing is stored.
const API_KEY_ENV_VAR: &str = "GOOGLE_API_KEY";

#[derive(Parser)]
#[command(name = "reprompt")]
#[command(about = "Guess the prompt that produced an AI-generated image (Gemini vision)")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Credential storage file (defaults to $REPROMPT_STORAGE or the config dir)
    #[arg(long, global = true)]
    storage: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze an image and print the reconstructed prompt
    Analyze(AnalyzeArgs),

    /// Manage the stored API key
    #[command(subcommand)]
    Key(KeyCommand),
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Image file (PNG, JPEG or WebP)
    image: PathBuf,

    #[command(flatten)]
    model: ModelArgs,
}

#[derive(Args)]
struct ModelArgs {
    /// Gemini model to use
    #[arg(short, long, value_enum, default_value = "flash")]
    model: ModelArg,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 60)]
    timeout: u64,
}

#[derive(Subcommand)]
enum KeyCommand {
    /// Store an API key (an empty value clears it)
    Set {
        /// The Google AI API key
        key: String,
    },
    /// Remove the stored API key
    Clear,
    /// Show whether a key is stored
    Status,
    /// Check the stored key against the API
    Verify(ModelArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModelArg {
    Flash,
    FlashLite,
    Pro,
}

impl From<ModelArg> for GeminiModel {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::Flash => GeminiModel::Flash,
            ModelArg::FlashLite => GeminiModel::FlashLite,
            ModelArg::Pro => GeminiModel::Pro,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let store = match cli.storage {
        Some(path) => FileCredentialStore::new(path),
        None => FileCredentialStore::from_env(),
    };

    match cli.command {
        Commands::Analyze(args) => analyze(args, store, cli.json).await?,
        Commands::Key(KeyCommand::Set { key }) => {
            store.save(&key);
            if key.is_empty() {
                println!("API key cleared");
            } else {
                println!("API key saved to {}", store.path().display());
            }
        }
        Commands::Key(KeyCommand::Clear) => {
            store.clear();
            println!("API key cleared");
        }
        Commands::Key(KeyCommand::Status) => key_status(&store, cli.json)?,
        Commands::Key(KeyCommand::Verify(args)) => verify_key(args, store).await?,
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_analyzer(args: &ModelArgs) -> anyhow::Result<GeminiAnalyzer> {
    let analyzer = GeminiAnalyzer::builder()
        .model(args.model.into())
        .timeout(Duration::from_secs(args.timeout))
        .build()?;
    Ok(analyzer)
}

/// The stored key wins; `GOOGLE_API_KEY` is used only when nothing is stored
/// and is never written back.
fn resolve_store(store: FileCredentialStore) -> Arc<dyn CredentialStore> {
    if store.load().is_some() {
        return Arc::new(store);
    }
    match std::env::var(API_KEY_ENV_VAR) {
        Ok(key) if !key.is_empty() => {
            tracing::debug!("no stored API key, using {API_KEY_ENV_VAR}");
            let fallback = MemoryCredentialStore::new();
            fallback.save(&key);
            Arc::new(fallback)
        }
        _ => Arc::new(store),
    }
}

async fn analyze(
    args: AnalyzeArgs,
    store: FileCredentialStore,
    json_output: bool,
) -> anyhow::Result<()> {
    let image = ImagePayload::from_path(&args.image)
        .with_context(|| format!("cannot use {}", args.image.display()))?;
    let analyzer = build_analyzer(&args.model)?;

    let app = App::new(resolve_store(store), Arc::new(analyzer));
    if app.credential().is_none() {
        anyhow::bail!(
            "API key is missing: run `reprompt key set <KEY>` or set {API_KEY_ENV_VAR}"
        );
    }

    app.select_image(image)?;
    let result = app
        .analyze()
        .await
        .context("analysis failed")?
        .context("analysis was discarded")?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.prompt);
    }

    Ok(())
}

fn key_status(store: &FileCredentialStore, json_output: bool) -> anyhow::Result<()> {
    let key = store.load();

    if json_output {
        let status = serde_json::json!({
            "configured": key.is_some(),
            "key": key.as_ref().map(|k| k.masked()),
            "storage": store.path().display().to_string(),
            "entry": CREDENTIAL_KEY,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    match key {
        Some(key) => println!("API key set: {}", key.masked()),
        None => println!("No API key set"),
    }
    println!("Storage: {} (override with {STORAGE_ENV_VAR})", store.path().display());
    Ok(())
}

async fn verify_key(args: ModelArgs, store: FileCredentialStore) -> anyhow::Result<()> {
    let key = resolve_store(store).load().with_context(|| {
        format!("API key is missing: run `reprompt key set <KEY>` or set {API_KEY_ENV_VAR}")
    })?;
    let analyzer = build_analyzer(&args)?;

    analyzer
        .verify_credential(key.expose())
        .await
        .context("API key check failed")?;
    println!("API key OK ({})", analyzer.model().as_str());
    Ok(())
}
