//! ovault: client-side encrypted file vault CLI
//!
//! Commands:
//!   upload <file> --owner <id>      - encrypt and store a local file
//!   download <id> --owner <id>      - fetch and decrypt a stored file (--force to overwrite)
//!   delete <id> --owner <id>        - remove a stored file
//!   list --owner <id>               - list an owner's files, newest first
//!   usage --owner <id>              - total bytes and file count
//!   health                          - check blob and metadata stores
//!   config show                     - display current configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ovault_core::config::{expand_tilde, StorageBackend, VaultConfig};
use ovault_core::format_file_size;
use ovault_engine::Vault;
use ovault_storage::{JsonMetadataStore, OpendalBlobStore, S3Credentials};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "ovault",
    version,
    about = "Client-side encrypted file vault",
    long_about = "ovault: encrypt files locally with a passphrase-derived key and store them in S3-compatible or local blob storage"
)]
struct Cli {
    /// Path to ovault.toml configuration file
    #[arg(
        long,
        short = 'c',
        env = "OVAULT_CONFIG",
        default_value = "~/.config/ovault/ovault.toml"
    )]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides [log] level
    #[arg(long, env = "OVAULT_LOG")]
    log: Option<String>,

    /// Log format; overrides [log] format
    #[arg(long, env = "OVAULT_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(clap::Args, Debug)]
struct PassphraseArgs {
    /// Read the passphrase from this environment variable instead of prompting
    #[arg(long, value_name = "VAR")]
    passphrase_env: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt a local file and store it
    Upload {
        /// Local file to upload
        file: PathBuf,
        /// Owner the file is stored under
        #[arg(long, env = "OVAULT_OWNER")]
        owner: String,
        /// Declared MIME type (default: application/octet-stream)
        #[arg(long = "type")]
        content_type: Option<String>,
        /// Stored file name (default: the local file's name)
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        passphrase: PassphraseArgs,
    },

    /// Fetch and decrypt a stored file
    Download {
        /// Record id (see `ovault list`)
        id: String,
        #[arg(long, env = "OVAULT_OWNER")]
        owner: String,
        /// Destination path (default: the stored file name in the current dir)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Overwrite the destination if it already exists
        #[arg(long)]
        force: bool,
        #[command(flatten)]
        passphrase: PassphraseArgs,
    },

    /// Remove a stored file
    Delete {
        id: String,
        #[arg(long, env = "OVAULT_OWNER")]
        owner: String,
    },

    /// List an owner's files, newest first
    List {
        #[arg(long, env = "OVAULT_OWNER")]
        owner: String,
        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show an owner's storage usage
    Usage {
        #[arg(long, env = "OVAULT_OWNER")]
        owner: String,
    },

    /// Check that the blob and metadata stores are reachable
    Health,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = expand_tilde(&cli.config);
    let config = VaultConfig::load(&config_path)
        .with_context(|| format!("loading config: {}", config_path.display()))?;

    init_logging(&cli, &config);
    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        backend = ?config.storage.backend,
        "ovault starting"
    );

    match cli.command {
        Commands::Config {
            action: ConfigAction::Show,
        } => cmd_config_show(&config, &config_path),
        Commands::Upload {
            file,
            owner,
            content_type,
            name,
            passphrase,
        } => {
            let vault = open_vault(&config).await?;
            cmd_upload(
                &vault,
                &file,
                &owner,
                content_type.as_deref().unwrap_or_default(),
                name.as_deref(),
                &passphrase,
            )
            .await
        }
        Commands::Download {
            id,
            owner,
            output,
            force,
            passphrase,
        } => {
            let vault = open_vault(&config).await?;
            cmd_download(&vault, &id, &owner, output.as_deref(), force, &passphrase).await
        }
        Commands::Delete { id, owner } => {
            let vault = open_vault(&config).await?;
            cmd_delete(&vault, &id, &owner).await
        }
        Commands::List { owner, json } => {
            let vault = open_vault(&config).await?;
            cmd_list(&vault, &owner, json).await
        }
        Commands::Usage { owner } => {
            let vault = open_vault(&config).await?;
            cmd_usage(&vault, &owner).await
        }
        Commands::Health => {
            let vault = open_vault(&config).await?;
            cmd_health(&vault, &config).await
        }
    }
}

fn init_logging(cli: &Cli, config: &VaultConfig) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let level = cli.log.as_deref().unwrap_or(&config.log.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let json = match &cli.log_format {
        Some(LogFormat::Json) => true,
        Some(LogFormat::Text) => false,
        None => config.log.format.eq_ignore_ascii_case("json"),
    };

    // Logs go to stderr so stdout stays clean for command output
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

// ── Vault construction ────────────────────────────────────────────────────────

/// S3 credentials from AWS_* env vars, falling back to OVAULT_*.
fn credentials_from_env() -> Option<S3Credentials> {
    let access_key_id = std::env::var("AWS_ACCESS_KEY_ID")
        .or_else(|_| std::env::var("OVAULT_ACCESS_KEY_ID"))
        .ok()?;
    let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY")
        .or_else(|_| std::env::var("OVAULT_SECRET_ACCESS_KEY"))
        .ok()?;
    Some(S3Credentials {
        access_key_id,
        secret_access_key,
    })
}

async fn open_vault(config: &VaultConfig) -> Result<Vault> {
    let credentials = credentials_from_env();
    if config.storage.backend == StorageBackend::S3 && credentials.is_none() {
        anyhow::bail!(
            "S3 credentials not set\n\
             Set AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY environment variables.\n\
             Example:\n\
             \texport AWS_ACCESS_KEY_ID=your-key\n\
             \texport AWS_SECRET_ACCESS_KEY=your-secret"
        );
    }

    let op = ovault_storage::build_from_core_config(&config.storage, credentials.as_ref())
        .context("building storage operator")?;

    let metadata_path = expand_tilde(&config.metadata.path);
    let metadata = JsonMetadataStore::open(&metadata_path)
        .await
        .with_context(|| format!("opening metadata store: {}", metadata_path.display()))?;

    Ok(Vault::from_config(
        config,
        Arc::new(OpendalBlobStore::new(op)),
        Arc::new(metadata),
    ))
}

fn read_passphrase(args: &PassphraseArgs) -> Result<SecretString> {
    let raw = match &args.passphrase_env {
        Some(var) => std::env::var(var)
            .with_context(|| format!("passphrase variable {var} is not set"))?,
        None => rpassword::prompt_password("Passphrase: ").context("reading passphrase")?,
    };
    if raw.is_empty() {
        anyhow::bail!("passphrase must not be empty");
    }
    Ok(SecretString::from(raw))
}

// ── Progress helpers ──────────────────────────────────────────────────────────

fn make_spinner(prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{prefix:.bold} {spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

// ── `ovault upload` ───────────────────────────────────────────────────────────

async fn cmd_upload(
    vault: &Vault,
    file: &Path,
    owner: &str,
    content_type: &str,
    name: Option<&str>,
    passphrase: &PassphraseArgs,
) -> Result<()> {
    let file_name = match name {
        Some(n) => n.to_string(),
        None => file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("no file name in {}", file.display()))?,
    };

    let data = tokio::fs::read(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;

    // Fail fast on policy before asking for a passphrase
    for warning in vault.check_upload(&file_name, content_type, data.len() as u64)? {
        eprintln!("warning: {warning}");
    }

    let secret = read_passphrase(passphrase)?;

    let pb = make_spinner("upload");
    pb.set_message(format!("encrypting {file_name}..."));
    let result = vault
        .upload(data, &file_name, content_type, owner, &secret)
        .await;
    pb.finish_and_clear();
    let record = result.with_context(|| format!("uploading {}", file.display()))?;

    println!("Uploaded:");
    println!("  id:    {}", record.id);
    println!("  name:  {}", record.file_name);
    println!("  type:  {}", record.file_type);
    println!("  size:  {}", format_file_size(record.file_size));
    println!("  blob:  {}", record.blob_path);
    Ok(())
}

// ── `ovault download` ─────────────────────────────────────────────────────────

async fn cmd_download(
    vault: &Vault,
    id: &str,
    owner: &str,
    output: Option<&Path>,
    force: bool,
    passphrase: &PassphraseArgs,
) -> Result<()> {
    // Resolve the record and destination first so either fails before the prompt
    let record = vault.get_record(id, owner).await?;
    let dest = match output {
        Some(p) => p.to_path_buf(),
        None => PathBuf::from(local_file_name(&record.file_name)),
    };
    check_destination(&dest, force)?;
    let secret = read_passphrase(passphrase)?;

    let pb = make_spinner("download");
    pb.set_message(format!("decrypting {}...", record.file_name));
    let result = vault.download(id, owner, &secret).await;
    pb.finish_and_clear();
    let (plaintext, _) = result.with_context(|| format!("downloading {id}"))?;

    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    tokio::fs::write(&dest, &plaintext)
        .await
        .with_context(|| format!("writing {}", dest.display()))?;

    println!("Downloaded:");
    println!("  local: {}", dest.display());
    println!("  size:  {}", format_file_size(plaintext.len() as u64));
    Ok(())
}

/// Refuse to clobber an existing file unless `force` is set.
fn check_destination(dest: &Path, force: bool) -> Result<()> {
    if dest.exists() {
        if !force {
            anyhow::bail!(
                "{} already exists (use --force to overwrite)",
                dest.display()
            );
        }
        tracing::warn!(path = %dest.display(), "overwriting existing file");
    }
    Ok(())
}

/// Last path component of a stored name, so downloads never escape the cwd.
fn local_file_name(stored: &str) -> String {
    let base = stored
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    match base {
        "" | "." | ".." => "download".to_string(),
        s => s.to_string(),
    }
}

// ── `ovault delete` ───────────────────────────────────────────────────────────

async fn cmd_delete(vault: &Vault, id: &str, owner: &str) -> Result<()> {
    vault
        .delete(id, owner)
        .await
        .with_context(|| format!("deleting {id}"))?;
    println!("Deleted {id}");
    Ok(())
}

// ── `ovault list` / `ovault usage` ────────────────────────────────────────────

async fn cmd_list(vault: &Vault, owner: &str, json: bool) -> Result<()> {
    let records = vault.list_files(owner).await?;

    if json {
        let rendered =
            serde_json::to_string_pretty(&records).context("serializing records to JSON")?;
        println!("{rendered}");
        return Ok(());
    }

    if records.is_empty() {
        println!("No files for {owner}");
        return Ok(());
    }

    println!("{:<36}  {:>10}  {:<24}  NAME", "ID", "SIZE", "TYPE");
    for r in &records {
        println!(
            "{:<36}  {:>10}  {:<24}  {}",
            r.id,
            format_file_size(r.file_size),
            r.file_type,
            r.file_name
        );
    }
    Ok(())
}

async fn cmd_usage(vault: &Vault, owner: &str) -> Result<()> {
    let usage = vault.storage_usage(owner).await?;
    println!("Owner:  {owner}");
    println!("Files:  {}", usage.file_count);
    println!("Total:  {}", format_file_size(usage.total_bytes));
    Ok(())
}

// ── `ovault health` / `ovault config show` ────────────────────────────────────

async fn cmd_health(vault: &Vault, config: &VaultConfig) -> Result<()> {
    let location = match config.storage.backend {
        StorageBackend::S3 => format!(" {}/{}", config.storage.endpoint, config.storage.bucket),
        StorageBackend::Fs => format!(" {}", expand_tilde(&config.storage.root).display()),
        StorageBackend::Memory => String::new(),
    };
    let backend = format!("{}{location}", vault.blob_backend());

    match vault.health().await {
        Ok(()) => {
            println!("storage:  ok ({backend})");
            println!("metadata: ok ({})", expand_tilde(&config.metadata.path).display());
            Ok(())
        }
        Err(e) => {
            println!("unhealthy ({backend}): {e}");
            Err(e).context("health check failed")
        }
    }
}

fn cmd_config_show(config: &VaultConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}
