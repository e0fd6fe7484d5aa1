use anyhow::{Context, Result};
use futures::TryStreamExt;
use object_fs::{
    FilesystemAdapter, LocalObjectClient, ObjectClient, StorageAttributes, WriteConfig,
};
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::{fs, path::Path, str::FromStr, sync::Arc};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing_subscriber::EnvFilter;

mod config;

use config::{AppConfig, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // --- Parse config + command ---
    let (cfg, command) = config::AppConfig::from_env_and_args()?;
    tracing::debug!(config = ?cfg, "resolved config");

    // --- Ensure storage directory exists ---
    if !Path::new(&cfg.storage_dir).exists() {
        fs::create_dir_all(&cfg.storage_dir)?;
        tracing::info!(path = %cfg.storage_dir, "created storage directory");
    }

    // --- Initialize SQLite connection ---
    let options = SqliteConnectOptions::from_str(&cfg.database_url)
        .with_context(|| format!("parsing database url `{}`", cfg.database_url))?
        .create_if_missing(true);
    if let Some(parent) = Path::new(options.get_filename()).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
            tracing::info!(path = %parent.display(), "created missing directory");
        }
    }

    let db = Arc::new(
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| format!("connecting to {}", cfg.database_url))?,
    );
    let client = Arc::new(LocalObjectClient::new(db, cfg.storage_dir.clone()));

    // --- Handle migration mode ---
    if command == Command::Migrate {
        client.migrate().await?;
        tracing::info!("database migration complete");
        return Ok(());
    }

    run(&cfg, client, command).await
}

async fn run(cfg: &AppConfig, client: Arc<LocalObjectClient>, command: Command) -> Result<()> {
    let bucket = cfg.bucket()?;

    if command == Command::MakeBucket {
        let created = client.create_bucket(bucket, &cfg.region).await?;
        println!("created bucket {} in {}", created.name, created.region);
        return Ok(());
    }

    let adapter = FilesystemAdapter::new(client as Arc<dyn ObjectClient>, bucket, &cfg.prefix)?;
    let config = WriteConfig::new();

    match command {
        Command::Migrate | Command::MakeBucket => {}
        Command::Ls { path, recursive } => {
            let mut entries = adapter.list_contents(path.as_deref().unwrap_or(""), recursive);
            while let Some(entry) = entries.try_next().await? {
                match entry {
                    StorageAttributes::File(file) => println!(
                        "{:>12}  {}",
                        file.file_size.map(|s| s.to_string()).unwrap_or_else(|| "-".into()),
                        file.path
                    ),
                    StorageAttributes::Directory(dir) => println!("{:>12}  {}/", "DIR", dir.path),
                }
            }
        }
        Command::Cat { path } => {
            let body = adapter.read(&path).await?;
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&body).await?;
            stdout.flush().await?;
        }
        Command::Put {
            local,
            path,
            content_type,
            metadata,
        } => {
            let file = tokio::fs::File::open(&local)
                .await
                .with_context(|| format!("opening {}", local.display()))?;
            let mut config = WriteConfig::new();
            if let Some(content_type) = content_type {
                config = config.with("ContentType", content_type);
            }
            if !metadata.is_empty() {
                let map: Map<String, Value> = metadata
                    .into_iter()
                    .map(|(key, value)| (key, Value::String(value)))
                    .collect();
                config = config.with("metadata", map);
            }
            adapter
                .write_stream(&path, ReaderStream::new(file), &config)
                .await?;
            tracing::info!(local = %local.display(), path = %path, "uploaded file");
        }
        Command::Rm { path } => adapter.delete(&path).await?,
        Command::Rmdir { path } => adapter.delete_directory(&path).await?,
        Command::Mkdir { path } => adapter.create_directory(&path, &config).await?,
        Command::Cp {
            source,
            destination,
        } => adapter.copy_file(&source, &destination, &config).await?,
        Command::Mv {
            source,
            destination,
        } => adapter.move_file(&source, &destination, &config).await?,
        Command::Stat { path } => {
            let size = adapter.file_size(&path).await?;
            let mime = adapter.mime_type(&path).await?;
            let modified = adapter.last_modified(&path).await?;
            let visibility = adapter.visibility(&path).await;
            println!("path:          {}", path);
            println!(
                "size:          {}",
                size.file_size.map(|s| s.to_string()).unwrap_or_else(|| "-".into())
            );
            println!("mime type:     {}", mime.mime_type.as_deref().unwrap_or("-"));
            println!(
                "last modified: {}",
                modified
                    .last_modified
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "-".into())
            );
            if let Some(visibility) = visibility.visibility {
                println!("visibility:    {}", visibility);
            }
        }
        Command::Exists { path } => {
            let kind = if adapter.file_exists(&path).await {
                "file"
            } else if adapter.directory_exists(&path).await {
                "directory"
            } else {
                "missing"
            };
            println!("{}", kind);
        }
        Command::Url { path } => {
            let url = cfg.public_url_generator()?.public_url(&path, &config)?;
            println!("{}", url);
        }
    }

    Ok(())
}
