use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use object_fs::{AddressingStyle, PublicUrlGenerator};
use std::{env, path::PathBuf};

const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_STORAGE_DIR: &str = "./data/objects";
const DEFAULT_DATABASE_URL: &str = "sqlite://./data/meta/object_fs.db";

/// Centralized application configuration.
/// Combines environment variables and CLI arguments; CLI wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bucket: Option<String>,
    pub region: String,
    pub prefix: String,
    pub endpoint: Option<String>,
    pub cdn_url: Option<String>,
    pub storage_dir: String,
    pub database_url: String,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Filesystem operations over an S3-style object store")]
pub struct Args {
    /// Bucket to operate on (overrides AWS_S3_BUCKET)
    #[arg(long, global = true)]
    pub bucket: Option<String>,

    /// Bucket region (overrides AWS_S3_REGION)
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// Key prefix all paths live under (overrides AWS_S3_PREFIX)
    #[arg(long, global = true)]
    pub prefix: Option<String>,

    /// Custom endpoint host used for public URLs (overrides AWS_S3_ENDPOINT)
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// CDN host used for public URLs (overrides AWS_S3_CDN_URL)
    #[arg(long, global = true)]
    pub cdn_url: Option<String>,

    /// Directory where object payloads are stored (overrides OBJECT_FS_STORAGE_DIR)
    #[arg(long, global = true)]
    pub storage_dir: Option<String>,

    /// Database URL (overrides OBJECT_FS_DATABASE_URL)
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create the metadata tables and exit
    Migrate,
    /// Create the configured bucket
    MakeBucket,
    /// List a directory
    Ls {
        path: Option<String>,
        #[arg(long, short)]
        recursive: bool,
    },
    /// Print a file to stdout
    Cat { path: String },
    /// Upload a local file
    Put {
        local: PathBuf,
        path: String,
        #[arg(long)]
        content_type: Option<String>,
        /// User metadata as KEY=VALUE, repeatable
        #[arg(long = "meta", value_parser = parse_key_value)]
        metadata: Vec<(String, String)>,
    },
    /// Delete a file
    Rm { path: String },
    /// Delete a directory and everything below it
    Rmdir { path: String },
    /// Create a directory marker
    Mkdir { path: String },
    /// Copy a file
    Cp { source: String, destination: String },
    /// Move a file
    Mv { source: String, destination: String },
    /// Show size, type and modification time of a file
    Stat { path: String },
    /// Report whether a path is a file, a directory, or missing
    Exists { path: String },
    /// Print the public URL of a path
    Url { path: String },
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and the command to run.
    pub fn from_env_and_args() -> Result<(Self, Command)> {
        let args = Args::parse();
        let cfg = Self::resolve(&args, |name| env::var(name).ok())?;
        Ok((cfg, args.command))
    }

    /// Merge `args` over the variables returned by `lookup`, then defaults.
    /// Empty variables count as unset.
    pub fn resolve(args: &Args, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let region = args
            .region
            .clone()
            .or_else(|| var("AWS_S3_REGION"))
            .unwrap_or_else(|| DEFAULT_REGION.into());
        if region.trim().is_empty() {
            bail!("region cannot be empty");
        }

        Ok(Self {
            bucket: args.bucket.clone().or_else(|| var("AWS_S3_BUCKET")),
            region,
            prefix: args
                .prefix
                .clone()
                .or_else(|| var("AWS_S3_PREFIX"))
                .unwrap_or_default(),
            endpoint: args.endpoint.clone().or_else(|| var("AWS_S3_ENDPOINT")),
            cdn_url: args.cdn_url.clone().or_else(|| var("AWS_S3_CDN_URL")),
            storage_dir: args
                .storage_dir
                .clone()
                .or_else(|| var("OBJECT_FS_STORAGE_DIR"))
                .unwrap_or_else(|| DEFAULT_STORAGE_DIR.into()),
            database_url: args
                .database_url
                .clone()
                .or_else(|| var("OBJECT_FS_DATABASE_URL"))
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.into()),
        })
    }

    /// The configured bucket; every command except `migrate` needs one.
    pub fn bucket(&self) -> Result<&str> {
        self.bucket
            .as_deref()
            .filter(|bucket| !bucket.is_empty())
            .context("no bucket configured (set --bucket or AWS_S3_BUCKET)")
    }

    /// CDN host first, then a custom endpoint, then the regional S3 host.
    pub fn public_url_generator(&self) -> Result<PublicUrlGenerator> {
        let bucket = self.bucket()?;
        let generator = match (&self.cdn_url, &self.endpoint) {
            (Some(cdn), _) => {
                PublicUrlGenerator::new(cdn, bucket, &self.prefix, AddressingStyle::DirectDomain)
            }
            (None, Some(endpoint)) => PublicUrlGenerator::new(
                endpoint,
                bucket,
                &self.prefix,
                AddressingStyle::BucketSubdomain,
            ),
            (None, None) => PublicUrlGenerator::new(
                &format!("s3.{}.amazonaws.com", self.region),
                bucket,
                &self.prefix,
                AddressingStyle::BucketSubdomain,
            ),
        };
        Ok(generator)
    }
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got `{raw}`")),
    }
}
