//! s3post - sign and send browser-style POST uploads.
//!
//! # Usage
//!
//! ```text
//! S3POST_BUCKET=my-s3-bucket ACCESS_KEY=... SECRET_KEY=... s3post upload ./image.jpg --content-type image/jpeg
//! s3post --bucket my-s3-bucket sign image.jpg --content-type image/jpeg
//! ```
//!
//! Configuration is read from the environment (see `s3post_http::config`) and
//! overridden by flags. `RUST_LOG` overrides `LOG_LEVEL` / `--log-level`.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use s3post_http::{FormFile, PutOptions, UploadConfig, Uploader};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, metadata_map};

/// Initialize the tracing subscriber.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    let config = cli.config.apply(UploadConfig::from_env());
    info!(
        bucket = config.bucket.as_deref().unwrap_or_default(),
        region = %config.region,
        path_style = config.path_style,
        "s3post starting"
    );
    let uploader = Uploader::new(config);

    match cli.command {
        Command::Sign {
            name,
            content_type,
            metadata,
        } => {
            let file = FormFile::new(name, content_type, Vec::new());
            let policy = uploader
                .prepare(&file, &metadata_map(metadata))
                .context("failed to sign upload policy")?;
            println!("{}", serde_json::to_string_pretty(&policy)?);
        }
        Command::Upload {
            path,
            content_type,
            metadata,
            headers,
            progress,
        } => {
            let file = FormFile::from_path(&path, content_type.as_deref()).await?;
            let mut options = PutOptions {
                metadata: metadata_map(metadata),
                headers,
                ..PutOptions::default()
            };
            if progress {
                options = options.on_progress(|p| {
                    info!(
                        loaded = p.loaded,
                        total = p.total,
                        percent = p.percent * 100.0,
                        "progress"
                    );
                });
            }

            let response = uploader
                .put_with(file, options)
                .await
                .with_context(|| format!("failed to upload {}", path.display()))?;
            let status = response.status;
            let body = response.body.clone();
            response
                .error_for_status()
                .with_context(|| format!("upload of {} was rejected", path.display()))?;

            let output = serde_json::json!({ "status": status, "body": body });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
