//! Command-line arguments.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use s3post_http::UploadConfig;

/// Command-line arguments; flags override the environment.
#[derive(Debug, Parser)]
#[command(author, version, about = "Signed browser-style POST uploads to S3")]
pub struct Cli {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Log level filter, overridden by `RUST_LOG`
    #[arg(long, global = true, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the signed form fields for one upload as JSON
    Sign {
        /// File name, appended to the key prefix to form the object key
        name: String,

        /// Content type of the object
        #[arg(long)]
        content_type: String,

        /// Metadata entry `name=value`, repeatable
        #[arg(long = "meta", value_parser = parse_metadata)]
        metadata: Vec<(String, String)>,
    },
    /// Upload a file and print the parsed response as JSON
    Upload {
        /// Path of the file to upload
        path: PathBuf,

        /// Content type of the object (default `application/octet-stream`)
        #[arg(long)]
        content_type: Option<String>,

        /// Metadata entry `name=value`, repeatable
        #[arg(long = "meta", value_parser = parse_metadata)]
        metadata: Vec<(String, String)>,

        /// Extra request header `name:value`, repeatable
        #[arg(long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,

        /// Log upload progress
        #[arg(long)]
        progress: bool,
    },
}

/// Upload settings; each overrides its environment variable.
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Target bucket (overrides S3POST_BUCKET)
    #[arg(long, global = true)]
    pub bucket: Option<String>,

    /// Bucket region (overrides S3POST_REGION)
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// Canned ACL (overrides S3POST_ACL)
    #[arg(long, global = true)]
    pub acl: Option<String>,

    /// Status requested on success (overrides S3POST_SUCCESS_ACTION_STATUS)
    #[arg(long, global = true)]
    pub success_action_status: Option<String>,

    /// Endpoint host or URL (overrides S3POST_AWS_URL)
    #[arg(long, global = true)]
    pub aws_url: Option<String>,

    /// Object key prefix (overrides S3POST_KEY_PREFIX)
    #[arg(long, global = true)]
    pub key_prefix: Option<String>,

    /// Clock skew compensation in milliseconds (overrides S3POST_TIME_DELTA_MS)
    #[arg(long, global = true, allow_hyphen_values = true)]
    pub time_delta_ms: Option<i64>,

    /// Use path-style URLs (overrides S3POST_PATH_STYLE)
    #[arg(long, global = true)]
    pub path_style: bool,
}

impl ConfigArgs {
    /// Apply the flags that were given on top of `config`.
    pub fn apply(self, mut config: UploadConfig) -> UploadConfig {
        if let Some(v) = self.bucket {
            config.bucket = Some(v);
        }
        if let Some(v) = self.region {
            config.region = v;
        }
        if let Some(v) = self.acl {
            config.acl = Some(v);
        }
        if let Some(v) = self.success_action_status {
            config.success_action_status = Some(v);
        }
        if let Some(v) = self.aws_url {
            config.aws_url = Some(v);
        }
        if let Some(v) = self.key_prefix {
            config.key_prefix = v;
        }
        if let Some(v) = self.time_delta_ms {
            config.time_delta_ms = v;
        }
        if self.path_style {
            config.path_style = true;
        }
        config
    }
}

/// Collect repeated `--meta` entries.
pub fn metadata_map(entries: Vec<(String, String)>) -> BTreeMap<String, String> {
    entries.into_iter().collect()
}

fn parse_metadata(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_owned(), value.to_owned())),
        _ => Err(format!("expected `name=value`, got `{raw}`")),
    }
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    match raw.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_owned(), value.trim().to_owned()))
        }
        _ => Err(format!("expected `name:value`, got `{raw}`")),
    }
}
