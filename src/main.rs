//! `textfetch` CLI - fetch URLs as decoded text from the command line

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing_subscriber::EnvFilter;

use textfetch::{Config, FetchClient, RetrievalRequest, Retrieved};

#[derive(Parser)]
#[command(name = "textfetch")]
#[command(about = "Fetch a URL as text: browser headers, gzip/deflate, charset detection")]
#[command(version)]
struct Cli {
    /// Verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: ~/.config/textfetch/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a URL and print the decoded body
    Get {
        /// URL to fetch
        url: String,

        /// Decode with this charset instead of detecting it (`ignore` is the same as --raw)
        #[arg(short, long)]
        charset: Option<String>,

        /// Write the decompressed bytes without decoding
        #[arg(long, conflicts_with = "charset")]
        raw: bool,

        /// Don't send Accept-Encoding
        #[arg(long)]
        no_compression: bool,

        /// Extra request header, `Name: value` (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Request body; turns the request into a POST
        #[arg(short, long)]
        data: Option<String>,

        /// Replace \uXXXX escapes in the output
        #[arg(short, long)]
        unicodize: bool,
    },

    /// Resolve redirects and print the final URL
    Location {
        /// URL to resolve
        url: String,

        /// Also print the final response headers
        #[arg(short = 'H', long)]
        headers: bool,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the extension guessed from a URL path (no request is made)
    Info {
        /// URL to inspect
        url: String,
    },

    /// Replace \uXXXX escapes in TEXT
    Unicodize {
        /// Text containing escapes
        text: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    match cli.command {
        Commands::Get {
            url,
            charset,
            raw,
            no_compression,
            headers,
            data,
            unicodize,
        } => {
            let client = build_client(cli.config.as_deref())?;
            let mut request = RetrievalRequest::new(url);
            if no_compression {
                request = request.without_compression();
            }
            if !headers.is_empty() {
                let base = if no_compression {
                    client.header_profile().without_compression().clone()
                } else {
                    client.header_profile().full().clone()
                };
                request = request.headers(merge_headers(base, &headers)?);
            }
            if let Some(data) = data {
                request = request.body(data);
            }
            if let Some(charset) = charset {
                request = request.charset(charset);
            }
            if raw {
                request = request.ignore_charset();
            }
            cmd_get(&client, request, unicodize)?;
        }
        Commands::Location { url, headers, json } => {
            let client = build_client(cli.config.as_deref())?;
            cmd_location(&client, &url, headers, json)?;
        }
        Commands::Info { url } => {
            cmd_info(&url);
        }
        Commands::Unicodize { text } => {
            println!("{}", textfetch::unicodize(&text));
        }
    }

    Ok(())
}

fn build_client(config: Option<&std::path::Path>) -> Result<FetchClient> {
    let config = match config {
        Some(path) => {
            anyhow::ensure!(path.exists(), "config file {} not found", path.display());
            Config::load_from(path)?
        }
        None => Config::load()?,
    };
    config.build_client()
}

/// Apply `Name: value` arguments on top of `base`.
fn merge_headers(mut base: HeaderMap, args: &[String]) -> Result<HeaderMap> {
    for arg in args {
        let (name, value) = arg
            .split_once(':')
            .with_context(|| format!("header {arg:?} is not `Name: value`"))?;
        let name = HeaderName::from_bytes(name.trim().as_bytes())
            .with_context(|| format!("invalid header name in {arg:?}"))?;
        let value = HeaderValue::from_str(value.trim())
            .with_context(|| format!("invalid header value in {arg:?}"))?;
        base.insert(name, value);
    }
    Ok(base)
}

fn cmd_get(client: &FetchClient, request: RetrievalRequest, unicodize: bool) -> Result<()> {
    let url = request.url().to_string();
    let retrieved = client
        .retrieve(request)
        .with_context(|| format!("failed to fetch {url}"))?;

    let mut stdout = std::io::stdout().lock();
    match retrieved {
        Retrieved::Bytes(bytes) => stdout.write_all(&bytes)?,
        Retrieved::Text(decoded) => {
            tracing::debug!(
                charset = %decoded.charset,
                encoding = decoded.encoding,
                lossy = decoded.lossy,
                "Decoded body"
            );
            if unicodize {
                writeln!(stdout, "{}", textfetch::unicodize(&decoded.text))?;
            } else {
                writeln!(stdout, "{}", decoded.text)?;
            }
        }
    }
    Ok(())
}

fn cmd_location(client: &FetchClient, url: &str, show_headers: bool, json: bool) -> Result<()> {
    let (location, headers) = client
        .location_and_header(url, None)
        .with_context(|| format!("failed to resolve {url}"))?;

    if json {
        let headers: serde_json::Map<String, serde_json::Value> = headers
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    serde_json::Value::from(value.to_str().unwrap_or("<binary>")),
                )
            })
            .collect();
        let mut output = serde_json::json!({ "url": location });
        if show_headers {
            output["headers"] = serde_json::Value::Object(headers);
        }
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{location}");
    if show_headers {
        for (name, value) in &headers {
            println!("{}: {}", name, value.to_str().unwrap_or("<binary>"));
        }
    }
    Ok(())
}

#[allow(deprecated)]
fn cmd_info(url: &str) {
    let info = textfetch::url_info(url);
    println!("{}", info.ext);
}
