//! SQLite Cache - command-line front end
//!
//! Opens a cache from environment/flag configuration, runs one operation and
//! prints the result as JSON on stdout.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing::debug;

use sqlite_cache::cache::current_timestamp_ms;
use sqlite_cache::{logging, Cache, CacheConfig, StorePath};

/// Persistent key/value cache with TTL expiry and capacity eviction.
#[derive(Debug, Parser)]
#[command(name = "sqlite-cache", version, about)]
struct Cli {
    /// Database file, or `:memory:` (default: $CACHE_PATH or `:memory:`)
    #[arg(long)]
    path: Option<String>,

    /// Time-to-live for writes, in milliseconds (default: $CACHE_TTL_MS or 60000)
    #[arg(long)]
    ttl: Option<u64>,

    /// Maximum number of entries (default: $CACHE_MAX or 100)
    #[arg(long)]
    max: Option<usize>,

    /// JSON file holding the shape descriptor values must match
    #[arg(long)]
    shape: Option<PathBuf>,

    /// Run each write inside a single transaction
    #[arg(long)]
    atomic: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Store a JSON object under KEY
    Set { key: String, value: String },
    /// Print the value stored under KEY; exits with 1 on a miss
    Get { key: String },
    /// Print whether KEY holds a live entry
    Has { key: String },
    /// Remove KEY
    Delete { key: String },
    /// Remove every entry
    Clear,
    /// Print the number of live entries
    Size,
    /// Print live keys, newest first
    Keys,
    /// Print live entries with their timestamps, newest first
    Entries,
}

fn build_config(cli: &Cli) -> Result<CacheConfig> {
    let mut config = CacheConfig::from_env();
    if let Some(path) = &cli.path {
        config.path = StorePath::parse(path)?;
    }
    if let Some(ttl) = cli.ttl {
        config.ttl = Duration::from_millis(ttl);
    }
    if let Some(max) = cli.max {
        config.max_entries = max;
    }
    if let Some(shape_path) = &cli.shape {
        let raw = fs::read_to_string(shape_path)
            .with_context(|| format!("Failed to read shape file {}", shape_path.display()))?;
        config.shape = serde_json::from_str(&raw)
            .with_context(|| format!("Shape file {} is not JSON", shape_path.display()))?;
    }
    if cli.atomic {
        config.atomic_writes = true;
    }
    Ok(config)
}

fn timestamp(ms: i64) -> Value {
    match DateTime::<Utc>::from_timestamp_millis(ms) {
        Some(at) => json!(at.to_rfc3339()),
        None => json!(ms),
    }
}

fn run(cache: &mut Cache, command: Command) -> Result<(Value, ExitCode)> {
    let output = match command {
        Command::Set { key, value } => {
            let document: Value =
                serde_json::from_str(&value).context("VALUE must be a JSON document")?;
            cache.set(&key, &document)?;
            json!({ "stored": key })
        }
        Command::Get { key } => match cache.get(&key)? {
            Some(value) => value,
            None => return Ok((Value::Null, ExitCode::from(1))),
        },
        Command::Has { key } => json!(cache.has(&key)?),
        Command::Delete { key } => json!(cache.delete(&key)?),
        Command::Clear => {
            cache.clear()?;
            json!({ "cleared": true })
        }
        Command::Size => json!(cache.size()?),
        Command::Keys => json!(cache.keys()?.collect::<Vec<_>>()),
        Command::Entries => {
            let now = current_timestamp_ms();
            Value::Array(
                cache
                    .snapshot()?
                    .into_iter()
                    .map(|entry| {
                        json!({
                            "ttl_remaining_ms": entry.ttl_remaining_ms(now),
                            "created_at": timestamp(entry.created_at),
                            "expires_at": timestamp(entry.expires_at),
                            "key": entry.key,
                            "value": entry.value,
                        })
                    })
                    .collect(),
            )
        }
    };
    Ok((output, ExitCode::SUCCESS))
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = build_config(&cli)?;
    logging::init(&config.logging);

    let mut cache = Cache::open(config).context("Failed to open cache")?;
    let result = run(&mut cache, cli.command);
    debug!(stats = ?cache.stats(), "Command finished");
    cache.close();

    let (output, code) = result?;
    if !output.is_null() {
        println!("{}", serde_json::to_string_pretty(&output)?);
    }
    Ok(code)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("sqlite-cache").chain(args.iter().copied())).unwrap()
    }

    fn memory_cache() -> Cache {
        Cache::open(CacheConfig::in_memory()).unwrap()
    }

    #[test]
    fn test_flags_override_environment_defaults() {
        let cli = parse(&[
            "--path", ":memory:", "--ttl", "1500", "--max", "3", "--atomic", "size",
        ]);
        let config = build_config(&cli).unwrap();

        assert_eq!(config.path, StorePath::Memory);
        assert_eq!(config.ttl, Duration::from_millis(1500));
        assert_eq!(config.max_entries, 3);
        assert!(config.atomic_writes);
    }

    #[test]
    fn test_shape_flag_reads_descriptor_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"type":"object","required":["id"],"properties":{{"id":{{}}}}}}"#)
            .unwrap();
        let cli = parse(&["--shape", file.path().to_str().unwrap(), "size"]);

        let config = build_config(&cli).unwrap();
        assert_eq!(config.shape["required"], json!(["id"]));
    }

    #[test]
    fn test_unreadable_shape_file_is_an_error() {
        let cli = parse(&["--shape", "/nonexistent/shape.json", "size"]);
        let err = build_config(&cli).unwrap_err();
        assert!(err.to_string().contains("Failed to read shape file"));
    }

    #[test]
    fn test_get_miss_exits_with_one() {
        let mut cache = memory_cache();
        let (output, code) = run(&mut cache, Command::Get { key: "absent".into() }).unwrap();

        assert_eq!(output, Value::Null);
        assert_eq!(code, ExitCode::from(1));
    }

    #[test]
    fn test_set_then_get_and_list() {
        let mut cache = memory_cache();
        let set = Command::Set {
            key: "user1".into(),
            value: r#"{"name":"ada"}"#.into(),
        };
        let (output, code) = run(&mut cache, set).unwrap();
        assert_eq!(output, json!({ "stored": "user1" }));
        assert_eq!(code, ExitCode::SUCCESS);

        let (output, code) = run(&mut cache, Command::Get { key: "user1".into() }).unwrap();
        assert_eq!(output, json!({ "name": "ada" }));
        assert_eq!(code, ExitCode::SUCCESS);

        let (keys, _) = run(&mut cache, Command::Keys).unwrap();
        assert_eq!(keys, json!(["user1"]));

        let (entries, _) = run(&mut cache, Command::Entries).unwrap();
        assert_eq!(entries[0]["key"], json!("user1"));
        assert!(entries[0]["ttl_remaining_ms"].as_u64().unwrap() > 0);
        assert!(entries[0]["created_at"].is_string());
    }

    #[test]
    fn test_set_rejects_invalid_json() {
        let mut cache = memory_cache();
        let set = Command::Set {
            key: "k".into(),
            value: "{not json".into(),
        };
        assert!(run(&mut cache, set).is_err());
        assert_eq!(cache.size().unwrap(), 0);
    }
}
