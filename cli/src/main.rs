//! twinctl - command-line host for the twin data-access layer.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;
use twin_core::config::{DEFAULT_MONITOR_INTERVAL, DEFAULT_REQUEST_TIMEOUT};
use twin_core::{
    AttributesPatch, ClientConfig, ConnectivityMonitor, ConnectivityState, CreateTwin, TwinService, TwinStatus,
    TwinType, UpdateTwin,
};

#[derive(Parser, Debug)]
#[command(name = "twinctl")]
#[command(version, about = "Manage digital twin records", long_about = None)]
struct Cli {
    /// Backend base URL
    #[arg(long, env = "TWIN_API_URL", default_value = twin_core::config::DEFAULT_BASE_URL)]
    api_url: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT.as_secs())]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List all twins
    #[command(alias = "ls")]
    List,

    /// Show a single twin
    Get { id: String },

    /// Create a twin
    Create {
        #[arg(long)]
        name: String,
        #[arg(long = "type")]
        twin_type: TwinType,
        #[arg(long, default_value = "active")]
        status: TwinStatus,
        #[arg(long)]
        description: Option<String>,
        /// Repeatable
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Features as a JSON object
        #[arg(long)]
        features: Option<String>,
    },

    /// Change attributes of a twin
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        status: Option<TwinStatus>,
        #[arg(long)]
        description: Option<String>,
        /// Replaces the tag list
        #[arg(long = "tag")]
        tags: Option<Vec<String>>,
    },

    /// Delete a twin
    #[command(alias = "rm")]
    Delete { id: String },

    /// Counts by status
    Stats,

    /// Check whether the backend is reachable
    Ping,

    /// Probe the backend on an interval and report connectivity changes
    Watch {
        #[arg(long, default_value_t = DEFAULT_MONITOR_INTERVAL.as_secs())]
        interval_secs: u64,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ClientConfig {
        request_timeout: Duration::from_secs(cli.timeout_secs),
        ..ClientConfig::with_base_url(cli.api_url)
    };
    tracing::debug!(api_url = %config.base_url, "using backend");
    let twins = TwinService::new(&config).context("failed to build HTTP client")?;

    match cli.command {
        Commands::List => print_json(&twins.list_twins().await?),
        Commands::Get { id } => print_json(&twins.get_twin(&id).await?),
        Commands::Create {
            name,
            twin_type,
            status,
            description,
            tags,
            features,
        } => {
            let features = features.map(|raw| parse_features(&raw)).transpose()?;
            let input = CreateTwin {
                description,
                tags: (!tags.is_empty()).then_some(tags),
                features,
                ..CreateTwin::new(name, twin_type, status)
            };
            print_json(&twins.create_twin(input).await?)
        }
        Commands::Update {
            id,
            name,
            status,
            description,
            tags,
        } => {
            let update = UpdateTwin {
                attributes: AttributesPatch {
                    name,
                    status,
                    description,
                    tags,
                    ..Default::default()
                },
                features: None,
            };
            print_json(&twins.update_twin(&id, &update).await?)
        }
        Commands::Delete { id } => {
            twins.delete_twin(&id).await?;
            println!("deleted {id}");
            Ok(())
        }
        Commands::Stats => print_json(&twins.dashboard_stats().await),
        Commands::Ping => {
            let online = twins.test_connection().await;
            println!("{}", if online { "online" } else { "offline" });
            anyhow::ensure!(online, "backend unreachable at {}", config.base_url);
            Ok(())
        }
        Commands::Watch { interval_secs } => watch(twins, Duration::from_secs(interval_secs)).await,
    }
}

async fn watch(twins: TwinService, interval: Duration) -> Result<()> {
    let state = ConnectivityState::new();
    let mut rx = state.subscribe();
    let handle = ConnectivityMonitor::new(interval, state).start(Arc::new(twins));
    println!("{}", if *rx.borrow_and_update() { "online" } else { "offline" });

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let online = *rx.borrow_and_update();
                println!("{}", if online { "online" } else { "offline" });
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    handle.stop().await;
    Ok(())
}

fn parse_features(raw: &str) -> Result<twin_core::Features> {
    match serde_json::from_str::<Value>(raw).context("--features is not valid JSON")? {
        Value::Object(map) => Ok(map),
        _ => anyhow::bail!("--features must be a JSON object"),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_parses_type_status_and_tags() {
        let cli = Cli::try_parse_from([
            "twinctl",
            "--api-url",
            "http://twins:8080",
            "create",
            "--name",
            "Boiler temp",
            "--type",
            "sensor",
            "--status",
            "maintenance",
            "--tag",
            "a",
            "--tag",
            "b",
        ])
        .unwrap();
        assert_eq!(cli.api_url, "http://twins:8080");
        match cli.command {
            Commands::Create {
                twin_type,
                status,
                tags,
                ..
            } => {
                assert_eq!(twin_type, TwinType::Sensor);
                assert_eq!(status, TwinStatus::Maintenance);
                assert_eq!(tags, vec!["a", "b"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn defaults_follow_library_config() {
        let cli = Cli::try_parse_from(["twinctl", "watch"]).unwrap();
        assert_eq!(cli.timeout_secs, DEFAULT_REQUEST_TIMEOUT.as_secs());
        match cli.command {
            Commands::Watch { interval_secs } => assert_eq!(interval_secs, DEFAULT_MONITOR_INTERVAL.as_secs()),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn unknown_twin_type_is_rejected() {
        let result = Cli::try_parse_from(["twinctl", "create", "--name", "x", "--type", "toaster"]);
        assert!(result.is_err());
    }

    #[test]
    fn update_without_tags_leaves_them_unset() {
        let cli = Cli::try_parse_from(["twinctl", "update", "Sensor:1", "--status", "error"]).unwrap();
        match cli.command {
            Commands::Update { id, status, tags, .. } => {
                assert_eq!(id, "Sensor:1");
                assert_eq!(status, Some(TwinStatus::Error));
                assert!(tags.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn features_must_be_an_object() {
        assert_eq!(parse_features(r#"{"temp":{"value":1}}"#).unwrap().len(), 1);
        assert!(parse_features("[1,2]").is_err());
        assert!(parse_features("nope").is_err());
    }
}
