//! Palaver command line front end.
//!
//! Loads a settings file, builds the store registry from it and resolves keys
//! for a context given on the command line. Results are printed as JSON.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use palaver_settings::{GetOptions, Settings, SettingsConfig};
use serde::Serialize;

mod cli;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	setup_tracing(cli.verbose);

	let config: SettingsConfig = SettingsConfig::load(&cli.config)
		.with_context(|| format!("loading {}", cli.config.display()))?;
	let settings = Settings::from_config(&config).with_context(|| format!("building stores from {}", cli.config.display()))?;
	tracing::debug!(stores = settings.registry().len(), "palaver.ready");

	match cli.command {
		Command::Get {
			keys,
			scopes,
			skip_cache,
			detailed,
		} => {
			let params = cli::params_from(&scopes);
			let options = GetOptions {
				skip_cache,
				cache: None,
			};
			if detailed {
				print_json(&settings.get_many_detailed(keys.as_slice(), params, &options).await?)
			} else {
				print_json(&settings.get_many(keys.as_slice(), params, &options).await?)
			}
		}
		Command::Stores => {
			let stores: Vec<StoreSummary<'_>> = config
				.stores
				.iter()
				.map(|store| StoreSummary {
					name: &store.name,
					scope: store.scope.as_deref(),
					keys: store.keys.iter().map(|key| key.name.as_str()).collect(),
				})
				.collect();
			print_json(&stores)
		}
		Command::Check => {
			let report = CheckReport {
				stores: settings.registry().len(),
				keys: settings.registry().keys().count(),
				seeded_values: config.stores.iter().map(|store| store.values.len()).sum(),
				query_timeout_ms: config.resolver.query_timeout_ms,
			};
			print_json(&report)
		}
	}
}

#[derive(Serialize)]
struct StoreSummary<'a> {
	name: &'a str,
	#[serde(skip_serializing_if = "Option::is_none")]
	scope: Option<&'a str>,
	keys: Vec<&'a str>,
}

#[derive(Serialize)]
struct CheckReport {
	stores: usize,
	keys: usize,
	seeded_values: usize,
	#[serde(skip_serializing_if = "Option::is_none")]
	query_timeout_ms: Option<u64>,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
	let mut stdout = std::io::stdout().lock();
	serde_json::to_writer_pretty(&mut stdout, value)?;
	writeln!(stdout)?;
	Ok(())
}

fn setup_tracing(verbose: bool) {
	use std::fs::OpenOptions;

	use tracing_subscriber::prelude::*;

	// PALAVER_LOG_DIR sends logs to a per-process file instead of stderr.
	if let Some(log_dir) = std::env::var("PALAVER_LOG_DIR").ok().map(PathBuf::from)
		&& std::fs::create_dir_all(&log_dir).is_ok()
	{
		let log_path = log_dir.join(format!("palaver.{}.log", std::process::id()));

		if let Ok(file) = OpenOptions::new().create(true).append(true).open(&log_path) {
			let file_layer = tracing_subscriber::fmt::layer()
				.with_writer(std::sync::Mutex::new(file))
				.with_ansi(false)
				.with_target(true);

			tracing_subscriber::registry()
				.with(env_filter(verbose))
				.with(file_layer)
				.init();

			tracing::info!(path = ?log_path, "palaver.tracing.file");
			return;
		}
	}

	tracing_subscriber::fmt()
		.with_env_filter(env_filter(verbose))
		.with_writer(std::io::stderr)
		.init();
}

fn env_filter(verbose: bool) -> tracing_subscriber::EnvFilter {
	use tracing_subscriber::EnvFilter;

	EnvFilter::try_from_env("PALAVER_LOG")
		.or_else(|_| EnvFilter::try_from_default_env())
		.unwrap_or_else(|_| {
			if verbose {
				EnvFilter::new("palaver_settings=trace,palaver_worker=debug,info")
			} else {
				EnvFilter::new("warn")
			}
		})
}
