//! CLI schema for the palaver binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use palaver_settings::Params;
use palaver_settings::params::{ParamsError, parse_scope};

/// A `scope=id[,id...]` argument, e.g. `usergroup_ids=1,3`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeArg {
	pub scope: String,
	pub ids: Vec<String>,
}

impl ScopeArg {
	pub fn parse(input: &str) -> Result<Self, ParamsError> {
		let (scope, ids) = parse_scope(input)?;
		Ok(Self { scope, ids })
	}
}

/// Folds repeated `--scope` arguments into one params value.
///
/// Repeating a scope appends to its ids.
pub fn params_from(scopes: &[ScopeArg]) -> Params {
	let mut params = Params::new();
	for arg in scopes {
		params.extend(arg.scope.as_str(), arg.ids.iter().cloned());
	}
	params
}

#[derive(Parser, Debug)]
#[command(name = "palaver")]
#[command(about = "Resolve settings across layered stores")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
	/// Settings file declaring stores and seeded values
	#[arg(short, long, value_name = "PATH")]
	pub config: PathBuf,

	/// Verbose logging
	#[arg(short, long)]
	pub verbose: bool,

	#[command(subcommand)]
	pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
	/// Resolve one or more keys for a context
	Get {
		/// Keys to resolve
		#[arg(required = true)]
		keys: Vec<String>,

		/// Context scope ids, as SCOPE=ID[,ID...]; repeatable
		#[arg(short, long = "scope", value_name = "SCOPE=IDS", value_parser = ScopeArg::parse)]
		scopes: Vec<ScopeArg>,

		/// Ask stores to bypass their caches
		#[arg(long)]
		skip_cache: bool,

		/// Report whether each value was forced
		#[arg(long)]
		detailed: bool,
	},
	/// List configured stores with their scope and keys
	Stores,
	/// Validate the config and report what it declares
	Check,
}
