//! Quill sync simulator.
//!
//! Runs several replicas of one document against an in-memory bus that
//! delivers messages in random order (FIFO per sender) and sometimes twice,
//! then checks that every replica ends with the same text.

mod sim;

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Parser;
use quill_sync::SyncConfig;
use tracing::info;

use crate::sim::{Params, Simulation};

/// Simulator command line arguments.
#[derive(Parser, Debug)]
#[command(name = "quill-sim")]
#[command(about = "Randomized convergence check for Quill document sync")]
struct Args {
	/// Number of replicas, the first being the master
	#[arg(short, long, default_value_t = 2)]
	replicas: usize,

	/// Number of random steps before settling
	#[arg(short, long, default_value_t = 1_000)]
	steps: usize,

	/// RNG seed; random if omitted
	#[arg(long)]
	seed: Option<u64>,

	/// Probability that a step is a local edit
	#[arg(long, default_value_t = 0.4)]
	edit_rate: f64,

	/// Probability that a delivered message is delivered twice
	#[arg(long, default_value_t = 0.05)]
	duplicate_rate: f64,

	/// Initial document text
	#[arg(long, default_value = "<html></html>")]
	initial: String,

	/// Sync configuration file (TOML)
	#[arg(short, long, value_name = "PATH")]
	config: Option<PathBuf>,

	/// Verbose logging
	#[arg(short, long)]
	verbose: bool,
}

fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	setup_tracing(args.verbose);

	if args.replicas == 0 {
		bail!("at least one replica is required");
	}
	for (name, rate) in [("edit-rate", args.edit_rate), ("duplicate-rate", args.duplicate_rate)] {
		if !(0.0..=1.0).contains(&rate) {
			bail!("{name} must be between 0 and 1, got {rate}");
		}
	}

	let config = match &args.config {
		Some(path) => SyncConfig::load(path)
			.with_context(|| format!("loading sync config from {}", path.display()))?,
		None => SyncConfig::default(),
	};
	let seed = args.seed.unwrap_or_else(rand::random);

	info!(replicas = args.replicas, steps = args.steps, seed, "starting simulation");

	let report = Simulation::new(Params {
		replicas: args.replicas,
		steps: args.steps,
		seed,
		edit_rate: args.edit_rate,
		duplicate_rate: args.duplicate_rate,
		initial: args.initial,
		config,
	})?
	.run();

	println!("seed={seed}");
	println!("{report}");

	if !report.stalled.is_empty() {
		bail!("{} replica(s) stalled", report.stalled.len());
	}
	if !report.converged() {
		bail!("replicas diverged (seed {seed})");
	}
	Ok(())
}

fn setup_tracing(verbose: bool) {
	use std::fs::OpenOptions;

	use tracing_subscriber::EnvFilter;
	use tracing_subscriber::prelude::*;

	let filter = || {
		EnvFilter::try_from_default_env().unwrap_or_else(|_| {
			if verbose {
				EnvFilter::new("quill_sync=trace,quill_sim=debug,info")
			} else {
				EnvFilter::new("quill_sync=warn,quill_sim=info,warn")
			}
		})
	};

	if let Some(log_dir) = std::env::var("QUILL_LOG_DIR").ok().map(PathBuf::from)
		&& std::fs::create_dir_all(&log_dir).is_ok()
	{
		let log_path = log_dir.join(format!("quill-sim.{}.log", std::process::id()));

		if let Ok(file) = OpenOptions::new().create(true).append(true).open(&log_path) {
			let file_layer = tracing_subscriber::fmt::layer()
				.with_writer(file)
				.with_ansi(false)
				.with_target(true);

			tracing_subscriber::registry()
				.with(filter())
				.with(file_layer)
				.init();

			tracing::info!(path = ?log_path, "simulator tracing initialized");
			return;
		}
	}

	tracing_subscriber::fmt()
		.with_env_filter(filter())
		.with_writer(std::io::stderr)
		.init();
}
