//! fedelect-explore: exhaustively check the leader election for one stalled slot.

use std::path::PathBuf;

use clap::Parser;
use fedelect_explorer::{ExplorerConfig, Scenario};
use fedelect_utils::{init_logging, LogFormat};

#[derive(Parser)]
#[command(
    name = "fedelect-explore",
    about = "Explore every delivery order of a federated leader election"
)]
struct Cli {
    /// Number of federated servers.
    #[arg(short = 'f', long, env = "FEDELECT_FEDS")]
    feds: Option<u32>,

    /// Number of audit servers; each one volunteers.
    #[arg(short = 'a', long, env = "FEDELECT_AUDITS")]
    audits: Option<u32>,

    /// Maximum search depth.
    #[arg(short = 'r', long, env = "FEDELECT_LIMIT")]
    limit: Option<usize>,

    /// Split the search across all CPU cores.
    #[arg(long, env = "FEDELECT_PARALLEL")]
    parallel: bool,

    /// Only permute the opening messages; drop everything participants emit.
    #[arg(long)]
    no_fan_out: bool,

    /// Search every state, even ones equivalent to a state already searched.
    #[arg(long)]
    no_mirrors: bool,

    /// Sign every message with per-participant Ed25519 keys.
    #[arg(long)]
    signed: bool,

    /// Log progress every this many dives (0 disables).
    #[arg(long, env = "FEDELECT_PROGRESS")]
    progress_interval: Option<u64>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "FEDELECT_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "FEDELECT_LOG_FORMAT")]
    log_format: Option<String>,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn resolve(self) -> anyhow::Result<ExplorerConfig> {
        let base = match &self.config {
            Some(path) => ExplorerConfig::from_toml_file(path)?,
            None => ExplorerConfig::default(),
        };
        Ok(ExplorerConfig {
            federated: self.feds.unwrap_or(base.federated),
            audits: self.audits.unwrap_or(base.audits),
            limit: self.limit.unwrap_or(base.limit),
            fan_out: base.fan_out && !self.no_fan_out,
            mirrors: base.mirrors && !self.no_mirrors,
            parallel: base.parallel || self.parallel,
            signed: base.signed || self.signed,
            progress_interval: self.progress_interval.unwrap_or(base.progress_interval),
            log_level: self.log_level.unwrap_or(base.log_level),
            log_format: self.log_format.unwrap_or(base.log_format),
            ..base
        })
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone();
    let config = cli.resolve()?;

    let format = LogFormat::parse(&config.log_format)
        .ok_or_else(|| anyhow::anyhow!("unknown log format {:?}", config.log_format))?;
    init_logging(format, &config.log_level);

    if let Some(path) = config_path {
        tracing::info!("Loaded config from {}", path.display());
    }
    tracing::info!(
        federated = config.federated,
        audits = config.audits,
        limit = config.limit,
        fan_out = config.fan_out,
        mirrors = config.mirrors,
        parallel = config.parallel,
        signed = config.signed,
        location = %config.location(),
        "starting exploration"
    );

    let scenario = Scenario::from_config(&config)?;
    let pending = scenario.initial_pending()?;
    for msg in &pending {
        tracing::debug!(%msg, "opening message");
    }

    let mut explorer = scenario.explorer(&config)?;
    let report = if config.parallel {
        explorer.explore_parallel(pending)?
    } else {
        explorer.explore(pending)?
    };

    println!("{report}");
    for (winner, solutions) in &report.winners {
        let priority = scenario
            .auth_set
            .volunteer_priority(winner)
            .map_or_else(|| "?".to_string(), |p| p.to_string());
        println!("  winner {winner} (priority {priority}): {solutions} solutions");
    }

    if !report.is_safe() {
        anyhow::bail!(
            "safety violated: {} collisions, first at depth {}",
            report.collisions,
            report.first_collision.as_ref().map_or(0, |c| c.depth)
        );
    }
    Ok(())
}
