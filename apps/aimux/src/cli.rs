use std::path::PathBuf;

use aimux_common::GlobalConfigPatch;
use clap::{Args, Parser, Subcommand};

use crate::data_dir::resolve_data_dir;

#[derive(Debug, Parser)]
#[command(
    name = "aimux",
    version,
    about = "Multi-provider AI request orchestrator with failover and cooldowns"
)]
pub(crate) struct Cli {
    /// Directory holding the usage state file.
    #[arg(long)]
    pub(crate) data_dir: Option<String>,

    /// Usage state file (default: <data-dir>/provider_usage.json).
    #[arg(long, env = "AIMUX_STATE_FILE")]
    pub(crate) state_file: Option<PathBuf>,

    /// Optional JSON config file; CLI and ENV values override it.
    #[arg(long, env = "AIMUX_CONFIG")]
    pub(crate) config: Option<PathBuf>,

    /// Per-provider attempt timeout.
    #[arg(long, env = "AIMUX_TIMEOUT_SECS")]
    pub(crate) timeout_secs: Option<u64>,

    /// Overall budget for one failover scan.
    #[arg(long, env = "AIMUX_DEADLINE_SECS")]
    pub(crate) deadline_secs: Option<u64>,

    /// Outbound proxy for upstream requests.
    #[arg(long, env = "AIMUX_PROXY")]
    pub(crate) proxy: Option<String>,

    /// Print operational events as JSON lines on stderr.
    #[arg(long)]
    pub(crate) events: bool,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Send one prompt through the failover chain.
    Generate(GenerateArgs),
    /// Show every configured slot and its cooldown state.
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Back up the usage state and clear it.
    Reset,
}

#[derive(Debug, Args)]
pub(crate) struct GenerateArgs {
    /// Prompt text; read from stdin when omitted.
    pub(crate) prompt: Vec<String>,

    #[arg(long)]
    pub(crate) system: Option<String>,

    #[arg(long)]
    pub(crate) max_tokens: Option<u32>,

    #[arg(long)]
    pub(crate) temperature: Option<f32>,

    /// Print the full result (including the attempt trace) as JSON.
    #[arg(long)]
    pub(crate) json: bool,
}

impl Cli {
    /// CLI/ENV layer; overlaid on the config file.
    pub(crate) fn config_patch(&self) -> GlobalConfigPatch {
        GlobalConfigPatch {
            data_dir: resolve_data_dir(self.data_dir.as_deref()),
            state_file: self.state_file.clone(),
            request_timeout_secs: self.timeout_secs,
            deadline_secs: self.deadline_secs,
            proxy: self.proxy.clone(),
            cooldown: None,
        }
    }
}
