use clap::{Parser, Subcommand};

use super::constants::{
    ENV_CACHE_ENABLED, ENV_CACHE_MAX_BYTES, ENV_CACHE_MAX_SPANS, ENV_CACHE_REQUEST_TIMEOUT_MS,
    ENV_CACHE_TTL_SECS, ENV_HOST, ENV_PORT,
};

#[derive(Parser)]
#[command(name = "hotspan")]
#[command(version, about = "Realtime span cache service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Server host address
    #[arg(long, short = 'H', global = true, env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', global = true, env = ENV_PORT)]
    pub port: Option<u16>,

    /// Enable or disable the span cache subsystem
    #[arg(long, global = true, env = ENV_CACHE_ENABLED)]
    pub cache_enabled: Option<bool>,

    /// Cache record TTL in seconds
    #[arg(long, global = true, env = ENV_CACHE_TTL_SECS)]
    pub cache_ttl_secs: Option<u64>,

    /// Maximum cached spans per environment shard
    #[arg(long, global = true, env = ENV_CACHE_MAX_SPANS)]
    pub cache_max_spans: Option<usize>,

    /// Maximum cached bytes per environment shard
    #[arg(long, global = true, env = ENV_CACHE_MAX_BYTES)]
    pub cache_max_bytes: Option<u64>,

    /// Shard request deadline in milliseconds
    #[arg(long, global = true, env = ENV_CACHE_REQUEST_TIMEOUT_MS)]
    pub cache_request_timeout_ms: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the server (default when no subcommand is given)
    Start,
}

pub fn parse() -> Cli {
    Cli::parse()
}
