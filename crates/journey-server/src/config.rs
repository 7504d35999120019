use std::path::PathBuf;

use clap::Parser;

pub const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "https://elyx-hackathon.netlify.app",
    "http://localhost:3000",
    "http://127.0.0.1:5500",
];

#[derive(Parser, Debug)]
#[command(name = "journey-server", about = "Serve the member journey over HTTP")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "JOURNEY_ADDR", default_value = "127.0.0.1:8000")]
    pub addr: String,
    /// Journey data file (JSON array of entries)
    #[arg(long, env = "JOURNEY_DATA", default_value = "journey_data.json")]
    pub data: PathBuf,
    /// Allowed CORS origin; repeat or comma-separate for several
    #[arg(long = "cors-origin", env = "JOURNEY_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Vec<String>,
    #[arg(long, default_value_t = false)]
    pub debug: bool,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: String,
    pub data: PathBuf,
    pub cors_origins: Vec<String>,
    pub debug: bool,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        let cors_origins = if args.cors_origins.is_empty() {
            DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect()
        } else {
            args.cors_origins
        };
        Self {
            addr: args.addr,
            data: args.data,
            cors_origins,
            debug: args.debug || env_true("JOURNEY_DEBUG"),
        }
    }
}

pub fn load_config() -> Config {
    Args::parse().into()
}

fn env_true(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}
