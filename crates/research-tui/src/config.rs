use std::path::PathBuf;

use clap::Parser;
use research_core::{Location, ResearchError};

#[derive(Debug, Parser)]
#[command(name = "research", about = "Terminal client for the research assistant")]
pub struct TuiConfig {
    /// Backend base URL
    #[arg(long, env = "RESEARCH_SERVER_URL", default_value = "http://127.0.0.1:3000")]
    pub server_url: String,

    /// Path prefix every backend route lives under
    #[arg(long, env = "RESEARCH_API_PREFIX", default_value = "/app/api")]
    pub api_prefix: String,

    /// Verification link from the sign-up email. A `token` parameter opens
    /// the OTP screen directly.
    #[arg(long, env = "RESEARCH_LINK")]
    pub link: Option<String>,

    /// Directory exported PDF reports are written to
    #[arg(long, env = "RESEARCH_DOWNLOAD_DIR", default_value = ".")]
    pub download_dir: PathBuf,

    /// Log file (the terminal belongs to the UI)
    #[arg(long, env = "RESEARCH_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

impl TuiConfig {
    /// The starting location: the given link, or the default address.
    pub fn location(&self) -> Result<Location, ResearchError> {
        match self.link.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
            Some(link) => Location::parse(link),
            None => Ok(Location::default()),
        }
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("research-tui.log"))
    }
}
