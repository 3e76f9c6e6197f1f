use clap::Args;

/// Settings shared by the CLI and the server, with environment fallbacks
#[derive(Debug, Clone, Args)]
pub struct Config {
    /// SQLite database: a path, `sqlite://path`, or `:memory:`
    #[arg(long, env = "DATABASE_URL", default_value = "/tmp/holocron.db")]
    pub database_url: String,

    #[arg(long, env = "PORT", default_value = "3000")]
    pub port: u16,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,
}

impl Config {
    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: "/tmp/holocron.db".to_string(),
            port: 3000,
            verbose: false,
            json_logs: false,
        }
    }
}
