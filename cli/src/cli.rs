use analyst_core::AnalystConfig;
use clap::Parser;
use std::path::PathBuf;

/// Ask Snowflake Cortex Analyst questions about your data
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// The question to ask
    #[arg(index = 1)] // Positional argument
    pub prompt: Option<String>,

    /// Enter interactive chat mode
    #[arg(short, long, default_value_t = false)]
    pub interactive: bool,

    /// Path to the config file (defaults to ~/.config/cortex-analyst/config.toml)
    #[arg(short, long, env = "CORTEX_ANALYST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Semantic model to start with, by path or file name
    #[arg(short, long)]
    pub model: Option<String>,

    /// List the configured semantic models and exit
    #[arg(long, default_value_t = false)]
    pub list_models: bool,

    /// Write a config file with the default settings and exit
    #[arg(long, default_value_t = false)]
    pub init_config: bool,

    /// Log level: trace, debug, info, warn or error
    #[arg(long)]
    pub log_level: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl Args {
    /// Settings given on the command line, to be merged over file and environment
    pub fn overrides(&self) -> AnalystConfig {
        AnalystConfig {
            timeout_secs: self.timeout,
            log_level: self.log_level.clone(),
            ..AnalystConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prompt_and_flags() {
        let args = Args::parse_from([
            "cortex-analyst",
            "What was Q1 revenue?",
            "--model",
            "revenue_timeseries.yaml",
            "--timeout",
            "10",
        ]);
        assert_eq!(args.prompt.as_deref(), Some("What was Q1 revenue?"));
        assert_eq!(args.model.as_deref(), Some("revenue_timeseries.yaml"));
        assert!(!args.interactive);

        let overrides = args.overrides();
        assert_eq!(overrides.timeout_secs, Some(10));
        assert_eq!(overrides.log_level, None);
        assert_eq!(overrides.token, None);
    }

    #[test]
    fn interactive_without_prompt() {
        let args = Args::parse_from(["cortex-analyst", "-i", "--log-level", "debug"]);
        assert!(args.interactive);
        assert!(args.prompt.is_none());
        assert_eq!(args.overrides().log_level.as_deref(), Some("debug"));
    }
}
