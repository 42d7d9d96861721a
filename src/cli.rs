//! Command-line argument parsing for the `ask` binary.

use crate::config::Config;
use crate::error::{AskError, Result};
use crate::llm::LlmProvider;
use crate::logging;
use clap::Parser;
use std::path::PathBuf;

/// Output format for answers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// SQL, a result table and the summary.
    #[default]
    Text,
    /// The response envelope as JSON.
    Json,
}

/// Ask questions about a SQLite database in plain English.
#[derive(Parser, Debug)]
#[command(name = "ask")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Question to answer. Starts an interactive session when omitted.
    #[arg(value_name = "QUESTION")]
    pub question: Option<String>,

    /// SQLite database file (overrides [database].path)
    #[arg(short = 'd', long, value_name = "PATH")]
    pub database: Option<PathBuf>,

    /// Create the sample company database at the database path if it does not exist
    #[arg(long)]
    pub init_sample: bool,

    /// Use the in-memory sample database instead of a file
    #[arg(long)]
    pub mock_db: bool,

    /// LLM provider: openrouter, openai, deepseek or mock (overrides [llm].provider)
    #[arg(long, value_name = "PROVIDER")]
    pub llm: Option<String>,

    /// Model id (overrides [llm].model and the provider's model variable)
    #[arg(short = 'm', long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Config file path
    #[arg(short = 'c', long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print the response envelope as JSON
    #[arg(long)]
    pub json: bool,

    /// Print the database schema as the model sees it and exit
    #[arg(long)]
    pub show_schema: bool,

    /// Write logs to a file instead of stderr (default location if PATH is omitted)
    #[arg(long, value_name = "PATH", num_args = 0..=1)]
    pub log_file: Option<Option<PathBuf>>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Returns the log file to write to, if any.
    ///
    /// A bare `--log-file` resolves to the platform default location.
    pub fn log_path(&self) -> Option<PathBuf> {
        self.log_file
            .clone()
            .map(|path| path.unwrap_or_else(logging::default_log_path))
    }

    /// Returns the requested output format.
    pub fn output_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }

    /// Applies command-line overrides on top of file configuration.
    pub fn apply_overrides(&self, config: &mut Config) -> Result<()> {
        if let Some(provider) = &self.llm {
            config.llm.provider = provider
                .parse::<LlmProvider>()
                .map_err(AskError::config)?;
        }
        if let Some(model) = &self.model {
            config.llm.model = Some(model.clone());
        }
        if let Some(path) = &self.database {
            config.database.path = path.clone();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_args(args: &[&str]) -> Cli {
        Cli::parse_from(args)
    }

    #[test]
    fn test_parse_question() {
        let cli = parse_args(&["ask", "How many users are there?"]);
        assert_eq!(cli.question.as_deref(), Some("How many users are there?"));
        assert!(!cli.json);
        assert_eq!(cli.output_format(), OutputFormat::Text);
    }

    #[test]
    fn test_no_question_means_interactive() {
        let cli = parse_args(&["ask"]);
        assert!(cli.question.is_none());
    }

    #[test]
    fn test_parse_flags() {
        let cli = parse_args(&[
            "ask",
            "--database",
            "company.db",
            "--init-sample",
            "--json",
            "-v",
            "--log-file",
            "/tmp/ask.log",
            "List departments",
        ]);

        assert_eq!(cli.database, Some(PathBuf::from("company.db")));
        assert!(cli.init_sample);
        assert!(cli.verbose);
        assert_eq!(cli.output_format(), OutputFormat::Json);
        assert_eq!(cli.log_path(), Some(PathBuf::from("/tmp/ask.log")));
    }

    #[test]
    fn test_bare_log_file_uses_default_location() {
        let cli = parse_args(&["ask", "--log-file"]);
        assert_eq!(cli.log_path(), Some(logging::default_log_path()));

        let cli = parse_args(&["ask"]);
        assert_eq!(cli.log_path(), None);
    }

    #[test]
    fn test_parse_config_path() {
        let cli = parse_args(&["ask", "--config", "/path/to/config.toml"]);
        assert_eq!(cli.config_path(), PathBuf::from("/path/to/config.toml"));
    }

    #[test]
    fn test_default_config_path() {
        let cli = parse_args(&["ask"]);
        assert_eq!(cli.config_path(), Config::default_path());
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        assert!(Cli::try_parse_from(["ask", "--headless"]).is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let cli = parse_args(&[
            "ask",
            "--llm",
            "deepseek",
            "--model",
            "deepseek-reasoner",
            "-d",
            "other.db",
        ]);
        let mut config = Config::default();
        cli.apply_overrides(&mut config).unwrap();

        assert_eq!(config.llm.provider, LlmProvider::DeepSeek);
        assert_eq!(config.llm.model.as_deref(), Some("deepseek-reasoner"));
        assert_eq!(config.database.path, PathBuf::from("other.db"));
    }

    #[test]
    fn test_apply_overrides_keeps_file_values() {
        let cli = parse_args(&["ask"]);
        let mut config = Config::default();
        config.llm.model = Some("from-file".to_string());
        cli.apply_overrides(&mut config).unwrap();

        assert_eq!(config.llm.model.as_deref(), Some("from-file"));
        assert_eq!(config.database.path, PathBuf::from("sample.db"));
    }

    #[test]
    fn test_unknown_provider_is_config_error() {
        let cli = parse_args(&["ask", "--llm", "claude"]);
        let err = cli.apply_overrides(&mut Config::default()).unwrap_err();
        assert!(matches!(err, AskError::Config(_)));
    }
}
