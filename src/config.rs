// Command-line arguments and the runtime configuration derived from them.

use clap::{Parser, Subcommand};
use url::Url;

use crate::api::KOS_URI;
use crate::error::Result;

#[derive(Parser, Debug)]
#[command(name = "kos-cli", version, about = "Terminal helper for the CVUT KOS student portal")]
pub struct Args {
    /// Portal base address
    #[arg(long, env = "KOS_BASE_URL", default_value = KOS_URI, global = true)]
    pub base_url: String,

    /// Print results and exam terms as JSON instead of text tables
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in and browse exam results and exam terms
    Kos {
        /// CVUT username
        username: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: Url,
    pub username: String,
    pub output: OutputFormat,
}

impl Config {
    pub fn from_args(args: &Args) -> Result<Self> {
        let base_url = Url::parse(&args.base_url)?;
        let Command::Kos { username } = &args.command;
        Ok(Config {
            base_url,
            username: username.clone(),
            output: if args.json {
                OutputFormat::Json
            } else {
                OutputFormat::Text
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KosError;

    #[test]
    fn parses_username_and_defaults() {
        let args = Args::try_parse_from(["kos-cli", "kos", "novakj"]).unwrap();
        let config = Config::from_args(&args).unwrap();
        assert_eq!(config.username, "novakj");
        assert_eq!(config.base_url.as_str(), "https://www.kos.cvut.cz/");
        assert_eq!(config.output, OutputFormat::Text);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "kos-cli",
            "kos",
            "novakj",
            "--json",
            "--base-url",
            "http://127.0.0.1:8080",
        ])
        .unwrap();
        let config = Config::from_args(&args).unwrap();
        assert_eq!(config.output, OutputFormat::Json);
        assert_eq!(config.base_url.as_str(), "http://127.0.0.1:8080/");
    }

    #[test]
    fn username_is_required() {
        assert!(Args::try_parse_from(["kos-cli", "kos"]).is_err());
    }

    #[test]
    fn rejects_invalid_base_url() {
        let args = Args::try_parse_from(["kos-cli", "--base-url", "not a url", "kos", "novakj"]).unwrap();
        assert!(matches!(Config::from_args(&args), Err(KosError::InvalidUrl(_))));
    }
}
