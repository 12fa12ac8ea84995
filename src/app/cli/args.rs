//! Command line arguments of the `ddq` listener

use clap::{ArgAction, Parser};
use std::io::IsTerminal;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "ddq")]
#[command(about = "Deduplicated message queue listener")]
#[command(version, long_version = crate::core::version::long_version())]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long = "config-file", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Force colored output
    #[arg(long = "color", action = ArgAction::SetTrue)]
    pub color: bool,

    /// Disable colored output
    #[arg(long = "no-color", action = ArgAction::SetTrue, conflicts_with = "color")]
    pub no_color: bool,

    /// Log level
    #[arg(short = 'l', long = "log-level", value_name = "LEVEL", value_parser = ["trace", "debug", "info", "warn", "error", "off"])]
    pub log_level: Option<String>,

    /// Log file path (use 'none' to disable file logging)
    #[arg(short = 'f', long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log output format
    #[arg(short = 'o', long = "log-format", value_name = "FORMAT", value_parser = ["text", "ext", "json"])]
    pub log_format: Option<String>,

    /// Messages to send before listening (can be repeated)
    #[arg(short = 's', long = "send", value_name = "MESSAGE", action = ArgAction::Append)]
    pub send: Vec<String>,

    /// Topic for sent messages
    #[arg(short = 't', long = "topic", value_name = "TOPIC")]
    pub topic: Option<String>,

    /// Close after this many messages have been processed
    #[arg(short = 'n', long = "max-messages", value_name = "COUNT", value_parser = parse_positive)]
    pub max_messages: Option<usize>,
}

impl Args {
    /// Color on request, off on request, otherwise when stderr is a terminal
    pub fn use_color(&self) -> bool {
        if self.no_color {
            false
        } else if self.color {
            true
        } else {
            std::io::stderr().is_terminal()
        }
    }

    /// Log file as passed to the logger; "none" and "-" disable file logging
    pub fn log_file_path(&self) -> Option<&str> {
        self.log_file
            .as_deref()
            .and_then(|p| p.to_str())
            .filter(|p| !p.eq_ignore_ascii_case("none") && *p != "-")
    }
}

fn parse_positive(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("Value must be greater than 0".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("'{}' is not a valid positive integer", value)),
    }
}
