//! Command-line argument parsing for the feedwire binary.
//!
//! Flags override the environment-resolved [`ChannelConfig`].

use crate::config::{parse_transports, ChannelConfig};
use crate::error::ConfigError;

/// Parsed CLI command to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    /// Show version information
    Version,
    /// Show usage
    Help,
    /// Subscribe and print incoming articles (default)
    Run(RunOptions),
}

/// Overrides given on the command line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOptions {
    pub endpoint: Option<String>,
    /// Comma-separated transport list, parsed when applied
    pub transports: Option<String>,
}

impl RunOptions {
    /// Apply the overrides on top of `config`.
    pub fn apply(self, mut config: ChannelConfig) -> Result<ChannelConfig, ConfigError> {
        if let Some(endpoint) = self.endpoint {
            config.endpoint = endpoint.trim_end_matches('/').to_string();
        }
        if let Some(transports) = self.transports {
            config.transports = parse_transports(&transports)?;
        }
        Ok(config)
    }
}

pub const USAGE: &str = "\
usage: feedwire [--endpoint URL] [--transport LIST] [--version]

  -e, --endpoint URL     push server base address (env FEEDWIRE_ENDPOINT)
  -t, --transport LIST   transport order, e.g. websocket,polling (env FEEDWIRE_TRANSPORTS)
  -V, --version          print version and exit
  -h, --help             print this help";

/// Parse command-line arguments.
///
/// Unknown arguments are ignored. Both `--flag value` and `--flag=value`
/// are accepted.
///
/// # Examples
///
/// ```
/// use feedwire::cli::args::{parse_args, CliCommand};
///
/// let args = vec!["feedwire".to_string(), "--version".to_string()];
/// assert_eq!(parse_args(args.into_iter()).unwrap(), CliCommand::Version);
/// ```
pub fn parse_args<I>(args: I) -> Result<CliCommand, ConfigError>
where
    I: Iterator<Item = String>,
{
    let mut options = RunOptions::default();
    // Skip the program name
    let mut args = args.skip(1);

    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag.to_string(), Some(value.to_string())),
            _ => (arg.clone(), None),
        };

        match flag.as_str() {
            "--version" | "-V" => return Ok(CliCommand::Version),
            "--help" | "-h" => return Ok(CliCommand::Help),
            "--endpoint" | "-e" => {
                options.endpoint = Some(flag_value(&flag, inline, &mut args)?);
            }
            "--transport" | "--transports" | "-t" => {
                options.transports = Some(flag_value(&flag, inline, &mut args)?);
            }
            _ => {}
        }
    }

    Ok(CliCommand::Run(options))
}

fn flag_value<I>(flag: &str, inline: Option<String>, rest: &mut I) -> Result<String, ConfigError>
where
    I: Iterator<Item = String>,
{
    inline
        .or_else(|| rest.next())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingValue {
            flag: flag.to_string(),
        })
}
