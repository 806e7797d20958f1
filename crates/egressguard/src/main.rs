// SPDX-FileCopyrightText: 2026 Egressguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! egressguard - check and perform outbound HTTP(S) requests under an
//! SSRF egress policy.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use egressguard_config::EgressConfig;

/// Check and perform outbound requests under an SSRF egress policy.
#[derive(Parser, Debug)]
#[command(name = "egressguard", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Check whether an IP address may be dialed.
    CheckIp { ip: String },
    /// Check whether a port may be dialed.
    CheckPort { port: u16 },
    /// Statically check a URL's scheme, port and literal host.
    CheckUrl { url: String },
    /// Perform a guarded request and print the response body.
    Fetch {
        url: String,
        /// Report a blocked connection as a policy violation.
        #[arg(long)]
        raise: bool,
        /// HTTP method.
        #[arg(long, default_value = "GET")]
        method: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => egressguard_config::load_and_validate_path(path),
        None => egressguard_config::load_and_validate(),
    };
    let config: EgressConfig = match loaded {
        Ok(config) => config,
        Err(errors) => {
            egressguard_config::render_errors(&errors);
            return ExitCode::from(commands::EXIT_CONFIG);
        }
    };

    init_tracing(&config.logging.level);

    let outcome = match cli.command {
        Commands::CheckIp { ip } => commands::check_ip(&config, &ip),
        Commands::CheckPort { port } => commands::check_port(&config, port),
        Commands::CheckUrl { url } => commands::check_url(&config, &url),
        Commands::Fetch { url, raise, method } => {
            commands::fetch(&config, &url, &method, raise).await
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("egressguard: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("egressguard={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fetch_with_flags() {
        let cli = Cli::try_parse_from([
            "egressguard",
            "--config",
            "/tmp/eg.toml",
            "fetch",
            "https://example.com/",
            "--raise",
            "--method",
            "HEAD",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/eg.toml")));
        match cli.command {
            Commands::Fetch { url, raise, method } => {
                assert_eq!(url, "https://example.com/");
                assert!(raise);
                assert_eq!(method, "HEAD");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn fetch_defaults_to_get_without_raise() {
        let cli = Cli::try_parse_from(["egressguard", "fetch", "http://example.com/"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Fetch { raise: false, ref method, .. } if method == "GET"
        ));
    }

    #[test]
    fn check_port_rejects_non_numeric() {
        assert!(Cli::try_parse_from(["egressguard", "check-port", "http"]).is_err());
        assert!(Cli::try_parse_from(["egressguard", "check-port", "70000"]).is_err());
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["egressguard"]).is_err());
    }
}
