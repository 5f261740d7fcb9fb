use std::process::ExitCode;

use clap::Parser;
use modcfg::cli::{Cli, Commands};
use modcfg::error::ModcfgError;

fn main() -> ExitCode {
    match run() {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            let serialized = serde_json::to_string_pretty(&error.to_error_response())
                .unwrap_or_else(|_| {
                    "{\"error\":{\"type\":\"serialization_error\",\"message\":\"Failed to serialize error response\"}}"
                        .to_string()
                });
            println!("{serialized}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<String, ModcfgError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Patch(args) => to_pretty_json(&modcfg::cli::patch::run_patch(args)?),
        Commands::Describe(args) => to_pretty_json(&modcfg::cli::describe::run_describe(args)?),
        Commands::Diff(args) => to_pretty_json(&modcfg::cli::diff::run_diff(args)?),
        Commands::Validate(args) => to_pretty_json(&modcfg::cli::validate::run_validate(args)?),
        Commands::Backups(args) => to_pretty_json(&modcfg::cli::backups::run_backups(args)?),
    }
}

fn to_pretty_json<T: serde::Serialize>(response: &T) -> Result<String, ModcfgError> {
    serde_json::to_string_pretty(response)
        .map_err(|source| ModcfgError::ResponseSerialization { source })
}
