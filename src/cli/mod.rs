use clap::{Parser, Subcommand};

pub mod backups;
pub mod describe;
pub mod diff;
pub mod patch;
pub mod validate;

#[derive(Debug, Parser)]
#[command(name = "modcfg")]
#[command(version = crate::version())]
#[command(about = "Comment-preserving editor for mod config files")]
#[command(
    long_about = "Comment-preserving editing engine for JSON/JSON5/TOML mod configs. Patches change only the byte ranges of the values being replaced; comments, spacing, and key order stay untouched."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Apply value changes to a config file as a minimal-diff text patch")]
    Patch(patch::PatchArgs),
    #[command(about = "Show the comment documentation attached to a config key")]
    Describe(describe::DescribeArgs),
    #[command(about = "Diff two config files into a patchable change list")]
    Diff(diff::DiffArgs),
    #[command(about = "Check that a config file parses under its dialect")]
    Validate(validate::ValidateArgs),
    #[command(about = "List retrievable backup versions of a config file")]
    Backups(backups::BackupsArgs),
}
