use std::io::Read;
use std::path::PathBuf;

use clap::Args;
use serde::{Deserialize, Serialize};

use crate::dialect::{Dialect, validate_text};
use crate::error::ModcfgError;
use crate::patch::{Change, ChangeOutcome, apply_changes};
use crate::store::{read_guarded, save_patched_text};
use crate::value::{ConfigValue, ValueDiff};

#[derive(Debug, Args)]
pub struct PatchArgs {
    #[arg(long, help = "Read a patch request JSON from stdin")]
    pub json: bool,
    #[arg(
        long = "set",
        value_name = "PATH=VALUE",
        help = "Change one value; PATH uses dot/bracket syntax, VALUE is a JSON literal (repeatable)"
    )]
    pub sets: Vec<String>,
    #[arg(long, help = "Report the patched text and outcomes without writing")]
    pub dry_run: bool,
    #[arg(long, value_enum, help = "Override dialect detection from the file extension")]
    pub dialect: Option<Dialect>,
    #[arg(value_name = "FILE", help = "Config file; omit when using --json stdin mode")]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PatchRequest {
    file: PathBuf,
    #[serde(default)]
    changes: Vec<ValueDiff>,
    #[serde(default)]
    dry_run: bool,
    #[serde(default)]
    dialect: Option<Dialect>,
}

#[derive(Debug, Serialize)]
pub struct PatchResponse {
    pub file: PathBuf,
    pub dialect: &'static str,
    pub changes: Vec<ChangeOutcome>,
    pub applied: usize,
    pub skipped: usize,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patched_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_file_hash: Option<String>,
}

pub fn run_patch(args: PatchArgs) -> Result<PatchResponse, ModcfgError> {
    let request = build_request(args)?;
    let dialect = match request.dialect {
        Some(dialect) => dialect,
        None => Dialect::from_path(&request.file)?,
    };

    let (original_text, guard) = read_guarded(&request.file)?;
    let changes: Vec<Change> = request.changes.iter().map(Change::from_diff).collect();
    let result = apply_changes(&original_text, &changes, dialect);

    let applied = result.applied_count();
    let skipped = result.outcomes.len() - applied;

    if request.dry_run {
        validate_text(dialect, &result.text)?;
        return Ok(PatchResponse {
            file: request.file,
            dialect: dialect.name(),
            changes: result.outcomes,
            applied,
            skipped,
            dry_run: true,
            patched_text: Some(result.text),
            backup: None,
            new_file_hash: None,
        });
    }

    let saved = if applied > 0 {
        Some(save_patched_text(
            &request.file,
            &result.text,
            &guard,
            dialect,
        )?)
    } else {
        None
    };

    Ok(PatchResponse {
        file: request.file,
        dialect: dialect.name(),
        changes: result.outcomes,
        applied,
        skipped,
        dry_run: false,
        patched_text: None,
        backup: saved.as_ref().map(|saved| saved.backup.clone()),
        new_file_hash: saved.map(|saved| saved.new_file_hash),
    })
}

fn build_request(args: PatchArgs) -> Result<PatchRequest, ModcfgError> {
    if args.json {
        if args.file.is_some() || !args.sets.is_empty() {
            return Err(ModcfgError::InvalidRequest {
                message: "--json stdin mode does not combine with FILE or --set; put everything in the JSON payload".to_string(),
            });
        }
        let mut payload = String::new();
        std::io::stdin()
            .read_to_string(&mut payload)
            .map_err(|source| ModcfgError::StdinRead { source })?;
        let mut request: PatchRequest = serde_json::from_str(&payload)
            .map_err(|source| ModcfgError::InvalidJsonRequest { source })?;
        request.dry_run |= args.dry_run;
        if request.dialect.is_none() {
            request.dialect = args.dialect;
        }
        return Ok(request);
    }

    let file = args.file.ok_or_else(|| ModcfgError::InvalidRequest {
        message: "Provide a FILE argument, or use --json stdin mode".to_string(),
    })?;
    if args.sets.is_empty() {
        return Err(ModcfgError::InvalidRequest {
            message: "Provide at least one --set PATH=VALUE change".to_string(),
        });
    }

    let mut changes = Vec::with_capacity(args.sets.len());
    for assignment in &args.sets {
        changes.push(parse_assignment(assignment)?);
    }

    Ok(PatchRequest {
        file,
        changes,
        dry_run: args.dry_run,
        dialect: args.dialect,
    })
}

fn parse_assignment(assignment: &str) -> Result<ValueDiff, ModcfgError> {
    let (path, value_text) =
        assignment
            .split_once('=')
            .ok_or_else(|| ModcfgError::InvalidRequest {
                message: format!("--set expects PATH=VALUE, got '{assignment}'"),
            })?;
    if path.is_empty() {
        return Err(ModcfgError::InvalidRequest {
            message: format!("--set has an empty path in '{assignment}'"),
        });
    }
    let value: ConfigValue =
        serde_json::from_str(value_text).map_err(|error| ModcfgError::InvalidRequest {
            message: format!("--set value for '{path}' is not a JSON literal: {error}"),
        })?;
    Ok(ValueDiff {
        path: path.to_string(),
        value: Some(value),
    })
}
