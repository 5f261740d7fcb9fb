use std::fs;
use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use crate::describe::extract_description;
use crate::dialect::Dialect;
use crate::error::ModcfgError;
use crate::path::parse_path;

#[derive(Debug, Args)]
pub struct DescribeArgs {
    #[arg(long, value_enum, help = "Override dialect detection from the file extension")]
    pub dialect: Option<Dialect>,
    #[arg(value_name = "FILE", help = "Config file to read")]
    pub file: PathBuf,
    #[arg(value_name = "PATH", help = "Key path in dot/bracket syntax")]
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct DescribeResponse {
    pub file: PathBuf,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

pub fn run_describe(args: DescribeArgs) -> Result<DescribeResponse, ModcfgError> {
    let dialect = match args.dialect {
        Some(dialect) => dialect,
        None => Dialect::from_path(&args.file)?,
    };
    let text = fs::read_to_string(&args.file).map_err(|error| ModcfgError::io(&args.file, error))?;

    let segments = parse_path(&args.path);
    let Some((target, parent)) = segments.split_last() else {
        return Err(ModcfgError::InvalidRequest {
            message: "PATH must name at least one key".to_string(),
        });
    };
    if target.is_array_index {
        return Err(ModcfgError::InvalidRequest {
            message: "Descriptions attach to keys, not array elements; end PATH with a key"
                .to_string(),
        });
    }

    let description = extract_description(&text, &target.key, parent, dialect);
    Ok(DescribeResponse {
        file: args.file,
        path: args.path,
        description,
    })
}
