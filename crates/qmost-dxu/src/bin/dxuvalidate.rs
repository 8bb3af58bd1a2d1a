use std::path::Path;
use std::process;

use anyhow::{Context, Result};
use qmost_dxu::schema::DxuSchema;
use qmost_dxu::DxuDefinition;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

const USAGE: &str = "\
Usage: dxuvalidate [-s|--schema FILE] <definition.yml>...

Validate DXU definition files. Every file is checked even if an earlier
one fails; the exit status is 1 if any file is invalid.

Options:
  -s, --schema FILE   Validate against this schema instead of the built-in one.";

/// Returns the report and whether any file failed.
fn run(args: &[String]) -> Result<(String, bool)> {
    let mut schema_file = None;
    let mut files = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-s" | "--schema" => match iter.next() {
                Some(file) => schema_file = Some(file),
                None => anyhow::bail!("Missing argument for {arg}\n\n{USAGE}"),
            },
            "-h" | "--help" => return Ok((format!("{USAGE}\n"), false)),
            flag if flag.starts_with('-') => {
                anyhow::bail!("Unknown option: '{flag}'\n\n{USAGE}")
            }
            file => files.push(file),
        }
    }
    if files.is_empty() {
        anyhow::bail!(USAGE);
    }

    let schema = match schema_file {
        Some(file) => DxuSchema::from_path(Path::new(file))
            .with_context(|| format!("cannot use schema {file}"))?,
        None => DxuSchema::builtin()?,
    };

    let mut report = String::new();
    let mut failed = false;
    for file in files {
        report.push_str(&format!("processing {file}...\n"));
        let checked = DxuDefinition::from_path_with(Path::new(file), &schema);
        match checked.with_context(|| format!("{file} is invalid")) {
            Ok(_) => info!(file, "valid"),
            Err(e) => {
                error!(file, "{e:#}");
                report.push_str(&format!("{e:#}\n"));
                failed = true;
            }
        }
    }
    Ok((report, failed))
}

fn main() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok((report, failed)) => {
            print!("{report}");
            if failed {
                process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    }
}
