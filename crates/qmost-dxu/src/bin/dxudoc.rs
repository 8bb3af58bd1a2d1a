use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use qmost_dxu::{
    render_fits_reference, render_reference_table, render_rst, write_template, Config,
    DxuDefinition, RuntimeValues,
};
use qmost_dxu::schema::DxuSchema;
use tracing_subscriber::{fmt, EnvFilter};

const USAGE: &str = "\
Usage: dxudoc [options] <command> [args...]

Commands:
  fits <definition.yml>                FITS keyword reference (RST)
  rst <definition.yml>                 Full documentation (RST)
  schema                               Attribute reference of the definition format (RST)
  template <out.fits> <definition.yml> Write an empty FITS file with the defined headers

Options:
  --config <file>        Read rendering options from a YAML file
  --option KEY=VALUE     Override one rendering option
  --set NAME=VALUE       Supply a header value (repeat for array headers)
  -s, --schema FILE      Use this schema instead of the built-in one
  -e, --extension NAME   Restrict 'fits' to one extension";

#[derive(Debug, Default)]
struct Options {
    config_path: Option<PathBuf>,
    schema_path: Option<PathBuf>,
    overrides: Vec<String>,
    runtime: RuntimeValues,
    extension: Option<String>,
    positional: Vec<String>,
}

fn parse_args(args: &[String]) -> Result<Options> {
    let mut opts = Options::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut operand = |flag: &str| {
            iter.next()
                .cloned()
                .with_context(|| format!("{flag} needs an argument\n\n{USAGE}"))
        };
        match arg.as_str() {
            "--config" => opts.config_path = Some(PathBuf::from(operand("--config")?)),
            "-s" | "--schema" => opts.schema_path = Some(PathBuf::from(operand("--schema")?)),
            "--option" => opts.overrides.push(operand("--option")?),
            "--set" => opts
                .runtime
                .parse_assignment(&operand("--set")?)
                .context("invalid --set")?,
            "-e" | "--extension" => opts.extension = Some(operand("--extension")?),
            flag if flag.starts_with('-') && flag.len() > 1 => {
                bail!("Unknown option: '{flag}'\n\n{USAGE}")
            }
            _ => opts.positional.push(arg.clone()),
        }
    }
    Ok(opts)
}

fn load_config(opts: &Options) -> Result<Config> {
    let mut config = Config::load(opts.config_path.as_deref()).context("cannot load config")?;
    for assignment in &opts.overrides {
        let (key, value) = assignment
            .split_once('=')
            .with_context(|| format!("--option expects KEY=VALUE, got '{assignment}'"))?;
        config.set(key.trim(), value)?;
    }
    Ok(config)
}

fn load_schema(opts: &Options) -> Result<DxuSchema> {
    match &opts.schema_path {
        Some(path) => DxuSchema::from_path(path)
            .with_context(|| format!("cannot use schema {}", path.display())),
        None => Ok(DxuSchema::builtin()?),
    }
}

fn load_definition(path: &str, schema: &DxuSchema) -> Result<DxuDefinition> {
    DxuDefinition::from_path_with(Path::new(path), schema)
        .with_context(|| format!("Error reading '{path}'"))
}

/// Returns the bytes to print on stdout.
fn run(args: &[String]) -> Result<Vec<u8>> {
    let opts = parse_args(args)?;
    let config = load_config(&opts)?;
    let schema = load_schema(&opts)?;
    let positional: Vec<&str> = opts.positional.iter().map(String::as_str).collect();

    let mut out = Vec::new();
    match positional.as_slice() {
        ["fits", path] => {
            let def = load_definition(path, &schema)?;
            match &opts.extension {
                Some(name) => {
                    let ext = def
                        .extensions
                        .iter()
                        .find(|e| &e.name == name)
                        .with_context(|| format!("no extension named '{name}' in '{path}'"))?;
                    render_reference_table(ext, &opts.runtime, &config, &mut out)?;
                }
                None => render_fits_reference(&def, &opts.runtime, &config, &mut out)?,
            }
        }
        ["rst", path] => render_rst(&load_definition(path, &schema)?, &config, &mut out)?,
        ["schema"] => schema.write_doc(&mut out)?,
        ["template", target, path] => {
            let def = load_definition(path, &schema)?;
            let mut buf = Vec::new();
            write_template(&def, &opts.runtime, &config, &mut buf)?;
            fs::write(target, &buf).with_context(|| format!("Error writing '{target}'"))?;
            out.extend_from_slice(format!("Wrote {} bytes to {target}\n", buf.len()).as_bytes());
        }
        [] => bail!(USAGE),
        [command, ..] => bail!("Unknown or incomplete command '{command}'\n\n{USAGE}"),
    }
    Ok(out)
}

fn main() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = run(&args).and_then(|bytes| {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&bytes)?;
        stdout.flush()?;
        Ok(())
    });
    if let Err(e) = result {
        eprintln!("{e:#}");
        process::exit(1);
    }
}
