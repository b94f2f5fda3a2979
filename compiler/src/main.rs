use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

use shdc::ast::Program;
use shdc::config::{InputShaderVersion, ShaderInput, ShaderModel, ShaderOutput, ShaderTarget};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum Emit {
    /// Diagnostics as JSON
    Reports,
    /// Decorated syntax tree as JSON
    Ast,
    /// Text listing of the decorations
    Dump,
}

#[derive(Parser, Debug)]
#[command(
    name = "shdc",
    version,
    about = "Shader Decoration Compiler: semantic analysis of HLSL syntax trees"
)]
struct Cli {
    /// Syntax tree of the shader, as JSON
    input: PathBuf,

    /// Entry point function
    #[arg(short, long)]
    entry: Option<String>,

    /// Shader stage of the entry point
    #[arg(short, long, value_enum)]
    target: Option<ShaderTarget>,

    /// Source dialect version
    #[arg(long = "hlsl", value_enum)]
    shader_version: Option<InputShaderVersion>,

    /// Target shader model, e.g. 5.0
    #[arg(long)]
    shader_model: Option<ShaderModel>,

    /// JSON file with `input` / `output` settings; flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Suppress warnings
    #[arg(long)]
    no_warnings: bool,

    /// What to write after analysis
    #[arg(long, value_enum, default_value_t = Emit::Reports)]
    emit: Emit,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log analysis phases
    #[arg(long)]
    verbose: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    input: ShaderInput,
    output: ShaderOutput,
}

#[derive(Debug, Error)]
enum DriverError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("{path}: malformed syntax tree: {source}")]
    InvalidTree {
        path: PathBuf,
        source: shdc::ast::HandleError,
    },
    #[error("cannot serialize output: {0}")]
    Serialize(serde_json::Error),
    #[error(transparent)]
    Internal(#[from] shdc::diag::InternalFault),
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "shdc=debug" } else { "warn" })
    });
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &PathBuf) -> Result<T, DriverError> {
    let text = std::fs::read_to_string(path).map_err(|source| DriverError::Io {
        path: path.clone(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| DriverError::Json {
        path: path.clone(),
        source,
    })
}

fn settings(cli: &Cli) -> Result<(ShaderInput, ShaderOutput), DriverError> {
    let ConfigFile {
        mut input,
        mut output,
    } = match &cli.config {
        Some(path) => read_json(path)?,
        None => ConfigFile::default(),
    };
    if let Some(entry) = &cli.entry {
        input.entry_point = entry.clone();
    }
    if let Some(target) = cli.target {
        input.shader_target = target;
    }
    if let Some(version) = cli.shader_version {
        input.shader_version = version;
    }
    if let Some(model) = cli.shader_model {
        input.shader_model = model;
    }
    if cli.no_warnings {
        output.warnings = false;
    }
    Ok((input, output))
}

/// Returns whether analysis succeeded.
fn run(cli: &Cli) -> Result<bool, DriverError> {
    let (input, output) = settings(cli)?;
    let mut program: Program = read_json(&cli.input)?;
    program
        .validate_handles()
        .map_err(|source| DriverError::InvalidTree {
            path: cli.input.clone(),
            source,
        })?;
    info!(
        path = %cli.input.display(),
        decls = program.decls.len(),
        "syntax tree loaded"
    );

    let result = shdc::decorate(&mut program, &input, &output)?;
    for diag in &result.diagnostics {
        eprintln!("shdc: {}", diag);
    }
    debug!(reports = result.diagnostics.len(), "analysis done");

    let text = match cli.emit {
        Emit::Reports => serde_json::to_string_pretty(&result.diagnostics),
        Emit::Ast => serde_json::to_string_pretty(&program),
        Emit::Dump => Ok(shdc::dump::dump(&program)),
    }
    .map_err(DriverError::Serialize)?;
    match &cli.output {
        Some(path) => std::fs::write(path, text).map_err(|source| DriverError::Io {
            path: path.clone(),
            source,
        })?,
        None => println!("{}", text.trim_end()),
    }
    Ok(result.success)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("shdc: error: {}", e);
            ExitCode::from(2)
        }
    }
}
