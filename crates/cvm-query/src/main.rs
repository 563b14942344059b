//! Command-line host for gridded velocity models.

mod io;

use std::fs::File;
use std::io::{stdin, stdout, BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use cvm_model::{describe_metrics, ModelHandle, VelocityModel};
use cvm_vs30::{MapMetadata, TickStoreWriter};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use crate::io::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "cvm-query")]
#[command(about = "Query material properties from a gridded velocity model")]
#[command(version)]
struct Cli {
    /// Log level (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Query points read from a file or stdin
    Query(QueryArgs),
    /// Print the model version and configuration
    Info(ModelArgs),
    /// Build a Vs30 point index from a text listing
    BuildVs30(BuildArgs),
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// Install directory containing `model/<label>/data/config`
    #[arg(long)]
    install: PathBuf,

    /// Model label
    #[arg(long, default_value = "cvms5")]
    label: String,
}

#[derive(Args, Debug)]
struct QueryArgs {
    #[command(flatten)]
    model: ModelArgs,

    /// File of `lon lat depth` lines (default: stdin)
    #[arg(long)]
    input: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// Map metadata string (eleven `|` separated fields)
    #[arg(long)]
    meta: String,

    /// File of `x_tick y_tick surface vs30` lines
    #[arg(long)]
    input: PathBuf,

    /// Index file to write
    #[arg(long)]
    output: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    describe_metrics();

    match cli.command {
        Command::Query(args) => run_query(&args),
        Command::Info(args) => run_info(&args),
        Command::BuildVs30(args) => run_build_vs30(&args),
    }
}

fn load(args: &ModelArgs) -> Result<ModelHandle> {
    let mut model = ModelHandle::new();
    model
        .initialize(&args.install, &args.label)
        .with_context(|| {
            format!(
                "failed to load model '{}' from {}",
                args.label,
                args.install.display()
            )
        })?;
    Ok(model)
}

fn run_query(args: &QueryArgs) -> Result<()> {
    let points = match &args.input {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
            io::read_points(BufReader::new(file))?
        }
        None => io::read_points(stdin().lock())?,
    };

    let mut model = load(&args.model)?;
    let results = model.query(&points).context("query failed")?;
    info!("Queried {} points", points.len());

    let mut out = BufWriter::new(stdout().lock());
    io::write_results(&mut out, args.format, &points, &results)?;
    out.flush()?;
    model.finalize();
    Ok(())
}

fn run_info(args: &ModelArgs) -> Result<()> {
    let mut model = load(args)?;
    println!("version = {}", model.version());
    print!("{}", model.describe_config()?);
    model.finalize();
    Ok(())
}

fn run_build_vs30(args: &BuildArgs) -> Result<()> {
    MapMetadata::from_appmeta(&args.meta).context("invalid map metadata")?;

    let file = File::open(&args.input)
        .with_context(|| format!("cannot open {}", args.input.display()))?;
    let samples = io::read_ticks(BufReader::new(file))?;

    let mut writer = TickStoreWriter::new(args.meta.as_str());
    for (addr, payload) in samples {
        writer.push(addr, payload);
    }
    writer
        .write_file(&args.output)
        .with_context(|| format!("cannot write {}", args.output.display()))?;
    info!(
        "Wrote {} samples to {}",
        writer.len(),
        args.output.display()
    );
    Ok(())
}
