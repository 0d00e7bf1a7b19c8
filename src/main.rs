use anyhow::{Context, Result};
use clap::Parser;
use regla::{
    benchmark::BenchmarkUnit,
    cli::{Cli, OutputFormat},
    csv_output::CsvSink,
    demos,
    engine::Engine,
    json_output::JsonSink,
    sink::{ConsoleSink, ResultSink},
};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; `--debug` forces TRACE
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Sink for the requested format, writing to `output` or stdout
fn make_sink(
    format: OutputFormat,
    output: Option<&Path>,
    run_name: Option<String>,
) -> Result<Box<dyn ResultSink>> {
    let writer: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path)
                .with_context(|| format!("Failed to create output file {}", path.display()))?,
        )),
        None => Box::new(io::stdout()),
    };
    Ok(match format {
        OutputFormat::Text => Box::new(ConsoleSink::new(writer, io::stderr())),
        OutputFormat::Json => Box::new(JsonSink::new(writer, run_name)),
        OutputFormat::Csv => Box::new(CsvSink::new(writer)),
    })
}

fn load_units(names: &[String]) -> Result<Vec<Box<dyn BenchmarkUnit>>> {
    if names.is_empty() {
        anyhow::bail!(
            "No benchmark suite given. Available suites: {}",
            demos::SUITES.join(", ")
        );
    }
    let mut units = Vec::new();
    for name in names {
        let suite = demos::suite(name).with_context(|| {
            format!(
                "Unknown suite '{}'. Available suites: {}",
                name,
                demos::SUITES.join(", ")
            )
        })?;
        units.extend(suite);
    }
    Ok(units)
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    if args.list {
        for name in demos::SUITES {
            println!("{}", name);
        }
        return Ok(());
    }

    let config = args.run_config()?;

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let mut units = load_units(&args.suites)?;
    let mut sink = make_sink(args.format, args.output.as_deref(), config.run_name.clone())?;

    let summary = Engine::new(config, sink.as_mut())?.run(&mut units)?;

    if summary.exhausted > 0 || !summary.skipped_rows.is_empty() {
        eprintln!(
            "{} models validated, {} not validated, {} rows skipped",
            summary.completed,
            summary.exhausted,
            summary.skipped_rows.len()
        );
    }

    Ok(())
}
