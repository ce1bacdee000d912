//! CLI binary for worder-wonder.
//!
//! A thin shell over [`ConversionPipeline`]: it selects the input file,
//! shows the formats on offer, applies `--to`, converts and prints the
//! pipeline's message. All validation happens in the library.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use worder_wonder::{
    ConversionConfig, ConversionInvoker, ConversionOutcome, ConversionPipeline, ConverterBackend,
    FormatCatalog,
};

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Show which formats a file can be converted to
  worder-wonder report.docx

  # Convert (writes report.pdf next to report.docx)
  worder-wonder report.docx --to pdf

  # Try the flow without the external tool installed
  worder-wonder report.docx --to pdf --simulate

  # Run the converter through a wrapper
  worder-wonder scan.png --to webp --converter docker \
      --converter-arg run --converter-arg --rm --converter-arg convertapi-cli

  # Custom format table
  worder-wonder notes.md --to html --catalog formats.json

  # Machine-readable result
  worder-wonder report.docx --to txt --json

  # Is the converter installed?
  worder-wonder --check

CATALOG FILE:
  A JSON object mapping extensions to target formats, in display order:
    { ".md": ["html", "pdf"], ".csv": ["xlsx"] }

ENVIRONMENT VARIABLES:
  WORDER_CONVERTER        Converter executable (default: convertapi-cli)
  WORDER_CATALOG          Path to a JSON format catalog
  WORDER_TIMEOUT          Conversion time limit in seconds (0 = none)
  WORDER_PROBE_TIMEOUT    Availability check time limit in seconds (default: 10)
  WORDER_SIMULATE         Use the simulated converter
  RUST_LOG                Override log filtering (e.g. worder_wonder=debug)
"#;

/// Convert a file to another format with an external converter.
#[derive(Parser, Debug)]
#[command(
    name = "worder-wonder",
    version,
    about = "Convert a file to another format with an external converter",
    long_about = "Pick a file, choose one of the target formats offered for its extension, \
and let an external command-line converter (convertapi-cli by default) produce the result \
next to the source file.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// File to convert.
    #[arg(required_unless_present_any = ["check", "list_formats"])]
    input: Option<PathBuf>,

    /// Target format (one of the formats listed for the input).
    #[arg(short, long)]
    to: Option<String>,

    /// Print the whole format catalog and exit.
    #[arg(long)]
    list_formats: bool,

    /// Only check whether the converter is available.
    #[arg(long)]
    check: bool,

    /// JSON format catalog replacing the built-in table.
    #[arg(long, env = "WORDER_CATALOG")]
    catalog: Option<PathBuf>,

    /// Converter executable.
    #[arg(long, env = "WORDER_CONVERTER", default_value = worder_wonder::config::DEFAULT_PROGRAM)]
    converter: String,

    /// Argument placed before the conversion arguments (repeatable).
    #[arg(long = "converter-arg", allow_hyphen_values = true)]
    converter_args: Vec<String>,

    /// Write a placeholder file instead of running the converter.
    #[arg(long, env = "WORDER_SIMULATE")]
    simulate: bool,

    /// Conversion time limit in seconds (0 = none).
    #[arg(long, env = "WORDER_TIMEOUT", default_value_t = 300)]
    timeout: u64,

    /// Time limit for the availability check in seconds.
    #[arg(long, env = "WORDER_PROBE_TIMEOUT", default_value_t = 10,
          value_parser = clap::value_parser!(u64).range(1..))]
    probe_timeout: u64,

    /// Print the result as JSON.
    #[arg(long)]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors and the result.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || cli.json {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;
    let catalog = config.catalog().context("Failed to load format catalog")?;

    // ── Catalog listing ──────────────────────────────────────────────────
    if cli.list_formats {
        print_catalog(&catalog, cli.json)?;
        return Ok(ExitCode::SUCCESS);
    }

    // ── Availability advisory ────────────────────────────────────────────
    let invoker = ConversionInvoker::from_config(&config);
    let available = invoker.check_tool_available().await;
    if cli.check {
        if cli.json {
            println!(
                "{}",
                serde_json::json!({ "converter": invoker.converter_name(), "available": available })
            );
        } else if available {
            println!("{} {} is available", green("✔"), bold(invoker.converter_name()));
        } else {
            println!("{} {} is not available", red("✘"), bold(invoker.converter_name()));
        }
        return Ok(if available {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }
    if !available && !cli.quiet {
        eprintln!(
            "{} The converter '{}' is not available or not configured correctly. \
             Conversions will likely fail; use --simulate to try the flow without it.",
            yellow("⚠"),
            invoker.converter_name()
        );
    }

    let Some(input) = cli.input.clone() else {
        anyhow::bail!("No input file given");
    };

    // ── Select ───────────────────────────────────────────────────────────
    let mut pipeline = ConversionPipeline::new(Arc::new(catalog), invoker);
    pipeline.select_file(&input);

    let Some(ref target) = cli.to else {
        print_candidates(&pipeline, cli.json)?;
        return Ok(ExitCode::SUCCESS);
    };

    // ── Choose ───────────────────────────────────────────────────────────
    if let Err(e) = pipeline.choose_format(target) {
        if cli.json {
            println!(
                "{}",
                serde_json::json!({ "status": "rejected", "kind": e.kind(), "reason": e.to_string() })
            );
        } else {
            eprintln!("{} {}", red("✘"), e);
        }
        return Ok(ExitCode::FAILURE);
    }

    // ── Convert ──────────────────────────────────────────────────────────
    let spinner = if cli.quiet || cli.json {
        ProgressBar::hidden()
    } else {
        new_spinner(&input, target)
    };
    let outcome = pipeline
        .request_conversion()
        .await
        .context("Conversion could not be started")?
        .clone();
    spinner.finish_and_clear();

    // ── Report ───────────────────────────────────────────────────────────
    let message = outcome.message(&input);
    if cli.json {
        let json = serde_json::to_string_pretty(&outcome).context("Failed to serialise outcome")?;
        println!("{json}");
    } else {
        match outcome {
            ConversionOutcome::Success { .. } => println!("{} {}", green("✔"), message),
            ConversionOutcome::Failure { kind, .. } => {
                eprintln!("{} {} {}", red("✘"), message, dim(&format!("({kind})")))
            }
        }
    }

    Ok(if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .program(cli.converter.clone())
        .leading_args(cli.converter_args.clone())
        .timeout_secs(cli.timeout)
        .probe_timeout_secs(cli.probe_timeout);

    if cli.simulate {
        builder = builder.backend(ConverterBackend::Simulated);
    }
    if let Some(ref path) = cli.catalog {
        builder = builder.catalog_path(path);
    }

    builder.build().context("Invalid configuration")
}

fn new_spinner(input: &std::path::Path, target: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
    bar.set_style(style);
    bar.set_prefix("Converting");
    bar.set_message(format!(
        "{} → {}",
        worder_wonder::output::display_name(input),
        target
    ));
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

/// Print the formats offered for the selected file.
fn print_candidates(pipeline: &ConversionPipeline, json: bool) -> Result<()> {
    if json {
        let selection = pipeline.selection();
        println!(
            "{}",
            serde_json::to_string_pretty(&selection).context("Failed to serialise selection")?
        );
        return Ok(());
    }

    let Some(selection) = pipeline.selection() else {
        return Ok(());
    };
    let name = worder_wonder::output::display_name(&selection.source_path);
    if selection.candidate_formats.is_empty() {
        let ext = selection
            .source_extension
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no extension".to_string());
        println!(
            "{} No conversion formats available for '{}' ({})",
            yellow("⚠"),
            name,
            ext
        );
    } else {
        println!("Formats available for '{}':", bold(&name));
        for format in &selection.candidate_formats {
            println!("  {format}");
        }
        println!("{}", dim("Convert with --to <FORMAT>."));
    }
    Ok(())
}

/// Print every catalog entry.
fn print_catalog(catalog: &FormatCatalog, json: bool) -> Result<()> {
    if json {
        let map: serde_json::Map<String, serde_json::Value> = catalog
            .extensions()
            .map(|(ext, formats)| (ext.to_string(), serde_json::json!(formats)))
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&map).context("Failed to serialise catalog")?
        );
        return Ok(());
    }
    for (ext, formats) in catalog.extensions() {
        println!("{} {}", bold(&format!("{ext:<8}")), formats.join(", "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn after_help_lists_every_env_var() {
        for arg in Cli::command().get_arguments() {
            if let Some(env) = arg.get_env() {
                let name = env.to_string_lossy();
                assert!(
                    AFTER_HELP.contains(name.as_ref()),
                    "{name} missing from ENVIRONMENT VARIABLES"
                );
            }
        }
    }
}
