//! CLI binary for wkpdf.
//!
//! A thin shim over the library crate that maps CLI flags to renderer
//! options and a `ConverterConfig`, then writes the PDF to a file or stdout.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use wkpdf::{
    Converter, ConverterConfig, FileOutput, HtmlInput, OptionEntry, Options, PdfOutput,
    StringInput, StringOutput, UrlInput,
};

const AFTER_HELP: &str = r#"EXAMPLES:
  # Render a page to a file
  wkpdf https://example.com/ -o example.pdf

  # Local HTML file, PDF on stdout
  wkpdf report.html > report.pdf

  # Renderer options (prefix is added for you: B → -B, margin-top → --margin-top)
  wkpdf report.html -o report.pdf -O margin-top=10 -O B=15 --flag grayscale

  # Options from a JSON object, applied before -O/--flag
  wkpdf report.html -o report.pdf --options-file print.json

  # Show the command that would run
  wkpdf report.html --print-command

ENVIRONMENT VARIABLES:
  WKHTMLTOPDF_PATH   Path to the wkhtmltopdf executable (skips discovery)
  RUST_LOG           Log filter, overrides -v / -q
"#;

/// Convert HTML files and URLs to PDF with wkhtmltopdf.
#[derive(Parser, Debug)]
#[command(
    name = "wkpdf",
    version,
    about = "Convert HTML files and URLs to PDF with wkhtmltopdf",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local HTML file path or HTTP/HTTPS URL.
    input: String,

    /// Write the PDF to this file instead of stdout.
    #[arg(short, long, env = "WKPDF_OUTPUT")]
    output: Option<PathBuf>,

    /// Renderer option as name=value, without dashes. Repeatable.
    #[arg(short = 'O', long = "option", value_name = "NAME=VALUE", value_parser = parse_key_value)]
    options: Vec<(String, String)>,

    /// Flag-only renderer option, without dashes. Repeatable.
    #[arg(long = "flag", value_name = "NAME")]
    flags: Vec<String>,

    /// JSON object of renderer options.
    #[arg(long, env = "WKPDF_OPTIONS_FILE")]
    options_file: Option<PathBuf>,

    /// Path to the wkhtmltopdf executable.
    #[arg(long, env = "WKHTMLTOPDF_PATH")]
    binary: Option<PathBuf>,

    /// Kill the renderer after this many seconds.
    #[arg(long, env = "WKPDF_TIMEOUT")]
    timeout: Option<u64>,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "WKPDF_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print the renderer command line and exit.
    #[arg(long)]
    print_command: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "WKPDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "WKPDF_QUIET")]
    quiet: bool,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.to_string())),
        _ => Err(format!("expected NAME=VALUE, got '{s}'")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
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
    let entries = collect_options(&cli).await?;

    // ── Load input ───────────────────────────────────────────────────────
    if is_url(&cli.input) {
        let mut input = UrlInput::with_timeout_secs(config.download_timeout_secs);
        if !cli.print_command {
            input
                .set_url(&cli.input)
                .await
                .with_context(|| format!("Failed to load {}", cli.input))?;
        }
        run(&cli, input, config, entries).await
    } else {
        let html = tokio::fs::read_to_string(&cli.input)
            .await
            .with_context(|| format!("Failed to read HTML from {:?}", cli.input))?;
        let input = StringInput::from_html(html)
            .with_context(|| format!("{:?} does not contain HTML", cli.input))?;
        run(&cli, input, config, entries).await
    }
}

fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Map CLI args to `ConverterConfig`.
fn build_config(cli: &Cli) -> Result<ConverterConfig> {
    let mut builder = ConverterConfig::builder().download_timeout_secs(cli.download_timeout);
    if let Some(ref binary) = cli.binary {
        builder = builder.binary_path(binary.clone());
    }
    if let Some(secs) = cli.timeout {
        builder = builder.timeout_secs(secs);
    }
    builder.build().context("Invalid configuration")
}

/// Options file first, then `-O` pairs, then `--flag` names.
async fn collect_options(cli: &Cli) -> Result<Vec<OptionEntry>> {
    let mut entries = Vec::new();

    if let Some(ref path) = cli.options_file {
        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read options from {:?}", path))?;
        let from_file = Options::from_json(&json)
            .with_context(|| format!("Invalid options file {:?}", path))?;
        entries.extend(from_file.iter().map(OptionEntry::from));
    }

    entries.extend(cli.options.iter().cloned().map(OptionEntry::from));
    entries.extend(cli.flags.iter().cloned().map(OptionEntry::from));
    Ok(entries)
}

async fn run<I: HtmlInput>(
    cli: &Cli,
    input: I,
    config: ConverterConfig,
    entries: Vec<OptionEntry>,
) -> Result<()> {
    if let Some(ref path) = cli.output {
        let converter = build_converter(input, FileOutput::new(), config, entries)?;
        if cli.print_command {
            return print_command(&converter);
        }
        let output = converter.convert().await.context("Conversion failed")?;
        output
            .store(path)
            .with_context(|| format!("Failed to write PDF to {:?}", path))?;
        if !cli.quiet {
            eprintln!("Wrote {} bytes to {}", output.pdf_data()?.len(), path.display());
        }
    } else {
        let converter = build_converter(input, StringOutput::new(), config, entries)?;
        if cli.print_command {
            return print_command(&converter);
        }
        if stdout_is_terminal() {
            bail!("Refusing to write PDF bytes to a terminal; use -o FILE or redirect stdout");
        }
        let output = converter.convert().await.context("Conversion failed")?;
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(output.get()?)
            .context("Failed to write to stdout")?;
        handle.flush().context("Failed to flush stdout")?;
    }
    Ok(())
}

fn build_converter<I: HtmlInput, O: PdfOutput>(
    input: I,
    output: O,
    config: ConverterConfig,
    entries: Vec<OptionEntry>,
) -> Result<Converter<I, O>> {
    let mut converter = Converter::with_config(input, output, config)?;
    if !entries.is_empty() {
        converter
            .set_options(entries)
            .context("Invalid renderer option")?;
    }
    debug!(
        "Converter config: {} | options: {}",
        serde_json::to_string(converter.config()).context("Failed to serialise config")?,
        converter.options()
    );
    Ok(converter)
}

fn print_command<I: HtmlInput, O: PdfOutput>(converter: &Converter<I, O>) -> Result<()> {
    println!("{}", converter.command_line()?);
    Ok(())
}

fn stdout_is_terminal() -> bool {
    use std::io::IsTerminal;
    io::stdout().is_terminal()
}
