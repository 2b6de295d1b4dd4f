//! CLI binary for prescription-parser.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use prescription_parser::{
    write_outcome, ErrorOutcome, ExtractionConfig, ParseOutcome, ParserConfig, Pipeline,
    PrescriptionError,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::debug;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Parse a prescription PDF
  rxparse prescription.pdf

  # Several scans at once, JSON envelopes
  rxparse --json scan1.jpg scan2.png visit.pdf > meds.json

  # Save the envelope for one document
  rxparse prescription.pdf -o out/prescription.json

  # Download and parse
  rxparse https://example.com/rx/1234.pdf

  # Show what text the extractor found
  rxparse --extract-only scanned.pdf

  # Parse text you already have
  pdftotext rx.pdf - | rxparse --text -

ENVIRONMENT VARIABLES:
  TESSDATA_PREFIX     Directory containing Tesseract *.traineddata files
  PDFIUM_LIB_PATH     Path to libpdfium (file or directory), for scanned PDFs
  RUST_LOG            Overrides the log filter (e.g. prescription_parser=debug)
  RXPARSE_*           Every tuning flag below has an RXPARSE_ equivalent

SETUP:
  Text-layer PDFs need nothing else. Images need Tesseract with English
  language data (apt install tesseract-ocr). Scanned PDFs also need
  libpdfium: PDFIUM_LIB_PATH=/path/to/libpdfium.so rxparse scan.pdf
"#;

/// Extract medication lists from prescription PDFs and images.
#[derive(Parser, Debug)]
#[command(
    name = "rxparse",
    version,
    about = "Extract medication lists from prescription PDFs and images",
    long_about = "Extract medication names, dosages and frequencies from prescription \
documents. PDFs are read from their text layer when possible and OCR'd otherwise; \
PNG/JPEG scans are OCR'd with Tesseract.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local files (pdf, png, jpg, jpeg) or HTTP/HTTPS URLs.
    #[arg(required_unless_present = "text", conflicts_with = "text")]
    inputs: Vec<String>,

    /// Parse medications from a text file ("-" for stdin), skipping extraction.
    #[arg(long, value_name = "FILE|-")]
    text: Option<String>,

    /// Print the extracted text instead of medications.
    #[arg(long, conflicts_with_all = ["text", "output"])]
    extract_only: bool,

    /// Output JSON envelopes instead of a listing.
    #[arg(long, env = "RXPARSE_JSON")]
    json: bool,

    /// Write the JSON envelope to this file (single input only).
    #[arg(short, long, env = "RXPARSE_OUTPUT")]
    output: Option<PathBuf>,

    /// Non-whitespace characters above which extracted text is good enough.
    #[arg(long, env = "RXPARSE_THRESHOLD", default_value_t = 50)]
    threshold: usize,

    /// Tesseract language(s), e.g. eng or eng+fra.
    #[arg(long, env = "RXPARSE_LANG", default_value = "eng")]
    lang: String,

    /// Directory containing Tesseract traineddata files.
    #[arg(long, env = "RXPARSE_TESSDATA")]
    tessdata: Option<PathBuf>,

    /// Path to libpdfium (file or directory).
    #[arg(long, env = "RXPARSE_PDFIUM_LIB")]
    pdfium_lib: Option<PathBuf>,

    /// Page render scale for OCR (1.0 = 72 DPI).
    #[arg(long, env = "RXPARSE_RENDER_SCALE", default_value_t = 1.0)]
    render_scale: f32,

    /// Per-document extraction budget in seconds.
    #[arg(long, env = "RXPARSE_TIMEOUT", default_value_t = 120)]
    timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "RXPARSE_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Largest accepted document in MiB.
    #[arg(long, env = "RXPARSE_MAX_PAYLOAD_MB", default_value_t = 16)]
    max_payload_mb: u64,

    /// Number of documents processed concurrently.
    #[arg(short, long, env = "RXPARSE_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Disable progress bar.
    #[arg(long, env = "RXPARSE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "RXPARSE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except results and errors.
    #[arg(short, long, env = "RXPARSE_QUIET")]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    let result = runtime.block_on(run(cli));
    // Extractions abandoned at the budget may still occupy the blocking pool.
    runtime.shutdown_background();
    result
}

async fn run(cli: Cli) -> Result<()> {
    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active.
    let show_progress = cli.inputs.len() > 1 && !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let pipeline = build_pipeline(&cli)?;

    // ── Text-only mode ───────────────────────────────────────────────────
    if let Some(ref source) = cli.text {
        let text = read_text(source).await?;
        let outcome = pipeline.process_text(&text);
        return emit(&cli, &[(source.clone(), Ok(outcome))]).await;
    }

    if cli.output.is_some() && cli.inputs.len() > 1 {
        anyhow::bail!(
            "--output takes a single input, got {}",
            cli.inputs.len()
        );
    }

    // ── Extract-only mode ────────────────────────────────────────────────
    if cli.extract_only {
        return extract_only(&cli, &pipeline).await;
    }

    // ── Run ──────────────────────────────────────────────────────────────
    let bar = show_progress.then(|| progress_bar(cli.inputs.len()));
    let results = process_all(&cli, &pipeline, bar.as_ref()).await;
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    emit(&cli, &results).await
}

/// Map CLI args to a `Pipeline`.
fn build_pipeline(cli: &Cli) -> Result<Pipeline> {
    let mut builder = ExtractionConfig::builder()
        .substantial_threshold(cli.threshold)
        .render_scale(cli.render_scale)
        .ocr_language(cli.lang.clone())
        .timeout_secs(cli.timeout)
        .download_timeout_secs(cli.download_timeout)
        .max_payload_bytes(cli.max_payload_mb.saturating_mul(1024 * 1024));

    if let Some(ref dir) = cli.tessdata {
        builder = builder.tessdata_dir(dir.clone());
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library_path(lib.clone());
    }

    let config = builder.build().context("Invalid configuration")?;
    debug!(
        "Configuration: {}",
        serde_json::to_string(&config).unwrap_or_default()
    );

    Pipeline::new(config, ParserConfig::default()).context("Invalid parser configuration")
}

fn progress_bar(total: usize) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    let style = ProgressStyle::with_template(
        "{spinner:.cyan} {prefix:.bold}  \
         [{bar:42.green/238}] {pos:>3}/{len} documents  \
         ⏱ {elapsed_precise}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("█▉▊▋▌▍▎▏  ")
    .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
    bar.set_style(style);
    bar.set_prefix("Parsing");
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

type InputResult = (String, Result<ParseOutcome, PrescriptionError>);

/// Process every input with bounded concurrency, returning results in
/// input order.
async fn process_all(cli: &Cli, pipeline: &Pipeline, bar: Option<&ProgressBar>) -> Vec<InputResult> {
    let mut results: Vec<(usize, InputResult)> = stream::iter(cli.inputs.iter().enumerate())
        .map(|(idx, input)| async move {
            let result = pipeline.process(input).await;
            if let Some(bar) = bar {
                bar.println(match &result {
                    Ok(o) => format!(
                        "  {} {}  {}",
                        green("✓"),
                        input,
                        dim(&format!("{} medication(s)", o.medications_found))
                    ),
                    Err(e) => format!("  {} {}  {}", red("✗"), input, red(&first_line(e))),
                });
                bar.inc(1);
            }
            (idx, (input.clone(), result))
        })
        .buffer_unordered(cli.concurrency.max(1))
        .collect()
        .await;

    results.sort_by_key(|(idx, _)| *idx);
    results.into_iter().map(|(_, r)| r).collect()
}

/// Print or write results; fails if any input failed.
async fn emit(cli: &Cli, results: &[InputResult]) -> Result<()> {
    if let Some(ref path) = cli.output {
        if let Some((input, Ok(outcome))) = results.first() {
            write_outcome(outcome, path)
                .await
                .with_context(|| format!("Failed to save results for {input}"))?;
            if !cli.quiet {
                eprintln!(
                    "{}  {} medication(s)  →  {}",
                    green("✔"),
                    outcome.medications_found,
                    bold(&path.display().to_string())
                );
            }
        }
    } else if cli.json {
        print_json(results)?;
    } else {
        print_listing(results);
    }

    let failed: Vec<&InputResult> = results.iter().filter(|(_, r)| r.is_err()).collect();
    if failed.is_empty() {
        return Ok(());
    }
    if results.len() == 1 {
        if let (input, Err(e)) = failed[0] {
            anyhow::bail!("Failed to process {input}: {e}");
        }
    }
    anyhow::bail!("{} of {} inputs failed", failed.len(), results.len())
}

fn print_json(results: &[InputResult]) -> Result<()> {
    let envelope = |result: &Result<ParseOutcome, PrescriptionError>| -> Result<serde_json::Value> {
        Ok(match result {
            Ok(outcome) => serde_json::to_value(outcome)?,
            Err(e) => serde_json::to_value(ErrorOutcome::from(e))?,
        })
    };

    let json = if let [(_, result)] = results {
        envelope(result)?
    } else {
        let mut items = Vec::with_capacity(results.len());
        for (input, result) in results {
            let mut value = envelope(result)?;
            if let Some(obj) = value.as_object_mut() {
                obj.insert("input".into(), serde_json::Value::String(input.clone()));
            }
            items.push(value);
        }
        serde_json::Value::Array(items)
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&json).context("Failed to serialise output")?
    );
    Ok(())
}

fn print_listing(results: &[InputResult]) {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (input, result) in results {
        match result {
            Ok(outcome) => {
                let chars = outcome
                    .extracted_text_length
                    .map(|n| format!("  {n} chars extracted"))
                    .unwrap_or_default();
                let _ = writeln!(
                    out,
                    "{} {}  {}{}",
                    if outcome.medications_found > 0 {
                        green("✔")
                    } else {
                        cyan("◆")
                    },
                    bold(input),
                    format!("{} medication(s)", outcome.medications_found),
                    dim(&chars)
                );
                for (i, med) in outcome.medications.iter().enumerate() {
                    let _ = writeln!(
                        out,
                        "  {:>2}. {:<24} {:<14} {}",
                        i + 1,
                        med.name,
                        med.dosage,
                        med.frequency
                    );
                }
            }
            Err(e) => {
                let _ = writeln!(out, "{} {}  {}", red("✘"), bold(input), red(&first_line(e)));
            }
        }
    }
}

/// `--extract-only`: print extracted text (or the extraction report as JSON).
async fn extract_only(cli: &Cli, pipeline: &Pipeline) -> Result<()> {
    let multi = cli.inputs.len() > 1;
    let mut reports = Vec::new();

    for input in &cli.inputs {
        let extraction = pipeline
            .extract(input)
            .await
            .with_context(|| format!("Failed to extract {input}"))?;

        if cli.json {
            let mut value = serde_json::to_value(&extraction)?;
            if let Some(obj) = value.as_object_mut() {
                obj.insert("input".into(), serde_json::Value::String(input.clone()));
            }
            reports.push(value);
        } else {
            if multi {
                println!("==> {input} <==");
            }
            print!("{}", extraction.text);
            if !extraction.text.ends_with('\n') {
                println!();
            }
            if !cli.quiet {
                let via = extraction
                    .final_strategy()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "nothing".into());
                eprintln!(
                    "{}",
                    dim(&format!(
                        "{} chars via {} in {}ms",
                        extraction.text_len(),
                        via,
                        extraction.duration_ms
                    ))
                );
            }
        }
    }

    if cli.json {
        let json = if reports.len() == 1 {
            reports.remove(0)
        } else {
            serde_json::Value::Array(reports)
        };
        println!("{}", serde_json::to_string_pretty(&json)?);
    }
    Ok(())
}

/// Read the `--text` source.
async fn read_text(source: &str) -> Result<String> {
    if source == "-" {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("Failed to read text from stdin")?;
        Ok(text)
    } else {
        tokio::fs::read_to_string(source)
            .await
            .with_context(|| format!("Failed to read text from {source}"))
    }
}

/// First line of an error, truncated to keep listings tidy.
fn first_line(e: &PrescriptionError) -> String {
    let msg = e.to_string();
    let line = msg.lines().next().unwrap_or_default();
    if line.chars().count() > 80 {
        let cut: String = line.chars().take(79).collect();
        format!("{cut}\u{2026}")
    } else {
        line.to_string()
    }
}
