//! CLI binary for docbot.
//!
//! Runs the bot over the JSON-lines console transport: one inbound event per
//! line on stdin, one outbound action per line on stdout, logs on stderr (or
//! in `--log-file`).

use anyhow::{Context, Result};
use clap::Parser;
use docbot::transport::console::parse_event;
use docbot::{Bot, BotConfig, ConsoleTransport, Engines, OutputFormat, Quality};
use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"
INPUT (stdin, one JSON object per line):
  {"user":1,"chat":1,"first_name":"Ada","type":"text","text":"/start"}
  {"user":1,"chat":1,"type":"photo","file_id":"/path/to/scan.jpg"}
  {"user":1,"chat":1,"type":"document","file_id":"/path/to/report.docx","file_name":"report.docx"}
  {"user":1,"chat":1,"type":"callback","data":"convert_images_pdf","message_id":2}

OUTPUT (stdout, one JSON object per line):
  {"op":"send_text","chat":1,"message_id":1,"text":"...","keyboard":{...}}
  {"op":"edit_text","chat":1,"message_id":2,"text":"..."}
  {"op":"send_document","chat":1,"path":"...","file_name":"...","caption":"..."}

ENGINES:
  PDF work needs the pdfium shared library (PDFIUM_LIB_PATH or the system
  library path). Word/Excel/text conversion needs LibreOffice on PATH, or
  LIBREOFFICE_PATH.
"#;

/// Document-conversion chat bot over a JSON-lines console transport.
#[derive(Parser, Debug)]
#[command(
    name = "docbot",
    version,
    about = "Document-conversion chat bot (JSON lines on stdin/stdout)",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Directory for per-user uploads and results (default: a temp dir).
    #[arg(long, env = "WORK_DIR")]
    work_dir: Option<PathBuf>,

    /// Maximum upload size in bytes.
    #[arg(long, env = "MAX_FILE_SIZE", default_value_t = 52_428_800)]
    max_file_size: u64,

    /// Images per PDF before a warning is sent.
    #[arg(long, env = "MAX_IMAGES_PER_PDF", default_value_t = 50)]
    max_images_per_pdf: usize,

    /// Size of the conversion worker pool.
    #[arg(long, env = "MAX_CONCURRENT_CONVERSIONS", default_value_t = 5)]
    max_concurrent_conversions: usize,

    /// Maximum length of a stored or custom filename.
    #[arg(long, env = "MAX_FILENAME_LENGTH", default_value_t = 255)]
    max_filename_length: usize,

    /// Default quality for new users: low, medium, high, ultra.
    #[arg(long, env = "DEFAULT_IMAGE_QUALITY", default_value = "medium")]
    default_image_quality: String,

    /// Default PDF → images format for new users: PNG or JPEG.
    #[arg(long, env = "DEFAULT_OUTPUT_FORMAT", default_value = "PNG")]
    default_output_format: String,

    /// Enable auto-enhance for new users.
    #[arg(long, env = "AUTO_ENHANCE_DEFAULT")]
    auto_enhance_default: bool,

    /// Check uploaded images decode and PDFs carry the %PDF header.
    #[arg(long, env = "ENABLE_FILE_VALIDATION")]
    enable_file_validation: bool,

    /// LibreOffice executable, tried before `libreoffice` and `soffice`.
    #[arg(long, env = "LIBREOFFICE_PATH")]
    libreoffice_path: Option<PathBuf>,

    /// Directory containing the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib_path: Option<PathBuf>,

    /// Seconds before an unanswered custom-name prompt is abandoned.
    #[arg(long, env = "NAMING_TIMEOUT_SECS", default_value_t = 300)]
    naming_timeout_secs: u64,

    /// Seconds allowed for one LibreOffice conversion.
    #[arg(long, env = "OFFICE_TIMEOUT_SECS", default_value_t = 120)]
    office_timeout_secs: u64,

    /// Log filter when RUST_LOG is unset (e.g. info, debug, docbot=trace).
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Append logs to this file instead of stderr.
    #[arg(long, env = "LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOCBOT_VERBOSE")]
    verbose: bool,

    /// Only log errors.
    #[arg(short, long, env = "DOCBOT_QUIET")]
    quiet: bool,
}

fn init_logging(cli: &Cli) -> Result<()> {
    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        cli.log_level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match &cli.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    // ── Configuration ────────────────────────────────────────────────────
    let quality = cli.default_image_quality.parse::<Quality>().unwrap_or_else(|e| {
        warn!("{e}; falling back to medium");
        Quality::Medium
    });
    let format = cli.default_output_format.parse::<OutputFormat>().unwrap_or_else(|e| {
        warn!("{e}; falling back to PNG");
        OutputFormat::Png
    });

    // Held until exit so a default work dir is removed on shutdown.
    let mut _scratch = None;
    let work_dir = match &cli.work_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create work dir {}", dir.display()))?;
            dir.clone()
        }
        None => {
            let tmp = tempfile::Builder::new()
                .prefix("docbot-")
                .tempdir()
                .context("Failed to create temporary work dir")?;
            let path = tmp.path().to_path_buf();
            _scratch = Some(tmp);
            path
        }
    };

    let mut builder = BotConfig::builder()
        .work_dir(&work_dir)
        .max_file_size(cli.max_file_size)
        .max_images_per_pdf(cli.max_images_per_pdf)
        .max_concurrent_conversions(cli.max_concurrent_conversions)
        .max_filename_length(cli.max_filename_length)
        .default_quality(quality)
        .default_format(format)
        .auto_enhance_default(cli.auto_enhance_default)
        .validate_files(cli.enable_file_validation)
        .naming_timeout(Duration::from_secs(cli.naming_timeout_secs))
        .office_timeout(Duration::from_secs(cli.office_timeout_secs));
    if let Some(path) = &cli.libreoffice_path {
        builder = builder.office_path(path);
    }
    if let Some(path) = &cli.pdfium_lib_path {
        builder = builder.pdfium_lib_path(path);
    }
    let config = builder.build().context("Invalid configuration")?;

    info!(
        work_dir = %config.work_dir.display(),
        max_file_size = config.max_file_size,
        max_images = config.max_images_per_pdf,
        workers = config.max_concurrent_conversions,
        quality = %config.default_quality,
        format = %config.default_format,
        validate = config.validate_files,
        "docbot ready"
    );

    let engines = Arc::new(Engines::new(&config));
    let bot = Arc::new(Bot::new(config, Arc::new(ConsoleTransport::stdout()), engines));

    // ── Event loop ───────────────────────────────────────────────────────
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut tasks = JoinSet::new();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                match parse_event(&line) {
                    Ok(Some(event)) => {
                        let bot = Arc::clone(&bot);
                        tasks.spawn(async move { bot.handle(event).await });
                    }
                    Ok(None) => {}
                    Err(e) => warn!("skipping input line: {e}"),
                }
            }
            Some(done) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(e) = done {
                    error!("event task failed: {e}");
                }
            }
        }
    }

    // Let in-flight events finish after stdin closes.
    while let Some(done) = tasks.join_next().await {
        if let Err(e) = done {
            error!("event task failed: {e}");
        }
    }
    info!("stdin closed, shutting down");
    Ok(())
}
