//! scanlayer - OCR scanned PDFs and images from the command line.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use scanlayer::{
    Document, LanguageChoice, LanguageDetector, OutputFormat, PageSelection, ProgressEvent, RecognitionRequest,
    Recognizer, ScanlayerConfig,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "scanlayer")]
#[command(about = "OCR scanned documents into text, hOCR, TSV or searchable PDF")]
#[command(version)]
struct Cli {
    /// Config file (TOML, YAML or JSON); defaults to a discovered scanlayer.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recognize the text of a PDF or image
    Recognize {
        /// Input PDF or image
        file: PathBuf,

        /// Pages to recognize: all, first, N or A-B
        #[arg(short, long, default_value = "all", value_parser = PageSelection::from_str)]
        pages: PageSelection,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = FormatArg::Text)]
        format: FormatArg,

        /// Language code (e.g. eng, deu, chi_sim) or auto
        #[arg(short, long, default_value = "auto", value_parser = LanguageChoice::from_str)]
        language: LanguageChoice,

        /// Output file; stdout when omitted (required for pdf)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the language detected for a file
    DetectLanguage {
        file: PathBuf,

        /// Also sample the content (requires the file and a recognition engine)
        #[arg(long)]
        scan: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Text,
    Hocr,
    Tsv,
    Pdf,
}

impl From<FormatArg> for OutputFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Hocr => OutputFormat::Hocr,
            FormatArg::Tsv => OutputFormat::Tsv,
            FormatArg::Pdf => OutputFormat::SearchablePdf,
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<ScanlayerConfig> {
    let config = match path {
        Some(path) => ScanlayerConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ScanlayerConfig::discover()
            .context("Failed to discover scanlayer.toml")?
            .unwrap_or_default(),
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn print_progress(event: ProgressEvent) {
    eprintln!("[{:>3}%] {}", event.percent, event.message);
}

async fn recognize(
    config: ScanlayerConfig,
    file: &Path,
    selection: PageSelection,
    format: OutputFormat,
    language: LanguageChoice,
    output: Option<&Path>,
) -> Result<()> {
    if format == OutputFormat::SearchablePdf && output.is_none() {
        bail!("PDF output is binary; use --output to choose a file");
    }

    let document = Document::open(file).with_context(|| format!("Failed to open {}", file.display()))?;
    let recognizer = Recognizer::with_defaults(config)?;
    let request = RecognitionRequest {
        selection,
        format,
        language,
    };

    let result = recognizer
        .run_recognition(&document, &request, &print_progress, None)
        .await
        .with_context(|| format!("Recognition of {} failed", file.display()))?;

    eprintln!(
        "{} page(s), language {}, mean confidence {:.1}",
        result.pages_processed, result.language, result.confidence
    );

    let bytes = result.output.into_bytes();
    match output {
        Some(path) => {
            std::fs::write(path, &bytes).with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Wrote {} bytes to {}", bytes.len(), path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes)?;
            if !bytes.ends_with(b"\n") {
                stdout.write_all(b"\n")?;
            }
        }
    }
    Ok(())
}

async fn detect_language(config: ScanlayerConfig, file: &Path, scan: bool) -> Result<()> {
    let detection = if scan {
        let document = Document::open(file).with_context(|| format!("Failed to open {}", file.display()))?;
        Recognizer::with_defaults(config)?.detect_language(&document).await
    } else {
        LanguageDetector::new(&config).from_filename(&file_name(file))
    };
    println!("{}", serde_json::to_string_pretty(&detection)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "scanlayer=debug" } else { "scanlayer=info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Recognize {
            file,
            pages,
            format,
            language,
            output,
        } => recognize(config, &file, pages, format.into(), language, output.as_deref()).await,
        Commands::DetectLanguage { file, scan } => detect_language(config, &file, scan).await,
    }
}
