//! Formfill CLI
//!
//! Fills a scanned form from recorded OCR lines and a patient record.
//!
//! ```bash
//! formfill --ocr lines.json --patient patient.json --image page.png --out filled.png
//! formfill --ocr lines.json --patient patient.json --summary summary.txt --pdf summary.pdf
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use image::{DynamicImage, GenericImageView, Rgba};
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use formfill::config::{ConfigError, EngineConfig};
use formfill::ocr::{OcrEngine, OcrError, RecordedOcr};
use formfill::pipeline::matching::{EmbeddingError, NoEmbedding, VectorTable, WordEmbedding};
use formfill::pipeline::PipelineError;
use formfill::render::summary::{render_pdf, render_text};
use formfill::render::{load_font, render_page, PageSize, RenderError, SignatureData};
use formfill::session::SessionError;
use formfill::{AutofillSession, Pipeline};

#[derive(Parser)]
#[command(name = "formfill")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Detect form fields on a scanned page and fill them from a patient record", long_about = None)]
struct Cli {
    /// Recorded OCR lines (JSON array or {"lines": [...]})
    #[arg(long)]
    ocr: PathBuf,

    /// Patient record (any JSON document)
    #[arg(long)]
    patient: PathBuf,

    /// Page images, in page order. Repeat for multi-page forms.
    #[arg(long = "image")]
    images: Vec<PathBuf>,

    /// Filled PNG output for the first page; later pages get a `-<n>` suffix
    #[arg(long)]
    out: Option<PathBuf>,

    /// Write the text summary here instead of stdout
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Write a PDF summary
    #[arg(long)]
    pdf: Option<PathBuf>,

    /// Export the session (fields + groups) as JSON
    #[arg(long = "session-json")]
    session_json: Option<PathBuf>,

    /// Engine configuration (JSON)
    #[arg(long, env = "FORMFILL_CONFIG")]
    config: Option<PathBuf>,

    /// TrueType font for drawn values
    #[arg(long, env = "FORMFILL_FONT")]
    font: Option<PathBuf>,

    /// Signature image (PNG or JPEG)
    #[arg(long)]
    signature: Option<PathBuf>,

    /// Word vectors (GloVe / word2vec text) for semantic matching
    #[arg(long, env = "FORMFILL_EMBEDDINGS")]
    embeddings: Option<PathBuf>,

    /// Use the ONNX sentence embedder from the models directory
    #[cfg(feature = "onnx-embeddings")]
    #[arg(long, conflicts_with = "embeddings")]
    onnx: bool,
}

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ocr(#[from] OcrError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error("Cannot open image {path}: {source}")]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Invalid patient JSON in {path}: {source}")]
    Patient {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[cfg(feature = "onnx-embeddings")]
    #[error("Embedding model directory is unknown on this platform")]
    NoModelDir,
}

#[tokio::main]
async fn main() -> ExitCode {
    formfill::init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "formfill failed");
            eprintln!("formfill: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let ink = {
        let [r, g, b] = config.render.ink_rgb;
        Rgba([r, g, b, 255])
    };

    let pipeline = Pipeline::new(config, load_embedding(&cli)?);
    let mut session = AutofillSession::new(pipeline.clone());

    if let Some(path) = &cli.signature {
        let bytes = read(path)?;
        session.set_signature(Some(SignatureData::from_png_bytes(&bytes)?));
    }

    let ocr = RecordedOcr::from_path(&cli.ocr)?;
    let patient: Value = serde_json::from_slice(&read(&cli.patient)?).map_err(|source| CliError::Patient {
        path: cli.patient.clone(),
        source,
    })?;
    let pages = cli
        .images
        .iter()
        .map(|path| {
            image::open(path).map_err(|source| CliError::Image {
                path: path.clone(),
                source,
            })
        })
        .collect::<Result<Vec<DynamicImage>, _>>()?;

    // Scan → analyze in the background → publish.
    let ticket = session.begin_scan();
    let recognized = match pages.first() {
        Some(page) => ocr.recognize(page),
        None => Ok(ocr.lines().to_vec()),
    };
    let lines = match recognized {
        Ok(lines) => lines,
        Err(e) => {
            session.fail(e.to_string());
            return Err(e.into());
        }
    };
    if !session.complete_ocr(&ticket, &lines)? {
        info!("No text recognized; nothing to fill");
        return Ok(());
    }
    let output = pipeline.analyze_in_background(lines, patient).await?;
    session.publish(&ticket, output)?;

    if let Some(out) = &cli.out {
        let font = load_font(cli.font.as_deref());
        for (index, page) in pages.iter().enumerate() {
            let plan = session.render_plan(index, PageSize::from_dimensions(page.dimensions()));
            let filled = render_page(page, &plan, session.signature(), font.as_ref(), ink);
            let path = page_output_path(out, index);
            filled
                .save(&path)
                .map_err(|source| CliError::Image { path: path.clone(), source })?;
            info!(page = index, path = %path.display(), ops = plan.ops.len(), "Filled page written");
        }
    }

    let has_signature = session.signature().is_some();
    let text = render_text(session.fields(), session.groups(), has_signature);
    match &cli.summary {
        Some(path) => write(path, text.as_bytes())?,
        None => print!("{text}"),
    }

    if let Some(path) = &cli.pdf {
        let bytes = render_pdf("Form fill summary", session.fields(), session.groups(), has_signature)?;
        write(path, &bytes)?;
    }

    if let Some(path) = &cli.session_json {
        write(path, session.to_json()?.as_bytes())?;
    }

    Ok(())
}

fn load_embedding(cli: &Cli) -> Result<Arc<dyn WordEmbedding>, CliError> {
    #[cfg(feature = "onnx-embeddings")]
    if cli.onnx {
        use formfill::pipeline::matching::{ModelDistance, OnnxEmbedder};
        let dir = formfill::config::embedding_model_dir().ok_or(CliError::NoModelDir)?;
        let embedder = OnnxEmbedder::load(&dir)?;
        info!(dir = %dir.display(), "ONNX embedder loaded");
        return Ok(Arc::new(ModelDistance::new(embedder)));
    }

    match &cli.embeddings {
        Some(path) => {
            let table = VectorTable::load(path)?;
            info!(words = table.len(), path = %path.display(), "Word vectors loaded");
            Ok(Arc::new(table))
        }
        None => Ok(Arc::new(NoEmbedding)),
    }
}

/// `out.png` for page 0, `out-1.png`, `out-2.png`… after that.
fn page_output_path(out: &Path, index: usize) -> PathBuf {
    if index == 0 {
        return out.to_path_buf();
    }
    let stem = out.file_stem().and_then(|s| s.to_str()).unwrap_or("page");
    let ext = out.extension().and_then(|s| s.to_str()).unwrap_or("png");
    out.with_file_name(format!("{stem}-{index}.{ext}"))
}

fn read(path: &Path) -> Result<Vec<u8>, CliError> {
    std::fs::read(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write(path: &Path, bytes: &[u8]) -> Result<(), CliError> {
    std::fs::write(path, bytes).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}
