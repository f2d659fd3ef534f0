pub mod config;
pub mod models;
pub mod ocr; // OCR collaborator boundary
pub mod pipeline; // Extraction, association, matching
pub mod render; // Placement, raster output, summaries
pub mod session; // Phase machine + manual edits

use tracing_subscriber::EnvFilter;

pub use pipeline::{AnalysisOutput, PatientData, Pipeline};
pub use session::{AutofillSession, Phase, SessionError};

/// Install the global `tracing` subscriber. `RUST_LOG` overrides the
/// default filter. Calling it again is a no-op.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();

    tracing::debug!("{} v{} tracing initialised", config::APP_NAME, config::APP_VERSION);
}
