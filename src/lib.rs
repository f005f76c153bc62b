//! # Parotid-Screen: Radiomics Feature Screening Pipeline
//!
//! Batch data-preparation and univariate statistics pipeline for parotid
//! gland MRI radiomics. The library:
//!
//! - **Ingests** per-exam feature files across four modalities (GADO, DIFF,
//!   T1, T2) and aligns them against a per-patient metadata roster
//! - **Assembles** a uniform cohort feature matrix under one stable
//!   composite-key column index
//! - **Screens** every feature column for discriminative power, by
//!   single-feature classifier AUC and by two-sample t-test p-value
//! - **Selects** the top-N features for a downstream classifier
//!
//! Everything is synchronous, single-threaded, and in-memory: the pipeline is
//! a fixed-shape batch job over one study directory, not a service.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use parotid_screen::{ScreenConfig, ScreeningPipeline};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = ScreenConfig::default();
//!     config.data.data_dir = "/data/parotid".into();
//!     config.selection.top_n = 20;
//!
//!     let pipeline = ScreeningPipeline::new(config)?;
//!     let report = pipeline.run()?;
//!
//!     println!("selected features: {:?}", report.selected_keys);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(unsafe_code)]

// Core pipeline stages and data structures
pub mod core {
    //! Core pipeline stages and data structures.

    pub mod aggregate;
    pub mod classifier;
    pub mod cohort;
    pub mod config;
    pub mod errors;
    pub mod identity;
    pub mod matrix;
    pub mod pipeline;
    pub mod significance;
}

// Input-file parsing
pub mod io {
    //! Readers for the roster, overview, and per-exam feature files.

    pub mod features;
    pub mod tables;
}

// Re-export primary types for convenience
pub use crate::core::cohort::{
    ExamRecord, FeatureIndex, FeatureSchema, FeatureSet, FormattedExam, LabelField, MetaField,
    MetadataRow, Modality,
};
pub use crate::core::config::{ScreenConfig, ScreenMethod};
pub use crate::core::errors::{Result, ScreenError};
pub use crate::core::pipeline::{ScreeningPipeline, ScreeningReport};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
