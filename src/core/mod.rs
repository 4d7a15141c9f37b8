//! Core batch logic.
//!
//! This module contains:
//! - BatchSelection: the ordered store of pending files
//! - BatchProcessor: the sequential per-file pipeline

pub mod processor;
pub mod selection;

// Re-export commonly used types
pub use processor::{
    BatchProcessor, BatchReport, FileOutcome, FileStep, ProcessorOptions, StatusUpdate, StepError,
};
pub use selection::BatchSelection;
