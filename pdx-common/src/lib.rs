//! Shared types and configuration for the PDX screening services
//!
//! Holds the prediction data model (feature vectors, per-modality results,
//! fused decisions), the common error type, and configuration resolution.

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use types::{
    FeatureVector, FusedDecision, ModalityResult, ScoreOutput, UserInfo, AUDIO_FEATURE_LEN,
};
