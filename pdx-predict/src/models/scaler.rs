//! Fitted affine feature scaler
//!
//! Standard-score transform exported at training time as JSON
//! (`{"mean": [...], "scale": [...]}`). Application is best-effort by
//! contract: dimension mismatches return `None` and leave the caller's
//! vector untouched.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Affine (standard-score) transform fitted on the training features.
#[derive(Debug, Clone, Deserialize)]
pub struct AffineScaler {
    mean: Vec<f32>,
    scale: Vec<f32>,
}

impl AffineScaler {
    pub fn new(mean: Vec<f32>, scale: Vec<f32>) -> Self {
        Self { mean, scale }
    }

    /// Load from a JSON artifact file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scaler: {}", path.display()))?;
        let scaler: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse scaler: {}", path.display()))?;
        if scaler.mean.len() != scaler.scale.len() {
            return Err(anyhow!(
                "Scaler mean/scale length mismatch: {} vs {}",
                scaler.mean.len(),
                scaler.scale.len()
            ));
        }
        Ok(scaler)
    }

    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    /// Apply `(x - mean) / scale` elementwise.
    ///
    /// Returns `None` on dimension mismatch. A non-positive scale entry
    /// (a constant training column) centers without dividing.
    pub fn transform(&self, values: &[f32]) -> Option<Vec<f32>> {
        if values.len() != self.mean.len() {
            return None;
        }
        Some(
            values
                .iter()
                .zip(self.mean.iter().zip(self.scale.iter()))
                .map(|(&x, (&mean, &scale))| {
                    let centered = x - mean;
                    if scale > 0.0 {
                        centered / scale
                    } else {
                        centered
                    }
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_applies_standard_score() {
        let scaler = AffineScaler::new(vec![1.0, 2.0], vec![2.0, 4.0]);
        let out = scaler.transform(&[3.0, 2.0]).unwrap();
        assert_eq!(out, vec![1.0, 0.0]);
    }

    #[test]
    fn mismatched_length_returns_none() {
        let scaler = AffineScaler::new(vec![0.0; 4], vec![1.0; 4]);
        assert!(scaler.transform(&[1.0, 2.0]).is_none());
    }

    #[test]
    fn zero_scale_centers_without_dividing() {
        let scaler = AffineScaler::new(vec![5.0], vec![0.0]);
        assert_eq!(scaler.transform(&[7.0]).unwrap(), vec![2.0]);
    }

    #[test]
    fn load_rejects_mismatched_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scaler.json");
        std::fs::write(&path, r#"{"mean": [0.0, 1.0], "scale": [1.0]}"#).unwrap();
        assert!(AffineScaler::load(&path).is_err());
    }

    #[test]
    fn load_parses_valid_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scaler.json");
        std::fs::write(&path, r#"{"mean": [0.5, 0.5], "scale": [1.0, 2.0]}"#).unwrap();
        let scaler = AffineScaler::load(&path).unwrap();
        assert_eq!(scaler.len(), 2);
    }
}
