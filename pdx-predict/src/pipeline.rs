//! Shared screening pipeline
//!
//! One synchronous flow behind every entry point: decode the uploaded
//! media, extract features, score each requested modality, fuse, and
//! optionally compose the PDF report. Stage failures are captured as named
//! entries in a `details` map instead of aborting the request; the run only
//! fails outright when no modality produced a usable result.

use crate::extract::{self, ImageFeatures};
use crate::models::ModelRegistry;
use crate::predict;
use crate::report::{compose_report, ReportInputs};
use crate::{audio, extract::spectrogram_png};
use pdx_common::{Config, FeatureVector, ModalityResult, UserInfo};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// Per-request behavior switches, set by the entry point.
#[derive(Debug, Clone)]
pub struct RequestFlags {
    pub use_audio: bool,
    pub use_image: bool,
    pub combine_features: bool,
    /// Persist the spectrogram PNG and return a download link.
    pub return_spectrogram: bool,
    /// Persist the heatmap PNG and return a download link.
    pub return_heatmap: bool,
    pub generate_report: bool,
    /// Only the report entry point maps the confidence band to a
    /// borderline verdict.
    pub apply_borderline: bool,
}

impl Default for RequestFlags {
    fn default() -> Self {
        Self {
            use_audio: true,
            use_image: false,
            // Concatenation-based fusion is an opt-in advanced mode; the
            // default policy is label OR plus probability max.
            combine_features: false,
            return_spectrogram: false,
            return_heatmap: false,
            generate_report: false,
            apply_borderline: false,
        }
    }
}

/// One screening request, media already staged on disk.
#[derive(Debug, Default)]
pub struct PipelineRequest {
    pub flags: RequestFlags,
    pub user: UserInfo,
    pub audio_path: Option<PathBuf>,
    pub image_path: Option<PathBuf>,
}

/// JSON body returned by the predict and report entry points.
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub result: String,
    pub final_label: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_confidence: Option<f64>,
    pub fusion_used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub borderline: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_prediction: Option<ModalityResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_prediction: Option<ModalityResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fused_prediction: Option<ModalityResult>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spectrogram_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heatmap_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_error: Option<String>,
}

/// Terminal pipeline failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Every requested modality failed; `details` says how.
    #[error("No valid prediction")]
    NoPrediction { details: BTreeMap<String, String> },
}

/// Run the full screening pipeline for one request.
pub fn run(config: &Config, registry: &ModelRegistry, request: &PipelineRequest) -> Result<PredictResponse, PipelineError> {
    let mut details: BTreeMap<String, String> = BTreeMap::new();

    // Audio side: decode, extract biomarkers, score.
    let mut decoded_audio = None;
    let mut audio_features: Option<FeatureVector> = None;
    let mut audio_result: Option<ModalityResult> = None;
    if request.flags.use_audio {
        if let Some(path) = request.audio_path.as_deref() {
            match audio::decode_for_analysis(path) {
                Ok(audio) => {
                    let scaler = registry.audio_scaler();
                    let features = extract::extract_audio_features(
                        &audio.samples,
                        audio.sample_rate,
                        scaler.as_deref(),
                    );
                    match predict::predict_audio(registry, &features) {
                        Ok(result) => audio_result = Some(result),
                        Err(e) => {
                            warn!("Audio prediction failed: {}", e);
                            details.insert("audio_error".to_string(), e.to_string());
                        }
                    }
                    audio_features = Some(features);
                    decoded_audio = Some(audio);
                }
                Err(e) => {
                    warn!("Audio decode failed: {:#}", e);
                    details.insert("audio_error".to_string(), format!("{:#}", e));
                }
            }
        }
    }

    // Image side: decode, preprocess, score.
    let mut decoded_image = None;
    let mut image_features: Option<ImageFeatures> = None;
    let mut image_result: Option<ModalityResult> = None;
    if request.flags.use_image {
        if let Some(path) = request.image_path.as_deref() {
            match image::open(path) {
                Ok(img) => {
                    let features = extract::extract_image_features(&img);
                    match predict::predict_image(registry, &features) {
                        Ok(result) => image_result = Some(result),
                        Err(e) => {
                            warn!("Image prediction failed: {}", e);
                            details.insert("image_error".to_string(), e.to_string());
                        }
                    }
                    image_features = Some(features);
                    decoded_image = Some(img);
                }
                Err(e) => {
                    warn!("Image decode failed: {}", e);
                    details.insert("image_error".to_string(), e.to_string());
                }
            }
        }
    }

    // Combined feature vector for the fusion artifact: biomarkers followed
    // by scan proxies, each side zero-filled when its modality is absent.
    let combined: Option<Vec<f32>> = if request.flags.combine_features
        && (audio_features.is_some() || image_features.is_some())
    {
        let mut v = audio_features
            .as_ref()
            .map(|f| f.as_slice().to_vec())
            .unwrap_or_else(|| FeatureVector::zeroed().as_slice().to_vec());
        match image_features.as_ref() {
            Some(f) => v.extend_from_slice(&f.proxies),
            None => v.extend(std::iter::repeat(0.0).take(extract::IMAGE_PROXY_NAMES.len())),
        }
        Some(v)
    } else {
        None
    };

    let outcome = predict::fuse(
        audio_result.as_ref(),
        image_result.as_ref(),
        registry.fusion_classifier(),
        combined.as_deref(),
    );
    if let Some(e) = outcome.error {
        details.insert("fusion_error".to_string(), e);
    }
    let Some(mut decision) = outcome.decision else {
        return Err(PipelineError::NoPrediction { details });
    };

    let mut borderline = None;
    if request.flags.apply_borderline {
        if let Some(confidence) = decision.final_confidence {
            let (label, is_borderline) = predict::borderline_policy(confidence);
            decision.final_label = label;
            decision.borderline = is_borderline;
            borderline = Some(is_borderline);
        }
    }

    let mut response = PredictResponse {
        result: if decision.final_label == 1 {
            "Parkinsons".to_string()
        } else {
            "No Parkinsons".to_string()
        },
        final_label: decision.final_label,
        final_confidence: decision.final_confidence,
        fusion_used: decision.fusion_used,
        borderline,
        audio_prediction: audio_result,
        image_prediction: image_result,
        fused_prediction: outcome.fused,
        details: BTreeMap::new(),
        spectrogram_url: None,
        heatmap_url: None,
        report_file: None,
        report_url: None,
        report_error: None,
    };

    // Side outputs: rendered when requested standalone or for the report.
    let want_spectrogram = request.flags.generate_report || request.flags.return_spectrogram;
    let want_heatmap = request.flags.generate_report || request.flags.return_heatmap;

    let spectrogram = if want_spectrogram {
        decoded_audio.as_ref().and_then(|audio| {
            match spectrogram_png(&audio.samples, audio.sample_rate) {
                Ok(png) => Some(png),
                Err(e) => {
                    details.insert("spectrogram_error".to_string(), format!("{:#}", e));
                    None
                }
            }
        })
    } else {
        None
    };
    let heatmap = if want_heatmap {
        decoded_image.as_ref().and_then(|img| match extract::render_heatmap_png(img) {
            Ok(png) => Some(png),
            Err(e) => {
                details.insert("heatmap_error".to_string(), format!("{:#}", e));
                None
            }
        })
    } else {
        None
    };

    if request.flags.return_spectrogram {
        if let Some(png) = spectrogram.as_deref() {
            match persist_artifact(config, "spectrogram", "png", png) {
                Ok(url) => response.spectrogram_url = Some(url),
                Err(e) => {
                    details.insert("spectrogram_error".to_string(), e.to_string());
                }
            }
        }
    }
    if request.flags.return_heatmap {
        if let Some(png) = heatmap.as_deref() {
            match persist_artifact(config, "heatmap", "png", png) {
                Ok(url) => response.heatmap_url = Some(url),
                Err(e) => {
                    details.insert("heatmap_error".to_string(), e.to_string());
                }
            }
        }
    }

    if request.flags.generate_report {
        let inputs = ReportInputs {
            user: report_user(&request.user),
            decision: Some(&decision),
            audio: response.audio_prediction.as_ref(),
            image: response.image_prediction.as_ref(),
            fused: response.fused_prediction.as_ref(),
            spectrogram_png: spectrogram.as_deref(),
            heatmap_png: heatmap.as_deref(),
        };
        match compose_report(&inputs) {
            Ok(bytes) => {
                let file_name = format!("pd_report_{}.pdf", Uuid::new_v4().simple());
                let path = config.media_dir.join(&file_name);
                match std::fs::write(&path, &bytes) {
                    Ok(()) => {
                        info!("Report written: {}", path.display());
                        response.report_url = Some(format!("/api/download/{}", file_name));
                        response.report_file = Some(file_name);
                    }
                    Err(e) => {
                        warn!("Report write failed: {}", e);
                        response.report_error = Some(e.to_string());
                    }
                }
            }
            Err(e) => {
                warn!("Report composition failed: {:#}", e);
                response.report_error = Some(format!("{:#}", e));
            }
        }
    }

    response.details = details;
    Ok(response)
}

/// Subject block for the report. A request without a test date gets the
/// current local time so the report always names when it was run.
fn report_user(user: &UserInfo) -> UserInfo {
    let mut user = user.clone();
    if user.test_date.as_deref().map_or(true, |d| d.trim().is_empty()) {
        user.test_date = Some(chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string());
    }
    user
}

/// Write a generated side output to the media directory and return its
/// download URL.
fn persist_artifact(
    config: &Config,
    kind: &str,
    ext: &str,
    bytes: &[u8],
) -> std::io::Result<String> {
    let file_name = format!("{}_{}.{}", kind, Uuid::new_v4().simple(), ext);
    std::fs::write(config.media_dir.join(&file_name), bytes)?;
    Ok(format!("/api/download/{}", file_name))
}

/// Decode an uploaded recording and render its mel spectrogram PNG.
pub fn render_spectrogram(path: &Path) -> anyhow::Result<Vec<u8>> {
    let audio = audio::decode_for_analysis(path)?;
    spectrogram_png(&audio.samples, audio.sample_rate)
}
