//! Multipart form parsing shared by the screening endpoints
//!
//! Uploaded media is staged into request-scoped temp files that are removed
//! when the form value drops, whatever path the request takes afterwards.
//! Field validation is collected per field so the caller gets every problem
//! in one response instead of the first one hit.

use crate::error::{ApiError, ApiResult};
use axum::extract::Multipart;
use pdx_common::UserInfo;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Parsed screening form: identity fields, behavior switches, staged media.
#[derive(Default)]
pub struct ScreeningForm {
    pub user: UserInfo,
    pub audio: Option<NamedTempFile>,
    pub image: Option<NamedTempFile>,
    pub use_audio: Option<bool>,
    pub use_image: Option<bool>,
    pub combine_features: Option<bool>,
    pub return_spectrogram: Option<bool>,
    pub return_heatmap: Option<bool>,
    pub generate_report: Option<bool>,
}

impl ScreeningForm {
    /// Whether the audio modality should run for this request.
    pub fn audio_requested(&self) -> bool {
        self.use_audio.unwrap_or(self.audio.is_some())
    }

    /// Whether the image modality should run for this request.
    pub fn image_requested(&self) -> bool {
        self.use_image.unwrap_or(self.image.is_some())
    }
}

/// Parse the multipart body, staging file fields to disk.
pub async fn parse_screening_form(mut multipart: Multipart) -> ApiResult<ScreeningForm> {
    let mut form = ScreeningForm::default();
    let mut problems: BTreeMap<String, String> = BTreeMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match name.as_str() {
            "audio_file" | "audio" | "image_file" | "image" => {
                let file_name = field.file_name().map(str::to_string);
                let data = field.bytes().await.map_err(|e| {
                    ApiError::BadRequest(format!("Failed to read field {}: {}", name, e))
                })?;
                if data.is_empty() {
                    problems.insert(name, "Empty file upload".to_string());
                    continue;
                }
                match stage_upload(&data, file_name.as_deref()) {
                    Ok(staged) => {
                        debug!(field = %name, bytes = data.len(), "Staged upload");
                        if name.starts_with("audio") {
                            form.audio = Some(staged);
                        } else {
                            form.image = Some(staged);
                        }
                    }
                    Err(e) => return Err(ApiError::Internal(format!("Staging failed: {}", e))),
                }
            }
            "name" | "phone" | "email" | "test_date" => {
                let value = text_field(&name, field).await?;
                if name == "email" && !value.trim().is_empty() && !value.contains('@') {
                    problems.insert(name, "Not a valid email address".to_string());
                    continue;
                }
                let slot = match name.as_str() {
                    "name" => &mut form.user.name,
                    "phone" => &mut form.user.phone,
                    "email" => &mut form.user.email,
                    _ => &mut form.user.test_date,
                };
                if !value.trim().is_empty() {
                    *slot = Some(value);
                }
            }
            "use_audio" | "use_image" | "combine_features" | "return_spectrogram"
            | "return_heatmap" | "generate_report" => {
                let value = text_field(&name, field).await?;
                match parse_bool(&value) {
                    Some(flag) => match name.as_str() {
                        "use_audio" => form.use_audio = Some(flag),
                        "use_image" => form.use_image = Some(flag),
                        "combine_features" => form.combine_features = Some(flag),
                        "return_spectrogram" => form.return_spectrogram = Some(flag),
                        "return_heatmap" => form.return_heatmap = Some(flag),
                        _ => form.generate_report = Some(flag),
                    },
                    None => {
                        problems.insert(name, format!("Not a boolean: {:?}", value));
                    }
                }
            }
            other => {
                debug!(field = %other, "Ignoring unknown form field");
            }
        }
    }

    if form.audio_requested() && form.audio.is_none() {
        problems.insert("audio".to_string(), "Audio requested but no file uploaded".to_string());
    }
    if form.image_requested() && form.image.is_none() {
        problems.insert("image".to_string(), "Image requested but no file uploaded".to_string());
    }
    if !form.audio_requested() && !form.image_requested() {
        problems.insert(
            "media".to_string(),
            "At least one of audio or image is required".to_string(),
        );
    }

    if !problems.is_empty() {
        return Err(ApiError::Validation { details: problems });
    }
    Ok(form)
}

async fn text_field(name: &str, field: axum::extract::multipart::Field<'_>) -> ApiResult<String> {
    field
        .text()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read field {}: {}", name, e)))
}

/// Accepted boolean spellings for form fields.
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// Write upload bytes to a temp file, keeping the original extension so
/// format probing can use it as a hint.
fn stage_upload(data: &[u8], file_name: Option<&str>) -> std::io::Result<NamedTempFile> {
    let suffix = file_name
        .and_then(|n| Path::new(n).extension())
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();
    let mut staged = tempfile::Builder::new()
        .prefix("pdx_upload_")
        .suffix(&suffix)
        .tempfile()?;
    staged.write_all(data)?;
    staged.flush()?;
    Ok(staged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_spellings() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("FALSE"), Some(false));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("yes"), None);
    }

    #[test]
    fn staged_upload_keeps_extension() {
        let staged = stage_upload(b"RIFF", Some("voice.wav")).unwrap();
        assert!(staged.path().to_string_lossy().ends_with(".wav"));
        assert_eq!(std::fs::read(staged.path()).unwrap(), b"RIFF");
    }

    #[test]
    fn requested_modalities_default_to_uploaded_files() {
        let form = ScreeningForm {
            audio: Some(stage_upload(b"x", None).unwrap()),
            ..Default::default()
        };
        assert!(form.audio_requested());
        assert!(!form.image_requested());

        let form = ScreeningForm {
            use_image: Some(true),
            ..Default::default()
        };
        assert!(form.image_requested());
    }
}
