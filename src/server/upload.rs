//! Multipart parsing for `/solve`.
//!
//! An attached image is spooled to a uniquely named temp file. The file lives
//! exactly as long as its [`UploadedAsset`], so it is removed on every path
//! out of the request.

use axum::extract::multipart::{ Multipart, MultipartError };
use log::{ debug, warn };
use std::path::{ Path, PathBuf };
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::llm::chat::ImageInput;
use crate::models::solve::DEFAULT_QUESTION;

const PROMPT_FIELD: &str = "prompt";
const IMAGE_FIELD: &str = "image";
const FALLBACK_MIME: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to read multipart body: {0}")]
    Multipart(#[from] MultipartError),
    #[error("failed to stage upload: {0}")]
    Io(#[from] std::io::Error),
    #[error("unreadable request body: {0}")]
    Rejected(String),
}

#[derive(Debug)]
pub struct UploadedAsset {
    file: NamedTempFile,
    mime_type: String,
}

impl UploadedAsset {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub async fn read(&self) -> Result<ImageInput, UploadError> {
        let bytes = tokio::fs::read(self.path()).await?;
        Ok(ImageInput {
            mime_type: self.mime_type.clone(),
            bytes,
        })
    }
}

#[derive(Debug, Default)]
pub struct SolveForm {
    pub prompt: Option<String>,
    pub image: Option<UploadedAsset>,
}

impl SolveForm {
    pub fn question(&self) -> String {
        self.prompt
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_QUESTION)
            .to_string()
    }
}

pub async fn parse_solve_form(
    mut multipart: Multipart,
    upload_dir: &Path
) -> Result<SolveForm, UploadError> {
    let mut form = SolveForm::default();

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(PROMPT_FIELD) => {
                form.prompt = Some(field.text().await?);
            }
            Some(IMAGE_FIELD) if form.image.is_some() => {
                warn!("Ignoring additional image field; only one image is accepted");
            }
            Some(IMAGE_FIELD) => {
                let mime_type = field
                    .content_type()
                    .map(str::to_string)
                    .or_else(|| {
                        field
                            .file_name()
                            .and_then(|name| mime_guess::from_path(name).first_raw())
                            .map(str::to_string)
                    })
                    .unwrap_or_else(|| FALLBACK_MIME.to_string());

                let file = tempfile::Builder::new().prefix("upload-").tempfile_in(upload_dir)?;
                let mut out = tokio::fs::File::from_std(file.as_file().try_clone()?);
                let mut size = 0usize;
                while let Some(chunk) = field.chunk().await? {
                    size += chunk.len();
                    out.write_all(&chunk).await?;
                }
                out.flush().await?;
                debug!("Staged {} byte upload ({}) at {}", size, mime_type, file.path().display());

                form.image = Some(UploadedAsset { file, mime_type });
            }
            other => {
                debug!("Ignoring unexpected multipart field {:?}", other);
            }
        }
    }

    Ok(form)
}

pub fn default_upload_dir(configured: Option<PathBuf>) -> PathBuf {
    configured.unwrap_or_else(std::env::temp_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_defaults_when_blank() {
        let mut form = SolveForm::default();
        assert_eq!(form.question(), DEFAULT_QUESTION);
        form.prompt = Some("   \n".into());
        assert_eq!(form.question(), DEFAULT_QUESTION);
        form.prompt = Some("  what is 2+2? ".into());
        assert_eq!(form.question(), "what is 2+2?");
    }

    #[tokio::test]
    async fn test_asset_file_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let file = tempfile::Builder::new().prefix("upload-").tempfile_in(dir.path()).unwrap();
        std::fs::write(file.path(), b"bytes").unwrap();
        let asset = UploadedAsset { file, mime_type: "image/png".into() };
        let path = asset.path().to_path_buf();

        let image = asset.read().await.unwrap();
        assert_eq!(image.bytes, b"bytes");
        assert_eq!(image.mime_type, "image/png");
        assert!(path.exists());

        drop(asset);
        assert!(!path.exists());
    }
}
