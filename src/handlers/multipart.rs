// handlers/multipart.rs - Single-file multipart extraction shared by upload routes

use axum::{
    extract::{multipart::MultipartError, Multipart},
    http::StatusCode,
};

use crate::error::ApiError;
use crate::services::Upload;

/// Form field the file is expected under. Any field carrying a file name
/// is accepted when this one is absent.
pub const FILE_FIELD: &str = "file";

/// Read the first uploaded file from a multipart body.
pub async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let is_file = field.name() == Some(FILE_FIELD) || field.file_name().is_some();
        if !is_file {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field.bytes().await.map_err(multipart_error)?;
        return Ok(Upload::new(file_name, mime_type, data.to_vec()));
    }

    Err(ApiError::validation_error(
        format!("Multipart body must contain a '{}' file field", FILE_FIELD),
        None,
    ))
}

/// Like [`read_upload`], for routes where the file is optional.
pub async fn read_optional_upload(multipart: Option<Multipart>) -> Result<Option<Upload>, ApiError> {
    match multipart {
        Some(multipart) => read_upload(multipart).await.map(Some),
        None => Ok(None),
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    match err.status() {
        StatusCode::PAYLOAD_TOO_LARGE => ApiError::payload_too_large(err.body_text()),
        _ => ApiError::bad_request(format!("Invalid multipart body: {}", err.body_text())),
    }
}
