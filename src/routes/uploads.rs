/**
 * Upload Routes
 * Image attachments for blog posts, book covers, and gear product shots.
 * Files land on local disk under uploads/images/ with UUID names; the
 * owning row stores the filename.
 */
use axum::{
    extract::{Multipart, Path},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

use crate::routes::{error_response, verify_auth};

const UPLOAD_DIR: &str = "uploads/images";
const MAX_FILE_SIZE: usize = 5 * 1024 * 1024; // 5MB
const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub url: String,
    pub filename: String,
    pub size: usize,
    pub mime_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageInfo {
    pub filename: String,
    pub url: String,
    pub size: u64,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageListResponse {
    pub images: Vec<ImageInfo>,
    pub total: usize,
}

/// Public URL for a stored attachment filename.
pub fn public_url(filename: Option<&str>) -> Option<String> {
    filename
        .filter(|f| !f.is_empty())
        .map(|f| format!("/{}/{}", UPLOAD_DIR, f))
}

/// Attachment precedence for entities that also carry an external URL
/// column: uploaded file first, stored URL second, otherwise nothing.
pub fn resolve_image_url(attached: Option<&str>, external_url: Option<&str>) -> Option<String> {
    public_url(attached).or_else(|| {
        external_url
            .filter(|u| !u.trim().is_empty())
            .map(|u| u.to_string())
    })
}

/// Best-effort file removal for purged attachments; the column is already
/// cleared by the caller.
pub async fn purge_file(filename: &str) {
    if !sanitize_filename(filename) {
        tracing::warn!("Refusing to purge suspicious filename: {}", filename);
        return;
    }
    let path = PathBuf::from(UPLOAD_DIR).join(filename);
    if let Err(e) = tokio::fs::remove_file(&path).await {
        tracing::warn!("Failed to purge attachment {}: {}", filename, e);
    }
}

fn validate_image_magic_bytes(bytes: &[u8]) -> Option<&'static str> {
    if bytes.len() < 4 {
        return None;
    }
    match bytes {
        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        // PNG: 89 50 4E 47
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        // GIF: 47 49 46 38
        [0x47, 0x49, 0x46, 0x38, ..] => Some("image/gif"),
        // WebP: 52 49 46 46 ... 57 45 42 50
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some("image/webp"),
        _ => None,
    }
}

fn get_extension_from_mime(mime: &str) -> &str {
    match mime {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "bin",
    }
}

fn sanitize_filename(filename: &str) -> bool {
    // Reject path traversal and special characters
    !filename.is_empty()
        && !filename.contains("..")
        && !filename.contains('/')
        && !filename.contains('\\')
        && !filename.contains('\0')
}

/// POST /api/admin/uploads - Store an image and return its filename/URL
pub async fn upload_image(headers: HeaderMap, mut multipart: Multipart) -> Response {
    if let Err(err) = verify_auth(&headers) {
        return err;
    }

    let upload_path = PathBuf::from(UPLOAD_DIR);
    if let Err(e) = tokio::fs::create_dir_all(&upload_path).await {
        tracing::error!("Failed to create upload directory: {}", e);
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to initialize upload directory",
        );
    }

    let field = match multipart.next_field().await {
        Ok(Some(field)) => field,
        Ok(None) => return error_response(StatusCode::BAD_REQUEST, "No file provided"),
        Err(e) => {
            tracing::error!("Multipart error: {}", e);
            return error_response(StatusCode::BAD_REQUEST, "Invalid multipart data");
        }
    };

    // Extension check on the client-supplied name, content check below.
    let original_name = field.file_name().unwrap_or("unknown").to_string();
    let original_ext = original_name
        .rsplit('.')
        .next()
        .unwrap_or("")
        .to_lowercase();

    if !ALLOWED_EXTENSIONS.contains(&original_ext.as_str()) {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Unsupported file type. Allowed: JPEG, PNG, WebP, GIF.",
        );
    }

    let bytes = match field.bytes().await {
        Ok(b) => b,
        Err(e) => {
            tracing::error!("Failed to read upload bytes: {}", e);
            return error_response(StatusCode::BAD_REQUEST, "Failed to read file data");
        }
    };

    if bytes.len() > MAX_FILE_SIZE {
        return error_response(StatusCode::BAD_REQUEST, "File too large. Maximum size is 5MB.");
    }

    if bytes.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Empty file");
    }

    let mime_type = match validate_image_magic_bytes(&bytes) {
        Some(mime) => mime,
        None => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "File content does not match an allowed image type.",
            );
        }
    };

    let ext = get_extension_from_mime(mime_type);
    let filename = format!("{}.{}", Uuid::new_v4(), ext);
    let file_path = upload_path.join(&filename);

    if let Err(e) = tokio::fs::write(&file_path, &bytes).await {
        tracing::error!("Failed to write upload file: {}", e);
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save file");
    }

    tracing::info!("Image uploaded: {} ({} bytes)", filename, bytes.len());

    (
        StatusCode::CREATED,
        Json(UploadResponse {
            url: public_url(Some(&filename)).unwrap_or_default(),
            filename,
            size: bytes.len(),
            mime_type: mime_type.to_string(),
        }),
    )
        .into_response()
}

/// DELETE /api/admin/uploads/:filename
pub async fn delete_image(headers: HeaderMap, Path(filename): Path<String>) -> Response {
    if let Err(err) = verify_auth(&headers) {
        return err;
    }

    if !sanitize_filename(&filename) {
        return error_response(StatusCode::BAD_REQUEST, "Invalid filename");
    }

    let file_path = PathBuf::from(UPLOAD_DIR).join(&filename);

    if !file_path.exists() {
        return error_response(StatusCode::NOT_FOUND, "File not found");
    }

    if let Err(e) = tokio::fs::remove_file(&file_path).await {
        tracing::error!("Failed to delete file {}: {}", filename, e);
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete file");
    }

    tracing::info!("Image deleted: {}", filename);
    StatusCode::NO_CONTENT.into_response()
}

/// GET /api/admin/uploads - List stored images, newest first
pub async fn list_images(headers: HeaderMap) -> Response {
    if let Err(err) = verify_auth(&headers) {
        return err;
    }

    let upload_path = PathBuf::from(UPLOAD_DIR);
    if !upload_path.exists() {
        return (
            StatusCode::OK,
            Json(ImageListResponse {
                images: vec![],
                total: 0,
            }),
        )
            .into_response();
    }

    let mut images = Vec::new();

    let mut entries = match tokio::fs::read_dir(&upload_path).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::error!("Failed to read upload directory: {}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to list images");
        }
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let filename = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };

        let ext = filename.rsplit('.').next().unwrap_or("").to_lowercase();
        if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
            continue;
        }

        let metadata = match entry.metadata().await {
            Ok(m) => m,
            Err(_) => continue,
        };

        let created_at = metadata
            .created()
            .or_else(|_| metadata.modified())
            .map(|t| {
                let dt: chrono::DateTime<chrono::Utc> = t.into();
                dt.to_rfc3339()
            })
            .unwrap_or_default();

        images.push(ImageInfo {
            url: public_url(Some(&filename)).unwrap_or_default(),
            filename,
            size: metadata.len(),
            created_at,
        });
    }

    images.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let total = images.len();
    (StatusCode::OK, Json(ImageListResponse { images, total })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_url() {
        assert_eq!(
            public_url(Some("a.png")),
            Some("/uploads/images/a.png".to_string())
        );
        assert_eq!(public_url(None), None);
        assert_eq!(public_url(Some("")), None);
    }

    #[test]
    fn test_resolve_image_url_prefers_attachment() {
        assert_eq!(
            resolve_image_url(Some("a.png"), Some("https://cdn.example.com/b.png")),
            Some("/uploads/images/a.png".to_string())
        );
        assert_eq!(
            resolve_image_url(None, Some("https://cdn.example.com/b.png")),
            Some("https://cdn.example.com/b.png".to_string())
        );
        assert_eq!(resolve_image_url(None, None), None);
        assert_eq!(resolve_image_url(None, Some("  ")), None);
    }

    #[test]
    fn test_magic_bytes() {
        assert_eq!(
            validate_image_magic_bytes(&[0xFF, 0xD8, 0xFF, 0xE0]),
            Some("image/jpeg")
        );
        assert_eq!(
            validate_image_magic_bytes(&[0x89, 0x50, 0x4E, 0x47, 0x0D]),
            Some("image/png")
        );
        assert_eq!(validate_image_magic_bytes(b"GIF89a"), Some("image/gif"));
        assert_eq!(validate_image_magic_bytes(b"RIFF\0\0\0\0WEBPVP8 "), Some("image/webp"));
        assert_eq!(validate_image_magic_bytes(b"hello"), None);
        assert_eq!(validate_image_magic_bytes(&[0x00]), None);
    }

    #[test]
    fn test_sanitize_filename() {
        assert!(sanitize_filename("ok.png"));
        assert!(!sanitize_filename("../etc/passwd"));
        assert!(!sanitize_filename("a/b.png"));
        assert!(!sanitize_filename(""));
    }
}
