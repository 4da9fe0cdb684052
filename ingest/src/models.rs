use serde::Deserialize;

/// Unsigned preset the hosting service is configured with; it enables the
/// PDF-to-image conversion on upload.
pub const UPLOAD_PRESET: &str = "pusaka";

#[derive(Deserialize)]
pub struct LoginResponse {
    pub token: String,
}
