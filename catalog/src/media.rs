use serde::Deserialize;

/// Hosting service response for a document upload. The service converts a
/// PDF into one image per page and reports the page count.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaUpload {
    pub public_id: String,

    #[serde(default)]
    pub pages: Option<u32>,

    pub secure_url: String,
}

impl MediaUpload {
    /// Single-image uploads carry no `pages` field and count as one page.
    pub fn total_pages(&self) -> u32 {
        self.pages.unwrap_or(1)
    }
}

/// URL of a single converted page. The `pg_{n}` path segment with a 1-based
/// page index is the hosting service's delivery scheme; changing this format
/// breaks every stored `halaman` array.
pub fn page_image_url(base_url: &str, public_id: &str, page: u32) -> String {
    format!("{base_url}/pg_{page}/{public_id}.jpg")
}

/// URLs for all pages of an upload, in reading order.
pub fn page_image_urls(base_url: &str, public_id: &str, total_pages: u32) -> Vec<String> {
    (1..=total_pages)
        .map(|page| page_image_url(base_url, public_id, page))
        .collect()
}
