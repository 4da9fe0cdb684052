use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Display fallback for records without a category.
pub const DEFAULT_CATEGORY: &str = "Lainnya";

/// A digitized manuscript record.
///
/// Serialized field names are the stored document schema (`judul`,
/// `totalHalaman`, ...) and must not drift: the frontend and the store both
/// read them by these names. `totalViews` and `lastViewed` are owned by the
/// view tracker and are absent until the first recorded view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manuscript {
    pub id: String,

    #[serde(rename = "judul")]
    pub title: String,

    #[serde(rename = "deskripsi", default)]
    pub description: String,

    #[serde(rename = "kategori", default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(rename = "totalHalaman", default)]
    pub total_pages: u32,

    #[serde(rename = "url_pdf", default, skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,

    #[serde(rename = "halaman", default)]
    pub pages: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,

    #[serde(rename = "uploadedAt", default, skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<DateTime<Utc>>,

    #[serde(rename = "totalViews", default, skip_serializing_if = "Option::is_none")]
    pub total_views: Option<u64>,

    #[serde(rename = "lastViewed", default, skip_serializing_if = "Option::is_none")]
    pub last_viewed: Option<DateTime<Utc>>,
}

/// Admin creation payload. Page URLs may be given outright (`halaman`) or
/// derived server-side from `public_id` + `totalHalaman`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateManuscript {
    #[serde(rename = "judul")]
    pub title: String,

    #[serde(rename = "deskripsi", default)]
    pub description: String,

    #[serde(rename = "kategori", default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(rename = "totalHalaman", default = "one_page")]
    pub total_pages: u32,

    #[serde(rename = "url_pdf", default, skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,

    #[serde(rename = "halaman", default, skip_serializing_if = "Vec::is_empty")]
    pub pages: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_id: Option<String>,
}

fn one_page() -> u32 {
    1
}

/// Admin metadata update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateManuscript {
    #[serde(rename = "judul", default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(rename = "deskripsi", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "kategori", default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialized_names_match_stored_schema() {
        let naskah = Manuscript {
            id: "abc".to_string(),
            title: "Serat Contoh".to_string(),
            description: "tentang contoh".to_string(),
            category: Some("sejarah".to_string()),
            author: None,
            total_pages: 2,
            pdf_url: None,
            pages: vec!["p1".to_string(), "p2".to_string()],
            thumbnail: None,
            uploaded_at: None,
            total_views: Some(7),
            last_viewed: None,
        };

        let value = serde_json::to_value(&naskah).unwrap();
        assert_eq!(value["judul"], "Serat Contoh");
        assert_eq!(value["deskripsi"], "tentang contoh");
        assert_eq!(value["kategori"], "sejarah");
        assert_eq!(value["totalHalaman"], 2);
        assert_eq!(value["halaman"][1], "p2");
        assert_eq!(value["totalViews"], 7);
        assert!(value.get("author").is_none());
        assert!(value.get("lastViewed").is_none());
    }

    #[test]
    fn create_defaults_to_one_page() {
        let payload: CreateManuscript = serde_json::from_str(r#"{"judul":"X"}"#).unwrap();
        assert_eq!(payload.total_pages, 1);
        assert!(payload.pages.is_empty());
        assert_eq!(payload.description, "");
    }
}
