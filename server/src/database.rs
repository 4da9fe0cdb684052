//! # Redis
//!
//! RAM database holding the naskah catalog.
//!
//! ## Layout
//!
//! - One hash per record: `naskah:<id>`, field names matching the served
//!   JSON schema (`judul`, `totalHalaman`, `halaman` as a JSON array string,
//!   timestamps as RFC 3339 strings).
//! - One set `naskah:ids` enumerating every record id for listings.
//! - `totalViews` is a plain integer field driven by HINCRBY; records are
//!   created without it and the first view writes it.
//!
//! ## View counter
//!
//! The increment runs as a Lua script so existence check, `lastViewed`
//! stamp, and HINCRBY land atomically. A missing record hash returns the
//! `-1` sentinel instead of incrementing, because HINCRBY on its own would
//! silently create the field and the caller could never tell a live record
//! from a deleted one.

use std::{collections::HashMap, time::Duration};

use chrono::{DateTime, Utc};
use pusaka_catalog::{Manuscript, UpdateManuscript};
use redis::{
    aio::{ConnectionManager, ConnectionManagerConfig},
    AsyncCommands, Client, RedisError, Script,
};

pub const NASKAH_KEY_PREFIX: &str = "naskah:";
pub const NASKAH_IDS_KEY: &str = "naskah:ids";

pub const F_JUDUL: &str = "judul";
pub const F_DESKRIPSI: &str = "deskripsi";
pub const F_KATEGORI: &str = "kategori";
pub const F_AUTHOR: &str = "author";
pub const F_TOTAL_HALAMAN: &str = "totalHalaman";
pub const F_URL_PDF: &str = "url_pdf";
pub const F_HALAMAN: &str = "halaman";
pub const F_THUMBNAIL: &str = "thumbnail";
pub const F_UPLOADED_AT: &str = "uploadedAt";
pub const F_TOTAL_VIEWS: &str = "totalViews";
pub const F_LAST_VIEWED: &str = "lastViewed";

const INCREMENT_VIEWS_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 0 then
  return -1
end
redis.call('HSET', KEYS[1], ARGV[1], ARGV[2])
return redis.call('HINCRBY', KEYS[1], ARGV[3], 1)
"#;

pub async fn init_redis(redis_url: &str) -> ConnectionManager {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_millis(100));

    let client = Client::open(redis_url).unwrap();
    let connection_manager = client
        .get_connection_manager_with_config(config)
        .await
        .unwrap();

    connection_manager
}

pub fn naskah_key(id: &str) -> String {
    format!("{NASKAH_KEY_PREFIX}{id}")
}

pub async fn fetch_manuscript(
    conn: &ConnectionManager,
    id: &str,
) -> Result<Option<Manuscript>, RedisError> {
    let mut conn = conn.clone();
    let map: HashMap<String, String> = conn.hgetall(naskah_key(id)).await?;

    if map.is_empty() {
        return Ok(None);
    }

    Ok(Some(manuscript_from_map(id, &map)))
}

pub async fn list_manuscripts(conn: &ConnectionManager) -> Result<Vec<Manuscript>, RedisError> {
    let mut ids_conn = conn.clone();
    let ids: Vec<String> = ids_conn.smembers(NASKAH_IDS_KEY).await?;

    let mut manuscripts = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(naskah) = fetch_manuscript(conn, &id).await? {
            manuscripts.push(naskah);
        }
    }

    Ok(manuscripts)
}

pub async fn put_manuscript(conn: &ConnectionManager, naskah: &Manuscript) -> Result<(), RedisError> {
    let mut conn = conn.clone();
    let pairs = manuscript_to_pairs(naskah);

    let _: () = redis::pipe()
        .atomic()
        .hset_multiple(naskah_key(&naskah.id), &pairs)
        .ignore()
        .sadd(NASKAH_IDS_KEY, &naskah.id)
        .ignore()
        .query_async(&mut conn)
        .await?;

    Ok(())
}

/// Applies a metadata update to an existing record. Returns false when the
/// record does not exist.
pub async fn update_manuscript_fields(
    conn: &ConnectionManager,
    id: &str,
    update: &UpdateManuscript,
) -> Result<bool, RedisError> {
    let mut conn = conn.clone();
    let key = naskah_key(id);

    let exists: bool = conn.exists(&key).await?;
    if !exists {
        return Ok(false);
    }

    let pairs = update_to_pairs(update);
    if !pairs.is_empty() {
        let _: () = conn.hset_multiple(&key, &pairs).await?;
    }

    Ok(true)
}

/// Removes a record and its id-set entry. Returns false when nothing was
/// there to delete.
pub async fn delete_manuscript(conn: &ConnectionManager, id: &str) -> Result<bool, RedisError> {
    let mut conn = conn.clone();

    let (removed, _deleted): (i64, i64) = redis::pipe()
        .atomic()
        .srem(NASKAH_IDS_KEY, id)
        .del(naskah_key(id))
        .query_async(&mut conn)
        .await?;

    Ok(removed > 0)
}

/// Atomic view increment that also stamps `lastViewed`. Returns the new
/// counter value, or `-1` when the record hash does not exist.
pub async fn increment_views(
    conn: &ConnectionManager,
    id: &str,
    now: DateTime<Utc>,
) -> Result<i64, RedisError> {
    let mut conn = conn.clone();

    Script::new(INCREMENT_VIEWS_SCRIPT)
        .key(naskah_key(id))
        .arg(F_LAST_VIEWED)
        .arg(now.to_rfc3339())
        .arg(F_TOTAL_VIEWS)
        .invoke_async(&mut conn)
        .await
}

/// Unconditional counter upsert: `totalViews = 1`, `lastViewed = now`. Two
/// callers racing here both write 1 and one view is lost; last write wins.
/// The id is deliberately not added to `naskah:ids`, so a counter written
/// for a vanished record never shows up in listings.
pub async fn initialize_views(
    conn: &ConnectionManager,
    id: &str,
    now: DateTime<Utc>,
) -> Result<(), RedisError> {
    let mut conn = conn.clone();

    let pairs = [
        (F_TOTAL_VIEWS, "1".to_string()),
        (F_LAST_VIEWED, now.to_rfc3339()),
    ];
    let _: () = conn.hset_multiple(naskah_key(id), &pairs).await?;

    Ok(())
}

pub async fn fetch_views(conn: &ConnectionManager, id: &str) -> Result<Option<u64>, RedisError> {
    let mut conn = conn.clone();
    let views: Option<u64> = conn.hget(naskah_key(id), F_TOTAL_VIEWS).await?;
    Ok(views)
}

fn manuscript_to_pairs(naskah: &Manuscript) -> Vec<(&'static str, String)> {
    let mut pairs = vec![
        (F_JUDUL, naskah.title.clone()),
        (F_DESKRIPSI, naskah.description.clone()),
        (F_TOTAL_HALAMAN, naskah.total_pages.to_string()),
        (
            F_HALAMAN,
            serde_json::to_string(&naskah.pages).unwrap_or_else(|_| "[]".to_string()),
        ),
    ];

    if let Some(kategori) = &naskah.category {
        pairs.push((F_KATEGORI, kategori.clone()));
    }
    if let Some(author) = &naskah.author {
        pairs.push((F_AUTHOR, author.clone()));
    }
    if let Some(pdf_url) = &naskah.pdf_url {
        pairs.push((F_URL_PDF, pdf_url.clone()));
    }
    if let Some(thumbnail) = &naskah.thumbnail {
        pairs.push((F_THUMBNAIL, thumbnail.clone()));
    }
    if let Some(uploaded_at) = &naskah.uploaded_at {
        pairs.push((F_UPLOADED_AT, uploaded_at.to_rfc3339()));
    }
    if let Some(views) = naskah.total_views {
        pairs.push((F_TOTAL_VIEWS, views.to_string()));
    }
    if let Some(last_viewed) = &naskah.last_viewed {
        pairs.push((F_LAST_VIEWED, last_viewed.to_rfc3339()));
    }

    pairs
}

fn update_to_pairs(update: &UpdateManuscript) -> Vec<(&'static str, String)> {
    let mut pairs = Vec::new();

    if let Some(title) = &update.title {
        pairs.push((F_JUDUL, title.clone()));
    }
    if let Some(description) = &update.description {
        pairs.push((F_DESKRIPSI, description.clone()));
    }
    if let Some(category) = &update.category {
        pairs.push((F_KATEGORI, category.clone()));
    }
    if let Some(author) = &update.author {
        pairs.push((F_AUTHOR, author.clone()));
    }
    if let Some(thumbnail) = &update.thumbnail {
        pairs.push((F_THUMBNAIL, thumbnail.clone()));
    }

    pairs
}

fn manuscript_from_map(id: &str, map: &HashMap<String, String>) -> Manuscript {
    let parse_time = |field: &str| {
        map.get(field)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    };

    Manuscript {
        id: id.to_string(),
        title: map.get(F_JUDUL).cloned().unwrap_or_default(),
        description: map.get(F_DESKRIPSI).cloned().unwrap_or_default(),
        category: map.get(F_KATEGORI).cloned(),
        author: map.get(F_AUTHOR).cloned(),
        total_pages: map
            .get(F_TOTAL_HALAMAN)
            .and_then(|s| s.parse().ok())
            .unwrap_or(0),
        pdf_url: map.get(F_URL_PDF).cloned(),
        pages: map
            .get(F_HALAMAN)
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default(),
        thumbnail: map.get(F_THUMBNAIL).cloned(),
        uploaded_at: parse_time(F_UPLOADED_AT),
        total_views: map.get(F_TOTAL_VIEWS).and_then(|s| s.parse().ok()),
        last_viewed: parse_time(F_LAST_VIEWED),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_fields_round_trip() {
        let naskah = Manuscript {
            id: "n1".to_string(),
            title: "Babad Tanah Jawi".to_string(),
            description: "kronik".to_string(),
            category: Some("sejarah".to_string()),
            author: None,
            total_pages: 2,
            pdf_url: Some("https://example.com/n1.pdf".to_string()),
            pages: vec!["u1".to_string(), "u2".to_string()],
            thumbnail: Some("u1".to_string()),
            uploaded_at: Some(Utc::now()),
            total_views: Some(12),
            last_viewed: None,
        };

        let map: HashMap<String, String> = manuscript_to_pairs(&naskah)
            .into_iter()
            .map(|(field, value)| (field.to_string(), value))
            .collect();
        let parsed = manuscript_from_map("n1", &map);

        assert_eq!(parsed.title, naskah.title);
        assert_eq!(parsed.category, naskah.category);
        assert_eq!(parsed.author, None);
        assert_eq!(parsed.total_pages, 2);
        assert_eq!(parsed.pages, naskah.pages);
        assert_eq!(parsed.total_views, Some(12));
        assert_eq!(parsed.last_viewed, None);
    }

    #[test]
    fn malformed_stored_values_degrade() {
        let mut map = HashMap::new();
        map.insert(F_JUDUL.to_string(), "X".to_string());
        map.insert(F_TOTAL_HALAMAN.to_string(), "not-a-number".to_string());
        map.insert(F_HALAMAN.to_string(), "{broken".to_string());
        map.insert(F_TOTAL_VIEWS.to_string(), "-3".to_string());

        let parsed = manuscript_from_map("n1", &map);
        assert_eq!(parsed.total_pages, 0);
        assert!(parsed.pages.is_empty());
        assert_eq!(parsed.total_views, None);
    }

    #[test]
    fn update_pairs_skip_absent_fields() {
        let update = UpdateManuscript {
            title: Some("Baru".to_string()),
            ..Default::default()
        };

        let pairs = update_to_pairs(&update);
        assert_eq!(pairs, vec![(F_JUDUL, "Baru".to_string())]);
    }
}
