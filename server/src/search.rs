//! # Meilisearch
//!
//! Search engine over the naskah catalog, reached only through this backend
//! as a proxy. Redis stays the source of truth; the index is a derived view.
//!
//! ## Schema
//!
//! One index for all naskah with fields: judul (**string**), deskripsi
//! (**string**), kategori (**string**, default "Lainnya"), views (**int**).
//! Judul and deskripsi are searchable, kategori filters, views sorts.
//!
//! ## Sync
//!
//! The index is rebuilt from Redis at startup and updated inline on every
//! admin create/update/delete. View counters move without Meilisearch
//! knowing, so a background job re-upserts the catalog on an interval and
//! search results show slightly stale counts in between.

use std::{sync::Arc, time::Duration};

use meilisearch_sdk::{
    client::Client,
    errors::Error,
    settings::{MinWordSizeForTypos, Settings, TypoToleranceSettings},
};
use pusaka_catalog::{Manuscript, DEFAULT_CATEGORY};
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::database;

pub const NASKAH_INDEX: &str = "naskah";
pub const NASKAH_ID: &str = "id";
pub const NASKAH_JUDUL: &str = "judul";
pub const NASKAH_DESKRIPSI: &str = "deskripsi";
pub const NASKAH_KATEGORI: &str = "kategori";
pub const NASKAH_VIEWS: &str = "views";

#[derive(Debug, Serialize, Deserialize)]
pub struct MeiliNaskah {
    pub id: String,
    pub judul: String,
    pub deskripsi: String,
    pub kategori: String,
    pub views: u64,
}

impl From<&Manuscript> for MeiliNaskah {
    fn from(naskah: &Manuscript) -> Self {
        Self {
            id: naskah.id.clone(),
            judul: naskah.title.clone(),
            deskripsi: naskah.description.clone(),
            kategori: naskah
                .category
                .clone()
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            views: naskah.total_views.unwrap_or(0),
        }
    }
}

pub async fn init_meilisearch(
    meili_url: &str,
    meili_admin_key: &str,
    manuscripts: &[Manuscript],
) -> Arc<Client> {
    let meili_client = Arc::new(Client::new(meili_url, Some(meili_admin_key)).unwrap());

    meili_client
        .index(NASKAH_INDEX)
        .set_settings(&init_settings())
        .await
        .unwrap();

    upsert_manuscripts(&meili_client, manuscripts).await.unwrap();

    meili_client
}

pub async fn upsert_manuscripts(
    meili_client: &Client,
    manuscripts: &[Manuscript],
) -> Result<(), Error> {
    if manuscripts.is_empty() {
        return Ok(());
    }

    let documents: Vec<MeiliNaskah> = manuscripts.iter().map(MeiliNaskah::from).collect();

    meili_client
        .index(NASKAH_INDEX)
        .add_or_update(&documents, Some(NASKAH_ID))
        .await?
        .wait_for_completion(meili_client, None, None)
        .await?;

    Ok(())
}

pub async fn delete_manuscript(meili_client: &Client, id: &str) -> Result<(), Error> {
    meili_client.index(NASKAH_INDEX).delete_document(id).await?;
    Ok(())
}

pub async fn search_manuscripts(
    meili_client: &Client,
    q: &str,
    kategori: Option<&str>,
    limit: usize,
) -> Result<Vec<MeiliNaskah>, Error> {
    let index = meili_client.index(NASKAH_INDEX);
    let filter = kategori.map(|k| format!("{NASKAH_KATEGORI} = \"{k}\""));

    let mut query = index.search();
    query.with_query(q).with_limit(limit);
    if let Some(filter) = filter.as_deref() {
        query.with_filter(filter);
    }

    let results = query.execute::<MeiliNaskah>().await?;
    Ok(results.hits.into_iter().map(|hit| hit.result).collect())
}

/// Periodic Redis -> Meilisearch counter sync.
pub fn spawn_view_sync(meili_client: Arc<Client>, conn: ConnectionManager, every: Duration) {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(every);
        // Skip the immediate first tick; startup just upserted everything.
        tick.tick().await;

        loop {
            tick.tick().await;
            match database::list_manuscripts(&conn).await {
                Ok(manuscripts) => {
                    if let Err(err) = upsert_manuscripts(&meili_client, &manuscripts).await {
                        warn!("View sync upsert failed: {err}");
                    }
                }
                Err(err) => warn!("View sync could not list naskah: {err}"),
            }
        }
    });
}

fn init_settings() -> Settings {
    Settings::new()
        .with_ranking_rules([
            "words",
            "typo",
            "proximity",
            "exactness",
            "attribute",
            "sort",
        ])
        .with_searchable_attributes([NASKAH_JUDUL, NASKAH_DESKRIPSI])
        .with_filterable_attributes([NASKAH_KATEGORI])
        .with_sortable_attributes([NASKAH_VIEWS])
        .with_typo_tolerance(TypoToleranceSettings {
            enabled: Some(true),
            disable_on_attributes: None,
            disable_on_words: None,
            min_word_size_for_typos: Some(MinWordSizeForTypos {
                one_typo: Some(5),
                two_typos: Some(9),
            }),
        })
}
