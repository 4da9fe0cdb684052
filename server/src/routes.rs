use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderName, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use pusaka_catalog::{page_image_urls, CreateManuscript, Manuscript, UpdateManuscript};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::require_admin,
    database,
    error::AppError,
    search,
    state::AppState,
    views::{self, ViewOutcome},
};

/// Header carrying the client's browsing-session id. Minted server-side on
/// first contact and echoed back on every view-tracking response.
pub const SESSION_HEADER: &str = "x-session-id";

const DEFAULT_POPULAR_LIMIT: usize = 6;
const DEFAULT_SEARCH_LIMIT: usize = 20;

#[derive(Serialize)]
pub struct NaskahDetail {
    #[serde(flatten)]
    pub naskah: Manuscript,
    pub views_display: String,
}

#[derive(Serialize)]
pub struct ViewCount {
    #[serde(rename = "totalViews")]
    pub total_views: u64,
    pub views_display: String,
}

#[derive(Serialize)]
pub struct ViewRecorded {
    pub recorded: bool,
}

#[derive(Deserialize)]
pub struct PopularParams {
    pub limit: Option<usize>,
}

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub kategori: Option<String>,
    pub limit: Option<usize>,
}

pub async fn list_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Manuscript>>, AppError> {
    let mut manuscripts = database::list_manuscripts(&state.redis_connection).await?;
    manuscripts.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
    Ok(Json(manuscripts))
}

pub async fn detail_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<NaskahDetail>, AppError> {
    let naskah = database::fetch_manuscript(&state.redis_connection, &id)
        .await?
        .ok_or(AppError::NotFound)?;

    let views_display = views::format_views(naskah.total_views);
    Ok(Json(NaskahDetail {
        naskah,
        views_display,
    }))
}

pub async fn views_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Json<ViewCount> {
    let total_views = state.tracker.views(&id).await;
    Json(ViewCount {
        total_views,
        views_display: views::format_views(Some(total_views)),
    })
}

pub async fn record_view_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let session_id = headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let recorded = match state.tracker.record_view(&session_id, &id).await {
        Ok(ViewOutcome::Recorded) => true,
        Ok(ViewOutcome::AlreadyViewed) => false,
        Err(err) => {
            // Best effort only: the reader gets the page either way.
            warn!("View tracking failed for naskah {id}: {err}");
            false
        }
    };

    let mut response_headers = HeaderMap::new();
    if let Ok(value) = session_id.parse() {
        response_headers.insert(HeaderName::from_static(SESSION_HEADER), value);
    }

    (response_headers, Json(ViewRecorded { recorded }))
}

pub async fn popular_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PopularParams>,
) -> Result<Json<Vec<NaskahDetail>>, AppError> {
    let manuscripts = database::list_manuscripts(&state.redis_connection).await?;
    let limit = params.limit.unwrap_or(DEFAULT_POPULAR_LIMIT);

    let entries = views::rank_popular(&manuscripts, limit)
        .into_iter()
        .map(|naskah| {
            let views_display = views::format_views(naskah.total_views);
            NaskahDetail {
                naskah,
                views_display,
            }
        })
        .collect();

    Ok(Json(entries))
}

pub async fn search_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<search::MeiliNaskah>>, AppError> {
    let hits = search::search_manuscripts(
        &state.meili_client,
        &params.q,
        params.kategori.as_deref(),
        params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT),
    )
    .await?;

    Ok(Json(hits))
}

pub async fn create_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<CreateManuscript>,
) -> Result<(StatusCode, Json<Manuscript>), AppError> {
    require_admin(&state.sessions, &headers)?;

    if payload.title.trim().is_empty() {
        return Err(AppError::MalformedPayload);
    }

    let pages = if !payload.pages.is_empty() {
        payload.pages.clone()
    } else if let Some(public_id) = &payload.public_id {
        page_image_urls(&state.config.media_base_url, public_id, payload.total_pages)
    } else {
        Vec::new()
    };

    let thumbnail = payload.thumbnail.clone().or_else(|| pages.first().cloned());

    let naskah = Manuscript {
        id: Uuid::new_v4().to_string(),
        title: payload.title.trim().to_string(),
        description: payload.description.clone(),
        category: payload.category.clone(),
        author: payload.author.clone(),
        total_pages: payload.total_pages,
        pdf_url: payload.pdf_url.clone(),
        pages,
        thumbnail,
        uploaded_at: Some(Utc::now()),
        total_views: None,
        last_viewed: None,
    };

    database::put_manuscript(&state.redis_connection, &naskah).await?;
    search::upsert_manuscripts(&state.meili_client, std::slice::from_ref(&naskah)).await?;

    info!("Naskah created: {} ({})", naskah.title, naskah.id);
    Ok((StatusCode::CREATED, Json(naskah)))
}

pub async fn update_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<UpdateManuscript>,
) -> Result<Json<Manuscript>, AppError> {
    require_admin(&state.sessions, &headers)?;

    let updated =
        database::update_manuscript_fields(&state.redis_connection, &id, &payload).await?;
    if !updated {
        return Err(AppError::NotFound);
    }

    let naskah = database::fetch_manuscript(&state.redis_connection, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    search::upsert_manuscripts(&state.meili_client, std::slice::from_ref(&naskah)).await?;

    Ok(Json(naskah))
}

pub async fn delete_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    require_admin(&state.sessions, &headers)?;

    let removed = database::delete_manuscript(&state.redis_connection, &id).await?;
    if !removed {
        return Err(AppError::NotFound);
    }

    search::delete_manuscript(&state.meili_client, &id).await?;

    info!("Naskah deleted: {id}");
    Ok(StatusCode::NO_CONTENT)
}
