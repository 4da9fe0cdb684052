use std::{sync::Arc, time::Duration};

use meilisearch_sdk::client::Client;
use redis::aio::ConnectionManager;

use crate::{
    config::Config,
    database::{self, init_redis},
    search::{init_meilisearch, spawn_view_sync},
    session::{spawn_sweeper, Sessions},
    views::{RedisViews, ViewTracker},
};

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub struct AppState {
    pub config: Config,
    pub redis_connection: ConnectionManager,
    pub meili_client: Arc<Client>,
    pub sessions: Arc<Sessions>,
    pub tracker: ViewTracker<RedisViews>,
}

impl AppState {
    pub async fn new() -> Arc<Self> {
        let config = Config::load();

        let redis_connection = init_redis(&config.redis_url).await;

        let manuscripts = database::list_manuscripts(&redis_connection).await.unwrap();
        let meili_client =
            init_meilisearch(&config.meili_url, &config.meili_key, &manuscripts).await;

        let sessions = Arc::new(Sessions::new(Duration::from_secs(config.session_ttl_secs)));
        spawn_sweeper(sessions.clone(), SWEEP_INTERVAL);
        spawn_view_sync(
            meili_client.clone(),
            redis_connection.clone(),
            Duration::from_secs(config.sync_interval_secs),
        );

        let tracker = ViewTracker::new(RedisViews::new(redis_connection.clone()), sessions.clone());

        Arc::new(Self {
            config,
            redis_connection,
            meili_client,
            sessions,
            tracker,
        })
    }
}
