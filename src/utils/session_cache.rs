use moka::future::Cache;
use once_cell::sync::Lazy;
use std::time::Duration;

use crate::model::session::Session;

/// Hot-path cache in front of the sessions table. Entries are short-lived;
/// the row's own expiry is still checked on every resolve, and logout
/// invalidates the token here as well as in the table.
static SESSION_CACHE: Lazy<Cache<String, Session>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(100_000)
        .time_to_live(Duration::from_secs(60))
        .build()
});

pub async fn insert(session: &Session) {
    SESSION_CACHE
        .insert(session.token.clone(), session.clone())
        .await;
}

pub async fn get(token: &str) -> Option<Session> {
    SESSION_CACHE.get(token).await
}

pub async fn invalidate(token: &str) {
    SESSION_CACHE.invalidate(token).await;
}
