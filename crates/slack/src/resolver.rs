use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use crate::api::{ChatApi, ChatApiError};

/// Page size for the single channel-listing call on a cache miss.
const LIST_PAGE_LIMIT: u32 = 1000;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("channel `#{0}` was not found in the workspace")]
    NotFound(String),
    #[error("channel listing failed: {0}")]
    ListFailed(#[from] ChatApiError),
}

/// Maps channel names to platform channel ids.
///
/// Positive results are cached indefinitely; a channel renamed after its
/// first resolution is not observed until the process restarts. Failures are
/// never cached and never retried here - the caller decides whether to skip.
pub struct ChannelResolver {
    api: Arc<dyn ChatApi>,
    cache: Mutex<HashMap<String, String>>,
}

impl ChannelResolver {
    pub fn new(api: Arc<dyn ChatApi>) -> Self {
        Self { api, cache: Mutex::new(HashMap::new()) }
    }

    pub async fn resolve(&self, name: &str) -> Result<String, ResolveError> {
        if let Some(id) = self.cache.lock().await.get(name) {
            return Ok(id.clone());
        }

        let channels = self.api.list_channels("public_channel", LIST_PAGE_LIMIT).await?;
        let Some(channel) = channels.into_iter().find(|channel| channel.name == name) else {
            return Err(ResolveError::NotFound(name.to_owned()));
        };

        debug!(channel_name = name, channel_id = %channel.id, "resolved channel");
        self.cache.lock().await.insert(name.to_owned(), channel.id.clone());
        Ok(channel.id)
    }
}
