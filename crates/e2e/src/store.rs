//! Data store cleanup - removing values the test user leaves behind

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{E2eError, E2eResult};

/// A remote tagged-value store that can delete values by query.
#[async_trait]
pub trait ValueStore: Send + Sync {
    /// Delete the values of `tags` on every object matching `query`
    async fn delete_values(&self, query: &str, tags: &[String]) -> E2eResult<()>;
}

/// Connection settings for the Fluidinfo data store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: "https://fluiddb.fluidinfo.com".to_string(),
            username: "test".to_string(),
            password: "test".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Fluidinfo client authenticated with basic credentials
pub struct FluidinfoClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl FluidinfoClient {
    /// Build a client that sends `config`'s credentials with every request
    pub fn login(config: &StoreConfig) -> E2eResult<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        info!("Data store session for '{}' at {}", config.username, config.base_url);

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

#[async_trait]
impl ValueStore for FluidinfoClient {
    async fn delete_values(&self, query: &str, tags: &[String]) -> E2eResult<()> {
        let mut params: Vec<(&str, &str)> = vec![("query", query)];
        params.extend(tags.iter().map(|t| ("tag", t.as_str())));

        debug!("DELETE /values query={:?} tags={:?}", query, tags);
        let resp = self
            .http
            .delete(format!("{}/values", self.base_url))
            .basic_auth(&self.username, Some(&self.password))
            .query(&params)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(E2eError::Store {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// The fixed set of values annotation cases may create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupScope {
    pub query: String,
    pub tags: Vec<String>,
}

impl CleanupScope {
    /// Every comment `username` left on a book block
    pub fn comments_by(username: &str) -> Self {
        Self {
            query: "has beckyhogge/html".to_string(),
            tags: vec![format!("{}/comment", username)],
        }
    }

    /// Remove the scoped values. Errors are returned as-is so the caller
    /// can abort the run.
    pub async fn purge(&self, store: &dyn ValueStore) -> E2eResult<()> {
        debug!("Purging {:?} from objects matching {:?}", self.tags, self.query);
        store.delete_values(&self.query, &self.tags).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        calls: Mutex<Vec<(String, Vec<String>)>>,
    }

    #[async_trait]
    impl ValueStore for Recording {
        async fn delete_values(&self, query: &str, tags: &[String]) -> E2eResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push((query.to_string(), tags.to_vec()));
            Ok(())
        }
    }

    #[test]
    fn test_comment_scope() {
        let scope = CleanupScope::comments_by("test");
        assert_eq!(scope.query, "has beckyhogge/html");
        assert_eq!(scope.tags, vec!["test/comment".to_string()]);
    }

    #[tokio::test]
    async fn test_purge_issues_single_delete() {
        let store = Recording::default();
        CleanupScope::comments_by("alice").purge(&store).await.unwrap();

        let calls = store.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "has beckyhogge/html");
        assert_eq!(calls[0].1, vec!["alice/comment".to_string()]);
    }

    #[test]
    fn test_login_trims_base_url() {
        let client = FluidinfoClient::login(&StoreConfig {
            base_url: "http://localhost:9000/".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(client.base_url, "http://localhost:9000");
        assert_eq!(client.username(), "test");
    }
}
