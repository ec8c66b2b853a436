//! Session ownership: one writer (sign-in), many readers.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use crate::error::AuthError;
use crate::models::Session;

use super::client::TableauClient;

/// Owns the current Tableau session.
///
/// `authenticate` is the only writer. Readers get an `Arc` snapshot, so a
/// concurrent sign-in can never expose a half-written session.
#[derive(Debug)]
pub struct SessionManager {
    client: Arc<TableauClient>,
    current: RwLock<Option<Arc<Session>>>,
}

impl SessionManager {
    pub fn new(client: Arc<TableauClient>) -> Self {
        Self {
            client,
            current: RwLock::new(None),
        }
    }

    /// Sign in and make the resulting session current.
    pub async fn authenticate(
        &self,
        login: &str,
        password: &str,
    ) -> Result<Arc<Session>, AuthError> {
        info!(login, "Signing in to Tableau");
        let session = Arc::new(self.client.sign_in(login, password).await?);
        *self.current.write().await = Some(Arc::clone(&session));
        info!(site_id = %session.site_id, "Tableau session established");
        Ok(session)
    }

    /// The session established by the last successful sign-in, if any.
    pub async fn current(&self) -> Option<Arc<Session>> {
        self.current.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tableau::TableauConfig;
    use crate::test_support::can_bind_localhost;
    use httpmock::Method::POST;
    use httpmock::MockServer;
    use std::time::Duration;

    fn manager(base_url: String) -> SessionManager {
        let client = TableauClient::new(&TableauConfig {
            base_url,
            api_version: "3.0".to_string(),
            site_content_url: String::new(),
            request_timeout: Duration::from_secs(5),
        })
        .unwrap();
        SessionManager::new(Arc::new(client))
    }

    #[tokio::test]
    async fn test_no_session_before_authenticate() {
        let manager = manager("http://127.0.0.1:9".to_string());
        assert!(manager.current().await.is_none());
    }

    #[tokio::test]
    async fn test_authenticate_sets_current_session() {
        if !can_bind_localhost() {
            eprintln!("Skipping httpmock tests: cannot bind to localhost");
            return;
        }
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/3.0/auth/signin");
                then.status(200).body(
                    r#"<tsResponse><credentials token="tok-1"><site id="site-1"/></credentials></tsResponse>"#,
                );
            })
            .await;

        let manager = manager(server.base_url());
        let session = manager.authenticate("alice", "secret").await.unwrap();
        let current = manager.current().await.unwrap();

        assert_eq!(session.auth_token, "tok-1");
        assert!(Arc::ptr_eq(&session, &current));
    }

    #[tokio::test]
    async fn test_failed_authenticate_leaves_no_session() {
        if !can_bind_localhost() {
            eprintln!("Skipping httpmock tests: cannot bind to localhost");
            return;
        }
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/3.0/auth/signin");
                then.status(401);
            })
            .await;

        let manager = manager(server.base_url());
        assert!(manager.authenticate("alice", "wrong").await.is_err());
        assert!(manager.current().await.is_none());
    }
}
