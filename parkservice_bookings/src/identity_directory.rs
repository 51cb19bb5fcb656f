use crate::api::UserId;

#[async_trait::async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn identity_exists(&self, user_id: &UserId) -> anyhow::Result<bool>;
}

#[derive(Default)]
pub struct InMemoryIdentityDirectory {
    identities: parking_lot::RwLock<std::collections::HashSet<UserId>>,
}

impl InMemoryIdentityDirectory {
    pub fn register(&self, user_id: UserId) {
        self.identities.write().insert(user_id);
    }
}

#[async_trait::async_trait]
impl IdentityDirectory for InMemoryIdentityDirectory {
    async fn identity_exists(&self, user_id: &UserId) -> anyhow::Result<bool> {
        Ok(self.identities.read().contains(user_id))
    }
}

/// Probes the identity management service over HTTP.
pub struct HttpIdentityDirectory {
    identity_service_url: String,
    client: reqwest_middleware::ClientWithMiddleware,
}

impl HttpIdentityDirectory {
    pub fn new(identity_service_url: &str) -> anyhow::Result<Self> {
        use anyhow::Context;

        let reqwest_client = reqwest::Client::builder()
            .build()
            .context("Failed to build reqwest client")?;
        let client = reqwest_middleware::ClientBuilder::new(reqwest_client)
            // Insert the tracing middleware
            .with(reqwest_tracing::TracingMiddleware::default())
            .build();

        Ok(Self {
            identity_service_url: identity_service_url.to_string(),
            client,
        })
    }
}

#[async_trait::async_trait]
impl IdentityDirectory for HttpIdentityDirectory {
    /// Calls GET /api/user/{user_id} endpoint of the identity service
    async fn identity_exists(&self, user_id: &UserId) -> anyhow::Result<bool> {
        use anyhow::Context;

        let response = self
            .client
            .get(format!(
                "{}/api/user/{}",
                self.identity_service_url, user_id
            ))
            .send()
            .await
            .context("Failed to get user by id")?;

        Ok(response.status().is_success())
    }
}
