use serde_json::Value;

use crate::client::ApiClient;
use crate::error::Result;

/// Jira calls the bootstrap needs.
pub struct JiraService {
    client: ApiClient,
}

impl JiraService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Fetch the record of the authenticated user.
    pub async fn current_user(&self) -> Result<Value> {
        self.client.get("/rest/api/2/myself").await
    }

    /// Verify the client can reach Jira with its credentials. Failures are
    /// surfaced unmodified.
    pub async fn test_connection(&self) -> Result<()> {
        self.current_user().await.map(drop)
    }
}

/// Confluence calls the bootstrap needs.
pub struct ConfluenceService {
    client: ApiClient,
}

impl ConfluenceService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// List up to `limit` spaces visible to the authenticated user.
    pub async fn spaces(&self, limit: usize) -> Result<Value> {
        self.client.get(&format!("/rest/api/space?limit={limit}")).await
    }

    /// Verify the client can reach Confluence with its credentials.
    pub async fn test_connection(&self) -> Result<()> {
        self.spaces(1).await.map(drop)
    }
}
