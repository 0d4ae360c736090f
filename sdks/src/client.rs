// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::{bail, Result};
use reqwest::Client;
use serde_json::json;

use bazaar_marketplace_core::domain::project::{
    BidId, Project, ProjectDraft, ProjectId, ProjectStatus,
};

/// Client for interacting with the BAZAAR marketplace daemon.
pub struct MarketplaceClient {
    base_url: String,
    client: Client,
    credential: Option<String>,
}

impl MarketplaceClient {
    /// Create a new marketplace client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: Client::new(),
            credential: None,
        }
    }

    /// Set the bearer credential resolved by the daemon's auth gate.
    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.credential {
            Some(credential) => req.header("Authorization", format!("Bearer {credential}")),
            None => req,
        }
    }

    async fn expect_project(response: reqwest::Response) -> Result<Project> {
        if !response.status().is_success() {
            let status = response.status();
            let body: serde_json::Value = response.json().await.unwrap_or_default();
            bail!(
                "request failed ({status}): {}",
                body["error"].as_str().unwrap_or("unknown error")
            );
        }
        Ok(response.json().await?)
    }

    /// Post a new project.
    pub async fn create_project(&self, draft: &ProjectDraft) -> Result<Project> {
        let url = format!("{}/api/v1/projects", self.base_url);
        let response = self.authorized(self.client.post(&url)).json(draft).send().await?;
        Self::expect_project(response).await
    }

    /// List projects, optionally filtered by status.
    pub async fn list_projects(&self, status: Option<ProjectStatus>) -> Result<Vec<Project>> {
        let url = format!("{}/api/v1/projects", self.base_url);
        let mut req = self.authorized(self.client.get(&url));
        if let Some(status) = status {
            let value = serde_json::to_value(status)?;
            req = req.query(&[("status", value.as_str().unwrap_or_default().to_string())]);
        }
        let response = req.send().await?;
        if !response.status().is_success() {
            bail!("request failed ({})", response.status());
        }
        Ok(response.json().await?)
    }

    /// Fetch one project snapshot.
    pub async fn get_project(&self, project_id: ProjectId) -> Result<Project> {
        let url = format!("{}/api/v1/projects/{}", self.base_url, project_id);
        let response = self.authorized(self.client.get(&url)).send().await?;
        Self::expect_project(response).await
    }

    /// Delete an open or cancelled project.
    pub async fn delete_project(&self, project_id: ProjectId) -> Result<()> {
        let url = format!("{}/api/v1/projects/{}", self.base_url, project_id);
        let response = self.authorized(self.client.delete(&url)).send().await?;
        if !response.status().is_success() {
            bail!("request failed ({})", response.status());
        }
        Ok(())
    }

    /// Cancel an open project.
    pub async fn cancel_project(&self, project_id: ProjectId) -> Result<Project> {
        let url = format!("{}/api/v1/projects/{}/cancel", self.base_url, project_id);
        let response = self.authorized(self.client.post(&url)).send().await?;
        Self::expect_project(response).await
    }

    /// Manual status override.
    pub async fn update_status(
        &self,
        project_id: ProjectId,
        status: ProjectStatus,
    ) -> Result<Project> {
        let url = format!("{}/api/v1/projects/{}/status", self.base_url, project_id);
        let response = self
            .authorized(self.client.post(&url))
            .json(&json!({ "status": status }))
            .send()
            .await?;
        Self::expect_project(response).await
    }

    /// Submit a bid against an open project.
    pub async fn submit_bid(
        &self,
        project_id: ProjectId,
        amount: f64,
        message: &str,
    ) -> Result<Project> {
        let url = format!("{}/api/v1/projects/{}/bids", self.base_url, project_id);
        let response = self
            .authorized(self.client.post(&url))
            .json(&json!({ "amount": amount, "message": message }))
            .send()
            .await?;
        Self::expect_project(response).await
    }

    /// Accept a bid; siblings are auto-rejected by the engine.
    pub async fn accept_bid(&self, project_id: ProjectId, bid_id: BidId) -> Result<Project> {
        let url = format!(
            "{}/api/v1/projects/{}/bids/{}/accept",
            self.base_url, project_id, bid_id
        );
        let response = self.authorized(self.client.post(&url)).send().await?;
        Self::expect_project(response).await
    }

    /// Reject a single bid.
    pub async fn reject_bid(&self, project_id: ProjectId, bid_id: BidId) -> Result<Project> {
        let url = format!(
            "{}/api/v1/projects/{}/bids/{}/reject",
            self.base_url, project_id, bid_id
        );
        let response = self.authorized(self.client.post(&url)).send().await?;
        Self::expect_project(response).await
    }

    /// Attach a counter-offer to a bid.
    pub async fn counter_offer(
        &self,
        project_id: ProjectId,
        bid_id: BidId,
        amount: f64,
        message: &str,
    ) -> Result<Project> {
        let url = format!(
            "{}/api/v1/projects/{}/bids/{}/counter-offer",
            self.base_url, project_id, bid_id
        );
        let response = self
            .authorized(self.client.post(&url))
            .json(&json!({ "amount": amount, "message": message }))
            .send()
            .await?;
        Self::expect_project(response).await
    }

    /// Mark an in-progress project completed (assigned freelancer only).
    pub async fn complete_project(&self, project_id: ProjectId) -> Result<Project> {
        let url = format!("{}/api/v1/projects/{}/complete", self.base_url, project_id);
        let response = self.authorized(self.client.post(&url)).send().await?;
        Self::expect_project(response).await
    }

    /// Open the project's SSE event stream. The caller reads chunks until
    /// it disconnects, which leaves the room.
    pub async fn events(&self, project_id: ProjectId) -> Result<reqwest::Response> {
        let url = format!("{}/api/v1/projects/{}/events", self.base_url, project_id);
        let response = self.authorized(self.client.get(&url)).send().await?;
        if !response.status().is_success() {
            bail!("request failed ({})", response.status());
        }
        Ok(response)
    }
}
