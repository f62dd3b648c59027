//! Reading reports and engaging with them
//!
//! Single-shot calls; only report submission goes through the retrying pipeline.

use raasta_common::{validation, EngagementCounts, Report, ReportId, VoteDirection};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::config::ClientConfig;
use crate::credentials::CredentialProvider;
use crate::transport::{build_http_client, read_envelope, ReportData};
use crate::SubmitError;

#[derive(Debug, Deserialize)]
struct ReportList {
    reports: Vec<Report>,
}

/// HTTP client for the report endpoints
pub struct ReportsClient {
    http: reqwest::Client,
    config: ClientConfig,
    credentials: Arc<dyn CredentialProvider>,
}

impl ReportsClient {
    pub fn new(config: ClientConfig, credentials: Arc<dyn CredentialProvider>) -> Result<Self, SubmitError> {
        Ok(Self {
            http: build_http_client(&config)?,
            config,
            credentials,
        })
    }

    /// Active reports, newest first
    pub async fn list(&self) -> Result<Vec<Report>, SubmitError> {
        let list: ReportList = self.send(self.http.get(self.config.url("reports"))).await?;
        Ok(list.reports)
    }

    /// The caller's own active reports
    pub async fn my_reports(&self) -> Result<Vec<Report>, SubmitError> {
        let list: ReportList = self
            .send(self.http.get(self.config.url("reports/my-reports")))
            .await?;
        Ok(list.reports)
    }

    pub async fn get(&self, id: ReportId) -> Result<Report, SubmitError> {
        let data: ReportData = self
            .send(self.http.get(self.config.url(&format!("reports/{}", id))))
            .await?;
        Ok(data.report)
    }

    pub async fn like(&self, id: ReportId) -> Result<EngagementCounts, SubmitError> {
        self.send(self.http.post(self.engagement_url(id, "like"))).await
    }

    pub async fn unlike(&self, id: ReportId) -> Result<EngagementCounts, SubmitError> {
        self.send(self.http.delete(self.engagement_url(id, "like"))).await
    }

    pub async fn vote(&self, id: ReportId, direction: VoteDirection) -> Result<EngagementCounts, SubmitError> {
        let body = json!({ "voteType": direction.as_str() });
        self.send(self.http.post(self.engagement_url(id, "vote")).json(&body))
            .await
    }

    /// Add a comment; blank or over-long text is refused without a request
    pub async fn comment(&self, id: ReportId, text: &str) -> Result<EngagementCounts, SubmitError> {
        validation::validate_comment(text)?;
        let body = json!({ "text": text.trim() });
        self.send(self.http.post(self.engagement_url(id, "comments")).json(&body))
            .await
    }

    pub async fn view(&self, id: ReportId) -> Result<EngagementCounts, SubmitError> {
        self.send(self.http.post(self.engagement_url(id, "view"))).await
    }

    /// Soft-delete one of the caller's reports
    pub async fn delete(&self, id: ReportId) -> Result<(), SubmitError> {
        let request = self.authorize(self.http.delete(self.config.url(&format!("reports/{}", id))));
        let response = request.send().await?;
        // Success carries no `data`; only failures need decoding.
        if response.status().is_success() {
            return Ok(());
        }
        read_envelope::<serde_json::Value>(response)
            .await
            .map(|_| ())
            .map_err(|err| self.observe(err))
    }

    fn engagement_url(&self, id: ReportId, action: &str) -> String {
        self.config.url(&format!("reports/{}/{}", id, action))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.credentials.bearer_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, SubmitError> {
        let response = self.authorize(request).send().await?;
        read_envelope(response).await.map_err(|err| self.observe(err))
    }

    fn observe(&self, err: SubmitError) -> SubmitError {
        if err == SubmitError::Unauthorized {
            self.credentials.invalidate();
        }
        err
    }
}
