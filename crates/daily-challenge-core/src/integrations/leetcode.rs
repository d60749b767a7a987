//! LeetCode GraphQL client for recently accepted submissions.

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::error::IntegrationError;

const SERVICE: &str = "leetcode";

const RECENT_AC_QUERY: &str = "
    query recentAcSubmissions($username: String!, $limit: Int!) {
  recentAcSubmissionList(username: $username, limit: $limit) {
    id
    title
    titleSlug
    timestamp
  }
}
    ";

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<RecentAcData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecentAcData {
    recent_ac_submission_list: Option<Vec<RecentAcEntry>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecentAcEntry {
    title: String,
    title_slug: String,
    /// Unix seconds, sent as a string.
    timestamp: String,
}

/// An accepted submission on LeetCode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedSubmission {
    pub title: String,
    pub title_slug: String,
    pub accepted_at: DateTime<Utc>,
}

pub struct LeetCodeClient {
    client: Client,
    graphql_url: String,
}

impl LeetCodeClient {
    pub fn new(graphql_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            graphql_url: graphql_url.into(),
        }
    }

    /// The user's most recent accepted submissions, newest first.
    pub async fn recent_accepted(
        &self,
        username: &str,
        limit: u32,
    ) -> Result<Vec<AcceptedSubmission>, IntegrationError> {
        if username.trim().is_empty() {
            return Err(IntegrationError::Api {
                service: SERVICE,
                message: "username cannot be empty".into(),
            });
        }

        let body = json!({
            "query": RECENT_AC_QUERY,
            "variables": { "username": username, "limit": limit },
            "operationName": "recentAcSubmissions",
        });
        let resp = self
            .client
            .post(&self.graphql_url)
            .json(&body)
            .send()
            .await
            .map_err(|source| IntegrationError::Http {
                service: SERVICE,
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(IntegrationError::Status {
                service: SERVICE,
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GraphQlResponse = resp.json().await.map_err(|e| IntegrationError::Decode {
            service: SERVICE,
            message: e.to_string(),
        })?;
        if let Some(err) = parsed.errors.first() {
            return Err(IntegrationError::Api {
                service: SERVICE,
                message: err.message.clone(),
            });
        }

        parsed
            .data
            .and_then(|d| d.recent_ac_submission_list)
            .unwrap_or_default()
            .into_iter()
            .map(|entry| {
                let secs: i64 = entry.timestamp.parse().map_err(|_| IntegrationError::Decode {
                    service: SERVICE,
                    message: format!("bad timestamp '{}'", entry.timestamp),
                })?;
                let accepted_at =
                    DateTime::from_timestamp(secs, 0).ok_or_else(|| IntegrationError::Decode {
                        service: SERVICE,
                        message: format!("timestamp {secs} out of range"),
                    })?;
                Ok(AcceptedSubmission {
                    title: entry.title,
                    title_slug: entry.title_slug,
                    accepted_at,
                })
            })
            .collect()
    }
}
