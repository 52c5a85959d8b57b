use std::time::Duration;

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::domain::repository::{ProfileSource, RepoResult};
use crate::domain::types::DirectoryUser;
use crate::error::NotifyServiceError;

const SERVICE_TOKEN_HEADER: &str = "X-Service-Token";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
struct ProfilesResponse {
    #[serde(default)]
    users: Vec<DirectoryUser>,
}

/// Profile service client. The service always expects a `since` bound, so a
/// full fetch asks for everything updated after 2000-01-01.
#[derive(Clone)]
pub struct HttpProfileSource {
    client: Client,
    base_url: String,
    service_token: String,
}

impl HttpProfileSource {
    pub fn new(base_url: &str, service_token: &str) -> Result<Self, NotifyServiceError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| NotifyServiceError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            service_token: service_token.to_owned(),
        })
    }

    fn profiles_url(&self, since: Option<DateTime<Utc>>) -> String {
        let since = since.unwrap_or_else(full_sync_floor);
        format!(
            "{}/api/v1/public/profiles?since={}",
            self.base_url,
            since.to_rfc3339_opts(SecondsFormat::Secs, true)
        )
    }
}

fn full_sync_floor() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

impl ProfileSource for HttpProfileSource {
    async fn fetch_users(&self, since: Option<DateTime<Utc>>) -> RepoResult<Vec<DirectoryUser>> {
        let url = self.profiles_url(since);
        tracing::debug!(%url, "fetching profiles");

        let resp = self
            .client
            .get(&url)
            .header(SERVICE_TOKEN_HEADER, &self.service_token)
            .send()
            .await
            .map_err(|e| NotifyServiceError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NotifyServiceError::Transport(format!(
                "profile service returned {status}: {body}"
            )));
        }

        let body: ProfilesResponse = resp
            .json()
            .await
            .map_err(|e| NotifyServiceError::Transport(format!("invalid profiles response: {e}")))?;
        Ok(body.users)
    }
}
