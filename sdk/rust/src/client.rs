use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

type SdkResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub channel_type: String,
    #[serde(default)]
    pub current: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishReceipt {
    pub channel: String,
    pub timestamp: f64,
}

/// Parameters of a data query. `None` leaves the server default.
#[derive(Debug, Clone, Default)]
pub struct DataQuery {
    pub length: Option<f64>,
    pub to: Option<f64>,
    pub resample: Option<f64>,
    pub reducer: Option<String>,
}

impl DataQuery {
    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(length) = self.length {
            pairs.push(("length", length.to_string()));
        }
        if let Some(to) = self.to {
            pairs.push(("to", to.to_string()));
        }
        if let Some(interval) = self.resample {
            pairs.push(("resample", interval.to_string()));
        }
        if let Some(reducer) = &self.reducer {
            pairs.push(("reducer", reducer.clone()));
        }
        pairs
    }
}

pub struct DashboardClient {
    client: Client,
    base_url: String,
}

impl DashboardClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn ping(&self) -> SdkResult<String> {
        let resp = self.client.get(self.url("/api/ping")).send().await?;
        Ok(checked(resp).await?.text().await?)
    }

    pub async fn version(&self) -> SdkResult<Value> {
        let resp = self.client.get(self.url("/api/version")).send().await?;
        Ok(checked(resp).await?.json().await?)
    }

    pub async fn channels(&self) -> SdkResult<Vec<ChannelEntry>> {
        let resp = self.client.get(self.url("/api/channels")).send().await?;
        Ok(checked(resp).await?.json().await?)
    }

    /// Query `channels`; the result maps each channel to its series or record.
    pub async fn data(&self, channels: &[&str], query: &DataQuery) -> SdkResult<BTreeMap<String, Value>> {
        let resp = self
            .client
            .get(self.url(&format!("/api/data/{}", channels.join(","))))
            .query(&query.pairs())
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(BTreeMap::new());
        }
        Ok(checked(resp).await?.json().await?)
    }

    pub async fn publish(&self, channel: &str, data: &Value) -> SdkResult<PublishReceipt> {
        let resp = self
            .client
            .post(self.url(&format!("/api/publish/{}", channel)))
            .json(data)
            .send()
            .await?;
        Ok(checked(resp).await?.json().await?)
    }

    /// Remove a live channel. Returns whether it existed.
    pub async fn delete(&self, channel: &str) -> SdkResult<bool> {
        let resp = self
            .client
            .delete(self.url(&format!("/api/publish/{}", channel)))
            .send()
            .await?;
        let body: Value = checked(resp).await?.json().await?;
        Ok(body["removed"].as_bool().unwrap_or(false))
    }
}

async fn checked(resp: Response) -> SdkResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    Err(format!("Server returned error status {}: {}", status, text).into())
}
