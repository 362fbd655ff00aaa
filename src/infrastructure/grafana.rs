// Grafana datasource query adapter
use crate::application::form::Credentials;
use crate::application::source_adapter::{FetchError, SourceAdapter};
use crate::domain::series::{Field, LabelFormat, NormalizedSeries, PLACEHOLDER, Point, RawValue};
use crate::domain::source::SourceKind;
use crate::infrastructure::http_client::{self, trim_base};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const VALUE_KEY: &str = "value";
const REF_ID: &str = "A";
const QUERY_INTERVAL: &str = "30s";

#[derive(Debug, Clone)]
pub struct GrafanaAdapter {
    client: reqwest::Client,
    labels: LabelFormat,
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    queries: Vec<Query<'a>>,
}

#[derive(Debug, Serialize)]
struct Query<'a> {
    expr: &'a str,
    interval: &'a str,
}

// Every level may be missing or null; either way the series comes back empty.
#[derive(Debug, Default, Deserialize)]
struct QueryResponse {
    results: Option<HashMap<String, Option<QueryResult>>>,
}

#[derive(Debug, Default, Deserialize)]
struct QueryResult {
    frames: Option<Vec<Option<Frame>>>,
}

#[derive(Debug, Default, Deserialize)]
struct Frame {
    data: Option<FrameData>,
}

#[derive(Debug, Default, Deserialize)]
struct FrameData {
    time: Option<Vec<serde_json::Value>>,
    values: Option<Vec<serde_json::Value>>,
}

impl QueryResponse {
    fn first_frame(mut self, ref_id: &str) -> FrameData {
        self.results
            .as_mut()
            .and_then(|results| results.remove(ref_id))
            .flatten()
            .and_then(|result| result.frames)
            .and_then(|frames| frames.into_iter().next())
            .flatten()
            .and_then(|frame| frame.data)
            .unwrap_or_default()
    }
}

impl GrafanaAdapter {
    pub fn new(client: reqwest::Client, labels: LabelFormat) -> Self {
        Self { client, labels }
    }

    fn time_label(&self, time: &serde_json::Value) -> String {
        match time {
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(ms) => self.labels.epoch_millis(ms),
                None => n.to_string(),
            },
            serde_json::Value::String(s) => self.labels.rfc3339(s),
            _ => PLACEHOLDER.to_string(),
        }
    }

    fn normalize(&self, query: &str, body: QueryResponse) -> NormalizedSeries {
        let data = body.first_frame(REF_ID);
        let time = data.time.unwrap_or_default();
        let values = data.values.unwrap_or_default();

        if values.is_empty() {
            tracing::debug!(%query, "Grafana query returned no frame data");
        }

        let labels = time.iter().map(|t| self.time_label(t)).collect();
        let points = values
            .iter()
            .map(|v| {
                let mut point = Point::new();
                if let Some(value) = RawValue::from_json(v) {
                    point.insert(VALUE_KEY.to_string(), value);
                }
                point
            })
            .collect();

        NormalizedSeries::new(query, vec![Field::new(VALUE_KEY, query)], labels, points)
            .with_updated_at(Some(self.labels.datetime(Utc::now())))
    }
}

#[async_trait]
impl SourceAdapter for GrafanaAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Grafana
    }

    async fn fetch(&self, credentials: &Credentials) -> Result<NormalizedSeries, FetchError> {
        let query = credentials.get("query");
        let url = format!("{}/api/ds/query", trim_base(credentials.get("url")));
        tracing::debug!(%url, %query, "querying Grafana datasource");

        let request = self
            .client
            .post(&url)
            .bearer_auth(credentials.get("token"))
            .json(&QueryRequest {
                queries: vec![Query {
                    expr: query,
                    interval: QUERY_INTERVAL,
                }],
            });
        let response = http_client::send(self.kind(), request).await?;
        let body: QueryResponse = http_client::json(self.kind(), response).await?;
        Ok(self.normalize(query, body))
    }
}
