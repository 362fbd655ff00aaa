// Adafruit IO feed data adapter
use crate::application::form::Credentials;
use crate::application::source_adapter::{FetchError, SourceAdapter};
use crate::domain::series::{Field, LabelFormat, NormalizedSeries, PLACEHOLDER, Point, RawValue};
use crate::domain::source::SourceKind;
use crate::infrastructure::http_client::{self, trim_base};
use async_trait::async_trait;
use serde::Deserialize;

const VALUE_KEY: &str = "value";

#[derive(Debug, Clone)]
pub struct AdafruitAdapter {
    client: reqwest::Client,
    base_url: String,
    limit: Option<u32>,
    labels: LabelFormat,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DataPoint {
    created_at: Option<String>,
    value: Option<serde_json::Value>,
}

impl AdafruitAdapter {
    pub fn new(client: reqwest::Client, base_url: &str, limit: Option<u32>, labels: LabelFormat) -> Self {
        Self {
            client,
            base_url: trim_base(base_url),
            limit,
            labels,
        }
    }

    fn data_url(&self, username: &str, feed: &str) -> String {
        let url = format!(
            "{}/api/v2/{}/feeds/{}/data",
            self.base_url,
            urlencoding::encode(username),
            urlencoding::encode(feed)
        );
        match self.limit {
            Some(n) => format!("{url}?limit={n}"),
            None => url,
        }
    }

    fn normalize(&self, feed: &str, data: Vec<DataPoint>) -> NormalizedSeries {
        let labels = data
            .iter()
            .map(|d| match &d.created_at {
                Some(stamp) => self.labels.rfc3339(stamp),
                None => PLACEHOLDER.to_string(),
            })
            .collect();

        let points = data
            .iter()
            .map(|d| {
                let mut point = Point::new();
                if let Some(value) = d.value.as_ref().and_then(RawValue::from_json) {
                    point.insert(VALUE_KEY.to_string(), value);
                }
                point
            })
            .collect();

        NormalizedSeries::new(feed, vec![Field::new(VALUE_KEY, feed)], labels, points)
    }
}

#[async_trait]
impl SourceAdapter for AdafruitAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Adafruit
    }

    async fn fetch(&self, credentials: &Credentials) -> Result<NormalizedSeries, FetchError> {
        let feed = credentials.get("feed");
        let url = self.data_url(credentials.get("username"), feed);
        tracing::debug!(%url, "requesting Adafruit IO feed data");

        let request = self.client.get(&url).header("X-AIO-Key", credentials.get("key"));
        let response = http_client::send(self.kind(), request).await?;
        let data: Vec<DataPoint> = http_client::json(self.kind(), response).await?;
        Ok(self.normalize(feed, data))
    }
}
