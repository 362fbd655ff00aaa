// ThingSpeak channel feed adapter
use crate::application::form::Credentials;
use crate::application::source_adapter::{FetchError, SourceAdapter};
use crate::domain::series::{Field, LabelFormat, NormalizedSeries, PLACEHOLDER, Point, RawValue};
use crate::domain::source::SourceKind;
use crate::infrastructure::http_client::{self, trim_base};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

const MAX_FIELDS: usize = 8;

#[derive(Debug, Clone)]
pub struct ThingSpeakAdapter {
    client: reqwest::Client,
    base_url: String,
    results: Option<u32>,
    labels: LabelFormat,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChannelFeed {
    channel: Channel,
    feeds: Vec<Feed>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Channel {
    name: Option<String>,
    description: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Feed {
    created_at: Option<String>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

impl ThingSpeakAdapter {
    pub fn new(client: reqwest::Client, base_url: &str, results: Option<u32>, labels: LabelFormat) -> Self {
        Self {
            client,
            base_url: trim_base(base_url),
            results,
            labels,
        }
    }

    fn feed_url(&self, channel_id: &str) -> String {
        let url = format!(
            "{}/channels/{}/feeds.json",
            self.base_url,
            urlencoding::encode(channel_id)
        );
        match self.results {
            Some(n) => format!("{url}?results={n}"),
            None => url,
        }
    }

    fn normalize(&self, body: ChannelFeed) -> NormalizedSeries {
        let channel = body.channel;

        // fieldN labels; unnamed fields are not part of the channel
        let fields: Vec<Field> = (1..=MAX_FIELDS)
            .filter_map(|i| {
                let key = format!("field{i}");
                let label = channel
                    .other
                    .get(&key)
                    .and_then(|v| v.as_str())
                    .filter(|label| !label.trim().is_empty())?
                    .to_string();
                Some(Field { key, label })
            })
            .collect();

        let labels = body
            .feeds
            .iter()
            .map(|feed| match &feed.created_at {
                Some(stamp) => self.labels.rfc3339(stamp),
                None => PLACEHOLDER.to_string(),
            })
            .collect();

        let points = body
            .feeds
            .iter()
            .map(|feed| {
                fields
                    .iter()
                    .filter_map(|field| {
                        let value = RawValue::from_json(feed.other.get(&field.key)?)?;
                        Some((field.key.clone(), value))
                    })
                    .collect::<Point>()
            })
            .collect();

        NormalizedSeries::new(channel.name.unwrap_or_default(), fields, labels, points)
            .with_description(channel.description)
            .with_created_at(channel.created_at.map(|c| self.labels.rfc3339(&c)))
            .with_updated_at(channel.updated_at.map(|u| self.labels.rfc3339(&u)))
    }
}

#[async_trait]
impl SourceAdapter for ThingSpeakAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::ThingSpeak
    }

    async fn fetch(&self, credentials: &Credentials) -> Result<NormalizedSeries, FetchError> {
        let url = self.feed_url(credentials.get("channelId"));
        tracing::debug!(%url, "requesting ThingSpeak feed");

        let response = http_client::send(self.kind(), self.client.get(&url)).await?;
        let body: ChannelFeed = http_client::json(self.kind(), response).await?;
        Ok(self.normalize(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::form::credentials;
    use crate::infrastructure::http_client::test_upstream;
    use axum::extract::{Path, RawQuery};
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    fn channel_json() -> serde_json::Value {
        json!({
            "channel": {
                "id": 357142,
                "name": "Weather Station",
                "description": "Rooftop sensors",
                "field1": "Temperature",
                "field3": "Humidity",
                "created_at": "2024-01-01T00:00:00Z",
                "updated_at": "2024-03-01T09:30:00Z"
            },
            "feeds": [
                {"created_at": "2024-03-01T10:00:00Z", "entry_id": 1, "field1": "21.5", "field3": "40"},
                {"created_at": "2024-03-01T10:01:00Z", "entry_id": 2, "field1": "21.7", "field3": null},
                {"created_at": "2024-03-01T10:02:00Z", "entry_id": 3, "field1": "21.9", "field3": "42"}
            ]
        })
    }

    async fn upstream() -> String {
        let router = Router::new().route(
            "/channels/:id/feeds.json",
            get(|Path(id): Path<String>, RawQuery(query): RawQuery| async move {
                match id.as_str() {
                    "357142" => (StatusCode::OK, Json(channel_json())),
                    "777" => {
                        assert_eq!(query.as_deref(), Some("results=2"));
                        (StatusCode::OK, Json(json!({"feeds": [{"field1": "1"}]})))
                    }
                    _ => (StatusCode::NOT_FOUND, Json(json!("-1"))),
                }
            }),
        );
        test_upstream::serve(router).await
    }

    fn adapter(base: &str, results: Option<u32>) -> ThingSpeakAdapter {
        ThingSpeakAdapter::new(reqwest::Client::new(), base, results, LabelFormat::default())
    }

    #[tokio::test]
    async fn test_fetch_keeps_labelled_fields() {
        let base = upstream().await;
        let creds = credentials(SourceKind::ThingSpeak, &[("channelId", "357142")]);

        let series = adapter(&base, None).fetch(&creds).await.unwrap();

        assert_eq!(
            series.fields,
            vec![Field::new("field1", "Temperature"), Field::new("field3", "Humidity")]
        );
        assert_eq!(series.len(), 3);
        assert_eq!(series.labels[0], "2024-03-01 10:00:00");
        assert_eq!(series.points[0]["field1"], RawValue::from("21.5"));
        assert!(!series.points[1].contains_key("field3"));
        assert_eq!(series.name, "Weather Station");
        assert_eq!(series.description.as_deref(), Some("Rooftop sensors"));
        assert_eq!(series.updated_at.as_deref(), Some("2024-03-01 09:30:00"));
    }

    #[tokio::test]
    async fn test_missing_channel_is_defaulted() {
        let base = upstream().await;
        let creds = credentials(SourceKind::ThingSpeak, &[("channelId", "777")]);

        let series = adapter(&base, Some(2)).fetch(&creds).await.unwrap();

        assert!(series.fields.is_empty());
        assert_eq!(series.labels, vec![PLACEHOLDER.to_string()]);
        assert_eq!(series.name, "");
        assert_eq!(series.description, None);
    }

    #[tokio::test]
    async fn test_not_found_is_fetch_error() {
        let base = upstream().await;
        let creds = credentials(SourceKind::ThingSpeak, &[("channelId", "1")]);

        let err = adapter(&base, None).fetch(&creds).await.unwrap_err();
        assert_eq!(err.to_string(), "ThingSpeak fetch failed: HTTP 404");
        assert_eq!(err.source_name(), "ThingSpeak");
    }

    #[test]
    fn test_feed_url_encodes_channel() {
        let adapter = adapter("https://api.thingspeak.com/", Some(50));
        assert_eq!(
            adapter.feed_url("12 34"),
            "https://api.thingspeak.com/channels/12%2034/feeds.json?results=50"
        );
    }
}
