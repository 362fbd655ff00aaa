// Blynk cloud pin value adapter; the API only returns the current value
use crate::application::form::Credentials;
use crate::application::source_adapter::{FetchError, SourceAdapter};
use crate::domain::series::{Field, LabelFormat, NormalizedSeries, Point, RawValue};
use crate::domain::source::SourceKind;
use crate::infrastructure::http_client::{self, trim_base};
use async_trait::async_trait;
use chrono::Utc;

const VALUE_KEY: &str = "value";

#[derive(Debug, Clone)]
pub struct BlynkAdapter {
    client: reqwest::Client,
    base_url: String,
    labels: LabelFormat,
}

impl BlynkAdapter {
    pub fn new(client: reqwest::Client, base_url: &str, labels: LabelFormat) -> Self {
        Self {
            client,
            base_url: trim_base(base_url),
            labels,
        }
    }

    fn pin_url(&self, token: &str, pin: &str) -> String {
        format!(
            "{}/external/api/get?token={}&{}",
            self.base_url,
            urlencoding::encode(token),
            urlencoding::encode(pin)
        )
    }

    fn normalize(&self, pin: &str, body: &str) -> NormalizedSeries {
        let now = self.labels.datetime(Utc::now());
        let label = format!("Pin {pin}");

        let mut point = Point::new();
        point.insert(VALUE_KEY.to_string(), RawValue::from(body.trim()));

        NormalizedSeries::new(
            label.clone(),
            vec![Field::new(VALUE_KEY, label)],
            vec![now.clone()],
            vec![point],
        )
        .with_updated_at(Some(now))
    }
}

#[async_trait]
impl SourceAdapter for BlynkAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Blynk
    }

    async fn fetch(&self, credentials: &Credentials) -> Result<NormalizedSeries, FetchError> {
        let pin = credentials.get("pin");
        let url = self.pin_url(credentials.get("auth"), pin);
        tracing::debug!(%pin, "requesting Blynk pin value");

        let response = http_client::send(self.kind(), self.client.get(&url)).await?;
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::transport(self.kind(), e))?;
        Ok(self.normalize(pin, &body))
    }
}
