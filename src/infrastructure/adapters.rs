// Wires the configured HTTP adapters into a registry
use crate::application::source_adapter::AdapterRegistry;
use crate::infrastructure::adafruit::AdafruitAdapter;
use crate::infrastructure::blynk::BlynkAdapter;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::grafana::GrafanaAdapter;
use crate::infrastructure::http_client::build_client;
use crate::infrastructure::thingspeak::ThingSpeakAdapter;
use std::sync::Arc;

pub fn build_registry(config: &AppConfig) -> anyhow::Result<AdapterRegistry> {
    let client = build_client(config.http.timeout())?;
    let labels = config.http.label_format()?;
    let sources = &config.sources;

    Ok(AdapterRegistry::new()
        .register(Arc::new(ThingSpeakAdapter::new(
            client.clone(),
            &sources.thingspeak.base_url,
            sources.thingspeak.results,
            labels.clone(),
        )))
        .register(Arc::new(AdafruitAdapter::new(
            client.clone(),
            &sources.adafruit.base_url,
            sources.adafruit.limit,
            labels.clone(),
        )))
        .register(Arc::new(BlynkAdapter::new(
            client.clone(),
            &sources.blynk.base_url,
            labels.clone(),
        )))
        .register(Arc::new(GrafanaAdapter::new(client, labels))))
}
