// Infrastructure layer - External dependencies and adapters
pub mod adafruit;
pub mod adapters;
pub mod asset_cache;
pub mod blynk;
pub mod canvas;
pub mod config;
pub mod grafana;
pub mod http_client;
pub mod thingspeak;
