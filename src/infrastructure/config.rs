use crate::application::dashboard_service::DashboardSettings;
use crate::application::render::{RenderSettings, TableOptions};
use crate::domain::series::LabelFormat;
use crate::domain::slice::SliceSelection;
use anyhow::Context;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub http: HttpSettings,
    pub sources: SourcesSettings,
    pub dashboard: DashboardConfig,
    pub assets: AssetSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    /// Display format for upstream timestamps (chrono strftime syntax, UTC).
    pub label_format: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            label_format: "%Y-%m-%d %H:%M:%S".to_string(),
        }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn label_format(&self) -> anyhow::Result<LabelFormat> {
        LabelFormat::new(self.label_format.clone()).context("http.label_format")
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SourcesSettings {
    pub thingspeak: ThingSpeakSettings,
    pub adafruit: AdafruitSettings,
    pub blynk: BlynkSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ThingSpeakSettings {
    pub base_url: String,
    pub results: Option<u32>,
}

impl Default for ThingSpeakSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.thingspeak.com".to_string(),
            results: Some(50),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AdafruitSettings {
    pub base_url: String,
    pub limit: Option<u32>,
}

impl Default for AdafruitSettings {
    fn default() -> Self {
        Self {
            base_url: "https://io.adafruit.com".to_string(),
            limit: Some(50),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BlynkSettings {
    pub base_url: String,
}

impl Default for BlynkSettings {
    fn default() -> Self {
        Self {
            base_url: "https://blynk.cloud".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    /// "all" or a trailing window such as "20".
    pub default_slice: String,
    pub notice_ttl_ms: u64,
    pub palette: Vec<String>,
    pub grid_color: String,
    pub serial_column: bool,
    pub copy_control: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        let render = RenderSettings::default();
        Self {
            default_slice: "all".to_string(),
            notice_ttl_ms: 3000,
            palette: render.palette,
            grid_color: render.grid_color,
            serial_column: render.table.serial_column,
            copy_control: render.table.copy_control,
        }
    }
}

impl DashboardConfig {
    pub fn settings(&self) -> anyhow::Result<DashboardSettings> {
        let default_selection: SliceSelection = self
            .default_slice
            .parse()
            .context("dashboard.default_slice")?;

        Ok(DashboardSettings {
            default_selection,
            notice_ttl: Duration::from_millis(self.notice_ttl_ms),
            render: RenderSettings {
                palette: self.palette.clone(),
                grid_color: self.grid_color.clone(),
                table: TableOptions {
                    serial_column: self.serial_column,
                    copy_control: self.copy_control,
                },
            },
        })
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AssetSettings {
    pub cache_name: String,
    pub dir: PathBuf,
    pub manifest: Vec<String>,
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            cache_name: "opendots-cache-v1".to_string(),
            dir: PathBuf::from("static"),
            manifest: ["/", "/index.html", "/manifest.json", "/resrc/images/OpenDots.png"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Load `config/dashboard.{toml,...}` if present, then `DASHBOARD__SECTION__KEY` overrides.
pub fn load_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/dashboard").required(false))
        .add_source(
            config::Environment::with_prefix("DASHBOARD")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}
