// Source registry - telemetry sources and the inputs each one requires
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Mqtt,
    ThingSpeak,
    Adafruit,
    Blynk,
    Grafana,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InputDescriptor {
    pub id: &'static str,
    pub placeholder: &'static str,
}

const fn input(id: &'static str, placeholder: &'static str) -> InputDescriptor {
    InputDescriptor { id, placeholder }
}

const MQTT_INPUTS: &[InputDescriptor] = &[
    input("broker", "MQTT Broker"),
    input("port", "Port"),
    input("topic", "Topic"),
];

const THINGSPEAK_INPUTS: &[InputDescriptor] = &[input("channelId", "Channel ID e.g. 357142")];

const ADAFRUIT_INPUTS: &[InputDescriptor] = &[
    input("username", "Username"),
    input("key", "AIO Key"),
    input("feed", "Feed Name"),
];

const BLYNK_INPUTS: &[InputDescriptor] = &[
    input("auth", "Auth Token"),
    input("pin", "Virtual Pin (V0, V1...)"),
];

const GRAFANA_INPUTS: &[InputDescriptor] = &[
    input("url", "Grafana API URL"),
    input("token", "API Token"),
    input("query", "Query/Metric Name"),
];

impl SourceKind {
    pub const ALL: [SourceKind; 5] = [
        SourceKind::Mqtt,
        SourceKind::ThingSpeak,
        SourceKind::Adafruit,
        SourceKind::Blynk,
        SourceKind::Grafana,
    ];

    /// Look up a source by its form identifier. Unknown identifiers yield `None`.
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }

    pub fn id(self) -> &'static str {
        match self {
            SourceKind::Mqtt => "mqtt",
            SourceKind::ThingSpeak => "thingspeak",
            SourceKind::Adafruit => "adafruit",
            SourceKind::Blynk => "blynk",
            SourceKind::Grafana => "grafana",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            SourceKind::Mqtt => "MQTT Bridge",
            SourceKind::ThingSpeak => "ThingSpeak",
            SourceKind::Adafruit => "Adafruit IO",
            SourceKind::Blynk => "Blynk",
            SourceKind::Grafana => "Grafana",
        }
    }

    /// Required inputs, in the order the form shows them.
    pub fn inputs(self) -> &'static [InputDescriptor] {
        match self {
            SourceKind::Mqtt => MQTT_INPUTS,
            SourceKind::ThingSpeak => THINGSPEAK_INPUTS,
            SourceKind::Adafruit => ADAFRUIT_INPUTS,
            SourceKind::Blynk => BLYNK_INPUTS,
            SourceKind::Grafana => GRAFANA_INPUTS,
        }
    }
}

/// Registry entry as listed to the page.
#[derive(Debug, Clone, Serialize)]
pub struct SourceListing {
    pub id: &'static str,
    pub name: &'static str,
    pub inputs: &'static [InputDescriptor],
}

pub fn list_sources() -> Vec<SourceListing> {
    SourceKind::ALL
        .into_iter()
        .map(|kind| SourceListing {
            id: kind.id(),
            name: kind.display_name(),
            inputs: kind.inputs(),
        })
        .collect()
}
