// Chart specification - plain data handed to the chart backend
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
}

/// Area fill under a line. Gradients are described, not computed; the backend
/// resolves them against the drawn chart area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Fill {
    None,
    Gradient { top: String, bottom: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub label: String,
    pub data: Vec<Option<f64>>,
    pub border_color: String,
    pub border_width: u32,
    pub fill: Fill,
    pub tension: f64,
    pub point_radius: u32,
    pub point_hover_radius: u32,
}

impl Dataset {
    pub fn line(label: String, data: Vec<Option<f64>>, color: &str) -> Self {
        Self {
            label,
            data,
            border_color: color.to_string(),
            border_width: 1,
            fill: Fill::None,
            tension: 0.2,
            point_radius: 0,
            point_hover_radius: 3,
        }
    }

    /// Vertical gradient from the line color to transparent.
    pub fn with_gradient(mut self) -> Self {
        self.fill = Fill::Gradient {
            top: format!("{}99", self.border_color),
            bottom: format!("{}00", self.border_color),
        };
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Legend {
    pub display: bool,
    pub position: String,
    pub align: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Axis {
    pub title: String,
    pub tick_rotation: Option<u32>,
    pub auto_skip: bool,
    pub grid_color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartOptions {
    pub responsive: bool,
    pub maintain_aspect_ratio: bool,
    pub aspect_ratio: Option<f64>,
    pub legend: Legend,
    pub x: Axis,
    pub y: Axis,
}

impl ChartOptions {
    /// Inline dashboard layout: vertical timestamp ticks, legend top-left.
    pub fn inline(y_title: &str, grid_color: &str) -> Self {
        Self {
            responsive: true,
            maintain_aspect_ratio: true,
            aspect_ratio: Some(2.5),
            legend: Legend {
                display: true,
                position: "top".to_string(),
                align: "start".to_string(),
            },
            x: Axis {
                title: "Timestamp".to_string(),
                tick_rotation: Some(90),
                auto_skip: true,
                grid_color: grid_color.to_string(),
            },
            y: Axis {
                title: y_title.to_string(),
                tick_rotation: None,
                auto_skip: true,
                grid_color: grid_color.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSpec {
    pub id: String,
    pub title: String,
    pub kind: ChartKind,
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
    pub options: ChartOptions,
}
