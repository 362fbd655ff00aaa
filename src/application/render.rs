// Render pipeline - chart specifications, details panel and the log table
use crate::domain::chart::{ChartKind, ChartOptions, ChartSpec, Dataset};
use crate::domain::series::{Field, PLACEHOLDER};
use crate::domain::slice::SlicedView;
use maud::html;
use serde::Serialize;

pub const COMBINED_CHART_ID: &str = "combined";
const COMBINED_TITLE: &str = "All Data Overview";
const EMPTY_CELL: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ChartHandle(pub u64);

/// Drawing side of the pipeline. Every handle returned by `create` must be
/// passed back to `dispose` exactly once.
pub trait ChartBackend: Send {
    fn create(&mut self, spec: &ChartSpec) -> ChartHandle;
    fn dispose(&mut self, handle: ChartHandle);
}

/// Charts currently alive on the backend, owned by a single pipeline.
#[derive(Debug, Default)]
pub struct ChartSet {
    charts: Vec<(ChartHandle, ChartSpec)>,
}

impl ChartSet {
    pub fn dispose_all(&mut self, backend: &mut dyn ChartBackend) {
        for (handle, _) in self.charts.drain(..) {
            backend.dispose(handle);
        }
    }

    pub fn get(&self, id: &str) -> Option<&ChartSpec> {
        self.charts
            .iter()
            .map(|(_, spec)| spec)
            .find(|spec| spec.id == id)
    }

    pub fn len(&self) -> usize {
        self.charts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.charts.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableOptions {
    pub serial_column: bool,
    pub copy_control: bool,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            serial_column: true,
            copy_control: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub palette: Vec<String>,
    pub grid_color: String,
    pub table: TableOptions,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            palette: [
                "#fde725", "#5ec962", "#21918c", "#3b528b", "#f89540", "#cc4778", "#7e03a8",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            grid_color: "#2c2c2cff".to_string(),
            table: TableOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Details {
    pub name: String,
    pub description: String,
    pub created_at: String,
    pub updated_at: String,
    pub fields: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    pub serial: usize,
    pub time: String,
    pub cells: Vec<String>,
    pub copy_payload: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<TableRow>,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderOutput {
    pub details: Details,
    pub charts: Vec<ChartSpec>,
    pub table: Table,
}

#[derive(Debug)]
pub struct RenderPipeline {
    settings: RenderSettings,
    charts: ChartSet,
}

impl RenderPipeline {
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            settings,
            charts: ChartSet::default(),
        }
    }

    pub fn charts(&self) -> &ChartSet {
        &self.charts
    }

    /// Dispose every chart this pipeline owns.
    pub fn clear(&mut self, backend: &mut dyn ChartBackend) {
        self.charts.dispose_all(backend);
    }

    pub fn render(&mut self, backend: &mut dyn ChartBackend, view: SlicedView<'_>) -> RenderOutput {
        self.charts.dispose_all(backend);

        let specs = self.chart_specs(&view);
        for spec in &specs {
            let handle = backend.create(spec);
            self.charts.charts.push((handle, spec.clone()));
        }

        tracing::debug!(
            series = %view.series.name,
            points = view.len(),
            charts = specs.len(),
            "rendered dashboard"
        );

        RenderOutput {
            details: details(&view),
            charts: specs,
            table: render_table(&view, self.settings.table),
        }
    }

    fn color(&self, index: usize) -> &str {
        match self.settings.palette.len() {
            0 => "#888888",
            len => &self.settings.palette[index % len],
        }
    }

    fn chart_specs(&self, view: &SlicedView<'_>) -> Vec<ChartSpec> {
        let labels = view.labels.to_vec();

        // (field, color, values) for every field with at least one number
        let lines: Vec<(&Field, &str, Vec<Option<f64>>)> = view
            .fields()
            .iter()
            .enumerate()
            .filter_map(|(idx, field)| {
                let values = numeric_values(view, &field.key);
                values
                    .iter()
                    .any(Option::is_some)
                    .then(|| (field, self.color(idx), values))
            })
            .collect();

        if lines.is_empty() {
            return Vec::new();
        }

        let grid = self.settings.grid_color.as_str();
        let mut specs = Vec::with_capacity(lines.len() + 1);

        specs.push(ChartSpec {
            id: COMBINED_CHART_ID.to_string(),
            title: COMBINED_TITLE.to_string(),
            kind: ChartKind::Line,
            labels: labels.clone(),
            datasets: lines
                .iter()
                .map(|(field, color, values)| Dataset::line(field.label.clone(), values.clone(), color))
                .collect(),
            options: ChartOptions::inline("Values", grid),
        });

        for (field, color, values) in lines {
            specs.push(ChartSpec {
                id: format!("field-{}", field.key),
                title: field.label.clone(),
                kind: ChartKind::Line,
                labels: labels.clone(),
                datasets: vec![Dataset::line(field.label.clone(), values, color).with_gradient()],
                options: ChartOptions::inline(&field.label, grid),
            });
        }

        specs
    }
}

fn numeric_values(view: &SlicedView<'_>, key: &str) -> Vec<Option<f64>> {
    view.points
        .iter()
        .map(|point| point.get(key).and_then(|v| v.as_number()))
        .collect()
}

fn or_placeholder(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| PLACEHOLDER.to_string())
}

fn details(view: &SlicedView<'_>) -> Details {
    let series = view.series;
    let fields = view
        .fields()
        .iter()
        .map(|f| f.label.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    Details {
        name: if series.name.is_empty() {
            PLACEHOLDER.to_string()
        } else {
            series.name.clone()
        },
        description: or_placeholder(&series.description),
        created_at: or_placeholder(&series.created_at),
        updated_at: or_placeholder(&series.updated_at),
        fields: if fields.is_empty() {
            PLACEHOLDER.to_string()
        } else {
            fields
        },
    }
}

fn render_table(view: &SlicedView<'_>, options: TableOptions) -> Table {
    let fields = view.fields();
    let lead_column = options.serial_column || options.copy_control;

    let mut header = Vec::with_capacity(fields.len() + 2);
    if lead_column {
        header.push("#".to_string());
    }
    header.push("Time".to_string());
    header.extend(fields.iter().map(|f| f.label.clone()));

    let rows: Vec<TableRow> = view
        .points
        .iter()
        .zip(view.labels)
        .enumerate()
        .map(|(i, (point, time))| {
            let cells: Vec<String> = fields
                .iter()
                .map(|field| {
                    point
                        .get(&field.key)
                        .and_then(|v| v.display())
                        .unwrap_or_else(|| EMPTY_CELL.to_string())
                })
                .collect();

            let mut payload = serde_json::Map::new();
            payload.insert("Time".to_string(), time.clone().into());
            for (field, cell) in fields.iter().zip(&cells) {
                // a label already taken ("Time" or a repeated label) gets its key appended
                let key = if payload.contains_key(&field.label) {
                    format!("{} ({})", field.label, field.key)
                } else {
                    field.label.clone()
                };
                payload.insert(key, cell.clone().into());
            }

            TableRow {
                serial: i + 1,
                time: time.clone(),
                cells,
                copy_payload: format!("{:#}", serde_json::Value::Object(payload)),
            }
        })
        .collect();

    let html = table_html(&header, &rows, options);
    Table { header, rows, html }
}

fn table_html(header: &[String], rows: &[TableRow], options: TableOptions) -> String {
    let lead_column = options.serial_column || options.copy_control;

    let markup = html! {
        table class="data-table" {
            thead {
                tr {
                    @for title in header {
                        th { (title) }
                    }
                }
            }
            tbody {
                @for row in rows {
                    tr data-json=[options.copy_control.then_some(&row.copy_payload)] {
                        @if lead_column {
                            td {
                                @if options.copy_control {
                                    button class="copy-btn" title="Copy JSON" { "📋" }
                                }
                                @if options.serial_column {
                                    (row.serial)
                                }
                            }
                        }
                        td { (row.time) }
                        @for cell in &row.cells {
                            td { (cell) }
                        }
                    }
                }
            }
        }
    };
    markup.into_string()
}
