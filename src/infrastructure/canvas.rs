// In-memory chart backend; resolves dynamic styling when a chart is drawn
use crate::application::render::{ChartBackend, ChartHandle};
use crate::domain::chart::{ChartSpec, Fill};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

const SURFACE_WIDTH: f64 = 1000.0;
const MODAL_HEIGHT: f64 = 600.0;
const LEGEND_HEIGHT: f64 = 40.0;
const TICK_HEIGHT: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartArea {
    pub top: f64,
    pub bottom: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradientStop {
    pub offset: f64,
    pub color: String,
}

/// A vertical linear gradient spanning the chart area.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearGradient {
    pub y0: f64,
    pub y1: f64,
    pub stops: Vec<GradientStop>,
}

#[derive(Debug, Clone)]
pub struct DrawnChart {
    pub spec: ChartSpec,
    pub area: ChartArea,
    /// One entry per dataset; `None` for datasets without area fill.
    pub backgrounds: Vec<Option<LinearGradient>>,
}

#[derive(Debug, Default)]
struct CanvasState {
    next_handle: u64,
    live: HashMap<ChartHandle, DrawnChart>,
    disposed: u64,
}

/// Cloning yields another handle onto the same surface.
#[derive(Debug, Clone, Default)]
pub struct Canvas {
    state: Arc<Mutex<CanvasState>>,
}

impl Canvas {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, CanvasState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn live_count(&self) -> usize {
        self.state().live.len()
    }

    pub fn disposed_count(&self) -> u64 {
        self.state().disposed
    }

    pub fn drawn(&self, handle: ChartHandle) -> Option<DrawnChart> {
        self.state().live.get(&handle).cloned()
    }

    pub fn live_chart_ids(&self) -> Vec<String> {
        let state = self.state();
        let mut ids: Vec<_> = state.live.values().map(|c| c.spec.id.clone()).collect();
        ids.sort();
        ids
    }
}

fn chart_area(spec: &ChartSpec) -> ChartArea {
    let height = match spec.options.aspect_ratio {
        Some(ratio) if spec.options.maintain_aspect_ratio && ratio > 0.0 => SURFACE_WIDTH / ratio,
        _ => MODAL_HEIGHT,
    };
    let top = if spec.options.legend.display { LEGEND_HEIGHT } else { 0.0 };
    ChartArea {
        top,
        bottom: (height - TICK_HEIGHT).max(top),
    }
}

fn resolve_fill(fill: &Fill, area: ChartArea) -> Option<LinearGradient> {
    match fill {
        Fill::None => None,
        Fill::Gradient { top, bottom } => Some(LinearGradient {
            y0: area.top,
            y1: area.bottom,
            stops: vec![
                GradientStop {
                    offset: 0.0,
                    color: top.clone(),
                },
                GradientStop {
                    offset: 1.0,
                    color: bottom.clone(),
                },
            ],
        }),
    }
}

impl ChartBackend for Canvas {
    fn create(&mut self, spec: &ChartSpec) -> ChartHandle {
        let area = chart_area(spec);
        let backgrounds = spec
            .datasets
            .iter()
            .map(|d| resolve_fill(&d.fill, area))
            .collect();

        let mut state = self.state();
        state.next_handle += 1;
        let handle = ChartHandle(state.next_handle);
        state.live.insert(
            handle,
            DrawnChart {
                spec: spec.clone(),
                area,
                backgrounds,
            },
        );
        handle
    }

    fn dispose(&mut self, handle: ChartHandle) {
        let mut state = self.state();
        if state.live.remove(&handle).is_some() {
            state.disposed += 1;
        } else {
            tracing::warn!(?handle, "dispose of unknown chart handle");
        }
    }
}
