// Chart modal - enlarged copy of a rendered chart
use crate::application::render::{ChartBackend, ChartHandle};
use crate::domain::chart::ChartSpec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DismissReason {
    Overlay,
    Close,
}

#[derive(Debug)]
pub struct ModalChart {
    handle: ChartHandle,
    spec: ChartSpec,
}

pub struct ChartModal;

impl ChartModal {
    /// Draw an independent copy of `source` sized to fill the modal.
    pub fn open(backend: &mut dyn ChartBackend, source: &ChartSpec) -> ModalChart {
        let mut spec = source.clone();
        spec.options.responsive = true;
        spec.options.maintain_aspect_ratio = false;
        spec.options.aspect_ratio = None;

        let handle = backend.create(&spec);
        tracing::debug!(chart = %spec.id, "opened chart modal");
        ModalChart { handle, spec }
    }
}

impl ModalChart {
    pub fn spec(&self) -> &ChartSpec {
        &self.spec
    }

    pub fn close(self, backend: &mut dyn ChartBackend, reason: DismissReason) {
        tracing::debug!(chart = %self.spec.id, ?reason, "closed chart modal");
        backend.dispose(self.handle);
    }
}
