// Fetch adapter trait - one implementation per telemetry source
use crate::application::form::Credentials;
use crate::domain::series::NormalizedSeries;
use crate::domain::source::SourceKind;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("{source_name} fetch failed: HTTP {status}")]
    Status {
        source_name: &'static str,
        status: u16,
    },
    #[error("{source_name} fetch failed: {message}")]
    Transport {
        source_name: &'static str,
        message: String,
    },
}

impl FetchError {
    pub fn status(kind: SourceKind, status: reqwest::StatusCode) -> Self {
        FetchError::Status {
            source_name: kind.display_name(),
            status: status.as_u16(),
        }
    }

    pub fn transport(kind: SourceKind, err: impl std::fmt::Display) -> Self {
        FetchError::Transport {
            source_name: kind.display_name(),
            message: err.to_string(),
        }
    }

    pub fn source_name(&self) -> &'static str {
        match self {
            FetchError::Status { source_name, .. } | FetchError::Transport { source_name, .. } => {
                source_name
            }
        }
    }
}

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Fetch recent data once and normalize it. No retries.
    async fn fetch(&self, credentials: &Credentials) -> Result<NormalizedSeries, FetchError>;
}

/// Adapters keyed by the source they serve.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<SourceKind, Arc<dyn SourceAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its own kind, replacing any previous one.
    pub fn register(mut self, adapter: Arc<dyn SourceAdapter>) -> Self {
        self.adapters.insert(adapter.kind(), adapter);
        self
    }

    pub fn get(&self, kind: SourceKind) -> Option<Arc<dyn SourceAdapter>> {
        self.adapters.get(&kind).cloned()
    }

    pub fn supports(&self, kind: SourceKind) -> bool {
        self.adapters.contains_key(&kind)
    }
}
