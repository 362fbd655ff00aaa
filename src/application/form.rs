// Input form controller - rebuilds inputs per source and validates before loading
use crate::domain::source::{InputDescriptor, SourceKind};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please select a data source.")]
    NoSource,
    #[error("Please enter a valid {placeholder}.")]
    Missing {
        id: &'static str,
        placeholder: &'static str,
    },
}

/// Validated, trimmed input values for one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub source: SourceKind,
    values: HashMap<&'static str, String>,
}

impl Credentials {
    /// Value of a registry input. Validation guarantees every declared input is present.
    pub fn get(&self, id: &str) -> &str {
        self.values.get(id).map(String::as_str).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InputField {
    #[serde(flatten)]
    pub descriptor: InputDescriptor,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormView {
    pub source: Option<SourceKind>,
    pub inputs: Vec<InputField>,
    pub load_visible: bool,
}

#[derive(Debug, Clone, Default)]
pub struct InputForm {
    source: Option<SourceKind>,
    inputs: Vec<InputField>,
}

impl InputForm {
    /// Clear the form and rebuild it for `source_id`. Unknown or empty ids leave it empty.
    pub fn select(&mut self, source_id: Option<&str>) -> FormView {
        self.source = source_id.and_then(SourceKind::from_id);
        self.inputs = self
            .source
            .map(|kind| {
                kind.inputs()
                    .iter()
                    .map(|descriptor| InputField {
                        descriptor: *descriptor,
                        value: String::new(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        if self.source.is_none() && source_id.is_some_and(|id| !id.is_empty()) {
            tracing::debug!(source = ?source_id, "unknown source selected");
        }

        self.view()
    }

    pub fn source(&self) -> Option<SourceKind> {
        self.source
    }

    /// Set one input by id. Returns false when the current form has no such input.
    pub fn set_value(&mut self, id: &str, value: impl Into<String>) -> bool {
        match self.inputs.iter_mut().find(|f| f.descriptor.id == id) {
            Some(field) => {
                field.value = value.into();
                true
            }
            None => false,
        }
    }

    pub fn validate(&self) -> Result<Credentials, ValidationError> {
        let source = self.source.ok_or(ValidationError::NoSource)?;
        let mut values = HashMap::with_capacity(self.inputs.len());

        for field in &self.inputs {
            let value = field.value.trim();
            if value.is_empty() {
                return Err(ValidationError::Missing {
                    id: field.descriptor.id,
                    placeholder: field.descriptor.placeholder,
                });
            }
            values.insert(field.descriptor.id, value.to_string());
        }

        Ok(Credentials { source, values })
    }

    pub fn view(&self) -> FormView {
        FormView {
            source: self.source,
            inputs: self.inputs.clone(),
            load_visible: self.source.is_some(),
        }
    }
}

/// Fill and validate a form in one go.
#[cfg(test)]
pub(crate) fn credentials(kind: SourceKind, values: &[(&str, &str)]) -> Credentials {
    let mut form = InputForm::default();
    form.select(Some(kind.id()));
    for (id, value) in values {
        assert!(form.set_value(id, *value), "no input {id} for {kind:?}");
    }
    form.validate().expect("test credentials must be complete")
}
