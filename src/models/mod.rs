pub mod digest;
pub mod local;
pub mod reference;

pub use digest::normalize_hash;
pub use local::{LocalRegistry, OllamaLocalRegistry};
pub use reference::ModelReference;

use serde::Deserialize;

/// An installed model as reported by the local registry
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Hash)]
pub struct Model {
    pub name: String,
    pub digest: String,
}

impl Model {
    #[must_use]
    pub fn new(name: impl Into<String>, digest: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            digest: digest.into(),
        }
    }

    /// Registry coordinates of this model
    #[must_use]
    pub fn reference(&self, default_namespace: &str) -> ModelReference {
        ModelReference::parse(&self.name, default_namespace)
    }
}
