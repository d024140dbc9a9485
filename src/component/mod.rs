//! The catalog of step kinds available to a pipeline.

use crate::error::RegistryError;
use ahash::AHashMap;
use std::sync::Arc;
use tracing::debug;

mod descriptor;

pub use descriptor::*;

/// Holds every registered component descriptor, indexed by identity.
///
/// Registration order is preserved and drives every listing.
#[derive(Default, Clone)]
pub struct ComponentRegistry {
    descriptors: Vec<Arc<dyn ComponentDescriptor>>,
    by_identity: AHashMap<String, usize>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a descriptor. Identities are immutable once registered.
    pub fn register(
        &mut self,
        descriptor: Arc<dyn ComponentDescriptor>,
    ) -> Result<(), RegistryError> {
        let identity = descriptor.identity().to_string();
        if self.by_identity.contains_key(&identity) {
            return Err(RegistryError::DuplicateIdentity(identity));
        }
        debug!(%identity, category = descriptor.category(), "register: added component");
        self.by_identity.insert(identity, self.descriptors.len());
        self.descriptors.push(descriptor);
        Ok(())
    }

    /// Builder-style variant of [`register`](Self::register).
    pub fn with(mut self, descriptor: Arc<dyn ComponentDescriptor>) -> Result<Self, RegistryError> {
        self.register(descriptor)?;
        Ok(self)
    }

    pub fn resolve(
        &self,
        component_type: &str,
    ) -> Result<&Arc<dyn ComponentDescriptor>, RegistryError> {
        self.by_identity
            .get(component_type)
            .map(|&i| &self.descriptors[i])
            .ok_or_else(|| RegistryError::UnknownComponentType(component_type.to_string()))
    }

    pub fn contains(&self, component_type: &str) -> bool {
        self.by_identity.contains_key(component_type)
    }

    pub fn list_by_category(&self, category: &str) -> Vec<&Arc<dyn ComponentDescriptor>> {
        self.descriptors
            .iter()
            .filter(|d| d.category() == category)
            .collect()
    }

    pub fn list_by_kind(&self, kind: ComponentKind) -> Vec<&Arc<dyn ComponentDescriptor>> {
        self.descriptors.iter().filter(|d| d.kind() == kind).collect()
    }

    pub fn identities(&self) -> Vec<&str> {
        self.descriptors.iter().map(|d| d.identity()).collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("identities", &self.identities())
            .finish()
    }
}
