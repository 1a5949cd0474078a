//! Ordered plugin registry.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use super::Plugin;
use crate::error::RegistryError;

/// Plugins in registration order, with unique names.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn Plugin>>,
    names: HashSet<String>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a plugin.
    ///
    /// Fails if the name is empty or already taken.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) -> Result<(), RegistryError> {
        let name = plugin.name().to_string();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if !self.names.insert(name.clone()) {
            return Err(RegistryError::DuplicateName(name));
        }
        self.plugins.push(plugin);
        info!(plugin = %name, "Plugin registered");
        Ok(())
    }

    /// Looks a plugin up by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Plugin>> {
        self.plugins.iter().find(|p| p.name() == name)
    }

    /// Like [`get`](Self::get), but reports a missing plugin as an error.
    pub fn find(&self, name: &str) -> Result<&Arc<dyn Plugin>, RegistryError> {
        self.get(name).ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// Snapshot of the plugins in registration order.
    pub fn list(&self) -> Vec<Arc<dyn Plugin>> {
        self.plugins.clone()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Plugins in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Plugin>> {
        self.plugins.iter()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.plugins.iter().map(|p| p.name())).finish()
    }
}
