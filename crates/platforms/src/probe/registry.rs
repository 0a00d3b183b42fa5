use std::sync::Arc;

use super::adapter::PlatformAdapter;

/// Ordered table of platform adapters.
///
/// Lookups walk the table in registration order and return the first adapter
/// whose URL predicate matches.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: Vec<Arc<dyn PlatformAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, adapter: Arc<dyn PlatformAdapter>) -> Self {
        self.adapters.push(adapter);
        self
    }

    pub fn find(&self, url: &str) -> Option<Arc<dyn PlatformAdapter>> {
        self.adapters.iter().find(|a| a.matches(url)).cloned()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    pub fn platform_names(&self) -> Vec<&'static str> {
        self.adapters.iter().map(|a| a.platform_name()).collect()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("platforms", &self.platform_names())
            .finish()
    }
}
