//! Tool registry: the catalog handed to the model on every turn call.

use cp_protocol::ToolSpec;

/// Immutable, ordered tool catalog. Built once and shared read-only.
pub struct ToolRegistry {
    specs: Vec<ToolSpec>,
}

impl ToolRegistry {
    /// Build with every known tool.
    pub fn with_defaults() -> Self {
        Self {
            specs: cp_cloud_tools::all_specs(),
        }
    }

    /// The catalog, in a stable order.
    pub fn list_tools(&self) -> &[ToolSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
