//! Audit trail for lifecycle operations.
//!
//! Events go to the `audit` tracing target with the related object ids, so
//! they can be filtered (`RUST_LOG=audit=info`) independently of debug output.

use tracing::{info, warn};

/// Provider audit logger
pub struct ProviderAuditLogger {
    component: String,
    enabled: bool,
}

impl ProviderAuditLogger {
    pub fn new(component: &str) -> Self {
        Self {
            component: component.to_string(),
            enabled: true,
        }
    }

    /// Create a noop audit logger (for testing)
    pub fn new_noop() -> Self {
        Self {
            component: String::new(),
            enabled: false,
        }
    }

    pub fn submitted(&self, operation: &str, entity_id: &str) {
        if self.enabled {
            info!(target: "audit", component = %self.component, entity_id = %entity_id,
                "Submitted {} for {}", operation, entity_id);
        }
    }

    pub fn succeeded(&self, operation: &str, entity_id: &str, attempts: u32) {
        if self.enabled {
            info!(target: "audit", component = %self.component, entity_id = %entity_id,
                "{} completed for {} after {} status checks", operation, entity_id, attempts);
        }
    }

    pub fn rejected(&self, operation: &str, detail: &str) {
        if self.enabled {
            warn!(target: "audit", component = %self.component,
                "{} rejected: {}", operation, detail);
        }
    }

    pub fn failed(&self, operation: &str, entity_id: &str, category: &str, detail: &str) {
        if self.enabled {
            warn!(target: "audit", component = %self.component, entity_id = %entity_id,
                "{} {} for {}: {}", operation, category, entity_id, detail);
        }
    }

    pub fn already_deleted(&self, resource: &str, entity_id: &str) {
        if self.enabled {
            info!(target: "audit", component = %self.component, entity_id = %entity_id,
                "{} {} already deleted", resource, entity_id);
        }
    }
}

impl Default for ProviderAuditLogger {
    fn default() -> Self {
        Self::new("provider")
    }
}
