//! Permission gate deciding between full and degraded initialization.

use bridge_traits::permission::{Permission, PermissionChecker};
use core_runtime::events::ServiceMode;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Answers whether the permission that guards catalog loading is held.
///
/// The gate asks the platform every time; it never caches an answer, so a
/// permission granted while the service is alive is seen on the next check.
#[derive(Clone)]
pub struct PermissionGate {
    checker: Arc<dyn PermissionChecker>,
    permission: Permission,
}

impl PermissionGate {
    pub fn new(checker: Arc<dyn PermissionChecker>, permission: Permission) -> Self {
        Self {
            checker,
            permission,
        }
    }

    pub fn permission(&self) -> Permission {
        self.permission
    }

    pub fn has_required_permission(&self) -> bool {
        let granted = self.checker.has_permission(self.permission);
        debug!(permission = self.permission.as_str(), granted, "Permission check");
        granted
    }

    /// Initialization branch for the current grant state.
    pub fn decide(&self) -> ServiceMode {
        if self.has_required_permission() {
            ServiceMode::Full
        } else {
            ServiceMode::Degraded
        }
    }
}

impl fmt::Debug for PermissionGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionGate")
            .field("permission", &self.permission)
            .finish()
    }
}
