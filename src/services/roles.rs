use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::models::{Role, RoleAssignment};
use crate::providers::{ProviderError, RoleStore};

/// Admin status as far as it could be established. `Unknown` is never treated
/// as admin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminStatus {
    Admin,
    NonAdmin,
    Unknown(String),
}

impl AdminStatus {
    pub fn is_admin(&self) -> bool {
        matches!(self, AdminStatus::Admin)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AdminStatus::Admin => "admin",
            AdminStatus::NonAdmin => "non_admin",
            AdminStatus::Unknown(_) => "unknown",
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            AdminStatus::Unknown(reason) => Some(reason),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct RoleResolver {
    roles: Arc<dyn RoleStore>,
}

impl RoleResolver {
    pub fn new(roles: Arc<dyn RoleStore>) -> Self {
        Self { roles }
    }

    #[instrument(skip(self))]
    pub async fn resolve(&self, user_id: Uuid) -> AdminStatus {
        match self.roles.find_role(user_id, Role::Admin).await {
            Ok(Some(_)) => AdminStatus::Admin,
            Ok(None) => AdminStatus::NonAdmin,
            Err(e) => {
                warn!(error = %e, "Admin role lookup failed");
                AdminStatus::Unknown(e.to_string())
            }
        }
    }

    pub async fn is_admin(&self, user_id: Uuid) -> bool {
        self.resolve(user_id).await.is_admin()
    }

    pub async fn list_admins(&self) -> Result<Vec<RoleAssignment>, ProviderError> {
        self.roles.list_role(Role::Admin).await
    }
}
