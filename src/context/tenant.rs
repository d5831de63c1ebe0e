//! Per-tenant database handle carried by a request.

use std::fmt;

use mongodb::Database;
use thiserror::Error;

/// Database handle resolved by the tenant manager for one tenant.
///
/// The handle is shared and non-owning: the repository reads through it but
/// never closes it.
#[derive(Clone)]
pub struct TenantDatabase {
    tenant_id: String,
    database: Database,
}

impl TenantDatabase {
    pub fn new(tenant_id: impl Into<String>, database: Database) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            database,
        }
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Name of the underlying database.
    pub fn name(&self) -> &str {
        self.database.name()
    }
}

impl fmt::Debug for TenantDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantDatabase")
            .field("tenant_id", &self.tenant_id)
            .field("database", &self.database.name())
            .finish()
    }
}

/// Failure to resolve a tenant database from a request context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TenantContextError {
    /// No database handle is attached. Callers fall back to the shared
    /// connection on this variant and on no other.
    #[error("tenant context required")]
    Required,

    #[error("tenant database belongs to {actual}, request is for {expected}")]
    Mismatch { expected: String, actual: String },
}
