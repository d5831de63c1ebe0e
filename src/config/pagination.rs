//! List pagination configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Pagination bounds for list queries
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PaginationConfig {
    /// Largest accepted `limit`
    #[serde(default = "default_max_limit")]
    pub max_limit: u32,
}

impl PaginationConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_limit == 0 {
            return Err(ValidationError::InvalidPaginationLimit);
        }
        Ok(())
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            max_limit: default_max_limit(),
        }
    }
}

fn default_max_limit() -> u32 {
    100
}
