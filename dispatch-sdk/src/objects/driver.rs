//! Driver API request types.

use serde::{Deserialize, Serialize};

use super::default_limit;

/// Query parameters for the available-orders feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableOrdersQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

impl Default for AvailableOrdersQuery {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
        }
    }
}
