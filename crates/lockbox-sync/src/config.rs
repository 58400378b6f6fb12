use serde::{Deserialize, Serialize};

/// Page size caps for the sync engines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Most boxes returned by one vault pull.
    pub vault_max_page: usize,
    /// Most messages returned by one channel read.
    pub channel_max_page: usize,
    /// Most channels listed for one user.
    pub user_channels_max_page: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            vault_max_page: 1000,
            channel_max_page: 100,
            user_channels_max_page: 100,
        }
    }
}
