//! Network probe port definition.

use async_trait::async_trait;

use crate::domain::entities::NetworkClass;

/// Port answering "what kind of network am I on".
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NetworkProbePort: Send + Sync {
    /// Returns the current coarse network class.
    async fn network_class(&self) -> NetworkClass;
}
