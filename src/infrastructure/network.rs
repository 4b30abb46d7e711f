//! Network class probe.

use std::sync::atomic::{AtomicU8, Ordering};

use async_trait::async_trait;

use crate::domain::entities::NetworkClass;
use crate::domain::ports::NetworkProbePort;

/// Probe that reports a configured class; the host app updates it as the
/// connection changes.
#[derive(Debug)]
pub struct StaticNetworkProbe {
    class: AtomicU8,
}

impl StaticNetworkProbe {
    /// Creates a probe reporting `class`.
    #[must_use]
    pub const fn new(class: NetworkClass) -> Self {
        Self {
            class: AtomicU8::new(encode(class)),
        }
    }

    /// Replaces the reported class.
    pub fn set(&self, class: NetworkClass) {
        self.class.store(encode(class), Ordering::Relaxed);
    }
}

impl Default for StaticNetworkProbe {
    fn default() -> Self {
        Self::new(NetworkClass::Unknown)
    }
}

const fn encode(class: NetworkClass) -> u8 {
    match class {
        NetworkClass::Wifi => 0,
        NetworkClass::Cellular => 1,
        NetworkClass::Unknown => 2,
    }
}

const fn decode(raw: u8) -> NetworkClass {
    match raw {
        0 => NetworkClass::Wifi,
        1 => NetworkClass::Cellular,
        _ => NetworkClass::Unknown,
    }
}

#[async_trait]
impl NetworkProbePort for StaticNetworkProbe {
    async fn network_class(&self) -> NetworkClass {
        decode(self.class.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reports_configured_class() {
        let probe = StaticNetworkProbe::new(NetworkClass::Cellular);
        assert_eq!(probe.network_class().await, NetworkClass::Cellular);

        probe.set(NetworkClass::Wifi);
        assert_eq!(probe.network_class().await, NetworkClass::Wifi);
    }

    #[tokio::test]
    async fn test_defaults_to_unknown() {
        let probe = StaticNetworkProbe::default();
        assert_eq!(probe.network_class().await, NetworkClass::Unknown);
    }
}
