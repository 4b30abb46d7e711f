mod fetcher_port;
mod file_system_port;
mod network_probe_port;
mod transform_port;

pub use fetcher_port::{FetcherPort, StoredFile};
pub use file_system_port::FileSystemPort;
pub use network_probe_port::NetworkProbePort;
pub use transform_port::TransformPort;
