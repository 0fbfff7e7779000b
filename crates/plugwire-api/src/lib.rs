// plugwire-api: wire codec and transports for the smart-home JSON device protocol

pub mod cipher;
pub mod error;
pub mod transport;

pub use error::Error;
pub use transport::udp::{Datagram, DiscoverySocket};
pub use transport::{DEFAULT_PORT, TransportConfig, TransportKind};
