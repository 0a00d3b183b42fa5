//! Liveness probes for online streaming platforms.
//!
//! Each supported platform provides a [`PlatformAdapter`] that turns a room
//! URL into a [`RawStatus`]. The [`AdapterRegistry`] picks the adapter for a
//! URL by trying each registered URL pattern in order.

pub mod probe;

pub use probe::adapter::{PlatformAdapter, RawStatus};
pub use probe::default::{default_client, default_client_with_proxy, default_registry};
pub use probe::error::ProbeError;
pub use probe::registry::AdapterRegistry;
