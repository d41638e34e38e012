pub mod config;
pub mod devices;
pub mod error;
pub mod io;
pub mod memory;
pub mod pcb;
pub mod scheduler;
pub mod system;
pub mod translation;

// Re-export commonly used items for convenience
pub use config::{ConfigError, SysConfig};
pub use devices::DeviceKind;
pub use error::SimError;
pub use pcb::{AccessMode, Pid, RequestAttrs};
pub use system::{Snapshot, SnapshotTarget, System};
