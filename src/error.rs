use std::fmt;

use crate::devices::DeviceKind;

/// Reasons an event is rejected by the [`System`](crate::system::System).
///
/// Every variant except [`SimError::InvalidAddress`] is raised before any
/// state is touched. An invalid address is detected after the running process
/// has already given up the CPU; see [`System::request`](crate::system::System::request).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    /// Arrival asks for more words than the whole memory holds.
    ProcessTooLarge { requested: u64, available: u64 },
    /// The event needs a process on the CPU and there is none.
    NoRunningProcess,
    /// Unit index is outside the configured range for its kind.
    InvalidUnit { kind: DeviceKind, index: usize },
    /// Completion on a unit with nothing queued.
    QueueEmpty { kind: DeviceKind, index: usize },
    /// Logical address could not be translated for the requesting process.
    InvalidAddress(String),
    /// CPU usage outside `[0, slice]`.
    InvalidUsage { usage: u64, slice: u64 },
    /// Disk request without a cylinder, or past the last cylinder.
    InvalidCylinder { cylinder: Option<u32>, cylinders: u32 },
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::ProcessTooLarge { requested, available } => write!(
                f,
                "process too large: {} words requested, memory holds {}",
                requested, available
            ),
            SimError::NoRunningProcess => write!(f, "no process is running"),
            SimError::InvalidUnit { kind, index } => {
                write!(f, "no such {} unit: {}", kind, index + 1)
            }
            SimError::QueueEmpty { kind, index } => {
                write!(f, "{} {} has no pending requests", kind, index + 1)
            }
            SimError::InvalidAddress(addr) => write!(f, "invalid logical address: {:?}", addr),
            SimError::InvalidUsage { usage, slice } => {
                write!(f, "cpu usage {} outside [0, {}]", usage, slice)
            }
            SimError::InvalidCylinder { cylinder: Some(c), cylinders } => {
                write!(f, "cylinder {} outside [0, {})", c, cylinders)
            }
            SimError::InvalidCylinder { cylinder: None, .. } => {
                write!(f, "disk request needs a cylinder")
            }
        }
    }
}

impl std::error::Error for SimError {}
