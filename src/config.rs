use std::fmt;

use crate::devices::DeviceKind;

/// Hex digits are rendered four bits at a time.
pub const NIBBLE_BITS: u32 = 4;

/// Sysgen parameters, fixed for the lifetime of a [`System`](crate::system::System).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysConfig {
    printers: usize,
    disk_cylinders: Vec<u32>,
    cdrws: usize,
    slice_len: u64,
    page_size: u64,
    mem_size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    PageSizeNotPowerOfTwo(u64),
    MemoryNotMultipleOfPage { mem_size: u64, page_size: u64 },
    ZeroMemory,
    ZeroSlice,
    /// Zero-based index of a disk configured with no cylinders.
    DiskWithoutCylinders(usize),
    DiskCountMismatch { disks: usize, cylinders: usize },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::PageSizeNotPowerOfTwo(n) => {
                write!(f, "page size {} is not a power of two", n)
            }
            ConfigError::MemoryNotMultipleOfPage { mem_size, page_size } => write!(
                f,
                "memory size {} is not a multiple of page size {}",
                mem_size, page_size
            ),
            ConfigError::ZeroMemory => write!(f, "memory size must be non-zero"),
            ConfigError::ZeroSlice => write!(f, "time slice must be non-zero"),
            ConfigError::DiskWithoutCylinders(i) => write!(f, "disk {} has no cylinders", i + 1),
            ConfigError::DiskCountMismatch { disks, cylinders } => write!(
                f,
                "{} disks configured but {} cylinder counts given",
                disks, cylinders
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Every configured disk needs exactly one cylinder count.
pub fn check_disk_count(disks: usize, cylinders: &[u32]) -> Result<(), ConfigError> {
    if cylinders.len() != disks {
        return Err(ConfigError::DiskCountMismatch {
            disks,
            cylinders: cylinders.len(),
        });
    }
    Ok(())
}

impl SysConfig {
    /// Validate and freeze a configuration. Disk count is `disk_cylinders.len()`.
    pub fn new(
        printers: usize,
        disk_cylinders: Vec<u32>,
        cdrws: usize,
        slice_len: u64,
        page_size: u64,
        mem_size: u64,
    ) -> Result<Self, ConfigError> {
        if !page_size.is_power_of_two() {
            return Err(ConfigError::PageSizeNotPowerOfTwo(page_size));
        }
        if mem_size == 0 {
            return Err(ConfigError::ZeroMemory);
        }
        if mem_size % page_size != 0 {
            return Err(ConfigError::MemoryNotMultipleOfPage { mem_size, page_size });
        }
        if slice_len == 0 {
            return Err(ConfigError::ZeroSlice);
        }
        if let Some(disk) = disk_cylinders.iter().position(|&c| c == 0) {
            return Err(ConfigError::DiskWithoutCylinders(disk));
        }

        Ok(SysConfig {
            printers,
            disk_cylinders,
            cdrws,
            slice_len,
            page_size,
            mem_size,
        })
    }

    pub fn printers(&self) -> usize {
        self.printers
    }

    pub fn disk_count(&self) -> usize {
        self.disk_cylinders.len()
    }

    pub fn cdrws(&self) -> usize {
        self.cdrws
    }

    /// Cylinder count per disk, indexed by unit.
    pub fn disk_cylinders(&self) -> &[u32] {
        &self.disk_cylinders
    }

    pub fn slice_len(&self) -> u64 {
        self.slice_len
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn mem_size(&self) -> u64 {
        self.mem_size
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        (self.mem_size / self.page_size) as usize
    }

    pub fn unit_count(&self, kind: DeviceKind) -> usize {
        match kind {
            DeviceKind::Printer => self.printers,
            DeviceKind::Disk => self.disk_count(),
            DeviceKind::CdRw => self.cdrws,
        }
    }
}
