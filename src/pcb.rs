use std::fmt;

/// Process identifier. Handed out in increasing order and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pid(pub u32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
}

impl AccessMode {
    /// Operator spelling: `r` or `w`.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'r' => Some(AccessMode::Read),
            'w' => Some(AccessMode::Write),
            _ => None,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            AccessMode::Read => 'r',
            AccessMode::Write => 'w',
        }
    }
}

/// What the operator supplies alongside a device request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestAttrs {
    pub filename: String,
    /// Logical address in hex, as typed.
    pub location: String,
    pub mode: AccessMode,
    pub file_len: Option<u64>,
    pub cylinder: Option<u32>,
}

/// Request state attached to a queued process, with the location already
/// translated to a physical address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub filename: String,
    pub phys_addr: String,
    pub mode: AccessMode,
    /// Absent for reads.
    pub file_len: Option<u64>,
    pub cylinder: Option<u32>,
}

/// Process control block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pcb {
    pid: Pid,
    memsize: u64,
    page_table: Vec<usize>,
    request: Option<PendingRequest>,
    cpu_usage: u64,
    cpu_accum: u64,
    cpu_bursts: u32,
}

impl Pcb {
    pub fn new(pid: Pid, memsize: u64) -> Self {
        Pcb {
            pid,
            memsize,
            page_table: Vec::new(),
            request: None,
            cpu_usage: 0,
            cpu_accum: 0,
            cpu_bursts: 0,
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn memsize(&self) -> u64 {
        self.memsize
    }

    /// Frame index for each page, in page order. Empty until admission.
    pub fn page_table(&self) -> &[usize] {
        &self.page_table
    }

    pub(crate) fn set_page_table(&mut self, frames: Vec<usize>) {
        self.page_table = frames;
    }

    pub(crate) fn take_page_table(&mut self) -> Vec<usize> {
        std::mem::take(&mut self.page_table)
    }

    pub fn request(&self) -> Option<&PendingRequest> {
        self.request.as_ref()
    }

    pub(crate) fn set_request(&mut self, request: PendingRequest) {
        self.request = Some(request);
    }

    pub(crate) fn clear_request(&mut self) {
        self.request = None;
    }

    /// Cylinder of the pending disk request, if any.
    #[inline]
    pub fn cylinder(&self) -> Option<u32> {
        self.request.as_ref().and_then(|r| r.cylinder)
    }

    pub fn add_usage(&mut self, usage: u64) {
        self.cpu_usage += usage;
    }

    /// Fold the open burst into the accumulated total.
    pub fn complete_burst(&mut self) {
        self.cpu_accum += self.cpu_usage;
        self.cpu_usage = 0;
        self.cpu_bursts += 1;
    }

    pub fn cpu_usage(&self) -> u64 {
        self.cpu_usage
    }

    pub fn cpu_accum(&self) -> u64 {
        self.cpu_accum
    }

    pub fn cpu_bursts(&self) -> u32 {
        self.cpu_bursts
    }

    /// Committed plus still-open usage.
    pub fn total_cpu(&self) -> u64 {
        self.cpu_accum + self.cpu_usage
    }

    pub fn average_burst(&self) -> f64 {
        if self.cpu_bursts == 0 {
            0.0
        } else {
            self.cpu_accum as f64 / self.cpu_bursts as f64
        }
    }
}
