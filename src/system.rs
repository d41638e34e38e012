//! Event-driven coordinator tying memory, CPU and devices together.
//!
//! Every accepted event ends with one admission attempt followed by a
//! dispatch. Rejected events leave the state untouched, apart from the
//! translation failure described on [`System::request`].

use std::collections::HashSet;

use log::{debug, info, warn};

use crate::config::SysConfig;
use crate::devices::{DeviceBank, DeviceKind};
use crate::error::SimError;
use crate::memory::{Frame, MemoryManager};
use crate::pcb::{AccessMode, Pcb, PendingRequest, Pid, RequestAttrs};
use crate::scheduler::CpuScheduler;
use crate::translation::{pages_for, translate};

/// What a snapshot should cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotTarget {
    Ready,
    Device(DeviceKind),
    Frames,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessRecord {
    pub pid: Pid,
    pub cpu_time: u64,
    pub avg_burst: f64,
    pub request: Option<PendingRequest>,
}

impl ProcessRecord {
    fn of(pcb: &Pcb) -> Self {
        ProcessRecord {
            pid: pcb.pid(),
            cpu_time: pcb.total_cpu(),
            avg_burst: pcb.average_burst(),
            request: pcb.request().cloned(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRecord {
    pub frame: usize,
    pub owner: Option<Frame>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTableDump {
    pub pid: Pid,
    /// Frame per page, in page order.
    pub frames: Vec<usize>,
}

impl PageTableDump {
    fn of(pcb: &Pcb) -> Self {
        PageTableDump {
            pid: pcb.pid(),
            frames: pcb.page_table().to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    Ready(Vec<ProcessRecord>),
    /// One list per unit, in service order.
    Devices {
        kind: DeviceKind,
        units: Vec<Vec<ProcessRecord>>,
    },
    Frames(Vec<FrameRecord>),
}

/// Totals over terminated processes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunStats {
    pub completed: u32,
    pub total_cpu: u64,
    pub average_cpu: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Terminated {
    pub pid: Pid,
    pub cpu_time: u64,
}

pub struct System {
    cfg: SysConfig,
    memory: MemoryManager,
    cpu: CpuScheduler,
    devices: DeviceBank,
    next_pid: u32,
    completed: u32,
    completed_cpu: u64,
}

impl System {
    pub fn new(cfg: SysConfig) -> Self {
        info!(
            "sysgen: {} printer(s), {} disk(s) {:?}, {} cd/rw, slice {}, page {}, memory {} ({} frames)",
            cfg.printers(),
            cfg.disk_count(),
            cfg.disk_cylinders(),
            cfg.cdrws(),
            cfg.slice_len(),
            cfg.page_size(),
            cfg.mem_size(),
            cfg.frame_count()
        );
        System {
            memory: MemoryManager::new(cfg.frame_count(), cfg.page_size()),
            cpu: CpuScheduler::new(cfg.slice_len()),
            devices: DeviceBank::new(cfg.printers(), cfg.disk_cylinders(), cfg.cdrws()),
            next_pid: 0,
            completed: 0,
            completed_cpu: 0,
            cfg,
        }
    }

    pub fn config(&self) -> &SysConfig {
        &self.cfg
    }

    pub fn running(&self) -> Option<&Pcb> {
        self.cpu.running()
    }

    pub fn ready(&self) -> impl Iterator<Item = &Pcb> {
        self.cpu.ready().iter()
    }

    pub fn job_pool(&self) -> &[Pcb] {
        self.memory.job_pool()
    }

    pub fn devices(&self) -> &DeviceBank {
        &self.devices
    }

    /// A new process asks for `memsize` words and waits in the job pool.
    pub fn arrive(&mut self, memsize: u64) -> Result<Pid, SimError> {
        if memsize > self.cfg.mem_size() {
            return Err(SimError::ProcessTooLarge {
                requested: memsize,
                available: self.cfg.mem_size(),
            });
        }
        let pid = Pid(self.next_pid);
        self.next_pid += 1;
        info!("pid {} arrived needing {} words", pid, memsize);
        self.memory.submit(Pcb::new(pid, memsize));
        self.settle();
        Ok(pid)
    }

    /// The running process issues a request to unit `index` of `kind` after
    /// using `usage` of its slice.
    ///
    /// If the location does not translate, the process has already closed
    /// its burst and left the CPU. It is put back on the ready queue and the
    /// request is dropped.
    pub fn request(
        &mut self,
        kind: DeviceKind,
        index: usize,
        usage: u64,
        attrs: RequestAttrs,
    ) -> Result<(), SimError> {
        if self.cpu.is_idle() {
            return Err(SimError::NoRunningProcess);
        }
        self.devices.check_unit(kind, index)?;
        self.cpu.check_usage(usage)?;
        let cylinder = match kind {
            DeviceKind::Disk => {
                let cylinders = self.cfg.disk_cylinders()[index];
                match attrs.cylinder {
                    Some(c) if c < cylinders => Some(c),
                    other => {
                        return Err(SimError::InvalidCylinder { cylinder: other, cylinders });
                    }
                }
            }
            _ => None,
        };

        let mut pcb = self.cpu.yield_for_request(usage)?;
        let phys_addr = match translate(&attrs.location, &pcb, &self.cfg) {
            Ok(pa) => pa,
            Err(e) => {
                warn!("pid {}: {}; returned to ready queue", pcb.pid(), e);
                self.cpu.enqueue(pcb);
                self.settle();
                return Err(e);
            }
        };

        let mode = match kind {
            DeviceKind::Printer => AccessMode::Write,
            _ => attrs.mode,
        };
        pcb.set_request(PendingRequest {
            filename: attrs.filename,
            phys_addr: phys_addr.to_string(),
            mode,
            file_len: match mode {
                AccessMode::Read => None,
                AccessMode::Write => attrs.file_len,
            },
            cylinder,
        });
        info!("pid {} queued on {} {}", pcb.pid(), kind, index + 1);
        self.devices.enqueue(kind, index, pcb)?;
        self.settle();
        Ok(())
    }

    /// Unit `index` of `kind` finishes its current request.
    pub fn complete(&mut self, kind: DeviceKind, index: usize) -> Result<Pid, SimError> {
        let mut pcb = self.devices.service(kind, index)?;
        pcb.clear_request();
        let pid = pcb.pid();
        info!("{} {} completed request of pid {}", kind, index + 1, pid);
        self.cpu.enqueue(pcb);
        self.settle();
        Ok(pid)
    }

    /// The running process used up its slice.
    pub fn timer(&mut self) -> Result<(), SimError> {
        self.cpu.preempt()?;
        self.settle();
        Ok(())
    }

    /// The running process exits after `usage` more time.
    pub fn terminate(&mut self, usage: u64) -> Result<Terminated, SimError> {
        let mut pcb = self.cpu.exit_running(usage)?;
        let done = Terminated {
            pid: pcb.pid(),
            cpu_time: pcb.total_cpu(),
        };
        self.completed += 1;
        self.completed_cpu += done.cpu_time;
        self.memory.release(&mut pcb);
        info!("terminated pid {} with total usage {}", done.pid, done.cpu_time);
        self.settle();
        Ok(done)
    }

    pub fn stats(&self) -> RunStats {
        RunStats {
            completed: self.completed,
            total_cpu: self.completed_cpu,
            average_cpu: if self.completed == 0 {
                0.0
            } else {
                self.completed_cpu as f64 / self.completed as f64
            },
        }
    }

    pub fn snapshot(&self, target: SnapshotTarget) -> Snapshot {
        match target {
            SnapshotTarget::Ready => Snapshot::Ready(self.ready().map(ProcessRecord::of).collect()),
            SnapshotTarget::Device(kind) => Snapshot::Devices {
                kind,
                units: self
                    .devices
                    .queues(kind)
                    .into_iter()
                    .map(|unit| unit.into_iter().map(ProcessRecord::of).collect())
                    .collect(),
            },
            SnapshotTarget::Frames => Snapshot::Frames(
                self.memory
                    .frames()
                    .entries()
                    .iter()
                    .enumerate()
                    .map(|(frame, owner)| FrameRecord { frame, owner: *owner })
                    .collect(),
            ),
        }
    }

    /// Page tables of the processes a snapshot of `target` lists.
    pub fn page_tables(&self, target: SnapshotTarget) -> Vec<PageTableDump> {
        match target {
            SnapshotTarget::Ready => self.ready().map(PageTableDump::of).collect(),
            SnapshotTarget::Device(kind) => self
                .devices
                .queues(kind)
                .into_iter()
                .flatten()
                .map(PageTableDump::of)
                .collect(),
            SnapshotTarget::Frames => Vec::new(),
        }
    }

    /// Page table of any resident process.
    pub fn page_table(&self, pid: Pid) -> Option<PageTableDump> {
        self.resident()
            .find(|pcb| pcb.pid() == pid)
            .map(PageTableDump::of)
    }

    /// Processes holding frames: running, ready, or queued on a device.
    fn resident(&self) -> impl Iterator<Item = &Pcb> {
        let queued = DeviceKind::ALL
            .into_iter()
            .flat_map(|kind| self.devices.queues(kind).into_iter().flatten());
        self.cpu.running().into_iter().chain(self.ready()).chain(queued)
    }

    fn settle(&mut self) {
        if let Some(pcb) = self.memory.admit() {
            self.cpu.enqueue(pcb);
        }
        self.cpu.dispatch();
        debug!(
            "settled: running={:?} ready={} pool={} free frames={}",
            self.cpu.running().map(|p| p.pid()),
            self.cpu.ready().len(),
            self.memory.job_pool().len(),
            self.memory.frames().free_count()
        );
        debug_assert_eq!(self.invariant_violation(), None);
    }

    /// Describe the first broken cross-structure invariant, if any.
    pub fn invariant_violation(&self) -> Option<String> {
        let frames = self.memory.frames();
        let mut seen_pids = HashSet::new();
        let mut seen_frames = HashSet::new();

        for pcb in self.resident() {
            if !seen_pids.insert(pcb.pid()) {
                return Some(format!("pid {} is in more than one place", pcb.pid()));
            }
            let pages = pages_for(pcb.memsize(), self.cfg.page_size());
            if pcb.page_table().len() != pages {
                return Some(format!(
                    "pid {} has {} page table entries, needs {}",
                    pcb.pid(),
                    pcb.page_table().len(),
                    pages
                ));
            }
            for (page, &frame) in pcb.page_table().iter().enumerate() {
                if !seen_frames.insert(frame) {
                    return Some(format!("frame {} mapped twice", frame));
                }
                if frames.get(frame) != Some(Frame { pid: pcb.pid(), page }) {
                    return Some(format!("frame {} not owned by pid {} page {}", frame, pcb.pid(), page));
                }
            }
        }
        for pcb in self.memory.job_pool() {
            if !seen_pids.insert(pcb.pid()) {
                return Some(format!("pid {} is in more than one place", pcb.pid()));
            }
            if !pcb.page_table().is_empty() {
                return Some(format!("pid {} holds frames while in the job pool", pcb.pid()));
            }
        }
        if frames.len() - frames.free_count() != seen_frames.len() {
            return Some("frame table owns frames no live process maps".to_string());
        }
        if self.cpu.is_idle() && !self.cpu.ready().is_empty() {
            return Some("cpu idle with processes ready".to_string());
        }
        None
    }
}
