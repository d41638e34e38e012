//! Device queues: plain FIFO for printers and CD/RW drives, cylinder-ordered
//! C-LOOK for disks.

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt;

use log::debug;

use crate::error::SimError;
use crate::pcb::Pcb;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Printer,
    Disk,
    CdRw,
}

impl DeviceKind {
    pub const ALL: [DeviceKind; 3] = [DeviceKind::Printer, DeviceKind::Disk, DeviceKind::CdRw];

    /// Operator letter, lowercase: `p`, `d`, `c`.
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'p' => Some(DeviceKind::Printer),
            'd' => Some(DeviceKind::Disk),
            'c' => Some(DeviceKind::CdRw),
            _ => None,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            DeviceKind::Printer => 'p',
            DeviceKind::Disk => 'd',
            DeviceKind::CdRw => 'c',
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceKind::Printer => "printer",
            DeviceKind::Disk => "disk",
            DeviceKind::CdRw => "cd/rw",
        };
        write!(f, "{}", name)
    }
}

/// Disk queue order. Only meaningful for processes with a pending disk
/// request.
pub fn cylinder_order(a: &Pcb, b: &Pcb) -> Ordering {
    a.cylinder().cmp(&b.cylinder())
}

#[derive(Default)]
pub struct FifoQueue {
    queue: VecDeque<Pcb>,
}

impl FifoQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, pcb: Pcb) {
        self.queue.push_back(pcb);
    }

    pub fn service(&mut self) -> Option<Pcb> {
        self.queue.pop_front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pcb> {
        self.queue.iter()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// One disk unit. The queue is kept sorted by cylinder and the head sits one
/// past the last cylinder served.
pub struct DiskQueue {
    cylinders: u32,
    head: u32,
    queue: Vec<Pcb>,
}

impl DiskQueue {
    pub fn new(cylinders: u32) -> Self {
        DiskQueue {
            cylinders,
            head: 0,
            queue: Vec::new(),
        }
    }

    pub fn cylinders(&self) -> u32 {
        self.cylinders
    }

    pub fn head(&self) -> u32 {
        self.head
    }

    /// Insert after any requests for the same or a lower cylinder.
    pub fn enqueue(&mut self, pcb: Pcb) {
        let at = self
            .queue
            .partition_point(|queued| cylinder_order(queued, &pcb) != Ordering::Greater);
        self.queue.insert(at, pcb);
    }

    /// C-LOOK: serve the first request at or past the head, otherwise wrap
    /// to the lowest cylinder.
    pub fn service(&mut self) -> Option<Pcb> {
        if self.queue.is_empty() {
            return None;
        }
        let head = self.head;
        let at = self
            .queue
            .iter()
            .position(|pcb| pcb.cylinder().is_some_and(|c| c >= head))
            .unwrap_or(0);

        let pcb = self.queue.remove(at);
        self.head = pcb.cylinder().map_or(0, |c| c + 1);
        debug!("disk head {} -> {} serving pid {}", head, self.head, pcb.pid());
        Some(pcb)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pcb> {
        self.queue.iter()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Every configured device unit, addressed by kind and zero-based index.
pub struct DeviceBank {
    printers: Vec<FifoQueue>,
    disks: Vec<DiskQueue>,
    cdrws: Vec<FifoQueue>,
}

impl DeviceBank {
    pub fn new(printers: usize, disk_cylinders: &[u32], cdrws: usize) -> Self {
        DeviceBank {
            printers: (0..printers).map(|_| FifoQueue::new()).collect(),
            disks: disk_cylinders.iter().map(|&c| DiskQueue::new(c)).collect(),
            cdrws: (0..cdrws).map(|_| FifoQueue::new()).collect(),
        }
    }

    pub fn unit_count(&self, kind: DeviceKind) -> usize {
        match kind {
            DeviceKind::Printer => self.printers.len(),
            DeviceKind::Disk => self.disks.len(),
            DeviceKind::CdRw => self.cdrws.len(),
        }
    }

    pub fn check_unit(&self, kind: DeviceKind, index: usize) -> Result<(), SimError> {
        if index >= self.unit_count(kind) {
            return Err(SimError::InvalidUnit { kind, index });
        }
        Ok(())
    }

    pub fn disk(&self, index: usize) -> Option<&DiskQueue> {
        self.disks.get(index)
    }

    pub fn enqueue(&mut self, kind: DeviceKind, index: usize, pcb: Pcb) -> Result<(), SimError> {
        self.check_unit(kind, index)?;
        match kind {
            DeviceKind::Printer => self.printers[index].enqueue(pcb),
            DeviceKind::Disk => self.disks[index].enqueue(pcb),
            DeviceKind::CdRw => self.cdrws[index].enqueue(pcb),
        }
        Ok(())
    }

    /// Pop the next request on a unit according to its discipline.
    pub fn service(&mut self, kind: DeviceKind, index: usize) -> Result<Pcb, SimError> {
        self.check_unit(kind, index)?;
        let next = match kind {
            DeviceKind::Printer => self.printers[index].service(),
            DeviceKind::Disk => self.disks[index].service(),
            DeviceKind::CdRw => self.cdrws[index].service(),
        };
        next.ok_or(SimError::QueueEmpty { kind, index })
    }

    /// Queued processes of every unit of `kind`, in service order per unit.
    pub fn queues(&self, kind: DeviceKind) -> Vec<Vec<&Pcb>> {
        match kind {
            DeviceKind::Printer => self.printers.iter().map(|q| q.iter().collect()).collect(),
            DeviceKind::Disk => self.disks.iter().map(|q| q.iter().collect()).collect(),
            DeviceKind::CdRw => self.cdrws.iter().map(|q| q.iter().collect()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcb::{AccessMode, PendingRequest, Pid};

    fn disk_job(pid: u32, cylinder: u32) -> Pcb {
        let mut pcb = Pcb::new(Pid(pid), 1);
        pcb.set_request(PendingRequest {
            filename: format!("f{}", pid),
            phys_addr: "0".into(),
            mode: AccessMode::Read,
            file_len: None,
            cylinder: Some(cylinder),
        });
        pcb
    }

    fn cylinders(disk: &DiskQueue) -> Vec<u32> {
        disk.iter().filter_map(|p| p.cylinder()).collect()
    }

    #[test]
    fn test_kind_letters() {
        assert_eq!(DeviceKind::from_char('p'), Some(DeviceKind::Printer));
        assert_eq!(DeviceKind::from_char('D'), Some(DeviceKind::Disk));
        assert_eq!(DeviceKind::from_char('c'), Some(DeviceKind::CdRw));
        assert_eq!(DeviceKind::from_char('x'), None);
        assert_eq!(DeviceKind::CdRw.to_string(), "cd/rw");
    }

    #[test]
    fn test_fifo_order() {
        let mut q = FifoQueue::new();
        q.enqueue(Pcb::new(Pid(3), 1));
        q.enqueue(Pcb::new(Pid(1), 1));
        assert_eq!(q.service().map(|p| p.pid()), Some(Pid(3)));
        assert_eq!(q.service().map(|p| p.pid()), Some(Pid(1)));
        assert!(q.service().is_none());
    }

    #[test]
    fn test_disk_queue_stays_sorted_and_stable() {
        let mut disk = DiskQueue::new(10);
        disk.enqueue(disk_job(0, 5));
        disk.enqueue(disk_job(1, 1));
        disk.enqueue(disk_job(2, 5));
        disk.enqueue(disk_job(3, 3));
        assert_eq!(cylinders(&disk), vec![1, 3, 5, 5]);

        let pids: Vec<Pid> = disk.iter().map(|p| p.pid()).collect();
        assert_eq!(pids, vec![Pid(1), Pid(3), Pid(0), Pid(2)]);
    }

    #[test]
    fn test_clook_ascending_sweep() {
        let mut disk = DiskQueue::new(9);
        for (pid, cyl) in [(0, 5), (1, 1), (2, 8), (3, 3)] {
            disk.enqueue(disk_job(pid, cyl));
        }

        let mut served = Vec::new();
        while let Some(pcb) = disk.service() {
            served.push(pcb.cylinder().unwrap());
        }
        assert_eq!(served, vec![1, 3, 5, 8]);
        assert_eq!(disk.head(), 9);
    }

    #[test]
    fn test_clook_wraps_after_pending_ahead_of_head() {
        let mut disk = DiskQueue::new(10);
        disk.enqueue(disk_job(0, 4));
        disk.enqueue(disk_job(1, 8));
        assert_eq!(disk.service().unwrap().cylinder(), Some(4));
        assert_eq!(disk.head(), 5);

        // arrives behind the head
        disk.enqueue(disk_job(2, 2));
        disk.enqueue(disk_job(3, 6));
        assert_eq!(disk.service().unwrap().cylinder(), Some(6));
        assert_eq!(disk.service().unwrap().cylinder(), Some(8));
        assert_eq!(disk.head(), 9);
        assert_eq!(disk.service().unwrap().cylinder(), Some(2));
        assert_eq!(disk.head(), 3);
        assert!(disk.service().is_none());
    }

    #[test]
    fn test_clook_serves_request_at_head() {
        let mut disk = DiskQueue::new(10);
        disk.enqueue(disk_job(0, 0));
        assert_eq!(disk.service().unwrap().cylinder(), Some(0));
        assert_eq!(disk.head(), 1);

        disk.enqueue(disk_job(1, 1));
        disk.enqueue(disk_job(2, 0));
        assert_eq!(disk.service().unwrap().cylinder(), Some(1));
        assert_eq!(disk.service().unwrap().cylinder(), Some(0));
    }

    #[test]
    fn test_bank_rejects_bad_units() {
        let mut bank = DeviceBank::new(1, &[10], 0);
        assert_eq!(bank.unit_count(DeviceKind::Disk), 1);
        assert_eq!(
            bank.enqueue(DeviceKind::CdRw, 0, Pcb::new(Pid(0), 1)),
            Err(SimError::InvalidUnit { kind: DeviceKind::CdRw, index: 0 })
        );
        assert_eq!(
            bank.service(DeviceKind::Printer, 1).map(|p| p.pid()),
            Err(SimError::InvalidUnit { kind: DeviceKind::Printer, index: 1 })
        );
        assert_eq!(
            bank.service(DeviceKind::Printer, 0).map(|p| p.pid()),
            Err(SimError::QueueEmpty { kind: DeviceKind::Printer, index: 0 })
        );
    }

    #[test]
    fn test_bank_routes_by_kind() {
        let mut bank = DeviceBank::new(2, &[10], 1);
        bank.enqueue(DeviceKind::Printer, 1, Pcb::new(Pid(0), 1)).unwrap();
        bank.enqueue(DeviceKind::Disk, 0, disk_job(1, 7)).unwrap();
        bank.enqueue(DeviceKind::Disk, 0, disk_job(2, 2)).unwrap();

        let printers = bank.queues(DeviceKind::Printer);
        assert_eq!(printers.len(), 2);
        assert!(printers[0].is_empty());
        assert_eq!(printers[1][0].pid(), Pid(0));

        assert_eq!(bank.service(DeviceKind::Disk, 0).map(|p| p.pid()), Ok(Pid(2)));
        assert_eq!(bank.disk(0).map(|d| d.head()), Some(3));
    }
}
