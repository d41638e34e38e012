use log::{debug, info};

use crate::pcb::{Pcb, Pid};
use crate::translation::pages_for;

/// Owner of one physical frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub pid: Pid,
    pub page: usize,
}

/// Physical frame index -> owner, or `None` when free.
pub struct FrameTable {
    frames: Vec<Option<Frame>>,
}

impl FrameTable {
    /// Create a table of `count` free frames
    pub fn new(count: usize) -> Self {
        FrameTable { frames: vec![None; count] }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<Frame> {
        self.frames.get(index).copied().flatten()
    }

    /// Free frame indices in ascending order
    pub fn free_frames(&self) -> Vec<usize> {
        self.frames
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_none())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn free_count(&self) -> usize {
        self.frames.iter().filter(|f| f.is_none()).count()
    }

    fn assign(&mut self, index: usize, owner: Frame) {
        debug_assert!(self.frames[index].is_none(), "frame {} already owned", index);
        self.frames[index] = Some(owner);
    }

    fn free(&mut self, index: usize) {
        self.frames[index] = None;
    }

    pub fn entries(&self) -> &[Option<Frame>] {
        &self.frames
    }
}

/// Admission policy: largest job first (ties by lower pid), take the first
/// one whose page count fits in `free_frames`.
///
/// Returns the index into `pool` of the chosen job.
pub fn largest_fit_first(pool: &[Pcb], page_size: u64, free_frames: usize) -> Option<usize> {
    let mut order: Vec<usize> = (0..pool.len()).collect();
    order.sort_by(|&a, &b| {
        pool[b]
            .memsize()
            .cmp(&pool[a].memsize())
            .then(pool[a].pid().cmp(&pool[b].pid()))
    });
    order
        .into_iter()
        .find(|&i| pages_for(pool[i].memsize(), page_size) <= free_frames)
}

/// Job pool and frame table. Moves at most one job into memory per call to
/// [`MemoryManager::admit`].
pub struct MemoryManager {
    page_size: u64,
    frames: FrameTable,
    job_pool: Vec<Pcb>,
}

impl MemoryManager {
    pub fn new(frame_count: usize, page_size: u64) -> Self {
        MemoryManager {
            page_size,
            frames: FrameTable::new(frame_count),
            job_pool: Vec::new(),
        }
    }

    pub fn frames(&self) -> &FrameTable {
        &self.frames
    }

    pub fn job_pool(&self) -> &[Pcb] {
        &self.job_pool
    }

    pub fn submit(&mut self, pcb: Pcb) {
        debug!("pid {} waiting for memory ({} words)", pcb.pid(), pcb.memsize());
        self.job_pool.push(pcb);
    }

    /// Pick one job that fits, hand it the lowest free frames, and return it
    /// for the ready queue.
    pub fn admit(&mut self) -> Option<Pcb> {
        let free = self.frames.free_frames();
        let chosen = largest_fit_first(&self.job_pool, self.page_size, free.len())?;

        let mut pcb = self.job_pool.remove(chosen);
        let pages = pages_for(pcb.memsize(), self.page_size);
        let table: Vec<usize> = free[..pages].to_vec();
        for (page, &frame) in table.iter().enumerate() {
            self.frames.assign(frame, Frame { pid: pcb.pid(), page });
        }
        info!("admitted pid {} into frames {:?}", pcb.pid(), table);
        pcb.set_page_table(table);
        Some(pcb)
    }

    /// Return every frame `pcb` holds to the free list
    pub fn release(&mut self, pcb: &mut Pcb) {
        let table = pcb.take_page_table();
        for frame in &table {
            self.frames.free(*frame);
        }
        debug!("pid {} released frames {:?}", pcb.pid(), table);
    }
}
