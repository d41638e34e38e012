use std::collections::VecDeque;

use log::debug;

use crate::error::SimError;
use crate::pcb::Pcb;

/// Round-robin CPU: a FIFO ready queue feeding a single CPU slot.
pub struct CpuScheduler {
    slice_len: u64,
    ready: VecDeque<Pcb>,
    running: Option<Pcb>,
}

impl CpuScheduler {
    pub fn new(slice_len: u64) -> Self {
        CpuScheduler {
            slice_len,
            ready: VecDeque::new(),
            running: None,
        }
    }

    pub fn slice_len(&self) -> u64 {
        self.slice_len
    }

    pub fn ready(&self) -> &VecDeque<Pcb> {
        &self.ready
    }

    pub fn running(&self) -> Option<&Pcb> {
        self.running.as_ref()
    }

    pub fn is_idle(&self) -> bool {
        self.running.is_none()
    }

    pub fn enqueue(&mut self, pcb: Pcb) {
        self.ready.push_back(pcb);
    }

    /// Fill an idle CPU from the front of the ready queue.
    pub fn dispatch(&mut self) {
        if self.running.is_none() {
            if let Some(pcb) = self.ready.pop_front() {
                debug!("dispatch pid {}", pcb.pid());
                self.running = Some(pcb);
            }
        }
    }

    /// Timer expiry: charge a full slice and send the process to the back
    /// of the ready queue.
    pub fn preempt(&mut self) -> Result<(), SimError> {
        let mut pcb = self.running.take().ok_or(SimError::NoRunningProcess)?;
        pcb.add_usage(self.slice_len);
        debug!("preempt pid {} after {}", pcb.pid(), self.slice_len);
        self.ready.push_back(pcb);
        Ok(())
    }

    pub fn check_usage(&self, usage: u64) -> Result<(), SimError> {
        if usage > self.slice_len {
            return Err(SimError::InvalidUsage { usage, slice: self.slice_len });
        }
        Ok(())
    }

    /// The running process leaves the CPU early for a device. Its burst is
    /// closed with `usage` added.
    pub fn yield_for_request(&mut self, usage: u64) -> Result<Pcb, SimError> {
        self.check_usage(usage)?;
        let mut pcb = self.running.take().ok_or(SimError::NoRunningProcess)?;
        pcb.add_usage(usage);
        pcb.complete_burst();
        Ok(pcb)
    }

    /// The running process exits. `usage` is added but no burst is closed.
    pub fn exit_running(&mut self, usage: u64) -> Result<Pcb, SimError> {
        self.check_usage(usage)?;
        let mut pcb = self.running.take().ok_or(SimError::NoRunningProcess)?;
        pcb.add_usage(usage);
        Ok(pcb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcb::Pid;

    fn with_ready(pids: &[u32]) -> CpuScheduler {
        let mut cpu = CpuScheduler::new(5);
        for &pid in pids {
            cpu.enqueue(Pcb::new(Pid(pid), 10));
        }
        cpu
    }

    #[test]
    fn test_dispatch_takes_front() {
        let mut cpu = with_ready(&[4, 2]);
        assert!(cpu.is_idle());
        cpu.dispatch();
        assert_eq!(cpu.running().map(|p| p.pid()), Some(Pid(4)));
        assert_eq!(cpu.ready().len(), 1);

        // busy CPU is left alone
        cpu.dispatch();
        assert_eq!(cpu.running().map(|p| p.pid()), Some(Pid(4)));
    }

    #[test]
    fn test_dispatch_empty_queue() {
        let mut cpu = CpuScheduler::new(5);
        cpu.dispatch();
        assert!(cpu.is_idle());
    }

    #[test]
    fn test_preempt_rotates() {
        let mut cpu = with_ready(&[0, 1]);
        cpu.dispatch();
        cpu.preempt().unwrap();
        assert!(cpu.is_idle());

        let order: Vec<Pid> = cpu.ready().iter().map(|p| p.pid()).collect();
        assert_eq!(order, vec![Pid(1), Pid(0)]);
        assert_eq!(cpu.ready()[1].cpu_usage(), 5);
        assert_eq!(cpu.ready()[1].cpu_bursts(), 0);
    }

    #[test]
    fn test_preempt_idle_fails() {
        let mut cpu = CpuScheduler::new(5);
        assert_eq!(cpu.preempt(), Err(SimError::NoRunningProcess));
    }

    #[test]
    fn test_yield_closes_burst() {
        let mut cpu = with_ready(&[0]);
        cpu.dispatch();
        cpu.preempt().unwrap();
        cpu.dispatch();

        let pcb = cpu.yield_for_request(2).unwrap();
        assert!(cpu.is_idle());
        assert_eq!(pcb.cpu_accum(), 7);
        assert_eq!(pcb.cpu_usage(), 0);
        assert_eq!(pcb.cpu_bursts(), 1);
    }

    #[test]
    fn test_yield_rejects_usage_over_slice() {
        let mut cpu = with_ready(&[0]);
        cpu.dispatch();
        assert_eq!(
            cpu.yield_for_request(6),
            Err(SimError::InvalidUsage { usage: 6, slice: 5 })
        );
        // still running
        assert!(!cpu.is_idle());
        assert!(cpu.yield_for_request(5).is_ok());
    }

    #[test]
    fn test_rejected_exit_leaves_process_running() {
        let mut cpu = with_ready(&[0]);
        cpu.dispatch();
        assert_eq!(
            cpu.exit_running(9),
            Err(SimError::InvalidUsage { usage: 9, slice: 5 })
        );
        let running = cpu.running().unwrap();
        assert_eq!(running.pid(), Pid(0));
        assert_eq!(running.cpu_usage(), 0);
    }

    #[test]
    fn test_idle_cpu_cannot_yield_or_exit() {
        let mut cpu = CpuScheduler::new(5);
        assert_eq!(cpu.yield_for_request(2), Err(SimError::NoRunningProcess));
        assert_eq!(cpu.exit_running(2), Err(SimError::NoRunningProcess));
        assert!(cpu.is_idle());
    }

    #[test]
    fn test_exit_keeps_open_usage() {
        let mut cpu = with_ready(&[0]);
        cpu.dispatch();
        let pcb = cpu.exit_running(3).unwrap();
        assert_eq!(pcb.cpu_bursts(), 0);
        assert_eq!(pcb.total_cpu(), 3);
        assert_eq!(cpu.exit_running(0), Err(SimError::NoRunningProcess));
    }
}
