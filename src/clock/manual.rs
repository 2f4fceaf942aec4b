// Manual clock - Deterministic transport for tests and offline drivers
// Time only moves when the driver calls advance()

use super::{ClockAdapter, DueTask, ScheduleHandle, ScheduleTime, TransportTask};

#[derive(Debug, Clone)]
struct PendingTask {
    handle: ScheduleHandle,
    fire_at: f64,
    seq: u64,
    task: TransportTask,
}

/// Software transport clock driven by explicit `advance` calls
///
/// The audio clock always advances; the transport position only advances
/// while started. Relative schedule times are resolved against the
/// transport position at submission time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    audio_now: f64,
    transport_pos: f64,
    running: bool,
    bpm: Option<f64>,
    next_handle: ScheduleHandle,
    next_seq: u64,
    pending: Vec<PendingTask>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            audio_now: 0.0,
            transport_pos: 0.0,
            running: false,
            bpm: None,
            next_handle: 1,
            next_seq: 0,
            pending: Vec::new(),
        }
    }

    /// Create with a known tempo
    pub fn with_bpm(bpm: f64) -> Self {
        let mut clock = Self::new();
        clock.bpm = Some(bpm);
        clock
    }

    /// Set or clear the reported tempo
    pub fn set_bpm(&mut self, bpm: Option<f64>) {
        self.bpm = bpm;
    }

    /// Move time forward by `dt` seconds
    pub fn advance(&mut self, dt: f64) {
        self.audio_now += dt;
        if self.running {
            self.transport_pos += dt;
        }
    }

    /// Whether the transport is currently running
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Number of tasks still waiting to fire
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    fn push_task(&mut self, at: ScheduleTime, task: TransportTask) -> ScheduleHandle {
        let fire_at = match at {
            ScheduleTime::Transport(t) => t,
            ScheduleTime::Relative(d) => self.transport_pos + d,
        };
        let handle = self.next_handle;
        self.next_handle += 1;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(PendingTask {
            handle,
            fire_at,
            seq,
            task,
        });
        handle
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockAdapter for ManualClock {
    fn now(&self) -> f64 {
        self.audio_now
    }

    fn transport_seconds(&self) -> f64 {
        self.transport_pos
    }

    fn set_transport_seconds(&mut self, seconds: f64) {
        self.transport_pos = seconds;
    }

    fn bpm(&self) -> Option<f64> {
        self.bpm
    }

    fn schedule(&mut self, at: ScheduleTime, task: TransportTask) -> ScheduleHandle {
        self.push_task(at, task)
    }

    fn schedule_once(&mut self, at: ScheduleTime, task: TransportTask) -> ScheduleHandle {
        self.push_task(at, task)
    }

    fn cancel(&mut self, handle: ScheduleHandle) {
        self.pending.retain(|p| p.handle != handle);
    }

    fn start(&mut self, _at: f64) {
        self.running = true;
    }

    fn stop(&mut self, _at: f64) {
        self.running = false;
    }

    fn drain_due(&mut self) -> Vec<DueTask> {
        let pos = self.transport_pos;
        let mut due: Vec<PendingTask> = Vec::new();
        let mut rest: Vec<PendingTask> = Vec::new();
        for p in self.pending.drain(..) {
            if p.fire_at <= pos {
                due.push(p);
            } else {
                rest.push(p);
            }
        }
        self.pending = rest;

        // Ascending time order; submission order breaks ties
        due.sort_by(|a, b| {
            a.fire_at
                .partial_cmp(&b.fire_at)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.seq.cmp(&b.seq))
        });

        due.into_iter()
            .map(|p| DueTask {
                time: p.fire_at,
                task: p.task,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trigger(note: &str) -> TransportTask {
        TransportTask::TriggerNote {
            note: note.to_string(),
            velocity: 0.8,
            duration: 0.25,
        }
    }

    #[test]
    fn test_transport_frozen_while_stopped() {
        let mut clock = ManualClock::new();
        clock.advance(1.0);

        assert_eq!(clock.now(), 1.0);
        assert_eq!(clock.transport_seconds(), 0.0);

        clock.start(clock.now());
        clock.advance(0.5);
        assert_eq!(clock.transport_seconds(), 0.5);

        clock.stop(clock.now());
        clock.advance(0.5);
        assert_eq!(clock.transport_seconds(), 0.5);
        assert_eq!(clock.now(), 2.0);
    }

    #[test]
    fn test_tasks_fire_in_time_order() {
        let mut clock = ManualClock::new();
        clock.start(0.0);

        // Submit out of order
        clock.schedule(ScheduleTime::Transport(0.3), trigger("E4"));
        clock.schedule(ScheduleTime::Transport(0.1), trigger("C4"));
        clock.schedule(ScheduleTime::Transport(0.2), trigger("D4"));

        clock.advance(0.5);
        let due = clock.drain_due();
        let notes: Vec<&str> = due
            .iter()
            .map(|d| match &d.task {
                TransportTask::TriggerNote { note, .. } => note.as_str(),
                _ => panic!("unexpected task"),
            })
            .collect();

        assert_eq!(notes, vec!["C4", "D4", "E4"]);
        assert_eq!(clock.pending_count(), 0);
    }

    #[test]
    fn test_relative_time_resolved_at_submission() {
        let mut clock = ManualClock::new();
        clock.start(0.0);
        clock.advance(2.0);

        clock.schedule(ScheduleTime::Relative(0.5), trigger("C4"));

        clock.advance(0.4);
        assert!(clock.drain_due().is_empty());

        clock.advance(0.2);
        let due = clock.drain_due();
        assert_eq!(due.len(), 1);
        assert!((due[0].time - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_cancel_removes_pending_task() {
        let mut clock = ManualClock::new();
        clock.start(0.0);

        let keep = clock.schedule(ScheduleTime::Transport(0.1), trigger("C4"));
        let drop = clock.schedule(ScheduleTime::Transport(0.2), trigger("D4"));
        clock.cancel(drop);
        // Cancelling twice is a no-op
        clock.cancel(drop);

        clock.advance(1.0);
        let due = clock.drain_due();
        assert_eq!(due.len(), 1);
        assert!((due[0].time - 0.1).abs() < 1e-9);

        // Already-fired handle is also a no-op
        clock.cancel(keep);
    }

    #[test]
    fn test_nothing_becomes_due_while_stopped() {
        let mut clock = ManualClock::new();
        clock.schedule(ScheduleTime::Transport(0.1), trigger("C4"));

        clock.advance(10.0);
        assert!(clock.drain_due().is_empty());
        assert_eq!(clock.pending_count(), 1);
    }
}
