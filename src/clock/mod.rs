// Clock adapter - Boundary to the shared transport clock
// The engine schedules typed tasks against it and never owns timing itself

pub mod manual;

pub use manual::ManualClock;

/// Handle returned by the clock for a scheduled task
/// Cancellation is handle-based and must be exhaustive
pub type ScheduleHandle = u64;

/// When a task should fire
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScheduleTime {
    /// Absolute transport time in seconds
    Transport(f64),
    /// Seconds from the transport position at submission time
    Relative(f64),
}

/// Payload of a scheduled callback
///
/// Tasks are plain data rather than closures: the driver drains due tasks
/// from the adapter and feeds them back into the engine, which keeps the
/// whole scheduling model single-threaded and cooperative.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportTask {
    /// Sound a note for a fixed duration (attack + release)
    TriggerNote {
        note: String,
        velocity: f32,
        duration: f64,
    },
    /// Terminal end-of-sequence stop for non-looping playback
    StopPlayback,
    /// Debounced live-reschedule timer; stale generations are ignored
    LiveReschedule { generation: u64 },
}

/// A task that has reached its fire time
#[derive(Debug, Clone, PartialEq)]
pub struct DueTask {
    /// Transport time at which the task fired
    pub time: f64,
    pub task: TransportTask,
}

/// Who holds start/stop rights over the transport clock
///
/// A `Borrowed` clock belongs to an external host and must never be
/// started, stopped, or repositioned by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockOwnership {
    /// This engine started the transport and is responsible for stopping it
    Owned,
    /// An external host drives the transport
    Borrowed,
}

/// Contract consumed by the playback scheduler
///
/// Implementations must fire tasks in ascending time order regardless of
/// submission order. `schedule` and `schedule_once` both fire exactly once;
/// they are kept distinct to mirror host transports that dispose one-shot
/// callbacks differently.
pub trait ClockAdapter {
    /// Current audio-clock time in seconds (always advancing)
    fn now(&self) -> f64;

    /// Current transport position in seconds (frozen while stopped)
    fn transport_seconds(&self) -> f64;

    /// Reposition the transport
    fn set_transport_seconds(&mut self, seconds: f64);

    /// Current tempo, if the transport exposes one
    fn bpm(&self) -> Option<f64>;

    /// Schedule a task; the returned handle must be cancellable until the
    /// task fires
    fn schedule(&mut self, at: ScheduleTime, task: TransportTask) -> ScheduleHandle;

    /// Schedule a one-shot task
    fn schedule_once(&mut self, at: ScheduleTime, task: TransportTask) -> ScheduleHandle;

    /// Cancel a previously scheduled task; unknown or already-fired handles
    /// are a no-op
    fn cancel(&mut self, handle: ScheduleHandle);

    /// Start the transport at the given audio-clock time
    fn start(&mut self, at: f64);

    /// Stop the transport at the given audio-clock time
    fn stop(&mut self, at: f64);

    /// Remove and return every task whose fire time has been reached, in
    /// ascending time order
    fn drain_due(&mut self) -> Vec<DueTask>;
}
