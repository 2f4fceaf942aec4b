// Live Looper - Library exports for tests and benchmarks

pub mod clock;
pub mod engine;
pub mod instrument;
pub mod messaging;
pub mod sequencer;

// Re-export commonly used types for convenience
pub use clock::{ClockAdapter, ClockOwnership, DueTask, ManualClock, ScheduleTime, TransportTask};
pub use engine::{AbortOptions, DEFAULT_VELOCITY, LIVE_RESCHEDULE_DEBOUNCE, LooperEngine};
pub use instrument::{Instrument, InstrumentCall, NoteLog};
pub use messaging::channels::create_notification_channel;
pub use messaging::notification::{Notification, status_message};
pub use sequencer::{
    LoopSettings, NoteEvent, NotePatch, RecordingState, Sequence, SequenceMeta, SyncDetail, Tempo,
};
