// Sequencer module - note capture, sequence storage, and playback planning

pub mod looper;
pub mod note;
pub mod recorder;
pub mod scheduler;
pub mod store;
pub mod timeline;

pub use looper::{LoopSettings, LoopWindow, loop_window};
pub use note::{NoteEvent, NotePatch};
pub use recorder::{RecordingSession, RecordingState};
pub use scheduler::{PlaybackPlan, PlaybackSession, PlannedTrigger, SyncDetail, plan_playback};
pub use store::{Sequence, SequenceError, SequenceMeta, SequencePayload, SequenceStore};
pub use timeline::{Tempo, playback_time_scale};
