// Looper engine - Orchestrates recording, playback scheduling, and the
// live-reschedule path against a clock adapter it does not own

use log::{debug, warn};
use ringbuf::traits::Producer;

use crate::clock::{
    ClockAdapter, ClockOwnership, DueTask, ScheduleHandle, ScheduleTime, TransportTask,
};
use crate::instrument::Instrument;
use crate::messaging::{
    Notification, NotificationConsumer, NotificationProducer, create_notification_channel,
    status_message,
};
use crate::sequencer::looper::{LoopSettings, loop_window};
use crate::sequencer::note::NotePatch;
use crate::sequencer::recorder::{RecordingSession, RecordingState};
use crate::sequencer::scheduler::{PlaybackSession, SyncDetail, plan_playback};
use crate::sequencer::store::{Sequence, SequenceMeta, SequencePayload, SequenceStore};
use crate::sequencer::timeline::{Tempo, playback_time_scale};

/// Debounce window for coalescing edits into one live reschedule, seconds
pub const LIVE_RESCHEDULE_DEBOUNCE: f64 = 0.025;

/// Velocity used when a caller does not supply one
pub const DEFAULT_VELOCITY: f32 = 0.8;

/// Teardown knobs for `abort_current_playback`
///
/// The live-reschedule soft abort flips everything off: pending callbacks
/// are cancelled but sounding notes, the shared transport, and the
/// user-visible stop notification are all left alone.
#[derive(Debug, Clone, Copy)]
pub struct AbortOptions {
    /// Release every sounding voice on the instrument
    pub dispatch_release: bool,
    /// Re-emit the state/status notifications afterwards
    pub emit_status: bool,
    /// Stop and rewind the transport (only honored for an owned clock)
    pub reset_transport: bool,
    /// Emit `ReleaseAllKeys` alongside the instrument release
    pub notify_release: bool,
    /// Swallow the `PlaybackStopped` notification
    pub suppress_playback_stop_event: bool,
}

impl Default for AbortOptions {
    fn default() -> Self {
        Self {
            dispatch_release: true,
            emit_status: false,
            reset_transport: true,
            notify_release: true,
            suppress_playback_stop_event: false,
        }
    }
}

impl AbortOptions {
    /// Cancel pending callbacks only; used mid-flight by the live
    /// rescheduler
    pub fn soft() -> Self {
        Self {
            dispatch_release: false,
            emit_status: false,
            reset_transport: false,
            notify_release: false,
            suppress_playback_stop_event: true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingReschedule {
    handle: ScheduleHandle,
    generation: u64,
}

/// Note-event recorder and playback scheduler
///
/// Single-threaded and callback-driven: the driver advances the clock
/// adapter and calls [`process_due_tasks`](Self::process_due_tasks) to
/// feed due tasks back in.
pub struct LooperEngine<C: ClockAdapter, I: Instrument> {
    clock: C,
    instrument: I,
    store: SequenceStore,
    recording: RecordingSession,
    session: Option<PlaybackSession>,
    pending_reschedule: Option<PendingReschedule>,
    loop_settings: LoopSettings,
    next_generation: u64,
    notifications: NotificationProducer,
}

impl<C: ClockAdapter, I: Instrument> LooperEngine<C, I> {
    pub fn new(clock: C, instrument: I, notifications: NotificationProducer) -> Self {
        Self {
            clock,
            instrument,
            store: SequenceStore::default(),
            recording: RecordingSession::new(),
            session: None,
            pending_reschedule: None,
            loop_settings: LoopSettings::default(),
            next_generation: 0,
            notifications,
        }
    }

    /// Convenience constructor that also creates the notification channel
    pub fn with_channel(
        clock: C,
        instrument: I,
        capacity: usize,
    ) -> (Self, NotificationConsumer) {
        let (producer, consumer) = create_notification_channel(capacity);
        (Self::new(clock, instrument, producer), consumer)
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn instrument(&self) -> &I {
        &self.instrument
    }

    pub fn instrument_mut(&mut self) -> &mut I {
        &mut self.instrument
    }

    pub fn is_playing(&self) -> bool {
        self.session.is_some()
    }

    pub fn recording_state(&self) -> RecordingState {
        self.recording.state()
    }

    pub fn loop_settings(&self) -> LoopSettings {
        self.loop_settings
    }

    /// Replace the loop region; takes effect immediately during playback
    pub fn set_loop_settings(&mut self, settings: LoopSettings) {
        self.loop_settings = settings;
        if self.session.is_some() {
            self.queue_live_reschedule();
        }
    }

    pub fn playback_session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    // ------------------------------------------------------------------
    // Live performance input
    // ------------------------------------------------------------------

    /// Sound a note, recording it if a take is in progress
    ///
    /// Re-triggering a note that is already sounding is a no-op. If the
    /// recorder is armed, this note starts the take at time zero.
    pub fn play_note(&mut self, note: &str, velocity: f32) {
        if self.recording.is_sounding(note) {
            return;
        }
        if self.recording.is_armed() {
            self.start_recording(Some(note), velocity);
            return;
        }

        self.recording.press(note);
        self.emit(Notification::NoteVisualChange {
            note: note.to_string(),
            active: true,
        });

        if self.recording.is_recording() {
            let time = self.recording.capture_time(self.clock.now());
            let event = self.recording.capture_note_on(note, velocity, time);
            self.store.push(event);
        }
        self.instrument.note_on(note, velocity);
    }

    /// Release a sounding note, closing its recorded event if applicable
    pub fn release_note(&mut self, note: &str) {
        if !self.recording.release(note) {
            return;
        }
        self.emit(Notification::NoteVisualChange {
            note: note.to_string(),
            active: false,
        });

        if self.recording.is_recording() {
            if let Some((id, end)) = self.recording.capture_note_off(note, self.clock.now()) {
                self.store.close(&id, end);
            }
        }
        self.instrument.note_off(note);
    }

    /// Merge a patch into the event at `index`
    ///
    /// Out-of-range indices are ignored. During playback this queues a
    /// debounced live reschedule instead of restarting from zero.
    pub fn edit_note(&mut self, index: usize, patch: &NotePatch) {
        if !self.store.edit(index, patch) {
            return;
        }
        if self.session.is_some() {
            self.queue_live_reschedule();
        }
    }

    // ------------------------------------------------------------------
    // Recording control
    // ------------------------------------------------------------------

    /// Arm, disarm, or stop recording depending on the current state
    pub fn toggle_recording(&mut self) {
        if self.session.is_some() {
            return;
        }
        if self.recording.is_recording() {
            self.stop_all();
        } else if self.recording.is_armed() {
            self.recording.disarm();
            self.update_state();
        } else {
            self.recording.arm();
            self.update_state();
        }
    }

    /// Begin a fresh take, optionally sounding and capturing a first note
    /// at time zero
    pub fn start_recording(&mut self, first_note: Option<&str>, velocity: f32) {
        if self.recording.is_recording() {
            return;
        }
        let now = self.clock.now();
        self.recording.begin(now);
        let bpm = self.transport_bpm();
        self.store.reset_events();
        self.store.set_record_bpm(bpm);
        self.update_state();
        self.emit(Notification::SequenceChanged);

        if let Some(note) = first_note {
            // No silent gap: the arming note lands exactly at time zero
            self.recording.press(note);
            let event = self.recording.capture_note_on(note, velocity, 0.0);
            self.store.push(event);
            self.instrument.note_on(note, velocity);
            self.emit(Notification::NoteVisualChange {
                note: note.to_string(),
                active: true,
            });
        }
    }

    // ------------------------------------------------------------------
    // Playback
    // ------------------------------------------------------------------

    /// Schedule the stored sequence against the clock adapter
    ///
    /// With no sync reference the engine starts its own transport and
    /// owns its stop rights; with one, the clock stays under host
    /// control and is never started or stopped here.
    pub fn start_playback(&mut self, sync: Option<SyncDetail>) {
        let snapshot = self.store.snapshot();
        if snapshot.events.is_empty() {
            debug!("start_playback skipped: empty sequence");
            return;
        }

        let sync_detail = sync.unwrap_or_default();
        let has_host = sync_detail.is_host_sync();
        let resume = sync_detail.resume;

        self.abort_current_playback(AbortOptions {
            dispatch_release: !resume,
            emit_status: false,
            reset_transport: !has_host,
            notify_release: !has_host && !resume,
            suppress_playback_stop_event: resume,
        });

        let now_transport = self.clock.transport_seconds();
        let now_audio = self.clock.now();
        let time_scale = playback_time_scale(self.store.record_bpm(), self.transport_bpm());

        let mut host_transport_time = sync_detail.transport_time;
        if host_transport_time.is_none() {
            if let Some(audio) = sync_detail.audio_time {
                // Convert the audio-clock reference into an equivalent
                // transport time via the offset observed right now
                host_transport_time = Some(now_transport + (audio - now_audio).max(0.0));
            }
        }
        let base_delta = sync_detail
            .audio_time
            .map(|t| (t - now_audio).max(0.0))
            .or_else(|| host_transport_time.map(|t| (t - now_transport).max(0.0)))
            .unwrap_or(0.0);
        let host_transport_base = host_transport_time;

        debug!(
            "start_playback: {} events, mode {}",
            snapshot.events.len(),
            if has_host { "host-sync" } else { "stand-alone" }
        );

        let scaled_duration = self.store.duration_seconds(time_scale);
        let window = loop_window(scaled_duration, &self.loop_settings);
        let plan = plan_playback(
            &snapshot.events,
            time_scale,
            &window,
            sync_detail.live_start_offset,
            scaled_duration,
        );

        if window.active && !has_host {
            self.clock
                .set_transport_seconds(window.start + plan.playhead_relative);
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        let mut scheduled: Vec<ScheduleHandle> = Vec::with_capacity(plan.triggers.len() + 1);

        for trigger in &plan.triggers {
            let at = Self::schedule_target(host_transport_base, has_host, base_delta, trigger.offset);
            let handle = self.clock.schedule(
                at,
                TransportTask::TriggerNote {
                    note: trigger.note.clone(),
                    velocity: trigger.velocity,
                    duration: trigger.duration,
                },
            );
            scheduled.push(handle);
        }

        if let Some(stop_offset) = plan.stop_offset {
            let at = Self::schedule_target(host_transport_base, has_host, base_delta, stop_offset);
            scheduled.push(self.clock.schedule_once(at, TransportTask::StopPlayback));
        }

        let ownership = if has_host {
            ClockOwnership::Borrowed
        } else {
            self.clock.start(now_audio);
            ClockOwnership::Owned
        };

        let reference = host_transport_base.unwrap_or_else(|| {
            if has_host {
                self.clock.transport_seconds() + base_delta
            } else {
                self.clock.transport_seconds()
            }
        });
        let playback_start_transport = if reference.is_finite() {
            reference - plan.playhead_relative
        } else {
            0.0
        };

        self.session = Some(PlaybackSession {
            ownership,
            playback_start_transport,
            generation,
            scheduled,
        });

        self.emit(Notification::PlaybackStarted {
            transport_start: playback_start_transport,
            transport_reference: reference,
            loop_settings: self.loop_settings,
        });
        self.update_state();
    }

    fn schedule_target(
        host_transport_base: Option<f64>,
        has_host: bool,
        base_delta: f64,
        offset: f64,
    ) -> ScheduleTime {
        match host_transport_base {
            Some(base) => ScheduleTime::Transport((base + offset).max(0.0)),
            None if has_host => ScheduleTime::Relative((base_delta + offset).max(0.0)),
            None => ScheduleTime::Relative(offset),
        }
    }

    /// Tear down the current playback session
    ///
    /// Idempotent, and the only legal teardown path. Every outstanding
    /// handle is cancelled before anything else happens; a single leaked
    /// handle would fire a note after logical stop.
    pub fn abort_current_playback(&mut self, options: AbortOptions) {
        let was_playing = self.session.is_some();

        if let Some(pending) = self.pending_reschedule.take() {
            self.clock.cancel(pending.handle);
        }

        let transport_stop = self.clock.transport_seconds();
        if let Some(mut session) = self.session.take() {
            for handle in session.take_handles() {
                self.clock.cancel(handle);
            }
            if options.reset_transport && session.ownership == ClockOwnership::Owned {
                let immediate = self.clock.now();
                self.clock.stop(immediate);
                self.clock.set_transport_seconds(0.0);
            }
        }

        if self.recording.is_recording() {
            // The reference tempo freezes when the take ends
            self.store.set_record_bpm(self.transport_bpm());
        }
        self.recording.stop();

        if was_playing && !options.suppress_playback_stop_event {
            self.emit(Notification::PlaybackStopped { transport_stop });
        }

        if options.dispatch_release {
            self.instrument.release_all();
            if options.notify_release {
                self.emit(Notification::ReleaseAllKeys);
            }
        }

        if options.emit_status {
            self.update_state();
        }
    }

    /// Stop playback and recording, releasing everything
    pub fn stop_all(&mut self) {
        let reset_transport = self
            .session
            .as_ref()
            .map(|s| s.ownership == ClockOwnership::Owned)
            .unwrap_or(true);
        self.abort_current_playback(AbortOptions {
            dispatch_release: true,
            emit_status: false,
            reset_transport,
            notify_release: reset_transport,
            suppress_playback_stop_event: false,
        });
        self.update_state();
        self.emit(Notification::SequenceChanged);
    }

    /// Stop everything and drop the sequence
    pub fn clear_sequence(&mut self) {
        self.stop_all();
        let bpm = self.transport_bpm();
        self.store.clear(bpm);
        self.update_state();
        self.emit(Notification::SequenceChanged);
    }

    // ------------------------------------------------------------------
    // Sequence exchange
    // ------------------------------------------------------------------

    pub fn get_sequence(&self) -> Sequence {
        self.store.snapshot()
    }

    /// Replace the stored sequence from an external payload
    ///
    /// Metadata embedded in a full payload wins over the `meta` argument;
    /// with neither, the last known reference tempo is kept.
    pub fn set_sequence(
        &mut self,
        payload: impl Into<SequencePayload>,
        meta: Option<SequenceMeta>,
    ) {
        let fallback_bpm = self.store.record_bpm();
        match payload.into() {
            SequencePayload::Events(events) => {
                self.store.replace(events, meta, fallback_bpm);
            }
            SequencePayload::Full(sequence) => {
                self.store
                    .replace(sequence.events, Some(sequence.meta), fallback_bpm);
            }
        }
        debug!("sequence data set from patch");
        self.update_state();
    }

    // ------------------------------------------------------------------
    // Live reschedule
    // ------------------------------------------------------------------

    /// Queue a debounced reschedule; edits within the window coalesce
    pub fn queue_live_reschedule(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        if self.pending_reschedule.is_some() {
            return;
        }
        let generation = session.generation;
        let handle = self.clock.schedule_once(
            ScheduleTime::Relative(LIVE_RESCHEDULE_DEBOUNCE),
            TransportTask::LiveReschedule { generation },
        );
        self.pending_reschedule = Some(PendingReschedule { handle, generation });
    }

    fn reschedule_live_playback(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        let prior_ownership = session.ownership;
        let playback_origin = session.playback_start_transport;

        let now_transport = self.clock.transport_seconds();
        let now_audio = self.clock.now();
        let elapsed = (now_transport - playback_origin).max(0.0);
        let time_scale = playback_time_scale(self.store.record_bpm(), self.transport_bpm());
        let scaled_duration = self.store.duration_seconds(time_scale);
        let window = loop_window(scaled_duration, &self.loop_settings);
        let live_start_offset = if window.active {
            window.start + elapsed % window.duration
        } else {
            elapsed.min(scaled_duration)
        };

        // Soft abort: cancel pending callbacks only, keep sounding notes
        // and the shared transport untouched
        self.abort_current_playback(AbortOptions::soft());
        self.start_playback(Some(SyncDetail {
            transport_time: Some(now_transport),
            audio_time: Some(now_audio),
            live_start_offset,
            resume: true,
        }));

        // Resume keeps the original start/stop rights over the clock
        if prior_ownership == ClockOwnership::Owned {
            if let Some(session) = &mut self.session {
                session.ownership = ClockOwnership::Owned;
            }
        }
    }

    // ------------------------------------------------------------------
    // Task dispatch
    // ------------------------------------------------------------------

    /// Drain the clock adapter and apply every due task
    ///
    /// Loops until no further tasks are due, so a reschedule that lands
    /// tasks at the current playhead is applied in the same call.
    pub fn process_due_tasks(&mut self) {
        loop {
            let due = self.clock.drain_due();
            if due.is_empty() {
                break;
            }
            for DueTask { time, task } in due {
                self.handle_task(task, time);
            }
        }
    }

    fn handle_task(&mut self, task: TransportTask, time: f64) {
        match task {
            TransportTask::TriggerNote {
                note,
                velocity,
                duration,
            } => {
                // Stale triggers after a stop must stay silent
                if self.session.is_none() {
                    return;
                }
                self.instrument.trigger(&note, velocity, duration, time);
            }
            TransportTask::StopPlayback => {
                if self.session.is_none() {
                    return;
                }
                self.stop_all();
            }
            TransportTask::LiveReschedule { generation } => {
                if self.pending_reschedule.take().is_none() {
                    return;
                }
                let current = self.session.as_ref().map(|s| s.generation);
                if current != Some(generation) {
                    return;
                }
                self.reschedule_live_playback();
            }
        }
    }

    // ------------------------------------------------------------------
    // State + notifications
    // ------------------------------------------------------------------

    fn transport_bpm(&self) -> f64 {
        match self.clock.bpm() {
            Some(bpm) if bpm.is_finite() && bpm > 0.0 => bpm,
            _ => Tempo::from_bpm(self.store.record_bpm()).bpm(),
        }
    }

    fn update_state(&mut self) {
        let is_recording = self.recording.is_recording();
        let is_armed = self.recording.is_armed();
        let is_playing = self.session.is_some();
        let has_sequence = !self.store.is_empty();

        self.emit(Notification::RecordingStateChanged {
            is_recording,
            is_armed,
            is_playing,
            has_sequence,
        });
        self.emit(Notification::StatusUpdate {
            message: status_message(is_recording, is_armed, is_playing, has_sequence),
        });
    }

    fn emit(&mut self, notification: Notification) {
        // A UI consumer that falls behind loses updates, never blocks us
        if self.notifications.try_push(notification).is_err() {
            warn!("notification channel full, dropping update");
        }
    }
}
