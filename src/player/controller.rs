use anyhow::Result;
use serde_json::json;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::attacher::StreamAttacher;
use super::controls_visibility::ControlsVisibility;
use super::gestures::{GestureContext, GestureDisambiguator, GestureIntent};
use super::hotkeys::{HotkeyAction, Key, map_key};
use super::leave_progress::{LeaveProgress, LeaveProgressFlusher};
use super::progress_tracker::ProgressTracker;
use super::seek_guard::{SeekDecision, SeekGuard, SeekViolation};
use super::speed_governor::{RateDecision, RateViolation, SpeedGovernor};
use super::traits::{DemuxerFactory, MediaSink};
use super::types::{AttachMode, PointerInput, SinkEvent, StageRect, StreamFailure};
use crate::backends::{BackendError, PlaybackBackend};
use crate::config::Config;
use crate::models::events::payload;
use crate::models::{
    DeviceId, EventType, FatalReason, PlaybackBootstrap, PlaybackState, Policy, SessionToken,
    Toast, VideoMeta,
};
use crate::services::{
    BackendCall, BackendDispatcher, BackendOutcome, EventBatcher, SessionLifecycle, SessionState,
};
use crate::ui::{SurfaceInputs, SurfaceModel};
use crate::utils::LifecycleGuard;
use crate::utils::time::{clamp, format_clock, sanitize_seconds};

const REFRESHED_TOAST: &str = "Session refreshed.";
const REFRESH_FAILED_TOAST: &str = "Couldn't refresh the session.";
const NO_SESSION_TOAST: &str = "Review playback has no session to refresh.";

/// Everything the controller needs to know about one playback attempt.
#[derive(Debug, Clone)]
pub struct PlaybackOptions {
    pub video: VideoMeta,
    pub bootstrap: PlaybackBootstrap,
    pub enrollment_id: Option<i64>,
    pub device_id: DeviceId,
}

type FatalCallback = Box<dyn FnMut(FatalReason) + Send>;
type LeaveProgressCallback = Box<dyn FnMut(LeaveProgress) + Send>;

/// Host notifications. `on_fatal` fires at most once, `on_leave_progress` at most once.
#[derive(Default)]
pub struct HostCallbacks {
    on_fatal: Option<FatalCallback>,
    on_leave_progress: Option<LeaveProgressCallback>,
}

impl HostCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_fatal(mut self, callback: impl FnMut(FatalReason) + Send + 'static) -> Self {
        self.on_fatal = Some(Box::new(callback));
        self
    }

    pub fn on_leave_progress(
        mut self,
        callback: impl FnMut(LeaveProgress) + Send + 'static,
    ) -> Self {
        self.on_leave_progress = Some(Box::new(callback));
        self
    }
}

impl std::fmt::Debug for HostCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostCallbacks")
            .field("on_fatal", &self.on_fatal.is_some())
            .field("on_leave_progress", &self.on_leave_progress.is_some())
            .finish()
    }
}

/// Commands that can be sent to the playback controller
#[derive(Debug)]
pub enum PlayerCommand {
    /// Signal reported by the media sink
    Sink(SinkEvent),
    /// Raw pointer or touch input on the stage
    Pointer(PointerInput),
    /// Key press; ignored while a text input has focus
    Key { key: Key, text_input_focused: bool },
    Play,
    Pause,
    TogglePlay,
    /// Absolute seek request from the UI
    Seek { position: f64 },
    /// Relative seek in seconds
    Skip { delta: f64 },
    SetRate { rate: f64 },
    SetVolume { volume: f64 },
    SetMuted { muted: bool },
    ToggleMute,
    SetFullscreen { fullscreen: bool },
    ToggleFullscreen,
    ToggleTheater,
    VisibilityChanged { hidden: bool },
    FocusChanged { focused: bool },
    /// The page is going away; leave progress is flushed now rather than at unmount
    PageHide,
    StageResized(StageRect),
    /// Viewer asked to re-validate the session
    RefreshSession,
    /// Show the current position as a toast
    ShowProgress,
    SetToken(SessionToken),
    /// Re-bind the sink to a new stream URL
    Reattach { play_url: String },
    DismissToast,
    Snapshot {
        respond_to: oneshot::Sender<ControllerSnapshot>,
    },
    Surface {
        respond_to: oneshot::Sender<SurfaceModel>,
    },
}

/// Point-in-time view of the controller, for hosts and tests.
#[derive(Debug, Clone)]
pub struct ControllerSnapshot {
    pub state: PlaybackState,
    pub session: SessionState,
    pub policy: Policy,
    pub attach_mode: Option<AttachMode>,
    pub sessionless: bool,
    /// Event types waiting for the next flush, oldest first.
    pub queued_events: Vec<EventType>,
    pub dropped_events: u64,
    pub backward_jumps: u32,
}

/// Enforces the access policy for one playback attempt.
///
/// All state is owned by the controller. Hosts either spawn [`PlaybackController::run`]
/// and talk to it through a [`PlayerHandle`], or drive the synchronous API from their own
/// loop. Seek and rate enforcement always completes inside the call that observed the
/// change.
pub struct PlaybackController {
    video: VideoMeta,
    bootstrap: PlaybackBootstrap,
    enrollment_id: Option<i64>,
    device_id: DeviceId,
    policy: Policy,
    config: Config,
    sink: Box<dyn MediaSink>,
    attacher: StreamAttacher,
    progress: ProgressTracker,
    seek_guard: SeekGuard,
    speed: SpeedGovernor,
    gestures: GestureDisambiguator,
    controls: ControlsVisibility,
    events: EventBatcher,
    session: SessionLifecycle,
    dispatcher: BackendDispatcher,
    leave_progress: LeaveProgressFlusher,
    callbacks: HostCallbacks,
    guard: LifecycleGuard,
    state: PlaybackState,
    toast_expires: Option<Instant>,
    mounted: bool,
    commands: mpsc::UnboundedReceiver<PlayerCommand>,
    outcomes: mpsc::UnboundedReceiver<BackendOutcome>,
    state_tx: watch::Sender<PlaybackState>,
    cancel: CancellationToken,
}

impl PlaybackController {
    pub fn new(
        options: PlaybackOptions,
        sink: Box<dyn MediaSink>,
        backend: Arc<dyn PlaybackBackend>,
        demuxers: Box<dyn DemuxerFactory>,
        config: Config,
        callbacks: HostCallbacks,
    ) -> (PlayerHandle, PlaybackController) {
        let PlaybackOptions {
            video,
            bootstrap,
            enrollment_id,
            device_id,
        } = options;
        let policy = bootstrap.normalized_policy();
        debug!(
            "Policy for video {}: seek {:?}, max rate {}x, monitoring {}",
            video.id,
            policy.seek.mode,
            policy.max_rate(),
            policy.monitoring_enabled
        );

        let guard = LifecycleGuard::new();
        let (outcome_tx, outcomes) = mpsc::unbounded_channel();
        let dispatcher = BackendDispatcher::new(
            backend,
            guard.clone(),
            outcome_tx,
            config.network.sessionless_prefix.clone(),
            bootstrap.token.clone(),
            video.id,
            enrollment_id,
        );
        let session = SessionLifecycle::new(dispatcher.is_sessionless(), policy.monitoring_enabled);

        let (sender, commands) = mpsc::unbounded_channel();
        let state = PlaybackState::default();
        let (state_tx, state_rx) = watch::channel(state.clone());
        let cancel = CancellationToken::new();

        let controller = PlaybackController {
            attacher: StreamAttacher::new(
                config.network.api_base_url.clone(),
                config.stream.clone(),
                demuxers,
            ),
            progress: ProgressTracker::new(),
            seek_guard: SeekGuard::new(config.timing.seek_warning_cooldown()),
            speed: SpeedGovernor::new(),
            gestures: GestureDisambiguator::new(
                &config.timing,
                &config.gestures,
                StageRect::default(),
            ),
            controls: ControlsVisibility::new(config.timing.controls_autohide()),
            events: EventBatcher::new(&policy, config.telemetry.event_queue_cap),
            session,
            dispatcher,
            leave_progress: LeaveProgressFlusher::new(),
            callbacks,
            guard,
            state,
            toast_expires: None,
            mounted: false,
            commands,
            outcomes,
            state_tx,
            cancel: cancel.clone(),
            video,
            bootstrap,
            enrollment_id,
            device_id,
            policy,
            config,
            sink,
        };
        let handle = PlayerHandle {
            sender,
            state: state_rx,
            cancel,
        };

        (handle, controller)
    }

    /// Runs backend calls on `runtime`. Needed when the controller was built outside a
    /// Tokio runtime and is driven through the synchronous API.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.dispatcher.set_runtime(runtime);
        self
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn session_state(&self) -> &SessionState {
        self.session.state()
    }

    /// Attaches the stream and starts the session. Safe to call more than once.
    pub fn mount(&mut self, now: Instant) {
        if self.mounted || !self.guard.is_live() {
            return;
        }
        self.mounted = true;

        let play_url = self
            .bootstrap
            .effective_play_url(&self.video)
            .map(str::to_string);
        self.attach(play_url.as_deref(), now);
        self.publish();
    }

    /// Whether the heartbeat and flush timers should be firing.
    pub fn timers_active(&self) -> bool {
        self.mounted && self.guard.is_live() && self.session.timers_active()
    }

    /// Earliest gesture, auto-hide or toast deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        [
            self.gestures.next_deadline(),
            self.controls.next_deadline(),
            self.toast_expires,
        ]
        .into_iter()
        .flatten()
        .min()
    }

    pub fn handle_command(&mut self, command: PlayerCommand, now: Instant) {
        if !self.guard.is_live() {
            trace!("Controller torn down, ignoring {:?}", command);
            return;
        }

        match command {
            PlayerCommand::Sink(event) => self.on_sink_event(event, now),
            PlayerCommand::Pointer(input) => self.on_pointer(input, now),
            PlayerCommand::Key {
                key,
                text_input_focused,
            } => {
                if let Some(action) = map_key(key, text_input_focused) {
                    self.on_hotkey(action, now);
                }
            }
            PlayerCommand::Play => self.play(),
            PlayerCommand::Pause => self.pause(),
            PlayerCommand::TogglePlay => self.toggle_play(),
            PlayerCommand::Seek { position } => self.request_seek(position, now),
            PlayerCommand::Skip { delta } => self.skip(delta, now),
            PlayerCommand::SetRate { rate } => self.request_rate(rate, now),
            PlayerCommand::SetVolume { volume } => self.set_volume(volume),
            PlayerCommand::SetMuted { muted } => self.set_muted(muted),
            PlayerCommand::ToggleMute => self.set_muted(!self.state.muted),
            PlayerCommand::SetFullscreen { fullscreen } => self.apply_fullscreen(fullscreen, now),
            PlayerCommand::ToggleFullscreen => {
                self.apply_fullscreen(!self.state.fullscreen, now)
            }
            PlayerCommand::ToggleTheater => self.state.theater_mode = !self.state.theater_mode,
            PlayerCommand::VisibilityChanged { hidden } => self.on_visibility(hidden),
            PlayerCommand::FocusChanged { focused } => {
                let kind = if focused {
                    EventType::FocusGained
                } else {
                    EventType::FocusLost
                };
                self.events.record(kind, Default::default());
            }
            PlayerCommand::PageHide => self.flush_leave_progress(),
            PlayerCommand::StageResized(stage) => self.gestures.set_stage(stage),
            PlayerCommand::RefreshSession => self.refresh_session(now),
            PlayerCommand::ShowProgress => self.show_progress(now),
            PlayerCommand::SetToken(token) => {
                self.dispatcher.set_token(token);
                self.session
                    .set_sessionless(self.dispatcher.is_sessionless());
            }
            PlayerCommand::Reattach { play_url } => {
                if self.session.is_terminal() {
                    warn!("Session is over, not re-attaching {}", play_url);
                } else {
                    self.state.ready = false;
                    self.state.playing = false;
                    self.state.buffering = false;
                    self.attach(Some(&play_url), now);
                }
            }
            PlayerCommand::DismissToast => self.clear_toast(),
            PlayerCommand::Snapshot { respond_to } => {
                let _ = respond_to.send(self.snapshot());
            }
            PlayerCommand::Surface { respond_to } => {
                let _ = respond_to.send(self.surface());
            }
        }

        self.publish();
    }

    /// Applies the result of a background backend call.
    pub fn handle_outcome(&mut self, outcome: BackendOutcome, now: Instant) {
        if !self.guard.is_live() {
            return;
        }

        let BackendOutcome { call, result } = outcome;
        match result {
            Ok(()) => {
                trace!("{:?} succeeded", call);
                if call == (BackendCall::Refresh { manual: true }) {
                    self.show_toast(Toast::info(REFRESHED_TOAST), now);
                }
            }
            Err(e) => self.on_backend_error(call, e, now),
        }

        self.publish();
    }

    pub fn on_heartbeat_tick(&mut self) {
        if !self.timers_active() {
            return;
        }
        trace!("Heartbeat tick");
        self.dispatcher.heartbeat();
    }

    pub fn on_flush_tick(&mut self) {
        if !self.timers_active() {
            return;
        }
        self.flush_events();
    }

    /// Resolves every gesture, auto-hide and toast deadline that has passed.
    pub fn on_deadline(&mut self, now: Instant) {
        if !self.guard.is_live() {
            return;
        }

        let intents = self.gestures.poll(now);
        self.apply_intents(intents, now);
        self.controls.poll(now);
        if self.toast_expires.is_some_and(|at| at <= now) {
            self.clear_toast();
        }

        self.publish();
    }

    /// Stops everything this controller started. Runs at most once.
    ///
    /// Order: retire the lifecycle guard (which also stops the timers), destroy the
    /// demuxer, send `end`, flush the remaining events, then hand leave-progress to the host.
    pub fn teardown(&mut self) {
        if !self.guard.retire() {
            return;
        }
        info!("Tearing down playback controller for video {}", self.video.id);

        self.gestures.reset();
        self.attacher.destroy();

        if self.policy.monitoring_enabled {
            if self.session.talks_to_backend() {
                self.dispatcher.end();
            }
            self.flush_events();
        }
        self.session.end();
        self.flush_leave_progress();
        self.mounted = false;
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            state: self.state.clone(),
            session: self.session.state().clone(),
            policy: self.policy.clone(),
            attach_mode: self.attacher.mode(),
            sessionless: self.dispatcher.is_sessionless(),
            queued_events: self.events.pending().map(|event| event.kind).collect(),
            dropped_events: self.events.dropped(),
            backward_jumps: self.progress.backward_jumps(),
        }
    }

    pub fn surface(&self) -> SurfaceModel {
        let fatal = match self.session.state() {
            SessionState::Fatal(reason) => Some(reason),
            _ => None,
        };

        SurfaceModel::build(SurfaceInputs {
            title: &self.video.title,
            video_id: self.video.id,
            enrollment_id: self.enrollment_id,
            policy: &self.policy,
            state: &self.state,
            device_id: &self.device_id,
            expires_at: self.bootstrap.expires_at_utc(),
            fatal,
        })
    }

    /// Run the controller event loop until unmounted or every handle is dropped.
    pub async fn run(mut self) {
        debug!("PlaybackController event loop started");
        self.mount(Instant::now());

        let heartbeat_period = self.config.timing.heartbeat_interval();
        let flush_period = self.config.timing.event_flush_interval();
        let start = Instant::now();
        let mut heartbeat = interval_at(start + heartbeat_period, heartbeat_period);
        let mut flush = interval_at(start + flush_period, flush_period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        flush.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let cancel = self.cancel.clone();

        loop {
            let timers = self.timers_active();
            let deadline = self.next_deadline();

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Unmount requested");
                    break;
                }
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command, Instant::now()),
                    None => {
                        debug!("All player handles dropped");
                        break;
                    }
                },
                Some(outcome) = self.outcomes.recv() => {
                    self.handle_outcome(outcome, Instant::now());
                }
                _ = heartbeat.tick(), if timers => self.on_heartbeat_tick(),
                _ = flush.tick(), if timers => self.on_flush_tick(),
                _ = sleep_until_deadline(deadline), if deadline.is_some() => {
                    self.on_deadline(Instant::now());
                }
            }
        }

        self.teardown();
        self.dispatcher
            .settle(self.config.timing.shutdown_grace())
            .await;
        debug!("PlaybackController event loop stopped");
    }

    fn attach(&mut self, play_url: Option<&str>, now: Instant) {
        match self.attacher.attach(self.sink.as_mut(), play_url) {
            Ok(mode) => {
                debug!("Stream attached via {:?}", mode);
                if self.policy.speed_locked() {
                    self.write_rate(1.0);
                }
                self.session.go_live();
            }
            Err(e) => {
                warn!("Stream attach failed: {}", e);
                self.fail(e.fatal_reason(), now);
            }
        }
    }

    fn on_sink_event(&mut self, event: SinkEvent, now: Instant) {
        match event {
            SinkEvent::LoadedMetadata { duration } => {
                let duration = sanitize_seconds(
                    duration
                        .or_else(|| self.sink.duration())
                        .unwrap_or_default(),
                );
                if duration > 0.0 {
                    self.state.duration = duration;
                }
                self.state.ready = true;
                self.state.buffering = false;
                self.sync_controls(now);
            }
            SinkEvent::TimeUpdate { current_time } => {
                let sample = self.progress.observe(current_time);
                if sample.backward_jump {
                    trace!(
                        "Backward jump {:.2}s -> {:.2}s",
                        sample.previous, sample.current
                    );
                }
                self.state.current_time = sample.current;
                self.state.max_watched = self.progress.max_watched();
            }
            SinkEvent::Play => {
                self.state.playing = true;
                self.state.buffering = false;
                self.sync_controls(now);
            }
            SinkEvent::Pause => {
                self.state.playing = false;
                self.sync_controls(now);
            }
            SinkEvent::Waiting => {
                self.state.buffering = true;
                self.sync_controls(now);
            }
            SinkEvent::Playing => {
                self.state.buffering = false;
                self.sync_controls(now);
            }
            SinkEvent::RateChange { rate } => {
                self.state.rate = rate;
                match self.speed.on_rate_change(&self.policy, rate) {
                    RateDecision::Accept(_) => {}
                    RateDecision::Enforce(violation) => self.enforce_rate(violation, now),
                }
            }
            SinkEvent::Seeking { target } => {
                let decision = self.seek_guard.on_seeking(
                    &self.policy,
                    target,
                    self.progress.max_watched(),
                    now,
                );
                match decision {
                    SeekDecision::Allow => self.state.current_time = sanitize_seconds(target),
                    SeekDecision::Echo => trace!("Ignoring corrective seek to {:.2}s", target),
                    SeekDecision::SnapBack(violation) => self.snap_back(violation, now),
                }
            }
            SinkEvent::MediaError { code, message } => {
                self.events.record(
                    EventType::PlayerError,
                    payload([("code", json!(code)), ("message", json!(message))]),
                );
                warn!("Media error {}: {}", code, message);
                self.stream_failure(StreamFailure::from_media_error(code, &message), now);
            }
            SinkEvent::DemuxerError(report) => {
                self.events.record(
                    EventType::PlayerError,
                    payload([
                        ("fatal", json!(report.fatal)),
                        ("details", json!(report.details)),
                        ("type", json!(report.kind)),
                    ]),
                );
                if report.fatal {
                    warn!("Fatal demuxer error: {} / {}", report.kind, report.details);
                    self.stream_failure(StreamFailure::from_demuxer_error(&report), now);
                } else {
                    debug!("Recoverable demuxer error: {}", report.details);
                }
            }
        }
    }

    fn on_pointer(&mut self, input: PointerInput, now: Instant) {
        if self.session.is_terminal() {
            return;
        }
        let ctx = GestureContext {
            speed_locked: self.policy.speed_locked(),
            rate: self.state.rate,
            volume: self.state.volume,
        };
        let intents = self.gestures.handle(input, ctx, now);
        self.apply_intents(intents, now);
    }

    fn apply_intents(&mut self, intents: Vec<GestureIntent>, now: Instant) {
        for intent in intents {
            trace!("Gesture intent {:?}", intent);
            match intent {
                GestureIntent::ToggleControls => self.controls.toggle(now),
                GestureIntent::TogglePlay => self.toggle_play(),
                GestureIntent::Seek { delta } => {
                    self.show_toast(Toast::info(format!("{:+}s", delta)), now);
                    self.skip(delta, now);
                }
                GestureIntent::BoostRate { rate } => {
                    self.request_rate(rate, now);
                    self.show_toast(Toast::info(format!("{}x", self.state.rate)), now);
                }
                GestureIntent::RestoreRate { rate } => self.request_rate(rate, now),
                GestureIntent::SetVolume { volume } => self.set_volume(volume),
            }
        }
    }

    fn on_hotkey(&mut self, action: HotkeyAction, now: Instant) {
        match action {
            HotkeyAction::TogglePlay => self.toggle_play(),
            HotkeyAction::ToggleFullscreen => self.apply_fullscreen(!self.state.fullscreen, now),
            HotkeyAction::ToggleMute => self.set_muted(!self.state.muted),
            HotkeyAction::ToggleTheater => self.state.theater_mode = !self.state.theater_mode,
            HotkeyAction::Skip(delta) => self.skip(delta, now),
        }
    }

    fn play(&mut self) {
        if self.session.is_terminal() {
            debug!("Session is over, ignoring play");
            return;
        }
        if let Err(e) = self.sink.play() {
            debug!("Play request rejected by sink: {}", e);
        }
    }

    fn pause(&mut self) {
        if let Err(e) = self.sink.pause() {
            debug!("Pause request rejected by sink: {}", e);
        }
    }

    fn toggle_play(&mut self) {
        if self.sink.is_paused() {
            self.play();
        } else {
            self.pause();
        }
    }

    /// UI seeks are checked before they reach the sink.
    fn request_seek(&mut self, position: f64, now: Instant) {
        let duration = sanitize_seconds(self.sink.duration().unwrap_or(self.state.duration));
        let target = if duration > 0.0 {
            clamp(position, 0.0, duration)
        } else {
            sanitize_seconds(position)
        };

        match self
            .seek_guard
            .evaluate(&self.policy, target, self.progress.max_watched(), now)
        {
            SeekDecision::Allow | SeekDecision::Echo => self.write_position(target),
            SeekDecision::SnapBack(violation) => self.snap_back(violation, now),
        }
    }

    fn skip(&mut self, delta: f64, now: Instant) {
        let current = sanitize_seconds(self.sink.current_time());
        self.request_seek(current + delta, now);
    }

    fn snap_back(&mut self, violation: SeekViolation, now: Instant) {
        let SeekViolation {
            corrected,
            payload,
            warning,
        } = violation;

        self.seek_guard.expect_correction(corrected);
        self.write_position(corrected);
        if let Some(text) = warning {
            self.show_toast(Toast::warn(text), now);
        }
        self.events.record(EventType::SeekAttempt, payload);
    }

    fn write_position(&mut self, position: f64) {
        if let Err(e) = self.sink.set_current_time(position) {
            debug!("Sink rejected position {:.2}s: {}", position, e);
        }
        self.state.current_time = position;
    }

    fn request_rate(&mut self, rate: f64, now: Instant) {
        match self.speed.clamp_request(&self.policy, rate) {
            RateDecision::Accept(rate) => self.write_rate(rate),
            RateDecision::Enforce(violation) => self.enforce_rate(violation, now),
        }
    }

    fn enforce_rate(&mut self, violation: RateViolation, now: Instant) {
        self.write_rate(violation.enforced);
        self.show_toast(Toast::warn(violation.warning), now);
        self.events
            .record(EventType::SpeedChangeAttempt, violation.payload);
    }

    fn write_rate(&mut self, rate: f64) {
        if let Err(e) = self.sink.set_playback_rate(rate) {
            debug!("Sink rejected rate {}x: {}", rate, e);
        }
        self.state.rate = rate;
    }

    fn set_volume(&mut self, volume: f64) {
        let volume = clamp(volume, 0.0, 1.0);
        let muted = volume <= 0.0001;
        self.state.volume = volume;
        self.state.muted = muted;
        if let Err(e) = self
            .sink
            .set_volume(volume)
            .and_then(|_| self.sink.set_muted(muted))
        {
            debug!("Sink rejected volume {:.2}: {}", volume, e);
        }
    }

    fn set_muted(&mut self, muted: bool) {
        self.state.muted = muted;
        if let Err(e) = self.sink.set_muted(muted) {
            debug!("Sink rejected mute change: {}", e);
        }
    }

    fn apply_fullscreen(&mut self, fullscreen: bool, now: Instant) {
        if self.state.fullscreen == fullscreen {
            return;
        }
        self.state.fullscreen = fullscreen;
        let kind = if fullscreen {
            self.controls.show(now);
            EventType::FullscreenEnter
        } else {
            EventType::FullscreenExit
        };
        self.events.record(kind, Default::default());
    }

    fn on_visibility(&mut self, hidden: bool) {
        if hidden {
            self.events
                .record(EventType::VisibilityHidden, payload([("hidden", json!(true))]));
            return;
        }

        self.events
            .record(EventType::VisibilityVisible, payload([("hidden", json!(false))]));
        if self.policy.monitoring_enabled && self.session.is_live() {
            self.dispatcher.refresh(false);
        }
    }

    fn refresh_session(&mut self, now: Instant) {
        if self.dispatcher.is_sessionless() {
            self.show_toast(Toast::info(NO_SESSION_TOAST), now);
            return;
        }
        if self.session.is_terminal() {
            debug!("Session is over, not refreshing");
            return;
        }
        self.dispatcher.refresh(true);
    }

    fn show_progress(&mut self, now: Instant) {
        let current = self.state.current_time;
        let duration = self.state.duration;
        let percent = (current / duration.max(1.0) * 100.0).round();
        let text = format!(
            "At {} / {} (about {}%)",
            format_clock(current),
            format_clock(duration),
            percent
        );
        self.show_toast(Toast::info(text), now);
    }

    fn on_backend_error(&mut self, call: BackendCall, error: BackendError, now: Instant) {
        let fatal = match (call, error.liveness()) {
            // Event submission only knows about inactive sessions.
            (BackendCall::SubmitEvents { .. }, Some(FatalReason::SessionInactive)) => {
                Some(FatalReason::SessionInactive)
            }
            (BackendCall::SubmitEvents { .. }, _) => None,
            (_, reason) => reason,
        };

        if let Some(reason) = fatal {
            self.fail(reason, now);
            return;
        }

        if error.is_transient() {
            debug!("{:?} failed, retrying on the next tick: {}", call, error);
        } else {
            warn!("{:?} failed: {}", call, error);
        }
        if call == (BackendCall::Refresh { manual: true }) {
            self.show_toast(Toast::warn(REFRESH_FAILED_TOAST), now);
        }
    }

    fn stream_failure(&mut self, failure: StreamFailure, now: Instant) {
        match failure.fatal_reason() {
            Some(reason) => self.fail(reason, now),
            None => self.show_toast(Toast::warn(failure.warning_message()), now),
        }
    }

    /// Stops playback for good. The host hears about it once.
    fn fail(&mut self, reason: FatalReason, now: Instant) {
        if !self.session.fail(reason.clone()) {
            return;
        }

        self.show_toast(Toast::danger(reason.user_message()), now);
        // Fatal toasts stay until the host replaces the player.
        self.toast_expires = None;
        self.gestures.reset();
        self.pause();
        self.state.playing = false;
        self.sync_controls(now);

        if let Some(on_fatal) = self.callbacks.on_fatal.as_mut() {
            on_fatal(reason);
        }
    }

    fn flush_events(&mut self) {
        let batch = self.events.drain();
        if batch.is_empty() {
            return;
        }
        trace!("Flushing {} event(s)", batch.len());
        self.dispatcher.submit(batch);
    }

    fn flush_leave_progress(&mut self) {
        let duration = self.sink.duration().unwrap_or(self.state.duration);
        let Some(progress) = self
            .leave_progress
            .take(self.progress.max_watched(), duration)
        else {
            return;
        };

        debug!(
            "Leave progress: {:.1}s ({:.0}%), completed: {}",
            progress.last_position, progress.progress_percent, progress.completed
        );
        if let Some(on_leave_progress) = self.callbacks.on_leave_progress.as_mut() {
            on_leave_progress(progress);
        }
    }

    fn sync_controls(&mut self, now: Instant) {
        self.controls
            .set_playback(self.state.playing, self.state.buffering, now);
    }

    fn show_toast(&mut self, toast: Toast, now: Instant) {
        self.state.toast = Some(toast);
        self.toast_expires = Some(now + self.config.timing.toast_duration());
    }

    fn clear_toast(&mut self) {
        self.state.toast = None;
        self.toast_expires = None;
    }

    fn publish(&mut self) {
        if !self.guard.is_live() {
            return;
        }
        self.state.controls_visible = self.controls.is_visible();
        self.state_tx.send_replace(self.state.clone());
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Handle for communicating with the playback controller
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    sender: mpsc::UnboundedSender<PlayerCommand>,
    state: watch::Receiver<PlaybackState>,
    cancel: CancellationToken,
}

impl PlayerHandle {
    /// Send a raw command without waiting for it to be processed
    pub fn send(&self, command: PlayerCommand) -> Result<()> {
        self.sender
            .send(command)
            .map_err(|_| anyhow::anyhow!("Playback controller disconnected"))
    }

    /// Watch the playback state as the controller publishes it
    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.state.clone()
    }

    /// Latest published playback state
    pub fn current_state(&self) -> PlaybackState {
        self.state.borrow().clone()
    }

    /// Tear the controller down. Teardown runs once even if called repeatedly.
    pub fn unmount(&self) {
        self.cancel.cancel();
    }

    pub fn is_unmounted(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn sink_event(&self, event: SinkEvent) -> Result<()> {
        self.send(PlayerCommand::Sink(event))
    }

    pub fn pointer(&self, input: PointerInput) -> Result<()> {
        self.send(PlayerCommand::Pointer(input))
    }

    pub fn key(&self, key: Key, text_input_focused: bool) -> Result<()> {
        self.send(PlayerCommand::Key {
            key,
            text_input_focused,
        })
    }

    pub fn play(&self) -> Result<()> {
        self.send(PlayerCommand::Play)
    }

    pub fn pause(&self) -> Result<()> {
        self.send(PlayerCommand::Pause)
    }

    pub fn toggle_play(&self) -> Result<()> {
        self.send(PlayerCommand::TogglePlay)
    }

    pub fn seek(&self, position: f64) -> Result<()> {
        self.send(PlayerCommand::Seek { position })
    }

    pub fn skip(&self, delta: f64) -> Result<()> {
        self.send(PlayerCommand::Skip { delta })
    }

    pub fn set_rate(&self, rate: f64) -> Result<()> {
        self.send(PlayerCommand::SetRate { rate })
    }

    pub fn set_volume(&self, volume: f64) -> Result<()> {
        self.send(PlayerCommand::SetVolume { volume })
    }

    pub fn toggle_mute(&self) -> Result<()> {
        self.send(PlayerCommand::ToggleMute)
    }

    pub fn set_fullscreen(&self, fullscreen: bool) -> Result<()> {
        self.send(PlayerCommand::SetFullscreen { fullscreen })
    }

    pub fn visibility_changed(&self, hidden: bool) -> Result<()> {
        self.send(PlayerCommand::VisibilityChanged { hidden })
    }

    pub fn focus_changed(&self, focused: bool) -> Result<()> {
        self.send(PlayerCommand::FocusChanged { focused })
    }

    pub fn page_hide(&self) -> Result<()> {
        self.send(PlayerCommand::PageHide)
    }

    pub fn resize_stage(&self, stage: StageRect) -> Result<()> {
        self.send(PlayerCommand::StageResized(stage))
    }

    pub fn refresh_session(&self) -> Result<()> {
        self.send(PlayerCommand::RefreshSession)
    }

    pub fn show_progress(&self) -> Result<()> {
        self.send(PlayerCommand::ShowProgress)
    }

    pub fn set_token(&self, token: SessionToken) -> Result<()> {
        self.send(PlayerCommand::SetToken(token))
    }

    pub fn reattach(&self, play_url: impl Into<String>) -> Result<()> {
        self.send(PlayerCommand::Reattach {
            play_url: play_url.into(),
        })
    }

    pub fn dismiss_toast(&self) -> Result<()> {
        self.send(PlayerCommand::DismissToast)
    }

    /// Get a snapshot of the controller once every earlier command has been applied
    pub async fn snapshot(&self) -> Result<ControllerSnapshot> {
        let (respond_to, response) = oneshot::channel();
        self.send(PlayerCommand::Snapshot { respond_to })?;
        response
            .await
            .map_err(|_| anyhow::anyhow!("Failed to receive response from playback controller"))
    }

    /// Get the render surface for the current state
    pub async fn surface(&self) -> Result<SurfaceModel> {
        let (respond_to, response) = oneshot::channel();
        self.send(PlayerCommand::Surface { respond_to })?;
        response
            .await
            .map_err(|_| anyhow::anyhow!("Failed to receive response from playback controller"))
    }
}
