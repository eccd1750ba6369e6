//! The script player: Intent → coordinate → typing + narration orchestration.
//!
//! Wires together the script table, typing engine, audio window
//! controller and the cursor blink on one cooperative timer queue.

use serde::Serialize;
use std::path::Path;
use thiserror::Error;

use crate::core::audio::{
    ArmOutcome, AudioWindowController, KeystrokeSound, NarrationTrack, Observation,
};
use crate::core::config::{ConfigError, PlayerConfig};
use crate::core::facts::FactDeck;
use crate::core::navigation::{self, Target};
use crate::core::scheduler::{Clock, Scheduler};
use crate::core::typing::{Phase, TickOutcome, TypingEngine};
use crate::schema::coordinate::Coordinate;
use crate::schema::script::{ScriptError, ScriptTable};
use crate::schema::slide::{AudioWindow, CallToAction, LinkRef, MediaRef, Slide};

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("script error: {0}")]
    Script(#[from] ScriptError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("no script provided")]
    NoScript,
    #[error("section {0} is not in the script")]
    UnknownSection(u32),
    #[error("no slide at {0}")]
    MissingSlide(Coordinate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Task {
    Reveal,
    AutoAdvance,
    Bridge,
    AudioPoll,
    CursorBlink,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlayerState {
    PreStart,
    AtSlide(Coordinate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    WindowEnd,
    Disarmed,
}

/// Something the rendering surface may want to react to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PresentationEvent {
    Began {
        at: Coordinate,
    },
    CoordinateChanged {
        from: Option<Coordinate>,
        to: Coordinate,
    },
    Revealed {
        at: Coordinate,
        revealed: usize,
    },
    TypingComplete {
        at: Coordinate,
        show_link: bool,
        show_media: bool,
        show_cta: bool,
    },
    AudioStarted {
        at: Coordinate,
        start_sec: f64,
    },
    AudioStopped {
        at: Coordinate,
        reason: StopReason,
    },
    AudioRejected {
        at: Coordinate,
        reason: String,
    },
    EndOfScript {
        at: Coordinate,
    },
}

/// What an intent did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Moved {
        from: Option<Coordinate>,
        to: Coordinate,
    },
    /// Typing was completed in place.
    Skipped,
    NoOp,
}

/// Keys the surface forwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Right,
    Left,
    Backspace,
    Other,
}

/// Mutable per-session playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlaybackState {
    pub coordinate: Option<Coordinate>,
    pub revealed_len: usize,
    pub phase: Phase,
    pub audio_playing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub section: u32,
    pub total_sections: u32,
}

/// Everything the surface needs to draw the current frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlideView {
    pub coordinate: Option<Coordinate>,
    pub section_title: Option<String>,
    pub text: String,
    pub revealed: usize,
    pub total: usize,
    pub phase: Phase,
    pub cursor_visible: bool,
    pub media: Option<MediaRef>,
    pub media_visible: bool,
    pub link: Option<LinkRef>,
    pub cta: Option<CallToAction>,
    pub fact: Option<String>,
    pub audio_playing: bool,
    pub back_disabled: bool,
    pub forward_disabled: bool,
    pub progress: Progress,
}

/// A running walkthrough. Built via `Presentation::builder()`.
pub struct Presentation {
    script: ScriptTable,
    config: PlayerConfig,
    scheduler: Scheduler<Task>,
    typing: TypingEngine,
    audio: AudioWindowController,
    keystroke: Option<Box<dyn KeystrokeSound>>,
    facts: FactDeck,
    state: PlayerState,
    cursor_visible: bool,
    shown_fact: Option<String>,
    events: Vec<PresentationEvent>,
}

/// Builder for constructing a `Presentation`.
pub struct PresentationBuilder {
    script_path: Option<String>,
    config_path: Option<String>,
    /// Directly provided script (for testing without files).
    script: Option<ScriptTable>,
    /// Directly provided config (for testing without files).
    config: Option<PlayerConfig>,
    clock: Option<Clock>,
    narration: Option<Box<dyn NarrationTrack>>,
    keystroke: Option<Box<dyn KeystrokeSound>>,
}

impl Presentation {
    pub fn builder() -> PresentationBuilder {
        PresentationBuilder {
            script_path: None,
            config_path: None,
            script: None,
            config: None,
            clock: None,
            narration: None,
            keystroke: None,
        }
    }

    // ------------------------------------------------------------------
    // Intents
    // ------------------------------------------------------------------

    /// Leave the pre-start gate. A no-op once playing.
    pub fn begin(&mut self) -> Result<Outcome, PlayerError> {
        if self.state != PlayerState::PreStart {
            return Ok(Outcome::NoOp);
        }
        let first = self.script.first_coordinate();
        let outcome = self.goto(first)?;
        log::info!("walkthrough started at {}", first);
        self.events.push(PresentationEvent::Began { at: first });
        Ok(outcome)
    }

    /// Finish typing if in progress, otherwise move forward.
    pub fn advance(&mut self) -> Result<Outcome, PlayerError> {
        let Some(at) = self.current() else {
            log::debug!("advance ignored before begin");
            return Ok(Outcome::NoOp);
        };
        if self.typing.phase() == Phase::Typing {
            return self.skip_to_end();
        }
        let slide = self.slide_at(at)?;
        match navigation::next_target(&self.script, &slide) {
            Target::Goto(to) => self.goto(to),
            Target::End => {
                log::debug!("advance at {} ignored: end of script", at);
                Ok(Outcome::NoOp)
            }
        }
    }

    /// Step back one slide; a no-op at the first coordinate.
    pub fn retreat(&mut self) -> Result<Outcome, PlayerError> {
        let Some(at) = self.current() else {
            return Ok(Outcome::NoOp);
        };
        match navigation::previous(&self.script, at) {
            Some(to) => self.goto(to),
            None => {
                log::debug!("retreat at {} ignored: already at the beginning", at);
                Ok(Outcome::NoOp)
            }
        }
    }

    /// Go straight to the first step of section `n`, whatever is happening.
    pub fn jump_to_section(&mut self, n: u32) -> Result<Outcome, PlayerError> {
        let Some(to) = navigation::section_start(&self.script, n) else {
            log::error!("jump to undeclared section {}", n);
            return Err(PlayerError::UnknownSection(n));
        };
        let was_pre_start = self.state == PlayerState::PreStart;
        let outcome = self.goto(to)?;
        if was_pre_start {
            self.events.push(PresentationEvent::Began { at: to });
        }
        Ok(outcome)
    }

    /// Reveal the rest of the current text at once.
    pub fn skip_to_end(&mut self) -> Result<Outcome, PlayerError> {
        let Some(at) = self.current() else {
            return Ok(Outcome::NoOp);
        };
        if !self.typing.skip_to_end() {
            return Ok(Outcome::NoOp);
        }
        self.scheduler.cancel_where(|t| *t == Task::Reveal);
        let slide = self.slide_at(at)?;
        log::debug!("skipped typing at {}", at);
        self.finish_typing(&slide, false);
        Ok(Outcome::Skipped)
    }

    /// Click or tap anywhere on the page.
    pub fn click(&mut self) -> Result<Outcome, PlayerError> {
        self.advance()
    }

    pub fn key(&mut self, key: Key) -> Result<Outcome, PlayerError> {
        match key {
            Key::Right => self.advance(),
            Key::Left | Key::Backspace => self.retreat(),
            Key::Other => Ok(Outcome::NoOp),
        }
    }

    /// Draw the next fact, available once a fact-offering CTA is showing.
    pub fn next_fact(&mut self) -> Option<String> {
        let slide = self.current_slide()?;
        let offers = slide.cta.as_ref().is_some_and(|cta| cta.offers_facts);
        if !offers || self.typing.phase() != Phase::Complete {
            return None;
        }
        let fact = self.facts.draw()?.to_string();
        self.shown_fact = Some(fact.clone());
        Some(fact)
    }

    // ------------------------------------------------------------------
    // Audio controls
    // ------------------------------------------------------------------

    pub fn set_volume(&mut self, volume: f32) {
        self.audio.set_volume(volume);
    }

    pub fn set_playback_rate(&mut self, rate: f32) {
        self.audio.set_playback_rate(rate);
    }

    pub fn set_audio_paused(&mut self, paused: bool) {
        let outcome = self.audio.set_paused(paused);
        if paused {
            self.scheduler.cancel_where(|t| *t == Task::AudioPoll);
            return;
        }
        match (outcome, self.current()) {
            (Some(ArmOutcome::Playing), Some(_)) => self.schedule_audio_poll(),
            (Some(ArmOutcome::Rejected(err)), Some(at)) => {
                self.events.push(PresentationEvent::AudioRejected {
                    at,
                    reason: err.to_string(),
                });
            }
            _ => {}
        }
    }

    /// A narration position pushed by the host.
    pub fn observe_audio_position(&mut self, position_sec: f64) {
        if self.audio.observe(position_sec) == Observation::Stopped {
            self.scheduler.cancel_where(|t| *t == Task::AudioPoll);
            self.push_window_end();
        }
    }

    /// The host's narration refused to start after the fact.
    pub fn report_playback_rejected(&mut self) {
        self.audio.playback_rejected();
        self.scheduler.cancel_where(|t| *t == Task::AudioPoll);
        if let Some(at) = self.current() {
            self.events.push(PresentationEvent::AudioRejected {
                at,
                reason: "rejected by host".to_string(),
            });
        }
    }

    // ------------------------------------------------------------------
    // Time
    // ------------------------------------------------------------------

    /// Let `ms` milliseconds pass, firing every timer that comes due.
    pub fn advance_time(&mut self, ms: u64) -> Result<(), PlayerError> {
        let until = self.scheduler.now_ms().saturating_add(ms);
        self.run_until(until)
    }

    /// Fire every timer due at or before `now_ms`, in order.
    pub fn run_until(&mut self, now_ms: u64) -> Result<(), PlayerError> {
        while let Some(fired) = self.scheduler.pop_due(now_ms) {
            self.dispatch(fired.task)?;
        }
        self.scheduler.clock().advance_to(now_ms);
        Ok(())
    }

    /// When the next timer is due, if any.
    pub fn next_deadline(&self) -> Option<u64> {
        self.scheduler.next_due()
    }

    pub fn now_ms(&self) -> u64 {
        self.scheduler.now_ms()
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn current(&self) -> Option<Coordinate> {
        match self.state {
            PlayerState::PreStart => None,
            PlayerState::AtSlide(at) => Some(at),
        }
    }

    pub fn current_slide(&self) -> Option<&Slide> {
        self.current().and_then(|at| self.script.lookup(at))
    }

    pub fn playback_state(&self) -> PlaybackState {
        PlaybackState {
            coordinate: self.current(),
            revealed_len: self.typing.revealed(),
            phase: self.typing.phase(),
            audio_playing: self.audio.is_playing(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.typing.phase()
    }

    pub fn revealed(&self) -> usize {
        self.typing.revealed()
    }

    pub fn visible_text(&self) -> &str {
        self.typing.visible_text()
    }

    pub fn cursor_visible(&self) -> bool {
        self.cursor_visible
    }

    pub fn is_audio_playing(&self) -> bool {
        self.audio.is_playing()
    }

    pub fn armed_window(&self) -> Option<AudioWindow> {
        self.audio.window()
    }

    /// Pending timers other than the cursor blink.
    pub fn pending_timers(&self) -> usize {
        self.scheduler.pending_where(|t| *t != Task::CursorBlink)
    }

    pub fn pending_reveal_ticks(&self) -> usize {
        self.scheduler.pending_where(|t| *t == Task::Reveal)
    }

    pub fn back_disabled(&self) -> bool {
        match self.current() {
            None => true,
            Some(at) => navigation::previous(&self.script, at).is_none(),
        }
    }

    pub fn forward_disabled(&self) -> bool {
        match self.current_slide() {
            None => true,
            Some(slide) => navigation::next_target(&self.script, slide) == Target::End,
        }
    }

    pub fn view(&self) -> SlideView {
        let slide = self.current_slide();
        let complete = self.typing.phase() == Phase::Complete;
        let section = self.current().map_or(0, |at| at.section);
        SlideView {
            coordinate: self.current(),
            section_title: self
                .script
                .section(section)
                .map(|s| s.title.clone())
                .filter(|t| !t.is_empty()),
            text: self.typing.visible_text().to_string(),
            revealed: self.typing.revealed(),
            total: self.typing.total(),
            phase: self.typing.phase(),
            cursor_visible: self.cursor_visible,
            media: slide.and_then(|s| s.media.clone()),
            media_visible: complete && slide.is_some_and(|s| s.shows_media()),
            link: slide.and_then(|s| s.link.clone()).filter(|_| complete),
            cta: slide.and_then(|s| s.cta.clone()).filter(|_| complete),
            fact: self.shown_fact.clone(),
            audio_playing: self.audio.is_playing(),
            back_disabled: self.back_disabled(),
            forward_disabled: self.forward_disabled(),
            progress: Progress {
                section,
                total_sections: self.script.last_section(),
            },
        }
    }

    /// Take every event recorded since the last call.
    ///
    /// Events accumulate until drained, one `Revealed` per character, so a
    /// host driving the player should drain after each step.
    pub fn drain_events(&mut self) -> Vec<PresentationEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn script(&self) -> &ScriptTable {
        &self.script
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn slide_at(&self, at: Coordinate) -> Result<Slide, PlayerError> {
        self.script.lookup(at).cloned().ok_or_else(|| {
            log::error!("no slide at {}", at);
            PlayerError::MissingSlide(at)
        })
    }

    fn speed_factor(&self, section: u32) -> f64 {
        self.script
            .section(section)
            .and_then(|s| s.speed_factor)
            .unwrap_or(self.config.default_speed_factor)
    }

    /// Tear down the current coordinate and start `to`. The lookup happens
    /// first so a bad target leaves the current slide untouched.
    fn goto(&mut self, to: Coordinate) -> Result<Outcome, PlayerError> {
        let slide = self.slide_at(to)?;
        let from = self.current();

        self.typing.cancel();
        self.scheduler.cancel_where(|t| *t == Task::Reveal);

        if self.audio.disarm() {
            if let Some(at) = from {
                self.events.push(PresentationEvent::AudioStopped {
                    at,
                    reason: StopReason::Disarmed,
                });
            }
        }

        let generation = self.scheduler.bump_generation();
        self.shown_fact = None;
        self.state = PlayerState::AtSlide(to);
        log::debug!(
            "coordinate {} -> {} (generation {})",
            from.map_or_else(|| "pre-start".to_string(), |c| c.to_string()),
            to,
            generation
        );
        self.events
            .push(PresentationEvent::CoordinateChanged { from, to });

        self.start_slide(&slide);
        Ok(Outcome::Moved { from, to })
    }

    fn start_slide(&mut self, slide: &Slide) {
        let interval = self
            .config
            .tick_interval_ms(slide.typing_interval_ms, self.speed_factor(slide.section));
        let pause_ms = slide.pause_ms.unwrap_or(self.config.default_pause_ms);

        match self.typing.start(slide, interval, pause_ms) {
            Some(delay) => {
                self.scheduler.schedule(delay, Task::Reveal);
            }
            None => self.finish_typing(slide, true),
        }

        if slide.is_bridge() {
            self.scheduler
                .schedule(self.config.bridge_delay_ms, Task::Bridge);
        }

        if let Some(window) = slide.audio_window {
            self.arm_audio(slide.coordinate(), window);
        }
    }

    /// Typing reached the end, naturally or by skipping.
    fn finish_typing(&mut self, slide: &Slide, natural: bool) {
        let at = slide.coordinate();
        self.events.push(PresentationEvent::TypingComplete {
            at,
            show_link: slide.link.is_some(),
            show_media: slide.shows_media(),
            show_cta: slide.cta.is_some(),
        });

        if natural
            && !slide.is_bridge()
            && slide.post_complete_delay_ms > 0
            && navigation::auto_target(slide).is_some()
        {
            self.scheduler
                .schedule(slide.post_complete_delay_ms, Task::AutoAdvance);
        }

        if navigation::next_target(&self.script, slide) == Target::End {
            log::info!("end of script reached at {}", at);
            self.events.push(PresentationEvent::EndOfScript { at });
        }
    }

    fn arm_audio(&mut self, at: Coordinate, window: AudioWindow) {
        match self.audio.arm(window) {
            ArmOutcome::Playing => {
                self.events.push(PresentationEvent::AudioStarted {
                    at,
                    start_sec: window.start_sec,
                });
                self.schedule_audio_poll();
            }
            ArmOutcome::Rejected(err) => {
                self.events.push(PresentationEvent::AudioRejected {
                    at,
                    reason: err.to_string(),
                });
            }
            ArmOutcome::Paused | ArmOutcome::NoTrack => {}
        }
    }

    fn schedule_audio_poll(&mut self) {
        if let Some(period) = self.config.audio_poll_ms {
            if self.scheduler.pending_where(|t| *t == Task::AudioPoll) == 0 {
                self.scheduler.schedule(period, Task::AudioPoll);
            }
        }
    }

    fn push_window_end(&mut self) {
        if let Some(at) = self.current() {
            log::debug!("narration window ended at {}", at);
            self.events.push(PresentationEvent::AudioStopped {
                at,
                reason: StopReason::WindowEnd,
            });
        }
    }

    fn play_keystroke(&mut self) {
        let volume = self.config.keystroke_volume;
        if let Some(keystroke) = self.keystroke.as_mut() {
            if let Err(err) = keystroke.play_keystroke(volume) {
                log::debug!("keystroke sound skipped: {}", err);
            }
        }
    }

    fn dispatch(&mut self, task: Task) -> Result<(), PlayerError> {
        match task {
            Task::Reveal => {
                let Some(at) = self.current() else {
                    return Ok(());
                };
                match self.typing.tick() {
                    TickOutcome::Continue {
                        revealed,
                        next_delay_ms,
                    } => {
                        log::trace!("revealed {} chars at {}", revealed, at);
                        self.events
                            .push(PresentationEvent::Revealed { at, revealed });
                        self.play_keystroke();
                        self.scheduler.schedule(next_delay_ms, Task::Reveal);
                    }
                    TickOutcome::Finished { revealed } => {
                        self.events
                            .push(PresentationEvent::Revealed { at, revealed });
                        self.play_keystroke();
                        let slide = self.slide_at(at)?;
                        self.finish_typing(&slide, true);
                    }
                    TickOutcome::Idle => {}
                }
            }
            Task::AutoAdvance => {
                if let Some(at) = self.current() {
                    let slide = self.slide_at(at)?;
                    if let Some(to) = navigation::auto_target(&slide) {
                        self.goto(to)?;
                    }
                }
            }
            Task::Bridge => {
                if let Some(at) = self.current() {
                    let slide = self.slide_at(at)?;
                    if let Target::Goto(to) = navigation::next_target(&self.script, &slide) {
                        self.goto(to)?;
                    }
                }
            }
            Task::AudioPoll => match self.audio.poll() {
                Observation::Continue => self.schedule_audio_poll(),
                Observation::Stopped => self.push_window_end(),
                Observation::NotArmed => {}
            },
            Task::CursorBlink => {
                self.cursor_visible = !self.cursor_visible;
                self.scheduler
                    .schedule_persistent(self.config.cursor_blink_ms, Task::CursorBlink);
            }
        }
        Ok(())
    }
}

impl PresentationBuilder {
    pub fn script_path(mut self, path: &str) -> Self {
        self.script_path = Some(path.to_string());
        self
    }

    pub fn config_path(mut self, path: &str) -> Self {
        self.config_path = Some(path.to_string());
        self
    }

    /// Provide the script directly (for testing without files).
    pub fn with_script(mut self, script: ScriptTable) -> Self {
        self.script = Some(script);
        self
    }

    /// Provide the config directly (for testing without files).
    pub fn with_config(mut self, config: PlayerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Share a clock with simulated audio devices.
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn narration(mut self, track: impl NarrationTrack + 'static) -> Self {
        self.narration = Some(Box::new(track));
        self
    }

    pub fn keystroke(mut self, sound: impl KeystrokeSound + 'static) -> Self {
        self.keystroke = Some(Box::new(sound));
        self
    }

    pub fn build(self) -> Result<Presentation, PlayerError> {
        let script = match (self.script, self.script_path) {
            (Some(script), _) => script,
            (None, Some(path)) => ScriptTable::load_from_ron(Path::new(&path))?,
            (None, None) => return Err(PlayerError::NoScript),
        };

        let config = match (self.config, self.config_path) {
            (Some(config), _) => {
                config.validate()?;
                config
            }
            (None, Some(path)) => PlayerConfig::load_from_ron(Path::new(&path))?,
            (None, None) => PlayerConfig::default(),
        };

        let facts = match config.fact_seed {
            Some(seed) => FactDeck::shuffled(script.facts().to_vec(), seed),
            None => FactDeck::new(script.facts().to_vec()),
        };

        let audio = AudioWindowController::new(
            self.narration,
            config.narration_volume,
            config.playback_rate,
            config.audio_paused,
        );

        let mut scheduler = Scheduler::new(self.clock.unwrap_or_default());
        scheduler.schedule_persistent(config.cursor_blink_ms, Task::CursorBlink);

        let entry_gate = config.entry_gate;
        let mut presentation = Presentation {
            script,
            config,
            scheduler,
            typing: TypingEngine::new(),
            audio,
            keystroke: self.keystroke,
            facts,
            state: PlayerState::PreStart,
            cursor_visible: true,
            shown_fact: None,
            events: Vec::new(),
        };

        if !entry_gate {
            presentation.begin()?;
        }
        Ok(presentation)
    }
}
