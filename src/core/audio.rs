//! Narration and keystroke audio.
//!
//! The `AudioWindowController` is the only code that touches the shared
//! narration track: it seeks to a slide's window start, plays, watches
//! the position and stops once the window end is reached. Playback
//! failures are absorbed here and never reach the navigation logic.

use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

use super::scheduler::Clock;
use crate::schema::slide::AudioWindow;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlaybackError {
    #[error("playback rejected: {0}")]
    Rejected(String),
    #[error("audio resource unavailable")]
    MissingResource,
}

/// A single narration track addressed by position in seconds.
pub trait NarrationTrack {
    fn seek(&mut self, position_sec: f64);
    fn play(&mut self) -> Result<(), PlaybackError>;
    fn pause(&mut self);
    fn position_sec(&self) -> f64;
    fn set_volume(&mut self, volume: f32);
    fn set_playback_rate(&mut self, rate: f32);
}

/// Fire-and-forget clip played once per revealed character. Overlapping
/// instances are allowed.
pub trait KeystrokeSound {
    fn play_keystroke(&mut self, volume: f32) -> Result<(), PlaybackError>;
}

/// Result of arming a window.
#[derive(Debug, Clone, PartialEq)]
pub enum ArmOutcome {
    Playing,
    /// Seeked, but audio is globally paused.
    Paused,
    Rejected(PlaybackError),
    NoTrack,
}

/// Result of one position observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    Continue,
    /// The window end was reached and playback stopped.
    Stopped,
    NotArmed,
}

pub struct AudioWindowController {
    track: Option<Box<dyn NarrationTrack>>,
    window: Option<AudioWindow>,
    playing: bool,
    volume: f32,
    rate: f32,
    paused: bool,
}

impl std::fmt::Debug for AudioWindowController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioWindowController")
            .field("has_track", &self.track.is_some())
            .field("window", &self.window)
            .field("playing", &self.playing)
            .field("volume", &self.volume)
            .field("rate", &self.rate)
            .field("paused", &self.paused)
            .finish()
    }
}

impl AudioWindowController {
    pub fn new(track: Option<Box<dyn NarrationTrack>>, volume: f32, rate: f32, paused: bool) -> Self {
        Self {
            track,
            window: None,
            playing: false,
            volume,
            rate,
            paused,
        }
    }

    /// Seek to the window start and play, unless globally paused.
    pub fn arm(&mut self, window: AudioWindow) -> ArmOutcome {
        if self.window.is_some() {
            self.disarm();
        }
        let Some(track) = self.track.as_mut() else {
            return ArmOutcome::NoTrack;
        };
        self.window = Some(window);
        track.set_volume(self.volume);
        track.set_playback_rate(self.rate);
        track.seek(window.start_sec);

        if self.paused {
            return ArmOutcome::Paused;
        }
        match track.play() {
            Ok(()) => {
                self.playing = true;
                ArmOutcome::Playing
            }
            Err(err) => {
                log::warn!("narration did not start at {}s: {}", window.start_sec, err);
                self.playing = false;
                ArmOutcome::Rejected(err)
            }
        }
    }

    /// Check a reported position against the armed window end.
    pub fn observe(&mut self, position_sec: f64) -> Observation {
        let Some(window) = self.window else {
            return Observation::NotArmed;
        };
        if !position_sec.is_finite() {
            log::warn!("ignoring narration position {}", position_sec);
            return Observation::Continue;
        }
        log::trace!("narration at {:.2}s (window ends {:.2}s)", position_sec, window.end_sec);
        if position_sec < window.end_sec {
            return Observation::Continue;
        }
        if let Some(track) = self.track.as_mut() {
            track.pause();
        }
        self.playing = false;
        self.window = None;
        Observation::Stopped
    }

    /// Read the track position and observe it.
    pub fn poll(&mut self) -> Observation {
        if self.window.is_none() {
            return Observation::NotArmed;
        }
        match self.track.as_ref().map(|t| t.position_sec()) {
            Some(position) => self.observe(position),
            None => Observation::NotArmed,
        }
    }

    /// Stop playback and stop watching, wherever the track is.
    /// Returns whether a window was armed.
    pub fn disarm(&mut self) -> bool {
        let was_armed = self.window.take().is_some();
        if was_armed || self.playing {
            if let Some(track) = self.track.as_mut() {
                track.pause();
            }
        }
        self.playing = false;
        was_armed
    }

    /// The host learned asynchronously that playback failed to start.
    pub fn playback_rejected(&mut self) {
        if self.playing {
            log::warn!("narration playback rejected by host");
        }
        self.playing = false;
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        if let Some(track) = self.track.as_mut() {
            track.set_volume(self.volume);
        }
    }

    pub fn set_playback_rate(&mut self, rate: f32) {
        if !rate.is_finite() || rate <= 0.0 {
            log::warn!("ignoring playback rate {}", rate);
            return;
        }
        self.rate = rate;
        if let Some(track) = self.track.as_mut() {
            track.set_playback_rate(rate);
        }
    }

    /// Globally pause or resume narration. Resuming restarts playback only
    /// while a window is still armed.
    pub fn set_paused(&mut self, paused: bool) -> Option<ArmOutcome> {
        self.paused = paused;
        let track = self.track.as_mut()?;
        if paused {
            if self.playing {
                track.pause();
                self.playing = false;
            }
            return None;
        }
        if self.window.is_none() || self.playing {
            return None;
        }
        match track.play() {
            Ok(()) => {
                self.playing = true;
                Some(ArmOutcome::Playing)
            }
            Err(err) => {
                log::warn!("narration did not resume: {}", err);
                Some(ArmOutcome::Rejected(err))
            }
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_armed(&self) -> bool {
        self.window.is_some()
    }

    pub fn window(&self) -> Option<AudioWindow> {
        self.window
    }
}

impl Drop for AudioWindowController {
    fn drop(&mut self) {
        self.disarm();
    }
}

/// A call made on a `SimulatedTrack`, kept for inspection.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackCall {
    Seek(f64),
    Play,
    Pause,
    Volume(f32),
    Rate(f32),
}

#[derive(Debug)]
struct SimulatedState {
    clock: Clock,
    base_sec: f64,
    started_at_ms: Option<u64>,
    rate: f32,
    volume: f32,
    rejection: Option<PlaybackError>,
    calls: Vec<TrackCall>,
}

impl SimulatedState {
    fn position(&self) -> f64 {
        match self.started_at_ms {
            Some(start) => {
                let elapsed_ms = self.clock.now_ms().saturating_sub(start);
                self.base_sec + elapsed_ms as f64 / 1000.0 * self.rate as f64
            }
            None => self.base_sec,
        }
    }

    fn rebase(&mut self) {
        if self.started_at_ms.is_some() {
            self.base_sec = self.position();
            self.started_at_ms = Some(self.clock.now_ms());
        }
    }
}

/// A narration track driven by the virtual clock. Clones share state, so
/// one handle can be given to the player while another is inspected.
#[derive(Debug, Clone)]
pub struct SimulatedTrack {
    state: Rc<RefCell<SimulatedState>>,
}

impl SimulatedTrack {
    pub fn new(clock: Clock) -> Self {
        Self {
            state: Rc::new(RefCell::new(SimulatedState {
                clock,
                base_sec: 0.0,
                started_at_ms: None,
                rate: 1.0,
                volume: 1.0,
                rejection: None,
                calls: Vec::new(),
            })),
        }
    }

    /// Make every subsequent `play` fail with `error`.
    pub fn reject_with(&self, error: PlaybackError) {
        self.state.borrow_mut().rejection = Some(error);
    }

    pub fn is_playing(&self) -> bool {
        self.state.borrow().started_at_ms.is_some()
    }

    pub fn volume(&self) -> f32 {
        self.state.borrow().volume
    }

    pub fn rate(&self) -> f32 {
        self.state.borrow().rate
    }

    pub fn calls(&self) -> Vec<TrackCall> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }
}

impl NarrationTrack for SimulatedTrack {
    fn seek(&mut self, position_sec: f64) {
        let mut state = self.state.borrow_mut();
        state.calls.push(TrackCall::Seek(position_sec));
        state.base_sec = position_sec;
        if state.started_at_ms.is_some() {
            state.started_at_ms = Some(state.clock.now_ms());
        }
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(TrackCall::Play);
        if let Some(err) = state.rejection.clone() {
            return Err(err);
        }
        if state.started_at_ms.is_none() {
            state.started_at_ms = Some(state.clock.now_ms());
        }
        Ok(())
    }

    fn pause(&mut self) {
        let mut state = self.state.borrow_mut();
        state.calls.push(TrackCall::Pause);
        state.base_sec = state.position();
        state.started_at_ms = None;
    }

    fn position_sec(&self) -> f64 {
        self.state.borrow().position()
    }

    fn set_volume(&mut self, volume: f32) {
        let mut state = self.state.borrow_mut();
        state.calls.push(TrackCall::Volume(volume));
        state.volume = volume;
    }

    fn set_playback_rate(&mut self, rate: f32) {
        let mut state = self.state.borrow_mut();
        state.calls.push(TrackCall::Rate(rate));
        state.rebase();
        state.rate = rate;
    }
}

/// Counts keystroke clips instead of playing them.
#[derive(Debug, Clone, Default)]
pub struct KeystrokeCounter {
    plays: Rc<RefCell<Vec<f32>>>,
    rejection: Rc<RefCell<Option<PlaybackError>>>,
}

impl KeystrokeCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.plays.borrow().len()
    }

    pub fn last_volume(&self) -> Option<f32> {
        self.plays.borrow().last().copied()
    }

    pub fn reject_with(&self, error: PlaybackError) {
        *self.rejection.borrow_mut() = Some(error);
    }
}

impl KeystrokeSound for KeystrokeCounter {
    fn play_keystroke(&mut self, volume: f32) -> Result<(), PlaybackError> {
        if let Some(err) = self.rejection.borrow().clone() {
            return Err(err);
        }
        self.plays.borrow_mut().push(volume);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(start_sec: f64, end_sec: f64) -> AudioWindow {
        AudioWindow { start_sec, end_sec }
    }

    fn controller_with(track: &SimulatedTrack) -> AudioWindowController {
        AudioWindowController::new(Some(Box::new(track.clone())), 0.8, 1.0, false)
    }

    #[test]
    fn arm_seeks_and_plays() {
        let clock = Clock::new();
        let track = SimulatedTrack::new(clock.clone());
        let mut ctl = controller_with(&track);

        assert_eq!(ctl.arm(window(6.0, 8.5)), ArmOutcome::Playing);
        assert!(ctl.is_playing());
        assert!(track.is_playing());
        assert_eq!(track.position_sec(), 6.0);
        assert_eq!(track.volume(), 0.8);
        assert!(track.calls().contains(&TrackCall::Seek(6.0)));
    }

    #[test]
    fn stops_once_at_window_end() {
        let clock = Clock::new();
        let track = SimulatedTrack::new(clock.clone());
        let mut ctl = controller_with(&track);
        ctl.arm(window(6.0, 8.5));

        clock.advance_to(2_000);
        assert_eq!(ctl.poll(), Observation::Continue);
        clock.advance_to(2_500);
        assert_eq!(ctl.poll(), Observation::Stopped);
        assert!(!ctl.is_playing());
        assert!(!track.is_playing());
        assert_eq!(ctl.poll(), Observation::NotArmed);
        assert_eq!(ctl.observe(9.0), Observation::NotArmed);

        let pauses = track.calls().iter().filter(|c| **c == TrackCall::Pause).count();
        assert_eq!(pauses, 1);
    }

    #[test]
    fn disarm_stops_regardless_of_position() {
        let clock = Clock::new();
        let track = SimulatedTrack::new(clock.clone());
        let mut ctl = controller_with(&track);
        ctl.arm(window(20.0, 24.0));
        clock.advance_to(500);

        assert!(ctl.disarm());
        assert!(!track.is_playing());
        assert!(!ctl.disarm());
    }

    #[test]
    fn rejection_is_absorbed() {
        let track = SimulatedTrack::new(Clock::new());
        track.reject_with(PlaybackError::Rejected("no user gesture".into()));
        let mut ctl = controller_with(&track);

        let outcome = ctl.arm(window(0.0, 3.0));
        assert!(matches!(outcome, ArmOutcome::Rejected(_)));
        assert!(!ctl.is_playing());
        assert!(ctl.is_armed());
    }

    #[test]
    fn no_track_means_no_audio() {
        let mut ctl = AudioWindowController::new(None, 1.0, 1.0, false);
        assert_eq!(ctl.arm(window(0.0, 1.0)), ArmOutcome::NoTrack);
        assert!(!ctl.is_armed());
        assert_eq!(ctl.poll(), Observation::NotArmed);
    }

    #[test]
    fn global_pause_seeks_without_playing() {
        let track = SimulatedTrack::new(Clock::new());
        let mut ctl = AudioWindowController::new(Some(Box::new(track.clone())), 1.0, 1.0, true);

        assert_eq!(ctl.arm(window(6.0, 8.5)), ArmOutcome::Paused);
        assert!(!track.is_playing());
        assert_eq!(track.position_sec(), 6.0);

        assert_eq!(ctl.set_paused(false), Some(ArmOutcome::Playing));
        assert!(track.is_playing());
        assert_eq!(ctl.set_paused(true), None);
        assert!(!track.is_playing());
    }

    #[test]
    fn rate_changes_do_not_move_the_window() {
        let clock = Clock::new();
        let track = SimulatedTrack::new(clock.clone());
        let mut ctl = controller_with(&track);
        ctl.arm(window(6.0, 8.5));

        ctl.set_playback_rate(2.0);
        assert_eq!(ctl.window(), Some(window(6.0, 8.5)));
        clock.advance_to(1_250);
        assert_eq!(ctl.poll(), Observation::Stopped);

        ctl.set_playback_rate(0.0);
        assert_eq!(track.rate(), 2.0);
    }

    #[test]
    fn non_finite_positions_are_ignored() {
        let track = SimulatedTrack::new(Clock::new());
        let mut ctl = controller_with(&track);
        ctl.arm(window(6.0, 8.5));

        assert_eq!(ctl.observe(f64::NAN), Observation::Continue);
        assert_eq!(ctl.observe(f64::INFINITY), Observation::Continue);
        assert!(ctl.is_armed());
        assert!(track.is_playing());

        assert_eq!(ctl.observe(8.5), Observation::Stopped);
    }

    #[test]
    fn rearm_disarms_previous_window() {
        let track = SimulatedTrack::new(Clock::new());
        let mut ctl = controller_with(&track);
        ctl.arm(window(6.0, 8.5));
        track.clear_calls();

        ctl.arm(window(20.0, 24.0));
        let calls = track.calls();
        assert_eq!(calls.first(), Some(&TrackCall::Pause));
        assert!(calls.contains(&TrackCall::Seek(20.0)));
        assert_eq!(ctl.window(), Some(window(20.0, 24.0)));
    }

    #[test]
    fn drop_disarms() {
        let track = SimulatedTrack::new(Clock::new());
        {
            let mut ctl = controller_with(&track);
            ctl.arm(window(0.0, 10.0));
            assert!(track.is_playing());
        }
        assert!(!track.is_playing());
    }

    #[test]
    fn keystroke_counter_records_volume() {
        let mut keys = KeystrokeCounter::new();
        keys.play_keystroke(0.2).unwrap();
        keys.play_keystroke(0.2).unwrap();
        assert_eq!(keys.count(), 2);
        assert_eq!(keys.last_volume(), Some(0.2));

        keys.reject_with(PlaybackError::MissingResource);
        assert!(keys.play_keystroke(0.2).is_err());
        assert_eq!(keys.count(), 2);
    }
}
