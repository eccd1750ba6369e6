//! WASM bindings for walkthrough-engine: drives the walkthrough page.
//!
//! The page owns the real `<audio>` element and the animation frame loop.
//! It forwards elapsed time and input here, applies the queued audio
//! commands, and renders whatever `view()` returns.

use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;

use walkthrough_engine::core::audio::{KeystrokeSound, NarrationTrack, PlaybackError};
use walkthrough_engine::core::config::PlayerConfig;
use walkthrough_engine::core::player::{Key, Outcome, PlayerError, Presentation};
use walkthrough_engine::schema::script::ScriptTable;

// ---------------------------------------------------------------------------
// Embedded script data, compiled into the WASM binary
// ---------------------------------------------------------------------------
mod data {
    pub const WALKTHROUGH_SCRIPT: &str =
        include_str!("../../script_data/walkthrough/script.ron");
    pub const WALKTHROUGH_CONFIG: &str =
        include_str!("../../script_data/walkthrough/config.ron");
}

// ---------------------------------------------------------------------------
// Audio commands queued for the page
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum AudioCommand {
    Seek { position_sec: f64 },
    Play,
    Pause,
    Volume { volume: f32 },
    Rate { rate: f32 },
    Keystroke { volume: f32 },
}

#[derive(Debug, Default)]
struct CommandQueue {
    commands: Vec<AudioCommand>,
    /// Last position the page reported, in seconds.
    position_sec: f64,
}

/// Narration track that records what the page should do with its
/// `<audio>` element instead of doing it.
#[derive(Clone)]
struct QueuedTrack {
    queue: Rc<RefCell<CommandQueue>>,
}

impl NarrationTrack for QueuedTrack {
    fn seek(&mut self, position_sec: f64) {
        let mut queue = self.queue.borrow_mut();
        queue.position_sec = position_sec;
        queue.commands.push(AudioCommand::Seek { position_sec });
    }

    // Autoplay refusals arrive later through `report_playback_rejected`.
    fn play(&mut self) -> Result<(), PlaybackError> {
        self.queue.borrow_mut().commands.push(AudioCommand::Play);
        Ok(())
    }

    fn pause(&mut self) {
        self.queue.borrow_mut().commands.push(AudioCommand::Pause);
    }

    fn position_sec(&self) -> f64 {
        self.queue.borrow().position_sec
    }

    fn set_volume(&mut self, volume: f32) {
        self.queue
            .borrow_mut()
            .commands
            .push(AudioCommand::Volume { volume });
    }

    fn set_playback_rate(&mut self, rate: f32) {
        self.queue
            .borrow_mut()
            .commands
            .push(AudioCommand::Rate { rate });
    }
}

impl KeystrokeSound for QueuedTrack {
    fn play_keystroke(&mut self, volume: f32) -> Result<(), PlaybackError> {
        self.queue
            .borrow_mut()
            .commands
            .push(AudioCommand::Keystroke { volume });
        Ok(())
    }
}

fn outcome_label(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Moved { .. } => "moved",
        Outcome::Skipped => "skipped",
        Outcome::NoOp => "noop",
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, JsError> {
    serde_json::to_string(value).map_err(|e| JsError::new(&format!("Serialization error: {e}")))
}

// ---------------------------------------------------------------------------
// WalkthroughPlayer, the main exported struct
// ---------------------------------------------------------------------------
#[wasm_bindgen]
pub struct WalkthroughPlayer {
    presentation: Presentation,
    queue: Rc<RefCell<CommandQueue>>,
    elapsed_ms: u64,
}

#[wasm_bindgen]
impl WalkthroughPlayer {
    /// Load the built-in walkthrough.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<WalkthroughPlayer, JsError> {
        Self::from_ron(data::WALKTHROUGH_SCRIPT, data::WALKTHROUGH_CONFIG)
    }

    /// Load a custom script and config, both in RON.
    pub fn from_ron(script_src: &str, config_src: &str) -> Result<WalkthroughPlayer, JsError> {
        let script = ScriptTable::parse_ron(script_src)
            .map_err(|e| JsError::new(&format!("Script parse error: {e}")))?;
        let mut config = PlayerConfig::parse_ron(config_src)
            .map_err(|e| JsError::new(&format!("Config parse error: {e}")))?;
        // The page reports positions from `timeupdate`.
        config.audio_poll_ms = None;

        let queue = Rc::new(RefCell::new(CommandQueue::default()));
        let track = QueuedTrack {
            queue: Rc::clone(&queue),
        };
        let presentation = Presentation::builder()
            .with_script(script)
            .with_config(config)
            .narration(track.clone())
            .keystroke(track)
            .build()
            .map_err(|e| JsError::new(&format!("Player build error: {e}")))?;

        Ok(WalkthroughPlayer {
            presentation,
            queue,
            elapsed_ms: 0,
        })
    }

    /// Let `delta_ms` milliseconds pass since the last frame.
    pub fn tick(&mut self, delta_ms: f64) -> Result<(), JsError> {
        let delta = if delta_ms.is_finite() && delta_ms > 0.0 {
            delta_ms.round() as u64
        } else {
            0
        };
        self.elapsed_ms = self.elapsed_ms.saturating_add(delta);
        self.presentation
            .run_until(self.elapsed_ms)
            .map_err(|e| JsError::new(&format!("Timer error: {e}")))
    }

    pub fn begin(&mut self) -> Result<String, JsError> {
        self.intent(|p| p.begin())
    }

    pub fn advance(&mut self) -> Result<String, JsError> {
        self.intent(|p| p.advance())
    }

    pub fn retreat(&mut self) -> Result<String, JsError> {
        self.intent(|p| p.retreat())
    }

    pub fn skip(&mut self) -> Result<String, JsError> {
        self.intent(|p| p.skip_to_end())
    }

    pub fn click(&mut self) -> Result<String, JsError> {
        self.intent(|p| p.click())
    }

    pub fn jump_to_section(&mut self, section: u32) -> Result<String, JsError> {
        self.intent(|p| p.jump_to_section(section))
    }

    /// Forward a `KeyboardEvent.key` value.
    pub fn key(&mut self, key: &str) -> Result<String, JsError> {
        let key = match key {
            "ArrowRight" => Key::Right,
            "ArrowLeft" => Key::Left,
            "Backspace" => Key::Backspace,
            _ => Key::Other,
        };
        self.intent(|p| p.key(key))
    }

    /// Draw the next fact. Returns an empty string when none is on offer.
    pub fn next_fact(&mut self) -> String {
        self.presentation.next_fact().unwrap_or_default()
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.presentation.set_volume(volume);
    }

    pub fn set_playback_rate(&mut self, rate: f32) {
        self.presentation.set_playback_rate(rate);
    }

    pub fn set_audio_paused(&mut self, paused: bool) {
        self.presentation.set_audio_paused(paused);
    }

    /// The page's `timeupdate` position, in seconds.
    pub fn observe_audio_position(&mut self, position_sec: f64) {
        self.queue.borrow_mut().position_sec = position_sec;
        self.presentation.observe_audio_position(position_sec);
    }

    /// `audio.play()` rejected its promise.
    pub fn report_playback_rejected(&mut self) {
        self.presentation.report_playback_rejected();
    }

    /// The current frame as JSON.
    pub fn view(&self) -> Result<String, JsError> {
        to_json(&self.presentation.view())
    }

    /// Events since the last call, as a JSON array.
    pub fn drain_events(&mut self) -> Result<String, JsError> {
        to_json(&self.presentation.drain_events())
    }

    /// Audio commands the page must apply, in order, as a JSON array.
    pub fn drain_audio_commands(&mut self) -> Result<String, JsError> {
        let commands = std::mem::take(&mut self.queue.borrow_mut().commands);
        to_json(&commands)
    }

    /// Milliseconds until the next timer, or -1 when nothing is pending.
    pub fn next_deadline_in(&self) -> f64 {
        match self.presentation.next_deadline() {
            Some(due) => due.saturating_sub(self.elapsed_ms) as f64,
            None => -1.0,
        }
    }
}

impl WalkthroughPlayer {
    fn intent(
        &mut self,
        f: impl FnOnce(&mut Presentation) -> Result<Outcome, PlayerError>,
    ) -> Result<String, JsError> {
        f(&mut self.presentation)
            .map(|outcome| outcome_label(outcome).to_string())
            .map_err(|e| JsError::new(&e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_walkthrough_builds_behind_gate() {
        let mut player = WalkthroughPlayer::new().unwrap();
        assert!(player.view().unwrap().contains("\"coordinate\":null"));
        assert_eq!(player.begin().unwrap(), "moved");
        assert_eq!(player.advance().unwrap(), "moved");
    }

    #[test]
    fn narration_is_queued_for_the_page() {
        let mut player = WalkthroughPlayer::new().unwrap();
        player.begin().unwrap();
        player.tick(200.0).unwrap();

        let commands = player.drain_audio_commands().unwrap();
        assert!(commands.contains("\"kind\":\"seek\""));
        assert!(commands.contains("\"kind\":\"play\""));
        assert_eq!(player.drain_audio_commands().unwrap(), "[]");

        player.observe_audio_position(3.5);
        let commands = player.drain_audio_commands().unwrap();
        assert!(commands.contains("\"kind\":\"pause\""));
    }

    #[test]
    fn keystrokes_are_queued_while_typing() {
        let mut player = WalkthroughPlayer::new().unwrap();
        player.begin().unwrap();
        player.tick(200.0).unwrap();
        player.drain_audio_commands().unwrap();
        player.tick(40.0).unwrap();
        let commands = player.drain_audio_commands().unwrap();
        assert!(commands.contains("\"kind\":\"keystroke\""));
    }
}
