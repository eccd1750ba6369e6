//! Typing engine: reveals a slide's text one character per tick.
//!
//! The engine holds reveal state only. The caller owns the timer queue:
//! `start` and `tick` report the delay before the next tick, and the
//! caller removes pending ticks from its queue whenever it calls
//! `cancel` or `skip_to_end`.

use serde::{Deserialize, Serialize};

use crate::schema::slide::Slide;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Idle,
    Typing,
    Complete,
}

/// What a reveal tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// One more character shown; schedule the next tick after `next_delay_ms`.
    Continue { revealed: usize, next_delay_ms: u64 },
    /// The last character was shown and the phase is now `Complete`.
    Finished { revealed: usize },
    /// Not typing; a tick arrived that nobody should have scheduled.
    Idle,
}

#[derive(Debug, Clone)]
pub struct TypingEngine {
    text: String,
    total: usize,
    revealed: usize,
    phase: Phase,
    interval_ms: u64,
    pause_at: Vec<usize>,
    pause_ms: u64,
}

impl Default for TypingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TypingEngine {
    pub fn new() -> Self {
        Self {
            text: String::new(),
            total: 0,
            revealed: 0,
            phase: Phase::Idle,
            interval_ms: 0,
            pause_at: Vec::new(),
            pause_ms: 0,
        }
    }

    /// Reset to the start of `slide`'s text.
    ///
    /// Returns the delay before the first tick, or `None` when there is
    /// nothing to type: empty text, or a zero base interval that shows the
    /// text at once. In both cases the phase is already `Complete`.
    pub fn start(&mut self, slide: &Slide, interval_ms: u64, pause_ms: u64) -> Option<u64> {
        self.text = slide.text.clone();
        self.total = slide.char_len();
        self.revealed = 0;
        self.interval_ms = interval_ms;
        self.pause_at = slide.pause_at.clone();
        self.pause_ms = pause_ms;

        if self.total == 0 {
            self.phase = Phase::Complete;
            return None;
        }
        if slide.typing_interval_ms == 0 {
            self.revealed = self.total;
            self.phase = Phase::Complete;
            return None;
        }
        self.phase = Phase::Typing;
        Some(self.interval_ms)
    }

    /// Reveal exactly one more character.
    pub fn tick(&mut self) -> TickOutcome {
        if self.phase != Phase::Typing {
            return TickOutcome::Idle;
        }
        self.revealed += 1;
        if self.revealed >= self.total {
            self.revealed = self.total;
            self.phase = Phase::Complete;
            return TickOutcome::Finished {
                revealed: self.revealed,
            };
        }
        let mut next_delay_ms = self.interval_ms;
        if self.pause_at.contains(&self.revealed) {
            next_delay_ms += self.pause_ms;
        }
        TickOutcome::Continue {
            revealed: self.revealed,
            next_delay_ms,
        }
    }

    /// Show the whole text immediately. Returns `false` when already complete.
    pub fn skip_to_end(&mut self) -> bool {
        if self.phase == Phase::Complete {
            return false;
        }
        self.revealed = self.total;
        self.phase = Phase::Complete;
        true
    }

    /// Stop typing where it is, without completing.
    pub fn cancel(&mut self) {
        if self.phase == Phase::Typing {
            self.phase = Phase::Idle;
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn revealed(&self) -> usize {
        self.revealed
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn visible_text(&self) -> &str {
        match self.text.char_indices().nth(self.revealed) {
            Some((byte_idx, _)) => &self.text[..byte_idx],
            None => &self.text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_to_end(engine: &mut TypingEngine) -> Vec<TickOutcome> {
        let mut outcomes = Vec::new();
        loop {
            let outcome = engine.tick();
            outcomes.push(outcome);
            if !matches!(outcome, TickOutcome::Continue { .. }) {
                return outcomes;
            }
        }
    }

    #[test]
    fn start_resets_and_reports_first_delay() {
        let mut engine = TypingEngine::new();
        let slide = Slide::new(1, 2, "Hey.", 140);
        assert_eq!(engine.start(&slide, 70, 0), Some(70));
        assert_eq!(engine.phase(), Phase::Typing);
        assert_eq!(engine.revealed(), 0);
        assert_eq!(engine.visible_text(), "");
    }

    #[test]
    fn each_tick_reveals_one_character() {
        let mut engine = TypingEngine::new();
        engine.start(&Slide::new(1, 2, "Hey.", 140), 70, 0);
        let outcomes = run_to_end(&mut engine);
        assert_eq!(
            outcomes,
            vec![
                TickOutcome::Continue {
                    revealed: 1,
                    next_delay_ms: 70
                },
                TickOutcome::Continue {
                    revealed: 2,
                    next_delay_ms: 70
                },
                TickOutcome::Continue {
                    revealed: 3,
                    next_delay_ms: 70
                },
                TickOutcome::Finished { revealed: 4 },
            ]
        );
        assert_eq!(engine.phase(), Phase::Complete);
        assert_eq!(engine.visible_text(), "Hey.");
        assert_eq!(engine.tick(), TickOutcome::Idle);
    }

    #[test]
    fn multibyte_text_counts_characters() {
        let mut engine = TypingEngine::new();
        engine.start(&Slide::new(1, 2, "Hi—yo", 50), 25, 0);
        engine.tick();
        engine.tick();
        engine.tick();
        assert_eq!(engine.visible_text(), "Hi—");
        assert_eq!(engine.total(), 5);
    }

    #[test]
    fn empty_text_completes_without_ticks() {
        let mut engine = TypingEngine::new();
        assert_eq!(engine.start(&Slide::new(2, 1, "", 0), 15, 0), None);
        assert_eq!(engine.phase(), Phase::Complete);
        assert_eq!(engine.revealed(), 0);
    }

    #[test]
    fn zero_interval_shows_text_instantly() {
        let mut engine = TypingEngine::new();
        assert_eq!(engine.start(&Slide::new(4, 1, "Outside of work.", 0), 15, 0), None);
        assert_eq!(engine.phase(), Phase::Complete);
        assert_eq!(engine.visible_text(), "Outside of work.");
    }

    #[test]
    fn skip_to_end_at_any_tick() {
        let slide = Slide::new(1, 3, "You might be looking for someone else", 90);
        for ticks in 0..slide.char_len() {
            let mut engine = TypingEngine::new();
            engine.start(&slide, 45, 0);
            for _ in 0..ticks {
                engine.tick();
            }
            assert!(engine.skip_to_end());
            assert_eq!(engine.revealed(), slide.char_len());
            assert_eq!(engine.phase(), Phase::Complete);
            assert_eq!(engine.tick(), TickOutcome::Idle);
        }
    }

    #[test]
    fn skip_when_complete_is_noop() {
        let mut engine = TypingEngine::new();
        engine.start(&Slide::new(1, 2, "ok", 10), 15, 0);
        assert!(engine.skip_to_end());
        assert!(!engine.skip_to_end());
    }

    #[test]
    fn cancel_leaves_partial_text() {
        let mut engine = TypingEngine::new();
        engine.start(&Slide::new(1, 2, "Hello", 60), 30, 0);
        engine.tick();
        engine.tick();
        engine.cancel();
        assert_eq!(engine.phase(), Phase::Idle);
        assert_eq!(engine.visible_text(), "He");
        assert_eq!(engine.tick(), TickOutcome::Idle);
    }

    #[test]
    fn restart_resets_progress() {
        let slide = Slide::new(1, 2, "Hello", 60);
        let mut engine = TypingEngine::new();
        engine.start(&slide, 30, 0);
        engine.tick();
        engine.tick();
        engine.start(&slide, 30, 0);
        assert_eq!(engine.revealed(), 0);
        assert_eq!(engine.phase(), Phase::Typing);
    }

    #[test]
    fn pause_marks_extend_the_next_delay() {
        let mut slide = Slide::new(2, 4, "Learned.", 50);
        slide.pause_at = vec![3];
        let mut engine = TypingEngine::new();
        engine.start(&slide, 20, 300);
        let delays: Vec<u64> = run_to_end(&mut engine)
            .into_iter()
            .filter_map(|o| match o {
                TickOutcome::Continue { next_delay_ms, .. } => Some(next_delay_ms),
                _ => None,
            })
            .collect();
        assert_eq!(delays, vec![20, 20, 320, 20, 20, 20, 20]);
    }
}
