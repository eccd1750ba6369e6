//! Fact deck behind the "tell me something unexpected" button.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Cycles through a fixed list of facts, wrapping around at the end.
#[derive(Debug, Clone, Default)]
pub struct FactDeck {
    facts: Vec<String>,
    cursor: usize,
}

impl FactDeck {
    /// Facts in script order.
    pub fn new(facts: Vec<String>) -> Self {
        Self { facts, cursor: 0 }
    }

    /// Facts in an order fixed by `seed`, so a session is reproducible.
    pub fn shuffled(mut facts: Vec<String>, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        facts.shuffle(&mut rng);
        Self { facts, cursor: 0 }
    }

    /// The next fact, or `None` for an empty deck.
    pub fn draw(&mut self) -> Option<&str> {
        if self.facts.is_empty() {
            return None;
        }
        let idx = self.cursor;
        self.cursor = (self.cursor + 1) % self.facts.len();
        Some(self.facts[idx].as_str())
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts() -> Vec<String> {
        vec!["a".into(), "b".into(), "c".into()]
    }

    #[test]
    fn draws_cycle_in_order() {
        let mut deck = FactDeck::new(facts());
        let drawn: Vec<String> = (0..4).map(|_| deck.draw().unwrap().to_string()).collect();
        assert_eq!(drawn, vec!["a", "b", "c", "a"]);
    }

    #[test]
    fn empty_deck_draws_nothing() {
        let mut deck = FactDeck::default();
        assert!(deck.draw().is_none());
        assert!(deck.is_empty());
    }

    #[test]
    fn shuffle_is_deterministic_per_seed() {
        let mut first = FactDeck::shuffled(facts(), 7);
        let mut second = FactDeck::shuffled(facts(), 7);
        for _ in 0..3 {
            assert_eq!(first.draw(), second.draw());
        }
    }

    #[test]
    fn shuffle_keeps_every_fact() {
        let mut deck = FactDeck::shuffled(facts(), 42);
        let mut drawn: Vec<String> = (0..3).map(|_| deck.draw().unwrap().to_string()).collect();
        drawn.sort();
        assert_eq!(drawn, facts());
    }
}
