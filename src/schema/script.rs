//! Script table: the static `(section, step) -> Slide` mapping, its RON
//! loader, and the load-time validation that makes transition
//! completeness mechanically checkable.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use super::coordinate::Coordinate;
use super::slide::Slide;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("script declares no sections")]
    EmptyScript,
    #[error("sections must be numbered contiguously from 1: expected {expected}, found {found}")]
    NonContiguousSections { expected: u32, found: u32 },
    #[error("section {0} declares zero steps")]
    EmptySection(u32),
    #[error("section {section} has invalid speed factor {factor}")]
    InvalidSpeedFactor { section: u32, factor: f64 },
    #[error("slide {0} belongs to an undeclared section")]
    UndeclaredSection(Coordinate),
    #[error("slide {coordinate} is beyond the {max_steps} steps declared for its section")]
    StepOutOfRange { coordinate: Coordinate, max_steps: u32 },
    #[error("slide {0} is defined more than once")]
    DuplicateSlide(Coordinate),
    #[error("section {section} is missing step {step}")]
    MissingStep { section: u32, step: u32 },
    #[error("slide {0} sets both next_step and next_section")]
    AmbiguousTransition(Coordinate),
    #[error("slide {0} transitions to itself")]
    SelfTransition(Coordinate),
    #[error("slide {from} transitions to {to}, which is not in the script")]
    DanglingTransition { from: Coordinate, to: Coordinate },
    #[error("slide {coordinate} has invalid audio window [{start_sec}, {end_sec})")]
    InvalidAudioWindow {
        coordinate: Coordinate,
        start_sec: f64,
        end_sec: f64,
    },
}

/// Per-section metadata supplied alongside the slides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: u32,
    #[serde(default)]
    pub title: String,
    /// Number of steps; also the fallback bound for navigation.
    pub max_steps: u32,
    /// Multiplier on each slide's typing interval. Falls back to the
    /// player's default when absent.
    #[serde(default)]
    pub speed_factor: Option<f64>,
}

/// A validated, immutable script.
#[derive(Debug, Clone)]
pub struct ScriptTable {
    sections: Vec<Section>,
    slides: FxHashMap<Coordinate, Slide>,
    facts: Vec<String>,
}

// On-disk shape of a script file.
#[derive(Debug, Deserialize)]
#[serde(rename = "Script")]
struct RonScript {
    sections: Vec<Section>,
    slides: Vec<Slide>,
    #[serde(default)]
    facts: Vec<String>,
}

impl ScriptTable {
    /// Build and validate a table. Fails on the first configuration error.
    pub fn new(
        sections: Vec<Section>,
        slides: Vec<Slide>,
        facts: Vec<String>,
    ) -> Result<ScriptTable, ScriptError> {
        match Self::check(&sections, &slides).into_iter().next() {
            Some(err) => Err(err),
            None => {
                let mut sections = sections;
                sections.sort_by_key(|s| s.id);
                let slides = slides
                    .into_iter()
                    .map(|slide| (slide.coordinate(), slide))
                    .collect();
                Ok(ScriptTable {
                    sections,
                    slides,
                    facts,
                })
            }
        }
    }

    /// Load a script from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<ScriptTable, ScriptError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a script from a RON string.
    pub fn parse_ron(input: &str) -> Result<ScriptTable, ScriptError> {
        let raw: RonScript = ron::from_str(input)?;
        Self::new(raw.sections, raw.slides, raw.facts)
    }

    /// Parse a script and report every configuration error instead of
    /// stopping at the first one. Used by the linter.
    pub fn lint_ron(input: &str) -> Result<Vec<ScriptError>, ScriptError> {
        let raw: RonScript = ron::from_str(input)?;
        Ok(Self::check(&raw.sections, &raw.slides))
    }

    /// Every configuration error in a set of sections and slides.
    pub fn check(sections: &[Section], slides: &[Slide]) -> Vec<ScriptError> {
        let mut errors = Vec::new();

        if sections.is_empty() {
            errors.push(ScriptError::EmptyScript);
            return errors;
        }

        let mut ids: Vec<u32> = sections.iter().map(|s| s.id).collect();
        ids.sort_unstable();
        for (i, id) in ids.iter().enumerate() {
            let expected = i as u32 + 1;
            if *id != expected {
                errors.push(ScriptError::NonContiguousSections {
                    expected,
                    found: *id,
                });
                break;
            }
        }

        let mut bounds: FxHashMap<u32, u32> = FxHashMap::default();
        for section in sections {
            if section.max_steps == 0 {
                errors.push(ScriptError::EmptySection(section.id));
            }
            if let Some(factor) = section.speed_factor {
                if !factor.is_finite() || factor <= 0.0 {
                    errors.push(ScriptError::InvalidSpeedFactor {
                        section: section.id,
                        factor,
                    });
                }
            }
            bounds.insert(section.id, section.max_steps);
        }

        let mut seen: FxHashMap<Coordinate, &Slide> = FxHashMap::default();
        for slide in slides {
            let coordinate = slide.coordinate();
            match bounds.get(&slide.section) {
                None => errors.push(ScriptError::UndeclaredSection(coordinate)),
                Some(&max_steps) if slide.step == 0 || slide.step > max_steps => {
                    errors.push(ScriptError::StepOutOfRange {
                        coordinate,
                        max_steps,
                    });
                }
                Some(_) => {}
            }
            if seen.insert(coordinate, slide).is_some() {
                errors.push(ScriptError::DuplicateSlide(coordinate));
            }
            if slide.next_step.is_some() && slide.next_section.is_some() {
                errors.push(ScriptError::AmbiguousTransition(coordinate));
            }
            if let Some(window) = slide.audio_window {
                if !window.is_valid() {
                    errors.push(ScriptError::InvalidAudioWindow {
                        coordinate,
                        start_sec: window.start_sec,
                        end_sec: window.end_sec,
                    });
                }
            }
        }

        for &id in &ids {
            let max_steps = bounds.get(&id).copied().unwrap_or(0);
            for step in 1..=max_steps {
                if !seen.contains_key(&Coordinate::new(id, step)) {
                    errors.push(ScriptError::MissingStep { section: id, step });
                }
            }
        }

        for slide in slides {
            if let Some(target) = slide.explicit_target() {
                if target == slide.coordinate() {
                    errors.push(ScriptError::SelfTransition(target));
                } else if !seen.contains_key(&target) {
                    errors.push(ScriptError::DanglingTransition {
                        from: slide.coordinate(),
                        to: target,
                    });
                }
            }
        }

        errors
    }

    pub fn lookup(&self, coordinate: Coordinate) -> Option<&Slide> {
        self.slides.get(&coordinate)
    }

    pub fn section(&self, id: u32) -> Option<&Section> {
        id.checked_sub(1)
            .and_then(|idx| self.sections.get(idx as usize))
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn max_steps(&self, section: u32) -> Option<u32> {
        self.section(section).map(|s| s.max_steps)
    }

    pub fn first_section(&self) -> u32 {
        1
    }

    pub fn last_section(&self) -> u32 {
        self.sections.len() as u32
    }

    pub fn first_coordinate(&self) -> Coordinate {
        Coordinate::section_start(self.first_section())
    }

    /// All slides in playback order.
    pub fn slides(&self) -> Vec<&Slide> {
        let mut slides: Vec<&Slide> = self.slides.values().collect();
        slides.sort_by_key(|s| s.coordinate());
        slides
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    pub fn facts(&self) -> &[String] {
        &self.facts
    }
}
