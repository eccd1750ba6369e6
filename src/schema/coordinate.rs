use serde::{Deserialize, Serialize};
use std::fmt;

/// A position in the script: section number and step within it.
///
/// Both components are 1-based. Ordering is section-major, so coordinates
/// sort in playback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinate {
    pub section: u32,
    pub step: u32,
}

impl Coordinate {
    pub const fn new(section: u32, step: u32) -> Self {
        Self { section, step }
    }

    /// The opening step of a section.
    pub const fn section_start(section: u32) -> Self {
        Self { section, step: 1 }
    }

    pub fn is_section_start(&self) -> bool {
        self.step == 1
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.section, self.step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_section_major() {
        let mut coords = vec![
            Coordinate::new(2, 1),
            Coordinate::new(1, 8),
            Coordinate::new(1, 2),
        ];
        coords.sort();
        assert_eq!(
            coords,
            vec![
                Coordinate::new(1, 2),
                Coordinate::new(1, 8),
                Coordinate::new(2, 1)
            ]
        );
    }

    #[test]
    fn section_start() {
        let c = Coordinate::section_start(3);
        assert_eq!(c, Coordinate::new(3, 1));
        assert!(c.is_section_start());
        assert!(!Coordinate::new(3, 2).is_section_start());
    }

    #[test]
    fn display() {
        assert_eq!(Coordinate::new(2, 14).to_string(), "(2, 14)");
    }
}
