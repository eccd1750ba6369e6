//! Coordinate arithmetic for next/previous/jump over a script table.
//!
//! These functions only compute where to go. Tearing down and restarting
//! timers is the player's job.

use crate::schema::coordinate::Coordinate;
use crate::schema::script::ScriptTable;
use crate::schema::slide::Slide;

/// Where `advance` leads from a completed slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Goto(Coordinate),
    /// Terminal slide, or the fallback ran past the last section.
    End,
}

/// Resolve the forward target of `slide`: explicit section, explicit
/// step, terminal flag, then the section-length fallback.
pub fn next_target(script: &ScriptTable, slide: &Slide) -> Target {
    if let Some(section) = slide.next_section {
        return Target::Goto(Coordinate::section_start(section));
    }
    if let Some(step) = slide.next_step {
        return Target::Goto(Coordinate::new(slide.section, step));
    }
    if slide.is_final {
        return Target::End;
    }
    let max_steps = script.max_steps(slide.section).unwrap_or(slide.step);
    if slide.step < max_steps {
        Target::Goto(Coordinate::new(slide.section, slide.step + 1))
    } else if slide.section < script.last_section() {
        Target::Goto(Coordinate::section_start(slide.section + 1))
    } else {
        Target::End
    }
}

/// Target of an automatic advance after the post-complete delay. Only an
/// explicit transition moves on by itself.
pub fn auto_target(slide: &Slide) -> Option<Coordinate> {
    slide.explicit_target()
}

/// The coordinate before `at`, or `None` at the very beginning.
pub fn previous(script: &ScriptTable, at: Coordinate) -> Option<Coordinate> {
    if at.step > 1 {
        return Some(Coordinate::new(at.section, at.step - 1));
    }
    if at.section > script.first_section() {
        let section = at.section - 1;
        let step = script.max_steps(section).unwrap_or(1);
        return Some(Coordinate::new(section, step));
    }
    None
}

/// Opening coordinate of section `n`, if the script declares it.
pub fn section_start(script: &ScriptTable, n: u32) -> Option<Coordinate> {
    script
        .section(n)
        .map(|section| Coordinate::section_start(section.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::script::Section;

    fn script() -> ScriptTable {
        let sections = vec![
            Section {
                id: 1,
                title: "Intro".into(),
                max_steps: 3,
                speed_factor: None,
            },
            Section {
                id: 2,
                title: "Outro".into(),
                max_steps: 2,
                speed_factor: None,
            },
        ];
        let mut jump = Slide::new(1, 2, "skip ahead", 60);
        jump.next_section = Some(2);
        let mut last = Slide::new(2, 2, "bye", 60);
        last.is_final = true;
        let slides = vec![
            Slide::new(1, 1, "one", 60),
            jump,
            Slide::new(1, 3, "three", 60),
            Slide::new(2, 1, "four", 60),
            last,
        ];
        ScriptTable::new(sections, slides, Vec::new()).unwrap()
    }

    fn slide(script: &ScriptTable, section: u32, step: u32) -> Slide {
        script.lookup(Coordinate::new(section, step)).unwrap().clone()
    }

    #[test]
    fn fallback_steps_within_section_then_across() {
        let s = script();
        assert_eq!(next_target(&s, &slide(&s, 1, 1)), Target::Goto(Coordinate::new(1, 2)));
        assert_eq!(next_target(&s, &slide(&s, 1, 3)), Target::Goto(Coordinate::new(2, 1)));
        assert_eq!(next_target(&s, &slide(&s, 2, 1)), Target::Goto(Coordinate::new(2, 2)));
    }

    #[test]
    fn explicit_section_wins() {
        let s = script();
        assert_eq!(next_target(&s, &slide(&s, 1, 2)), Target::Goto(Coordinate::new(2, 1)));
        assert_eq!(auto_target(&slide(&s, 1, 2)), Some(Coordinate::new(2, 1)));
        assert_eq!(auto_target(&slide(&s, 1, 1)), None);
    }

    #[test]
    fn final_slide_ends() {
        let s = script();
        assert_eq!(next_target(&s, &slide(&s, 2, 2)), Target::End);
    }

    #[test]
    fn fallback_past_last_section_ends() {
        let s = script();
        let mut unmarked = slide(&s, 2, 2);
        unmarked.is_final = false;
        assert_eq!(next_target(&s, &unmarked), Target::End);
    }

    #[test]
    fn previous_walks_back_across_sections() {
        let s = script();
        assert_eq!(previous(&s, Coordinate::new(2, 2)), Some(Coordinate::new(2, 1)));
        assert_eq!(previous(&s, Coordinate::new(2, 1)), Some(Coordinate::new(1, 3)));
        assert_eq!(previous(&s, Coordinate::new(1, 1)), None);
    }

    #[test]
    fn section_start_requires_declared_section() {
        let s = script();
        assert_eq!(section_start(&s, 2), Some(Coordinate::new(2, 1)));
        assert_eq!(section_start(&s, 3), None);
        assert_eq!(section_start(&s, 0), None);
    }
}
