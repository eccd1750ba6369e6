use serde::{Deserialize, Serialize};

use super::coordinate::Coordinate;

/// An image shown next to a slide's text.
///
/// `path` is opaque to the engine; the rendering surface resolves it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRef {
    pub path: String,
    #[serde(default)]
    pub alt_text: String,
    /// Whether the surface should reveal the image once typing completes.
    #[serde(default = "default_true")]
    pub visible: bool,
}

/// A `[start_sec, end_sec)` window into the shared narration track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioWindow {
    pub start_sec: f64,
    pub end_sec: f64,
}

impl AudioWindow {
    pub fn is_valid(&self) -> bool {
        self.start_sec.is_finite()
            && self.end_sec.is_finite()
            && self.start_sec >= 0.0
            && self.start_sec < self.end_sec
    }
}

/// An outbound link revealed after typing completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRef {
    pub url: String,
    #[serde(default)]
    pub label: Option<String>,
    /// Render as a prominent button instead of an inline link.
    #[serde(default)]
    pub is_primary_button: bool,
}

/// A closing block of contact links, typically on the final slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallToAction {
    pub links: Vec<LinkRef>,
    /// Whether the surface offers the "tell me something unexpected" button.
    #[serde(default)]
    pub offers_facts: bool,
}

/// One entry of the script table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    pub section: u32,
    pub step: u32,
    #[serde(default)]
    pub text: String,
    /// Base delay between revealed characters; zero shows the text at once.
    #[serde(default)]
    pub typing_interval_ms: u64,
    /// Delay before auto-advancing after typing finishes; zero disables it.
    #[serde(default)]
    pub post_complete_delay_ms: u64,
    #[serde(default)]
    pub next_step: Option<u32>,
    #[serde(default)]
    pub next_section: Option<u32>,
    #[serde(default)]
    pub media: Option<MediaRef>,
    #[serde(default)]
    pub audio_window: Option<AudioWindow>,
    #[serde(default)]
    pub link: Option<LinkRef>,
    #[serde(default)]
    pub cta: Option<CallToAction>,
    #[serde(default)]
    pub is_final: bool,
    /// Character counts after which typing holds for an extra pause.
    #[serde(default)]
    pub pause_at: Vec<usize>,
    #[serde(default)]
    pub pause_ms: Option<u64>,
}

impl Slide {
    /// A plain text slide with no media, audio or transition.
    pub fn new(section: u32, step: u32, text: impl Into<String>, typing_interval_ms: u64) -> Self {
        Self {
            section,
            step,
            text: text.into(),
            typing_interval_ms,
            post_complete_delay_ms: 0,
            next_step: None,
            next_section: None,
            media: None,
            audio_window: None,
            link: None,
            cta: None,
            is_final: false,
            pause_at: Vec::new(),
            pause_ms: None,
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.section, self.step)
    }

    /// Length of the text in characters (Unicode scalar values).
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// A silent opening step: first step of a section with no text.
    pub fn is_bridge(&self) -> bool {
        self.coordinate().is_section_start() && self.text.is_empty()
    }

    /// The coordinate named by `next_section` or `next_step`, in that priority.
    pub fn explicit_target(&self) -> Option<Coordinate> {
        if let Some(section) = self.next_section {
            return Some(Coordinate::section_start(section));
        }
        self.next_step
            .map(|step| Coordinate::new(self.section, step))
    }

    pub fn shows_media(&self) -> bool {
        self.media.as_ref().is_some_and(|m| m.visible)
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_len_counts_code_points() {
        assert_eq!(Slide::new(1, 2, "Hey—welcome", 80).char_len(), 11);
        assert_eq!(Slide::new(1, 2, "Hey—welcome", 80).text.len(), 13);
        assert_eq!(Slide::new(2, 1, "", 0).char_len(), 0);
    }

    #[test]
    fn explicit_target_prefers_section() {
        let mut slide = Slide::new(2, 14, "done", 60);
        assert_eq!(slide.explicit_target(), None);

        slide.next_step = Some(15);
        assert_eq!(slide.explicit_target(), Some(Coordinate::new(2, 15)));

        slide.next_section = Some(3);
        assert_eq!(slide.explicit_target(), Some(Coordinate::new(3, 1)));
    }

    #[test]
    fn bridge_detection() {
        assert!(Slide::new(2, 1, "", 0).is_bridge());
        assert!(!Slide::new(2, 2, "", 0).is_bridge());
        assert!(!Slide::new(2, 1, "text", 0).is_bridge());
    }

    #[test]
    fn audio_window_validity() {
        assert!(AudioWindow { start_sec: 6.0, end_sec: 8.5 }.is_valid());
        assert!(AudioWindow { start_sec: 0.0, end_sec: 0.1 }.is_valid());
        assert!(!AudioWindow { start_sec: 8.5, end_sec: 8.5 }.is_valid());
        assert!(!AudioWindow { start_sec: 9.0, end_sec: 8.5 }.is_valid());
        assert!(!AudioWindow { start_sec: -1.0, end_sec: 2.0 }.is_valid());
        assert!(!AudioWindow { start_sec: 0.0, end_sec: f64::NAN }.is_valid());
    }

    #[test]
    fn slide_from_ron_uses_defaults() {
        let slide: Slide = ron::from_str(
            r#"Slide(
                section: 1,
                step: 2,
                text: "Hey.",
                typing_interval_ms: 140,
                media: Some(MediaRef(path: "/welcome.png")),
            )"#,
        )
        .unwrap();
        assert_eq!(slide.coordinate(), Coordinate::new(1, 2));
        assert_eq!(slide.post_complete_delay_ms, 0);
        assert!(!slide.is_final);
        assert!(slide.shows_media());
        assert!(slide.pause_at.is_empty());
    }
}
