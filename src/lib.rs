//! Walkthrough Engine: a script player for timed, narrated slide walkthroughs.
//!
//! A static script table of slides is played back section by section.
//! Each slide's text is revealed one character at a time, an optional
//! window of a shared narration track plays alongside it, and the
//! visitor steers with next/back/jump intents that can interrupt any
//! timer at any moment.

pub mod core;
pub mod schema;
