//! Playback runtime: timers, typing, narration and the script player.

pub mod audio;
pub mod config;
pub mod facts;
pub mod navigation;
pub mod player;
pub mod scheduler;
pub mod typing;
