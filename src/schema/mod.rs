//! Static script data: coordinates, slides and the validated script table.

pub mod coordinate;
pub mod script;
pub mod slide;
