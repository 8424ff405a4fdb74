//! Post-synthesis audio processing: chunk recombination and speed adjustment.

pub mod combine;
pub mod speed;

pub use combine::{combine, CombineOutcome, CombineStrategy};
pub use speed::{adjust_speed, MAX_SPEED, MIN_SPEED};
