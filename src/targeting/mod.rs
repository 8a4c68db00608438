//! Enemy target acquisition.
//!
//! An observer scores the live candidates with a pluggable
//! [`TargetScorer`], binds the best one and rebinds automatically when that
//! target gains the dead tag.

mod acquisition;
mod scorer;

pub use acquisition::{TargetAcquired, TargetAcquisition, TargetHost};
pub use scorer::{select_best, Candidate, DistanceScorer, LowestHealthScorer, TargetScorer};
