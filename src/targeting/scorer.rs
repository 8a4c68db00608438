//! Candidate scoring strategies.

use crate::core::{ActorId, Vec3};

/// What an observer knows about one potential target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub actor: ActorId,
    pub location: Vec3,
    /// Health, when the candidate carries it.
    pub health: Option<f32>,
    /// The candidate is alive in the world (not pending destruction).
    pub is_valid: bool,
    /// The candidate carries the dead tag.
    pub is_dead: bool,
}

impl Candidate {
    /// A live candidate at `location`.
    pub fn new(actor: ActorId, location: Vec3) -> Self {
        Self {
            actor,
            location,
            health: None,
            is_valid: true,
            is_dead: false,
        }
    }

    #[must_use]
    pub fn with_health(mut self, health: f32) -> Self {
        self.health = Some(health);
        self
    }

    #[must_use]
    pub fn dead(mut self) -> Self {
        self.is_dead = true;
        self
    }

    #[must_use]
    pub fn invalid(mut self) -> Self {
        self.is_valid = false;
        self
    }

    /// Eligible for scoring at all.
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        self.is_valid && !self.is_dead
    }
}

/// Ranks candidates for an observer. Lower scores win.
pub trait TargetScorer {
    /// Score `candidate` as seen from `origin`. `None` excludes it.
    fn score(&self, origin: Vec3, candidate: &Candidate) -> Option<f32>;

    /// Short name (for logs).
    fn name(&self) -> &'static str;
}

/// Nearest first, by squared distance.
#[derive(Clone, Copy, Debug, Default)]
pub struct DistanceScorer;

impl TargetScorer for DistanceScorer {
    fn score(&self, origin: Vec3, candidate: &Candidate) -> Option<f32> {
        Some(origin.distance_squared(candidate.location))
    }

    fn name(&self) -> &'static str {
        "Nearest"
    }
}

/// Weakest first. Candidates without Health are ignored.
#[derive(Clone, Copy, Debug, Default)]
pub struct LowestHealthScorer;

impl TargetScorer for LowestHealthScorer {
    fn score(&self, _origin: Vec3, candidate: &Candidate) -> Option<f32> {
        candidate.health
    }

    fn name(&self) -> &'static str {
        "LowestHealth"
    }
}

/// The best eligible candidate under `scorer`, skipping `exclude`.
///
/// Ties keep the earliest candidate, so callers control tie-breaking through
/// enumeration order.
pub fn select_best(
    scorer: &dyn TargetScorer,
    origin: Vec3,
    candidates: &[Candidate],
    exclude: ActorId,
) -> Option<ActorId> {
    let mut best: Option<(ActorId, f32)> = None;
    for candidate in candidates {
        if candidate.actor == exclude || !candidate.is_eligible() {
            continue;
        }
        let Some(score) = scorer.score(origin, candidate) else {
            continue;
        };
        if score.is_nan() {
            continue;
        }
        if best.map_or(true, |(_, best_score)| score < best_score) {
            best = Some((candidate.actor, score));
        }
    }
    best.map(|(actor, _)| actor)
}

#[cfg(test)]
mod tests {
    use super::*;

    const OBSERVER: ActorId = ActorId(100);

    fn line(distances: &[f32]) -> Vec<Candidate> {
        distances
            .iter()
            .enumerate()
            .map(|(i, d)| Candidate::new(ActorId(i as u32 + 1), Vec3::new(*d, 0.0, 0.0)))
            .collect()
    }

    #[test]
    fn test_nearest_wins() {
        let candidates = line(&[5.0, 2.0, 9.0]);
        assert_eq!(
            select_best(&DistanceScorer, Vec3::ZERO, &candidates, OBSERVER),
            Some(ActorId(2))
        );
    }

    #[test]
    fn test_ties_keep_first() {
        let candidates = line(&[3.0, -3.0, 3.0]);
        assert_eq!(
            select_best(&DistanceScorer, Vec3::ZERO, &candidates, OBSERVER),
            Some(ActorId(1))
        );
    }

    #[test]
    fn test_dead_invalid_and_self_skipped() {
        let mut candidates = line(&[1.0, 2.0, 3.0, 4.0]);
        candidates[0] = candidates[0].dead();
        candidates[1] = candidates[1].invalid();
        candidates[2].actor = OBSERVER;
        assert_eq!(
            select_best(&DistanceScorer, Vec3::ZERO, &candidates, OBSERVER),
            Some(ActorId(4))
        );
    }

    #[test]
    fn test_empty_yields_none() {
        assert_eq!(select_best(&DistanceScorer, Vec3::ZERO, &[], OBSERVER), None);
    }

    #[test]
    fn test_lowest_health() {
        let candidates = vec![
            Candidate::new(ActorId(1), Vec3::ZERO).with_health(80.0),
            Candidate::new(ActorId(2), Vec3::new(50.0, 0.0, 0.0)).with_health(20.0),
            Candidate::new(ActorId(3), Vec3::ZERO),
        ];
        assert_eq!(
            select_best(&LowestHealthScorer, Vec3::ZERO, &candidates, OBSERVER),
            Some(ActorId(2))
        );
    }
}
