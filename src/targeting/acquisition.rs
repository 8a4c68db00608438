//! Target acquisition and rebind-on-death.
//!
//! ## Binding
//!
//! An observer holds at most one binding. Binding subscribes to the target's
//! dead-tag transition; unbinding drops that subscription, always before a
//! new one is made. When the bound target gains the dead tag the
//! subscription posts a signal into the acquisition's mailbox. The host
//! drains it with [`TargetAcquisition::poll_target_died`] and runs
//! [`TargetAcquisition::reacquire`] again.
//!
//! Signals are deferred rather than acted on inside the tag callback: the
//! callback runs while the target's tag index is mutably borrowed, so it can
//! neither scan the world nor unsubscribe itself.
//!
//! ## Delayed acquisition
//!
//! Actors spawned in the same frame may not exist yet when an observer
//! first scans. A one-shot timer ([`TargetAcquisition::schedule`]) asks for a
//! second scan after a delay.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use tracing::debug;

use crate::core::{ActorId, DelegateHandle, MulticastDelegate, Vec3};
use crate::system::AbilitySystem;
use crate::tags::{GameplayTag, TagEventKind, TagSubscription};

use super::scorer::{select_best, Candidate, DistanceScorer, TargetScorer};

/// Gives acquisition access to other actors' components.
pub trait TargetHost {
    fn system_mut(&mut self, actor: ActorId) -> Option<&mut AbilitySystem>;
}

/// Notification that an observer's target changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TargetAcquired {
    /// Actor whose target changed.
    pub observer: ActorId,
    /// Target bound before the change, if any.
    pub previous: Option<ActorId>,
    /// Newly bound target. `None` when no candidate qualified.
    pub target: Option<ActorId>,
}

#[derive(Debug)]
struct Binding {
    target: ActorId,
    subscription: TagSubscription,
}

/// One observer's target selection.
pub struct TargetAcquisition {
    observer: ActorId,
    dead_tag: GameplayTag,
    scorer: Box<dyn TargetScorer>,
    binding: Option<Binding>,
    /// Targets whose dead tag appeared while bound.
    deaths: Rc<RefCell<VecDeque<ActorId>>>,
    delay: Option<f32>,
    on_acquired: MulticastDelegate<TargetAcquired>,
}

impl std::fmt::Debug for TargetAcquisition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetAcquisition")
            .field("observer", &self.observer)
            .field("scorer", &self.scorer.name())
            .field("binding", &self.binding)
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

impl TargetAcquisition {
    /// Create an unbound acquisition scoring by distance.
    pub fn new(observer: ActorId, dead_tag: GameplayTag) -> Self {
        Self {
            observer,
            dead_tag,
            scorer: Box::new(DistanceScorer),
            binding: None,
            deaths: Rc::new(RefCell::new(VecDeque::new())),
            delay: None,
            on_acquired: MulticastDelegate::new(),
        }
    }

    /// Replace the scorer (builder pattern).
    #[must_use]
    pub fn with_scorer(mut self, scorer: Box<dyn TargetScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    #[must_use]
    pub fn observer(&self) -> ActorId {
        self.observer
    }

    /// The currently bound target.
    #[must_use]
    pub fn target(&self) -> Option<ActorId> {
        self.binding.as_ref().map(|b| b.target)
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    /// Score `candidates` from `origin`, then bind the winner. Returns the
    /// new target.
    ///
    /// Keeps the existing binding when the winner is already bound.
    pub fn reacquire(
        &mut self,
        origin: Vec3,
        candidates: &[Candidate],
        host: &mut dyn TargetHost,
    ) -> Option<ActorId> {
        let best = select_best(self.scorer.as_ref(), origin, candidates, self.observer);
        debug!(
            observer = %self.observer,
            scorer = self.scorer.name(),
            candidates = candidates.len(),
            target = ?best,
            "reacquired target"
        );
        if best.is_some() && best == self.target() {
            return best;
        }
        match best {
            Some(target) => {
                self.bind(target, host);
            }
            None => {
                let previous = self.target();
                self.unbind(host);
                if previous.is_some() {
                    self.notify(previous, None);
                }
            }
        }
        self.target()
    }

    /// Bind to `target`, replacing any existing binding. Returns `false` if
    /// the target does not exist.
    ///
    /// A target that is already dead is bound and immediately reported
    /// through the mailbox, so the next poll reacquires.
    pub fn bind(&mut self, target: ActorId, host: &mut dyn TargetHost) -> bool {
        let previous = self.target();
        self.unbind(host);
        let Some(system) = host.system_mut(target) else {
            if previous.is_some() {
                self.notify(previous, None);
            }
            return false;
        };

        let deaths = Rc::clone(&self.deaths);
        let subscription = system.subscribe_tag(&self.dead_tag, TagEventKind::NewOrRemoved, move |change| {
            if change.appeared() {
                deaths.borrow_mut().push_back(target);
            }
        });
        if system.is_dead() {
            self.deaths.borrow_mut().push_back(target);
        }
        self.binding = Some(Binding { target, subscription });
        debug!(observer = %self.observer, %target, "bound target");
        self.notify(previous, Some(target));
        true
    }

    /// Drop the binding and its subscription. Returns `false` if unbound.
    pub fn unbind(&mut self, host: &mut dyn TargetHost) -> bool {
        let Some(binding) = self.binding.take() else {
            return false;
        };
        if let Some(system) = host.system_mut(binding.target) {
            system.unsubscribe_tag(&binding.subscription);
        }
        self.deaths.borrow_mut().clear();
        debug!(observer = %self.observer, target = %binding.target, "unbound target");
        true
    }

    /// The bound target was destroyed: its tag index went with it, so the
    /// binding is dropped without unsubscribing. Returns `true` if `actor`
    /// was the bound target.
    pub fn target_destroyed(&mut self, actor: ActorId) -> bool {
        if self.target() != Some(actor) {
            return false;
        }
        self.binding = None;
        self.deaths.borrow_mut().clear();
        self.notify(Some(actor), None);
        true
    }

    /// Drain the mailbox. Returns `true` if the currently bound target died.
    ///
    /// Signals for targets that are no longer bound are discarded.
    pub fn poll_target_died(&mut self) -> bool {
        let target = self.target();
        let mut died = false;
        for actor in self.deaths.borrow_mut().drain(..) {
            if Some(actor) == target {
                died = true;
            }
        }
        if died {
            debug!(observer = %self.observer, target = ?target, "bound target died");
        }
        died
    }

    /// Arm the one-shot delayed reacquisition.
    pub fn schedule(&mut self, delay: f32) {
        self.delay = Some(delay);
    }

    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        self.delay.is_some()
    }

    /// Advance the delay timer. Returns `true` once when it fires.
    pub fn tick(&mut self, dt: f32) -> bool {
        let Some(remaining) = self.delay.as_mut() else {
            return false;
        };
        *remaining -= dt;
        if *remaining <= 0.0 {
            self.delay = None;
            return true;
        }
        false
    }

    pub fn subscribe_acquired(&mut self, callback: impl FnMut(&TargetAcquired) + 'static) -> DelegateHandle {
        self.on_acquired.add(callback)
    }

    pub fn unsubscribe_acquired(&mut self, handle: DelegateHandle) -> bool {
        self.on_acquired.remove(handle)
    }

    fn notify(&mut self, previous: Option<ActorId>, target: Option<ActorId>) {
        self.on_acquired.broadcast(&TargetAcquired {
            observer: self.observer,
            previous,
            target,
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rustc_hash::FxHashMap;

    use super::*;
    use crate::abilities::BehaviorRegistry;
    use crate::attributes::AttributeStore;
    use crate::core::NetSide;
    use crate::effects::{EffectDefinition, EffectId};

    const OBSERVER: ActorId = ActorId(100);

    struct Host {
        systems: FxHashMap<ActorId, AbilitySystem>,
    }

    impl TargetHost for Host {
        fn system_mut(&mut self, actor: ActorId) -> Option<&mut AbilitySystem> {
            self.systems.get_mut(&actor)
        }
    }

    impl Host {
        fn with_actors(ids: &[u32]) -> Self {
            let behaviors = Arc::new(BehaviorRegistry::new());
            let systems = ids
                .iter()
                .map(|id| {
                    let actor = ActorId(*id);
                    let system =
                        AbilitySystem::new(actor, NetSide::Authority, AttributeStore::enemy(), Arc::clone(&behaviors));
                    (actor, system)
                })
                .collect();
            Self { systems }
        }

        fn kill(&mut self, actor: ActorId) {
            let dead = Arc::new(EffectDefinition::infinite(EffectId(1), "Dead").with_granted_tag("State.Dead"));
            let system = self.systems.get_mut(&actor).unwrap();
            let spec = system.make_outgoing_spec(dead);
            system.apply_effect_to_self(spec).unwrap();
        }

        fn subscribers(&self, actor: ActorId) -> usize {
            self.systems[&actor]
                .tags()
                .subscriber_count(&GameplayTag::new("State.Dead"))
        }
    }

    fn candidates(host: &Host, spots: &[(u32, f32)]) -> Vec<Candidate> {
        spots
            .iter()
            .map(|(id, x)| {
                let actor = ActorId(*id);
                let mut candidate = Candidate::new(actor, Vec3::new(*x, 0.0, 0.0));
                candidate.is_dead = host.systems[&actor].is_dead();
                candidate
            })
            .collect()
    }

    fn acquisition() -> TargetAcquisition {
        TargetAcquisition::new(OBSERVER, GameplayTag::new("State.Dead"))
    }

    #[test]
    fn test_rebind_on_death() {
        let mut host = Host::with_actors(&[1, 2, 3]);
        let mut acq = acquisition();
        let spots = [(1, 5.0), (2, 2.0), (3, 9.0)];

        let found = acq.reacquire(Vec3::ZERO, &candidates(&host, &spots), &mut host);
        assert_eq!(found, Some(ActorId(2)));
        assert_eq!(host.subscribers(ActorId(2)), 1);

        host.kill(ActorId(2));
        assert!(acq.poll_target_died());
        let found = acq.reacquire(Vec3::ZERO, &candidates(&host, &spots), &mut host);
        assert_eq!(found, Some(ActorId(1)));
        assert_eq!(host.subscribers(ActorId(2)), 0);
        assert_eq!(host.subscribers(ActorId(1)), 1);
    }

    #[test]
    fn test_binding_dead_target_signals() {
        let mut host = Host::with_actors(&[1]);
        host.kill(ActorId(1));
        let mut acq = acquisition();

        assert!(acq.bind(ActorId(1), &mut host));
        assert!(acq.poll_target_died());
    }

    #[test]
    fn test_stale_signal_ignored() {
        let mut host = Host::with_actors(&[1, 2]);
        let mut acq = acquisition();
        acq.bind(ActorId(1), &mut host);
        host.kill(ActorId(1));
        acq.bind(ActorId(2), &mut host);
        assert!(!acq.poll_target_died());
    }

    #[test]
    fn test_no_candidates_unbinds() {
        let mut host = Host::with_actors(&[1]);
        let mut acq = acquisition();
        acq.bind(ActorId(1), &mut host);

        assert_eq!(acq.reacquire(Vec3::ZERO, &[], &mut host), None);
        assert!(!acq.is_bound());
        assert_eq!(host.subscribers(ActorId(1)), 0);
    }

    #[test]
    fn test_acquired_notifications() {
        let mut host = Host::with_actors(&[1, 2]);
        let mut acq = acquisition();
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        acq.subscribe_acquired(move |e| sink.borrow_mut().push(*e));

        acq.bind(ActorId(1), &mut host);
        acq.bind(ActorId(2), &mut host);
        assert!(acq.target_destroyed(ActorId(2)));

        let log = log.borrow();
        assert_eq!(log.len(), 3);
        assert_eq!(log[1].previous, Some(ActorId(1)));
        assert_eq!(log[1].target, Some(ActorId(2)));
        assert_eq!(log[2].target, None);
    }

    #[test]
    fn test_delay_fires_once() {
        let mut acq = acquisition();
        acq.schedule(0.5);
        assert!(!acq.tick(0.25));
        assert!(acq.tick(0.25));
        assert!(!acq.tick(1.0));
        assert!(!acq.is_scheduled());
    }
}
