//! Effect definitions and specs.
//!
//! An [`EffectDefinition`] is immutable content: what an effect does, how
//! long it lasts and which labels it carries. An [`EffectSpec`] is one
//! concrete use of a definition: the definition plus who applied it and any
//! magnitudes supplied by the caller at application time.
//!
//! ## Duration Policies
//!
//! - `Instant`: modifies base values once and is never stored.
//! - `Infinite`: stays active until explicitly removed.
//! - `HasDuration`: stays active until removed or until its time runs out.
//!
//! ```
//! use rust_abilities::attributes::{Attribute, ModOp};
//! use rust_abilities::effects::{EffectDefinition, EffectId};
//!
//! let haste = EffectDefinition::timed(EffectId::new(4), "Haste", 5.0)
//!     .with_modifier(Attribute::MoveSpeedMultiplier, ModOp::Multiply, 1.5)
//!     .with_granted_tag("Buff.Haste");
//!
//! assert!(!haste.is_instant());
//! assert_eq!(haste.granted_tags.len(), 1);
//! ```

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::attributes::{Attribute, ModOp, Modification};
use crate::core::{ActorId, Vec3};
use crate::tags::{GameplayTag, TagContainer};

use super::error::ApplicationFailure;

/// Unique identifier for an effect definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EffectId(pub u32);

impl EffectId {
    /// Create a new effect ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for EffectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Effect({})", self.0)
    }
}

/// Where a numeric value comes from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Magnitude {
    /// A fixed value.
    Scalar(f32),
    /// Supplied by the applier on the spec, keyed by a data tag
    /// (for example an interaction's gold cost under `Data.Cost.Gold`).
    SetByCaller(GameplayTag),
}

impl Magnitude {
    /// Resolve against a spec's caller-supplied values.
    ///
    /// Returns the missing key on failure.
    pub fn resolve(&self, set_by_caller: &FxHashMap<GameplayTag, f32>) -> Result<f32, GameplayTag> {
        match self {
            Magnitude::Scalar(v) => Ok(*v),
            Magnitude::SetByCaller(tag) => set_by_caller.get(tag).copied().ok_or_else(|| tag.clone()),
        }
    }
}

/// How long an applied effect stays active.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub enum DurationPolicy {
    #[default]
    Instant,
    Infinite,
    /// Seconds, resolved at application time.
    HasDuration(Magnitude),
}

/// One attribute modifier carried by a definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModifierDef {
    pub attribute: Attribute,
    pub op: ModOp,
    pub magnitude: Magnitude,
}

/// Immutable effect content.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EffectDefinition {
    pub id: EffectId,

    /// Human-readable name (for logs).
    pub name: String,

    #[serde(default)]
    pub duration: DurationPolicy,

    #[serde(default)]
    pub modifiers: Vec<ModifierDef>,

    /// Labels describing the effect itself, matched by "remove effects with
    /// tags" queries.
    #[serde(default)]
    pub asset_tags: TagContainer,

    /// Labels added to the target's tag index while the effect is active.
    /// Ignored for instant effects.
    #[serde(default)]
    pub granted_tags: TagContainer,

    /// The target must carry all of these for application to succeed.
    #[serde(default)]
    pub application_required_tags: TagContainer,

    /// The target is immune while it carries any of these.
    #[serde(default)]
    pub application_blocked_tags: TagContainer,
}

impl EffectDefinition {
    /// Create an instant effect with no modifiers.
    pub fn new(id: EffectId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            duration: DurationPolicy::Instant,
            modifiers: Vec::new(),
            asset_tags: TagContainer::new(),
            granted_tags: TagContainer::new(),
            application_required_tags: TagContainer::new(),
            application_blocked_tags: TagContainer::new(),
        }
    }

    /// Create an instant effect.
    pub fn instant(id: EffectId, name: impl Into<String>) -> Self {
        Self::new(id, name)
    }

    /// Create an effect that lasts until removed.
    pub fn infinite(id: EffectId, name: impl Into<String>) -> Self {
        Self::new(id, name).with_duration(DurationPolicy::Infinite)
    }

    /// Create an effect lasting `seconds`.
    pub fn timed(id: EffectId, name: impl Into<String>, seconds: f32) -> Self {
        Self::new(id, name).with_duration(DurationPolicy::HasDuration(Magnitude::Scalar(seconds)))
    }

    /// Set the duration policy (builder pattern).
    #[must_use]
    pub fn with_duration(mut self, duration: DurationPolicy) -> Self {
        self.duration = duration;
        self
    }

    /// Add a fixed-value modifier (builder pattern).
    #[must_use]
    pub fn with_modifier(self, attribute: Attribute, op: ModOp, value: f32) -> Self {
        self.with_modifier_magnitude(attribute, op, Magnitude::Scalar(value))
    }

    /// Add a modifier with any magnitude source (builder pattern).
    #[must_use]
    pub fn with_modifier_magnitude(mut self, attribute: Attribute, op: ModOp, magnitude: Magnitude) -> Self {
        self.modifiers.push(ModifierDef {
            attribute,
            op,
            magnitude,
        });
        self
    }

    /// Add an asset tag (builder pattern).
    #[must_use]
    pub fn with_asset_tag(mut self, tag: impl Into<GameplayTag>) -> Self {
        self.asset_tags.push(tag.into());
        self
    }

    /// Add a granted tag (builder pattern).
    #[must_use]
    pub fn with_granted_tag(mut self, tag: impl Into<GameplayTag>) -> Self {
        self.granted_tags.push(tag.into());
        self
    }

    /// Require a tag on the target (builder pattern).
    #[must_use]
    pub fn with_required_tag(mut self, tag: impl Into<GameplayTag>) -> Self {
        self.application_required_tags.push(tag.into());
        self
    }

    /// Make targets carrying `tag` immune (builder pattern).
    #[must_use]
    pub fn with_blocked_tag(mut self, tag: impl Into<GameplayTag>) -> Self {
        self.application_blocked_tags.push(tag.into());
        self
    }

    #[must_use]
    pub fn is_instant(&self) -> bool {
        matches!(self.duration, DurationPolicy::Instant)
    }
}

/// Who applied an effect, and from where.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectContext {
    /// The actor responsible (the attacker, the ability owner).
    pub instigator: Option<ActorId>,
    /// The object that physically caused it (a projectile, an exploding enemy).
    pub causer: Option<ActorId>,
    pub origin: Option<Vec3>,
}

impl EffectContext {
    /// Context for an effect an actor applies to itself.
    #[must_use]
    pub fn from_actor(actor: ActorId) -> Self {
        Self {
            instigator: Some(actor),
            causer: Some(actor),
            origin: None,
        }
    }

    #[must_use]
    pub fn with_origin(mut self, origin: Vec3) -> Self {
        self.origin = Some(origin);
        self
    }
}

/// One concrete application request.
#[derive(Clone, Debug)]
pub struct EffectSpec {
    pub definition: Arc<EffectDefinition>,
    pub context: EffectContext,
    pub set_by_caller: FxHashMap<GameplayTag, f32>,
}

impl EffectSpec {
    pub fn new(definition: Arc<EffectDefinition>) -> Self {
        Self {
            definition,
            context: EffectContext::default(),
            set_by_caller: FxHashMap::default(),
        }
    }

    /// Set the context (builder pattern).
    #[must_use]
    pub fn with_context(mut self, context: EffectContext) -> Self {
        self.context = context;
        self
    }

    /// Supply a caller magnitude (builder pattern).
    #[must_use]
    pub fn with_set_by_caller(mut self, key: impl Into<GameplayTag>, value: f32) -> Self {
        self.set_by_caller.insert(key.into(), value);
        self
    }

    /// Supply a caller magnitude in place.
    pub fn set_by_caller(&mut self, key: impl Into<GameplayTag>, value: f32) {
        self.set_by_caller.insert(key.into(), value);
    }

    /// Resolve every modifier to a concrete modification.
    pub fn resolve_modifiers(&self) -> Result<Vec<(Attribute, Modification)>, ApplicationFailure> {
        self.definition
            .modifiers
            .iter()
            .map(|m| {
                let magnitude = self.resolve(&m.magnitude)?;
                Ok((m.attribute, Modification::new(m.op, magnitude)))
            })
            .collect()
    }

    /// Resolve the duration: `None` for instant and infinite effects.
    pub fn resolve_duration(&self) -> Result<Option<f32>, ApplicationFailure> {
        match &self.definition.duration {
            DurationPolicy::Instant | DurationPolicy::Infinite => Ok(None),
            DurationPolicy::HasDuration(magnitude) => self.resolve(magnitude).map(Some),
        }
    }

    fn resolve(&self, magnitude: &Magnitude) -> Result<f32, ApplicationFailure> {
        magnitude
            .resolve(&self.set_by_caller)
            .map_err(|tag| ApplicationFailure::MissingSetByCaller {
                effect: self.definition.id,
                tag,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let def = EffectDefinition::infinite(EffectId(1), "Dead")
            .with_granted_tag("State.Dead")
            .with_asset_tag("Effect.Death")
            .with_blocked_tag("State.Invulnerable")
            .with_required_tag("State.Alive");

        assert_eq!(def.duration, DurationPolicy::Infinite);
        assert_eq!(def.granted_tags[0].as_str(), "State.Dead");
        assert_eq!(def.asset_tags.len(), 1);
        assert_eq!(def.application_blocked_tags.len(), 1);
        assert_eq!(def.application_required_tags.len(), 1);
    }

    #[test]
    fn test_set_by_caller_resolution() {
        let def = EffectDefinition::instant(EffectId(2), "InteractCost").with_modifier_magnitude(
            Attribute::Gold,
            ModOp::Add,
            Magnitude::SetByCaller("Data.Cost.Gold".into()),
        );
        let spec = EffectSpec::new(Arc::new(def));

        let err = spec.resolve_modifiers().unwrap_err();
        assert_eq!(
            err,
            ApplicationFailure::MissingSetByCaller {
                effect: EffectId(2),
                tag: "Data.Cost.Gold".into(),
            }
        );

        let spec = spec.with_set_by_caller("Data.Cost.Gold", -25.0);
        let mods = spec.resolve_modifiers().unwrap();
        assert_eq!(mods, vec![(Attribute::Gold, Modification::add(-25.0))]);
    }

    #[test]
    fn test_duration_resolution() {
        let timed = EffectSpec::new(Arc::new(EffectDefinition::timed(EffectId(3), "Cooldown", 2.0)));
        assert_eq!(timed.resolve_duration().unwrap(), Some(2.0));

        let infinite = EffectSpec::new(Arc::new(EffectDefinition::infinite(EffectId(4), "Sprint")));
        assert_eq!(infinite.resolve_duration().unwrap(), None);
    }

    #[test]
    fn test_definition_json() {
        let json = r#"{
            "id": 7,
            "name": "Jump",
            "duration": "Infinite",
            "granted_tags": ["State.InAir", "State.InAir.Jumping"]
        }"#;
        let def: EffectDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(def.id, EffectId(7));
        assert_eq!(def.duration, DurationPolicy::Infinite);
        assert_eq!(def.granted_tags.len(), 2);
        assert!(def.modifiers.is_empty());
    }
}
