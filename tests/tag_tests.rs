//! Status tag index integration tests.
//!
//! These tests verify reference counting and that transition notifications
//! fire only when a label appears or disappears.

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;

use rust_abilities::tags::{GameplayTag, StatusTagIndex, TagEventKind};

fn recorder(index: &mut StatusTagIndex, tag: &GameplayTag) -> Rc<RefCell<Vec<(u32, u32)>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    index.subscribe(tag, TagEventKind::NewOrRemoved, move |change| {
        sink.borrow_mut().push((change.previous_count, change.new_count));
    });
    seen
}

/// Test that a tag held by two sources survives one removal silently.
#[test]
fn test_shared_tag_removed_once() {
    let mut index = StatusTagIndex::new();
    let stunned = GameplayTag::new("State.Stunned");
    let seen = recorder(&mut index, &stunned);

    index.add_tag(&stunned);
    index.add_tag(&stunned);
    index.remove_tag(&stunned);
    assert!(index.has_tag(&stunned));
    assert_eq!(*seen.borrow(), vec![(0, 1)]);

    index.remove_tag(&stunned);
    assert!(!index.has_tag(&stunned));
    assert_eq!(*seen.borrow(), vec![(0, 1), (1, 0)]);
}

/// Test that removing an absent tag does nothing.
#[test]
fn test_remove_absent_is_noop() {
    let mut index = StatusTagIndex::new();
    let tag = GameplayTag::new("State.Burning");
    let seen = recorder(&mut index, &tag);

    assert_eq!(index.remove_tag(&tag), 0);
    assert!(seen.borrow().is_empty());
    assert!(index.is_empty());
}

/// Test that count-change subscribers see every step.
#[test]
fn test_any_count_change_sees_every_step() {
    let mut index = StatusTagIndex::new();
    let tag = GameplayTag::new("Buff.Might");
    let steps = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&steps);
    let subscription = index.subscribe(&tag, TagEventKind::AnyCountChange, move |_| *sink.borrow_mut() += 1);

    index.add_tag(&tag);
    index.add_tag(&tag);
    index.remove_tag(&tag);
    assert_eq!(*steps.borrow(), 3);

    assert!(index.unsubscribe(&subscription));
    assert!(!index.unsubscribe(&subscription));
    index.add_tag(&tag);
    assert_eq!(*steps.borrow(), 3);
}

/// Test hierarchical queries against present tags.
#[test]
fn test_matching_parent_query() {
    let mut index = StatusTagIndex::new();
    index.add_tag(&GameplayTag::new("State.InAir.Jumping"));

    assert!(index.has_matching(&GameplayTag::new("State.InAir")));
    assert!(!index.has_tag(&GameplayTag::new("State.InAir")));
    assert!(!index.has_matching(&GameplayTag::new("State.In")));
}

proptest! {
    /// The count always equals adds minus effective removes, and transitions
    /// alternate appear/disappear.
    #[test]
    fn test_counts_match_model(ops in prop::collection::vec(any::<bool>(), 0..64)) {
        let mut index = StatusTagIndex::new();
        let tag = GameplayTag::new("State.Test");
        let seen = recorder(&mut index, &tag);
        let mut model: u32 = 0;

        for add in ops {
            if add {
                index.add_tag(&tag);
                model += 1;
            } else {
                index.remove_tag(&tag);
                model = model.saturating_sub(1);
            }
            prop_assert_eq!(index.count(&tag), model);
            prop_assert_eq!(index.has_tag(&tag), model > 0);
        }

        for (i, (previous, new)) in seen.borrow().iter().enumerate() {
            if i % 2 == 0 {
                prop_assert_eq!((*previous, *new), (0, 1));
            } else {
                prop_assert_eq!((*previous, *new), (1, 0));
            }
        }
    }
}
