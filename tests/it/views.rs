//! View behavior over a mutating registry
//!
//! Views are re-acquired after every mutation; persistent view indices are
//! created once and maintained by the registry in between.

use sparsecs::prelude::*;

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
struct Int(i32);

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
struct Chr(char);

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
struct Uint(u32);

fn sorted(mut ents: Vec<Entity>) -> Vec<Entity> {
    ents.sort_by_key(|ent| ent.index());
    ents
}

#[test]
fn raw_view_iterates_components_in_reverse_insertion_order() {
    let mut reg = Registry::default();

    for i in 0..3 {
        let ent = reg.create();
        reg.assign(ent, Int(i));
    }

    let view = reg.raw_view::<Int>();
    assert_eq!(view.len(), 3);

    // index 0 is the most recently added component
    let vals: Vec<i32> = view.iter().map(|int| int.0).collect();
    assert_eq!(vals, [2, 1, 0]);
    assert_eq!(view[0], Int(2));
    assert_eq!(view[2], Int(0));

    // the dense arrays are exposed in insertion order
    assert_eq!(view.raw(), [Int(0), Int(1), Int(2)]);
    assert_eq!(view.data().len(), 3);
}

#[test]
fn raw_view_mutation_is_observable() {
    let mut reg = Registry::default();
    let e0 = reg.create_with(Int(0));
    let e1 = reg.create_with(Int(1));

    {
        let mut view = reg.raw_view_mut::<Int>();
        view.each_mut(|int| int.0 += 10);
        view[0].0 += 100;
    }

    assert_eq!(reg.get::<Int>(e0), Some(&Int(10)));
    assert_eq!(reg.get::<Int>(e1), Some(&Int(111)));
}

#[test]
fn single_view_entities_and_find() {
    let mut reg = Registry::default();

    let e0 = reg.create_with(Int(0));
    let e1 = reg.create_with(Int(1));
    let e2 = reg.create_with(Int(2));

    let view = reg.view::<Int>();
    assert_eq!(view.iter().collect::<Vec<_>>(), [e2, e1, e0]);
    assert_eq!(view[0], e2);

    assert!(view.contains(e1));
    assert_eq!(view.get(e1), Some(&Int(1)));

    // find positions the iterator at the entity, then sweeps the rest
    assert_eq!(view.find(e1).collect::<Vec<_>>(), [e1, e0]);
    assert_eq!(view.find(e0).collect::<Vec<_>>(), [e0]);

    // find-then-iterate agrees with contains
    for ent in [e0, e1, e2] {
        assert_eq!(view.find(ent).next(), Some(ent));
    }
}

#[test]
fn single_view_find_misses_removed_entity() {
    let mut reg = Registry::default();

    let e0 = reg.create_with(Int(0));
    reg.remove::<Int>(e0);

    let view = reg.view::<Int>();
    assert!(!view.contains(e0));
    assert_eq!(view.find(e0).next(), None);
}

#[test]
fn multi_view_joins_on_the_smallest_pool() {
    let mut reg = Registry::default();

    let e0 = reg.create_with((Int(0), Chr('a')));
    let e1 = reg.create_with(Int(1));
    let e2 = reg.create_with((Int(2), Chr('b')));

    let view = reg.multi_view::<(Int, Chr)>();

    // len is the driving pool's size, an upper bound
    assert_eq!(view.len(), 2);
    assert!(!view.is_empty());

    assert!(view.contains(e0));
    assert!(!view.contains(e1));

    assert_eq!(view.iter().collect::<Vec<_>>(), [e2, e0]);
    assert_eq!(view.get(e2), Some((&Int(2), &Chr('b'))));
    assert_eq!(view.get(e1), None);

    let mut seen = Vec::new();
    view.each(|ent, int, chr| seen.push((ent, int.0, chr.0)));
    assert_eq!(seen, [(e2, 2, 'b'), (e0, 0, 'a')]);
}

/// The driving pool's dense order after a removal is append + swap-and-pop;
/// `find` sweeps the remaining slots in view order without wrapping.
#[test]
fn multi_view_find_order_after_removal() {
    let mut reg = Registry::default();

    let e0 = reg.create_with((Int(0), Chr('a')));
    let e1 = reg.create_with((Int(1), Chr('b')));
    let e2 = reg.create_with((Int(2), Chr('c')));
    let e3 = reg.create_with((Int(3), Chr('d')));

    reg.remove::<Int>(e1);

    let view = reg.multi_view::<(Int, Chr)>();
    assert_eq!(view.find(e2).collect::<Vec<_>>(), [e2, e3, e0]);
    assert_eq!(view.find(e1).next(), None);
}

#[test]
fn multi_view_mut_writes_components() {
    let mut reg = Registry::default();

    let e0 = reg.create_with((Int(0), Uint(10)));
    let _e1 = reg.create_with(Int(1));

    {
        let mut view = reg.multi_view_mut::<(Int, Uint)>();
        view.each_mut(|_ent, int, uint| {
            int.0 += 1;
            uint.0 += 1;
        });

        let (int, uint) = view.get_mut(e0).unwrap();
        int.0 *= 2;
        uint.0 *= 2;
    }

    assert_eq!(reg.get::<Int>(e0), Some(&Int(2)));
    assert_eq!(reg.get::<Uint>(e0), Some(&Uint(22)));
    assert_eq!(reg.get::<Int>(_e1), Some(&Int(1)));
}

/// S1: a persistent view index follows assigns and removes of its include
/// types.
#[test]
fn persistent_view_basics() {
    let mut reg = Registry::default();

    let e0 = reg.create();
    reg.assign(e0, Chr('a'));
    let e1 = reg.create();
    reg.assign(e1, Int(1));
    reg.assign(e1, Chr('b'));

    {
        let view = reg.persistent_view::<(Int, Chr)>();
        assert_eq!(view.len(), 1);
        assert_eq!(view.iter().collect::<Vec<_>>(), [e1]);
        assert_eq!(view.get(e1), Some((&Int(1), &Chr('b'))));
    }

    reg.assign(e0, Int(0));
    {
        let view = reg.persistent_view::<(Int, Chr)>();
        assert_eq!(view.len(), 2);
        assert!(view.contains(e0));
        assert!(view.contains(e1));
    }

    reg.remove::<Int>(e0);
    {
        let view = reg.persistent_view::<(Int, Chr)>();
        assert_eq!(view.len(), 1);
        assert_eq!(view.iter().collect::<Vec<_>>(), [e1]);
    }
}

/// S2: exclude types erase on assign and re-admit on remove.
#[test]
fn persistent_view_exclude_maintenance() {
    let mut reg = Registry::default();

    let e0 = reg.create_with(Int(0));
    let e1 = reg.create_with((Int(1), Chr('a')));

    {
        let view = reg.persistent_view_excluding::<(Int,), Chr>();
        assert_eq!(view.len(), 1);
        assert!(view.contains(e0));
    }

    let e2 = reg.create_with(Int(2));
    let e3 = reg.create_with((Int(3), Chr('b')));

    {
        let view = reg.persistent_view_excluding::<(Int,), Chr>();
        assert_eq!(view.len(), 2);
        assert_eq!(sorted(view.iter().collect()), sorted(vec![e0, e2]));
    }

    reg.assign(e0, Chr('c'));
    reg.assign(e2, Chr('d'));
    {
        let view = reg.persistent_view_excluding::<(Int,), Chr>();
        assert!(view.is_empty());
    }

    reg.remove::<Chr>(e1);
    reg.remove::<Chr>(e3);
    {
        let view = reg.persistent_view_excluding::<(Int,), Chr>();
        assert_eq!(sorted(view.iter().collect()), sorted(vec![e1, e3]));
    }
}

/// An include type held by no entity keeps the index empty until the first
/// matching assign.
#[test]
fn persistent_view_waits_for_missing_include_type() {
    let mut reg = Registry::default();

    let e0 = reg.create_with(Int(0));

    {
        let view = reg.persistent_view::<(Int, Uint)>();
        assert!(view.is_empty());
    }

    reg.assign(e0, Uint(0));
    {
        let view = reg.persistent_view::<(Int, Uint)>();
        assert_eq!(view.iter().collect::<Vec<_>>(), [e0]);
    }
}

/// S5: pool sort then view sort propagates an ascending iteration order.
#[test]
fn persistent_view_sort_propagation() {
    let mut reg = Registry::default();

    for i in 0..3u32 {
        let ent = reg.create();
        reg.assign(ent, Uint(i));
        reg.assign(ent, Int(i as i32));
    }

    // reverse insertion order before the sort
    {
        let vals: Vec<u32> = reg.raw_view::<Uint>().iter().map(|u| u.0).collect();
        assert_eq!(vals, [2, 1, 0]);
    }
    {
        // force the index into existence before sorting
        let view = reg.persistent_view::<(Uint, Int)>();
        assert_eq!(view.len(), 3);
    }

    reg.sort_by::<Uint>(|a, b| a.0.cmp(&b.0));

    // the pool iterates ascending now
    {
        let vals: Vec<u32> = reg.raw_view::<Uint>().iter().map(|u| u.0).collect();
        assert_eq!(vals, [0, 1, 2]);
    }

    // and the persistent view after its own sort
    {
        let mut view = reg.persistent_view::<(Uint, Int)>();
        view.sort::<Uint>();

        let mut vals = Vec::new();
        view.each(|_ent, uint, int| vals.push((uint.0, int.0)));
        assert_eq!(vals, [(0, 0), (1, 1), (2, 2)]);
    }
}

/// S6: destroying an entity erases it from the index; a recycled slot does
/// not resurrect it.
#[test]
fn persistent_view_destroy_reindex() {
    let mut reg = Registry::default();

    let e0 = reg.create_with((Int(0), Uint(0)));
    let e1 = reg.create_with((Int(1), Uint(1)));

    {
        let view = reg.persistent_view::<(Int, Uint)>();
        assert_eq!(view.len(), 2);
    }

    reg.destroy(e0);
    let e2 = reg.create();
    reg.assign(e2, Int(2));

    {
        let view = reg.persistent_view::<(Int, Uint)>();
        assert_eq!(view.len(), 1);
        assert_eq!(view.iter().collect::<Vec<_>>(), [e1]);
        assert!(!view.contains(e2));
    }
}

/// Completeness: membership in the index is exactly "has every include, no
/// exclude" after an arbitrary mutation sequence.
#[test]
fn persistent_index_completeness() {
    let mut reg = Registry::default();

    let ents: Vec<Entity> = (0..4).map(|_| reg.create()).collect();

    reg.assign(ents[0], Int(0));
    reg.assign(ents[0], Uint(0));
    reg.assign(ents[1], Int(1));
    reg.assign(ents[2], Int(2));
    reg.assign(ents[2], Uint(2));
    reg.assign(ents[2], Chr('x'));
    reg.assign(ents[3], Uint(3));

    {
        let _ = reg.persistent_view_excluding::<(Int, Uint), Chr>();
    }

    // mutate behind the existing index
    reg.remove::<Uint>(ents[0]);
    reg.assign(ents[1], Uint(1));
    reg.remove::<Chr>(ents[2]);
    reg.assign(ents[3], Chr('y'));
    reg.assign(ents[3], Int(3));

    let in_view: Vec<bool> = {
        let view = reg.persistent_view_excluding::<(Int, Uint), Chr>();
        ents.iter().map(|ent| view.contains(*ent)).collect()
    };

    for (ent, in_view) in ents.iter().zip(&in_view) {
        let matches =
            reg.has::<Int>(*ent) && reg.has::<Uint>(*ent) && !reg.has::<Chr>(*ent);
        assert_eq!(*in_view, matches, "index disagrees about {}", ent);
    }
}

/// A multi view and a persistent view over the same include list agree on
/// the matched entity set.
#[test]
fn multi_and_persistent_views_agree() {
    let mut reg = Registry::default();

    for i in 0..5 {
        let ent = reg.create_with(Int(i));
        if i % 2 == 0 {
            reg.assign(ent, Chr('e'));
        }
    }

    let on_the_fly: Vec<Entity> = reg.multi_view::<(Int, Chr)>().iter().collect();
    let indexed: Vec<Entity> = {
        let view = reg.persistent_view::<(Int, Chr)>();
        view.iter().collect()
    };

    assert_eq!(sorted(on_the_fly), sorted(indexed));
}

/// S4: a runtime view built while one pool is missing is empty, and an
/// empty id range is an empty view.
#[test]
fn runtime_view_missing_pool_and_empty_range() {
    let mut reg = Registry::default();

    let e0 = reg.create_with(Int(0));
    let int_id = reg.component_id::<Int>();
    let chr_id = reg.component_id::<Chr>();

    {
        // no pool for `Chr` exists yet
        let view = reg.runtime_view(&[int_id, chr_id]);
        assert!(view.is_empty());
        assert_eq!(view.len(), 0);
        assert!(!view.contains(e0));
        assert_eq!(view.iter().next(), None);
    }

    {
        let view = reg.runtime_view(&[]);
        assert!(view.is_empty());
        assert_eq!(view.len(), 0);
        assert!(!view.contains(e0));
    }

    // a view built after the pool exists sees the join
    reg.assign(e0, Chr('a'));
    {
        let view = reg.runtime_view(&[int_id, chr_id]);
        assert!(view.contains(e0));
        assert_eq!(view.iter().collect::<Vec<_>>(), [e0]);
    }
}

/// Two runtime views over the same ids and registry state yield identical
/// sequences, and match the typed join.
#[test]
fn runtime_view_idempotence() {
    let mut reg = Registry::default();

    for i in 0..4 {
        let ent = reg.create_with(Int(i));
        if i != 2 {
            reg.assign(ent, Uint(i as u32));
        }
    }

    let int_id = reg.component_id::<Int>();
    let uint_id = reg.component_id::<Uint>();
    let ids = [int_id, uint_id];

    let first: Vec<Entity> = reg.runtime_view(&ids).iter().collect();
    let second: Vec<Entity> = reg.runtime_view(&ids).iter().collect();
    assert_eq!(first, second);

    let typed: Vec<Entity> = reg.multi_view::<(Int, Uint)>().iter().collect();
    assert_eq!(first, typed);

    let mut visited = Vec::new();
    reg.runtime_view(&ids).each(|ent| visited.push(ent));
    assert_eq!(visited, first);
}
