//! The only integration test "crate"

mod views;

use sparsecs::prelude::*;

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
struct U(usize);

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
struct I(isize);

#[test]
fn registry_api() {
    let mut reg = Registry::default();

    reg.register::<U>();
    reg.register::<I>();

    let e1 = reg.create_with((U(10), I(-10)));
    let e2 = reg.create_with((U(20), I(-20)));
    let e3 = reg.create_with((U(30), I(-30)));

    assert_eq!(reg.remove::<I>(e1), Some(I(-10)));
    assert!(!reg.has::<I>(e1));
    assert!(reg.has::<U>(e1));

    assert!(reg.destroy(e2));
    assert!(!reg.destroy(e2));
    assert!(!reg.contains(e2));

    // destruction swaps the last entity into the hole, then the slot is
    // recycled by the next create
    let e2 = reg.create();
    assert_eq!(reg.entities().iter().collect::<Vec<_>>(), [&e1, &e3, &e2]);

    assert_eq!(reg.get::<U>(e3), Some(&U(30)));
    *reg.get_mut::<U>(e3).unwrap() = U(31);
    assert_eq!(reg.get::<U>(e3), Some(&U(31)));

    // $ cargo test -- --nocapture
    println!("{:#?}", reg);
    println!("{:#?}", reg.display());
}

#[test]
fn reserve_creates_pool() {
    let mut reg = Registry::default();

    reg.reserve::<U>(64);
    assert!(reg.pools().is_registered::<U>());
    assert!(reg.view::<U>().is_empty());
}
