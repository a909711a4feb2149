use sparsecs::prelude::*;

#[derive(Debug, Component)]
struct U(u32);

#[derive(Debug, Component)]
struct I(i32);

#[test]
fn derived_components() {
    let mut reg = Registry::default();
    reg.register_set::<(U, I)>();

    let e = reg.create_with((U(20), I(-20)));
    assert_eq!(reg.get::<U>(e).map(|u| u.0), Some(20));
    assert_eq!(reg.get::<I>(e).map(|i| i.0), Some(-20));
}
