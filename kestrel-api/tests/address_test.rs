//! Address behavior visible to consumers of the contract crate.

use std::collections::HashMap;

use kestrel_api::address::{ActorAddress, ActorId};

#[test]
fn addresses_work_as_map_keys() {
    let mut routes: HashMap<ActorAddress, u32> = HashMap::new();
    let named = ActorAddress::named("svc");
    let anon = ActorAddress::anonymous();
    let member = ActorAddress::pool_member("workers", "w0");

    routes.insert(named.clone(), 1);
    routes.insert(anon.clone(), 2);
    routes.insert(member.clone(), 3);

    assert_eq!(routes.get(&named), Some(&1));
    assert_eq!(routes.get(&anon), Some(&2));
    assert_eq!(routes.get(&member), Some(&3));
}

#[test]
fn ids_survive_round_trips() {
    let id = ActorId::new();
    let copied = id;
    assert_eq!(id, copied);
    assert_eq!(ActorId::from_uuid(*id.as_uuid()), id);
}

#[test]
fn display_and_name_agree() {
    let address = ActorAddress::named("metrics");
    assert_eq!(address.name(), Some("metrics"));
    assert!(address.to_string().contains("metrics"));
}
