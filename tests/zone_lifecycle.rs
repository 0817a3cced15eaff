//! Zone aggregate lifecycle: build, encrypt for persistence, share via ACL,
//! and gate PTR writes on zone membership.

use hickory_proto::rr::RecordType;
use zonegate::{
    ptr_is_in_zone, AccessLevel, AclRule, Aes256GcmCrypto, NoOpCrypto, Zone, ZoneConnection,
    ZoneRequest, ZoneStatus,
};

fn make_reverse_zone(name: &str) -> Zone {
    Zone::build(ZoneRequest {
        name: name.to_string(),
        email: "test@test.com".to_string(),
        admin_group_id: "admin-group-id".to_string(),
        connection: Some(ZoneConnection::new(
            "primary",
            "vinyl.",
            "nzisn+4G2ldVn0q1CV3vsg==",
            "10.1.1.1:53",
        )),
        ..Default::default()
    })
    .unwrap()
}

#[test]
fn build_encrypt_and_persist_shape() {
    let zone = make_reverse_zone("2.0.192.in-addr.arpa.");
    assert_eq!(zone.status, ZoneStatus::Active);
    assert!(zone.is_ipv4() && zone.is_reverse());

    // Keys go to the store in encrypted form and come back intact.
    let aes = Aes256GcmCrypto::new(&[9u8; 32]).unwrap();
    let stored = zone.with_connections_encrypted(&aes).unwrap();
    let stored_key = &stored.connection.as_ref().unwrap().key;
    assert_ne!(stored_key, "nzisn+4G2ldVn0q1CV3vsg==");

    let recovered = stored.connection.as_ref().unwrap().decrypted(&aes).unwrap();
    assert_eq!(recovered.key, "nzisn+4G2ldVn0q1CV3vsg==");

    // Identity round trip through the no-op algebra
    let connection = zone.connection.as_ref().unwrap();
    let round = connection
        .encrypted(&NoOpCrypto)
        .unwrap()
        .decrypted(&NoOpCrypto)
        .unwrap();
    assert_eq!(&round, connection);
}

#[test]
fn builder_reports_every_problem_at_once() {
    let errors = Zone::build(ZoneRequest {
        name: "x".to_string(),
        email: "not an email".to_string(),
        admin_group_id: "admin-group-id".to_string(),
        connection: Some(ZoneConnection::new("primary", "vinyl.", "key", "bad host")),
        ..Default::default()
    })
    .unwrap_err();

    assert_eq!(errors.len(), 3);
}

#[test]
fn sharing_flow_with_acl_rules() {
    let zone = make_reverse_zone("2.0.192.in-addr.arpa.");

    let rule = AclRule {
        access_level: AccessLevel::Write,
        description: Some("ptr updates for the noc".to_string()),
        user_id: None,
        group_id: Some("noc-group".to_string()),
        record_mask: None,
        record_types: vec![RecordType::PTR],
    };

    let shared = zone.add_acl_rule(rule.clone());
    assert!(shared.acl.contains(&rule));
    assert!(zone.acl.rules().is_empty());

    // Adding again changes nothing; deleting restores the original set.
    assert_eq!(shared.add_acl_rule(rule.clone()).acl, shared.acl);
    assert_eq!(shared.delete_acl_rule(&rule).acl, zone.acl);
}

#[test]
fn ptr_writes_gate_on_zone_membership() {
    // Classful /24
    let zone = make_reverse_zone("2.0.192.in-addr.arpa.");
    assert!(ptr_is_in_zone(&zone, "25", RecordType::PTR).is_ok());
    assert!(ptr_is_in_zone(&zone, "25.3", RecordType::PTR).is_err());

    // Classless delegation /26
    let zone = make_reverse_zone("0/26.2.0.192.in-addr.arpa.");
    assert!(ptr_is_in_zone(&zone, "25", RecordType::PTR).is_ok());
    assert!(ptr_is_in_zone(&zone, "200", RecordType::PTR).is_err());

    // IPv6, record completes the 32 nibbles
    let zone = make_reverse_zone("0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.8.b.d.0.1.0.0.2.ip6.arpa.");
    assert!(ptr_is_in_zone(&zone, "1.0.0.0.0.0.0.0", RecordType::PTR).is_ok());
    assert!(ptr_is_in_zone(&zone, "1.0.0.0", RecordType::PTR).is_err());

    // Non-PTR records are not gated
    let zone = make_reverse_zone("2.0.192.in-addr.arpa.");
    assert!(ptr_is_in_zone(&zone, "whatever", RecordType::NS).is_ok());
}
