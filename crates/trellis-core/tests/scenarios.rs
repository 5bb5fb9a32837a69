use std::collections::BTreeSet;

use trellis_core::{
    AuthorizationContext, Enforcer, Permission, PermissionSet, Policy, PolicyEntry, PolicyId,
    ResourceKey, Revision, SubjectId, Verdict,
};

fn key(s: &str) -> ResourceKey {
    ResourceKey::parse(s).unwrap()
}

fn perms(labels: &[&str]) -> PermissionSet {
    labels.iter().copied().collect()
}

fn subject(s: &str) -> SubjectId {
    SubjectId::new(s).unwrap()
}

fn ctx(s: &str) -> AuthorizationContext {
    AuthorizationContext::single(subject(s))
}

fn layered_policy() -> Policy {
    Policy::from_json(
        r#"{
            "policyId": "org.acme:sensor-42",
            "revision": 1,
            "entries": {
                "all": {
                    "subjects": { "google:S": {} },
                    "resources": { "thing:/": { "grant": ["READ", "WRITE"], "revoke": [] } }
                },
                "attributes-revoked": {
                    "subjects": { "google:S": {} },
                    "resources": { "thing:/attributes": { "grant": [], "revoke": ["READ", "WRITE"] } }
                },
                "attributes-location-read-allowed": {
                    "subjects": { "google:S": {} },
                    "resources": { "thing:/attributes/location": { "grant": ["READ"], "revoke": [] } }
                }
            }
        }"#,
    )
    .unwrap()
}

fn features_policy() -> Policy {
    Policy::from_json(
        r#"{
            "policyId": "org.acme:sensor-43",
            "revision": 1,
            "entries": {
                "features": {
                    "subjects": { "google:T": {} },
                    "resources": {
                        "thing:/features": { "grant": ["READ"] },
                        "thing:/features/firmware": { "revoke": ["READ"] }
                    }
                }
            }
        }"#,
    )
    .unwrap()
}

#[test]
fn fail_closed_for_anything_not_mentioned() {
    let enforcer = Enforcer::build(&layered_policy()).unwrap();

    assert!(!enforcer.has_permission(&key("thing:/"), &perms(&["ADMINISTRATE"]), &ctx("google:S")));
    assert!(!enforcer.has_permission(&key("thing:/"), &perms(&["READ"]), &ctx("google:other")));
    assert!(!enforcer.has_permission(&key("policy:/"), &perms(&["READ"]), &ctx("google:S")));
    assert!(!enforcer.has_permissions_on_resource_or_any_subresource(
        &key("message:/inbox"),
        &perms(&["READ"]),
        &ctx("google:S")
    ));
}

#[test]
fn most_specific_node_wins() {
    let enforcer = Enforcer::build(&layered_policy()).unwrap();
    let s = ctx("google:S");

    assert!(enforcer.has_permission(&key("thing:/attributes/location"), &perms(&["READ"]), &s));
    assert!(!enforcer.has_permission(&key("thing:/attributes"), &perms(&["READ"]), &s));
}

#[test]
fn full_subtree_check_sees_revoke_below() {
    let enforcer = Enforcer::build(&layered_policy()).unwrap();
    let s = ctx("google:S");

    assert!(!enforcer.has_permissions_on_resource(&key("thing:/"), &perms(&["READ", "WRITE"]), &s));
    assert!(enforcer.has_permissions_on_resource_or_any_subresource(
        &key("thing:/"),
        &perms(&["READ"]),
        &s
    ));
}

#[test]
fn layered_policy_end_to_end() {
    let enforcer = Enforcer::build(&layered_policy()).unwrap();

    assert!(!enforcer.has_permissions_on_resource(
        &key("thing:/"),
        &perms(&["READ", "WRITE"]),
        &ctx("google:S")
    ));
    assert!(
        enforcer
            .subjects_with_partial_permission(&key("thing:/attributes"), &Permission::new("READ"))
            .contains(&subject("google:S"))
    );
    assert!(enforcer.has_permission(
        &key("thing:/attributes/location"),
        &perms(&["READ"]),
        &ctx("google:S")
    ));
}

#[test]
fn features_policy_end_to_end() {
    let enforcer = Enforcer::build(&features_policy()).unwrap();
    let t = ctx("google:T");

    assert!(enforcer.has_permissions_on_resource_or_any_subresource(
        &key("thing:/"),
        &perms(&["READ"]),
        &t
    ));
    assert!(!enforcer.has_permissions_on_resource(&key("thing:/features"), &perms(&["READ"]), &t));
    assert!(!enforcer.has_permissions_on_resource_or_any_subresource(
        &key("thing:/features/firmware"),
        &perms(&["READ"]),
        &t
    ));
}

#[test]
fn inheritance_without_override() {
    let policy = Policy::new(
        PolicyId::new("org.acme:inherit").unwrap(),
        Revision::new(1),
        [PolicyEntry::builder("features")
            .subject(subject("google:U"))
            .grant(key("thing:/features"), perms(&["READ"]))
            .build()
            .unwrap()],
    )
    .unwrap();
    let enforcer = Enforcer::build(&policy).unwrap();

    assert!(enforcer.has_permission(&key("thing:/features/foo"), &perms(&["READ"]), &ctx("google:U")));
    assert!(!enforcer.has_permission(&key("thing:/attributes"), &perms(&["READ"]), &ctx("google:U")));
}

#[test]
fn explicit_deny_wins_across_entries_at_same_node() {
    let policy = Policy::new(
        PolicyId::new("org.acme:deny").unwrap(),
        Revision::new(1),
        [
            PolicyEntry::builder("grant")
                .subject(subject("google:V"))
                .grant(key("thing:/"), perms(&["READ"]))
                .build()
                .unwrap(),
            PolicyEntry::builder("revoke")
                .subject(subject("google:V"))
                .revoke(key("thing:/"), perms(&["READ"]))
                .build()
                .unwrap(),
        ],
    )
    .unwrap();
    let enforcer = Enforcer::build(&policy).unwrap();

    assert_eq!(
        enforcer.verdict(&key("thing:/"), &Permission::new("READ"), &ctx("google:V")),
        Verdict::Revoked
    );
}

#[test]
fn building_twice_answers_identically() {
    let policy = layered_policy();
    let first = Enforcer::build(&policy).unwrap();
    let second = Enforcer::build(&policy).unwrap();
    let s = ctx("google:S");

    let keys = [
        "thing:/",
        "thing:/attributes",
        "thing:/attributes/location",
        "thing:/attributes/location/lat",
        "thing:/features",
        "policy:/",
    ];
    let sets = [perms(&["READ"]), perms(&["WRITE"]), perms(&["READ", "WRITE"])];

    for k in keys.iter().map(|k| key(k)) {
        for p in &sets {
            assert_eq!(first.has_permission(&k, p, &s), second.has_permission(&k, p, &s));
            assert_eq!(
                first.has_permissions_on_resource(&k, p, &s),
                second.has_permissions_on_resource(&k, p, &s)
            );
            assert_eq!(
                first.has_permissions_on_resource_or_any_subresource(&k, p, &s),
                second.has_permissions_on_resource_or_any_subresource(&k, p, &s)
            );
        }
        assert_eq!(
            first.subjects_with_partial_permission(&k, &Permission::new("READ")),
            second.subjects_with_partial_permission(&k, &Permission::new("READ"))
        );
    }
}

#[test]
fn entry_order_does_not_matter() {
    let entries = vec![
        PolicyEntry::builder("a")
            .subject(subject("google:W"))
            .grant(key("thing:/"), perms(&["READ"]))
            .build()
            .unwrap(),
        PolicyEntry::builder("b")
            .subject(subject("google:W"))
            .revoke(key("thing:/attributes"), perms(&["READ"]))
            .build()
            .unwrap(),
    ];
    let id = PolicyId::new("org.acme:order").unwrap();
    let forward = Enforcer::build_from_entries(id.clone(), Revision::new(1), entries.iter()).unwrap();
    let backward =
        Enforcer::build_from_entries(id, Revision::new(1), entries.iter().rev()).unwrap();
    let w = ctx("google:W");

    for k in ["thing:/", "thing:/attributes", "thing:/attributes/x"] {
        assert_eq!(
            forward.verdict(&key(k), &Permission::new("READ"), &w),
            backward.verdict(&key(k), &Permission::new("READ"), &w)
        );
    }
}

#[test]
fn search_visibility_tags_for_a_thing() {
    let policy = Policy::from_json(
        r#"{
            "policyId": "org.acme:fleet",
            "revision": 12,
            "entries": {
                "owner": {
                    "subjects": { "google:owner": {} },
                    "resources": { "thing:/": { "grant": ["READ", "WRITE"] } }
                },
                "support": {
                    "subjects": { "google:support-1": {}, "google:support-2": {} },
                    "resources": {
                        "thing:/features": { "grant": ["READ"] },
                        "thing:/features/credentials": { "revoke": ["READ"] }
                    }
                },
                "device": {
                    "subjects": { "x509:device-42": {} },
                    "resources": { "thing:/features/telemetry": { "grant": ["READ", "WRITE"] } }
                }
            }
        }"#,
    )
    .unwrap();
    let enforcer = Enforcer::build(&policy).unwrap();
    let read = Permission::new("READ");

    assert_eq!(
        enforcer.subjects_with_partial_permission(&key("thing:/features"), &read),
        BTreeSet::from([
            subject("google:owner"),
            subject("google:support-1"),
            subject("google:support-2"),
            subject("x509:device-42"),
        ])
    );
    assert_eq!(
        enforcer.subjects_with_partial_permission(&key("thing:/features/credentials"), &read),
        BTreeSet::from([subject("google:owner")])
    );
    assert_eq!(
        enforcer.subjects_with_partial_permission(&key("thing:/attributes"), &read),
        BTreeSet::from([subject("google:owner")])
    );
    assert_eq!(
        enforcer.subjects_with_unrestricted_permission(&key("thing:/features"), &perms(&["READ"])),
        BTreeSet::from([subject("google:owner")])
    );
}
