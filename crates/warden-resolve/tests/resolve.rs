//! End-to-end resolution tests.
//!
//! These tests load JSON policy documents, run the full pipeline and check
//! the exported record list:
//! Load document → Lower → Resolve → Export

use serde_json::{json, Value};
use warden_ast::{export_records, Document, Entry, Record, RecordGraph, Role};
use warden_resolve::{compact, resolve, ResolveError};

fn load(document: Value) -> (RecordGraph, Vec<Entry>) {
    Document::from_value(document)
        .expect("test document should parse")
        .lower()
}

fn resolve_document(document: Value, account: &str, ownerid: &str) -> Result<Value, ResolveError> {
    let (mut graph, entries) = load(document);
    let records = resolve(&mut graph, &entries, account, ownerid)?;
    Ok(export_records(&graph, &records))
}

#[test]
fn test_group_in_policy_gets_account_and_namespace() {
    let resolved = resolve_document(
        json!([
            { "type": "policy", "id": "myapp", "body": [
                { "type": "group", "id": "the-group" }
            ]}
        ]),
        "the-account",
        "the-account:user:admin",
    )
    .unwrap();

    assert_eq!(
        resolved[1],
        json!({
            "type": "group",
            "id": "myapp/the-group",
            "account": "the-account",
            "owner": "the-account:policy:myapp"
        })
    );
}

#[test]
fn test_top_level_group_owned_by_configured_owner() {
    let (mut graph, entries) = load(json!([{ "type": "group", "id": "the-group" }]));

    let records = resolve(&mut graph, &entries, "test", "test:user:admin").unwrap();

    let owner = graph[records[0]].as_ownable().unwrap().owner().unwrap();
    let Record::Role(role) = &graph[owner] else {
        panic!("default owner should be a role reference");
    };
    assert_eq!(role.account.as_deref(), Some("test"));
    assert_eq!(role.kind, "user");
    assert_eq!(role.id, "admin");
}

#[test]
fn test_duplicate_groups_rejected() {
    let err = resolve_document(
        json!([
            { "type": "group", "id": "the-group" },
            { "type": "group", "id": "the-group" }
        ]),
        "acct",
        "acct:user:admin",
    )
    .unwrap_err();

    assert_eq!(
        err,
        ResolveError::DuplicateRecord {
            record: "group 'the-group'".to_string()
        }
    );
}

#[test]
fn test_duplicates_detected_across_policies() {
    let err = resolve_document(
        json!([
            { "type": "policy", "id": "a", "body": [
                { "type": "policy", "id": "b", "body": [
                    { "type": "group", "id": "devs" }
                ]}
            ]},
            { "type": "policy", "id": "a/b", "body": [
                { "type": "group", "id": "devs" }
            ]}
        ]),
        "acct",
        "acct:user:admin",
    )
    .unwrap_err();

    // the second `a/b` policy collides first
    assert_eq!(
        err,
        ResolveError::DuplicateRecord {
            record: "policy 'a/b'".to_string()
        }
    );
}

#[test]
fn test_full_document() {
    let resolved = resolve_document(
        json!([
            { "type": "policy", "id": "myapp", "body": [
                { "type": "group", "id": "admins" },
                { "type": "user", "id": "alice",
                  "owner": { "type": "role", "kind": "group", "id": "admins" } },
                { "type": "grant",
                  "role": { "type": "group", "id": "admins" },
                  "member": { "type": "user", "id": "alice" } },
                { "type": "policy", "id": "db", "body": [
                    { "type": "variable", "id": "password",
                      "annotations": { "peer": "../other" } },
                    { "type": "permit",
                      "role": { "type": "group", "id": "../admins" },
                      "privilege": ["read", "execute"],
                      "resource": { "type": "variable", "id": "password" } }
                ]}
            ]}
        ]),
        "acct",
        "acct:user:admin",
    )
    .unwrap();

    assert_eq!(
        resolved,
        json!([
            { "type": "policy", "id": "myapp", "account": "acct",
              "owner": "acct:user:admin" },
            { "type": "group", "id": "myapp/admins", "account": "acct",
              "owner": "acct:policy:myapp" },
            { "type": "user", "id": "alice@myapp", "account": "acct",
              "owner": "acct:group:myapp/admins" },
            { "type": "policy", "id": "myapp/db", "account": "acct",
              "owner": "acct:policy:myapp" },
            { "type": "variable", "id": "myapp/db/password", "account": "acct",
              "owner": "acct:policy:myapp/db",
              "annotations": { "peer": "myapp/db/other" } },
            { "type": "grant", "role": "acct:group:myapp/admins",
              "members": [{ "role": "acct:user:alice@myapp" }] },
            { "type": "permit", "roles": ["acct:group:myapp/admins"],
              "privileges": ["read", "execute"],
              "resources": ["acct:variable:myapp/db/password"] }
        ])
    );
}

#[test]
fn test_users_use_branch_notation() {
    let resolved = resolve_document(
        json!([
            { "type": "policy", "id": "org", "body": [
                { "type": "policy", "id": "team", "body": [
                    { "type": "user", "id": "bob" },
                    { "type": "host", "id": "ci" }
                ]}
            ]},
            { "type": "user", "id": "root-user" }
        ]),
        "acct",
        "acct:user:admin",
    )
    .unwrap();

    let ids: Vec<&str> = resolved
        .as_array()
        .unwrap()
        .iter()
        .map(|record| record["id"].as_str().unwrap())
        .collect();
    assert_eq!(
        ids,
        vec!["org", "org/team", "bob@org-team", "org/team/ci", "root-user"]
    );
}

#[test]
fn test_blank_id_takes_enclosing_policy() {
    let (mut graph, entries) = load(json!([
        { "type": "policy", "id": "app", "body": [
            { "type": "policy", "id": "inner", "body": [
                { "type": "permit",
                  "role": { "type": "role", "kind": "policy", "id": "" },
                  "privilege": "read",
                  "resource": { "type": "webservice", "id": "api" } }
            ]},
            { "type": "webservice", "id": "api" }
        ]}
    ]));

    let records = resolve(&mut graph, &entries, "acct", "acct:user:admin").unwrap();

    let permit = records
        .iter()
        .find_map(|&record| match &graph[record] {
            Record::Permit(permit) => Some(permit.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(graph.id(permit.roles[0]), Some("app/inner"));
    assert_eq!(graph.id(permit.resources[0]), Some("app/inner/api"));
}

#[test]
fn test_blank_id_at_root_fails() {
    let err = resolve_document(
        json!([{ "type": "group", "id": "" }]),
        "acct",
        "acct:user:admin",
    )
    .unwrap_err();

    assert_eq!(
        err,
        ResolveError::MissingIdentifier {
            kind: "group".to_string()
        }
    );
}

#[test]
fn test_relative_member_resolved() {
    let resolved = resolve_document(
        json!([
            { "type": "policy", "id": "app", "body": [
                { "type": "group", "id": "ops" },
                { "type": "policy", "id": "db", "body": [
                    { "type": "group", "id": "admins" },
                    { "type": "grant",
                      "role": { "type": "group", "id": "admins" },
                      "member": { "role": { "type": "group", "id": "../ops" }, "admin": true } }
                ]}
            ]}
        ]),
        "acct",
        "acct:user:admin",
    )
    .unwrap();

    let grant = resolved
        .as_array()
        .unwrap()
        .iter()
        .find(|record| record["type"] == "grant")
        .unwrap();
    assert_eq!(
        grant["members"],
        json!([{ "role": "acct:group:app/ops", "admin": true }])
    );
}

#[test]
fn test_relative_reference_above_root_fails() {
    let err = resolve_document(
        json!([
            { "type": "policy", "id": "app", "body": [
                { "type": "grant",
                  "role": { "type": "group", "id": "admins" },
                  "member": { "type": "group", "id": "../../ops" } }
            ]}
        ]),
        "acct",
        "acct:user:admin",
    )
    .unwrap_err();

    assert!(matches!(
        err,
        ResolveError::InvalidRelativeReference { ref path, .. } if path == "app/../../ops"
    ));
}

#[test]
fn test_owner_groups_sorted_first() {
    let resolved = resolve_document(
        json!([
            { "type": "layer", "id": "web",
              "owner": { "type": "role", "kind": "group", "id": "ops" } },
            { "type": "grant",
              "role": { "type": "layer", "id": "web" },
              "member": { "type": "host", "id": "h1" } },
            { "type": "host", "id": "h1" },
            { "type": "group", "id": "ops" }
        ]),
        "acct",
        "acct:user:admin",
    )
    .unwrap();

    let kinds: Vec<&str> = resolved
        .as_array()
        .unwrap()
        .iter()
        .map(|record| record["type"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["host", "group", "layer", "grant"]);
}

#[test]
fn test_mutual_ownership_fails() {
    let err = resolve_document(
        json!([
            { "type": "group", "id": "a",
              "owner": { "type": "role", "kind": "group", "id": "b" } },
            { "type": "group", "id": "b",
              "owner": { "type": "role", "kind": "group", "id": "a" } }
        ]),
        "acct",
        "acct:user:admin",
    )
    .unwrap_err();

    assert!(matches!(err, ResolveError::DependencyCycle { .. }), "{err}");
}

#[test]
fn test_invalid_owner_configuration() {
    let err = resolve_document(json!([]), "acct", "admin").unwrap_err();
    assert!(matches!(err, ResolveError::InvalidConfiguration(_)));
}

#[test]
fn test_resolution_is_not_idempotent() {
    let (mut graph, entries) = load(json!([
        { "type": "policy", "id": "app", "body": [
            { "type": "group", "id": "devs" }
        ]}
    ]));

    let first = resolve(&mut graph, &entries, "acct", "acct:user:admin").unwrap();
    assert_eq!(graph.id(first[1]), Some("app/devs"));

    let second = resolve(&mut graph, &entries, "acct", "acct:user:admin").unwrap();
    assert_eq!(graph.id(second[1]), Some("app/app/devs"));
}

#[test]
fn test_compact_output() {
    let (mut graph, entries) = load(json!([
        { "type": "group", "id": "root-group" },
        { "type": "policy", "id": "app", "body": [
            { "type": "group", "id": "devs", "account": "elsewhere" }
        ]}
    ]));
    let records = resolve(&mut graph, &entries, "acct", "acct:user:admin").unwrap();

    compact(&mut graph, &entries, "acct", "acct:user:admin").unwrap();

    assert_eq!(
        export_records(&graph, &records),
        json!([
            { "type": "group", "id": "root-group" },
            { "type": "policy", "id": "app" },
            { "type": "group", "id": "app/devs", "account": "elsewhere",
              "owner": "policy:app" }
        ])
    );
}

#[test]
fn test_source_graph_kept_after_resolution() {
    let (mut graph, entries) = load(json!([
        { "type": "policy", "id": "app", "body": [
            { "type": "group", "id": "devs" }
        ]}
    ]));

    let records = resolve(&mut graph, &entries, "acct", "acct:user:admin").unwrap();

    assert_eq!(graph.body(records[0]), vec![records[1]]);
    assert_eq!(
        graph[graph[records[0]].as_ownable().unwrap().owner().unwrap()],
        Record::from(Role::parse_roleid("acct:user:admin").unwrap())
    );
}
