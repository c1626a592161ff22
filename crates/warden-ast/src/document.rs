//! JSON policy documents.
//!
//! A document is either a single record or an array of records, with arrays
//! nested to any depth. Every record is an object tagged by `type`:
//!
//! ```json
//! [
//!   { "type": "policy", "id": "myapp", "body": [
//!     { "type": "group", "id": "the-group" },
//!     { "type": "grant",
//!       "role": { "type": "group", "id": "the-group" },
//!       "member": { "type": "user", "id": "alice" } }
//!   ]}
//! ]
//! ```
//!
//! Records appearing in reference position (owners, grant roles, permit
//! resources) become nodes of their own, exactly like top-level records.
//! [`Document::lower`] produces the arena graph consumed by the resolver,
//! and [`export_records`] renders a resolved record list back to JSON.

use crate::error::{DocumentError, Result};
use crate::graph::{Entry, RecordGraph, RecordRef};
use crate::record::{
    Annotations, Delete, Deny, Grant, Group, Host, HostFactory, Layer, Member, Permit, Policy,
    Record, Resource, Revoke, Role, User, Variable, Webservice,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;

/// Accepts either a single value or an array of values.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(Box<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![*item],
        }
    }
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

/// Fields shared by every declaration.
#[derive(Debug, Clone, Default, Deserialize)]
struct DeclarationNode {
    #[serde(default)]
    id: String,
    account: Option<String>,
    owner: Option<Box<Node>>,
    #[serde(default)]
    annotations: Annotations,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum MemberNode {
    Explicit {
        role: Box<Node>,
        #[serde(default)]
        admin: bool,
    },
    Bare(Box<Node>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Node {
    User {
        #[serde(flatten)]
        decl: DeclarationNode,
        uidnumber: Option<u64>,
        #[serde(default)]
        public_keys: Vec<String>,
        #[serde(default)]
        restricted_to: Vec<String>,
    },
    Group {
        #[serde(flatten)]
        decl: DeclarationNode,
        gidnumber: Option<u64>,
    },
    Host {
        #[serde(flatten)]
        decl: DeclarationNode,
        #[serde(default)]
        restricted_to: Vec<String>,
    },
    Layer {
        #[serde(flatten)]
        decl: DeclarationNode,
    },
    Variable {
        #[serde(flatten)]
        decl: DeclarationNode,
        kind: Option<String>,
        mime_type: Option<String>,
    },
    Webservice {
        #[serde(flatten)]
        decl: DeclarationNode,
    },
    HostFactory {
        #[serde(flatten)]
        decl: DeclarationNode,
        #[serde(default)]
        layers: OneOrMany<Node>,
    },
    Policy {
        #[serde(flatten)]
        decl: DeclarationNode,
        #[serde(default)]
        body: Vec<DocumentEntry>,
    },
    Role {
        kind: String,
        #[serde(default)]
        id: String,
        account: Option<String>,
    },
    Resource {
        kind: String,
        #[serde(default)]
        id: String,
        account: Option<String>,
    },
    Grant {
        role: Box<Node>,
        member: OneOrMany<MemberNode>,
    },
    Revoke {
        role: Box<Node>,
        member: Box<Node>,
    },
    Permit {
        role: OneOrMany<Node>,
        privilege: OneOrMany<String>,
        resource: OneOrMany<Node>,
    },
    Deny {
        role: Box<Node>,
        privilege: OneOrMany<String>,
        resource: Box<Node>,
    },
    Delete {
        record: Box<Node>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum DocumentEntry {
    List(Vec<DocumentEntry>),
    Record(Node),
}

/// A parsed policy document, ready to be lowered into a [`RecordGraph`].
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct Document {
    root: DocumentEntry,
}

impl Document {
    /// Parses a document from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Parses a document from an already decoded JSON value.
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Reads and parses a document file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Builds the record graph and the top-level forest.
    pub fn lower(self) -> (RecordGraph, Vec<Entry>) {
        let mut graph = RecordGraph::new();
        let entries = match self.root {
            DocumentEntry::List(items) => items
                .into_iter()
                .map(|item| lower_entry(&mut graph, item))
                .collect(),
            DocumentEntry::Record(node) => vec![Entry::Record(lower_node(&mut graph, node))],
        };
        (graph, entries)
    }
}

fn lower_entry(graph: &mut RecordGraph, entry: DocumentEntry) -> Entry {
    match entry {
        DocumentEntry::List(items) => Entry::List(
            items
                .into_iter()
                .map(|item| lower_entry(graph, item))
                .collect(),
        ),
        DocumentEntry::Record(node) => Entry::Record(lower_node(graph, node)),
    }
}

fn lower_nodes(graph: &mut RecordGraph, nodes: OneOrMany<Node>) -> Vec<RecordRef> {
    nodes
        .into_vec()
        .into_iter()
        .map(|node| lower_node(graph, node))
        .collect()
}

/// Lowered declaration fields, in the order the record structs expect them.
struct LoweredDeclaration {
    id: String,
    account: Option<String>,
    owner: Option<RecordRef>,
    annotations: Annotations,
}

fn lower_declaration(graph: &mut RecordGraph, decl: DeclarationNode) -> LoweredDeclaration {
    LoweredDeclaration {
        id: decl.id,
        account: decl.account,
        owner: decl.owner.map(|owner| lower_node(graph, *owner)),
        annotations: decl.annotations,
    }
}

fn lower_node(graph: &mut RecordGraph, node: Node) -> RecordRef {
    let record: Record = match node {
        Node::User {
            decl,
            uidnumber,
            public_keys,
            restricted_to,
        } => {
            let d = lower_declaration(graph, decl);
            User {
                id: d.id,
                account: d.account,
                owner: d.owner,
                annotations: d.annotations,
                uidnumber,
                public_keys,
                restricted_to,
            }
            .into()
        }
        Node::Group { decl, gidnumber } => {
            let d = lower_declaration(graph, decl);
            Group {
                id: d.id,
                account: d.account,
                owner: d.owner,
                annotations: d.annotations,
                gidnumber,
            }
            .into()
        }
        Node::Host {
            decl,
            restricted_to,
        } => {
            let d = lower_declaration(graph, decl);
            Host {
                id: d.id,
                account: d.account,
                owner: d.owner,
                annotations: d.annotations,
                restricted_to,
            }
            .into()
        }
        Node::Layer { decl } => {
            let d = lower_declaration(graph, decl);
            Layer {
                id: d.id,
                account: d.account,
                owner: d.owner,
                annotations: d.annotations,
            }
            .into()
        }
        Node::Variable {
            decl,
            kind,
            mime_type,
        } => {
            let d = lower_declaration(graph, decl);
            Variable {
                id: d.id,
                account: d.account,
                owner: d.owner,
                annotations: d.annotations,
                kind,
                mime_type,
            }
            .into()
        }
        Node::Webservice { decl } => {
            let d = lower_declaration(graph, decl);
            Webservice {
                id: d.id,
                account: d.account,
                owner: d.owner,
                annotations: d.annotations,
            }
            .into()
        }
        Node::HostFactory { decl, layers } => {
            let d = lower_declaration(graph, decl);
            let layers = lower_nodes(graph, layers);
            HostFactory {
                id: d.id,
                account: d.account,
                owner: d.owner,
                annotations: d.annotations,
                layers,
            }
            .into()
        }
        Node::Policy { decl, body } => {
            let d = lower_declaration(graph, decl);
            let body = body
                .into_iter()
                .map(|entry| lower_entry(graph, entry))
                .collect();
            Policy {
                id: d.id,
                account: d.account,
                owner: d.owner,
                annotations: d.annotations,
                body,
            }
            .into()
        }
        Node::Role { kind, id, account } => Role { kind, id, account }.into(),
        Node::Resource { kind, id, account } => Resource { kind, id, account }.into(),
        Node::Grant { role, member } => {
            let role = lower_node(graph, *role);
            let members = member
                .into_vec()
                .into_iter()
                .map(|member| match member {
                    MemberNode::Explicit { role, admin } => Member {
                        role: lower_node(graph, *role),
                        admin,
                    },
                    MemberNode::Bare(role) => Member::new(lower_node(graph, *role)),
                })
                .collect();
            Grant { role, members }.into()
        }
        Node::Revoke { role, member } => {
            let role = lower_node(graph, *role);
            let member = lower_node(graph, *member);
            Revoke { role, member }.into()
        }
        Node::Permit {
            role,
            privilege,
            resource,
        } => {
            let roles = lower_nodes(graph, role);
            let resources = lower_nodes(graph, resource);
            Permit {
                roles,
                privileges: privilege.into_vec(),
                resources,
            }
            .into()
        }
        Node::Deny {
            role,
            privilege,
            resource,
        } => {
            let role = lower_node(graph, *role);
            let resource = lower_node(graph, *resource);
            Deny {
                role,
                privileges: privilege.into_vec(),
                resource,
            }
            .into()
        }
        Node::Delete { record } => {
            let record = lower_node(graph, *record);
            Delete { record }.into()
        }
    };
    graph.insert(record)
}

/// Renders resolved records as a JSON array.
///
/// References render as their `account:kind:id` string (falling back to
/// `kind:id` when no account is set). Policy bodies are never rendered,
/// since a resolved list is already flat.
pub fn export_records(graph: &RecordGraph, records: &[RecordRef]) -> Value {
    Value::Array(
        records
            .iter()
            .map(|record| export_record(graph, *record))
            .collect(),
    )
}

fn reference(graph: &RecordGraph, record: RecordRef) -> Value {
    let text = graph.qualified_id(record).unwrap_or_else(|| {
        format!("{}:{}", graph.kind(record), graph.id(record).unwrap_or_default())
    });
    Value::String(text)
}

fn references(graph: &RecordGraph, records: &[RecordRef]) -> Value {
    Value::Array(records.iter().map(|r| reference(graph, *r)).collect())
}

fn strings(items: &[String]) -> Value {
    Value::Array(items.iter().cloned().map(Value::String).collect())
}

fn export_record(graph: &RecordGraph, record: RecordRef) -> Value {
    let node = graph.get(record);
    let mut out = Map::new();
    out.insert("type".into(), Value::String(node.type_name().to_string()));

    if let Record::Role(_) | Record::Resource(_) = node {
        out.insert("kind".into(), Value::String(node.kind().to_string()));
    }
    if let Some(id) = graph.id(record) {
        out.insert("id".into(), Value::String(id.to_string()));
    }
    if let Some(account) = graph.account(record) {
        out.insert("account".into(), Value::String(account.to_string()));
    }
    if let Some(owner) = node.as_ownable().and_then(|ownable| ownable.owner()) {
        out.insert("owner".into(), reference(graph, owner));
    }
    if let Some(annotatable) = node.as_annotatable() {
        if !annotatable.annotations().is_empty() {
            let annotations = annotatable
                .annotations()
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect();
            out.insert("annotations".into(), Value::Object(annotations));
        }
    }

    match node {
        Record::User(user) => {
            if let Some(uid) = user.uidnumber {
                out.insert("uidnumber".into(), uid.into());
            }
            if !user.public_keys.is_empty() {
                out.insert("public_keys".into(), strings(&user.public_keys));
            }
            if !user.restricted_to.is_empty() {
                out.insert("restricted_to".into(), strings(&user.restricted_to));
            }
        }
        Record::Group(group) => {
            if let Some(gid) = group.gidnumber {
                out.insert("gidnumber".into(), gid.into());
            }
        }
        Record::Host(host) => {
            if !host.restricted_to.is_empty() {
                out.insert("restricted_to".into(), strings(&host.restricted_to));
            }
        }
        Record::Variable(variable) => {
            if let Some(kind) = &variable.kind {
                out.insert("kind".into(), Value::String(kind.clone()));
            }
            if let Some(mime_type) = &variable.mime_type {
                out.insert("mime_type".into(), Value::String(mime_type.clone()));
            }
        }
        Record::HostFactory(factory) => {
            out.insert("layers".into(), references(graph, &factory.layers));
        }
        Record::Grant(grant) => {
            out.insert("role".into(), reference(graph, grant.role));
            let members = grant
                .members
                .iter()
                .map(|member| {
                    let mut entry = Map::new();
                    entry.insert("role".into(), reference(graph, member.role));
                    if member.admin {
                        entry.insert("admin".into(), Value::Bool(true));
                    }
                    Value::Object(entry)
                })
                .collect();
            out.insert("members".into(), Value::Array(members));
        }
        Record::Revoke(revoke) => {
            out.insert("role".into(), reference(graph, revoke.role));
            out.insert("member".into(), reference(graph, revoke.member));
        }
        Record::Permit(permit) => {
            out.insert("roles".into(), references(graph, &permit.roles));
            out.insert("privileges".into(), strings(&permit.privileges));
            out.insert("resources".into(), references(graph, &permit.resources));
        }
        Record::Deny(deny) => {
            out.insert("role".into(), reference(graph, deny.role));
            out.insert("privileges".into(), strings(&deny.privileges));
            out.insert("resource".into(), reference(graph, deny.resource));
        }
        Record::Delete(delete) => {
            out.insert("record".into(), reference(graph, delete.record));
        }
        Record::Layer(_)
        | Record::Webservice(_)
        | Record::Policy(_)
        | Record::Role(_)
        | Record::Resource(_) => {}
    }

    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::flatten_entries;
    use serde_json::json;

    #[test]
    fn test_lower_nested_policy() {
        let document = Document::from_value(json!([
            { "type": "policy", "id": "myapp", "body": [
                { "type": "group", "id": "the-group" },
                [ { "type": "user", "id": "alice", "uidnumber": 1001 } ]
            ]}
        ]))
        .unwrap();
        let (graph, entries) = document.lower();

        let top = flatten_entries(&entries);
        assert_eq!(top.len(), 1);
        let policy = top[0];
        assert_eq!(graph.describe(policy), "policy 'myapp'");

        let body = graph.body(policy);
        assert_eq!(body.len(), 2);
        assert_eq!(graph.describe(body[0]), "group 'the-group'");
        match graph.get(body[1]) {
            Record::User(user) => assert_eq!(user.uidnumber, Some(1001)),
            other => panic!("expected user, got {other:?}"),
        }
    }

    #[test]
    fn test_single_record_document() {
        let document = Document::from_json(r#"{ "type": "policy", "id": "root" }"#).unwrap();
        let (graph, entries) = document.lower();
        assert_eq!(entries.len(), 1);
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_references_become_nodes() {
        let document = Document::from_value(json!([
            { "type": "grant",
              "role": { "type": "group", "id": "devs" },
              "member": [
                { "type": "user", "id": "alice" },
                { "role": { "type": "role", "kind": "host", "id": "ci" }, "admin": true }
              ] },
            { "type": "permit",
              "role": { "type": "layer", "id": "web" },
              "privilege": ["read", "execute"],
              "resource": { "type": "variable", "id": "db/password" } },
            { "type": "layer", "id": "web",
              "owner": { "type": "role", "kind": "group", "id": "ops" },
              "annotations": { "team": "ops" } }
        ]))
        .unwrap();
        let (graph, entries) = document.lower();
        let top = flatten_entries(&entries);

        let Record::Grant(grant) = graph.get(top[0]) else {
            panic!("expected grant");
        };
        assert_eq!(graph.describe(grant.role), "group 'devs'");
        assert_eq!(grant.members.len(), 2);
        assert!(!grant.members[0].admin);
        assert!(grant.members[1].admin);
        assert_eq!(graph.kind(grant.members[1].role), "host");

        let Record::Permit(permit) = graph.get(top[1]) else {
            panic!("expected permit");
        };
        assert_eq!(permit.privileges, vec!["read", "execute"]);
        assert_eq!(graph.referenced_records(top[1]).len(), 2);

        assert_eq!(graph.referenced_records(top[2]).len(), 1);
    }

    #[test]
    fn test_single_nodes_in_list_positions() {
        let document = Document::from_value(json!([
            { "type": "host_factory", "id": "ci",
              "layers": { "type": "layer", "id": "workers" } },
            { "type": "permit",
              "role": { "type": "host", "id": "h1" },
              "privilege": "execute",
              "resource": { "type": "webservice", "id": "api" } }
        ]))
        .unwrap();
        let (graph, entries) = document.lower();
        let top = flatten_entries(&entries);

        let Record::HostFactory(factory) = graph.get(top[0]) else {
            panic!("expected host factory");
        };
        assert_eq!(factory.layers.len(), 1);
        assert_eq!(graph.describe(factory.layers[0]), "layer 'workers'");

        let Record::Permit(permit) = graph.get(top[1]) else {
            panic!("expected permit");
        };
        assert_eq!(permit.privileges, vec!["execute"]);
        assert_eq!(graph.describe(permit.roles[0]), "host 'h1'");
        assert_eq!(graph.describe(permit.resources[0]), "webservice 'api'");
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let err = Document::from_value(json!([{ "type": "robot", "id": "r2" }])).unwrap_err();
        assert!(matches!(err, DocumentError::Json(_)));
    }

    #[test]
    fn test_export_renders_references_as_ids() {
        let mut graph = RecordGraph::new();
        let mut owner = Role::new("user", "admin");
        owner.account = Some("acct".into());
        let owner = graph.insert(owner);
        let mut group = Group::new("app/devs");
        group.account = Some("acct".into());
        group.owner = Some(owner);
        let group = graph.insert(group);

        let exported = export_records(&graph, &[group]);
        assert_eq!(
            exported,
            json!([{
                "type": "group",
                "id": "app/devs",
                "account": "acct",
                "owner": "acct:user:admin"
            }])
        );
    }
}
