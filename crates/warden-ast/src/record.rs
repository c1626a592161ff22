//! Record variants and the capability traits describing their optional fields.
//!
//! Records come in three families:
//!
//! - **Declarations** (`user`, `group`, `host`, `layer`, `variable`,
//!   `webservice`, `host_factory`, `policy`) create new entities. They expose
//!   every capability: id, account, owner and annotations.
//! - **References** (`role`, `resource`) name an entity declared elsewhere.
//!   They carry an explicit kind and expose id and account only.
//! - **Statements** (`grant`, `revoke`, `permit`, `deny`, `delete`) are
//!   relationship edges between other records and have no identity of their own.
//!
//! Passes never inspect a variant to decide whether a field exists. They ask
//! through [`Record::as_identifiable_mut`] and friends, which return `None`
//! when the variant lacks the capability.

use crate::graph::{Entry, RecordRef};
use indexmap::IndexMap;

/// Annotation map, kept in declaration order.
pub type Annotations = IndexMap<String, String>;

/// A record with a mutable identifier.
pub trait Identifiable {
    /// Current identifier (may be blank before namespace resolution).
    fn id(&self) -> &str;
    /// Replace the identifier.
    fn set_id(&mut self, id: String);
}

/// A record bound to an account.
pub trait Accountable {
    /// Account, if one has been assigned.
    fn account(&self) -> Option<&str>;
    /// Replace the account.
    fn set_account(&mut self, account: Option<String>);
}

/// A record that can be owned by a role.
pub trait Ownable {
    /// Owning role record, if any.
    fn owner(&self) -> Option<RecordRef>;
    /// Replace the owner.
    fn set_owner(&mut self, owner: Option<RecordRef>);
}

/// A record carrying free-form annotations.
pub trait Annotatable {
    /// Read-only annotations.
    fn annotations(&self) -> &Annotations;
    /// Mutable annotations.
    fn annotations_mut(&mut self) -> &mut Annotations;
}

/// Human user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct User {
    pub id: String,
    pub account: Option<String>,
    pub owner: Option<RecordRef>,
    pub annotations: Annotations,
    pub uidnumber: Option<u64>,
    pub public_keys: Vec<String>,
    pub restricted_to: Vec<String>,
}

/// Group of roles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Group {
    pub id: String,
    pub account: Option<String>,
    pub owner: Option<RecordRef>,
    pub annotations: Annotations,
    pub gidnumber: Option<u64>,
}

/// Machine identity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Host {
    pub id: String,
    pub account: Option<String>,
    pub owner: Option<RecordRef>,
    pub annotations: Annotations,
    pub restricted_to: Vec<String>,
}

/// Collection of hosts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layer {
    pub id: String,
    pub account: Option<String>,
    pub owner: Option<RecordRef>,
    pub annotations: Annotations,
}

/// Secret-holding resource.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Variable {
    pub id: String,
    pub account: Option<String>,
    pub owner: Option<RecordRef>,
    pub annotations: Annotations,
    /// Free-form description of the secret's kind (not the record kind).
    pub kind: Option<String>,
    pub mime_type: Option<String>,
}

/// Service endpoint resource.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Webservice {
    pub id: String,
    pub account: Option<String>,
    pub owner: Option<RecordRef>,
    pub annotations: Annotations,
}

/// Factory that enrolls new hosts into layers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostFactory {
    pub id: String,
    pub account: Option<String>,
    pub owner: Option<RecordRef>,
    pub annotations: Annotations,
    pub layers: Vec<RecordRef>,
}

/// Namespace that scopes the records in its body.
///
/// The body is not part of [`Record::referenced_records`]; passes reach it
/// through the policy hook of the traversal instead.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Policy {
    pub id: String,
    pub account: Option<String>,
    pub owner: Option<RecordRef>,
    pub annotations: Annotations,
    pub body: Vec<Entry>,
}

/// Reference to a role declared elsewhere, identified by `account:kind:id`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Role {
    pub kind: String,
    pub id: String,
    pub account: Option<String>,
}

impl Role {
    /// Creates a role reference with no account.
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
            account: None,
        }
    }

    /// Parses a roleid of exactly three colon-delimited, non-empty segments.
    ///
    /// ```
    /// # use warden_ast::Role;
    /// let role = Role::parse_roleid("test:user:admin").unwrap();
    /// assert_eq!(role.account.as_deref(), Some("test"));
    /// assert_eq!(role.kind, "user");
    /// assert_eq!(role.id, "admin");
    /// assert!(Role::parse_roleid("test:admin").is_none());
    /// ```
    pub fn parse_roleid(roleid: &str) -> Option<Self> {
        let segments: Vec<&str> = roleid.split(':').collect();
        match segments.as_slice() {
            [account, kind, id] if !account.is_empty() && !kind.is_empty() && !id.is_empty() => {
                Some(Self {
                    kind: (*kind).to_string(),
                    id: (*id).to_string(),
                    account: Some((*account).to_string()),
                })
            }
            _ => None,
        }
    }
}

/// Reference to a resource declared elsewhere.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resource {
    pub kind: String,
    pub id: String,
    pub account: Option<String>,
}

impl Resource {
    /// Creates a resource reference with no account.
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
            account: None,
        }
    }
}

/// One member entry of a [`Grant`].
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub role: RecordRef,
    pub admin: bool,
}

impl Member {
    pub fn new(role: RecordRef) -> Self {
        Self { role, admin: false }
    }
}

/// Grants `role` to each member.
#[derive(Debug, Clone, PartialEq)]
pub struct Grant {
    pub role: RecordRef,
    pub members: Vec<Member>,
}

/// Revokes `role` from `member`.
#[derive(Debug, Clone, PartialEq)]
pub struct Revoke {
    pub role: RecordRef,
    pub member: RecordRef,
}

/// Permits each role the privileges on each resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Permit {
    pub roles: Vec<RecordRef>,
    pub privileges: Vec<String>,
    pub resources: Vec<RecordRef>,
}

/// Removes privileges from a role on a resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Deny {
    pub role: RecordRef,
    pub privileges: Vec<String>,
    pub resource: RecordRef,
}

/// Deletes a previously declared record.
#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub record: RecordRef,
}

macro_rules! impl_declaration {
    ($($ty:ident => $kind:literal),* $(,)?) => {$(
        impl $ty {
            /// Record kind name.
            pub const KIND: &'static str = $kind;

            /// Creates the declaration with the given (possibly relative) id.
            pub fn new(id: impl Into<String>) -> Self {
                Self {
                    id: id.into(),
                    ..Self::default()
                }
            }
        }

        impl Identifiable for $ty {
            fn id(&self) -> &str {
                &self.id
            }

            fn set_id(&mut self, id: String) {
                self.id = id;
            }
        }

        impl Accountable for $ty {
            fn account(&self) -> Option<&str> {
                self.account.as_deref()
            }

            fn set_account(&mut self, account: Option<String>) {
                self.account = account;
            }
        }

        impl Ownable for $ty {
            fn owner(&self) -> Option<RecordRef> {
                self.owner
            }

            fn set_owner(&mut self, owner: Option<RecordRef>) {
                self.owner = owner;
            }
        }

        impl Annotatable for $ty {
            fn annotations(&self) -> &Annotations {
                &self.annotations
            }

            fn annotations_mut(&mut self) -> &mut Annotations {
                &mut self.annotations
            }
        }

        impl From<$ty> for Record {
            fn from(record: $ty) -> Self {
                Record::$ty(record)
            }
        }
    )*};
}

impl_declaration! {
    User => "user",
    Group => "group",
    Host => "host",
    Layer => "layer",
    Variable => "variable",
    Webservice => "webservice",
    HostFactory => "host_factory",
    Policy => "policy",
}

macro_rules! impl_reference {
    ($($ty:ident),* $(,)?) => {$(
        impl Identifiable for $ty {
            fn id(&self) -> &str {
                &self.id
            }

            fn set_id(&mut self, id: String) {
                self.id = id;
            }
        }

        impl Accountable for $ty {
            fn account(&self) -> Option<&str> {
                self.account.as_deref()
            }

            fn set_account(&mut self, account: Option<String>) {
                self.account = account;
            }
        }

        impl From<$ty> for Record {
            fn from(record: $ty) -> Self {
                Record::$ty(record)
            }
        }
    )*};
}

impl_reference!(Role, Resource);

macro_rules! impl_statement {
    ($($ty:ident),* $(,)?) => {$(
        impl From<$ty> for Record {
            fn from(record: $ty) -> Self {
                Record::$ty(record)
            }
        }
    )*};
}

impl_statement!(Grant, Revoke, Permit, Deny, Delete);

/// Any node of the record graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    User(User),
    Group(Group),
    Host(Host),
    Layer(Layer),
    Variable(Variable),
    Webservice(Webservice),
    HostFactory(HostFactory),
    Policy(Policy),
    Role(Role),
    Resource(Resource),
    Grant(Grant),
    Revoke(Revoke),
    Permit(Permit),
    Deny(Deny),
    Delete(Delete),
}

/// Applies `$body` to the inner declaration, or evaluates `$fallback`.
macro_rules! with_declaration {
    ($record:expr, $inner:ident => $body:expr, _ => $fallback:expr) => {
        match $record {
            Record::User($inner) => $body,
            Record::Group($inner) => $body,
            Record::Host($inner) => $body,
            Record::Layer($inner) => $body,
            Record::Variable($inner) => $body,
            Record::Webservice($inner) => $body,
            Record::HostFactory($inner) => $body,
            Record::Policy($inner) => $body,
            _ => $fallback,
        }
    };
}

impl Record {
    /// Kind name used in role ids, namespacing and duplicate keys.
    ///
    /// References report the kind they point at.
    pub fn kind(&self) -> &str {
        match self {
            Record::User(_) => User::KIND,
            Record::Group(_) => Group::KIND,
            Record::Host(_) => Host::KIND,
            Record::Layer(_) => Layer::KIND,
            Record::Variable(_) => Variable::KIND,
            Record::Webservice(_) => Webservice::KIND,
            Record::HostFactory(_) => HostFactory::KIND,
            Record::Policy(_) => Policy::KIND,
            Record::Role(role) => &role.kind,
            Record::Resource(resource) => &resource.kind,
            Record::Grant(_) => "grant",
            Record::Revoke(_) => "revoke",
            Record::Permit(_) => "permit",
            Record::Deny(_) => "deny",
            Record::Delete(_) => "delete",
        }
    }

    /// Tag used by documents to name the variant itself.
    pub fn type_name(&self) -> &str {
        match self {
            Record::Role(_) => "role",
            Record::Resource(_) => "resource",
            other => other.kind(),
        }
    }

    /// Whether this record declares a new entity.
    pub fn is_declaration(&self) -> bool {
        with_declaration!(self, _r => true, _ => false)
    }

    /// Whether this record is, or refers to, a role.
    pub fn is_role(&self) -> bool {
        matches!(
            self,
            Record::User(_)
                | Record::Group(_)
                | Record::Host(_)
                | Record::Layer(_)
                | Record::HostFactory(_)
                | Record::Policy(_)
                | Record::Role(_)
        )
    }

    pub fn as_policy(&self) -> Option<&Policy> {
        match self {
            Record::Policy(policy) => Some(policy),
            _ => None,
        }
    }

    pub fn as_identifiable(&self) -> Option<&dyn Identifiable> {
        match self {
            Record::Role(role) => Some(role),
            Record::Resource(resource) => Some(resource),
            other => with_declaration!(other, r => Some(r as &dyn Identifiable), _ => None),
        }
    }

    pub fn as_identifiable_mut(&mut self) -> Option<&mut dyn Identifiable> {
        match self {
            Record::Role(role) => Some(role),
            Record::Resource(resource) => Some(resource),
            other => with_declaration!(other, r => Some(r as &mut dyn Identifiable), _ => None),
        }
    }

    pub fn as_accountable(&self) -> Option<&dyn Accountable> {
        match self {
            Record::Role(role) => Some(role),
            Record::Resource(resource) => Some(resource),
            other => with_declaration!(other, r => Some(r as &dyn Accountable), _ => None),
        }
    }

    pub fn as_accountable_mut(&mut self) -> Option<&mut dyn Accountable> {
        match self {
            Record::Role(role) => Some(role),
            Record::Resource(resource) => Some(resource),
            other => with_declaration!(other, r => Some(r as &mut dyn Accountable), _ => None),
        }
    }

    pub fn as_ownable(&self) -> Option<&dyn Ownable> {
        with_declaration!(self, r => Some(r as &dyn Ownable), _ => None)
    }

    pub fn as_ownable_mut(&mut self) -> Option<&mut dyn Ownable> {
        with_declaration!(self, r => Some(r as &mut dyn Ownable), _ => None)
    }

    pub fn as_annotatable(&self) -> Option<&dyn Annotatable> {
        with_declaration!(self, r => Some(r as &dyn Annotatable), _ => None)
    }

    pub fn as_annotatable_mut(&mut self) -> Option<&mut dyn Annotatable> {
        with_declaration!(self, r => Some(r as &mut dyn Annotatable), _ => None)
    }

    /// Other records reachable from this one, in field order.
    ///
    /// Used for traversal and dependency ordering, never for ownership of
    /// the referenced nodes. Policy bodies are deliberately excluded.
    pub fn referenced_records(&self) -> Vec<RecordRef> {
        match self {
            Record::HostFactory(factory) => factory
                .owner
                .into_iter()
                .chain(factory.layers.iter().copied())
                .collect(),
            Record::Role(_) | Record::Resource(_) => Vec::new(),
            Record::Grant(grant) => std::iter::once(grant.role)
                .chain(grant.members.iter().map(|member| member.role))
                .collect(),
            Record::Revoke(revoke) => vec![revoke.role, revoke.member],
            Record::Permit(permit) => permit
                .roles
                .iter()
                .chain(permit.resources.iter())
                .copied()
                .collect(),
            Record::Deny(deny) => vec![deny.role, deny.resource],
            Record::Delete(delete) => vec![delete.record],
            other => other
                .as_ownable()
                .and_then(|ownable| ownable.owner())
                .into_iter()
                .collect(),
        }
    }
}
