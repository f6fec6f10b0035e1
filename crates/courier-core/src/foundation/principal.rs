//! User principals and role sets.

use std::any::Any;
use std::collections::BTreeSet;
use std::fmt::Debug;
use std::sync::Arc;

use crate::foundation::update::UserId;

/// An ordered set of role names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RoleSet(BTreeSet<String>);

impl RoleSet {
    /// Creates an empty role set.
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Adds a role to the set.
    pub fn insert(&mut self, role: impl Into<String>) -> bool {
        self.0.insert(role.into())
    }

    /// Returns `true` if the set contains `role`.
    pub fn contains(&self, role: &str) -> bool {
        self.0.contains(role)
    }

    /// Returns `true` if every role of `required` is in this set.
    pub fn contains_all(&self, required: &RoleSet) -> bool {
        required.0.is_subset(&self.0)
    }

    /// Number of roles in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the set has no roles.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the roles in lexical order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for RoleSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl std::fmt::Display for RoleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[")?;
        for (i, role) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(role)?;
        }
        f.write_str("]")
    }
}

/// The resolved identity of the user acting on an update.
///
/// Principals are resolved fresh for every update from the sender's
/// platform user id. Applications provide their own implementations when
/// they need to carry more than an id and a set of roles; handlers can
/// then request the concrete type and the dispatcher narrows the principal
/// to it.
pub trait Principal: Any + Debug + Send + Sync {
    /// The platform user id this principal was resolved from.
    fn user_id(&self) -> UserId;

    /// Roles granted to this principal.
    fn roles(&self) -> &RoleSet;

    /// Returns `self` as `Any` for downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;
}

/// A shared principal trait object.
pub type BoxedPrincipal = Arc<dyn Principal>;

/// Attempts to view a principal as the concrete type `P`.
pub fn downcast_principal<P: Principal>(principal: &dyn Principal) -> Option<&P> {
    principal.as_any().downcast_ref::<P>()
}

/// The default principal: a known user without any roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnonymousPrincipal {
    user_id: UserId,
    roles: RoleSet,
}

impl AnonymousPrincipal {
    /// Creates an anonymous principal for `user_id`.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            roles: RoleSet::new(),
        }
    }
}

impl Principal for AnonymousPrincipal {
    fn user_id(&self) -> UserId {
        self.user_id
    }

    fn roles(&self) -> &RoleSet {
        &self.roles
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A principal with an explicit role set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimplePrincipal {
    user_id: UserId,
    roles: RoleSet,
}

impl SimplePrincipal {
    /// Creates a principal for `user_id` holding `roles`.
    pub fn new<I, S>(user_id: UserId, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            user_id,
            roles: roles.into_iter().collect(),
        }
    }
}

impl Principal for SimplePrincipal {
    fn user_id(&self) -> UserId {
        self.user_id
    }

    fn roles(&self) -> &RoleSet {
        &self.roles
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_all() {
        let held: RoleSet = ["admin", "user"].into_iter().collect();
        let required: RoleSet = ["user"].into_iter().collect();
        let missing: RoleSet = ["user", "owner"].into_iter().collect();

        assert!(held.contains_all(&required));
        assert!(held.contains_all(&RoleSet::new()));
        assert!(!held.contains_all(&missing));
    }

    #[test]
    fn test_downcast_principal() {
        let principal: BoxedPrincipal = Arc::new(SimplePrincipal::new(1, ["a"]));
        assert!(downcast_principal::<SimplePrincipal>(principal.as_ref()).is_some());
        assert!(downcast_principal::<AnonymousPrincipal>(principal.as_ref()).is_none());
    }

    #[test]
    fn test_display() {
        let roles: RoleSet = ["b", "a"].into_iter().collect();
        assert_eq!(roles.to_string(), "[a, b]");
    }
}
