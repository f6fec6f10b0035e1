//! Role-based handler authorization.
//!
//! Roles can be required at two levels: on the controller (applies to all
//! of its handlers) and on the individual handler function. A principal is
//! authorized when it holds every role of both levels. Handlers without any
//! requirement are open to everyone, including updates without a principal.

use std::fmt;

use courier_core::{Principal, RoleSet};

/// Role requirements of one handler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Authorization {
    class_level: Option<RoleSet>,
    function_level: Option<RoleSet>,
}

impl Authorization {
    /// Creates requirements from the two levels.
    pub fn new(class_level: Option<RoleSet>, function_level: Option<RoleSet>) -> Self {
        Self {
            class_level,
            function_level,
        }
    }

    /// No requirements.
    pub fn open() -> Self {
        Self::default()
    }

    /// Returns `true` if at least one level declares a requirement.
    ///
    /// A level declared with an empty role set still counts: it demands a
    /// principal, just no particular role.
    pub fn is_required(&self) -> bool {
        self.class_level.is_some() || self.function_level.is_some()
    }

    /// Checks `principal` against both levels.
    pub fn permits(&self, principal: Option<&dyn Principal>) -> bool {
        if !self.is_required() {
            return true;
        }
        let Some(principal) = principal else {
            return false;
        };
        let roles = principal.roles();
        [&self.class_level, &self.function_level]
            .into_iter()
            .flatten()
            .all(|required| roles.contains_all(required))
    }
}

impl fmt::Display for Authorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.class_level, &self.function_level) {
            (None, None) => f.write_str("open"),
            (Some(class), None) => write!(f, "controller {class}"),
            (None, Some(function)) => write!(f, "function {function}"),
            (Some(class), Some(function)) => write!(f, "controller {class}, function {function}"),
        }
    }
}
