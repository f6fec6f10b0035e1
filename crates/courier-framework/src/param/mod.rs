//! Handler parameter descriptors and the rules that map them to argument sources.
//!
//! Every handler function declares its parameters up front as a list of
//! [`Param`] descriptors. At binding time each descriptor is turned into a
//! [`ParameterMapping`] by [`map_parameter`]; at dispatch time the mappings
//! are resolved against the update into [`Arguments`].
//!
//! # Mapping rules
//!
//! | Marker                 | Declared type        | Mapping                          |
//! |------------------------|----------------------|----------------------------------|
//! | text                   | string               | capture group 0                  |
//! | group (name)           | string               | named capture group              |
//! | group (index)          | string               | numbered capture group           |
//! | raw                    | update               | the raw update                   |
//! | raw                    | message              | the message (route restrictions) |
//! | raw                    | callback             | the callback (route restrictions)|
//! | none                   | named string         | named capture group              |
//! | none                   | principal            | the principal, narrowed          |
//! | none                   | context              | the update context               |
//!
//! Anything else is a configuration error.
//!
//! # Example
//!
//! ```rust,ignore
//! use courier_framework::param::{Param, ParamType};
//!
//! let params = vec![
//!     Param::string("name"),                        // named group "name"
//!     Param::unnamed(ParamType::string()).text(),   // whole match
//!     Param::principal::<AdminPrincipal>("admin"),  // narrowed principal
//! ];
//! ```

mod arguments;

pub use arguments::{Argument, Arguments};

use std::any::{Any, TypeId};
use std::fmt;

use courier_core::Principal;

use crate::error::MappingError;

/// The route a handler function is registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteKind {
    /// Text message routes.
    Message,
    /// Callback query routes.
    Callback,
    /// The catch-all route.
    Fallback,
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Message => "message",
            Self::Callback => "callback",
            Self::Fallback => "fallback",
        })
    }
}

// =============================================================================
// Principal type descriptor
// =============================================================================

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
enum PrincipalTarget {
    Any,
    Concrete { id: TypeId, name: &'static str },
}

/// A declared principal parameter type.
///
/// Either accepts any principal, or only one concrete [`Principal`]
/// implementation. Equality includes nullability.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrincipalType {
    target: PrincipalTarget,
    nullable: bool,
}

impl PrincipalType {
    /// Accepts any principal.
    pub fn any() -> Self {
        Self {
            target: PrincipalTarget::Any,
            nullable: false,
        }
    }

    /// Accepts only principals of type `P`.
    pub fn of<P: Principal>() -> Self {
        Self {
            target: PrincipalTarget::Concrete {
                id: TypeId::of::<P>(),
                name: std::any::type_name::<P>(),
            },
            nullable: false,
        }
    }

    /// Marks the type as nullable.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Returns `true` if absent principals are acceptable.
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Returns `true` if `principal` is an instance of this type.
    pub fn accepts(&self, principal: &dyn Principal) -> bool {
        match self.target {
            PrincipalTarget::Any => true,
            PrincipalTarget::Concrete { id, .. } => Any::type_id(principal.as_any()) == id,
        }
    }

    fn name(&self) -> &'static str {
        match self.target {
            PrincipalTarget::Any => "Principal",
            PrincipalTarget::Concrete { name, .. } => name,
        }
    }
}

impl fmt::Debug for PrincipalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())?;
        if self.nullable {
            f.write_str("?")?;
        }
        Ok(())
    }
}

// =============================================================================
// Parameter descriptors
// =============================================================================

/// The declared type of a handler parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// Text.
    String { nullable: bool },
    /// The raw update.
    Update { nullable: bool },
    /// The raw message.
    Message { nullable: bool },
    /// The raw callback query.
    Callback { nullable: bool },
    /// A principal.
    Principal(PrincipalType),
    /// The update context.
    Context { nullable: bool },
    /// Anything the framework cannot supply.
    Other(&'static str),
}

impl ParamType {
    /// Non-nullable string.
    pub fn string() -> Self {
        Self::String { nullable: false }
    }

    /// Nullable string.
    pub fn optional_string() -> Self {
        Self::String { nullable: true }
    }

    /// Non-nullable update.
    pub fn update() -> Self {
        Self::Update { nullable: false }
    }

    /// Non-nullable message.
    pub fn message() -> Self {
        Self::Message { nullable: false }
    }

    /// Nullable message.
    pub fn optional_message() -> Self {
        Self::Message { nullable: true }
    }

    /// Non-nullable callback query.
    pub fn callback() -> Self {
        Self::Callback { nullable: false }
    }

    /// Nullable callback query.
    pub fn optional_callback() -> Self {
        Self::Callback { nullable: true }
    }

    /// Non-nullable context.
    pub fn context() -> Self {
        Self::Context { nullable: false }
    }

    fn is_string(&self) -> bool {
        matches!(self, Self::String { .. })
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, nullable) = match self {
            Self::String { nullable } => ("String", *nullable),
            Self::Update { nullable } => ("Update", *nullable),
            Self::Message { nullable } => ("Message", *nullable),
            Self::Callback { nullable } => ("CallbackQuery", *nullable),
            Self::Principal(ty) => return write!(f, "{ty:?}"),
            Self::Context { nullable } => ("UpdateContext", *nullable),
            Self::Other(name) => (*name, false),
        };
        f.write_str(name)?;
        if nullable {
            f.write_str("?")?;
        }
        Ok(())
    }
}

/// Extraction marker attached to a parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamAnnotation {
    /// The whole matched text.
    Text,
    /// A capture group, by name if `name` is non-empty, otherwise by `id`.
    Group { name: String, id: i32 },
    /// A raw platform object.
    Raw { optional: bool },
}

impl ParamAnnotation {
    /// A group marker with neither name nor explicit id: group 0.
    pub fn default_group() -> Self {
        Self::Group {
            name: String::new(),
            id: 0,
        }
    }
}

/// A declared handler parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    name: Option<String>,
    ty: ParamType,
    annotation: Option<ParamAnnotation>,
}

impl Param {
    /// A named parameter without a marker.
    pub fn new(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: Some(name.into()),
            ty,
            annotation: None,
        }
    }

    /// An unnamed parameter without a marker.
    pub fn unnamed(ty: ParamType) -> Self {
        Self {
            name: None,
            ty,
            annotation: None,
        }
    }

    /// A named non-nullable string, bound to the capture group of the same name.
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::string())
    }

    /// A named nullable string, bound to the capture group of the same name.
    pub fn optional_string(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::optional_string())
    }

    /// A principal narrowed to `P`.
    pub fn principal<P: Principal>(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Principal(PrincipalType::of::<P>()))
    }

    /// Any principal.
    pub fn any_principal(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Principal(PrincipalType::any()))
    }

    /// The update context.
    pub fn context(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::context())
    }

    /// The raw update.
    pub fn raw_update(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::update()).raw()
    }

    /// The raw message.
    pub fn raw_message(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::message()).raw()
    }

    /// The raw callback query.
    pub fn raw_callback(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::callback()).raw()
    }

    /// Attaches a marker.
    pub fn annotated(mut self, annotation: ParamAnnotation) -> Self {
        self.annotation = Some(annotation);
        self
    }

    /// Marks the parameter as receiving the whole matched text.
    pub fn text(self) -> Self {
        self.annotated(ParamAnnotation::Text)
    }

    /// Marks the parameter as receiving the named capture group.
    pub fn group(self, name: impl Into<String>) -> Self {
        self.annotated(ParamAnnotation::Group {
            name: name.into(),
            id: -1,
        })
    }

    /// Marks the parameter as receiving the numbered capture group.
    pub fn group_index(self, id: i32) -> Self {
        self.annotated(ParamAnnotation::Group {
            name: String::new(),
            id,
        })
    }

    /// Marks the parameter as receiving a raw platform object.
    pub fn raw(self) -> Self {
        self.annotated(ParamAnnotation::Raw { optional: false })
    }

    /// Marks the parameter as receiving an optional raw platform object.
    pub fn raw_optional(self) -> Self {
        self.annotated(ParamAnnotation::Raw { optional: true })
    }

    /// The declared name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The declared type.
    pub fn ty(&self) -> ParamType {
        self.ty
    }

    /// The attached marker, if any.
    pub fn annotation(&self) -> Option<&ParamAnnotation> {
        self.annotation.as_ref()
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name}: {}", self.ty),
            None => write!(f, "_: {}", self.ty),
        }
    }
}

// =============================================================================
// Mapping
// =============================================================================

/// Where the value of one parameter comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParameterMapping {
    /// A numbered capture group; 0 is the whole match.
    IndexedGroup(usize),
    /// A named capture group.
    NamedGroup(String),
    /// The raw update.
    RawUpdate,
    /// The message of a message update.
    RawMessage,
    /// The callback query of a callback update.
    RawCallback,
    /// The principal, if it is an instance of the declared type.
    TypedPrincipal(PrincipalType),
    /// The update context.
    ExplicitContext,
}

/// Determines how `param` of a handler registered on `route` obtains its value.
///
/// This is a pure function of the descriptor and the route.
pub fn map_parameter(param: &Param, route: RouteKind) -> Result<ParameterMapping, MappingError> {
    match &param.annotation {
        Some(ParamAnnotation::Text) => {
            if param.ty.is_string() {
                Ok(ParameterMapping::IndexedGroup(0))
            } else {
                Err(MappingError::TextOnNonString {
                    ty: param.ty.to_string(),
                })
            }
        }
        Some(ParamAnnotation::Group { name, id }) => {
            if !param.ty.is_string() {
                return Err(MappingError::GroupOnNonString {
                    ty: param.ty.to_string(),
                });
            }
            if !name.is_empty() {
                Ok(ParameterMapping::NamedGroup(name.clone()))
            } else {
                usize::try_from(*id)
                    .map(ParameterMapping::IndexedGroup)
                    .map_err(|_| MappingError::InvalidGroup)
            }
        }
        Some(ParamAnnotation::Raw { optional }) => map_raw(param.ty, *optional, route),
        None => match param.ty {
            ParamType::String { .. } => match param.name.as_deref() {
                Some(name) if !name.is_empty() => Ok(ParameterMapping::NamedGroup(name.to_owned())),
                _ => Err(MappingError::UnnamedString),
            },
            ParamType::Principal(ty) => Ok(ParameterMapping::TypedPrincipal(ty)),
            ParamType::Context { .. } => Ok(ParameterMapping::ExplicitContext),
            other => Err(MappingError::Undetermined {
                ty: other.to_string(),
            }),
        },
    }
}

fn map_raw(ty: ParamType, optional: bool, route: RouteKind) -> Result<ParameterMapping, MappingError> {
    match ty {
        ParamType::Update { .. } => Ok(ParameterMapping::RawUpdate),
        ParamType::Message { nullable } => {
            if nullable || optional || route == RouteKind::Message {
                Ok(ParameterMapping::RawMessage)
            } else {
                Err(MappingError::RawUnavailable {
                    object: "message",
                    route,
                })
            }
        }
        ParamType::Callback { nullable } => {
            if nullable || optional || route == RouteKind::Callback {
                Ok(ParameterMapping::RawCallback)
            } else {
                Err(MappingError::RawUnavailable {
                    object: "callback",
                    route,
                })
            }
        }
        other => Err(MappingError::RawUnsupported {
            ty: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::{AnonymousPrincipal, SimplePrincipal};

    #[test]
    fn test_text_marker_on_string() {
        let param = Param::unnamed(ParamType::string()).text();
        assert_eq!(
            map_parameter(&param, RouteKind::Message),
            Ok(ParameterMapping::IndexedGroup(0))
        );
    }

    #[test]
    fn test_text_marker_on_non_string_fails() {
        let param = Param::unnamed(ParamType::update()).text();
        assert!(matches!(
            map_parameter(&param, RouteKind::Message),
            Err(MappingError::TextOnNonString { .. })
        ));
    }

    #[test]
    fn test_group_by_name_and_index() {
        let named = Param::unnamed(ParamType::string()).group("x");
        assert_eq!(
            map_parameter(&named, RouteKind::Message),
            Ok(ParameterMapping::NamedGroup("x".into()))
        );

        let whole = Param::unnamed(ParamType::string()).group_index(0);
        assert_eq!(
            map_parameter(&whole, RouteKind::Fallback),
            Ok(ParameterMapping::IndexedGroup(0))
        );

        let indexed = Param::unnamed(ParamType::optional_string()).group_index(2);
        assert_eq!(
            map_parameter(&indexed, RouteKind::Callback),
            Ok(ParameterMapping::IndexedGroup(2))
        );
    }

    #[test]
    fn test_default_group_marker() {
        let on_string = Param::unnamed(ParamType::string()).annotated(ParamAnnotation::default_group());
        assert_eq!(
            map_parameter(&on_string, RouteKind::Callback),
            Ok(ParameterMapping::IndexedGroup(0))
        );

        let on_message = Param::unnamed(ParamType::message()).annotated(ParamAnnotation::default_group());
        assert!(matches!(
            map_parameter(&on_message, RouteKind::Message),
            Err(MappingError::GroupOnNonString { .. })
        ));
    }

    #[test]
    fn test_group_name_wins_over_index() {
        let param = Param::unnamed(ParamType::string()).annotated(ParamAnnotation::Group {
            name: "year".into(),
            id: 3,
        });
        assert_eq!(
            map_parameter(&param, RouteKind::Message),
            Ok(ParameterMapping::NamedGroup("year".into()))
        );
    }

    #[test]
    fn test_group_without_name_or_index_fails() {
        let param = Param::unnamed(ParamType::string()).annotated(ParamAnnotation::Group {
            name: String::new(),
            id: -1,
        });
        assert_eq!(
            map_parameter(&param, RouteKind::Message),
            Err(MappingError::InvalidGroup)
        );

        let non_string = Param::unnamed(ParamType::update()).group_index(-1);
        assert!(map_parameter(&non_string, RouteKind::Message).is_err());
    }

    #[test]
    fn test_raw_update_on_every_route() {
        let param = Param::raw_update("update");
        for route in [RouteKind::Message, RouteKind::Callback, RouteKind::Fallback] {
            assert_eq!(map_parameter(&param, route), Ok(ParameterMapping::RawUpdate));
        }
    }

    #[test]
    fn test_raw_message_route_restrictions() {
        let required = Param::raw_message("msg");
        assert_eq!(
            map_parameter(&required, RouteKind::Message),
            Ok(ParameterMapping::RawMessage)
        );
        assert_eq!(
            map_parameter(&required, RouteKind::Callback),
            Err(MappingError::RawUnavailable {
                object: "message",
                route: RouteKind::Callback,
            })
        );
        assert!(map_parameter(&required, RouteKind::Fallback).is_err());

        let nullable = Param::new("msg", ParamType::optional_message()).raw();
        assert_eq!(
            map_parameter(&nullable, RouteKind::Callback),
            Ok(ParameterMapping::RawMessage)
        );

        let optional = Param::new("msg", ParamType::message()).raw_optional();
        assert_eq!(
            map_parameter(&optional, RouteKind::Fallback),
            Ok(ParameterMapping::RawMessage)
        );
    }

    #[test]
    fn test_raw_callback_route_restrictions() {
        let required = Param::raw_callback("cb");
        assert_eq!(
            map_parameter(&required, RouteKind::Callback),
            Ok(ParameterMapping::RawCallback)
        );
        assert!(map_parameter(&required, RouteKind::Message).is_err());

        let nullable = Param::new("cb", ParamType::optional_callback()).raw();
        assert_eq!(
            map_parameter(&nullable, RouteKind::Message),
            Ok(ParameterMapping::RawCallback)
        );
    }

    #[test]
    fn test_raw_on_unsupported_type_fails() {
        let param = Param::new("s", ParamType::string()).raw();
        assert!(matches!(
            map_parameter(&param, RouteKind::Message),
            Err(MappingError::RawUnsupported { .. })
        ));
    }

    #[test]
    fn test_unannotated_rules() {
        assert_eq!(
            map_parameter(&Param::string("name"), RouteKind::Message),
            Ok(ParameterMapping::NamedGroup("name".into()))
        );
        assert_eq!(
            map_parameter(&Param::unnamed(ParamType::string()), RouteKind::Message),
            Err(MappingError::UnnamedString)
        );
        assert_eq!(
            map_parameter(&Param::context("ctx"), RouteKind::Fallback),
            Ok(ParameterMapping::ExplicitContext)
        );
        assert!(matches!(
            map_parameter(&Param::new("n", ParamType::Other("i32")), RouteKind::Message),
            Err(MappingError::Undetermined { .. })
        ));
        assert!(matches!(
            map_parameter(&Param::new("u", ParamType::update()), RouteKind::Message),
            Err(MappingError::Undetermined { .. })
        ));
    }

    #[test]
    fn test_principal_mapping_keeps_declared_type() {
        let param = Param::principal::<SimplePrincipal>("user");
        assert_eq!(
            map_parameter(&param, RouteKind::Callback),
            Ok(ParameterMapping::TypedPrincipal(PrincipalType::of::<SimplePrincipal>()))
        );

        let nullable = Param::new(
            "user",
            ParamType::Principal(PrincipalType::of::<SimplePrincipal>().nullable()),
        );
        assert_ne!(
            map_parameter(&nullable, RouteKind::Callback),
            Ok(ParameterMapping::TypedPrincipal(PrincipalType::of::<SimplePrincipal>()))
        );
    }

    #[test]
    fn test_principal_type_accepts() {
        let simple = SimplePrincipal::new(1, ["admin"]);
        let anonymous = AnonymousPrincipal::new(1);

        assert!(PrincipalType::any().accepts(&simple));
        assert!(PrincipalType::any().accepts(&anonymous));
        assert!(PrincipalType::of::<SimplePrincipal>().accepts(&simple));
        assert!(!PrincipalType::of::<SimplePrincipal>().accepts(&anonymous));
    }
}
