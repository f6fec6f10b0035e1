use std::sync::Arc;

use regex::Captures;

use courier_core::{BoxedPrincipal, CallbackQuery, Message, Principal, Update, downcast_principal};

use crate::context::UpdateContext;
use crate::error::ArgumentError;
use crate::param::ParameterMapping;

/// One resolved argument value.
#[derive(Debug, Clone)]
pub enum Argument {
    /// Captured text; `None` if the group did not participate or does not exist.
    Text(Option<String>),
    /// The raw update.
    Update(Arc<Update>),
    /// The message, if the update is a message.
    Message(Option<Message>),
    /// The callback query, if the update is a callback.
    Callback(Option<CallbackQuery>),
    /// The principal, if present and of the declared type.
    Principal(Option<BoxedPrincipal>),
    /// The update context.
    Context(Arc<UpdateContext>),
}

impl Argument {
    fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Update(_) => "update",
            Self::Message(_) => "message",
            Self::Callback(_) => "callback",
            Self::Principal(_) => "principal",
            Self::Context(_) => "context",
        }
    }

    fn resolve(mapping: &ParameterMapping, ctx: &Arc<UpdateContext>, captures: Option<&Captures<'_>>) -> Self {
        match mapping {
            ParameterMapping::IndexedGroup(index) => Self::Text(
                captures
                    .and_then(|caps| caps.get(*index))
                    .map(|m| m.as_str().to_owned()),
            ),
            ParameterMapping::NamedGroup(name) => Self::Text(
                captures
                    .and_then(|caps| caps.name(name))
                    .map(|m| m.as_str().to_owned()),
            ),
            ParameterMapping::RawUpdate => Self::Update(ctx.update_arc()),
            ParameterMapping::RawMessage => Self::Message(ctx.update().as_message().cloned()),
            ParameterMapping::RawCallback => Self::Callback(ctx.update().as_callback().cloned()),
            ParameterMapping::TypedPrincipal(ty) => Self::Principal(
                ctx.principal()
                    .filter(|&principal| ty.accepts(&**principal))
                    .cloned(),
            ),
            ParameterMapping::ExplicitContext => Self::Context(ctx.clone()),
        }
    }
}

/// The positional arguments passed to a handler function.
///
/// Arguments appear in declaration order. Named parameters can also be
/// looked up by name.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    values: Vec<Argument>,
    names: Vec<Option<String>>,
}

macro_rules! expect_kind {
    ($self:ident, $index:expr, $variant:ident, $expected:literal) => {
        match $self.get($index)? {
            Argument::$variant(value) => Ok(value),
            other => Err(ArgumentError::TypeMismatch {
                index: $index,
                expected: $expected,
                actual: other.kind(),
            }),
        }
    };
}

impl Arguments {
    pub(crate) fn resolve(
        mappings: &[ParameterMapping],
        names: &[Option<String>],
        ctx: &Arc<UpdateContext>,
        captures: Option<&Captures<'_>>,
    ) -> Self {
        Self {
            values: mappings
                .iter()
                .map(|mapping| Argument::resolve(mapping, ctx, captures))
                .collect(),
            names: names.to_vec(),
        }
    }

    /// Builds arguments from explicit values. Useful for testing handlers.
    pub fn from_values(values: Vec<Argument>) -> Self {
        let names = vec![None; values.len()];
        Self { values, names }
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the handler takes no arguments.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over the arguments in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Argument> {
        self.values.iter()
    }

    /// The argument at `index`.
    pub fn get(&self, index: usize) -> Result<&Argument, ArgumentError> {
        self.values.get(index).ok_or(ArgumentError::OutOfRange(index))
    }

    /// Position of the parameter named `name`.
    pub fn position(&self, name: &str) -> Result<usize, ArgumentError> {
        self.names
            .iter()
            .position(|n| n.as_deref() == Some(name))
            .ok_or_else(|| ArgumentError::UnknownName(name.to_owned()))
    }

    /// Text at `index`; `None` if the group did not match.
    pub fn text(&self, index: usize) -> Result<Option<&str>, ArgumentError> {
        expect_kind!(self, index, Text, "text").map(|v| v.as_deref())
    }

    /// Text at `index`, failing if it is absent.
    pub fn required_text(&self, index: usize) -> Result<&str, ArgumentError> {
        self.text(index)?.ok_or(ArgumentError::Missing(index))
    }

    /// Text of the parameter named `name`.
    pub fn named_text(&self, name: &str) -> Result<Option<&str>, ArgumentError> {
        self.text(self.position(name)?)
    }

    /// The raw update at `index`.
    pub fn update(&self, index: usize) -> Result<&Update, ArgumentError> {
        expect_kind!(self, index, Update, "update").map(|v| &**v)
    }

    /// The raw message at `index`.
    pub fn message(&self, index: usize) -> Result<Option<&Message>, ArgumentError> {
        expect_kind!(self, index, Message, "message").map(|v| v.as_ref())
    }

    /// The raw callback query at `index`.
    pub fn callback(&self, index: usize) -> Result<Option<&CallbackQuery>, ArgumentError> {
        expect_kind!(self, index, Callback, "callback").map(|v| v.as_ref())
    }

    /// The principal at `index`.
    pub fn principal(&self, index: usize) -> Result<Option<&BoxedPrincipal>, ArgumentError> {
        expect_kind!(self, index, Principal, "principal").map(|v| v.as_ref())
    }

    /// The principal at `index`, viewed as its concrete type.
    pub fn principal_as<P: Principal>(&self, index: usize) -> Result<Option<&P>, ArgumentError> {
        Ok(self
            .principal(index)?
            .and_then(|principal| downcast_principal::<P>(&**principal)))
    }

    /// The update context at `index`.
    pub fn context(&self, index: usize) -> Result<&Arc<UpdateContext>, ArgumentError> {
        expect_kind!(self, index, Context, "context")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::PrincipalType;
    use courier_core::{AnonymousPrincipal, SimplePrincipal};
    use regex::Regex;

    use crate::test_util::{NullSender, message_update};

    fn context(principal: Option<BoxedPrincipal>) -> Arc<UpdateContext> {
        Arc::new(UpdateContext::new(
            "",
            Arc::new(NullSender),
            Arc::new(message_update(1, "/greet alice")),
            principal,
        ))
    }

    #[test]
    fn test_resolve_groups() {
        let ctx = context(None);
        let regex = Regex::new(r"\A(?:/greet (?<name>\w+)(?: (\d+))?)\z").unwrap();
        let caps = regex.captures("/greet alice").unwrap();

        let args = Arguments::resolve(
            &[
                ParameterMapping::IndexedGroup(0),
                ParameterMapping::NamedGroup("name".into()),
                ParameterMapping::IndexedGroup(2),
                ParameterMapping::IndexedGroup(9),
                ParameterMapping::NamedGroup("missing".into()),
            ],
            &[None, Some("name".into()), None, None, None],
            &ctx,
            Some(&caps),
        );

        assert_eq!(args.text(0).unwrap(), Some("/greet alice"));
        assert_eq!(args.named_text("name").unwrap(), Some("alice"));
        assert_eq!(args.text(2).unwrap(), None);
        assert_eq!(args.text(3).unwrap(), None);
        assert_eq!(args.text(4).unwrap(), None);
        assert_eq!(args.required_text(2), Err(ArgumentError::Missing(2)));
    }

    #[test]
    fn test_resolve_without_captures() {
        let ctx = context(None);
        let args = Arguments::resolve(&[ParameterMapping::IndexedGroup(0)], &[None], &ctx, None);
        assert_eq!(args.text(0).unwrap(), None);
    }

    #[test]
    fn test_resolve_raw_objects() {
        let ctx = context(None);
        let args = Arguments::resolve(
            &[
                ParameterMapping::RawUpdate,
                ParameterMapping::RawMessage,
                ParameterMapping::RawCallback,
                ParameterMapping::ExplicitContext,
            ],
            &[None, None, None, None],
            &ctx,
            None,
        );

        assert_eq!(args.update(0).unwrap().update_id, 1);
        assert_eq!(
            args.message(1).unwrap().and_then(|m| m.text.as_deref()),
            Some("/greet alice")
        );
        assert!(args.callback(2).unwrap().is_none());
        assert!(Arc::ptr_eq(args.context(3).unwrap(), &ctx));
    }

    #[test]
    fn test_principal_narrowing() {
        let ctx = context(Some(Arc::new(AnonymousPrincipal::new(7))));
        let args = Arguments::resolve(
            &[
                ParameterMapping::TypedPrincipal(PrincipalType::any()),
                ParameterMapping::TypedPrincipal(PrincipalType::of::<SimplePrincipal>()),
                ParameterMapping::TypedPrincipal(PrincipalType::of::<AnonymousPrincipal>()),
            ],
            &[None, None, None],
            &ctx,
            None,
        );

        assert_eq!(args.principal(0).unwrap().map(|p| p.user_id()), Some(7));
        assert!(args.principal(1).unwrap().is_none());
        assert!(args.principal_as::<AnonymousPrincipal>(2).unwrap().is_some());
    }

    #[test]
    fn test_accessor_errors() {
        let args = Arguments::from_values(vec![Argument::Text(Some("x".into()))]);
        assert_eq!(args.len(), 1);
        assert_eq!(args.get(3).unwrap_err(), ArgumentError::OutOfRange(3));
        assert_eq!(
            args.update(0).unwrap_err(),
            ArgumentError::TypeMismatch {
                index: 0,
                expected: "update",
                actual: "text",
            }
        );
        assert_eq!(
            args.named_text("nope").unwrap_err(),
            ArgumentError::UnknownName("nope".into())
        );
    }
}
