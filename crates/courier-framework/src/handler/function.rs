use std::any::Any;
use std::future::Future;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::error::{BoxError, DispatchError};
use crate::param::Arguments;
use crate::response::{IntoReply, Reply};

/// Future returned by a type-erased handler function.
pub type HandlerFuture = BoxFuture<'static, Result<Reply, BoxError>>;

/// A type-erased handler function.
///
/// Implemented for every `Fn(Arguments) -> impl Future<Output = impl IntoReply>`
/// through [`into_handler_fn`].
pub trait HandlerFn: Send + Sync {
    /// Calls the function.
    fn call(&self, args: Arguments) -> HandlerFuture;

    /// Whether the return type can carry a reply.
    fn returns_value(&self) -> bool;
}

/// A shared handler function.
pub type BoxedHandlerFn = Arc<dyn HandlerFn>;

struct FnHandler<F, Fut, R> {
    f: F,
    _marker: PhantomData<fn() -> (Fut, R)>,
}

impl<F, Fut, R> HandlerFn for FnHandler<F, Fut, R>
where
    F: Fn(Arguments) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply + 'static,
{
    fn call(&self, args: Arguments) -> HandlerFuture {
        let fut = (self.f)(args);
        Box::pin(async move { fut.await.into_reply() })
    }

    fn returns_value(&self) -> bool {
        R::RETURNS_VALUE
    }
}

/// Erases an async function into a [`BoxedHandlerFn`].
pub fn into_handler_fn<F, Fut, R>(f: F) -> BoxedHandlerFn
where
    F: Fn(Arguments) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply + 'static,
{
    Arc::new(FnHandler {
        f,
        _marker: PhantomData,
    })
}

/// Calls `function`, turning errors and panics into [`DispatchError`]s.
pub(crate) async fn call_guarded(function: &BoxedHandlerFn, args: Arguments) -> Result<Reply, DispatchError> {
    match AssertUnwindSafe(async { function.call(args).await }).catch_unwind().await {
        Ok(Ok(reply)) => Ok(reply),
        Ok(Err(err)) => Err(DispatchError::Handler(err)),
        Err(panic) => Err(DispatchError::Panicked(panic_message(&*panic))),
    }
}

/// Extracts the message of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    }
}
