// exposed API of the serializer

use self::future::*;
use super::core::{self, Upstream, UpstreamFut};
use std::future::Future;


/// Wrap an upstream asynchronous operation so it never runs more than once at a time
///
/// Equivalent to [`Serializer::new`]. The returned handle exposes the same call shape
/// as invoking `upstream` directly, except that concurrent calls are queued and served
/// strictly one upstream invocation at a time, in arrival order.
pub fn unparallel<F, Fut, T, E>(upstream: F) -> Serializer<T, E>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    Serializer::new(upstream)
}

/// Handle for calling an upstream asynchronous operation one invocation at a time
///
/// Wraps a caller-supplied upstream operation: a factory closure that takes no
/// arguments and returns a future of a value or a failure. Any number of callers may
/// [`call`](Self::call) the handle concurrently; each call is queued, and the upstream
/// operation is invoked exactly once per call, with at most one invocation in flight
/// at any instant. The Nth call receives the outcome of the Nth invocation.
///
/// Handles are cheaply cloneable and clones share one queue. Distinct serializers,
/// including ones wrapping the same closure type, are fully independent.
///
/// An upstream failure is relayed to the one call whose turn produced it; it does not
/// affect queued calls, which still get fresh invocations, and it does not poison the
/// serializer. There is no retry.
pub struct Serializer<T, E> {
    core: core::Core<T, E>,
}

impl<T, E> Serializer<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Wrap an upstream asynchronous operation
    ///
    /// `upstream` is not invoked here; the first invocation happens on the first
    /// [`call`](Self::call).
    pub fn new<F, Fut>(mut upstream: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let upstream: Upstream<T, E> =
            Box::new(move || Box::pin(upstream()) as UpstreamFut<T, E>);
        Serializer { core: core::Core::new(upstream) }
    }

    /// Enqueue one call to the upstream operation
    ///
    /// Returns a future that settles with exactly the outcome of the upstream
    /// invocation made for this call's turn. If the serializer is idle, that
    /// invocation starts before this method returns; otherwise it starts once every
    /// earlier call has been served. This method itself never fails, and the queue is
    /// unbounded.
    ///
    /// Dropping the returned future does not cancel the turn: the upstream invocation
    /// for it is still made and its outcome discarded.
    ///
    /// # Panics
    ///
    /// Panics if called from outside a Tokio runtime context, which is needed to spawn
    /// the task that drives upstream invocations.
    pub fn call(&self) -> CallFut<T, E> {
        CallFut {
            turn: self.core.enqueue(),
            terminated: false,
        }
    }
}

impl<T, E> Clone for Serializer<T, E> {
    fn clone(&self) -> Self {
        Serializer { core: self.core.clone() }
    }
}


/// Future types
pub mod future {
    use crate::serial::{core::Settled, error::*};
    use std::{
        future::Future,
        pin::Pin,
        task::{Context, Poll},
    };
    use tokio::sync::oneshot;

    // convert a turn's settlement (or the loss of its channel) into the exposed
    // outcome.
    fn map_turn_outcome<T, E>(
        result: Result<Settled<T, E>, oneshot::error::RecvError>,
    ) -> Result<T, CallError<E>> {
        match result {
            Ok(Settled::Value(value)) => Ok(value),
            Ok(Settled::Failure(failure)) => Err(CallError::Upstream(failure)),
            Ok(Settled::Panicked) => Err(PanickedError.into()),
            Err(_) => Err(LostTurnError.into()),
        }
    }

    /// Future for one call to a [`Serializer`](super::Serializer)
    ///
    /// Settles with the value or failure produced by the upstream invocation made for
    /// this call's turn, once every earlier call has been served. Dropping this future
    /// does not cancel the turn.
    ///
    /// After resolving, further polls return `Pending`, making this future safe to use
    /// in `select!`-style combinators.
    pub struct CallFut<T, E> {
        pub(super) turn: oneshot::Receiver<Settled<T, E>>,
        pub(super) terminated: bool,
    }

    impl<T, E> Future for CallFut<T, E> {
        type Output = Result<T, CallError<E>>;

        fn poll(self: Pin<&mut Self>, cx: &mut Context) -> Poll<Self::Output> {
            let this = self.get_mut();
            // for implementation of FusedFuture
            if this.terminated {
                return Poll::Pending;
            }
            match Pin::new(&mut this.turn).poll(cx) {
                Poll::Ready(result) => {
                    this.terminated = true;
                    Poll::Ready(map_turn_outcome(result))
                }
                Poll::Pending => Poll::Pending,
            }
        }
    }

    impl<T, E> CallFut<T, E> {
        /// Whether this future has already resolved
        pub fn is_terminated(&self) -> bool {
            self.terminated
        }
    }

    impl<T, E> futures::future::FusedFuture for CallFut<T, E> {
        fn is_terminated(&self) -> bool {
            Self::is_terminated(self)
        }
    }
}


// ==== tests ====
