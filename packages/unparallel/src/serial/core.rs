// minimal safe core of the serializer. the exposed API is a convenience wrapper around
// this.

use std::{
    collections::VecDeque,
    future::Future,
    panic::{catch_unwind, resume_unwind, AssertUnwindSafe},
    pin::Pin,
    sync::{Arc, Mutex},
    task::Poll,
};
use futures::FutureExt;
use tokio::sync::oneshot;


// future for one upstream invocation.
pub(crate) type UpstreamFut<T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send>>;

// caller-supplied factory for upstream invocations.
pub(crate) type Upstream<T, E> = Box<dyn FnMut() -> UpstreamFut<T, E> + Send>;

// outcome of one upstream invocation, as delivered to the turn it was attributed to.
pub(crate) enum Settled<T, E> {
    // the invocation resolved with a value.
    Value(T),
    // the invocation settled with a failure.
    Failure(E),
    // the invocation panicked instead of settling.
    Panicked,
}

// handle to serializer shared state.
pub(crate) struct Core<T, E>(Arc<Shared<T, E>>);

// serializer shared state.
struct Shared<T, E> {
    // mutex around lockable state.
    lockable: Mutex<Lockable<T, E>>,

    // mutex around the upstream factory, locked only to start one invocation.
    //
    // kept separate from lockable so a factory body that synchronously calls back into
    // the serializer enqueues normally instead of deadlocking on the queue lock. it is
    // never contended: only the caller that flips running to true, and afterwards the
    // one driver task, ever start invocations.
    upstream: Mutex<Upstream<T, E>>,
}

// serializer lockable state.
struct Lockable<T, E> {
    // settle handles for turns not yet served, front = oldest arrival.
    //
    // invariant: a handle is removed only from the front, and only once the upstream
    // invocation attributed to it has settled.
    pending: VecDeque<oneshot::Sender<Settled<T, E>>>,

    // whether an upstream invocation is currently outstanding.
    //
    // invariant: true if and only if a driver task currently exists for this core.
    running: bool,
}

impl<T, E> Core<T, E> {
    // construct idle with an empty queue.
    pub(crate) fn new(upstream: Upstream<T, E>) -> Self {
        Core(Arc::new(Shared {
            lockable: Mutex::new(Lockable {
                pending: VecDeque::new(),
                running: false,
            }),
            upstream: Mutex::new(upstream),
        }))
    }

    // clone another handle to the same serializer.
    pub(crate) fn clone(&self) -> Self {
        Core(Arc::clone(&self.0))
    }
}

impl<T, E> Core<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    // enqueue one turn, returning the receive half of its settlement channel.
    //
    // if the serializer is idle, the upstream invocation for the new turn is started
    // before this returns, and the driver task that will serve the queue is spawned.
    // never unwinds into the caller, even if the upstream factory panics.
    pub(crate) fn enqueue(&self) -> oneshot::Receiver<Settled<T, E>> {
        let (settle, turn) = oneshot::channel();

        let mut lock = self.0.lockable.lock().unwrap();
        lock.pending.push_back(settle);
        trace!(depth = lock.pending.len(), "turn enqueued");
        if lock.running {
            // the current driver serves this turn when it reaches the front.
            return turn;
        }
        lock.running = true;
        drop(lock);

        // invoke the factory before yielding control, so an idle serializer starts its
        // first turn synchronously with the call that enqueued it.
        let fut = self.start_upstream();
        tokio::spawn(self.clone().drive(fut));

        turn
    }

    // invoke the upstream factory once.
    //
    // a factory that panics is converted into an invocation that panics when first
    // polled, so the panic surfaces through the same per-turn containment path as a
    // panicking upstream future.
    fn start_upstream(&self) -> UpstreamFut<T, E> {
        let mut upstream = self.0.upstream.lock().unwrap();
        match catch_unwind(AssertUnwindSafe(|| (&mut *upstream)())) {
            Ok(fut) => fut,
            Err(payload) => {
                let mut payload = Some(payload);
                let poisoned = futures::future::poll_fn(move |_cx| -> Poll<Result<T, E>> {
                    resume_unwind(payload.take().expect("repolled panicked invocation"))
                });
                Box::pin(poisoned)
            }
        }
    }

    // serve turns until the queue drains.
    //
    // at most one driver exists per core at a time: it is spawned only by the enqueue
    // that flips running to true, and running stays true until this task flips it back.
    // settling the front turn and deciding whether to serve another happen under a
    // single lock acquisition, so enqueues racing with the drain either observe running
    // and leave the next turn to this task, or find the queue already empty.
    async fn drive(self, mut fut: UpstreamFut<T, E>) {
        loop {
            let outcome = AssertUnwindSafe(fut).catch_unwind().await;
            let settled = match outcome {
                Ok(Ok(value)) => Settled::Value(value),
                Ok(Err(failure)) => Settled::Failure(failure),
                Err(_payload) => Settled::Panicked,
            };

            let mut lock = self.0.lockable.lock().unwrap();
            debug_assert!(lock.running, "internal bug");
            let settle = lock.pending.pop_front()
                .expect("turn settled with empty queue (internal bug)");
            // the caller may have dropped its future. the turn is consumed either way.
            let _ = settle.send(settled);

            if lock.pending.is_empty() {
                lock.running = false;
                trace!("queue drained, serializer idle");
                return;
            }
            drop(lock);

            trace!("starting upstream invocation for next queued turn");
            fut = self.start_upstream();
        }
    }
}
