// serializer error types.

use thiserror::Error;


// ==== base error types ====


/// Error for a turn whose upstream invocation panicked instead of settling
///
/// The panic is contained to the turn it occurred on: the serializer keeps serving
/// queued calls, each with a fresh upstream invocation. The panic payload itself is
/// discarded.
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[error("upstream invocation panicked")]
pub struct PanickedError;

/// Error for a turn whose settlement channel was torn down before the turn was served
///
/// Not produced in normal operation; it exists so the disconnect case has a typed
/// representation instead of a panic.
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[error("serializer torn down before serving turn")]
pub struct LostTurnError;


// ==== compound error types ====


/// Error for awaiting one call to a [`Serializer`](crate::Serializer)
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum CallError<E> {
    /// The upstream invocation attributed to this call's turn settled with a failure
    ///
    /// The failure reason is relayed exactly as the upstream operation produced it,
    /// and is delivered only to this call.
    #[error("upstream invocation failed")]
    Upstream(E),
    /// The upstream invocation attributed to this call's turn panicked
    #[error(transparent)]
    Panicked(#[from] PanickedError),
    /// This call's turn was lost before being served
    #[error(transparent)]
    Lost(#[from] LostTurnError),
}

impl<E> CallError<E> {
    /// The relayed upstream failure, if that is what this error is
    pub fn into_upstream(self) -> Option<E> {
        match self {
            CallError::Upstream(failure) => Some(failure),
            _ => None,
        }
    }
}
