//! Event publishing/subscription abstraction (mechanics only).
//!
//! The bus is the transport layer for events after the owning engine has
//! committed its state change: commit first, publish second. A publish
//! failure never unwinds the commit — the committed state can be re-read
//! from the transaction log, so consumers must tolerate at-least-once
//! delivery and gaps they backfill from the log.
//!
//! The contract assumes nothing about the transport: in-memory channels, a
//! message queue, or any broadcast fabric fits. Every subscriber gets its
//! own copy of each published event.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

/// One consumer's view of the event stream.
///
/// Broadcast semantics: each subscription sees every event published after
/// it was created. Meant for single-threaded consumption — take one per
/// consumer thread.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next event arrives.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Take the next event if one is already queued.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for an event.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// Transport-agnostic pub/sub bus.
///
/// `Send + Sync`: engines publish from whatever thread committed the
/// mutation. A `publish` error means the transport rejected the event, not
/// that the underlying commit failed.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
