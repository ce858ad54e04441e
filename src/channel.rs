use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::error::{Error, TryRecvError};
use crate::op::{Consumer, Producer, RecvOp, SendOp};
use crate::shared::ChannelShared;

/// A handle to a bounded channel. Clones share one engine, and the same
/// handle is both the sending and the receiving side.
///
/// A channel with capacity 0 is a rendezvous point: every send waits
/// for a matching receive, nothing is ever buffered. With capacity > 0
/// a send completes as soon as a buffer slot is free, and values
/// buffered at the moment of [close](Channel::close) remain deliverable
/// in FIFO order before receivers start seeing [Error::Closed].
///
/// Every handle owns the channel's lifetime: dropping one, the original
/// or any clone, closes the channel exactly like calling
/// [close](Channel::close). A producer task that ends therefore releases
/// the receivers on its own. Tasks that should not decide the channel's
/// fate share a single handle, by reference or behind an `Arc`.
pub struct Channel<T> {
    shared: Option<Arc<ChannelShared<T>>>,
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Channel { shared: self.shared.clone() }
    }
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_null() {
            write!(f, "Channel(null)")
        } else {
            write!(f, "Channel")
        }
    }
}

impl<T> Drop for Channel<T> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<T> Channel<T> {
    /// Create a channel with `capacity` buffered slots; 0 makes a
    /// rendezvous channel.
    pub fn new(capacity: usize) -> Self {
        Channel { shared: Some(Arc::new(ChannelShared::new(capacity))) }
    }

    /// A handle with no engine behind it. Every operation fails with
    /// the [Error::Null] kind.
    pub fn null() -> Self {
        Channel { shared: None }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.shared.is_none()
    }

    /// Number of buffered values (not accurate under concurrency).
    #[inline]
    pub fn len(&self) -> usize {
        match &self.shared {
            Some(shared) => shared.len(),
            None => 0,
        }
    }

    /// Whether the buffer holds no values (not accurate under
    /// concurrency).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        match &self.shared {
            Some(shared) => shared.capacity(),
            None => 0,
        }
    }

    /// Whether [close](Channel::close) has been called. A null handle
    /// reports false; it never was a live channel.
    pub fn is_closed(&self) -> bool {
        match &self.shared {
            Some(shared) => shared.is_closed(),
            None => false,
        }
    }

    /// Close the channel. All waiting sends fail with
    /// [Error::Closed], waiting receives drain the buffer and then fail
    /// the same way. Idempotent; a null handle is ignored. Dropping a
    /// handle closes the same way.
    pub fn close(&self) {
        if let Some(shared) = &self.shared {
            shared.close();
        }
    }

    #[inline]
    pub(crate) fn shared(&self) -> Option<&Arc<ChannelShared<T>>> {
        self.shared.as_ref()
    }
}

impl<T: Unpin + Send + 'static> Channel<T> {
    /// Send a value. Waits while the buffer is full, or until a
    /// receiver arrives on a rendezvous channel.
    ///
    /// Returns Err([Error::Closed]) when the channel closes before the
    /// value is accepted; the value is then discarded.
    ///
    /// Returns Err([Error::Null]) on a null handle.
    pub fn send(&self, value: T) -> SendFuture<'_, T> {
        SendFuture { chan: self, value: Some(value), op: None }
    }

    /// Receive a value. Waits while the channel is empty and running.
    ///
    /// Returns Err([Error::Closed]) once the channel is closed and
    /// drained.
    ///
    /// Returns Err([Error::Null]) on a null handle.
    pub fn recv(&self) -> RecvFuture<'_, T> {
        RecvFuture { chan: self, op: None }
    }

    /// Take one value without waiting: a buffered value first, else one
    /// taken directly from a waiting sender.
    ///
    /// Returns Err([TryRecvError::Empty]) when nothing is immediately
    /// available on a running channel.
    pub fn try_recv(&self) -> Result<T, TryRecvError> {
        match &self.shared {
            Some(shared) => shared.try_consume(),
            None => Err(TryRecvError::Null),
        }
    }

    pub(crate) fn poll_recv(
        &self,
        ctx: &mut Context<'_>,
        op_slot: &mut Option<RecvOp<T>>,
    ) -> Poll<Result<T, Error>> {
        if let Some(op) = op_slot {
            match op.poll_outcome(ctx) {
                Poll::Ready(outcome) => {
                    *op_slot = None;
                    Poll::Ready(outcome)
                }
                Poll::Pending => Poll::Pending,
            }
        } else {
            let Some(shared) = &self.shared else {
                return Poll::Ready(Err(Error::Null));
            };
            let op = RecvOp::new(ctx.waker().clone());
            shared.submit_consumer(Consumer::Owned(op.clone()));
            match op.poll_outcome(ctx) {
                Poll::Ready(outcome) => Poll::Ready(outcome),
                Poll::Pending => {
                    *op_slot = Some(op);
                    Poll::Pending
                }
            }
        }
    }
}

/// Future of [Channel::send]. Dropping it before completion withdraws
/// the send; a value not yet accepted is discarded.
pub struct SendFuture<'a, T: Unpin + Send + 'static> {
    chan: &'a Channel<T>,
    value: Option<T>,
    op: Option<SendOp<T>>,
}

impl<T: Unpin + Send + 'static> Future for SendFuture<'_, T> {
    type Output = Result<(), Error>;

    fn poll(self: Pin<&mut Self>, ctx: &mut Context<'_>) -> Poll<Self::Output> {
        let _self = self.get_mut();
        if let Some(op) = &_self.op {
            return op.poll_outcome(ctx);
        }
        let Some(shared) = _self.chan.shared() else {
            _self.value = None;
            return Poll::Ready(Err(Error::Null));
        };
        let value = _self.value.take().expect("send future polled after completion");
        let op = SendOp::new(value, ctx.waker().clone());
        shared.submit_producer(Producer::Owned(op.clone()));
        match op.poll_outcome(ctx) {
            Poll::Ready(outcome) => Poll::Ready(outcome),
            Poll::Pending => {
                _self.op = Some(op);
                Poll::Pending
            }
        }
    }
}

impl<T: Unpin + Send + 'static> Drop for SendFuture<'_, T> {
    fn drop(&mut self) {
        if let Some(op) = self.op.take() {
            op.abandon();
        }
    }
}

/// Future of [Channel::recv]. Dropping it before completion withdraws
/// the receive.
pub struct RecvFuture<'a, T: Unpin + Send + 'static> {
    chan: &'a Channel<T>,
    op: Option<RecvOp<T>>,
}

impl<T: Unpin + Send + 'static> Future for RecvFuture<'_, T> {
    type Output = Result<T, Error>;

    fn poll(self: Pin<&mut Self>, ctx: &mut Context<'_>) -> Poll<Self::Output> {
        let _self = self.get_mut();
        _self.chan.poll_recv(ctx, &mut _self.op)
    }
}

impl<T: Unpin + Send + 'static> Drop for RecvFuture<'_, T> {
    fn drop(&mut self) {
        if let Some(op) = self.op.take() {
            op.abandon();
        }
    }
}
