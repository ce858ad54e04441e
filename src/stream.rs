use futures::stream;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::channel::Channel;
use crate::op::RecvOp;

impl<T: Unpin + Send + 'static> Channel<T> {
    /// Convert the handle into a [futures::Stream] that yields values
    /// until the channel is closed and drained. The stream owns the
    /// handle it was built from, so dropping the stream closes the
    /// channel like any other handle drop.
    pub fn into_stream(self) -> Stream<T> {
        Stream { chan: self, op: None, ended: false }
    }
}

/// Receiving end of a channel as a [futures::Stream].
pub struct Stream<T: Unpin + Send + 'static> {
    chan: Channel<T>,
    op: Option<RecvOp<T>>,
    ended: bool,
}

impl<T: Unpin + Send + 'static> stream::Stream for Stream<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, ctx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let _self = self.get_mut();
        if _self.ended {
            return Poll::Ready(None);
        }
        match _self.chan.poll_recv(ctx, &mut _self.op) {
            Poll::Ready(Ok(item)) => Poll::Ready(Some(item)),
            Poll::Ready(Err(_)) => {
                _self.ended = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T: Unpin + Send + 'static> stream::FusedStream for Stream<T> {
    fn is_terminated(&self) -> bool {
        self.ended
    }
}

impl<T: Unpin + Send + 'static> Drop for Stream<T> {
    fn drop(&mut self) {
        if let Some(op) = self.op.take() {
            op.abandon();
        }
    }
}
