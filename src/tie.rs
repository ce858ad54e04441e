use rand::seq::SliceRandom;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::channel::Channel;
use crate::error::{Error, TieError};
use crate::op::{Consumer, Producer};
use crate::select::{SelectState, SharedRecvOp, SharedSendOp, ValueCell};
use crate::shared::ChannelShared;

/// One send or receive candidate of a tie. Type-erased so a single tie
/// can span channels of different element types.
trait Operand: Send + Sync {
    fn is_null(&self) -> bool;

    /// Identity of the engine the operand targets; 0 for a null handle.
    fn engine_ptr(&self) -> usize;

    fn is_send(&self) -> bool;

    fn submit(&self, state: &Arc<SelectState>, which: usize);
}

// Operands keep the channel's engine itself rather than a handle, so a
// finished or dropped tie never closes the channels it watched.
struct SendOperand<T: Unpin + Send + 'static> {
    shared: Option<Arc<ChannelShared<T>>>,
    source: ValueCell<T>,
}

impl<T: Unpin + Send + 'static> Operand for SendOperand<T> {
    fn is_null(&self) -> bool {
        self.shared.is_none()
    }

    fn engine_ptr(&self) -> usize {
        self.shared.as_ref().map_or(0, |shared| Arc::as_ptr(shared) as usize)
    }

    fn is_send(&self) -> bool {
        true
    }

    fn submit(&self, state: &Arc<SelectState>, which: usize) {
        let shared = self.shared.as_ref().expect("null operand submitted");
        let op = SharedSendOp::new(state.clone(), self.source.clone(), which);
        shared.submit_producer(Producer::Shared(op));
    }
}

struct RecvOperand<T: Unpin + Send + 'static> {
    shared: Option<Arc<ChannelShared<T>>>,
    sink: ValueCell<T>,
}

impl<T: Unpin + Send + 'static> Operand for RecvOperand<T> {
    fn is_null(&self) -> bool {
        self.shared.is_none()
    }

    fn engine_ptr(&self) -> usize {
        self.shared.as_ref().map_or(0, |shared| Arc::as_ptr(shared) as usize)
    }

    fn is_send(&self) -> bool {
        false
    }

    fn submit(&self, state: &Arc<SelectState>, which: usize) {
        let shared = self.shared.as_ref().expect("null operand submitted");
        let op = SharedRecvOp::new(state.clone(), self.sink.clone(), which);
        shared.submit_consumer(Consumer::Shared(op));
    }
}

/// First-past-the-post composition over a set of sends and receives.
///
/// Candidates are added with [send](Tie::send) and [recv](Tie::recv),
/// then [wait](Tie::wait) resolves exactly one of them and yields its
/// index (in the order of addition). The candidates are submitted to
/// their channels in random order, so when several are ready at once no
/// fixed candidate can starve the others.
///
/// ```rust
/// let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// rt.block_on(async move {
///     let c1 = weft::Channel::<i32>::new(1);
///     let c2 = weft::Channel::<String>::new(1);
///
///     let mut tie = weft::Tie::new();
///     let unsent = tie.send(&c1, 5);
///     let got = tie.recv(&c2);
///     // c2 is empty, so sending into c1 is the only ready candidate
///     let which = tie.wait().await.unwrap();
///     assert_eq!(which, 0);
///     assert_eq!(c1.try_recv(), Ok(5));
///     assert!(unsent.reclaim().is_none());
///     assert!(got.take().is_none());
/// });
/// ```
pub struct Tie {
    state: Arc<SelectState>,
    operands: Vec<Box<dyn Operand>>,
}

impl Tie {
    pub fn new() -> Self {
        Tie { state: SelectState::new(), operands: Vec::new() }
    }

    /// Add a send candidate. The returned slot lets the caller reclaim
    /// the value if another candidate wins.
    pub fn send<T: Unpin + Send + 'static>(&mut self, chan: &Channel<T>, value: T) -> SendSlot<T> {
        let source = ValueCell::new(Some(value));
        self.operands
            .push(Box::new(SendOperand { shared: chan.shared().cloned(), source: source.clone() }));
        SendSlot { state: self.state.clone(), cell: source }
    }

    /// Add a receive candidate. The received value is picked up from
    /// the returned slot if this candidate wins.
    pub fn recv<T: Unpin + Send + 'static>(&mut self, chan: &Channel<T>) -> RecvSlot<T> {
        let sink = ValueCell::new(None);
        self.operands
            .push(Box::new(RecvOperand { shared: chan.shared().cloned(), sink: sink.clone() }));
        RecvSlot { state: self.state.clone(), cell: sink }
    }

    /// Wait until exactly one candidate completes; resolves to its
    /// index, or to the first failure together with the index it
    /// belongs to. A null handle among the candidates fails the whole
    /// tie with [Error::Null] and the first null index, before anything
    /// is submitted.
    ///
    /// Panics if no candidate was added, or if one channel appears as
    /// both a send and a receive candidate (such a pair could never
    /// pair with itself and would jam the channel's queues).
    pub fn wait(self) -> TieFuture {
        assert!(!self.operands.is_empty(), "tie has no operands");
        for (i, a) in self.operands.iter().enumerate() {
            for b in &self.operands[i + 1..] {
                assert!(
                    a.engine_ptr() == 0
                        || a.engine_ptr() != b.engine_ptr()
                        || a.is_send() == b.is_send(),
                    "tie sends and receives on the same channel"
                );
            }
        }
        TieFuture { state: self.state, operands: self.operands, submitted: false }
    }
}

impl Default for Tie {
    fn default() -> Self {
        Self::new()
    }
}

/// Future of [Tie::wait]. Dropping it before completion withdraws every
/// candidate; the ones already queued are discarded by their channels.
pub struct TieFuture {
    state: Arc<SelectState>,
    operands: Vec<Box<dyn Operand>>,
    submitted: bool,
}

impl Future for TieFuture {
    type Output = Result<usize, TieError>;

    fn poll(self: Pin<&mut Self>, ctx: &mut Context<'_>) -> Poll<Self::Output> {
        let _self = self.get_mut();
        if !_self.submitted {
            _self.submitted = true;
            if let Some(which) = _self.operands.iter().position(|op| op.is_null()) {
                // nothing was submitted; latch the state shut so the
                // slots open up for reclaiming
                _self.state.abandon();
                return Poll::Ready(Err(TieError { index: which, kind: Error::Null }));
            }
            _self.state.register(ctx);
            let mut order: Vec<usize> = (0.._self.operands.len()).collect();
            order.shuffle(&mut rand::thread_rng());
            for which in order {
                _self.operands[which].submit(&_self.state, which);
            }
        }
        _self.state.poll_outcome(ctx)
    }
}

impl Drop for TieFuture {
    fn drop(&mut self) {
        self.state.abandon();
    }
}

/// Slot of a send candidate; reclaims the value when the tie resolved
/// without it.
pub struct SendSlot<T> {
    state: Arc<SelectState>,
    cell: ValueCell<T>,
}

impl<T> SendSlot<T> {
    /// The unsent value. None while the tie is still pending, after the
    /// candidate won, or once the value has been reclaimed.
    pub fn reclaim(&self) -> Option<T> {
        if !self.state.is_completed() {
            return None;
        }
        self.cell.take()
    }
}

/// Slot of a receive candidate; holds the value when the candidate won.
pub struct RecvSlot<T> {
    state: Arc<SelectState>,
    cell: ValueCell<T>,
}

impl<T> RecvSlot<T> {
    /// The received value. None while the tie is still pending, if
    /// another candidate won, or once the value has been taken.
    pub fn take(&self) -> Option<T> {
        if !self.state.is_completed() {
            return None;
        }
        self.cell.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "tie has no operands")]
    fn test_empty_tie_panics() {
        let _ = Tie::new().wait();
    }

    #[test]
    #[should_panic(expected = "same channel")]
    fn test_send_recv_same_channel_panics() {
        let chan = Channel::<i32>::new(0);
        let mut tie = Tie::new();
        let _slot = tie.send(&chan, 1);
        let _sink = tie.recv(&chan);
        let _ = tie.wait();
    }

    #[test]
    fn test_two_recv_same_channel_allowed() {
        let chan = Channel::<i32>::new(1);
        let mut tie = Tie::new();
        let _a = tie.recv(&chan);
        let _b = tie.recv(&chan);
        let _ = tie.wait();
    }
}
