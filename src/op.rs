use enum_dispatch::enum_dispatch;
use std::cell::UnsafeCell;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll, Waker};

use crate::error::Error;
use crate::select::{SharedRecvOp, SharedSendOp};

/// Wakers collected while locks are held, woken once every lock has
/// dropped.
pub(crate) struct WakeList(Vec<Waker>);

impl WakeList {
    #[inline]
    pub(crate) fn new() -> Self {
        WakeList(Vec::new())
    }

    #[inline]
    pub(crate) fn push(&mut self, waker: Option<Waker>) {
        if let Some(waker) = waker {
            self.0.push(waker);
        }
    }

    pub(crate) fn wake_all(self) {
        for waker in self.0 {
            waker.wake();
        }
    }
}

/// One-shot completion flag of a pending op.
///
/// The flag arbitrates between the channel flush that reaches the op in
/// queue order and anything else racing to complete it, which for a tie
/// op is a flush on another channel. An owned op has a latch of its own;
/// every op of one tie shares the select state's latch, so the per-op
/// state each op guards with "its" latch stays consistent no matter who
/// wins.
pub(crate) struct Latch {
    done: Mutex<bool>,
}

pub(crate) type LatchGuard<'a> = MutexGuard<'a, bool>;

impl Latch {
    pub(crate) fn new() -> Self {
        Latch { done: Mutex::new(false) }
    }

    #[inline]
    pub(crate) fn lock(&self) -> LatchGuard<'_> {
        self.done.lock().unwrap()
    }

    /// Whether completion already happened. Takes the lock.
    #[inline]
    pub(crate) fn is_completed(&self) -> bool {
        *self.lock()
    }

    /// Lock two latches without deadlocking against a thread locking the
    /// same pair from the other side; address order decides. The pair
    /// collapses to one guard when both ops belong to the same tie.
    pub(crate) fn lock_pair<'a>(a: &'a Latch, b: &'a Latch) -> PairGuard<'a> {
        let pa = a as *const Latch as usize;
        let pb = b as *const Latch as usize;
        if pa == pb {
            PairGuard::Fused(a.lock())
        } else if pa < pb {
            let ga = a.lock();
            let gb = b.lock();
            PairGuard::Both(ga, gb)
        } else {
            let gb = b.lock();
            let ga = a.lock();
            PairGuard::Both(ga, gb)
        }
    }
}

pub(crate) enum PairGuard<'a> {
    /// Guards for two distinct latches, in argument order.
    Both(LatchGuard<'a>, LatchGuard<'a>),
    /// Both ops share a single latch.
    Fused(LatchGuard<'a>),
}

/// Capability set of a pending send.
///
/// `done` must be the guard of this op's latch, reading `false`, for
/// both `consume` and `fail`; each marks the op completed.
#[enum_dispatch]
pub(crate) trait ProduceOp<T> {
    fn latch(&self) -> &Latch;

    /// Move the value out and complete the op with success.
    fn consume(&self, done: &mut LatchGuard<'_>, wakes: &mut WakeList) -> T;

    /// Complete the op with an error, discarding the value.
    fn fail(&self, done: &mut LatchGuard<'_>, err: Error, wakes: &mut WakeList);
}

/// Capability set of a pending receive; same latch contract.
#[enum_dispatch]
pub(crate) trait ConsumeOp<T> {
    fn latch(&self) -> &Latch;

    /// Deliver a value or an error and complete the op.
    fn commit(&self, done: &mut LatchGuard<'_>, value: Result<T, Error>, wakes: &mut WakeList);
}

/// A queued send: either owned by one [SendFuture](crate::SendFuture),
/// or one candidate of a tie.
#[enum_dispatch(ProduceOp<T>)]
pub(crate) enum Producer<T> {
    Owned(SendOp<T>),
    Shared(SharedSendOp<T>),
}

impl<T> Clone for Producer<T> {
    fn clone(&self) -> Self {
        match self {
            Producer::Owned(op) => Producer::Owned(op.clone()),
            Producer::Shared(op) => Producer::Shared(op.clone()),
        }
    }
}

/// A queued receive, owned or tie-shared.
#[enum_dispatch(ConsumeOp<T>)]
pub(crate) enum Consumer<T> {
    Owned(RecvOp<T>),
    Shared(SharedRecvOp<T>),
}

impl<T> Clone for Consumer<T> {
    fn clone(&self) -> Self {
        match self {
            Consumer::Owned(op) => Consumer::Owned(op.clone()),
            Consumer::Shared(op) => Consumer::Shared(op.clone()),
        }
    }
}

/// Send op owned by a single future. The value travels inside the op
/// until the engine takes it.
pub(crate) struct SendOp<T>(Arc<SendInner<T>>);

struct SendInner<T> {
    latch: Latch,
    /// Guarded by `latch`; touched only while its guard is held.
    cell: UnsafeCell<SendCell<T>>,
}

struct SendCell<T> {
    value: Option<T>,
    outcome: Option<Result<(), Error>>,
    waker: Option<Waker>,
}

unsafe impl<T: Send> Send for SendInner<T> {}
unsafe impl<T: Send> Sync for SendInner<T> {}

impl<T> Clone for SendOp<T> {
    fn clone(&self) -> Self {
        SendOp(self.0.clone())
    }
}

impl<T> SendOp<T> {
    pub(crate) fn new(value: T, waker: Waker) -> Self {
        SendOp(Arc::new(SendInner {
            latch: Latch::new(),
            cell: UnsafeCell::new(SendCell {
                value: Some(value),
                outcome: None,
                waker: Some(waker),
            }),
        }))
    }

    #[inline]
    fn cell<'a>(&'a self, _done: &'a mut LatchGuard<'_>) -> &'a mut SendCell<T> {
        unsafe { &mut *self.0.cell.get() }
    }

    /// Poll for the outcome, refreshing the parked waker when pending.
    pub(crate) fn poll_outcome(&self, ctx: &mut Context<'_>) -> Poll<Result<(), Error>> {
        let mut done = self.0.latch.lock();
        let cell = self.cell(&mut done);
        if let Some(outcome) = cell.outcome.take() {
            return Poll::Ready(outcome);
        }
        cell.waker = Some(ctx.waker().clone());
        Poll::Pending
    }

    /// Give up on a pending op; the flush discards it when it reaches
    /// the queue head.
    pub(crate) fn abandon(&self) {
        let mut done = self.0.latch.lock();
        if *done {
            return;
        }
        let cell = self.cell(&mut done);
        cell.value = None;
        cell.waker = None;
        *done = true;
    }
}

impl<T> ProduceOp<T> for SendOp<T> {
    #[inline]
    fn latch(&self) -> &Latch {
        &self.0.latch
    }

    fn consume(&self, done: &mut LatchGuard<'_>, wakes: &mut WakeList) -> T {
        debug_assert!(!**done);
        let cell = self.cell(done);
        let value = cell.value.take().expect("send op consumed twice");
        cell.outcome = Some(Ok(()));
        wakes.push(cell.waker.take());
        **done = true;
        value
    }

    fn fail(&self, done: &mut LatchGuard<'_>, err: Error, wakes: &mut WakeList) {
        debug_assert!(!**done);
        let cell = self.cell(done);
        cell.value = None;
        cell.outcome = Some(Err(err));
        wakes.push(cell.waker.take());
        **done = true;
    }
}

/// Receive op owned by a single future.
pub(crate) struct RecvOp<T>(Arc<RecvInner<T>>);

struct RecvInner<T> {
    latch: Latch,
    /// Guarded by `latch`.
    cell: UnsafeCell<RecvCell<T>>,
}

struct RecvCell<T> {
    outcome: Option<Result<T, Error>>,
    waker: Option<Waker>,
}

unsafe impl<T: Send> Send for RecvInner<T> {}
unsafe impl<T: Send> Sync for RecvInner<T> {}

impl<T> Clone for RecvOp<T> {
    fn clone(&self) -> Self {
        RecvOp(self.0.clone())
    }
}

impl<T> RecvOp<T> {
    pub(crate) fn new(waker: Waker) -> Self {
        RecvOp(Arc::new(RecvInner {
            latch: Latch::new(),
            cell: UnsafeCell::new(RecvCell { outcome: None, waker: Some(waker) }),
        }))
    }

    #[inline]
    fn cell<'a>(&'a self, _done: &'a mut LatchGuard<'_>) -> &'a mut RecvCell<T> {
        unsafe { &mut *self.0.cell.get() }
    }

    pub(crate) fn poll_outcome(&self, ctx: &mut Context<'_>) -> Poll<Result<T, Error>> {
        let mut done = self.0.latch.lock();
        let cell = self.cell(&mut done);
        if let Some(outcome) = cell.outcome.take() {
            return Poll::Ready(outcome);
        }
        cell.waker = Some(ctx.waker().clone());
        Poll::Pending
    }

    /// Give up on a pending op. A value that was already committed but
    /// never observed is dropped with the op.
    pub(crate) fn abandon(&self) {
        let mut done = self.0.latch.lock();
        if *done {
            return;
        }
        let cell = self.cell(&mut done);
        cell.waker = None;
        *done = true;
    }
}

impl<T> ConsumeOp<T> for RecvOp<T> {
    #[inline]
    fn latch(&self) -> &Latch {
        &self.0.latch
    }

    fn commit(&self, done: &mut LatchGuard<'_>, value: Result<T, Error>, wakes: &mut WakeList) {
        debug_assert!(!**done);
        let cell = self.cell(done);
        cell.outcome = Some(value);
        wakes.push(cell.waker.take());
        **done = true;
    }
}
