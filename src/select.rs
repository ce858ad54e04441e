use std::cell::UnsafeCell;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

use crate::error::{Error, TieError};
use crate::op::{ConsumeOp, Latch, LatchGuard, ProduceOp, WakeList};

/// Winner arbitration shared by every op of one tie: one latch, and the
/// `(index, outcome)` the tie resolves to. Whichever channel completes
/// one of the tie's ops does so under this latch, so at most one op of
/// the set ever completes.
pub(crate) struct SelectState {
    latch: Latch,
    /// Guarded by `latch`.
    cell: UnsafeCell<SelectCell>,
}

struct SelectCell {
    outcome: Option<(usize, Result<(), Error>)>,
    waker: Option<Waker>,
}

unsafe impl Send for SelectState {}
unsafe impl Sync for SelectState {}

impl SelectState {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(SelectState {
            latch: Latch::new(),
            cell: UnsafeCell::new(SelectCell { outcome: None, waker: None }),
        })
    }

    #[inline]
    pub(crate) fn latch(&self) -> &Latch {
        &self.latch
    }

    #[inline]
    fn cell<'a>(&'a self, _done: &'a mut LatchGuard<'_>) -> &'a mut SelectCell {
        unsafe { &mut *self.cell.get() }
    }

    /// Resolve the tie in favor of operand `which`.
    pub(crate) fn complete(
        &self,
        done: &mut LatchGuard<'_>,
        which: usize,
        result: Result<(), Error>,
        wakes: &mut WakeList,
    ) {
        debug_assert!(!**done);
        let cell = self.cell(done);
        cell.outcome = Some((which, result));
        wakes.push(cell.waker.take());
        **done = true;
    }

    /// Install the waker ahead of submitting the tie's ops, so a win on
    /// the first channel cannot slip by unnoticed.
    pub(crate) fn register(&self, ctx: &mut Context<'_>) {
        let mut done = self.latch.lock();
        if *done {
            return;
        }
        let cell = self.cell(&mut done);
        cell.waker = Some(ctx.waker().clone());
    }

    pub(crate) fn poll_outcome(&self, ctx: &mut Context<'_>) -> Poll<Result<usize, TieError>> {
        let mut done = self.latch.lock();
        let cell = self.cell(&mut done);
        if let Some((which, result)) = cell.outcome.take() {
            return Poll::Ready(match result {
                Ok(()) => Ok(which),
                Err(kind) => Err(TieError { index: which, kind }),
            });
        }
        cell.waker = Some(ctx.waker().clone());
        Poll::Pending
    }

    /// Close the latch without a winner; every op of the tie becomes
    /// discardable where it sits.
    pub(crate) fn abandon(&self) {
        let mut done = self.latch.lock();
        if *done {
            return;
        }
        let cell = self.cell(&mut done);
        cell.waker = None;
        *done = true;
    }

    #[inline]
    pub(crate) fn is_completed(&self) -> bool {
        self.latch.is_completed()
    }
}

/// Value holder shared between a tie operand and the slot handed back to
/// the caller. The select latch decides who may move the value; this
/// mutex only orders the move itself against a post-completion take,
/// and is locked strictly after the latch.
pub(crate) struct ValueCell<T>(Arc<Mutex<Option<T>>>);

impl<T> Clone for ValueCell<T> {
    fn clone(&self) -> Self {
        ValueCell(self.0.clone())
    }
}

impl<T> ValueCell<T> {
    pub(crate) fn new(value: Option<T>) -> Self {
        ValueCell(Arc::new(Mutex::new(value)))
    }

    pub(crate) fn take(&self) -> Option<T> {
        self.0.lock().unwrap().take()
    }

    pub(crate) fn set(&self, value: T) {
        *self.0.lock().unwrap() = Some(value);
    }
}

/// Send candidate of a tie. Completion goes through the shared state;
/// the value comes from the operand's external cell.
pub(crate) struct SharedSendOp<T> {
    state: Arc<SelectState>,
    source: ValueCell<T>,
    which: usize,
}

impl<T> Clone for SharedSendOp<T> {
    fn clone(&self) -> Self {
        SharedSendOp { state: self.state.clone(), source: self.source.clone(), which: self.which }
    }
}

impl<T> SharedSendOp<T> {
    pub(crate) fn new(state: Arc<SelectState>, source: ValueCell<T>, which: usize) -> Self {
        SharedSendOp { state, source, which }
    }
}

impl<T> ProduceOp<T> for SharedSendOp<T> {
    #[inline]
    fn latch(&self) -> &Latch {
        self.state.latch()
    }

    fn consume(&self, done: &mut LatchGuard<'_>, wakes: &mut WakeList) -> T {
        let value = self.source.take().expect("tie source already taken");
        self.state.complete(done, self.which, Ok(()), wakes);
        value
    }

    fn fail(&self, done: &mut LatchGuard<'_>, err: Error, wakes: &mut WakeList) {
        self.state.complete(done, self.which, Err(err), wakes);
    }
}

/// Receive candidate of a tie; a committed value lands in the operand's
/// external cell before the state resolves.
pub(crate) struct SharedRecvOp<T> {
    state: Arc<SelectState>,
    sink: ValueCell<T>,
    which: usize,
}

impl<T> Clone for SharedRecvOp<T> {
    fn clone(&self) -> Self {
        SharedRecvOp { state: self.state.clone(), sink: self.sink.clone(), which: self.which }
    }
}

impl<T> SharedRecvOp<T> {
    pub(crate) fn new(state: Arc<SelectState>, sink: ValueCell<T>, which: usize) -> Self {
        SharedRecvOp { state, sink, which }
    }
}

impl<T> ConsumeOp<T> for SharedRecvOp<T> {
    #[inline]
    fn latch(&self) -> &Latch {
        self.state.latch()
    }

    fn commit(&self, done: &mut LatchGuard<'_>, value: Result<T, Error>, wakes: &mut WakeList) {
        match value {
            Ok(value) => {
                self.sink.set(value);
                self.state.complete(done, self.which, Ok(()), wakes);
            }
            Err(err) => self.state.complete(done, self.which, Err(err), wakes),
        }
    }
}
