use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::{Error, TryRecvError};
use crate::op::{ConsumeOp, Consumer, Latch, PairGuard, ProduceOp, Producer, WakeList};
use crate::ring::RingBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Running,
    Closed,
}

/// The engine behind one channel: ring buffer, both op queues and the
/// running/closed flag, all under a single mutex.
///
/// Ops are completed while the engine mutex and the op's own latch are
/// held; their wakers are collected and woken only after every lock has
/// dropped.
pub(crate) struct ChannelShared<T> {
    capacity: usize,
    locked: Mutex<Locked<T>>,
}

struct Locked<T> {
    state: State,
    buffer: RingBuffer<T>,
    producers: VecDeque<Producer<T>>,
    consumers: VecDeque<Consumer<T>>,
}

impl<T> ChannelShared<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        ChannelShared {
            capacity,
            locked: Mutex::new(Locked {
                state: State::Running,
                buffer: RingBuffer::with_capacity(capacity),
                producers: VecDeque::new(),
                consumers: VecDeque::new(),
            }),
        }
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of buffered values (not accurate under concurrency).
    pub(crate) fn len(&self) -> usize {
        self.locked.lock().unwrap().buffer.len()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.locked.lock().unwrap().state == State::Closed
    }

    pub(crate) fn submit_producer(&self, op: Producer<T>) {
        let mut wakes = WakeList::new();
        {
            let mut locked = self.locked.lock().unwrap();
            locked.producers.push_back(op);
            match locked.state {
                State::Running => locked.flush_running(&mut wakes),
                State::Closed => locked.flush_closed(&mut wakes),
            }
        }
        wakes.wake_all();
    }

    pub(crate) fn submit_consumer(&self, op: Consumer<T>) {
        let mut wakes = WakeList::new();
        {
            let mut locked = self.locked.lock().unwrap();
            locked.consumers.push_back(op);
            match locked.state {
                State::Running => locked.flush_running(&mut wakes),
                State::Closed => locked.flush_closed(&mut wakes),
            }
        }
        wakes.wake_all();
    }

    /// Take one value without waiting: from the buffer first, else
    /// straight from a waiting producer (the rendezvous case).
    pub(crate) fn try_consume(&self) -> Result<T, TryRecvError> {
        let mut wakes = WakeList::new();
        let result = {
            let mut locked = self.locked.lock().unwrap();
            locked.try_consume(&mut wakes)
        };
        wakes.wake_all();
        result
    }

    /// Transition to closed and flush. Idempotent.
    pub(crate) fn close(&self) {
        let mut wakes = WakeList::new();
        {
            let mut locked = self.locked.lock().unwrap();
            if locked.state == State::Running {
                locked.state = State::Closed;
                locked.flush_closed(&mut wakes);
            }
        }
        wakes.wake_all();
    }
}

impl<T> Locked<T> {
    /// Make all progress possible while running: fill the buffer from
    /// waiting producers, drain it into waiting consumers, and while the
    /// buffer is empty pair the two queues directly (rendezvous). An op
    /// that a tie already completed elsewhere is popped and discarded
    /// when it reaches the head.
    fn flush_running(&mut self, wakes: &mut WakeList) {
        loop {
            if self.buffer.len() < self.buffer.capacity() && !self.producers.is_empty() {
                let producer = self.producers.front().unwrap().clone();
                {
                    let mut done = producer.latch().lock();
                    if !*done {
                        let value = producer.consume(&mut done, wakes);
                        self.buffer.push(value);
                    }
                }
                self.producers.pop_front();
                continue;
            }

            if !self.buffer.is_empty() && !self.consumers.is_empty() {
                let consumer = self.consumers.front().unwrap().clone();
                {
                    let mut done = consumer.latch().lock();
                    if !*done {
                        let value = self.buffer.pop().unwrap();
                        consumer.commit(&mut done, Ok(value), wakes);
                    }
                }
                self.consumers.pop_front();
                continue;
            }

            while self.buffer.is_empty()
                && !self.consumers.is_empty()
                && !self.producers.is_empty()
            {
                let consumer = self.consumers.front().unwrap().clone();
                let producer = self.producers.front().unwrap().clone();
                match Latch::lock_pair(consumer.latch(), producer.latch()) {
                    PairGuard::Both(mut c_guard, mut p_guard) => {
                        let p_completed = *p_guard;
                        let c_completed = *c_guard;
                        if !p_completed && !c_completed {
                            let value = producer.consume(&mut p_guard, wakes);
                            consumer.commit(&mut c_guard, Ok(value), wakes);
                            drop(p_guard);
                            drop(c_guard);
                            self.consumers.pop_front();
                            self.producers.pop_front();
                        } else {
                            drop(p_guard);
                            drop(c_guard);
                            if c_completed {
                                self.consumers.pop_front();
                            }
                            if p_completed {
                                self.producers.pop_front();
                            }
                        }
                    }
                    PairGuard::Fused(guard) => {
                        // Both heads belong to one tie. It completes at
                        // most once, so the pair can never match; either
                        // both are already dead, or neither can move.
                        let completed = *guard;
                        drop(guard);
                        if !completed {
                            return;
                        }
                        self.consumers.pop_front();
                        self.producers.pop_front();
                    }
                };
            }

            break;
        }
    }

    /// Cancel every waiting producer, satisfy waiting consumers from the
    /// buffer, then cancel the rest. Buffered values that no consumer is
    /// waiting for stay deliverable.
    fn flush_closed(&mut self, wakes: &mut WakeList) {
        while let Some(producer) = self.producers.pop_front() {
            let mut done = producer.latch().lock();
            if !*done {
                producer.fail(&mut done, Error::Closed, wakes);
            }
        }
        while let Some(consumer) = self.consumers.pop_front() {
            let mut done = consumer.latch().lock();
            if !*done {
                match self.buffer.pop() {
                    Some(value) => consumer.commit(&mut done, Ok(value), wakes),
                    None => consumer.commit(&mut done, Err(Error::Closed), wakes),
                }
            }
        }
    }

    fn try_consume(&mut self, wakes: &mut WakeList) -> Result<T, TryRecvError> {
        loop {
            if let Some(value) = self.buffer.pop() {
                if self.state == State::Running {
                    // a waiting producer may now fill the freed slot
                    self.flush_running(wakes);
                }
                return Ok(value);
            }
            if let Some(front) = self.producers.front() {
                let producer = front.clone();
                let mut done = producer.latch().lock();
                if *done {
                    drop(done);
                    self.producers.pop_front();
                    continue;
                }
                let value = producer.consume(&mut done, wakes);
                drop(done);
                self.producers.pop_front();
                return Ok(value);
            }
            return match self.state {
                State::Closed => Err(TryRecvError::Closed),
                State::Running => Err(TryRecvError::Empty),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::{RecvOp, SendOp};
    use futures::task::noop_waker;
    use std::task::{Context, Poll};

    fn poll_send(op: &SendOp<i32>) -> Poll<Result<(), Error>> {
        let waker = noop_waker();
        let mut ctx = Context::from_waker(&waker);
        op.poll_outcome(&mut ctx)
    }

    fn poll_recv(op: &RecvOp<i32>) -> Poll<Result<i32, Error>> {
        let waker = noop_waker();
        let mut ctx = Context::from_waker(&waker);
        op.poll_outcome(&mut ctx)
    }

    #[test]
    fn test_producer_lands_in_buffer() {
        let shared = ChannelShared::<i32>::new(1);
        let op = SendOp::new(9, noop_waker());
        shared.submit_producer(Producer::Owned(op.clone()));
        assert_eq!(poll_send(&op), Poll::Ready(Ok(())));
        assert_eq!(shared.len(), 1);
        assert_eq!(shared.try_consume(), Ok(9));
        assert_eq!(shared.try_consume(), Err(TryRecvError::Empty));
    }

    #[test]
    fn test_producer_parks_when_full() {
        let shared = ChannelShared::<i32>::new(1);
        let first = SendOp::new(1, noop_waker());
        let second = SendOp::new(2, noop_waker());
        shared.submit_producer(Producer::Owned(first.clone()));
        shared.submit_producer(Producer::Owned(second.clone()));
        assert_eq!(poll_send(&first), Poll::Ready(Ok(())));
        assert_eq!(poll_send(&second), Poll::Pending);
        // freeing the slot lets the parked producer in
        assert_eq!(shared.try_consume(), Ok(1));
        assert_eq!(poll_send(&second), Poll::Ready(Ok(())));
        assert_eq!(shared.try_consume(), Ok(2));
    }

    #[test]
    fn test_rendezvous_direct_transfer() {
        let shared = ChannelShared::<i32>::new(0);
        let recv = RecvOp::new(noop_waker());
        shared.submit_consumer(Consumer::Owned(recv.clone()));
        assert_eq!(poll_recv(&recv), Poll::Pending);
        let send = SendOp::new(42, noop_waker());
        shared.submit_producer(Producer::Owned(send.clone()));
        assert_eq!(poll_send(&send), Poll::Ready(Ok(())));
        assert_eq!(poll_recv(&recv), Poll::Ready(Ok(42)));
        assert_eq!(shared.len(), 0);
    }

    #[test]
    fn test_try_consume_from_waiting_producer() {
        let shared = ChannelShared::<i32>::new(0);
        let send = SendOp::new(5, noop_waker());
        shared.submit_producer(Producer::Owned(send.clone()));
        assert_eq!(poll_send(&send), Poll::Pending);
        assert_eq!(shared.try_consume(), Ok(5));
        assert_eq!(poll_send(&send), Poll::Ready(Ok(())));
    }

    #[test]
    fn test_close_fails_parked_producer() {
        let shared = ChannelShared::<i32>::new(0);
        let send = SendOp::new(9, noop_waker());
        shared.submit_producer(Producer::Owned(send.clone()));
        shared.close();
        assert_eq!(poll_send(&send), Poll::Ready(Err(Error::Closed)));
        assert_eq!(shared.try_consume(), Err(TryRecvError::Closed));
        // idempotent
        shared.close();
    }

    #[test]
    fn test_close_delivers_buffered_values_first() {
        let shared = ChannelShared::<i32>::new(2);
        shared.submit_producer(Producer::Owned(SendOp::new(1, noop_waker())));
        shared.submit_producer(Producer::Owned(SendOp::new(2, noop_waker())));
        shared.close();
        assert_eq!(shared.try_consume(), Ok(1));
        assert_eq!(shared.try_consume(), Ok(2));
        assert_eq!(shared.try_consume(), Err(TryRecvError::Closed));
    }

    #[test]
    fn test_close_fails_parked_consumer() {
        let shared = ChannelShared::<i32>::new(0);
        let recv = RecvOp::new(noop_waker());
        shared.submit_consumer(Consumer::Owned(recv.clone()));
        shared.close();
        assert_eq!(poll_recv(&recv), Poll::Ready(Err(Error::Closed)));
    }

    #[test]
    fn test_abandoned_op_is_discarded() {
        let shared = ChannelShared::<i32>::new(0);
        let send = SendOp::new(7, noop_waker());
        shared.submit_producer(Producer::Owned(send.clone()));
        send.abandon();
        // the dead producer is skipped, not delivered
        assert_eq!(shared.try_consume(), Err(TryRecvError::Empty));
        let recv = RecvOp::new(noop_waker());
        shared.submit_consumer(Consumer::Owned(recv.clone()));
        assert_eq!(poll_recv(&recv), Poll::Pending);
    }

    #[test]
    fn test_fifo_between_producers() {
        let shared = ChannelShared::<i32>::new(0);
        let a = SendOp::new(1, noop_waker());
        let b = SendOp::new(2, noop_waker());
        shared.submit_producer(Producer::Owned(a));
        shared.submit_producer(Producer::Owned(b));
        assert_eq!(shared.try_consume(), Ok(1));
        assert_eq!(shared.try_consume(), Ok(2));
    }
}
