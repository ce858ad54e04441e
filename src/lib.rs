//! # Weft
//!
//! Bounded channels for passing typed values between async tasks and
//! threads, with golang-style close semantics and a first-past-the-post
//! `tie` that waits on several send/receive candidates at once and
//! commits exactly one.
//!
//! A [Channel] is a single cloneable handle carrying both directions.
//! Capacity 0 makes a rendezvous channel where every send synchronizes
//! with a matching receive; with a larger capacity, values park in a
//! fixed ring buffer. [close](Channel::close) is terminal: waiting and
//! future sends fail, while receivers first drain whatever was buffered.
//! Dropping a handle closes the channel the same way, so a producer task
//! that simply ends releases its receivers; every clone is a full handle,
//! and tasks that should not close the channel share one handle instead
//! of cloning it.
//!
//! The crate owns no threads and works on any executor; completions are
//! delivered through task wakers, never inline in the call that caused
//! them.
//!
//! ## Usage
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! weft = "0.1"
//! tokio = "1"
//! ```
//!
//! ```rust
//!
//! let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build().unwrap();
//!
//! let chan = weft::Channel::<i32>::new(100);
//!
//! rt.block_on(async move {
//!    let tx = chan.clone();
//!    tokio::spawn(async move {
//!        for i in 0i32..10000 {
//!            let _ = tx.send(i).await;
//!        }
//!        tx.close();
//!    });
//!
//!    let mut count = 0;
//!    loop {
//!        if let Ok(_i) = chan.recv().await {
//!            count += 1;
//!        } else {
//!            break;
//!        }
//!    }
//!    assert_eq!(count, 10000);
//! });
//!
//! ```
//!
//! ## Tie
//!
//! [Tie] races a set of sends and receives, possibly on channels of
//! different element types, and resolves exactly one of them:
//!
//! ```rust
//! let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build().unwrap();
//!
//! rt.block_on(async move {
//!     let words = weft::Channel::<String>::new(0);
//!     let numbers = weft::Channel::<i32>::new(0);
//!
//!     let tx = words.clone();
//!     tokio::spawn(async move {
//!         let _ = tx.send("hello".to_string()).await;
//!     });
//!
//!     let mut tie = weft::Tie::new();
//!     let word = tie.recv(&words);
//!     let number = tie.recv(&numbers);
//!     match tie.wait().await {
//!         Ok(0) => assert_eq!(word.take().unwrap(), "hello"),
//!         Ok(which) => panic!("unexpected winner {}", which),
//!         Err(e) => panic!("{}", e),
//!     }
//!     assert!(number.take().is_none());
//! });
//! ```
//!
//! Candidates are submitted in random order, so none of several
//! simultaneously ready channels can starve the others. Timeouts are
//! not built in; race the future against a timer of your runtime.

mod channel;
mod error;
mod op;
mod ring;
mod select;
mod shared;
pub mod stream;
mod tie;

pub use channel::{Channel, RecvFuture, SendFuture};
pub use error::{Error, TieError, TryRecvError};
pub use stream::Stream;
pub use tie::{RecvSlot, SendSlot, Tie, TieFuture};

#[cfg(test)]
mod tests;
