//! Values crossing OS threads: a plain producer thread feeds an async
//! consumer through a rendezvous channel, using `try_recv` on the
//! thread side for the replies.

use std::thread;
use std::time::Duration;
use weft::{Channel, TryRecvError};

fn main() {
    let requests = Channel::<u64>::new(0);
    let replies = Channel::<u64>::new(16);

    let req_tx = requests.clone();
    let reply_rx = replies.clone();
    let producer = thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(async move {
            for n in 1..=10u64 {
                req_tx.send(n).await.expect("send request");
            }
            req_tx.close();
        });
        // drain replies without an executor
        let mut seen = 0;
        while seen < 10 {
            match reply_rx.try_recv() {
                Ok(square) => {
                    println!("reply: {}", square);
                    seen += 1;
                }
                Err(TryRecvError::Empty) => thread::sleep(Duration::from_millis(1)),
                Err(e) => panic!("{}", e),
            }
        }
    });

    let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build().unwrap();
    rt.block_on(async move {
        while let Ok(n) = requests.recv().await {
            replies.send(n * n).await.expect("send reply");
        }
        replies.close();
    });

    producer.join().unwrap();
}
