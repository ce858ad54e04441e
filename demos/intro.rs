//! Smallest possible tour: one buffered channel, one producer task, one
//! consumer draining until close.

use weft::Channel;

fn main() {
    let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build().unwrap();
    rt.block_on(async move {
        let chan = Channel::<String>::new(3);

        let tx = chan.clone();
        tokio::spawn(async move {
            for word in ["The", "cat", "sat", "on", "the", "mat"] {
                tx.send(word.to_string()).await.expect("send");
            }
            tx.close();
        });

        loop {
            match chan.recv().await {
                Ok(word) => println!("{}", word),
                Err(e) => {
                    println!("done: {}", e);
                    break;
                }
            }
        }
    });
}
