//! One consumer watching three channels at once with `Tie`, three
//! producers on their own cadence. The consumer keeps going until a
//! channel reports closed, then drains the rest one by one.

use tokio::time::{sleep, Duration};
use weft::{Channel, Tie};

async fn produce(chan: Channel<String>, tag: &str, delay_ms: u64) {
    for word in ["The", "cat", "sat", "on", "the", "mat"] {
        chan.send(format!("{}-{}", tag, word)).await.expect("send");
        sleep(Duration::from_millis(delay_ms)).await;
    }
    chan.close();
}

fn main() {
    let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build().unwrap();
    rt.block_on(async move {
        let chans =
            [Channel::<String>::new(0), Channel::<String>::new(0), Channel::<String>::new(0)];

        tokio::spawn(produce(chans[0].clone(), "red", 13));
        tokio::spawn(produce(chans[1].clone(), "green", 29));
        tokio::spawn(produce(chans[2].clone(), "blue", 7));

        let mut open = [true, true, true];
        while open == [true, true, true] {
            let mut tie = Tie::new();
            let slots = [tie.recv(&chans[0]), tie.recv(&chans[1]), tie.recv(&chans[2])];
            match tie.wait().await {
                Ok(which) => println!("{} : {}", which, slots[which].take().expect("slot")),
                Err(e) => {
                    println!("{} : {}", e.index, e.kind);
                    open[e.index] = false;
                }
            }
        }

        // drain whatever the other producers still have
        for (i, chan) in chans.iter().enumerate() {
            while open[i] {
                match chan.recv().await {
                    Ok(word) => println!("{} : {}", i, word),
                    Err(_) => open[i] = false,
                }
            }
        }
    });
}
