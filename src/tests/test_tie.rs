use super::common::*;
use crate::*;
use log::*;
use rstest::*;
use std::collections::HashSet;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tokio::time::{timeout, Duration};

#[rstest]
#[tokio::test]
async fn test_tie_single_recv_candidate(setup_log: ()) {
    let _ = setup_log;
    let chan = Channel::<i32>::new(1);
    chan.send(11).await.expect("send");
    let mut tie = Tie::new();
    let got = tie.recv(&chan);
    assert_eq!(tie.wait().await, Ok(0));
    assert_eq!(got.take(), Some(11));
    // one-shot: the slot is drained
    assert_eq!(got.take(), None);
}

#[rstest]
#[tokio::test]
async fn test_tie_recv_picks_the_ready_channel(setup_log: ()) {
    let _ = setup_log;
    let idle = Channel::<i32>::new(1);
    let ready = Channel::<i32>::new(1);
    ready.send(5).await.expect("send");
    let mut tie = Tie::new();
    let from_idle = tie.recv(&idle);
    let from_ready = tie.recv(&ready);
    assert_eq!(tie.wait().await, Ok(1));
    assert_eq!(from_ready.take(), Some(5));
    assert_eq!(from_idle.take(), None);
}

#[rstest]
#[tokio::test]
async fn test_tie_send_loser_keeps_value(setup_log: ()) {
    let _ = setup_log;
    let c1 = Channel::<i32>::new(1);
    let c2 = Channel::<i32>::new(1);
    let mut tie = Tie::new();
    let slots = [tie.send(&c1, 10), tie.send(&c2, 20)];
    // both channels have room: one candidate wins, the other is left
    let which = tie.wait().await.expect("tie");
    assert!(which < 2);
    let loser = 1 - which;
    assert_eq!(slots[which].reclaim(), None);
    assert_eq!(slots[loser].reclaim(), Some([10, 20][loser]));
    let winner_chan = [&c1, &c2][which];
    assert_eq!(winner_chan.try_recv(), Ok([10, 20][which]));
    let loser_chan = [&c1, &c2][loser];
    assert_eq!(loser_chan.try_recv(), Err(TryRecvError::Empty));
}

#[rstest]
#[tokio::test]
async fn test_tie_null_operand_reports_first_null_index(setup_log: ()) {
    let _ = setup_log;
    let live = Channel::<i32>::new(1);
    let mut tie = Tie::new();
    let _a = tie.recv(&live);
    let _b = tie.recv(&Channel::<String>::null());
    let _c = tie.send(&Channel::<i32>::null(), 1);
    assert_eq!(tie.wait().await, Err(TieError { index: 1, kind: Error::Null }));
    // nothing was submitted to the live channel
    assert_eq!(live.try_recv(), Err(TryRecvError::Empty));
}

#[rstest]
#[tokio::test]
async fn test_tie_on_closed_channel_fails_with_index(setup_log: ()) {
    let _ = setup_log;
    let open = Channel::<i32>::new(0);
    let closed = Channel::<i32>::new(0);
    closed.close();
    let mut tie = Tie::new();
    let _a = tie.recv(&open);
    let _b = tie.recv(&closed);
    assert_eq!(tie.wait().await, Err(TieError { index: 1, kind: Error::Closed }));
}

#[rstest]
#[tokio::test]
async fn test_tie_future_drop_withdraws_candidates(setup_log: ()) {
    let _ = setup_log;
    let chan = Channel::<i32>::new(1);
    {
        let mut tie = Tie::new();
        let _got = tie.recv(&chan);
        assert!(timeout(Duration::from_millis(50), tie.wait()).await.is_err());
    }
    // the dead candidate is skipped; a later send still lands
    chan.send(8).await.expect("send");
    assert_eq!(chan.try_recv(), Ok(8));
}

#[rstest]
#[tokio::test]
async fn test_tie_timeout_composition(setup_log: ()) {
    let _ = setup_log;
    let chan = Channel::<i32>::new(0);
    let mut tie = Tie::new();
    let _got = tie.recv(&chan);
    let raced = timeout(Duration::from_millis(20), tie.wait()).await;
    assert!(raced.is_err());
}

#[rstest]
#[tokio::test]
async fn test_tie_fairness_three_ready(setup_log: ()) {
    let _ = setup_log;
    let chans = [Channel::<i32>::new(1), Channel::<i32>::new(1), Channel::<i32>::new(1)];
    let rounds = 3000usize;
    let mut wins = [0usize; 3];
    for _ in 0..rounds {
        let mut tie = Tie::new();
        for chan in &chans {
            let _ = tie.send(chan, 1);
        }
        let which = tie.wait().await.expect("tie");
        wins[which] += 1;
        // drain so every channel is ready again next round
        assert_eq!(chans[which].try_recv(), Ok(1));
    }
    info!("tie wins: {:?}", wins);
    for w in wins {
        let freq = w as f64 / rounds as f64;
        assert!((0.23..0.43).contains(&freq), "unfair win frequency {}", freq);
    }
}

#[rstest]
fn test_tie_race_two_channels(setup_log: ()) {
    let _ = setup_log;
    let rt = get_runtime();
    rt.block_on(async move {
        let c1 = Channel::<String>::new(0);
        let c2 = Channel::<String>::new(0);
        let rounds = 1000usize;
        let first_wins = Arc::new(AtomicUsize::new(0));

        let receiver = tokio::spawn({
            let c1 = c1.clone();
            let c2 = c2.clone();
            let first_wins = first_wins.clone();
            async move {
                let mut got = Vec::new();
                for round in 0..rounds {
                    for hop in 0..2 {
                        let mut tie = Tie::new();
                        let s1 = tie.recv(&c1);
                        let s2 = tie.recv(&c2);
                        let which = tie.wait().await.expect("tie recv");
                        if hop == 0 && which == 0 {
                            first_wins.fetch_add(1, Ordering::SeqCst);
                        }
                        got.push(match which {
                            0 => s1.take().expect("slot 0"),
                            _ => s2.take().expect("slot 1"),
                        });
                    }
                    if round % 200 == 0 {
                        debug!("receiver at round {}", round);
                    }
                }
                got
            }
        });

        let sender = tokio::spawn({
            let c1 = c1.clone();
            let c2 = c2.clone();
            async move {
                for round in 0..rounds {
                    let mut tie = Tie::new();
                    let a = tie.send(&c1, format!("a{}", round));
                    let b = tie.send(&c2, format!("b{}", round));
                    let which = tie.wait().await.expect("tie send");
                    // push the leftover value into the other channel
                    match which {
                        0 => c2.send(b.reclaim().expect("slot b")).await.expect("send"),
                        _ => c1.send(a.reclaim().expect("slot a")).await.expect("send"),
                    }
                }
            }
        });

        sender.await.unwrap();
        let got = receiver.await.unwrap();

        let expect: HashSet<String> = (0..rounds)
            .flat_map(|round| [format!("a{}", round), format!("b{}", round)])
            .collect();
        let got_set: HashSet<String> = got.iter().cloned().collect();
        assert_eq!(got.len(), rounds * 2);
        assert_eq!(got_set, expect);

        let freq = first_wins.load(Ordering::SeqCst) as f64 / rounds as f64;
        info!("receiver-side first-hop wins for c1: {}", freq);
        assert!((0.3..0.7).contains(&freq), "unfair tie frequency {}", freq);
    });
}
