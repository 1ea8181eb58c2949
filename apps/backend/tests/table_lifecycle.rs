//! A whole game driven through the worker and the dispatcher.

mod common;

use std::time::Duration;

use belka_backend::engine::signature::WIN_THRESHOLD;
use belka_backend::repos::GameRepository;
use belka_backend::spawn_pipeline;
use common::{eventually, fast_worker, legal_card, Fixture};
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn four_ready_players_play_a_game_to_the_end() {
    let fx = Fixture::new(11);
    let cancel = CancellationToken::new();
    let handles = spawn_pipeline(&fx.state, fast_worker(), cancel.clone()).unwrap();

    let (table_id, ctxs) = fx.ready_table().await;

    let deadline = Instant::now() + Duration::from_secs(120);
    let mut moves = 0usize;
    loop {
        let table = fx.repo.find_table(table_id).await.unwrap().unwrap();
        if table.end_time.is_some() {
            break;
        }
        assert!(Instant::now() < deadline, "game did not finish after {moves} moves");
        if !fx.waits_for_move(table_id).await {
            sleep(Duration::from_millis(2)).await;
            continue;
        }

        let sig = fx.signature(table_id).await;
        let card = legal_card(&sig);
        let mover = &ctxs[usize::from(sig.turn % 4)];
        let view = fx.flow().make_move(mover, table_id, &card).await.unwrap();

        // the mover sees their own hand and nobody else's
        for seat in &view.players {
            if seat.player_id == mover.player_id {
                assert_eq!(seat.cards.len(), seat.cards_count * 2);
            } else {
                assert!(seat.cards.is_empty());
            }
        }
        moves += 1;
    }

    let sig = fx.signature(table_id).await;
    assert!(sig.totals.iter().any(|t| *t >= WIN_THRESHOLD));
    assert_eq!(moves % 4, 0);

    for n in 1..=4 {
        let remote = format!("remote-{n}");
        let events = fx.realtime.events_for(&remote);
        assert_eq!(events.iter().filter(|e| *e == "GameStarted").count(), 1);
        assert_eq!(events.iter().filter(|e| *e == "GameFinished").count(), 1);
        assert!(events.iter().any(|e| e == "RoundStarted"));
        assert!(events.iter().any(|e| e == "DealFinished"));

        let finished = fx
            .realtime
            .delivered_to(&remote)
            .into_iter()
            .find(|e| e["event"] == "GameFinished")
            .unwrap();
        let winner = finished["payload"]["winner_team"].as_u64().unwrap();
        assert!(winner == 1 || winner == 2);
    }

    // nothing is left to run once the game is over
    eventually("queue to drain", Duration::from_secs(5), || async {
        fx.tasks.indexed_len() == 0
    })
    .await;

    cancel.cancel();
    for handle in handles {
        handle.await.unwrap();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn round_started_is_redacted_per_recipient() {
    let fx = Fixture::new(3);
    let cancel = CancellationToken::new();
    let handles = spawn_pipeline(&fx.state, fast_worker(), cancel.clone()).unwrap();

    let (table_id, ctxs) = fx.ready_table().await;
    eventually("first turn", Duration::from_secs(10), || fx.waits_for_move(table_id)).await;

    for (i, ctx) in ctxs.iter().enumerate() {
        let remote = format!("remote-{}", i + 1);
        let started = fx
            .realtime
            .delivered_to(&remote)
            .into_iter()
            .find(|e| e["event"] == "RoundStarted")
            .unwrap();
        let players = started["payload"]["table"]["players"].as_array().unwrap();
        assert_eq!(players.len(), 4);
        for seat in players {
            let own = seat["player_id"].as_i64() == ctx.player_id;
            let cards = seat["cards"].as_str().unwrap();
            assert_eq!(seat["cards_count"], 8);
            if own {
                assert_eq!(cards.len(), 16);
            } else {
                assert_eq!(cards, "");
            }
        }
    }

    let events = fx.realtime.events_for("remote-1");
    let wait = events.iter().position(|e| e == "WaitForMove").unwrap();
    let started = events.iter().position(|e| e == "RoundStarted").unwrap();
    assert!(started < wait);

    cancel.cancel();
    for handle in handles {
        handle.await.unwrap();
    }
}
