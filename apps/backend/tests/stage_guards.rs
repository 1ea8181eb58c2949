//! Rejected moves and replayed stages leave the table untouched.

mod common;

use std::time::Duration;

use belka_backend::dispatch::Stage;
use belka_backend::queue::{Task, TaskQueue};
use belka_backend::repos::GameRepository;
use belka_backend::{spawn_pipeline, ErrorCode, RequestContext};
use common::{eventually, fast_worker, illegal_card, legal_card, Fixture};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Wait for the next open turn and play a legal card for it.
async fn play_one(fx: &Fixture, table_id: i64, ctxs: &[RequestContext]) {
    eventually("an open turn", Duration::from_secs(10), || fx.waits_for_move(table_id)).await;
    let sig = fx.signature(table_id).await;
    let card = legal_card(&sig);
    fx.flow()
        .make_move(&ctxs[usize::from(sig.turn % 4)], table_id, &card)
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rejected_moves_change_nothing() {
    let fx = Fixture::new(21);
    let cancel = CancellationToken::new();
    let handles = spawn_pipeline(&fx.state, fast_worker(), cancel.clone()).unwrap();
    let (table_id, ctxs) = fx.ready_table().await;

    // lead, so the next seat has a trick to follow
    play_one(&fx, table_id, &ctxs).await;
    eventually("second turn", Duration::from_secs(10), || fx.waits_for_move(table_id)).await;

    let before = fx.repo.find_table(table_id).await.unwrap().unwrap().signature;
    let sig = fx.signature(table_id).await;
    let mover = usize::from(sig.turn % 4);
    let open = fx
        .repo
        .find_current_deal_order_for_table(table_id)
        .await
        .unwrap()
        .unwrap();

    // a card held by someone else
    let foreign = sig.hands[(mover + 1) % 4][0].to_string();
    let err = fx
        .flow()
        .make_move(&ctxs[mover], table_id, &foreign)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidMove);

    if let Some(card) = illegal_card(&sig) {
        let err = fx
            .flow()
            .make_move(&ctxs[mover], table_id, &card)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidMove);
    }

    let err = fx
        .flow()
        .make_move(&ctxs[(mover + 2) % 4], table_id, &legal_card(&sig))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::OrderError);

    let err = fx
        .flow()
        .make_move(&ctxs[mover], table_id, "zz")
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidMove);

    let after = fx.repo.find_table(table_id).await.unwrap().unwrap().signature;
    assert_eq!(before, after);
    let still_open = fx
        .repo
        .find_current_deal_order_for_table(table_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(still_open.id, open.id);
    assert!(!still_open.is_closed());

    cancel.cancel();
    for handle in handles {
        handle.await.unwrap();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn replayed_finish_round_is_ignored() {
    let fx = Fixture::new(8);
    let cancel = CancellationToken::new();
    let handles = spawn_pipeline(&fx.state, fast_worker(), cancel.clone()).unwrap();
    let (table_id, ctxs) = fx.ready_table().await;

    eventually("first turn", Duration::from_secs(10), || fx.waits_for_move(table_id)).await;
    let first_round = fx
        .repo
        .find_current_round_for_table(table_id)
        .await
        .unwrap()
        .unwrap();

    // a round is eight tricks of four cards
    for _ in 0..32 {
        play_one(&fx, table_id, &ctxs).await;
    }
    eventually("the next round", Duration::from_secs(10), || async {
        fx.repo
            .find_current_round_for_table(table_id)
            .await
            .unwrap()
            .is_some_and(|round| round.id != first_round.id)
            && fx.waits_for_move(table_id).await
    })
    .await;

    let signature = fx.repo.find_table(table_id).await.unwrap().unwrap().signature;
    let finished_before = count(&fx, "RoundFinished");
    assert_eq!(finished_before, 4);

    let queue = TaskQueue::new(fx.tasks.clone(), Duration::from_secs(60));
    queue
        .add_task(
            Task::new(Stage::FinishRound.as_str(), table_id.to_string())
                .with_payload(first_round.id.to_string()),
        )
        .await
        .unwrap();
    eventually("the replay to be delivered", Duration::from_secs(5), || async {
        fx.tasks.indexed_len() == 0
    })
    .await;
    sleep(Duration::from_millis(100)).await;

    assert_eq!(count(&fx, "RoundFinished"), finished_before);
    assert_eq!(
        fx.repo.find_table(table_id).await.unwrap().unwrap().signature,
        signature
    );
    assert!(fx.waits_for_move(table_id).await);

    cancel.cancel();
    for handle in handles {
        handle.await.unwrap();
    }
}

/// Deliveries of `event` across all four remotes.
fn count(fx: &Fixture, event: &str) -> usize {
    (1..=4)
        .map(|n| {
            fx.realtime
                .events_for(&format!("remote-{n}"))
                .iter()
                .filter(|e| *e == event)
                .count()
        })
        .sum()
}
