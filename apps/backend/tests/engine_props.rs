//! Properties of the local rules engine over whole rounds.

mod common;

use belka_backend::engine::belka::{follows_lead, play_card, trick_winner, ROUND_POINTS};
use belka_backend::engine::cards::full_deck;
use belka_backend::engine::{BelkaEngine, Card, Signature, Suit};
use common::proptest_prelude::proptest_prelude_config;
use proptest::prelude::*;

fn card_count(sig: &Signature) -> usize {
    sig.hands.iter().map(Vec::len).sum::<usize>()
        + sig.table.len()
        + sig.team_cards.iter().map(Vec::len).sum::<usize>()
}

fn deck_without_jack_of_clubs() -> Vec<Card> {
    full_deck()
        .into_iter()
        .filter(|c| *c != Card::JACK_OF_CLUBS)
        .collect()
}

fn suit() -> impl Strategy<Value = Suit> {
    prop::sample::select(Suit::ALL.to_vec())
}

proptest! {
    #![proptest_config(proptest_prelude_config())]

    #[test]
    fn every_deal_splits_the_short_deck(seed in any::<u64>(), rounds in 1usize..5) {
        let engine = BelkaEngine::with_seed(seed);
        let mut signature = String::new();
        for _ in 0..rounds {
            let sig = engine.next_round(&signature).unwrap();
            let mut dealt: Vec<Card> = sig.hands.iter().flatten().copied().collect();
            prop_assert!(sig.hands.iter().all(|h| h.len() == 8));
            let mut deck = full_deck();
            dealt.sort_by_key(|c| c.to_string());
            deck.sort_by_key(|c| c.to_string());
            prop_assert_eq!(dealt, deck);
            prop_assert_eq!(sig.turn, (sig.dealer + 1) % 4);
            signature = sig.to_string();
        }
    }

    #[test]
    fn legal_play_conserves_cards_and_settles_once(
        seed in any::<u64>(),
        picks in prop::collection::vec(any::<prop::sample::Index>(), 32),
    ) {
        let engine = BelkaEngine::with_seed(seed);
        let mut sig = engine.next_round("").unwrap();
        let totals_before = sig.totals;

        for (i, pick) in picks.iter().enumerate() {
            let seat = usize::from(sig.turn % 4);
            let hand = sig.hands[seat].clone();
            let legal: Vec<Card> = hand
                .iter()
                .copied()
                .filter(|c| follows_lead(&sig.table, &hand, *c, sig.trump))
                .collect();
            prop_assert!(!legal.is_empty());

            let before = sig.clone();
            play_card(&mut sig, *pick.get(&legal)).unwrap();
            prop_assert_eq!(card_count(&sig), 32);
            prop_assert!(sig.turn < 4);
            // trick boundaries every fourth card
            prop_assert_eq!(sig.table.len(), (i + 1) % 4);

            let illegal = before.hands[seat]
                .iter()
                .copied()
                .find(|c| !follows_lead(&before.table, &before.hands[seat], *c, before.trump));
            if let Some(card) = illegal {
                let mut copy = before.clone();
                prop_assert!(play_card(&mut copy, card).is_err());
                prop_assert_eq!(copy, before);
            }

            let reparsed: Signature = sig.to_string().parse().unwrap();
            prop_assert_eq!(&reparsed, &sig);
        }

        prop_assert!(sig.is_round_finished());
        let points: u32 = sig.team_cards.iter().flatten().map(|c| c.points()).sum();
        prop_assert_eq!(points, ROUND_POINTS);
        prop_assert_eq!(sig.round_scores, [0, 0]);

        let gained = [
            sig.totals[0] - totals_before[0],
            sig.totals[1] - totals_before[1],
        ];
        prop_assert!(gained[0] == 0 || gained[1] == 0);
        prop_assert!(gained.iter().all(|g| *g <= 3));
    }

    #[test]
    fn jack_of_clubs_takes_any_trick(
        trump in suit(),
        others in prop::sample::subsequence(deck_without_jack_of_clubs(), 3),
        position in 0usize..4,
    ) {
        let mut trick = others;
        trick.insert(position, Card::JACK_OF_CLUBS);
        prop_assert_eq!(trick_winner(&trick, trump), position);
    }
}
