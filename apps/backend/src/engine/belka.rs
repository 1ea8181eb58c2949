//! Local Belka rules engine.

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use super::cards::{full_deck, Card, Suit};
use super::signature::{team_of, Signature, SEATS};
use super::RulesEngine;
use crate::errors::domain::{DomainError, ValidationKind};

pub const CARDS_PER_HAND: usize = 8;

/// Card points in a full round.
pub const ROUND_POINTS: u32 = 120;

/// Losers below this many card points concede an extra game point.
pub const SHUT_OUT_LIMIT: u32 = 30;

pub struct BelkaEngine {
    rng: Mutex<ChaCha8Rng>,
}

impl BelkaEngine {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(ChaCha8Rng::from_os_rng()),
        }
    }

    /// Deterministic dealing, for tests and replays.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }

    fn deal(&self) -> [Vec<Card>; SEATS] {
        let mut deck = full_deck();
        deck.shuffle(&mut *self.rng.lock());
        let mut hands: [Vec<Card>; SEATS] = Default::default();
        for (seat, chunk) in deck.chunks(CARDS_PER_HAND).enumerate() {
            hands[seat] = chunk.to_vec();
        }
        hands
    }

    pub fn next_round(&self, signature: &str) -> Result<Signature, DomainError> {
        let mut sig = if signature.is_empty() {
            Signature::initial()
        } else {
            signature.parse::<Signature>()?
        };

        let dealer = (sig.dealer + 1) % SEATS as u8;
        sig.dealer = dealer;
        sig.turn = (dealer + 1) % SEATS as u8;
        sig.hands = self.deal();
        sig.table.clear();
        sig.round_scores = [0, 0];
        sig.team_cards = Default::default();

        if sig.club_player.is_some() {
            if let Some(seat) = sig
                .hands
                .iter()
                .position(|h| h.contains(&Card::JACK_OF_CLUBS))
            {
                sig.trump = Suit::from_index(seat as u8).unwrap_or(Suit::Clubs);
            }
        }

        Ok(sig)
    }
}

impl Default for BelkaEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RulesEngine for BelkaEngine {
    async fn new_round(&self, signature: &str) -> Result<String, DomainError> {
        let sig = self.next_round(signature)?;
        debug!(dealer = sig.dealer, trump = ?sig.trump, "Dealt new round");
        Ok(sig.to_string())
    }

    async fn make_move(&self, signature: &str, card: &str) -> Result<String, DomainError> {
        let mut sig: Signature = signature.parse()?;
        let card: Card = card.parse().map_err(|_| {
            DomainError::validation(ValidationKind::InvalidMove, format!("Malformed card {card}"))
        })?;
        play_card(&mut sig, card)?;
        Ok(sig.to_string())
    }
}

fn invalid_move(detail: impl Into<String>) -> DomainError {
    DomainError::validation(ValidationKind::InvalidMove, detail)
}

/// Apply one card for the seat whose turn it is.
pub fn play_card(sig: &mut Signature, card: Card) -> Result<(), DomainError> {
    let seat = sig.turn as usize % SEATS;
    let pos = sig.hands[seat]
        .iter()
        .position(|c| *c == card)
        .ok_or_else(|| invalid_move(format!("Card {card} is not in seat {seat}'s hand")))?;

    if !follows_lead(&sig.table, &sig.hands[seat], card, sig.trump) {
        return Err(invalid_move(format!("Card {card} does not follow the lead")));
    }

    sig.hands[seat].remove(pos);
    if card == Card::JACK_OF_CLUBS && sig.club_player.is_none() {
        sig.club_player = Some(seat as u8);
    }
    sig.table.push(card);

    if sig.table.len() < SEATS {
        sig.turn = ((seat + 1) % SEATS) as u8;
        return Ok(());
    }

    // seat played last, so the seat after it led
    let leader = (seat + 1) % SEATS;
    let winner = ((leader + trick_winner(&sig.table, sig.trump)) % SEATS) as u8;
    let team = team_of(winner);
    let points: u32 = sig.table.iter().map(|c| c.points()).sum();
    sig.round_scores[team] += points;
    let trick: Vec<Card> = sig.table.drain(..).collect();
    sig.team_cards[team].extend(trick);
    sig.turn = winner;

    if sig.is_round_finished() {
        settle_round(sig);
    }
    Ok(())
}

/// Award game points for a completed round and reset the round scores.
///
/// The foreign-trump bonus goes by the seat whose jack of clubs chose the
/// trump, not by a fixed suit-to-team table.
fn settle_round(sig: &mut Signature) {
    let [t1, t2] = sig.round_scores;
    sig.round_scores = [0, 0];
    if t1 == t2 {
        return;
    }
    let (winner, loser_points) = if t1 > t2 { (0, t2) } else { (1, t1) };

    let mut award = 1;
    if loser_points < SHUT_OUT_LIMIT {
        award += 1;
    }
    // the suit index names the seat whose jack of clubs chose it
    if team_of(sig.trump.index()) != winner {
        award += 1;
    }
    sig.totals[winner] += award;
}

/// Whether `card` may be played onto `table` from `hand`.
pub fn follows_lead(table: &[Card], hand: &[Card], card: Card, trump: Suit) -> bool {
    let Some(lead) = table.first().copied() else {
        return true;
    };

    if lead.is_trump(trump) {
        return card.is_trump(trump) || !hand.iter().any(|c| c.is_trump(trump));
    }

    if card.suit == lead.suit && !card.is_jack() {
        return true;
    }
    !hand.iter().any(|c| c.suit == lead.suit && !c.is_jack())
}

/// Index into `trick` of the winning card.
pub fn trick_winner(trick: &[Card], trump: Suit) -> usize {
    let mut best = 0;
    for (i, card) in trick.iter().enumerate().skip(1) {
        if beats(*card, trick[best], trump) {
            best = i;
        }
    }
    best
}

/// Whether `challenger` takes the trick from the current best card.
fn beats(challenger: Card, best: Card, trump: Suit) -> bool {
    if best.is_jack() {
        return challenger.is_jack() && challenger.suit < best.suit;
    }
    if challenger.is_jack() {
        return true;
    }
    if best.suit == trump {
        return challenger.suit == trump && challenger.face.power() > best.face.power();
    }
    if challenger.suit == trump {
        return true;
    }
    challenger.suit == best.suit && challenger.face.power() > best.face.power()
}
