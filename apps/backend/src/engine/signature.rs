//! Parser for the rules-engine signature.
//!
//! A signature is 15 colon-separated fields:
//!
//! ```text
//! hand0:hand1:hand2:hand3:trump:turn:table:club_player:dealer:
//! t1_round:t2_round:t1_cards:t2_cards:t1_total:t2_total
//! ```
//!
//! Hands, the trick on the table and each team's taken cards are card runs.
//! Numeric fields may be empty, which reads as zero (or "unset" for the club
//! player). Seats 0 and 2 form team one, seats 1 and 3 team two.

use std::fmt;
use std::str::FromStr;

use super::cards::{format_cards, parse_cards, Card, Suit};
use crate::errors::domain::{DomainError, ValidationKind};

pub const FIELD_COUNT: usize = 15;

/// A team wins the game on reaching this many game points.
pub const WIN_THRESHOLD: u32 = 12;

pub const SEATS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub hands: [Vec<Card>; SEATS],
    pub trump: Suit,
    /// Seat index (0..4) expected to play next.
    pub turn: u8,
    /// Cards of the trick in progress, in play order.
    pub table: Vec<Card>,
    /// Seat that first played the jack of clubs, if any.
    pub club_player: Option<u8>,
    pub dealer: u8,
    pub round_scores: [u32; 2],
    pub team_cards: [Vec<Card>; 2],
    pub totals: [u32; 2],
}

impl Signature {
    /// State before the first deal: clubs trump, dealer on seat 2.
    pub fn initial() -> Self {
        Self {
            hands: Default::default(),
            trump: Suit::Clubs,
            turn: 0,
            table: Vec::new(),
            club_player: None,
            dealer: 2,
            round_scores: [0, 0],
            team_cards: Default::default(),
            totals: [0, 0],
        }
    }

    pub fn table_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn is_round_finished(&self) -> bool {
        self.hands.iter().all(Vec::is_empty)
    }

    pub fn is_game_finished(&self) -> bool {
        self.totals.iter().any(|t| *t >= WIN_THRESHOLD)
    }

    /// Team index (0 or 1) with the higher total, once the game is over.
    pub fn winning_team(&self) -> Option<usize> {
        if !self.is_game_finished() {
            return None;
        }
        Some(if self.totals[0] >= self.totals[1] { 0 } else { 1 })
    }

    /// 1-based seat order of the participant whose turn it is.
    pub fn turn_order(&self) -> i16 {
        i16::from(self.turn % SEATS as u8) + 1
    }
}

pub fn team_of(seat: u8) -> usize {
    (seat % 2) as usize
}

fn invalid(detail: impl Into<String>) -> DomainError {
    DomainError::validation(ValidationKind::InvalidSignature, detail)
}

fn number(field: &str, name: &str) -> Result<u32, DomainError> {
    if field.is_empty() {
        return Ok(0);
    }
    field
        .parse::<u32>()
        .map_err(|_| invalid(format!("{name} is not a number: {field}")))
}

fn seat(field: &str, name: &str) -> Result<u8, DomainError> {
    let value = number(field, name)?;
    u8::try_from(value % SEATS as u32).map_err(|_| invalid(format!("{name} out of range")))
}

fn cards(field: &str, name: &str) -> Result<Vec<Card>, DomainError> {
    parse_cards(field).map_err(|_| invalid(format!("{name} holds an invalid card run")))
}

impl FromStr for Signature {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split(':').collect();
        if fields.len() != FIELD_COUNT {
            return Err(invalid(format!(
                "expected {FIELD_COUNT} fields, got {}",
                fields.len()
            )));
        }

        let trump = if fields[4].is_empty() {
            Suit::Clubs
        } else {
            let idx = number(fields[4], "trump")?;
            u8::try_from(idx)
                .ok()
                .and_then(Suit::from_index)
                .ok_or_else(|| invalid(format!("unknown trump suit {idx}")))?
        };

        let club_player = if fields[7].is_empty() {
            None
        } else {
            Some(seat(fields[7], "club player")?)
        };

        Ok(Signature {
            hands: [
                cards(fields[0], "hand 0")?,
                cards(fields[1], "hand 1")?,
                cards(fields[2], "hand 2")?,
                cards(fields[3], "hand 3")?,
            ],
            trump,
            turn: seat(fields[5], "turn")?,
            table: cards(fields[6], "table")?,
            club_player,
            dealer: seat(fields[8], "dealer")?,
            round_scores: [
                number(fields[9], "team 1 round score")?,
                number(fields[10], "team 2 round score")?,
            ],
            team_cards: [
                cards(fields[11], "team 1 cards")?,
                cards(fields[12], "team 2 cards")?,
            ],
            totals: [
                number(fields[13], "team 1 total")?,
                number(fields[14], "team 2 total")?,
            ],
        })
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let club_player = self
            .club_player
            .map(|s| s.to_string())
            .unwrap_or_default();
        write!(
            f,
            "{}:{}:{}:{}:{}:{}:{}:{}:{}:{}:{}:{}:{}:{}:{}",
            format_cards(&self.hands[0]),
            format_cards(&self.hands[1]),
            format_cards(&self.hands[2]),
            format_cards(&self.hands[3]),
            self.trump.index(),
            self.turn,
            format_cards(&self.table),
            club_player,
            self.dealer,
            self.round_scores[0],
            self.round_scores[1],
            format_cards(&self.team_cards[0]),
            format_cards(&self.team_cards[1]),
            self.totals[0],
            self.totals[1],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MID_ROUND: &str = "8052:c2:b3:a1:0:1:90:0:3:0:0:::4:11";

    #[test]
    fn parses_fields_and_predicates() {
        let sig: Signature = MID_ROUND.parse().unwrap();
        assert_eq!(sig.hands[0].len(), 2);
        assert_eq!(sig.turn, 1);
        assert_eq!(sig.turn_order(), 2);
        assert_eq!(sig.club_player, Some(0));
        assert_eq!(sig.table, vec![Card::JACK_OF_CLUBS]);
        assert!(!sig.table_empty());
        assert!(!sig.is_round_finished());
        assert!(!sig.is_game_finished());
        assert_eq!(sig.to_string(), MID_ROUND);
    }

    #[test]
    fn empty_numeric_fields_read_as_zero() {
        let sig: Signature = "::::0:::::::::0:0".parse().unwrap();
        assert_eq!(sig.dealer, 0);
        assert_eq!(sig.club_player, None);
        assert!(sig.is_round_finished());
        assert!(sig.table_empty());
    }

    #[test]
    fn game_finishes_at_threshold() {
        let mut sig = Signature::initial();
        sig.totals = [11, 12];
        assert!(sig.is_game_finished());
        assert_eq!(sig.winning_team(), Some(1));
        sig.totals = [11, 3];
        assert!(!sig.is_game_finished());
        assert_eq!(sig.winning_team(), None);
    }

    #[test]
    fn rejects_malformed_signatures() {
        for bad in [
            "",
            "a:b",
            "905:::::::::::::0:0",
            "::::9:::::::::0:0",
            "::::0:x::::::::0:0",
        ] {
            let err = bad.parse::<Signature>().unwrap_err();
            assert!(
                matches!(err, DomainError::Validation(ValidationKind::InvalidSignature, _)),
                "{bad:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn turn_order_is_one_based_seat() {
        let mut sig = Signature::initial();
        for (turn, order) in [(0u8, 1i16), (1, 2), (2, 3), (3, 4)] {
            sig.turn = turn;
            assert_eq!(sig.turn_order(), order);
        }
    }
}
