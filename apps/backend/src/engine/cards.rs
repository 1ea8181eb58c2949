//! Card model for the 32-card Belka deck.
//!
//! A card is written as two lowercase hex digits, face then suit, e.g. `"90"`
//! is the jack of clubs and `"c2"` the ace of hearts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::domain::{DomainError, ValidationKind};

/// Suits in jack-strength order: the jack of clubs is the highest trump.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum Suit {
    Clubs,
    Spades,
    Hearts,
    Diamonds,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Clubs, Suit::Spades, Suit::Hearts, Suit::Diamonds];

    pub fn index(self) -> u8 {
        match self {
            Suit::Clubs => 0,
            Suit::Spades => 1,
            Suit::Hearts => 2,
            Suit::Diamonds => 3,
        }
    }

    pub fn from_index(index: u8) -> Option<Suit> {
        Suit::ALL.get(index as usize).copied()
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Face {
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Face {
    pub const ALL: [Face; 8] = [
        Face::Seven,
        Face::Eight,
        Face::Nine,
        Face::Ten,
        Face::Jack,
        Face::Queen,
        Face::King,
        Face::Ace,
    ];

    fn hex(self) -> char {
        match self {
            Face::Seven => '5',
            Face::Eight => '6',
            Face::Nine => '7',
            Face::Ten => '8',
            Face::Jack => '9',
            Face::Queen => 'a',
            Face::King => 'b',
            Face::Ace => 'c',
        }
    }

    fn from_hex(ch: char) -> Option<Face> {
        Face::ALL.into_iter().find(|f| f.hex() == ch)
    }

    /// Taking power among non-jack cards of one suit.
    pub fn power(self) -> u8 {
        match self {
            Face::Seven => 0,
            Face::Eight => 1,
            Face::Nine => 2,
            Face::Queen => 3,
            Face::King => 4,
            Face::Ten => 5,
            Face::Ace => 6,
            // jacks never compare by face
            Face::Jack => 7,
        }
    }

    pub fn points(self) -> u32 {
        match self {
            Face::Ace => 11,
            Face::Ten => 10,
            Face::King => 4,
            Face::Queen => 3,
            Face::Jack => 2,
            Face::Seven | Face::Eight | Face::Nine => 0,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub face: Face,
    pub suit: Suit,
}

impl Card {
    pub const fn new(face: Face, suit: Suit) -> Self {
        Self { face, suit }
    }

    pub const JACK_OF_CLUBS: Card = Card::new(Face::Jack, Suit::Clubs);

    pub fn is_jack(self) -> bool {
        self.face == Face::Jack
    }

    /// Jacks are trumps regardless of the round's trump suit.
    pub fn is_trump(self, trump: Suit) -> bool {
        self.is_jack() || self.suit == trump
    }

    pub fn points(self) -> u32 {
        self.face.points()
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.face.hex(), self.suit.index())
    }
}

impl FromStr for Card {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::validation(ValidationKind::InvalidCard, format!("Parse card: {s}"));
        let mut chars = s.chars();
        let (Some(face_ch), Some(suit_ch), None) = (chars.next(), chars.next(), chars.next())
        else {
            return Err(invalid());
        };
        let face = Face::from_hex(face_ch.to_ascii_lowercase()).ok_or_else(invalid)?;
        let suit = suit_ch
            .to_digit(16)
            .and_then(|d| Suit::from_index(d as u8))
            .ok_or_else(invalid)?;
        Ok(Card { face, suit })
    }
}

/// Parse a run of two-character cards such as `"90c2"`.
pub fn parse_cards(s: &str) -> Result<Vec<Card>, DomainError> {
    if s.len() % 2 != 0 || !s.is_ascii() {
        return Err(DomainError::validation(
            ValidationKind::InvalidCard,
            format!("Odd card run: {s}"),
        ));
    }
    s.as_bytes()
        .chunks(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .map_err(|_| {
                    DomainError::validation(ValidationKind::InvalidCard, "Non-ascii card run")
                })
                .and_then(Card::from_str)
        })
        .collect()
}

pub fn format_cards(cards: &[Card]) -> String {
    cards.iter().map(Card::to_string).collect()
}

/// All 32 cards, suit by suit.
pub fn full_deck() -> Vec<Card> {
    let mut deck = Vec::with_capacity(32);
    for suit in Suit::ALL {
        for face in Face::ALL {
            deck.push(Card::new(face, suit));
        }
    }
    deck
}
