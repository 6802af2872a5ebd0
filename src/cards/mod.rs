//! Deck & scoring.
//!
//! A standard 52-card deck, blackjack hand scoring with soft/hard aces, and
//! the text rendering used by the chat front end.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::{CasinoError, CasinoResult};

/// Best possible hand total.
pub const BLACKJACK: u32 = 21;

/// Value removed from a total when an ace is demoted from 11 to 1.
const ACE_DEMOTION: u32 = 10;

// ---------------------------------------------------------------------------
// Rank & suit
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rank {
    Ace,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Ace,
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
    ];

    /// Points before ace demotion (aces count 11).
    pub fn points(self) -> u32 {
        match self {
            Rank::Ace => 11,
            Rank::Two => 2,
            Rank::Three => 3,
            Rank::Four => 4,
            Rank::Five => 5,
            Rank::Six => 6,
            Rank::Seven => 7,
            Rank::Eight => 8,
            Rank::Nine => 9,
            Rank::Ten | Rank::Jack | Rank::Queen | Rank::King => 10,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Rank::Ace => "A",
            Rank::Two => "2",
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Suit {
    Spades,
    Hearts,
    Diamonds,
    Clubs,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Spades, Suit::Hearts, Suit::Diamonds, Suit::Clubs];

    pub fn symbol(self) -> char {
        match self {
            Suit::Spades => '♠',
            Suit::Hearts => '♥',
            Suit::Diamonds => '♦',
            Suit::Clubs => '♣',
        }
    }

    fn from_char(c: char) -> Option<Self> {
        match c {
            '♠' | 'S' | 's' => Some(Suit::Spades),
            '♥' | 'H' | 'h' => Some(Suit::Hearts),
            '♦' | 'D' | 'd' => Some(Suit::Diamonds),
            '♣' | 'C' | 'c' => Some(Suit::Clubs),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Card
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub const fn new(rank: Rank, suit: Suit) -> Self {
        Self { rank, suit }
    }

    pub fn is_ace(&self) -> bool {
        self.rank == Rank::Ace
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank.label(), self.suit.symbol())
    }
}

/// Parse `"A♠"`, `"10♥"` or the ASCII form `"QS"`.
impl FromStr for Card {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let suit_char = s
            .chars()
            .last()
            .ok_or_else(|| anyhow::anyhow!("Empty card"))?;
        let suit = Suit::from_char(suit_char)
            .ok_or_else(|| anyhow::anyhow!("Unknown suit in card: {s}"))?;
        let label = &s[..s.len() - suit_char.len_utf8()];
        let rank = Rank::ALL
            .iter()
            .copied()
            .find(|r| r.label().eq_ignore_ascii_case(label))
            .ok_or_else(|| anyhow::anyhow!("Unknown rank in card: {s}"))?;
        Ok(Card::new(rank, suit))
    }
}

// ---------------------------------------------------------------------------
// Deck
// ---------------------------------------------------------------------------

/// A single-use deck. Cards are drawn from the tail of the sequence.
#[derive(Debug, Clone)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// A fresh 52-card deck, uniformly shuffled when `shuffle` is set.
    pub fn new(shuffle: bool) -> Self {
        let mut deck = Self::ordered();
        if shuffle {
            deck.cards.shuffle(&mut rand::thread_rng());
        }
        deck
    }

    /// A fresh deck shuffled with the given RNG (reproducible with a seeded RNG).
    pub fn shuffled_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut deck = Self::ordered();
        deck.cards.shuffle(rng);
        deck
    }

    /// A deck that yields `draw_order` front to back. Used for replays and tests.
    pub fn stacked(draw_order: Vec<Card>) -> Self {
        let mut cards = draw_order;
        cards.reverse();
        Self { cards }
    }

    fn ordered() -> Self {
        let cards = Rank::ALL
            .iter()
            .flat_map(|&rank| Suit::ALL.iter().map(move |&suit| Card::new(rank, suit)))
            .collect();
        Self { cards }
    }

    pub fn draw(&mut self) -> CasinoResult<Card> {
        self.cards.pop().ok_or(CasinoError::EmptyDeck)
    }

    pub fn remaining(&self) -> usize {
        self.cards.len()
    }
}

// ---------------------------------------------------------------------------
// Scoring & rendering
// ---------------------------------------------------------------------------

/// Best blackjack total for a hand: the highest total ≤ 21 if one exists,
/// else the lowest possible total.
pub fn score(cards: &[Card]) -> u32 {
    let mut total: u32 = cards.iter().map(|c| c.rank.points()).sum();
    let mut soft_aces = cards.iter().filter(|c| c.is_ace()).count();

    while total > BLACKJACK && soft_aces > 0 {
        total -= ACE_DEMOTION;
        soft_aces -= 1;
    }
    total
}

/// Space-separated hand, optionally masking the first card (dealer hole card).
pub fn render(cards: &[Card], hide_first: bool) -> String {
    if hide_first && !cards.is_empty() {
        let rest: Vec<String> = cards[1..].iter().map(Card::to_string).collect();
        if rest.is_empty() {
            "??".to_string()
        } else {
            format!("?? {}", rest.join(" "))
        }
    } else {
        cards.iter().map(Card::to_string).collect::<Vec<_>>().join(" ")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
