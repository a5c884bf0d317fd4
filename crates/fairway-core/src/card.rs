#![forbid(unsafe_code)]

//! Cards as the authority describes them.
//!
//! A [`Card`] is an immutable value. Its identity ([`CardFace`]) is only
//! meaningful while the card is face-up: the authority may or may not send the
//! face of a face-down card, and the client must never act on it.

use std::fmt;

use serde::{Serialize, Serializer};

/// Ordinal face value, including the wild joker sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rank {
    Joker,
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
    /// All ranks in ordinal order.
    pub const ALL: [Rank; 14] = [
        Rank::Joker,
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

    /// Ordinal value (joker = 0, ace = 1, king = 13).
    #[inline]
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    /// Parse the authority's rank token.
    ///
    /// Accepts `"A"`, `"2"`..`"10"`, `"J"`, `"Q"`, `"K"`, and `"JOKER"`/`"★"`,
    /// case-insensitively. Returns `None` for anything else.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        let rank = match token.trim().to_ascii_uppercase().as_str() {
            "A" | "1" => Rank::Ace,
            "2" => Rank::Two,
            "3" => Rank::Three,
            "4" => Rank::Four,
            "5" => Rank::Five,
            "6" => Rank::Six,
            "7" => Rank::Seven,
            "8" => Rank::Eight,
            "9" => Rank::Nine,
            "10" | "T" => Rank::Ten,
            "J" => Rank::Jack,
            "Q" => Rank::Queen,
            "K" => Rank::King,
            "JOKER" | "★" => Rank::Joker,
            _ => return None,
        };
        Some(rank)
    }

    /// Wire token for this rank.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Rank::Joker => "JOKER",
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

/// One of the four suits, or the marker carried by jokers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Suit {
    Clubs,
    Diamonds,
    Hearts,
    Spades,
    JokerOnly,
}

impl Suit {
    /// Parse the authority's suit token (`"clubs"`, `"c"`, `"♣"`, ...).
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        let suit = match token.trim().to_ascii_lowercase().as_str() {
            "clubs" | "c" | "♣" => Suit::Clubs,
            "diamonds" | "d" | "♦" => Suit::Diamonds,
            "hearts" | "h" | "♥" => Suit::Hearts,
            "spades" | "s" | "♠" => Suit::Spades,
            "joker" | "none" | "" => Suit::JokerOnly,
            _ => return None,
        };
        Some(suit)
    }

    /// Wire token for this suit.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Suit::Clubs => "clubs",
            Suit::Diamonds => "diamonds",
            Suit::Hearts => "hearts",
            Suit::Spades => "spades",
            Suit::JokerOnly => "joker",
        }
    }

    /// Single-glyph symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Suit::Clubs => "♣",
            Suit::Diamonds => "♦",
            Suit::Hearts => "♥",
            Suit::Spades => "♠",
            Suit::JokerOnly => "★",
        }
    }
}

/// The identity of a card: rank and suit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CardFace {
    pub rank: Rank,
    pub suit: Suit,
}

impl CardFace {
    #[inline]
    #[must_use]
    pub const fn new(rank: Rank, suit: Suit) -> Self {
        Self { rank, suit }
    }

    /// The joker face.
    #[inline]
    #[must_use]
    pub const fn joker() -> Self {
        Self::new(Rank::Joker, Suit::JokerOnly)
    }
}

impl fmt::Display for CardFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rank == Rank::Joker {
            return f.write_str("★");
        }
        write!(f, "{}{}", self.rank.token(), self.suit.symbol())
    }
}

impl Serialize for CardFace {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A physical card on the table.
///
/// `deck_index` distinguishes two copies of the same face when more than one
/// deck is in play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Card {
    face: Option<CardFace>,
    face_up: bool,
    deck_index: u32,
}

impl Card {
    /// A face-up card with a known identity.
    #[must_use]
    pub const fn face_up(face: CardFace, deck_index: u32) -> Self {
        Self {
            face: Some(face),
            face_up: true,
            deck_index,
        }
    }

    /// A face-down card. The face, if the authority sent one, is retained but
    /// not exposed through [`identity`](Self::identity).
    #[must_use]
    pub const fn face_down(face: Option<CardFace>, deck_index: u32) -> Self {
        Self {
            face,
            face_up: false,
            deck_index,
        }
    }

    /// Whether the card shows its face.
    #[inline]
    #[must_use]
    pub const fn is_face_up(&self) -> bool {
        self.face_up
    }

    #[inline]
    #[must_use]
    pub const fn deck_index(&self) -> u32 {
        self.deck_index
    }

    /// Identity, only while face-up.
    #[inline]
    #[must_use]
    pub const fn identity(&self) -> Option<CardFace> {
        if self.face_up { self.face } else { None }
    }

    /// The same card turned face-up, if its face is known.
    #[must_use]
    pub fn revealed(&self) -> Option<Card> {
        self.face.map(|face| Card::face_up(face, self.deck_index))
    }

    /// Whether two cards are visibly the same: same side showing and, when
    /// face-up, the same identity.
    #[must_use]
    pub fn looks_like(&self, other: &Card) -> bool {
        self.face_up == other.face_up && self.identity() == other.identity()
    }

    /// Whether two cards are the same physical card, as far as the client
    /// can tell.
    #[must_use]
    pub fn same_card(&self, other: &Card) -> bool {
        self.deck_index == other.deck_index && self.looks_like(other)
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.identity() {
            Some(face) => face.fmt(f),
            None => f.write_str("▒▒"),
        }
    }
}
