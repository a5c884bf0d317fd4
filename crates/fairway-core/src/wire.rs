#![forbid(unsafe_code)]

//! Wire boundary: JSON frames to and from the authority.
//!
//! Inbound frames are decoded in two steps. The frame is parsed into a
//! [`serde_json::Value`] and dispatched on its `type` tag; snapshot payloads
//! are then coerced field by field into the strict model of
//! [`crate::snapshot`]. The authority is versioned independently of this
//! client, so coercion never fails on a missing or ill-typed field. It
//! records the field in [`Integrity::Partial`] instead, and the differ treats
//! such snapshots as "no change inferred".
//!
//! Outbound actions are a serde-tagged enum, [`ActionMessage`].
//!
//! # Frame shapes
//!
//! ```text
//! {"type":"snapshot","state":{...}}
//! {"type":"action-confirmed","card":{...}}     card optional
//! {"type":"error","message":"not your turn"}
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::card::{Card, CardFace, Rank, Suit};
use crate::movement::DrawSource;
use crate::snapshot::{
    ActiveRules, HAND_SIZE, Hand, HandPosition, Integrity, Phase, PlayerId, PlayerView, RuleFlags,
    Snapshot,
};

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Full authoritative state.
    Snapshot(Snapshot),
    /// The result of the local player's action, ahead of the next snapshot.
    ActionConfirmed { card: Option<Card> },
    /// The authority refused the local player's last action.
    Error { message: String },
    /// A frame type this client does not handle.
    Unknown { kind: String },
}

/// Errors that prevent a frame from being routed at all.
#[derive(Debug)]
pub enum DecodeError {
    /// The frame is not valid JSON.
    Json(serde_json::Error),
    /// The frame is JSON but not an object.
    NotAnObject,
    /// The frame has no string `type` tag.
    MissingType,
    /// A snapshot frame without a `state` object.
    MissingState,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::NotAnObject => f.write_str("frame is not a JSON object"),
            Self::MissingType => f.write_str("frame has no type tag"),
            Self::MissingState => f.write_str("snapshot frame has no state object"),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

/// Decode one inbound text frame.
pub fn decode_inbound(text: &str) -> Result<Inbound, DecodeError> {
    let value: Value = serde_json::from_str(text).map_err(DecodeError::Json)?;
    inbound_from_value(&value)
}

/// Route an already-parsed frame.
pub fn inbound_from_value(value: &Value) -> Result<Inbound, DecodeError> {
    let obj = value.as_object().ok_or(DecodeError::NotAnObject)?;
    let kind = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingType)?;
    match kind {
        "snapshot" => {
            let state = obj
                .get("state")
                .and_then(Value::as_object)
                .ok_or(DecodeError::MissingState)?;
            Ok(Inbound::Snapshot(coerce_snapshot(state)))
        }
        "action-confirmed" => {
            let mut issues = Vec::new();
            let card = match obj.get("card") {
                None | Some(Value::Null) => None,
                Some(v) => coerce_card(v, "card", &mut issues),
            };
            Ok(Inbound::ActionConfirmed { card })
        }
        "error" => {
            let message = obj
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("action refused")
                .to_string();
            Ok(Inbound::Error { message })
        }
        other => Ok(Inbound::Unknown {
            kind: other.to_string(),
        }),
    }
}

/// Coerce a snapshot `state` object into the strict model.
///
/// Nullable fields distinguish "absent" (partial) from `null` (explicitly
/// none). Fields the differ does not depend on (names, scores, rule list,
/// dealer, finisher) default silently.
#[must_use]
pub fn coerce_snapshot(state: &Map<String, Value>) -> Snapshot {
    let mut issues = Vec::new();

    let phase = match state.get("phase").and_then(Value::as_str) {
        Some(token) => Phase::parse(token),
        None => {
            issues.push("phase".to_string());
            Phase::Unknown(String::new())
        }
    };

    let players = match state.get("players").and_then(Value::as_array) {
        Some(list) => list
            .iter()
            .enumerate()
            .filter_map(|(i, v)| coerce_player(v, i, &mut issues))
            .collect(),
        None => {
            issues.push("players".to_string());
            Vec::new()
        }
    };

    let current_player_id = nullable_id(state, "currentPlayerId", &mut issues);
    let discard_top = nullable_card(state, "discardTop", &mut issues);
    let held_card = nullable_card(state, "heldCard", &mut issues);
    let held_by_player_id = nullable_id(state, "heldByPlayerId", &mut issues);

    let deck_remaining = match state.get("deckRemaining").and_then(Value::as_u64) {
        Some(n) => u32::try_from(n).unwrap_or(u32::MAX),
        None => {
            issues.push("deckRemaining".to_string());
            0
        }
    };

    let active_rules = state
        .get("activeRuleFlags")
        .and_then(Value::as_array)
        .map(|names| ActiveRules::from_names(names.iter().filter_map(Value::as_str)))
        .unwrap_or_default();

    let dealer_id = optional_id(state, "dealerId");
    let finisher_id = optional_id(state, "finisherId");

    let integrity = if issues.is_empty() {
        Integrity::Complete
    } else {
        Integrity::Partial(issues)
    };

    Snapshot {
        phase,
        players,
        current_player_id,
        discard_top,
        deck_remaining,
        held_card,
        held_by_player_id,
        active_rules,
        dealer_id,
        finisher_id,
        integrity,
    }
}

fn coerce_player(value: &Value, index: usize, issues: &mut Vec<String>) -> Option<PlayerView> {
    let Some(obj) = value.as_object() else {
        issues.push(format!("players[{index}]"));
        return None;
    };
    let Some(id) = obj.get("id").and_then(Value::as_str) else {
        issues.push(format!("players[{index}].id"));
        return None;
    };

    let mut slots = [None; HAND_SIZE];
    match obj.get("hand").and_then(Value::as_array) {
        Some(cards) => {
            if cards.len() != HAND_SIZE {
                issues.push(format!("players[{index}].hand"));
            }
            for (slot, card) in slots.iter_mut().zip(cards) {
                let field = format!("players[{index}].hand");
                *slot = coerce_card(card, &field, issues);
            }
        }
        None => issues.push(format!("players[{index}].hand")),
    }

    Some(PlayerView {
        id: PlayerId::new(id),
        name: obj
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(id)
            .to_string(),
        is_host: obj.get("isHost").and_then(Value::as_bool).unwrap_or(false),
        is_computer_controlled: obj
            .get("isComputerControlled")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        hand: Hand::new(slots),
        round_score: int_field(obj, "roundScore"),
        total_score: int_field(obj, "totalScore"),
        rounds_won: obj
            .get("roundsWon")
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0),
    })
}

/// Coerce a card object. A card without `faceUp`, or a face-up card whose
/// face does not parse, is unusable: it becomes `None` and is reported.
fn coerce_card(value: &Value, field: &str, issues: &mut Vec<String>) -> Option<Card> {
    let Some(obj) = value.as_object() else {
        issues.push(field.to_string());
        return None;
    };
    let Some(face_up) = obj.get("faceUp").and_then(Value::as_bool) else {
        issues.push(field.to_string());
        return None;
    };
    let deck_index = obj
        .get("deckIndex")
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0);
    let rank = obj.get("rank").and_then(Value::as_str).and_then(Rank::parse);
    let suit = obj.get("suit").and_then(Value::as_str).and_then(Suit::parse);
    let face = match (rank, suit) {
        (Some(Rank::Joker), _) => Some(CardFace::joker()),
        (Some(rank), Some(suit)) => Some(CardFace::new(rank, suit)),
        _ => None,
    };
    if face_up {
        match face {
            Some(face) => Some(Card::face_up(face, deck_index)),
            None => {
                issues.push(field.to_string());
                None
            }
        }
    } else {
        Some(Card::face_down(face, deck_index))
    }
}

fn nullable_card(state: &Map<String, Value>, key: &str, issues: &mut Vec<String>) -> Option<Card> {
    match state.get(key) {
        None => {
            issues.push(key.to_string());
            None
        }
        Some(Value::Null) => None,
        Some(v) => coerce_card(v, key, issues),
    }
}

fn nullable_id(state: &Map<String, Value>, key: &str, issues: &mut Vec<String>) -> Option<PlayerId> {
    match state.get(key) {
        None => {
            issues.push(key.to_string());
            None
        }
        Some(Value::Null) => None,
        Some(Value::String(s)) => Some(PlayerId::new(s.as_str())),
        Some(_) => {
            issues.push(key.to_string());
            None
        }
    }
}

fn optional_id(state: &Map<String, Value>, key: &str) -> Option<PlayerId> {
    state
        .get(key)
        .and_then(Value::as_str)
        .map(PlayerId::new)
}

fn int_field(obj: &Map<String, Value>, key: &str) -> i32 {
    obj.get(key)
        .and_then(Value::as_i64)
        .and_then(|n| i32::try_from(n).ok())
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Encoding (fixtures, replay files, fuzzing)
// ---------------------------------------------------------------------------

/// Encode a card in the authority's shape.
#[must_use]
pub fn card_to_value(card: &Card) -> Value {
    let mut obj = Map::new();
    obj.insert("faceUp".into(), Value::Bool(card.is_face_up()));
    obj.insert("deckIndex".into(), json!(card.deck_index()));
    if let Some(face) = card.identity() {
        obj.insert("rank".into(), json!(face.rank.token()));
        obj.insert("suit".into(), json!(face.suit.token()));
    }
    Value::Object(obj)
}

fn rule_names(rules: &ActiveRules) -> Vec<String> {
    let known = [
        (RuleFlags::FLIP_ON_DISCARD, "flip-on-discard"),
        (RuleFlags::FLIP_AS_ACTION, "flip-as-action"),
        (RuleFlags::KNOCK_EARLY, "knock-early"),
        (RuleFlags::JOKERS, "jokers"),
    ];
    known
        .into_iter()
        .filter(|(flag, _)| rules.contains(*flag))
        .map(|(_, name)| name.to_string())
        .chain(rules.unrecognised.iter().cloned())
        .collect()
}

/// Encode a snapshot in the authority's shape. Face-down faces are omitted,
/// as the authority omits them.
#[must_use]
pub fn snapshot_to_value(snapshot: &Snapshot) -> Value {
    let players: Vec<Value> = snapshot
        .players
        .iter()
        .map(|p| {
            let hand: Vec<Value> = p
                .hand
                .slots()
                .map(|(_, slot)| slot.map_or(Value::Null, card_to_value))
                .collect();
            json!({
                "id": p.id,
                "name": p.name,
                "isHost": p.is_host,
                "isComputerControlled": p.is_computer_controlled,
                "hand": hand,
                "roundScore": p.round_score,
                "totalScore": p.total_score,
                "roundsWon": p.rounds_won,
            })
        })
        .collect();
    json!({
        "phase": snapshot.phase.token(),
        "players": players,
        "currentPlayerId": snapshot.current_player_id,
        "discardTop": snapshot.discard_top.as_ref().map(card_to_value),
        "deckRemaining": snapshot.deck_remaining,
        "heldCard": snapshot.held_card.as_ref().map(card_to_value),
        "heldByPlayerId": snapshot.held_by_player_id,
        "activeRuleFlags": rule_names(&snapshot.active_rules),
        "dealerId": snapshot.dealer_id,
        "finisherId": snapshot.finisher_id,
    })
}

/// Wrap a snapshot in a `snapshot` frame.
#[must_use]
pub fn snapshot_frame(snapshot: &Snapshot) -> String {
    json!({ "type": "snapshot", "state": snapshot_to_value(snapshot) }).to_string()
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// An action message for the authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ActionMessage {
    Draw { source: DrawSource },
    Swap { position: HandPosition },
    Discard,
    FlipInitial { positions: Vec<HandPosition> },
    FlipAsAction { position: HandPosition },
    SkipFlip,
    KnockEarly,
    NextRound,
}

impl ActionMessage {
    /// Encode as a JSON text frame.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Short name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Draw { .. } => "draw",
            Self::Swap { .. } => "swap",
            Self::Discard => "discard",
            Self::FlipInitial { .. } => "flip-initial",
            Self::FlipAsAction { .. } => "flip-as-action",
            Self::SkipFlip => "skip-flip",
            Self::KnockEarly => "knock-early",
            Self::NextRound => "next-round",
        }
    }
}
