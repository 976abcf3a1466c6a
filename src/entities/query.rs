//! Query text parsing.
//!
//! Action queries are `Hand_Verb_ManipulatedObject_TargetObject_Tool`, five
//! `_`-separated non-empty fields with `"None"` standing for an absent value.
//! Queries starting with `"Step:"` are step markers and are never parsed.
//!
//! Parsed fields are always re-derived from the text; nothing caches them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::QueryFormatError;

/// Prefix of step-marker queries (`"Step: wash hands"`).
pub const STEP_PREFIX: &str = "Step:";

/// Placeholder for an absent field.
pub const NONE_FIELD: &str = "None";

const FIELD_NAMES: [&str; 5] = ["hand_type", "action_verb", "manipulated_object", "target_object", "tool"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandType {
    LeftHand,
    RightHand,
    BothHands,
    /// Written as `"None"` in query text.
    Unspecified,
}

impl HandType {
    pub const ALL: [HandType; 4] = [
        HandType::LeftHand,
        HandType::RightHand,
        HandType::BothHands,
        HandType::Unspecified,
    ];

    /// Field text as it appears in a query.
    pub fn as_str(&self) -> &'static str {
        match self {
            HandType::LeftHand => "LeftHand",
            HandType::RightHand => "RightHand",
            HandType::BothHands => "BothHands",
            HandType::Unspecified => NONE_FIELD,
        }
    }

    pub fn from_field(field: &str) -> Option<Self> {
        match field {
            "LeftHand" => Some(HandType::LeftHand),
            "RightHand" => Some(HandType::RightHand),
            "BothHands" => Some(HandType::BothHands),
            NONE_FIELD => Some(HandType::Unspecified),
            _ => None,
        }
    }

    /// Key under `database.<video>.actions` in the exported dataset.
    pub fn dataset_key(&self) -> &'static str {
        match self {
            HandType::LeftHand => "left_hand",
            HandType::RightHand => "right_hand",
            HandType::BothHands => "both_hands",
            HandType::Unspecified => "unspecified",
        }
    }
}

impl fmt::Display for HandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured view of an action query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParsedAction {
    pub hand: HandType,
    pub verb: String,
    pub manipulated_object: Option<String>,
    pub target_object: Option<String>,
    pub tool: Option<String>,
}

impl ParsedAction {
    /// Build from raw form fields. Fields are trimmed; blank or `"None"` means absent.
    pub fn from_form(hand: HandType, verb: &str, manipulated: &str, target: &str, tool: &str) -> Self {
        Self {
            hand,
            verb: verb.trim().to_string(),
            manipulated_object: optional_field(manipulated),
            target_object: optional_field(target),
            tool: optional_field(tool),
        }
    }
}

impl fmt::Display for ParsedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}_{}_{}",
            self.hand,
            self.verb,
            self.manipulated_object.as_deref().unwrap_or(NONE_FIELD),
            self.target_object.as_deref().unwrap_or(NONE_FIELD),
            self.tool.as_deref().unwrap_or(NONE_FIELD),
        )
    }
}

fn optional_field(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == NONE_FIELD {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Validate and split an action query.
pub fn parse_query(query: &str) -> Result<ParsedAction, QueryFormatError> {
    let parts: Vec<&str> = query.split('_').collect();
    if parts.len() != FIELD_NAMES.len() {
        return Err(QueryFormatError::FieldCount {
            query: query.to_string(),
            found: parts.len(),
        });
    }

    let hand = HandType::from_field(parts[0]).ok_or_else(|| QueryFormatError::UnknownHandType {
        query: query.to_string(),
        hand: parts[0].to_string(),
    })?;

    for (position, part) in parts.iter().enumerate().skip(1) {
        if part.is_empty() {
            return Err(QueryFormatError::EmptyField {
                query: query.to_string(),
                position: position + 1,
                name: FIELD_NAMES[position],
            });
        }
    }

    let absent = |s: &str| (s != NONE_FIELD).then(|| s.to_string());
    Ok(ParsedAction {
        hand,
        verb: parts[1].to_string(),
        manipulated_object: absent(parts[2]),
        target_object: absent(parts[3]),
        tool: absent(parts[4]),
    })
}

/// Join raw form fields into query text. Blank fields become `"None"`.
pub fn build_query_text(hand: &str, verb: &str, manipulated: &str, target: &str, tool: &str) -> String {
    [hand, verb, manipulated, target, tool]
        .iter()
        .map(|f| {
            let t = f.trim();
            if t.is_empty() { NONE_FIELD } else { t }
        })
        .collect::<Vec<_>>()
        .join("_")
}

pub fn is_step_marker(query: &str) -> bool {
    query.starts_with(STEP_PREFIX)
}

/// Label of a step marker (`"Step: wash"` -> `"wash"`).
pub fn step_label(query: &str) -> Option<&str> {
    query.strip_prefix(STEP_PREFIX).map(str::trim)
}
