//! Lanes: what a timeline row shows and who owns its intervals.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::group::QueryGroup;
use super::interval::Interval;
use super::query::{self, HandType};
use super::step::Step;

/// Timeline row category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LaneKind {
    LeftHand,
    RightHand,
    BothHands,
    /// Hand `None`, step markers and malformed queries.
    Unspecified,
    Steps,
}

impl LaneKind {
    /// Action lanes in display order.
    pub const ACTION_LANES: [LaneKind; 4] = [
        LaneKind::LeftHand,
        LaneKind::RightHand,
        LaneKind::BothHands,
        LaneKind::Unspecified,
    ];

    pub fn from_hand(hand: HandType) -> Self {
        match hand {
            HandType::LeftHand => LaneKind::LeftHand,
            HandType::RightHand => LaneKind::RightHand,
            HandType::BothHands => LaneKind::BothHands,
            HandType::Unspecified => LaneKind::Unspecified,
        }
    }

    /// Lane an action query lands in. Unparseable text goes to `Unspecified`.
    pub fn for_query(text: &str) -> Self {
        match query::parse_query(text) {
            Ok(parsed) => Self::from_hand(parsed.hand),
            Err(_) => LaneKind::Unspecified,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LaneKind::LeftHand => "LeftHand",
            LaneKind::RightHand => "RightHand",
            LaneKind::BothHands => "BothHands",
            LaneKind::Unspecified => "None",
            LaneKind::Steps => "Steps",
        }
    }

    pub fn is_steps(&self) -> bool {
        matches!(self, LaneKind::Steps)
    }
}

impl fmt::Display for LaneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything that can back a timeline lane.
pub trait LaneSource {
    fn label(&self) -> String;
    fn owned_intervals(&self) -> Vec<Interval>;
}

impl LaneSource for QueryGroup {
    fn label(&self) -> String {
        self.query_text.clone()
    }

    fn owned_intervals(&self) -> Vec<Interval> {
        self.relevant_windows.clone()
    }
}

impl LaneSource for Step {
    fn label(&self) -> String {
        format!("{} {}", query::STEP_PREFIX, self.text)
    }

    fn owned_intervals(&self) -> Vec<Interval> {
        vec![self.to_interval()]
    }
}

/// Resolved owner of an interval.
#[derive(Debug, Clone, Copy)]
pub enum Lane<'a> {
    Action(&'a QueryGroup),
    Step(&'a Step),
}

impl LaneSource for Lane<'_> {
    fn label(&self) -> String {
        match self {
            Lane::Action(group) => group.label(),
            Lane::Step(step) => step.label(),
        }
    }

    fn owned_intervals(&self) -> Vec<Interval> {
        match self {
            Lane::Action(group) => group.owned_intervals(),
            Lane::Step(step) => step.owned_intervals(),
        }
    }
}

impl Lane<'_> {
    pub fn kind(&self) -> LaneKind {
        match self {
            Lane::Action(group) => LaneKind::for_query(&group.query_text),
            Lane::Step(_) => LaneKind::Steps,
        }
    }
}

/// Results-list filter. Unlike lanes, step markers and malformed queries
/// are kept apart from hand `None` in their own `Other` bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandFilter {
    #[default]
    All,
    Hand(HandType),
    Other,
}

impl HandFilter {
    pub fn matches(&self, query_text: &str) -> bool {
        match self {
            HandFilter::All => true,
            HandFilter::Hand(hand) => match query::parse_query(query_text) {
                Ok(parsed) => parsed.hand == *hand,
                Err(_) => false,
            },
            HandFilter::Other => query::is_step_marker(query_text) || query::parse_query(query_text).is_err(),
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "All" => Some(HandFilter::All),
            "Other" => Some(HandFilter::Other),
            other => HandType::from_field(other).map(HandFilter::Hand),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lane_for_query() {
        assert_eq!(LaneKind::for_query("LeftHand_grasp_cup_None_None"), LaneKind::LeftHand);
        assert_eq!(LaneKind::for_query("BothHands_lift_box_None_None"), LaneKind::BothHands);
        assert_eq!(LaneKind::for_query("None_cut_bread_None_knife"), LaneKind::Unspecified);
        assert_eq!(LaneKind::for_query("Step: wash"), LaneKind::Unspecified);
        assert_eq!(LaneKind::for_query("pick up the cup"), LaneKind::Unspecified);
    }

    #[test]
    fn test_lane_source_dispatch() {
        let group = QueryGroup::new("RightHand_pour_water_cup_None", "v")
            .with_intervals([Interval::new(0.0, 1.0, 0.9), Interval::new(2.0, 3.0, 0.4)]);
        let step = Step::new("boil", 5.0, 8.0, 30.0);

        let lanes = [Lane::Action(&group), Lane::Step(&step)];
        assert_eq!(lanes[0].owned_intervals().len(), 2);
        assert_eq!(lanes[0].kind(), LaneKind::RightHand);
        assert_eq!(lanes[1].label(), "Step: boil");
        assert_eq!(lanes[1].owned_intervals()[0].id, step.id);
        assert_eq!(lanes[1].kind(), LaneKind::Steps);
    }

    #[test]
    fn test_hand_filter_buckets() {
        let none_hand = "None_cut_bread_None_knife";
        let marker = "Step: wash";
        let bad = "grasp cup";
        assert!(HandFilter::Hand(HandType::Unspecified).matches(none_hand));
        assert!(!HandFilter::Hand(HandType::Unspecified).matches(marker));
        assert!(HandFilter::Other.matches(marker));
        assert!(HandFilter::Other.matches(bad));
        assert!(!HandFilter::Other.matches(none_hand));
        assert!(HandFilter::All.matches(bad));
        assert_eq!(HandFilter::parse("LeftHand"), Some(HandFilter::Hand(HandType::LeftHand)));
        assert_eq!(HandFilter::parse("Foot"), None);
    }
}
