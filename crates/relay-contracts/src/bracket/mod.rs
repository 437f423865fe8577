use std::fmt;

use indexmap::IndexMap;
use thiserror::Error;

mod routing;

pub use routing::{route, ElbowPath, Segment};

pub const DEFAULT_SPACING_GROWTH: f64 = 8.0;

pub const MAX_PARTICIPANTS: i64 = 256;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BracketError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeId {
    Player { index: usize },
    Match { round: u32, slot: usize },
}

impl NodeId {
    pub fn round(&self) -> u32 {
        match self {
            NodeId::Player { .. } => 0,
            NodeId::Match { round, .. } => *round,
        }
    }

    pub fn is_player(&self) -> bool {
        matches!(self, NodeId::Player { .. })
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Player { index } => write!(f, "Player {index}"),
            NodeId::Match { round, slot } => write!(f, "R{round}M{slot}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByePolicy {
    /// Only powers of two are accepted.
    #[default]
    Strict,
    /// The unpaired node advances to the next round without a match.
    Advance,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutOptions {
    pub vertical_spacing: f64,
    pub spacing_growth: f64,
    pub bye_policy: ByePolicy,
}

impl LayoutOptions {
    pub fn new(vertical_spacing: f64) -> Self {
        Self {
            vertical_spacing,
            spacing_growth: DEFAULT_SPACING_GROWTH,
            bye_policy: ByePolicy::Strict,
        }
    }

    pub fn with_byes(mut self) -> Self {
        self.bye_policy = ByePolicy::Advance;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoundInfo {
    pub round: u32,
    pub spacing_factor: f64,
    pub matches: usize,
    pub byes: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bracket {
    participants: usize,
    vertical_spacing: f64,
    edges: Vec<(NodeId, NodeId)>,
    positions: IndexMap<NodeId, Point>,
    rounds: Vec<RoundInfo>,
}

impl Bracket {
    pub fn participants(&self) -> usize {
        self.participants
    }

    pub fn vertical_spacing(&self) -> f64 {
        self.vertical_spacing
    }

    pub fn node_count(&self) -> usize {
        self.positions.len()
    }

    /// Leaves first, then matches ordered by round and slot.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.positions.keys().copied()
    }

    pub fn edges(&self) -> &[(NodeId, NodeId)] {
        &self.edges
    }

    pub fn positions(&self) -> &IndexMap<NodeId, Point> {
        &self.positions
    }

    pub fn position(&self, node: NodeId) -> Option<Point> {
        self.positions.get(&node).copied()
    }

    pub fn rounds(&self) -> &[RoundInfo] {
        &self.rounds
    }

    pub fn round_count(&self) -> u32 {
        self.rounds.len() as u32
    }

    pub fn feeders(&self, node: NodeId) -> Vec<NodeId> {
        self.edges
            .iter()
            .filter(|(_, to)| *to == node)
            .map(|(from, _)| *from)
            .collect()
    }

    pub fn champion(&self) -> Option<NodeId> {
        self.nodes()
            .find(|node| !self.edges.iter().any(|(from, _)| from == node))
    }

    pub fn routes(&self) -> Vec<(NodeId, NodeId, ElbowPath)> {
        self.edges
            .iter()
            .filter_map(|(from, to)| {
                let a = self.position(*from)?;
                let b = self.position(*to)?;
                Some((*from, *to, route(a, b)))
            })
            .collect()
    }
}

/// Number of elimination rounds needed for `participants`, i.e. `ceil(log2 n)`.
pub fn rounds_for(participants: usize) -> u32 {
    bit_length(participants.saturating_sub(1))
}

fn bit_length(value: usize) -> u32 {
    usize::BITS - value.leading_zeros()
}

pub fn build(participant_count: i64, vertical_spacing: f64) -> Result<Bracket, BracketError> {
    build_with(participant_count, LayoutOptions::new(vertical_spacing))
}

pub fn build_with(participant_count: i64, options: LayoutOptions) -> Result<Bracket, BracketError> {
    let participants = validate(participant_count, &options)?;
    let spacing = options.vertical_spacing;

    let mut positions = IndexMap::with_capacity(participants * 2 - 1);
    let mut edges = Vec::with_capacity((participants - 1) * 2);
    let mut rounds = Vec::new();

    let mut current: Vec<(NodeId, f64)> = (0..participants)
        .map(|index| (NodeId::Player { index }, index as f64 * spacing))
        .collect();
    for (node, y) in &current {
        positions.insert(*node, Point::new(0.0, *y));
    }

    let mut spacing_factor = spacing;
    let mut round = 0u32;
    while current.len() > 1 {
        round += 1;
        spacing_factor *= options.spacing_growth;

        let mut next = Vec::with_capacity(current.len().div_ceil(2));
        let mut pairs = current.chunks_exact(2);
        for (slot, pair) in pairs.by_ref().enumerate() {
            let (left, left_y) = pair[0];
            let (right, right_y) = pair[1];
            let winner = NodeId::Match { round, slot };
            let y = (left_y + right_y) / 2.0;
            edges.push((left, winner));
            edges.push((right, winner));
            positions.insert(winner, Point::new(f64::from(round), y));
            next.push((winner, y));
        }
        let matches = next.len();
        let byes = pairs.remainder().to_vec();
        next.extend_from_slice(&byes);

        rounds.push(RoundInfo {
            round,
            spacing_factor,
            matches,
            byes: byes.len(),
        });
        current = next;
    }

    for point in positions.values_mut() {
        point.y = -point.y;
    }

    Ok(Bracket {
        participants,
        vertical_spacing: spacing,
        edges,
        positions,
        rounds,
    })
}

fn validate(participant_count: i64, options: &LayoutOptions) -> Result<usize, BracketError> {
    if participant_count < 1 {
        return Err(BracketError::InvalidInput(format!(
            "participant count must be at least 1, got {participant_count}"
        )));
    }
    if participant_count > MAX_PARTICIPANTS {
        return Err(BracketError::InvalidInput(format!(
            "participant count must be at most {MAX_PARTICIPANTS}, got {participant_count}"
        )));
    }
    if !options.vertical_spacing.is_finite() || options.vertical_spacing <= 0.0 {
        return Err(BracketError::InvalidInput(format!(
            "vertical spacing must be a positive number, got {}",
            options.vertical_spacing
        )));
    }
    if !options.spacing_growth.is_finite() || options.spacing_growth < 1.0 {
        return Err(BracketError::InvalidInput(format!(
            "spacing growth must be at least 1, got {}",
            options.spacing_growth
        )));
    }
    let participants = participant_count as usize;
    let extent = (participants - 1) as f64 * options.vertical_spacing;
    let widest = options.vertical_spacing
        * options
            .spacing_growth
            .powi(rounds_for(participants) as i32);
    if !extent.is_finite() || !widest.is_finite() {
        return Err(BracketError::InvalidInput(format!(
            "vertical spacing {} is too large for {participants} participants",
            options.vertical_spacing
        )));
    }
    if options.bye_policy == ByePolicy::Strict && !participants.is_power_of_two() {
        return Err(BracketError::InvalidInput(format!(
            "participant count must be a power of two, got {participants}"
        )));
    }
    Ok(participants)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{
        build, build_with, rounds_for, BracketError, ByePolicy, LayoutOptions, NodeId, Point,
        MAX_PARTICIPANTS,
    };

    fn raw_y(point: Point) -> f64 {
        -point.y
    }

    #[test]
    fn powers_of_two_produce_full_binary_tree() -> anyhow::Result<()> {
        for k in 1..=6u32 {
            let n = 1usize << k;
            let bracket = build(n as i64, 40.0)?;
            assert_eq!(bracket.node_count(), 2 * n - 1);
            assert_eq!(bracket.edges().len(), 2 * n - 2);
            assert_eq!(bracket.round_count(), k);
            assert_eq!(bracket.positions().len(), bracket.node_count());
        }
        Ok(())
    }

    #[test]
    fn horizontal_coordinate_is_round_number() -> anyhow::Result<()> {
        let bracket = build(16, 10.0)?;
        for (node, point) in bracket.positions() {
            assert_eq!(point.x, f64::from(node.round()));
            if node.is_player() {
                assert_eq!(point.x, 0.0);
            }
        }
        for (from, to) in bracket.edges() {
            let a = bracket.position(*from).unwrap();
            let b = bracket.position(*to).unwrap();
            assert!(b.x > a.x, "{from} -> {to} does not move right");
        }
        Ok(())
    }

    #[test]
    fn two_players_meet_in_single_match() -> anyhow::Result<()> {
        let bracket = build(2, 30.0)?;
        let winner = NodeId::Match { round: 1, slot: 0 };
        assert_eq!(bracket.node_count(), 3);
        assert_eq!(
            bracket.feeders(winner),
            vec![NodeId::Player { index: 0 }, NodeId::Player { index: 1 }]
        );
        let a = bracket.position(NodeId::Player { index: 0 }).unwrap();
        let b = bracket.position(NodeId::Player { index: 1 }).unwrap();
        let w = bracket.position(winner).unwrap();
        assert_eq!(w.y, (a.y + b.y) / 2.0);
        assert_eq!(bracket.champion(), Some(winner));
        Ok(())
    }

    #[test]
    fn four_players_match_reference_layout() -> anyhow::Result<()> {
        let bracket = build(4, 100.0)?;
        let leaves: Vec<f64> = (0..4)
            .map(|index| raw_y(bracket.position(NodeId::Player { index }).unwrap()))
            .collect();
        assert_eq!(leaves, vec![0.0, 100.0, 200.0, 300.0]);

        let semis: Vec<f64> = (0..2)
            .map(|slot| raw_y(bracket.position(NodeId::Match { round: 1, slot }).unwrap()))
            .collect();
        assert_eq!(semis, vec![50.0, 250.0]);

        let final_match = bracket.position(NodeId::Match { round: 2, slot: 0 }).unwrap();
        assert_eq!(raw_y(final_match), 150.0);
        assert_eq!(final_match.y, -150.0);
        Ok(())
    }

    #[test]
    fn spacing_factor_grows_by_constant_each_round() -> anyhow::Result<()> {
        let bracket = build(8, 5.0)?;
        let factors: Vec<f64> = bracket.rounds().iter().map(|r| r.spacing_factor).collect();
        assert_eq!(factors, vec![40.0, 320.0, 2560.0]);
        let matches: Vec<usize> = bracket.rounds().iter().map(|r| r.matches).collect();
        assert_eq!(matches, vec![4, 2, 1]);
        Ok(())
    }

    #[test]
    fn build_is_pure() -> anyhow::Result<()> {
        assert_eq!(build(32, 12.5)?, build(32, 12.5)?);
        Ok(())
    }

    #[test]
    fn non_positive_counts_are_invalid_input() {
        for count in [0, -1, -64] {
            assert!(matches!(
                build(count, 100.0),
                Err(BracketError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn bad_spacing_is_invalid_input() {
        for spacing in [0.0, -3.0, f64::NAN, f64::INFINITY] {
            assert!(build(4, spacing).is_err());
        }
        let mut options = LayoutOptions::new(10.0);
        options.spacing_growth = 0.5;
        assert!(build_with(4, options).is_err());
    }

    #[test]
    fn strict_policy_rejects_non_power_of_two() {
        let err = build(6, 100.0).unwrap_err();
        assert_eq!(
            err,
            BracketError::InvalidInput("participant count must be a power of two, got 6".into())
        );
    }

    #[test]
    fn participant_limit_applies_with_byes() -> anyhow::Result<()> {
        let options = LayoutOptions::new(10.0).with_byes();
        assert!(matches!(
            build_with(MAX_PARTICIPANTS + 1, options),
            Err(BracketError::InvalidInput(_))
        ));
        let bracket = build_with(MAX_PARTICIPANTS, options)?;
        assert_eq!(bracket.participants(), 256);
        Ok(())
    }

    #[test]
    fn overflowing_coordinates_are_invalid_input() -> anyhow::Result<()> {
        for (count, spacing) in [(4, 1e308), (256, 1e306)] {
            assert!(matches!(
                build(count, spacing),
                Err(BracketError::InvalidInput(_))
            ));
        }
        let mut options = LayoutOptions::new(10.0);
        options.spacing_growth = 1e200;
        assert!(build_with(8, options).is_err());

        let bracket = build(4, 1e300)?;
        let ys: HashSet<u64> = bracket
            .positions()
            .values()
            .map(|point| point.y.to_bits())
            .collect();
        assert_eq!(ys.len(), bracket.node_count());
        assert!(bracket.positions().values().all(|point| point.y.is_finite()));
        Ok(())
    }

    #[test]
    fn single_participant_is_its_own_champion() -> anyhow::Result<()> {
        let bracket = build(1, 100.0)?;
        assert_eq!(bracket.node_count(), 1);
        assert!(bracket.edges().is_empty());
        assert_eq!(bracket.round_count(), 0);
        assert_eq!(bracket.champion(), Some(NodeId::Player { index: 0 }));
        Ok(())
    }

    #[test]
    fn byes_carry_unpaired_node_forward() -> anyhow::Result<()> {
        let bracket = build_with(3, LayoutOptions::new(100.0).with_byes())?;
        assert_eq!(bracket.node_count(), 5);
        assert_eq!(bracket.edges().len(), 4);
        assert_eq!(bracket.round_count(), 2);
        assert_eq!(bracket.rounds()[0].byes, 1);

        let final_match = NodeId::Match { round: 2, slot: 0 };
        assert_eq!(
            bracket.feeders(final_match),
            vec![
                NodeId::Match { round: 1, slot: 0 },
                NodeId::Player { index: 2 }
            ]
        );
        assert_eq!(raw_y(bracket.position(final_match).unwrap()), 125.0);
        assert_eq!(bracket.champion(), Some(final_match));
        Ok(())
    }

    #[test]
    fn byes_keep_match_count_at_n_minus_one() -> anyhow::Result<()> {
        for n in 1..=40usize {
            let bracket = build_with(n as i64, LayoutOptions::new(10.0).with_byes())?;
            assert_eq!(bracket.node_count(), 2 * n - 1, "n = {n}");
            assert_eq!(bracket.round_count(), rounds_for(n), "n = {n}");
            let matches = bracket.nodes().filter(|node| !node.is_player()).count();
            assert_eq!(matches, n - 1);
            for node in bracket.nodes().filter(|node| !node.is_player()) {
                assert_eq!(bracket.feeders(node).len(), 2);
            }
        }
        Ok(())
    }

    #[test]
    fn positions_do_not_collide_within_a_round() -> anyhow::Result<()> {
        let bracket = build_with(23, LayoutOptions::new(7.0).with_byes())?;
        let mut seen = HashSet::new();
        for point in bracket.positions().values() {
            assert!(seen.insert((point.x.to_bits(), point.y.to_bits())));
        }
        Ok(())
    }

    #[test]
    fn default_policy_is_strict() {
        assert_eq!(LayoutOptions::new(1.0).bye_policy, ByePolicy::Strict);
        assert_eq!(rounds_for(1), 0);
        assert_eq!(rounds_for(8), 3);
        assert_eq!(rounds_for(9), 4);
    }
}
