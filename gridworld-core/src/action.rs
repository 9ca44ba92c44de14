//! Grid actions, best-action sets and their arrow tags

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::GridError;

/// One of the four grid moves, in the fixed order Up, Down, Right, Left
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Row - 1
    Up = 0,
    /// Row + 1
    Down = 1,
    /// Column + 1
    Right = 2,
    /// Column - 1
    Left = 3,
}

impl Action {
    /// Number of actions
    pub const COUNT: usize = 4;

    /// All actions in their fixed total order
    pub const ALL: [Action; 4] = [Action::Up, Action::Down, Action::Right, Action::Left];

    /// Index of this action in `0..4`
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Unit vector as `(d_row, d_col)`
    #[must_use]
    pub fn delta(self) -> (isize, isize) {
        match self {
            Action::Up => (-1, 0),
            Action::Down => (1, 0),
            Action::Right => (0, 1),
            Action::Left => (0, -1),
        }
    }

    /// The action that undoes this one
    #[must_use]
    pub fn opposite(self) -> Action {
        match self {
            Action::Up => Action::Down,
            Action::Down => Action::Up,
            Action::Right => Action::Left,
            Action::Left => Action::Right,
        }
    }
}

impl TryFrom<usize> for Action {
    type Error = GridError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        Action::ALL
            .get(index)
            .copied()
            .ok_or(GridError::InvalidAction(index))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Up => "Up",
            Action::Down => "Down",
            Action::Right => "Right",
            Action::Left => "Left",
        };
        f.write_str(name)
    }
}

/// Set of actions stored as a 4-bit mask
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionSet(u8);

impl ActionSet {
    /// The empty set
    #[must_use]
    pub fn empty() -> Self {
        Self(0)
    }

    /// All four actions
    #[must_use]
    pub fn all() -> Self {
        Self(0b1111)
    }

    /// Add an action
    pub fn insert(&mut self, action: Action) {
        self.0 |= 1 << action.index();
    }

    /// Membership test
    #[must_use]
    pub fn contains(self, action: Action) -> bool {
        self.0 & (1 << action.index()) != 0
    }

    /// Number of members
    #[must_use]
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// True if no action is in the set
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Members in the fixed action order
    pub fn iter(self) -> impl Iterator<Item = Action> {
        Action::ALL.into_iter().filter(move |a| self.contains(*a))
    }

    /// Actions whose probability equals the row maximum.
    ///
    /// Zero rows (walls, the goal) give the empty set.
    #[must_use]
    pub fn from_probabilities(probs: &[f64]) -> Self {
        let max = probs.iter().copied().fold(0.0_f64, f64::max);
        let mut set = Self::empty();
        if max <= 0.0 {
            return set;
        }
        for (action, &p) in Action::ALL.iter().zip(probs) {
            if p == max {
                set.insert(*action);
            }
        }
        set
    }

    /// Actions whose value equals the maximum exactly; all four if every
    /// value is NaN
    #[must_use]
    pub fn maximal(values: [f64; 4]) -> Self {
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let set: Self = Action::ALL
            .into_iter()
            .filter(|a| values[a.index()] == max)
            .collect();
        if set.is_empty() {
            Self::all()
        } else {
            set
        }
    }

    /// Uniform distribution over the members, zero elsewhere
    #[must_use]
    pub fn uniform_distribution(self) -> [f64; 4] {
        let mut dist = [0.0; 4];
        let n = self.len();
        if n == 0 {
            return dist;
        }
        let p = 1.0 / n as f64;
        for action in self.iter() {
            dist[action.index()] = p;
        }
        dist
    }
}

impl FromIterator<Action> for ActionSet {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        let mut set = Self::empty();
        for action in iter {
            set.insert(action);
        }
        set
    }
}

/// Closed classification of a best-action set, for renderers to map to art
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArrowTag {
    /// No best action (wall or terminal cell)
    None,
    /// A single best action
    One(Action),
    /// Two best actions, in the fixed action order
    Two(Action, Action),
    /// Three best actions, identified by the one left out
    Three {
        /// The action not in the set
        missing: Action,
    },
    /// All four actions tie
    All,
}

impl From<ActionSet> for ArrowTag {
    fn from(set: ActionSet) -> Self {
        let mut members = set.iter();
        match set.len() {
            0 => ArrowTag::None,
            1 => ArrowTag::One(members.next().unwrap_or(Action::Up)),
            2 => {
                let first = members.next().unwrap_or(Action::Up);
                let second = members.next().unwrap_or(Action::Down);
                ArrowTag::Two(first, second)
            }
            3 => {
                let missing = Action::ALL
                    .into_iter()
                    .find(|a| !set.contains(*a))
                    .unwrap_or(Action::Left);
                ArrowTag::Three { missing }
            }
            _ => ArrowTag::All,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_order_and_conversion() {
        for (i, action) in Action::ALL.iter().enumerate() {
            assert_eq!(action.index(), i);
            assert_eq!(Action::try_from(i).unwrap(), *action);
        }
        assert!(matches!(Action::try_from(4), Err(GridError::InvalidAction(4))));
    }

    #[test]
    fn test_opposite_cancels_delta() {
        for action in Action::ALL {
            let (dr, dc) = action.delta();
            let (or, oc) = action.opposite().delta();
            assert_eq!((dr + or, dc + oc), (0, 0));
        }
    }

    #[test]
    fn test_from_probabilities_keeps_ties() {
        let set = ActionSet::from_probabilities(&[0.5, 0.0, 0.5, 0.0]);
        assert_eq!(set.len(), 2);
        assert!(set.contains(Action::Up));
        assert!(set.contains(Action::Right));
        assert!(ActionSet::from_probabilities(&[0.0; 4]).is_empty());
    }

    #[test]
    fn test_maximal_handles_negatives_and_nan() {
        let set = ActionSet::maximal([-3.0, -1.0, -1.0, -2.0]);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Action::Down, Action::Right]);
        assert_eq!(ActionSet::maximal([f64::NAN; 4]), ActionSet::all());
    }

    #[test]
    fn test_arrow_tags() {
        assert_eq!(ArrowTag::from(ActionSet::empty()), ArrowTag::None);
        assert_eq!(ArrowTag::from(ActionSet::all()), ArrowTag::All);

        let one: ActionSet = [Action::Left].into_iter().collect();
        assert_eq!(ArrowTag::from(one), ArrowTag::One(Action::Left));

        let two: ActionSet = [Action::Left, Action::Down].into_iter().collect();
        assert_eq!(ArrowTag::from(two), ArrowTag::Two(Action::Down, Action::Left));

        let three: ActionSet = [Action::Up, Action::Down, Action::Left].into_iter().collect();
        assert_eq!(
            ArrowTag::from(three),
            ArrowTag::Three { missing: Action::Right }
        );
    }

    #[test]
    fn test_uniform_distribution() {
        let set: ActionSet = [Action::Up, Action::Down, Action::Right].into_iter().collect();
        let dist = set.uniform_distribution();
        assert_eq!(dist[3], 0.0);
        assert!((dist.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }
}
