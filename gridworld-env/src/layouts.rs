//! Preset layouts and an ASCII layout parser

use std::collections::BTreeSet;

use gridworld_core::{GridConfig, GridError, Position, Result, RewardConfig};

use crate::MutationScheduleConfig;

/// Global step at which the classic layout swaps its walls
pub const CLASSIC_SWAP_STEP: usize = 3000;

/// The 10x10 benchmark layout and its wall mutation.
///
/// Start (0,0), goal (5,5). Row 2 is walled off except for column 9; the
/// replacement moves the gap to column 0.
#[must_use]
pub fn classic() -> (GridConfig, MutationScheduleConfig) {
    let config = GridConfig {
        height: 10,
        width: 10,
        walls: row_segment(2, 0..=8),
        start: Position::new(0, 0),
        goal: Position::new(5, 5),
        rewards: RewardConfig::default(),
    };
    let schedule = MutationScheduleConfig::new(row_segment(2, 1..=9), CLASSIC_SWAP_STEP);
    (config, schedule)
}

/// 3x3 layout with column 1 walled in rows 0 and 1
#[must_use]
pub fn notched_3x3() -> GridConfig {
    GridConfig {
        height: 3,
        width: 3,
        walls: [Position::new(0, 1), Position::new(1, 1)].into_iter().collect(),
        start: Position::new(0, 0),
        goal: Position::new(2, 2),
        rewards: RewardConfig::default(),
    }
}

fn row_segment(row: usize, cols: std::ops::RangeInclusive<usize>) -> BTreeSet<Position> {
    cols.map(|col| Position::new(row, col)).collect()
}

/// Parse a layout drawn with `#` (wall), `S` (start), `G` (goal) and `.`
/// (empty). Blank lines and surrounding whitespace are ignored.
///
/// # Errors
///
/// Returns a configuration error if:
/// - rows have different lengths or there are none
/// - a character is not one of `# S G .`
/// - start or goal is missing or repeated
pub fn parse(ascii: &str, rewards: RewardConfig) -> Result<GridConfig> {
    let rows: Vec<&str> = ascii
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let width = rows.first().map_or(0, |r| r.chars().count());
    if width == 0 {
        return Err(GridError::config("layout is empty"));
    }

    let mut walls = BTreeSet::new();
    let mut start = None;
    let mut goal = None;
    for (row, line) in rows.iter().enumerate() {
        if line.chars().count() != width {
            return Err(GridError::config(format!(
                "layout row {row} has {} cells, expected {width}",
                line.chars().count()
            )));
        }
        for (col, cell) in line.chars().enumerate() {
            let p = Position::new(row, col);
            match cell {
                '.' => {}
                '#' => {
                    walls.insert(p);
                }
                'S' => place(&mut start, p, "start")?,
                'G' => place(&mut goal, p, "goal")?,
                other => {
                    return Err(GridError::config(format!(
                        "unexpected layout character {other:?} at {p}"
                    )))
                }
            }
        }
    }

    let config = GridConfig {
        height: rows.len(),
        width,
        walls,
        start: start.ok_or_else(|| GridError::config("layout has no start cell"))?,
        goal: goal.ok_or_else(|| GridError::config("layout has no goal cell"))?,
        rewards,
    };
    config.validate()?;
    Ok(config)
}

fn place(slot: &mut Option<Position>, p: Position, name: &str) -> Result<()> {
    if let Some(existing) = slot {
        return Err(GridError::config(format!("{name} given twice: {existing} and {p}")));
    }
    *slot = Some(p);
    Ok(())
}
