//! Directional focus movement over button selection coordinates.
//!
//! Coordinates are integer grid addresses with `y` growing downward.

use glam::IVec2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn offset(self) -> IVec2 {
        match self {
            Direction::Up => IVec2::new(0, -1),
            Direction::Down => IVec2::new(0, 1),
            Direction::Left => IVec2::new(-1, 0),
            Direction::Right => IVec2::new(1, 0),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "up" => Some(Direction::Up),
            "down" => Some(Direction::Down),
            "left" => Some(Direction::Left),
            "right" => Some(Direction::Right),
            _ => None,
        }
    }

    fn vertical(self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavOutcome {
    Moved { from: IVec2, to: IVec2 },
    Blocked { at: IVec2 },
    /// No menu is open or it is still generating.
    Inactive,
}

/// Where focus lands when moving one step from `from`.
///
/// The destination row (or column) must hold at least one button. The
/// cross-axis coordinate is clamped to the largest one present there; if
/// that address is a gap, the nearest lower coordinate wins, then the
/// smallest one. Returns `None` when the move is rejected.
pub fn step(buttons: &[IVec2], from: IVec2, direction: Direction) -> Option<IVec2> {
    let target = from + direction.offset();
    let (line, cross) = if direction.vertical() { (target.y, from.x) } else { (target.x, from.y) };
    let mut candidates: Vec<i32> = buttons
        .iter()
        .filter(|b| if direction.vertical() { b.y == line } else { b.x == line })
        .map(|b| if direction.vertical() { b.x } else { b.y })
        .collect();
    if candidates.is_empty() {
        return None;
    }
    candidates.sort_unstable();
    candidates.dedup();
    let max = *candidates.last()?;
    let clamped = cross.min(max);
    let chosen = candidates.iter().rev().find(|c| **c <= clamped).copied().unwrap_or(candidates[0]);
    let to = if direction.vertical() { IVec2::new(chosen, line) } else { IVec2::new(line, chosen) };
    (to != from).then_some(to)
}

/// Initial focus: `preferred` when a button sits there, otherwise the
/// top-most, left-most button.
pub fn initial_focus(buttons: &[IVec2], preferred: IVec2) -> Option<IVec2> {
    if buttons.contains(&preferred) {
        return Some(preferred);
    }
    buttons.iter().copied().min_by_key(|b| (b.y, b.x))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Vec<IVec2> {
        vec![IVec2::new(0, 0), IVec2::new(1, 0), IVec2::new(2, 0), IVec2::new(0, 1), IVec2::new(1, 1)]
    }

    #[test]
    fn moving_down_clamps_to_shorter_row() {
        assert_eq!(step(&grid(), IVec2::new(2, 0), Direction::Down), Some(IVec2::new(1, 1)));
    }

    #[test]
    fn empty_row_blocks_instead_of_clamping() {
        assert_eq!(step(&grid(), IVec2::new(0, 1), Direction::Down), None);
        assert_eq!(step(&grid(), IVec2::new(0, 0), Direction::Up), None);
        assert_eq!(step(&grid(), IVec2::new(0, 0), Direction::Left), None);
    }

    #[test]
    fn horizontal_moves_follow_columns() {
        assert_eq!(step(&grid(), IVec2::new(0, 1), Direction::Right), Some(IVec2::new(1, 1)));
        assert_eq!(step(&grid(), IVec2::new(1, 1), Direction::Right), Some(IVec2::new(2, 0)));
    }

    #[test]
    fn gaps_fall_back_to_lower_coordinate() {
        let buttons = vec![IVec2::new(0, 0), IVec2::new(3, 0), IVec2::new(0, 1), IVec2::new(2, 1), IVec2::new(5, 1)];
        assert_eq!(step(&buttons, IVec2::new(3, 0), Direction::Down), Some(IVec2::new(2, 1)));
        let sparse = vec![IVec2::new(4, 0), IVec2::new(6, 1)];
        assert_eq!(step(&sparse, IVec2::new(4, 0), Direction::Down), Some(IVec2::new(6, 1)));
    }

    #[test]
    fn initial_focus_prefers_default() {
        assert_eq!(initial_focus(&grid(), IVec2::new(1, 1)), Some(IVec2::new(1, 1)));
        assert_eq!(initial_focus(&grid(), IVec2::new(9, 9)), Some(IVec2::ZERO));
        assert_eq!(initial_focus(&[], IVec2::ZERO), None);
    }
}
