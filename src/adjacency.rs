//! Geometry over a [`Snapshot`]: which display lies in a direction, and
//! which space is showing there.
//!
//! Adjacency is an exact edge test, not a nearest-neighbour search.  Two
//! displays are neighbours only when they touch along the requested axis
//! and share the same origin on the other one, so a staggered or
//! differently-sized monitor is reported as "not found".

use crate::command::Direction;
use crate::snapshot::{Display, Snapshot, Space};

/// Reasons the resolver could not produce a target.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("no display {direction} of current display")]
    NoAdjacentDisplay { direction: Direction },

    #[error("display {display_index} has no visible space")]
    NoVisibleSpace { display_index: u32 },

    /// The snapshot contradicts itself (no focused space, several focused
    /// spaces, or a focused space on a display that does not exist).
    #[error("inconsistent window manager state: {0}")]
    InconsistentSnapshot(String),
}

/// Find the display adjacent to `from_display_index` in `direction`.
///
/// The first match in enumeration order wins.
pub fn next_display(
    snapshot: &Snapshot,
    from_display_index: u32,
    direction: Direction,
) -> Result<&Display, ResolveError> {
    let not_found = ResolveError::NoAdjacentDisplay { direction };
    let current = snapshot.display(from_display_index).ok_or(not_found.clone())?;
    let cur = current.frame;

    snapshot
        .displays()
        .iter()
        .find(|d| {
            let f = d.frame;
            match direction {
                Direction::East => f.y == cur.y && f.x == cur.x + cur.width,
                Direction::West => f.y == cur.y && f.x == cur.x - cur.width,
                Direction::North => f.x == cur.x && f.y == cur.y + cur.height,
                Direction::South => f.x == cur.x && f.y == cur.y - cur.height,
            }
        })
        .ok_or(not_found)
}

/// First visible space on `display_index`.
pub fn next_visible_space(snapshot: &Snapshot, display_index: u32) -> Result<&Space, ResolveError> {
    snapshot
        .visible_spaces_on(display_index)
        .next()
        .ok_or(ResolveError::NoVisibleSpace { display_index })
}

/// The focused space and the display it lives on.
pub fn find_focused_space_and_display(
    snapshot: &Snapshot,
) -> Result<(&Space, &Display), ResolveError> {
    let mut focused = snapshot.spaces().iter().filter(|s| s.has_focus);
    let space = focused.next().ok_or_else(|| {
        ResolveError::InconsistentSnapshot("no focused space".to_string())
    })?;
    if let Some(other) = focused.next() {
        return Err(ResolveError::InconsistentSnapshot(format!(
            "spaces {} and {} both report focus",
            space.index, other.index
        )));
    }
    let display = snapshot.display(space.display_index).ok_or_else(|| {
        ResolveError::InconsistentSnapshot(format!(
            "focused space {} is on unknown display {}",
            space.index, space.display_index
        ))
    })?;
    Ok((space, display))
}

/// The visible space on the display next to the focused one.
pub fn space_in_direction(
    snapshot: &Snapshot,
    direction: Direction,
) -> Result<&Space, ResolveError> {
    let (_, display) = find_focused_space_and_display(snapshot)?;
    let next = next_display(snapshot, display.index, direction)?;
    next_visible_space(snapshot, next.index)
}
