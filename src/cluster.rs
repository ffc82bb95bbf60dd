//! Grouping of hit pixels into blobs
//!
//! Two hit pixels belong to the same blob when they touch, diagonals
//! included (8-connectivity). Pixels with a zero count are not hits.

use crate::blob::Blob;
use crate::model::Frame;
use std::collections::{BTreeSet, VecDeque};
use tracing::debug;

/// Split a frame's hit pixels into connected blobs
///
/// Each blob lists its keys in `(x, y)` order, and blobs come out ordered by
/// their first pixel. A pixel recorded more than once appears once.
pub fn find_blobs(frame: &Frame) -> Vec<Blob> {
    let mut remaining: BTreeSet<(u32, u32)> = frame
        .pixels()
        .iter()
        .filter(|p| p.count > 0)
        .map(|p| (p.x, p.y))
        .collect();

    let mut blobs = Vec::new();
    while let Some(start) = remaining.pop_first() {
        let mut component = vec![start];
        let mut queue = VecDeque::from([start]);

        while let Some((x, y)) = queue.pop_front() {
            for (nx, ny) in neighbours(x, y) {
                if remaining.remove(&(nx, ny)) {
                    component.push((nx, ny));
                    queue.push_back((nx, ny));
                }
            }
        }

        component.sort_unstable();
        let mut blob = Blob::new();
        for coords in &component {
            blob.add_pixel(coords);
        }
        blobs.push(blob);
    }

    debug!(
        pixels = frame.pixel_count(),
        blobs = blobs.len(),
        "clustered frame"
    );
    blobs
}

fn neighbours(x: u32, y: u32) -> impl Iterator<Item = (u32, u32)> {
    (-1i32..=1)
        .flat_map(|dx| (-1i32..=1).map(move |dy| (dx, dy)))
        .filter(|&(dx, dy)| dx != 0 || dy != 0)
        .filter_map(move |(dx, dy)| Some((x.checked_add_signed(dx)?, y.checked_add_signed(dy)?)))
}
