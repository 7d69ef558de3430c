//! Connected-region extraction over a binary mask.
//!
//! Regions are reported by their outer extent only: a hole inside a region is
//! part of that region's bounding box and never shows up as a region of its own.

use super::mask::Mask;
use super::result::{BoundingBox, Region};

/// Produces the connected foreground regions of a mask.
///
/// The returned iterator is lazy and may borrow the mask. For a given mask the
/// order of regions must be stable.
pub trait RegionExtractor: Send {
    /// Extractor identifier, used in logs.
    fn name(&self) -> &'static str;

    fn regions<'m>(&self, mask: &'m Mask) -> Box<dyn Iterator<Item = Region> + 'm>;
}

/// Pixel adjacency used to join mask pixels into a region.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Connectivity {
    Four,
    #[default]
    Eight,
}

impl Connectivity {
    fn offsets(&self) -> &'static [(i64, i64)] {
        match self {
            Connectivity::Four => &[(1, 0), (-1, 0), (0, 1), (0, -1)],
            Connectivity::Eight => &[
                (1, 0),
                (-1, 0),
                (0, 1),
                (0, -1),
                (1, 1),
                (1, -1),
                (-1, 1),
                (-1, -1),
            ],
        }
    }
}

/// Flood-fill connected components, found in raster order of their first pixel.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConnectedComponents {
    pub connectivity: Connectivity,
}

impl ConnectedComponents {
    pub fn new(connectivity: Connectivity) -> Self {
        Self { connectivity }
    }
}

impl RegionExtractor for ConnectedComponents {
    fn name(&self) -> &'static str {
        "connected-components"
    }

    fn regions<'m>(&self, mask: &'m Mask) -> Box<dyn Iterator<Item = Region> + 'm> {
        Box::new(Components::new(mask, self.connectivity))
    }
}

/// Lazy iterator over the components of a mask.
///
/// Each call to `next` resumes the raster scan and floods the next unvisited
/// foreground pixel, so components beyond the ones consumed are never computed.
pub struct Components<'m> {
    mask: &'m Mask,
    visited: Vec<bool>,
    cursor: usize,
    connectivity: Connectivity,
    stack: Vec<usize>,
}

impl<'m> Components<'m> {
    pub fn new(mask: &'m Mask, connectivity: Connectivity) -> Self {
        Self {
            mask,
            visited: vec![false; mask.bits().len()],
            cursor: 0,
            connectivity,
            stack: Vec::new(),
        }
    }

    fn flood(&mut self, seed: usize) -> Region {
        let width = self.mask.width() as i64;
        let height = self.mask.height() as i64;
        let mask = self.mask;
        let bits = mask.bits();

        let mut min_x = i64::MAX;
        let mut min_y = i64::MAX;
        let mut max_x = i64::MIN;
        let mut max_y = i64::MIN;
        let mut area = 0u32;

        self.visited[seed] = true;
        self.stack.push(seed);
        while let Some(idx) = self.stack.pop() {
            let x = idx as i64 % width;
            let y = idx as i64 / width;
            area += 1;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);

            for &(dx, dy) in self.connectivity.offsets() {
                let nx = x + dx;
                let ny = y + dy;
                if nx < 0 || ny < 0 || nx >= width || ny >= height {
                    continue;
                }
                let n = (ny * width + nx) as usize;
                if bits[n] && !self.visited[n] {
                    self.visited[n] = true;
                    self.stack.push(n);
                }
            }
        }

        Region {
            bbox: BoundingBox::new(
                min_x as u32,
                min_y as u32,
                (max_x - min_x + 1) as u32,
                (max_y - min_y + 1) as u32,
            ),
            area,
        }
    }
}

impl Iterator for Components<'_> {
    type Item = Region;

    fn next(&mut self) -> Option<Region> {
        let mask = self.mask;
        let bits = mask.bits();
        while self.cursor < bits.len() {
            let idx = self.cursor;
            self.cursor += 1;
            if bits[idx] && !self.visited[idx] {
                return Some(self.flood(idx));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_from_rows(rows: &[&str]) -> Mask {
        let height = rows.len() as u32;
        let width = rows[0].len() as u32;
        let bits = rows
            .iter()
            .flat_map(|row| row.chars().map(|c| c == '#'))
            .collect();
        Mask::from_bits(width, height, bits).unwrap()
    }

    fn extract(mask: &Mask, connectivity: Connectivity) -> Vec<Region> {
        ConnectedComponents::new(connectivity).regions(mask).collect()
    }

    #[test]
    fn separate_blobs_in_raster_order() {
        let mask = mask_from_rows(&[
            "......##",
            ".##...##",
            ".##.....",
            "........",
            "...###..",
        ]);
        let regions = extract(&mask, Connectivity::Eight);
        assert_eq!(
            regions,
            vec![
                Region {
                    bbox: BoundingBox::new(6, 0, 2, 2),
                    area: 4
                },
                Region {
                    bbox: BoundingBox::new(1, 1, 2, 2),
                    area: 4
                },
                Region {
                    bbox: BoundingBox::new(3, 4, 3, 1),
                    area: 3
                },
            ]
        );
    }

    #[test]
    fn diagonal_pixels_join_only_with_eight_connectivity() {
        let mask = mask_from_rows(&["#..", ".#.", "..#"]);
        let eight = extract(&mask, Connectivity::Eight);
        assert_eq!(eight.len(), 1);
        assert_eq!(eight[0].bbox, BoundingBox::new(0, 0, 3, 3));
        assert_eq!(eight[0].area, 3);

        assert_eq!(extract(&mask, Connectivity::Four).len(), 3);
    }

    #[test]
    fn holes_are_not_reported_separately() {
        let mask = mask_from_rows(&["#####", "#...#", "#...#", "#####"]);
        let regions = extract(&mask, Connectivity::Eight);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].bbox, BoundingBox::new(0, 0, 5, 4));
        assert_eq!(regions[0].area, 14);
    }

    #[test]
    fn empty_mask_has_no_regions() {
        let mask = Mask::empty(4, 4);
        assert!(extract(&mask, Connectivity::Eight).is_empty());
    }

    #[test]
    fn iteration_is_lazy_and_resumable() {
        let mask = mask_from_rows(&["#.#.#"]);
        let mut components = Components::new(&mask, Connectivity::Eight);
        assert_eq!(components.next().unwrap().bbox.x, 0);
        // later columns are untouched until requested
        assert!(!components.visited[2]);
        assert_eq!(components.next().unwrap().bbox.x, 2);
        assert_eq!(components.next().unwrap().bbox.x, 4);
        assert!(components.next().is_none());
    }

    #[test]
    fn full_mask_is_one_region() {
        let bits = vec![true; 12];
        let mask = Mask::from_bits(4, 3, bits).unwrap();
        let regions = extract(&mask, Connectivity::Four);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].area, 12);
        assert_eq!(regions[0].bbox, BoundingBox::new(0, 0, 4, 3));
    }
}
