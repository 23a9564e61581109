//! Adaptive sizing
//!
//! Converts participant count, event type, and share state into layout
//! fractions for the primary vs. secondary regions, and GridSpecs into
//! concrete per-tile pixel bounds. The presentation layer consumes the
//! output; nothing here touches the DOM-equivalent.

use crate::config::EventType;
use crate::grid::GridSpec;
use crate::stream::TileRect;
use serde::{Deserialize, Serialize};

/// Pixel dimensions of the rendering container
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContainerSize {
    /// Width in pixels
    pub width: f64,
    /// Height in pixels
    pub height: f64,
}

impl Default for ContainerSize {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
        }
    }
}

/// Primary/secondary split of the container, as fractions summing to 1.0
pub type RegionFractions = (f64, f64);

/// Layout fractions for the primary vs. secondary regions
///
/// Broadcast favors a near-full-width primary tile; conference and webinar
/// split more evenly as the participant count grows; an active screen-share
/// gives the shared surface three quarters of the container except under
/// broadcast, where it keeps the full width.
pub fn auto_adjust(
    n: usize,
    event_type: EventType,
    share_screen_started: bool,
    shared: bool,
) -> RegionFractions {
    if shared || share_screen_started {
        return match event_type {
            EventType::Broadcast => (1.0, 0.0),
            _ => (0.75, 0.25),
        };
    }

    match event_type {
        EventType::Broadcast => (1.0, 0.0),
        EventType::Chat => {
            if n <= 2 {
                (1.0, 0.0)
            } else {
                (0.67, 0.33)
            }
        }
        EventType::Conference | EventType::Webinar => {
            if n <= 4 {
                (1.0, 0.0)
            } else if n <= 8 {
                (0.83, 0.17)
            } else {
                (0.67, 0.33)
            }
        }
    }
}

/// Per-tile pixel bounds for a grid confined to `region`
///
/// Row-major, matching the tile sequence order: `actual_rows` full rows of
/// `cols` tiles, then one tail row stretched across the region width. The
/// tail holds `last_row_cols` tiles plus the `num_to_add` pads that square
/// it off, so every tile in the sequence gets a rect. The alt grid skips
/// the tail-merge treatment and lays out uniformly.
pub fn update_mini_cards_grid(spec: &GridSpec, region: TileRect, is_alt: bool) -> Vec<TileRect> {
    if region.width <= 0.0 || region.height <= 0.0 {
        return Vec::new();
    }

    if is_alt {
        return uniform_grid(spec.rows, spec.cols, region);
    }

    let display_rows = spec.display_rows();
    let row_height = region.height / display_rows as f64;
    let tail_slots = spec.last_row_cols + spec.num_to_add;
    let mut rects = Vec::with_capacity(spec.actual_rows * spec.cols + tail_slots);

    for row in 0..spec.actual_rows {
        let y = region.y + row as f64 * row_height;
        let width = region.width / spec.cols as f64;
        for col in 0..spec.cols {
            rects.push(TileRect {
                x: region.x + col as f64 * width,
                y,
                width,
                height: row_height,
            });
        }
    }

    if tail_slots > 0 {
        let y = region.y + spec.actual_rows as f64 * row_height;
        let width = region.width / tail_slots as f64;
        for col in 0..tail_slots {
            rects.push(TileRect {
                x: region.x + col as f64 * width,
                y,
                width,
                height: row_height,
            });
        }
    }

    rects
}

fn uniform_grid(rows: usize, cols: usize, region: TileRect) -> Vec<TileRect> {
    let rows = rows.max(1);
    let cols = cols.max(1);
    let width = region.width / cols as f64;
    let height = region.height / rows as f64;
    let mut rects = Vec::with_capacity(rows * cols);

    for row in 0..rows {
        for col in 0..cols {
            rects.push(TileRect {
                x: region.x + col as f64 * width,
                y: region.y + row as f64 * height,
                width,
                height,
            });
        }
    }

    rects
}

/// Stateful sizer
///
/// Holds the container size and the last computed fractions; recomputes on
/// render-set size change, container resize, and share/event changes.
#[derive(Debug, Clone)]
pub struct AdaptiveSizer {
    container: ContainerSize,
    fractions: RegionFractions,
}

impl AdaptiveSizer {
    /// Create a sizer for the given container
    pub fn new(container: ContainerSize) -> Self {
        Self {
            container,
            fractions: (1.0, 0.0),
        }
    }

    /// Update the container size (window resize)
    pub fn set_container(&mut self, container: ContainerSize) {
        self.container = container;
    }

    /// Current container size
    pub fn container(&self) -> ContainerSize {
        self.container
    }

    /// Recompute and store region fractions for the current inputs
    pub fn readjust(
        &mut self,
        n: usize,
        event_type: EventType,
        share_screen_started: bool,
        shared: bool,
    ) -> RegionFractions {
        self.fractions = auto_adjust(n, event_type, share_screen_started, shared);
        self.fractions
    }

    /// The last computed fractions
    pub fn fractions(&self) -> RegionFractions {
        self.fractions
    }

    /// Primary and secondary regions of the container, split vertically
    ///
    /// The primary region takes `main_fraction` of the width on the left;
    /// the secondary region (alt grid or pagination strip) takes the rest.
    /// A zero secondary fraction yields a zero-width secondary region.
    pub fn regions(&self) -> (TileRect, TileRect) {
        let (main, other) = self.fractions;
        let main_width = self.container.width * main;
        let primary = TileRect {
            x: 0.0,
            y: 0.0,
            width: main_width,
            height: self.container.height,
        };
        let secondary = TileRect {
            x: main_width,
            y: 0.0,
            width: self.container.width * other,
            height: self.container.height,
        };
        (primary, secondary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::check_grid;

    #[test]
    fn test_fractions_sum_to_one() {
        for n in 0..20 {
            for event in [
                EventType::Broadcast,
                EventType::Chat,
                EventType::Conference,
                EventType::Webinar,
            ] {
                for (started, shared) in [(false, false), (true, false), (true, true)] {
                    let (a, b) = auto_adjust(n, event, started, shared);
                    assert!((a + b - 1.0).abs() < 1e-9);
                    assert!(a >= 0.0 && b >= 0.0);
                }
            }
        }
    }

    #[test]
    fn test_broadcast_keeps_full_primary() {
        assert_eq!(auto_adjust(12, EventType::Broadcast, false, false), (1.0, 0.0));
        assert_eq!(auto_adjust(12, EventType::Broadcast, true, true), (1.0, 0.0));
    }

    #[test]
    fn test_conference_splits_as_n_grows() {
        let (small, _) = auto_adjust(3, EventType::Conference, false, false);
        let (mid, _) = auto_adjust(6, EventType::Conference, false, false);
        let (large, _) = auto_adjust(12, EventType::Conference, false, false);
        assert!(small >= mid && mid >= large);
        assert!(large < 1.0);
    }

    #[test]
    fn test_share_takes_three_quarters() {
        assert_eq!(auto_adjust(5, EventType::Conference, true, true), (0.75, 0.25));
        assert_eq!(auto_adjust(5, EventType::Webinar, false, true), (0.75, 0.25));
    }

    #[test]
    fn test_mini_cards_grid_exact_fill() {
        let spec = check_grid(2, 2, 4);
        let region = TileRect {
            x: 0.0,
            y: 0.0,
            width: 1280.0,
            height: 720.0,
        };
        let rects = update_mini_cards_grid(&spec, region, false);
        assert_eq!(rects.len(), 4);
        assert_eq!(rects[0].width, 640.0);
        assert_eq!(rects[0].height, 360.0);
        assert_eq!(rects[3].x, 640.0);
        assert_eq!(rects[3].y, 360.0);
    }

    #[test]
    fn test_mini_cards_grid_merged_tail_row() {
        // Three tiles in a (2, 2) grid display as one row of three.
        let spec = check_grid(2, 2, 3);
        let region = TileRect {
            x: 0.0,
            y: 0.0,
            width: 900.0,
            height: 600.0,
        };
        let rects = update_mini_cards_grid(&spec, region, false);
        assert_eq!(rects.len(), 3);
        for rect in &rects {
            assert_eq!(rect.width, 300.0);
            assert_eq!(rect.height, 600.0);
        }
    }

    #[test]
    fn test_mini_cards_grid_padded_tail_row() {
        // Five tiles in a (2, 3) grid: tail of 2 plus one pad, so the tail
        // row keeps the full-row tile width.
        let spec = check_grid(2, 3, 5);
        let region = TileRect {
            x: 0.0,
            y: 0.0,
            width: 900.0,
            height: 600.0,
        };
        let rects = update_mini_cards_grid(&spec, region, false);
        assert_eq!(rects.len(), 6);
        for rect in &rects {
            assert_eq!(rect.width, 300.0);
        }
    }

    #[test]
    fn test_mini_cards_grid_degenerate_region() {
        let spec = check_grid(2, 2, 4);
        let region = TileRect::default();
        assert!(update_mini_cards_grid(&spec, region, false).is_empty());
    }

    #[test]
    fn test_sizer_regions_split() {
        let mut sizer = AdaptiveSizer::new(ContainerSize {
            width: 1000.0,
            height: 500.0,
        });
        sizer.readjust(5, EventType::Conference, true, true);
        let (primary, secondary) = sizer.regions();
        assert_eq!(primary.width, 750.0);
        assert_eq!(secondary.x, 750.0);
        assert_eq!(secondary.width, 250.0);
    }
}
