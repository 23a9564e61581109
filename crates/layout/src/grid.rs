//! Grid planning
//!
//! Pure geometry: active-tile count in, row/column layout out. The planner
//! never surfaces errors to the pipeline; a degenerate computation retains
//! the previous known-good spec and logs.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Computed grid geometry for the current render-set size
///
/// Derived, never mutated directly; recomputed from `|RenderSet|` each pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Planned row count
    pub rows: usize,
    /// Planned column count
    pub cols: usize,
    /// Count of fully-populated rows
    pub actual_rows: usize,
    /// Column count of the final partially-filled row (0 when exact)
    pub last_row_cols: usize,
    /// Placeholder tiles to pad so the final row squares off
    pub num_to_add: usize,
    /// Whether the secondary ("alt") grid should be removed
    pub remove_alt_grid: bool,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            rows: 1,
            cols: 1,
            actual_rows: 1,
            last_row_cols: 0,
            num_to_add: 0,
            remove_alt_grid: true,
        }
    }
}

impl GridSpec {
    /// Number of rows actually displayed (full rows plus the tail row)
    pub fn display_rows(&self) -> usize {
        let tail = usize::from(self.last_row_cols > 0);
        (self.actual_rows + tail).max(1)
    }
}

/// Minimal rectangle covering `n` tiles
///
/// `n` is clamped to 1 to avoid division by zero. Rows are chosen as
/// `ceil(sqrt(n))`, columns as `ceil(n / rows)`, so `rows * cols >= n`
/// always holds.
pub fn calculate_grid(n: usize) -> (usize, usize) {
    let n = n.max(1);
    let rows = (n as f64).sqrt().ceil() as usize;
    let rows = rows.max(1);
    let cols = n.div_ceil(rows);
    (rows, cols.max(1))
}

/// Fit `actives` tiles into a `rows x cols` grid
///
/// A tail row that would be half-filled or less merges into the row above
/// it, so three tiles in a (2, 2) grid display as one row of three rather
/// than a row of two over a row of one. Otherwise the tail row stands and
/// `num_to_add` placeholder tiles square it off.
pub fn check_grid(rows: usize, cols: usize, actives: usize) -> GridSpec {
    let rows = rows.max(1);
    let cols = cols.max(1);
    let capacity = rows * cols;
    let actives = actives.min(capacity);

    let remove_alt_grid = actives <= capacity.saturating_sub(cols);

    let full_rows = actives / cols;
    let rem = actives % cols;

    let (actual_rows, last_row_cols, num_to_add) = if rem == 0 {
        (full_rows, 0, 0)
    } else if rem * 2 <= cols && full_rows >= 1 {
        // Merge the underfilled tail into the previous row.
        (full_rows - 1, rem + cols, 0)
    } else {
        (full_rows, rem, cols - rem)
    };

    GridSpec {
        rows,
        cols,
        actual_rows,
        last_row_cols,
        num_to_add,
        remove_alt_grid,
    }
}

/// Stateful planner retaining the previous known-good spec
///
/// Errors are non-fatal: on a degenerate input the previous `GridSpec` is
/// returned and the failure is logged, never propagated.
#[derive(Debug, Clone, Default)]
pub struct GridPlanner {
    last: GridSpec,
}

impl GridPlanner {
    /// Create a planner with the default 1x1 spec
    pub fn new() -> Self {
        Self::default()
    }

    /// Plan the grid for `actives` tiles
    pub fn plan(&mut self, actives: usize) -> GridSpec {
        // Rejects absurd counts before the float round-trip in
        // calculate_grid loses integer precision.
        if actives > (1 << 20) {
            warn!(actives, "implausible tile count, retaining previous grid");
            return self.last;
        }

        let (rows, cols) = calculate_grid(actives);
        self.last = check_grid(rows, cols, actives.max(1));
        self.last
    }

    /// The most recent spec
    pub fn last(&self) -> GridSpec {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_grid_covers_n() {
        for n in 0..=200 {
            let (rows, cols) = calculate_grid(n);
            assert!(rows >= 1 && cols >= 1, "n={n}");
            assert!(rows * cols >= n.max(1), "n={n} rows={rows} cols={cols}");
        }
    }

    #[test]
    fn test_calculate_grid_known_values() {
        assert_eq!(calculate_grid(0), (1, 1));
        assert_eq!(calculate_grid(1), (1, 1));
        assert_eq!(calculate_grid(2), (2, 1));
        assert_eq!(calculate_grid(4), (2, 2));
        assert_eq!(calculate_grid(5), (3, 2));
        assert_eq!(calculate_grid(7), (3, 3));
        assert_eq!(calculate_grid(9), (3, 3));
        assert_eq!(calculate_grid(10), (4, 3));
    }

    #[test]
    fn test_check_grid_exact_fill() {
        let spec = check_grid(2, 2, 4);
        assert_eq!(spec.actual_rows, 2);
        assert_eq!(spec.last_row_cols, 0);
        assert_eq!(spec.num_to_add, 0);
        assert!(!spec.remove_alt_grid);
    }

    #[test]
    fn test_check_grid_merges_underfilled_tail() {
        // Three tiles in a (2, 2) grid display as one row of three.
        let spec = check_grid(2, 2, 3);
        assert_eq!(spec.last_row_cols, 3);
        assert_eq!(spec.actual_rows, 0);
        assert_eq!(spec.num_to_add, 0);
        assert_eq!(spec.display_rows(), 1);
    }

    #[test]
    fn test_check_grid_keeps_majority_tail() {
        // Five tiles in a (2, 3) grid: tail of 2 is more than half of 3.
        let spec = check_grid(2, 3, 5);
        assert_eq!(spec.actual_rows, 1);
        assert_eq!(spec.last_row_cols, 2);
        assert_eq!(spec.num_to_add, 1);
    }

    #[test]
    fn test_check_grid_alt_removal_threshold() {
        // actives <= rows*cols - cols drops the alt grid
        assert!(check_grid(2, 2, 2).remove_alt_grid);
        assert!(!check_grid(2, 2, 3).remove_alt_grid);
        assert!(check_grid(3, 3, 6).remove_alt_grid);
        assert!(!check_grid(3, 3, 7).remove_alt_grid);
    }

    #[test]
    fn test_check_grid_clamps_degenerate_input() {
        let spec = check_grid(0, 0, 0);
        assert_eq!(spec.rows, 1);
        assert_eq!(spec.cols, 1);

        // actives above capacity is truncated, not an error
        let spec = check_grid(2, 2, 99);
        assert_eq!(spec.actual_rows, 2);
        assert_eq!(spec.last_row_cols, 0);
    }

    #[test]
    fn test_planner_retains_previous_on_degenerate_input() {
        let mut planner = GridPlanner::new();
        let good = planner.plan(7);
        assert_eq!((good.rows, good.cols), (3, 3));

        let retained = planner.plan(usize::MAX);
        assert_eq!(retained, good);
        assert_eq!(planner.last(), good);
    }

    #[test]
    fn test_planner_scenario_pages() {
        // 7 participants with a page limit of 4: page 0 plans a (2, 2)
        // grid, page 1 holds the remaining 3 as a single row of three.
        let mut planner = GridPlanner::new();
        let page0 = planner.plan(4);
        assert_eq!((page0.rows, page0.cols), (2, 2));

        let page1 = planner.plan(3);
        assert_eq!(page1.last_row_cols, 3);
        assert_eq!(page1.display_rows(), 1);
    }
}
