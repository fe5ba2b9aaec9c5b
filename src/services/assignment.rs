//! Track-to-detection assignment over centroid distances
//!
//! Two strategies resolve the tracks × detections distance matrix:
//! - `Greedy` - every track proposes its nearest detection; proposals are
//!   committed closest-first, skipping any track or detection already taken
//! - `Optimal` - minimum total distance via the Hungarian algorithm
//!
//! Neither strategy gates on a maximum distance. What happens to leftovers
//! is the tracker's business.

use crate::domain::types::Point;
use pathfinding::kuhn_munkres::kuhn_munkres_min;
use pathfinding::matrix::Matrix;
use serde::Deserialize;

/// Hungarian weights are integer thousandths of a pixel
const COST_SCALE: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStrategy {
    #[default]
    Greedy,
    Optimal,
}

impl AssignmentStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStrategy::Greedy => "greedy",
            AssignmentStrategy::Optimal => "optimal",
        }
    }

    /// Resolve a distance matrix with this strategy
    pub fn solve(&self, distances: &DistanceMatrix) -> Assignment {
        match self {
            AssignmentStrategy::Greedy => greedy_nearest(distances),
            AssignmentStrategy::Optimal => optimal(distances),
        }
    }
}

/// Row-major tracks × detections Euclidean distance matrix
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl DistanceMatrix {
    /// Pairwise distances between track positions (rows) and detection centroids (columns)
    pub fn between(tracks: &[Point], detections: &[Point]) -> Self {
        let data = tracks
            .iter()
            .flat_map(|t| detections.iter().map(move |d| t.distance(d)))
            .collect();
        Self { rows: tracks.len(), cols: detections.len(), data }
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Column of the smallest distance in a row, first one on ties
    fn row_argmin(&self, row: usize) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for col in 0..self.cols {
            let d = self.get(row, col);
            match best {
                Some((_, best_d)) if d >= best_d => {}
                _ => best = Some((col, d)),
            }
        }
        best
    }
}

/// Result of resolving a distance matrix
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assignment {
    /// `(track_row, detection_col)` pairs in commit order
    pub matches: Vec<(usize, usize)>,
    /// Track rows left without a detection, ascending
    pub unmatched_tracks: Vec<usize>,
    /// Detection columns left without a track, ascending
    pub unmatched_detections: Vec<usize>,
}

impl Assignment {
    fn from_matches(matches: Vec<(usize, usize)>, rows: usize, cols: usize) -> Self {
        let mut used_rows = vec![false; rows];
        let mut used_cols = vec![false; cols];
        for &(r, c) in &matches {
            used_rows[r] = true;
            used_cols[c] = true;
        }
        Self {
            matches,
            unmatched_tracks: (0..rows).filter(|&r| !used_rows[r]).collect(),
            unmatched_detections: (0..cols).filter(|&c| !used_cols[c]).collect(),
        }
    }
}

/// Greedy nearest-centroid assignment
///
/// Each track only competes for its own nearest detection. Proposals are
/// sorted by distance with a stable sort, so equal distances keep track order.
pub fn greedy_nearest(distances: &DistanceMatrix) -> Assignment {
    let mut proposals: Vec<(usize, usize, f64)> = (0..distances.rows())
        .filter_map(|row| distances.row_argmin(row).map(|(col, d)| (row, col, d)))
        .collect();
    proposals.sort_by(|a, b| a.2.total_cmp(&b.2));

    let mut used_rows = vec![false; distances.rows()];
    let mut used_cols = vec![false; distances.cols()];
    let mut matches = Vec::with_capacity(proposals.len());

    for (row, col, _) in proposals {
        if used_rows[row] || used_cols[col] {
            continue;
        }
        used_rows[row] = true;
        used_cols[col] = true;
        matches.push((row, col));
    }

    Assignment::from_matches(matches, distances.rows(), distances.cols())
}

/// Minimum total distance assignment (Hungarian algorithm)
///
/// The solver needs at least as many columns as rows, so the matrix is
/// transposed when tracks outnumber detections.
pub fn optimal(distances: &DistanceMatrix) -> Assignment {
    let (rows, cols) = (distances.rows(), distances.cols());
    if rows == 0 || cols == 0 {
        return Assignment::from_matches(Vec::new(), rows, cols);
    }

    let transposed = rows > cols;
    let (n, m) = if transposed { (cols, rows) } else { (rows, cols) };
    let weights = Matrix::from_fn(n, m, |(i, j)| {
        let d = if transposed { distances.get(j, i) } else { distances.get(i, j) };
        (d * COST_SCALE).round() as i64
    });

    let (_, solution) = kuhn_munkres_min(&weights);

    let mut matches: Vec<(usize, usize)> = solution
        .into_iter()
        .enumerate()
        .map(|(i, j)| if transposed { (j, i) } else { (i, j) })
        .collect();
    matches.sort_unstable();

    Assignment::from_matches(matches, rows, cols)
}
