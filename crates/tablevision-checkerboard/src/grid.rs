//! Grid assembly: turn a cloud of checkerboard corners into an ordered
//! rectangular lattice.
//!
//! Each corner links to at most one neighbor per image-space direction
//! (right/left/up/down). Links require the two corner orientations to be
//! roughly orthogonal (adjacent checkerboard corners flip their white
//! diagonal) and the connecting edge to sit at ~45° to both diagonals.
//! A BFS over the accepted links assigns integer lattice coordinates.

use kiddo::{KdTree, SquaredEuclidean};
use nalgebra::{Point2, Vector2};

use crate::geom::{angle_diff_abs, axis_vec_diff, is_orthogonal};
use crate::params::GridParams;

/// A raw detected corner in device pixel coordinates.
#[derive(Clone, Copy, Debug)]
pub struct Corner {
    pub position: Point2<f32>,
    /// White-diagonal direction in radians, defined modulo π.
    pub orientation: f32,
    pub strength: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum LinkDirection {
    Right,
    Left,
    Up,
    Down,
}

#[derive(Debug)]
struct Link {
    direction: LinkDirection,
    index: usize,
    distance: f32,
    score: f32,
}

fn direction_quadrant(v: &Vector2<f32>) -> LinkDirection {
    if v.x.abs() > v.y.abs() {
        if v.x >= 0.0 {
            LinkDirection::Right
        } else {
            LinkDirection::Left
        }
    } else if v.y >= 0.0 {
        LinkDirection::Down
    } else {
        LinkDirection::Up
    }
}

fn evaluate_link(
    corner: &Corner,
    neighbor: &Corner,
    neighbor_index: usize,
    params: &GridParams,
    spacing: (f32, f32),
) -> Option<Link> {
    let tol = params.orientation_tolerance_deg.to_radians();

    // Adjacent corners flip the white diagonal.
    if !is_orthogonal(corner.orientation, neighbor.orientation, tol) {
        return None;
    }

    let vec_to_neighbor = neighbor.position - corner.position;
    let distance = vec_to_neighbor.norm();
    let (min_spacing, max_spacing) = spacing;
    if distance < min_spacing || distance > max_spacing {
        return None;
    }

    // The edge between lattice neighbors runs at ~45° to each white diagonal.
    let edge_angle = vec_to_neighbor.y.atan2(vec_to_neighbor.x);
    let diff_corner = axis_vec_diff(corner.orientation, edge_angle);
    let diff_neighbor = axis_vec_diff(neighbor.orientation, edge_angle);
    let expected = std::f32::consts::FRAC_PI_4;

    let score_corner = (diff_corner - expected).abs();
    let score_neighbor = (diff_neighbor - expected).abs();
    if score_corner > tol || score_neighbor > tol {
        return None;
    }

    let score_orientation = (std::f32::consts::FRAC_PI_2
        - angle_diff_abs(corner.orientation, neighbor.orientation))
    .abs();

    Some(Link {
        direction: direction_quadrant(&vec_to_neighbor),
        index: neighbor_index,
        distance,
        score: score_corner + score_neighbor + score_orientation,
    })
}

/// Keep at most one link per direction, choosing the lowest-score candidate.
fn select_links(candidates: Vec<Link>) -> Vec<Link> {
    let mut best: [Option<Link>; 4] = [None, None, None, None];

    for candidate in candidates.into_iter() {
        let slot = match candidate.direction {
            LinkDirection::Right => &mut best[0],
            LinkDirection::Left => &mut best[1],
            LinkDirection::Up => &mut best[2],
            LinkDirection::Down => &mut best[3],
        };

        let replace = match slot {
            None => true,
            Some(current) => {
                candidate.score < current.score
                    || (candidate.score == current.score && candidate.distance < current.distance)
            }
        };

        if replace {
            *slot = Some(candidate);
        }
    }

    best.into_iter().flatten().collect()
}

struct NeighborGraph {
    links: Vec<Vec<Link>>,
}

fn median_neighbor_distance(tree: &KdTree<f32, 2>, corners: &[Corner]) -> Option<f32> {
    let mut dists: Vec<f32> = corners
        .iter()
        .filter_map(|c| {
            let hits = tree.nearest_n::<SquaredEuclidean>(&[c.position.x, c.position.y], 2);
            // First hit is the corner itself at distance 0.
            hits.get(1).map(|h| h.distance.sqrt())
        })
        .collect();
    if dists.is_empty() {
        return None;
    }
    dists.sort_by(|a, b| a.total_cmp(b));
    Some(dists[dists.len() / 2])
}

impl NeighborGraph {
    fn new(corners: &[Corner], params: &GridParams) -> Self {
        let coords = corners
            .iter()
            .map(|c| [c.position.x, c.position.y])
            .collect::<Vec<_>>();
        let tree: KdTree<f32, 2> = (&coords).into();

        let spacing = if params.auto_spacing {
            match median_neighbor_distance(&tree, corners) {
                Some(m) => (0.5 * m, 1.8 * m),
                None => (params.min_spacing_pix, params.max_spacing_pix),
            }
        } else {
            (params.min_spacing_pix, params.max_spacing_pix)
        };

        let mut links = Vec::with_capacity(corners.len());
        for (i, corner) in corners.iter().enumerate() {
            let mut candidates = Vec::new();

            let query = [corner.position.x, corner.position.y];
            let results = tree.nearest_n::<SquaredEuclidean>(&query, params.k_neighbors);

            for nn in results.into_iter() {
                let neighbor_index = nn.item as usize;
                if neighbor_index == i {
                    continue;
                }
                let neighbor = &corners[neighbor_index];
                if let Some(link) = evaluate_link(corner, neighbor, neighbor_index, params, spacing)
                {
                    candidates.push(link);
                }
            }

            links.push(select_links(candidates));
        }

        Self { links }
    }

    fn largest_component(&self) -> Vec<usize> {
        let mut visited = vec![false; self.links.len()];
        let mut best = Vec::new();

        for start in 0..self.links.len() {
            if visited[start] {
                continue;
            }

            let mut component = Vec::new();
            let mut stack = vec![start];
            while let Some(node) = stack.pop() {
                if visited[node] {
                    continue;
                }
                visited[node] = true;
                component.push(node);
                for link in &self.links[node] {
                    if !visited[link.index] {
                        stack.push(link.index);
                    }
                }
            }

            if component.len() > best.len() {
                best = component;
            }
        }

        best
    }

    fn assign_coordinates(&self, component: &[usize]) -> Vec<(usize, i32, i32)> {
        let mut coords = Vec::new();
        let mut visited = vec![false; self.links.len()];
        let mut queue = std::collections::VecDeque::new();

        queue.push_back((component[0], 0, 0)); // (node index, i, j)

        while let Some((node, i, j)) = queue.pop_front() {
            if visited[node] {
                continue;
            }
            visited[node] = true;
            coords.push((node, i, j));

            for link in &self.links[node] {
                let (di, dj) = match link.direction {
                    LinkDirection::Right => (1, 0),
                    LinkDirection::Left => (-1, 0),
                    LinkDirection::Up => (0, -1),
                    LinkDirection::Down => (0, 1),
                };
                queue.push_back((link.index, i + di, j + dj));
            }
        }

        coords
    }
}

/// A complete inner-corner lattice, row-major with the origin at top-left.
#[derive(Clone, Debug)]
pub struct CornerGrid {
    pub cols: usize,
    pub rows: usize,
    /// `rows * cols` positions, row-major.
    pub positions: Vec<Point2<f64>>,
}

/// Assemble the corner cloud into a complete `cols x rows` lattice.
///
/// Fails (returns `None`) when the largest connected component does not
/// cover the full lattice exactly, or when BFS coordinates collide.
pub fn assemble_grid(corners: &[Corner], cols: usize, rows: usize, params: &GridParams) -> Option<CornerGrid> {
    if corners.len() < cols * rows {
        return None;
    }

    let graph = NeighborGraph::new(corners, params);
    let component = graph.largest_component();
    if component.len() != cols * rows {
        return None;
    }

    let coords = graph.assign_coordinates(&component);

    let min_i = coords.iter().map(|c| c.1).min()?;
    let min_j = coords.iter().map(|c| c.2).min()?;
    let max_i = coords.iter().map(|c| c.1).max()?;
    let max_j = coords.iter().map(|c| c.2).max()?;

    let span_i = (max_i - min_i + 1) as usize;
    let span_j = (max_j - min_j + 1) as usize;

    let transposed = if (span_i, span_j) == (cols, rows) {
        false
    } else if (span_i, span_j) == (rows, cols) {
        true
    } else {
        return None;
    };

    let mut cells: Vec<Option<usize>> = vec![None; cols * rows];
    for &(node, i, j) in &coords {
        let (mut u, mut v) = ((i - min_i) as usize, (j - min_j) as usize);
        if transposed {
            std::mem::swap(&mut u, &mut v);
        }
        let slot = &mut cells[v * cols + u];
        if slot.is_some() {
            return None; // coordinate collision, grid is inconsistent
        }
        *slot = Some(node);
    }

    let mut positions: Vec<Point2<f64>> = Vec::with_capacity(cols * rows);
    for cell in &cells {
        let node = (*cell)?;
        let p = corners[node].position;
        positions.push(Point2::new(p.x as f64, p.y as f64));
    }

    let mut grid = CornerGrid {
        cols,
        rows,
        positions,
    };
    canonicalize(&mut grid);
    Some(grid)
}

/// Flip lattice axes so columns advance with image x and rows with image y.
fn canonicalize(grid: &mut CornerGrid) {
    let (cols, rows) = (grid.cols, grid.rows);
    let at = |g: &CornerGrid, u: usize, v: usize| g.positions[v * cols + u];

    let mut row_dir = Vector2::zeros();
    for v in 0..rows {
        row_dir += at(grid, cols - 1, v) - at(grid, 0, v);
    }
    let mut col_dir = Vector2::zeros();
    for u in 0..cols {
        col_dir += at(grid, u, rows - 1) - at(grid, u, 0);
    }

    if row_dir.x < 0.0 {
        for v in 0..rows {
            grid.positions[v * cols..(v + 1) * cols].reverse();
        }
    }
    if col_dir.y < 0.0 {
        for v in 0..rows / 2 {
            for u in 0..cols {
                grid.positions.swap(v * cols + u, (rows - 1 - v) * cols + u);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_4;

    fn make_corner(x: f32, y: f32, orientation: f32) -> Corner {
        Corner {
            position: Point2::new(x, y),
            orientation,
            strength: 1.0,
        }
    }

    fn board_corners(cols: usize, rows: usize, spacing: f32) -> Vec<Corner> {
        let mut corners = Vec::new();
        for j in 0..rows {
            for i in 0..cols {
                let orientation = if (i + j) % 2 == 0 {
                    FRAC_PI_4
                } else {
                    3.0 * FRAC_PI_4
                };
                corners.push(make_corner(
                    i as f32 * spacing,
                    j as f32 * spacing,
                    orientation,
                ));
            }
        }
        corners
    }

    #[test]
    fn assembles_regular_lattice_row_major() {
        let corners = board_corners(4, 3, 10.0);
        let grid = assemble_grid(&corners, 4, 3, &GridParams::default()).expect("grid");

        assert_eq!(grid.cols, 4);
        assert_eq!(grid.rows, 3);
        for v in 0..3 {
            for u in 0..4 {
                let p = grid.positions[v * 4 + u];
                assert!((p.x - u as f64 * 10.0).abs() < 1e-4);
                assert!((p.y - v as f64 * 10.0).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn shuffled_input_order_does_not_matter() {
        let mut corners = board_corners(4, 3, 10.0);
        corners.reverse();
        corners.swap(2, 7);
        let grid = assemble_grid(&corners, 4, 3, &GridParams::default()).expect("grid");
        assert!((grid.positions[0].x).abs() < 1e-4);
        assert!((grid.positions[0].y).abs() < 1e-4);
        let last = grid.positions[11];
        assert!((last.x - 30.0).abs() < 1e-4);
        assert!((last.y - 20.0).abs() < 1e-4);
    }

    #[test]
    fn incomplete_lattice_is_rejected() {
        let mut corners = board_corners(4, 3, 10.0);
        corners.remove(5); // punch a hole in the middle
        assert!(assemble_grid(&corners, 4, 3, &GridParams::default()).is_none());
    }

    #[test]
    fn wrong_lattice_dimensions_are_rejected() {
        let corners = board_corners(4, 4, 10.0);
        assert!(assemble_grid(&corners, 4, 3, &GridParams::default()).is_none());
    }

    #[test]
    fn stray_corners_outside_board_are_ignored() {
        let mut corners = board_corners(4, 3, 10.0);
        // Lone corner far away with no valid neighbors.
        corners.push(make_corner(500.0, 500.0, FRAC_PI_4));
        let grid = assemble_grid(&corners, 4, 3, &GridParams::default()).expect("grid");
        assert_eq!(grid.positions.len(), 12);
    }

    #[test]
    fn non_orthogonal_orientations_do_not_link() {
        let corners = vec![
            make_corner(0.0, 0.0, FRAC_PI_4),
            make_corner(10.0, 0.0, FRAC_PI_4),
        ];
        let params = GridParams {
            auto_spacing: false,
            min_spacing_pix: 5.0,
            max_spacing_pix: 15.0,
            k_neighbors: 2,
            ..Default::default()
        };
        let graph = NeighborGraph::new(&corners, &params);
        assert!(graph.links[0].is_empty());
        assert!(graph.links[1].is_empty());
    }

    #[test]
    fn keeps_best_candidate_per_direction() {
        let corners = vec![
            make_corner(0.0, 0.0, FRAC_PI_4),
            make_corner(10.0, 0.0, 3.0 * FRAC_PI_4),
            make_corner(12.0, 0.0, 3.0 * FRAC_PI_4 + 0.1),
            make_corner(-10.0, 0.0, 3.0 * FRAC_PI_4),
        ];
        let params = GridParams {
            auto_spacing: false,
            min_spacing_pix: 5.0,
            max_spacing_pix: 15.0,
            k_neighbors: 4,
            ..Default::default()
        };
        let graph = NeighborGraph::new(&corners, &params);

        let dirs: Vec<_> = graph.links[0].iter().map(|l| (l.direction, l.index)).collect();
        assert_eq!(dirs.len(), 2);
        assert!(dirs.contains(&(LinkDirection::Right, 1)));
        assert!(dirs.contains(&(LinkDirection::Left, 3)));
    }
}
