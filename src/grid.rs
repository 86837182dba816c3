//! The directed graph ants walk on.
//!
//! A [`Grid`] keeps the geometry the heuristics need (cell positions and
//! intrinsic values). Workers never see it; they receive a [`Topology`], the
//! index-only form with the same stable cell and edge indices.

use crate::{errors::AcoError, point2::Point2};
use log::debug;

#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    pub position: Point2,
    /// Intrinsic desirability of walking onto this cell.
    pub value: f64,
    /// Indices of the edges leaving this cell.
    pub edges: Vec<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Edge {
    /// Origin cell.
    pub u: usize,
    /// Destination cell.
    pub v: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Grid {
    cells: Vec<Cell>,
    edges: Vec<Edge>,
}

/// What a worker needs to walk the grid: outgoing edge indices per cell and
/// the destination cell per edge.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Topology {
    pub cells: Vec<Vec<usize>>,
    pub edges: Vec<usize>,
}

impl Grid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a cell without edges and returns its index.
    pub fn add_cell(&mut self, position: Point2, value: f64) -> usize {
        self.cells.push(Cell {
            position,
            value,
            edges: Vec::new(),
        });
        self.cells.len() - 1
    }

    /// Adds a directed edge `u -> v` and returns its index.
    pub fn add_edge(&mut self, u: usize, v: usize) -> Result<usize, AcoError> {
        let cells = self.cells.len();
        let edge = self.edges.len();
        for cell in [u, v] {
            if cell >= cells {
                return Err(AcoError::InvalidEdge { edge, cell, cells });
            }
        }

        self.edges.push(Edge { u, v });
        self.cells[u].edges.push(edge);
        Ok(edge)
    }

    /// A `cols` x `rows` lattice where every cell links to its left, right,
    /// upper and lower neighbours. Cells are indexed row by row.
    pub fn rectangular(cols: usize, rows: usize, spacing: f64) -> Self {
        let mut grid = Grid::new();
        for row in 0..rows {
            for col in 0..cols {
                grid.add_cell(
                    Point2::new(
                        (col as f64 + 0.5) * spacing,
                        (row as f64 + 0.5) * spacing,
                    ),
                    1.0,
                );
            }
        }

        let index = |col: usize, row: usize| row * cols + col;
        for row in 0..rows {
            for col in 0..cols {
                let neighbours = [
                    col.checked_sub(1).map(|c| (c, row)),
                    (col + 1 < cols).then(|| (col + 1, row)),
                    row.checked_sub(1).map(|r| (col, r)),
                    (row + 1 < rows).then(|| (col, row + 1)),
                ];
                for (c, r) in neighbours.iter().flatten() {
                    let (u, v) = (index(col, row), index(*c, *r));
                    grid.edges.push(Edge { u, v });
                    let edge = grid.edges.len() - 1;
                    grid.cells[u].edges.push(edge);
                }
            }
        }

        debug!(
            "built a {}x{} lattice with {} edges",
            cols,
            rows,
            grid.edges.len()
        );

        grid
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn cell(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    pub fn edge(&self, index: usize) -> Option<&Edge> {
        self.edges.get(index)
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn set_value(&mut self, cell: usize, value: f64) -> Result<(), AcoError> {
        let cells = self.cells.len();
        let cell = self
            .cells
            .get_mut(cell)
            .ok_or(AcoError::InvalidCell { cell, cells })?;
        cell.value = value;
        Ok(())
    }

    /// Nearest cell to a position, if the grid has any cells.
    pub fn lookup(&self, position: Point2) -> Option<usize> {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, cell)| (i, cell.position.distance_to(&position)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }

    pub fn topology(&self) -> Topology {
        Topology {
            cells: self.cells.iter().map(|cell| cell.edges.clone()).collect(),
            edges: self.edges.iter().map(|edge| edge.v).collect(),
        }
    }
}

impl Topology {
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}
