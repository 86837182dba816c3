//! Weighted sources and targets.
//!
//! Spots live in a densely indexed [`Spots`] collection. After every change
//! the normalized weights `w` sum to one and each spot's `index` equals its
//! position in the collection.

use crate::{errors::AcoError, message::SpotRef};

#[derive(Clone, Debug, PartialEq)]
pub struct Spot {
    pub cell: usize,
    pub weight: f64,
    /// Selection probability, `weight` over the sum of all weights.
    pub w: f64,
    /// Position in the owning collection.
    pub index: usize,
}

impl Spot {
    pub fn new(cell: usize, weight: f64) -> Result<Self, AcoError> {
        check_weight(weight)?;
        Ok(Self {
            cell,
            weight,
            w: 0.0,
            index: 0,
        })
    }
}

pub type Source = Spot;

#[derive(Clone, Debug, PartialEq)]
pub struct Target {
    pub spot: Spot,
    /// One score per grid edge.
    pub heuristic: Vec<f64>,
    /// This target's trail layer, one value per grid edge.
    pub trails: Vec<f64>,
}

impl Target {
    pub fn new(spot: Spot, heuristic: Vec<f64>, trails: Vec<f64>) -> Self {
        Self {
            spot,
            heuristic,
            trails,
        }
    }

    pub fn cell(&self) -> usize {
        self.spot.cell
    }

    pub fn w(&self) -> f64 {
        self.spot.w
    }
}

/// Partial change to a spot.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SpotUpdate {
    pub cell: Option<usize>,
    pub weight: Option<f64>,
}

pub trait Weighted {
    fn spot(&self) -> &Spot;
    fn spot_mut(&mut self) -> &mut Spot;
}

impl Weighted for Spot {
    fn spot(&self) -> &Spot {
        self
    }

    fn spot_mut(&mut self) -> &mut Spot {
        self
    }
}

impl Weighted for Target {
    fn spot(&self) -> &Spot {
        &self.spot
    }

    fn spot_mut(&mut self) -> &mut Spot {
        &mut self.spot
    }
}

pub(crate) fn check_weight(weight: f64) -> Result<(), AcoError> {
    if weight.is_finite() && weight > 0.0 {
        Ok(())
    } else {
        Err(AcoError::InvalidWeight(weight))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Spots<T> {
    spots: Vec<T>,
}

impl<T> Default for Spots<T> {
    fn default() -> Self {
        Self { spots: Vec::new() }
    }
}

impl<T: Weighted> Spots<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a spot and returns its position.
    pub fn add(&mut self, spot: T) -> usize {
        self.spots.push(spot);
        self.reindex();
        self.normalize();
        self.spots.len() - 1
    }

    pub fn remove(&mut self, index: usize) -> Result<T, AcoError> {
        if index >= self.spots.len() {
            return Err(AcoError::UnknownSpot(index));
        }

        let removed = self.spots.remove(index);
        self.reindex();
        self.normalize();
        Ok(removed)
    }

    pub fn set_weight(&mut self, index: usize, weight: f64) -> Result<(), AcoError> {
        check_weight(weight)?;
        let spot = self
            .spots
            .get_mut(index)
            .ok_or(AcoError::UnknownSpot(index))?;
        spot.spot_mut().weight = weight;
        self.normalize();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.spots.clear();
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.spots.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.spots.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.spots.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.spots.iter_mut()
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.spots
    }

    pub fn len(&self) -> usize {
        self.spots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spots.is_empty()
    }

    pub fn position_of_cell(&self, cell: usize) -> Option<usize> {
        self.spots.iter().position(|s| s.spot().cell == cell)
    }

    /// What workers need to pick a spot: its cell and selection probability.
    pub fn refs(&self) -> Vec<SpotRef> {
        self.spots
            .iter()
            .map(|s| SpotRef {
                cell: s.spot().cell,
                w: s.spot().w,
            })
            .collect()
    }

    fn normalize(&mut self) {
        let sum: f64 = self.spots.iter().map(|s| s.spot().weight).sum();
        self.spots.iter_mut().for_each(|s| {
            let spot = s.spot_mut();
            spot.w = spot.weight / sum;
        });
    }

    fn reindex(&mut self) {
        self.spots
            .iter_mut()
            .enumerate()
            .for_each(|(index, s)| s.spot_mut().index = index);
    }
}
