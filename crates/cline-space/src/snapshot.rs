//! The position snapshot taken at evaluation time.

use crate::periodic::Periodicity;
use crate::spatiality::Spatiality;
use crate::POSITION_STRIDE;
use cline_core::{EvaluateError, Subpopulation};
use tracing::trace;

/// A subpopulation's coordinates, packed and frozen for one evaluation.
///
/// This is the only structure in the engine built from the original x/y/z
/// coordinates; its construction is the sole point where the identity of
/// the chosen axes matters. Downstream code sees packed slots and an
/// integer dimension count.
///
/// The snapshot is immutable for the lifetime of the evaluation. A host
/// that moves individuals must invalidate and re-evaluate; the engine
/// never re-reads host coordinates.
#[derive(Clone, Debug)]
pub struct PositionSnapshot {
    positions: Vec<f64>,
    bounds: [f64; 3],
    count: usize,
    dims: usize,
}

impl PositionSnapshot {
    /// Capture the chosen coordinates of every individual.
    ///
    /// For every packed dimension whose axis is periodic, verifies that
    /// each coordinate lies in `[0, bound]`; the first violation fails the
    /// capture with [`EvaluateError::OutOfPeriodicBounds`]. Bounds of
    /// non-chosen axes are not consulted.
    pub fn capture(
        spatiality: Spatiality,
        periodicity: Periodicity,
        subpop: &Subpopulation,
    ) -> Result<Self, EvaluateError> {
        let axes = spatiality.axes();
        let dims = axes.len();
        debug_assert!(dims > 0, "non-spatial interactions have no snapshot");

        let count = subpop.len();
        let mut positions = vec![0.0; count * POSITION_STRIDE];
        let mut bounds = [0.0; 3];
        for (slot, axis) in axes.iter().enumerate() {
            bounds[slot] = subpop.bounds.for_axis(*axis);
        }
        let packed_periodic = periodicity.packed(spatiality);

        for (i, individual) in subpop.individuals.iter().enumerate() {
            let base = i * POSITION_STRIDE;
            for (slot, axis) in axes.iter().enumerate() {
                let coord = match axis {
                    'x' => individual.x,
                    'y' => individual.y,
                    _ => individual.z,
                };
                if packed_periodic[slot] && !(0.0..=bounds[slot]).contains(&coord) {
                    return Err(EvaluateError::OutOfPeriodicBounds {
                        subpop: subpop.id,
                        individual: i,
                        axis: *axis,
                        coordinate: coord,
                        bound: bounds[slot],
                    });
                }
                positions[base + slot] = coord;
            }
        }

        trace!(
            subpop = %subpop.id,
            count,
            dims,
            "captured position snapshot"
        );

        Ok(Self {
            positions,
            bounds,
            count,
            dims,
        })
    }

    /// Number of individuals in the snapshot.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Number of packed dimensions.
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// The packed coordinates of one individual (always three slots).
    #[inline]
    pub fn point(&self, index: usize) -> &[f64] {
        &self.positions[index * POSITION_STRIDE..index * POSITION_STRIDE + POSITION_STRIDE]
    }

    /// The whole packed buffer, stride [`POSITION_STRIDE`].
    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    /// Packed upper bounds of the chosen axes.
    pub fn bounds(&self) -> [f64; 3] {
        self.bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cline_core::{Individual, SpatialBounds, SubpopId};

    fn subpop(individuals: Vec<Individual>) -> Subpopulation {
        Subpopulation {
            id: SubpopId(1),
            first_male_index: 0,
            bounds: SpatialBounds {
                x1: 10.0,
                y1: 20.0,
                z1: 30.0,
            },
            individuals,
        }
    }

    #[test]
    fn packs_chosen_axes_from_slot_zero() {
        let sp = subpop(vec![Individual::at(1.0, 2.0, 3.0), Individual::at(4.0, 5.0, 6.0)]);

        let snap = PositionSnapshot::capture(Spatiality::Yz, Periodicity::NONE, &sp).unwrap();
        assert_eq!(snap.dims(), 2);
        assert_eq!(snap.point(0)[..2], [2.0, 3.0]);
        assert_eq!(snap.point(1)[..2], [5.0, 6.0]);
        // Packed bounds follow the chosen axes.
        assert_eq!(snap.bounds()[..2], [20.0, 30.0]);
    }

    #[test]
    fn one_dimensional_z_lands_in_slot_zero() {
        let sp = subpop(vec![Individual::at(1.0, 2.0, 3.0)]);
        let snap = PositionSnapshot::capture(Spatiality::Z, Periodicity::NONE, &sp).unwrap();
        assert_eq!(snap.point(0)[0], 3.0);
        assert_eq!(snap.bounds()[0], 30.0);
    }

    #[test]
    fn periodic_axis_rejects_out_of_bounds_coordinate() {
        let sp = subpop(vec![Individual::at(1.0, 25.0, 3.0)]);
        let wrap_y = Periodicity {
            x: false,
            y: true,
            z: false,
        };
        match PositionSnapshot::capture(Spatiality::Xy, wrap_y, &sp) {
            Err(EvaluateError::OutOfPeriodicBounds {
                individual,
                axis,
                coordinate,
                bound,
                ..
            }) => {
                assert_eq!(individual, 0);
                assert_eq!(axis, 'y');
                assert_eq!(coordinate, 25.0);
                assert_eq!(bound, 20.0);
            }
            other => panic!("expected OutOfPeriodicBounds, got {other:?}"),
        }
    }

    #[test]
    fn non_periodic_axis_accepts_out_of_bounds_coordinate() {
        // Only periodic axes are bounds-checked.
        let sp = subpop(vec![Individual::at(-5.0, 25.0, 3.0)]);
        assert!(PositionSnapshot::capture(Spatiality::Xy, Periodicity::NONE, &sp).is_ok());
    }

    #[test]
    fn coordinate_exactly_at_bound_is_accepted() {
        let sp = subpop(vec![Individual::at(10.0, 0.0, 0.0)]);
        let wrap_x = Periodicity {
            x: true,
            y: false,
            z: false,
        };
        let snap = PositionSnapshot::capture(Spatiality::X, wrap_x, &sp).unwrap();
        assert_eq!(snap.point(0)[0], 10.0);
    }
}
