//! Neighbor queries and strength aggregation against brute-force
//! references, with and without periodic boundaries.

use cline_core::{Individual, QueryError, SpatialBounds, SubpopId, Subpopulation};
use cline_engine::{InteractionConfig, InteractionFunction, InteractionType};
use cline_space::{minimum_image, Periodicity, Spatiality};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const EXTENT: f64 = 12.0;
const MAX_DISTANCE: f64 = 3.0;

fn random_subpop(seed: u64, n: usize) -> Subpopulation {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    Subpopulation {
        id: SubpopId(1),
        first_male_index: n,
        bounds: SpatialBounds::cubic(EXTENT),
        individuals: (0..n)
            .map(|_| {
                Individual::at(
                    rng.gen::<f64>() * EXTENT,
                    rng.gen::<f64>() * EXTENT,
                    0.0,
                )
            })
            .collect(),
    }
}

fn engine(periodic: bool) -> InteractionType {
    let periodicity = if periodic {
        Periodicity {
            x: true,
            y: true,
            z: false,
        }
    } else {
        Periodicity::NONE
    };
    let mut it = InteractionType::new(InteractionConfig {
        spatiality: Spatiality::Xy,
        max_distance: MAX_DISTANCE,
        periodicity,
        ..InteractionConfig::default()
    })
    .unwrap();
    it.set_interaction_function(InteractionFunction::Normal {
        strength: 1.0,
        sigma: 1.5,
    })
    .unwrap();
    it
}

fn brute_distance(sp: &Subpopulation, i: usize, j: usize, periodic: bool) -> f64 {
    let a = [sp.individuals[i].x, sp.individuals[i].y];
    let b = [sp.individuals[j].x, sp.individuals[j].y];
    let wrap = [periodic, periodic, false];
    minimum_image(&a, &b, 2, wrap, [EXTENT, EXTENT, 0.0])
}

#[test]
fn nearest_neighbors_match_brute_force() {
    for periodic in [false, true] {
        let sp = random_subpop(301, 80);
        let mut it = engine(periodic);
        it.evaluate([&sp], false).unwrap();

        for focal in [0, 41, 79] {
            let mut by_distance: Vec<usize> = (0..sp.len()).filter(|&j| j != focal).collect();
            by_distance.sort_by(|&a, &b| {
                brute_distance(&sp, focal, a, periodic)
                    .partial_cmp(&brute_distance(&sp, focal, b, periodic))
                    .unwrap()
            });
            let expected: Vec<usize> = by_distance
                .into_iter()
                .filter(|&j| brute_distance(&sp, focal, j, periodic) <= MAX_DISTANCE)
                .take(5)
                .collect();

            let mut found = it.nearest_neighbors(&sp, focal, 5).unwrap();
            found.sort_unstable();
            let mut expected_sorted = expected.clone();
            expected_sorted.sort_unstable();
            assert_eq!(found, expected_sorted, "periodic = {periodic}, focal = {focal}");
        }
    }
}

#[test]
fn single_nearest_neighbor_is_radius_filtered() {
    // Two individuals farther apart than max_distance: no neighbor.
    let sp = Subpopulation {
        id: SubpopId(1),
        first_male_index: 2,
        bounds: SpatialBounds::cubic(EXTENT),
        individuals: vec![Individual::at(0.0, 0.0, 0.0), Individual::at(9.0, 0.0, 0.0)],
    };
    let mut it = engine(false);
    it.evaluate([&sp], false).unwrap();
    assert!(it.nearest_neighbors(&sp, 0, 1).unwrap().is_empty());
}

#[test]
fn neighbors_of_point_do_not_exclude_anyone() {
    let sp = Subpopulation {
        id: SubpopId(1),
        first_male_index: 3,
        bounds: SpatialBounds::cubic(EXTENT),
        individuals: vec![
            Individual::at(1.0, 1.0, 0.0),
            Individual::at(1.5, 1.0, 0.0),
            Individual::at(11.0, 11.0, 0.0),
        ],
    };
    let mut it = engine(false);
    it.evaluate([&sp], false).unwrap();

    let mut found = it
        .nearest_neighbors_of_point(&sp, &[1.2, 1.0], 10)
        .unwrap();
    found.sort_unstable();
    assert_eq!(found, vec![0, 1]);

    // A short point vector is a shape error.
    match it.nearest_neighbors_of_point(&sp, &[1.2], 10) {
        Err(QueryError::PointLength {
            expected: 2,
            given: 1,
        }) => {}
        other => panic!("expected PointLength, got {other:?}"),
    }
}

#[test]
fn distance_to_point_uses_the_periodic_metric() {
    let sp = Subpopulation {
        id: SubpopId(1),
        first_male_index: 1,
        bounds: SpatialBounds::cubic(EXTENT),
        individuals: vec![Individual::at(0.5, 6.0, 0.0)],
    };
    let mut it = engine(true);
    it.evaluate([&sp], false).unwrap();

    let d = it.distance_to_point(&sp, &[0], &[11.5, 6.0]).unwrap()[0];
    assert!((d - 1.0).abs() < 1e-12, "wrapped point distance = {d}");

    // Out-of-box points are rejected along periodic axes.
    match it.distance_to_point(&sp, &[0], &[12.5, 6.0]) {
        Err(QueryError::OutOfPeriodicBounds { axis: 'x', .. }) => {}
        other => panic!("expected OutOfPeriodicBounds, got {other:?}"),
    }
}

#[test]
fn totals_match_the_strength_rows() {
    for periodic in [false, true] {
        let sp = random_subpop(77, 70);
        let mut it = engine(periodic);
        it.evaluate([&sp], false).unwrap();

        let focals: Vec<usize> = (0..sp.len()).collect();
        let totals = it.total_of_neighbor_strengths(&sp, &focals).unwrap();

        for focal in 0..sp.len() {
            let row = it.strength(&sp, &[focal], None).unwrap();
            let row_sum: f64 = row.iter().sum();
            assert!(
                (totals[focal] - row_sum).abs() < 1e-9,
                "periodic = {periodic}, focal = {focal}: total {} vs row sum {}",
                totals[focal],
                row_sum,
            );
        }
    }
}

#[test]
fn periodic_totals_count_each_neighbor_once() {
    // A deliberately dense cluster near the box corner, where periodic
    // replicates crowd every quadrant of the wrap.
    let mut rng = ChaCha8Rng::seed_from_u64(13);
    let individuals: Vec<Individual> = (0..50)
        .map(|_| {
            let x = (rng.gen::<f64>() * 2.0 + EXTENT - 1.0) % EXTENT;
            let y = (rng.gen::<f64>() * 2.0 + EXTENT - 1.0) % EXTENT;
            Individual::at(x, y, 0.0)
        })
        .collect();
    let sp = Subpopulation {
        id: SubpopId(1),
        first_male_index: individuals.len(),
        bounds: SpatialBounds::cubic(EXTENT),
        individuals,
    };

    let mut it = engine(true);
    it.evaluate([&sp], false).unwrap();

    let function = InteractionFunction::Normal {
        strength: 1.0,
        sigma: 1.5,
    };
    for focal in 0..sp.len() {
        let total = it.total_of_neighbor_strengths(&sp, &[focal]).unwrap()[0];
        let mut expected = 0.0;
        for j in 0..sp.len() {
            if j == focal {
                continue;
            }
            let d = brute_distance(&sp, focal, j, true);
            if d <= MAX_DISTANCE {
                expected += function.value_at(d, MAX_DISTANCE);
            }
        }
        assert!(
            (total - expected).abs() < 1e-9,
            "focal {focal}: total {total} vs brute-force {expected}"
        );
    }
}

#[test]
fn draw_by_strength_returns_empty_for_zero_neighborhood() {
    let sp = Subpopulation {
        id: SubpopId(1),
        first_male_index: 2,
        bounds: SpatialBounds::cubic(EXTENT),
        individuals: vec![Individual::at(0.0, 0.0, 0.0), Individual::at(9.0, 0.0, 0.0)],
    };
    let mut it = engine(false);
    it.evaluate([&sp], false).unwrap();

    let mut rng = ChaCha8Rng::seed_from_u64(2);
    assert!(it.draw_by_strength(&sp, 0, 100, &mut rng).unwrap().is_empty());
}

#[test]
fn draw_by_strength_prefers_stronger_neighbors() {
    // One close neighbor and one at the edge of range: the Gaussian
    // kernel weights the close one far more heavily.
    let sp = Subpopulation {
        id: SubpopId(1),
        first_male_index: 3,
        bounds: SpatialBounds::cubic(EXTENT),
        individuals: vec![
            Individual::at(5.0, 5.0, 0.0),
            Individual::at(5.3, 5.0, 0.0),
            Individual::at(7.9, 5.0, 0.0),
        ],
    };
    let mut it = engine(false);
    it.evaluate([&sp], false).unwrap();

    let mut rng = ChaCha8Rng::seed_from_u64(8);
    let draws = it.draw_by_strength(&sp, 0, 2000, &mut rng).unwrap();
    assert_eq!(draws.len(), 2000);

    let close = draws.iter().filter(|&&d| d == 1).count();
    let far = draws.iter().filter(|&&d| d == 2).count();
    assert_eq!(close + far, 2000);
    assert!(
        close > far * 2,
        "close neighbor drawn {close} times, far {far}"
    );
}
