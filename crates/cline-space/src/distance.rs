//! Distance kernels over packed coordinates.
//!
//! All functions take slices of at least `dims` packed coordinates; they
//! never inspect the original axis identity. Callers with periodic axes
//! use [`minimum_image`], which corrects each wrapping axis to its
//! shortest displacement before the L2 reduction.

/// Squared Euclidean distance over the first `dims` packed coordinates.
///
/// Used by the k-d tree queries, which prune on squared distances and
/// only take a square root when a pair actually qualifies.
#[inline]
pub fn dist_sq(a: &[f64], b: &[f64], dims: usize) -> f64 {
    let mut d = 0.0;
    for k in 0..dims {
        let t = a[k] - b[k];
        d += t * t;
    }
    d
}

/// Euclidean distance over the first `dims` packed coordinates.
#[inline]
pub fn euclidean(a: &[f64], b: &[f64], dims: usize) -> f64 {
    match dims {
        1 => (a[0] - b[0]).abs(),
        _ => dist_sq(a, b, dims).sqrt(),
    }
}

/// Shortest displacement along one axis of extent `bound` that wraps.
///
/// `min(|delta|, bound - |delta|)`: either the direct separation or the
/// separation through the wrap, whichever is shorter.
#[inline]
fn wrap_displacement(a: f64, b: f64, bound: f64) -> f64 {
    let direct = (a - b).abs();
    direct.min(bound - direct)
}

/// Minimum-image Euclidean distance over the first `dims` packed
/// coordinates.
///
/// Axes flagged in `periodic` use the wrap-corrected displacement against
/// the matching entry of `bounds`; other axes use the raw difference.
/// With no periodic axis this reduces exactly to [`euclidean`].
#[inline]
pub fn minimum_image(
    a: &[f64],
    b: &[f64],
    dims: usize,
    periodic: [bool; 3],
    bounds: [f64; 3],
) -> f64 {
    if dims == 1 {
        return if periodic[0] {
            wrap_displacement(a[0], b[0], bounds[0])
        } else {
            (a[0] - b[0]).abs()
        };
    }
    let mut d = 0.0;
    for k in 0..dims {
        let t = if periodic[k] {
            wrap_displacement(a[k], b[k], bounds[k])
        } else {
            a[k] - b[k]
        };
        d += t * t;
    }
    d.sqrt()
}
