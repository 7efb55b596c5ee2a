//! Per-map field statistics and normalisation.
//!
//! A *map* is the vector of voltages across all channels at one instant (a
//! row of the `[N, C]` sample matrix, or a column of the `[C, K]` prototype
//! matrix).
//!
//! `gfp`               — population SD across channels (ddof = 0)
//! `gfp_sample`        — sample SD across channels (ddof = 1), used only for
//!                       the per-state mean GFP statistic
//! `normalize_map_inplace` — map = (map − mean(map)) / gfp(map)
//!
//! A map with zero GFP cannot be normalised; it is filled with NaN so that
//! every distance computed from it is non-finite and downstream statistics
//! can skip it.
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut1, Axis};

/// Sum of squared deviations from the mean, plus the mean itself.
fn centered_ss(map: ArrayView1<f64>) -> (f64, f64) {
    let n = map.len() as f64;
    let mean = map.sum() / n;
    let ss = map.iter().map(|&v| (v - mean) * (v - mean)).sum::<f64>();
    (ss, mean)
}

/// Global field power: population standard deviation across channels.
pub fn gfp(map: ArrayView1<f64>) -> f64 {
    if map.is_empty() {
        return 0.0;
    }
    let (ss, _) = centered_ss(map);
    (ss / map.len() as f64).sqrt()
}

/// Standard deviation across channels with the `C − 1` denominator.
pub fn gfp_sample(map: ArrayView1<f64>) -> f64 {
    if map.len() < 2 {
        return 0.0;
    }
    let (ss, _) = centered_ss(map);
    (ss / (map.len() - 1) as f64).sqrt()
}

/// GFP of every row of `samples` ([N, C]).
pub fn global_field_power(samples: ArrayView2<f64>) -> Array1<f64> {
    samples.rows().into_iter().map(gfp).collect()
}

/// Subtract the cross-channel mean and divide by GFP, in place.
/// Returns the GFP the map had before normalisation.
pub fn normalize_map_inplace(mut map: ArrayViewMut1<f64>) -> f64 {
    let n = map.len() as f64;
    let (ss, mean) = centered_ss(map.view());
    let g = (ss / n).sqrt();
    if g > 0.0 && g.is_finite() {
        map.mapv_inplace(|v| (v - mean) / g);
    } else {
        map.fill(f64::NAN);
    }
    g
}

/// Normalise every map laid out along `axis` of `data`.
///
/// Samples (`[N, C]`) hold maps in rows, so pass `Axis(0)`;
/// prototypes (`[C, K]`) hold maps in columns, so pass `Axis(1)`.
pub fn normalize_maps(data: ArrayView2<f64>, axis: Axis) -> Array2<f64> {
    let mut out = data.to_owned();
    for map in out.axis_iter_mut(axis) {
        normalize_map_inplace(map);
    }
    out
}
