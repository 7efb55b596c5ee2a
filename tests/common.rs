/// Shared synthetic fixtures.
use microstates::{PrototypeSet, Recording};
use ndarray::{array, Array2};

#[allow(unused)]
pub fn labels(n: usize) -> Vec<String> {
    const NAMES: [&str; 12] = ["Fz", "Cz", "Pz", "Oz", "F3", "F4", "C3", "C4", "P3", "P4", "O1", "O2"];
    (0..n)
        .map(|i| NAMES.get(i).map_or_else(|| format!("E{i}"), |s| s.to_string()))
        .collect()
}

/// Two orthogonal 4-channel prototypes: [1,1,-1,-1] and [1,-1,1,-1].
#[allow(unused)]
pub fn golden_prototypes() -> PrototypeSet {
    PrototypeSet::new(labels(4), array![[1.0, 1.0], [1.0, -1.0], [-1.0, 1.0], [-1.0, -1.0]]).unwrap()
}

/// Six samples whose best labels are [0, 0, 1, 1, 1, 0].
///
/// Rows 1 and 4 are polarity-inverted prototypes; row 5 is a mixture with
/// r = 3/√10 to state 0 and r = 1/√10 to state 1.
#[allow(unused)]
pub fn golden_samples() -> Array2<f64> {
    array![
        [2.0, 2.0, -2.0, -2.0],
        [-1.0, -1.0, 1.0, 1.0],
        [3.0, -3.0, 3.0, -3.0],
        [1.0, -1.0, 1.0, -1.0],
        [-1.0, 1.0, -1.0, 1.0],
        [2.0, 1.0, -1.0, -2.0],
    ]
}

#[allow(unused)]
pub fn golden_recording() -> Recording {
    Recording::new(golden_samples(), labels(4), 1000)
}

/// `k` smooth, distinct prototype maps over `n_ch` channels.
#[allow(unused)]
pub fn synthetic_prototypes(n_ch: usize, k: usize) -> PrototypeSet {
    let maps = Array2::from_shape_fn((n_ch, k), |(c, s)| {
        ((c as f64 + 0.5) * (s as f64 + 1.0) * 0.8).sin() + 0.3 * ((s * 7 + c) as f64).cos()
    });
    PrototypeSet::new(labels(n_ch), maps).unwrap()
}

/// Concatenated segments `(state, length)`, each a scaled prototype with
/// alternating polarity and a little deterministic noise.
#[allow(unused)]
pub fn synthetic_recording(prototypes: &PrototypeSet, segments: &[(usize, usize)], sfreq: u32) -> Recording {
    let n_ch = prototypes.n_channels();
    let n: usize = segments.iter().map(|s| s.1).sum();
    let maps = prototypes.maps();
    let mut data = Array2::<f64>::zeros((n, n_ch));
    let mut t = 0;
    for (i, &(state, len)) in segments.iter().enumerate() {
        let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
        for _ in 0..len {
            let amp = 10.0 + 4.0 * (t as f64 * 0.3).sin();
            for c in 0..n_ch {
                let noise = 0.4 * (t as f64 * 13.7 + c as f64 * 2.1).sin();
                data[[t, c]] = sign * amp * maps[[c, state]] + noise;
            }
            t += 1;
        }
    }
    Recording::new(data, labels(n_ch), sfreq)
}

/// A segment layout that visits every state several times.
#[allow(unused)]
pub fn default_segments(k: usize) -> Vec<(usize, usize)> {
    let lens = [12, 1, 20, 2, 15, 9, 1, 30, 6, 18];
    (0..30).map(|i| (i % k, lens[i % lens.len()])).collect()
}
