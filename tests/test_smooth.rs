mod common;
use common::{default_segments, golden_prototypes, synthetic_prototypes, synthetic_recording};
use microstates::backfit::{backfit, RankedAssignment};
use microstates::smooth::{count_short_runs, smooth};
use microstates::runs::run_length_encode;
use ndarray::Array2;

#[test]
fn min_run_one_is_a_no_op() {
    let protos = synthetic_prototypes(8, 4);
    let rec = synthetic_recording(&protos, &default_segments(4), 250);
    let mut fit = backfit(rec.data.view(), &rec.ch_names, &protos).unwrap();
    let before = fit.assignment.clone();

    let s = smooth(&mut fit.assignment, 1, 1000);
    assert_eq!(fit.assignment, before);
    assert_eq!(s.passes, 0);
    assert_eq!(s.rotations, 0);
}

#[test]
fn isolated_blip_is_removed() {
    // 10 × A, 1 × B, 10 × A using the golden prototypes.
    let a = [1.0, 1.0, -1.0, -1.0];
    let b = [1.0, -1.0, 1.0, -1.0];
    let samples = Array2::from_shape_fn((21, 4), |(t, c)| if t == 10 { b[c] } else { a[c] * (1.0 + t as f64) });
    let mut fit = backfit(samples.view(), &[], &golden_prototypes()).unwrap();
    assert_eq!(fit.assignment.best()[10], 1);

    let s = smooth(&mut fit.assignment, 2, 1000);
    assert_eq!(fit.assignment.best(), vec![0; 21]);
    assert_eq!(s.rotations, 1);
    assert_eq!(s.unresolved_runs, 0);
}

#[test]
fn blip_with_many_candidates_takes_next_best() {
    let mut labels = vec![0; 10];
    labels.push(1);
    labels.extend(vec![0; 10]);
    let mut a = RankedAssignment::from_labels(&labels, 4);
    smooth(&mut a, 2, 1000);
    let runs = run_length_encode(&a.best());
    assert_eq!(runs.len(), 1);
    assert!(runs.iter().all(|r| r.len >= 2));
}

#[test]
fn smoothing_reports_what_is_left() {
    let protos = synthetic_prototypes(8, 3);
    let rec = synthetic_recording(&protos, &default_segments(3), 250);
    let mut fit = backfit(rec.data.view(), &rec.ch_names, &protos).unwrap();
    let s = smooth(&mut fit.assignment, 3, 50);
    let labels = fit.assignment.best();
    assert_eq!(s.unresolved_runs, count_short_runs(&labels, 3));
    assert_eq!(labels.len(), rec.n_samples());
    assert!(s.passes > 0);
}

#[test]
fn long_segments_survive_smoothing() {
    let protos = synthetic_prototypes(8, 3);
    let segs = default_segments(3);
    let rec = synthetic_recording(&protos, &segs, 250);
    let mut fit = backfit(rec.data.view(), &rec.ch_names, &protos).unwrap();
    smooth(&mut fit.assignment, 3, 1000);
    let labels = fit.assignment.best();

    // The middle of every long segment keeps its generating state.
    let mut t = 0;
    for &(state, len) in &segs {
        if len >= 9 {
            assert_eq!(labels[t + len / 2], state, "segment at {t} relabelled");
        }
        t += len;
    }
}
