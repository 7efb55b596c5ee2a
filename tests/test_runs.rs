use microstates::runs::{expand_runs, run_labels, run_length_encode};

fn sequences() -> Vec<Vec<usize>> {
    vec![
        vec![],
        vec![3],
        vec![0, 0, 0, 0],
        vec![0, 1, 0, 1, 0, 1],
        vec![2, 2, 1, 1, 1, 0, 2, 2, 2, 2, 1],
        (0..200).map(|i| (i / 7 + i % 3) % 4).collect(),
    ]
}

#[test]
fn lengths_sum_to_sequence_length() {
    for seq in sequences() {
        let runs = run_length_encode(&seq);
        assert_eq!(runs.iter().map(|r| r.len).sum::<usize>(), seq.len());
    }
}

#[test]
fn expansion_restores_sequence() {
    for seq in sequences() {
        assert_eq!(expand_runs(&run_length_encode(&seq)), seq);
    }
}

#[test]
fn adjacent_runs_differ_and_are_contiguous() {
    for seq in sequences() {
        let runs = run_length_encode(&seq);
        for w in runs.windows(2) {
            assert_ne!(w[0].label, w[1].label);
            assert_eq!(w[0].end(), w[1].start);
        }
        let collapsed = run_labels(&runs);
        assert!(collapsed.windows(2).all(|w| w[0] != w[1]));
    }
}
