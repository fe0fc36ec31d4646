//! End-to-end analyser scenarios on synthetic streams.

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::{AnalysisParams, HWAnalysis, Reporter};
use pd_types::{Poly, Term};

fn params(blocklen: usize, deg: usize) -> AnalysisParams {
    AnalysisParams {
        blocklen,
        deg,
        ..Default::default()
    }
}

#[test]
fn all_zero_stream() {
    let mut a = HWAnalysis::new(params(8, 3), vec![]).unwrap();
    let rep = a.process_chunk(&[0u8; 1024], None).unwrap();
    assert_eq!(rep.num_evals, 1024);
    // Every monomial of degree >= 1 evaluates to 0 on every block.
    for d in 1..=3 {
        assert!(a.total_hws()[d].iter().all(|&h| h == 0));
    }
    assert_eq!(a.total_hws()[0], vec![1024]);
    // Observed 0 against expected n/2^d: well-defined negative z-scores.
    for ds in &rep.degrees {
        assert!(ds.best.iter().all(|c| c.zscore < 0.0 && c.obs_cnt == 0));
        assert_eq!(ds.fails, ds.terms);
    }
}

#[test]
fn all_ones_stream() {
    let mut a = HWAnalysis::new(params(8, 3), vec![]).unwrap();
    let rep = a.process_chunk(&[0xFFu8; 1024], None).unwrap();
    // The AND of ones is one: every monomial fires on every block.
    for d in 1..=3 {
        assert!(a.total_hws()[d].iter().all(|&h| h == 1024));
    }
    for ds in &rep.degrees {
        assert!(ds.best.iter().all(|c| c.zscore > 0.0 && c.obs_cnt == 1024));
    }
}

#[test]
fn ties_listed_by_ascending_index() {
    let mut a = HWAnalysis::new(params(8, 2), vec![]).unwrap();
    let rep = a.process_chunk(&[0u8; 512], None).unwrap();
    // All degree-1 terms share the same z-score; the listing falls back to
    // index order.
    let idx: Vec<_> = rep.degrees[0].best.iter().map(|c| c.idx.unwrap()).collect();
    assert_eq!(idx, (0..8).collect::<Vec<_>>());
}

#[test]
fn single_bit_bias_is_top_ranked() {
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let data: Vec<u8> = (0..10000).map(|_| 0x80 | (rng.gen::<u8>() & 0x7F)).collect();
    let mut a = HWAnalysis::new(params(8, 2), vec![]).unwrap();
    let rep = a.process_chunk(&data, None).unwrap();

    assert_eq!(a.total_hws()[1][0], 10000);
    for v in 1..8 {
        let h = a.total_hws()[1][v];
        assert!((4500..5500).contains(&h), "var {v}: {h}");
    }
    // The stuck bit is the clear degree-1 winner.
    let best = &rep.degrees[0].best[0];
    assert_eq!(best.idx, Some(0));
    assert_eq!(best.obs_cnt, 10000);
    assert!(best.zscore > 50.0);
}

#[test]
fn xor_combination_recovers_equal_bits() {
    // Bits 0 and 1 always agree; everything else is uniform.
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let data: Vec<u8> = (0..4096)
        .map(|_| {
            let b = rng.gen::<u8>();
            (b & 0x3F) | (if b & 0x80 != 0 { 0xC0 } else { 0x00 })
        })
        .collect();
    let p = AnalysisParams {
        top_k: Some(8),
        combine_all_deg: true,
        no_comb_and: true,
        ..params(8, 2)
    };
    let mut a = HWAnalysis::new(p, vec![]).unwrap();
    let rep = a.process_chunk(&data, None).unwrap();

    // b0 ^ b1 == 0 on every block: observed 0 against expected n/2 beats
    // every other candidate in the pool.
    let best = &rep.combined[0];
    let mut terms = best.poly.terms().to_vec();
    terms.sort();
    assert_eq!(terms, vec![Term::new(vec![0]), Term::new(vec![1])]);
    assert_eq!(best.obs_cnt, 0);
    assert!(best.zscore < -50.0);
}

#[test]
fn reference_stream_cancels_itself() {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let mut data = vec![0u8; 64 * 1024];
    rng.fill_bytes(&mut data);
    let p = AnalysisParams {
        top_k: Some(3),
        do_ref: true,
        ..params(128, 2)
    };
    let mut a = HWAnalysis::new(p, vec![]).unwrap();
    let rep = a.process_chunk(&data, Some(&data)).unwrap();

    // Identical streams: every differential z-score is exactly 0.
    for ds in &rep.degrees {
        for c in &ds.best {
            assert_eq!(c.zscore_ref, Some(c.zscore));
        }
    }
    assert!(!rep.combined.is_empty());
    for c in &rep.combined {
        assert_eq!(c.zscore, 0.0);
        assert!(c.zscore.abs() <= 1.96);
    }
}

#[test]
fn reference_shape_mismatch_fails() {
    let p = AnalysisParams {
        do_ref: true,
        ..params(8, 2)
    };
    let mut a = HWAnalysis::new(p, vec![]).unwrap();
    assert!(a.process_chunk(&[0u8; 64], Some(&[0u8; 32])).is_err());
}

#[test]
fn chunking_is_additive() {
    let mut rng = ChaCha8Rng::seed_from_u64(13);
    let mut data = vec![0u8; 4096];
    rng.fill_bytes(&mut data);

    let mut split = HWAnalysis::new(params(16, 3), vec![]).unwrap();
    split.process_chunk(&data[..2048], None).unwrap();
    split.process_chunk(&data[2048..], None).unwrap();

    let mut whole = HWAnalysis::new(params(16, 3), vec![]).unwrap();
    whole.process_chunk(&data, None).unwrap();

    assert_eq!(split.total_n(), whole.total_n());
    assert_eq!(split.total_hws(), whole.total_hws());
}

#[test]
fn input_polynomials_only() {
    let polys = vec![
        Poly::from_term(Term::new(vec![0])),
        Poly::new(vec![Term::new(vec![0]), Term::new(vec![1])]),
    ];
    let p = AnalysisParams {
        all_deg_compute: false,
        ..params(8, 3)
    };
    let mut a = HWAnalysis::new(p, polys).unwrap();
    let rep = a.process_chunk(&[0xFFu8; 256], None).unwrap();

    // No degree ladder, no combinations.
    assert!(rep.degrees.is_empty());
    assert!(rep.combined.is_empty());
    assert_eq!(rep.input_results.len(), 2);

    // On all-ones blocks x0 is always 1, x0 ^ x1 never.
    let by_idx = |i| rep.input_results.iter().find(|c| c.idx == Some(i)).unwrap();
    assert_eq!(by_idx(0).obs_cnt, 256);
    assert!(by_idx(0).zscore > 0.0);
    assert_eq!(by_idx(1).obs_cnt, 0);
    assert!(by_idx(1).zscore < 0.0);

    // Totals accumulate across chunks.
    a.process_chunk(&[0xFFu8; 256], None).unwrap();
    assert_eq!(a.input_polys().totals(), &[512, 0]);
    let fin = a.finished();
    assert_eq!(fin.num_evals, 512);
    assert_eq!(fin.input_results.len(), 2);
}

#[test]
fn out_of_range_input_polynomial_is_rejected() {
    let polys = vec![Poly::from_term(Term::new(vec![8]))];
    assert!(HWAnalysis::new(params(8, 3), polys).is_err());
}

#[test]
fn comb_random_is_reproducible() {
    let mut rng = ChaCha8Rng::seed_from_u64(17);
    let mut data = vec![0u8; 2048];
    rng.fill_bytes(&mut data);
    let p = AnalysisParams {
        top_k: Some(2),
        comb_random: 3,
        seed: 42,
        ..params(16, 2)
    };

    let run = |p: AnalysisParams| {
        let mut a = HWAnalysis::new(p, vec![]).unwrap();
        let rep = a.process_chunk(&data, None).unwrap();
        rep.combined
            .iter()
            .map(|c| (c.poly.clone(), c.obs_cnt))
            .collect::<Vec<_>>()
    };
    assert_eq!(run(p.clone()), run(p));
}

#[test]
fn reporter_renders_listings() {
    let p = AnalysisParams {
        top_k: Some(2),
        ..params(8, 2)
    };
    let mut a = HWAnalysis::new(p, vec![]).unwrap();
    let rep = a.process_chunk(&[0xFFu8; 256], None).unwrap();

    let mut out = Vec::new();
    Reporter::new(1.96).write_chunk(&mut out, &rep).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("zscore[deg=1]"));
    assert!(text.contains("zscore[deg=2]"));
    assert!(text.contains("Mean zscore[deg=2]"));
    assert!(text.contains("best poly zscore"));
    // Constant ones blow past the threshold: the failure marker shows up.
    assert!(text.contains(" x idx:"));
}

#[test]
fn finished_reports_cumulative_rankings() {
    let mut a = HWAnalysis::new(params(8, 2), vec![]).unwrap();
    a.process_chunk(&[0xFFu8; 128], None).unwrap();
    a.process_chunk(&[0xFFu8; 128], None).unwrap();
    let fin = a.finished();
    assert_eq!(fin.num_evals, 256);
    assert!(fin.combined.is_empty());
    assert_eq!(fin.degrees[0].best[0].obs_cnt, 256);
}
