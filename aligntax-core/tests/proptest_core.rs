//! Property-based tests for the sampler, fitter and Pareto selector using proptest.

use proptest::prelude::*;

use aligntax_core::pareto::{Candidate, select};
use aligntax_core::{
    FitKind, Method, MethodRegistry, OverheadTable, Scale, ScaleSampler, fit_power_law,
};

fn candidates() -> impl Strategy<Value = Vec<Candidate>> {
    prop::collection::vec((0.0f64..100.0, 0.0f64..10.0), 0..16).prop_map(|points| {
        points
            .into_iter()
            .enumerate()
            .map(|(i, (overhead, regression))| {
                Candidate::new(format!("method_{}", i), overhead, regression)
            })
            .collect()
    })
}

// --- Scale sampler properties ---

proptest! {
    #[test]
    fn scale_invariant_overhead_identical_across_scales(
        method_idx in 0usize..Method::ALL.len(),
        params in prop::collection::vec(1u64..10_000_000_000_000, 1..10),
    ) {
        let sampler = ScaleSampler::new(MethodRegistry::from_table(&OverheadTable::default()));
        let scales: Vec<Scale> = params.into_iter().map(|p| Scale::new(p).unwrap()).collect();
        let method = Method::ALL[method_idx];
        let records = sampler.sample(method.key(), &scales).unwrap();
        prop_assert_eq!(records.len(), scales.len());
        for r in &records {
            prop_assert_eq!(r.flops_overhead_pct, records[0].flops_overhead_pct);
            prop_assert_eq!(r.memory_overhead_pct, records[0].memory_overhead_pct);
            prop_assert_eq!(r.task_regression_pp, records[0].task_regression_pp);
        }
    }

    #[test]
    fn sampling_is_deterministic(params in 1u64..10_000_000_000_000) {
        let sampler = ScaleSampler::new(MethodRegistry::from_table(&OverheadTable::default()));
        let scale = Scale::new(params).unwrap();
        prop_assert_eq!(
            sampler.sample("rlhf", &[scale]).unwrap(),
            sampler.sample("rlhf", &[scale]).unwrap()
        );
    }
}

// --- Scaling fitter properties ---

proptest! {
    #[test]
    fn fit_recovers_generating_curve(
        a in 0.1f64..1000.0,
        b in -1.0f64..1.0,
        base in 1e6f64..1e9,
        n in 2usize..8,
    ) {
        let points: Vec<(f64, f64)> = (0..n)
            .map(|k| {
                let scale = base * 2f64.powi(k as i32);
                (scale, a * scale.powf(b))
            })
            .collect();
        let fit = fit_power_law(&points).unwrap();
        prop_assert_eq!(fit.kind, FitKind::PowerLaw);
        prop_assert!((fit.b - b).abs() < 1e-6, "b: {} vs {}", fit.b, b);
        prop_assert!((fit.a - a).abs() / a < 1e-6, "a: {} vs {}", fit.a, a);
    }

    #[test]
    fn fit_predictions_inside_range_not_flagged(
        overheads in prop::collection::vec(0.1f64..100.0, 2..8),
    ) {
        let points: Vec<(f64, f64)> = overheads
            .iter()
            .enumerate()
            .map(|(i, &o)| (1e8 * (i as f64 + 1.0), o))
            .collect();
        let fit = fit_power_law(&points).unwrap();
        for &(scale, _) in &points {
            prop_assert!(!fit.predict(scale).unwrap().is_extrapolated());
        }
        prop_assert!(fit.predict(fit.max_scale * 2.0).unwrap().is_extrapolated());
    }
}

// --- Pareto selector properties ---

proptest! {
    #[test]
    fn pareto_is_idempotent(input in candidates()) {
        let first = select(&input).unwrap();
        let second = select(first.members()).unwrap();
        prop_assert_eq!(first.members(), second.members());
        prop_assert!(second.dominated().is_empty());
    }

    #[test]
    fn pareto_never_keeps_a_dominated_method(input in candidates()) {
        let set = select(&input).unwrap();
        for member in set.members() {
            prop_assert!(!input.iter().any(|c| c.dominates(member)));
        }
    }

    #[test]
    fn pareto_excluded_methods_are_dominated_by_a_member(input in candidates()) {
        let set = select(&input).unwrap();
        prop_assert_eq!(set.len() + set.dominated().len(), input.len());
        for name in set.dominated() {
            let excluded = input.iter().find(|c| &c.method == name).unwrap();
            prop_assert!(set.members().iter().any(|m| m.dominates(excluded)));
        }
    }

    #[test]
    fn pareto_members_ordered_by_overhead(input in candidates()) {
        let set = select(&input).unwrap();
        for pair in set.members().windows(2) {
            prop_assert!(pair[0].overhead <= pair[1].overhead);
        }
    }
}
