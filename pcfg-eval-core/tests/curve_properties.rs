//! Property-based tests for the calibration curve.

use proptest::prelude::*;

use pcfg_eval_core::model::{CalibrationCurve, LogBase, OutOfCalibrationRange};

/// Strategy: a non-empty list of probabilities in (0, 1].
fn probabilities() -> impl Strategy<Value = Vec<f64>> {
	prop::collection::vec(1e-12f64..=1.0, 1..200)
}

proptest! {
	// 1. One sorted entry per sample, rarest first
	#[test]
	fn sorted_and_sized(ps in probabilities()) {
		let curve = CalibrationCurve::from_probabilities(&ps, LogBase::Two).unwrap();
		prop_assert_eq!(curve.sample_count(), ps.len());
		prop_assert_eq!(curve.sorted_log_probabilities().len(), ps.len());
		prop_assert_eq!(curve.position_estimates().len(), ps.len());
		for w in curve.sorted_log_probabilities().windows(2) {
			prop_assert!(w[0] >= w[1]);
		}
	}

	// 2. With every surprisal above log(N) the increments are positive, so the
	//    positions never decrease
	#[test]
	fn positions_monotone_for_positive_increments(ps in prop::collection::vec(1e-9f64..=1e-3, 1..500)) {
		let curve = CalibrationCurve::from_probabilities(&ps, LogBase::Ten).unwrap();
		for w in curve.position_estimates().windows(2) {
			prop_assert!(w[0] <= w[1]);
		}
	}

	// 3. Queries are pure
	#[test]
	fn queries_idempotent(ps in probabilities(), q in 1e-15f64..=1.0) {
		let curve = CalibrationCurve::from_probabilities(&ps, LogBase::Two).unwrap();
		let lp = LogBase::Two.surprisal(q).unwrap();
		prop_assert_eq!(curve.locate(lp), curve.locate(lp));
	}

	// 4. In-range estimates stay between the bracketing positions
	#[test]
	fn in_range_estimates_are_bracketed(ps in probabilities(), q in 1e-15f64..=1.0) {
		let curve = CalibrationCurve::from_probabilities(&ps, LogBase::Two).unwrap();
		let estimate = curve.locate(LogBase::Two.surprisal(q).unwrap());
		let positions = curve.position_estimates();
		let lo = positions.iter().cloned().fold(f64::INFINITY, f64::min);
		let hi = positions.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
		prop_assert!(estimate.rank >= lo - 1e-9 && estimate.rank <= hi + 1e-9);
	}

	// 5. Anything rarer than every sample reports the first position
	#[test]
	fn rarer_than_all_hits_boundary(ps in probabilities()) {
		let curve = CalibrationCurve::from_probabilities(&ps, LogBase::Two).unwrap();
		let estimate = curve.locate(curve.sorted_log_probabilities()[0] + 1.0);
		prop_assert_eq!(estimate.out_of_range, Some(OutOfCalibrationRange::RarerThanSamples));
		prop_assert_eq!(estimate.rank, curve.position_estimates()[0]);
	}
}
