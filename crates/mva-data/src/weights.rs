//! Negative-weight treatment and signal/background weight balancing.

use mva_core::config::WeightTreatment;

use crate::error::{DataError, Result};

/// Apply the configured negative-weight policy to one process's weights.
///
/// `reweight` takes absolute values, then rescales so the sum is restored
/// to the original signed sum. A process whose weights are all zero passes
/// through unchanged; an original sum that is otherwise non-positive is an
/// error, since no positive scale factor can restore it.
pub fn apply_treatment(weights: &mut [f64], mode: WeightTreatment) -> Result<()> {
    match mode {
        WeightTreatment::Passthrough => Ok(()),
        WeightTreatment::Abs => {
            for w in weights.iter_mut() {
                *w = w.abs();
            }
            Ok(())
        }
        WeightTreatment::Reweight => {
            if weights.iter().all(|&w| w == 0.0) {
                return Ok(());
            }
            let signed_sum: f64 = weights.iter().sum();
            if signed_sum <= 0.0 {
                return Err(DataError::Weights(format!(
                    "cannot reweight: original weight sum {signed_sum} is not positive"
                )));
            }
            let abs_sum: f64 = weights.iter().map(|w| w.abs()).sum();
            let scale = signed_sum / abs_sum;
            for w in weights.iter_mut() {
                *w = w.abs() * scale;
            }
            Ok(())
        }
    }
}

/// Scale the smaller-summing of two weight vectors so the sums match.
///
/// Scaling is always upward, by `max(sum) / min(sum)`. Both sums zero is a
/// no-op; exactly one zero sum is an error, since no finite upward scale
/// can match the sums.
pub fn balance_weights(a: &mut [f64], b: &mut [f64]) -> Result<()> {
    let sum_a: f64 = a.iter().sum();
    let sum_b: f64 = b.iter().sum();

    if sum_a == 0.0 && sum_b == 0.0 {
        return Ok(());
    }
    if sum_a == 0.0 || sum_b == 0.0 {
        return Err(DataError::Weights(format!(
            "cannot balance weight sums {sum_a} and {sum_b}: one side is zero"
        )));
    }

    let scale = sum_a.max(sum_b) / sum_a.min(sum_b);
    let smaller = if sum_a < sum_b { &mut *a } else { &mut *b };
    for w in smaller.iter_mut() {
        *w *= scale;
    }

    let out_a: f64 = a.iter().sum();
    let out_b: f64 = b.iter().sum();
    debug_assert!(
        (out_a - out_b).abs() <= 1e-9 * out_a.abs().max(out_b.abs()),
        "balanced sums differ: {out_a} vs {out_b}"
    );
    debug_assert!(out_a >= sum_a && out_b >= sum_b, "balancing scaled a sum down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn passthrough_keeps_negatives() {
        let mut w = vec![1.0, -2.0, 3.0];
        apply_treatment(&mut w, WeightTreatment::Passthrough).unwrap();
        assert_eq!(w, vec![1.0, -2.0, 3.0]);
    }

    #[test]
    fn abs_flips_negatives() {
        let mut w = vec![1.0, -2.0, 3.0];
        apply_treatment(&mut w, WeightTreatment::Abs).unwrap();
        assert_eq!(w, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn reweight_preserves_signed_sum() {
        let mut w = vec![3.0, -1.0, 2.0]; // signed sum 4, abs sum 6
        apply_treatment(&mut w, WeightTreatment::Reweight).unwrap();
        assert!(w.iter().all(|&x| x >= 0.0));
        assert_relative_eq!(w.iter().sum::<f64>(), 4.0, max_relative = 1e-12);
    }

    #[test]
    fn reweight_rejects_nonpositive_sum() {
        let mut w = vec![1.0, -2.0];
        assert!(apply_treatment(&mut w, WeightTreatment::Reweight).is_err());
        let mut w = vec![1.0, -1.0];
        assert!(apply_treatment(&mut w, WeightTreatment::Reweight).is_err());
    }

    #[test]
    fn reweight_passes_all_zero_through() {
        let mut w = vec![0.0, 0.0];
        apply_treatment(&mut w, WeightTreatment::Reweight).unwrap();
        assert_eq!(w, vec![0.0, 0.0]);
    }

    #[test]
    fn balancing_equalises_sums_upward() {
        let mut sig = vec![10.0, 5.0]; // sum 15
        let mut bkg = vec![8.0, 8.0]; // sum 16
        balance_weights(&mut sig, &mut bkg).unwrap();
        let s: f64 = sig.iter().sum();
        let b: f64 = bkg.iter().sum();
        assert_relative_eq!(s, b, max_relative = 1e-12);
        assert!(s >= 15.0 && b >= 16.0);
        // the larger side is untouched
        assert_eq!(bkg, vec![8.0, 8.0]);
    }

    #[test]
    fn balancing_equal_sums_is_identity() {
        let mut a = vec![4.0, 4.0];
        let mut b = vec![2.0, 6.0];
        balance_weights(&mut a, &mut b).unwrap();
        assert_eq!(a, vec![4.0, 4.0]);
        assert_eq!(b, vec![2.0, 6.0]);
    }

    #[test]
    fn balancing_zero_sums() {
        let mut a: Vec<f64> = vec![];
        let mut b: Vec<f64> = vec![];
        balance_weights(&mut a, &mut b).unwrap();

        let mut a = vec![0.0];
        let mut b = vec![1.0];
        assert!(balance_weights(&mut a, &mut b).is_err());
    }
}
