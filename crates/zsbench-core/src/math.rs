//! Shared math utilities: normalization, softmax and ranking.

use ndarray::{ArrayView1, ArrayViewMut1, ArrayViewMut2, Axis};

/// L2-normalize a vector in place so its magnitude is 1.
///
/// Any non-zero norm is divided out, however small. Zero vectors are left
/// untouched rather than turned into NaN.
pub fn l2_normalize_in_place(mut v: ArrayViewMut1<f32>) {
    let norm = l2_norm(v.view());
    if norm > 0.0 {
        v.mapv_inplace(|x| x / norm);
    }
}

/// L2-normalize a slice, returning a new vector with unit magnitude.
pub fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let mut result = v.to_vec();
    l2_normalize_in_place(ArrayViewMut1::from(result.as_mut_slice()));
    result
}

/// L2-normalize every row of a matrix independently.
pub fn l2_normalize_rows(mut m: ArrayViewMut2<f32>) {
    for row in m.axis_iter_mut(Axis(0)) {
        l2_normalize_in_place(row);
    }
}

/// Euclidean norm of a vector.
pub fn l2_norm(v: ArrayView1<f32>) -> f32 {
    v.dot(&v).sqrt()
}

/// Softmax over a vector of logits, in place.
///
/// Subtracts the max logit before exponentiating so large logits
/// (cosines scaled by the temperature) do not overflow.
pub fn softmax_in_place(mut logits: ArrayViewMut1<f32>) {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    logits.mapv_inplace(|x| (x - max).exp());
    let sum = logits.sum();
    if sum > 0.0 {
        logits.mapv_inplace(|x| x / sum);
    }
}

/// Indices of the `k` largest scores, highest first.
///
/// Returns `min(k, scores.len())` indices. Equal scores rank the lower index
/// first so results are reproducible.
pub fn top_k(scores: ArrayView1<f32>, k: usize) -> Vec<usize> {
    let k = k.min(scores.len());
    if k == 0 {
        return Vec::new();
    }

    let cmp = |a: &usize, b: &usize| scores[*b].total_cmp(&scores[*a]).then(a.cmp(b));

    let mut indices: Vec<usize> = (0..scores.len()).collect();
    if k < indices.len() {
        indices.select_nth_unstable_by(k - 1, &cmp);
        indices.truncate(k);
    }
    indices.sort_by(&cmp);
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2, Array1};

    #[test]
    fn test_l2_normalize() {
        let v = l2_normalize(&[3.0, 4.0]);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_l2_normalize_zero_vector() {
        let v = l2_normalize(&[0.0, 0.0, 0.0]);
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_l2_normalize_tiny_vector() {
        let v = l2_normalize(&[1e-8, 0.0]);
        assert!((v[0] - 1.0).abs() < 1e-6);
        assert_eq!(v[1], 0.0);
    }

    #[test]
    fn test_l2_normalize_rows() {
        let mut m = arr2(&[[3.0_f32, 4.0], [0.0, 5.0], [1.0, 1.0]]);
        l2_normalize_rows(m.view_mut());
        for row in m.rows() {
            assert!((l2_norm(row) - 1.0).abs() < 1e-6);
        }
        assert!((m[[1, 1]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let mut logits = arr1(&[100.0_f32, 50.0, -20.0, 99.0]);
        softmax_in_place(logits.view_mut());
        assert!((logits.sum() - 1.0).abs() < 1e-5);
        assert!(logits.iter().all(|p| p.is_finite() && *p >= 0.0));
        assert!(logits[0] > logits[3]);
    }

    #[test]
    fn test_softmax_preserves_order() {
        let mut logits = arr1(&[0.1_f32, 0.3, 0.2]);
        softmax_in_place(logits.view_mut());
        assert_eq!(top_k(logits.view(), 3), vec![1, 2, 0]);
    }

    #[test]
    fn test_top_k_descending() {
        let scores = arr1(&[0.1_f32, 0.9, 0.5, 0.7]);
        assert_eq!(top_k(scores.view(), 2), vec![1, 3]);
    }

    #[test]
    fn test_top_k_clamps_to_len() {
        let scores = arr1(&[0.2_f32, 0.8]);
        assert_eq!(top_k(scores.view(), 15), vec![1, 0]);
    }

    #[test]
    fn test_top_k_ties_prefer_lower_index() {
        let scores = arr1(&[0.5_f32, 0.9, 0.5, 0.5, 0.1]);
        assert_eq!(top_k(scores.view(), 3), vec![1, 0, 2]);
        assert_eq!(top_k(scores.view(), 5), vec![1, 0, 2, 3, 4]);
    }

    #[test]
    fn test_top_k_empty() {
        let scores: Array1<f32> = Array1::zeros(0);
        assert!(top_k(scores.view(), 5).is_empty());
        let scores = arr1(&[1.0_f32]);
        assert!(top_k(scores.view(), 0).is_empty());
    }
}
