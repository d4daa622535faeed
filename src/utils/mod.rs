// Shared math helpers for the ranking engine

use ndarray::{Array2, ArrayView1, ArrayView2};

/// Cosine similarity between two vectors.
///
/// Returns 0 when either vector has zero magnitude, so degenerate rows
/// never leak NaN into ranking scores.
pub fn cosine_similarity(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    let norm_a = a.dot(&a).sqrt();
    let norm_b = b.dot(&b).sqrt();
    if norm_a < f64::EPSILON || norm_b < f64::EPSILON {
        return 0.0;
    }
    a.dot(&b) / (norm_a * norm_b)
}

/// Pairwise cosine similarity between the rows of `matrix`.
///
/// The result is square and symmetric with values in [-1, 1]; rows that
/// are zero vectors produce all-zero similarity entries.
pub fn row_cosine_similarity(matrix: ArrayView2<f64>) -> Array2<f64> {
    let n = matrix.nrows();
    let norms: Vec<f64> = (0..n)
        .map(|i| matrix.row(i).dot(&matrix.row(i)).sqrt())
        .collect();

    let mut similarity = Array2::zeros((n, n));
    for i in 0..n {
        for j in i..n {
            let value = if norms[i] < f64::EPSILON || norms[j] < f64::EPSILON {
                0.0
            } else {
                matrix.row(i).dot(&matrix.row(j)) / (norms[i] * norms[j])
            };
            similarity[[i, j]] = value;
            similarity[[j, i]] = value;
        }
    }
    similarity
}
