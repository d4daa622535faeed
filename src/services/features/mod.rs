/// Feature Encoder
///
/// Turns catalog rows into a standardized numeric feature matrix for
/// content similarity. Category labels get a dense integer code assigned
/// in order of first appearance; the code is stable within one build and
/// is allowed to change across rebuilds.
///
/// Feature layout per row:
/// [category_code, price, days_to_expiry, stock, urgency_score, discount]
use crate::models::{DerivedAttrs, Product};
use ndarray::{Array2, Axis};
use std::collections::HashMap;

pub const FEATURE_COUNT: usize = 6;

/// Build the standardized feature matrix, one row per product, in input
/// order.
pub fn build_feature_matrix(products: &[Product], derived: &[DerivedAttrs]) -> Array2<f64> {
    debug_assert_eq!(products.len(), derived.len());

    let mut matrix = Array2::zeros((products.len(), FEATURE_COUNT));
    if products.is_empty() {
        return matrix;
    }

    let mut category_codes: HashMap<&str, usize> = HashMap::new();
    for (row, (product, attrs)) in products.iter().zip(derived).enumerate() {
        let next_code = category_codes.len();
        let code = *category_codes
            .entry(product.category.as_str())
            .or_insert(next_code);

        matrix[[row, 0]] = code as f64;
        matrix[[row, 1]] = product.price;
        matrix[[row, 2]] = attrs.days_to_expiry as f64;
        matrix[[row, 3]] = product.stock as f64;
        matrix[[row, 4]] = attrs.urgency_score;
        matrix[[row, 5]] = attrs.discount;
    }

    standardize_columns(&mut matrix);
    matrix
}

/// Scale each column to zero mean and unit variance (population variance).
///
/// A zero-variance column becomes all zeros rather than NaN.
fn standardize_columns(matrix: &mut Array2<f64>) {
    let n = matrix.nrows() as f64;
    for mut column in matrix.axis_iter_mut(Axis(1)) {
        let mean = column.sum() / n;
        let variance = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std_dev = variance.sqrt();

        if std_dev < f64::EPSILON {
            column.fill(0.0);
        } else {
            column.mapv_inplace(|v| (v - mean) / std_dev);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn catalog() -> Vec<Product> {
        let now = Utc::now();
        vec![
            Product {
                product_id: "p0".to_string(),
                name: "Shampoo".to_string(),
                category: "Haircare".to_string(),
                price: 10.0,
                stock: 20,
                expiry_date: now + Duration::days(5),
            },
            Product {
                product_id: "p1".to_string(),
                name: "Toothpaste".to_string(),
                category: "Oral Care".to_string(),
                price: 30.0,
                stock: 5,
                expiry_date: now + Duration::days(60),
            },
            Product {
                product_id: "p2".to_string(),
                name: "Conditioner".to_string(),
                category: "Haircare".to_string(),
                price: 20.0,
                stock: 0,
                expiry_date: now + Duration::days(12),
            },
        ]
    }

    #[test]
    fn test_matrix_shape_and_row_order() {
        let now = Utc::now();
        let products = catalog();
        let derived: Vec<_> = products.iter().map(|p| p.derived_at(now)).collect();
        let matrix = build_feature_matrix(&products, &derived);

        assert_eq!(matrix.dim(), (3, FEATURE_COUNT));
        // p0 and p2 share a category, so their standardized category codes
        // must be identical and differ from p1's.
        assert!((matrix[[0, 0]] - matrix[[2, 0]]).abs() < 1e-9);
        assert!((matrix[[0, 0]] - matrix[[1, 0]]).abs() > 1e-9);
    }

    #[test]
    fn test_columns_are_standardized() {
        let now = Utc::now();
        let products = catalog();
        let derived: Vec<_> = products.iter().map(|p| p.derived_at(now)).collect();
        let matrix = build_feature_matrix(&products, &derived);

        for col in 0..FEATURE_COUNT {
            let column = matrix.column(col);
            let mean = column.sum() / column.len() as f64;
            assert!(mean.abs() < 1e-9, "column {col} mean should be ~0");
        }
    }

    #[test]
    fn test_zero_variance_column_is_zero() {
        let now = Utc::now();
        let mut products = catalog();
        for p in &mut products {
            p.price = 15.0;
        }
        let derived: Vec<_> = products.iter().map(|p| p.derived_at(now)).collect();
        let matrix = build_feature_matrix(&products, &derived);

        for row in 0..3 {
            assert_eq!(matrix[[row, 1]], 0.0);
            assert!(matrix[[row, 1]].is_finite());
        }
    }

    #[test]
    fn test_empty_catalog() {
        let matrix = build_feature_matrix(&[], &[]);
        assert_eq!(matrix.dim(), (0, FEATURE_COUNT));
    }
}
