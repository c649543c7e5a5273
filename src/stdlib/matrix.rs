use crate::runtime::error::{RuntimeError, RuntimeResult};

pub type Matrix = Vec<Vec<f64>>;

pub fn shape(a: &[Vec<f64>]) -> (usize, usize) {
    let rows = a.len();
    let cols = if rows > 0 { a[0].len() } else { 0 };
    (rows, cols)
}

pub fn zeros(rows: usize, cols: usize) -> Matrix {
    vec![vec![0.0; cols]; rows]
}

pub fn mat_add(a: &[Vec<f64>], b: &[Vec<f64>]) -> RuntimeResult<Matrix> {
    elementwise(a, b, "addition", |x, y| x + y)
}

pub fn mat_sub(a: &[Vec<f64>], b: &[Vec<f64>]) -> RuntimeResult<Matrix> {
    elementwise(a, b, "subtraction", |x, y| x - y)
}

fn elementwise(
    a: &[Vec<f64>],
    b: &[Vec<f64>],
    what: &str,
    combine: impl Fn(f64, f64) -> f64,
) -> RuntimeResult<Matrix> {
    let (ra, ca) = shape(a);
    let (rb, cb) = shape(b);
    if ra != rb || ca != cb {
        return Err(RuntimeError::DimensionMismatch {
            message: format!("incompatible shapes {}x{} and {}x{} for {}", ra, ca, rb, cb, what),
        });
    }
    let mut c = Vec::with_capacity(ra);
    for (row_a, row_b) in a.iter().zip(b) {
        if row_a.len() != ca || row_b.len() != ca {
            return Err(RuntimeError::DimensionMismatch {
                message: format!("ragged matrix rows in {}", what),
            });
        }
        c.push(
            row_a
                .iter()
                .zip(row_b)
                .map(|(x, y)| combine(*x, *y))
                .collect(),
        );
    }
    Ok(c)
}

pub fn mat_mul(a: &[Vec<f64>], b: &[Vec<f64>]) -> RuntimeResult<Matrix> {
    let (ra, ca) = shape(a);
    let (rb, cb) = shape(b);
    if ca != rb {
        return Err(RuntimeError::DimensionMismatch {
            message: format!(
                "incompatible shapes {}x{} and {}x{} for multiplication",
                ra, ca, rb, cb
            ),
        });
    }
    if a.iter().any(|row| row.len() != ca) || b.iter().any(|row| row.len() != cb) {
        return Err(RuntimeError::DimensionMismatch {
            message: "ragged matrix rows in multiplication".into(),
        });
    }
    let mut c = zeros(ra, cb);
    for i in 0..ra {
        for j in 0..cb {
            let mut sum = 0.0;
            for k in 0..ca {
                sum += a[i][k] * b[k][j];
            }
            c[i][j] = sum;
        }
    }
    Ok(c)
}

pub fn mat_transpose(a: &[Vec<f64>]) -> Matrix {
    let (rows, cols) = shape(a);
    let mut t = zeros(cols, rows);
    for (i, row) in a.iter().enumerate() {
        for (j, value) in row.iter().enumerate().take(cols) {
            t[j][i] = *value;
        }
    }
    t
}

pub fn mat_identity(n: usize) -> Matrix {
    let mut id = zeros(n, n);
    for (i, row) in id.iter_mut().enumerate() {
        row[i] = 1.0;
    }
    id
}

// Gauss-Jordan elimination over the augmented matrix [A | I] with partial
// pivoting by largest absolute column value.
pub fn mat_inverse(a: &[Vec<f64>]) -> RuntimeResult<Matrix> {
    let (n, m) = shape(a);
    if n != m {
        return Err(RuntimeError::DomainError {
            message: "the inverse is only defined for square matrices".into(),
        });
    }

    let mut aug: Vec<Vec<f64>> = Vec::with_capacity(n);
    let identity = mat_identity(n);
    for (row, id_row) in a.iter().zip(&identity) {
        if row.len() != n {
            return Err(RuntimeError::DimensionMismatch {
                message: "ragged matrix rows in inversion".into(),
            });
        }
        let mut extended = row.clone();
        extended.extend_from_slice(id_row);
        aug.push(extended);
    }

    for col in 0..n {
        let mut pivot_row = None;
        let mut pivot_val = 0.0;
        for (r, row) in aug.iter().enumerate().skip(col) {
            let val = row[col].abs();
            if val > pivot_val {
                pivot_val = val;
                pivot_row = Some(r);
            }
        }

        let pivot_row = match pivot_row {
            Some(r) if pivot_val != 0.0 => r,
            _ => {
                return Err(RuntimeError::DomainError {
                    message: "the matrix is not invertible (determinant = 0)".into(),
                });
            }
        };

        if pivot_row != col {
            aug.swap(col, pivot_row);
        }

        let pivot = aug[col][col];
        for j in 0..2 * n {
            aug[col][j] /= pivot;
        }

        for r in 0..n {
            if r == col {
                continue;
            }
            let factor = aug[r][col];
            if factor != 0.0 {
                for j in 0..2 * n {
                    aug[r][j] -= factor * aug[col][j];
                }
            }
        }
    }

    Ok(aug.into_iter().map(|row| row[n..].to_vec()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_and_subtracts() {
        let a = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        let b = vec![vec![5.0, 6.0], vec![7.0, 8.0]];
        assert_eq!(
            mat_add(&a, &b).unwrap(),
            vec![vec![6.0, 8.0], vec![10.0, 12.0]]
        );
        assert_eq!(
            mat_sub(&b, &a).unwrap(),
            vec![vec![4.0, 4.0], vec![4.0, 4.0]]
        );
    }

    #[test]
    fn rejects_shape_mismatch_in_addition() {
        let a = vec![vec![1.0, 2.0]];
        let b = vec![vec![1.0], vec![2.0]];
        assert!(matches!(
            mat_add(&a, &b),
            Err(RuntimeError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn multiplies() {
        let a = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        let b = vec![vec![5.0, 6.0], vec![7.0, 8.0]];
        assert_eq!(
            mat_mul(&a, &b).unwrap(),
            vec![vec![19.0, 22.0], vec![43.0, 50.0]]
        );
    }

    #[test]
    fn rejects_inner_dimension_mismatch() {
        let a = vec![vec![1.0, 2.0, 3.0]];
        let b = vec![vec![1.0], vec![2.0]];
        assert!(matches!(
            mat_mul(&a, &b),
            Err(RuntimeError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn transposes() {
        let a = vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]];
        assert_eq!(
            mat_transpose(&a),
            vec![vec![1.0, 4.0], vec![2.0, 5.0], vec![3.0, 6.0]]
        );
    }

    #[test]
    fn identity_has_unit_diagonal() {
        assert_eq!(
            mat_identity(3),
            vec![
                vec![1.0, 0.0, 0.0],
                vec![0.0, 1.0, 0.0],
                vec![0.0, 0.0, 1.0]
            ]
        );
    }

    #[test]
    fn inverse_round_trips_to_identity() {
        let a = vec![vec![4.0, 7.0], vec![2.0, 6.0]];
        let inv = mat_inverse(&a).unwrap();
        let product = mat_mul(&a, &inv).unwrap();
        for (i, row) in product.iter().enumerate() {
            for (j, value) in row.iter().enumerate() {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((value - expected).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn inverse_rejects_singular_matrix() {
        let a = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        assert!(matches!(
            mat_inverse(&a),
            Err(RuntimeError::DomainError { .. })
        ));
    }

    #[test]
    fn inverse_rejects_non_square_matrix() {
        let a = vec![vec![1.0, 2.0, 3.0]];
        assert!(matches!(
            mat_inverse(&a),
            Err(RuntimeError::DomainError { .. })
        ));
    }
}
