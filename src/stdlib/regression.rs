use crate::runtime::error::{RuntimeError, RuntimeResult};

// Least-squares fit of y = m*x + b; returns (m, b).
pub fn linear_fit(xs: &[f64], ys: &[f64]) -> RuntimeResult<(f64, f64)> {
    if xs.len() != ys.len() {
        return Err(RuntimeError::DimensionMismatch {
            message: "xs and ys must have the same length".into(),
        });
    }
    let n = xs.len();
    if n == 0 {
        return Err(RuntimeError::DomainError {
            message: "cannot fit a line through 0 points".into(),
        });
    }

    let mut sx = 0.0;
    let mut sy = 0.0;
    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        sx += x;
        sy += y;
        sxx += x * x;
        sxy += x * y;
    }

    // m = (n*Σxy - Σx*Σy) / (n*Σx² - (Σx)²), b = (Σy - m*Σx) / n
    let n = n as f64;
    let denom = n * sxx - sx * sx;
    if denom == 0.0 {
        return Err(RuntimeError::DomainError {
            message: "cannot fit a line (zero denominator)".into(),
        });
    }
    let m = (n * sxy - sx * sy) / denom;
    let b = (sy - m * sx) / n;
    Ok((m, b))
}

pub fn linear_predict(xs: &[f64], m: f64, b: f64) -> Vec<f64> {
    xs.iter().map(|x| m * x + b).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_an_exact_line() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys = [1.0, 3.0, 5.0, 7.0];
        let (m, b) = linear_fit(&xs, &ys).unwrap();
        assert!((m - 2.0).abs() < 1e-9);
        assert!((b - 1.0).abs() < 1e-9);
    }

    #[test]
    fn predicts_from_parameters() {
        let ys = linear_predict(&[0.0, 1.0, 2.0], 2.0, 1.0);
        assert_eq!(ys, vec![1.0, 3.0, 5.0]);
    }

    #[test]
    fn rejects_length_mismatch() {
        assert!(matches!(
            linear_fit(&[1.0], &[1.0, 2.0]),
            Err(RuntimeError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn rejects_empty_input() {
        assert!(matches!(
            linear_fit(&[], &[]),
            Err(RuntimeError::DomainError { .. })
        ));
    }

    #[test]
    fn rejects_constant_xs() {
        assert!(matches!(
            linear_fit(&[2.0, 2.0], &[1.0, 3.0]),
            Err(RuntimeError::DomainError { .. })
        ));
    }
}
