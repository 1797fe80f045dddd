//! Dense symmetric positive definite solves.
//!
//! The information matrix `XᵀWX` of a full-rank logistic design is symmetric
//! positive definite, so a Cholesky factorization both solves the Newton step
//! and detects rank deficiency.

use crate::error::{ModelError, Result};
use ndarray::{Array1, Array2};

/// Pivots below this are treated as singular.
const PIVOT_TOLERANCE: f64 = 1e-12;

/// Lower-triangular Cholesky factor `L` with `A = L Lᵀ`.
///
/// # Arguments
/// * `a` - Symmetric positive definite matrix
///
/// # Returns
/// * `L`, or `RankDeficient` when a pivot is not positive
pub fn cholesky(a: &Array2<f64>) -> Result<Array2<f64>> {
    let n = a.nrows();
    if n != a.ncols() {
        return Err(ModelError::RankDeficient(format!(
            "information matrix is {}x{}",
            n,
            a.ncols()
        )));
    }

    let scale = (0..n).map(|i| a[[i, i]].abs()).fold(0.0, f64::max).max(1.0);
    let mut l = Array2::<f64>::zeros((n, n));

    for j in 0..n {
        let mut diag = a[[j, j]];
        for k in 0..j {
            diag -= l[[j, k]] * l[[j, k]];
        }
        if !diag.is_finite() || diag <= PIVOT_TOLERANCE * scale {
            return Err(ModelError::RankDeficient(format!(
                "information matrix is singular at column {j}"
            )));
        }
        let pivot = diag.sqrt();
        l[[j, j]] = pivot;

        for i in (j + 1)..n {
            let mut sum = a[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            l[[i, j]] = sum / pivot;
        }
    }

    Ok(l)
}

/// Solve `L Lᵀ x = b` given the Cholesky factor.
pub fn cholesky_solve(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = l.nrows();

    // Forward: L z = b
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[[i, k]] * z[k];
        }
        z[i] = sum / l[[i, i]];
    }

    // Backward: Lᵀ x = z
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = z[i];
        for k in (i + 1)..n {
            sum -= l[[k, i]] * x[k];
        }
        x[i] = sum / l[[i, i]];
    }

    x
}

/// Solve `A x = b` for symmetric positive definite `A`.
pub fn solve_spd(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>> {
    let l = cholesky(a)?;
    Ok(cholesky_solve(&l, b))
}

/// Inverse of a symmetric positive definite matrix.
pub fn inverse_spd(a: &Array2<f64>) -> Result<Array2<f64>> {
    let l = cholesky(a)?;
    let n = a.nrows();
    let mut inv = Array2::<f64>::zeros((n, n));

    for j in 0..n {
        let mut e = Array1::<f64>::zeros(n);
        e[j] = 1.0;
        inv.column_mut(j).assign(&cholesky_solve(&l, &e));
    }

    Ok(inv)
}
