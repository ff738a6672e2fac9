//! Dense Gaussian elimination for the tiny normal-equation systems the
//! fitters build.

use crate::error::FitError;

/// Pivots below this magnitude mark the system as singular.
pub const PIVOT_EPSILON: f64 = 1e-9;

/// Solve `a · x = b` by Gaussian elimination with partial pivoting.
///
/// Works on copies of the inputs; the caller's arrays are untouched.
/// Returns [`FitError::SingularMatrix`] when a pivot is effectively zero.
pub fn solve<const N: usize>(a: [[f64; N]; N], b: [f64; N]) -> Result<[f64; N], FitError> {
    let mut a = a;
    let mut b = b;

    for col in 0..N {
        let pivot_row = (col..N)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);

        if !(a[pivot_row][col].abs() >= PIVOT_EPSILON) {
            return Err(FitError::SingularMatrix);
        }

        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        for row in (col + 1)..N {
            let factor = a[row][col] / a[col][col];
            a[row][col] = 0.0;
            for k in (col + 1)..N {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = [0.0; N];
    for row in (0..N).rev() {
        let tail: f64 = ((row + 1)..N).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Ok(x)
}
