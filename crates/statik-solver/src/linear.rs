//! Dense direct solver: Gaussian elimination with partial pivoting and
//! penalty-method constraint enforcement.

use nalgebra::{DMatrix, DVector};

use crate::error::{Result, SolverError};

/// Penalty stiffness added to the diagonal of a constrained DOF
pub const PENALTY: f64 = 1e20;

/// A candidate pivot below this magnitude declares the system singular
pub const SINGULAR_THRESHOLD: f64 = 1e-12;

/// Solve `a · x = b` by forward elimination with partial pivoting on an
/// augmented copy, followed by back substitution.
///
/// # Errors
/// `SolverError::Singular` naming the implicated column when the largest
/// candidate pivot falls below [`SINGULAR_THRESHOLD`];
/// `SolverError::DimensionMismatch` when shapes disagree.
pub fn solve(a: &DMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>> {
    let n = a.nrows();
    if a.ncols() != n {
        return Err(SolverError::DimensionMismatch(format!(
            "matrix is {}x{}, expected square",
            a.nrows(),
            a.ncols()
        )));
    }
    if b.len() != n {
        return Err(SolverError::DimensionMismatch(format!(
            "matrix is {n}x{n} but right-hand side has {} entries",
            b.len()
        )));
    }

    // Augmented matrix [A | b]
    let mut aug = DMatrix::<f64>::zeros(n, n + 1);
    aug.view_mut((0, 0), (n, n)).copy_from(a);
    aug.set_column(n, b);

    for col in 0..n {
        // Partial pivoting: pick the largest magnitude on or below the diagonal
        let mut pivot_row = col;
        let mut pivot_mag = aug[(col, col)].abs();
        for row in (col + 1)..n {
            let mag = aug[(row, col)].abs();
            if mag > pivot_mag {
                pivot_mag = mag;
                pivot_row = row;
            }
        }
        if pivot_mag < SINGULAR_THRESHOLD {
            return Err(SolverError::Singular { dof: col });
        }
        if pivot_row != col {
            aug.swap_rows(pivot_row, col);
        }

        let pivot = aug[(col, col)];
        for row in (col + 1)..n {
            let factor = aug[(row, col)] / pivot;
            if factor == 0.0 {
                continue;
            }
            for k in col..=n {
                aug[(row, k)] -= factor * aug[(col, k)];
            }
        }
    }

    // Back substitution
    let mut x = DVector::<f64>::zeros(n);
    for row in (0..n).rev() {
        let mut sum = aug[(row, n)];
        for k in (row + 1)..n {
            sum -= aug[(row, k)] * x[k];
        }
        x[row] = sum / aug[(row, row)];
    }
    Ok(x)
}

/// Solve `a · x = b` with fixed DOFs enforced by the penalty method.
///
/// Each `(dof, prescribed)` pair adds [`PENALTY`] to the diagonal entry and
/// replaces the right-hand side with `PENALTY * prescribed`, which forces
/// the solved value at that DOF to the prescribed one within floating-point
/// tolerance. Inputs are left untouched.
pub fn solve_with_constraints(
    a: &DMatrix<f64>,
    b: &DVector<f64>,
    fixed: &[(usize, f64)],
) -> Result<DVector<f64>> {
    let n = a.nrows();
    for &(dof, _) in fixed {
        if dof >= n {
            return Err(SolverError::DimensionMismatch(format!(
                "constrained DOF {dof} out of range for a {n}-DOF system"
            )));
        }
    }

    let mut ak = a.clone();
    let mut bk = b.clone();
    for &(dof, prescribed) in fixed {
        ak[(dof, dof)] += PENALTY;
        bk[dof] = PENALTY * prescribed;
    }
    solve(&ak, &bk)
}
