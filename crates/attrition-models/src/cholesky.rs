//! Cholesky solves on `ndarray` matrices, backed by `faer`.

use faer::{
    Mat, Side,
    linalg::solvers::{Llt, Solve as _},
};
use ndarray::{Array1, ArrayBase, Data, Ix1, Ix2};

/// `L Lᵀ` factorization of a symmetric positive-definite matrix.
pub(crate) struct CholeskyFactor {
    factor: Llt<f64>,
}

impl CholeskyFactor {
    /// Returns `None` if the matrix is not square or not positive definite.
    pub(crate) fn new<S>(matrix: &ArrayBase<S, Ix2>) -> Option<Self>
    where
        S: Data<Elem = f64>,
    {
        let (rows, cols) = matrix.dim();
        if rows != cols || matrix.iter().any(|v| !v.is_finite()) {
            return None;
        }
        let mat = Mat::from_fn(rows, cols, |i, j| matrix[(i, j)]);
        let factor = mat.as_ref().llt(Side::Lower).ok()?;
        Some(Self { factor })
    }

    fn dim(&self) -> usize {
        self.factor.L().nrows()
    }

    /// Solves `A x = b`.
    pub(crate) fn solve_vec<S>(&self, rhs: &ArrayBase<S, Ix1>) -> Array1<f64>
    where
        S: Data<Elem = f64>,
    {
        let rhs = Mat::from_fn(rhs.len(), 1, |i, _| rhs[i]);
        let solution = self.factor.solve(rhs.as_ref());
        Array1::from_shape_fn(solution.nrows(), |i| solution[(i, 0)])
    }

    /// Diagonal of `A⁻¹`.
    pub(crate) fn inverse_diagonal(&self) -> Array1<f64> {
        let n = self.dim();
        let identity = Mat::<f64>::identity(n, n);
        let inverse = self.factor.solve(identity.as_ref());
        Array1::from_shape_fn(n, |i| inverse[(i, i)])
    }
}
