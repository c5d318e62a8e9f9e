use nalgebra::{DMatrix, RealField};

/// Modified Gram-Schmidt: `A = QR`, `Q` orthonormal, `R` upper triangular
/// with a non-negative diagonal. Used for the live renormalization step
/// since it is numerically superior to the classical variant for
/// near-linearly-dependent columns.
pub fn modified_gram_schmidt<T: RealField + Copy>(a: &DMatrix<T>) -> (DMatrix<T>, DMatrix<T>) {
    let n = a.nrows();
    let mut q = a.clone();
    let mut r = DMatrix::<T>::zeros(n, n);
    for j in 0..n {
        for i in 0..j {
            let col_i = q.column(i).clone_owned();
            let rij = col_i.dot(&q.column(j));
            r[(i, j)] = rij;
            let mut col_j = q.column_mut(j);
            col_j.axpy(-rij, &col_i, T::one());
        }
        let norm = q.column(j).norm();
        r[(j, j)] = norm;
        if norm > T::zero() {
            let mut col = q.column_mut(j);
            col /= norm;
        }
    }
    (q, r)
}

/// Classical Gram-Schmidt: projects against the *original* columns of `A`
/// rather than the already-orthogonalized ones. Less stable for
/// near-degenerate input; kept alongside [`modified_gram_schmidt`] as the
/// spec's named alternative for callers who don't need the extra
/// robustness.
pub fn classical_gram_schmidt<T: RealField + Copy>(a: &DMatrix<T>) -> (DMatrix<T>, DMatrix<T>) {
    let n = a.nrows();
    let mut q = DMatrix::<T>::zeros(n, n);
    let mut r = DMatrix::<T>::zeros(n, n);
    for j in 0..n {
        let mut v = a.column(j).clone_owned();
        for i in 0..j {
            let rij = a.column(i).dot(&a.column(j));
            r[(i, j)] = rij;
            let col_i = q.column(i).clone_owned();
            v.axpy(-rij, &col_i, T::one());
        }
        let norm = v.norm();
        r[(j, j)] = norm;
        if norm > T::zero() {
            v /= norm;
        }
        q.set_column(j, &v);
    }
    (q, r)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_orthonormal(q: &DMatrix<f64>, tol: f64) {
        let n = q.ncols();
        let gram = q.transpose() * q;
        for i in 0..n {
            for j in 0..n {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((gram[(i, j)] - expected).abs() < tol, "i={i} j={j}");
            }
        }
    }

    #[test]
    fn modified_gram_schmidt_reconstructs_and_orthonormalizes() {
        let a = DMatrix::from_row_slice(3, 3, &[1.0, 0.5, 0.2, 0.0, 1.0, 0.3, 0.0, 0.0, 1.0]);
        let (q, r) = modified_gram_schmidt(&a);
        assert_orthonormal(&q, 1e-12);
        let recon = &q * &r;
        for i in 0..3 {
            for j in 0..3 {
                assert!((recon[(i, j)] - a[(i, j)]).abs() < 1e-10);
            }
        }
        for i in 0..3 {
            assert!(r[(i, i)] >= 0.0);
        }
    }

    #[test]
    fn classical_gram_schmidt_reconstructs() {
        let a = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 0.0, 1.0]);
        let (q, r) = classical_gram_schmidt(&a);
        assert_orthonormal(&q, 1e-12);
        let recon = &q * &r;
        for i in 0..2 {
            for j in 0..2 {
                assert!((recon[(i, j)] - a[(i, j)]).abs() < 1e-10);
            }
        }
    }
}
