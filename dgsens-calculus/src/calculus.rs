use dgsens_traits::Real;
use nalgebra::{DMatrix, DMatrixViewMut, DVector, DVectorView, DVectorViewMut, SMatrix};
use numeric_literals::replace_float_literals;

/// Approximates the Jacobian of the function $f: \mathbb{R}^n \rightarrow \mathbb{R}^m$
/// with finite differences.
///
/// The Jacobian matrix is the $m \times n$ matrix whose entries are given by
/// $$ J_{ij} := \pd{f_i}{x_j}.$$
///
/// The parameter `h` determines the step size of the finite difference approximation.
pub fn approximate_jacobian_fd<'a, T>(
    m: usize,
    f: impl FnMut(DVectorView<T>, DVectorViewMut<T>),
    x: impl Into<DVectorViewMut<'a, T>>,
    h: T,
) -> DMatrix<T>
where
    T: Real,
{
    let x = x.into();
    let n = x.len();
    let mut jacobian = DMatrix::zeros(m, n);
    approximate_jacobian_fd_into_(DMatrixViewMut::from(&mut jacobian), f, x, h);
    jacobian
}

#[replace_float_literals(T::from_f64(literal).unwrap())]
fn approximate_jacobian_fd_into_<T>(
    mut j: DMatrixViewMut<T>,
    mut f: impl FnMut(DVectorView<T>, DVectorViewMut<T>),
    mut x: DVectorViewMut<T>,
    h: T,
) where
    T: Real,
{
    let m = j.nrows();
    let n = x.len();
    assert_eq!(n, j.ncols());

    // Buffers to hold f(x + e_i h) and f(x - e_i h)
    let mut f_plus = DVector::zeros(m);
    let mut f_minus = DVector::zeros(m);

    // Build column by column
    for i in 0..n {
        // df_dxi ~ (f(x + h e_i) - f(x - h e_i)) / (2 h)
        let xi = x[i];
        x[i] = xi + h;
        f(DVectorView::from(&x), DVectorViewMut::from(&mut f_plus));
        x[i] = xi - h;
        f(DVectorView::from(&x), DVectorViewMut::from(&mut f_minus));
        x[i] = xi;

        let mut df_dxi = j.column_mut(i);
        df_dxi.copy_from(&f_plus);
        df_dxi -= &f_minus;
        df_dxi /= 2.0 * h;
    }
}

/// Approximates the derivative of a matrix-valued function of one real variable with
/// fourth-order accurate central differences.
///
/// Uses the samples $f(x \pm h)$ and $f(x \pm 2h)$:
/// $$
/// f'(x) \approx \frac{-\frac{1}{4} f(x + 2h) + 2 f(x + h) - 2 f(x - h) + \frac{1}{4} f(x - 2h)}{3h}.
/// $$
#[replace_float_literals(T::from_f64(literal).unwrap())]
pub fn approximate_derivative_fd4<T, const R: usize, const C: usize>(
    mut f: impl FnMut(T) -> SMatrix<T, R, C>,
    x: T,
    h: T,
) -> SMatrix<T, R, C>
where
    T: Real,
{
    let f_plusplus = f(x + 2.0 * h);
    let f_plus = f(x + h);
    let f_minus = f(x - h);
    let f_minusminus = f(x - 2.0 * h);
    (f_plusplus * (-0.25) + f_plus * 2.0 - f_minus * 2.0 + f_minusminus * 0.25) / (3.0 * h)
}
