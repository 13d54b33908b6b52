//! Norm-based comparison of a finite-difference matrix against a reference.
use crate::comm::Communicator;
use crate::error::MatrixError;
use crate::sparse::DistributedCsrMatrix;
use std::fmt;
use std::fmt::Display;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
}

/// Thresholds for [`compare_matrices`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ComparisonTolerances {
    /// Largest accepted relative $\ell^1$ discrepancy.
    pub tolerance: f64,
    /// Reference norms below this are treated as zero, and the discrepancy is measured in
    /// absolute terms.
    pub degenerate_norm_threshold: f64,
}

impl Default for ComparisonTolerances {
    fn default() -> Self {
        Self {
            tolerance: 1e-4,
            degenerate_norm_threshold: 1e-12,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ComparisonReport {
    /// Frobenius norm of the finite-difference matrix.
    pub fd_norm: f64,
    /// Frobenius norm of the reference matrix.
    pub ad_norm: f64,
    /// Normalization of the discrepancy: the larger of both norms, or one for a degenerate
    /// reference.
    pub frob_norm: f64,
    /// $\ell^1$ norm (maximum column sum) of FD - AD.
    pub difference_l1: f64,
    /// $\ell^\infty$ norm (maximum row sum) of FD - AD.
    pub difference_linf: f64,
    pub relative_l1: f64,
    pub relative_linf: f64,
    pub tolerance: f64,
    pub verdict: Verdict,
}

impl ComparisonReport {
    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Pass
    }

    /// Process exit status: zero for a pass, one for a failure.
    pub fn status(&self) -> i32 {
        match self.verdict {
            Verdict::Pass => 0,
            Verdict::Fail => 1,
        }
    }
}

impl Display for ComparisonReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FD-AD: L1 = {:e}, Linf = {:e} (relative to {:e}; |FD| = {:e}, |AD| = {:e}) -> {:?}",
            self.relative_l1, self.relative_linf, self.frob_norm, self.fd_norm, self.ad_norm, self.verdict
        )
    }
}

/// Compares the finite-difference matrix `fd` against the reference `ad`.
///
/// Returns the report together with the difference `fd - ad`, which is formed in place of
/// `fd`. The verdict is a pass if and only if the relative $\ell^1$ discrepancy does not
/// exceed the tolerance. Collective.
pub fn compare_matrices(
    mut fd: DistributedCsrMatrix,
    ad: &DistributedCsrMatrix,
    tolerances: &ComparisonTolerances,
    comm: &impl Communicator,
) -> Result<(ComparisonReport, DistributedCsrMatrix), MatrixError> {
    let ad_norm = ad.frobenius_norm(comm);
    let fd_norm = fd.frobenius_norm(comm);
    let frob_norm = if ad_norm < tolerances.degenerate_norm_threshold {
        1.0
    } else {
        ad_norm.max(fd_norm)
    };

    fd.add_scaled(-1.0, ad)?;
    let difference = fd;
    let difference_l1 = difference.l1_norm(comm);
    let difference_linf = difference.linfty_norm(comm);
    let relative_l1 = difference_l1 / frob_norm;
    let relative_linf = difference_linf / frob_norm;

    let verdict = if relative_l1 > tolerances.tolerance {
        Verdict::Fail
    } else {
        Verdict::Pass
    };

    let report = ComparisonReport {
        fd_norm,
        ad_norm,
        frob_norm,
        difference_l1,
        difference_linf,
        relative_l1,
        relative_linf,
        tolerance: tolerances.tolerance,
        verdict,
    };
    Ok((report, difference))
}
