//! End-to-end verification of $\pdd{(\vec \psi \cdot \vec R)}{\vec w}{\vec w}$.
use crate::comm::Communicator;
use crate::compare::{compare_matrices, ComparisonReport, ComparisonTolerances};
use crate::hessian::FiniteDifferenceHessian;
use crate::io::write_dense_dumps;
use crate::perturbation::CollectiveResidual;
use crate::system::{AssemblyRequest, DgSystem};
use eyre::{eyre, WrapErr};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How the dual vector is set before differentiating.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DualInitialization {
    /// Every entry is one, so that every residual component contributes.
    #[default]
    Unit,
    /// Use the dual the system already holds.
    Keep,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationSettings {
    /// Finite difference step.
    pub step: f64,
    /// Largest accepted relative $\ell^1$ discrepancy.
    pub tolerance: f64,
    /// Finite-difference entries smaller than this in magnitude are not stored.
    pub drop_tolerance: f64,
    /// Reference norms below this switch to absolute discrepancies.
    pub degenerate_norm_threshold: f64,
    /// Directory receiving the dense matrix dumps.
    pub output_dir: PathBuf,
    /// Fraction digits in the dense matrix dumps.
    pub dump_digits: usize,
    pub dual: DualInitialization,
}

impl Default for VerificationSettings {
    fn default() -> Self {
        Self {
            step: 1e-4,
            tolerance: 1e-4,
            drop_tolerance: 1e-12,
            degenerate_norm_threshold: 1e-12,
            output_dir: PathBuf::from("."),
            dump_digits: 5,
            dual: DualInitialization::Unit,
        }
    }
}

impl VerificationSettings {
    pub fn comparison_tolerances(&self) -> ComparisonTolerances {
        ComparisonTolerances {
            tolerance: self.tolerance,
            degenerate_norm_threshold: self.degenerate_norm_threshold,
        }
    }

    pub fn with_output_dir(self, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..self
        }
    }
}

/// Compares the Hessian provided by `system` against a finite-difference approximation.
///
/// The reference Hessian is assembled once before differentiating and once more afterwards,
/// at the restored solution, and it is the latter that is compared. Dense dumps of both
/// matrices and their difference are written regardless of the verdict. Collective.
pub fn verify_d2r_dw_dw<S>(system: &mut S, settings: &VerificationSettings) -> eyre::Result<ComparisonReport>
where
    S: DgSystem + ?Sized,
{
    let is_root = system.communicator().rank() == 0;
    if is_root {
        info!("Number of dofs: {}", system.partition().n_dofs());
    }

    if settings.dual == DualInitialization::Unit {
        system.dual_mut().fill(1.0);
    }

    system
        .assemble_residual(AssemblyRequest::HESSIAN)
        .wrap_err("Failed to assemble reference Hessian")?;
    let pattern = system.d2r_dw_dw_sparsity_pattern().clone();

    let fd = {
        let mut service = CollectiveResidual::new(&mut *system);
        FiniteDifferenceHessian::new(settings.step)
            .with_drop_tolerance(settings.drop_tolerance)
            .assemble(&mut service, &pattern)
            .wrap_err("Failed to assemble finite-difference Hessian")?
    };

    system
        .assemble_residual(AssemblyRequest::HESSIAN)
        .wrap_err("Failed to assemble reference Hessian")?;
    let ad = system
        .d2r_dw_dw()
        .ok_or_else(|| eyre!("System assembled no Hessian"))?
        .clone();

    let comm = system.communicator();
    let (report, difference) = compare_matrices(fd.clone(), &ad, &settings.comparison_tolerances(), comm)?;
    write_dense_dumps(&settings.output_dir, &fd, &ad, &difference, settings.dump_digits, comm)?;

    if is_root {
        info!("AD Frobenius norm: {:e}, FD Frobenius norm: {:e}", report.ad_norm, report.fd_norm);
        info!("{}", report);
        if !report.passed() {
            warn!(
                "Relative L1 discrepancy {:e} exceeds tolerance {:e}",
                report.relative_l1, report.tolerance
            );
        }
    }
    Ok(report)
}

type CaseFn<'a> = Box<dyn FnOnce(&VerificationSettings) -> eyre::Result<ComparisonReport> + 'a>;

struct VerificationCase<'a> {
    label: String,
    run: CaseFn<'a>,
}

/// An ordered list of labelled verification cases sharing one set of settings.
///
/// Cases are constructed lazily when the suite runs, and the suite stops at the first case
/// whose verdict is a failure.
pub struct VerificationSuite<'a> {
    settings: VerificationSettings,
    cases: Vec<VerificationCase<'a>>,
}

impl<'a> VerificationSuite<'a> {
    pub fn new(settings: VerificationSettings) -> Self {
        Self {
            settings,
            cases: Vec::new(),
        }
    }

    pub fn settings(&self) -> &VerificationSettings {
        &self.settings
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Adds a case that produces its own report.
    pub fn add_case<F>(&mut self, label: impl Into<String>, run: F)
    where
        F: FnOnce(&VerificationSettings) -> eyre::Result<ComparisonReport> + 'a,
    {
        self.cases.push(VerificationCase {
            label: label.into(),
            run: Box::new(run),
        });
    }

    /// Adds a case that builds a system and runs [`verify_d2r_dw_dw`] on it.
    pub fn add_system<S, F>(&mut self, label: impl Into<String>, build: F)
    where
        S: DgSystem,
        F: FnOnce() -> eyre::Result<S> + 'a,
    {
        self.add_case(label, move |settings| {
            let mut system = build()?;
            verify_d2r_dw_dw(&mut system, settings)
        });
    }

    /// Runs the cases in order until one fails.
    pub fn run(self) -> eyre::Result<SuiteOutcome> {
        let mut reports = Vec::with_capacity(self.cases.len());
        for case in self.cases {
            info!("Verifying {}", case.label);
            let report = (case.run)(&self.settings).wrap_err_with(|| format!("Case {} failed to run", case.label))?;
            let passed = report.passed();
            reports.push((case.label, report));
            if !passed {
                break;
            }
        }
        Ok(SuiteOutcome { reports })
    }
}

/// The reports of the cases a suite ran, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct SuiteOutcome {
    pub reports: Vec<(String, ComparisonReport)>,
}

impl SuiteOutcome {
    /// Zero if every case passed, otherwise the status of the failing case.
    pub fn status(&self) -> i32 {
        self.first_failure()
            .map(|(_, report)| report.status())
            .unwrap_or(0)
    }

    pub fn first_failure(&self) -> Option<&(String, ComparisonReport)> {
        self.reports.iter().find(|(_, report)| !report.passed())
    }
}
