//! Verification of periodic 1D finite-volume discretizations of the flux physics.
use super::data_output_path;
use dgsens::calculus::stencil::approximate_hessian_fd;
use dgsens::comm::{run_ranks, Communicator, SerialCommunicator};
use dgsens::system::{FunctionSystem, FunctionSystemBuilder};
use dgsens::verify::{verify_d2r_dw_dw, DualInitialization, VerificationSettings, VerificationSuite};
use dgsens_physics::{
    ConvectionDiffusion, Diffusion, Euler, LinearAdvection, NavierStokes, PdeType, Physics, PhysicsParameters,
};
use nalgebra::{DVector, DVectorView, DVectorViewMut, Point1, SVector};
use nalgebra_sparse::pattern::SparsityPattern;
use nalgebra_sparse::CsrMatrix;

/// Number of states of the 1D gas dynamics models.
const GAS_STATES: usize = 3;

/// How the reference Hessian of a finite-volume system is obtained.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Reference {
    /// The residual is linear in the state, so the Hessian vanishes identically.
    Zero,
    /// A dense finite-difference Hessian of the dual-weighted residual with a larger step.
    Dense,
}

/// Residual of a central finite-volume scheme on `n_cells` periodic cells of the unit interval,
/// $R_i = (F_{i+1} - F_{i-1}) / (2 \Delta x) - s(x_i)$, where the flux of each cell uses a
/// central difference for the solution gradient.
fn central_residual<P, const NSTATE: usize>(
    physics: &P,
    sources: &[SVector<f64, NSTATE>],
    w: DVectorView<f64>,
    mut r: DVectorViewMut<f64>,
) where
    P: Physics<f64, 1, NSTATE>,
{
    let n_cells = sources.len();
    let dx = 1.0 / n_cells as f64;
    let state = |k: usize| SVector::<f64, NSTATE>::from_fn(|s, _| w[NSTATE * k + s]);
    let flux = |k: usize| {
        let u = state(k);
        let gradient = (state((k + 1) % n_cells) - state((k + n_cells - 1) % n_cells)) / (2.0 * dx);
        physics.convective_flux(&u) + physics.dissipative_flux(&u, &gradient)
    };

    for i in 0..n_cells {
        let divergence = (flux((i + 1) % n_cells) - flux((i + n_cells - 1) % n_cells)) / (2.0 * dx);
        for s in 0..NSTATE {
            r[NSTATE * i + s] = divergence[s] - sources[i][s];
        }
    }
}

fn cell_center(i: usize, n_cells: usize) -> Point1<f64> {
    Point1::new((i as f64 + 0.5) / n_cells as f64)
}

fn finite_volume_system<P, C, const NSTATE: usize>(
    physics: P,
    reference: Reference,
    n_cells: usize,
    comm: C,
) -> eyre::Result<FunctionSystem<C>>
where
    P: Physics<f64, 1, NSTATE> + Clone + Send + Sync + 'static,
    C: Communicator,
{
    let n = NSTATE * n_cells;
    let manufactured = *physics.manufactured_solution();
    let mut solution = DVector::zeros(n);
    let mut sources = Vec::with_capacity(n_cells);
    for i in 0..n_cells {
        let x = cell_center(i, n_cells);
        let u = manufactured.value(&x);
        solution.rows_mut(NSTATE * i, NSTATE).copy_from(&u);
        sources.push(physics.source_term(&x, &u));
    }
    // A unit dual would make the dual-weighted residual telescope to a constant
    let dual = DVector::from_fn(n, |i, _| 1.0 + 0.1 * i as f64);

    let residual_physics = physics.clone();
    let residual_sources = sources.clone();
    FunctionSystemBuilder::new()
        .with_residual(move |w: DVectorView<f64>, r: DVectorViewMut<f64>| {
            central_residual(&residual_physics, &residual_sources, w, r)
        })
        .with_hessian(move |w: DVectorView<f64>, psi: DVectorView<f64>| match reference {
            Reference::Zero => CsrMatrix::zeros(w.len(), w.len()),
            Reference::Dense => {
                let psi = psi.clone_owned();
                let dual_weighted = |w: DVectorView<f64>| {
                    let mut r = DVector::zeros(w.len());
                    central_residual(&physics, &sources, w, DVectorViewMut::from(&mut r));
                    psi.dot(&r)
                };
                let mut w = w.clone_owned();
                CsrMatrix::from(&approximate_hessian_fd(dual_weighted, &mut w, 2e-3))
            }
        })
        .with_sparsity_pattern(dense_pattern(n))
        .with_solution(solution)
        .with_dual(dual)
        .build(comm)
}

fn dense_pattern(n: usize) -> SparsityPattern {
    let offsets = (0..=n).map(|i| i * n).collect();
    let indices = (0..n).flat_map(|_| 0..n).collect();
    SparsityPattern::try_from_offsets_and_indices(n, n, offsets, indices).unwrap()
}

/// Scalar laws are verified with a single state, gas dynamics with the three states of 1D.
fn pde_system<C: Communicator>(pde: PdeType, n_cells: usize, comm: C) -> eyre::Result<FunctionSystem<C>> {
    let parameters = PhysicsParameters::default();
    match pde {
        PdeType::Advection => {
            let physics = LinearAdvection::<f64, 1, 1>::from_parameters(&parameters);
            finite_volume_system::<_, _, 1>(physics, Reference::Zero, n_cells, comm)
        }
        PdeType::Diffusion => {
            let physics = Diffusion::<f64, 1, 1>::from_parameters(&parameters);
            finite_volume_system::<_, _, 1>(physics, Reference::Zero, n_cells, comm)
        }
        PdeType::ConvectionDiffusion => {
            let physics = ConvectionDiffusion::<f64, 1, 1>::from_parameters(&parameters);
            finite_volume_system::<_, _, 1>(physics, Reference::Zero, n_cells, comm)
        }
        PdeType::Euler => {
            let physics = Euler::<f64, 1, GAS_STATES>::from_parameters(&parameters)?;
            finite_volume_system::<_, _, GAS_STATES>(physics, Reference::Dense, n_cells, comm)
        }
        PdeType::NavierStokes => {
            let physics = NavierStokes::<f64, 1, GAS_STATES>::from_parameters(&parameters)?;
            finite_volume_system::<_, _, GAS_STATES>(physics, Reference::Dense, n_cells, comm)
        }
    }
}

fn settings_for(test_name: &str) -> VerificationSettings {
    VerificationSettings {
        step: 1e-3,
        dual: DualInitialization::Keep,
        ..VerificationSettings::default()
    }
    .with_output_dir(data_output_path().join("finite_volume").join(test_name))
}

#[test]
fn euler_serial_verification_passes() {
    let settings = settings_for("euler_serial_verification_passes");
    let mut system = pde_system(PdeType::Euler, 4, SerialCommunicator).unwrap();
    let report = verify_d2r_dw_dw(&mut system, &settings).unwrap();
    assert!(report.passed(), "{report}");
    assert!(report.ad_norm > 1e-3);
}

#[test]
fn euler_verification_agrees_across_ranks() {
    let settings = settings_for("euler_verification_agrees_across_ranks");
    let reports = run_ranks(2, |comm| -> Result<_, String> {
        let mut system = pde_system(PdeType::Euler, 3, comm).map_err(|error| format!("{error:?}"))?;
        verify_d2r_dw_dw(&mut system, &settings).map_err(|error| format!("{error:?}"))
    });
    let reports: Vec<_> = reports.into_iter().map(|report| report.unwrap()).collect();
    assert_eq!(reports[0], reports[1]);
    assert!(reports[0].passed(), "{}", reports[0]);
}

#[test]
fn linear_scalar_laws_use_absolute_discrepancies() {
    for pde in [PdeType::Advection, PdeType::Diffusion, PdeType::ConvectionDiffusion] {
        let settings = settings_for(&format!("linear_scalar_laws_use_absolute_discrepancies/{pde}"));
        let mut system = pde_system(pde, 4, SerialCommunicator).unwrap();
        let report = verify_d2r_dw_dw(&mut system, &settings).unwrap();

        assert!(report.passed(), "{pde}: {report}");
        assert!(report.ad_norm < 1e-12, "{pde}: {report}");
        assert_eq!(report.frob_norm, 1.0);
        // With a unit normalization the relative norms are the norms of the difference
        assert_eq!(report.relative_l1, report.difference_l1);
        assert_eq!(report.relative_linf, report.difference_linf);
    }
}

#[test]
fn convection_diffusion_agrees_across_ranks() {
    let settings = settings_for("convection_diffusion_agrees_across_ranks");
    let reports = run_ranks(3, |comm| -> Result<_, String> {
        let mut system = pde_system(PdeType::ConvectionDiffusion, 5, comm).map_err(|error| format!("{error:?}"))?;
        verify_d2r_dw_dw(&mut system, &settings).map_err(|error| format!("{error:?}"))
    });
    let reports: Vec<_> = reports.into_iter().map(|report| report.unwrap()).collect();
    assert_eq!(reports[0], reports[1]);
    assert_eq!(reports[1], reports[2]);
    assert!(reports[0].passed(), "{}", reports[0]);
    assert_eq!(reports[0].frob_norm, 1.0);
}

#[test]
fn all_models_suite_passes() {
    let settings = settings_for("all_models_suite_passes");
    let mut suite = VerificationSuite::new(settings);
    // Scalar laws first, then gas dynamics
    let models = [
        PdeType::Diffusion,
        PdeType::Advection,
        PdeType::ConvectionDiffusion,
        PdeType::Euler,
        PdeType::NavierStokes,
    ];
    for pde in models {
        for n_cells in [3, 4] {
            suite.add_system(format!("{pde} with {n_cells} cells"), move || {
                pde_system(pde, n_cells, SerialCommunicator)
            });
        }
    }
    assert_eq!(suite.len(), 10);

    let outcome = suite.run().unwrap();
    assert_eq!(outcome.reports.len(), 10);
    assert_eq!(outcome.status(), 0, "{:?}", outcome.first_failure());
}
