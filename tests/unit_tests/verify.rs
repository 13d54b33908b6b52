use super::{data_output_path, dense_pattern, quadratic_system, squares_system};
use dgsens::comm::SerialCommunicator;
use dgsens::compare::{ComparisonReport, Verdict};
use dgsens::io::{AD_MATRIX_FILE, DIFFERENCE_MATRIX_FILE, FD_MATRIX_FILE};
use dgsens::system::DgSystem;
use dgsens::verify::{verify_d2r_dw_dw, DualInitialization, VerificationSettings, VerificationSuite};
use matrixcompare::assert_scalar_eq;
use nalgebra::DVector;
use std::cell::Cell;
use std::path::PathBuf;

fn settings_for(test_name: &str) -> VerificationSettings {
    VerificationSettings::default().with_output_dir(data_output_path().join("verify").join(test_name))
}

fn report_with_verdict(verdict: Verdict) -> ComparisonReport {
    ComparisonReport {
        fd_norm: 1.0,
        ad_norm: 1.0,
        frob_norm: 1.0,
        difference_l1: 0.0,
        difference_linf: 0.0,
        relative_l1: 0.0,
        relative_linf: 0.0,
        tolerance: 1e-4,
        verdict,
    }
}

#[test]
fn default_settings() {
    let settings = VerificationSettings::default();
    assert_eq!(settings.step, 1e-4);
    assert_eq!(settings.tolerance, 1e-4);
    assert_eq!(settings.drop_tolerance, 1e-12);
    assert_eq!(settings.degenerate_norm_threshold, 1e-12);
    assert_eq!(settings.output_dir, PathBuf::from("."));
    assert_eq!(settings.dump_digits, 5);
    assert_eq!(settings.dual, DualInitialization::Unit);
}

#[test]
fn settings_deserialize_with_defaults() {
    let settings: VerificationSettings =
        serde_json::from_str(r#"{ "step": 0.001, "dual": "keep", "output_dir": "out" }"#).unwrap();
    assert_eq!(settings.step, 1e-3);
    assert_eq!(settings.dual, DualInitialization::Keep);
    assert_eq!(settings.output_dir, PathBuf::from("out"));
    assert_eq!(settings.tolerance, 1e-4);

    let json = serde_json::to_string(&settings).unwrap();
    let round_trip: VerificationSettings = serde_json::from_str(&json).unwrap();
    assert_eq!(round_trip, settings);
}

#[test]
fn single_square_dof_passes() {
    let settings = settings_for("single_square_dof_passes");
    let mut system = squares_system(SerialCommunicator, DVector::from_element(1, 1.7), dense_pattern(1));
    let report = verify_d2r_dw_dw(&mut system, &settings).unwrap();

    assert_eq!(report.verdict, Verdict::Pass);
    assert_scalar_eq!(report.ad_norm, 2.0, comp = float);
    assert_scalar_eq!(report.fd_norm, 2.0, comp = abs, tol = 1e-6);
    assert!(report.relative_l1 < 1e-6);
    assert_eq!(system.dual().get(0), Some(1.0));
    assert_eq!(system.solution().get(0), Some(1.7));

    for file in [FD_MATRIX_FILE, AD_MATRIX_FILE, DIFFERENCE_MATRIX_FILE] {
        assert!(settings.output_dir.join(file).is_file());
    }
}

#[test]
fn quadratic_system_passes() {
    let settings = settings_for("quadratic_system_passes");
    let mut system = quadratic_system(SerialCommunicator, [0.25, -0.75]);
    let report = verify_d2r_dw_dw(&mut system, &settings).unwrap();
    assert!(report.passed(), "{report}");
    assert_eq!(system.assembly_count(), 2 + 3 * 25);
}

#[test]
fn kept_zero_dual_gives_degenerate_reference() {
    let settings = VerificationSettings {
        dual: DualInitialization::Keep,
        ..settings_for("kept_zero_dual_gives_degenerate_reference")
    };
    let mut system = quadratic_system(SerialCommunicator, [0.25, -0.75]);
    let report = verify_d2r_dw_dw(&mut system, &settings).unwrap();
    assert_eq!(report.ad_norm, 0.0);
    assert_eq!(report.fd_norm, 0.0);
    assert_eq!(report.frob_norm, 1.0);
    assert_eq!(report.verdict, Verdict::Pass);
}

#[test]
fn wrong_reference_fails() {
    let settings = settings_for("wrong_reference_fails");
    let mut system = dgsens::system::FunctionSystemBuilder::new()
        .with_residual(|w: nalgebra::DVectorView<f64>, mut r: nalgebra::DVectorViewMut<f64>| r[0] = w[0] * w[0])
        .with_hessian(|_w: nalgebra::DVectorView<f64>, psi: nalgebra::DVectorView<f64>| {
            // Off by a factor of two
            nalgebra_sparse::CsrMatrix::from(&nalgebra::DMatrix::from_element(1, 1, psi[0]))
        })
        .with_sparsity_pattern(dense_pattern(1))
        .build(SerialCommunicator)
        .unwrap();
    let report = verify_d2r_dw_dw(&mut system, &settings).unwrap();
    assert_eq!(report.verdict, Verdict::Fail);
    assert_scalar_eq!(report.relative_l1, 0.5, comp = abs, tol = 1e-6);
}

#[test]
fn suite_stops_at_first_failure() {
    let executed = Cell::new(0);
    let mut suite = VerificationSuite::new(VerificationSettings::default());
    suite.add_case("first", |_| {
        executed.set(executed.get() + 1);
        Ok(report_with_verdict(Verdict::Pass))
    });
    suite.add_case("second", |_| {
        executed.set(executed.get() + 1);
        Ok(report_with_verdict(Verdict::Fail))
    });
    suite.add_case("third", |_| {
        executed.set(executed.get() + 1);
        Ok(report_with_verdict(Verdict::Pass))
    });
    assert_eq!(suite.len(), 3);

    let outcome = suite.run().unwrap();
    assert_eq!(executed.get(), 2);
    assert_eq!(outcome.reports.len(), 2);
    assert_eq!(outcome.status(), 1);
    assert_eq!(outcome.first_failure().unwrap().0, "second");
}

#[test]
fn suite_of_passing_systems_has_zero_status() {
    let mut suite = VerificationSuite::new(settings_for("suite_of_passing_systems_has_zero_status"));
    suite.add_system("quadratic", || Ok(quadratic_system(SerialCommunicator, [0.1, 0.2])));
    suite.add_system("squares", || {
        Ok(squares_system(SerialCommunicator, DVector::from_element(3, -0.4), dense_pattern(3)))
    });
    let outcome = suite.run().unwrap();
    assert_eq!(outcome.reports.len(), 2);
    assert_eq!(outcome.status(), 0);
    assert!(outcome.first_failure().is_none());
}

#[test]
fn suite_propagates_construction_errors() {
    let mut suite = VerificationSuite::new(VerificationSettings::default());
    suite.add_case("broken", |_| Err(eyre::eyre!("could not build system")));
    let error = suite.run().unwrap_err();
    assert!(format!("{error:?}").contains("broken"));
}
