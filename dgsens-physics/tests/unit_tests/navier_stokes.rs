use super::unit_square_points;
use dgsens_calculus::calculus::approximate_derivative_fd4;
use dgsens_physics::{manufactured_total_flux, NavierStokes, Physics};
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::{vector, Point, SMatrix, SVector};

const TOLERANCE: f64 = 1e-5;

fn navier_stokes() -> NavierStokes<f64, 2, 4> {
    // Low Reynolds number so that the viscous terms dominate the source
    NavierStokes::new(1.4, 1.0, 1.0e-4, 0.72).unwrap()
}

#[test]
fn viscous_flux_vanishes_for_uniform_flow() {
    let ns = navier_stokes();
    let u = vector![1.0, 0.3, 0.2, 30.0];
    let flux = ns.dissipative_flux(&u, &SMatrix::zeros());
    assert_matrix_eq!(flux, SMatrix::<f64, 4, 2>::zeros(), comp = float);
}

#[test]
fn temperature_is_one_in_free_stream() {
    let ns = NavierStokes::<f64, 2, 4>::new(1.4, 0.5, 5.0e4, 0.72).unwrap();
    // rho = 1, p = 1 / (gamma M^2)
    let pressure = 1.0 / (1.4 * 0.25);
    let energy = pressure / 0.4 + 0.5 * (0.5f64.powi(2));
    let u = vector![1.0, 0.5, 0.0, energy];
    assert_scalar_eq!(ns.compute_temperature(&u), 1.0, comp = abs, tol = 1e-13);
    assert_scalar_eq!(ns.compute_viscosity(1.0), 1.0, comp = abs, tol = 1e-14);
}

#[test]
fn primitive_gradients_match_finite_differences() {
    let ns = navier_stokes();
    let manufactured = *ns.manufactured_solution();
    let x = Point::from([0.3, 0.7]);
    let u = manufactured.value(&x);
    let u_grad = manufactured.gradient(&x);

    let temperature_gradient = ns.compute_temperature_gradient(&u, &u_grad);
    let velocity_gradient = ns.compute_velocity_gradient(&u, &u_grad);
    for d in 0..2 {
        let along = |t: f64| {
            let mut y = x;
            y[d] = t;
            manufactured.value(&y)
        };
        let temperature_d = approximate_derivative_fd4(|t| SVector::<f64, 1>::new(ns.compute_temperature(&along(t))), x[d], 1e-4);
        assert_scalar_eq!(temperature_gradient[d], temperature_d[0], comp = abs, tol = 1e-9);

        let velocity_d = approximate_derivative_fd4(|t| ns.euler.compute_velocities(&along(t)), x[d], 1e-4);
        assert_matrix_eq!(velocity_gradient.column(d), velocity_d, comp = abs, tol = 1e-9);
    }
}

#[test]
fn manufactured_source_matches_flux_divergence() {
    let ns = navier_stokes();
    let perturbation = 1e-5;

    for vertex in unit_square_points(11) {
        let source = ns.source_term(&vertex, &ns.manufactured_solution().value(&vertex));

        let mut divergence = SVector::<f64, 4>::zeros();
        for d in 0..2 {
            let flux_d = |t: f64| {
                let mut y = vertex;
                y[d] = t;
                manufactured_total_flux(&ns, &y).column(d).into_owned()
            };
            divergence += approximate_derivative_fd4(flux_d, vertex[d], perturbation);
        }

        for s in 0..4 {
            let scale = source[s].abs().max(1.0);
            assert!(
                (divergence[s] - source[s]).abs() <= TOLERANCE * scale,
                "state {s} at {vertex}: {} vs {}",
                divergence[s],
                source[s]
            );
        }
    }
}
