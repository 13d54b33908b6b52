use super::unit_square_points;
use dgsens_physics::{ConvectionDiffusion, Diffusion, LinearAdvection, Physics, PhysicsParameters};
use matrixcompare::assert_matrix_eq;
use nalgebra::{matrix, vector, Point};

#[test]
fn linear_advection_flux_and_eigenvalues() {
    let advection = LinearAdvection::<f64, 2, 2>::from_parameters(&PhysicsParameters::default());
    let c = advection.velocity;
    let u = vector![2.0, -1.0];

    let flux = advection.convective_flux(&u);
    assert_matrix_eq!(flux, matrix![2.0 * c[0], 2.0 * c[1]; -c[0], -c[1]], comp = float);

    let normal = vector![0.6, 0.8];
    let eigenvalues = advection.convective_eigenvalues(&u, &normal);
    assert_matrix_eq!(eigenvalues, vector![c.dot(&normal), c.dot(&normal)], comp = float);
    assert_eq!(advection.max_convective_eigenvalue(&u), c.norm());
}

#[test]
fn diffusion_flux_is_negative_scaled_gradient() {
    let parameters = PhysicsParameters {
        diffusion_coefficient: 2.0,
        ..PhysicsParameters::default()
    };
    let diffusion = Diffusion::<f64, 2, 1>::from_parameters(&parameters);
    let gradient = matrix![3.0, -4.0];
    let flux = diffusion.dissipative_flux(&vector![1.0], &gradient);
    assert_matrix_eq!(flux, matrix![-6.0, 8.0], comp = float);
    assert_eq!(diffusion.convective_flux(&vector![1.0]), matrix![0.0, 0.0]);
}

#[test]
fn linear_advection_source_matches_closed_form() {
    let advection = LinearAdvection::<f64, 2, 1>::from_parameters(&PhysicsParameters::default());
    let manufactured = advection.manufactured;
    for x in unit_square_points(6) {
        // div(c u) = c . grad(u)
        let expected = manufactured.gradient(&x) * advection.velocity;
        let source = advection.source_term(&x, &manufactured.value(&x));
        assert_matrix_eq!(source, expected, comp = abs, tol = 1e-9);
    }
}

#[test]
fn diffusion_source_matches_closed_form() {
    let diffusion = Diffusion::<f64, 3, 1>::from_parameters(&PhysicsParameters::default());
    let manufactured = diffusion.manufactured;
    let points = [Point::from([0.1, 0.2, 0.3]), Point::from([0.9, 0.4, 0.7]), Point::from([0.5, 0.5, 0.5])];
    for x in points {
        // div(-k grad(u)) = -k laplacian(u)
        let expected = manufactured.laplacian(&x) * (-diffusion.diffusion_coefficient);
        let source = diffusion.source_term(&x, &manufactured.value(&x));
        assert_matrix_eq!(source, expected, comp = abs, tol = 1e-8);
    }
}

#[test]
fn convection_diffusion_source_is_sum_of_parts() {
    let parameters = PhysicsParameters::default();
    let convection_diffusion = ConvectionDiffusion::<f64, 2, 1>::from_parameters(&parameters);
    let advection = LinearAdvection::<f64, 2, 1>::from_parameters(&parameters);
    let diffusion = Diffusion::<f64, 2, 1>::from_parameters(&parameters);
    for x in unit_square_points(4) {
        let u = vector![0.0];
        let expected = advection.source_term(&x, &u) + diffusion.source_term(&x, &u);
        assert_matrix_eq!(convection_diffusion.source_term(&x, &u), expected, comp = abs, tol = 1e-9);
    }
}
