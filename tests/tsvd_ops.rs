//! Integration tests for the truncated SVD dispatcher and host entry point

mod common;

use common::*;
use tsvd::algorithm::{OuterSign, outer_product, solve_full, truncated_svd, truncated_svd_matrix};
use tsvd::dtype::ComputePrecision;
use tsvd::params::{Algorithm, Params};

#[test]
fn test_power_and_solver_agree() {
    let ctx = create_cpu_context();
    let x = cpu_matrix(&separated_6x4(), 6, 4);
    let base = Params::new(6, 4, 3).with_tol(1e-12).with_n_iter(1000);

    let power = truncated_svd_matrix(&ctx, &x, &base.clone().with_algorithm(Algorithm::Power)).unwrap();
    let solver = truncated_svd_matrix(&ctx, &x, &base.with_algorithm(Algorithm::Solver)).unwrap();

    assert_allclose_f64(&power.singular_values, &solver.singular_values, 1e-8, 1e-10, "w");
    let qp = power.q.to_vec::<f64>().unwrap();
    let qs = solver.q.to_vec::<f64>().unwrap();
    let up = power.u.to_vec::<f64>().unwrap();
    let us = solver.u.to_vec::<f64>().unwrap();
    for i in 0..3 {
        assert!(abs_cosine(&column(&qp, 3, i), &column(&qs, 3, i)) > 1.0 - 1e-8);
        assert!(abs_cosine(&column(&up, 3, i), &column(&us, 3, i)) > 1.0 - 1e-8);
    }
}

#[test]
fn test_solver_recovers_known_basis() {
    let ctx = create_cpu_context();
    let x = cpu_matrix(&separated_6x4(), 6, 4);
    let svd = truncated_svd_matrix(&ctx, &x, &Params::new(6, 4, 4)).unwrap();

    assert_allclose_f64(&svd.singular_values, &SEPARATED_6X4_SIGMA, 1e-10, 0.0, "sigma");
    let q = svd.q.to_vec::<f64>().unwrap();
    for (i, expected) in separated_6x4_right().iter().enumerate() {
        assert!(abs_cosine(&column(&q, 4, i), expected) > 1.0 - 1e-10);
    }
    assert!(svd.stats.iter().all(|s| s.converged && s.iterations == 0));

    // Full rank: the rank-4 reconstruction is exact
    let approx = svd.reconstruct(ctx.client()).unwrap().to_vec::<f64>().unwrap();
    assert!(frobenius_diff(&approx, &separated_6x4()) < 1e-10);
}

#[test]
fn test_explained_variance_ratio_bounds() {
    let ctx = create_cpu_context();
    let data: Vec<f64> = (0..40).map(|i| ((i * 37 % 23) as f64 - 11.0) * 0.3).collect();
    let x = cpu_matrix(&data, 10, 4);

    for algorithm in [Algorithm::Power, Algorithm::Solver] {
        let params = Params::new(10, 4, 4)
            .with_algorithm(algorithm)
            .with_tol(1e-10)
            .with_n_iter(2000);
        let svd = truncated_svd_matrix(&ctx, &x, &params).unwrap();
        let ratio = &svd.explained_variance_ratio;
        assert!(ratio.iter().all(|&r| (0.0..=1.0).contains(&r)), "{:?}", ratio);
        assert!(ratio.iter().sum::<f64>() <= 1.0 + 1e-6);
        assert!(svd.explained_variance.iter().all(|&v| v >= 0.0));
    }
}

#[test]
fn test_explained_variance_of_constant_matrix_is_zero() {
    let ctx = create_cpu_context();
    let x = cpu_matrix(&[2.0; 12], 4, 3);
    let svd = truncated_svd_matrix(&ctx, &x, &Params::new(4, 3, 1)).unwrap();
    assert!((svd.singular_values[0] - 48.0f64.sqrt()).abs() < 1e-10);
    assert_eq!(svd.explained_variance_ratio, vec![0.0]);
}

#[test]
fn test_host_entry_layout() {
    let data = separated_6x4();
    let params = Params::new(6, 4, 2);
    let mut q = vec![0.0f64; 4 * 2];
    let mut w = vec![0.0f64; 2];
    let mut u = vec![0.0f64; 6 * 2];
    truncated_svd(&data, &mut q, &mut w, &mut u, &params).unwrap();

    assert_allclose_f64(&w, &[10.0, 5.0], 1e-10, 0.0, "w");
    let right = separated_6x4_right();
    // q[j * k + i] is entry j of qᵢ
    for i in 0..2 {
        assert!(abs_cosine(&column(&q, 2, i), &right[i]) > 1.0 - 1e-10);
    }
    // u[r * k + i] · wᵢ == (X qᵢ)[r]
    for r in 0..6 {
        for i in 0..2 {
            let xq: f64 = (0..4).map(|j| data[r * 4 + j] * q[j * 2 + i]).sum();
            assert!((u[r * 2 + i] * w[i] - xq).abs() < 1e-9);
        }
    }
}

#[test]
fn test_f32_input_with_f64_precision() {
    let data: Vec<f32> = rank_two_4x3().iter().map(|&v| v as f32).collect();
    let mut q = vec![0.0f32; 3 * 2];
    let mut w = vec![0.0f32; 2];
    let mut u = vec![0.0f32; 4 * 2];

    for algorithm in [Algorithm::Power, Algorithm::Solver] {
        let params = Params::new(4, 3, 2)
            .with_algorithm(algorithm)
            .with_precision(ComputePrecision::F64);
        truncated_svd(&data, &mut q, &mut w, &mut u, &params).unwrap();
        assert!((w[0] - 5.0).abs() < 1e-4, "{}: {:?}", algorithm, w);
        assert!((w[1] - 0.01).abs() < 1e-4, "{}: {:?}", algorithm, w);
    }
}

#[test]
fn test_f32_working_precision() {
    let data: Vec<f32> = separated_6x4().iter().map(|&v| v as f32).collect();
    let mut q = vec![0.0f32; 4];
    let mut w = vec![0.0f32; 1];
    let mut u = vec![0.0f32; 6];
    let params = Params::new(6, 4, 1).with_algorithm(Algorithm::Power);
    truncated_svd(&data, &mut q, &mut w, &mut u, &params).unwrap();
    assert!((w[0] - 10.0).abs() < 1e-3);
}

#[test]
fn test_solve_full_and_outer_product() {
    let (client, _device) = create_cpu_client();
    let x = cpu_matrix(&separated_6x4(), 6, 4);
    let full = solve_full(&client, &x).unwrap();
    assert_allclose_f64(&full.singular_values, &SEPARATED_6X4_SIGMA, 1e-10, 0.0, "sigma");

    // Adding back σ₀² q₀ q₀ᵗ to a zero matrix rebuilds the leading Gram term
    let mut acc = cpu_matrix(&[0.0; 16], 4, 4);
    let q = full.q.to_vec::<f64>().unwrap();
    let q0 = column(&q, 4, 0);
    let v = cpu_matrix(&q0, 4, 1);
    let vt = v.transposed_vector().unwrap();
    outer_product(&client, &mut acc, 100.0, &v, &vt, OuterSign::Add).unwrap();
    let expected = vec![25.0; 16];
    assert_allclose_f64(&acc.to_vec::<f64>().unwrap(), &expected, 1e-10, 1e-10, "outer");
}
