//! Identify a forced two-state system with and without knowledge of B.

use koopman_dmdc::{Dmdc, DmdcConfig, EigSort, SvdRank};

fn main() {
    // x(k+1) = A x(k) + B u(k), A = [[0.9, 0.1], [0, 0.8]], B = [1, 0.5]ᵀ
    let n = 50;
    let mut x = faer::Mat::<f64>::zeros(2, n);
    let mut u = faer::Mat::<f64>::zeros(1, n - 1);
    let mut b = faer::Mat::<f64>::zeros(2, 1);
    b[(0, 0)] = 1.0;
    b[(1, 0)] = 0.5;

    x[(0, 0)] = 1.0;
    x[(1, 0)] = -1.0;
    for k in 0..n - 1 {
        u[(0, k)] = (k as f64 * 0.4).sin();
        x[(0, k + 1)] = 0.9 * x[(0, k)] + 0.1 * x[(1, k)] + u[(0, k)];
        x[(1, k + 1)] = 0.8 * x[(1, k)] + 0.5 * u[(0, k)];
    }

    let config = DmdcConfig {
        svd_rank: SvdRank::Full,
        sorted_eigs: Some(EigSort::Abs),
        ..Default::default()
    };
    let dmdc = Dmdc::new(config);

    let known = dmdc.fit(&x, &u, Some(&b)).unwrap();
    println!("Known B");
    for (j, ev) in known.eigs().iter().enumerate() {
        println!("  λ{j} = {:.6} {:+.6}i", ev.re, ev.im);
    }

    let unknown = dmdc.fit(&x, &u, None).unwrap();
    println!("\nUnknown B");
    for (j, ev) in unknown.eigs().iter().enumerate() {
        println!("  λ{j} = {:.6} {:+.6}i", ev.re, ev.im);
    }
    let b_hat = unknown.b();
    println!("  B = [{:.6}, {:.6}]", b_hat[(0, 0)], b_hat[(1, 0)]);

    // Forecast the response to a step input.
    let mut step = faer::Mat::<f64>::zeros(1, n - 1);
    for k in 0..n - 1 {
        step[(0, k)] = 1.0;
    }
    let forecast = unknown.reconstructed_data(Some(&step)).unwrap();
    println!("\nStep response:");
    println!("  x[0]: {:.4} -> {:.4}", forecast[(0, 0)], forecast[(0, n - 1)]);
    println!("  x[1]: {:.4} -> {:.4}", forecast[(1, 0)], forecast[(1, n - 1)]);
}
