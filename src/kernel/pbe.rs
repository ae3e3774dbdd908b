//! PBE exchange (GGA).
//!
//! Energy from the enhancement factor F_x(s) over the reduced gradient
//! s = |grad n| / (2 (3 pi^2)^(1/3) n^(4/3)), spin-scaled per channel:
//! e[a, b] = (e[2a] + e[2b]) / 2 and v_sigma = v[2 n_sigma].
//!
//! The potential is the full functional derivative
//! v = de/dn - div(de/d grad n), expanded over the packed gradient and
//! symmetric-Hessian columns [xx, xy, xz, yy, yz, zz].

use std::f64::consts::PI;

const KAPPA: f64 = 0.804;
const MU: f64 = 0.219_514_972_764_517_1;

#[inline]
fn c_x() -> f64 {
    -0.75 * (3.0 / PI).powf(1.0 / 3.0)
}

/// Denominator prefactor 2 (3 pi^2)^(1/3) of the reduced gradient.
#[inline]
fn c_s() -> f64 {
    2.0 * (3.0 * PI * PI).powf(1.0 / 3.0)
}

#[inline]
fn fx(s: f64) -> f64 {
    let t = 1.0 + (MU / KAPPA) * s * s;
    1.0 + KAPPA - KAPPA / t
}

#[inline]
fn dfx_ds(s: f64) -> f64 {
    let t = 1.0 + (MU / KAPPA) * s * s;
    2.0 * MU * s / (t * t)
}

#[inline]
fn d2fx_ds2(s: f64) -> f64 {
    let t = 1.0 + (MU / KAPPA) * s * s;
    2.0 * MU / (t * t) - 8.0 * MU * MU * s * s / (KAPPA * t * t * t)
}

/// Unpolarized energy density for total density `n` and gradient norm `g`.
fn energy_unpolarized(n: f64, g: f64) -> f64 {
    if n <= 0.0 {
        return 0.0;
    }
    let s = g / (c_s() * n.powf(4.0 / 3.0));
    c_x() * n.powf(4.0 / 3.0) * fx(s)
}

/// Unpolarized potential v = de/dn - div(de/d grad n) at one point.
///
/// The divergence is expanded with the chain rule over the local gradient
/// and Hessian: d/dx_i F(n, grad n) = (dF/dn) g_i + sum_j (dF/dg_j) H_ij.
fn potential_unpolarized(n: f64, g: &[f64; 3], h: &[f64; 6]) -> f64 {
    if n <= 0.0 {
        return 0.0;
    }
    let gnorm = (g[0] * g[0] + g[1] * g[1] + g[2] * g[2]).sqrt();
    let denom = c_s() * n.powf(4.0 / 3.0);
    let s = gnorm / denom;
    let k = c_x() / c_s();

    let dedn = (4.0 / 3.0) * c_x() * n.powf(1.0 / 3.0) * (fx(s) - s * dfx_ds(s));

    let lap = h[0] + h[3] + h[5];
    let divw = if gnorm < 1e-12 {
        // s -> 0 limit; the direction-dependent terms cancel.
        2.0 * MU * k * lap / denom
    } else {
        let ghg = g[0] * g[0] * h[0]
            + g[1] * g[1] * h[3]
            + g[2] * g[2] * h[5]
            + 2.0 * (g[0] * g[1] * h[1] + g[0] * g[2] * h[2] + g[1] * g[2] * h[4]);
        // sum_i u_i ds/dx_i with u = g / |g|
        let s_along_g = -(4.0 / 3.0) * (s / n) * gnorm + ghg / (gnorm * gnorm * denom);
        k * (d2fx_ds2(s) * s_along_g
            + dfx_ds(s) * (lap / gnorm - ghg / (gnorm * gnorm * gnorm)))
    };

    dedn - divw
}

#[inline]
fn norm3(g: &[f64; 3]) -> f64 {
    (g[0] * g[0] + g[1] * g[1] + g[2] * g[2]).sqrt()
}

#[inline]
fn scale3(g: &[f64; 3], f: f64) -> [f64; 3] {
    [f * g[0], f * g[1], f * g[2]]
}

#[inline]
fn scale6(h: &[f64; 6], f: f64) -> [f64; 6] {
    [f * h[0], f * h[1], f * h[2], f * h[3], f * h[4], f * h[5]]
}

pub(crate) fn pbex_energy(a: f64, b: f64, ga: &[f64; 3], gb: &[f64; 3]) -> f64 {
    0.5 * (energy_unpolarized(2.0 * a, 2.0 * norm3(ga))
        + energy_unpolarized(2.0 * b, 2.0 * norm3(gb)))
}

pub(crate) fn pbex_energy_potential(
    a: f64,
    b: f64,
    ga: &[f64; 3],
    gb: &[f64; 3],
    ha: &[f64; 6],
    hb: &[f64; 6],
) -> (f64, f64, f64) {
    let e = pbex_energy(a, b, ga, gb);
    let va = potential_unpolarized(2.0 * a, &scale3(ga, 2.0), &scale6(ha, 2.0));
    let vb = potential_unpolarized(2.0 * b, &scale3(gb, 2.0), &scale6(hb, 2.0));
    (e, va, vb)
}
