//! Slater exchange and VWN5 correlation.
//!
//! Per-point energies with analytic derivatives with respect to the alpha
//! and beta densities. Conventions follow the usual quantum-chemistry forms:
//!
//! - Slater: e = -(81/32pi)^(1/3) (a^(4/3) + b^(4/3))
//! - VWN5:   e = n eps_c(r_s, zeta) with the para/ferro/inter interpolation
//!
//! Non-positive densities contribute zero.

use std::f64::consts::PI;

#[inline]
fn c_slater() -> f64 {
    (81.0 / (32.0 * PI)).powf(1.0 / 3.0)
}

#[inline]
fn pos(x: f64) -> f64 {
    x.max(0.0)
}

pub(crate) fn slater_energy(a: f64, b: f64) -> f64 {
    -c_slater() * (pos(a).powf(4.0 / 3.0) + pos(b).powf(4.0 / 3.0))
}

pub(crate) fn slater_energy_potential(a: f64, b: f64) -> (f64, f64, f64) {
    let c = c_slater();
    let va = if a > 0.0 {
        -c * (4.0 / 3.0) * a.powf(1.0 / 3.0)
    } else {
        0.0
    };
    let vb = if b > 0.0 {
        -c * (4.0 / 3.0) * b.powf(1.0 / 3.0)
    } else {
        0.0
    };
    (slater_energy(a, b), va, vb)
}

// VWN parameter sets [x0, A, b, c]; the A values are already doubled with
// respect to the Molpro manual, and the inter A is exactly -1/(3 pi^2).
const VWN_PARA: [f64; 4] = [-0.10498, 0.0621814, 3.72744, 12.9352];
const VWN_FERRO: [f64; 4] = [-0.325, 0.0310907, 7.06042, 18.0578];

#[inline]
fn vwn_inter() -> [f64; 4] {
    [-0.0047584, -1.0 / (3.0 * PI * PI), 1.13107, 13.0045]
}

// (2^(1/3) - 1)^(-1/2) spin-interpolation prefactor.
const VWN_G: f64 = 1.92366105093154;

#[inline]
fn vwn_fz_scale() -> f64 {
    9.0 / 4.0 * (2.0_f64.powf(1.0 / 3.0) - 1.0)
}

fn vwn_f(s: f64, p: &[f64; 4]) -> f64 {
    let [x0, a, pb, pc] = *p;
    let x = s * s + pb * s + pc;
    let y = s - x0;
    let q = (4.0 * pc - pb * pb).sqrt();
    let av = x0 * pb / (x0 * x0 + x0 * pb + pc) - 1.0;
    let bv = 2.0 * av + 2.0;
    let cv = 2.0 * pb * (1.0 / q - x0 / ((x0 * x0 + x0 * pb + pc) * q / (pb + 2.0 * x0)));
    0.5 * a
        * (2.0 * s.ln() + av * x.ln() - bv * y.ln() + cv * (q / (2.0 * s + pb)).atan())
}

fn vwn_df_ds(s: f64, p: &[f64; 4]) -> f64 {
    let [x0, a, pb, pc] = *p;
    let x = s * s + pb * s + pc;
    let y = s - x0;
    let q = (4.0 * pc - pb * pb).sqrt();
    let av = x0 * pb / (x0 * x0 + x0 * pb + pc) - 1.0;
    let bv = 2.0 * av + 2.0;
    let cv = 2.0 * pb * (1.0 / q - x0 / ((x0 * x0 + x0 * pb + pc) * q / (pb + 2.0 * x0)));
    0.5 * a
        * (2.0 / s + av * (2.0 * s + pb) / x - bv / y
            - 2.0 * cv * q / ((2.0 * s + pb).powi(2) + q * q))
}

fn eps_and_derivs(n: f64, zeta: f64) -> (f64, f64, f64) {
    let inter = vwn_inter();
    let kfz = vwn_fz_scale();
    let rs = (3.0 / (4.0 * PI * n)).powf(1.0 / 3.0);
    let s = rs.sqrt();

    let g = VWN_G * ((1.0 + zeta).powf(4.0 / 3.0) + (1.0 - zeta).powf(4.0 / 3.0) - 2.0);
    let gp = VWN_G * (4.0 / 3.0) * ((1.0 + zeta).powf(1.0 / 3.0) - (1.0 - zeta).powf(1.0 / 3.0));
    let z4 = zeta.powi(4);

    let f_p = vwn_f(s, &VWN_PARA);
    let f_f = vwn_f(s, &VWN_FERRO);
    let f_i = vwn_f(s, &inter);
    let eps = f_p + g * ((f_f - f_p) * z4 + f_i * (1.0 - z4) * kfz);

    let df_p = vwn_df_ds(s, &VWN_PARA);
    let df_f = vwn_df_ds(s, &VWN_FERRO);
    let df_i = vwn_df_ds(s, &inter);
    // d eps / d r_s, via s = sqrt(r_s)
    let deps_drs = (df_p + g * ((df_f - df_p) * z4 + df_i * (1.0 - z4) * kfz)) / (2.0 * s);
    let deps_dzeta = gp * ((f_f - f_p) * z4 + f_i * (1.0 - z4) * kfz)
        + g * (4.0 * zeta.powi(3) * (f_f - f_p) - 4.0 * zeta.powi(3) * kfz * f_i);

    (eps, deps_drs, deps_dzeta)
}

pub(crate) fn vwn5_energy(a: f64, b: f64) -> f64 {
    let n = pos(a) + pos(b);
    if n <= 0.0 {
        return 0.0;
    }
    let zeta = ((pos(a) - pos(b)) / n).clamp(-1.0, 1.0);
    let (eps, _, _) = eps_and_derivs(n, zeta);
    n * eps
}

pub(crate) fn vwn5_energy_potential(a: f64, b: f64) -> (f64, f64, f64) {
    let n = pos(a) + pos(b);
    if n <= 0.0 {
        return (0.0, 0.0, 0.0);
    }
    let zeta = ((pos(a) - pos(b)) / n).clamp(-1.0, 1.0);
    let rs = (3.0 / (4.0 * PI * n)).powf(1.0 / 3.0);
    let (eps, deps_drs, deps_dzeta) = eps_and_derivs(n, zeta);
    let common = eps - (rs / 3.0) * deps_drs;
    let va = common + (1.0 - zeta) * deps_dzeta;
    let vb = common - (1.0 + zeta) * deps_dzeta;
    (n * eps, va, vb)
}
