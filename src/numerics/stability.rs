//! Time step limits of the explicit (and weakly implicit) schemes.
//!
//! All bounds are expressed in the smallest center-to-neighbor distance `h`
//! over interior stencils. Schemes at or above their unconditional threshold
//! in `theta` are never rejected.

use crate::error::{GfdError, Result};

/// Largest stable `dt` of the theta scheme for `u_t = nu lap(u)`:
/// `nu dt / h^2 <= 1 / (4 (1 - 2 theta))`. `None` when unconditionally stable.
pub fn diffusion_limit(nu: f64, h: f64, theta: f64) -> Option<f64> {
    if theta >= 0.5 || nu <= 0.0 {
        return None;
    }
    Some(h * h / (4.0 * (1.0 - 2.0 * theta) * nu))
}

/// Largest stable `dt` for the advection part: `(|a| + |b|) dt / h <= 1`.
pub fn cfl_limit(velocity: [f64; 2], h: f64, theta: f64) -> Option<f64> {
    let speed = velocity[0].abs() + velocity[1].abs();
    if theta >= 0.5 || speed == 0.0 {
        return None;
    }
    Some(h / speed)
}

/// Largest stable `dt` for central advection against diffusion:
/// `dt (a^2 + b^2) <= 2 nu (1 - 2 theta)`. Zero for undamped flow, since
/// forward-Euler central differences amplify every mode without diffusion.
pub fn advection_limit(nu: f64, velocity: [f64; 2], theta: f64) -> Option<f64> {
    let speed2 = velocity[0] * velocity[0] + velocity[1] * velocity[1];
    if theta >= 0.5 || speed2 == 0.0 {
        return None;
    }
    Some(2.0 * nu.max(0.0) * (1.0 - 2.0 * theta) / speed2)
}

/// Largest stable `dt` of the three-level wave scheme:
/// `c dt / h <= 1 / sqrt(2 (1 - 4 theta))`.
pub fn wave_limit(c: f64, h: f64, theta: f64) -> Option<f64> {
    if theta >= 0.25 || c == 0.0 {
        return None;
    }
    Some(h / (c.abs() * (2.0 * (1.0 - 4.0 * theta)).sqrt()))
}

fn check(dt: f64, limit: Option<f64>, criterion: &'static str) -> Result<()> {
    match limit {
        Some(limit) if dt > limit => Err(GfdError::UnstableTimeStep {
            dt,
            limit,
            criterion,
        }),
        _ => Ok(()),
    }
}

pub fn check_diffusion(dt: f64, nu: f64, h: f64, theta: f64) -> Result<()> {
    check(dt, diffusion_limit(nu, h, theta), "diffusion number")
}

pub fn check_advection_diffusion(
    dt: f64,
    nu: f64,
    velocity: [f64; 2],
    h: f64,
    theta: f64,
) -> Result<()> {
    check_diffusion(dt, nu, h, theta)?;
    check(dt, cfl_limit(velocity, h, theta), "CFL")?;
    check(dt, advection_limit(nu, velocity, theta), "central advection")
}

pub fn check_wave(dt: f64, c: f64, h: f64, theta: f64) -> Result<()> {
    check(dt, wave_limit(c, h, theta), "wave CFL")
}
