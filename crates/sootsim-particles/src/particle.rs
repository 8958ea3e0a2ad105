//! A single soot particle and the geometric quantities derived from its
//! atom counts.

use sootsim_core::constants::{CARBON_MOLAR_MASS, HYDROGEN_MOLAR_MASS, SOOT_DENSITY};
use sootsim_core::constants::AVOGADRO;
use sootsim_core::{SootsimError, Time};
use std::f64::consts::PI;

/// One stochastic particle in the ensemble: a bookkeeping record of atom
/// counts and aggregate structure, not a literal 3-D shape. Spherical
/// geometry is used only for coagulation kernels and diameter reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub n_carbon: u64,
    pub n_hydrogen: u64,
    pub n_primary: u32,
    pub active_sites: u32,
    pub creation_time: Time,
}

impl Particle {
    pub fn new(
        n_carbon: u64,
        n_hydrogen: u64,
        n_primary: u32,
        active_sites: u32,
        creation_time: Time,
    ) -> Result<Self, SootsimError> {
        if n_primary < 1 {
            return Err(SootsimError::InvalidParticle(
                "n_primary must be at least 1".into(),
            ));
        }
        Ok(Self {
            n_carbon,
            n_hydrogen,
            n_primary,
            active_sites,
            creation_time,
        })
    }

    /// A freshly nucleated particle: a single primary with two active sites.
    pub fn nascent(n_carbon: u64, n_hydrogen: u64, creation_time: Time) -> Self {
        Self {
            n_carbon,
            n_hydrogen,
            n_primary: 1,
            active_sites: 2,
            creation_time,
        }
    }

    /// Mass of the particle's carbon content, kg.
    pub fn carbon_mass(&self) -> f64 {
        self.n_carbon as f64 * CARBON_MOLAR_MASS / AVOGADRO
    }

    /// Total particle mass (carbon + hydrogen), kg.
    pub fn mass(&self) -> f64 {
        self.carbon_mass() + self.n_hydrogen as f64 * HYDROGEN_MOLAR_MASS / AVOGADRO
    }

    /// Solid volume, m^3, from the carbon mass and bulk soot density.
    /// Hydrogen is a surface-passivation species and does not contribute
    /// volume.
    pub fn volume(&self) -> f64 {
        self.carbon_mass() / SOOT_DENSITY
    }

    /// Spherical-equivalent diameter of the whole aggregate, m.
    pub fn diameter(&self) -> f64 {
        (6.0 * self.volume() / PI).cbrt()
    }

    /// Spherical-equivalent diameter of a single primary particle, m. Zero
    /// for a degenerate particle with no primaries (should not occur once
    /// `n_primary >= 1` is enforced, kept as a defensive 0.0 rather than a
    /// division by zero).
    pub fn primary_diameter(&self) -> f64 {
        if self.n_primary == 0 {
            return 0.0;
        }
        (6.0 * (self.volume() / self.n_primary as f64) / PI).cbrt()
    }

    /// Surface area of the aggregate, modeled as `n_primary` touching
    /// spheres of the primary diameter, m^2.
    pub fn surface_area(&self) -> f64 {
        self.n_primary as f64 * PI * self.primary_diameter().powi(2)
    }

    /// Carbon-to-hydrogen atom ratio; `f64::INFINITY` for a fully
    /// dehydrogenated particle.
    pub fn c_to_h_ratio(&self) -> f64 {
        if self.n_hydrogen == 0 {
            return f64::INFINITY;
        }
        self.n_carbon as f64 / self.n_hydrogen as f64
    }

    pub fn add_carbon(&mut self, n: u64) {
        self.n_carbon += n;
    }

    pub fn add_hydrogen(&mut self, n: u64) {
        self.n_hydrogen += n;
    }

    /// Remove `n` carbon atoms. Returns `false` (no-op) if the particle
    /// does not carry that many — callers treat that as "this process
    /// cannot fire on this particle" rather than an error.
    pub fn remove_carbon(&mut self, n: u64) -> bool {
        if self.n_carbon < n {
            return false;
        }
        self.n_carbon -= n;
        true
    }

    pub fn remove_hydrogen(&mut self, n: u64) -> bool {
        if self.n_hydrogen < n {
            return false;
        }
        self.n_hydrogen -= n;
        true
    }

    /// Merge two particles into the aggregate that results from their
    /// coagulation: atom counts and primary counts sum, the creation time
    /// is inherited from whichever parent is older.
    pub fn coagulate(&self, other: &Particle) -> Particle {
        Particle {
            n_carbon: self.n_carbon + other.n_carbon,
            n_hydrogen: self.n_hydrogen + other.n_hydrogen,
            n_primary: self.n_primary + other.n_primary,
            active_sites: self.active_sites + other.active_sites,
            creation_time: self.creation_time.min(other.creation_time),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nascent_particle_has_one_primary_and_two_sites() {
        let p = Particle::nascent(32, 18, 0.0);
        assert_eq!(p.n_primary, 1);
        assert_eq!(p.active_sites, 2);
    }

    #[test]
    fn rejects_zero_primaries() {
        assert!(Particle::new(10, 5, 0, 0, 0.0).is_err());
    }

    #[test]
    fn diameter_grows_with_carbon_content() {
        let small = Particle::nascent(32, 18, 0.0);
        let large = Particle::nascent(3200, 1800, 0.0);
        assert!(large.diameter() > small.diameter());
    }

    #[test]
    fn remove_carbon_fails_when_insufficient() {
        let mut p = Particle::nascent(10, 5, 0.0);
        assert!(!p.remove_carbon(20));
        assert_eq!(p.n_carbon, 10);
        assert!(p.remove_carbon(4));
        assert_eq!(p.n_carbon, 6);
    }

    #[test]
    fn coagulate_sums_atom_counts_and_keeps_older_creation_time() {
        let a = Particle::nascent(32, 18, 1.0e-6);
        let b = Particle::nascent(40, 20, 2.0e-6);
        let c = a.coagulate(&b);
        assert_eq!(c.n_carbon, 72);
        assert_eq!(c.n_hydrogen, 38);
        assert_eq!(c.n_primary, 2);
        assert_eq!(c.creation_time, 1.0e-6);
    }

    #[test]
    fn c_to_h_ratio_is_infinite_once_fully_dehydrogenated() {
        let mut p = Particle::nascent(10, 4, 0.0);
        assert!(p.remove_hydrogen(4));
        assert_eq!(p.c_to_h_ratio(), f64::INFINITY);
    }
}
