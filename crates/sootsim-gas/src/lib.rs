//! # sootsim-gas
//!
//! The narrow, read-mostly capability the particle population balance
//! needs from a gas-phase chemistry backend, plus one small reference
//! implementation (`ConstantCpGas`) used by tests and the CLI's built-in
//! demo scenarios.
//!
//! Loading real chemical mechanisms (Cantera-style YAML/CHEMKIN, GRI-Mech,
//! etc.) is explicitly out of scope here — that is the job of an external
//! collaborator. `ConstantCpGas` is deliberately *not* a thermochemistry
//! package: it is a constant-cp ideal-gas mixture driven by a
//! caller-supplied net molar production-rate closure, just concrete enough
//! to drive the ODE/DSA coupling in tests.

use sootsim_core::constants::GAS_CONSTANT;
use sootsim_core::SootsimError;
use std::collections::HashMap;

/// Immutable snapshot of a gas-phase state, used by the predictor-corrector
/// splitter to save/restore the gas between trial steps.
#[derive(Debug, Clone, PartialEq)]
pub struct GasSnapshot {
    pub t: f64,
    pub p: f64,
    pub y: Vec<f64>,
}

/// The capability the particle processes and the ODE driver need from a
/// gas-phase chemistry backend. Every method is read-only except
/// `set_state`, which is reserved for the ODE driver.
pub trait GasPhase {
    /// Number of tracked species.
    fn n_species(&self) -> usize;

    /// Species names, in the same order as every per-species vector below.
    fn species_names(&self) -> &[String];

    /// Temperature, K.
    fn temperature(&self) -> f64;

    /// Pressure, Pa.
    fn pressure(&self) -> f64;

    /// Mass fractions, one per species, summing to 1.
    fn mass_fractions(&self) -> &[f64];

    /// Molar concentration of a named species, mol/m^3. Returns 0.0 for a
    /// species the mechanism does not carry — this is never an error
    /// (spec: "silent zero", mechanisms legitimately omit optional
    /// precursors).
    fn concentration(&self, name: &str) -> f64;

    /// Net molar production rate of every species, kmol/(m^3 s).
    fn production_rates(&self) -> Vec<f64>;

    /// Species molar masses, kg/kmol.
    fn molar_masses(&self) -> &[f64];

    /// Partial molar enthalpies at the current state, J/kmol.
    fn partial_molar_enthalpies(&self) -> Vec<f64>;

    /// Mixture mass density, kg/m^3.
    fn density(&self) -> f64;

    /// Mixture specific heat at constant pressure, J/(kg K).
    fn cp(&self) -> f64;

    /// Index of a named species, if the mechanism carries it.
    fn species_index(&self, name: &str) -> Option<usize>;

    /// Overwrite the thermodynamic state. Used exclusively by the ODE
    /// driver between and during integration sub-steps. `y` must already
    /// sum to 1 within tolerance; callers (the ODE driver) are responsible
    /// for clamping/renormalizing before calling this.
    fn set_state(&mut self, t: f64, p: f64, y: &[f64]) -> Result<(), SootsimError>;

    /// Snapshot the current state for later restoration.
    fn snapshot(&self) -> GasSnapshot {
        GasSnapshot {
            t: self.temperature(),
            p: self.pressure(),
            y: self.mass_fractions().to_vec(),
        }
    }

    /// Restore a previously captured snapshot.
    fn restore(&mut self, snap: &GasSnapshot) -> Result<(), SootsimError> {
        self.set_state(snap.t, snap.p, &snap.y)
    }
}

/// Per-species constant-cp thermodynamic data for [`ConstantCpGas`].
#[derive(Debug, Clone)]
pub struct SpeciesProps {
    pub name: String,
    /// kg/kmol
    pub molar_mass: f64,
    /// J/(kmol K), assumed temperature-independent
    pub cp_molar: f64,
    /// Molar enthalpy of formation at `ref_temperature`, J/kmol
    pub h0_molar: f64,
}

/// A production-rate closure: given `(T, P, Y)`, return the net molar
/// production rate of every species in kmol/(m^3 s). This is the one
/// collaborator hook `ConstantCpGas` does not implement itself — in a real
/// deployment it would be backed by a mechanism's Arrhenius/law-of-mass-
/// action evaluation.
pub type ProductionRateFn = Box<dyn Fn(f64, f64, &[f64]) -> Vec<f64> + Send + Sync>;

/// A minimal constant-cp ideal-gas mixture. Not a thermochemistry package:
/// species thermodynamic properties are temperature-independent apart from
/// the linear `h = h0 + cp*(T - T_ref)` relation, and net production rates
/// come from a caller-supplied closure (an inert mixture with a zero
/// closure is the common test fixture).
pub struct ConstantCpGas {
    species: Vec<SpeciesProps>,
    names: Vec<String>,
    molar_masses: Vec<f64>,
    index: HashMap<String, usize>,
    t: f64,
    p: f64,
    y: Vec<f64>,
    ref_temperature: f64,
    production: ProductionRateFn,
}

impl ConstantCpGas {
    pub fn new(
        species: Vec<SpeciesProps>,
        t: f64,
        p: f64,
        y: Vec<f64>,
        production: ProductionRateFn,
    ) -> Result<Self, SootsimError> {
        if species.len() != y.len() {
            return Err(SootsimError::InvalidConfig(format!(
                "species/mass-fraction length mismatch: {} vs {}",
                species.len(),
                y.len()
            )));
        }
        let sum: f64 = y.iter().sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(SootsimError::InvalidConfig(format!(
                "mass fractions must sum to 1, got {sum}"
            )));
        }
        let index = species
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name.clone(), i))
            .collect();
        let names = species.iter().map(|s| s.name.clone()).collect();
        let molar_masses = species.iter().map(|s| s.molar_mass).collect();
        Ok(Self {
            species,
            names,
            molar_masses,
            index,
            t,
            p,
            y,
            ref_temperature: 298.15,
            production,
        })
    }

    /// Convenience constructor for a chemically inert mixture (zero
    /// production rates for every species) — used heavily by tests that
    /// check particle-side dynamics in isolation from gas kinetics.
    pub fn inert(species: Vec<SpeciesProps>, t: f64, p: f64, y: Vec<f64>) -> Result<Self, SootsimError> {
        let n = species.len();
        Self::new(species, t, p, y, Box::new(move |_, _, _| vec![0.0; n]))
    }

    fn mean_molar_mass(&self) -> f64 {
        let inv: f64 = self
            .species
            .iter()
            .zip(&self.y)
            .map(|(s, y)| y / s.molar_mass)
            .sum();
        if inv <= 0.0 {
            return f64::INFINITY;
        }
        1.0 / inv
    }
}

impl GasPhase for ConstantCpGas {
    fn n_species(&self) -> usize {
        self.species.len()
    }

    fn species_names(&self) -> &[String] {
        &self.names
    }

    fn temperature(&self) -> f64 {
        self.t
    }

    fn pressure(&self) -> f64 {
        self.p
    }

    fn mass_fractions(&self) -> &[f64] {
        &self.y
    }

    fn concentration(&self, name: &str) -> f64 {
        let Some(&idx) = self.index.get(name) else {
            return 0.0;
        };
        let rho = self.density();
        let w = self.species[idx].molar_mass;
        rho * self.y[idx] / w * 1000.0
    }

    fn production_rates(&self) -> Vec<f64> {
        (self.production)(self.t, self.p, &self.y)
    }

    fn molar_masses(&self) -> &[f64] {
        &self.molar_masses
    }

    fn partial_molar_enthalpies(&self) -> Vec<f64> {
        self.species
            .iter()
            .map(|s| s.h0_molar + s.cp_molar * (self.t - self.ref_temperature))
            .collect()
    }

    fn density(&self) -> f64 {
        self.p * self.mean_molar_mass() / (GAS_CONSTANT * self.t * 1000.0)
    }

    fn cp(&self) -> f64 {
        self.species
            .iter()
            .zip(&self.y)
            .map(|(s, y)| y * s.cp_molar / s.molar_mass)
            .sum()
    }

    fn species_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    fn set_state(&mut self, t: f64, p: f64, y: &[f64]) -> Result<(), SootsimError> {
        if y.len() != self.species.len() {
            return Err(SootsimError::InvalidConfig(
                "mass-fraction vector length mismatch on set_state".into(),
            ));
        }
        self.t = t;
        self.p = p;
        self.y.copy_from_slice(y);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n2_o2_mix() -> Vec<SpeciesProps> {
        vec![
            SpeciesProps {
                name: "N2".into(),
                molar_mass: 28.014,
                cp_molar: 29_100.0,
                h0_molar: 0.0,
            },
            SpeciesProps {
                name: "O2".into(),
                molar_mass: 31.998,
                cp_molar: 29_400.0,
                h0_molar: 0.0,
            },
        ]
    }

    #[test]
    fn inert_mixture_has_zero_production() {
        let gas = ConstantCpGas::inert(n2_o2_mix(), 1500.0, 101_325.0, vec![0.77, 0.23]).unwrap();
        let omega = gas.production_rates();
        assert!(omega.iter().all(|&w| w == 0.0));
    }

    #[test]
    fn unknown_species_concentration_is_silent_zero() {
        let gas = ConstantCpGas::inert(n2_o2_mix(), 1500.0, 101_325.0, vec![0.77, 0.23]).unwrap();
        assert_eq!(gas.concentration("A4"), 0.0);
    }

    #[test]
    fn set_state_round_trips_through_snapshot() {
        let mut gas = ConstantCpGas::inert(n2_o2_mix(), 1500.0, 101_325.0, vec![0.77, 0.23]).unwrap();
        let snap = gas.snapshot();
        gas.set_state(1600.0, 101_325.0, &[0.5, 0.5]).unwrap();
        assert_eq!(gas.temperature(), 1600.0);
        gas.restore(&snap).unwrap();
        assert_eq!(gas.temperature(), 1500.0);
        assert_eq!(gas.mass_fractions(), &[0.77, 0.23]);
    }

    #[test]
    fn rejects_mass_fractions_not_summing_to_one() {
        let err = ConstantCpGas::inert(n2_o2_mix(), 1500.0, 101_325.0, vec![0.1, 0.1]);
        assert!(err.is_err());
    }
}
