//! # sootsim-dsa
//!
//! The direct simulation algorithm (DSA): couples the particle ensemble and
//! process rate laws from `sootsim-particles` into an exact stochastic
//! event loop (exponential waiting times, relative-rate event selection),
//! with optional deferment of growth and oxidation to a deterministic
//! accumulator applied between events rather than sampled as discrete
//! jumps.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sootsim_core::constants::AVOGADRO;
use sootsim_core::{SootsimError, Time};
use sootsim_gas::GasPhase;
use sootsim_particles::{
    CoagulationProcess, GrowthProcess, NucleationProcess, OxidationProcess, ParticleEnsemble,
    ProcessRates,
};
use std::collections::HashMap;

/// Which process produced a given stochastic event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Nucleation,
    Growth,
    Coagulation,
    Oxidation,
}

/// A single fired stochastic event, reported for diagnostics/logging.
#[derive(Debug, Clone, Copy)]
pub struct Event {
    pub time: Time,
    pub kind: EventKind,
    pub particle_index: Option<usize>,
    /// The rate bucket this event was drawn from, at the time of firing.
    pub rate: f64,
}

/// Names of the gas-phase species each particle process exchanges mass
/// with, and the byproduct each one emits. Kept as data rather than
/// hard-coded literals in [`DsaEngine::get_source_terms`], per spec.md
/// §9's design note: "the core must accept configurable stoichiometry
/// vectors rather than hard-coding species names" — a mechanism that
/// names these species differently (or omits them) must be able to
/// re-parameterise the exchange without touching engine code.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SourceStoichiometry {
    /// Species produced by nucleation alongside precursor consumption
    /// (the precursor name itself comes from [`NucleationProcess::precursor`]).
    pub nucleation_byproduct: String,
    /// Species consumed by surface growth.
    pub growth_reactant: String,
    /// Species produced by surface growth.
    pub growth_byproduct: String,
    /// Species consumed by oxidation.
    pub oxidation_reactant: String,
    /// Species produced by oxidation.
    pub oxidation_byproduct: String,
}

impl Default for SourceStoichiometry {
    fn default() -> Self {
        Self {
            nucleation_byproduct: "H2".into(),
            growth_reactant: "C2H2".into(),
            growth_byproduct: "H2".into(),
            oxidation_reactant: "O2".into(),
            oxidation_byproduct: "CO".into(),
        }
    }
}

/// Configuration for a [`DsaEngine`]. Deserializable from a TOML/JSON
/// config document via `serde`, in the same ambient-plumbing style as the
/// teacher workspace's own `SolverConfig`/`SimulationMethod` structs — no
/// dedicated config-format crate is introduced.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DsaConfig {
    pub max_particles: usize,
    pub min_particles: usize,
    pub sample_volume: f64,
    pub seed: u64,
    /// If true, growth is never drawn as a discrete stochastic event;
    /// instead it accumulates deterministically between events.
    pub defer_growth: bool,
    /// Same as `defer_growth`, for oxidation.
    pub defer_oxidation: bool,
    /// Safety valve on the number of event-loop iterations within a
    /// single `step` call, in case a pathological rate configuration
    /// never lets simulated time reach the requested `dt`.
    pub max_iterations: usize,
    /// Number of particle pairs sampled when estimating the aggregate
    /// coagulation rate (full enumeration is O(n^2), intractable for
    /// ensembles in the thousands).
    pub coagulation_samples: usize,
    /// Particle-process/gas-species exchange stoichiometry.
    pub source_stoichiometry: SourceStoichiometry,
}

impl Default for DsaConfig {
    fn default() -> Self {
        Self {
            max_particles: 4096,
            min_particles: 512,
            sample_volume: 1.0e-9,
            seed: 0,
            defer_growth: true,
            defer_oxidation: true,
            max_iterations: 10_000,
            coagulation_samples: 100,
            source_stoichiometry: SourceStoichiometry::default(),
        }
    }
}

/// Per-kind event counts accumulated over one [`DsaEngine::step`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventCounts {
    pub nucleation: u64,
    pub growth: u64,
    pub coagulation: u64,
    pub oxidation: u64,
}

impl EventCounts {
    fn record(&mut self, kind: EventKind) {
        match kind {
            EventKind::Nucleation => self.nucleation += 1,
            EventKind::Growth => self.growth += 1,
            EventKind::Coagulation => self.coagulation += 1,
            EventKind::Oxidation => self.oxidation += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.nucleation + self.growth + self.coagulation + self.oxidation
    }
}

/// Result of advancing the ensemble by one requested `dt`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepOutcome {
    pub event_counts: EventCounts,
    /// Set if the event loop hit `max_iterations` before simulated time
    /// reached the requested `dt` — a sign the rates are too large for
    /// `dt`, or a configuration bug. The step still advances to `dt` by
    /// fiat; the caller should treat this as a warning, not a fatal
    /// error.
    pub hit_iteration_cap: bool,
}

/// Owns the particle ensemble and the (up to) four process rate laws, and
/// drives them forward with the exact stochastic simulation algorithm.
pub struct DsaEngine {
    ensemble: ParticleEnsemble,
    nucleation: Option<NucleationProcess>,
    growth: Option<GrowthProcess>,
    coagulation: Option<CoagulationProcess>,
    oxidation: Option<OxidationProcess>,
    rng: StdRng,
    config: DsaConfig,
    total_time: Time,
    deferred_since: Time,
}

impl DsaEngine {
    pub fn new(config: DsaConfig) -> Result<Self, SootsimError> {
        let ensemble = ParticleEnsemble::new(
            config.sample_volume,
            config.max_particles,
            config.min_particles,
            config.seed,
        )?;
        Ok(Self {
            ensemble,
            nucleation: None,
            growth: None,
            coagulation: None,
            oxidation: None,
            // Deliberately a distinct RNG stream from the ensemble's own
            // (both seeded from the same configured seed): tau sampling
            // and event-kind selection must not perturb the sequence the
            // ensemble uses for pair/weighted selection, or vice versa.
            rng: StdRng::seed_from_u64(config.seed ^ 0x5EED_5EED_5EED_5EED),
            config,
            total_time: 0.0,
            deferred_since: 0.0,
        })
    }

    pub fn with_nucleation(mut self, process: NucleationProcess) -> Self {
        self.nucleation = Some(process);
        self
    }

    pub fn with_growth(mut self, process: GrowthProcess) -> Self {
        self.growth = Some(process);
        self
    }

    pub fn with_coagulation(mut self, process: CoagulationProcess) -> Self {
        self.coagulation = Some(process);
        self
    }

    pub fn with_oxidation(mut self, process: OxidationProcess) -> Self {
        self.oxidation = Some(process);
        self
    }

    pub fn ensemble(&self) -> &ParticleEnsemble {
        &self.ensemble
    }

    pub fn ensemble_mut(&mut self) -> &mut ParticleEnsemble {
        &mut self.ensemble
    }

    pub fn total_time(&self) -> Time {
        self.total_time
    }

    /// Reset the clock and ensemble, optionally seeding with particles
    /// already present at t=0 (e.g. a pre-existing soot population).
    pub fn initialize(&mut self, initial_particles: Vec<sootsim_particles::Particle>) {
        self.ensemble.clear();
        self.total_time = 0.0;
        self.deferred_since = 0.0;
        for p in initial_particles {
            self.ensemble.add_particle(p);
        }
    }

    /// Instantaneous process rates against the current ensemble and gas
    /// state. Growth/oxidation are included here purely for diagnostics
    /// (`get_source_terms`) even when deferred; [`Self::stochastic_rates`]
    /// is what event selection actually draws from.
    pub fn compute_rates(&mut self, gas: &dyn GasPhase) -> ProcessRates {
        let mut rates = ProcessRates::default();
        if let Some(nuc) = &self.nucleation {
            rates.nucleation = nuc.rate(gas);
        }
        if !self.ensemble.is_empty() {
            if let Some(growth) = &self.growth {
                rates.growth = self
                    .ensemble
                    .particles()
                    .iter()
                    .map(|p| growth.carbon_addition_rate(gas, p))
                    .sum();
            }
            if let Some(oxidation) = &self.oxidation {
                rates.oxidation = self
                    .ensemble
                    .particles()
                    .iter()
                    .map(|p| oxidation.carbon_removal_rate(gas, p))
                    .sum();
            }
        }
        if self.ensemble.n_particles() > 1 {
            if let Some(coag) = self.coagulation.clone() {
                rates.coagulation = self.estimate_coagulation_rate(gas, &coag);
            }
        }
        rates
    }

    /// Rates actually used for stochastic event selection: growth and/or
    /// oxidation are zeroed out here when deferred, so they never fire as
    /// discrete jumps.
    fn stochastic_rates(&mut self, gas: &dyn GasPhase) -> ProcessRates {
        let mut rates = self.compute_rates(gas);
        if self.config.defer_growth {
            rates.growth = 0.0;
        }
        if self.config.defer_oxidation {
            rates.oxidation = 0.0;
        }
        rates
    }

    fn estimate_coagulation_rate(&mut self, gas: &dyn GasPhase, coag: &CoagulationProcess) -> f64 {
        let n = self.ensemble.n_particles();
        if n < 2 {
            return 0.0;
        }
        let max_pairs = n * (n - 1) / 2;
        let n_samples = self.config.coagulation_samples.min(max_pairs).max(1);
        let temperature = gas.temperature();
        let mut accum = 0.0;
        for _ in 0..n_samples {
            let Some((i, j)) = self.ensemble.select_random_pair() else {
                break;
            };
            let beta = coag.kernel(self.ensemble.get(i), self.ensemble.get(j), temperature);
            accum += beta;
        }
        accum *= max_pairs as f64 / n_samples as f64;
        let w = self.ensemble.statistical_weight();
        accum * w * w / self.ensemble.sample_volume()
    }

    /// Apply accumulated deferred growth/oxidation to every particle over
    /// the elapsed time since the last flush, then advance the flush
    /// marker. A particle fully consumed by deferred oxidation is dropped
    /// from the ensemble.
    fn flush_deferred(&mut self, gas: &dyn GasPhase) {
        let dt = self.total_time - self.deferred_since;
        self.deferred_since = self.total_time;
        if dt <= 0.0 {
            return;
        }
        let mut to_remove = Vec::new();
        for idx in 0..self.ensemble.n_particles() {
            if self.config.defer_growth {
                if let Some(growth) = &self.growth {
                    let particle = self.ensemble.get_mut(idx);
                    growth.apply(gas, particle, dt);
                }
            }
            if self.config.defer_oxidation {
                if let Some(oxidation) = &self.oxidation {
                    let particle = self.ensemble.get_mut(idx);
                    if !oxidation.apply(gas, particle, dt) {
                        to_remove.push(idx);
                    }
                }
            }
        }
        for idx in to_remove.into_iter().rev() {
            self.ensemble.remove_particle(idx);
        }
    }

    fn select_event(&mut self, rates: &ProcessRates) -> EventKind {
        let total = rates.total();
        let r = self.rng.gen::<f64>() * total;
        let mut cumulative = rates.nucleation.abs();
        if r < cumulative {
            return EventKind::Nucleation;
        }
        cumulative += rates.growth.abs();
        if r < cumulative {
            return EventKind::Growth;
        }
        cumulative += rates.coagulation.abs();
        if r < cumulative {
            return EventKind::Coagulation;
        }
        EventKind::Oxidation
    }

    fn perform_event(&mut self, kind: EventKind, gas: &dyn GasPhase) -> Option<Event> {
        match kind {
            EventKind::Nucleation => self.do_nucleation(gas),
            EventKind::Growth => self.do_growth(gas),
            EventKind::Coagulation => self.do_coagulation(gas),
            EventKind::Oxidation => self.do_oxidation(gas),
        }
    }

    fn do_nucleation(&mut self, gas: &dyn GasPhase) -> Option<Event> {
        let nucleation = self.nucleation.as_ref()?;
        let particle = nucleation.apply(self.total_time);
        self.ensemble.add_particle(particle);
        let rate = self.nucleation.as_ref().unwrap().rate(gas);
        Some(Event {
            time: self.total_time,
            kind: EventKind::Nucleation,
            particle_index: Some(self.ensemble.n_particles() - 1),
            rate,
        })
    }

    fn do_growth(&mut self, gas: &dyn GasPhase) -> Option<Event> {
        let growth = self.growth.clone()?;
        if self.ensemble.is_empty() {
            return None;
        }
        let weights: Vec<f64> = self
            .ensemble
            .particles()
            .iter()
            .map(|p| growth.carbon_addition_rate(gas, p))
            .collect();
        let total: f64 = weights.iter().sum();
        let idx = self.ensemble.select_weighted(&weights)?.0;
        let particle = self.ensemble.get_mut(idx);
        particle.add_carbon(2);
        particle.add_hydrogen(1);
        Some(Event {
            time: self.total_time,
            kind: EventKind::Growth,
            particle_index: Some(idx),
            rate: total,
        })
    }

    fn do_coagulation(&mut self, gas: &dyn GasPhase) -> Option<Event> {
        let coag = self.coagulation.clone()?;
        let (i, j) = self.ensemble.select_random_pair()?;
        let p1 = self.ensemble.get(i).clone();
        let p2 = self.ensemble.get(j).clone();
        let beta = coag.kernel(&p1, &p2, gas.temperature());
        let merged = coag.coagulate(&p1, &p2);
        let (hi, lo) = if i > j { (i, j) } else { (j, i) };
        self.ensemble.remove_particle(hi);
        self.ensemble.remove_particle(lo);
        self.ensemble.add_particle(merged);
        Some(Event {
            time: self.total_time,
            kind: EventKind::Coagulation,
            particle_index: Some(self.ensemble.n_particles() - 1),
            rate: beta,
        })
    }

    /// A single stochastic oxidation event removes roughly 1% of the
    /// target particle's current carbon content (floored to at least one
    /// atom), rather than the dt-scaled removal the deferred/deterministic
    /// path ([`OxidationProcess::apply`]) uses.
    fn do_oxidation(&mut self, gas: &dyn GasPhase) -> Option<Event> {
        let oxidation = self.oxidation.clone()?;
        if self.ensemble.is_empty() {
            return None;
        }
        let weights: Vec<f64> = self
            .ensemble
            .particles()
            .iter()
            .map(|p| oxidation.carbon_removal_rate(gas, p))
            .collect();
        let total: f64 = weights.iter().sum();
        let idx = self.ensemble.select_weighted(&weights)?.0;
        let particle = self.ensemble.get_mut(idx);
        let n_remove = ((particle.n_carbon as f64 * 0.01) as u64).max(1);
        particle.remove_carbon(n_remove);
        particle.remove_hydrogen(n_remove / 4);
        if particle.n_carbon == 0 {
            self.ensemble.remove_particle(idx);
        }
        Some(Event {
            time: self.total_time,
            kind: EventKind::Oxidation,
            particle_index: Some(idx),
            rate: total,
        })
    }

    /// Advance the ensemble by `dt` using the direct simulation algorithm.
    pub fn step(&mut self, gas: &dyn GasPhase, dt: Time) -> StepOutcome {
        let t_end = self.total_time + dt;
        let mut outcome = StepOutcome::default();
        for _ in 0..self.config.max_iterations {
            if self.total_time >= t_end {
                break;
            }
            let rates = self.stochastic_rates(gas);
            let total_rate = rates.total();
            if total_rate <= 0.0 {
                self.total_time = t_end;
                self.flush_deferred(gas);
                return outcome;
            }
            let tau = -self.rng.gen::<f64>().ln() / total_rate;
            if self.total_time + tau > t_end {
                self.total_time = t_end;
                self.flush_deferred(gas);
                return outcome;
            }
            self.total_time += tau;
            self.flush_deferred(gas);
            let kind = self.select_event(&rates);
            if let Some(event) = self.perform_event(kind, gas) {
                outcome.event_counts.record(event.kind);
            }
        }
        outcome.hit_iteration_cap = true;
        self.total_time = t_end;
        self.flush_deferred(gas);
        outcome
    }

    /// Net gas-phase species source terms implied by the current particle
    /// process rates, in mol/(m^3 s). Callers integrating a gas-phase ODE
    /// convert to their own molar unit (e.g. kmol) as needed.
    pub fn get_source_terms(&mut self, gas: &dyn GasPhase) -> HashMap<String, f64> {
        let rates = self.compute_rates(gas);
        let stoich = &self.config.source_stoichiometry;
        let mut sources = HashMap::new();
        if let Some(nuc) = &self.nucleation {
            let nuc_rate = rates.nucleation / AVOGADRO;
            *sources.entry(nuc.precursor.clone()).or_insert(0.0) -= 2.0 * nuc_rate;
            *sources.entry(stoich.nucleation_byproduct.clone()).or_insert(0.0) += nuc_rate;
        }
        if self.growth.is_some() {
            let growth_rate = rates.growth / (AVOGADRO * 2.0);
            *sources.entry(stoich.growth_reactant.clone()).or_insert(0.0) -= growth_rate;
            *sources.entry(stoich.growth_byproduct.clone()).or_insert(0.0) += growth_rate * 0.5;
        }
        if self.oxidation.is_some() {
            let ox_rate = rates.oxidation / AVOGADRO;
            *sources.entry(stoich.oxidation_reactant.clone()).or_insert(0.0) -= ox_rate * 0.5;
            *sources.entry(stoich.oxidation_byproduct.clone()).or_insert(0.0) += ox_rate;
        }
        sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sootsim_gas::{ConstantCpGas, SpeciesProps};
    use sootsim_particles::Particle;

    fn gas_with(names: &[&str]) -> ConstantCpGas {
        let species: Vec<SpeciesProps> = names
            .iter()
            .map(|n| SpeciesProps {
                name: (*n).into(),
                molar_mass: 28.0,
                cp_molar: 29_000.0,
                h0_molar: 0.0,
            })
            .collect();
        let n = species.len();
        let mut y = vec![0.0; n];
        y[n - 1] = 1.0;
        ConstantCpGas::inert(species, 1500.0, 101_325.0, y).unwrap()
    }

    #[test]
    fn nucleation_only_increases_ensemble_by_one_per_event() {
        let gas = gas_with(&["A4", "H2"]);
        let config = DsaConfig {
            sample_volume: 1.0e-9,
            seed: 42,
            ..Default::default()
        };
        let mut engine = DsaEngine::new(config)
            .unwrap()
            .with_nucleation(NucleationProcess::default());
        let before = engine.ensemble().n_particles();
        // With a literal zero A4 concentration the nucleation rate is
        // exactly zero and no event fires; confirm the no-event path
        // leaves the ensemble untouched and the clock still advances.
        let outcome = engine.step(&gas, 1e-3);
        assert_eq!(engine.ensemble().n_particles(), before);
        assert_eq!(outcome.event_counts.total(), 0);
        assert_eq!(engine.total_time(), 1e-3);
    }

    #[test]
    fn coagulation_merges_two_particles_into_one() {
        let gas = gas_with(&["N2"]);
        let config = DsaConfig {
            sample_volume: 1.0e-9,
            seed: 7,
            defer_growth: true,
            defer_oxidation: true,
            ..Default::default()
        };
        let mut engine = DsaEngine::new(config)
            .unwrap()
            .with_coagulation(CoagulationProcess::default());
        engine.initialize(vec![
            Particle::nascent(2000, 1000, 0.0),
            Particle::nascent(500, 250, 0.0),
        ]);
        let total_carbon_before: u64 = engine.ensemble().particles().iter().map(|p| p.n_carbon).sum();
        let outcome = engine.step(&gas, 1.0);
        assert_eq!(outcome.event_counts.coagulation, 1);
        assert_eq!(engine.ensemble().n_particles(), 1);
        let total_carbon_after: u64 = engine.ensemble().particles().iter().map(|p| p.n_carbon).sum();
        assert_eq!(total_carbon_before, total_carbon_after);
    }

    #[test]
    fn source_terms_are_empty_without_any_process() {
        let gas = gas_with(&["N2"]);
        let config = DsaConfig {
            seed: 1,
            ..Default::default()
        };
        let mut engine = DsaEngine::new(config).unwrap();
        assert!(engine.get_source_terms(&gas).is_empty());
    }

    #[test]
    fn fixed_seed_produces_bit_identical_event_sequences() {
        let config = DsaConfig {
            sample_volume: 1.0e-9,
            seed: 42,
            ..Default::default()
        };
        let make_engine = || {
            DsaEngine::new(config.clone())
                .unwrap()
                .with_nucleation(NucleationProcess::default())
                .with_coagulation(CoagulationProcess::default())
        };
        let gas = gas_with(&["A4", "H2", "N2"]);
        let mut a = make_engine();
        let mut b = make_engine();
        let mut outcomes_a = Vec::new();
        let mut outcomes_b = Vec::new();
        for _ in 0..20 {
            outcomes_a.push(a.step(&gas, 1.0e-7).event_counts);
            outcomes_b.push(b.step(&gas, 1.0e-7).event_counts);
        }
        assert_eq!(outcomes_a, outcomes_b);
        let diam_a: Vec<f64> = a.ensemble().particles().iter().map(sootsim_particles::Particle::diameter).collect();
        let diam_b: Vec<f64> = b.ensemble().particles().iter().map(sootsim_particles::Particle::diameter).collect();
        assert_eq!(diam_a, diam_b);
    }

    #[test]
    fn pure_nucleation_monotonically_increases_ensemble_size() {
        let gas = gas_with(&["A4", "H2", "N2"]);
        let config = DsaConfig {
            sample_volume: 1.0e-9,
            seed: 42,
            max_particles: 100_000,
            min_particles: 0,
            ..Default::default()
        };
        let mut engine = DsaEngine::new(config)
            .unwrap()
            .with_nucleation(NucleationProcess::default());
        let mut last = engine.ensemble().n_particles();
        for _ in 0..100 {
            engine.step(&gas, 1.0e-7);
            let now = engine.ensemble().n_particles();
            assert!(now >= last, "ensemble shrank under nucleation-only dynamics");
            last = now;
        }
        assert!(last > 0);
    }

    #[test]
    fn coagulation_relaxes_twenty_identical_particles_to_one() {
        let gas = gas_with(&["N2"]);
        let config = DsaConfig {
            sample_volume: 1.0e-9,
            seed: 99,
            min_particles: 1,
            ..Default::default()
        };
        let mut engine = DsaEngine::new(config)
            .unwrap()
            .with_coagulation(CoagulationProcess::default());
        engine.initialize((0..20).map(|i| Particle::nascent(100, 50, i as f64)).collect());
        let total_carbon_before: u64 = engine.ensemble().particles().iter().map(|p| p.n_carbon).sum();
        for _ in 0..10_000 {
            if engine.ensemble().n_particles() <= 1 {
                break;
            }
            engine.step(&gas, 1.0);
        }
        assert_eq!(engine.ensemble().n_particles(), 1);
        let last = engine.ensemble().get(0);
        assert_eq!(last.n_carbon, 2000);
        assert_eq!(last.n_hydrogen, 1000);
        assert_eq!(last.n_primary, 20);
        let total_carbon_after: u64 = engine.ensemble().particles().iter().map(|p| p.n_carbon).sum();
        assert_eq!(total_carbon_before, total_carbon_after);
    }

    #[test]
    fn source_stoichiometry_is_configurable_per_mechanism() {
        let gas = gas_with(&["precursorX", "byproductY", "N2"]);
        let stoich = SourceStoichiometry {
            nucleation_byproduct: "byproductY".into(),
            ..Default::default()
        };
        let config = DsaConfig {
            sample_volume: 1.0e-9,
            seed: 3,
            source_stoichiometry: stoich,
            ..Default::default()
        };
        let mut nuc = NucleationProcess::default();
        nuc.precursor = "precursorX".into();
        let mut engine = DsaEngine::new(config).unwrap().with_nucleation(nuc);
        let sources = engine.get_source_terms(&gas);
        // Zero concentration precursor -> zero rate -> source terms present
        // as keys (entries are always inserted once the process is active)
        // but with zero magnitude.
        assert_eq!(sources.get("precursorX").copied(), Some(0.0));
        assert_eq!(sources.get("byproductY").copied(), Some(0.0));
    }
}
