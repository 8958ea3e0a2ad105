//! Physical constants, in SI units unless noted.
//!
//! Values are the CODATA 2018 constants, matching the Python prototype this
//! solver was distilled from.

/// Avogadro's number (mol^-1).
pub const AVOGADRO: f64 = 6.022_140_76e23;

/// Boltzmann constant (J/K).
pub const BOLTZMANN: f64 = 1.380_649e-23;

/// Universal gas constant (J/(mol K)).
pub const GAS_CONSTANT: f64 = AVOGADRO * BOLTZMANN;

/// Carbon atomic mass (kg/mol).
pub const CARBON_MOLAR_MASS: f64 = 12.011e-3;

/// Hydrogen atomic mass (kg/mol).
pub const HYDROGEN_MOLAR_MASS: f64 = 1.008e-3;

/// Bulk soot (carbon) density (kg/m^3), used for the spherical-equivalent
/// particle volume/diameter conversions.
pub const SOOT_DENSITY: f64 = 1800.0;

/// Standard temperature (K).
pub const STANDARD_TEMPERATURE: f64 = 298.15;

/// Standard pressure (Pa).
pub const STANDARD_PRESSURE: f64 = 101_325.0;
