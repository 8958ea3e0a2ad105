//! # sootsim CLI
//!
//! A small command-line front end for the coupled stochastic/ODE soot
//! population-balance solver.
//!
//! ## Quick start
//!
//! ```bash
//! # Interactive mode (recommended)
//! sootsim
//!
//! # Run a batch reactor with defaults
//! sootsim run
//!
//! # Run a built-in demo scenario
//! sootsim demo coagulation
//!
//! # List the available particle process rate laws
//! sootsim processes
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use console::style;
use dialoguer::{theme::ColorfulTheme, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use sootsim_dsa::{DsaConfig, DsaEngine};
use sootsim_gas::{ConstantCpGas, SpeciesProps};
use sootsim_ode::{IntegratorKind, OdeConfig};
use sootsim_particles::{CoagulationProcess, GrowthProcess, NucleationProcess, OxidationProcess, Particle};
use sootsim_reactor::{Reactor, ReactorConfig, Snapshot, Splitting, SplittingConfig};

/// sootsim - Coupled Stochastic/ODE Soot Population-Balance Solver
#[derive(Parser)]
#[command(name = "sootsim")]
#[command(author = "Yatrogenesis")]
#[command(version = "0.1.0")]
#[command(about = "A coupled stochastic/ODE soot population-balance solver", long_about = LONG_ABOUT)]
#[command(after_help = AFTER_HELP)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose (debug-level) logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

const LONG_ABOUT: &str = r#"
sootsim advances a closed, constant-volume reactor's gas-phase species and
energy equations alongside a statistically-weighted Monte Carlo soot
particle population, coupled through operator splitting (Lie, Strang, or
predictor-corrector).

Use 'sootsim' without arguments for interactive mode.
"#;

const AFTER_HELP: &str = r#"
EXAMPLES:
    sootsim                                   Interactive mode
    sootsim run --duration 5e-3 --dt 1e-6     Batch reactor run
    sootsim demo nucleation                   Pure-nucleation demo
    sootsim demo coagulation                  Coagulation-only demo
    sootsim demo full-coupling                All four processes together
    sootsim processes                         List particle process rate laws
"#;

#[derive(Subcommand)]
enum Commands {
    /// Run a batch reactor simulation
    Run {
        /// Sample/reactor volume, m^3
        #[arg(long, default_value = "1e-6")]
        volume: f64,
        /// Simulated duration, s
        #[arg(long, default_value = "1e-3")]
        duration: f64,
        /// Operator-splitting step size, s
        #[arg(long, default_value = "1e-6")]
        dt: f64,
        /// Interval between recorded snapshots, s
        #[arg(long, default_value = "1e-4")]
        output_interval: f64,
        /// Initial gas temperature, K
        #[arg(long, default_value = "1500")]
        temperature: f64,
        /// Initial gas pressure, Pa
        #[arg(long, default_value = "101325")]
        pressure: f64,
        /// Initial precursor (A4) mass fraction
        #[arg(long, default_value = "1e-6")]
        precursor_fraction: f64,
        /// Operator-splitting scheme
        #[arg(long, value_enum, default_value = "strang")]
        splitting: SplittingArg,
        /// Gas-phase ODE integrator family
        #[arg(long, value_enum, default_value = "bdf")]
        integrator: IntegratorArg,
        /// RNG seed, for bit-identical reproducibility
        #[arg(long, default_value = "0")]
        seed: u64,
        #[arg(long, default_value = "4096")]
        max_particles: usize,
        #[arg(long, default_value = "512")]
        min_particles: usize,
        #[arg(long)]
        no_nucleation: bool,
        #[arg(long)]
        no_growth: bool,
        #[arg(long)]
        no_coagulation: bool,
        #[arg(long)]
        no_oxidation: bool,
    },

    /// Run a small built-in demo scenario
    Demo {
        #[arg(value_enum, default_value = "nucleation")]
        scenario: DemoScenario,
    },

    /// List the particle process rate laws and their default rate constants
    Processes,

    /// Interactive mode (default)
    Interactive,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SplittingArg {
    Lie,
    Strang,
    PredictorCorrector,
}

impl From<SplittingArg> for Splitting {
    fn from(value: SplittingArg) -> Self {
        match value {
            SplittingArg::Lie => Splitting::Lie,
            SplittingArg::Strang => Splitting::Strang,
            SplittingArg::PredictorCorrector => Splitting::PredictorCorrector,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum IntegratorArg {
    Bdf,
    Radau,
    Lsoda,
    Rk45,
    Rk23,
}

impl From<IntegratorArg> for IntegratorKind {
    fn from(value: IntegratorArg) -> Self {
        match value {
            IntegratorArg::Bdf => IntegratorKind::Bdf,
            IntegratorArg::Radau => IntegratorKind::Radau,
            IntegratorArg::Lsoda => IntegratorKind::Lsoda,
            IntegratorArg::Rk45 => IntegratorKind::Rk45,
            IntegratorArg::Rk23 => IntegratorKind::Rk23,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DemoScenario {
    Nucleation,
    Coagulation,
    FullCoupling,
}

struct ProcessInfo {
    name: &'static str,
    description: &'static str,
    defaults: &'static str,
}

const PROCESSES: &[ProcessInfo] = &[
    ProcessInfo {
        name: "nucleation",
        description: "Dimer-dimer inception of a new particle from a gas-phase precursor",
        defaults: "precursor=A4, k_nuc=2.0e9, nascent C32H18",
    },
    ProcessInfo {
        name: "growth",
        description: "HACA-style C2H2 surface addition, scaled by particle surface area",
        defaults: "k_growth=8.0e7, chi=1.0",
    },
    ProcessInfo {
        name: "coagulation",
        description: "Free-molecular collision and merging of two particles",
        defaults: "sticking_prob=1.0",
    },
    ProcessInfo {
        name: "oxidation",
        description: "O2/OH surface removal of carbon (and proportionate hydrogen)",
        defaults: "k_o2=1.0e4, k_oh=1.0e8",
    },
];

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let command = cli.command.unwrap_or(Commands::Interactive);

    match command {
        Commands::Interactive => run_interactive()?,
        Commands::Processes => show_processes(),
        Commands::Demo { scenario } => run_demo(scenario)?,
        Commands::Run {
            volume,
            duration,
            dt,
            output_interval,
            temperature,
            pressure,
            precursor_fraction,
            splitting,
            integrator,
            seed,
            max_particles,
            min_particles,
            no_nucleation,
            no_growth,
            no_coagulation,
            no_oxidation,
        } => {
            let processes = ProcessSelection {
                nucleation: !no_nucleation,
                growth: !no_growth,
                coagulation: !no_coagulation,
                oxidation: !no_oxidation,
            };
            let snapshots = run_batch_reactor(RunParams {
                volume,
                duration,
                dt,
                output_interval,
                temperature,
                pressure,
                precursor_fraction,
                splitting: splitting.into(),
                integrator: integrator.into(),
                seed,
                max_particles,
                min_particles,
                processes,
                initial_particles: Vec::new(),
            })?;
            print_snapshots(&snapshots);
        }
    }

    Ok(())
}

#[derive(Debug, Clone, Copy)]
struct ProcessSelection {
    nucleation: bool,
    growth: bool,
    coagulation: bool,
    oxidation: bool,
}

struct RunParams {
    volume: f64,
    duration: f64,
    dt: f64,
    output_interval: f64,
    temperature: f64,
    pressure: f64,
    precursor_fraction: f64,
    splitting: Splitting,
    integrator: IntegratorKind,
    seed: u64,
    max_particles: usize,
    min_particles: usize,
    processes: ProcessSelection,
    initial_particles: Vec<Particle>,
}

/// A minimal constant-cp mixture carrying the species the built-in
/// process rate laws look up by name, with an inert (zero) production
/// closure: all gas-phase dynamics in these scenarios come from particle
/// source terms, not built-in chemistry.
fn build_gas(temperature: f64, pressure: f64, precursor_fraction: f64) -> Result<ConstantCpGas> {
    let names = ["A4", "C2H2", "O2", "OH", "H2", "CO", "N2"];
    let molar_masses = [202.25e-3, 26.04e-3, 32.0e-3, 17.0e-3, 2.016e-3, 28.01e-3, 28.014e-3];
    let cp_molar = [400_000.0, 45_000.0, 29_400.0, 29_900.0, 28_800.0, 29_100.0, 29_100.0];
    let species: Vec<SpeciesProps> = names
        .iter()
        .zip(molar_masses)
        .zip(cp_molar)
        .map(|((name, molar_mass), cp)| SpeciesProps {
            name: (*name).to_string(),
            molar_mass,
            cp_molar: cp,
            h0_molar: 0.0,
        })
        .collect();
    let n = species.len();
    let mut y = vec![0.0; n];
    y[0] = precursor_fraction; // A4
    y[2] = 0.21 * (1.0 - precursor_fraction); // O2
    y[n - 1] = 1.0 - y[0] - y[2]; // N2 balance
    Ok(ConstantCpGas::inert(species, temperature, pressure, y)?)
}

fn build_dsa_engine(params: &RunParams) -> Result<DsaEngine> {
    let config = DsaConfig {
        max_particles: params.max_particles,
        min_particles: params.min_particles,
        sample_volume: params.volume,
        seed: params.seed,
        ..Default::default()
    };
    let mut engine = DsaEngine::new(config)?;
    if params.processes.nucleation {
        engine = engine.with_nucleation(NucleationProcess::default());
    }
    if params.processes.growth {
        engine = engine.with_growth(GrowthProcess::default());
    }
    if params.processes.coagulation {
        engine = engine.with_coagulation(CoagulationProcess::default());
    }
    if params.processes.oxidation {
        engine = engine.with_oxidation(OxidationProcess::default());
    }
    if !params.initial_particles.is_empty() {
        engine.initialize(params.initial_particles.clone());
    }
    Ok(engine)
}

fn run_batch_reactor(params: RunParams) -> Result<Vec<Snapshot>> {
    let gas = build_gas(params.temperature, params.pressure, params.precursor_fraction)?;
    let engine = build_dsa_engine(&params)?;

    let reactor_config = ReactorConfig {
        volume: params.volume,
        energy_enabled: true,
        dsa: DsaConfig {
            sample_volume: params.volume,
            seed: params.seed,
            max_particles: params.max_particles,
            min_particles: params.min_particles,
            ..Default::default()
        },
        ode: OdeConfig {
            integrator: params.integrator,
            ..Default::default()
        },
        splitting: SplittingConfig {
            scheme: params.splitting,
            ..Default::default()
        },
    };

    let mut reactor = Reactor::new(gas, Some(engine), reactor_config);

    let pb = create_progress_bar((params.duration / params.dt).ceil() as u64);
    pb.set_message("Integrating...");
    let n_steps = (params.duration / params.dt).ceil() as u64;
    let mut snapshots = vec![reactor.snapshot()];
    let mut next_output = params.output_interval;
    for step_idx in 0..n_steps {
        let remaining = params.duration - step_idx as f64 * params.dt;
        let this_dt = params.dt.min(remaining);
        reactor.step(this_dt)?;
        pb.set_position(step_idx + 1);
        if reactor.time() + 1e-12 >= next_output || step_idx == n_steps - 1 {
            snapshots.push(reactor.snapshot());
            next_output += params.output_interval;
        }
    }
    pb.finish_with_message("Complete!");
    Ok(snapshots)
}

fn print_snapshots(snapshots: &[Snapshot]) {
    println!();
    println!(
        "{:>12} {:>10} {:>8} {:>14} {:>12} {:>12}",
        "time (s)", "T (K)", "N", "d_mean (nm)", "n (1/m3)", "mass (kg/m3)"
    );
    for s in snapshots {
        println!(
            "{:>12.4e} {:>10.2} {:>8} {:>14.3} {:>12.4e} {:>12.4e}",
            s.time,
            s.temperature,
            s.n_particles,
            s.mean_diameter * 1e9,
            s.number_density,
            s.total_mass_concentration
        );
    }
    println!();
    println!(
        "{} {} snapshots recorded",
        style("✓").green(),
        snapshots.len()
    );
}

fn run_demo(scenario: DemoScenario) -> Result<()> {
    let params = match scenario {
        DemoScenario::Nucleation => {
            println!("\n{}", style("── Pure Nucleation Demo ──").bold());
            println!("Only nucleation is enabled; the precursor seeds a growing particle count.");
            RunParams {
                volume: 1.0e-9,
                duration: 1.0e-3,
                dt: 1.0e-6,
                output_interval: 1.0e-4,
                temperature: 1500.0,
                pressure: 101_325.0,
                precursor_fraction: 1.0e-4,
                splitting: Splitting::Strang,
                integrator: IntegratorKind::Bdf,
                seed: 42,
                max_particles: 4096,
                min_particles: 512,
                processes: ProcessSelection {
                    nucleation: true,
                    growth: false,
                    coagulation: false,
                    oxidation: false,
                },
                initial_particles: Vec::new(),
            }
        }
        DemoScenario::Coagulation => {
            println!("\n{}", style("── Coagulation-Only Demo ──").bold());
            println!("Seeds 64 particles and lets coagulation relax the ensemble toward fewer, larger ones.");
            let initial = (0..64)
                .map(|i| Particle::new(2000, 1000, 1, 2, i as f64 * 1.0e-6).unwrap())
                .collect();
            RunParams {
                volume: 1.0e-9,
                duration: 1.0e-2,
                dt: 1.0e-5,
                output_interval: 1.0e-3,
                temperature: 1500.0,
                pressure: 101_325.0,
                precursor_fraction: 0.0,
                splitting: Splitting::Lie,
                integrator: IntegratorKind::Bdf,
                seed: 7,
                max_particles: 4096,
                min_particles: 4,
                processes: ProcessSelection {
                    nucleation: false,
                    growth: false,
                    coagulation: true,
                    oxidation: false,
                },
                initial_particles: initial,
            }
        }
        DemoScenario::FullCoupling => {
            println!("\n{}", style("── Full Coupling Demo ──").bold());
            println!("All four particle processes active with Strang splitting against a stiff gas integrator.");
            RunParams {
                volume: 1.0e-9,
                duration: 5.0e-3,
                dt: 1.0e-6,
                output_interval: 5.0e-4,
                temperature: 1600.0,
                pressure: 101_325.0,
                precursor_fraction: 5.0e-5,
                splitting: Splitting::Strang,
                integrator: IntegratorKind::Bdf,
                seed: 123,
                max_particles: 4096,
                min_particles: 512,
                processes: ProcessSelection {
                    nucleation: true,
                    growth: true,
                    coagulation: true,
                    oxidation: true,
                },
                initial_particles: Vec::new(),
            }
        }
    };
    let snapshots = run_batch_reactor(params)?;
    print_snapshots(&snapshots);
    Ok(())
}

fn show_processes() {
    println!();
    println!("{}", style("══════════════════════════════════════════════════════").cyan());
    println!("{}", style("           PARTICLE PROCESS RATE LAWS                  ").cyan().bold());
    println!("{}", style("══════════════════════════════════════════════════════").cyan());
    println!();
    for proc in PROCESSES {
        println!("  {} {}", style(proc.name).cyan().bold(), style(proc.defaults).dim());
        println!("     {}", proc.description);
        println!();
    }
}

fn run_interactive() -> Result<()> {
    println!();
    println!("{}", style("╔══════════════════════════════════════════════════════════╗").cyan());
    println!("{}", style("║        SOOTSIM - Stochastic/ODE Population Balance        ║").cyan());
    println!("{}", style("╚══════════════════════════════════════════════════════════╝").cyan());
    println!();

    let theme = ColorfulTheme::default();

    loop {
        let options = vec![
            "▶ Run batch reactor",
            "🧪 Demo: nucleation",
            "🧪 Demo: coagulation",
            "🧪 Demo: full coupling",
            "📋 List process rate laws",
            "🚪 Exit",
        ];

        let selection = Select::with_theme(&theme)
            .with_prompt("Select an action")
            .items(&options)
            .default(0)
            .interact()?;

        match selection {
            0 => interactive_run(&theme)?,
            1 => run_demo(DemoScenario::Nucleation)?,
            2 => run_demo(DemoScenario::Coagulation)?,
            3 => run_demo(DemoScenario::FullCoupling)?,
            4 => show_processes(),
            5 => {
                println!("\n{} Goodbye!", style("✓").green());
                break;
            }
            _ => unreachable!(),
        }

        println!();
    }

    Ok(())
}

fn interactive_run(theme: &ColorfulTheme) -> Result<()> {
    println!("\n{}", style("── Batch Reactor ──").bold());

    let duration: f64 = Input::with_theme(theme)
        .with_prompt("Duration (s)")
        .default(1.0e-3)
        .interact_text()?;

    let dt: f64 = Input::with_theme(theme)
        .with_prompt("Step size (s)")
        .default(1.0e-6)
        .interact_text()?;

    let temperature: f64 = Input::with_theme(theme)
        .with_prompt("Temperature (K)")
        .default(1500.0)
        .interact_text()?;

    let params = RunParams {
        volume: 1.0e-9,
        duration,
        dt,
        output_interval: duration / 10.0,
        temperature,
        pressure: 101_325.0,
        precursor_fraction: 1.0e-5,
        splitting: Splitting::Strang,
        integrator: IntegratorKind::Bdf,
        seed: 0,
        max_particles: 4096,
        min_particles: 512,
        processes: ProcessSelection {
            nucleation: true,
            growth: true,
            coagulation: true,
            oxidation: true,
        },
        initial_particles: Vec::new(),
    };
    let snapshots = run_batch_reactor(params)?;
    print_snapshots(&snapshots);
    Ok(())
}

fn create_progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("█▓░"),
    );
    pb
}
