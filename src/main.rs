//! Main executable for rustrelax

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::PathBuf;

use rustrelax::atom::Element;
use rustrelax::builder::{self, fcc111, fix_bottom_layers};
use rustrelax::calculator::harmonic::HarmonicWell;
use rustrelax::calculator::lennard_jones::LennardJones;
use rustrelax::calculator::Calculator;
use rustrelax::constraints::FixAtoms;
use rustrelax::driver;
use rustrelax::io::{export_trajectory, read_xyz, write_xyz};
use rustrelax::optimization::RelaxParams;
use rustrelax::trajectory::TrajectoryRecorder;

/// Command-line arguments for the application
#[derive(Parser, Debug)]
#[clap(
    name = "rustrelax",
    version = rustrelax::VERSION,
    author = "Author <author@example.com>",
    about = "Structure relaxation for atomistic surface systems"
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Relax a structure to a local energy minimum
    Relax {
        /// XYZ file with the starting structure (overrides the slab options)
        #[clap(long, value_parser)]
        input: Option<PathBuf>,

        /// Slab element used when no input file is given
        #[clap(long, default_value = "Cu")]
        slab: String,

        /// Slab repetitions nx,ny,layers
        #[clap(long, value_parser, value_delimiter = ',', default_value = "3,3,4")]
        size: Vec<usize>,

        /// Vacuum padding along z (Angstroms)
        #[clap(long, default_value_t = 10.0)]
        vacuum: f64,

        /// Override the tabulated fcc lattice constant (Angstroms)
        #[clap(long)]
        lattice_constant: Option<f64>,

        /// Adsorbate placed above the surface (co, n2, none)
        #[clap(long, default_value = "none")]
        adsorbate: String,

        /// Height of the adsorbate above the top layer (Angstroms)
        #[clap(long, default_value_t = 2.0)]
        height: f64,

        /// Number of bottom slab layers to hold fixed
        #[clap(long, default_value_t = 0)]
        fix_layers: usize,

        /// Fix every atom at or below this z coordinate (Angstroms)
        #[clap(long)]
        fix_below: Option<f64>,

        /// Calculator to use (lj, harmonic)
        #[clap(long, default_value = "lj")]
        calculator: String,

        /// JSON parameter file for the Lennard-Jones calculator
        #[clap(long, value_parser)]
        checkpoint: Option<PathBuf>,

        /// Spring constant for the harmonic calculator (eV/A^2)
        #[clap(long, default_value_t = 1.0)]
        spring_constant: f64,

        /// Convergence threshold on the maximum force (eV/A, 0 runs to the step limit)
        #[clap(long)]
        fmax: f64,

        /// Maximum number of relaxation steps
        #[clap(long)]
        max_steps: usize,

        /// Longest per-atom move allowed in one step (Angstroms)
        #[clap(long, default_value_t = RelaxParams::DEFAULT_MAX_STEP)]
        max_step: f64,

        /// History depth of the curvature approximation
        #[clap(long, default_value_t = RelaxParams::DEFAULT_HISTORY_SIZE)]
        history: usize,

        /// Trajectory output file (JSON Lines, one snapshot per line)
        #[clap(long, value_parser)]
        trajectory: Option<PathBuf>,

        /// XYZ output file for the final structure
        #[clap(long, short, value_parser)]
        out: Option<PathBuf>,

        /// Randomly displace free atoms by up to this amplitude before relaxing
        #[clap(long)]
        rattle: Option<f64>,

        /// Random seed for the rattle displacement
        #[clap(long, default_value_t = 0)]
        seed: u64,
    },

    /// Convert a stored trajectory to multi-frame XYZ
    Export {
        /// Trajectory file written by a relax run
        #[clap(value_parser)]
        trajectory: PathBuf,

        /// Output XYZ file
        #[clap(long, short, value_parser)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    // Initialize logger
    env_logger::init();

    // Parse command-line arguments
    let cli = Cli::parse();

    match cli.command {
        Commands::Relax {
            input,
            slab,
            size,
            vacuum,
            lattice_constant,
            adsorbate,
            height,
            fix_layers,
            fix_below,
            calculator,
            checkpoint,
            spring_constant,
            fmax,
            max_steps,
            max_step,
            history,
            trajectory,
            out,
            rattle,
            seed,
        } => {
            // Assemble the starting configuration
            let mut configuration = if let Some(input_path) = &input {
                info!("Loading structure: {}", input_path.display());
                read_xyz(input_path).with_context(|| {
                    format!("Failed to parse structure file: {}", input_path.display())
                })?
            } else {
                if size.len() != 3 {
                    return Err(anyhow::anyhow!(
                        "Slab size must be three comma-separated values, got {:?}",
                        size
                    ));
                }
                let element = Element::from_symbol(&slab);
                info!(
                    "Building {} fcc(111) slab, size {}x{}x{}",
                    element.symbol(),
                    size[0],
                    size[1],
                    size[2]
                );
                let mut slab_config =
                    fcc111(element, lattice_constant, (size[0], size[1], size[2]), vacuum)
                        .context("Failed to build slab")?;

                // Layer bookkeeping must happen before the adsorbate joins
                if fix_layers > 0 {
                    fix_bottom_layers(&mut slab_config, fix_layers, size[2])
                        .context("Failed to fix bottom layers")?;
                    info!("Holding the bottom {} layers fixed", fix_layers);
                }

                match adsorbate.to_lowercase().as_str() {
                    "none" => {}
                    name => {
                        let molecule = match name {
                            "co" => builder::carbon_monoxide(),
                            "n2" => builder::dinitrogen(),
                            _ => {
                                warn!("Unknown adsorbate: {}. Using CO instead.", adsorbate);
                                builder::carbon_monoxide()
                            }
                        };
                        let site = (slab_config.cell[(0, 0)] / 2.0, slab_config.cell[(1, 1)] / 2.0);
                        builder::add_adsorbate(&mut slab_config, &molecule, height, site)
                            .context("Failed to place adsorbate")?;
                    }
                }
                slab_config
            };

            if let Some(z_cutoff) = fix_below {
                let constraint = FixAtoms::below(&configuration.positions(), z_cutoff);
                info!(
                    "Fixing {} atoms at or below z = {}",
                    constraint.indices().len(),
                    z_cutoff
                );
                configuration.constraints.add(constraint);
            }

            if let Some(amplitude) = rattle {
                info!("Rattling free atoms by up to {} A (seed {})", amplitude, seed);
                builder::rattle(&mut configuration, amplitude, seed);
            }

            // Determine calculator
            let calculator: Box<dyn Calculator> = match calculator.to_lowercase().as_str() {
                "lj" | "lennard-jones" => match &checkpoint {
                    Some(path) => Box::new(LennardJones::from_checkpoint(path).with_context(
                        || format!("Failed to load parameter file: {}", path.display()),
                    )?),
                    None => Box::new(LennardJones::new()),
                },
                "harmonic" => Box::new(HarmonicWell::new(spring_constant)),
                _ => {
                    warn!(
                        "Unknown calculator: {}. Using Lennard-Jones instead.",
                        calculator
                    );
                    Box::new(LennardJones::new())
                }
            };
            info!("Using {} calculator", calculator.name());

            let mut recorder = match &trajectory {
                Some(path) => TrajectoryRecorder::create(path).with_context(|| {
                    format!("Failed to create trajectory file: {}", path.display())
                })?,
                None => TrajectoryRecorder::in_memory(),
            };

            let params = RelaxParams::new(fmax, max_steps)?
                .with_max_step(max_step)
                .with_history_size(history);

            let relaxed = driver::relax(
                calculator.as_ref(),
                configuration,
                params,
                None,
                &mut recorder,
            )?;

            info!(
                "Finished: {:?} after {} steps (energy {:.6} eV, fmax {:.6} eV/A)",
                relaxed.report.reason,
                relaxed.report.steps,
                relaxed.report.energy.unwrap_or(f64::NAN),
                relaxed.report.fmax.unwrap_or(f64::NAN)
            );

            if let Some(out_path) = &out {
                info!("Writing final structure to {}", out_path.display());
                write_xyz(&relaxed.configuration, out_path).with_context(|| {
                    format!("Failed to write structure to {}", out_path.display())
                })?;
            }
        }

        Commands::Export { trajectory, out } => {
            info!(
                "Exporting trajectory {} to {}",
                trajectory.display(),
                out.display()
            );
            let frames = export_trajectory(&trajectory, &out).with_context(|| {
                format!("Failed to export trajectory: {}", trajectory.display())
            })?;
            info!("Wrote {} frames", frames);
        }
    }

    Ok(())
}
