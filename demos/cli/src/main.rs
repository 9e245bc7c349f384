use std::io::Write;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::{info, warn};

use adel::{
    canopy::{Canopy, CanopySettings, ThreadCount},
    plantgen::{PlantgenConfig, derive_axis_population, linspace},
    symbol::{LeafShapeDatabase, Mesh},
};

/// Wheat canopy generator
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    cmd: Command,

    #[clap(flatten)]
    stand: StandSettings,
}

#[derive(Subcommand)]
enum Command {
    /// Builds the canopy at a given thermal time
    Generate {
        #[clap(flatten)]
        settings: SceneSettings,
    },

    /// Prints the number of active axes over thermal time, as CSV
    Tillering {
        /// First thermal time (°C.day)
        #[clap(long, default_value_t = 0.0)]
        start: f64,

        /// Last thermal time (°C.day)
        #[clap(long, default_value_t = 2500.0)]
        end: f64,

        /// Number of thermal time steps
        #[clap(long, default_value_t = 51)]
        steps: usize,
    },

    /// Prints every axis type of the stand
    Axes,
}

#[derive(Parser)]
struct StandSettings {
    /// Number of plants to generate
    #[clap(short, long, default_value_t = 10)]
    plants: u32,

    /// Number of plants per square meter
    #[clap(short, long, default_value_t = 250.0)]
    density: f64,

    /// Number of ear-bearing axes per square meter
    #[clap(short, long)]
    ears: Option<f64>,
}

#[derive(Parser)]
struct SceneSettings {
    /// Thermal time since sowing (°C.day)
    #[clap(short, long)]
    tt: f64,

    /// Base seed for leaf shape draws
    #[clap(short, long, default_value_t = 0)]
    seed: u64,

    /// Fixed seed for every leaf (also selects exact stem tessellation)
    #[clap(long)]
    fixed_seed: Option<u64>,

    /// Leaf shape database, as JSON (`{"rank": [{"x", "y", "s", "r"}]}`)
    ///
    /// A synthetic database is used if this is not provided.
    #[clap(short, long)]
    leaves: Option<PathBuf>,

    /// Name of a `.stl` file to write
    #[clap(short, long)]
    out: Option<PathBuf>,

    /// Number of threads to use
    #[clap(short = 'j', long)]
    threads: Option<NonZeroUsize>,

    /// Always use the exact stem tessellation
    #[clap(long)]
    classic: bool,

    /// Number of times to build the canopy (for benchmarking)
    #[clap(short = 'N', default_value_t = 1)]
    n: usize,
}

impl StandSettings {
    fn config(&self) -> PlantgenConfig {
        let mut cfg = PlantgenConfig {
            plants_number: self.plants,
            plants_density: self.density,
            ..PlantgenConfig::default()
        };
        if let Some(e) = self.ears {
            cfg.ears_density = e;
        }
        cfg
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Position of each plant base on a square grid covering the stand (cm)
fn plant_positions(cfg: &PlantgenConfig) -> Vec<nalgebra::Isometry3<f32>> {
    let side = (cfg.domain_area().sqrt() * 100.0) as f32;
    let n = (cfg.plants_number as f32).sqrt().ceil() as u32;
    let spacing = side / n as f32;
    (0..cfg.plants_number)
        .map(|k| {
            let x = ((k % n) as f32 + 0.5) * spacing;
            let y = ((k / n) as f32 + 0.5) * spacing;
            nalgebra::Isometry3::translation(x, y, 0.0)
        })
        .collect()
}

fn load_database(path: Option<&PathBuf>) -> Result<LeafShapeDatabase> {
    let Some(path) = path else {
        warn!("no leaf database provided, using synthetic shapes");
        return Ok(LeafShapeDatabase::sample());
    };
    let now = Instant::now();
    let file = std::fs::File::open(path)
        .with_context(|| format!("could not open {path:?}"))?;
    let db: LeafShapeDatabase =
        serde_json::from_reader(std::io::BufReader::new(file))
            .with_context(|| format!("could not load {path:?}"))?;
    info!(
        "Loaded {} leaf ranks in {:?}",
        db.ranks().len(),
        now.elapsed()
    );
    Ok(db)
}

fn run_generate(cfg: PlantgenConfig, settings: &SceneSettings) -> Result<()> {
    let db = load_database(settings.leaves.as_ref())?;
    let threads = match settings.threads {
        #[cfg(feature = "rayon")]
        Some(n) => ThreadCount::from(n),
        _ => ThreadCount::default(),
    };
    let canopy_settings = CanopySettings {
        seed: settings.fixed_seed,
        classic: settings.classic,
        threads,
        ..CanopySettings::default()
    };
    let positions = plant_positions(&cfg);
    let canopy = Canopy::new(cfg, &db, canopy_settings)?;

    let start = Instant::now();
    let mut organs = vec![];
    for _ in 0..settings.n {
        organs = canopy.organs_at(settings.tt, settings.seed)?;
    }
    info!(
        "Built {} organs {}x at {:?} ms/canopy",
        organs.len(),
        settings.n,
        start.elapsed().as_micros() as f64 / 1000.0 / (settings.n as f64)
    );

    let mut scene = Mesh::new();
    for o in &organs {
        if let Some(g) = &o.organ.geometry {
            let at = positions[o.plant as usize] * o.placement;
            scene.extend(&g.transformed(&at));
        }
    }
    info!(
        "Scene has {} triangles, {:.1} cm² of surface",
        scene.triangles.len(),
        scene.area()
    );
    if let Some(out) = &settings.out {
        info!("Writing STL to {out:?}");
        let mut handle = std::fs::File::create(out)?;
        scene.write_stl(&mut handle)?;
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .init();

    let args = Args::parse();
    let cfg = args.stand.config();

    match args.cmd {
        Command::Generate { settings } => run_generate(cfg, &settings)?,
        Command::Tillering { start, end, steps } => {
            let db = LeafShapeDatabase::new();
            let canopy = Canopy::new(cfg, &db, CanopySettings::default())?;
            let mut out = std::io::stdout().lock();
            writeln!(out, "tt,axes_per_m2,axes_per_plant")?;
            for s in canopy.tillering_dynamic(&linspace(start, end, steps)) {
                writeln!(out, "{},{},{}", s.tt, s.per_square_meter, s.per_plant)?;
            }
        }
        Command::Axes => {
            let now = Instant::now();
            let pop = derive_axis_population(&cfg)?;
            info!("Derived population in {:?}", now.elapsed());
            let mut out = std::io::stdout().lock();
            writeln!(out, "position,cohort,id_phen,n_phytomer,regressive,cardinality")?;
            for a in pop.axes() {
                writeln!(
                    out,
                    "{},{},{},{},{},{}",
                    a.position,
                    a.cohort(),
                    a.id_phen(),
                    a.n_phytomer,
                    a.regressive,
                    a.cardinality
                )?;
            }
        }
    }
    Ok(())
}
