mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "kinetic2d", about = "Kinetic2D headless physics runner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a scene JSON and step it, reporting solver stats
    Run {
        /// Path to the scene file
        scene: String,
        /// Number of fixed steps to simulate
        #[arg(long, default_value_t = 600)]
        steps: u32,
        /// Fixed timestep in seconds
        #[arg(long, default_value_t = 1.0 / 60.0)]
        dt: f32,
        /// Disable warm starting
        #[arg(long)]
        cold: bool,
        /// Disable sleeping
        #[arg(long)]
        no_sleep: bool,
        /// Write the final world back out as scene JSON
        #[arg(long)]
        dump: Option<String>,
    },
    /// Validate a scene file by loading and re-serializing it
    Check {
        /// Path to the scene file
        scene: String,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            scene,
            steps,
            dt,
            cold,
            no_sleep,
            dump,
        } => commands::run::run(&scene, steps, dt, !cold, !no_sleep, dump.as_deref()),
        Commands::Check { scene } => commands::check::run(&scene),
    }
}
