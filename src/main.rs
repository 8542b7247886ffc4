use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use osm_navigator::api::{handle_request, Request};
use osm_navigator::{NavError, World};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// World description (bounds, buildings, nav and vision parameters)
    #[arg(long, short)]
    world: PathBuf,
    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Find a walkable path between two local points
    #[command(allow_negative_numbers = true)]
    Path {
        start_x: f64,
        start_y: f64,
        goal_x: f64,
        goal_y: f64,
    },
    /// Visibility polygon around an observer
    #[command(allow_negative_numbers = true)]
    Vision { x: f64, y: f64 },
    /// Project a WGS84 coordinate to LV95, tile pixels and the local plane
    #[command(allow_negative_numbers = true)]
    Project { latitude: f64, longitude: f64 },
    /// Occupancy grid summary
    Grid {
        /// Print the grid as ASCII art instead of JSON
        #[arg(long)]
        ascii: bool,
    },
}

impl Command {
    fn request(&self) -> Request {
        match *self {
            Command::Path {
                start_x,
                start_y,
                goal_x,
                goal_y,
            } => Request::Path {
                start: (start_x, start_y),
                goal: (goal_x, goal_y),
            },
            Command::Vision { x, y } => Request::Visibility { observer: (x, y) },
            Command::Project {
                latitude,
                longitude,
            } => Request::Project {
                latitude,
                longitude,
            },
            Command::Grid { .. } => Request::Grid,
        }
    }
}

fn run(args: &Args) -> Result<(), NavError> {
    let json = std::fs::read_to_string(&args.world)?;
    let world = World::from_json(&json)?;

    if let Command::Grid { ascii: true } = args.command {
        print!("{}", world.grid().render_ascii());
        return Ok(());
    }

    let response = handle_request(&world, &args.command.request())?;
    let out = if args.pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    println!("{out}");
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            match e {
                NavError::NoPath { .. } => ExitCode::from(2),
                _ => ExitCode::FAILURE,
            }
        }
    }
}
