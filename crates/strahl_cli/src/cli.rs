use std::path::PathBuf;

use clap::Parser;
use strahl_renderer::ExecutionMode;

#[derive(Parser, Debug)]
#[command(name = "strahl", version, about = "Render a packed scene to PNG")]
pub struct Args {
    /// JSON scene description; the built-in demo scene when omitted
    pub scene: Option<PathBuf>,

    #[arg(short, long, default_value = "out.png")]
    /// Output PNG path
    pub output: PathBuf,

    #[arg(short = 'W', long)]
    /// Image width, overrides the description
    pub width: Option<u32>,

    #[arg(short = 'H', long)]
    /// Image height, overrides the description
    pub height: Option<u32>,

    #[arg(long)]
    /// Samples per pixel for the active camera
    pub samples: Option<u32>,

    #[arg(long)]
    /// Maximum recursion depth
    pub depth: Option<u32>,

    #[arg(long)]
    /// Evaluator: sequential, parallel or device
    pub mode: Option<ExecutionMode>,

    #[arg(long)]
    /// Base seed for the random streams
    pub seed: Option<u64>,
}
