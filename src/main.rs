use clap::{Args, Parser, Subcommand};
use rand::Rng;
use std::error::Error;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use riffbeats::{audio, midi, seeded_rng, ComposeRequest, PitchModel, ScaleRepository, Song};

/// RiffBeats - compose short pieces from generated riffs
#[derive(Parser)]
#[command(name = "riffbeats")]
#[command(about = "Compose short pieces from generated riffs and render them to MIDI")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose a song and write it as a MIDI file
    Compose(ComposeArgs),

    /// List the available scales
    Scales(ScalesArgs),
}

#[derive(Args)]
struct ComposeArgs {
    /// Base tempo in beats per minute (jittered by up to 3 either way)
    #[arg(short, long, default_value_t = 80)]
    tempo: u32,

    /// Scale names riffs may use (repeatable)
    #[arg(short, long = "scale", default_values_t = ["blues".to_string(), "enigmatica".to_string(), "orientale".to_string()])]
    scales: Vec<String>,

    /// Number of active sections, 1 to 6
    #[arg(short, long, default_value_t = 6, allow_negative_numbers = true)]
    complexity: i32,

    /// Seed for reproducible output (random when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Scale definitions file to use instead of the built-in list
    #[arg(long)]
    scales_file: Option<PathBuf>,

    /// Where to write the MIDI file
    #[arg(short, long, default_value = "output.mid")]
    out: PathBuf,

    /// Print the composed song as JSON
    #[arg(long)]
    json: bool,

    /// Play a sine-wave preview after writing
    #[arg(long)]
    play: bool,
}

#[derive(Args)]
struct ScalesArgs {
    /// Scale definitions file to use instead of the built-in list
    #[arg(long)]
    scales_file: Option<PathBuf>,
}

fn load_scales(path: Option<&PathBuf>) -> riffbeats::Result<ScaleRepository> {
    match path {
        Some(path) => ScaleRepository::load(path),
        None => ScaleRepository::builtin(),
    }
}

fn compose(args: ComposeArgs) -> Result<(), Box<dyn Error>> {
    let scales = load_scales(args.scales_file.as_ref())?;
    let model = PitchModel::new();

    let seed = args.seed.unwrap_or_else(|| rand::thread_rng().gen::<u64>());
    tracing::info!(seed, "composing");

    let request = ComposeRequest::new(args.tempo, args.scales, args.complexity);
    let song = Song::compose(&request, &scales, &model, &mut seeded_rng(seed))?;

    let structure: Vec<&str> = song.structure.iter().map(|s| s.name()).collect();
    tracing::info!(
        tempo = song.tempo,
        beats = song.beats(),
        structure = %structure.join(" "),
        "song ready"
    );

    midi::write_midi(&song, &args.out)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&song)?);
    }
    if args.play {
        audio::play(&song)?;
    }
    Ok(())
}

fn list_scales(args: ScalesArgs) -> Result<(), Box<dyn Error>> {
    let scales = load_scales(args.scales_file.as_ref())?;
    for (name, scale) in scales.iter() {
        let steps: Vec<String> = scale.steps().iter().map(|s| s.to_string()).collect();
        println!("{:<18} {}", name, steps.join(","));
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Compose(args) => compose(args),
        Commands::Scales(args) => list_scales(args),
    };

    if let Err(e) = &result {
        tracing::error!("{}", e);
    }
    result
}
