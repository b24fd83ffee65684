use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use glam::Vec3;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;

use tabletop_core::{
    BehaviorKind, Catalog, Engine, EngineConfig, Parameters, Player, Sandbox, Scene,
};

const FRAME: Duration = Duration::from_millis(16);

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    let mut config = match &options.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if options.seed.is_some() {
        config.seed = options.seed;
    }

    let mut catalog = Catalog::builtin();
    let game = match &options.game {
        Some(game) if game.ends_with(".xml") => {
            let xml = fs::read_to_string(game)
                .with_context(|| format!("failed to read layout {game}"))?;
            let name = Path::new(game)
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or("sandbox")
                .to_string();
            catalog.register(
                Sandbox::from_layout_xml(name.clone(), &xml)
                    .with_context(|| format!("failed to parse layout {game}"))?,
            );
            Some(name)
        }
        other => other.clone(),
    };

    if options.list {
        print_catalog(&catalog);
        return Ok(());
    }
    let Some(game) = game else {
        return Err(anyhow!(CliOptions::USAGE));
    };

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let mut session = catalog.create_session(&game, &mut rng)?;
    let metadata = session.metadata();
    println!(
        "Built {} with {} meshes",
        session.state().id,
        session.state().meshes.len()
    );

    let players = options.players.unwrap_or(metadata.min_seats);
    for seat in 1..=players {
        let player = Player::new(format!("player-{seat}"), format!("Player {seat}"));
        let state = session.add_player(&player, &Parameters::new())?;
        let preference = state
            .preference(&player.id)
            .map(|preference| {
                preference
                    .values
                    .iter()
                    .map(|(name, value)| format!("{name}={value}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .filter(|values| !values.is_empty())
            .unwrap_or_else(|| "no preference".into());
        println!(" - {} seated ({preference})", player.username);
    }

    let mut engine = Engine::for_game(config, &metadata);
    engine.load(session.state())?;
    run_demo(&mut engine)?;

    let mut animating = 0;
    for _ in 0..options.frames {
        animating = engine.frame(FRAME).animating;
    }
    println!(
        "Ran {} frame(s), {animating} mesh(es) still animating",
        options.frames
    );
    info!("sending {} action(s) to peers", engine.drain_outbox().len());

    print_final_state(&engine.scene);
    Ok(())
}

/// Nudges the first draggable mesh and flips it when it can be flipped.
fn run_demo(engine: &mut Engine) -> Result<()> {
    let Some((id, position, flippable)) = engine
        .scene
        .draggable_ids()
        .first()
        .and_then(|id| engine.scene.get_mesh_by_id(id))
        .map(|mesh| {
            (
                mesh.id().to_string(),
                mesh.position,
                mesh.has_behavior(BehaviorKind::Flippable),
            )
        })
    else {
        println!("Nothing to move");
        return Ok(());
    };

    let target = position + Vec3::X;
    engine.move_mesh(&id, target)?;
    println!(
        "Moved {id} to ({:.2}, {:.2}, {:.2})",
        target.x, target.y, target.z
    );
    if flippable {
        engine.flip(&id)?;
        println!("Flipped {id}");
    }
    Ok(())
}

fn print_catalog(catalog: &Catalog) {
    println!("Available games:");
    for name in catalog.names() {
        let Some(descriptor) = catalog.get(name) else {
            continue;
        };
        let metadata = descriptor.metadata();
        println!(
            " - {name} ({}, {}-{} seats)",
            metadata.title("en").unwrap_or(name),
            metadata.min_seats,
            metadata.max_seats
        );
    }
}

fn print_final_state(scene: &Scene) {
    println!("Final mesh states:");
    for mesh in scene.meshes() {
        println!(
            " - {} pos=({:.2}, {:.2}, {:.2}) rot=({:.2}, {:.2}, {:.2})",
            mesh.id(),
            mesh.position.x,
            mesh.position.y,
            mesh.position.z,
            mesh.rotation.x,
            mesh.rotation.y,
            mesh.rotation.z
        );
    }
}

struct CliOptions {
    game: Option<String>,
    players: Option<usize>,
    frames: usize,
    seed: Option<u64>,
    config: Option<String>,
    list: bool,
}

impl CliOptions {
    const USAGE: &'static str = "Usage: tabletop <game|layout.xml> [--players <n>] [--frames <n>] [--seed <n>] [--config <file.json>] [--list]";

    fn parse() -> Result<Self> {
        let mut options = Self {
            game: None,
            players: None,
            frames: 30,
            seed: None,
            config: None,
            list: false,
        };
        let mut args = env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--list" => options.list = true,
                "--players" => options.players = Some(parse_value(&arg, args.next())?),
                "--frames" => options.frames = parse_value(&arg, args.next())?,
                "--seed" => options.seed = Some(parse_value(&arg, args.next())?),
                "--config" => {
                    options.config =
                        Some(args.next().ok_or_else(|| anyhow!("--config expects a file"))?);
                }
                other if other.starts_with("--") => {
                    return Err(anyhow!("Unknown argument: {other}. {}", Self::USAGE));
                }
                other if options.game.is_none() => options.game = Some(other.to_string()),
                other => return Err(anyhow!("Unexpected argument: {other}. {}", Self::USAGE)),
            }
        }
        if options.game.is_none() && !options.list {
            return Err(anyhow!(Self::USAGE));
        }
        Ok(options)
    }
}

fn parse_value<T: std::str::FromStr>(flag: &str, value: Option<String>) -> Result<T> {
    let value = value.ok_or_else(|| anyhow!("{flag} expects a value"))?;
    value
        .parse()
        .map_err(|_| anyhow!("{flag} expects a number, got {value}"))
}
