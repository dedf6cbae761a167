use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;

use padmap::cli::{CliArgs, Command};
use padmap::config::EngineConfig;
use padmap::config_paths;
use padmap::import::{parse_catalog, StreamDeckProfile};
use padmap::mapping::{
    load_default_profile, load_profile_file, Action, ControllerButton, KeyCode, Resolution,
    Resolver,
};
use padmap::replay::{parse_script, replay};
use padmap::stats::ActionStats;
use padmap::store::ProfileManager;

fn main() -> Result<()> {
    let args = CliArgs::parse();
    padmap::tracing::init(args.verbose);

    let config = match &args.config {
        Some(path) => EngineConfig::load_from(path),
        None => EngineConfig::load(),
    };

    match args.command {
        Command::Validate { path } => validate(&path),
        Command::Replay {
            script,
            profile,
            json,
        } => run_replay(&config, &script, profile.as_deref(), json),
        Command::ExportDefault { output } => {
            let json = load_default_profile().to_json()?;
            write_output(output.as_deref(), &json)
        }
        Command::ImportStreamDeck { path, output } => {
            import_stream_deck(&config, &path, output.as_deref())
        }
        Command::Catalog { path } => {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            for entry in parse_catalog(&contents)? {
                println!("{}\t{}\t{}", entry.id, entry.display_name, entry.download_url);
            }
            Ok(())
        }
        Command::Profiles => {
            let manager = open_store(&config)?;
            let active = manager.active_profile_id();
            for profile in manager.profiles() {
                let marker = if profile.id == active { "*" } else { " " };
                println!("{} {}\t{}", marker, profile.id, profile.name);
            }
            Ok(())
        }
        Command::Bind {
            button,
            key,
            long_hold,
            double_tap,
            repeat,
        } => bind(&config, button, key, long_hold, double_tap, repeat),
        Command::InitConfig { force } => init_config(args.config.as_deref(), force),
        Command::Paths => {
            let show = |path: Option<PathBuf>| {
                path.map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(unavailable)".to_string())
            };
            println!(
                "config\t{}",
                show(args.config.clone().or_else(config_paths::config_file))
            );
            println!("profiles\t{}", show(config.storage_dir()));
            println!("log\t{}", show(config_paths::log_file()));
            Ok(())
        }
    }
}

fn bind(
    config: &EngineConfig,
    button: ControllerButton,
    key: KeyCode,
    long_hold: Option<KeyCode>,
    double_tap: Option<KeyCode>,
    repeat: bool,
) -> Result<()> {
    let binding = config.new_binding(
        Action::key(key),
        long_hold.map(Action::key),
        double_tap.map(Action::key),
        repeat,
    )?;
    let manager = open_store(config)?;
    let stored = manager.set_mapping(button, binding)?;
    println!(
        "{} in \"{}\": {}",
        button,
        manager.active_profile().name,
        stored.action().map(ToString::to_string).unwrap_or_default()
    );
    Ok(())
}

fn init_config(path: Option<&Path>, force: bool) -> Result<()> {
    let target = match path {
        Some(path) => path.to_path_buf(),
        None => config_paths::config_file().context("No config directory available")?,
    };
    if target.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", target.display());
    }
    let config = EngineConfig::default();
    match path {
        Some(path) => config.save_to(path),
        None => config.save(),
    }
    .map_err(anyhow::Error::msg)?;
    println!("Wrote {}", target.display());
    Ok(())
}

fn validate(path: &Path) -> Result<()> {
    let profile = load_profile_file(path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    let issues = profile.validate();
    if issues.is_empty() {
        println!("{}: ok", path.display());
        return Ok(());
    }
    for issue in &issues {
        println!("{}: {}", path.display(), issue);
    }
    bail!("{} problem(s) found", issues.len())
}

fn run_replay(config: &EngineConfig, script: &Path, profile: Option<&Path>, json: bool) -> Result<()> {
    let profile = match profile {
        Some(path) => Arc::new(
            load_profile_file(path).with_context(|| format!("Failed to load {}", path.display()))?,
        ),
        None => open_store(config)?.active_profile(),
    };
    let contents = fs::read_to_string(script)
        .with_context(|| format!("Failed to read {}", script.display()))?;
    let steps = parse_script(&contents)?;

    let mut resolver = Resolver::with_settings(profile, config.resolver_settings());
    let stats = ActionStats::new();
    let fired = replay(&mut resolver, &steps, &stats);

    for resolution in &fired {
        if json {
            println!("{}", serde_json::to_string(&resolution_json(resolution))?);
        } else {
            println!(
                "{:>7}ms  {:<10}  {}",
                resolution.at.as_millis(),
                format!("{:?}", resolution.trigger),
                resolution.action
            );
        }
    }
    if !json {
        let snapshot = stats.snapshot();
        println!("{} action(s) from {} step(s)", snapshot.total, steps.len());
    }
    Ok(())
}

fn resolution_json(resolution: &Resolution) -> serde_json::Value {
    serde_json::json!({
        "at_ms": resolution.at.as_millis() as u64,
        "trigger": resolution.trigger,
        "action": resolution.action,
        "hint": resolution.hint,
    })
}

fn import_stream_deck(config: &EngineConfig, path: &Path, output: Option<&Path>) -> Result<()> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let deck: StreamDeckProfile = serde_json::from_str(&contents)
        .with_context(|| format!("Invalid Stream Deck data in {}", path.display()))?;
    let import = deck.into_profile();

    for skipped in &import.skipped {
        eprintln!(
            "skipped key {}{}: {}",
            skipped.index,
            skipped
                .title
                .as_deref()
                .map(|t| format!(" ({})", t))
                .unwrap_or_default(),
            skipped.reason
        );
    }

    match output {
        Some(_) => write_output(output, &import.profile.to_json()?),
        None => {
            let manager = open_store(config)?;
            let profile = manager.import_profile(import.profile);
            println!("Imported \"{}\" as {}", profile.name, profile.id);
            Ok(())
        }
    }
}

fn open_store(config: &EngineConfig) -> Result<ProfileManager> {
    let dir = config
        .storage_dir()
        .context("No config directory available for the profile store")?;
    ProfileManager::open(&dir)
        .with_context(|| format!("Failed to open profile store at {}", dir.display()))
}

fn write_output(output: Option<&Path>, contents: &str) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, contents)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Wrote {}", path.display());
        }
        None => println!("{}", contents),
    }
    Ok(())
}
