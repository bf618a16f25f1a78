use std::env;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use log::{info, warn};

use crate::config::Settings;
use crate::identity::IdentityResolver;
use crate::library::{
    JsonCatalog, LibraryScanner, MediaIndex, NoMediaIndex, Reconciler, StaticMediaIndex,
    display_track,
};
use crate::tags::{self, FrameName};

mod cli;
mod settings;
mod startup;

use cli::Command;

pub fn run() -> Result<(), Box<dyn Error>> {
    let settings = settings::load_settings();
    startup::init_logging(&settings.logging);

    let command = cli::parse(env::args().skip(1)).map_err(|e| format!("{e}\n\n{}", cli::USAGE))?;

    match command {
        Command::Scan { roots } => scan(&settings, roots),
        Command::List => list(&settings),
        Command::Inspect(path) => inspect(&path),
        Command::FixTags(paths) => fix_tags(&settings, &paths),
        Command::Config => {
            print!("{}", settings.to_toml()?);
            Ok(())
        }
        Command::Help => {
            println!("{}", cli::USAGE);
            Ok(())
        }
    }
}

fn catalog_path(settings: &Settings) -> Result<PathBuf, Box<dyn Error>> {
    settings
        .catalog_path()
        .ok_or_else(|| "cannot locate the catalog; set catalog.path".into())
}

fn resolver(settings: &Settings) -> IdentityResolver {
    IdentityResolver::new(settings.identity.timestamp_prefix.clone())
}

fn scan(settings: &Settings, roots: Vec<PathBuf>) -> Result<(), Box<dyn Error>> {
    let mut library = settings.library.clone();
    if !roots.is_empty() {
        library.roots = roots;
    }
    if library.roots.is_empty() && library.media_index_snapshot.is_none() {
        library.roots.push(env::current_dir()?);
    }

    let path = catalog_path(settings)?;
    info!("Using catalog {}", path.display());
    let store = JsonCatalog::open(&path)?;

    let index: Box<dyn MediaIndex> = match &library.media_index_snapshot {
        Some(p) => Box::new(StaticMediaIndex::from_json_file(p)?),
        None => Box::new(NoMediaIndex),
    };

    let scanner = LibraryScanner::new(Reconciler::new(
        library,
        resolver(settings),
        index,
        Box::new(store),
    ));

    let (tx, rx) = mpsc::channel();
    scanner.scan(true, move |ok| {
        let _ = tx.send(ok);
    });
    let ok = rx.recv().unwrap_or(false);
    let report = scanner.last_report();
    scanner.shutdown();

    if !ok {
        return Err("scan failed".into());
    }
    if let Some(report) = report {
        println!("{report}");
        for dup in &report.duplicates {
            println!("duplicate: {}", dup.display());
        }
    }
    Ok(())
}

fn list(settings: &Settings) -> Result<(), Box<dyn Error>> {
    let catalog = JsonCatalog::open(&catalog_path(settings)?)?;

    let lib = &settings.library;
    let mut lines: Vec<String> = catalog
        .data()
        .tracks
        .iter()
        .map(|t| display_track(t, &lib.display_fields, &lib.display_separator))
        .collect();
    lines.sort_by_key(|l| l.to_lowercase());

    for line in lines {
        println!("{line}");
    }
    Ok(())
}

fn inspect(path: &Path) -> Result<(), Box<dyn Error>> {
    let frames = tags::read_frames(path)?;
    for name in FrameName::ALL {
        println!("{:<20}{}", name.as_str(), frames.get(name).unwrap_or("-"));
    }
    let computed = tags::compute_audio_checksum(path).unwrap_or_else(|| "-".to_string());
    println!("{:<20}{}", "(audio md5)", computed);
    Ok(())
}

fn fix_tags(settings: &Settings, paths: &[PathBuf]) -> Result<(), Box<dyn Error>> {
    let resolver = resolver(settings);
    let mut failed = 0;

    for path in paths {
        match resolver.resolve(path, true) {
            Ok(id) => match &id.write_error {
                None => println!("{}: {} ({} frame(s) written)", path.display(), id.guid, id.writes),
                Some(e) => {
                    warn!("{}: not updated: {}", path.display(), e);
                    failed += 1;
                }
            },
            Err(e) => {
                warn!("{e}");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(format!("{failed} file(s) could not be fixed").into());
    }
    Ok(())
}
