mod commands;

use std::sync::Arc;

use anyhow::Context;
use larkcore_config::Settings;
use larkcore_query::display_order;
use larkcore_shell::{ArkToolsConverter, ProcessRunner};
use larkd::{AppService, AppState, Command, ServiceHandle, StoragePaths};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use commands::{parse_directive, Directive, DIRECTIVES};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let paths = StoragePaths::default_locations();
    let mut settings = match std::env::args_os().nth(1) {
        Some(save_file) => Settings {
            save_file: save_file.into(),
            ..Settings::load_or_default(&paths.settings)
        },
        None => Settings::load_or_default(&paths.settings),
    };
    tracing::info!(settings = %paths.settings.display(), "starting");

    let runner = ProcessRunner::new(settings.tool.program.clone(), settings.tool.args.clone());
    let converter = Arc::new(ArkToolsConverter::new(runner.clone()));
    let service = AppService::spawn(
        AppState::new(settings.clone(), paths),
        converter,
        Arc::new(runner),
    );
    let handle = service.handle();
    handle
        .send(Command::Start)
        .context("service stopped before startup")?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let directive = match parse_directive(&line) {
            Ok(directive) => directive,
            Err(err) => {
                println!("{err:#}");
                continue;
            }
        };

        match directive {
            Directive::Service(command) => handle.send(command)?,
            Directive::SaveFile(save_file) => {
                settings.save_file = save_file;
                handle.send(Command::SettingsChanged(settings.clone()))?;
            }
            Directive::Status => print_status(&handle).await?,
            Directive::Help => {
                for item in &DIRECTIVES {
                    println!("{:<28} {}", item.usage, item.description);
                }
            }
            Directive::Quit => break,
        }
    }

    service.shutdown().await;
    Ok(())
}

async fn print_status(handle: &ServiceHandle) -> anyhow::Result<()> {
    let snapshot = handle.snapshot().await?;

    println!("{} {}", snapshot.status.text, snapshot.status.detail);
    if let Some(err) = &snapshot.last_error {
        println!("last error: {err}");
    }

    for index in display_order(&snapshot.searches) {
        let search = &snapshot.searches[index];
        let selected = if snapshot.selected.contains(&index) { '>' } else { ' ' };
        println!(
            "{selected} [{index}] {:<12} {:<20} lvl {}..{} {:?}",
            search.group,
            search.species.as_deref().unwrap_or("*"),
            search.min_level.map_or("-".to_string(), |level| level.to_string()),
            search.max_level.map_or("-".to_string(), |level| level.to_string()),
            search.gender,
        );
    }

    for row in &snapshot.results {
        let dino = &row.dino;
        println!(
            "{} {:<20} {:<12} lvl {:>3} {:>6.1} {:>6.1}",
            if row.highlight { '*' } else { ' ' },
            dino.name.as_deref().unwrap_or(""),
            dino.species,
            dino.level.map_or("?".to_string(), |level| level.to_string()),
            dino.location.lat,
            dino.location.lon,
        );
    }
    Ok(())
}
