use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use time::format_description::well_known::Rfc3339;
use tracing_subscriber::EnvFilter;

use tapd::cli::{Cli, Command, MappingsAction};
use tapd::config::Config;
use tapd::db::mappings::{Mapping, MappingKind, MatchKind};
use tapd::db::{Database, DbError};
use tapd::platform::desktop::DesktopPlatform;
use tapd::service::{Service, ServiceError};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            reader,
            extra_readers,
            exit_game,
            exit_game_delay,
            exit_game_blocklist,
            allow_shell,
            disable_sounds,
            root_folders,
            db,
        } => {
            let cfg = Config {
                connection_string: reader,
                readers: extra_readers,
                exit_game,
                exit_game_delay,
                exit_game_blocklist,
                allow_shell,
                disable_sounds,
                db_path: db,
            };
            if let Err(e) = serve(cfg, root_folders).await {
                tracing::error!(error = %e, "service failed");
                eprintln!("tapd serve: {e}");
                std::process::exit(1);
            }
        }
        Command::Mappings { db, action } => {
            if let Err(e) = run_mappings(&db, action) {
                eprintln!("tapd mappings: {e}");
                std::process::exit(1);
            }
        }
        Command::History { db } => {
            if let Err(e) = run_history(&db) {
                eprintln!("tapd history: {e}");
                std::process::exit(1);
            }
        }
    }
}

/// Run the service until SIGTERM or SIGINT.
async fn serve(cfg: Config, root_folders: Vec<std::path::PathBuf>) -> Result<(), ServiceError> {
    let platform = Arc::new(DesktopPlatform::new(root_folders));
    let (service, mut notifications) = Service::start(platform, cfg)?;

    let notifier = tokio::spawn(async move {
        while let Some(event) = notifications.recv().await {
            tracing::debug!(?event, "state change");
        }
    });

    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;
    tokio::select! {
        _ = sigterm.recv() => tracing::info!("SIGTERM received, shutting down"),
        _ = sigint.recv() => tracing::info!("SIGINT received, shutting down"),
    }

    notifier.abort();
    service.stop();
    Ok(())
}

fn run_mappings(path: &Path, action: MappingsAction) -> Result<(), DbError> {
    let database = Database::open(path)?;
    match action {
        MappingsAction::List => {
            for m in database.all_mappings() {
                let state = if m.enabled { "on" } else { "off" };
                println!(
                    "{}\t{}\t{:?}/{:?}\t{}\t{}\t{}",
                    m.id, state, m.kind, m.match_kind, m.pattern, m.override_text, m.label
                );
            }
        }
        MappingsAction::Add {
            label,
            kind,
            match_kind,
            pattern,
            override_text,
            disabled,
        } => {
            let added = database.add_mapping(Mapping {
                id: String::new(),
                added: 0,
                label,
                enabled: !disabled,
                kind: parse_kind(&kind)?,
                match_kind: parse_match(&match_kind)?,
                pattern,
                override_text,
            })?;
            println!("added mapping {}", added.id);
        }
        MappingsAction::Delete { id } => database.delete_mapping(&id)?,
    }
    Ok(())
}

fn run_history(path: &Path) -> Result<(), DbError> {
    let database = Database::open(path)?;
    for entry in database.history() {
        let time = entry.time.format(&Rfc3339).unwrap_or_default();
        let outcome = if entry.success { "ok" } else { "err" };
        println!("{time}\t{outcome}\t{}\t{}", entry.uid, entry.text);
    }
    Ok(())
}

fn parse_kind(s: &str) -> Result<MappingKind, DbError> {
    match s {
        "uid" => Ok(MappingKind::Uid),
        "text" => Ok(MappingKind::Text),
        "data" => Ok(MappingKind::Data),
        _ => Err(DbError::InvalidMapping(format!("unknown kind: {s}"))),
    }
}

fn parse_match(s: &str) -> Result<MatchKind, DbError> {
    match s {
        "exact" => Ok(MatchKind::Exact),
        "partial" => Ok(MatchKind::Partial),
        "regex" => Ok(MatchKind::Regex),
        _ => Err(DbError::InvalidMapping(format!("unknown match: {s}"))),
    }
}
