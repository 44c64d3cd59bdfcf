use std::collections::VecDeque;
use std::path::PathBuf;

use polyform_lib::attach::AttachmentResolver;
use polyform_lib::catalog::{Catalog, HttpCatalog, OfflineCatalog};
use polyform_lib::command::{execute_command, AgentCommand};
use polyform_lib::render::{LogSink, RenderSink};
use polyform_lib::session::{load_reference, Session};
use polyform_lib::settings::AppSettings;
use polyform_lib::state::WorkspaceState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "polyform_workspace=info,polyform_lib=info".into()),
        )
        .init();

    let settings = AppSettings::load();
    if AppSettings::config_path().is_some_and(|path| !path.exists()) {
        settings.save();
    }
    let script = parse_script_arg();

    match settings.catalog.base_url.clone() {
        Some(url) => match HttpCatalog::new(url.as_str(), settings.catalog.timeout()) {
            Ok(catalog) => {
                tracing::info!("Using catalog at {url}");
                run(catalog, &settings, script).await;
            }
            Err(e) => {
                tracing::error!("Catalog client setup failed, running offline: {e}");
                run(OfflineCatalog, &settings, script).await;
            }
        },
        None => {
            tracing::info!("No catalog configured, running offline");
            run(OfflineCatalog, &settings, script).await;
        }
    }
}

/// Fixed-cadence frame loop; one script command is applied before each frame
async fn run<C: Catalog>(catalog: C, settings: &AppSettings, mut script: VecDeque<AgentCommand>) {
    let runtime = tokio::runtime::Handle::current();
    let restored = if has_flag("--fresh") {
        None
    } else {
        WorkspaceState::load_autosave(AttachmentResolver::new(settings.snap.threshold))
    };
    let mut session = match restored {
        Some(workspace) => {
            tracing::info!(polygons = workspace.len(), "Restored autosaved workspace");
            let reference = load_reference(settings.reference_path.as_deref());
            Session::with_workspace(catalog, reference, workspace, settings, runtime)
        }
        None => Session::new(catalog, settings, runtime),
    };
    let mut sink = LogSink::default();
    let mut interval = tokio::time::interval(settings.frame.interval());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    for _ in 0..settings.frame.frames {
        interval.tick().await;
        if let Some(cmd) = script.pop_front() {
            let response = execute_command(&mut session, cmd);
            if let Some(error) = &response.error {
                tracing::warn!("Command failed: {error}");
            }
        }
        let frame = session.frame();
        sink.submit(&frame);
    }

    let stats = session.stats();
    tracing::info!(
        frames = sink.frames,
        polygons = session.workspace().len(),
        chains = session.workspace().chains().len(),
        entries = stats.entries,
        hits = stats.hits,
        misses = stats.misses,
        hit_rate = stats.hit_rate(),
        warm_passes = stats.warm_passes,
        skipped_warms = stats.skipped_warms,
        registered = stats.registered,
        "Session finished"
    );
    if !script.is_empty() {
        tracing::warn!("{} script commands were not run", script.len());
    }
    session.workspace().autosave();
}

fn has_flag(flag: &str) -> bool {
    std::env::args().any(|a| a == flag)
}

/// Parse `--script <path>`: a JSON array of commands
fn parse_script_arg() -> VecDeque<AgentCommand> {
    let args: Vec<String> = std::env::args().collect();
    let Some(path) = args
        .iter()
        .position(|a| a == "--script")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from)
    else {
        return VecDeque::new();
    };
    match std::fs::read_to_string(&path) {
        Ok(json) => match serde_json::from_str::<Vec<AgentCommand>>(&json) {
            Ok(cmds) => {
                tracing::info!("Loaded {} commands from {}", cmds.len(), path.display());
                cmds.into()
            }
            Err(e) => {
                tracing::error!("Failed to parse script {}: {e}", path.display());
                VecDeque::new()
            }
        },
        Err(e) => {
            tracing::error!("Failed to read script {}: {e}", path.display());
            VecDeque::new()
        }
    }
}
