use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use resviz_analysis::Workspace;
use resviz_config::ResvizConfig;

const STATUS_POLL: Duration = Duration::from_secs(1);

pub fn run_watch_loop(workspace_root: &Path, config: ResvizConfig) -> Result<()> {
    let workspace = Workspace::open(workspace_root, config);
    log_status(&workspace);

    let mut last_seen = workspace.generation();
    loop {
        thread::sleep(STATUS_POLL);

        let generation = workspace.generation();
        if generation != last_seen {
            last_seen = generation;
            log_status(&workspace);
        }
    }
}

fn log_status(workspace: &Workspace) {
    let Some(snapshot) = workspace.store().current() else {
        tracing::info!("resource store loading");
        return;
    };

    tracing::info!(
        root = %workspace.root().display(),
        generation = snapshot.generation(),
        tables = snapshot.len(),
        search_terms = snapshot.search_terms().len(),
        constants = workspace.constants().len(),
        constants_ready = workspace.constants().is_fully_parsed(),
        "workspace state"
    );
}
