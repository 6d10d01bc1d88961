use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use resviz_analysis::Workspace;
use resviz_config::ResvizConfig;

pub fn run_list_resources(workspace_root: &Path, config: ResvizConfig, out: &mut dyn Write) -> Result<()> {
    let workspace = Workspace::new(workspace_root, config);
    let summary = workspace.reload_resources();
    if summary.skipped > 0 {
        tracing::warn!(skipped = summary.skipped, "some resource files could not be loaded");
    }

    write_resource_list(&workspace, out).context("failed to write resource list")?;
    Ok(())
}

pub fn write_resource_list(workspace: &Workspace, out: &mut dyn Write) -> std::io::Result<()> {
    writeln!(out, "path\tbase_name\tculture\tentries")?;

    let Some(snapshot) = workspace.store().current() else {
        return Ok(());
    };

    for table in snapshot.tables() {
        let path = Path::new(&table.path)
            .strip_prefix(workspace.root())
            .map(|relative| relative.to_string_lossy().replace('\\', "/"))
            .unwrap_or_else(|_| table.path.clone());

        writeln!(
            out,
            "{}\t{}\t{}\t{}",
            path,
            table.base_name,
            table.culture.as_deref().unwrap_or("-"),
            table.entries.len()
        )?;
    }

    Ok(())
}
