//! Subcommands driving a headless workbench against the backend.

use std::sync::Arc;

use anyhow::{bail, Context};
use atlas_client::{ClientConfig, HttpRemote};
use atlas_editor::{
    Position, RemoteFiles, SidebarAction, TextRange, TextSurface, Workbench, WorkbenchOptions,
};
use tracing::info;

use crate::cli::Command;
use crate::style;

type HeadlessWorkbench = Workbench<TextSurface>;

pub fn run(command: Command, config: &ClientConfig) -> anyhow::Result<()> {
    let remote: Arc<dyn RemoteFiles> = Arc::new(HttpRemote::new(config));
    let options = WorkbenchOptions {
        autocompletion: config.autocompletion,
        save_debounce: config.save_debounce,
    };
    let mut bench = Workbench::new(TextSurface::new(), remote, options)
        .context("failed to start the save worker")?;
    let loaded = bench
        .load_project()
        .with_context(|| format!("failed to load project '{}'", config.project_name))?;
    info!(
        "project '{}' from {}: {loaded} file(s)",
        config.project_name, config.base_url
    );

    let result = match command {
        Command::Tree { expand_all } => {
            print_tree(&mut bench, &config.project_name, expand_all);
            Ok(())
        }
        Command::Complete { file, line, column } => {
            complete(&mut bench, &file, Position::new(line - 1, column - 1))
        }
        Command::Rectify {
            file,
            start,
            end,
            prompt,
            apply,
        } => rectify(&mut bench, &file, TextRange::new(start, end), &prompt, apply),
        Command::Create => create(&mut bench),
        Command::Rename { from, to } => {
            bench.rename(&from, &to)?;
            println!("{}", style::success(format!("Renamed {from} -> {to}")));
            Ok(())
        }
        Command::Delete { path } => {
            bench.dispatch(SidebarAction::Delete(path.clone()))?;
            println!("{}", style::success(format!("Deleted {path}")));
            Ok(())
        }
        Command::Completions { .. } => bail!("shell completions do not need a project"),
    };
    bench.flush();
    result
}

fn print_tree(bench: &mut HeadlessWorkbench, project: &str, expand_all: bool) {
    if expand_all {
        bench.expand_all();
    }
    println!("{}", style::accent(project));
    if bench.registry().is_empty() {
        println!("{}", style::warning("(no files)"));
        return;
    }
    print!("{}", bench.tree().render());
}

fn complete(bench: &mut HeadlessWorkbench, file: &str, at: Position) -> anyhow::Result<()> {
    bench.open_path(file)?;
    let items = bench.complete(at)?;
    if items.is_empty() {
        println!("{}", style::warning("No suggestions"));
    }
    for item in items {
        println!(
            "{}  {}  {}",
            style::accent(&item.label),
            item.detail,
            item.documentation
        );
    }
    Ok(())
}

fn rectify(
    bench: &mut HeadlessWorkbench,
    file: &str,
    span: TextRange,
    prompt: &str,
    apply: bool,
) -> anyhow::Result<()> {
    bench.open_path(file)?;
    if bench.select(span)?.is_none() {
        bail!("the span to rectify is empty");
    }
    bench.set_rectify_prompt(prompt)?;
    bench.retry_rectify()?;
    let code = bench
        .session()
        .rectify_popup()
        .map(|popup| popup.code().to_string())
        .unwrap_or_default();
    println!("{code}");
    if apply {
        bench.validate_rectify()?;
        println!("{}", style::success(format!("Applied to {file}")));
    } else {
        bench.close_rectify();
    }
    Ok(())
}

fn create(bench: &mut HeadlessWorkbench) -> anyhow::Result<()> {
    let outcome = bench.dispatch(SidebarAction::Create);
    let path = bench
        .active_buffer()
        .map(|buffer| buffer.path().to_string())
        .unwrap_or_default();
    match outcome {
        Ok(()) => {
            println!("{}", style::success(format!("Created {path}")));
            Ok(())
        }
        Err(err) => {
            println!(
                "{}",
                style::warning(format!("{path} is open locally but not on the server yet"))
            );
            Err(err.into())
        }
    }
}
