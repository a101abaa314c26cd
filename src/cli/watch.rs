//! `hotbrew watch`
//!
//! Loads the selected scripts and keeps the registry alive so edits to
//! their sources (or the shared library) recompile them in place. Each
//! reload outcome replaces the previous one in the status block.

use std::thread;

use anyhow::{Result, anyhow};
use crossbeam::channel::{self, Sender};
use crossbeam::select;

use super::common::{open_registry, plural_scripts, select_names};
use crate::config::ProjectConfig;
use crate::container::{ContainerEvent, ScriptContainer};
use crate::error::RuntimeError;
use crate::log;
use crate::logger::{status_error, status_success, status_warning};

pub fn watch_scripts(config: &ProjectConfig, names: &[String]) -> Result<()> {
    let registry = open_registry(config)?;
    if !registry.is_watching() {
        return Err(anyhow!(
            "cannot watch {}",
            registry.settings().source_root.display()
        ));
    }

    let names = select_names(&registry, names)?;
    if names.is_empty() {
        log!("watch"; "no scripts found in {}", registry.settings().source_root.display());
        return Ok(());
    }

    let (event_tx, event_rx) = channel::unbounded();
    for name in &names {
        let container = registry.get(name)?;
        forward_events(&container, event_tx.clone());
        // Compile failures arrive as Faulted events
        match container.compile() {
            Ok(_) | Err(RuntimeError::CompileFailed(_)) => {}
            Err(e) => status_warning(&format!("{name}: {e}")),
        }
    }
    drop(event_tx);

    let (shutdown_tx, shutdown_rx) = channel::bounded(1);
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.try_send(());
    })
    .map_err(|e| anyhow!("failed to set Ctrl+C handler: {}", e))?;

    log!("watch"; "watching {} (Ctrl+C to stop)", plural_scripts(names.len()));
    loop {
        select! {
            recv(event_rx) -> event => match event {
                Ok(event) => report(&event),
                Err(_) => break,
            },
            recv(shutdown_rx) -> _ => break,
        }
    }

    log!("watch"; "shutting down...");
    registry.dispose();
    Ok(())
}

/// Relay a container's events into the shared channel until it is disposed.
fn forward_events(container: &ScriptContainer, tx: Sender<ContainerEvent>) {
    let events = container.subscribe();
    thread::spawn(move || {
        for event in events.iter() {
            if tx.send(event).is_err() {
                break;
            }
        }
    });
}

fn report(event: &ContainerEvent) {
    match event {
        ContainerEvent::Reloaded { name, generation } => {
            status_success(&format!("reloaded {name} (generation {generation})"));
        }
        ContainerEvent::Faulted { failure, .. } => {
            status_error(
                &format!("failed to compile `{}`", failure.type_name),
                &failure.detail(),
            );
        }
        ContainerEvent::Disposed { .. } => {}
    }
}
