//! Serve command implementation.

use super::json;
use hostbridge_host::{Dispatcher, HostServer, MemoryWorkspace};
use hostbridge_link::{ConnectionSettings, HostAdapter};
use hostbridge_protocol::{PushConfig, PushType};
use std::path::Path;
use std::sync::Arc;
use std::thread;

/// Serves an in-memory document until the process is killed.
pub fn run(
    settings: &ConnectionSettings,
    seed: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let workspace = Arc::new(MemoryWorkspace::new());
    let dispatcher = Arc::new(Dispatcher::new(workspace.clone()));

    if let Some(path) = seed {
        let objects = json::read_objects(path)?;
        let local = HostAdapter::local(dispatcher.clone());
        let config = Some(PushConfig::default());
        let created = local.push(&objects, PushType::CreateOnly, "seed", config);
        tracing::info!(path = %path.display(), created = created.len(), "seeded document");
    }

    let _server = HostServer::bind(dispatcher, settings)?;
    tracing::info!(
        commands = %settings.push_addr(),
        results = %settings.pull_addr(),
        entities = workspace.len(),
        "serving"
    );
    loop {
        thread::park();
    }
}
