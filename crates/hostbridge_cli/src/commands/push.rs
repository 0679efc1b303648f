//! Push command implementation.

use super::json::{self, ObjectSpec};
use super::{check_format, connect};
use hostbridge_link::ConnectionSettings;
use hostbridge_protocol::{PushConfig, PushType};
use std::path::Path;

/// Options for one push.
#[derive(Debug, Clone)]
pub struct PushOptions {
    /// How existing objects are treated.
    pub push_type: PushType,
    /// Tag added to every object.
    pub tag: String,
    /// Copy custom data onto host entities.
    pub copy_custom_data: bool,
    /// Dismiss host validation prompts.
    pub suppress_failure_messages: bool,
}

impl PushOptions {
    /// The push configuration sent to the host.
    pub fn config(&self) -> PushConfig {
        PushConfig::default()
            .with_copy_custom_data(self.copy_custom_data)
            .with_suppress_failure_messages(self.suppress_failure_messages)
    }
}

/// Pushes the objects in `file` and prints the ones the host applied.
pub fn run(
    settings: &ConnectionSettings,
    file: &Path,
    options: &PushOptions,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    check_format(format)?;
    let objects = json::read_objects(file)?;
    let adapter = connect(settings)?;
    let applied = adapter.push(
        &objects,
        options.push_type,
        &options.tag,
        Some(options.config()),
    );

    if format == "json" {
        let specs: Vec<ObjectSpec> = applied.iter().map(ObjectSpec::from_domain).collect();
        println!("{}", serde_json::to_string_pretty(&specs)?);
    } else {
        println!("Applied {} of {} objects", applied.len(), objects.len());
        for object in &applied {
            println!("  {}", super::pull::describe(object));
        }
    }
    Ok(())
}
