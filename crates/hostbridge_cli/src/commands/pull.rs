//! Pull command implementation.

use super::json::ObjectSpec;
use super::{check_format, connect};
use hostbridge_link::ConnectionSettings;
use hostbridge_protocol::{DomainObject, FilterQuery};

/// Prints every object matching `filter`.
pub fn run(
    settings: &ConnectionSettings,
    filter: &FilterQuery,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    check_format(format)?;
    let adapter = connect(settings)?;
    let objects = adapter.pull(filter);

    if format == "json" {
        let specs: Vec<ObjectSpec> = objects.iter().map(ObjectSpec::from_domain).collect();
        println!("{}", serde_json::to_string_pretty(&specs)?);
    } else {
        println!("{} objects", objects.len());
        for object in &objects {
            println!("  {}", describe(object));
        }
    }
    Ok(())
}

/// One-line summary of an object.
pub fn describe(object: &DomainObject) -> String {
    let id = object
        .host_id
        .map(|id| format!("#{id}"))
        .unwrap_or_else(|| "-".to_string());
    let mut line = format!("{id} {} '{}' {}", object.type_name, object.name, object.guid);
    if object.is_container() {
        line.push_str(&format!(" ({} members)", object.members.len()));
    }
    line
}
