//! Update-property command implementation.

use super::{connect, CliError};
use hostbridge_link::ConnectionSettings;
use hostbridge_protocol::{FilterQuery, Value};

/// Sets `property` to `value` on every object matching `filter`.
pub fn run(
    settings: &ConnectionSettings,
    filter: &FilterQuery,
    property: &str,
    value: Value,
) -> Result<(), CliError> {
    let adapter = connect(settings)?;
    let changed = adapter.update_property(filter, property, value);
    println!("Updated {property} on {changed} objects");
    Ok(())
}
