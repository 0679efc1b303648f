//! Delete command implementation.

use super::{connect, CliError};
use hostbridge_link::ConnectionSettings;
use hostbridge_protocol::FilterQuery;

/// Deletes every object matching `filter`.
pub fn run(settings: &ConnectionSettings, filter: &FilterQuery) -> Result<(), CliError> {
    let adapter = connect(settings)?;
    let removed = adapter.delete(filter);
    println!("Deleted {removed} objects");
    Ok(())
}
