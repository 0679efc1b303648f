//! Ping command implementation.

use super::{connect, CliError};
use hostbridge_link::ConnectionSettings;

/// Checks that the host answers the connection probe.
pub fn run(settings: &ConnectionSettings) -> Result<(), CliError> {
    let adapter = connect(settings)?;
    if !adapter.check_connection() {
        return Err(CliError::Unreachable(settings.push_addr().to_string()));
    }
    println!("host at {} is reachable", settings.push_addr());
    Ok(())
}
