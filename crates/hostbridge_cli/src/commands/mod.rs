//! CLI command implementations.

pub mod delete;
pub mod json;
pub mod ping;
pub mod pull;
pub mod push;
pub mod serve;
pub mod update_property;

use clap::Args;
use hostbridge_link::{BridgeError, ConnectionSettings, HostAdapter};
use hostbridge_protocol::FilterQuery;
use thiserror::Error;

/// Errors raised by the CLI itself, before or after talking to a host.
#[derive(Error, Debug)]
pub enum CliError {
    /// A `--where` predicate was not of the form `field=value`.
    #[error("invalid predicate `{0}`, expected FIELD=VALUE")]
    InvalidPredicate(String),

    /// The host did not answer the connection check.
    #[error("host at {0} did not answer")]
    Unreachable(String),

    /// An output format other than `text` or `json` was requested.
    #[error("unknown output format `{0}`")]
    UnknownFormat(String),

    /// The client could not reach the host.
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

/// Filter flags shared by pull, delete and update-property.
#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// Only match objects of this type
    #[arg(long = "type")]
    pub type_name: Option<String>,

    /// Only match objects whose field equals a JSON value (repeatable)
    #[arg(long = "where", value_name = "FIELD=VALUE")]
    pub equals: Vec<String>,
}

impl FilterArgs {
    /// Builds the filter query these flags describe.
    pub fn to_query(&self) -> Result<FilterQuery, CliError> {
        let mut query = match &self.type_name {
            Some(type_name) => FilterQuery::of_type(type_name.as_str()),
            None => FilterQuery::all(),
        };
        for predicate in &self.equals {
            let (field, value) = predicate
                .split_once('=')
                .filter(|(field, _)| !field.is_empty())
                .ok_or_else(|| CliError::InvalidPredicate(predicate.clone()))?;
            query = query.with(field, json::parse_value(value));
        }
        Ok(query)
    }
}

/// Connects to the host described by `settings`.
pub fn connect(settings: &ConnectionSettings) -> Result<HostAdapter, CliError> {
    tracing::debug!(
        push = %settings.push_addr(),
        pull = %settings.pull_addr(),
        "connecting"
    );
    Ok(HostAdapter::connect(settings.clone())?)
}

/// Checks an output format name.
pub fn check_format(format: &str) -> Result<(), CliError> {
    match format {
        "text" | "json" => Ok(()),
        other => Err(CliError::UnknownFormat(other.to_string())),
    }
}
