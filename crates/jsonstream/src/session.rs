use jsonstream_client::{connect_with_config, ClientConfig};
use jsonstream_transport::Endpoint;
use tracing::info;

use crate::exit::{client_error, outcome_code, CliResult};

/// First message sent after connecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opening {
    /// Standard envelope numbered 0.
    Envelope,
    /// `PaintTextEvent` schema test message; the counter stays at 0.
    SchemaTest,
}

/// Connect, send the opening message and serve commands until the session ends.
///
/// Returns the process exit code for the outcome.
pub fn run(endpoint: &Endpoint, config: ClientConfig, opening: Opening) -> CliResult<i32> {
    let mut client = connect_with_config(endpoint, config)
        .map_err(|err| client_error(&format!("failed to connect to {endpoint}"), err))?;

    let sent = match opening {
        Opening::Envelope => client.send_envelope().map(drop),
        Opening::SchemaTest => client.send_schema_test().map(drop),
    };
    sent.map_err(|err| client_error("failed to send opening message", err))?;

    let outcome = client
        .run()
        .map_err(|err| client_error("session failed", err))?;
    let code = outcome_code(outcome);

    info!(?outcome, sent = client.sent(), code, "session finished");
    Ok(code)
}
