use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use ureq::Agent;

use crate::step::StepError;

/// Build an HTTP agent whose calls give up after `timeout`.
pub fn agent(timeout: Duration) -> Agent {
    let config = Agent::config_builder()
        .timeout_global(Some(timeout))
        .build();

    config.into()
}

/// POST `body` as JSON and decode the JSON response.
pub fn post_json<B: Serialize, T: DeserializeOwned>(
    agent: &Agent,
    url: &str,
    bearer: Option<&str>,
    body: &B,
) -> Result<T, StepError> {
    debug!(url, "POST");
    let mut request = agent.post(url).header("Content-Type", "application/json");
    if let Some(token) = bearer {
        request = request.header("Authorization", format!("Bearer {token}"));
    }

    let decoded: T = request.send_json(body)?.body_mut().read_json()?;

    Ok(decoded)
}
