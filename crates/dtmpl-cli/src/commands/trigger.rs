use std::path::Path;

use dtmpl_ci::{BuildRequest, BuildTrigger, RegistrySettings, TriggerError, load_payload_template};

pub async fn trigger(
    request: &BuildRequest,
    registry: &str,
    payload_template: Option<&Path>,
) -> anyhow::Result<()> {
    let settings = RegistrySettings::from_env(registry);
    tracing::debug!(?settings, "registry settings");

    let mut client = BuildTrigger::new(settings);
    if let Some(path) = payload_template {
        client = client.with_payload_template(load_payload_template(path)?);
    }

    let result = match client.trigger(request).await {
        Ok(result) => result,
        Err(TriggerError::Rejected { status, body }) => {
            println!("{body}");
            anyhow::bail!("registry rejected the build (HTTP {status})");
        }
        Err(e) => return Err(e.into()),
    };

    println!("{}", result.status_url(&client.settings().host));
    println!("{}", result.pretty_body()?);
    Ok(())
}
