use std::path::PathBuf;

use error_stack::Report;
use error_stack::ResultExt;
use kube::config::KubeConfigOptions;
use kube::config::Kubeconfig;
use kube::Client;
use kube::Config;

use crate::domain::error::ControlPlaneError;

/// Build a client from an explicit kubeconfig, or from the in-cluster
/// environment / `~/.kube/config` when none is given.
pub async fn init_kube_client(
    kubeconfig: Option<PathBuf>,
) -> Result<Client, Report<ControlPlaneError>> {
    let Some(kubeconfig_path) = kubeconfig else {
        return Client::try_default()
            .await
            .change_context(ControlPlaneError::ConnectionFailed {
                message: "no kubeconfig given and neither in-cluster nor ~/.kube/config usable".to_string(),
            });
    };

    let kubeconfig = Kubeconfig::read_from(&kubeconfig_path).change_context(
        ControlPlaneError::ConnectionFailed {
            message: format!("cannot read kubeconfig {}", kubeconfig_path.display()),
        },
    )?;

    let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .change_context(ControlPlaneError::ConnectionFailed {
            message: format!(
                "kubeconfig {} has no usable current context",
                kubeconfig_path.display()
            ),
        })?;

    Client::try_from(config).change_context(ControlPlaneError::ConnectionFailed {
        message: "cannot build an API client for the model operator".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test(tokio::test)]
    async fn unreadable_kubeconfig_names_the_path() {
        let path = PathBuf::from("/nonexistent/model-operator/kubeconfig");

        let err = init_kube_client(Some(path))
            .await
            .err()
            .expect("missing kubeconfig");

        match err.current_context() {
            ControlPlaneError::ConnectionFailed { message } => {
                assert!(message.contains("/nonexistent/model-operator/kubeconfig"));
            }
            other => panic!("unexpected context: {other}"),
        }
    }
}
