use std::path::PathBuf;

use clap::Parser;

use crate::domain::policy::CPU_IMAGE;
use crate::domain::policy::GPU_IMAGE;

#[derive(Parser, Clone, Debug)]
pub struct ControllerArgs {
    #[arg(
        long,
        env = "KUBECONFIG",
        value_hint = clap::ValueHint::FilePath,
        help = "Path to kubeconfig file (defaults to cluster config or ~/.kube/config)"
    )]
    pub kubeconfig: Option<PathBuf>,

    #[arg(
        long,
        env = "WATCH_NAMESPACE",
        help = "Namespace to watch for ModelDeployments (empty for all namespaces)"
    )]
    pub namespace: Option<String>,

    #[arg(
        long,
        env = "MODEL_OPERATOR_CPU_IMAGE",
        default_value = CPU_IMAGE,
        help = "Serving image for the cpu runtime"
    )]
    pub cpu_image: String,

    #[arg(
        long,
        env = "MODEL_OPERATOR_GPU_IMAGE",
        default_value = GPU_IMAGE,
        help = "Serving image for the gpu runtime"
    )]
    pub gpu_image: String,

    #[arg(
        long,
        default_value = "1",
        help = "Seconds to wait before retrying a reconciliation that hit a write conflict"
    )]
    pub conflict_requeue_secs: u64,

    #[arg(
        long,
        default_value = "15",
        help = "Seconds to wait before retrying any other failed reconciliation"
    )]
    pub error_requeue_secs: u64,

    #[arg(
        long,
        env = "MODEL_OPERATOR_LOG_FILE",
        value_hint = clap::ValueHint::FilePath,
        help = "Also write logs to this daily-rolling file, e.g. /logs/operator.log"
    )]
    pub log_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn defaults() {
        let args = ControllerArgs::try_parse_from(["run"]).expect("parses");

        assert_eq!(args.cpu_image, CPU_IMAGE);
        assert_eq!(args.gpu_image, GPU_IMAGE);
        assert_eq!(args.conflict_requeue_secs, 1);
        assert_eq!(args.error_requeue_secs, 15);
    }

    #[test]
    fn overrides() {
        let args = ControllerArgs::try_parse_from([
            "run",
            "--namespace",
            "models",
            "--gpu-image",
            "registry.local/vllm:0.6",
            "--error-requeue-secs",
            "30",
        ])
        .expect("parses");

        assert_eq!(args.namespace.as_deref(), Some("models"));
        assert_eq!(args.gpu_image, "registry.local/vllm:0.6");
        assert_eq!(args.error_requeue_secs, 30);
    }
}
