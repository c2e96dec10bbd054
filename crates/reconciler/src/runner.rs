//! Runner workload description.

use chaos_core::{
    ChaosEngine, Container, EnvVar, MountSource, Pod, PodSpec, Volume, VolumeMount, VolumeSource,
    APP_LABEL, CORRELATION_LABEL, RUNNER_CONTAINER,
};
use itertools::Itertools;

use crate::error::{Error, Result};
use crate::validator::CHAOS_ANNOTATION_KEY;

/// Label naming the component a workload belongs to.
pub const COMPONENT_LABEL: &str = "app.kubernetes.io/component";

/// Label naming the product a workload belongs to.
pub const PART_OF_LABEL: &str = "app.kubernetes.io/part-of";

const DEFAULT_PULL_POLICY: &str = "IfNotPresent";
const RESTART_POLICY: &str = "OnFailure";

/// Inputs for building a runner.
#[derive(Debug, Clone, Copy)]
pub struct RunnerRequest<'a> {
    pub engine: &'a ChaosEngine,
    /// Image after the fallback chain has been applied.
    pub image: &'a str,
    pub client_uuid: &'a str,
}

/// Maps a campaign to its runner workload. Deterministic, no side effects.
pub trait RunnerSpecBuilder: Send + Sync {
    /// Build the runner pod.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RunnerBuild`] when the campaign cannot be described
    /// as a runner.
    fn build(&self, request: &RunnerRequest<'_>) -> Result<Pod>;
}

/// The standard runner layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRunnerBuilder;

impl DefaultRunnerBuilder {
    fn env(request: &RunnerRequest<'_>) -> Vec<EnvVar> {
        let engine = request.engine;
        let target = engine.spec.appinfo.resolved(engine.namespace());
        let annotation_check = if engine.spec.annotation_check.is_empty() {
            chaos_core::AnnotationCheck::DEFAULT
        } else {
            engine.spec.annotation_check.as_str()
        };
        vec![
            EnvVar::new("CHAOSENGINE", engine.name()),
            EnvVar::new("APP_LABEL", target.label),
            EnvVar::new("APP_KIND", target.kind),
            EnvVar::new("APP_NAMESPACE", target.namespace),
            EnvVar::new("EXPERIMENT_LIST", engine.experiment_names().join(",")),
            EnvVar::new("CHAOS_SVC_ACC", engine.spec.chaos_service_account.as_str()),
            EnvVar::new("AUXILIARY_APPINFO", engine.spec.auxiliary_app_info.as_str()),
            EnvVar::new("CLIENT_UUID", request.client_uuid),
            EnvVar::new("CHAOS_NAMESPACE", engine.namespace()),
            EnvVar::new("ANNOTATION_CHECK", annotation_check),
            EnvVar::new("ANNOTATION_KEY", CHAOS_ANNOTATION_KEY),
        ]
    }

    fn volumes(engine: &ChaosEngine) -> (Vec<Volume>, Vec<VolumeMount>) {
        let runner = &engine.spec.components.runner;
        let config_maps = runner.config_maps.iter().map(|cm| {
            (
                cm,
                VolumeSource::ConfigMap {
                    name: cm.name.clone(),
                },
            )
        });
        let secrets = runner.secrets.iter().map(|s| {
            (
                s,
                VolumeSource::Secret {
                    secret_name: s.name.clone(),
                },
            )
        });
        config_maps
            .chain(secrets)
            .map(|(mount, source): (&MountSource, VolumeSource)| {
                (
                    Volume {
                        name: mount.name.clone(),
                        source,
                    },
                    VolumeMount {
                        name: mount.name.clone(),
                        mount_path: mount.mount_path.clone(),
                    },
                )
            })
            .unzip()
    }
}

impl RunnerSpecBuilder for DefaultRunnerBuilder {
    fn build(&self, request: &RunnerRequest<'_>) -> Result<Pod> {
        let engine = request.engine;
        if engine.correlation_id().is_empty() {
            return Err(Error::runner_build(format!(
                "chaosengine '{}' has no uid to label its runner with",
                engine.key()
            )));
        }
        if request.image.is_empty() {
            return Err(Error::runner_build("runner image is empty"));
        }
        if let Some(duplicate) = engine
            .spec
            .components
            .runner
            .config_maps
            .iter()
            .chain(&engine.spec.components.runner.secrets)
            .map(|m| m.name.as_str())
            .duplicates()
            .next()
        {
            return Err(Error::runner_build(format!(
                "volume '{duplicate}' is declared more than once"
            )));
        }

        let runner = &engine.spec.components.runner;
        let (volumes, volume_mounts) = Self::volumes(engine);
        let image_pull_policy = if runner.image_pull_policy.is_empty() {
            DEFAULT_PULL_POLICY.to_string()
        } else {
            runner.image_pull_policy.clone()
        };

        let mut pod = Pod::new(engine.namespace(), engine.runner_name());
        pod.metadata = pod
            .metadata
            .with_label(APP_LABEL, engine.name())
            .with_label(CORRELATION_LABEL, engine.correlation_id())
            .with_label(COMPONENT_LABEL, RUNNER_CONTAINER)
            .with_label(PART_OF_LABEL, "litmus");
        pod.metadata.annotations = runner.runner_annotation.clone();
        pod.spec = PodSpec {
            service_account_name: engine.spec.chaos_service_account.clone(),
            restart_policy: RESTART_POLICY.to_string(),
            containers: vec![Container {
                name: RUNNER_CONTAINER.to_string(),
                image: request.image.to_string(),
                image_pull_policy,
                command: runner.command.clone(),
                args: runner.args.clone(),
                env: Self::env(request),
                volume_mounts,
            }],
            node_selector: runner.node_selector.clone(),
            volumes,
        };
        Ok(pod)
    }
}
