use super::{ContainerRuntime, UnitId, UnitSpec};
use crate::error::Error;
use async_trait::async_trait;
use bollard::{
    container::{
        Config, CreateContainerOptions, LogsOptions, RemoveContainerOptions,
        StartContainerOptions, StopContainerOptions, WaitContainerOptions,
    },
    errors::Error as BollardError,
    models::HostConfig,
    Docker,
};
use futures_util::stream::StreamExt;
use std::time::Duration;
use tracing::debug;

/// [`ContainerRuntime`] backed by the local Docker daemon
#[derive(Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connect using the platform defaults (`DOCKER_HOST` or the local socket)
    pub fn connect() -> Result<Self, Error> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| Error::Provision(format!("Failed to connect to Docker daemon: {}", e)))?;
        Ok(Self { docker })
    }
}

/// Docker takes the stop timeout in whole seconds; partial seconds round up
fn stop_timeout_secs(grace: Duration) -> i64 {
    let secs = grace.as_secs() + u64::from(grace.subsec_nanos() > 0);
    i64::try_from(secs).unwrap_or(i64::MAX)
}

fn status_code(err: &BollardError) -> Option<u16> {
    match err {
        BollardError::DockerResponseServerError { status_code, .. } => Some(*status_code),
        _ => None,
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn create(&self, spec: &UnitSpec) -> Result<UnitId, Error> {
        let bind = format!(
            "{}:{}:rw",
            spec.bind.host_path.display(),
            spec.bind.container_path
        );

        let config = Config {
            image: Some(spec.image.clone()),
            cmd: Some(spec.command.clone()),
            working_dir: Some(spec.working_dir.clone()),
            tty: Some(false),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            network_disabled: Some(spec.network_disabled),
            host_config: Some(HostConfig {
                binds: Some(vec![bind]),
                memory: spec.memory_bytes,
                nano_cpus: spec.nano_cpus,
                ..Default::default()
            }),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: spec.name.as_str(),
            platform: None,
        };

        let response = self
            .docker
            .create_container(Some(options), config)
            .await
            .map_err(|e| Error::Provision(format!("Failed to create container: {}", e)))?;

        for warning in &response.warnings {
            debug!("Docker warning for {}: {}", spec.name, warning);
        }

        Ok(UnitId::new(response.id))
    }

    async fn start(&self, unit: &UnitId) -> Result<(), Error> {
        self.docker
            .start_container(unit.as_str(), None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| Error::Provision(format!("Failed to start container: {}", e)))
    }

    async fn wait(&self, unit: &UnitId) -> Result<i64, Error> {
        let options = WaitContainerOptions {
            condition: "not-running",
        };
        let mut stream = self.docker.wait_container(unit.as_str(), Some(options));

        match stream.next().await {
            Some(Ok(response)) => Ok(response.status_code),
            // bollard reports a non-zero exit as an error carrying the code
            Some(Err(BollardError::DockerContainerWaitError { code, .. })) => Ok(code),
            Some(Err(e)) => Err(Error::Runtime(format!("Failed to wait for container: {}", e))),
            None => Err(Error::Runtime(
                "Container wait stream ended without a status".to_string(),
            )),
        }
    }

    async fn logs(&self, unit: &UnitId) -> Result<String, Error> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            follow: false,
            ..Default::default()
        };

        let mut stream = self.docker.logs(unit.as_str(), Some(options));
        let mut output = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|e| Error::Runtime(format!("Failed to read container logs: {}", e)))?;
            output.extend_from_slice(&chunk.into_bytes());
        }

        Ok(String::from_utf8_lossy(&output).into_owned())
    }

    async fn stop(&self, unit: &UnitId, grace: Duration) -> Result<(), Error> {
        let options = StopContainerOptions {
            t: stop_timeout_secs(grace),
        };
        match self.docker.stop_container(unit.as_str(), Some(options)).await {
            Ok(()) => Ok(()),
            // 304: already stopped
            Err(e) if status_code(&e) == Some(304) => Ok(()),
            Err(e) => Err(Error::Runtime(format!("Failed to stop container: {}", e))),
        }
    }

    async fn remove(&self, unit: &UnitId) -> Result<(), Error> {
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };
        match self.docker.remove_container(unit.as_str(), Some(options)).await {
            Ok(()) => Ok(()),
            // 404: already gone
            Err(e) if status_code(&e) == Some(404) => Ok(()),
            Err(e) => Err(Error::Runtime(format!("Failed to remove container: {}", e))),
        }
    }
}
