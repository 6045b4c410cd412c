//! In-process [`ContainerRuntime`] implementations used by the tests

use crate::{ContainerRuntime, Error, UnitId, UnitSpec};
use async_trait::async_trait;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::{process::Command, sync::watch, task::AbortHandle, time};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Create,
    Start,
    Wait,
    Logs,
    Stop,
    Remove,
}

#[derive(Debug, Clone)]
enum Script {
    Exit {
        after: Duration,
        code: i64,
        output: String,
    },
    Hang,
    FailCreate,
    FailStart,
    FailWait,
}

/// Runtime whose units follow a fixed script and record every call
pub struct ScriptedRuntime {
    script: Script,
    fail_remove: bool,
    calls: Mutex<Vec<Call>>,
    specs: Mutex<Vec<UnitSpec>>,
}

impl ScriptedRuntime {
    fn with_script(script: Script) -> Self {
        Self {
            script,
            fail_remove: false,
            calls: Mutex::new(Vec::new()),
            specs: Mutex::new(Vec::new()),
        }
    }

    pub fn exiting(after: Duration, code: i64, output: &str) -> Self {
        Self::with_script(Script::Exit {
            after,
            code,
            output: output.to_string(),
        })
    }

    pub fn hanging() -> Self {
        Self::with_script(Script::Hang)
    }

    pub fn failing_create() -> Self {
        Self::with_script(Script::FailCreate)
    }

    pub fn failing_start() -> Self {
        Self::with_script(Script::FailStart)
    }

    pub fn failing_wait() -> Self {
        Self::with_script(Script::FailWait)
    }

    pub fn with_failing_remove(mut self) -> Self {
        self.fail_remove = true;
        self
    }

    pub fn count(&self, call: Call) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == call).count()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn specs(&self) -> Vec<UnitSpec> {
        self.specs.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ContainerRuntime for ScriptedRuntime {
    async fn create(&self, spec: &UnitSpec) -> Result<UnitId, Error> {
        self.record(Call::Create);
        if matches!(self.script, Script::FailCreate) {
            return Err(Error::Provision("no such image".to_string()));
        }
        self.specs.lock().unwrap().push(spec.clone());
        Ok(UnitId::new(spec.name.clone()))
    }

    async fn start(&self, _unit: &UnitId) -> Result<(), Error> {
        self.record(Call::Start);
        if matches!(self.script, Script::FailStart) {
            return Err(Error::Provision("cannot start".to_string()));
        }
        Ok(())
    }

    async fn wait(&self, _unit: &UnitId) -> Result<i64, Error> {
        self.record(Call::Wait);
        match &self.script {
            Script::Exit { after, code, .. } => {
                time::sleep(*after).await;
                Ok(*code)
            }
            Script::FailWait => Err(Error::Runtime("daemon went away".to_string())),
            _ => std::future::pending().await,
        }
    }

    async fn logs(&self, _unit: &UnitId) -> Result<String, Error> {
        self.record(Call::Logs);
        match &self.script {
            Script::Exit { output, .. } => Ok(output.clone()),
            _ => Ok(String::new()),
        }
    }

    async fn stop(&self, _unit: &UnitId, _grace: Duration) -> Result<(), Error> {
        self.record(Call::Stop);
        Ok(())
    }

    async fn remove(&self, _unit: &UnitId) -> Result<(), Error> {
        self.record(Call::Remove);
        if self.fail_remove {
            return Err(Error::Runtime("removal refused".to_string()));
        }
        Ok(())
    }
}

type Exit = Option<(i64, String)>;

struct LocalUnit {
    spec: UnitSpec,
    done: Option<watch::Receiver<Exit>>,
    abort: Option<AbortHandle>,
}

/// Runs the unit command as a host process inside the bound directory.
/// The image is ignored, so only host tools such as `bash` are available.
#[derive(Default)]
pub struct LocalProcessRuntime {
    units: Mutex<HashMap<UnitId, LocalUnit>>,
    next_id: AtomicUsize,
}

impl LocalProcessRuntime {
    pub fn live_units(&self) -> usize {
        self.units.lock().unwrap().len()
    }
}

#[async_trait]
impl ContainerRuntime for LocalProcessRuntime {
    async fn create(&self, spec: &UnitSpec) -> Result<UnitId, Error> {
        let id = UnitId::new(format!(
            "local-{}",
            self.next_id.fetch_add(1, Ordering::SeqCst)
        ));
        self.units.lock().unwrap().insert(
            id.clone(),
            LocalUnit {
                spec: spec.clone(),
                done: None,
                abort: None,
            },
        );
        Ok(id)
    }

    async fn start(&self, unit: &UnitId) -> Result<(), Error> {
        let mut units = self.units.lock().unwrap();
        let local = units
            .get_mut(unit)
            .ok_or_else(|| Error::Provision(format!("unknown unit {}", unit)))?;

        let child = Command::new(&local.spec.command[0])
            .args(&local.spec.command[1..])
            .current_dir(&local.spec.bind.host_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Provision(format!("Failed to spawn process: {}", e)))?;

        let (tx, rx) = watch::channel(None);
        let task = tokio::spawn(async move {
            if let Ok(output) = child.wait_with_output().await {
                let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
                text.push_str(&String::from_utf8_lossy(&output.stderr));
                let code = output.status.code().unwrap_or(-1) as i64;
                let _ = tx.send(Some((code, text)));
            }
        });

        local.done = Some(rx);
        local.abort = Some(task.abort_handle());
        Ok(())
    }

    async fn wait(&self, unit: &UnitId) -> Result<i64, Error> {
        let mut done = self
            .units
            .lock()
            .unwrap()
            .get(unit)
            .and_then(|local| local.done.clone())
            .ok_or_else(|| Error::Runtime(format!("unit {} was never started", unit)))?;

        let exit = done
            .wait_for(|exit| exit.is_some())
            .await
            .map_err(|_| Error::Runtime(format!("unit {} was killed", unit)))?;
        Ok((*exit).as_ref().map(|(code, _)| *code).unwrap_or(-1))
    }

    async fn logs(&self, unit: &UnitId) -> Result<String, Error> {
        let units = self.units.lock().unwrap();
        let local = units
            .get(unit)
            .ok_or_else(|| Error::Runtime(format!("unknown unit {}", unit)))?;
        Ok(local
            .done
            .as_ref()
            .and_then(|done| (*done.borrow()).as_ref().map(|(_, text)| text.clone()))
            .unwrap_or_default())
    }

    async fn stop(&self, unit: &UnitId, _grace: Duration) -> Result<(), Error> {
        if let Some(local) = self.units.lock().unwrap().get_mut(unit) {
            if let Some(abort) = local.abort.take() {
                abort.abort();
            }
        }
        Ok(())
    }

    async fn remove(&self, unit: &UnitId) -> Result<(), Error> {
        if let Some(local) = self.units.lock().unwrap().remove(unit) {
            if let Some(abort) = local.abort {
                abort.abort();
            }
        }
        Ok(())
    }
}
