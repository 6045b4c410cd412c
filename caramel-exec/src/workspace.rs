use crate::{
    error::Error,
    languages::{render_launcher, LanguageProfile, INPUT_FILE, LAUNCHER_FILE},
    types::ExecutionRequest,
};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

#[cfg(unix)]
const WORKSPACE_DIR_MODE: u32 = 0o777;
#[cfg(unix)]
const LAUNCHER_MODE: u32 = 0o755;

/// Per-request scratch directory holding the source, stdin and launcher.
///
/// A workspace is owned by exactly one request. [`Workspace::teardown`]
/// removes it; if a workspace is dropped without being torn down (a panic
/// mid-pipeline, for instance) the directory is removed on drop instead.
#[derive(Debug)]
pub struct Workspace {
    id: String,
    root_dir: PathBuf,
    source_file: String,
    torn_down: bool,
}

impl Workspace {
    /// Create a fresh workspace under `scratch_root` and write the request's
    /// files into it.
    ///
    /// Fails if the directory already exists. Anything written before a
    /// failure is removed again before the error is returned.
    pub async fn stage(
        scratch_root: &Path,
        profile: &LanguageProfile,
        request: &ExecutionRequest,
    ) -> Result<Self, Error> {
        let id = Uuid::new_v4().simple().to_string();
        Self::stage_with_id(scratch_root, id, profile, request).await
    }

    pub(crate) async fn stage_with_id(
        scratch_root: &Path,
        id: String,
        profile: &LanguageProfile,
        request: &ExecutionRequest,
    ) -> Result<Self, Error> {
        let root_dir = scratch_root.join(&id);

        fs::create_dir(&root_dir).await.map_err(|e| {
            Error::Workspace(format!(
                "Failed to create workspace {}: {}",
                root_dir.display(),
                e
            ))
        })?;

        let workspace = Workspace {
            id,
            root_dir,
            source_file: profile.source_file.clone(),
            torn_down: false,
        };

        if let Err(e) = workspace.populate(profile, request).await {
            if let Err(cleanup) = workspace.teardown().await {
                warn!("Failed to clean up partial workspace: {}", cleanup);
            }
            return Err(e);
        }

        debug!("Staged workspace at {}", workspace.root_dir.display());
        Ok(workspace)
    }

    async fn populate(
        &self,
        profile: &LanguageProfile,
        request: &ExecutionRequest,
    ) -> Result<(), Error> {
        #[cfg(unix)]
        set_mode(&self.root_dir, WORKSPACE_DIR_MODE).await?;

        write_file(&self.source_path(), request.code.as_bytes()).await?;
        write_file(&self.input_path(), request.input.as_bytes()).await?;
        write_file(&self.launcher_path(), render_launcher(profile).as_bytes()).await?;

        #[cfg(unix)]
        set_mode(&self.launcher_path(), LAUNCHER_MODE).await?;

        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn source_path(&self) -> PathBuf {
        self.root_dir.join(&self.source_file)
    }

    pub fn input_path(&self) -> PathBuf {
        self.root_dir.join(INPUT_FILE)
    }

    pub fn launcher_path(&self) -> PathBuf {
        self.root_dir.join(LAUNCHER_FILE)
    }

    /// Recursively remove the workspace directory
    pub async fn teardown(mut self) -> Result<(), Error> {
        self.torn_down = true;
        fs::remove_dir_all(&self.root_dir).await.map_err(|e| {
            Error::Workspace(format!(
                "Failed to remove workspace {}: {}",
                self.root_dir.display(),
                e
            ))
        })?;
        debug!("Removed workspace {}", self.root_dir.display());
        Ok(())
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.torn_down {
            return;
        }
        warn!("Workspace {} dropped without teardown", self.id);
        if let Err(e) = std::fs::remove_dir_all(&self.root_dir) {
            warn!("Failed to clean up workspace directory: {}", e);
        }
    }
}

async fn write_file(path: &Path, contents: &[u8]) -> Result<(), Error> {
    fs::write(path, contents)
        .await
        .map_err(|e| Error::Workspace(format!("Failed to write {}: {}", path.display(), e)))
}

#[cfg(unix)]
async fn set_mode(path: &Path, mode: u32) -> Result<(), Error> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .await
        .map_err(|e| {
            Error::Workspace(format!(
                "Failed to set permissions on {}: {}",
                path.display(),
                e
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::LanguageTable;
    use assert_fs::prelude::*;
    use predicates::prelude::*;

    fn bash_request(code: &str, input: &str) -> ExecutionRequest {
        ExecutionRequest::new("Bash", code, input)
    }

    #[tokio::test]
    async fn test_stage_writes_all_files() {
        let scratch = assert_fs::TempDir::new().unwrap();
        let table = LanguageTable::builtin();
        let profile = table.resolve("Bash").unwrap();

        let workspace = Workspace::stage(scratch.path(), profile, &bash_request("echo hi", "hello"))
            .await
            .unwrap();

        let dir = scratch.child(workspace.id());
        dir.child("main.sh").assert("echo hi");
        dir.child("input").assert("hello");
        dir.child("launcher")
            .assert(predicate::str::contains("exec bash main.sh < input"));
        assert_eq!(workspace.root_dir(), dir.path());

        workspace.teardown().await.unwrap();
        dir.assert(predicate::path::missing());
    }

    #[tokio::test]
    async fn test_stdin_is_written_verbatim() {
        let scratch = assert_fs::TempDir::new().unwrap();
        let table = LanguageTable::builtin();
        let input = "line one\n  line two with 'quotes' and $vars\n\n";

        let workspace = Workspace::stage(
            scratch.path(),
            table.resolve("Python3").unwrap(),
            &ExecutionRequest::new("Python3", "print(input())", input),
        )
        .await
        .unwrap();

        assert_eq!(std::fs::read_to_string(workspace.input_path()).unwrap(), input);
        workspace.teardown().await.unwrap();
    }

    #[tokio::test]
    async fn test_workspace_ids_are_unique() {
        let scratch = assert_fs::TempDir::new().unwrap();
        let table = LanguageTable::builtin();
        let profile = table.resolve("Bash").unwrap();

        let mut workspaces = Vec::new();
        for _ in 0..16 {
            workspaces.push(
                Workspace::stage(scratch.path(), profile, &bash_request("true", ""))
                    .await
                    .unwrap(),
            );
        }
        let mut ids: Vec<&str> = workspaces.iter().map(|w| w.id()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 16);

        for workspace in workspaces {
            workspace.teardown().await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_missing_scratch_root_fails_fast() {
        let scratch = assert_fs::TempDir::new().unwrap();
        let table = LanguageTable::builtin();
        let result = Workspace::stage(
            &scratch.path().join("does-not-exist"),
            table.resolve("Bash").unwrap(),
            &bash_request("true", ""),
        )
        .await;
        assert!(matches!(result, Err(Error::Workspace(_))));
    }

    #[tokio::test]
    async fn test_existing_workspace_dir_is_not_reused() {
        let scratch = assert_fs::TempDir::new().unwrap();
        let table = LanguageTable::builtin();
        let taken = scratch.child("0123456789abcdef0123456789abcdef");
        taken.create_dir_all().unwrap();
        taken.child("main.sh").write_str("echo earlier").unwrap();

        let result = Workspace::stage_with_id(
            scratch.path(),
            "0123456789abcdef0123456789abcdef".to_string(),
            table.resolve("Bash").unwrap(),
            &bash_request("echo later", "stdin"),
        )
        .await;

        assert!(matches!(result, Err(Error::Workspace(_))));
        taken.child("main.sh").assert("echo earlier");
        taken.child("input").assert(predicate::path::missing());
        taken.child("launcher").assert(predicate::path::missing());
    }

    #[tokio::test]
    async fn test_dropped_workspace_is_removed() {
        let scratch = assert_fs::TempDir::new().unwrap();
        let table = LanguageTable::builtin();
        let workspace = Workspace::stage(
            scratch.path(),
            table.resolve("Bash").unwrap(),
            &bash_request("true", ""),
        )
        .await
        .unwrap();
        let dir = workspace.root_dir().to_path_buf();
        drop(workspace);
        assert!(!dir.exists());
    }
}
