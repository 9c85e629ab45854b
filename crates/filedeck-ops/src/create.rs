//! File and directory creation.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use filedeck_core::{EngineError, OperationKind, Process, Result};

use crate::engine::OpsContext;
use crate::naming::{resolve_collision_free_name, validate_filename};
use crate::tracker::{run_blocking, ProcessTracker};

/// What a create request asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CreateRequest {
    pub name: String,
    pub directory: bool,
}

impl CreateRequest {
    /// Parse a user-entered name. A trailing `/` requests a directory.
    pub fn parse(input: &str) -> Result<Self> {
        let (name, directory) = match input.strip_suffix('/') {
            Some(name) => (name, true),
            None => (input, false),
        };
        validate_filename(name)?;
        Ok(Self {
            name: name.to_string(),
            directory,
        })
    }
}

/// Create the requested entry inside `dir` and return the finished process.
pub(crate) async fn create_entry(ctx: &Arc<OpsContext>, dir: &Path, request: CreateRequest) -> Process {
    let target = resolve_collision_free_name(&dir.join(&request.name));
    let tracker = ProcessTracker::start(ctx, OperationKind::Create, &target, 1).await;

    let result = {
        let target = target.clone();
        run_blocking(move || make_entry(&target, request.directory)).await
    };

    match result {
        Ok(()) => {
            tracker.ticker().advance(&target, 1);
            tracker.succeed().await
        }
        Err(e) => tracker.fail(&target, &e).await,
    }
}

fn make_entry(target: &Path, directory: bool) -> Result<()> {
    if directory {
        return fs::create_dir(target).map_err(|e| EngineError::io(target, e));
    }
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)
        .map(|_| ())
        .map_err(|e| EngineError::io(target, e))
}
