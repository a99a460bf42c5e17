#![allow(dead_code)]

use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use yap::error::{Result, YapError};
use yap::supervisor::{
    Listing, LogHandle, LogQuery, ProcessInfo, ProcessSpec, ProcessState, SilentOutcome, Supervisor,
    Target,
};

pub const MANIFEST: &str = r#"{
  "collection": "@nestjs/schematics",
  "monorepo": true,
  "projects": {
    "api": {"type": "application", "root": "apps/api", "sourceRoot": "apps/api/src", "entryFile": "main"},
    "worker": {"type": "application", "root": "apps/worker", "sourceRoot": "apps/worker/src"},
    "shared": {"type": "library", "root": "libs/shared", "sourceRoot": "libs/shared/src"}
  }
}"#;

/// A monorepo with two applications and one library.
pub fn monorepo() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::write(root.join("nest-cli.json"), MANIFEST).unwrap();
    fs::write(
        root.join("tsconfig.json"),
        r#"{"compilerOptions": {"baseUrl": "./", "paths": {"@libs/shared": ["libs/shared/src"]}}}"#,
    )
    .unwrap();
    for dir in ["apps/api/src", "apps/worker/src", "libs/shared/src"] {
        fs::create_dir_all(root.join(dir)).unwrap();
    }
    fs::write(root.join("apps/api/src/main.ts"), "import { x } from '@libs/shared';\n").unwrap();
    fs::write(root.join("apps/worker/src/main.ts"), "console.log('worker');\n").unwrap();
    fs::write(root.join("libs/shared/src/index.ts"), "export const x = 1;\n").unwrap();
    temp
}

/// Create the compiled entry `start` expects for `name`.
pub fn fake_dist_entry(root: &Path, name: &str) -> PathBuf {
    let entry = root.join("dist").join(name).join("apps").join(name).join("src/main.js");
    fs::create_dir_all(entry.parent().unwrap()).unwrap();
    fs::write(&entry, "module.exports = {};\n").unwrap();
    entry
}

#[derive(Default)]
struct State {
    entries: Vec<ProcessSpec>,
    calls: Vec<String>,
    failing: Vec<String>,
    listing_unreadable: bool,
}

/// In-memory supervisor recording every call.
#[derive(Clone, Default)]
pub struct FakeSupervisor {
    state: Arc<Mutex<State>>,
    stream_ends: bool,
}

impl FakeSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log streams end by themselves instead of running until terminated.
    pub fn with_ending_streams() -> Self {
        Self {
            stream_ends: true,
            ..Self::default()
        }
    }

    /// Stop and restart of `name` fail.
    pub fn fail_on(&self, name: &str) {
        self.state.lock().unwrap().failing.push(name.to_string());
    }

    /// The structured listing fails to parse, so `status` prints the text view.
    pub fn unreadable_listing(&self) {
        self.state.lock().unwrap().listing_unreadable = true;
    }

    pub fn entries(&self) -> Vec<ProcessSpec> {
        self.state.lock().unwrap().entries.clone()
    }

    pub fn entry(&self, name: &str) -> ProcessSpec {
        self.entries().into_iter().find(|e| e.name == name).unwrap()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn control(&self, action: &str, target: &Target) -> Result<()> {
        self.record(format!("{action} {target}"));
        let state = self.state.lock().unwrap();
        let known = match target {
            Target::All => true,
            Target::Name(name) => state.entries.iter().any(|e| &e.name == name),
        };
        if !known || state.failing.iter().any(|f| f == target.as_str()) {
            return Err(YapError::SupervisorCommandFailed {
                command: format!("pm2 {action} {target}"),
                code: Some(1),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Supervisor for FakeSupervisor {
    async fn start(&self, spec: &ProcessSpec) -> Result<()> {
        self.record(format!("start {}", spec.name));
        self.state.lock().unwrap().entries.push(spec.clone());
        Ok(())
    }

    async fn stop(&self, target: &Target) -> Result<()> {
        self.control("stop", target)
    }

    async fn restart(&self, target: &Target) -> Result<()> {
        self.control("restart", target)
    }

    async fn delete(&self, target: &Target) -> Result<()> {
        self.control("delete", target)?;
        let mut state = self.state.lock().unwrap();
        match target {
            Target::All => state.entries.clear(),
            Target::Name(name) => state.entries.retain(|e| &e.name != name),
        }
        Ok(())
    }

    async fn delete_silent(&self, name: &str) -> SilentOutcome {
        self.record(format!("delete_silent {name}"));
        let mut state = self.state.lock().unwrap();
        let before = state.entries.len();
        state.entries.retain(|e| e.name != name);
        if state.entries.len() < before {
            SilentOutcome::Deleted
        } else {
            SilentOutcome::Ignored
        }
    }

    async fn processes(&self) -> Result<Vec<ProcessInfo>> {
        let state = self.state.lock().unwrap();
        if state.listing_unreadable {
            return Err(YapError::Serialization(
                serde_json::from_str::<serde_json::Value>("[PM2] daemonized").unwrap_err(),
            ));
        }
        let list = state
            .entries
            .iter()
            .enumerate()
            .map(|(i, spec)| ProcessInfo {
                pm_id: i as u32,
                name: spec.name.clone(),
                status: "online".into(),
                state: ProcessState::Running,
                exec_mode: spec.exec_mode.as_str().into(),
                uptime_since: Some(0),
                restarts: 0,
                watch: spec.watch,
                cpu: 0.0,
                memory: 0,
            })
            .collect();
        Ok(list)
    }

    async fn status(&self) -> Result<Listing> {
        match self.processes().await {
            Ok(list) => Ok(Listing::Structured(list)),
            Err(_) => {
                self.record("list".to_string());
                Ok(Listing::Fallback)
            }
        }
    }

    async fn logs(&self, query: &LogQuery) -> Result<()> {
        self.record(format!("logs {} {}", query.target, query.lines));
        Ok(())
    }

    async fn open_logs(&self, query: &LogQuery) -> Result<Box<dyn LogHandle>> {
        self.record(format!("open_logs {} {}", query.target, query.lines));
        Ok(Box::new(FakeLogStream {
            supervisor: self.clone(),
            ends: self.stream_ends,
        }))
    }

    async fn flush(&self, target: &Target) -> Result<()> {
        self.record(format!("flush {target}"));
        Ok(())
    }
}

pub struct FakeLogStream {
    supervisor: FakeSupervisor,
    ends: bool,
}

#[async_trait]
impl LogHandle for FakeLogStream {
    async fn wait(&mut self) -> Result<Option<i32>> {
        if self.ends {
            Ok(Some(0))
        } else {
            std::future::pending().await
        }
    }

    async fn terminate(&mut self) {
        self.supervisor.record("terminate".to_string());
    }
}
