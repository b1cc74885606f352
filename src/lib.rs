#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod config;
mod error;
mod graph;
mod html;
mod io;
pub mod pipeline;
mod serve;
pub mod task;
mod watch;

use std::sync::{Mutex, OnceLock};
use std::thread::JoinHandle;

use anyhow::Context as _;

pub use crate::config::Sources;
pub use crate::error::{GraphError, LintError, Violation};
pub use crate::graph::TaskGraph;
pub use crate::watch::LiveReload;

/// Shared state handed by reference to every task action: the directory
/// contract, the live-reload broadcaster (started on first use) and the
/// background threads spawned by server and watcher tasks.
pub struct Context {
    pub sources: Sources,
    reload: OnceLock<LiveReload>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl Context {
    pub fn new(sources: Sources) -> Self {
        Self {
            sources,
            reload: OnceLock::new(),
            threads: Mutex::new(Vec::new()),
        }
    }

    /// Context for a detached worker that already owns a broadcaster,
    /// such as the watcher thread.
    pub fn with_reload(sources: Sources, live: LiveReload) -> Self {
        let cx = Self::new(sources);
        let _ = cx.reload.set(live);
        cx
    }

    /// Push a live-reload notification. A no-op unless a broadcaster is
    /// running, so build-only workflows never touch the network.
    pub fn reload(&self) {
        if let Some(live) = self.reload.get() {
            live.notify();
        }
    }

    /// The reload broadcaster, started on first use.
    pub(crate) fn live_reload(&self) -> anyhow::Result<&LiveReload> {
        if self.reload.get().is_none() {
            let (live, threads) = LiveReload::start()?;
            let _ = self.reload.set(live);
            for handle in threads {
                self.adopt(handle);
            }
        }

        self.reload.get().context("live reload unavailable")
    }

    /// Record a background thread so the CLI can keep the process alive
    /// after the task sequence completes.
    pub(crate) fn adopt(&self, handle: JoinHandle<()>) {
        self.threads.lock().unwrap().push(handle);
    }

    /// Block on every adopted background thread (servers, websocket
    /// broadcaster, watcher). Returns immediately when none were started.
    pub fn join_background(&self) {
        let handles: Vec<_> = self.threads.lock().unwrap().drain(..).collect();
        for handle in handles {
            let _ = handle.join();
        }
    }
}
