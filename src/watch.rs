//! Live reload and file watching.
//!
//! The reload side is a websocket broadcaster: one thread accepts
//! incoming connections from open browser tabs, another pushes a
//! `"reload"` message to every client whenever a task signals a change.
//! The watcher observes the source tree through a debounced notify
//! watcher and re-runs the matching task for each kind of change.

use std::net::{TcpListener, TcpStream};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use glob::Pattern;
use notify::{EventKind, RecursiveMode};
use notify_debouncer_full::new_debouncer;
use tungstenite::WebSocket;

use crate::config::RELOAD_PORT;
use crate::{Context, Sources, task};

/// Handle for pushing reload notifications to connected clients.
#[derive(Clone)]
pub struct LiveReload {
    tx: Sender<()>,
}

impl LiveReload {
    /// Bind the websocket port and spawn the accept and broadcast
    /// threads. Falls back to an ephemeral port when the well-known one
    /// is taken.
    pub fn start() -> std::io::Result<(Self, Vec<JoinHandle<()>>)> {
        let listener = match TcpListener::bind(("0.0.0.0", RELOAD_PORT)) {
            Ok(sock) => sock,
            Err(e) => {
                tracing::warn!("port {RELOAD_PORT} unavailable ({e}), using an ephemeral port");
                TcpListener::bind(("0.0.0.0", 0))?
            }
        };

        let port = listener.local_addr()?.port();
        tracing::info!(port, "live reload websocket listening");

        let clients = Arc::new(Mutex::new(Vec::new()));
        let thread_i = new_thread_ws_incoming(listener, clients.clone());
        let (tx, thread_o) = new_thread_ws_reload(clients);

        Ok((Self { tx }, vec![thread_i, thread_o]))
    }

    /// Notify every connected client. A missing broadcast thread is not
    /// an error; the notification is simply dropped.
    pub fn notify(&self) {
        let _ = self.tx.send(());
    }
}

/// Watch the source tree and re-run the matching task on change: pages
/// re-expand, stylesheets re-compile, scripts push a reload, and raw CSS
/// edits push a reload directly.
pub fn stream(cx: &Context) -> anyhow::Result<()> {
    let live = cx.live_reload()?.clone();
    let sources = cx.sources.clone();

    let handle = std::thread::spawn(move || {
        if let Err(e) = watch_loop(sources, live) {
            tracing::error!("watcher stopped: {e}");
        }
    });

    cx.adopt(handle);
    Ok(())
}

fn watch_loop(sources: Sources, live: LiveReload) -> anyhow::Result<()> {
    // Patterns are matched against absolute event paths.
    let src = sources.src.canonicalize_utf8()?;
    let p_pages = Pattern::new(src.join("views/**/*.html").as_str())?;
    let p_styles = Pattern::new(src.join("styles/**/*.scss").as_str())?;
    let p_scripts = Pattern::new(src.join("scripts/**/*.js").as_str())?;
    let p_css = Pattern::new("**/*.css")?;

    let cx = Context::with_reload(sources, live.clone());

    let (tx, rx) = std::sync::mpsc::channel();
    let mut debouncer = new_debouncer(Duration::from_millis(250), None, tx)?;
    debouncer.watch(src.as_std_path(), RecursiveMode::Recursive)?;

    tracing::info!(root = %src, "watching for changes");

    while let Ok(result) = rx.recv() {
        match result {
            Ok(events) => {
                let mut pages = false;
                let mut styles = false;
                let mut scripts = false;
                let mut css = false;

                let changes = events.iter().filter(|de| {
                    matches!(
                        de.event.kind,
                        EventKind::Create(..) | EventKind::Modify(..) | EventKind::Remove(..)
                    )
                });

                for change in changes {
                    for path in &change.event.paths {
                        pages |= p_pages.matches_path(path);
                        styles |= p_styles.matches_path(path);
                        scripts |= p_scripts.matches_path(path);
                        css |= p_css.matches_path(path);
                    }
                }

                if pages {
                    log_failure("fileinclude", task::include::expand_pages(&cx));
                }
                if styles {
                    log_failure("sass", task::styles::compile(&cx));
                }
                if scripts {
                    log_failure("script", task::scripts::passthrough(&cx));
                }
                if css {
                    live.notify();
                }
            }
            Err(errors) => {
                for e in errors {
                    tracing::error!("watch error: {e}");
                }
            }
        }
    }

    Ok(())
}

/// A failed re-run keeps the watcher alive; the next save retries.
fn log_failure(name: &str, result: anyhow::Result<()>) {
    if let Err(e) = result {
        tracing::error!("{name} failed on change: {e:#}");
    }
}

fn new_thread_ws_incoming(
    server: TcpListener,
    client: Arc<Mutex<Vec<WebSocket<TcpStream>>>>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for stream in server.incoming() {
            let Ok(stream) = stream else { continue };
            match tungstenite::accept(stream) {
                Ok(socket) => client.lock().unwrap().push(socket),
                Err(e) => tracing::error!("websocket handshake failed: {e}"),
            }
        }
    })
}

fn new_thread_ws_reload(
    client: Arc<Mutex<Vec<WebSocket<TcpStream>>>>,
) -> (Sender<()>, JoinHandle<()>) {
    let (tx, rx) = std::sync::mpsc::channel();

    let thread = std::thread::spawn(move || {
        while rx.recv().is_ok() {
            let mut clients = client.lock().unwrap();
            let mut broken = vec![];

            for (i, socket) in clients.iter_mut().enumerate() {
                match socket.send("reload".into()) {
                    Ok(_) => {}
                    Err(tungstenite::error::Error::Io(e)) => {
                        if e.kind() == std::io::ErrorKind::BrokenPipe {
                            broken.push(i);
                        }
                    }
                    Err(e) => {
                        tracing::error!("websocket send failed: {e:?}");
                    }
                }
            }

            for i in broken.into_iter().rev() {
                clients.remove(i);
            }

            // Close all but the last 10 connections
            let len = clients.len();
            if len > 10 {
                for mut socket in clients.drain(0..len - 10) {
                    socket.close(None).ok();
                }
            }
        }
    });

    (tx, thread)
}
