//! Static file servers for the dev and prod workflows.
//!
//! Each server runs on its own background thread with a current-thread
//! tokio runtime; the thread handle is adopted by the [`Context`] so the
//! CLI keeps the process alive after the task sequence finishes.

use std::net::SocketAddr;
use std::thread;

use axum::Router;
use console::style;
use tower_http::services::{ServeDir, ServeFile};
use tracing::info;

use crate::Context;
use crate::config::{DEV_PORT, PROD_PORT};

/// Serve the source tree (plus the temporary tree and the project root)
/// with live reload, falling back to the source entry point for
/// unmatched routes.
pub fn dev(cx: &Context) -> anyhow::Result<()> {
    // The reload broadcaster starts with the server so that watched
    // rebuilds have somewhere to push notifications.
    cx.live_reload()?;

    let sources = &cx.sources;
    let service = ServeDir::new(&sources.src).fallback(
        ServeDir::new(&sources.tmp).fallback(
            ServeDir::new(&sources.root)
                .fallback(ServeFile::new(sources.src.join("index.html"))),
        ),
    );

    let router = Router::new().fallback_service(service);
    cx.adopt(spawn_server("dev", DEV_PORT, router));
    Ok(())
}

/// Serve only the output tree, no reload.
pub fn prod(cx: &Context) -> anyhow::Result<()> {
    let dist = &cx.sources.dist;
    let service = ServeDir::new(dist).fallback(ServeFile::new(dist.join("index.html")));

    let router = Router::new().fallback_service(service);
    cx.adopt(spawn_server("prod", PROD_PORT, router));
    Ok(())
}

fn spawn_server(label: &'static str, port: u16, router: Router) -> thread::JoinHandle<()> {
    let url = style(format!("http://0.0.0.0:{port}/")).yellow();
    info!(server = label, %url, "starting a HTTP server");

    thread::spawn(move || {
        let result = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(anyhow::Error::from)
            .and_then(|rt| rt.block_on(serve(port, router)));

        if let Err(e) = result {
            tracing::error!("{label} server terminated: {e}");
        }
    })
}

async fn serve(port: u16, router: Router) -> anyhow::Result<()> {
    let address = SocketAddr::from(([0, 0, 0, 0], port));
    let address = tokio::net::TcpListener::bind(address).await?;

    axum::serve(address, router).await?;

    Ok(())
}
