//! The reference pipeline: every task of the build wired by name.
//!
//! Declared prerequisite lists execute strictly in order, so `build` is a
//! linear sequence and `run:prod` reuses the whole `build` chain through
//! memoization.

use console::style;

use crate::error::GraphError;
use crate::graph::TaskGraph;
use crate::{serve, task, watch};

/// The full task graph of the build tool.
pub fn default_graph() -> TaskGraph {
    let mut graph = TaskGraph::new();
    register(&mut graph).expect("default task names are unique");
    graph
}

fn register(graph: &mut TaskGraph) -> Result<(), GraphError> {
    graph.register("clean", &[], task::clean::clean)?;
    graph.register("fileinclude", &[], task::include::expand_pages)?;
    graph.register("htmlhint", &["fileinclude"], task::lint::lint)?;
    graph.register("sass", &[], task::styles::compile)?;
    graph.register("script", &[], task::scripts::passthrough)?;
    graph.register("minify", &[], task::minify::minify)?;
    graph.register("imagemin", &[], task::images::optimize)?;
    graph.register("copy:fonts", &[], task::fonts::copy)?;
    graph.register("prettify", &["copy:fonts"], task::prettify::prettify)?;

    graph.register("connect:dev", &[], serve::dev)?;
    graph.register("connect:prod", &[], serve::prod)?;
    graph.register("stream", &[], watch::stream)?;

    graph.register(
        "build",
        &[
            "clean",
            "fileinclude",
            "htmlhint",
            "sass",
            "minify",
            "imagemin",
            "copy:fonts",
            "prettify",
        ],
        |_| {
            eprintln!("{}", style("Success!").green());
            Ok(())
        },
    )?;

    graph.register(
        "run:dev",
        &["clean", "connect:dev", "fileinclude", "sass", "stream"],
        |_| {
            eprintln!("{}", style("Development version is running...").green());
            Ok(())
        },
    )?;

    graph.register("run:prod", &["build", "connect:prod"], |_| {
        eprintln!("{}", style("Production version is running...").green());
        Ok(())
    })?;

    Ok(())
}
