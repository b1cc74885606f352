//! The task graph.
//!
//! Tasks are registered once, by name, with an ordered list of prerequisite
//! task names and an action. Running a task resolves its transitive
//! prerequisite chain depth-first, in declared order, executing each
//! distinct task at most once per run. There is no parallelism between
//! tasks; declared order is the execution order.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use petgraph::algo::toposort;
use petgraph::graph::DiGraph;

use crate::Context;
use crate::error::GraphError;

type Action = Box<dyn Fn(&Context) -> anyhow::Result<()> + Send + Sync>;

struct Task {
    name: String,
    deps: Vec<String>,
    action: Action,
}

/// An explicit, immutable-after-registration collection of named tasks.
///
/// Constructed once at startup and passed by reference to the runner; there
/// is no process-wide registry.
#[derive(Default)]
pub struct TaskGraph {
    tasks: Vec<Task>,
    index: HashMap<String, usize>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named task with its prerequisites, in execution order.
    pub fn register<F>(&mut self, name: &str, deps: &[&str], action: F) -> Result<(), GraphError>
    where
        F: Fn(&Context) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        if self.index.contains_key(name) {
            return Err(GraphError::DuplicateTask(name.to_string()));
        }

        self.index.insert(name.to_string(), self.tasks.len());
        self.tasks.push(Task {
            name: name.to_string(),
            deps: deps.iter().map(|dep| dep.to_string()).collect(),
            action: Box::new(action),
        });

        Ok(())
    }

    /// Names of every registered task.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|task| task.name.as_str())
    }

    /// Run the named task and its full transitive prerequisite chain.
    ///
    /// Prerequisites execute strictly sequentially, left to right, each
    /// distinct task at most once. The first failing action aborts the
    /// remaining sequence.
    pub fn run(&self, name: &str, cx: &Context) -> Result<(), GraphError> {
        let root = *self
            .index
            .get(name)
            .ok_or_else(|| GraphError::UnknownTask(name.to_string()))?;

        self.check(root)?;

        let mut done = HashSet::new();
        self.run_inner(root, cx, &mut done)
    }

    fn run_inner(&self, id: usize, cx: &Context, done: &mut HashSet<usize>) -> Result<(), GraphError> {
        if !done.insert(id) {
            return Ok(());
        }

        let task = &self.tasks[id];
        for dep in &task.deps {
            // Resolution is guaranteed by `check`.
            let dep_id = self.index[dep.as_str()];
            self.run_inner(dep_id, cx, done)?;
        }

        let s = Instant::now();
        tracing::info!(task = %task.name, "starting");

        (task.action)(cx).map_err(|e| GraphError::TaskFailed(task.name.clone(), e))?;

        tracing::debug!(task = %task.name, elapsed = ?s.elapsed(), "finished");
        Ok(())
    }

    /// Verify that every prerequisite reachable from `root` resolves to a
    /// registered task and that the reachable subgraph is acyclic.
    fn check(&self, root: usize) -> Result<(), GraphError> {
        let mut reachable = HashSet::from([root]);
        let mut stack = vec![root];

        while let Some(id) = stack.pop() {
            for dep in &self.tasks[id].deps {
                match self.index.get(dep.as_str()) {
                    Some(&dep_id) => {
                        if reachable.insert(dep_id) {
                            stack.push(dep_id);
                        }
                    }
                    None => {
                        return Err(GraphError::MissingDependency {
                            task: self.tasks[id].name.clone(),
                            dependency: dep.clone(),
                        });
                    }
                }
            }
        }

        // Toposort over the reachable subgraph to detect declared cycles.
        let mut graph = DiGraph::<usize, ()>::new();
        let mut nodes = HashMap::new();

        for &id in &reachable {
            nodes.insert(id, graph.add_node(id));
        }

        for &id in &reachable {
            for dep in &self.tasks[id].deps {
                let dep_id = self.index[dep.as_str()];
                graph.add_edge(nodes[&dep_id], nodes[&id], ());
            }
        }

        toposort(&graph, None).map_err(|cycle| {
            let id = graph[cycle.node_id()];
            GraphError::Cycle(self.tasks[id].name.clone())
        })?;

        Ok(())
    }
}
