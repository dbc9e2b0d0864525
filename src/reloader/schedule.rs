//! Topological reload scheduling
//!
//! Depth-first traversal from the directly imported modules. A module reloads
//! if it changed itself or if one of its dependencies reloads; it is scheduled
//! after all of its dependencies. Edges into the current traversal path are
//! ignored, which breaks cycles in favor of whichever module the traversal
//! reached first.

/// Read-only view of a dependency graph for scheduling.
pub trait DependencyGraph {
    fn node_count(&self) -> usize;

    fn node_name(&self, node: usize) -> &str;

    /// Possibly-referenced dependency identifiers of `node`, in source order.
    fn dependencies(&self, node: usize) -> &[String];

    /// Node tracked under `name`, if any.
    fn lookup(&self, name: &str) -> Option<usize>;

    /// Traversal roots: directly imported modules.
    fn is_root(&self, node: usize) -> bool;

    /// The node itself needs a reload.
    fn is_pending(&self, node: usize) -> bool;

    /// Unavailable nodes (no source file right now) never reload and never
    /// propagate reloads.
    fn is_available(&self, node: usize) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMark {
    #[default]
    Unvisited,
    /// On the current depth-first path
    InProgress,
    /// Done, will not reload
    Keep,
    /// Done, will reload
    Reload,
}

/// One scheduled reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledReload {
    pub node: usize,
    /// Dependencies already scheduled earlier in the same pass
    pub after: Vec<String>,
}

struct Frame {
    node: usize,
    next_dependency: usize,
    after: Vec<String>,
}

impl Frame {
    fn new(node: usize) -> Self {
        Self {
            node,
            next_dependency: 0,
            after: Vec::new(),
        }
    }

    fn note_reloaded(&mut self, name: &str) {
        if !self.after.iter().any(|existing| existing == name) {
            self.after.push(name.to_string());
        }
    }
}

/// Reload order, dependencies before dependents. The traversal is iterative
/// so deep import chains cannot exhaust the stack.
pub fn schedule<G: DependencyGraph + ?Sized>(graph: &G) -> Vec<ScheduledReload> {
    let count = graph.node_count();
    let mut marks: Vec<SyncMark> = (0..count)
        .map(|node| {
            if graph.is_available(node) {
                SyncMark::Unvisited
            } else {
                SyncMark::Keep
            }
        })
        .collect();

    let mut plan = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();

    for root in 0..count {
        if marks[root] != SyncMark::Unvisited || !graph.is_root(root) {
            continue;
        }

        marks[root] = SyncMark::InProgress;
        stack.push(Frame::new(root));

        while let Some(frame) = stack.last_mut() {
            let dependencies = graph.dependencies(frame.node);

            if frame.next_dependency < dependencies.len() {
                let name = &dependencies[frame.next_dependency];
                frame.next_dependency += 1;

                let Some(dependency) = graph.lookup(name) else {
                    continue;
                };
                match marks[dependency] {
                    SyncMark::Unvisited => {
                        marks[dependency] = SyncMark::InProgress;
                        stack.push(Frame::new(dependency));
                    }
                    SyncMark::Reload => frame.note_reloaded(name),
                    SyncMark::InProgress | SyncMark::Keep => {}
                }
                continue;
            }

            let Some(done) = stack.pop() else {
                break;
            };
            if done.after.is_empty() && !graph.is_pending(done.node) {
                marks[done.node] = SyncMark::Keep;
                continue;
            }

            marks[done.node] = SyncMark::Reload;
            if let Some(parent) = stack.last_mut() {
                parent.note_reloaded(graph.node_name(done.node));
            }
            plan.push(ScheduledReload {
                node: done.node,
                after: done.after,
            });
        }
    }

    plan
}
