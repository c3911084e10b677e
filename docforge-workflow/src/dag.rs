use docforge_core::{OrchestratorError, Priority, TaskKey};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

use crate::catalog::TaskCatalog;

/// Directed acyclic graph of task dependencies with a precomputed,
/// priority-aware topological order.
#[derive(Debug, Clone)]
pub struct TaskDAG {
    keys: Vec<TaskKey>,
    index: HashMap<TaskKey, usize>,
    dependencies: Vec<Vec<usize>>,
    dependents: Vec<Vec<usize>>, // node -> nodes that depend on it
    order: Vec<usize>,
    rank: Vec<usize>, // node -> position in `order`
}

impl TaskDAG {
    /// Builds the graph and its execution order. Fails with
    /// [`OrchestratorError::CycleDetected`] if any task can never become ready.
    pub fn from_catalog(catalog: &TaskCatalog) -> Result<Self, OrchestratorError> {
        let keys: Vec<TaskKey> = catalog.keys().cloned().collect();
        let index: HashMap<TaskKey, usize> = keys
            .iter()
            .enumerate()
            .map(|(idx, key)| (key.clone(), idx))
            .collect();
        let priorities: Vec<Priority> = catalog.tasks().iter().map(|t| t.priority).collect();

        let mut dependencies = vec![Vec::new(); keys.len()];
        let mut dependents = vec![Vec::new(); keys.len()];
        for (node, task) in catalog.tasks().iter().enumerate() {
            for dep in &task.dependencies {
                if let Some(&dep_node) = index.get(dep) {
                    dependencies[node].push(dep_node);
                    dependents[dep_node].push(node);
                }
            }
        }

        let order = topological_sort(&priorities, &dependencies, &dependents).map_err(|stuck| {
            OrchestratorError::CycleDetected {
                keys: stuck.into_iter().map(|node| keys[node].clone()).collect(),
            }
        })?;

        let mut rank = vec![0; keys.len()];
        for (position, &node) in order.iter().enumerate() {
            rank[node] = position;
        }

        Ok(Self {
            keys,
            index,
            dependencies,
            dependents,
            order,
            rank,
        })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Total order in which every task follows all of its dependencies.
    pub fn execution_order(&self) -> Vec<&TaskKey> {
        self.order.iter().map(|&node| &self.keys[node]).collect()
    }

    pub fn order_index(&self, key: &str) -> Option<usize> {
        self.index.get(key).map(|&node| self.rank[node])
    }

    pub fn dependencies_of(&self, key: &str) -> Vec<&TaskKey> {
        self.nodes_of(key, &self.dependencies)
    }

    pub fn dependents_of(&self, key: &str) -> Vec<&TaskKey> {
        self.nodes_of(key, &self.dependents)
    }

    fn nodes_of<'a>(&'a self, key: &str, edges: &'a [Vec<usize>]) -> Vec<&'a TaskKey> {
        self.index
            .get(key)
            .map(|&node| edges[node].iter().map(|&n| &self.keys[n]).collect())
            .unwrap_or_default()
    }

    /// Every task reachable through dependent edges, in execution order.
    pub fn transitive_dependents(&self, key: &str) -> Vec<&TaskKey> {
        let Some(&start) = self.index.get(key) else {
            return vec![];
        };

        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            for &dependent in &self.dependents[node] {
                if visited.insert(dependent) {
                    queue.push_back(dependent);
                }
            }
        }

        let mut reached: Vec<usize> = visited.into_iter().collect();
        reached.sort_by_key(|&node| self.rank[node]);
        reached.into_iter().map(|node| &self.keys[node]).collect()
    }

    /// Tasks not yet terminal whose dependencies all are, in execution order.
    pub fn ready(&self, terminal: &HashSet<TaskKey>) -> Vec<&TaskKey> {
        self.order
            .iter()
            .filter(|&&node| {
                !terminal.contains(&self.keys[node])
                    && self.dependencies[node]
                        .iter()
                        .all(|&dep| terminal.contains(&self.keys[dep]))
            })
            .map(|&node| &self.keys[node])
            .collect()
    }
}

/// Kahn's algorithm with a min-heap keyed on `(priority, declaration position)`.
///
/// On a cycle, returns the nodes whose in-degree never reached zero.
fn topological_sort(
    priorities: &[Priority],
    dependencies: &[Vec<usize>],
    dependents: &[Vec<usize>],
) -> Result<Vec<usize>, Vec<usize>> {
    let mut in_degree: Vec<usize> = dependencies.iter().map(Vec::len).collect();
    let mut ready: BinaryHeap<Reverse<(Priority, usize)>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &degree)| degree == 0)
        .map(|(node, _)| Reverse((priorities[node], node)))
        .collect();

    let mut order = Vec::with_capacity(priorities.len());
    while let Some(Reverse((_, node))) = ready.pop() {
        order.push(node);
        for &dependent in &dependents[node] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.push(Reverse((priorities[dependent], dependent)));
            }
        }
    }

    if order.len() != priorities.len() {
        let stuck = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &degree)| degree > 0)
            .map(|(node, _)| node)
            .collect();
        return Err(stuck);
    }

    Ok(order)
}
