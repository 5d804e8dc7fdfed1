//! Maven-style ASCII rendering of a dependency graph

use std::fmt;

use crate::graph::{DependencyGraph, DependencyNode, NodeId};

/// Display adapter returned by [`DependencyGraph::dump`]
pub struct GraphDump<'a> {
    graph: &'a DependencyGraph,
}

impl DependencyGraph {
    /// Render the reachable tree, one node per line:
    ///
    /// ```text
    /// org.example:app:jar:1.0
    /// +- org.example:a:jar:1.0 [compile]
    /// |  \- org.example:c:jar:1.5 [compile]
    /// \- org.example:b:jar:1.0 [runtime] (optional)
    /// ```
    pub fn dump(&self) -> GraphDump<'_> {
        GraphDump { graph: self }
    }
}

impl GraphDump<'_> {
    fn write_node(
        &self,
        f: &mut fmt::Formatter<'_>,
        id: NodeId,
        prefix: &str,
        last: bool,
    ) -> fmt::Result {
        let node = &self.graph[id];
        let connector = if last { "\\- " } else { "+- " };
        writeln!(f, "{}{}{}", prefix, connector, Label(node))?;

        let child_prefix = format!("{}{}", prefix, if last { "   " } else { "|  " });
        self.write_children(f, id, &child_prefix)
    }

    fn write_children(&self, f: &mut fmt::Formatter<'_>, id: NodeId, prefix: &str) -> fmt::Result {
        let children = self.graph.children(id);
        for (i, child) in children.iter().enumerate() {
            self.write_node(f, *child, prefix, i + 1 == children.len())?;
        }
        Ok(())
    }
}

impl fmt::Display for GraphDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let root = self.graph.root();
        writeln!(f, "{}", Label(&self.graph[root]))?;
        self.write_children(f, root, "")
    }
}

struct Label<'a>(&'a DependencyNode);

impl fmt::Display for Label<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.0;
        match node.artifact() {
            Some(artifact) => write!(f, "{}", artifact)?,
            None => write!(f, "(root)")?,
        }

        if let Some(dependency) = &node.dependency {
            if !dependency.scope.is_empty() {
                write!(f, " [{}]", dependency.scope)?;
            }
            if dependency.optional {
                write!(f, " (optional)")?;
            }
        }
        if let Some(version) = &node.premanaged_version {
            write!(f, " (version managed from {})", version)?;
        }
        if let Some(scope) = &node.premanaged_scope {
            write!(f, " (scope managed from {})", scope)?;
        }
        if let Some(origin) = node.relocations.first() {
            write!(f, " (relocated from {})", origin)?;
        }
        Ok(())
    }
}
