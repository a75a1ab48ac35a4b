//! The pluggable topology-rendering sink (§4.4 of the spec).
//!
//! The CORE never depends on a concrete plotting/graph-drawing crate: it
//! only produces vertex and directed-edge lists (see [`crate::node::Snapshot`])
//! and hands them to whatever implements [`TopologySink`]. [`DotTopologySink`]
//! is the crate's own dependency-free default, good enough to pipe through
//! Graphviz's `dot` to get the image the original spec describes.

use std::fs;
use std::path::Path;

use crate::error::SinkError;
use crate::types::Port;

/// Accepts a node's final vertex/edge lists and renders them somewhere.
pub trait TopologySink {
    fn render(&self, port: Port, vertices: &[Port], edges: &[(Port, Port)], out_dir: &Path) -> Result<(), SinkError>;
}

/// Writes a Graphviz `.dot` file describing the directed graph.
#[derive(Default)]
pub struct DotTopologySink;

impl TopologySink for DotTopologySink {
    fn render(&self, port: Port, vertices: &[Port], edges: &[(Port, Port)], out_dir: &Path) -> Result<(), SinkError> {
        let mut dot = String::from("digraph overlay {\n");
        for vertex in vertices {
            dot.push_str(&format!("  \"{}\";\n", vertex.address_form()));
        }
        for (from, to) in edges {
            dot.push_str(&format!("  \"{}\" -> \"{}\";\n", from.address_form(), to.address_form()));
        }
        dot.push_str("}\n");

        let path = out_dir.join(format!("port_{}_topology.dot", port.0));
        fs::write(path, dot)?;
        Ok(())
    }
}
