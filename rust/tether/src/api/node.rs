use tether_core::{Context, Node};

use crate::Backend;
use crate::handle::{Handle, HandleData};
use crate::ret::{RetCode, RetResult, fail};

impl HandleData for Node<Backend> {
    const KIND: &'static str = "node";
}

pub fn create_node(context: &Handle, name: &str, namespace: &str) -> RetResult<Handle> {
    const OP: &str = "create_node";
    let context = context.get::<Context<Backend>>().map_err(fail(OP))?;
    let node = context.create_node(name, namespace).map_err(fail(OP))?;
    Ok(Handle::new(node))
}

pub fn destroy_node(node: &mut Option<Handle>) -> RetResult {
    let node = Handle::take::<Node<Backend>>(node).map_err(fail("destroy_node"))?;
    tracing::debug!(node = %node.fully_qualified_name(), "destroyed node");
    Ok(())
}

/// Graph introspection is not provided, so there is no graph guard
/// condition to hand out.
pub fn node_get_graph_guard_condition(node: &Handle) -> RetResult<Handle> {
    const OP: &str = "node_get_graph_guard_condition";
    node.get::<Node<Backend>>().map_err(fail(OP))?;
    tracing::warn!(op = OP, "graph guard conditions are not supported");
    Err(RetCode::Unsupported)
}
