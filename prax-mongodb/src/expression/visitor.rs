//! Tree rewriting.

use super::MongoExpression;
use crate::error::MongoResult;

/// A rewrite pass over a projection tree.
///
/// Override [`visit`](ExpressionVisitor::visit) to replace nodes and call
/// [`visit_children`](ExpressionVisitor::visit_children) to recurse. Nodes
/// whose children come back unchanged are kept as-is.
pub trait ExpressionVisitor {
    /// Visit a node.
    fn visit(&mut self, expression: &MongoExpression) -> MongoResult<MongoExpression> {
        self.visit_children(expression)
    }

    /// Visit the child of a node and rebuild the node over the result.
    fn visit_children(&mut self, expression: &MongoExpression) -> MongoResult<MongoExpression> {
        match expression.child() {
            Some(child) => {
                let visited = self.visit(child)?;
                Ok(expression.with_child(visited))
            }
            None => Ok(expression.clone()),
        }
    }
}
