//! Depth-first AST walker.
//!
//! The walker visits every statement in document order, calling the callback
//! before descending, so a callback may rewrite a node in place and the
//! walker will traverse the rewritten children.

use crate::ast::{Program, Statement};

#[derive(Debug, Default)]
pub struct Walker;

impl Walker {
    pub fn new() -> Self {
        Self
    }

    pub fn visit<F: FnMut(&mut Statement)>(&self, program: &mut Program, callback: &mut F) {
        self.visit_program(program, callback);
    }

    fn visit_program<F: FnMut(&mut Statement)>(&self, program: &mut Program, callback: &mut F) {
        for statement in &mut program.body {
            callback(statement);
            self.visit_statement(statement, callback);
        }
    }

    fn visit_statement<F: FnMut(&mut Statement)>(&self, statement: &mut Statement, callback: &mut F) {
        match statement {
            Statement::Block(block) => {
                self.visit_program(&mut block.program, callback);
                if let Some(inverse) = &mut block.inverse {
                    self.visit_program(inverse, callback);
                }
            }
            Statement::Element(element) => {
                for child in &mut element.children {
                    callback(child);
                    self.visit_statement(child, callback);
                }
            }
            Statement::Component(component) => {
                self.visit_program(&mut component.program, callback);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::*;
    use crate::builders as b;

    #[test]
    fn visits_nested_statements_in_document_order() {
        let inner = b::mustache(b::sexpr(b::path("x"), vec![], b::hash(vec![])));
        let block = b::block(
            b::sexpr(b::path("if"), vec![b::path_expr("ok")], b::hash(vec![])),
            b::program(vec![Statement::Mustache(inner)], vec![]),
            None,
        );
        let el = b::element(
            "div",
            vec![],
            vec![],
            vec![Statement::Text(b::text("hi"))],
        );
        let mut program = b::program(
            vec![
                Statement::Block(Box::new(block)),
                Statement::Element(Box::new(el)),
            ],
            vec![],
        );

        let mut seen = Vec::new();
        Walker::new().visit(&mut program, &mut |node| {
            seen.push(node.node_type());
        });
        assert_eq!(
            seen,
            vec![
                NodeType::Block,
                NodeType::Mustache,
                NodeType::Element,
                NodeType::Text
            ]
        );
    }
}
