//! Template visitor.
//!
//! Flattens the AST into a linear action list for the opcode compilers.
//! Children are visited in reverse index order and each program's completed
//! action run is appended to the global list on completion, so the most
//! deeply nested program's actions appear first and the root program's
//! `StartProgram` appears last. The template compiler relies on this
//! ordering to compile child templates before their parents.

use gossamer_ast::ast::*;

/// One entry in the action list. Every variant carries the originating node
/// plus its position among its siblings.
#[derive(Debug, Clone, PartialEq)]
pub enum Action<'a> {
    StartProgram {
        program: &'a Program,
        child_template_count: usize,
        blank_child_text_nodes: Vec<usize>,
    },
    EndProgram {
        program: &'a Program,
        depth: usize,
    },
    Text {
        text: &'a TextNode,
        child_index: usize,
        child_count: usize,
    },
    Comment {
        comment: &'a CommentStatement,
        child_index: usize,
        child_count: usize,
    },
    OpenElement {
        element: &'a ElementNode,
        child_index: usize,
        child_count: usize,
        mustache_count: usize,
        blank_child_text_nodes: Vec<usize>,
    },
    CloseElement {
        element: &'a ElementNode,
        child_index: usize,
        child_count: usize,
    },
    Mustache {
        mustache: &'a MustacheStatement,
        child_index: usize,
        child_count: usize,
    },
    Block {
        block: &'a BlockStatement,
        child_index: usize,
        child_count: usize,
    },
    Component {
        component: &'a ComponentNode,
        child_index: usize,
        child_count: usize,
    },
    Partial {
        partial: &'a PartialStatement,
        child_index: usize,
        child_count: usize,
    },
}

struct Frame<'a> {
    actions: Vec<Action<'a>>,
    child_index: usize,
    child_count: usize,
    mustache_count: usize,
    child_template_count: usize,
    blank_child_text_nodes: Vec<usize>,
}

impl<'a> Frame<'a> {
    fn new(child_count: usize) -> Self {
        Self {
            actions: Vec::new(),
            child_index: 0,
            child_count,
            mustache_count: 0,
            child_template_count: 0,
            blank_child_text_nodes: Vec::new(),
        }
    }
}

pub struct TemplateVisitor<'a> {
    frames: Vec<Frame<'a>>,
    actions: Vec<Action<'a>>,
    program_depth: isize,
}

impl<'a> TemplateVisitor<'a> {
    /// Produce the full action list for a program tree.
    pub fn visit(program: &'a Program) -> Vec<Action<'a>> {
        let mut visitor = Self {
            frames: Vec::new(),
            actions: Vec::new(),
            program_depth: -1,
        };
        visitor.visit_program(program);
        visitor.actions
    }

    fn frame(&mut self) -> &mut Frame<'a> {
        self.frames.last_mut().expect("no active frame")
    }

    fn visit_program(&mut self, program: &'a Program) {
        self.program_depth += 1;
        let has_parent = !self.frames.is_empty();

        self.frames.push(Frame::new(program.body.len()));
        let depth = self.program_depth as usize;
        self.frame().actions.push(Action::EndProgram {
            program,
            depth,
        });

        for i in (0..program.body.len()).rev() {
            self.frame().child_index = i;
            self.visit_statement(&program.body[i]);
        }

        let frame = self.frames.last_mut().unwrap();
        let mut blanks = std::mem::take(&mut frame.blank_child_text_nodes);
        blanks.reverse();
        let child_template_count = frame.child_template_count;
        frame.actions.push(Action::StartProgram {
            program,
            child_template_count,
            blank_child_text_nodes: blanks,
        });

        let mut frame = self.frames.pop().unwrap();
        self.program_depth -= 1;

        if has_parent {
            self.frame().child_template_count += 1;
        }
        frame.actions.reverse();
        self.actions.append(&mut frame.actions);
    }

    fn visit_statement(&mut self, statement: &'a Statement) {
        match statement {
            Statement::Text(text) => self.visit_text(text),
            Statement::Comment(comment) => self.visit_comment(comment),
            Statement::Element(element) => self.visit_element(element),
            Statement::Component(component) => self.visit_component(component),
            Statement::Mustache(mustache) => self.visit_mustache(mustache),
            Statement::Block(block) => self.visit_block(block),
            Statement::Partial(partial) => self.visit_partial(partial),
            // Content statements never survive the merge
            Statement::Content(_) => {}
        }
    }

    fn visit_element(&mut self, element: &'a ElementNode) {
        let (parent_index, parent_count) = {
            let parent = self.frame();
            (parent.child_index, parent.child_count)
        };

        let mut frame = Frame::new(element.children.len());
        frame.mustache_count = element.modifiers.len();
        self.frames.push(frame);

        self.frame().actions.push(Action::CloseElement {
            element,
            child_index: parent_index,
            child_count: parent_count,
        });

        for attr in element.attributes.iter().rev() {
            if attr.is_dynamic() {
                self.frame().mustache_count += 1;
            }
        }

        for i in (0..element.children.len()).rev() {
            self.frame().child_index = i;
            self.visit_statement(&element.children[i]);
        }

        let frame = self.frames.last_mut().unwrap();
        let mustache_count = frame.mustache_count;
        let mut blanks = std::mem::take(&mut frame.blank_child_text_nodes);
        blanks.reverse();
        frame.actions.push(Action::OpenElement {
            element,
            child_index: parent_index,
            child_count: parent_count,
            mustache_count,
            blank_child_text_nodes: blanks,
        });

        let mut frame = self.frames.pop().unwrap();
        let parent = self.frame();
        if frame.mustache_count > 0 {
            parent.mustache_count += 1;
        }
        parent.child_template_count += frame.child_template_count;
        parent.actions.append(&mut frame.actions);
    }

    fn visit_text(&mut self, text: &'a TextNode) {
        let frame = self.frame();
        if text.chars.is_empty() {
            frame.blank_child_text_nodes.push(frame.child_index);
        }
        let (child_index, child_count) = (frame.child_index, frame.child_count);
        frame.actions.push(Action::Text {
            text,
            child_index,
            child_count,
        });
    }

    fn visit_comment(&mut self, comment: &'a CommentStatement) {
        let frame = self.frame();
        let (child_index, child_count) = (frame.child_index, frame.child_count);
        frame.actions.push(Action::Comment {
            comment,
            child_index,
            child_count,
        });
    }

    fn visit_mustache(&mut self, mustache: &'a MustacheStatement) {
        let frame = self.frame();
        frame.mustache_count += 1;
        let (child_index, child_count) = (frame.child_index, frame.child_count);
        frame.actions.push(Action::Mustache {
            mustache,
            child_index,
            child_count,
        });
    }

    fn visit_block(&mut self, block: &'a BlockStatement) {
        {
            let frame = self.frame();
            frame.mustache_count += 1;
            let (child_index, child_count) = (frame.child_index, frame.child_count);
            frame.actions.push(Action::Block {
                block,
                child_index,
                child_count,
            });
        }
        if let Some(inverse) = &block.inverse {
            self.visit_program(inverse);
        }
        self.visit_program(&block.program);
    }

    fn visit_component(&mut self, component: &'a ComponentNode) {
        {
            let frame = self.frame();
            frame.mustache_count += 1;
            let (child_index, child_count) = (frame.child_index, frame.child_count);
            frame.actions.push(Action::Component {
                component,
                child_index,
                child_count,
            });
        }
        self.visit_program(&component.program);
    }

    fn visit_partial(&mut self, partial: &'a PartialStatement) {
        let frame = self.frame();
        frame.mustache_count += 1;
        let (child_index, child_count) = (frame.child_index, frame.child_count);
        frame.actions.push(Action::Partial {
            partial,
            child_index,
            child_count,
        });
    }
}
