// The parse-tree shape consumed by the evaluator (SPEC_FULL.md §6's parser
// contract): "a sequence of nested sequences whose atoms are tagged with
// source line numbers". Grounded on `ast.rs`'s `Node<T> = Rc<T>` / `Seq<T>`
// aliasing idiom, collapsed into a single recursive enum since the parser
// contract only promises atoms-or-lists, not a typed AST.

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Atom { text: String, line: usize },
    List { items: Vec<Node>, line: usize },
}

impl Node {
    pub fn line(&self) -> usize {
        match self {
            Node::Atom { line, .. } => *line,
            Node::List { line, .. } => *line,
        }
    }

    pub fn as_atom(&self) -> Option<&str> {
        match self {
            Node::Atom { text, .. } => Some(text),
            Node::List { .. } => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Node]> {
        match self {
            Node::List { items, .. } => Some(items),
            Node::Atom { .. } => None,
        }
    }

    /// The head keyword/operator of a list node, if it starts with an atom.
    pub fn head(&self) -> Option<&str> {
        self.as_list()?.first()?.as_atom()
    }
}
