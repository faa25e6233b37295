//! # Árvores Sintáticas
//!
//! Uma [`ParseTree`] é formada por nós internos (rótulo + filhos ordenados) e
//! folhas. Cada folha é um **pré-terminal**: a classe gramatical e a palavra,
//! como em `(NN dog)`.
//!
//! Travessias usam o trait [`Visitor`], com um método por variante. O nó
//! interno decide se e como descer para os filhos; a árvore nunca é alterada.
//!
//! ## Formato de Leitura
//!
//! [`read_trees`] lê árvores em notação de parênteses (Penn Treebank):
//!
//! ```text
//! (S (NP (DT the) (NN dog)) (VP (VBZ runs)))
//! ( (S (NP (PRP it)) (VP (VBZ works))) )     ← raiz sem rótulo vira "ROOT"
//! ```
//!
//! Os visitantes descem recursivamente, então a leitura recusa árvores com
//! mais de [`MAX_TREE_DEPTH`] níveis de aninhamento.

use thiserror::Error;

/// Rótulo dado à raiz sem rótulo de `( (S ...) )`
pub const ROOT_LABEL: &str = "ROOT";

/// Profundidade máxima de aninhamento aceita por [`read_trees`]
pub const MAX_TREE_DEPTH: usize = 1000;

/// Erro de leitura de uma árvore em parênteses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeReadError {
    #[error("fim inesperado do texto: faltam {0} ')'")]
    UnexpectedEnd(usize),

    #[error("')' sem '(' correspondente na posição {0}")]
    UnexpectedClose(usize),

    #[error("palavra fora de um pré-terminal na posição {position}: {word}")]
    UnexpectedWord { word: String, position: usize },

    #[error("árvore com mais de {0} níveis de aninhamento")]
    TooDeep(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalNode {
    pub label: String,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafNode {
    /// Classe gramatical (pré-terminal)
    pub category: String,
    pub word: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Internal(InternalNode),
    Leaf(LeafNode),
}

/// Travessia somente leitura com um tipo de resultado único.
pub trait Visitor {
    type Output;

    fn visit_internal(&mut self, node: &InternalNode) -> Self::Output;

    fn visit_leaf(&mut self, node: &LeafNode) -> Self::Output;
}

impl Node {
    pub fn internal(label: impl Into<String>, children: Vec<Node>) -> Self {
        Node::Internal(InternalNode {
            label: label.into(),
            children,
        })
    }

    pub fn leaf(category: impl Into<String>, word: impl Into<String>) -> Self {
        Node::Leaf(LeafNode {
            category: category.into(),
            word: word.into(),
        })
    }

    /// Rótulo do nó (a classe gramatical, no caso de folhas)
    pub fn label(&self) -> &str {
        match self {
            Node::Internal(node) => &node.label,
            Node::Leaf(node) => &node.category,
        }
    }

    pub fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) -> V::Output {
        match self {
            Node::Internal(node) => visitor.visit_internal(node),
            Node::Leaf(node) => visitor.visit_leaf(node),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTree {
    root: Node,
}

impl ParseTree {
    pub fn new(root: Node) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn visit<V: Visitor + ?Sized>(&self, visitor: &mut V) -> V::Output {
        self.root.accept(visitor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Lexeme<'a> {
    Open(usize),
    Close(usize),
    Word(&'a str, usize),
}

fn lex(text: &str) -> Vec<Lexeme<'_>> {
    let mut lexemes = Vec::new();
    let mut word_start: Option<usize> = None;
    for (i, c) in text.char_indices() {
        if c == '(' || c == ')' || c.is_whitespace() {
            if let Some(start) = word_start.take() {
                lexemes.push(Lexeme::Word(&text[start..i], start));
            }
            match c {
                '(' => lexemes.push(Lexeme::Open(i)),
                ')' => lexemes.push(Lexeme::Close(i)),
                _ => {}
            }
        } else if word_start.is_none() {
            word_start = Some(i);
        }
    }
    if let Some(start) = word_start {
        lexemes.push(Lexeme::Word(&text[start..], start));
    }
    lexemes
}

/// Nó em construção: rótulo opcional + elementos já lidos
struct Frame<'a> {
    label: Option<&'a str>,
    children: Vec<Node>,
    words: Vec<(&'a str, usize)>,
}

impl Frame<'_> {
    fn close(self) -> Result<Node, TreeReadError> {
        match (self.label, self.children.is_empty(), self.words.as_slice()) {
            (Some(category), true, [(word, _)]) => Ok(Node::leaf(category, *word)),
            (label, _, []) => Ok(Node::internal(label.unwrap_or(ROOT_LABEL), self.children)),
            (_, _, [(word, position), ..]) => Err(TreeReadError::UnexpectedWord {
                word: word.to_string(),
                position: *position,
            }),
        }
    }
}

/// Lê todas as árvores de `text`, na ordem em que aparecem.
///
/// Texto vazio (ou só espaços) devolve uma lista vazia. Aninhamento acima de
/// [`MAX_TREE_DEPTH`] devolve [`TreeReadError::TooDeep`].
pub fn read_trees(text: &str) -> Result<Vec<ParseTree>, TreeReadError> {
    let mut trees = Vec::new();
    let mut stack: Vec<Frame<'_>> = Vec::new();
    let mut lexemes = lex(text).into_iter().peekable();

    while let Some(lexeme) = lexemes.next() {
        match lexeme {
            Lexeme::Open(_) => {
                if stack.len() >= MAX_TREE_DEPTH {
                    return Err(TreeReadError::TooDeep(MAX_TREE_DEPTH));
                }
                let label = match lexemes.peek() {
                    Some(&Lexeme::Word(word, _)) => {
                        lexemes.next();
                        Some(word)
                    }
                    _ => None,
                };
                stack.push(Frame {
                    label,
                    children: Vec::new(),
                    words: Vec::new(),
                });
            }
            Lexeme::Close(position) => {
                let node = stack
                    .pop()
                    .ok_or(TreeReadError::UnexpectedClose(position))?
                    .close()?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => trees.push(ParseTree::new(node)),
                }
            }
            Lexeme::Word(word, position) => match stack.last_mut() {
                Some(frame) => frame.words.push((word, position)),
                None => {
                    return Err(TreeReadError::UnexpectedWord {
                        word: word.to_string(),
                        position,
                    })
                }
            },
        }
    }

    if !stack.is_empty() {
        return Err(TreeReadError::UnexpectedEnd(stack.len()));
    }
    Ok(trees)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Conta folhas, para exercitar a recursão decidida pelo nó interno
    struct LeafCounter;

    impl Visitor for LeafCounter {
        type Output = usize;

        fn visit_internal(&mut self, node: &InternalNode) -> usize {
            node.children.iter().map(|child| child.accept(self)).sum()
        }

        fn visit_leaf(&mut self, _node: &LeafNode) -> usize {
            1
        }
    }

    #[test]
    fn test_read_simple_tree() {
        let trees = read_trees("(A (B x) (C y))").unwrap();
        assert_eq!(trees.len(), 1);
        assert_eq!(
            trees[0].root(),
            &Node::internal("A", vec![Node::leaf("B", "x"), Node::leaf("C", "y")])
        );
    }

    #[test]
    fn test_unlabeled_root() {
        let trees = read_trees("( (S (NP (PRP it)) (VP (VBZ works))) )").unwrap();
        assert_eq!(trees[0].root().label(), ROOT_LABEL);
        assert_eq!(trees[0].visit(&mut LeafCounter), 2);
    }

    #[test]
    fn test_multiple_trees_and_whitespace() {
        let trees = read_trees("(A (B x))\n\n  (C (D y) (E z))\n").unwrap();
        assert_eq!(trees.len(), 2);
        assert_eq!(trees[1].visit(&mut LeafCounter), 2);
        assert!(read_trees("   ").unwrap().is_empty());
    }

    #[test]
    fn test_internal_without_children() {
        let trees = read_trees("(X)").unwrap();
        assert_eq!(trees[0].root(), &Node::internal("X", vec![]));
        assert_eq!(trees[0].visit(&mut LeafCounter), 0);
    }

    #[test]
    fn test_malformed_trees() {
        assert_eq!(read_trees("(A (B x)"), Err(TreeReadError::UnexpectedEnd(1)));
        assert!(matches!(read_trees("(A x))"), Err(TreeReadError::UnexpectedClose(_))));
        assert!(matches!(
            read_trees("(A (B x) y)"),
            Err(TreeReadError::UnexpectedWord { ref word, .. }) if word == "y"
        ));
        assert!(matches!(read_trees("solto"), Err(TreeReadError::UnexpectedWord { .. })));
    }

    fn nested(levels: usize) -> String {
        format!("{}(X y){}", "(A ".repeat(levels), ")".repeat(levels))
    }

    #[test]
    fn test_nesting_limit() {
        // Raiz + MAX_TREE_DEPTH - 1 níveis: exatamente no limite
        let trees = read_trees(&nested(MAX_TREE_DEPTH - 1)).unwrap();
        assert_eq!(trees.len(), 1);

        assert_eq!(
            read_trees(&nested(MAX_TREE_DEPTH)),
            Err(TreeReadError::TooDeep(MAX_TREE_DEPTH))
        );
        assert_eq!(
            read_trees(&nested(100_000)),
            Err(TreeReadError::TooDeep(MAX_TREE_DEPTH))
        );
    }
}
