//! # Features Estruturais de Árvores Sintáticas
//!
//! O analisador `tree` lê as árvores em parênteses do conteúdo do documento
//! e aplica uma lista de featurizers a cada uma:
//!
//! | id       | Feature          | Contagem                               |
//! |----------|------------------|----------------------------------------|
//! | `depth`  | `depth-<h>`      | uma por árvore (altura da árvore)      |
//! | `branch` | `branch-<k>`     | uma por nó interno com `k` filhos      |
//! | `tag`    | `tag-<rótulo>`   | uma por nó (internos e pré-terminais)  |
//!
//! ```toml
//! [[analyzers]]
//! method = "tree"
//! features = ["depth", "branch"]
//! ```
//!
//! Altura: folha (pré-terminal) = 1; nó interno = 1 + maior altura dos
//! filhos; nó interno sem filhos = 1.

use std::marker::PhantomData;
use std::sync::Arc;

use toml::Table;
use tracing::{info, warn};

use crate::analyzer::{increment, Analyzer, FeatureMap, FeatureValue};
use crate::chain::FilterFactory;
use crate::config::required_str_array;
use crate::document::{get_content, Document};
use crate::error::{AnalyzerError, Result};
use crate::tree::{read_trees, InternalNode, LeafNode, ParseTree, Visitor};

/// Extrai features de uma árvore. Somente leitura: compartilhado entre clones.
pub trait TreeFeaturizer<T: FeatureValue>: Send + Sync {
    fn tree_tokenize(&self, tree: &ParseTree, counts: &mut FeatureMap<T>);
}

/// Altura de uma subárvore
pub struct HeightVisitor;

impl Visitor for HeightVisitor {
    type Output = usize;

    fn visit_internal(&mut self, node: &InternalNode) -> usize {
        let max_height = node
            .children
            .iter()
            .map(|child| child.accept(self))
            .max()
            .unwrap_or(0);
        max_height + 1
    }

    fn visit_leaf(&mut self, _node: &LeafNode) -> usize {
        1
    }
}

/// `depth-<h>`, uma vez por árvore
pub struct DepthFeaturizer;

impl DepthFeaturizer {
    pub const ID: &'static str = "depth";
}

impl<T: FeatureValue> TreeFeaturizer<T> for DepthFeaturizer {
    fn tree_tokenize(&self, tree: &ParseTree, counts: &mut FeatureMap<T>) {
        let height = tree.visit(&mut HeightVisitor);
        increment(counts, format!("depth-{height}"));
    }
}

/// `branch-<k>` para cada nó interno com `k` filhos
pub struct BranchFeaturizer;

impl BranchFeaturizer {
    pub const ID: &'static str = "branch";
}

struct BranchVisitor<'a, T: FeatureValue> {
    counts: &'a mut FeatureMap<T>,
}

impl<T: FeatureValue> Visitor for BranchVisitor<'_, T> {
    type Output = ();

    fn visit_internal(&mut self, node: &InternalNode) {
        increment(self.counts, format!("branch-{}", node.children.len()));
        for child in &node.children {
            child.accept(self);
        }
    }

    fn visit_leaf(&mut self, _node: &LeafNode) {}
}

impl<T: FeatureValue> TreeFeaturizer<T> for BranchFeaturizer {
    fn tree_tokenize(&self, tree: &ParseTree, counts: &mut FeatureMap<T>) {
        tree.visit(&mut BranchVisitor { counts });
    }
}

/// `tag-<rótulo>` para cada nó
pub struct TagFeaturizer;

impl TagFeaturizer {
    pub const ID: &'static str = "tag";
}

struct TagVisitor<'a, T: FeatureValue> {
    counts: &'a mut FeatureMap<T>,
}

impl<T: FeatureValue> Visitor for TagVisitor<'_, T> {
    type Output = ();

    fn visit_internal(&mut self, node: &InternalNode) {
        increment(self.counts, format!("tag-{}", node.label));
        for child in &node.children {
            child.accept(self);
        }
    }

    fn visit_leaf(&mut self, node: &LeafNode) {
        increment(self.counts, format!("tag-{}", node.category));
    }
}

impl<T: FeatureValue> TreeFeaturizer<T> for TagFeaturizer {
    fn tree_tokenize(&self, tree: &ParseTree, counts: &mut FeatureMap<T>) {
        tree.visit(&mut TagVisitor { counts });
    }
}

fn make_featurizer<T: FeatureValue>(id: &str) -> Result<Box<dyn TreeFeaturizer<T>>> {
    match id {
        DepthFeaturizer::ID => Ok(Box::new(DepthFeaturizer)),
        BranchFeaturizer::ID => Ok(Box::new(BranchFeaturizer)),
        TagFeaturizer::ID => Ok(Box::new(TagFeaturizer)),
        other => Err(AnalyzerError::invalid(
            TreeAnalyzer::<T>::ID,
            "features",
            format!("featurizer desconhecido: {other}"),
        )),
    }
}

/// Aplica featurizers às árvores contidas no documento.
pub struct TreeAnalyzer<T: FeatureValue> {
    featurizers: Arc<Vec<Box<dyn TreeFeaturizer<T>>>>,
    _value: PhantomData<fn() -> T>,
}

impl<T: FeatureValue> TreeAnalyzer<T> {
    pub const ID: &'static str = "tree";

    pub fn new(featurizers: Vec<Box<dyn TreeFeaturizer<T>>>) -> Self {
        Self {
            featurizers: Arc::new(featurizers),
            _value: PhantomData,
        }
    }

    /// Construtor registrado sob [`Self::ID`]: lê `features`.
    pub fn create(
        _global: &Table,
        local: &Table,
        _filters: &FilterFactory,
    ) -> Result<Box<dyn Analyzer<T>>> {
        let ids = required_str_array(local, Self::ID, "features")?;
        if ids.is_empty() {
            return Err(AnalyzerError::invalid(Self::ID, "features", "lista vazia"));
        }
        let featurizers = ids
            .iter()
            .map(|id| make_featurizer::<T>(id))
            .collect::<Result<Vec<_>>>()?;
        info!(features = ?ids, "analisador de árvores pronto");
        Ok(Box::new(Self::new(featurizers)))
    }
}

impl<T: FeatureValue> Analyzer<T> for TreeAnalyzer<T> {
    fn tokenize(&mut self, doc: &Document, counts: &mut FeatureMap<T>) {
        let trees = match read_trees(&get_content(doc)) {
            Ok(trees) => trees,
            Err(e) => {
                warn!(doc = doc.id, error = %e, "árvore malformada ignorada");
                return;
            }
        };
        for tree in &trees {
            for featurizer in self.featurizers.iter() {
                featurizer.tree_tokenize(tree, counts);
            }
        }
    }

    fn clone_box(&self) -> Box<dyn Analyzer<T>> {
        Box::new(Self {
            featurizers: Arc::clone(&self.featurizers),
            _value: PhantomData,
        })
    }
}
