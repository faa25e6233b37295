//! # Analisadores — Documento → Mapa de Features
//!
//! Um [`Analyzer<T>`] transforma um documento em um [`FeatureMap<T>`]:
//! nome da feature → valor acumulado. O tipo do valor é restrito em tempo de
//! compilação a dois casos:
//!
//! | `T`   | Uso típico                               |
//! |-------|------------------------------------------|
//! | `u64` | contagens (índice invertido)             |
//! | `f64` | pesos reais (índice direto / aprendizado) |
//!
//! ## Contrato
//!
//! - `analyze(doc)` cria um mapa vazio e delega a `tokenize(doc, &mut mapa)`,
//!   o gancho que cada analisador concreto implementa.
//! - `clone_box()` devolve um analisador com a mesma configuração e estado
//!   mutável **independente** (cadeia de filtros própria). Recursos somente
//!   leitura, como o modelo CRF, são compartilhados via `Arc`.
//! - Para um analisador recém-construído: `a.clone_box().analyze(d) == a.analyze(d)`.
//! - Acúmulo é sempre **aditivo**: uma chave existente nunca é sobrescrita.

use std::collections::HashMap;
use std::fmt::Debug;
use std::ops::AddAssign;

use crate::document::Document;
use crate::registry::{AnalyzerFactory, Registry};

/// Mapa de features: nome → valor
pub type FeatureMap<T> = HashMap<String, T>;

mod sealed {
    pub trait Sealed {}
    impl Sealed for u64 {}
    impl Sealed for f64 {}
}

/// Tipos de valor aceitos por um analisador (`u64` ou `f64`, e nenhum outro).
pub trait FeatureValue:
    sealed::Sealed + Copy + Default + PartialEq + PartialOrd + AddAssign + Debug + Send + Sync + 'static
{
    /// Incremento de uma ocorrência
    const ONE: Self;

    /// Fábrica de analisadores deste tipo dentro do registro
    fn factory(registry: &Registry) -> &AnalyzerFactory<Self>;

    /// Acesso mutável à fábrica (somente durante o registro)
    fn factory_mut(registry: &mut Registry) -> &mut AnalyzerFactory<Self>;
}

impl FeatureValue for u64 {
    const ONE: Self = 1;

    fn factory(registry: &Registry) -> &AnalyzerFactory<Self> {
        &registry.counts
    }

    fn factory_mut(registry: &mut Registry) -> &mut AnalyzerFactory<Self> {
        &mut registry.counts
    }
}

impl FeatureValue for f64 {
    const ONE: Self = 1.0;

    fn factory(registry: &Registry) -> &AnalyzerFactory<Self> {
        &registry.weights
    }

    fn factory_mut(registry: &mut Registry) -> &mut AnalyzerFactory<Self> {
        &mut registry.weights
    }
}

/// Incrementa `key` em uma ocorrência
pub fn increment<T: FeatureValue>(counts: &mut FeatureMap<T>, key: impl Into<String>) {
    *counts.entry(key.into()).or_default() += T::ONE;
}

/// Soma `source` em `target`, chave a chave
pub fn merge_into<T: FeatureValue>(target: &mut FeatureMap<T>, source: FeatureMap<T>) {
    for (key, value) in source {
        *target.entry(key).or_default() += value;
    }
}

/// Produz um mapa de features a partir de um documento.
///
/// `&mut self` porque a cadeia de filtros guarda estado de leitura; por isso
/// dois workers nunca compartilham a mesma instância (cada um usa o seu
/// `clone_box()`).
pub trait Analyzer<T: FeatureValue>: Send {
    /// Analisa o documento. Nunca falha: documentos vazios geram mapas vazios.
    fn analyze(&mut self, doc: &Document) -> FeatureMap<T> {
        let mut counts = FeatureMap::new();
        self.tokenize(doc, &mut counts);
        counts
    }

    /// Acumula as features de `doc` em `counts`.
    fn tokenize(&mut self, doc: &Document, counts: &mut FeatureMap<T>);

    /// Novo analisador com a mesma configuração e estado mutável próprio.
    fn clone_box(&self) -> Box<dyn Analyzer<T>>;
}

impl<T: FeatureValue> Clone for Box<dyn Analyzer<T>> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Combina vários analisadores somando seus mapas.
///
/// Usa apenas o contrato público `analyze` de cada sub-analisador; o
/// resultado é a soma ponto a ponto dos mapas, independente da ordem.
pub struct MultiAnalyzer<T: FeatureValue> {
    analyzers: Vec<Box<dyn Analyzer<T>>>,
}

impl<T: FeatureValue> MultiAnalyzer<T> {
    pub fn new(analyzers: Vec<Box<dyn Analyzer<T>>>) -> Self {
        Self { analyzers }
    }

    pub fn len(&self) -> usize {
        self.analyzers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }
}

impl<T: FeatureValue> Analyzer<T> for MultiAnalyzer<T> {
    fn tokenize(&mut self, doc: &Document, counts: &mut FeatureMap<T>) {
        for analyzer in &mut self.analyzers {
            merge_into(counts, analyzer.analyze(doc));
        }
    }

    fn clone_box(&self) -> Box<dyn Analyzer<T>> {
        Box::new(Self {
            analyzers: self.analyzers.iter().map(|a| a.clone_box()).collect(),
        })
    }
}
