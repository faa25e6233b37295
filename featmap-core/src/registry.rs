//! # Registro de Analisadores e Filtros
//!
//! O [`Registry`] associa identificadores da configuração (`method` de
//! analisadores e `type` de filtros) a construtores. Ele é um objeto explícito:
//! criado e populado uma vez na inicialização, antes do pool de workers, e
//! passado por referência a [`load`]. Depois disso é somente leitura, então
//! pode ser compartilhado entre threads sem sincronização.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use featmap_core::registry::{load, Registry};
//! use featmap_core::{register_analyzers, Document};
//!
//! let mut registry = Registry::new();
//! register_analyzers(&mut registry); // adiciona "ngram-pos"
//!
//! let config: toml::Table = r#"
//!     [[analyzers]]
//!     method = "ngram-word"
//!     ngram = 2
//!     filter = [{type = "whitespace-tokenizer"}]
//! "#.parse().unwrap();
//!
//! let mut analyzer = load::<u64>(&registry, &config).unwrap();
//! let counts = analyzer.analyze(&Document::new(0, "a b c"));
//! assert_eq!(counts["a_b"], 1);
//! ```

use std::collections::HashMap;
use std::fmt;

use toml::Table;
use tracing::info;

use crate::analyzer::{Analyzer, FeatureValue, MultiAnalyzer};
use crate::chain::{FilterCtor, FilterFactory, TokenizerCtor};
use crate::config::{required_str, table_array};
use crate::error::{AnalyzerError, Result};
use crate::featurizers::TreeAnalyzer;
use crate::ngram::NgramWordAnalyzer;

/// Constrói um analisador a partir de (configuração global, descritor local).
pub type AnalyzerCtor<T> = fn(&Table, &Table, &FilterFactory) -> Result<Box<dyn Analyzer<T>>>;

/// Tabela `method` → construtor para um tipo de valor.
pub struct AnalyzerFactory<T: FeatureValue> {
    methods: HashMap<String, AnalyzerCtor<T>>,
}

impl<T: FeatureValue> AnalyzerFactory<T> {
    fn empty() -> Self {
        Self {
            methods: HashMap::new(),
        }
    }

    /// Construtores embutidos: `ngram-word` e `tree`
    fn with_builtins() -> Self {
        let mut factory = Self::empty();
        factory.register(NgramWordAnalyzer::<T>::ID, NgramWordAnalyzer::<T>::create);
        factory.register(TreeAnalyzer::<T>::ID, TreeAnalyzer::<T>::create);
        factory
    }

    pub fn register(&mut self, method: &str, ctor: AnalyzerCtor<T>) {
        self.methods.insert(method.to_string(), ctor);
    }

    pub fn contains(&self, method: &str) -> bool {
        self.methods.contains_key(method)
    }

    pub fn create(
        &self,
        method: &str,
        global: &Table,
        local: &Table,
        filters: &FilterFactory,
    ) -> Result<Box<dyn Analyzer<T>>> {
        let ctor = self
            .methods
            .get(method)
            .ok_or_else(|| AnalyzerError::UnknownMethod(method.to_string()))?;
        ctor(global, local, filters)
    }
}

impl<T: FeatureValue> fmt::Debug for AnalyzerFactory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<&String> = self.methods.keys().collect();
        methods.sort();
        f.debug_struct("AnalyzerFactory").field("methods", &methods).finish()
    }
}

/// Registro completo: filtros + analisadores para `u64` e `f64`.
#[derive(Debug)]
pub struct Registry {
    filters: FilterFactory,
    pub(crate) counts: AnalyzerFactory<u64>,
    pub(crate) weights: AnalyzerFactory<f64>,
}

impl Registry {
    /// Registro com os tokenizadores, filtros e analisadores embutidos.
    ///
    /// Analisadores que dependem de modelos externos (ex: `ngram-pos`) são
    /// adicionados por [`register_analyzers`](crate::pos::register_analyzers).
    pub fn new() -> Self {
        Self {
            filters: FilterFactory::new(),
            counts: AnalyzerFactory::with_builtins(),
            weights: AnalyzerFactory::with_builtins(),
        }
    }

    pub fn filters(&self) -> &FilterFactory {
        &self.filters
    }

    pub fn register_analyzer<T: FeatureValue>(&mut self, method: &str, ctor: AnalyzerCtor<T>) {
        T::factory_mut(self).register(method, ctor);
    }

    pub fn register_tokenizer(&mut self, id: &str, ctor: TokenizerCtor) {
        self.filters.register_tokenizer(id, ctor);
    }

    pub fn register_filter(&mut self, id: &str, ctor: FilterCtor) {
        self.filters.register_filter(id, ctor);
    }

    /// Constrói um analisador a partir de um único descritor `[[analyzers]]`.
    pub fn load_analyzer<T: FeatureValue>(
        &self,
        global: &Table,
        descriptor: &Table,
    ) -> Result<Box<dyn Analyzer<T>>> {
        let method = required_str(descriptor, "analyzers", "method")?;
        let analyzer = T::factory(self).create(method, global, descriptor, &self.filters)?;
        info!(method, "analisador carregado");
        Ok(analyzer)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Constrói o analisador descrito pela seção `[[analyzers]]` da configuração.
///
/// Com uma única entrada, devolve o próprio analisador; com várias, um
/// [`MultiAnalyzer`] que soma os resultados. Qualquer erro de configuração ou
/// de modelo é devolvido aqui, antes de qualquer documento ser processado.
pub fn load<T: FeatureValue>(registry: &Registry, config: &Table) -> Result<Box<dyn Analyzer<T>>> {
    let descriptors = table_array(config, "global", "analyzers")?;
    let mut analyzers = descriptors
        .into_iter()
        .map(|descriptor| registry.load_analyzer::<T>(config, descriptor))
        .collect::<Result<Vec<_>>>()?;

    match analyzers.len() {
        0 => Err(AnalyzerError::invalid(
            "global",
            "analyzers",
            "nenhum analisador configurado",
        )),
        1 => Ok(analyzers.remove(0)),
        n => {
            info!(analyzers = n, "combinando analisadores");
            Ok(Box::new(MultiAnalyzer::new(analyzers)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    fn parse(text: &str) -> Table {
        text.parse::<Table>().expect("toml válido")
    }

    #[test]
    fn test_load_single_analyzer() {
        let registry = Registry::new();
        let config = parse(
            r#"
            [[analyzers]]
            method = "ngram-word"
            ngram = 1
            filter = [{type = "whitespace-tokenizer"}]
            "#,
        );
        let mut analyzer = load::<u64>(&registry, &config).unwrap();
        let counts = analyzer.analyze(&Document::new(0, "a b a"));
        assert_eq!(counts["a"], 2);
        assert_eq!(counts["b"], 1);
    }

    #[test]
    fn test_load_multi_analyzer_sums() {
        let registry = Registry::new();
        let config = parse(
            r#"
            [[analyzers]]
            method = "ngram-word"
            ngram = 1
            filter = [{type = "whitespace-tokenizer"}]

            [[analyzers]]
            method = "ngram-word"
            ngram = 1
            filter = [{type = "whitespace-tokenizer"}, {type = "lowercase"}]
            "#,
        );
        let mut analyzer = load::<f64>(&registry, &config).unwrap();
        let counts = analyzer.analyze(&Document::new(0, "A a"));
        assert_eq!(counts["a"], 3.0);
        assert_eq!(counts["A"], 1.0);
    }

    #[test]
    fn test_unknown_method_fails_fast() {
        let registry = Registry::new();
        let config = parse(
            r#"
            [[analyzers]]
            method = "ngram-pos"
            ngram = 1
            crf-prefix = "nao-existe"
            filter = [{type = "icu-tokenizer"}]
            "#,
        );
        // Sem register_analyzers, "ngram-pos" não existe
        let err = load::<u64>(&registry, &config).err().unwrap();
        assert!(matches!(err, AnalyzerError::UnknownMethod(ref m) if m == "ngram-pos"));
        assert!(err.is_config());
    }

    #[test]
    fn test_missing_sections() {
        let registry = Registry::new();
        assert!(matches!(
            load::<u64>(&registry, &Table::new()),
            Err(AnalyzerError::MissingParameter { .. })
        ));
        assert!(load::<u64>(&registry, &parse("analyzers = []")).is_err());
        assert!(matches!(
            load::<u64>(&registry, &parse("[[analyzers]]\nngram = 1")),
            Err(AnalyzerError::MissingParameter { ref key, .. }) if key == "method"
        ));
    }

    #[test]
    fn test_custom_registration() {
        fn fixed(_: &Table, _: &Table, _: &FilterFactory) -> Result<Box<dyn Analyzer<u64>>> {
            Ok(Box::new(MultiAnalyzer::<u64>::new(Vec::new())))
        }
        let mut registry = Registry::new();
        registry.register_analyzer::<u64>("vazio", fixed);
        assert!(registry.counts.contains("vazio"));
        assert!(!registry.weights.contains("vazio"));

        let config = parse("[[analyzers]]\nmethod = \"vazio\"");
        let mut analyzer = load::<u64>(&registry, &config).unwrap();
        assert!(analyzer.analyze(&Document::new(0, "x")).is_empty());
    }
}
