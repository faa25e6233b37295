//! # featmap-core — Extração de Mapas de Features a partir de Documentos
//!
//! Este crate transforma documentos de texto em **mapas de features**
//! (nome → contagem ou peso), a entrada típica de índices invertidos e de
//! classificadores. Cada extrator é um [`Analyzer`] construído a partir de uma
//! configuração TOML.
//!
//! ## Arquitetura do Sistema
//!
//! O dado flui em estágios, cada um configurável:
//!
//! 1.  **Entrada**: [`Document`] (identificador + texto).
//! 2.  **Tokenização** ([`tokenizer`]): o texto vira um fluxo de tokens, com
//!     marcadores de sentença `<s>`/`</s>`.
//! 3.  **Filtros** ([`filters`], [`chain`]): cadeia ordenada que transforma o
//!     fluxo (lowercase, stopwords, stemming, normalização PTB...).
//! 4.  **Análise**:
//!     *   **N-gramas de palavras** ([`ngram`]).
//!     *   **N-gramas POS** ([`pos`]): rótulos atribuídos por um CRF
//!         ([`crf`], [`viterbi`], [`features`]).
//!     *   **Estrutura de árvores sintáticas** ([`tree`], [`featurizers`]).
//! 5.  **Saída**: [`FeatureMap<T>`], com `T = u64` (contagens) ou `T = f64` (pesos).
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use featmap_core::{load, Document, Registry};
//!
//! // 1. Registro com os analisadores embutidos
//! let registry = Registry::new();
//!
//! // 2. Configuração
//! let config: toml::Table = r#"
//!     [[analyzers]]
//!     method = "ngram-word"
//!     ngram = 1
//!     filter = [{type = "icu-tokenizer", suppress-tags = true}, {type = "lowercase"}]
//! "#.parse().unwrap();
//!
//! // 3. Constrói o analisador (erros de configuração aparecem aqui)
//! let mut analyzer = load::<f64>(&registry, &config).unwrap();
//!
//! // 4. Analisa
//! let counts = analyzer.analyze(&Document::new(0, "The Dog Runs."));
//! assert_eq!(counts["dog"], 1.0);
//! ```
//!
//! ## Módulos Principais
//!
//! - [`registry`]: identificadores da configuração → construtores.
//! - [`analyzer`]: o contrato `Analyzer<T>` e o `MultiAnalyzer`.
//! - [`parallel`]: análise de um corpus com um pool de workers.

pub mod analyzer;
pub mod chain;
pub mod config;
pub mod crf;
pub mod document;
pub mod error;
pub mod features;
pub mod featurizers;
pub mod filters;
pub mod ngram;
pub mod parallel;
pub mod pos;
pub mod registry;
pub mod tokenizer;
pub mod tree;
pub mod viterbi;

pub use analyzer::{Analyzer, FeatureMap, FeatureValue, MultiAnalyzer};
pub use chain::{default_filter_chain, default_unigram_chain, load_filter, load_filters, FilterFactory};
pub use document::{get_content, Document};
pub use error::{AnalyzerError, Result};
pub use parallel::analyze_corpus;
pub use pos::register_analyzers;
pub use registry::{load, Registry};
pub use tokenizer::{Token, TokenStream};
