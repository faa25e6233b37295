//! # Montagem de Cadeias de Filtros
//!
//! Uma cadeia é descrita por uma lista ordenada de descritores. O primeiro
//! precisa ser um tokenizador (ponta interna); cada descritor seguinte
//! envolve o fluxo montado até ali:
//!
//! ```toml
//! filter = [{type = "icu-tokenizer"}, {type = "lowercase"}, {type = "length", min = 2, max = 35}]
//! ```
//!
//! ```text
//! icu-tokenizer → lowercase → length
//! (interno)                   (externo)
//! ```
//!
//! A ordem importa: `[lowercase, list]` e `[list, lowercase]` podem produzir
//! fluxos diferentes.
//!
//! Em vez de um array, `filter` também aceita as strings `"default-chain"` e
//! `"default-unigram-chain"` (ver [`default_filter_chain`] e
//! [`default_unigram_chain`]).

use std::collections::HashMap;
use std::fmt;

use toml::{Table, Value};
use tracing::debug;

use crate::config::{required_str, table_array};
use crate::error::{AnalyzerError, Result};
use crate::filters::{
    Alpha, EmptySentence, Filter, Length, List, ListMethod, Lowercase, Porter2, PtbNormalizer,
};
use crate::tokenizer::{
    CharacterTokenizer, StandardTokenizer, TokenStream, UnicodeTokenizer, WhitespaceTokenizer,
};

/// Construtor de tokenizador (ponta interna da cadeia)
pub type TokenizerCtor = fn(&Table) -> Result<Box<dyn TokenStream>>;

/// Construtor de filtro que envolve uma fonte
pub type FilterCtor = fn(Box<dyn TokenStream>, &Table) -> Result<Box<dyn TokenStream>>;

/// Mapeia identificadores `type` para construtores.
///
/// Populado uma vez na inicialização e somente lido depois.
#[derive(Clone)]
pub struct FilterFactory {
    tokenizers: HashMap<String, TokenizerCtor>,
    filters: HashMap<String, FilterCtor>,
}

impl FilterFactory {
    /// Fábrica vazia, sem nenhum tipo registrado
    pub fn empty() -> Self {
        Self {
            tokenizers: HashMap::new(),
            filters: HashMap::new(),
        }
    }

    /// Fábrica com todos os tokenizadores e filtros do crate
    pub fn new() -> Self {
        let mut factory = Self::empty();

        factory.register_tokenizer(UnicodeTokenizer::ID, |cfg| {
            Ok(Box::new(UnicodeTokenizer::from_config(cfg)?))
        });
        factory.register_tokenizer(StandardTokenizer::ID, |_| Ok(Box::new(StandardTokenizer::new())));
        factory.register_tokenizer(CharacterTokenizer::ID, |_| Ok(Box::new(CharacterTokenizer::new())));
        factory.register_tokenizer(WhitespaceTokenizer::ID, |_| {
            Ok(Box::new(WhitespaceTokenizer::new()))
        });

        factory.register_filter(Lowercase::ID, |src, _| Ok(Box::new(Filter::new(src, Lowercase))));
        factory.register_filter(Alpha::ID, |src, _| Ok(Box::new(Filter::new(src, Alpha))));
        factory.register_filter(Length::ID, |src, cfg| {
            Ok(Box::new(Filter::new(src, Length::from_config(cfg)?)))
        });
        factory.register_filter(List::ID, |src, cfg| {
            Ok(Box::new(Filter::new(src, List::from_config(cfg)?)))
        });
        factory.register_filter(Porter2::ID, |src, _| Ok(Box::new(Filter::new(src, Porter2::new()))));
        factory.register_filter(PtbNormalizer::ID, |src, _| {
            Ok(Box::new(Filter::new(src, PtbNormalizer::new()?)))
        });
        factory.register_filter(EmptySentence::ID, |src, _| {
            Ok(Box::new(Filter::new(src, EmptySentence::default())))
        });

        factory
    }

    pub fn register_tokenizer(&mut self, id: &str, ctor: TokenizerCtor) {
        self.tokenizers.insert(id.to_string(), ctor);
    }

    pub fn register_filter(&mut self, id: &str, ctor: FilterCtor) {
        self.filters.insert(id.to_string(), ctor);
    }

    /// Constrói o elemento `id` sobre `source`.
    ///
    /// Tokenizadores exigem `source == None`; filtros exigem uma fonte.
    pub fn create(
        &self,
        id: &str,
        source: Option<Box<dyn TokenStream>>,
        config: &Table,
    ) -> Result<Box<dyn TokenStream>> {
        if let Some(ctor) = self.tokenizers.get(id) {
            if source.is_some() {
                return Err(AnalyzerError::InvalidChain(format!(
                    "tokenizador \"{id}\" precisa ser o primeiro da cadeia"
                )));
            }
            return ctor(config);
        }
        if let Some(ctor) = self.filters.get(id) {
            let source = source.ok_or_else(|| {
                AnalyzerError::InvalidChain(format!("filtro \"{id}\" sem tokenizador antes dele"))
            })?;
            return ctor(source, config);
        }
        Err(AnalyzerError::UnknownFilter(id.to_string()))
    }
}

impl fmt::Debug for FilterFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tokenizers: Vec<&String> = self.tokenizers.keys().collect();
        let mut filters: Vec<&String> = self.filters.keys().collect();
        tokenizers.sort();
        filters.sort();
        f.debug_struct("FilterFactory")
            .field("tokenizers", &tokenizers)
            .field("filters", &filters)
            .finish()
    }
}

impl Default for FilterFactory {
    fn default() -> Self {
        Self::new()
    }
}

/// Constrói um único elemento da cadeia a partir do seu descritor.
pub fn load_filter(
    factory: &FilterFactory,
    source: Option<Box<dyn TokenStream>>,
    descriptor: &Table,
) -> Result<Box<dyn TokenStream>> {
    let id = required_str(descriptor, "filter", "type")?;
    debug!(filter = id, "montando filtro");
    factory.create(id, source, descriptor)
}

/// Constrói a cadeia descrita pela chave `filter` da seção `local`.
///
/// `global` é a configuração completa (necessária para as cadeias padrão,
/// que leem `stop-words`).
pub fn load_filters(
    factory: &FilterFactory,
    global: &Table,
    local: &Table,
) -> Result<Box<dyn TokenStream>> {
    if let Some(Value::String(name)) = local.get("filter") {
        return match name.as_str() {
            "default-chain" => default_filter_chain(global),
            "default-unigram-chain" => default_unigram_chain(global),
            other => Err(AnalyzerError::invalid(
                "analyzers",
                "filter",
                format!("cadeia pré-definida desconhecida: {other}"),
            )),
        };
    }

    let descriptors = table_array(local, "analyzers", "filter")?;
    let mut stream: Option<Box<dyn TokenStream>> = None;
    for descriptor in descriptors {
        stream = Some(load_filter(factory, stream, descriptor)?);
    }
    stream.ok_or_else(|| AnalyzerError::InvalidChain("lista de filtros vazia".to_string()))
}

/// Cadeia padrão:
///
/// `icu-tokenizer → lowercase → alpha → length(2, 35) → list(stop-words) → porter2-filter`
///
/// Exige `stop-words` (caminho de arquivo, uma palavra por linha) na configuração global.
pub fn default_filter_chain(global: &Table) -> Result<Box<dyn TokenStream>> {
    default_chain(global, UnicodeTokenizer::new(false))
}

/// Igual a [`default_filter_chain`], mas sem os marcadores `<s>`/`</s>`
/// (adequada para unigramas).
pub fn default_unigram_chain(global: &Table) -> Result<Box<dyn TokenStream>> {
    default_chain(global, UnicodeTokenizer::new(true))
}

fn default_chain(global: &Table, tokenizer: UnicodeTokenizer) -> Result<Box<dyn TokenStream>> {
    let stopwords = required_str(global, "global", "stop-words")?;

    let stream: Box<dyn TokenStream> = Box::new(tokenizer);
    let stream: Box<dyn TokenStream> = Box::new(Filter::new(stream, Lowercase));
    let stream: Box<dyn TokenStream> = Box::new(Filter::new(stream, Alpha));
    let stream: Box<dyn TokenStream> = Box::new(Filter::new(stream, Length::new(2, 35)?));
    let stream: Box<dyn TokenStream> = Box::new(Filter::new(
        stream,
        List::from_file(stopwords, ListMethod::Reject)?,
    ));
    Ok(Box::new(Filter::new(stream, Porter2::new())))
}
