//! # N-gramas de Palavras
//!
//! Para uma sequência de `m` unidades e `n ≥ 1`, cada janela contígua de `n`
//! unidades gera uma feature cujo nome é a junção das unidades com `_`:
//!
//! ```text
//! n = 2:  [the, dog, runs]  →  the_dog, dog_runs
//! ```
//!
//! Com `m < n` nada é emitido; com `m ≥ n` são exatamente `m − n + 1` janelas.
//! Os marcadores `<s>`/`</s>` contam como unidades no modo palavra.

use std::marker::PhantomData;

use toml::Table;

use crate::analyzer::{increment, Analyzer, FeatureMap, FeatureValue};
use crate::chain::{load_filters, FilterFactory};
use crate::config::required_uint;
use crate::document::{get_content, Document};
use crate::error::{AnalyzerError, Result};
use crate::tokenizer::TokenStream;

/// Separador entre as unidades de um n-grama
pub const NGRAM_SEPARATOR: &str = "_";

/// Janela deslizante de tamanho `n`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NgramWindow {
    n: usize,
}

impl NgramWindow {
    /// `n` precisa ser ≥ 1
    pub fn new(n: usize) -> Result<Self> {
        if n == 0 {
            return Err(AnalyzerError::invalid("analyzers", "ngram", "precisa ser ≥ 1"));
        }
        Ok(Self { n })
    }

    pub fn n(&self) -> usize {
        self.n
    }

    /// Conta cada janela de `units` em `counts`.
    pub fn count<S, T>(&self, units: &[S], counts: &mut FeatureMap<T>)
    where
        S: AsRef<str>,
        T: FeatureValue,
    {
        if units.len() < self.n {
            return;
        }
        for window in units.windows(self.n) {
            let key = window
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<&str>>()
                .join(NGRAM_SEPARATOR);
            increment(counts, key);
        }
    }
}

/// Lê o parâmetro `ngram` de um descritor `[[analyzers]]`
pub fn parse_ngram(config: &Table) -> Result<NgramWindow> {
    let n = required_uint(config, "analyzers", "ngram")?;
    if n > u64::from(u16::MAX) {
        return Err(AnalyzerError::invalid(
            "analyzers",
            "ngram",
            format!("{n} excede o máximo de {}", u16::MAX),
        ));
    }
    NgramWindow::new(n as usize)
}

/// Analisador de n-gramas sobre o texto dos tokens filtrados.
pub struct NgramWordAnalyzer<T: FeatureValue> {
    window: NgramWindow,
    stream: Box<dyn TokenStream>,
    _value: PhantomData<fn() -> T>,
}

impl<T: FeatureValue> NgramWordAnalyzer<T> {
    pub const ID: &'static str = "ngram-word";

    pub fn new(window: NgramWindow, stream: Box<dyn TokenStream>) -> Self {
        Self {
            window,
            stream,
            _value: PhantomData,
        }
    }

    /// Construtor registrado sob [`Self::ID`]: lê `ngram` e `filter`.
    pub fn create(
        global: &Table,
        local: &Table,
        filters: &FilterFactory,
    ) -> Result<Box<dyn Analyzer<T>>> {
        let window = parse_ngram(local)?;
        let stream = load_filters(filters, global, local)?;
        Ok(Box::new(Self::new(window, stream)))
    }
}

impl<T: FeatureValue> Analyzer<T> for NgramWordAnalyzer<T> {
    fn tokenize(&mut self, doc: &Document, counts: &mut FeatureMap<T>) {
        self.stream.set_content(get_content(doc));
        let words: Vec<String> = self
            .stream
            .drain()
            .into_iter()
            .map(|token| token.text)
            .filter(|text| !text.is_empty())
            .collect();
        self.window.count(&words, counts);
    }

    fn clone_box(&self) -> Box<dyn Analyzer<T>> {
        Box::new(Self {
            window: self.window,
            stream: self.stream.clone_box(),
            _value: PhantomData,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::WhitespaceTokenizer;

    fn analyzer<T: FeatureValue>(n: usize) -> NgramWordAnalyzer<T> {
        NgramWordAnalyzer::new(NgramWindow::new(n).unwrap(), Box::new(WhitespaceTokenizer::new()))
    }

    #[test]
    fn test_window_count() {
        let window = NgramWindow::new(2).unwrap();
        let mut counts: FeatureMap<u64> = FeatureMap::new();
        window.count(&["a", "b", "a", "b"], &mut counts);
        assert_eq!(counts["a_b"], 2);
        assert_eq!(counts["b_a"], 1);
        assert_eq!(counts.len(), 2);
    }

    #[test]
    fn test_boundary() {
        for n in 1..=5usize {
            for m in 0..=5usize {
                let words: Vec<String> = (0..m).map(|i| format!("w{i}")).collect();
                let mut counts: FeatureMap<u64> = FeatureMap::new();
                NgramWindow::new(n).unwrap().count(&words, &mut counts);
                let total: u64 = counts.values().sum();
                let expected = if m < n { 0 } else { (m - n + 1) as u64 };
                assert_eq!(total, expected, "n={n} m={m}");
            }
        }
    }

    #[test]
    fn test_zero_ngram_rejected() {
        assert!(NgramWindow::new(0).is_err());
        let config: Table = "ngram = 0".parse().unwrap();
        assert!(matches!(
            parse_ngram(&config),
            Err(AnalyzerError::InvalidParameter { .. })
        ));
        let config: Table = "ngram = 70000".parse().unwrap();
        assert!(parse_ngram(&config).is_err());
        assert!(matches!(
            parse_ngram(&Table::new()),
            Err(AnalyzerError::MissingParameter { .. })
        ));
    }

    #[test]
    fn test_word_bigrams() {
        let mut a = analyzer::<f64>(2);
        let counts = a.analyze(&Document::new(0, "to be or not to be"));
        assert_eq!(counts["to_be"], 2.0);
        assert_eq!(counts["be_or"], 1.0);
        assert_eq!(counts.len(), 4);
    }

    #[test]
    fn test_short_document_is_not_an_error() {
        let mut a = analyzer::<u64>(3);
        assert!(a.analyze(&Document::new(0, "two words")).is_empty());
        assert!(a.analyze(&Document::new(1, "")).is_empty());
    }

    #[test]
    fn test_clone_is_independent() {
        let mut a = analyzer::<u64>(1);
        let mut b = a.clone_box();
        let doc = Document::new(0, "x y x");
        assert_eq!(a.analyze(&doc), b.analyze(&doc));
        // Repetir não acumula estado entre documentos
        assert_eq!(a.analyze(&doc)["x"], 2);
    }
}
