//! # N-gramas de Classes Gramaticais (POS)
//!
//! Como o [`NgramWordAnalyzer`](crate::ngram::NgramWordAnalyzer), mas as
//! unidades são os rótulos que o CRF atribui a cada palavra:
//!
//! ```text
//! "<s> The dog runs . </s>"  →  [DT, NN, VBZ, .]  →  (n = 2) DT_NN, NN_VBZ, VBZ_.
//! ```
//!
//! O rotulador roda uma vez por sentença. Uma sentença termina em `</s>` ou
//! no fim do fluxo; n-gramas nunca atravessam essa fronteira.
//!
//! ```toml
//! [[analyzers]]
//! method = "ngram-pos"
//! ngram = 2
//! crf-prefix = "modelos/crf"
//! filter = [{type = "icu-tokenizer"}, {type = "ptb-normalizer"}]
//! ```

use std::marker::PhantomData;
use std::sync::Arc;

use toml::Table;
use tracing::info;

use crate::analyzer::{Analyzer, FeatureMap, FeatureValue};
use crate::chain::{load_filters, FilterFactory};
use crate::config::required_str;
use crate::crf::{CrfModel, Tagger};
use crate::document::{get_content, Document};
use crate::error::{AnalyzerError, Result};
use crate::features::{FeatureVocabulary, Sequence, SequenceAnalyzer};
use crate::ngram::{parse_ngram, NgramWindow};
use crate::registry::Registry;
use crate::tokenizer::{TokenStream, SENTENCE_END, SENTENCE_START};

/// Analisador de n-gramas sobre rótulos POS.
pub struct NgramPosAnalyzer<T: FeatureValue> {
    window: NgramWindow,
    stream: Box<dyn TokenStream>,
    crf: Arc<CrfModel>,
    seq_analyzer: Arc<SequenceAnalyzer>,
    _value: PhantomData<fn() -> T>,
}

impl<T: FeatureValue> NgramPosAnalyzer<T> {
    pub const ID: &'static str = "ngram-pos";

    pub fn new(
        window: NgramWindow,
        stream: Box<dyn TokenStream>,
        crf: Arc<CrfModel>,
        seq_analyzer: Arc<SequenceAnalyzer>,
    ) -> Self {
        Self {
            window,
            stream,
            crf,
            seq_analyzer,
            _value: PhantomData,
        }
    }

    /// Construtor registrado sob [`Self::ID`]: lê `ngram`, `crf-prefix` e `filter`.
    pub fn create(
        global: &Table,
        local: &Table,
        filters: &FilterFactory,
    ) -> Result<Box<dyn Analyzer<T>>> {
        let window = parse_ngram(local)?;
        let prefix = required_str(local, Self::ID, "crf-prefix")?;
        let stream = load_filters(filters, global, local)?;

        let crf = CrfModel::load(prefix)?;
        let seq_analyzer = SequenceAnalyzer::load(prefix)?;
        check_vocabulary(seq_analyzer.vocabulary(), &crf, prefix)?;
        info!(prefix, n = window.n(), "analisador ngram-pos pronto");

        Ok(Box::new(Self::new(
            window,
            stream,
            Arc::new(crf),
            Arc::new(seq_analyzer),
        )))
    }

    fn count_sentence(&self, tagger: &mut Tagger<'_>, seq: &mut Sequence, counts: &mut FeatureMap<T>) {
        if seq.is_empty() {
            return;
        }
        self.seq_analyzer.analyze(seq);
        let result = tagger.tag(seq);
        let tags: Vec<&str> = result
            .best_sequence
            .iter()
            .map(|&label| self.crf.label(label))
            .collect();
        self.window.count(&tags, counts);
        seq.clear();
    }
}

/// Todo id do vocabulário precisa ter uma linha de pesos no modelo
fn check_vocabulary(vocabulary: &FeatureVocabulary, crf: &CrfModel, prefix: &str) -> Result<()> {
    match vocabulary.max_id() {
        Some(max) if max >= crf.num_features() => Err(AnalyzerError::ModelFormat {
            path: SequenceAnalyzer::vocabulary_path(prefix.as_ref()),
            reason: format!(
                "feature {max} fora do modelo ({} features)",
                crf.num_features()
            ),
        }),
        _ => Ok(()),
    }
}

impl<T: FeatureValue> Analyzer<T> for NgramPosAnalyzer<T> {
    fn tokenize(&mut self, doc: &Document, counts: &mut FeatureMap<T>) {
        self.stream.set_content(get_content(doc));
        // Um rotulador por documento, reaproveitado entre as sentenças
        let crf = Arc::clone(&self.crf);
        let mut tagger = crf.make_tagger();
        let mut sentence = Sequence::new();
        while let Some(token) = self.stream.next_token() {
            match token.text.as_str() {
                "" | SENTENCE_START => {}
                SENTENCE_END => self.count_sentence(&mut tagger, &mut sentence, counts),
                _ => sentence.push(token.text),
            }
        }
        // Palavras finais sem `</s>` formam a última sentença
        self.count_sentence(&mut tagger, &mut sentence, counts);
    }

    fn clone_box(&self) -> Box<dyn Analyzer<T>> {
        Box::new(Self {
            window: self.window,
            stream: self.stream.clone_box(),
            crf: Arc::clone(&self.crf),
            seq_analyzer: Arc::clone(&self.seq_analyzer),
            _value: PhantomData,
        })
    }
}

/// Registra `ngram-pos` para `u64` e `f64`.
pub fn register_analyzers(registry: &mut Registry) {
    registry.register_analyzer::<u64>(NgramPosAnalyzer::<u64>::ID, NgramPosAnalyzer::<u64>::create);
    registry.register_analyzer::<f64>(NgramPosAnalyzer::<f64>::ID, NgramPosAnalyzer::<f64>::create);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::{UnicodeTokenizer, WhitespaceTokenizer};

    /// Modelo com dois rótulos: "CAP" para palavras capitalizadas, "LOW" para o resto
    fn capitalization_model() -> (CrfModel, SequenceAnalyzer) {
        let mut seq_analyzer = SequenceAnalyzer::default_pos_analyzer();
        seq_analyzer.train_analyze(&mut Sequence::from_symbols(["Ab", "cd"]));
        let vocabulary = seq_analyzer.vocabulary();

        let mut crf = CrfModel::new(vec!["LOW".into(), "CAP".into()], vocabulary.len());
        let cap = vocabulary.get("is_capitalized").unwrap();
        crf.set_emission(cap, 1, 5.0);
        (crf, seq_analyzer)
    }

    fn analyzer(n: usize) -> NgramPosAnalyzer<u64> {
        let (crf, seq_analyzer) = capitalization_model();
        NgramPosAnalyzer::new(
            NgramWindow::new(n).unwrap(),
            Box::new(UnicodeTokenizer::new(false)),
            Arc::new(crf),
            Arc::new(seq_analyzer),
        )
    }

    #[test]
    fn test_pos_unigrams() {
        let mut a = analyzer(1);
        let counts = a.analyze(&Document::new(0, "Anna sees bob."));
        assert_eq!(counts["CAP"], 1);
        assert_eq!(counts["LOW"], 3);
    }

    #[test]
    fn test_ngrams_do_not_cross_sentences() {
        let mut a = analyzer(2);
        let counts = a.analyze(&Document::new(0, "Anna runs. Bob sleeps."));
        // Cada sentença: CAP LOW LOW → CAP_LOW, LOW_LOW
        assert_eq!(counts["CAP_LOW"], 2);
        assert_eq!(counts["LOW_LOW"], 2);
        // "." da primeira sentença seguido de "Bob" da segunda
        assert!(!counts.contains_key("LOW_CAP"));
    }

    #[test]
    fn test_stream_end_closes_sentence() {
        let mut a = analyzer(2);
        a.stream = Box::new(WhitespaceTokenizer::new());
        // Sem marcadores: o documento inteiro é uma sentença fechada pelo fim do fluxo
        let counts = a.analyze(&Document::new(0, "Bob reads. Anna sleeps"));
        assert_eq!(counts["CAP_LOW"], 2);
        assert_eq!(counts["LOW_CAP"], 1);
        assert_eq!(counts.values().sum::<u64>(), 3);
    }

    #[test]
    fn test_short_sentences_yield_nothing() {
        let mut a = analyzer(3);
        assert!(a.analyze(&Document::new(0, "Hi. Yo.")).is_empty());
        assert!(a.analyze(&Document::new(1, "")).is_empty());
    }

    #[test]
    fn test_clone_shares_model() {
        let a = analyzer(1);
        let mut b = a.clone_box();
        let mut a: Box<dyn Analyzer<u64>> = Box::new(a);
        let doc = Document::new(0, "One Two three");
        assert_eq!(a.analyze(&doc), b.analyze(&doc));
    }

    #[test]
    fn test_vocabulary_outside_model_is_rejected() {
        let (_, seq_analyzer) = capitalization_model();
        let small = CrfModel::new(vec!["X".into()], 1);
        let err = check_vocabulary(seq_analyzer.vocabulary(), &small, "m").unwrap_err();
        assert!(err.is_model_load());
    }
}
