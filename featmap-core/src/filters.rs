//! # Filtros de Tokens
//!
//! Um filtro envolve um [`TokenStream`] (sua fonte, de posse exclusiva) e
//! reimplementa "tem mais?" / "próximo". Cada filtro pode:
//!
//! - **reescrever** um token (ex: `lowercase`);
//! - **descartar** tokens (ex: `length`, `list`);
//! - **expandir** um token em vários (ex: `ptb-normalizer` separa "don't" em "do" + "n't");
//! - **consumir vários** tokens antes de emitir (ex: `empty-sentence`).
//!
//! A mecânica comum fica em [`Filter`]: ele mantém uma fila de tokens já
//! transformados e puxa da fonte até que a fila tenha algo (ou a fonte acabe).
//! Cada filtro concreto só implementa [`TokenTransform`].
//!
//! Os marcadores `<s>` e `</s>` atravessam todos os filtros sem alteração.

use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::Path;

use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use toml::Table;

use crate::config::{optional_str, optional_str_array, required_uint};
use crate::error::{AnalyzerError, Result};
use crate::tokenizer::{Token, TokenStream, SENTENCE_END, SENTENCE_START};

/// Transformação aplicada por um filtro a cada token da fonte.
pub trait TokenTransform: Clone + Send + 'static {
    /// Processa um token da fonte, empurrando zero ou mais tokens em `out`.
    fn apply(&mut self, token: Token, out: &mut VecDeque<Token>);

    /// Chamado uma vez quando a fonte se esgota (para liberar tokens retidos).
    fn finish(&mut self, _out: &mut VecDeque<Token>) {}

    /// Descarta estado interno ao reiniciar o fluxo.
    fn reset(&mut self) {}
}

/// Filtro genérico sobre uma fonte.
#[derive(Clone)]
pub struct Filter<F> {
    source: Box<dyn TokenStream>,
    transform: F,
    pending: VecDeque<Token>,
    exhausted: bool,
}

impl<F: TokenTransform> Filter<F> {
    pub fn new(source: Box<dyn TokenStream>, transform: F) -> Self {
        let mut filter = Self {
            source,
            transform,
            pending: VecDeque::new(),
            exhausted: false,
        };
        filter.fill();
        filter
    }

    /// Puxa da fonte até ter um token pronto ou a fonte acabar
    fn fill(&mut self) {
        while self.pending.is_empty() && !self.exhausted {
            match self.source.next_token() {
                Some(token) => self.transform.apply(token, &mut self.pending),
                None => {
                    self.transform.finish(&mut self.pending);
                    self.exhausted = true;
                }
            }
        }
    }
}

impl<F: TokenTransform> TokenStream for Filter<F> {
    fn set_content(&mut self, content: String) {
        self.source.set_content(content);
        self.pending.clear();
        self.transform.reset();
        self.exhausted = false;
        self.fill();
    }

    fn has_next(&self) -> bool {
        !self.pending.is_empty()
    }

    fn next_token(&mut self) -> Option<Token> {
        let token = self.pending.pop_front();
        self.fill();
        token
    }

    fn clone_box(&self) -> Box<dyn TokenStream> {
        Box::new(self.clone())
    }
}

// === lowercase ===

/// Converte o texto para minúsculas (Unicode).
#[derive(Debug, Clone, Copy, Default)]
pub struct Lowercase;

impl Lowercase {
    pub const ID: &'static str = "lowercase";
}

impl TokenTransform for Lowercase {
    fn apply(&mut self, mut token: Token, out: &mut VecDeque<Token>) {
        token.text = token.text.to_lowercase();
        out.push_back(token);
    }
}

// === alpha ===

/// Mantém apenas caracteres alfabéticos e apóstrofos; descarta tokens que
/// ficarem vazios.
#[derive(Debug, Clone, Copy, Default)]
pub struct Alpha;

impl Alpha {
    pub const ID: &'static str = "alpha";
}

impl TokenTransform for Alpha {
    fn apply(&mut self, mut token: Token, out: &mut VecDeque<Token>) {
        if token.is_sentence_marker() {
            out.push_back(token);
            return;
        }
        token.text.retain(|c| c.is_alphabetic() || c == '\'');
        if !token.text.is_empty() {
            out.push_back(token);
        }
    }
}

// === length ===

/// Descarta tokens cujo número de caracteres esteja fora de `[min, max]`.
#[derive(Debug, Clone, Copy)]
pub struct Length {
    min: usize,
    max: usize,
}

impl Length {
    pub const ID: &'static str = "length";

    pub fn new(min: usize, max: usize) -> Result<Self> {
        if min > max {
            return Err(AnalyzerError::invalid(
                Self::ID,
                "min",
                format!("min ({min}) maior que max ({max})"),
            ));
        }
        Ok(Self { min, max })
    }

    /// Parâmetros obrigatórios: `min`, `max`
    pub fn from_config(config: &Table) -> Result<Self> {
        let min = required_uint(config, Self::ID, "min")?;
        let max = required_uint(config, Self::ID, "max")?;
        Self::new(min as usize, max as usize)
    }
}

impl TokenTransform for Length {
    fn apply(&mut self, token: Token, out: &mut VecDeque<Token>) {
        // Conta code points, não bytes
        let len = token.text.chars().count();
        if token.is_sentence_marker() || (self.min..=self.max).contains(&len) {
            out.push_back(token);
        }
    }
}

// === list ===

/// Aceita ou rejeita tokens presentes em uma lista de palavras.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMethod {
    /// Mantém apenas tokens da lista
    Accept,
    /// Remove tokens da lista (stopwords)
    Reject,
}

#[derive(Debug, Clone)]
pub struct List {
    words: HashSet<String>,
    method: ListMethod,
}

impl List {
    pub const ID: &'static str = "list";

    pub fn new(words: impl IntoIterator<Item = String>, method: ListMethod) -> Self {
        Self {
            words: words.into_iter().collect(),
            method,
        }
    }

    /// Lê uma palavra por linha; linhas vazias são ignoradas
    pub fn from_file(path: impl AsRef<Path>, method: ListMethod) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| AnalyzerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let words = text
            .lines()
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .map(str::to_string);
        Ok(Self::new(words, method))
    }

    /// Parâmetros: `file` ou `words` (um dos dois é obrigatório);
    /// `method` opcional (`"reject"` por padrão, ou `"accept"`)
    pub fn from_config(config: &Table) -> Result<Self> {
        let method = match optional_str(config, Self::ID, "method")? {
            None | Some("reject") => ListMethod::Reject,
            Some("accept") => ListMethod::Accept,
            Some(other) => {
                return Err(AnalyzerError::invalid(
                    Self::ID,
                    "method",
                    format!("esperava \"accept\" ou \"reject\", encontrou \"{other}\""),
                ))
            }
        };

        if let Some(file) = optional_str(config, Self::ID, "file")? {
            return Self::from_file(file, method);
        }
        match optional_str_array(config, Self::ID, "words")? {
            Some(words) => Ok(Self::new(words, method)),
            None => Err(AnalyzerError::missing(Self::ID, "file")),
        }
    }
}

impl TokenTransform for List {
    fn apply(&mut self, token: Token, out: &mut VecDeque<Token>) {
        if token.is_sentence_marker() {
            out.push_back(token);
            return;
        }
        let listed = self.words.contains(&token.text);
        let keep = match self.method {
            ListMethod::Accept => listed,
            ListMethod::Reject => !listed,
        };
        if keep {
            out.push_back(token);
        }
    }
}

// === porter2-filter ===

/// Stemmer Snowball (Porter2) para inglês.
pub struct Porter2 {
    stemmer: Stemmer,
}

impl Porter2 {
    pub const ID: &'static str = "porter2-filter";

    pub fn new() -> Self {
        Self {
            stemmer: Stemmer::create(Algorithm::English),
        }
    }
}

impl Default for Porter2 {
    fn default() -> Self {
        Self::new()
    }
}

// Stemmer não implementa Clone; o stemmer não tem estado, basta recriá-lo
impl Clone for Porter2 {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl TokenTransform for Porter2 {
    fn apply(&mut self, mut token: Token, out: &mut VecDeque<Token>) {
        if !token.is_sentence_marker() {
            token.text = self.stemmer.stem(&token.text).into_owned();
        }
        out.push_back(token);
    }
}

// === ptb-normalizer ===

/// Normalização no estilo Penn Treebank:
///
/// - parênteses/colchetes/chaves viram `-LRB-`, `-RRB-`, `-LSB-`, ...
/// - aspas duplas viram `` `` `` (abertura) ou `''` (fechamento), alternando
///   dentro da sentença;
/// - contrações são separadas: "don't" → "do" + "n't", "she's" → "she" + "'s".
#[derive(Debug, Clone)]
pub struct PtbNormalizer {
    contraction: Regex,
    open_quote: bool,
}

impl PtbNormalizer {
    pub const ID: &'static str = "ptb-normalizer";

    pub fn new() -> Result<Self> {
        let contraction = Regex::new(r"(?i)^(.+?)(n't|'s|'re|'ve|'ll|'d|'m)$")
            .map_err(|e| AnalyzerError::invalid(Self::ID, "contraction", e.to_string()))?;
        Ok(Self {
            contraction,
            open_quote: true,
        })
    }
}

impl TokenTransform for PtbNormalizer {
    fn apply(&mut self, mut token: Token, out: &mut VecDeque<Token>) {
        match token.text.as_str() {
            SENTENCE_START | SENTENCE_END => {
                self.open_quote = true;
                out.push_back(token);
                return;
            }
            "(" => token.text = "-LRB-".into(),
            ")" => token.text = "-RRB-".into(),
            "[" => token.text = "-LSB-".into(),
            "]" => token.text = "-RSB-".into(),
            "{" => token.text = "-LCB-".into(),
            "}" => token.text = "-RCB-".into(),
            "\"" | "\u{201C}" | "\u{201D}" => {
                token.text = if self.open_quote { "``" } else { "''" }.into();
                self.open_quote = !self.open_quote;
            }
            _ => {}
        }

        let split = self.contraction.captures(&token.text).and_then(|caps| {
            let (head, tail) = (caps.get(1)?, caps.get(2)?);
            Some((head.as_str().to_string(), tail.as_str().to_string()))
        });
        match split {
            Some((head, tail)) => {
                let cut = (token.start + head.len()).min(token.end);
                out.push_back(Token {
                    text: head,
                    start: token.start,
                    end: cut,
                    index: token.index,
                });
                out.push_back(Token {
                    text: tail,
                    start: cut,
                    end: token.end,
                    index: token.index,
                });
            }
            None => out.push_back(token),
        }
    }

    fn reset(&mut self) {
        self.open_quote = true;
    }
}

// === empty-sentence ===

/// Remove sentenças vazias (`<s>` seguido imediatamente de `</s>`).
#[derive(Debug, Clone, Default)]
pub struct EmptySentence {
    held: Option<Token>,
}

impl EmptySentence {
    pub const ID: &'static str = "empty-sentence";
}

impl TokenTransform for EmptySentence {
    fn apply(&mut self, token: Token, out: &mut VecDeque<Token>) {
        if let Some(start) = self.held.take() {
            if token.text == SENTENCE_END {
                return;
            }
            out.push_back(start);
        }
        if token.text == SENTENCE_START {
            self.held = Some(token);
        } else {
            out.push_back(token);
        }
    }

    fn finish(&mut self, out: &mut VecDeque<Token>) {
        if let Some(start) = self.held.take() {
            out.push_back(start);
        }
    }

    fn reset(&mut self) {
        self.held = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::{UnicodeTokenizer, WhitespaceTokenizer};

    fn run(stream: &mut dyn TokenStream, content: &str) -> Vec<String> {
        stream.set_content(content.to_string());
        stream.drain().into_iter().map(|t| t.text).collect()
    }

    fn ws() -> Box<dyn TokenStream> {
        Box::new(WhitespaceTokenizer::new())
    }

    #[test]
    fn test_lowercase() {
        let mut f = Filter::new(ws(), Lowercase);
        assert_eq!(run(&mut f, "The DOG"), vec!["the", "dog"]);
    }

    #[test]
    fn test_alpha_drops_emptied_tokens() {
        let mut f = Filter::new(Box::new(UnicodeTokenizer::new(false)), Alpha);
        assert_eq!(run(&mut f, "Hi, 42 cats."), vec!["<s>", "Hi", "cats", "</s>"]);
    }

    #[test]
    fn test_length_counts_code_points() {
        let mut f = Filter::new(ws(), Length::new(2, 3).unwrap());
        // "ção" tem 3 caracteres mas 5 bytes
        assert_eq!(run(&mut f, "a ção abcd ab"), vec!["ção", "ab"]);
    }

    #[test]
    fn test_length_rejects_inverted_bounds() {
        assert!(Length::new(5, 2).is_err());
    }

    #[test]
    fn test_list_reject_and_accept() {
        let words = || vec!["the".to_string(), "a".to_string()];
        let mut reject = Filter::new(ws(), List::new(words(), ListMethod::Reject));
        assert_eq!(run(&mut reject, "the dog a cat"), vec!["dog", "cat"]);

        let mut accept = Filter::new(ws(), List::new(words(), ListMethod::Accept));
        assert_eq!(run(&mut accept, "the dog a cat"), vec!["the", "a"]);
    }

    #[test]
    fn test_list_missing_source_is_config_error() {
        let cfg: Table = "type = \"list\"".parse().unwrap();
        let err = List::from_config(&cfg).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_list_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stop.txt");
        fs::write(&path, "the\n\nof\n").unwrap();
        let mut f = Filter::new(ws(), List::from_file(&path, ListMethod::Reject).unwrap());
        assert_eq!(run(&mut f, "the end of it"), vec!["end", "it"]);
    }

    #[test]
    fn test_porter2() {
        let mut f = Filter::new(ws(), Porter2::new());
        assert_eq!(run(&mut f, "running cats"), vec!["run", "cat"]);
    }

    #[test]
    fn test_ptb_normalizer() {
        let mut f = Filter::new(ws(), PtbNormalizer::new().unwrap());
        assert_eq!(
            run(&mut f, "\" don't ( stop ) \""),
            vec!["``", "do", "n't", "-LRB-", "stop", "-RRB-", "''"]
        );
    }

    #[test]
    fn test_ptb_contraction_offsets() {
        let mut f = Filter::new(ws(), PtbNormalizer::new().unwrap());
        f.set_content("she's".to_string());
        let tokens = f.drain();
        assert_eq!((tokens[0].start, tokens[0].end), (0, 3));
        assert_eq!((tokens[1].start, tokens[1].end), (3, 5));
    }

    #[test]
    fn test_empty_sentence() {
        let mut f = Filter::new(ws(), EmptySentence::default());
        assert_eq!(
            run(&mut f, "<s> </s> <s> a </s> <s>"),
            vec!["<s>", "a", "</s>", "<s>"]
        );
    }

    #[test]
    fn test_filter_has_next_tracks_drops() {
        // Todos os tokens são descartados: has_next deve ser falso de imediato
        let mut f = Filter::new(ws(), List::new(vec!["x".to_string()], ListMethod::Reject));
        f.set_content("x x x".to_string());
        assert!(!f.has_next());
    }

    #[test]
    fn test_filter_restart_resets_state() {
        let mut f = Filter::new(ws(), EmptySentence::default());
        f.set_content("<s>".to_string());
        f.set_content("a".to_string());
        assert_eq!(f.drain().len(), 1);
    }
}
