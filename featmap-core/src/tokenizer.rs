//! # Fluxos de Tokens e Tokenizadores
//!
//! Um [`TokenStream`] produz tokens a partir de um texto bruto. Ele é
//! **reiniciável**: `set_content` descarta o estado anterior e recomeça com
//! um novo texto, o que permite reaproveitar a mesma cadeia para todos os
//! documentos processados por um worker.
//!
//! A segmentação é feita de uma vez por documento: `set_content` guarda todos
//! os tokens e `next_token` apenas os entrega em ordem. Os filtros, por sua
//! vez, puxam um token de cada vez.
//!
//! Tokenizadores ficam sempre na ponta interna da cadeia; os filtros
//! ([`crate::filters`]) são empilhados por cima deles.
//!
//! ## Tokenizadores Disponíveis
//!
//! | Identificador          | Comportamento                                                      |
//! |------------------------|--------------------------------------------------------------------|
//! | `icu-tokenizer`        | Segmentação Unicode de sentenças e palavras, com marcadores `<s>`/`</s>` |
//! | `standard-tokenizer`   | Espaços e pontuação; preserva abreviações ("Dr.") e decimais       |
//! | `character-tokenizer`  | Um token por caractere                                             |
//! | `whitespace-tokenizer` | Apenas espaços em branco                                           |
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use featmap_core::tokenizer::{TokenStream, UnicodeTokenizer};
//!
//! let mut stream = UnicodeTokenizer::new(true);
//! stream.set_content("The Dog Runs.".to_string());
//! let texts: Vec<String> = stream.drain().into_iter().map(|t| t.text).collect();
//! assert_eq!(texts, vec!["The", "Dog", "Runs", "."]);
//! ```

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use toml::Table;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::optional_bool;
use crate::error::Result;

/// Marcador de início de sentença
pub const SENTENCE_START: &str = "<s>";
/// Marcador de fim de sentença
pub const SENTENCE_END: &str = "</s>";

/// Um token extraído do texto original.
///
/// Mantém a posição exata no texto (`start` e `end`, em bytes). Filtros que
/// reescrevem o texto preservam os offsets do token de origem; marcadores de
/// sentença têm `start == end`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Token {
    /// O texto do token (ex: "Dog", ",", "<s>").
    pub text: String,
    /// Índice de byte inicial no texto original (inclusive).
    pub start: usize,
    /// Índice de byte final no texto original (exclusivo).
    pub end: usize,
    /// Índice sequencial do token produzido pelo tokenizador (0, 1, 2...).
    pub index: usize,
}

impl Token {
    pub fn new(text: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            text: text.into(),
            start,
            end,
            index: 0,
        }
    }

    /// Cria um marcador de sentença ancorado em `position`
    pub fn marker(text: &str, position: usize) -> Self {
        Self::new(text, position, position)
    }

    /// `true` para `<s>` e `</s>`
    pub fn is_sentence_marker(&self) -> bool {
        self.text == SENTENCE_START || self.text == SENTENCE_END
    }
}

/// Fluxo de tokens: "tem mais tokens?" e "consome o próximo token".
///
/// `Send` porque cada worker leva o seu clone para outra thread.
pub trait TokenStream: Send {
    /// Reinicia o fluxo com um novo conteúdo.
    fn set_content(&mut self, content: String);

    /// Ainda há tokens a consumir?
    fn has_next(&self) -> bool;

    /// Consome o próximo token, ou `None` se o fluxo acabou.
    fn next_token(&mut self) -> Option<Token>;

    /// Cópia profunda da cadeia inteira (cada filtro clona a sua fonte).
    fn clone_box(&self) -> Box<dyn TokenStream>;

    /// Consome todos os tokens restantes.
    fn drain(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token() {
            tokens.push(token);
        }
        tokens
    }
}

impl Clone for Box<dyn TokenStream> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Estratégia de segmentação de um tokenizador.
pub trait Segmenter: Clone + Send + 'static {
    fn segment(&self, text: &str) -> Vec<Token>;
}

/// Tokenizador genérico: segmenta o texto inteiro em `set_content` e entrega
/// os tokens um a um.
#[derive(Debug, Clone)]
pub struct Tokenizer<S> {
    segmenter: S,
    tokens: VecDeque<Token>,
}

impl<S: Segmenter> Tokenizer<S> {
    pub fn with_segmenter(segmenter: S) -> Self {
        Self {
            segmenter,
            tokens: VecDeque::new(),
        }
    }
}

impl<S: Segmenter> TokenStream for Tokenizer<S> {
    fn set_content(&mut self, content: String) {
        let mut tokens = self.segmenter.segment(&content);
        // Re-indexa os tokens
        for (i, token) in tokens.iter_mut().enumerate() {
            token.index = i;
        }
        self.tokens = tokens.into();
    }

    fn has_next(&self) -> bool {
        !self.tokens.is_empty()
    }

    fn next_token(&mut self) -> Option<Token> {
        self.tokens.pop_front()
    }

    fn clone_box(&self) -> Box<dyn TokenStream> {
        Box::new(self.clone())
    }
}

// === icu-tokenizer ===

/// Segmentação Unicode (UAX #29) de sentenças e palavras.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnicodeSegmenter {
    /// Se `true`, não emite `<s>`/`</s>`
    pub suppress_tags: bool,
}

/// `icu-tokenizer`
pub type UnicodeTokenizer = Tokenizer<UnicodeSegmenter>;

impl UnicodeTokenizer {
    pub const ID: &'static str = "icu-tokenizer";

    pub fn new(suppress_tags: bool) -> Self {
        Tokenizer::with_segmenter(UnicodeSegmenter { suppress_tags })
    }

    /// Parâmetro opcional: `suppress-tags` (booleano, padrão `false`)
    pub fn from_config(config: &Table) -> Result<Self> {
        let suppress = optional_bool(config, Self::ID, "suppress-tags")?.unwrap_or(false);
        Ok(Self::new(suppress))
    }
}

impl Segmenter for UnicodeSegmenter {
    fn segment(&self, text: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        for (sent_start, sentence) in text.split_sentence_bound_indices() {
            let words: Vec<Token> = sentence
                .split_word_bound_indices()
                .filter(|(_, w)| !w.trim().is_empty())
                .map(|(offset, w)| {
                    let start = sent_start + offset;
                    Token::new(w, start, start + w.len())
                })
                .collect();

            // Sentenças só com espaços não geram marcadores
            if words.is_empty() {
                continue;
            }
            if !self.suppress_tags {
                tokens.push(Token::marker(SENTENCE_START, sent_start));
            }
            let sent_end = sent_start + sentence.trim_end().len();
            tokens.extend(words);
            if !self.suppress_tags {
                tokens.push(Token::marker(SENTENCE_END, sent_end));
            }
        }
        tokens
    }
}

// === standard-tokenizer ===

/// Abreviações comuns que não devem ter o ponto tratado como pontuação
const ABBREVIATIONS: &[&str] = &[
    "Dr", "Dra", "Mr", "Mrs", "Ms", "Prof", "Sr", "Sra", "Jr", "St", "Gov", "Gen", "Sen", "Rep",
    "Capt", "Lt", "Col", "Inc", "Ltd", "Co", "Corp", "vs", "etc", "approx", "dept", "est", "fig",
    "km", "cm", "mm", "kg", "mg", "ml", "vol", "pp", "pg",
];

/// Abreviações de numeração: só valem antes de um número ("No. 5")
const NUMBER_ABBREVIATIONS: &[&str] = &["No", "no", "Nos", "nos"];

/// Separa por espaços e pontuação, preservando abreviações e números decimais.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StandardSegmenter;

/// `standard-tokenizer`
pub type StandardTokenizer = Tokenizer<StandardSegmenter>;

impl StandardTokenizer {
    pub const ID: &'static str = "standard-tokenizer";

    pub fn new() -> Self {
        Tokenizer::with_segmenter(StandardSegmenter)
    }
}

impl Default for StandardTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Segmenter for StandardSegmenter {
    fn segment(&self, text: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut current_start = 0;
        let mut current_text = String::new();
        let chars: Vec<(usize, char)> = text.char_indices().collect();

        for (i, &(byte_pos, ch)) in chars.iter().enumerate() {
            if ch.is_alphanumeric() || (ch == '-' && !current_text.is_empty()) {
                if current_text.is_empty() {
                    current_start = byte_pos;
                }
                current_text.push(ch);
            } else if ch == '.' && !current_text.is_empty() {
                let next_word_is_num = chars[i + 1..]
                    .iter()
                    .map(|&(_, c)| c)
                    .find(|c| !c.is_whitespace())
                    .is_some_and(|c| c.is_numeric());
                let is_abbrev = ABBREVIATIONS.contains(&current_text.as_str())
                    || (next_word_is_num && NUMBER_ABBREVIATIONS.contains(&current_text.as_str()));
                // Número decimal (ex: 3.14)
                let current_is_num = current_text.chars().all(char::is_numeric);
                let next_is_num = chars
                    .get(i + 1)
                    .map(|(_, c)| c.is_numeric())
                    .unwrap_or(false);

                if is_abbrev || (current_is_num && next_is_num) {
                    current_text.push('.');
                } else {
                    flush_token(&mut tokens, &mut current_text, current_start, byte_pos);
                    tokens.push(Token::new(".", byte_pos, byte_pos + 1));
                }
            } else if ch == '\'' || ch == '\u{2019}' {
                if current_text.is_empty() {
                    current_start = byte_pos;
                }
                current_text.push(ch);
            } else if ch.is_whitespace() {
                flush_token(&mut tokens, &mut current_text, current_start, byte_pos);
            } else {
                flush_token(&mut tokens, &mut current_text, current_start, byte_pos);
                tokens.push(Token::new(ch.to_string(), byte_pos, byte_pos + ch.len_utf8()));
            }
        }

        flush_token(&mut tokens, &mut current_text, current_start, text.len());
        tokens
    }
}

/// Fecha o token acumulado e adiciona à lista (se não vazio)
fn flush_token(tokens: &mut Vec<Token>, text: &mut String, start: usize, end: usize) {
    if !text.is_empty() {
        tokens.push(Token::new(std::mem::take(text), start, end));
    }
}

// === character-tokenizer ===

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CharacterSegmenter;

/// `character-tokenizer`: cada caractere é um token
pub type CharacterTokenizer = Tokenizer<CharacterSegmenter>;

impl CharacterTokenizer {
    pub const ID: &'static str = "character-tokenizer";

    pub fn new() -> Self {
        Tokenizer::with_segmenter(CharacterSegmenter)
    }
}

impl Default for CharacterTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Segmenter for CharacterSegmenter {
    fn segment(&self, text: &str) -> Vec<Token> {
        text.char_indices()
            .map(|(i, c)| Token::new(c.to_string(), i, i + c.len_utf8()))
            .collect()
    }
}

// === whitespace-tokenizer ===

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WhitespaceSegmenter;

/// `whitespace-tokenizer`
pub type WhitespaceTokenizer = Tokenizer<WhitespaceSegmenter>;

impl WhitespaceTokenizer {
    pub const ID: &'static str = "whitespace-tokenizer";

    pub fn new() -> Self {
        Tokenizer::with_segmenter(WhitespaceSegmenter)
    }
}

impl Default for WhitespaceTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Segmenter for WhitespaceSegmenter {
    fn segment(&self, text: &str) -> Vec<Token> {
        text.split_whitespace()
            .map(|word| {
                // split_whitespace devolve fatias do próprio texto
                let start = word.as_ptr() as usize - text.as_ptr() as usize;
                Token::new(word, start, start + word.len())
            })
            .collect()
    }
}
