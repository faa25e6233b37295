//! # Features de Observação para Rotulação de Sequências
//!
//! Para cada posição de uma [`Sequence`], extrai features binárias nomeadas
//! que o CRF usa para pontuar rótulos. As features capturam informações
//! ortográficas, lexicais e contextuais do símbolo.
//!
//! ## Features Implementadas
//!
//! ### Features do símbolo atual
//! - Forma da palavra (lowercase) e `bias`
//! - Capitalização: is_capitalized, is_all_caps, is_mixed_case
//! - Prefixos e sufixos de 2, 3 e 4 caracteres
//! - Contém hífen, ponto; é apenas dígito; é pontuação
//!
//! ### Features de contexto (janela de 2 símbolos)
//! - Palavras anteriores e posteriores, BOS/EOS
//! - Bigrama de contexto (anterior + posterior)
//!
//! ## Vocabulário
//!
//! O [`SequenceAnalyzer`] converte nomes em ids densos através de um
//! [`FeatureVocabulary`]. Em treino, nomes novos recebem ids sob demanda
//! ([`SequenceAnalyzer::train_analyze`]); em teste o vocabulário está
//! congelado e nomes desconhecidos são omitidos ([`SequenceAnalyzer::analyze`]).

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::crf::{read_json, write_json, LabelId};
use crate::error::Result;

/// Id denso de uma feature de observação
pub type FeatureId = usize;

/// Arquivo do vocabulário dentro do prefixo do modelo
pub const FEATURE_FILE: &str = "feature.mapping.json";

/// Uma posição da sequência: símbolo, rótulo (após a rotulação) e features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub symbol: String,
    pub label: Option<LabelId>,
    /// Pares (id, valor), ordenados por id e sem ids repetidos
    pub features: Vec<(FeatureId, f64)>,
}

impl Observation {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            label: None,
            features: Vec::new(),
        }
    }
}

/// Sequência de observações (tipicamente uma sentença).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    observations: Vec<Observation>,
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_symbols<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            observations: symbols.into_iter().map(Observation::new).collect(),
        }
    }

    pub fn push(&mut self, symbol: impl Into<String>) {
        self.observations.push(Observation::new(symbol));
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn clear(&mut self) {
        self.observations.clear();
    }

    pub fn symbol(&self, i: usize) -> &str {
        &self.observations[i].symbol
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Observation> {
        self.observations.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Observation> {
        self.observations.iter_mut()
    }

    /// Rótulos atribuídos, na ordem das posições (`None` se ainda não rotulada)
    pub fn labels(&self) -> Option<Vec<LabelId>> {
        self.observations.iter().map(|o| o.label).collect()
    }
}

/// Mapeamento nome de feature → id denso.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVocabulary {
    ids: HashMap<String, FeatureId>,
}

impl FeatureVocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<FeatureId> {
        self.ids.get(name).copied()
    }

    /// Id de `name`, criando um novo se necessário
    pub fn get_or_insert(&mut self, name: &str) -> FeatureId {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.ids.len();
        self.ids.insert(name.to_string(), id);
        id
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Maior id em uso, se houver
    pub fn max_id(&self) -> Option<FeatureId> {
        self.ids.values().copied().max()
    }
}

/// Função de observação: acrescenta em `out` as features da posição `i`.
pub type ObservationFn = fn(&Sequence, usize, &mut Vec<(String, f64)>);

/// Forma da palavra, capitalização e padrões numéricos/pontuação
pub fn word_shape_features(seq: &Sequence, i: usize, out: &mut Vec<(String, f64)>) {
    let word = seq.symbol(i);
    out.push((format!("word={}", word.to_lowercase()), 1.0));
    out.push(("bias".to_string(), 1.0));

    let first_char_upper = word.chars().next().is_some_and(char::is_uppercase);
    let all_upper = word.chars().all(|c| c.is_uppercase() || !c.is_alphabetic());
    let has_upper_in_middle = word.chars().skip(1).any(char::is_uppercase);

    if first_char_upper {
        out.push(("is_capitalized".to_string(), 1.0));
    }
    if all_upper && word.chars().count() > 1 {
        out.push(("is_all_caps".to_string(), 1.0));
    }
    if has_upper_in_middle {
        out.push(("is_mixed_case".to_string(), 1.0));
    }

    if !word.is_empty() && word.chars().all(char::is_numeric) {
        out.push(("is_digit".to_string(), 1.0));
    }
    if word.contains('-') {
        out.push(("has_hyphen".to_string(), 1.0));
    }
    if word.contains('.') {
        out.push(("has_period".to_string(), 1.0));
    }
    let mut chars = word.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if !c.is_alphanumeric() {
            out.push(("is_punctuation".to_string(), 1.0));
        }
    }
}

/// Prefixos e sufixos de 2 a 4 caracteres
pub fn affix_features(seq: &Sequence, i: usize, out: &mut Vec<(String, f64)>) {
    let chars: Vec<char> = seq.symbol(i).chars().collect();
    for n in 2..=4 {
        if chars.len() >= n {
            let prefix: String = chars[..n].iter().collect();
            let suffix: String = chars[chars.len() - n..].iter().collect();
            out.push((format!("prefix{n}={}", prefix.to_lowercase()), 1.0));
            out.push((format!("suffix{n}={}", suffix.to_lowercase()), 1.0));
        }
    }
}

/// Janela de contexto de dois símbolos para cada lado
pub fn context_features(seq: &Sequence, i: usize, out: &mut Vec<(String, f64)>) {
    let len = seq.len();

    if i > 0 {
        out.push((format!("prev_word={}", seq.symbol(i - 1).to_lowercase()), 1.0));
    } else {
        out.push(("BOS".to_string(), 1.0));
    }
    if i > 1 {
        out.push((format!("prev2_word={}", seq.symbol(i - 2).to_lowercase()), 1.0));
    }

    if i + 1 < len {
        out.push((format!("next_word={}", seq.symbol(i + 1).to_lowercase()), 1.0));
    } else {
        out.push(("EOS".to_string(), 1.0));
    }
    if i + 2 < len {
        out.push((format!("next2_word={}", seq.symbol(i + 2).to_lowercase()), 1.0));
    }

    if i > 0 && i + 1 < len {
        out.push((
            format!(
                "bigram={}_{}",
                seq.symbol(i - 1).to_lowercase(),
                seq.symbol(i + 1).to_lowercase()
            ),
            1.0,
        ));
    }
}

/// Extrai features por posição e as converte em ids.
#[derive(Clone)]
pub struct SequenceAnalyzer {
    vocabulary: FeatureVocabulary,
    obs_fns: Vec<ObservationFn>,
}

impl fmt::Debug for SequenceAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequenceAnalyzer")
            .field("features", &self.vocabulary.len())
            .field("obs_fns", &self.obs_fns.len())
            .finish()
    }
}

impl SequenceAnalyzer {
    pub fn new(vocabulary: FeatureVocabulary, obs_fns: Vec<ObservationFn>) -> Self {
        Self { vocabulary, obs_fns }
    }

    /// Analisador de POS: forma, afixos e contexto, vocabulário vazio
    pub fn default_pos_analyzer() -> Self {
        Self::new(
            FeatureVocabulary::new(),
            vec![word_shape_features, affix_features, context_features],
        )
    }

    /// Analisador de POS com o vocabulário salvo em `prefix/feature.mapping.json`
    pub fn load(prefix: impl AsRef<Path>) -> Result<Self> {
        let path = Self::vocabulary_path(prefix.as_ref());
        let vocabulary: FeatureVocabulary = read_json(&path)?;
        info!(path = %path.display(), features = vocabulary.len(), "vocabulário carregado");
        Ok(Self {
            vocabulary,
            ..Self::default_pos_analyzer()
        })
    }

    /// Grava o vocabulário em `prefix/feature.mapping.json`
    pub fn save(&self, prefix: impl AsRef<Path>) -> Result<()> {
        write_json(&Self::vocabulary_path(prefix.as_ref()), &self.vocabulary)
    }

    pub fn vocabulary_path(prefix: &Path) -> PathBuf {
        prefix.join(FEATURE_FILE)
    }

    pub fn vocabulary(&self) -> &FeatureVocabulary {
        &self.vocabulary
    }

    /// Preenche as features de cada posição com o vocabulário congelado.
    ///
    /// Features nunca vistas no treino são omitidas.
    pub fn analyze(&self, seq: &mut Sequence) {
        let named = self.named_features(seq);
        for (obs, names) in seq.iter_mut().zip(named) {
            let ids = names
                .into_iter()
                .filter_map(|(name, value)| self.vocabulary.get(&name).map(|id| (id, value)));
            obs.features = collapse(ids);
        }
    }

    /// Como [`analyze`](Self::analyze), mas atribui ids a features novas.
    pub fn train_analyze(&mut self, seq: &mut Sequence) {
        let named = self.named_features(seq);
        for (obs, names) in seq.iter_mut().zip(named) {
            let ids = names
                .into_iter()
                .map(|(name, value)| (self.vocabulary.get_or_insert(&name), value));
            obs.features = collapse(ids);
        }
    }

    fn named_features(&self, seq: &Sequence) -> Vec<Vec<(String, f64)>> {
        (0..seq.len())
            .map(|i| {
                let mut out = Vec::new();
                for obs_fn in &self.obs_fns {
                    obs_fn(seq, i, &mut out);
                }
                out
            })
            .collect()
    }
}

/// Ordena por id e soma valores de ids repetidos
fn collapse(ids: impl Iterator<Item = (FeatureId, f64)>) -> Vec<(FeatureId, f64)> {
    let mut features: Vec<(FeatureId, f64)> = ids.collect();
    features.sort_by_key(|&(id, _)| id);
    let mut collapsed: Vec<(FeatureId, f64)> = Vec::with_capacity(features.len());
    for (id, value) in features {
        match collapsed.last_mut() {
            Some((last, total)) if *last == id => *total += value,
            _ => collapsed.push((id, value)),
        }
    }
    collapsed
}
