use std::{
    fmt,
    hash::{Hash, Hasher},
    str::FromStr,
};

use siphasher::sip::SipHasher13;

use crate::{
    config_db::{ConfigDb, EMBEDDER_KEY},
    error::{Error, Result},
    model_manager::{ColbertEmbedder, ModelManager, resolve_model_id},
    scoring::normalize,
};

/// Turns text into a single unit-length vector.
pub trait Embedder: Send + Sync {
    /// Short backend name, persisted alongside the vectors it produced.
    fn name(&self) -> &'static str;

    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Available embedding backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum EmbedderKind {
    /// Local ColBERT model, mean-pooled to one vector.
    #[default]
    Colbert,
    /// Deterministic feature hashing; no model download.
    Hash,
}

impl EmbedderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EmbedderKind::Colbert => "colbert",
            EmbedderKind::Hash => "hash",
        }
    }
}

impl fmt::Display for EmbedderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmbedderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "colbert" => Ok(EmbedderKind::Colbert),
            "hash" => Ok(EmbedderKind::Hash),
            other => Err(Error::Config(format!("unknown embedder '{other}'"))),
        }
    }
}

/// Build the embedder for this invocation.
///
/// The backend comes from `kind`, then the store's recorded embedder, then
/// the default. The ColBERT model id comes from `model`, then
/// `CVSEARCH_MODEL`, then the stored `model_name` setting, then the default
/// model.
pub fn resolve_embedder(
    kind: Option<EmbedderKind>,
    model: Option<&str>,
    config_db: &ConfigDb,
) -> Result<Box<dyn Embedder>> {
    let kind = match kind {
        Some(kind) => kind,
        None => config_db
            .get_setting(EMBEDDER_KEY)?
            .map(|name| name.parse::<EmbedderKind>())
            .transpose()?
            .unwrap_or_default(),
    };

    let embedder: Box<dyn Embedder> = match kind {
        EmbedderKind::Hash => Box::new(HashEmbedder::default()),
        EmbedderKind::Colbert => {
            let (model_id, source) = resolve_model_id(model, config_db)?;
            tracing::debug!(
                model = %model_id,
                source = source.as_str(),
                "using ColBERT embedder"
            );
            let manager = ModelManager::with_model_id(model_id);
            Box::new(ColbertEmbedder::new(manager))
        }
    };
    Ok(embedder)
}

// Changing these keys changes every stored hash vector.
const HASH_KEY_0: u64 = 0x0123_4567_89ab_cdef;
const HASH_KEY_1: u64 = 0xfedc_ba98_7654_3210;

pub const DEFAULT_HASH_DIMENSION: usize = 384;

/// Feature-hashing embedder over lowercase word tokens and word bigrams.
///
/// Each token lands in one bucket with a hash-derived sign; the result is
/// L2-normalized. Texts sharing vocabulary end up close in cosine distance,
/// which is enough for keyword-heavy fields like skills, and the output is
/// stable across runs and platforms.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_DIMENSION)
    }
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn hash(token: &str, salt: u8) -> u64 {
        let mut hasher = SipHasher13::new_with_keys(HASH_KEY_0, HASH_KEY_1);
        salt.hash(&mut hasher);
        token.hash(&mut hasher);
        hasher.finish()
    }

    fn add(&self, vector: &mut [f32], token: &str, weight: f32) {
        let bucket = (Self::hash(token, 0) % self.dimension as u64) as usize;
        let sign = if Self::hash(token, 1) & 1 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#'))
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

impl Embedder for HashEmbedder {
    fn name(&self) -> &'static str {
        "hash"
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let tokens = tokenize(text);
        let mut vector = vec![0.0f32; self.dimension];

        for token in &tokens {
            self.add(&mut vector, token, 1.0);
        }
        for pair in tokens.windows(2) {
            self.add(&mut vector, &format!("{} {}", pair[0], pair[1]), 0.5);
        }

        normalize(&mut vector);
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{cosine_distance, l2_norm};

    #[test]
    fn output_is_unit_length() {
        let v = HashEmbedder::default().embed("Rust and Python").unwrap();
        assert_eq!(v.len(), DEFAULT_HASH_DIMENSION);
        assert!((l2_norm(&v) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn deterministic() {
        let e = HashEmbedder::default();
        assert_eq!(e.embed("kubernetes").unwrap(), e.embed("kubernetes").unwrap());
    }

    #[test]
    fn case_and_punctuation_insensitive() {
        let e = HashEmbedder::default();
        assert_eq!(
            e.embed("Rust, Python").unwrap(),
            e.embed("rust python").unwrap()
        );
    }

    #[test]
    fn shared_vocabulary_is_closer() {
        let e = HashEmbedder::default();
        let query = e.embed("python developer").unwrap();
        let near = e.embed("Senior Python developer, Django").unwrap();
        let far = e.embed("Pastry chef, French cuisine").unwrap();

        assert!(cosine_distance(&query, &near) < cosine_distance(&query, &far));
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let v = HashEmbedder::new(8).embed("  ").unwrap();
        assert_eq!(v, vec![0.0; 8]);
    }

    #[test]
    fn keeps_language_symbols() {
        assert_eq!(tokenize("C++ and C#"), ["c++", "and", "c#"]);
    }

    #[test]
    fn resolve_prefers_explicit_kind() {
        let tmp = tempfile::tempdir().unwrap();
        let db = ConfigDb::open(&tmp.path().join("config.redb")).unwrap();
        db.set_setting(EMBEDDER_KEY, "colbert").unwrap();

        let embedder =
            resolve_embedder(Some(EmbedderKind::Hash), None, &db).unwrap();
        assert_eq!(embedder.name(), "hash");
    }

    #[test]
    fn resolve_falls_back_to_recorded_embedder() {
        let tmp = tempfile::tempdir().unwrap();
        let db = ConfigDb::open(&tmp.path().join("config.redb")).unwrap();

        assert_eq!(resolve_embedder(None, None, &db).unwrap().name(), "colbert");

        db.set_setting(EMBEDDER_KEY, "hash").unwrap();
        assert_eq!(resolve_embedder(None, None, &db).unwrap().name(), "hash");

        db.set_setting(EMBEDDER_KEY, "bogus").unwrap();
        assert!(resolve_embedder(None, None, &db).is_err());
    }

    #[test]
    fn kind_parses() {
        assert_eq!("hash".parse::<EmbedderKind>().unwrap(), EmbedderKind::Hash);
        assert_eq!(EmbedderKind::default().as_str(), "colbert");
        assert!("openai".parse::<EmbedderKind>().is_err());
    }
}
