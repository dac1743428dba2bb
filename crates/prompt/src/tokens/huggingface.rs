//! Hugging Face `tokenizer.json` counters.
//!
//! Loaded tokenizers are cached per path for the life of the process.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex};

use async_trait::async_trait;
use serene_core::{TokenCounter, TokenizerError};
use tokenizers::Tokenizer;

static CACHE: LazyLock<Mutex<HashMap<PathBuf, Arc<Tokenizer>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn shared_tokenizer(path: &Path) -> Result<Arc<Tokenizer>, TokenizerError> {
    let mut cache = CACHE
        .lock()
        .map_err(|_| TokenizerError::LoadFailed("tokenizer cache poisoned".into()))?;
    if let Some(tokenizer) = cache.get(path) {
        return Ok(Arc::clone(tokenizer));
    }

    tracing::debug!(path = %path.display(), "Loading tokenizer.json");
    let tokenizer = Tokenizer::from_file(path)
        .map_err(|e| TokenizerError::LoadFailed(format!("{}: {e}", path.display())))?;
    let tokenizer = Arc::new(tokenizer);
    cache.insert(path.to_path_buf(), Arc::clone(&tokenizer));
    Ok(tokenizer)
}

pub struct HuggingFaceCounter {
    name: String,
    tokenizer: Arc<Tokenizer>,
}

impl HuggingFaceCounter {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TokenizerError> {
        let path = path.as_ref();
        Ok(Self {
            name: format!("hf:{}", path.display()),
            tokenizer: shared_tokenizer(path)?,
        })
    }
}

#[async_trait]
impl TokenCounter for HuggingFaceCounter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn count_tokens(&self, text: &str) -> Result<usize, TokenizerError> {
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| TokenizerError::EncodeFailed(e.to_string()))?;
        Ok(encoding.get_ids().len())
    }
}
