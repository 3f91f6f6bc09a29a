use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::{parse_provider_model, EmbeddingsConfig};
use crate::error::{Result, SunsteadError};
use crate::quota::{HourlyQuota, QuotaUsage};

use super::api::{default_base_url, ApiConfig, EmbeddingApiClient};

enum EmbeddingBackend {
    Local {
        model: Arc<Mutex<TextEmbedding>>,
        batch_size: usize,
    },
    Api {
        client: EmbeddingApiClient,
    },
}

pub struct EmbeddingProvider {
    backend: EmbeddingBackend,
    dimensions: usize,
    quota: Arc<HourlyQuota>,
}

impl EmbeddingProvider {
    pub fn new(config: &EmbeddingsConfig) -> Result<Self> {
        let (provider, model_name) = parse_provider_model(&config.model);
        let quota = Arc::new(HourlyQuota::new("embeddings", config.hourly_quota));

        if provider == "local" {
            Self::new_local(config, model_name, quota)
        } else {
            Self::new_api(config, provider, model_name, quota)
        }
    }

    fn new_local(
        config: &EmbeddingsConfig,
        model_name: &str,
        quota: Arc<HourlyQuota>,
    ) -> Result<Self> {
        let embedding_model = match model_name {
            "BAAI/bge-small-en-v1.5" | "bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
            "BAAI/bge-base-en-v1.5" | "bge-base-en-v1.5" => EmbeddingModel::BGEBaseENV15,
            "BAAI/bge-large-en-v1.5" | "bge-large-en-v1.5" => EmbeddingModel::BGELargeENV15,
            "all-MiniLM-L6-v2" | "sentence-transformers/all-MiniLM-L6-v2" => {
                EmbeddingModel::AllMiniLML6V2
            }
            "all-MiniLM-L12-v2" | "sentence-transformers/all-MiniLM-L12-v2" => {
                EmbeddingModel::AllMiniLML12V2
            }
            _ => EmbeddingModel::BGESmallENV15,
        };

        let model = TextEmbedding::try_new(
            InitOptions::new(embedding_model).with_show_download_progress(true),
        )
        .map_err(|e| SunsteadError::Embedding(e.to_string()))?;

        Ok(Self {
            backend: EmbeddingBackend::Local {
                model: Arc::new(Mutex::new(model)),
                batch_size: config.batch_size,
            },
            dimensions: config.dimensions,
            quota,
        })
    }

    fn new_api(
        config: &EmbeddingsConfig,
        provider: &str,
        model_name: &str,
        quota: Arc<HourlyQuota>,
    ) -> Result<Self> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| default_base_url(provider).to_string());

        let client = EmbeddingApiClient::new(
            ApiConfig {
                base_url,
                api_key: config.api_key.clone(),
                model: model_name.to_string(),
                timeout_secs: config.timeout_secs,
                max_retries: config.max_retries,
            },
            quota.clone(),
        )?;

        Ok(Self {
            backend: EmbeddingBackend::Api { client },
            dimensions: config.dimensions,
            quota,
        })
    }

    pub async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        match &self.backend {
            EmbeddingBackend::Local { model, batch_size } => {
                let mut model = model.lock().await;
                model
                    .embed(texts, Some(*batch_size))
                    .map_err(|e| SunsteadError::Embedding(e.to_string()))
            }
            EmbeddingBackend::Api { client } => {
                let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
                client.embed(&refs).await
            }
        }
    }

    pub async fn embed_single(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed(vec![text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| SunsteadError::Embedding("No embedding generated".to_string()))
    }

    pub async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        match &self.backend {
            EmbeddingBackend::Local { .. } => {
                // Local models use query: prefix
                let prefixed = format!("query: {query}");
                self.embed_single(&prefixed).await
            }
            EmbeddingBackend::Api { .. } => self.embed_single(query).await,
        }
    }

    pub async fn embed_passages(&self, passages: Vec<String>) -> Result<Vec<Vec<f32>>> {
        match &self.backend {
            EmbeddingBackend::Local { .. } => {
                let prefixed: Vec<String> = passages
                    .into_iter()
                    .map(|p| format!("passage: {p}"))
                    .collect();
                self.embed(prefixed).await
            }
            EmbeddingBackend::Api { .. } => self.embed(passages).await,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn quota_usage(&self) -> QuotaUsage {
        self.quota.usage()
    }
}

impl Clone for EmbeddingProvider {
    fn clone(&self) -> Self {
        let backend = match &self.backend {
            EmbeddingBackend::Local { model, batch_size } => EmbeddingBackend::Local {
                model: Arc::clone(model),
                batch_size: *batch_size,
            },
            EmbeddingBackend::Api { client } => EmbeddingBackend::Api {
                client: client.clone(),
            },
        };
        Self {
            backend,
            dimensions: self.dimensions,
            quota: Arc::clone(&self.quota),
        }
    }
}
