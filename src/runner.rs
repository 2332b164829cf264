use crate::aggregation;
use crate::client::TranslationClient;
use crate::config::{ComparisonConfig, Config, TranslationConfig};
use crate::models::{
    AggregatedGroup, ComparisonOutcome, ComparisonRequest, RunResults, StoredComparison,
    TranslationOutcome, TranslationRequest,
};
use crate::storage::DocumentStore;
use anyhow::{Context, Result};
use tracing::{info, warn};

/// Main runner that drives translations and comparisons against the backend
pub struct Runner {
    config: Config,
    client: TranslationClient,
    store: Option<DocumentStore>,
}

impl Runner {
    /// Create a new runner with the given configuration
    pub fn new(config: Config) -> Result<Self> {
        let client = TranslationClient::new(&config.backend)?;
        let store = config.storage.path.as_ref().map(DocumentStore::new);

        Ok(Self {
            config,
            client,
            store,
        })
    }

    /// Run every translation and comparison in the configuration.
    ///
    /// All entries are validated up front so a bad entry late in the file
    /// does not leave a half-finished run behind.
    pub async fn run(&mut self) -> Result<RunResults> {
        self.config.validate()?;

        let mut results = RunResults::default();

        let translations = self.config.translations.clone();
        let total = translations.len();
        for (index, entry) in translations.iter().enumerate() {
            let outcome = self
                .run_translation(entry, index + 1, total)
                .await
                .with_context(|| format!("Failed to run translation #{}", index + 1))?;
            results.translations.push(outcome);
        }

        let comparisons = self.config.comparisons.clone();
        let total = comparisons.len();
        for (index, entry) in comparisons.iter().enumerate() {
            let outcome = self
                .run_comparison(entry, index + 1, total)
                .await
                .with_context(|| format!("Failed to compare message: {}", entry.message))?;
            results.comparisons.push(outcome);
        }

        Ok(results)
    }

    /// Look up stored comparisons for every configured message without
    /// contacting the backend
    pub fn history(&self) -> Result<Vec<ComparisonOutcome>> {
        let Some(store) = &self.store else {
            anyhow::bail!("No storage path configured; nothing to look up");
        };

        self.config
            .comparisons
            .iter()
            .map(|entry| -> Result<ComparisonOutcome> {
                Ok(ComparisonOutcome {
                    title: entry.title.clone(),
                    request: entry.to_request(),
                    groups: Vec::new(),
                    history: store.find_comparisons(&entry.message)?,
                })
            })
            .collect()
    }

    /// Stored single-model translations, oldest first
    pub fn stored_translations(&self) -> Result<Vec<TranslationOutcome>> {
        let Some(store) = &self.store else {
            anyhow::bail!("No storage path configured; nothing to look up");
        };

        Ok(store
            .translations()?
            .into_iter()
            .map(|stored| TranslationOutcome {
                request: stored.request,
                translation: stored.translation,
            })
            .collect())
    }

    async fn run_translation(
        &mut self,
        entry: &TranslationConfig,
        num: usize,
        total: usize,
    ) -> Result<TranslationOutcome> {
        info!("Translating message {}/{} with {}", num, total, entry.model);

        let mut request = entry.to_request();
        let mut translation = self.client.translate(&request).await?;
        self.persist_translation(&request, &translation);

        if !entry.refinements.is_empty() {
            info!(refinements = ?entry.refinements, "Refining translation {}/{}", num, total);
            request = request.refined(&translation, &entry.refinements);
            translation = self.client.translate(&request).await?;
            self.persist_translation(&request, &translation);
        }

        Ok(TranslationOutcome {
            request,
            translation,
        })
    }

    async fn run_comparison(
        &mut self,
        entry: &ComparisonConfig,
        num: usize,
        total: usize,
    ) -> Result<ComparisonOutcome> {
        info!(
            "Comparing {} model(s) for message {}/{}",
            entry.selected_models.len(),
            num,
            total
        );

        let request = entry.to_request();
        let records = self.client.compare(&request).await?;

        info!("Ranking {} evaluation(s) for message {}/{}", records.len(), num, total);
        let groups = aggregation::aggregate(&records).context("Failed to rank evaluations")?;

        self.persist_comparison(&request, &groups);
        let history = self.lookup_history(&request.message);

        Ok(ComparisonOutcome {
            title: entry.title.clone(),
            request,
            groups,
            history,
        })
    }

    /// Store a comparison if storage is configured; failures are logged only
    fn persist_comparison(&self, request: &ComparisonRequest, groups: &[AggregatedGroup]) {
        if let Some(store) = &self.store {
            match store.insert_comparison(request, groups) {
                Ok(_) => info!("Comparison stored to: {}", store.path().display()),
                Err(e) => warn!("Failed to store comparison: {:#}", e),
            }
        }
    }

    /// Store a translation if storage is configured; failures are logged only
    fn persist_translation(&self, request: &TranslationRequest, translation: &str) {
        if let Some(store) = &self.store {
            if let Err(e) = store.insert_translation(request, translation) {
                warn!("Failed to store translation: {:#}", e);
            }
        }
    }

    fn lookup_history(&self, message: &str) -> Vec<StoredComparison> {
        let Some(store) = &self.store else {
            return Vec::new();
        };
        store.find_comparisons(message).unwrap_or_else(|e| {
            warn!("Failed to fetch stored comparisons: {:#}", e);
            Vec::new()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackendConfig, StorageConfig};
    use crate::models::Refinement;
    use mockito::Matcher;
    use serde_json::json;
    use tempfile::tempdir;

    fn create_test_config(url: &str, storage_path: Option<String>) -> Config {
        Config {
            backend: BackendConfig {
                api_endpoint: url.to_string(),
                rate_limit_rps: 0.0,
                timeout_secs: 5,
            },
            storage: StorageConfig { path: storage_path },
            comparisons: vec![ComparisonConfig {
                title: Some("greeting".to_string()),
                source_language: "english".to_string(),
                destination_language: "french".to_string(),
                message: "hello".to_string(),
                selected_models: vec!["gpt-4o-mini".to_string(), "deepl".to_string()],
                temperature: 0.3,
            }],
            translations: vec![],
        }
    }

    fn comparison_body() -> String {
        json!({
            "validatedTranslations": [
                {
                    "inputText": "hello",
                    "inputModel": "deepl",
                    "outputText": "salut",
                    "model": "gemini-flash",
                    "evaluation": "{\"score\":6,\"comment\":\"ok\"}"
                },
                {
                    "inputText": "hello",
                    "inputModel": "gpt-4o-mini",
                    "outputText": "bonjour",
                    "model": "gemini-flash",
                    "evaluation": "{\"score\":8,\"comment\":\"good\"}"
                }
            ]
        })
        .to_string()
    }

    async fn mock_compare(server: &mut mockito::ServerGuard, body: String) -> mockito::Mock {
        server
            .mock("POST", "/compareTranslate")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_run_ranks_and_stores_comparison() {
        let mut server = mockito::Server::new_async().await;
        let mock = mock_compare(&mut server, comparison_body()).await;

        let temp_dir = tempdir().unwrap();
        let store_path = temp_dir.path().join("store.jsonl");
        let config = create_test_config(
            &server.url(),
            Some(store_path.to_str().unwrap().to_string()),
        );

        let mut runner = Runner::new(config).unwrap();
        let results = runner.run().await.unwrap();

        mock.assert_async().await;
        assert_eq!(results.comparisons.len(), 1);
        let outcome = &results.comparisons[0];
        assert_eq!(outcome.title.as_deref(), Some("greeting"));
        assert_eq!(outcome.groups.len(), 1);
        assert_eq!(outcome.groups[0].models[0].model_name, "gpt-4o-mini");
        assert_eq!(outcome.groups[0].models[1].model_name, "deepl");

        // the fresh comparison is already part of the history
        assert_eq!(outcome.history.len(), 1);
        assert_eq!(outcome.history[0].comparison, outcome.groups);
        assert!(store_path.exists());
    }

    #[tokio::test]
    async fn test_run_without_storage_has_no_history() {
        let mut server = mockito::Server::new_async().await;
        let _mock = mock_compare(&mut server, comparison_body()).await;

        let mut runner = Runner::new(create_test_config(&server.url(), None)).unwrap();
        let results = runner.run().await.unwrap();

        assert!(results.comparisons[0].history.is_empty());
        assert_eq!(results.comparisons[0].groups.len(), 1);
    }

    #[tokio::test]
    async fn test_storage_failure_does_not_fail_run() {
        let mut server = mockito::Server::new_async().await;
        let _mock = mock_compare(&mut server, comparison_body()).await;

        // a directory where the store file should be cannot be opened for append
        let temp_dir = tempdir().unwrap();
        let config = create_test_config(
            &server.url(),
            Some(temp_dir.path().to_str().unwrap().to_string()),
        );

        let mut runner = Runner::new(config).unwrap();
        let results = runner.run().await.unwrap();

        assert_eq!(results.comparisons[0].groups.len(), 1);
        assert!(results.comparisons[0].history.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_evaluation_fails_run() {
        let mut server = mockito::Server::new_async().await;
        let body = json!({
            "validatedTranslations": [{
                "inputText": "hello",
                "inputModel": "deepl",
                "outputText": "salut",
                "model": "gemini-flash",
                "evaluation": "score: six"
            }]
        })
        .to_string();
        let _mock = mock_compare(&mut server, body).await;

        let temp_dir = tempdir().unwrap();
        let store_path = temp_dir.path().join("store.jsonl");
        let config = create_test_config(
            &server.url(),
            Some(store_path.to_str().unwrap().to_string()),
        );

        let mut runner = Runner::new(config).unwrap();
        let err = runner.run().await.unwrap_err();

        let message = format!("{:#}", err);
        assert!(message.contains("Failed to rank evaluations"));
        assert!(message.contains("malformed"));
        // nothing is persisted for a failed aggregation
        assert!(!store_path.exists());
    }

    #[tokio::test]
    async fn test_null_field_is_reported_as_invalid_record() {
        let mut server = mockito::Server::new_async().await;
        let body = json!({
            "validatedTranslations": [{
                "inputText": "hello",
                "inputModel": null,
                "outputText": "salut",
                "model": "gemini-flash",
                "evaluation": "{\"score\":6,\"comment\":\"ok\"}"
            }]
        })
        .to_string();
        let _mock = mock_compare(&mut server, body).await;

        let mut runner = Runner::new(create_test_config(&server.url(), None)).unwrap();
        let err = runner.run().await.unwrap_err();

        let message = format!("{:#}", err);
        assert!(message.contains("Failed to rank evaluations"));
        assert!(message.contains("`inputModel` is missing or empty"));
        assert!(!message.contains("Failed to decode response"));
    }

    #[tokio::test]
    async fn test_invalid_entry_stops_before_backend() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let mut config = create_test_config(&server.url(), None);
        config.comparisons[0].selected_models.clear();

        let mut runner = Runner::new(config).unwrap();
        let err = runner.run().await.unwrap_err();

        mock.assert_async().await;
        assert!(format!("{:#}", err).contains("at least one model"));
    }

    #[tokio::test]
    async fn test_translation_with_refinement() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("POST", "/translate")
            .match_body(Matcher::PartialJson(json!({ "translationText": "", "simpler": false })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"translate": "Je vous souhaite le bonjour"}"#)
            .create_async()
            .await;
        let second = server
            .mock("POST", "/translate")
            .match_body(Matcher::PartialJson(json!({
                "translationText": "Je vous souhaite le bonjour",
                "simpler": true
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"translate": "Bonjour"}"#)
            .create_async()
            .await;

        let temp_dir = tempdir().unwrap();
        let store_path = temp_dir.path().join("store.jsonl");
        let mut config = create_test_config(
            &server.url(),
            Some(store_path.to_str().unwrap().to_string()),
        );
        config.comparisons.clear();
        config.translations.push(TranslationConfig {
            model: "gemini-flash".to_string(),
            source_language: "english".to_string(),
            destination_language: "french".to_string(),
            message: "good morning".to_string(),
            temperature: 0.3,
            refinements: vec![Refinement::Simpler],
        });

        let mut runner = Runner::new(config).unwrap();
        let results = runner.run().await.unwrap();

        first.assert_async().await;
        second.assert_async().await;
        assert_eq!(results.translations[0].translation, "Bonjour");
        assert!(results.translations[0].request.simpler);

        let stored = DocumentStore::new(&store_path).translations().unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[test]
    fn test_history_reads_store_only() {
        let temp_dir = tempdir().unwrap();
        let store_path = temp_dir.path().join("store.jsonl");
        let config = create_test_config(
            "http://127.0.0.1:9",
            Some(store_path.to_str().unwrap().to_string()),
        );

        let store = DocumentStore::new(&store_path);
        store
            .insert_comparison(&config.comparisons[0].to_request(), &[])
            .unwrap();

        let runner = Runner::new(config).unwrap();
        let outcomes = runner.history().unwrap();

        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].groups.is_empty());
        assert_eq!(outcomes[0].history.len(), 1);
        assert!(runner.stored_translations().unwrap().is_empty());
    }

    #[test]
    fn test_history_requires_storage() {
        let runner = Runner::new(create_test_config("http://127.0.0.1:9", None)).unwrap();
        assert!(runner.history().is_err());
    }

    #[tokio::test]
    async fn test_backend_error_names_message() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/compareTranslate")
            .with_status(503)
            .create_async()
            .await;

        let mut runner = Runner::new(create_test_config(&server.url(), None)).unwrap();
        let err = runner.run().await.unwrap_err();
        assert!(err.to_string().contains("Failed to compare message: hello"));
    }
}
