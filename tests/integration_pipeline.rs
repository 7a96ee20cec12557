#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

use doc_rag::RagError;
use doc_rag::chat::{NO_RELEVANT_INFORMATION, Orchestrator};
use doc_rag::config::{Config, Credentials};
use doc_rag::database::{DocumentCatalog, DocumentStore};
use doc_rag::embeddings::{ConfiguredProviders, ProviderFactory, ProviderKind};
use doc_rag::generation::create_generator;
use doc_rag::ingest::Ingestor;
use serde_json::{Value, json};
use tempfile::TempDir;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const MANUAL: &str = "# Espresso machine manual\n\n\
    Fill the water tank with cold filtered water before brewing.\n\n\
    Grind the beans finely and tamp them firmly into the portafilter.\n\n\
    Descale the boiler every two months using citric acid solution.\n\n\
    The warranty covers the pump and boiler for three years.\n";

/// Bag-of-words embeddings so that shared words raise similarity
struct KeywordEmbeddings;

fn keyword_vector(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0_f32; ProviderKind::OpenAi.dimension()];
    for word in text.split_whitespace() {
        let word = word
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        if word.is_empty() {
            continue;
        }
        let bucket = word
            .bytes()
            .fold(17_usize, |h, b| h.wrapping_mul(131).wrapping_add(usize::from(b)));
        let n = vector.len();
        vector[bucket % n] += 1.0;
    }
    vector
}

impl Respond for KeywordEmbeddings {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).expect("request body is JSON");
        let data: Vec<Value> = body["input"]
            .as_array()
            .expect("input array")
            .iter()
            .enumerate()
            .map(|(index, text)| {
                json!({
                    "object": "embedding",
                    "index": index,
                    "embedding": keyword_vector(text.as_str().unwrap_or_default()),
                })
            })
            .collect();
        ResponseTemplate::new(200).set_body_json(json!({"object": "list", "data": data}))
    }
}

fn config_for(server: &MockServer, dir: &TempDir) -> Config {
    let mut config = Config {
        base_dir: dir.path().to_path_buf(),
        ..Config::default()
    };
    config.openai.base_url = format!("{}/v1", server.uri());
    config.google.base_url = format!("{}/v1beta", server.uri());
    config.chunking.chunk_size_tokens = 20;
    config.chunking.chunk_overlap_tokens = 4;
    config.retrieval.top_k = 2;
    config.http.retry_attempts = 1;
    config
}

async fn mount_openai(server: &MockServer, reply: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(KeywordEmbeddings)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": reply},
                "finish_reason": "stop"
            }]
        })))
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn upload_then_answer_from_the_stored_document() {
    let server = MockServer::start().await;
    mount_openai(&server, "Descale every two months with citric acid.").await;
    let dir = TempDir::new().expect("temp dir");
    let config = config_for(&server, &dir);

    let answer = tokio::task::spawn_blocking(move || {
        let credentials = Credentials::new(Some("sk-test".to_string()), None);
        let providers = ConfiguredProviders::new(config.clone(), credentials.clone());

        let ingestor = Ingestor::from_config(&config).expect("ingestor");
        let embedder = providers.create(ProviderKind::OpenAi).expect("provider");
        let id = ingestor
            .ingest("espresso.md", MANUAL.as_bytes(), embedder)
            .expect("ingest")
            .metadata()
            .expect("metadata")
            .id;

        let catalog = DocumentCatalog::new(config.catalog_path());
        let listed = catalog.list().expect("catalog");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, id);
        assert_eq!(listed[0].provider, ProviderKind::OpenAi);
        assert!(!listed[0].fallback_embeddings);

        let store = DocumentStore::open(config.vectors_dir(), &id, &providers).expect("open");
        assert_eq!(store.index().dimension(), 1536);

        let generator =
            create_generator(ProviderKind::OpenAi, &config, &credentials).expect("generator");
        let orchestrator = Orchestrator::new(generator, config.retrieval.clone());
        orchestrator.answer("How often should I descale the boiler?", &store, &[])
    })
    .await
    .expect("task should not panic");

    assert_eq!(answer.answer, "Descale every two months with citric acid.");
    assert_eq!(answer.context_used, 2);
    assert!(!answer.degraded);
    assert!(answer.sources.iter().any(|s| s.contains("Descale")));

    let received = server.received_requests().await.expect("recording enabled");
    let chat_request = received
        .iter()
        .find(|r| r.url.path() == "/v1/chat/completions")
        .expect("chat request");
    let body: Value = serde_json::from_slice(&chat_request.body).expect("json body");
    let system = body["messages"][0]["content"].as_str().expect("system prompt");
    assert!(system.contains("espresso.md"));
    assert!(system.contains("citric acid"));
    assert_eq!(
        body["messages"][1]["content"],
        "Question: How often should I descale the boiler?"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_key_rejects_upload_before_any_request() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("temp dir");
    let config = config_for(&server, &dir);

    let result = tokio::task::spawn_blocking(move || {
        let providers = ConfiguredProviders::new(config.clone(), Credentials::default());
        let ingestor = Ingestor::from_config(&config).expect("ingestor");
        let embedder = providers.create(ProviderKind::Google).expect("provider");
        let result = ingestor.ingest("espresso.md", MANUAL.as_bytes(), embedder);

        let catalog = DocumentCatalog::new(config.catalog_path());
        assert!(catalog.list().expect("catalog").is_empty());
        assert!(!config.vectors_dir().exists());
        result.map(|_| ())
    })
    .await
    .expect("task should not panic");

    match result {
        Err(RagError::Provider(message)) => assert_eq!(message, "google not configured"),
        other => panic!("expected not configured error, got {:?}", other),
    }
    let received = server.received_requests().await.expect("recording enabled");
    assert!(received.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn unavailable_google_service_stores_flagged_fallback_vectors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let dir = TempDir::new().expect("temp dir");
    let config = config_for(&server, &dir);

    let (flagged, degraded, rows) = tokio::task::spawn_blocking(move || {
        let providers =
            ConfiguredProviders::new(config.clone(), Credentials::new(None, Some("g-key".to_string())));
        let ingestor = Ingestor::from_config(&config).expect("ingestor");
        let embedder = providers.create(ProviderKind::Google).expect("provider");
        let store = ingestor
            .ingest("espresso.md", MANUAL.as_bytes(), embedder)
            .expect("fallback still stores the document");

        let flagged = store.metadata().expect("metadata").fallback_embeddings;
        let outcome = store.search("warranty", 2).expect("search");
        (flagged, outcome.degraded, store.index().rows())
    })
    .await
    .expect("task should not panic");

    assert!(flagged);
    assert!(degraded);
    assert!(rows > 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_document_is_not_found_and_catalog_untouched() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("temp dir");
    let config = config_for(&server, &dir);

    tokio::task::spawn_blocking(move || {
        let providers = ConfiguredProviders::new(config.clone(), Credentials::default());
        let result = DocumentStore::open(config.vectors_dir(), &Uuid::new_v4(), &providers);
        assert!(matches!(result, Err(RagError::NotFound(_))));
        assert!(!config.catalog_path().exists());
    })
    .await
    .expect("task should not panic");
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_retrieval_skips_generation() {
    let server = MockServer::start().await;
    mount_openai(&server, "unused").await;
    let dir = TempDir::new().expect("temp dir");
    let config = config_for(&server, &dir);

    let answer = tokio::task::spawn_blocking(move || {
        let credentials = Credentials::new(Some("sk-test".to_string()), None);
        let providers = ConfiguredProviders::new(config.clone(), credentials.clone());
        let store = DocumentStore::new(
            config.vectors_dir(),
            providers.create(ProviderKind::OpenAi).expect("provider"),
        );
        let generator =
            create_generator(ProviderKind::OpenAi, &config, &credentials).expect("generator");
        Orchestrator::new(generator, config.retrieval.clone()).answer("anything?", &store, &[])
    })
    .await
    .expect("task should not panic");

    assert_eq!(answer.answer, NO_RELEVANT_INFORMATION);
    assert!(answer.sources.is_empty());
    let received = server.received_requests().await.expect("recording enabled");
    assert!(received.is_empty());
}
