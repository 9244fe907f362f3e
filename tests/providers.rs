use serde::Deserialize;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use weekendscout::llm::Provider;
use weekendscout::llm::ollama::OllamaProvider;
use weekendscout::llm::openai::OpenAiProvider;
use weekendscout::llm::structured::obtain;
use weekendscout::tools::fetch::{FetchPage, page_client};
use weekendscout::tools::{Tool, ToolContext, ToolId, ToolOutput};

#[tokio::test]
async fn ollama_chat_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "message": {"role": "assistant", "content": "Feira do Bixiga no sábado"}
        })))
        .mount(&server)
        .await;

    let provider = OllamaProvider::new(Some(&server.uri()), "llama3.1:8b-instruct", 0.2);
    let reply = provider.complete("system", "user").await.unwrap();
    assert_eq!(reply, "Feira do Bixiga no sábado");
}

#[tokio::test]
async fn ollama_server_error_carries_the_local_setup_hint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
        .mount(&server)
        .await;

    let provider = OllamaProvider::new(Some(&server.uri()), "llama3.1:8b-instruct", 0.2);
    let message = provider.complete("system", "user").await.unwrap_err().to_string();

    assert!(message.contains("Ollama API error (500"), "{message}");
    assert!(message.contains("model not loaded"), "{message}");
    assert!(message.contains("Is Ollama running?"), "{message}");
}

#[tokio::test]
async fn openai_sends_the_cached_bearer_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"content": "oi"}}]
        })))
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new(Some("test-key"), Some(&server.uri()), "gpt-4o-mini", 0.2);
    let reply = provider.complete("system", "user").await.unwrap();
    assert_eq!(reply, "oi");
}

#[tokio::test]
async fn openai_error_excerpt_is_bounded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(400).set_body_string("x".repeat(1_000)))
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new(Some("key"), Some(&server.uri()), "gpt-4o-mini", 0.2);
    let message = provider.complete("system", "user").await.unwrap_err().to_string();

    assert!(message.contains("OpenAI API error (400"), "{message}");
    assert!(message.len() < 400, "excerpt not truncated: {message}");
}

#[derive(Debug, Deserialize)]
struct Shortlist {
    titles: Vec<String>,
}

#[tokio::test]
async fn obtain_decodes_fenced_output_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "message": {"content": "```json\n{\"titles\": [\"Feira do Bixiga\"]}\n```"}
        })))
        .mount(&server)
        .await;

    let provider = OllamaProvider::new(Some(&server.uri()), "llama3.1:8b-instruct", 0.2);
    let shortlist: Shortlist = obtain(&provider, "list events", "this weekend", 0)
        .await
        .unwrap();

    assert_eq!(shortlist.titles, vec!["Feira do Bixiga"]);
}

#[tokio::test]
async fn fetch_page_follows_redirects_but_reports_the_configured_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/moved"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", format!("{}/agenda", server.uri())),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/agenda"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>shows</html>"))
        .mount(&server)
        .await;

    let url = format!("{}/moved", server.uri());
    let tool = FetchPage::new(ToolId::FetchSympla, "sympla", &url, page_client(5));
    let output = tool
        .run(ToolContext {
            pages: &[],
            events: &[],
        })
        .await
        .unwrap();

    match output {
        ToolOutput::Page(page) => {
            assert_eq!(page.body, "<html>shows</html>");
            assert_eq!(page.url, url);
            assert_eq!(page.source, "sympla");
        }
        other => panic!("expected a page, got {other:?}"),
    }
}
