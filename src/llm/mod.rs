pub mod factory;
pub mod ollama;
pub mod openai;
pub mod structured;
pub mod traits;

pub use factory::create_provider;
pub use traits::Provider;

/// Cap on provider error bodies echoed into error messages.
const ERROR_BODY_CHARS: usize = 200;

/// Convert a non-success provider response into a readable error.
pub(crate) async fn api_error(provider: &str, response: reqwest::Response) -> anyhow::Error {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read provider error body>".to_string());
    let excerpt = crate::utils::text::truncate_chars(&body, ERROR_BODY_CHARS);
    anyhow::anyhow!("{provider} API error ({status}): {excerpt}")
}
