use async_trait::async_trait;

/// Chat backend boundary used by planning and extraction.
///
/// Implementations own their model name, sampling options, and HTTP
/// plumbing. Callers hand over a system instruction plus one user
/// message and get the raw completion text back.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Short provider tag for logs and error messages ("ollama", "openai").
    fn name(&self) -> &'static str;

    /// Send one system + user exchange and return the assistant text.
    async fn complete(&self, system: &str, user: &str) -> anyhow::Result<String>;
}
