pub mod anthropic;
pub mod error;
pub mod json;

#[derive(Debug, Clone, Copy)]
pub enum Provider {
    Anthropic,
}

/// An opaque text-completion endpoint. The scorer only needs prompt-in,
/// text-out; everything provider-specific stays behind this trait.
#[async_trait::async_trait]
pub trait CompletionClient: Send + Sync {
    fn provider(&self) -> Provider;

    async fn complete(&self, system: &str, user: &str) -> anyhow::Result<String>;
}
