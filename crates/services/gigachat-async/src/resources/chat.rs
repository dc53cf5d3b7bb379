use crate::{
    client::Client,
    error::GigaChatError,
    transport::Transport,
    types::chat::{ChatRequest, ChatResponse},
};

/// API resource for the `/chat/completions` endpoint (non-streaming)
pub struct Chat<'c, T: Transport> {
    client: &'c Client<T>,
}

impl<'c, T: Transport> Chat<'c, T> {
    /// Creates a new Chat resource
    #[must_use]
    pub const fn new(client: &'c Client<T>) -> Self {
        Self { client }
    }

    /// Send a caller-built chat request as-is
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `stream` is set (streaming is not supported)
    /// - No credential can be obtained
    /// - The request fails to send
    /// - The API returns an error
    pub async fn create(&self, req: ChatRequest) -> Result<ChatResponse, GigaChatError> {
        if req.stream {
            return Err(GigaChatError::Config(
                "Streaming chat completions are not supported".into(),
            ));
        }
        self.client.post("/chat/completions", &req).await
    }
}

impl<T: Transport> crate::Client<T> {
    /// Returns the Chat API resource
    #[must_use]
    pub const fn chat(&self) -> Chat<'_, T> {
        Chat::new(self)
    }
}
