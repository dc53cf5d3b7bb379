use crate::{client::Client, error::GigaChatError, transport::Transport, types::ModelsListResponse};

/// API resource for the `/models` endpoint
pub struct Models<'c, T: Transport> {
    client: &'c Client<T>,
}

impl<'c, T: Transport> Models<'c, T> {
    /// Creates a new Models resource
    #[must_use]
    pub const fn new(client: &'c Client<T>) -> Self {
        Self { client }
    }

    /// List models available to the authenticated account
    ///
    /// # Errors
    ///
    /// Returns an error if no credential can be obtained, the request fails,
    /// or the API returns an error.
    pub async fn list(&self) -> Result<ModelsListResponse, GigaChatError> {
        self.client.get("/models").await
    }
}

impl<T: Transport> crate::Client<T> {
    /// Returns the Models API resource
    #[must_use]
    pub const fn models(&self) -> Models<'_, T> {
        Models::new(self)
    }
}
