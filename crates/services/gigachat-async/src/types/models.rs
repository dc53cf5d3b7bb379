//! Types for the `/models` endpoint

use serde::{Deserialize, Serialize};

/// A model available to the authenticated account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Model {
    /// Model identifier, usable as [`ChatRequest::model`](super::ChatRequest::model)
    pub id: String,
    /// Object type (`"model"`)
    #[serde(default)]
    pub object: Option<String>,
    /// Owner of the model
    #[serde(default)]
    pub owned_by: Option<String>,
}

/// Response from `GET /models`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelsListResponse {
    /// Available models
    pub data: Vec<Model>,
    /// Object type (`"list"`)
    #[serde(default)]
    pub object: Option<String>,
}
