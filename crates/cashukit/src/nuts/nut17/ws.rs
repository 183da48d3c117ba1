//! Websocket types
//!
//! JSON-RPC 2.0 frames for the NUT-17 subscription protocol.

use serde::{Deserialize, Serialize};

use super::{NotificationPayload, Params};

/// JSON RPC version
pub const JSON_RPC_VERSION: &str = "2.0";

/// The response to a subscription request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WsSubscribeResponse {
    /// Status
    pub status: String,
    /// Subscription ID
    #[serde(rename = "subId")]
    pub sub_id: String,
}

/// The response to an unsubscription request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WsUnsubscribeResponse {
    /// Status
    pub status: String,
    /// Subscription ID
    #[serde(rename = "subId")]
    pub sub_id: String,
}

/// The notification sent to the client when an event matches a subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationInner {
    /// The subscription ID
    #[serde(rename = "subId")]
    pub sub_id: String,
    /// The notification payload
    pub payload: NotificationPayload,
}

/// Responses from the web socket server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WsResponseResult {
    /// A response to a subscription request
    Subscribe(WsSubscribeResponse),
    /// Unsubscribe
    Unsubscribe(WsUnsubscribeResponse),
}

impl From<WsSubscribeResponse> for WsResponseResult {
    fn from(response: WsSubscribeResponse) -> Self {
        WsResponseResult::Subscribe(response)
    }
}

impl From<WsUnsubscribeResponse> for WsResponseResult {
    fn from(response: WsUnsubscribeResponse) -> Self {
        WsResponseResult::Unsubscribe(response)
    }
}

/// The request to unsubscribe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WsUnsubscribeRequest {
    /// Subscription ID
    #[serde(rename = "subId")]
    pub sub_id: String,
}

/// The inner method of the websocket request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "method", content = "params")]
pub enum WsMethodRequest {
    /// Subscribe method
    Subscribe(Params),
    /// Unsubscribe method
    Unsubscribe(WsUnsubscribeRequest),
}

/// Websocket request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WsRequest {
    /// JSON RPC version
    pub jsonrpc: String,
    /// The method body
    #[serde(flatten)]
    pub method: WsMethodRequest,
    /// The request ID
    pub id: usize,
}

impl From<(WsMethodRequest, usize)> for WsRequest {
    fn from((method, id): (WsMethodRequest, usize)) -> Self {
        WsRequest {
            jsonrpc: JSON_RPC_VERSION.to_owned(),
            method,
            id,
        }
    }
}

/// Notification from the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WsNotification {
    /// JSON RPC version
    pub jsonrpc: String,
    /// The method; echoes `subscribe`
    pub method: String,
    /// The parameters
    pub params: NotificationInner,
}

/// Websocket error body
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WsErrorBody {
    /// Error code
    pub code: i32,
    /// Error message
    pub message: String,
}

/// Websocket response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WsResponse {
    /// JSON RPC version
    pub jsonrpc: String,
    /// The result
    pub result: WsResponseResult,
    /// The request ID
    pub id: usize,
}

/// WebSocket error response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WsErrorResponse {
    /// JSON RPC version
    pub jsonrpc: String,
    /// The error
    pub error: WsErrorBody,
    /// The request ID
    pub id: usize,
}

/// Message from the server to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WsMessageOrResponse {
    /// A response to a request
    Response(WsResponse),
    /// An error response
    ErrorResponse(WsErrorResponse),
    /// A notification
    Notification(WsNotification),
}
