//! Main request dispatcher — receives JSON-RPC messages, routes to handlers.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use serde_json::Value;

use cabinet_verify::{CancelToken, SharedResources, Verifier};

use crate::tools::{ToolContext, ToolRegistry};
use crate::types::*;

use super::negotiation::NegotiatedCapabilities;
use super::validator::validate_request;

/// Dispatches incoming JSON-RPC messages. Shared across concurrently running requests.
pub struct ProtocolHandler {
    verifier: Arc<Verifier>,
    capabilities: Arc<Mutex<NegotiatedCapabilities>>,
    in_flight: Arc<Mutex<HashMap<RequestId, CancelToken>>>,
}

impl ProtocolHandler {
    pub fn new(verifier: Verifier) -> Self {
        Self {
            verifier: Arc::new(verifier),
            capabilities: Arc::new(Mutex::new(NegotiatedCapabilities::default())),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn handle_message(&self, msg: JsonRpcMessage) -> Option<Value> {
        match msg {
            JsonRpcMessage::Request(req) => Some(self.handle_request(req).await),
            JsonRpcMessage::Notification(notif) => {
                self.handle_notification(notif).await;
                None
            }
            _ => {
                tracing::warn!("Received unexpected message type from client");
                None
            }
        }
    }

    /// Number of tool calls currently running.
    pub async fn in_flight_count(&self) -> usize {
        self.in_flight.lock().await.len()
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> Value {
        if let Err(e) = validate_request(&request) {
            return serde_json::to_value(e.to_json_rpc_error(request.id)).unwrap_or_default();
        }

        let id = request.id.clone();
        let result = self.dispatch_request(&request).await;

        match result {
            Ok(value) => serde_json::to_value(JsonRpcResponse::new(id, value)).unwrap_or_default(),
            Err(e) => {
                tracing::debug!("Request {id} failed: {e}");
                serde_json::to_value(e.to_json_rpc_error(id)).unwrap_or_default()
            }
        }
    }

    async fn dispatch_request(&self, request: &JsonRpcRequest) -> McpResult<Value> {
        match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params.clone()).await,
            "shutdown" => self.handle_shutdown().await,

            "tools/list" => self.handle_tools_list().await,
            "tools/call" => {
                self.handle_tools_call(&request.id, request.params.clone())
                    .await
            }

            "ping" => Ok(Value::Object(serde_json::Map::new())),

            _ => Err(McpError::MethodNotFound(request.method.clone())),
        }
    }

    async fn handle_notification(&self, notification: JsonRpcNotification) {
        match notification.method.as_str() {
            "initialized" | "notifications/initialized" => {
                let mut caps = self.capabilities.lock().await;
                caps.mark_initialized();
            }
            "notifications/cancelled" | "$/cancelRequest" => {
                self.handle_cancel(notification.params).await;
            }
            _ => {
                tracing::debug!("Unknown notification: {}", notification.method);
            }
        }
    }

    async fn handle_cancel(&self, params: Option<Value>) {
        let params: CancelRequestParams = match params.map(serde_json::from_value) {
            Some(Ok(p)) => p,
            _ => {
                tracing::warn!("Ignoring cancellation without a valid requestId");
                return;
            }
        };

        let in_flight = self.in_flight.lock().await;
        match in_flight.get(&params.request_id) {
            Some(token) => {
                tracing::info!(
                    "Cancelling request {} ({})",
                    params.request_id,
                    params.reason.as_deref().unwrap_or("no reason given")
                );
                token.cancel();
            }
            None => tracing::debug!("Cancellation for unknown request {}", params.request_id),
        }
    }

    async fn handle_initialize(&self, params: Option<Value>) -> McpResult<Value> {
        let init_params: InitializeParams = params
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| McpError::InvalidParams(e.to_string()))?
            .ok_or_else(|| McpError::InvalidParams("Initialize params required".to_string()))?;

        let mut caps = self.capabilities.lock().await;
        let result = caps.negotiate(init_params);

        serde_json::to_value(result).map_err(|e| McpError::InternalError(e.to_string()))
    }

    async fn handle_shutdown(&self) -> McpResult<Value> {
        tracing::info!("Shutdown requested");
        for token in self.in_flight.lock().await.values() {
            token.cancel();
        }
        SharedResources::teardown();
        Ok(Value::Object(serde_json::Map::new()))
    }

    async fn handle_tools_list(&self) -> McpResult<Value> {
        let result = ToolListResult {
            tools: ToolRegistry::list_tools(),
            next_cursor: None,
        };
        serde_json::to_value(result).map_err(|e| McpError::InternalError(e.to_string()))
    }

    async fn handle_tools_call(&self, id: &RequestId, params: Option<Value>) -> McpResult<Value> {
        let call_params: ToolCallParams = params
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| McpError::InvalidParams(e.to_string()))?
            .ok_or_else(|| McpError::InvalidParams("Tool call params required".to_string()))?;

        let cancel = CancelToken::new();
        {
            let mut in_flight = self.in_flight.lock().await;
            if in_flight.contains_key(id) {
                return Err(McpError::InvalidRequest(format!(
                    "Request id {id} is already in flight"
                )));
            }
            in_flight.insert(id.clone(), cancel.clone());
        }

        let ctx = ToolContext {
            verifier: &self.verifier,
            cancel,
        };
        let result = ToolRegistry::call(&call_params.name, call_params.arguments, &ctx).await;

        self.in_flight.lock().await.remove(id);

        serde_json::to_value(result?).map_err(|e| McpError::InternalError(e.to_string()))
    }
}
