pub mod protocol;
pub mod tools;

pub use protocol::{CallToolResult, JsonRpcRequest, JsonRpcResponse, ToolContent, ToolDefinition};
pub use tools::ToolBox;

use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use crate::Result;
use protocol::{
    CallToolParams, InitializeResult, ServerInfo, INTERNAL_ERROR, INVALID_PARAMS, METHOD_NOT_FOUND, PARSE_ERROR,
    PROTOCOL_VERSION,
};

/// Line-delimited JSON-RPC server. Requests are handled concurrently and responses
/// are written by a single task in completion order.
#[derive(Clone)]
pub struct Server {
    tools: Arc<ToolBox>,
}

impl Server {
    pub fn new(tools: ToolBox) -> Self {
        Self {
            tools: Arc::new(tools),
        }
    }
    
    pub async fn serve_stdio(&self) -> Result<()> {
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }
    
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<String>(100);
        
        let writer_task = tokio::spawn(async move {
            while let Some(line) = rx.recv().await {
                if let Err(e) = writer.write_all(line.as_bytes()).await {
                    log::error!("Failed to write response: {}", e);
                    break;
                }
                if writer.write_all(b"\n").await.is_err() || writer.flush().await.is_err() {
                    break;
                }
            }
        });
        
        let mut handlers = JoinSet::new();
        let mut lines = BufReader::new(reader).lines();
        
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let line = match line? {
                        Some(line) => line,
                        None => break,
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    self.spawn_handler(&mut handlers, line, tx.clone());
                }
                Some(joined) = handlers.join_next(), if !handlers.is_empty() => log_join(joined),
            }
        }
        
        while let Some(joined) = handlers.join_next().await {
            log_join(joined);
        }
        drop(tx);
        
        if let Err(e) = writer_task.await {
            log::error!("Response writer stopped: {}", e);
        }
        
        log::info!("Input closed, server stopping");
        Ok(())
    }
    
    fn spawn_handler(&self, handlers: &mut JoinSet<()>, line: String, tx: mpsc::Sender<String>) {
        let server = self.clone();
        handlers.spawn(async move {
            if let Some(response) = server.handle_line(&line).await {
                match serde_json::to_string(&response) {
                    Ok(encoded) => {
                        let _ = tx.send(encoded).await;
                    }
                    Err(e) => log::error!("Failed to encode response: {}", e),
                }
            }
        });
    }
    
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        match serde_json::from_str::<JsonRpcRequest>(line) {
            Ok(request) => self.handle(request).await,
            Err(e) => {
                log::warn!("Unparsable request: {}", e);
                Some(JsonRpcResponse::failure(Value::Null, PARSE_ERROR, format!("Parse error: {}", e)))
            }
        }
    }
    
    /// Notifications (no id) never get a response.
    pub async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        log::debug!("Handling {}", request.method);
        
        let id = match request.id {
            Some(id) => id,
            None => return None,
        };
        
        let response = match request.method.as_str() {
            "initialize" => {
                let result = InitializeResult {
                    protocol_version: PROTOCOL_VERSION.to_string(),
                    capabilities: json!({"tools": {"listChanged": false}}),
                    server_info: ServerInfo {
                        name: env!("CARGO_PKG_NAME").to_string(),
                        version: env!("CARGO_PKG_VERSION").to_string(),
                    },
                };
                to_response(id, &result)
            }
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, json!({"tools": ToolBox::definitions()})),
            "tools/call" => {
                let params = request.params.unwrap_or(Value::Null);
                match serde_json::from_value::<CallToolParams>(params) {
                    Ok(params) => {
                        let result = self.tools.call(&params.name, params.arguments).await;
                        to_response(id, &result)
                    }
                    Err(e) => JsonRpcResponse::failure(id, INVALID_PARAMS, format!("Invalid params: {}", e)),
                }
            }
            other => JsonRpcResponse::failure(id, METHOD_NOT_FOUND, format!("Method not found: {}", other)),
        };
        
        Some(response)
    }
}

fn log_join(joined: std::result::Result<(), JoinError>) {
    if let Err(e) = joined {
        log::error!("Request handler failed: {}", e);
    }
}

fn to_response<T: serde::Serialize>(id: Value, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::failure(id, INTERNAL_ERROR, e.to_string()),
    }
}
