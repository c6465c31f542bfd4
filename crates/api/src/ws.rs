//! 实时通道
//!
//! WebSocket 上的帧格式与既有前端一致: {"event": ..., "data": ...}。
//! 入站事件:
//!   - provider:join        {providerId}           上线并注册推送通道
//!   - provider:set_status  {providerId, status}   状态上报
//! 断开连接视为下线: 注销通道并把服务商置为 OFFLINE。

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use dispatch_domain::entities::ProviderStatus;
use dispatch_domain::events::RequestEvent;

use crate::routes::AppState;

pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<RequestEvent>();

    // 推送任务: 引擎事件序列化成帧发给客户端
    let forward = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let frame = event.to_frame().to_string();
            if sink.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    // 本连接登记的服务商，断开时据此清理
    let mut joined: Option<i64> = None;

    while let Some(message) = stream.next().await {
        let message = match message {
            Ok(m) => m,
            Err(e) => {
                debug!("WebSocket 读取失败: {}", e);
                break;
            }
        };

        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let frame: Value = match serde_json::from_str(text.as_str()) {
            Ok(v) => v,
            Err(_) => {
                warn!("忽略无法解析的帧: {}", text.as_str());
                continue;
            }
        };

        match frame["event"].as_str() {
            Some("provider:join") => {
                let Some(provider_id) = frame["data"]["providerId"].as_i64() else {
                    warn!("provider:join 缺少 providerId");
                    continue;
                };
                state.registry.register(provider_id, tx.clone());
                joined = Some(provider_id);
                apply_status(&state, provider_id, ProviderStatus::Ready).await;
                info!("服务商 {} 上线", provider_id);
            }
            Some("provider:set_status") => {
                let provider_id = frame["data"]["providerId"].as_i64().or(joined);
                let Some(provider_id) = provider_id else {
                    warn!("provider:set_status 缺少 providerId 且未 join");
                    continue;
                };
                let raw = frame["data"]["status"].as_str().unwrap_or("");
                let status = ProviderStatus::normalize(raw);
                apply_status(&state, provider_id, status).await;
            }
            other => {
                debug!("忽略未知事件: {:?}", other);
            }
        }
    }

    if let Some(provider_id) = joined {
        state.registry.unregister(provider_id);
        apply_status(&state, provider_id, ProviderStatus::Offline).await;
        info!("服务商 {} 下线", provider_id);
    }

    forward.abort();
}

/// 持久化状态并向所有在线服务商广播
async fn apply_status(state: &AppState, provider_id: i64, status: ProviderStatus) {
    match state.provider_repo.update_status(provider_id, status).await {
        Ok(_) => {
            state.registry.broadcast(RequestEvent::ProviderStatusUpdate {
                provider_id,
                status,
            });
        }
        Err(e) => warn!("更新服务商 {} 状态失败: {}", provider_id, e),
    }
}
