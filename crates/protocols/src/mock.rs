//! Mock 调用器
//!
//! 用于单元测试和演示的 mock 实现，支持注入延迟、状态码和传输失败。
//! 通过 [`MockStats`] 观察调用是否开始、完成，或在中途被取消。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use contracts::{CallError, Caller, Protocol, Request, Response};
use tracing::instrument;

use crate::http::HttpResponse;
use crate::rpc::{RpcCode, RpcResponse};

/// 调用计数器
#[derive(Debug, Default)]
pub struct MockStats {
    started: AtomicUsize,
    completed: AtomicUsize,
    in_flight: AtomicUsize,
}

impl MockStats {
    /// 已开始的调用数
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// 已返回（成功或失败）的调用数
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// 当前在途调用数（被取消的调用会在 future 被 drop 时减少）
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

/// 在途计数守卫，future 被 drop 时同样生效
struct InFlightGuard(Arc<MockStats>);

impl InFlightGuard {
    fn enter(stats: &Arc<MockStats>) -> Self {
        stats.started.fetch_add(1, Ordering::SeqCst);
        stats.in_flight.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(stats))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Mock 调用器
#[derive(Debug, Clone)]
pub struct MockCaller {
    protocol: Protocol,
    endpoint: String,
    /// 返回前的等待时间
    delay: Duration,
    /// 返回的状态码（HTTP status 或 RPC code）
    status: i32,
    payload: Bytes,
    /// 设置后返回传输错误而不是响应
    failure: Option<String>,
    stats: Arc<MockStats>,
}

impl MockCaller {
    /// 创建立即成功的 mock 调用器
    pub fn new(protocol: Protocol) -> Self {
        let status = match protocol {
            Protocol::Http => 200,
            Protocol::Rpc => RpcCode::Ok.as_i32(),
        };
        Self {
            protocol,
            endpoint: format!("mock://{}", protocol.to_string().to_lowercase()),
            delay: Duration::ZERO,
            status,
            payload: Bytes::new(),
            failure: None,
            stats: Arc::new(MockStats::default()),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_status(mut self, status: i32) -> Self {
        self.status = status;
        self
    }

    pub fn with_payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = payload.into();
        self
    }

    /// 延迟结束后返回传输错误
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// 共享计数器（克隆的调用器共享同一组计数）
    pub fn stats(&self) -> Arc<MockStats> {
        Arc::clone(&self.stats)
    }

    fn build_response(&self) -> Box<dyn Response> {
        match self.protocol {
            Protocol::Http => {
                let status = u16::try_from(self.status).unwrap_or(500);
                Box::new(HttpResponse::new(status, self.payload.clone()))
            }
            Protocol::Rpc => {
                let code = RpcCode::from_i32(self.status).unwrap_or(RpcCode::Unknown);
                let mut response = RpcResponse::ok(self.payload.clone());
                response.code = code;
                Box::new(response)
            }
        }
    }
}

#[async_trait]
impl Caller for MockCaller {
    fn protocol(&self) -> Protocol {
        self.protocol
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[instrument(name = "mock_caller_call", skip(self, _request), fields(endpoint = %self.endpoint))]
    async fn call(&self, _request: &dyn Request) -> Result<Box<dyn Response>, CallError> {
        let _guard = InFlightGuard::enter(&self.stats);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.stats.completed.fetch_add(1, Ordering::SeqCst);

        match &self.failure {
            Some(message) => Err(CallError::transport(&self.endpoint, message.clone())),
            None => Ok(self.build_response()),
        }
    }
}
