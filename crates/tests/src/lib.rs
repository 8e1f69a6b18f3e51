//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 真实 HTTP (axum) 与 RPC (RpcServer) 后端上的分发场景
//! - 配置文件 -> 分发器 的完整链路
//! - 取消与回落行为

#[cfg(test)]
mod support;

#[cfg(test)]
mod scenarios;

#[cfg(test)]
mod config_e2e;

#[cfg(test)]
mod contract_tests {
    use contracts::{Protocol, Response};
    use dispatcher::{DispatchError, ErrorResponse};

    #[test]
    fn test_unavailable_codes_per_protocol() {
        assert_eq!(
            DispatchError::unavailable(Protocol::Http).status_code(),
            503
        );
        assert_eq!(DispatchError::unavailable(Protocol::Rpc).status_code(), 14);

        let response = ErrorResponse::from(DispatchError::unavailable(Protocol::Rpc));
        assert!(!response.is_success());
        assert_eq!(response.protocol(), Protocol::Rpc);
    }
}
