//! # Dispatcher
//!
//! 协议无关的请求分发模块。
//!
//! 负责：
//! - 按路由策略为每个请求排出候选路由顺序
//! - 同时（eager）或依次（lazy）调用候选后端，每个调用有独立超时
//! - 按排名合并结果：高排名的成功优先，失败时回落到下一个候选
//! - 结果确定或调用方取消后，立即取消仍在进行的调用

pub mod combiner;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod outcome;
pub mod result;
pub mod route;
pub mod strategy;

pub use combiner::{
    build_policy, CombinePolicy, Combiner, FallbackCombiner, FallbackPolicy, FirstSuccessCombiner,
    FirstSuccessPolicy, Resolution,
};
pub use context::DispatchContext;
pub use dispatcher::{create_dispatcher, DispatchState, Dispatcher, DispatcherBuilder};
pub use error::{DispatchError, DispatcherError, ErrorResponse};
pub use metrics::{RouteMetrics, RouteMetricsSnapshot};
pub use outcome::{Outcome, OutcomeKind};
pub use result::{DispatchOutput, DispatchResult};
pub use route::{Route, RouteTable};
pub use strategy::{
    build_strategy, LeastLoadedStrategy, PriorityStrategy, RandomStrategy, RoundRobinStrategy,
    RoutingStrategy, StrategyError,
};
