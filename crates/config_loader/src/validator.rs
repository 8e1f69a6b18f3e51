//! 配置校验模块
//!
//! 校验规则：
//! - 字段级规则 (validator derive)：名称非空、endpoint 非空、timeout_ms > 0
//! - 至少配置一个 route
//! - route 名称唯一
//! - endpoint 与协议匹配 (HTTP 为 URL，RPC 为 host:port)
//! - strategy.order 中的名称必须存在且不重复

use std::collections::HashSet;

use contracts::{ContractError, Protocol, RouteConfig, RouterBlueprint};
use validator::{Validate, ValidationErrors};

/// 校验 RouterBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &RouterBlueprint) -> Result<(), ContractError> {
    validate_routes_present(blueprint)?;
    validate_fields(blueprint)?;
    validate_route_names(blueprint)?;
    validate_endpoints(blueprint)?;
    validate_strategy_order(blueprint)?;
    Ok(())
}

/// 至少需要一个 route
fn validate_routes_present(blueprint: &RouterBlueprint) -> Result<(), ContractError> {
    if blueprint.routes.is_empty() {
        return Err(ContractError::config_validation(
            "routes",
            "at least one route is required",
        ));
    }
    Ok(())
}

/// 字段级规则
fn validate_fields(blueprint: &RouterBlueprint) -> Result<(), ContractError> {
    blueprint.validate().map_err(|errors| first_field_error(&errors))
}

/// 把 validator 的错误树展开成第一个 (路径, 消息)
fn first_field_error(errors: &ValidationErrors) -> ContractError {
    let flattened = flatten_errors("", errors);
    match flattened.into_iter().next() {
        Some((field, message)) => ContractError::config_validation(field, message),
        None => ContractError::config_validation("<root>", "invalid configuration"),
    }
}

fn flatten_errors(prefix: &str, errors: &ValidationErrors) -> Vec<(String, String)> {
    use validator::ValidationErrorsKind;

    let mut out = Vec::new();
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    for (field, kind) in fields {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(errs) => {
                for err in errs {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| err.code.to_string());
                    out.push((path.clone(), message));
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                out.extend(flatten_errors(&path, inner));
            }
            ValidationErrorsKind::List(items) => {
                for (idx, inner) in items {
                    out.extend(flatten_errors(&format!("{path}[{idx}]"), inner));
                }
            }
        }
    }
    out
}

/// 校验 route 名称唯一性
fn validate_route_names(blueprint: &RouterBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for route in &blueprint.routes {
        if !seen.insert(route.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("routes[name={}]", route.name),
                "duplicate route name",
            ));
        }
    }
    Ok(())
}

/// 校验 endpoint 格式
fn validate_endpoints(blueprint: &RouterBlueprint) -> Result<(), ContractError> {
    for route in &blueprint.routes {
        let ok = match route.protocol {
            Protocol::Http => is_http_url(&route.endpoint),
            Protocol::Rpc => is_host_port(&route.endpoint),
        };
        if !ok {
            return Err(ContractError::config_validation(
                format!("routes[{}].endpoint", route.name),
                endpoint_hint(route),
            ));
        }
    }
    Ok(())
}

fn endpoint_hint(route: &RouteConfig) -> String {
    match route.protocol {
        Protocol::Http => format!(
            "'{}' is not an http(s) URL",
            route.endpoint
        ),
        Protocol::Rpc => format!("'{}' is not a host:port address", route.endpoint),
    }
}

fn is_http_url(endpoint: &str) -> bool {
    let rest = endpoint
        .strip_prefix("http://")
        .or_else(|| endpoint.strip_prefix("https://"));
    matches!(rest, Some(host) if !host.is_empty() && !host.starts_with('/'))
}

fn is_host_port(endpoint: &str) -> bool {
    match endpoint.rsplit_once(':') {
        Some((host, port)) => !host.is_empty() && port.parse::<u16>().is_ok(),
        None => false,
    }
}

/// 校验 strategy.order
fn validate_strategy_order(blueprint: &RouterBlueprint) -> Result<(), ContractError> {
    let names: HashSet<_> = blueprint.routes.iter().map(|r| r.name.as_str()).collect();
    let mut seen = HashSet::new();

    for name in &blueprint.router.strategy.order {
        if !names.contains(name.as_str()) {
            return Err(ContractError::config_validation(
                "router.strategy.order",
                format!("route '{name}' not found in routes"),
            ));
        }
        if !seen.insert(name.as_str()) {
            return Err(ContractError::config_validation(
                "router.strategy.order",
                format!("route '{name}' listed more than once"),
            ));
        }
    }
    Ok(())
}
