//! Configuration file -> dispatcher

use std::io::Write;
use std::time::Duration;

use config_loader::ConfigLoader;
use contracts::{CombinerKind, DispatchMode, Protocol, Response, StrategyKind};
use dispatcher::{create_dispatcher, DispatchContext};

use crate::support::{config_toml, request, Backend, SLOW};

#[tokio::test]
async fn test_dispatch_from_config_file() {
    let r1 = Backend::http("route1", SLOW, true).await;
    let r2 = Backend::http("route2", Duration::ZERO, true).await;

    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(config_toml(Protocol::Http, &["route1", "route2"], &[&r1, &r2]).as_bytes())
        .unwrap();

    let blueprint = ConfigLoader::load_from_path(file.path()).unwrap();
    assert_eq!(blueprint.router.strategy.kind, StrategyKind::Priority);
    assert_eq!(blueprint.router.mode, DispatchMode::Eager);
    assert_eq!(blueprint.router.combiner, CombinerKind::Fallback);

    let dispatcher = create_dispatcher(&blueprint).unwrap();
    assert_eq!(dispatcher.routes().names(), vec!["route1", "route2"]);

    let response = dispatcher
        .dispatch(&DispatchContext::new(), request(Protocol::Http, "cfg"))
        .recv()
        .await
        .unwrap();
    assert_eq!(response.backend_name(), "route2");
}

#[tokio::test]
async fn test_json_round_trip_builds_same_dispatcher() {
    let r1 = Backend::rpc("route1", Duration::ZERO, true).await;
    let toml = config_toml(Protocol::Rpc, &["route1"], &[&r1]);
    let blueprint =
        ConfigLoader::load_from_str(&toml, config_loader::ConfigFormat::Toml).unwrap();

    let json = ConfigLoader::to_json(&blueprint).unwrap();
    let reloaded = ConfigLoader::load_from_str(&json, config_loader::ConfigFormat::Json).unwrap();

    let dispatcher = create_dispatcher(&reloaded).unwrap();
    let response = dispatcher
        .dispatch(&DispatchContext::new(), request(Protocol::Rpc, "json"))
        .recv()
        .await
        .unwrap();
    assert_eq!(response.payload().as_ref(), b"route1:json");
}

#[test]
fn test_invalid_http_endpoint_is_rejected() {
    let toml = r#"
[[routes]]
name = "route1"
protocol = "http"
endpoint = "not a url"
"#;
    assert!(ConfigLoader::load_from_str(toml, config_loader::ConfigFormat::Toml).is_err());
}
