//! Control API tests against a recording router factory

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use relay_rs::{
    BaseConfig, ConfigStore, ControlApi, RelayError, Route, Router, RouterFactory, RouterManager,
};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

/// Names of routers whose serve loop is currently running
type Running = Arc<Mutex<HashSet<String>>>;

struct Probe {
    name: String,
    running: Running,
}

struct Stopped {
    name: String,
    running: Running,
}

impl Drop for Stopped {
    fn drop(&mut self) {
        self.running.lock().unwrap().remove(&self.name);
    }
}

#[async_trait]
impl Router for Probe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn serve(self: Box<Self>) -> relay_rs::Result<()> {
        self.running.lock().unwrap().insert(self.name.clone());
        let _stopped = Stopped {
            name: self.name.clone(),
            running: self.running.clone(),
        };
        std::future::pending().await
    }
}

/// One probe per serve node; nodes starting with "none" produce nothing
struct RecordingFactory {
    running: Running,
}

impl RouterFactory for RecordingFactory {
    fn expand(&self, route: &Route) -> relay_rs::Result<Vec<Box<dyn Router>>> {
        Ok(route
            .serve_nodes
            .iter()
            .filter(|node| !node.starts_with("none"))
            .map(|node| {
                Box::new(Probe {
                    name: node.clone(),
                    running: self.running.clone(),
                }) as Box<dyn Router>
            })
            .collect())
    }
}

struct Harness {
    _dir: TempDir,
    path: PathBuf,
    api: ControlApi,
    routers: Arc<RouterManager>,
    running: Running,
}

fn harness(initial: BaseConfig) -> Harness {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("relay.json");
    std::fs::write(&path, serde_json::to_string_pretty(&initial).unwrap()).unwrap();
    harness_at(dir, path, initial)
}

fn harness_at(dir: TempDir, path: PathBuf, initial: BaseConfig) -> Harness {
    let running: Running = Arc::default();
    let factory = Arc::new(RecordingFactory { running: running.clone() });
    let routers = Arc::new(RouterManager::new(factory));
    let store = Arc::new(ConfigStore::new(initial, Some(path.clone())));
    let api = ControlApi::new(store, routers.clone());

    Harness {
        _dir: dir,
        path,
        api,
        routers,
        running,
    }
}

impl Harness {
    async fn post(&self, uri: &str, body: &str) -> (StatusCode, String) {
        let request = Request::post(uri).body(Body::from(body.to_string())).unwrap();
        let response = self.api.router().oneshot(request).await.unwrap();

        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn on_disk(&self) -> BaseConfig {
        BaseConfig::from_file(&self.path).unwrap()
    }

    fn is_running(&self, name: &str) -> bool {
        self.running.lock().unwrap().contains(name)
    }

    async fn wait_running(&self, name: &str) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !self.is_running(name) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("router {} never started", name));
    }
}

#[tokio::test]
async fn test_add_route_persists_and_starts() {
    let h = harness(BaseConfig::default());

    let (status, body) = h.post("/add", r#"{"ServeNodes":[":8080"],"ChainNodes":[]}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "{code:200,data:success}");

    assert_eq!(h.on_disk().routes, vec![Route::new([":8080"])]);
    h.wait_running(":8080").await;
}

#[tokio::test]
async fn test_unsaved_route_is_not_started() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gone").join("relay.json");
    let h = harness_at(dir, path, BaseConfig::default());

    for _ in 0..2 {
        let (status, body) = h.post("/add", r#"{"ServeNodes":[":1"]}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "{code:200,data:error}");
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.running.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_add_duplicate_identity() {
    let h = harness(BaseConfig::default());

    h.post("/add", r#"{"ServeNodes":[":8080"]}"#).await;
    let (status, body) = h.post("/add", r#"{"serveNodes":[":8080",":8081"],"chainNodes":["hop"]}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "{code:200,data:duplicate}");
    assert_eq!(h.on_disk().routes.len(), 1);
}

#[tokio::test]
async fn test_malformed_body_is_invalid() {
    let h = harness(BaseConfig {
        routes: vec![Route::new([":1"])],
        ..Default::default()
    });

    let (status, body) = h.post("/add", "{ not json").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "{code:200,data:invalid}");

    let (status, body) = h.post("/del", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "{code:200,data:invalid}");

    assert_eq!(h.on_disk().routes, vec![Route::new([":1"])]);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.running.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_is_config_only() {
    let h = harness(BaseConfig::default());

    h.post("/add", r#"{"ServeNodes":[":9000",":9001"]}"#).await;
    h.wait_running(":9000").await;
    h.wait_running(":9001").await;

    let (status, body) = h.post("/del", r#"{"ServeNodes":[":9000"]}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "{code:200,data:success}");

    assert!(h.on_disk().routes.is_empty());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.is_running(":9000"));
    assert!(h.is_running(":9001"));
}

#[tokio::test]
async fn test_delete_unknown_route() {
    let h = harness(BaseConfig {
        routes: vec![Route::new([":1"])],
        ..Default::default()
    });

    let (_, body) = h.post("/del", r#"{"ServeNodes":[":2"]}"#).await;
    assert_eq!(body, "{code:200,data:not-found}");
    assert_eq!(h.on_disk().routes.len(), 1);
}

#[tokio::test]
async fn test_readd_after_delete() {
    let h = harness(BaseConfig::default());
    let route = r#"{"ServeNodes":[":7000"]}"#;

    h.post("/add", route).await;
    h.post("/del", route).await;
    let (_, body) = h.post("/add", route).await;

    assert_eq!(body, "{code:200,data:success}");
    assert_eq!(h.on_disk().routes.len(), 1);
}

#[tokio::test]
async fn test_add_reports_success_when_nothing_starts() {
    let h = harness(BaseConfig::default());

    let (status, body) = h.post("/add", r#"{"ServeNodes":["none://:1"]}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "{code:200,data:success}");

    assert_eq!(h.on_disk().routes.len(), 1);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.running.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_startup_activation() {
    let h = harness(BaseConfig {
        route: Route::new([":1"]),
        routes: vec![Route::new([":2", ":3"]), Route::new(["none://:4"])],
        ..Default::default()
    });

    let config = h.on_disk();
    assert_eq!(h.routers.activate(&config.all_routes()).unwrap(), 3);
    h.wait_running(":3").await;

    let empty = vec![Route::new(["none://:5"])];
    assert!(matches!(h.routers.activate(&empty), Err(RelayError::Activation(_))));
}

#[tokio::test]
async fn test_unknown_path() {
    let h = harness(BaseConfig::default());
    let (status, _) = h.post("/routes", "{}").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
