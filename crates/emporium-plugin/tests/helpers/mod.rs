//! Shared fixtures for plugin runtime integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Value, json};
use tempfile::TempDir;

use emporium_core::config::{ActivationSeed, HandlerSeed, PluginConfig};
use emporium_plugin::prelude::*;

/// Appends `entry` to the `trace` array carried by the event.
pub fn trace(event: &mut HookEvent, entry: String) {
    let mut entries = event
        .get_data("trace")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    entries.push(json!(entry));
    event.set("trace", Value::Array(entries));
}

/// Reads the `trace` array back as strings.
pub fn read_trace(event: &HookEvent) -> Vec<String> {
    event
        .get_data("trace")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|e| e.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Subscriber that records every call as `code::method@hook`.
#[derive(Debug)]
pub struct RecordingSubscriber {
    code: String,
    methods: Vec<&'static str>,
}

#[async_trait]
impl EventSubscriber for RecordingSubscriber {
    fn handles(&self, method: &str) -> bool {
        self.methods.iter().any(|m| *m == method)
    }

    async fn call(&self, method: &str, event: &mut HookEvent) -> AppResult<()> {
        if method == "onFail" {
            return Err(AppError::plugin("listener failure"));
        }
        let entry = format!("{}::{}@{}", self.code, method, event.name);
        trace(event, entry);
        if method == "onGuard" {
            event.stop_propagation();
        }
        Ok(())
    }
}

/// Registers the subscriber types used by the fixture plugins.
pub fn factories() -> PluginFactoryRegistry {
    let mut factories = PluginFactoryRegistry::new();
    factories.register_subscriber("LoyaltyEvent", |ctx: &PluginContext| {
        Arc::new(RecordingSubscriber {
            code: ctx.code.clone(),
            methods: vec!["onOrderCompleted", "onFrontRequest", "onBeforeRender", "onResponse"],
        }) as Arc<dyn EventSubscriber>
    });
    factories.register_subscriber("CouponEvent", |ctx: &PluginContext| {
        Arc::new(RecordingSubscriber {
            code: ctx.code.clone(),
            methods: vec!["onGuard", "onRequest", "onResponse", "onFail"],
        }) as Arc<dyn EventSubscriber>
    });
    factories
}

/// Writes a plugin directory.
pub fn write_plugin(root: &Path, code: &str, config: &str, events: Option<&str>) {
    let dir = root.join(code);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.yml"), config).unwrap();
    if let Some(events) = events {
        fs::write(dir.join("event.yml"), events).unwrap();
    }
}

/// A plugin root with `loyalty`, `coupon`, and an incomplete `broken` plugin.
pub struct Fixture {
    pub tmp: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let plugins = tmp.path().join("Plugin");

        write_plugin(
            &plugins,
            "loyalty",
            "name: Loyalty Points\ncode: loyalty\nversion: 1.0.0\nevent: LoyaltyEvent\nconst:\n  points_rate: 5\n",
            Some(
                "order.completed:\n  - [onOrderCompleted, NORMAL]\nfront.request:\n  - onFrontRequest\nroute.product_detail.before-render:\n  - onBeforeRender\nroute.product_detail.response:\n  - onResponse\n",
            ),
        );
        write_plugin(
            &plugins,
            "coupon",
            "name: Coupon\ncode: coupon\nversion: 2.1.0\nevent: CouponEvent\n",
            Some(
                "global.request:\n  - onGuard\nfront.request:\n  - onRequest\nglobal.response:\n  - onResponse\nglobal.exception:\n  - onFail\n",
            ),
        );
        fs::create_dir_all(plugins.join("broken")).unwrap();

        Self { tmp }
    }

    pub fn plugin_dir(&self) -> PathBuf {
        self.tmp.path().join("Plugin")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.tmp.path().join("cache")
    }

    pub fn config(&self, debug: bool) -> PluginConfig {
        PluginConfig {
            directory: self.plugin_dir().to_string_lossy().into_owned(),
            cache_dir: self.cache_dir().to_string_lossy().into_owned(),
            debug,
            activations: seeds(),
            ..PluginConfig::default()
        }
    }
}

fn seeds() -> Vec<ActivationSeed> {
    vec![
        ActivationSeed {
            code: "loyalty".to_string(),
            class_name: "LoyaltyEvent".to_string(),
            enabled: true,
            deleted: false,
            handlers: Vec::new(),
        },
        ActivationSeed {
            code: "coupon".to_string(),
            class_name: "CouponEvent".to_string(),
            enabled: true,
            deleted: false,
            handlers: vec![HandlerSeed {
                event: "front.request".to_string(),
                handler: "onRequest".to_string(),
                priority: 100,
            }],
        },
    ]
}
