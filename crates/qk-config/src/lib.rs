//! qk-config
//!
//! Layered YAML configuration for the trading engine and its runners.
//!
//! - Documents merge in order: earlier docs are the base, later docs override
//!   (deep merge on mappings, replace on everything else).
//! - The merged document is canonicalized to JSON and hashed (SHA-256) so a
//!   running engine can report exactly which configuration it loaded.
//! - Literal secrets are rejected; configs carry env var NAMES only.
//! - [`EngineConfig`] is the typed view consumed by `qk-runtime`.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;

use anyhow::{bail, Context, Result};
use qk_model::ParamValue;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Known secret-like prefixes. A leaf string starting with one of these aborts
/// loading with CONFIG_SECRET_DETECTED.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",        // OpenAI style
    "sk_live",    // Stripe live
    "sk_test",    // Stripe test
    "AKIA",       // AWS access key ID
    "-----BEGIN", // PEM private keys
    "ghp_",       // GitHub PAT
    "xoxb-",      // Slack bot token
    "xoxp-",      // Slack user token
];

// ---------------------------------------------------------------------------
// Layered loading
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }

    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        merged = deep_merge(merged, v_json);
    }

    enforce_no_secret_literals(&merged)?;

    let canonical_json = canonicalize_json(&merged)?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}

fn canonicalize_json(v: &Value) -> Result<String> {
    // serde_json::Map is BTreeMap-backed (no preserve_order), so object keys
    // serialize sorted regardless of source order.
    serde_json::to_string(v).context("canonical json serialize failed")
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    let mut leaves = Vec::new();
    collect_leaf_pointers(v, "", &mut leaves);

    for ptr in leaves {
        if let Some(s) = v.pointer(&ptr).and_then(Value::as_str) {
            if looks_like_secret(s) {
                bail!("CONFIG_SECRET_DETECTED leaf={} value=REDACTED", ptr);
            }
        }
    }
    Ok(())
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if t.len() < 8 {
        return false;
    }
    SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}

fn collect_leaf_pointers(v: &Value, prefix: &str, out: &mut Vec<String>) {
    match v {
        Value::Object(map) => {
            for (k, vv) in map.iter() {
                let next = format!("{}/{}", prefix, escape_pointer_token(k));
                collect_leaf_pointers(vv, &next, out);
            }
        }
        Value::Array(arr) => {
            for (i, vv) in arr.iter().enumerate() {
                let next = format!("{}/{}", prefix, i);
                collect_leaf_pointers(vv, &next, out);
            }
        }
        _ => out.push(prefix.to_string()),
    }
}

fn escape_pointer_token(s: &str) -> String {
    s.replace('~', "~0").replace('/', "~1")
}

// ---------------------------------------------------------------------------
// Typed engine configuration
// ---------------------------------------------------------------------------

fn default_enabled() -> bool {
    true
}

/// `engine:` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSection {
    pub name: String,
    /// Static tags consulted by `Engine::filter` / `Engine::check`.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// One `runners:` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Instance name; unique within the engine.
    pub name: String,
    /// Registered runner factory to instantiate.
    pub strategy: String,
    /// Initial parameters handed to `Runner::init`.
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub engine: EngineSection,
    #[serde(default)]
    pub runners: Vec<RunnerConfig>,
}

/// Typed config plus the hash of the merged document it came from.
#[derive(Debug, Clone)]
pub struct LoadedEngineConfig {
    pub config: EngineConfig,
    pub config_hash: String,
}

impl EngineConfig {
    /// Typed view of an already-loaded document, validated.
    pub fn from_loaded(loaded: &LoadedConfig) -> Result<Self> {
        let config: EngineConfig = serde_json::from_value(loaded.config_json.clone())
            .context("engine config does not match the expected schema")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_strings(yaml_docs: &[&str]) -> Result<LoadedEngineConfig> {
        let loaded = load_layered_yaml_from_strings(yaml_docs)?;
        Ok(LoadedEngineConfig {
            config: Self::from_loaded(&loaded)?,
            config_hash: loaded.config_hash,
        })
    }

    /// Runners with `enabled: true`, in file order.
    pub fn enabled_runners(&self) -> impl Iterator<Item = &RunnerConfig> {
        self.runners.iter().filter(|r| r.enabled)
    }

    fn validate(&self) -> Result<()> {
        if self.engine.name.trim().is_empty() {
            bail!("CONFIG_INVALID engine.name must not be empty");
        }
        let mut seen = BTreeSet::new();
        for (i, r) in self.runners.iter().enumerate() {
            if r.name.trim().is_empty() {
                bail!("CONFIG_INVALID runners[{i}].name must not be empty");
            }
            if r.strategy.trim().is_empty() {
                bail!("CONFIG_INVALID runners[{i}].strategy must not be empty");
            }
            if !seen.insert(r.name.as_str()) {
                bail!("CONFIG_INVALID duplicate runner name '{}'", r.name);
            }
        }
        Ok(())
    }
}

pub fn load_engine_config(paths: &[&str]) -> Result<LoadedEngineConfig> {
    let loaded = load_layered_yaml(paths)?;
    Ok(LoadedEngineConfig {
        config: EngineConfig::from_loaded(&loaded)?,
        config_hash: loaded.config_hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = r#"
engine:
  name: "main"
  tags:
    exchange: "binance"
runners:
  - name: "grid-btc"
    strategy: "grid"
    params:
      lever: 3
      ratio: 0.25
      symbol: "BTC_USDT"
      live: false
  - name: "idle"
    strategy: "noop"
    enabled: false
"#;

    #[test]
    fn typed_view_parses_params() {
        let loaded = EngineConfig::from_yaml_strings(&[BASE]).unwrap();
        let cfg = loaded.config;
        assert_eq!(cfg.engine.name, "main");
        assert_eq!(cfg.engine.tags.get("exchange").map(String::as_str), Some("binance"));

        let grid = &cfg.runners[0];
        assert_eq!(grid.params.get("lever"), Some(&ParamValue::Int(3)));
        assert_eq!(grid.params.get("ratio"), Some(&ParamValue::Float(0.25)));
        assert_eq!(grid.params.get("symbol"), Some(&ParamValue::Str("BTC_USDT".into())));
        assert_eq!(grid.params.get("live"), Some(&ParamValue::Bool(false)));
        assert!(grid.enabled);

        let names: Vec<&str> = cfg.enabled_runners().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["grid-btc"]);
    }

    #[test]
    fn overlay_overrides_params() {
        let overlay = r#"
engine:
  tags:
    region: "ap"
"#;
        let loaded = EngineConfig::from_yaml_strings(&[BASE, overlay]).unwrap();
        assert_eq!(loaded.config.engine.tags.len(), 2);
        // arrays are replaced wholesale, not merged
        assert_eq!(loaded.config.runners.len(), 2);
    }

    #[test]
    fn duplicate_runner_names_rejected() {
        let yaml = r#"
engine: { name: "main" }
runners:
  - { name: "a", strategy: "grid" }
  - { name: "a", strategy: "noop" }
"#;
        let err = EngineConfig::from_yaml_strings(&[yaml]).unwrap_err();
        assert!(err.to_string().contains("duplicate runner name 'a'"));
    }

    #[test]
    fn empty_engine_name_rejected() {
        let err = EngineConfig::from_yaml_strings(&["engine: { name: ' ' }"]).unwrap_err();
        assert!(err.to_string().contains("engine.name"));
    }

    #[test]
    fn missing_engine_section_is_schema_error() {
        let err = EngineConfig::from_yaml_strings(&["runners: []"]).unwrap_err();
        assert!(err.to_string().contains("expected schema"));
    }

    #[test]
    fn load_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base.yaml");
        let over = dir.path().join("paper.yaml");
        fs::write(&base, BASE).unwrap();
        fs::write(&over, "engine:\n  name: \"paper\"\n").unwrap();

        let loaded =
            load_engine_config(&[base.to_str().unwrap(), over.to_str().unwrap()]).unwrap();
        assert_eq!(loaded.config.engine.name, "paper");
        assert_eq!(loaded.config_hash.len(), 64);

        let err = load_engine_config(&["/definitely/not/here.yaml"]).unwrap_err();
        assert!(err.to_string().contains("failed to read yaml path"));
    }
}
