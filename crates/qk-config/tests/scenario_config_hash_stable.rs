//! Config hash stability.
//!
//! - Same documents hash identically across loads.
//! - Key order inside a document does not affect the hash.
//! - Changing a runner parameter changes the hash.
//! - Layer order matters: the later layer wins.

use qk_config::{load_layered_yaml_from_strings, EngineConfig};

const BASE_YAML: &str = r#"
engine:
  name: "main"
  tags:
    exchange: "okx"
    account: "sub-1"
runners:
  - name: "trend-eth"
    strategy: "trend"
    params:
      bin_secs: 300
      lever: 2.0
"#;

const BASE_YAML_REORDERED: &str = r#"
runners:
  - params:
      lever: 2.0
      bin_secs: 300
    strategy: "trend"
    name: "trend-eth"
engine:
  tags:
    account: "sub-1"
    exchange: "okx"
  name: "main"
"#;

const OVERLAY_YAML: &str = r#"
engine:
  name: "paper"
"#;

#[test]
fn same_input_produces_identical_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();

    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.canonical_json, b.canonical_json);
    assert_eq!(a.config_hash.len(), 64, "sha256 hex is 64 chars");
}

#[test]
fn key_order_does_not_change_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();

    assert_eq!(
        a.config_hash, b.config_hash,
        "canonicalization must sort keys before hashing"
    );
}

#[test]
fn different_params_produce_different_hash() {
    let changed = BASE_YAML.replace("bin_secs: 300", "bin_secs: 60");
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[changed.as_str()]).unwrap();

    assert_ne!(a.config_hash, b.config_hash);
}

#[test]
fn overlay_wins_and_typed_hash_matches_raw_hash() {
    let raw = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    let typed = EngineConfig::from_yaml_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();

    assert_eq!(typed.config.engine.name, "paper");
    assert_eq!(typed.config.engine.tags.len(), 2, "overlay keeps sibling keys");
    assert_eq!(typed.config_hash, raw.config_hash);

    let reversed = load_layered_yaml_from_strings(&[OVERLAY_YAML, BASE_YAML]).unwrap();
    assert_ne!(reversed.config_hash, raw.config_hash);
    assert_eq!(
        reversed.config_json.pointer("/engine/name").and_then(|v| v.as_str()),
        Some("main")
    );
}
