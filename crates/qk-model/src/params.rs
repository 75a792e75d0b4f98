//! Dynamic runner parameters.
//!
//! [`ParamData`] is the per-runner configuration store. Values are loosely
//! typed ([`ParamValue`]) because they come from operators and config files;
//! the typed accessors coerce and never fail, returning the zero value of the
//! requested type on a missing key or an unsupported stored kind.
//!
//! Float-to-integer coercion rounds half to even (`2.5 -> 2`, `3.5 -> 4`).

use std::collections::BTreeMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

// ---------------------------------------------------------------------------
// ParamValue
// ---------------------------------------------------------------------------

/// A single stored parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ParamValue {
    /// Str as-is; Int as decimal text; Float rounded to zero decimals; Bool -> "".
    pub fn coerce_string(&self) -> String {
        match self {
            ParamValue::Str(s) => s.clone(),
            ParamValue::Int(i) => i.to_string(),
            ParamValue::Float(f) => format!("{:.0}", f.round_ties_even()),
            ParamValue::Bool(_) => String::new(),
        }
    }

    /// Bool as-is; Int is true only for 1; everything else false.
    pub fn coerce_bool(&self) -> bool {
        match self {
            ParamValue::Bool(b) => *b,
            ParamValue::Int(i) => *i == 1,
            ParamValue::Float(_) | ParamValue::Str(_) => false,
        }
    }

    /// Int as-is; Float rounded half to even (0 when out of i64 range or NaN);
    /// everything else 0.
    pub fn coerce_int(&self) -> i64 {
        match self {
            ParamValue::Int(i) => *i,
            ParamValue::Float(f) => round_to_i64(*f).unwrap_or(0),
            ParamValue::Bool(_) | ParamValue::Str(_) => 0,
        }
    }

    /// Int widened; Float as-is; everything else 0.0.
    pub fn coerce_float(&self) -> f64 {
        match self {
            ParamValue::Int(i) => *i as f64,
            ParamValue::Float(f) => *f,
            ParamValue::Bool(_) | ParamValue::Str(_) => 0.0,
        }
    }

    /// JSON form; `None` for a non-finite float.
    pub fn to_json(&self) -> Option<Value> {
        Some(match self {
            ParamValue::Bool(b) => Value::Bool(*b),
            ParamValue::Int(i) => Value::Number((*i).into()),
            ParamValue::Float(f) => Value::Number(Number::from_f64(*f)?),
            ParamValue::Str(s) => Value::String(s.clone()),
        })
    }

    pub fn kind(&self) -> ParamKind {
        match self {
            ParamValue::Bool(_) => ParamKind::Bool,
            ParamValue::Int(_) => ParamKind::Int,
            ParamValue::Float(_) => ParamKind::Float,
            ParamValue::Str(_) => ParamKind::String,
        }
    }
}

fn round_to_i64(f: f64) -> Option<i64> {
    let r = f.round_ties_even();
    // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive.
    if r.is_finite() && r >= i64::MIN as f64 && r < i64::MAX as f64 {
        Some(r as i64)
    } else {
        None
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(v.into())
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        ParamValue::Int(v.into())
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<f32> for ParamValue {
    fn from(v: f32) -> Self {
        ParamValue::Float(v.into())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Str(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

// ---------------------------------------------------------------------------
// Static metadata
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Int,
    Float,
    Bool,
}

impl ParamKind {
    /// Read `key` from `data` through the accessor matching this kind.
    pub fn read(&self, data: &ParamData, key: &str) -> ParamValue {
        match self {
            ParamKind::String => ParamValue::Str(data.get_string(key)),
            ParamKind::Int => ParamValue::Int(data.get_int(key)),
            ParamKind::Float => ParamValue::Float(data.get_float(key)),
            ParamKind::Bool => ParamValue::Bool(data.get_bool(key)),
        }
    }
}

/// Describes a parameter a runner expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub kind: ParamKind,
    #[serde(default)]
    pub info: String,
}

impl Param {
    pub fn new(name: impl Into<String>, kind: ParamKind, info: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            info: info.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ParamData
// ---------------------------------------------------------------------------

/// Concurrency-safe parameter map shared between a runner and its engine.
///
/// Every operation takes the internal lock for its own duration only; there
/// is no multi-key atomicity. Last write wins per key.
#[derive(Debug, Default)]
pub struct ParamData {
    values: RwLock<BTreeMap<String, ParamValue>>,
}

impl ParamData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(values: BTreeMap<String, ParamValue>) -> Self {
        Self {
            values: RwLock::new(values),
        }
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.values.write().insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<ParamValue> {
        self.values.read().get(key).cloned()
    }

    pub fn remove(&self, key: &str) -> Option<ParamValue> {
        self.values.write().remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.values.read().keys().cloned().collect()
    }

    /// Insert every pair, overwriting existing keys.
    pub fn extend<I>(&self, values: I)
    where
        I: IntoIterator<Item = (String, ParamValue)>,
    {
        self.values.write().extend(values);
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> BTreeMap<String, ParamValue> {
        self.values.read().clone()
    }

    pub fn get_string(&self, key: &str) -> String {
        self.get(key).map(|v| v.coerce_string()).unwrap_or_default()
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key).map(|v| v.coerce_bool()).unwrap_or_default()
    }

    pub fn get_int(&self, key: &str) -> i64 {
        self.get(key).map(|v| v.coerce_int()).unwrap_or_default()
    }

    pub fn get_float(&self, key: &str) -> f64 {
        self.get(key).map(|v| v.coerce_float()).unwrap_or_default()
    }

    /// JSON object of all current pairs, keys sorted.
    ///
    /// Returns `""` if any value cannot be represented in JSON (NaN, ±inf).
    pub fn pack(&self) -> String {
        let values = self.snapshot();
        let mut doc = Map::new();
        for (key, value) in values {
            let Some(json) = value.to_json() else {
                return String::new();
            };
            doc.insert(key, json);
        }
        serde_json::to_string(&Value::Object(doc)).unwrap_or_default()
    }

    /// Rebuild a store from a [`pack`](Self::pack) snapshot.
    pub fn unpack(packed: &str) -> Result<ParamData, serde_json::Error> {
        let values: BTreeMap<String, ParamValue> = serde_json::from_str(packed)?;
        Ok(ParamData::from_map(values))
    }
}

impl Clone for ParamData {
    fn clone(&self) -> Self {
        ParamData::from_map(self.snapshot())
    }
}

impl FromIterator<(String, ParamValue)> for ParamData {
    fn from_iter<I: IntoIterator<Item = (String, ParamValue)>>(iter: I) -> Self {
        ParamData::from_map(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn missing_key_yields_zero_values() {
        let d = ParamData::new();
        assert_eq!(d.get_string("nope"), "");
        assert!(!d.get_bool("nope"));
        assert_eq!(d.get_int("nope"), 0);
        assert_eq!(d.get_float("nope"), 0.0);
        assert!(d.get("nope").is_none());
    }

    #[test]
    fn get_string_coercions() {
        let d = ParamData::new();
        d.set("s", "grid");
        d.set("i", 5);
        d.set("neg", -42i64);
        d.set("f", 3.7);
        d.set("b", true);
        assert_eq!(d.get_string("s"), "grid");
        assert_eq!(d.get_string("i"), "5");
        assert_eq!(d.get_string("neg"), "-42");
        assert_eq!(d.get_string("f"), "4");
        assert_eq!(d.get_string("b"), "");
    }

    #[test]
    fn get_bool_coercions() {
        let d = ParamData::new();
        d.set("t", true);
        d.set("one", 1);
        d.set("zero", 0);
        d.set("two", 2);
        d.set("f", 1.0);
        d.set("s", "true");
        assert!(d.get_bool("t"));
        assert!(d.get_bool("one"));
        assert!(!d.get_bool("zero"));
        assert!(!d.get_bool("two"));
        assert!(!d.get_bool("f"));
        assert!(!d.get_bool("s"));
    }

    #[test]
    fn get_int_coercions() {
        let d = ParamData::new();
        d.set("i", 7);
        d.set("f", 3.7);
        d.set("f_neg", -3.7);
        d.set("s", "12");
        d.set("b", true);
        d.set("nan", f64::NAN);
        d.set("huge", 1e30);
        assert_eq!(d.get_int("i"), 7);
        assert_eq!(d.get_int("f"), 4);
        assert_eq!(d.get_int("f_neg"), -4);
        assert_eq!(d.get_int("s"), 0);
        assert_eq!(d.get_int("b"), 0);
        assert_eq!(d.get_int("nan"), 0);
        assert_eq!(d.get_int("huge"), 0);
    }

    #[test]
    fn rounding_ties_to_even() {
        let d = ParamData::new();
        for (key, v, want) in [
            ("a", 2.5, 2),
            ("b", 3.5, 4),
            ("c", -2.5, -2),
            ("d", 0.5, 0),
            ("e", 2.4999, 2),
        ] {
            d.set(key, v);
            assert_eq!(d.get_int(key), want, "get_int({v})");
            assert_eq!(d.get_string(key), want.to_string(), "get_string({v})");
        }
    }

    #[test]
    fn get_float_coercions() {
        let d = ParamData::new();
        d.set("i", 3);
        d.set("f", 0.25);
        d.set("s", "0.25");
        d.set("b", true);
        assert_eq!(d.get_float("i"), 3.0);
        assert_eq!(d.get_float("f"), 0.25);
        assert_eq!(d.get_float("s"), 0.0);
        assert_eq!(d.get_float("b"), 0.0);
    }

    #[test]
    fn pack_empty_and_single() {
        let d = ParamData::new();
        assert_eq!(d.pack(), "{}");

        d.set("lever", 3);
        assert_eq!(d.pack(), r#"{"lever":3}"#);
    }

    #[test]
    fn pack_is_sorted_and_typed() {
        let d = ParamData::new();
        d.set("z", "x");
        d.set("a", 1.5);
        d.set("m", false);
        assert_eq!(d.pack(), r#"{"a":1.5,"m":false,"z":"x"}"#);
    }

    #[test]
    fn pack_non_finite_is_empty() {
        let d = ParamData::new();
        d.set("ok", 1);
        d.set("bad", f64::INFINITY);
        assert_eq!(d.pack(), "");
    }

    #[test]
    fn unpack_restores_kinds() {
        let d = ParamData::unpack(r#"{"lever":3,"ratio":0.5,"name":"grid","live":true}"#).unwrap();
        assert_eq!(d.get("lever"), Some(ParamValue::Int(3)));
        assert_eq!(d.get("ratio"), Some(ParamValue::Float(0.5)));
        assert_eq!(d.get("name"), Some(ParamValue::Str("grid".into())));
        assert_eq!(d.get("live"), Some(ParamValue::Bool(true)));
        assert!(ParamData::unpack("[1,2]").is_err());
    }

    #[test]
    fn param_kind_reads_through_accessors() {
        let d = ParamData::new();
        d.set("period", 14.4);
        let p = Param::new("period", ParamKind::Int, "lookback");
        assert_eq!(p.kind.read(&d, &p.name), ParamValue::Int(14));
        assert_eq!(ParamKind::String.read(&d, "period"), ParamValue::Str("14".into()));
        assert_eq!(ParamValue::Float(1.0).kind(), ParamKind::Float);
    }

    #[test]
    fn concurrent_set_get_never_garbles() {
        let d = Arc::new(ParamData::new());
        let writers = 8;
        let rounds = 500;

        std::thread::scope(|s| {
            for w in 0..writers {
                let d = Arc::clone(&d);
                s.spawn(move || {
                    for r in 0..rounds {
                        d.set("shared", format!("w{w}-r{r}"));
                        d.set(format!("own-{w}"), r as i64);
                    }
                });
            }
            for _ in 0..4 {
                let d = Arc::clone(&d);
                s.spawn(move || {
                    for _ in 0..rounds {
                        if let Some(ParamValue::Str(v)) = d.get("shared") {
                            let (w, r) = v.split_once('-').expect("well-formed value");
                            assert!(w.starts_with('w'));
                            assert!(r.starts_with('r'));
                        }
                        let _ = d.pack();
                    }
                });
            }
        });

        for w in 0..writers {
            assert_eq!(d.get_int(&format!("own-{w}")), rounds as i64 - 1);
        }
        assert_eq!(d.len(), writers + 1);
    }
}
