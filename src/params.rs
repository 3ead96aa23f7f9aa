//! Textual `key=value` parameter pairs, `;`-separated, as exchanged with
//! the framework's set/get parameter calls.

use crate::transport::ParamRange;

pub const PARAM_CARD: &str = "card";
pub const PARAM_DEVICE: &str = "device";
pub const PARAM_SUP_SAMPLING_RATES: &str = "sup_sampling_rates";
pub const PARAM_SUP_CHANNELS: &str = "sup_channels";
pub const PARAM_SUP_FORMATS: &str = "sup_formats";

#[derive(Debug, Default, Clone)]
pub struct Params {
    pairs: Vec<(String, String)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fragment without `=` is a bare key with an empty value (queries
    /// arrive that way). Fragments with an empty key are skipped, unknown
    /// keys kept; callers pick out what they recognize.
    pub fn parse(kvpairs: &str) -> Self {
        let pairs = kvpairs
            .split(';')
            .filter_map(|fragment| {
                let fragment = fragment.trim();
                if fragment.is_empty() {
                    return None;
                }
                match fragment.split_once('=') {
                    Some((key, value)) => {
                        let key = key.trim();
                        if key.is_empty() {
                            return None;
                        }
                        Some((key.to_string(), value.trim().to_string()))
                    }
                    None => Some((fragment.to_string(), String::new())),
                }
            })
            .collect();
        Self { pairs }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_i32(&self, key: &str) -> Option<i32> {
        self.get(key)?.parse().ok()
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn add(&mut self, key: &str, value: impl ToString) {
        self.pairs.push((key.to_string(), value.to_string()));
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn encode(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.pairs {
            if !out.is_empty() {
                out.push(';');
            }
            out.push_str(key);
            out.push('=');
            out.push_str(value);
        }
        out
    }
}

/// Render a capability range the way queries expect it: a single integer,
/// or `min|max` when the range is non-degenerate.
pub fn format_range(range: ParamRange) -> String {
    if range.min == range.max {
        format!("{}", range.min)
    } else {
        format!("{}|{}", range.min, range.max)
    }
}
