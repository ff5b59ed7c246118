// Copyright (c) 2026 Lessonforge Contributors
//
// SPDX-License-Identifier: MIT
use std::path::Path;

use anyhow::Context;
use tracing::debug;

use crate::Config;

/// Load configuration, optionally merging a YAML file over the defaults.
/// CLI search-path discovery (the way `sven-config::loader` scans
/// `/etc`, `$XDG_CONFIG_HOME`, and the workspace) is bootstrapping and out
/// of scope here — the caller supplies the one path it cares about.
pub fn load(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    debug!(path = %path.display(), "loading config");
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    from_yaml_str(&text)
}

/// Merge a YAML document over `Config::default()` so partial documents
/// (most fields omitted) still produce a fully-populated config.
pub fn from_yaml_str(text: &str) -> anyhow::Result<Config> {
    let defaults = serde_yaml::to_value(Config::default())?;
    let layer: serde_yaml::Value = serde_yaml::from_str(text).context("parsing config YAML")?;
    let mut merged = defaults;
    merge_yaml(&mut merged, layer);
    let config: Config = serde_yaml::from_value(merged).context("deserializing merged config")?;
    Ok(config)
}

/// Deep-merge `src` into `dst`; `src` wins on scalar conflicts.
fn merge_yaml(dst: &mut serde_yaml::Value, src: serde_yaml::Value) {
    match (dst, src) {
        (serde_yaml::Value::Mapping(d), serde_yaml::Value::Mapping(s)) => {
            for (k, v) in s {
                let entry = d
                    .entry(k)
                    .or_insert(serde_yaml::Value::Mapping(serde_yaml::Mapping::new()));
                merge_yaml(entry, v);
            }
        }
        (dst, src) => *dst = src,
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn no_path_returns_defaults() {
        let cfg = load(None).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn missing_path_is_an_error() {
        let result = load(Some(Path::new("/tmp/lessonforge_nonexistent_config.yaml")));
        assert!(result.is_err());
    }

    #[test]
    fn partial_yaml_overrides_only_named_fields() {
        let cfg = from_yaml_str("max_retries: 7\ncontext_top_k: 9\n").unwrap();
        assert_eq!(cfg.max_retries, 7);
        assert_eq!(cfg.context_top_k, 9);
        // Untouched fields keep their defaults.
        assert_eq!(cfg.mmr_lambda, Config::default().mmr_lambda);
    }

    #[test]
    fn nested_mapping_merge_preserves_sibling_keys() {
        let cfg = from_yaml_str("rate_limiter:\n  burst: 42\n").unwrap();
        assert_eq!(cfg.rate_limiter.burst, 42);
        assert_eq!(cfg.rate_limiter.rate, Config::default().rate_limiter.rate);
    }

    #[test]
    fn load_from_file_applies_overrides() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "max_retries: 1").unwrap();
        let cfg = load(Some(f.path())).unwrap();
        assert_eq!(cfg.max_retries, 1);
    }

    #[test]
    fn agent_base_urls_map_is_merged_in() {
        let cfg = from_yaml_str(
            "agent_base_urls:\n  summarizer: https://summarizer.internal\n",
        )
        .unwrap();
        assert_eq!(
            cfg.agent_base_urls.get("summarizer").map(String::as_str),
            Some("https://summarizer.internal")
        );
    }
}
