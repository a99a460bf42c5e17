//! Resolution of author-facing `tsconfig.json` files.
//!
//! Used by development mode to tell the runtime loader which tsconfig to
//! read. The `extends` chain is flattened here: child values replace
//! ancestor values key by key, except `compilerOptions`, which is merged one
//! level deeper.

use crate::error::{Result, YapError};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const TSCONFIG_FILE: &str = "tsconfig.json";
const COMPILER_OPTIONS: &str = "compilerOptions";

#[derive(Debug, Clone)]
pub struct ResolvedTsconfig {
    /// The tsconfig.json that was found
    pub config_path: PathBuf,
    /// Merged document with `extends` folded in
    pub config: Map<String, Value>,
    /// Absolute `baseUrl`, defaulting to the config's directory
    pub base_url: PathBuf,
    pub paths: HashMap<String, Vec<String>>,
}

/// Strip `//` and `/* */` comments and trailing commas, leaving string
/// literals untouched.
pub fn strip_jsonc(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            _ => out.push(c),
        }
    }

    remove_trailing_commas(&out)
}

fn remove_trailing_commas(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if in_string {
            out.push(c);
            if c == '\\' && i + 1 < chars.len() {
                out.push(chars[i + 1]);
                i += 1;
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
            out.push(c);
        } else if c == ',' {
            let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
            if !matches!(next, Some('}') | Some(']')) {
                out.push(c);
            }
        } else {
            out.push(c);
        }
        i += 1;
    }
    out
}

/// Parse a tsconfig file. `None` when it is absent or not valid JSONC.
pub fn parse_tsconfig(path: &Path) -> Option<Map<String, Value>> {
    let content = fs::read_to_string(path).ok()?;
    match serde_json::from_str::<Value>(&strip_jsonc(&content)) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(path = %path.display(), "Unparseable tsconfig: {}", e);
            None
        }
    }
}

/// Merge `child` over an already resolved `base`.
pub fn merge_over(base: &Map<String, Value>, child: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = base.clone();

    for (key, value) in child {
        if key == "extends" {
            continue;
        }
        match (key.as_str(), value) {
            (COMPILER_OPTIONS, Value::Object(child_opts)) => {
                let mut opts = match merged.get(COMPILER_OPTIONS) {
                    Some(Value::Object(base_opts)) => base_opts.clone(),
                    _ => Map::new(),
                };
                for (k, v) in child_opts {
                    opts.insert(k.clone(), v.clone());
                }
                merged.insert(key.clone(), Value::Object(opts));
            }
            _ => {
                merged.insert(key.clone(), value.clone());
            }
        }
    }

    merged.remove("extends");
    merged
}

/// Fold the `extends` chain of `config` (located in `config_dir`).
///
/// `visited` carries the files already on the chain; revisiting one is a
/// cycle. A missing or unparseable parent ends the chain.
fn resolve_extends(
    config: Map<String, Value>,
    config_dir: &Path,
    visited: &mut Vec<PathBuf>,
) -> Result<Map<String, Value>> {
    let Some(Value::String(parent)) = config.get("extends") else {
        return Ok(config);
    };

    let parent_path = config_dir.join(parent);
    let key = fs::canonicalize(&parent_path).unwrap_or_else(|_| crate::paths::normalize(&parent_path));
    if visited.contains(&key) {
        let mut chain = visited.clone();
        chain.push(key);
        return Err(YapError::ConfigInheritanceCycle { chain });
    }

    let Some(parent_config) = parse_tsconfig(&parent_path) else {
        tracing::debug!(parent = %parent_path.display(), "Parent tsconfig unavailable, stopping chain");
        return Ok(merge_over(&Map::new(), &config));
    };

    visited.push(key);
    let parent_dir = parent_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config_dir.to_path_buf());
    let resolved_parent = resolve_extends(parent_config, &parent_dir, visited)?;

    Ok(merge_over(&resolved_parent, &config))
}

/// Load a single tsconfig file and flatten its inheritance chain.
pub fn load_merged(path: &Path) -> Result<Option<Map<String, Value>>> {
    let Some(config) = parse_tsconfig(path) else {
        return Ok(None);
    };
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let start = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let mut visited = vec![start];
    resolve_extends(config, dir, &mut visited).map(Some)
}

/// Walk upward from `start_dir` (stopping before `stop_dir` if given) to the
/// first parseable `tsconfig.json` and resolve it.
pub fn resolve_tsconfig(start_dir: &Path, stop_dir: Option<&Path>) -> Result<Option<ResolvedTsconfig>> {
    let mut current = Some(start_dir);

    while let Some(dir) = current {
        if stop_dir.is_some_and(|stop| dir == stop) {
            break;
        }

        let config_path = dir.join(TSCONFIG_FILE);
        if let Some(config) = load_merged(&config_path)? {
            let options = config.get(COMPILER_OPTIONS).and_then(Value::as_object);

            let base_url = options
                .and_then(|o| o.get("baseUrl"))
                .and_then(Value::as_str)
                .map(|b| crate::paths::normalize(&dir.join(b)))
                .unwrap_or_else(|| dir.to_path_buf());

            let paths = options
                .and_then(|o| o.get("paths"))
                .and_then(|p| serde_json::from_value(p.clone()).ok())
                .unwrap_or_default();

            tracing::debug!(path = %config_path.display(), "Resolved tsconfig");
            return Ok(Some(ResolvedTsconfig {
                config_path,
                config,
                base_url,
                paths,
            }));
        }

        current = dir.parent();
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_strip_jsonc() {
        let input = r#"{
            // comment
            "a": "http://x", /* block */
            "b": [1, 2,],
        }"#;
        let parsed: Value = serde_json::from_str(&strip_jsonc(input)).unwrap();
        assert_eq!(parsed, json!({"a": "http://x", "b": [1, 2]}));
    }

    #[test]
    fn test_strip_jsonc_keeps_comment_like_strings() {
        let input = r#"{"glob": "src/**/*.ts", "s": "a, }"}"#;
        let parsed: Value = serde_json::from_str(&strip_jsonc(input)).unwrap();
        assert_eq!(parsed["glob"], "src/**/*.ts");
        assert_eq!(parsed["s"], "a, }");
    }

    #[test]
    fn test_child_wins_at_leaf_granularity() {
        let base = obj(json!({
            "compilerOptions": {"target": "ES2017", "strict": true},
            "include": ["a"]
        }));
        let child = obj(json!({
            "extends": "./base.json",
            "compilerOptions": {"target": "ES2022"},
            "include": ["b"]
        }));
        let merged = merge_over(&base, &child);
        assert_eq!(merged["compilerOptions"], json!({"target": "ES2022", "strict": true}));
        // non-compilerOptions keys are replaced wholesale
        assert_eq!(merged["include"], json!(["b"]));
        assert!(merged.get("extends").is_none());
    }

    #[test]
    fn test_merge_is_associative() {
        let a = obj(json!({"compilerOptions": {"x": 1, "y": 1, "z": 1}, "files": ["a"]}));
        let b = obj(json!({"compilerOptions": {"y": 2}, "exclude": ["b"]}));
        let c = obj(json!({"compilerOptions": {"z": 3}, "files": ["c"]}));

        let left = merge_over(&merge_over(&a, &b), &c);
        let right = merge_over(&a, &merge_over(&b, &c));
        assert_eq!(left, right);
        assert_eq!(left["compilerOptions"], json!({"x": 1, "y": 2, "z": 3}));
    }

    #[test]
    fn test_three_link_chain_from_disk() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("apps/api")).unwrap();
        fs::write(
            root.join("tsconfig.base.json"),
            r#"{"compilerOptions": {"target": "ES2017", "strict": true, "baseUrl": "."}}"#,
        )
        .unwrap();
        fs::write(
            root.join("tsconfig.json"),
            r#"{
                // root config
                "extends": "./tsconfig.base.json",
                "compilerOptions": {"target": "ES2021", "paths": {"@libs/shared": ["libs/shared/src"]}},
            }"#,
        )
        .unwrap();
        fs::write(
            root.join("apps/api/tsconfig.json"),
            r#"{"extends": "../../tsconfig.json", "compilerOptions": {"target": "ES2022"}}"#,
        )
        .unwrap();

        let resolved = resolve_tsconfig(&root.join("apps/api"), None).unwrap().unwrap();
        assert_eq!(resolved.config_path, root.join("apps/api/tsconfig.json"));
        let opts = &resolved.config["compilerOptions"];
        assert_eq!(opts["target"], "ES2022");
        assert_eq!(opts["strict"], true);
        assert_eq!(resolved.paths["@libs/shared"], vec!["libs/shared/src"]);
        // baseUrl inherited as "." is read relative to the resolved file's directory
        assert_eq!(resolved.base_url, root.join("apps/api"));
    }

    #[test]
    fn test_walks_upward_to_first_config() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("apps/api/src")).unwrap();
        fs::write(root.join("tsconfig.json"), r#"{"compilerOptions": {}}"#).unwrap();

        let resolved = resolve_tsconfig(&root.join("apps/api/src"), None).unwrap().unwrap();
        assert_eq!(resolved.config_path, root.join("tsconfig.json"));
        assert!(resolve_tsconfig(&root.join("apps/api/src"), Some(root)).unwrap().is_none());
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("tsconfig.json"), r#"{"extends": "./tsconfig.json"}"#).unwrap();

        let err = resolve_tsconfig(temp.path(), None).unwrap_err();
        assert!(matches!(err, YapError::ConfigInheritanceCycle { .. }));
    }

    #[test]
    fn test_mutual_reference_is_a_cycle() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("tsconfig.json"), r#"{"extends": "./a.json"}"#).unwrap();
        fs::write(temp.path().join("a.json"), r#"{"extends": "./b.json"}"#).unwrap();
        fs::write(temp.path().join("b.json"), r#"{"extends": "./a.json"}"#).unwrap();

        match load_merged(&temp.path().join("tsconfig.json")) {
            Err(YapError::ConfigInheritanceCycle { chain }) => {
                assert_eq!(chain.len(), 4);
                assert_eq!(chain.first().unwrap().file_name().unwrap(), "tsconfig.json");
                assert_eq!(chain.last().unwrap().file_name().unwrap(), "a.json");
            }
            other => panic!("expected cycle, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_missing_parent_ends_chain() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("tsconfig.json"),
            r#"{"extends": "./missing.json", "compilerOptions": {"strict": true}}"#,
        )
        .unwrap();
        let merged = load_merged(&temp.path().join("tsconfig.json")).unwrap().unwrap();
        assert_eq!(merged["compilerOptions"]["strict"], true);
        assert!(merged.get("extends").is_none());
    }
}
