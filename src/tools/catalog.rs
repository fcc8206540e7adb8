//! ToolCatalog - per-tool input schemas and resource classification

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::domain::{Fingerprint, ProposedAction, ToolInput};

use super::ValidationError;

/// How a tool affects the resources it names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Effect {
    Read,
    Write,
    /// Shell-style command with ambient side effects
    External,
}

/// JSON type accepted for a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Integer,
    Bool,
}

impl ParamType {
    fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Bool => value.is_boolean(),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::String => "a string",
            Self::Integer => "an integer",
            Self::Bool => "a boolean",
        }
    }
}

/// One accepted parameter of a tool
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamType,
    pub required: bool,
    /// Alternate spellings folded into `name` during validation
    pub aliases: &'static [&'static str],
}

impl ParamSpec {
    pub fn required(name: &'static str, kind: ParamType) -> Self {
        Self {
            name,
            kind,
            required: true,
            aliases: &[],
        }
    }

    pub fn optional(name: &'static str, kind: ParamType) -> Self {
        Self {
            name,
            kind,
            required: false,
            aliases: &[],
        }
    }

    pub fn aliases(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }

    fn accepts_key(&self, key: &str) -> bool {
        self.name == key || self.aliases.contains(&key)
    }
}

/// Where a tool's target (resource name or command line) comes from
#[derive(Debug, Clone)]
pub enum Target {
    /// Taken from a parameter, with a fallback when the parameter is optional
    Param { key: &'static str, default: &'static str },
    /// Always the same named resource (e.g. the repository root)
    Fixed(&'static str),
}

/// Schema and classification of one tool
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub effect: Effect,
    pub target: Target,
    pub params: Vec<ParamSpec>,
    /// Static duration estimate used for the parallelization-gain heuristic
    pub estimate: Duration,
    /// Outputs may be served from the lookup cache
    pub cacheable: bool,
}

impl ToolSpec {
    pub fn new(name: &'static str, effect: Effect, target: Target) -> Self {
        Self {
            name,
            effect,
            target,
            params: Vec::new(),
            estimate: Duration::from_millis(100),
            cacheable: false,
        }
    }

    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    pub fn estimate_ms(mut self, ms: u64) -> Self {
        self.estimate = Duration::from_millis(ms);
        self
    }

    pub fn cacheable(mut self) -> Self {
        self.cacheable = true;
        self
    }

    fn param_for(&self, key: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.accepts_key(key))
    }

    fn resolve_target(&self, input: &ToolInput) -> String {
        match &self.target {
            Target::Param { key, default } => input
                .get(*key)
                .and_then(Value::as_str)
                .unwrap_or(default)
                .to_string(),
            Target::Fixed(resource) => resource.to_string(),
        }
    }
}

/// A proposal that passed schema validation, with aliases folded
#[derive(Debug, Clone)]
pub struct ValidatedCall {
    pub id: String,
    pub tool: String,
    pub input: ToolInput,
    pub fingerprint: Fingerprint,
    pub effect: Effect,
    /// Resource name for reads/writes, command line for external calls
    pub target: String,
    pub estimate: Duration,
}

/// Registry of tool schemas known to the driver
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    tools: HashMap<String, ToolSpec>,
}

impl ToolCatalog {
    /// Catalog with the standard filesystem, git, search and shell tools
    pub fn standard() -> Self {
        use ParamType::{Bool, Integer, String as Str};

        let mut catalog = Self::empty();

        // Filesystem reads
        catalog.add(
            ToolSpec::new("read_file", Effect::Read, Target::Param { key: "path", default: "." })
                .param(ParamSpec::required("path", Str).aliases(&["file", "file_path", "filename"]))
                .param(ParamSpec::optional("offset", Integer))
                .param(ParamSpec::optional("limit", Integer))
                .estimate_ms(50),
        );
        catalog.add(
            ToolSpec::new("list_directory", Effect::Read, Target::Param { key: "path", default: "." })
                .param(ParamSpec::optional("path", Str).aliases(&["dir", "directory"]))
                .param(ParamSpec::optional("recursive", Bool))
                .estimate_ms(50),
        );
        catalog.add(
            ToolSpec::new("search_files", Effect::Read, Target::Param { key: "path", default: "." })
                .param(ParamSpec::required("pattern", Str).aliases(&["query", "regex"]))
                .param(ParamSpec::optional("path", Str).aliases(&["dir", "directory"]))
                .estimate_ms(200),
        );
        catalog.add(
            ToolSpec::new("lint", Effect::Read, Target::Param { key: "path", default: "." })
                .param(ParamSpec::optional("path", Str).aliases(&["file", "file_path"]))
                .estimate_ms(1500),
        );

        // Filesystem writes
        catalog.add(
            ToolSpec::new("write_file", Effect::Write, Target::Param { key: "path", default: "." })
                .param(ParamSpec::required("path", Str).aliases(&["file", "file_path", "filename"]))
                .param(ParamSpec::required("content", Str).aliases(&["text", "data"]))
                .estimate_ms(50),
        );
        catalog.add(
            ToolSpec::new("edit_file", Effect::Write, Target::Param { key: "path", default: "." })
                .param(ParamSpec::required("path", Str).aliases(&["file", "file_path", "filename"]))
                .param(ParamSpec::required("old", Str).aliases(&["old_string", "search"]))
                .param(ParamSpec::required("new", Str).aliases(&["new_string", "replace"]))
                .param(ParamSpec::optional("replace_all", Bool))
                .estimate_ms(50),
        );
        catalog.add(
            ToolSpec::new("delete_file", Effect::Write, Target::Param { key: "path", default: "." })
                .param(ParamSpec::required("path", Str).aliases(&["file", "file_path", "filename"]))
                .estimate_ms(20),
        );

        // Version control; git sees the whole working tree, rooted at `.`
        catalog.add(ToolSpec::new("git_status", Effect::Read, Target::Fixed(".")).estimate_ms(100));
        catalog.add(
            ToolSpec::new("git_diff", Effect::Read, Target::Param { key: "path", default: "." })
                .param(ParamSpec::optional("path", Str).aliases(&["file"]))
                .param(ParamSpec::optional("staged", Bool))
                .estimate_ms(150),
        );
        catalog.add(
            ToolSpec::new("git_commit", Effect::Write, Target::Fixed("."))
                .param(ParamSpec::required("message", Str).aliases(&["msg"]))
                .estimate_ms(300),
        );

        // Side-channel lookups
        catalog.add(
            ToolSpec::new("memory_search", Effect::Read, Target::Fixed("@memory"))
                .param(ParamSpec::required("query", Str).aliases(&["q", "text"]))
                .param(ParamSpec::optional("limit", Integer))
                .estimate_ms(300)
                .cacheable(),
        );

        // Shell
        catalog.add(
            ToolSpec::new("run_command", Effect::External, Target::Param { key: "command", default: "" })
                .param(ParamSpec::required("command", Str).aliases(&["cmd"]))
                .param(ParamSpec::optional("cwd", Str))
                .param(ParamSpec::optional("timeout_ms", Integer))
                .estimate_ms(2000),
        );

        catalog
    }

    /// Create an empty catalog (for testing)
    pub fn empty() -> Self {
        debug!("ToolCatalog::empty: called");
        Self { tools: HashMap::new() }
    }

    pub fn add(&mut self, spec: ToolSpec) {
        debug!(tool_name = %spec.name, "ToolCatalog::add: called");
        self.tools.insert(spec.name.to_string(), spec);
    }

    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.tools.get(name)
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Sorted tool names
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_cacheable(&self, name: &str) -> bool {
        self.tools.get(name).is_some_and(|spec| spec.cacheable)
    }

    /// Check a proposal against its tool's schema
    ///
    /// Unknown keys, missing required keys and mistyped values are rejected
    /// outright; aliases are folded onto their canonical key. `fallback_id` is
    /// used when the planner did not name the action.
    pub fn validate(&self, proposed: ProposedAction, fallback_id: &str) -> Result<ValidatedCall, ValidationError> {
        debug!(tool_name = %proposed.tool, "ToolCatalog::validate: called");
        let spec = self
            .tools
            .get(&proposed.tool)
            .ok_or_else(|| ValidationError::UnknownTool(proposed.tool.clone()))?;

        let Value::Object(raw) = proposed.input else {
            return Err(ValidationError::NotAnObject { tool: proposed.tool });
        };

        let mut input = ToolInput::new();
        for (key, value) in raw {
            let param = spec.param_for(&key).ok_or_else(|| ValidationError::UnknownKey {
                tool: proposed.tool.clone(),
                key: key.clone(),
            })?;

            if input.contains_key(param.name) {
                return Err(ValidationError::ConflictingAlias {
                    tool: proposed.tool.clone(),
                    key: param.name.to_string(),
                });
            }

            if !param.kind.matches(&value) {
                return Err(ValidationError::WrongType {
                    tool: proposed.tool.clone(),
                    key: param.name.to_string(),
                    expected: param.kind.describe(),
                });
            }

            input.insert(param.name.to_string(), value);
        }

        if let Some(missing) = spec.params.iter().find(|p| p.required && !input.contains_key(p.name)) {
            return Err(ValidationError::MissingKey {
                tool: proposed.tool.clone(),
                key: missing.name.to_string(),
            });
        }

        let target = spec.resolve_target(&input);
        let fingerprint = Fingerprint::new(spec.name, &input);

        Ok(ValidatedCall {
            id: proposed.id.unwrap_or_else(|| fallback_id.to_string()),
            tool: proposed.tool,
            input,
            fingerprint,
            effect: spec.effect,
            target,
            estimate: spec.estimate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validate(tool: &str, input: Value) -> Result<ValidatedCall, ValidationError> {
        ToolCatalog::standard().validate(ProposedAction::new(tool, input), "1-1")
    }

    #[test]
    fn test_standard_catalog_has_core_tools() {
        let catalog = ToolCatalog::standard();
        for name in ["read_file", "write_file", "edit_file", "run_command", "git_status", "memory_search"] {
            assert!(catalog.has_tool(name), "missing {name}");
        }
        assert!(catalog.is_cacheable("memory_search"));
        assert!(!catalog.is_cacheable("read_file"));
    }

    #[test]
    fn test_aliases_fold_to_canonical_key() {
        let call = validate("read_file", json!({"file_path": "src/lib.rs"})).unwrap();
        assert_eq!(call.input, json!({"path": "src/lib.rs"}).as_object().cloned().unwrap());
        assert_eq!(call.target, "src/lib.rs");
        assert_eq!(call.effect, Effect::Read);
        assert_eq!(call.id, "1-1");
    }

    #[test]
    fn test_alias_and_canonical_key_give_same_fingerprint() {
        let a = validate("write_file", json!({"path": "a.txt", "content": "x"})).unwrap();
        let b = validate("write_file", json!({"text": "x", "filename": "a.txt"})).unwrap();
        assert_eq!(a.fingerprint, b.fingerprint);
    }

    #[test]
    fn test_conflicting_alias_rejected() {
        let err = validate("read_file", json!({"path": "a", "file": "b"})).unwrap_err();
        assert!(matches!(err, ValidationError::ConflictingAlias { .. }));
    }

    #[test]
    fn test_unknown_tool_rejected() {
        let err = validate("format_disk", json!({})).unwrap_err();
        assert_eq!(err, ValidationError::UnknownTool("format_disk".into()));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = validate("read_file", json!({"path": "a", "encoding": "utf8"})).unwrap_err();
        assert!(matches!(err, ValidationError::UnknownKey { key, .. } if key == "encoding"));
    }

    #[test]
    fn test_missing_required_key_rejected() {
        let err = validate("write_file", json!({"path": "a"})).unwrap_err();
        assert!(matches!(err, ValidationError::MissingKey { key, .. } if key == "content"));
    }

    #[test]
    fn test_wrong_type_rejected() {
        let err = validate("read_file", json!({"path": "a", "limit": "ten"})).unwrap_err();
        assert!(matches!(err, ValidationError::WrongType { expected: "an integer", .. }));
    }

    #[test]
    fn test_non_object_input_rejected() {
        let err = validate("read_file", json!("a.txt")).unwrap_err();
        assert!(matches!(err, ValidationError::NotAnObject { .. }));
    }

    #[test]
    fn test_optional_target_falls_back_to_default() {
        let call = validate("list_directory", json!({})).unwrap();
        assert_eq!(call.target, ".");

        let call = validate("git_commit", json!({"msg": "wip"})).unwrap();
        assert_eq!(call.target, ".");
        assert_eq!(call.effect, Effect::Write);
    }

    #[test]
    fn test_planner_supplied_id_wins() {
        let proposed = ProposedAction::new("git_status", json!({})).with_id("status");
        let call = ToolCatalog::standard().validate(proposed, "3-1").unwrap();
        assert_eq!(call.id, "status");
    }
}
