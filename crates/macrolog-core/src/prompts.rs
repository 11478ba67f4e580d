//! Classification prompt templates
//!
//! A prompt file is Markdown with YAML frontmatter (`id`, `version`) followed
//! by `# System` and `# User` sections. A file named `<id>.md` in the override
//! directory (`<data dir>/macrolog/prompts/overrides/`) replaces the copy
//! compiled into the binary.
//!
//! Templates support `{{var}}` substitution and `{{#if var}}...{{/if}}`
//! blocks, kept only when `var` is set to a non-empty value.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::Deserialize;

use crate::error::{Error, Result};

const CLASSIFY_ENTRY: &str = include_str!("../../../prompts/classify_entry.md");

const SYSTEM_HEADER: &str = "# System";
const USER_HEADER: &str = "# User";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptId {
    /// Free-form statement to structured log items
    ClassifyEntry,
}

impl PromptId {
    pub const ALL: [PromptId; 1] = [PromptId::ClassifyEntry];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClassifyEntry => "classify_entry",
        }
    }

    fn embedded(&self) -> &'static str {
        match self {
            Self::ClassifyEntry => CLASSIFY_ENTRY,
        }
    }

    fn file_name(&self) -> String {
        format!("{}.md", self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PromptMetadata {
    pub id: String,
    pub version: u32,
}

/// Where a loaded prompt came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptSource {
    Embedded,
    Override(PathBuf),
}

#[derive(Debug, Clone)]
pub struct Prompt {
    pub metadata: PromptMetadata,
    pub system: String,
    pub user: String,
    pub source: PromptSource,
}

impl Prompt {
    /// Parse frontmatter and sections; a file without section headers is
    /// used whole as the user section
    pub fn parse(content: &str, source: PromptSource) -> Result<Self> {
        let rest = content
            .trim_start()
            .strip_prefix("---")
            .ok_or_else(|| Error::InvalidData("Prompt must start with YAML frontmatter".into()))?;
        let (frontmatter, body) = rest
            .split_once("\n---")
            .ok_or_else(|| Error::InvalidData("Prompt frontmatter is not closed".into()))?;

        let metadata: PromptMetadata = serde_yaml::from_str(frontmatter)
            .map_err(|e| Error::InvalidData(format!("Invalid prompt frontmatter: {}", e)))?;

        let body = body.trim_start_matches('-').trim();
        let system = section(body, SYSTEM_HEADER).unwrap_or_default();
        let user = section(body, USER_HEADER).unwrap_or(body);

        Ok(Self {
            metadata,
            system: system.to_string(),
            user: user.to_string(),
            source,
        })
    }

    pub fn is_override(&self) -> bool {
        matches!(self.source, PromptSource::Override(_))
    }

    pub fn render_system(&self, vars: &HashMap<&str, &str>) -> String {
        render(&self.system, vars)
    }

    pub fn render_user(&self, vars: &HashMap<&str, &str>) -> String {
        render(&self.user, vars)
    }
}

/// Loads prompts (override first, then embedded) and caches them until
/// [`PromptLibrary::clear_cache`]
pub struct PromptLibrary {
    override_dir: Option<PathBuf>,
    loaded: RwLock<HashMap<PromptId, Arc<Prompt>>>,
}

impl PromptLibrary {
    /// Overrides from the platform data directory
    pub fn new() -> Self {
        Self::build(default_prompts_dir())
    }

    pub fn with_override_dir(path: PathBuf) -> Self {
        Self::build(Some(path))
    }

    pub fn embedded_only() -> Self {
        Self::build(None)
    }

    fn build(override_dir: Option<PathBuf>) -> Self {
        Self {
            override_dir,
            loaded: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, id: PromptId) -> Result<Arc<Prompt>> {
        let cached = self
            .loaded
            .read()
            .ok()
            .and_then(|loaded| loaded.get(&id).cloned());
        if let Some(prompt) = cached {
            return Ok(prompt);
        }

        let prompt = Arc::new(self.load(id)?);
        if let Ok(mut loaded) = self.loaded.write() {
            loaded.insert(id, Arc::clone(&prompt));
        }
        Ok(prompt)
    }

    fn load(&self, id: PromptId) -> Result<Prompt> {
        match self.override_path(id) {
            Some(path) => {
                let content = fs::read_to_string(&path)?;
                Prompt::parse(&content, PromptSource::Override(path))
            }
            None => Prompt::parse(id.embedded(), PromptSource::Embedded),
        }
    }

    fn override_path(&self, id: PromptId) -> Option<PathBuf> {
        self.override_dir
            .as_deref()
            .map(|dir| dir.join(id.file_name()))
            .filter(|path| path.is_file())
    }

    pub fn has_override(&self, id: PromptId) -> bool {
        self.override_path(id).is_some()
    }

    pub fn override_dir(&self) -> Option<&Path> {
        self.override_dir.as_deref()
    }

    /// Forget loaded prompts so edited override files are picked up
    pub fn clear_cache(&self) {
        if let Ok(mut loaded) = self.loaded.write() {
            loaded.clear();
        }
    }
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::new()
    }
}

pub fn default_prompts_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("macrolog").join("prompts").join("overrides"))
}

/// Text after `header` up to the next top-level heading
fn section<'a>(body: &'a str, header: &str) -> Option<&'a str> {
    let start = body.find(header)? + header.len();
    let rest = &body[start..];
    let end = rest.find("\n# ").unwrap_or(rest.len());
    Some(rest[..end].trim())
}

fn render(template: &str, vars: &HashMap<&str, &str>) -> String {
    let mut out = apply_conditionals(template, vars);
    for (name, value) in vars {
        out = out.replace(&format!("{{{{{}}}}}", name), value);
    }
    out
}

/// Single pass over `{{#if var}}...{{/if}}` blocks; blocks do not nest
fn apply_conditionals(template: &str, vars: &HashMap<&str, &str>) -> String {
    const OPEN: &str = "{{#if ";
    const CLOSE: &str = "{{/if}}";

    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find(OPEN) {
        let after_open = &rest[open + OPEN.len()..];
        let Some((name, after_tag)) = after_open.split_once("}}") else {
            break;
        };
        let Some(close) = after_tag.find(CLOSE) else {
            break;
        };

        out.push_str(&rest[..open]);
        if vars.get(name.trim()).is_some_and(|v| !v.is_empty()) {
            out.push_str(&after_tag[..close]);
        }
        rest = &after_tag[close + CLOSE.len()..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CUSTOM: &str = "---\nid: classify_entry\nversion: 9\n---\n\n# System\nCustom.\n\n# User\n{{input}}\n";

    #[test]
    fn test_parse_sections() {
        let prompt = Prompt::parse(
            "---\nid: test_prompt\nversion: 3\n---\n\n# System\nBe brief.\n\n# User\nLog {{input}}.\n",
            PromptSource::Embedded,
        )
        .unwrap();

        assert_eq!(prompt.metadata.id, "test_prompt");
        assert_eq!(prompt.metadata.version, 3);
        assert_eq!(prompt.system, "Be brief.");
        assert_eq!(prompt.user, "Log {{input}}.");
        assert!(!prompt.is_override());
    }

    #[test]
    fn test_parse_without_sections_uses_body_as_user() {
        let prompt =
            Prompt::parse("---\nid: bare\nversion: 1\n---\nJust {{input}}", PromptSource::Embedded)
                .unwrap();
        assert_eq!(prompt.system, "");
        assert_eq!(prompt.user, "Just {{input}}");
    }

    #[test]
    fn test_parse_rejects_bad_frontmatter() {
        assert!(Prompt::parse("# System\nNo frontmatter", PromptSource::Embedded).is_err());
        assert!(Prompt::parse("---\nid: x\nversion: 1\n", PromptSource::Embedded).is_err());
        assert!(Prompt::parse("---\nid: x\n---\n# User\nhi", PromptSource::Embedded).is_err());
    }

    #[test]
    fn test_conditionals() {
        let template = "Start{{#if hint}}\nMeal: {{hint}}{{/if}}\nEnd";

        let mut vars = HashMap::new();
        vars.insert("hint", "breakfast");
        assert_eq!(render(template, &vars), "Start\nMeal: breakfast\nEnd");

        vars.insert("hint", "");
        assert_eq!(render(template, &vars), "Start\nEnd");

        assert_eq!(render(template, &HashMap::new()), "Start\nEnd");
    }

    #[test]
    fn test_unclosed_conditional_left_as_is() {
        let template = "A {{#if x}} B";
        let mut vars = HashMap::new();
        vars.insert("x", "1");
        assert_eq!(apply_conditionals(template, &vars), template);
    }

    #[test]
    fn test_embedded_classify_prompt() {
        let lib = PromptLibrary::embedded_only();
        let prompt = lib.get(PromptId::ClassifyEntry).unwrap();
        assert_eq!(prompt.metadata.id, "classify_entry");
        assert_eq!(prompt.source, PromptSource::Embedded);
        assert!(prompt.system.contains("needs_clarification"));
        assert!(prompt.system.contains("late_night_snack"));

        let mut vars = HashMap::new();
        vars.insert("current_time", "08:15 AM (Monday)");
        vars.insert("input", "2 eggs");
        let user = prompt.render_user(&vars);
        assert!(user.contains("Current time: 08:15 AM (Monday)"));
        assert!(user.contains("Input: 2 eggs"));
        assert!(!user.contains("{{"));
    }

    #[test]
    fn test_embedded_ids_match_files() {
        for id in PromptId::ALL {
            let prompt = Prompt::parse(id.embedded(), PromptSource::Embedded).unwrap();
            assert_eq!(prompt.metadata.id, id.as_str());
        }
    }

    #[test]
    fn test_override_dir_wins() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("classify_entry.md");
        std::fs::write(&path, CUSTOM).unwrap();

        let lib = PromptLibrary::with_override_dir(dir.path().to_path_buf());
        assert!(lib.has_override(PromptId::ClassifyEntry));
        let prompt = lib.get(PromptId::ClassifyEntry).unwrap();
        assert_eq!(prompt.source, PromptSource::Override(path));
        assert_eq!(prompt.metadata.version, 9);
        assert_eq!(prompt.system, "Custom.");
    }

    #[test]
    fn test_cached_until_cleared() {
        let dir = TempDir::new().unwrap();
        let lib = PromptLibrary::with_override_dir(dir.path().to_path_buf());
        assert!(!lib.get(PromptId::ClassifyEntry).unwrap().is_override());

        std::fs::write(dir.path().join("classify_entry.md"), CUSTOM).unwrap();
        assert!(!lib.get(PromptId::ClassifyEntry).unwrap().is_override());

        lib.clear_cache();
        assert!(lib.get(PromptId::ClassifyEntry).unwrap().is_override());
    }
}
