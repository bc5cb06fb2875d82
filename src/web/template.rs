//! Page templates.
//!
//! Templates are plain HTML with two kinds of placeholders:
//!
//! * `{{ blog.name }}` looks the dotted path up in the context and inserts it
//!   HTML-escaped (missing values and `null` render as nothing);
//! * `{{ blogs | json }}` inserts the value as JSON, safe to embed inside a
//!   `<script>` element.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

lazy_static! {
    static ref PLACEHOLDER: Regex =
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_.]*)\s*(\|\s*json\s*)?\}\}")
            .expect("placeholder pattern is valid");
}

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("template not found: {0}")]
    NotFound(String),

    #[error("failed to read templates from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Renders a named template with a JSON context.
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, name: &str, context: &JsonValue) -> Result<String, TemplateError>;
}

/// Every `*.html` file of a directory, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct FileTemplates {
    templates: HashMap<String, String>,
}

impl FileTemplates {
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let dir = dir.as_ref();
        let io_err = |source| TemplateError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut templates = HashMap::new();
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("html") {
                continue;
            }
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            let source = std::fs::read_to_string(&path).map_err(|source| TemplateError::Io {
                path: path.clone(),
                source,
            })?;
            templates.insert(name.to_string(), source);
        }

        info!(path = %dir.display(), count = templates.len(), "templates loaded");
        Ok(Self { templates })
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl TemplateRenderer for FileTemplates {
    fn render(&self, name: &str, context: &JsonValue) -> Result<String, TemplateError> {
        let source = self
            .templates
            .get(name)
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))?;
        Ok(render_source(source, context))
    }
}

/// In-memory templates, registered by name.
#[derive(Debug, Clone, Default)]
pub struct MemoryTemplates {
    templates: HashMap<String, String>,
}

impl MemoryTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, source: &str) -> Self {
        self.templates.insert(name.to_string(), source.to_string());
        self
    }
}

impl TemplateRenderer for MemoryTemplates {
    fn render(&self, name: &str, context: &JsonValue) -> Result<String, TemplateError> {
        let source = self
            .templates
            .get(name)
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))?;
        Ok(render_source(source, context))
    }
}

pub fn render_source(source: &str, context: &JsonValue) -> String {
    PLACEHOLDER
        .replace_all(source, |caps: &Captures<'_>| {
            let value = lookup(context, &caps[1]);
            if caps.get(2).is_some() {
                script_json(value.unwrap_or(&JsonValue::Null))
            } else {
                match value {
                    None | Some(JsonValue::Null) => String::new(),
                    Some(JsonValue::String(s)) => escape_html(s),
                    Some(other) => escape_html(&other.to_string()),
                }
            }
        })
        .into_owned()
}

fn lookup<'a>(context: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    path.split('.').try_fold(context, |value, key| match value {
        JsonValue::Object(map) => map.get(key),
        JsonValue::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

// `</script>` inside a string literal would end the element early.
fn script_json(value: &JsonValue) -> String {
    value
        .to_string()
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}
