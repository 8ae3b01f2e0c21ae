//! Template loading and rendering using Tera.
//!
//! User-facing text (the rendered list, shell help, configuration hints)
//! lives in template files. They are embedded in the binary and can be
//! overridden from a directory on disk.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;
use tera::{Context, Tera};

/// Embedded default templates.
static EMBEDDED_TEMPLATES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("view/task_list.tera", include_str!("../templates/view/task_list.tera"));
    m.insert("shell/help.tera", include_str!("../templates/shell/help.tera"));
    m.insert(
        "messages/not_configured.tera",
        include_str!("../templates/messages/not_configured.tera"),
    );
    m
});

/// Global template engine with caching.
static TERA: Lazy<RwLock<Option<Tera>>> = Lazy::new(|| RwLock::new(None));

/// Initialize the template engine.
///
/// Templates found under `templates_dir` take precedence; anything missing
/// there falls back to the embedded defaults.
///
/// # Errors
///
/// Returns an error if the directory contains invalid templates.
pub fn init_templates(templates_dir: Option<&Path>) -> Result<()> {
    let mut tera = Tera::default();

    if let Some(dir) = templates_dir.filter(|d| d.exists()) {
        let glob_pattern = format!("{}/**/*.tera", dir.display());
        tera = Tera::new(&glob_pattern).map_err(|e| {
            Error::Template(format!("Failed to load templates from {}: {e}", dir.display()))
        })?;
    }

    for (name, content) in EMBEDDED_TEMPLATES.iter() {
        if tera.get_template(name).is_err() {
            tera.add_raw_template(name, content)
                .map_err(|e| Error::Template(format!("Invalid embedded template {name}: {e}")))?;
        }
    }

    *TERA.write().map_err(|e| Error::Template(e.to_string()))? = Some(tera);
    Ok(())
}

/// Render a template with the given context.
///
/// The engine is initialized with the embedded templates on first use.
///
/// # Errors
///
/// Returns an error if the template doesn't exist or rendering fails.
pub fn render(name: &str, context: &Context) -> Result<String> {
    let needs_init = TERA.read().map_err(|e| Error::Template(e.to_string()))?.is_none();
    if needs_init {
        init_templates(None)?;
    }

    let guard = TERA.read().map_err(|e| Error::Template(e.to_string()))?;
    let tera = guard.as_ref().ok_or_else(|| Error::Template("Templates not initialized".into()))?;
    tera.render(name, context)
        .map_err(|e| Error::Template(format!("Failed to render template {name}: {e}")))
}

/// Render a template from any serializable value.
///
/// # Errors
///
/// Returns an error if the value is not a map-like structure or rendering fails.
pub fn render_value(name: &str, value: &impl serde::Serialize) -> Result<String> {
    let context = Context::from_serialize(value)
        .map_err(|e| Error::Template(format!("Invalid context for {name}: {e}")))?;
    render(name, &context)
}

/// Reset the template cache, forcing re-initialization on next use.
///
/// # Errors
///
/// Returns an error if the write lock cannot be acquired.
pub fn reset_cache() -> Result<()> {
    *TERA.write().map_err(|e| Error::Template(e.to_string()))? = None;
    Ok(())
}

/// Get the list of all embedded template names.
#[must_use]
pub fn embedded_template_names() -> Vec<&'static str> {
    EMBEDDED_TEMPLATES.keys().copied().collect()
}
