//! Page renderer
//!
//! HTML pages are Tera templates embedded into the binary from `templates/`
//! and compiled once at startup. Every render gets the site variables
//! (`site_name`, `site_description`, `year`) in addition to the handler's
//! context.

use chrono::Datelike;
use rust_embed::RustEmbed;
use std::error::Error as StdError;
use tera::{Context as TeraContext, Tera};

use crate::config::SiteConfig;

mod error;

pub use error::RenderError;

/// Embedded page templates
#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct PageTemplates;

pub struct PageRenderer {
    tera: Tera,
    site: SiteConfig,
}

impl PageRenderer {
    /// Renderer over the embedded templates
    pub fn new(site: SiteConfig) -> Result<Self, RenderError> {
        let mut templates = Vec::new();
        for name in PageTemplates::iter() {
            let file = PageTemplates::get(&name)
                .ok_or_else(|| RenderError::Template(format!("Missing embedded template {}", name)))?;
            let content = String::from_utf8(file.data.into_owned())
                .map_err(|e| RenderError::Template(format!("{} is not UTF-8: {}", name, e)))?;
            templates.push((name.into_owned(), content));
        }

        Self::from_templates(site, templates)
    }

    /// Renderer over `(name, source)` pairs
    pub fn from_templates(
        site: SiteConfig,
        mut templates: Vec<(String, String)>,
    ) -> Result<Self, RenderError> {
        // Parents must be registered before the templates extending them
        templates.sort_by(|a, b| {
            let a_is_base = a.0 == "base.html" || a.0.ends_with("/base.html");
            let b_is_base = b.0 == "base.html" || b.0.ends_with("/base.html");
            b_is_base.cmp(&a_is_base)
        });

        let mut tera = Tera::default();
        for (name, content) in &templates {
            tera.add_raw_template(name, content).map_err(|e| {
                RenderError::Template(format!("Failed to add template {}: {}", name, e))
            })?;
        }
        tera.build_inheritance_chains().map_err(|e| {
            RenderError::Template(format!("Failed to build template inheritance: {}", e))
        })?;

        tracing::debug!(count = templates.len(), "page templates loaded");
        Ok(Self { tera, site })
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|t| t == name)
    }

    /// Render a template with the site variables added
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String, RenderError> {
        let mut full_context = context.clone();
        full_context.insert("site_name", &self.site.name);
        full_context.insert("site_description", &self.site.description);
        full_context.insert("year", &chrono::Utc::now().year());

        self.tera.render(template, &full_context).map_err(|e| {
            let mut error_msg = format!("Failed to render '{}': {}", template, e);
            let mut source = e.source();
            while let Some(s) = source {
                error_msg.push_str(&format!("\n  Caused by: {}", s));
                source = s.source();
            }
            RenderError::Render(error_msg)
        })
    }
}
