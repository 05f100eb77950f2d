//! Tera rendering engine for the run summary email.
//!
//! # Templates
//!
//! | Name                 | Output                     |
//! |----------------------|----------------------------|
//! | `summary/subject.txt`| one-line subject           |
//! | `summary/body.html`  | HTML body (autoescaped)    |
//! | `summary/body.txt`   | plain-text alternative     |
//! | `summary/list.html`  | macro partial for lists    |

use tera::Tera;

use crate::context::SummaryContext;
use crate::error::NotifyError;

// ---------------------------------------------------------------------------
// Embedded templates: baked into the binary at compile time via include_str!
// ---------------------------------------------------------------------------

const TPLS: &[(&str, &str)] = &[
    ("summary/list.html", include_str!("templates/_list.html.tera")),
    ("summary/subject.txt", include_str!("templates/subject.txt.tera")),
    ("summary/body.html", include_str!("templates/summary.html.tera")),
    ("summary/body.txt", include_str!("templates/summary.txt.tera")),
];

const SUBJECT: &str = "summary/subject.txt";
const BODY_HTML: &str = "summary/body.html";
const BODY_TEXT: &str = "summary/body.txt";

fn build_tera() -> Result<Tera, NotifyError> {
    let mut tera = Tera::default();
    tera.add_raw_templates(TPLS.iter().copied())?;
    Ok(tera)
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// A fully rendered email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Tera-based renderer for the summary email.
///
/// Create once with [`Renderer::new`] and reuse.
pub struct Renderer {
    tera: Tera,
}

impl Renderer {
    /// Construct a new [`Renderer`] with embedded templates.
    pub fn new() -> Result<Self, NotifyError> {
        Ok(Renderer {
            tera: build_tera()?,
        })
    }

    pub fn render_summary(&self, ctx: &SummaryContext) -> Result<RenderedEmail, NotifyError> {
        let tera_ctx = ctx.to_tera_context()?;
        let subject = self.tera.render(SUBJECT, &tera_ctx)?;
        Ok(RenderedEmail {
            subject: subject.trim().to_string(),
            html: self.tera.render(BODY_HTML, &tera_ctx)?,
            text: self.tera.render(BODY_TEXT, &tera_ctx)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
