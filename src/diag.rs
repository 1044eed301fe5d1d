//! Diagnostic rendering.
//!
//! Syntax errors from the command language are rendered as annotated
//! snippets against the offending guard/update text, the same shape
//! `metamath-knife`'s `diag` module gives to parse/scope/verify errors
//! against `.mm` source (there the "file" is a whole database; here it's a
//! single expression string, so the snippet is always one line).

use crate::error::ParseError;
use annotate_snippets::display_list::{DisplayList, FormatOptions};
use annotate_snippets::snippet::{Annotation, AnnotationType, Slice, Snippet, SourceAnnotation};

/// Renders a [`ParseError`] as a human-readable, optionally colored,
/// annotated snippet pointing at the offending span.
#[must_use]
pub fn render_parse_error(err: &ParseError) -> String {
    let snippet = Snippet {
        title: Some(Annotation {
            id: None,
            label: Some(&err.message),
            annotation_type: AnnotationType::Error,
        }),
        footer: vec![],
        slices: vec![Slice {
            source: &err.text,
            line_start: 1,
            origin: None,
            annotations: vec![SourceAnnotation {
                range: err.span,
                label: "here",
                annotation_type: AnnotationType::Error,
            }],
            fold: false,
        }],
        opt: FormatOptions {
            color: true,
            ..Default::default()
        },
    };
    DisplayList::from(snippet).to_string()
}

/// A single diagnostic collected while running a non-fatal check (search
/// deadlock detection, validation, or non-convergence of the solver).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: u32,
    pub detail: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[D{:03}] {}", self.code, self.detail)
    }
}
