//! Conversion from collaborator diagnostics to the wire form.

use crate::parse::ParseDiagnostic;
use tower_lsp::lsp_types::Diagnostic;

/// Name reported as the diagnostic source in editors.
pub const DIAGNOSTIC_SOURCE: &str = "merl";

pub fn to_lsp_diagnostics(diags: &[ParseDiagnostic]) -> Vec<Diagnostic> {
    diags
        .iter()
        .map(|d| Diagnostic {
            range: d.range,
            severity: Some(d.severity),
            source: Some(DIAGNOSTIC_SOURCE.to_string()),
            message: d.message.clone(),
            ..Default::default()
        })
        .collect()
}
