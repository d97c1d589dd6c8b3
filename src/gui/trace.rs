//! GUI interaction traces and term extraction.

use crate::domain::TRACE_STEP_WINDOW;
use crate::error::{LocalizeError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeSet;

/// Activity name directly followed by its `(Window...)` descriptor.
static ACTIVITY_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\w+)(\(Window.*\))").unwrap());

static FRAGMENT_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"FRAGMENT:(.+)").unwrap());

/// Widget ids that carry no screen information.
const SC_STOPLIST: &[&str] = &["NO_ID", "BACK_MODAL", "null"];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Trace {
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub screen: Option<Screen>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Screen {
    #[serde(default)]
    pub activity: Option<String>,
    #[serde(default)]
    pub window: Option<String>,
    #[serde(default, rename = "dynGuiComponents")]
    pub dyn_gui_components: Option<Vec<GuiComponent>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GuiComponent {
    #[serde(default, rename = "idXml")]
    pub id_xml: Option<String>,
}

impl Trace {
    /// Screens of the last steps, oldest first.
    fn recent_screens(&self) -> impl Iterator<Item = &Screen> {
        let start = self.steps.len().saturating_sub(TRACE_STEP_WINDOW);
        self.steps[start..].iter().filter_map(|step| step.screen.as_ref())
    }
}

pub fn parse_trace(json: &str) -> Result<Trace> {
    serde_json::from_str(json).map_err(|e| LocalizeError::MalformedTrace(e.to_string()))
}

/// Screen-component terms: trailing segments of recent widget `idXml` values.
pub fn extract_sc_terms(trace: Option<&Trace>) -> BTreeSet<String> {
    let Some(trace) = trace else {
        return BTreeSet::new();
    };

    let mut terms = BTreeSet::new();
    for screen in trace.recent_screens() {
        for component in screen.dyn_gui_components.iter().flatten() {
            let Some(id_xml) = component.id_xml.as_deref() else {
                continue;
            };
            let segment = id_xml.rsplit('/').next().unwrap_or("");
            if !segment.is_empty() && !SC_STOPLIST.contains(&segment) {
                terms.insert(segment.to_string());
            }
        }
    }
    terms
}

/// GUI-screen terms: recent activity and fragment names.
pub fn extract_gs_terms(trace: Option<&Trace>) -> BTreeSet<String> {
    let Some(trace) = trace else {
        return BTreeSet::new();
    };

    let mut terms = BTreeSet::new();
    for screen in trace.recent_screens() {
        if let Some(activity) = screen.activity.as_deref() {
            if let Some(caps) = ACTIVITY_PATTERN.captures(activity) {
                terms.insert(caps[1].to_string());
            }
        }
        if let Some(window) = screen.window.as_deref() {
            if let Some(caps) = FRAGMENT_PATTERN.captures(window) {
                terms.insert(caps[1].to_string());
            }
        }
    }
    terms
}

/// Both term sets of one request, fixed once derived.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuiTerms {
    pub sc: BTreeSet<String>,
    pub gs: BTreeSet<String>,
}

impl GuiTerms {
    pub fn from_trace(trace: Option<&Trace>) -> Self {
        Self { sc: extract_sc_terms(trace), gs: extract_gs_terms(trace) }
    }

    /// Parse raw trace JSON, degrading to empty term sets when it is malformed.
    pub fn from_json(json: Option<&str>) -> Self {
        let Some(json) = json else {
            return Self::default();
        };
        match parse_trace(json) {
            Ok(trace) => Self::from_trace(Some(&trace)),
            Err(err) => {
                tracing::warn!("{err}; continuing without GUI data");
                Self::default()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sc.is_empty() && self.gs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn trace_of(steps: serde_json::Value) -> Trace {
        serde_json::from_value(json!({ "steps": steps })).unwrap()
    }

    #[test]
    fn sc_terms_from_last_step() {
        let trace = trace_of(json!([{
            "screen": {
                "dynGuiComponents": [
                    { "idXml": "com.example:id/add_expense" },
                    { "idXml": "NO_ID" },
                    { "idXml": "com.example:id/" },
                    { "idXml": null },
                    { "text": "no id at all" }
                ]
            }
        }]));

        let terms = extract_sc_terms(Some(&trace));
        assert!(terms.contains("add_expense"));
        assert!(!terms.contains("NO_ID"));
        assert_eq!(terms.len(), 1);
    }

    #[test]
    fn only_last_four_steps_count() {
        let steps: Vec<_> = (0..6)
            .map(|i| json!({ "screen": { "dynGuiComponents": [{ "idXml": format!("app:id/w{i}") }] } }))
            .collect();
        let terms = extract_sc_terms(Some(&trace_of(json!(steps))));
        let expected: BTreeSet<String> = ["w2", "w3", "w4", "w5"].iter().map(|s| s.to_string()).collect();
        assert_eq!(terms, expected);
    }

    #[test]
    fn gs_terms_from_activity_and_fragment() {
        let trace = trace_of(json!([
            { "screen": { "activity": "DashboardActivity(Window{5f3 u0 io.app/DashboardActivity})" } },
            { "screen": { "activity": "SettingsActivity", "window": "FRAGMENT:ExpenseFragment" } },
            { "screen": { "window": "FRAGMENT:" } },
            { "screen": null }
        ]));

        let terms = extract_gs_terms(Some(&trace));
        let expected: BTreeSet<String> =
            ["DashboardActivity", "ExpenseFragment"].iter().map(|s| s.to_string()).collect();
        assert_eq!(terms, expected);
    }

    #[test]
    fn absent_trace_yields_no_terms() {
        assert!(extract_sc_terms(None).is_empty());
        assert!(extract_gs_terms(None).is_empty());
        assert!(GuiTerms::from_json(None).is_empty());
    }

    #[test]
    fn malformed_trace_degrades_to_empty() {
        assert!(matches!(parse_trace(r#"{"events": []}"#), Err(LocalizeError::MalformedTrace(_))));
        assert!(GuiTerms::from_json(Some(r#"{"events": []}"#)).is_empty());
        assert!(GuiTerms::from_json(Some(r#"{"steps": 3}"#)).is_empty());
        assert!(GuiTerms::from_json(Some("not json")).is_empty());
    }
}
