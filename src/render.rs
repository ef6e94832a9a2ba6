//! HTML pages and streamed row fragments
//!
//! Templates live under `templates/` and are compiled into the binary.
//! Handlebars escapes every interpolated value, so registry and user data
//! never reach the page as markup.

use handlebars::Handlebars;
use serde::Serialize;
use serde_json::json;

use crate::error::RenderError;
use crate::record::{NameFields, Record};
use crate::stream::BatchSummary;

const MATCH_OK: &str = "match-ok";
const MATCH_FAIL: &str = "match-fail";

const TEMPLATES: &[(&str, &str)] = &[
    ("token_form", include_str!("../templates/token_form.hbs")),
    ("batch_form", include_str!("../templates/batch_form.hbs")),
    ("results_head", include_str!("../templates/results_head.hbs")),
    ("results_tail", include_str!("../templates/results_tail.hbs")),
    ("row", include_str!("../templates/row.hbs")),
];

#[derive(Serialize)]
struct PendingRow<'a> {
    id: usize,
    key: &'a str,
    input: &'a NameFields,
}

#[derive(Serialize)]
struct RowContext<'a> {
    id: usize,
    key: &'a str,
    input: &'a NameFields,
    registry: NameFields,
    error: Option<String>,
    given_class: &'static str,
    first_class: &'static str,
    second_class: &'static str,
}

fn class_for(matched: bool) -> &'static str {
    if matched {
        MATCH_OK
    } else {
        MATCH_FAIL
    }
}

pub struct Renderer {
    handlebars: Handlebars<'static>,
}

impl Renderer {
    pub fn new() -> Result<Self, RenderError> {
        let mut handlebars = Handlebars::new();

        handlebars
            .register_partial("layout_head", include_str!("../templates/layout_head.hbs"))
            .map_err(|e| RenderError::Registration {
                name: "layout_head".to_string(),
                message: e.to_string(),
            })?;

        for (name, source) in TEMPLATES {
            handlebars
                .register_template_string(name, *source)
                .map_err(|e| RenderError::Registration {
                    name: name.to_string(),
                    message: e.to_string(),
                })?;
        }

        Ok(Self { handlebars })
    }

    pub fn token_form(&self) -> Result<String, RenderError> {
        Ok(self.handlebars.render("token_form", &json!({}))?)
    }

    pub fn batch_form(&self) -> Result<String, RenderError> {
        Ok(self.handlebars.render("batch_form", &json!({}))?)
    }

    /// Page head with every record shown as pending, plus the total count.
    pub fn results_head(&self, records: &[Record]) -> Result<String, RenderError> {
        let rows: Vec<PendingRow<'_>> = records
            .iter()
            .map(|r| PendingRow {
                id: r.id,
                key: &r.key,
                input: &r.input,
            })
            .collect();

        Ok(self.handlebars.render(
            "results_head",
            &json!({ "rows": rows, "total": records.len() }),
        )?)
    }

    /// Inner cells of one terminal record's row.
    pub fn row_fragment(&self, record: &Record) -> Result<String, RenderError> {
        let matches = record.matches().unwrap_or_default();
        let context = RowContext {
            id: record.id,
            key: &record.key,
            input: &record.input,
            registry: record.authoritative().cloned().unwrap_or_default(),
            error: record.error().map(|e| e.tag()),
            given_class: class_for(matches.given_name),
            first_class: class_for(matches.first_surname),
            second_class: class_for(matches.second_surname),
        };
        Ok(self.handlebars.render("row", &context)?)
    }

    /// `<script>` chunk that swaps a pending row for its result.
    pub fn update_script(&self, record: &Record) -> Result<String, RenderError> {
        let fragment = self.row_fragment(record)?;
        Ok(format!(
            "<script>updateRow({}, {}, {});</script>\n",
            record.id,
            js_string(&fragment)?,
            record.is_failed()
        ))
    }

    /// Final chunk marking end-of-stream.
    pub fn completion_script(&self, summary: &BatchSummary) -> Result<String, RenderError> {
        Ok(self.handlebars.render(
            "results_tail",
            &json!({ "resolved": summary.resolved, "failed": summary.failed }),
        )?)
    }
}

/// JSON string literal safe to place inside a `<script>` element.
fn js_string(value: &str) -> Result<String, RenderError> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LookupError;
    use crate::record::MatchFlags;
    use chrono::Utc;
    use uuid::Uuid;

    fn renderer() -> Renderer {
        Renderer::new().unwrap()
    }

    fn resolved() -> Record {
        Record::pending(3, "12345678", NameFields::new("Maria", "Garcia", ""))
            .resolve(
                NameFields::new("MARIA", "GARCIA", "TORRES"),
                MatchFlags {
                    given_name: true,
                    first_surname: true,
                    second_surname: false,
                },
            )
    }

    #[test]
    fn test_pages_render() {
        let r = renderer();
        assert!(r.token_form().unwrap().contains("action=\"/token\""));
        assert!(r.batch_form().unwrap().contains("action=\"/verify\""));
    }

    #[test]
    fn test_results_head_lists_pending_rows() {
        let records = vec![
            Record::pending(0, "111", NameFields::new("A", "B", "C")),
            Record::pending(1, "222", NameFields::default()),
        ];
        let html = renderer().results_head(&records).unwrap();
        assert!(html.contains("id=\"row-0\""));
        assert!(html.contains("id=\"row-1\""));
        assert!(html.contains("<span id=\"total\">2</span>"));
    }

    #[test]
    fn test_row_fragment_marks_field_matches() {
        let html = renderer().row_fragment(&resolved()).unwrap();
        assert_eq!(html.matches("match-ok").count(), 2);
        assert_eq!(html.matches("match-fail").count(), 1);
        assert!(html.contains("TORRES"));
        assert!(html.contains("copyRow(3)"));
    }

    #[test]
    fn test_failed_fragment_shows_tag_without_copy() {
        let record = Record::pending(5, "999", NameFields::default())
            .fail(LookupError::Http { status: 404 });
        let html = renderer().row_fragment(&record).unwrap();
        assert!(html.contains("HTTP 404"));
        assert!(!html.contains("copyRow"));
    }

    #[test]
    fn test_user_data_is_escaped() {
        let record = Record::pending(0, "<b>1</b>", NameFields::new("<script>", "", ""))
            .fail(LookupError::Http { status: 500 });
        let script = renderer().update_script(&record).unwrap();
        assert!(script.contains("&lt;script&gt;"));
        assert!(script.starts_with("<script>updateRow(0, \""));
        assert!(script.trim_end().ends_with(", true);</script>"));
        // Only the wrapper itself closes a script element
        assert_eq!(script.matches("</script>").count(), 1);
    }

    #[test]
    fn test_completion_script() {
        let summary = BatchSummary {
            batch_id: Uuid::new_v4(),
            total: 3,
            resolved: 2,
            failed: 1,
            started_at: Utc::now(),
            elapsed_ms: 10,
        };
        let html = renderer().completion_script(&summary).unwrap();
        assert!(html.contains("batchComplete(2, 1)"));
        assert!(html.contains("</html>"));
    }
}
