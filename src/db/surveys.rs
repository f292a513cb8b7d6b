//! Survey storage and analytics
//!
//! Questions are stored per survey with a kind (`nps`, `rating`,
//! `select`, `text`); responses hold a JSON object mapping question ids
//! to answers. Analytics are a pure rollup over the fetched rows so the
//! aggregation is testable without HTTP plumbing.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::db::new_id;
use crate::rollup::{percent, NpsSummary, RatingDistribution};
use crate::types::{AtriumError, Result};

/// Highest value a rating question accepts
const RATING_MAX: i64 = 5;

/// Survey row
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyRow {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub is_open: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl SurveyRow {
    fn from_row(row: &Row) -> std::result::Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            tenant_id: row.get("tenant_id")?,
            name: row.get("name")?,
            is_open: row.get("is_open")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Survey question row
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRow {
    pub id: String,
    pub survey_id: String,
    pub kind: String,
    pub label: String,
    pub options: Vec<String>,
    pub position: i64,
}

impl QuestionRow {
    fn from_row(row: &Row) -> std::result::Result<Self, rusqlite::Error> {
        let options_json: Option<String> = row.get("options_json")?;
        let options = options_json
            .as_deref()
            .and_then(|json| serde_json::from_str(json).ok())
            .unwrap_or_default();
        Ok(Self {
            id: row.get("id")?,
            survey_id: row.get("survey_id")?,
            kind: row.get("kind")?,
            label: row.get("label")?,
            options,
            position: row.get("position")?,
        })
    }
}

/// Survey response row
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseRow {
    pub id: String,
    pub survey_id: String,
    pub answers: BTreeMap<String, Value>,
    pub submitted_at: String,
}

impl ResponseRow {
    fn from_row(row: &Row) -> std::result::Result<Self, rusqlite::Error> {
        let answers_json: String = row.get("answers_json")?;
        let answers = serde_json::from_str(&answers_json).unwrap_or_default();
        Ok(Self {
            id: row.get("id")?,
            survey_id: row.get("survey_id")?,
            answers,
            submitted_at: row.get("submitted_at")?,
        })
    }
}

/// Input for a new survey question
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewQuestion {
    pub kind: String,
    pub label: String,
    #[serde(default)]
    pub options: Vec<String>,
}

/// Input for creating a survey
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewSurvey {
    pub name: String,
    #[serde(default)]
    pub questions: Vec<NewQuestion>,
}

/// Fields a survey PATCH may touch
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SurveyPatch {
    pub name: Option<String>,
    pub is_open: Option<bool>,
}

/// Question kinds with defined aggregation
pub const QUESTION_KINDS: &[&str] = &["nps", "rating", "select", "text"];

pub fn create_survey(conn: &Connection, tenant_id: &str, input: &NewSurvey) -> Result<SurveyRow> {
    let id = new_id();
    conn.execute(
        "INSERT INTO surveys (id, tenant_id, name) VALUES (?, ?, ?)",
        params![id, tenant_id, input.name],
    )?;

    for (position, question) in input.questions.iter().enumerate() {
        let options_json = if question.options.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&question.options)?)
        };
        conn.execute(
            "INSERT INTO survey_questions (id, tenant_id, survey_id, kind, label, options_json, position)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                new_id(),
                tenant_id,
                id,
                question.kind,
                question.label,
                options_json,
                position as i64,
            ],
        )?;
    }

    get_survey(conn, tenant_id, &id)?
        .ok_or_else(|| AtriumError::Internal("survey insert vanished".into()))
}

pub fn get_survey(conn: &Connection, tenant_id: &str, id: &str) -> Result<Option<SurveyRow>> {
    Ok(conn
        .query_row(
            "SELECT * FROM surveys WHERE tenant_id = ? AND id = ?",
            params![tenant_id, id],
            SurveyRow::from_row,
        )
        .optional()?)
}

/// Lookup by id alone; response submission resolves the tenant from the
/// survey row itself
pub fn find_survey(conn: &Connection, id: &str) -> Result<Option<SurveyRow>> {
    Ok(conn
        .query_row(
            "SELECT * FROM surveys WHERE id = ?",
            params![id],
            SurveyRow::from_row,
        )
        .optional()?)
}

pub fn list_surveys(conn: &Connection, tenant_id: &str) -> Result<Vec<SurveyRow>> {
    let mut stmt =
        conn.prepare("SELECT * FROM surveys WHERE tenant_id = ? ORDER BY created_at DESC")?;
    let rows = stmt
        .query_map(params![tenant_id], SurveyRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn list_questions(conn: &Connection, survey_id: &str) -> Result<Vec<QuestionRow>> {
    let mut stmt = conn
        .prepare("SELECT * FROM survey_questions WHERE survey_id = ? ORDER BY position ASC")?;
    let rows = stmt
        .query_map(params![survey_id], QuestionRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update_survey(
    conn: &Connection,
    tenant_id: &str,
    id: &str,
    patch: &SurveyPatch,
) -> Result<Option<SurveyRow>> {
    let mut sets = vec![];
    let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![];

    if let Some(ref name) = patch.name {
        sets.push("name = ?");
        values.push(Box::new(name.clone()));
    }
    if let Some(is_open) = patch.is_open {
        sets.push("is_open = ?");
        values.push(Box::new(is_open));
    }

    if !sets.is_empty() {
        let sql = format!(
            "UPDATE surveys SET {}, updated_at = datetime('now') WHERE tenant_id = ? AND id = ?",
            sets.join(", ")
        );
        values.push(Box::new(tenant_id.to_string()));
        values.push(Box::new(id.to_string()));
        let refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
        conn.execute(&sql, refs.as_slice())?;
    }

    get_survey(conn, tenant_id, id)
}

pub fn delete_survey(conn: &Connection, tenant_id: &str, id: &str) -> Result<bool> {
    let affected = conn.execute(
        "DELETE FROM surveys WHERE tenant_id = ? AND id = ?",
        params![tenant_id, id],
    )?;
    Ok(affected > 0)
}

pub fn record_response(
    conn: &Connection,
    tenant_id: &str,
    survey_id: &str,
    answers: &BTreeMap<String, Value>,
) -> Result<ResponseRow> {
    let id = new_id();
    conn.execute(
        "INSERT INTO survey_responses (id, tenant_id, survey_id, answers_json)
         VALUES (?, ?, ?, ?)",
        params![id, tenant_id, survey_id, serde_json::to_string(answers)?],
    )?;

    conn.query_row(
        "SELECT * FROM survey_responses WHERE tenant_id = ? AND id = ?",
        params![tenant_id, id],
        ResponseRow::from_row,
    )
    .map_err(|e| AtriumError::Database(format!("response insert vanished: {}", e)))
}

pub fn list_responses(
    conn: &Connection,
    tenant_id: &str,
    survey_id: &str,
) -> Result<Vec<ResponseRow>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM survey_responses WHERE tenant_id = ? AND survey_id = ?
         ORDER BY submitted_at ASC",
    )?;
    let rows = stmt
        .query_map(params![tenant_id, survey_id], ResponseRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ============================================================================
// Analytics
// ============================================================================

/// Aggregated statistics for one question
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionStats {
    pub question_id: String,
    pub kind: String,
    pub label: String,
    pub answered: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nps: Option<NpsSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratings: Option<RatingDistribution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<OptionCount>>,
}

/// Count of responses picking one option
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionCount {
    pub option: String,
    pub count: u32,
}

/// Full analytics payload for a survey
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyAnalytics {
    pub survey_id: String,
    pub response_count: u32,
    /// Percent of responses answering every question
    pub completion_rate: f64,
    pub questions: Vec<QuestionStats>,
}

/// Roll responses up into per-question statistics.
///
/// Pure function of the fetched rows; deterministic given the same
/// input sequence.
pub fn build_analytics(
    survey_id: &str,
    questions: &[QuestionRow],
    responses: &[ResponseRow],
) -> SurveyAnalytics {
    let total = responses.len() as u32;

    let complete = responses
        .iter()
        .filter(|r| {
            questions
                .iter()
                .all(|q| r.answers.get(&q.id).map(answer_present).unwrap_or(false))
        })
        .count() as u32;

    let question_stats = questions
        .iter()
        .map(|question| {
            let answers: Vec<&Value> = responses
                .iter()
                .filter_map(|r| r.answers.get(&question.id))
                .filter(|v| answer_present(v))
                .collect();

            let answered = answers.len() as u32;
            let mut stats = QuestionStats {
                question_id: question.id.clone(),
                kind: question.kind.clone(),
                label: question.label.clone(),
                answered,
                nps: None,
                ratings: None,
                options: None,
            };

            match question.kind.as_str() {
                "nps" => {
                    let scores: Vec<i64> =
                        answers.iter().filter_map(|v| v.as_i64()).collect();
                    stats.nps = Some(NpsSummary::from_scores(&scores));
                }
                "rating" => {
                    let ratings: Vec<i64> =
                        answers.iter().filter_map(|v| v.as_i64()).collect();
                    stats.ratings = Some(RatingDistribution::from_ratings(&ratings, RATING_MAX));
                }
                "select" => {
                    let counts = question
                        .options
                        .iter()
                        .map(|option| OptionCount {
                            option: option.clone(),
                            count: answers
                                .iter()
                                .filter(|v| v.as_str() == Some(option.as_str()))
                                .count() as u32,
                        })
                        .collect();
                    stats.options = Some(counts);
                }
                // Text questions only report the answered count
                _ => {}
            }

            stats
        })
        .collect();

    SurveyAnalytics {
        survey_id: survey_id.to_string(),
        response_count: total,
        completion_rate: percent(complete as f64, total as f64),
        questions: question_stats,
    }
}

fn answer_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str, kind: &str, options: &[&str]) -> QuestionRow {
        QuestionRow {
            id: id.into(),
            survey_id: "s1".into(),
            kind: kind.into(),
            label: format!("{} question", kind),
            options: options.iter().map(|s| s.to_string()).collect(),
            position: 0,
        }
    }

    fn response(answers: &[(&str, Value)]) -> ResponseRow {
        ResponseRow {
            id: "r".into(),
            survey_id: "s1".into(),
            answers: answers
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            submitted_at: "2024-01-01 00:00:00".into(),
        }
    }

    #[test]
    fn test_empty_survey_analytics() {
        let questions = vec![question("q1", "nps", &[])];
        let analytics = build_analytics("s1", &questions, &[]);

        assert_eq!(analytics.response_count, 0);
        assert_eq!(analytics.completion_rate, 0.0);
        let nps = analytics.questions[0].nps.as_ref().unwrap();
        assert_eq!(nps.score, 0);
        assert_eq!(nps.total, 0);
    }

    #[test]
    fn test_nps_and_completion() {
        let questions = vec![
            question("q1", "nps", &[]),
            question("q2", "text", &[]),
        ];
        let responses = vec![
            response(&[("q1", Value::from(10)), ("q2", Value::from("great"))]),
            response(&[("q1", Value::from(2))]),
        ];

        let analytics = build_analytics("s1", &questions, &responses);
        assert_eq!(analytics.response_count, 2);
        // Only the first response answered everything
        assert_eq!(analytics.completion_rate, 50.0);

        let nps = analytics.questions[0].nps.as_ref().unwrap();
        assert_eq!(nps.promoters, 1);
        assert_eq!(nps.detractors, 1);
        assert_eq!(nps.score, 0);

        assert_eq!(analytics.questions[1].answered, 1);
    }

    #[test]
    fn test_select_option_counts() {
        let questions = vec![question("q1", "select", &["red", "blue"])];
        let responses = vec![
            response(&[("q1", Value::from("red"))]),
            response(&[("q1", Value::from("red"))]),
            response(&[("q1", Value::from("green"))]),
        ];

        let analytics = build_analytics("s1", &questions, &responses);
        let options = analytics.questions[0].options.as_ref().unwrap();
        assert_eq!(options[0], OptionCount { option: "red".into(), count: 2 });
        // Unknown answers count toward answered but no declared option
        assert_eq!(options[1], OptionCount { option: "blue".into(), count: 0 });
        assert_eq!(analytics.questions[0].answered, 3);
    }

    #[test]
    fn test_blank_answers_do_not_count() {
        let questions = vec![question("q1", "text", &[])];
        let responses = vec![
            response(&[("q1", Value::from("  "))]),
            response(&[("q1", Value::Null)]),
            response(&[("q1", Value::from("fine"))]),
        ];

        let analytics = build_analytics("s1", &questions, &responses);
        assert_eq!(analytics.questions[0].answered, 1);
        assert_eq!(analytics.completion_rate, 33.3);
    }
}
