//! Survey analytics over stored responses

use std::collections::BTreeMap;

use atrium::db::{surveys, tenants, Store};
use serde_json::Value;

fn setup_survey(store: &Store) -> (String, surveys::SurveyRow, Vec<surveys::QuestionRow>) {
    let conn = store.conn().unwrap();
    let tenant_id = tenants::create_tenant(&conn, "Test Agency").unwrap().id;

    let survey = surveys::create_survey(
        &conn,
        &tenant_id,
        &surveys::NewSurvey {
            name: "Post-project check-in".into(),
            questions: vec![
                surveys::NewQuestion {
                    kind: "nps".into(),
                    label: "How likely are you to recommend us?".into(),
                    options: vec![],
                },
                surveys::NewQuestion {
                    kind: "rating".into(),
                    label: "Rate the final deliverable".into(),
                    options: vec![],
                },
                surveys::NewQuestion {
                    kind: "select".into(),
                    label: "How did you hear about us?".into(),
                    options: vec!["referral".into(), "search".into()],
                },
            ],
        },
    )
    .unwrap();

    let questions = surveys::list_questions(&conn, &survey.id).unwrap();
    assert_eq!(questions.len(), 3);
    (tenant_id, survey, questions)
}

fn answers(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn test_questions_keep_declared_order() {
    let store = Store::open_in_memory().unwrap();
    let (_, _, questions) = setup_survey(&store);

    assert_eq!(questions[0].kind, "nps");
    assert_eq!(questions[1].kind, "rating");
    assert_eq!(questions[2].kind, "select");
    assert_eq!(questions[2].options, vec!["referral", "search"]);
}

#[test]
fn test_analytics_over_recorded_responses() {
    let store = Store::open_in_memory().unwrap();
    let (tenant_id, survey, questions) = setup_survey(&store);
    let conn = store.conn().unwrap();

    let (q_nps, q_rating, q_select) = (
        questions[0].id.clone(),
        questions[1].id.clone(),
        questions[2].id.clone(),
    );

    // Three responses: two complete, one NPS-only
    for (nps, rating, source) in [(10, Some(5), Some("referral")), (9, Some(4), Some("search"))] {
        let mut pairs = vec![(q_nps.as_str(), Value::from(nps))];
        if let Some(r) = rating {
            pairs.push((q_rating.as_str(), Value::from(r)));
        }
        if let Some(s) = source {
            pairs.push((q_select.as_str(), Value::from(s)));
        }
        surveys::record_response(&conn, &tenant_id, &survey.id, &answers(&pairs)).unwrap();
    }
    surveys::record_response(
        &conn,
        &tenant_id,
        &survey.id,
        &answers(&[(q_nps.as_str(), Value::from(3))]),
    )
    .unwrap();

    let responses = surveys::list_responses(&conn, &tenant_id, &survey.id).unwrap();
    let analytics = surveys::build_analytics(&survey.id, &questions, &responses);

    assert_eq!(analytics.response_count, 3);
    // 2 of 3 answered everything
    assert_eq!(analytics.completion_rate, 66.7);

    let nps = analytics.questions[0].nps.as_ref().unwrap();
    assert_eq!(nps.promoters, 2);
    assert_eq!(nps.detractors, 1);
    assert_eq!(nps.total, 3);
    // round(((2 - 1) / 3) * 100) = 33
    assert_eq!(nps.score, 33);

    let ratings = analytics.questions[1].ratings.as_ref().unwrap();
    assert_eq!(ratings.total, 2);
    assert_eq!(ratings.average, 4.5);

    let options = analytics.questions[2].options.as_ref().unwrap();
    assert_eq!(options[0].count, 1);
    assert_eq!(options[1].count, 1);
}

#[test]
fn test_analytics_with_no_responses() {
    let store = Store::open_in_memory().unwrap();
    let (tenant_id, survey, questions) = setup_survey(&store);
    let conn = store.conn().unwrap();

    let responses = surveys::list_responses(&conn, &tenant_id, &survey.id).unwrap();
    let analytics = surveys::build_analytics(&survey.id, &questions, &responses);

    assert_eq!(analytics.response_count, 0);
    assert_eq!(analytics.completion_rate, 0.0);
    assert_eq!(analytics.questions[0].nps.as_ref().unwrap().score, 0);
}

#[test]
fn test_survey_delete_cascades_to_responses() {
    let store = Store::open_in_memory().unwrap();
    let (tenant_id, survey, questions) = setup_survey(&store);
    let conn = store.conn().unwrap();

    surveys::record_response(
        &conn,
        &tenant_id,
        &survey.id,
        &answers(&[(questions[0].id.as_str(), Value::from(8))]),
    )
    .unwrap();

    assert!(surveys::delete_survey(&conn, &tenant_id, &survey.id).unwrap());
    assert!(surveys::find_survey(&conn, &survey.id).unwrap().is_none());
    assert!(surveys::list_responses(&conn, &tenant_id, &survey.id)
        .unwrap()
        .is_empty());
}
