use axum::http::StatusCode;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::common::TestApp;

fn batch(app: &TestApp, submission_id: Option<&str>) -> Value {
    let mut body = json!({
        "deckId": app.deck,
        "cardsPlayed": 3,
        "correctAnswers": 2,
        "totalTime": 30,
        "maxStreak": 2,
        "cardResults": [
            { "cardId": app.cards[0], "correct": true, "timeSpent": 8 },
            { "cardId": app.cards[1], "correct": true, "timeSpent": 10 },
            { "cardId": app.cards[2], "correct": false, "timeSpent": 12 }
        ]
    });
    if let Some(id) = submission_id {
        body["submissionId"] = json!(id);
    }
    body
}

#[tokio::test]
async fn test_speed_batch_applied() {
    let app = TestApp::new().await;
    let token = app.token(app.owner);

    let response = app
        .client
        .post_json("/study/speed-results", &batch(&app, Some("run-1")), &token)
        .await;

    response.assert_status(StatusCode::OK);
    let ack = response.data();
    assert_eq!(ack["duplicate"], false);
    assert_eq!(ack["cardsUpdated"], 3);
    assert!(Uuid::parse_str(ack["speedResultId"].as_str().unwrap()).is_ok());

    let first = app.store.progress(app.owner, app.cards[0]).await.unwrap();
    assert_eq!(first.mastery_level, 1);
    let missed = app.store.progress(app.owner, app.cards[2]).await.unwrap();
    assert_eq!(missed.mastery_level, 0);
    assert_eq!(missed.review_count, 1);

    let reviews = app.store.reviews().await;
    assert_eq!(reviews.len(), 3);
    assert!(reviews.iter().all(|review| review.session_id.is_none()));
}

#[tokio::test]
async fn test_resubmitted_batch_is_duplicate() {
    let app = TestApp::new().await;
    let token = app.token(app.owner);
    let body = batch(&app, Some("run-1"));

    let first = app
        .client
        .post_json("/study/speed-results", &body, &token)
        .await
        .data();
    let second = app.client.post_json("/study/speed-results", &body, &token).await;

    second.assert_status(StatusCode::OK);
    let ack = second.data();
    assert_eq!(ack["duplicate"], true);
    assert_eq!(ack["speedResultId"], first["speedResultId"]);
    assert_eq!(ack["cardsUpdated"], 3);

    // Applied once
    assert_eq!(app.store.reviews().await.len(), 3);
    let progress = app.store.progress(app.owner, app.cards[0]).await.unwrap();
    assert_eq!(progress.review_count, 1);
}

#[tokio::test]
async fn test_batch_without_submission_id_dedups_on_content() {
    let app = TestApp::new().await;
    let token = app.token(app.owner);
    let body = batch(&app, None);

    app.client
        .post_json("/study/speed-results", &body, &token)
        .await
        .assert_status(StatusCode::OK);
    let again = app
        .client
        .post_json("/study/speed-results", &body, &token)
        .await
        .data();

    assert_eq!(again["duplicate"], true);
    assert_eq!(app.store.reviews().await.len(), 3);
}

#[tokio::test]
async fn test_reused_submission_id_with_other_content_conflicts() {
    let app = TestApp::new().await;
    let token = app.token(app.owner);

    app.client
        .post_json("/study/speed-results", &batch(&app, Some("run-1")), &token)
        .await
        .assert_status(StatusCode::OK);

    let mut changed = batch(&app, Some("run-1"));
    changed["totalTime"] = json!(31);
    let response = app
        .client
        .post_json("/study/speed-results", &changed, &token)
        .await;

    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(response.error_code(), "CONFLICT");
    assert_eq!(app.store.reviews().await.len(), 3);
}

#[tokio::test]
async fn test_batch_with_foreign_card_applies_nothing() {
    let app = TestApp::new().await;
    let token = app.token(app.owner);
    let mut body = batch(&app, Some("run-2"));
    body["cardResults"][1]["cardId"] = json!(app.private_card);

    let response = app
        .client
        .post_json("/study/speed-results", &body, &token)
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    assert!(app.store.reviews().await.is_empty());
    assert!(app.store.progress(app.owner, app.cards[0]).await.is_none());

    // Nothing was recorded, so a corrected batch under the same id goes through
    let retry = app
        .client
        .post_json("/study/speed-results", &batch(&app, Some("run-2")), &token)
        .await;
    assert_eq!(retry.data()["duplicate"], false);
}

#[tokio::test]
async fn test_speed_batch_validation() {
    let app = TestApp::new().await;
    let token = app.token(app.owner);

    let mut inverted = batch(&app, None);
    inverted["correctAnswers"] = json!(5);
    let response = app
        .client
        .post_json("/study/speed-results", &inverted, &token)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), "VALIDATION_ERROR");

    let empty_id = batch(&app, Some(""));
    app.client
        .post_json("/study/speed-results", &empty_id, &token)
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let mut negative = batch(&app, None);
    negative["cardResults"][0]["timeSpent"] = json!(-1);
    app.client
        .post_json("/study/speed-results", &negative, &token)
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    assert!(app.store.reviews().await.is_empty());
}

#[tokio::test]
async fn test_private_deck_batch_forbidden() {
    let app = TestApp::new().await;
    let mut body = batch(&app, None);
    body["deckId"] = json!(app.private_deck);
    body["cardResults"] = json!([]);

    let response = app
        .client
        .post_json("/study/speed-results", &body, &app.token(app.owner))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
}
