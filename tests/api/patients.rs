use serde_json::Value;

use crate::helpers::{spawn_app, TestUser};

#[tokio::test]
async fn a_doctor_can_create_a_patient_that_shows_up_in_the_list() {
    // Arrange
    let app = spawn_app().await;
    let doctor = app.create_user("doctor").await;
    let patient = app.create_user("patient").await;

    // Act - Part 1 - Create
    let response = app
        .post_create_patient(
            &doctor.token,
            &serde_json::json!({
                "patient": &patient.email,
                "medical_history": "No significant history",
            }),
        )
        .await;

    // Assert
    assert_eq!(201, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Patient created successfully");

    // Act - Part 2 - List
    let response = app.get_patients(&doctor.token).await;

    // Assert
    assert_eq!(200, response.status().as_u16());
    let patients: Vec<Value> = response.json().await.unwrap();
    assert_eq!(patients.len(), 1);
    assert_eq!(patients[0]["patient_email"], patient.email.as_str());
    assert!(patients[0]["id"].is_i64());
}

#[tokio::test]
async fn medical_history_is_optional_and_stored_as_given() {
    // Arrange
    let app = spawn_app().await;
    let doctor = app.create_user("doctor").await;
    let with_history = app.create_user("patient").await;
    let without_history = app.create_user("patient").await;

    // Act
    app.post_create_patient(
        &doctor.token,
        &serde_json::json!({
            "patient": &with_history.email,
            "medical_history": "Penicillin allergy",
        }),
    )
    .await
    .error_for_status()
    .unwrap();
    app.post_create_patient(
        &doctor.token,
        &serde_json::json!({ "patient": &without_history.email }),
    )
    .await
    .error_for_status()
    .unwrap();

    // Assert
    let rows: Vec<(String, Option<String>)> = sqlx::query_as(
        r#"
        SELECT u.email, p.medical_history
        FROM patients p
        JOIN users u ON u.user_id = p.user_id
        ORDER BY p.id
        "#,
    )
    .fetch_all(&app.db_pool)
    .await
    .unwrap();
    assert_eq!(
        rows,
        vec![
            (with_history.email, Some("Penicillin allergy".to_string())),
            (without_history.email, None),
        ]
    );
}

#[tokio::test]
async fn a_doctor_identity_may_also_become_a_patient() {
    // Arrange
    let app = spawn_app().await;
    let doctor = app.create_user("doctor").await;
    let colleague = app.create_user("doctor").await;

    // Act
    let response = app
        .post_create_patient(
            &doctor.token,
            &serde_json::json!({ "patient": &colleague.email }),
        )
        .await;

    // Assert
    assert_eq!(201, response.status().as_u16());
}

#[tokio::test]
async fn patients_cannot_create_patients() {
    // Arrange
    let app = spawn_app().await;
    let patient = app.create_user("patient").await;
    let other = app.create_user("patient").await;

    // Act
    let response = app
        .post_create_patient(
            &patient.token,
            &serde_json::json!({
                "patient": &other.email,
                "medical_history": "No significant history",
            }),
        )
        .await;

    // Assert
    assert_eq!(403, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Only doctors can create patients");

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM patients")
        .fetch_one(&app.db_pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn patients_cannot_list_patients() {
    // Arrange
    let app = spawn_app().await;
    let patient = app.create_user("patient").await;

    // Act
    let response = app.get_patients(&patient.token).await;

    // Assert
    assert_eq!(403, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Only doctors can see patients");
}

#[tokio::test]
async fn creating_a_patient_for_an_unknown_identity_returns_404() {
    // Arrange
    let app = spawn_app().await;
    let doctor = app.create_user("doctor").await;

    // Act
    let response = app
        .post_create_patient(
            &doctor.token,
            &serde_json::json!({
                "patient": TestUser::random_email(),
                "medical_history": "No significant history",
            }),
        )
        .await;

    // Assert
    assert_eq!(404, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "User not found");
}

#[tokio::test]
async fn creating_the_same_patient_twice_is_a_duplicate() {
    // Arrange
    let app = spawn_app().await;
    let (doctor, patient) = app.create_doctor_and_patient().await;

    // Act
    let response = app
        .post_create_patient(
            &doctor.token,
            &serde_json::json!({ "patient": &patient.email }),
        )
        .await;

    // Assert
    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["message"],
        format!("Patient already exist with email {}", patient.email)
    );
}

#[tokio::test]
async fn create_patient_returns_400_for_invalid_data() {
    // Arrange
    let app = spawn_app().await;
    let doctor = app.create_user("doctor").await;
    let test_cases = vec![
        (serde_json::json!({ "patient": "", "medical_history": "" }), "blank fields"),
        (serde_json::json!({ "medical_history": "None" }), "missing patient"),
        (serde_json::json!({ "patient": "not-an-email" }), "invalid email"),
    ];

    for (invalid_body, error_message) in test_cases {
        // Act
        let response = app.post_create_patient(&doctor.token, &invalid_body).await;

        // Assert
        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 Bad Request when the payload was {}.",
            error_message
        );
    }
}
