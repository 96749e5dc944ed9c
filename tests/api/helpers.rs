use dotenv::dotenv;
use once_cell::sync::Lazy;
use serde_json::Value;
use sqlx::{Connection, Executor, PgConnection, PgPool};
use uuid::Uuid;

use medlink::configuration::{get_configuration, DatabaseSettings};
use medlink::startup::{get_connection_pool, Application};
use medlink::telemetry::{get_line_subscriber, get_subscriber, init_subscriber};

// Ensure that the `tracing` stack is only initialised once using `once_cell`
static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();
    // We cannot assign the output of `get_subscriber` to a variable based on the value of `TEST_LOG`
    // because the sink is part of the type returned by `get_subscriber`, therefore they are not the
    // same type. We could work around it, but this is the most straight-forward way of moving forward.

    match std::env::var("TEST_LOG") {
        Ok(v) => {
            if v == "json" {
                println!("Using JSON output");
                init_subscriber(get_subscriber(
                    subscriber_name,
                    default_filter_level,
                    std::io::stdout,
                ));
            } else {
                println!("Using text output");
                init_subscriber(get_line_subscriber(
                    default_filter_level,
                    std::io::stdout,
                ));
            }
        }
        _ => {
            let subscriber = get_subscriber(
                subscriber_name,
                default_filter_level,
                std::io::sink,
            );
            init_subscriber(subscriber);
        }
    };
});

pub struct TestApp {
    pub address: String,
    pub db_pool: PgPool,
    pub api_client: reqwest::Client,
}

/// A registered identity, logged in.
pub struct TestUser {
    pub email: String,
    pub password: String,
    pub token: String,
}

impl TestUser {
    pub fn random_email() -> String {
        format!("{}@example.com", Uuid::new_v4())
    }
}

impl TestApp {
    pub async fn post_registration<Body>(&self, body: &Body) -> reqwest::Response
    where
        Body: serde::Serialize + ?Sized,
    {
        self.api_client
            .post(&format!("{}/user-registration/", &self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_login(&self, body: &Value) -> reqwest::Response {
        self.api_client
            .post(&format!("{}/login/", &self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_create_patient<Body>(
        &self,
        token: &str,
        body: &Body,
    ) -> reqwest::Response
    where
        Body: serde::Serialize + ?Sized,
    {
        self.api_client
            .post(&format!("{}/patients/create/", &self.address))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_patients(&self, token: &str) -> reqwest::Response {
        self.api_client
            .get(&format!("{}/patients/list/", &self.address))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_create_prescription<Body>(
        &self,
        token: &str,
        body: &Body,
    ) -> reqwest::Response
    where
        Body: serde::Serialize + ?Sized,
    {
        self.api_client
            .post(&format!("{}/patient/prescriptions/create/", &self.address))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_prescriptions(
        &self,
        token: &str,
        patient_username: Option<&str>,
    ) -> reqwest::Response {
        let mut request = self
            .api_client
            .get(&format!("{}/patient/prescriptions/list/", &self.address))
            .bearer_auth(token);
        if let Some(patient_username) = patient_username {
            request = request.query(&[("patient_username", patient_username)]);
        }
        request.send().await.expect("Failed to execute request.")
    }

    pub async fn get_prescription(&self, token: &str, id: &str) -> reqwest::Response {
        self.api_client
            .get(&format!("{}/patient/prescriptions/{}/", &self.address, id))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Register a fresh identity with `role` and log it in.
    pub async fn create_user(&self, role: &str) -> TestUser {
        let email = TestUser::random_email();
        let password = Uuid::new_v4().to_string();
        self.post_registration(&serde_json::json!({
            "email": &email,
            "password": &password,
            "role": role,
        }))
        .await
        .error_for_status()
        .unwrap();

        let body: Value = self
            .post_login(&serde_json::json!({
                "email": &email,
                "password": &password,
            }))
            .await
            .error_for_status()
            .unwrap()
            .json()
            .await
            .unwrap();

        TestUser {
            email,
            password,
            token: body["token"].as_str().unwrap().to_owned(),
        }
    }

    /// A doctor, plus a patient identity with a patient record created by
    /// that doctor.
    pub async fn create_doctor_and_patient(&self) -> (TestUser, TestUser) {
        let doctor = self.create_user("doctor").await;
        let patient = self.create_user("patient").await;
        self.post_create_patient(
            &doctor.token,
            &serde_json::json!({
                "patient": &patient.email,
                "medical_history": "No significant history",
            }),
        )
        .await
        .error_for_status()
        .unwrap();
        (doctor, patient)
    }

    pub async fn prescribe(&self, doctor: &TestUser, patient_email: &str, medication: &str) {
        self.post_create_prescription(
            &doctor.token,
            &serde_json::json!({
                "patient_username": patient_email,
                "medication": medication,
                "dosage": "500mg",
                "instruction": "Take twice a day",
            }),
        )
        .await
        .error_for_status()
        .unwrap();
    }
}

pub async fn spawn_app() -> TestApp {
    dotenv().ok();
    // The first time `initialize` is invoked the code in `TRACING` is executed.
    // All other invocations will instead skip execution.
    Lazy::force(&TRACING);

    // Randomize configuration to ensure test isolation
    let configuration = {
        let mut c = get_configuration().expect("Failed to read configuration.");
        // Use different database for each time
        c.database.database_name = Uuid::new_v4().to_string();
        // Use random port
        c.application.port = 0;
        c
    };

    // Create database and migrate the database
    configure_database(&configuration.database).await;

    // Launch the application as the background task
    let application = Application::build(configuration.clone())
        .await
        .expect("Failed to build application.");
    let application_port = application.port();
    let _ = tokio::spawn(application.run_until_stopped());

    TestApp {
        address: format!("http://127.0.0.1:{}", application_port),
        db_pool: get_connection_pool(&configuration.database),
        api_client: reqwest::Client::new(),
    }
}

async fn configure_database(config: &DatabaseSettings) -> PgPool {
    // create database
    let mut connection = PgConnection::connect_with(&config.without_db())
        .await
        .expect("Failed to connect to Postgres");

    connection
        .execute(
            format!(r#"CREATE DATABASE "{}";"#, config.database_name).as_str(),
        )
        .await
        .expect("Failed to create database");

    let connection_pool = PgPool::connect_with(config.with_db())
        .await
        .expect("Failed connect to postres");

    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to migrate database");

    connection_pool
}
