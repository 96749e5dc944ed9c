use std::fmt::{Debug, Display};

use tokio::task::JoinError;
// this binary will target "package name"
use medlink::configuration::get_configuration;
use medlink::startup::Application;
use medlink::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber =
        get_subscriber("medlink".into(), "info".into(), std::io::stdout);
    init_subscriber(subscriber);

    let configuration =
        get_configuration().expect("Failed to read configuration.");

    let application = Application::build(configuration).await?;
    let application_task = tokio::spawn(application.run_until_stopped());
    report_exit("API", application_task.await);

    Ok(())
}

fn report_exit(
    task_name: &str,
    outcome: Result<Result<(), impl Debug + Display>, JoinError>,
) {
    match outcome {
        Ok(Ok(())) => {
            tracing::info!("{} has exited", task_name)
        }
        Ok(Err(e)) => {
            tracing::error! {
                error.cause_chain = ?e,
                error.message = %e,
                "{} failed", task_name
            }
        }
        Err(e) => {
            tracing::error! {
                error.cause_chain = ?e,
                error.message = %e,
                "{} task failed to complete", task_name
            }
        }
    }
}
