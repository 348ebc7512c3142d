use lambda_http::{run, service_fn, Error};
use send_contact_reply::{
    handler::ContactReplyHandler, secrets::AwsSecretsManagerSecretRepository,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .without_time()
        .init();

    let handler = ContactReplyHandler::<AwsSecretsManagerSecretRepository>::new().await;
    run(service_fn(|event| handler.handle(event))).await
}
