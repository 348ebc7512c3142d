use async_trait::async_trait;
use aws_config::BehaviorVersion;
use serde::de::DeserializeOwned;

const SECRETS_REGION: &str = "eu-north-1";

#[derive(Debug, thiserror::Error)]
pub enum EnvironmentError {
    #[error("Missing secret {0}")]
    MissingSecret(&'static str),
    #[error("Unable to read secret {name}: {source}")]
    Backend {
        name: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("Malformed secret {name}: {source}")]
    Malformed {
        name: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[async_trait]
pub trait SecretRepository: Send + Sync {
    async fn open() -> Self;

    async fn get_secret<T: DeserializeOwned>(
        &self,
        name: &'static str,
    ) -> Result<T, EnvironmentError>;
}

#[derive(Clone)]
pub struct AwsSecretsManagerSecretRepository(aws_sdk_secretsmanager::Client);

#[async_trait]
impl SecretRepository for AwsSecretsManagerSecretRepository {
    async fn open() -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(SECRETS_REGION);
        if let Ok(url) = std::env::var("AWS_ENDPOINT_URL") {
            loader = loader.endpoint_url(url);
        }
        let config = loader.load().await;
        let secrets_client = aws_sdk_secretsmanager::Client::new(&config);
        Self(secrets_client)
    }

    async fn get_secret<T: DeserializeOwned>(
        &self,
        name: &'static str,
    ) -> Result<T, EnvironmentError> {
        let secret = self
            .0
            .get_secret_value()
            .secret_id(name)
            .send()
            .await
            .map_err(|e| EnvironmentError::Backend {
                name,
                source: Box::new(e),
            })?;
        let Some(secret_value) = secret.secret_string() else {
            return Err(EnvironmentError::MissingSecret(name));
        };
        parse_secret(name, secret_value)
    }
}

pub(crate) fn parse_secret<T: DeserializeOwned>(
    name: &'static str,
    value: &str,
) -> Result<T, EnvironmentError> {
    serde_json::from_str(value).map_err(|source| EnvironmentError::Malformed { name, source })
}
