use async_trait::async_trait;
use aws_sdk_secretsmanager::Client as SecretsClient;
use serde::Deserialize;
use std::fmt;
use tracing::{debug, error};

use crate::error::{Result, SecretError};

fn default_port() -> u16 {
    3306
}

/// MySQL connection parameters stored as a JSON secret
#[derive(Deserialize, Clone, PartialEq)]
pub struct DbCredentials {
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl DbCredentials {
    pub fn from_secret_string(raw: &str) -> std::result::Result<Self, SecretError> {
        Ok(serde_json::from_str(raw)?)
    }
}

impl fmt::Debug for DbCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbCredentials")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("port", &self.port)
            .finish()
    }
}

#[async_trait]
pub trait SecretProvider: Send + Sync {
    async fn fetch_db_credentials(&self, secret_name: &str) -> Result<DbCredentials>;
}

pub struct SecretsManagerProvider {
    client: SecretsClient,
}

impl SecretsManagerProvider {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: SecretsClient::new(config),
        }
    }
}

#[async_trait]
impl SecretProvider for SecretsManagerProvider {
    async fn fetch_db_credentials(&self, secret_name: &str) -> Result<DbCredentials> {
        let output = match self
            .client
            .get_secret_value()
            .secret_id(secret_name)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                let not_found = e
                    .as_service_error()
                    .map(|service| service.is_resource_not_found_exception())
                    .unwrap_or(false);

                if not_found {
                    error!("Secret {} not found", secret_name);
                    return Err(SecretError::NotFound(secret_name.to_string()).into());
                }

                error!(
                    "Unable to retrieve secret {}. Check AWS credentials and permissions: {}",
                    secret_name, e
                );
                return Err(SecretError::AccessDenied {
                    name: secret_name.to_string(),
                    source: Box::new(e),
                }
                .into());
            }
        };

        let raw = output
            .secret_string()
            .ok_or_else(|| SecretError::Empty(secret_name.to_string()))?;

        let credentials = DbCredentials::from_secret_string(raw).inspect_err(|e| {
            error!("Secret {} could not be parsed: {}", secret_name, e);
        })?;

        debug!("Loaded database credentials for host {}", credentials.host);
        Ok(credentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_from_secret_string() {
        let raw = r#"{"host": "db.internal", "user": "checker", "password": "hunter2", "database": "audits"}"#;
        let creds = DbCredentials::from_secret_string(raw).unwrap();

        assert_eq!(creds.host, "db.internal");
        assert_eq!(creds.user, "checker");
        assert_eq!(creds.database, "audits");
        assert_eq!(creds.port, 3306);
    }

    #[test]
    fn test_credentials_with_explicit_port_and_extra_fields() {
        let raw = r#"{"host": "h", "user": "u", "password": "p", "database": "d", "port": 3307, "engine": "mysql"}"#;
        let creds = DbCredentials::from_secret_string(raw).unwrap();
        assert_eq!(creds.port, 3307);
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let raw = r#"{"host": "h", "user": "u"}"#;
        let err = DbCredentials::from_secret_string(raw).unwrap_err();
        assert!(matches!(err, SecretError::Malformed(_)));
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = DbCredentials {
            host: "h".to_string(),
            user: "u".to_string(),
            password: "super-secret".to_string(),
            database: "d".to_string(),
            port: 3306,
        };

        let rendered = format!("{:?}", creds);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
