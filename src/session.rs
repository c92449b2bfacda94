use std::time::Duration;

use aws_config::{timeout::TimeoutConfig, BehaviorVersion, Region, SdkConfig};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("failed to resolve AWS caller identity: {0}")]
    Credentials(String),

    #[error("no Identity Center instances found in this AWS account")]
    InstanceNotFound,

    #[error("error initializing Identity Center clients: {0}")]
    ClientInitialization(String),
}

/// Identity of the credentials the session was opened with.
#[derive(Clone, Debug)]
pub struct CallerIdentity {
    pub account: String,
    pub arn: String,
    pub user_id: String,
}

/// An immutable, ready-to-use Identity Center session: resolved SDK
/// configuration, service clients, and the discovered instance coordinates.
///
/// Constructed once per run and passed by reference into the auditor; no
/// client handles live in mutable global state.
pub struct SsoSession {
    sdk_config: SdkConfig,
    sso_admin: aws_sdk_ssoadmin::Client,
    identity_store: aws_sdk_identitystore::Client,
    instance_arn: String,
    identity_store_id: String,
}

impl SsoSession {
    /// Opens a session for the configured region/profile and discovers the
    /// Identity Center instance.
    ///
    /// There is exactly one instance per organization; the first entry of the
    /// listing is taken and an empty listing is an error.
    pub async fn connect(config: &Config) -> Result<Self, SessionError> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.aws_region.clone()))
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(Duration::from_secs(config.timeout_secs))
                    .build(),
            );
        if let Some(profile) = &config.aws_profile {
            loader = loader.profile_name(profile);
        }
        let sdk_config = loader.load().await;
        info!("AWS session initialized for region: {}", config.aws_region);

        let sso_admin = aws_sdk_ssoadmin::Client::new(&sdk_config);
        let identity_store = aws_sdk_identitystore::Client::new(&sdk_config);

        let instances = sso_admin
            .list_instances()
            .send()
            .await
            .map_err(|err| SessionError::ClientInitialization(err.to_string()))?;

        let instance = instances.instances().first().ok_or(SessionError::InstanceNotFound)?;
        let instance_arn = instance
            .instance_arn()
            .ok_or_else(|| {
                SessionError::ClientInitialization(
                    "Identity Center instance is missing an instance ARN".to_string(),
                )
            })?
            .to_string();
        let identity_store_id = instance
            .identity_store_id()
            .ok_or_else(|| {
                SessionError::ClientInitialization(
                    "Identity Center instance is missing an identity store id".to_string(),
                )
            })?
            .to_string();

        debug!("Identity Center instance discovered: {instance_arn}");

        Ok(Self { sdk_config, sso_admin, identity_store, instance_arn, identity_store_id })
    }

    pub fn instance_arn(&self) -> &str {
        &self.instance_arn
    }

    pub fn identity_store_id(&self) -> &str {
        &self.identity_store_id
    }

    pub(crate) fn sso_admin(&self) -> &aws_sdk_ssoadmin::Client {
        &self.sso_admin
    }

    pub(crate) fn identity_store(&self) -> &aws_sdk_identitystore::Client {
        &self.identity_store
    }

    /// Resolves the caller identity of the session credentials
    /// (STS GetCallerIdentity).
    pub async fn caller_identity(&self) -> Result<CallerIdentity, SessionError> {
        let sts = aws_sdk_sts::Client::new(&self.sdk_config);
        let out = sts
            .get_caller_identity()
            .send()
            .await
            .map_err(|err| SessionError::Credentials(err.to_string()))?;
        Ok(CallerIdentity {
            account: out.account().unwrap_or_default().to_string(),
            arn: out.arn().unwrap_or_default().to_string(),
            user_id: out.user_id().unwrap_or_default().to_string(),
        })
    }
}
