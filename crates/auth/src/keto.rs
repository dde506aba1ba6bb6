//! Remote policy agent backed by an ORY Keto-style ACL service.
//!
//! Checks hit the read API, grants go through the write API as a relation
//! tuple transaction with a single `insert` delta.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use warden_core::{EnvError, env_or, parse_env_or};

use crate::policy::{AuthorizationError, PolicyAgent};
use crate::tuple::{NAMESPACE, PolicyRequest};

const CHECK_PATH: &str = "/relation-tuples/check";
const WRITE_PATH: &str = "/admin/relation-tuples";

/// Connection settings for the ACL service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KetoConfig {
    pub read_url: String,
    pub write_url: String,
    pub timeout: Duration,
}

impl Default for KetoConfig {
    fn default() -> Self {
        Self {
            read_url: "http://localhost:4466".to_string(),
            write_url: "http://localhost:4467".to_string(),
            timeout: Duration::from_millis(5000),
        }
    }
}

impl KetoConfig {
    /// Load from `WARDEN_KETO_READ_URL`, `WARDEN_KETO_WRITE_URL` and
    /// `WARDEN_KETO_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self, EnvError> {
        let defaults = Self::default();
        let timeout_ms = parse_env_or(
            "WARDEN_KETO_TIMEOUT_MS",
            defaults.timeout.as_millis() as u64,
        )?;

        Ok(Self {
            read_url: env_or("WARDEN_KETO_READ_URL", &defaults.read_url),
            write_url: env_or("WARDEN_KETO_WRITE_URL", &defaults.write_url),
            timeout: Duration::from_millis(timeout_ms),
        })
    }
}

#[derive(Debug, Deserialize)]
struct CheckResponse {
    allowed: bool,
}

/// Tuple as the ACL service spells it, both as check query and write body.
#[derive(Debug, Serialize)]
struct WireTuple<'a> {
    namespace: &'a str,
    object: &'a str,
    relation: &'a str,
    subject_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum DeltaAction {
    Insert,
}

#[derive(Debug, Serialize)]
struct TupleDelta<'a> {
    action: DeltaAction,
    relation_tuple: WireTuple<'a>,
}

/// Policy agent delegating to a remote ACL service.
#[derive(Debug, Clone)]
pub struct KetoPolicyAgent {
    client: reqwest::Client,
    read_url: String,
    write_url: String,
}

impl KetoPolicyAgent {
    pub fn new(config: &KetoConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: reqwest::Client, config: &KetoConfig) -> Self {
        Self {
            client,
            read_url: config.read_url.trim_end_matches('/').to_string(),
            write_url: config.write_url.trim_end_matches('/').to_string(),
        }
    }

    fn wire<'a>(req: &'a PolicyRequest) -> WireTuple<'a> {
        WireTuple {
            namespace: NAMESPACE,
            object: &req.object,
            relation: &req.relation,
            subject_id: &req.subject,
        }
    }
}

/// Backend failures stay `AuthorizationError`; the log line is the only place
/// an outage is distinguishable from a denial.
fn backend_failure(op: &'static str, req: &PolicyRequest, err: reqwest::Error) -> AuthorizationError {
    tracing::warn!(op, tuple = %req, error = %err, "policy backend request failed");
    AuthorizationError::backend(err)
}

#[async_trait]
impl PolicyAgent for KetoPolicyAgent {
    async fn check_policy(&self, req: &PolicyRequest) -> Result<(), AuthorizationError> {
        let res = self
            .client
            .get(format!("{}{}", self.read_url, CHECK_PATH))
            .query(&Self::wire(req))
            .send()
            .await
            .map_err(|e| backend_failure("check", req, e))?;

        match res.status() {
            // Denials come back as 403 with the same body shape.
            StatusCode::FORBIDDEN => Err(AuthorizationError::denied()),
            status if status.is_success() => {
                let body: CheckResponse = res
                    .json()
                    .await
                    .map_err(|e| backend_failure("check", req, e))?;
                if body.allowed {
                    Ok(())
                } else {
                    Err(AuthorizationError::denied())
                }
            }
            status => {
                tracing::warn!(op = "check", tuple = %req, %status, "unexpected policy backend status");
                Err(AuthorizationError::backend(format!(
                    "unexpected status {status} from check"
                )))
            }
        }
    }

    async fn add_policy(&self, req: &PolicyRequest) -> Result<(), AuthorizationError> {
        let deltas = [TupleDelta {
            action: DeltaAction::Insert,
            relation_tuple: Self::wire(req),
        }];

        let res = self
            .client
            .patch(format!("{}{}", self.write_url, WRITE_PATH))
            .json(&deltas)
            .send()
            .await
            .map_err(|e| backend_failure("add", req, e))?;

        res.error_for_status()
            .map(|_| ())
            .map_err(|e| backend_failure("add", req, e))
    }
}
