//! Bridge daemon HTTP client.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::types::{
    direct_path_from_url, ContactInfo, DownloadResponse, GroupInfo, Jid, MediaRequest, SelfResponse,
};

/// JSON-RPC 2.0 request structure.
#[derive(Debug, Serialize)]
struct RpcRequest<'a, T: Serialize> {
    jsonrpc: &'static str,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<T>,
    id: u64,
}

/// JSON-RPC 2.0 response structure.
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

/// JSON-RPC 2.0 error.
#[derive(Debug, Deserialize)]
struct RpcError {
    code: i32,
    message: String,
}

/// Parameters of lookups keyed by a chat or user identifier.
#[derive(Debug, Serialize)]
struct JidParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    account: Option<String>,
    jid: String,
}

/// Parameters of the `downloadMedia` method.
#[derive(Debug, Serialize)]
struct DownloadParams<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    account: Option<String>,
    #[serde(flatten)]
    request: &'a MediaRequest,
}

/// Client for communicating with the bridge daemon.
#[derive(Clone)]
pub struct BridgeClient {
    http: Client,
    config: BridgeConfig,
    request_id: Arc<AtomicU64>,
    connected: Arc<AtomicBool>,
}

impl BridgeClient {
    /// Connect to the bridge daemon.
    pub async fn connect(config: BridgeConfig) -> Result<Self, BridgeError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(BridgeError::Http)?;

        let client = Self {
            http,
            config,
            request_id: Arc::new(AtomicU64::new(1)),
            connected: Arc::new(AtomicBool::new(false)),
        };

        // Verify connection with health check
        if client.health_check().await? {
            client.connected.store(true, Ordering::SeqCst);
            info!("Connected to bridge daemon at {}", client.config.base_url);
        } else {
            return Err(BridgeError::HealthCheckFailed);
        }

        Ok(client)
    }

    /// Check if currently connected to the daemon.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Perform a health check against the daemon.
    pub async fn health_check(&self) -> Result<bool, BridgeError> {
        let url = self.config.check_url();
        debug!("Health check: {}", url);

        match self.http.get(&url).send().await {
            Ok(resp) => {
                let ok = resp.status().is_success();
                self.connected.store(ok, Ordering::SeqCst);
                Ok(ok)
            }
            Err(e) => {
                self.connected.store(false, Ordering::SeqCst);
                Err(BridgeError::Http(e))
            }
        }
    }

    /// Get the identifier of the paired account.
    pub async fn get_self_jid(&self) -> Result<Jid, BridgeError> {
        let params = serde_json::json!({ "account": self.config.account });
        let resp: SelfResponse = self.rpc_call("getSelf", Some(params)).await?;
        resp.jid.parse()
    }

    /// Look up a contact in the daemon's address book.
    pub async fn get_contact(&self, jid: &Jid) -> Result<ContactInfo, BridgeError> {
        self.rpc_call("getContact", Some(self.jid_params(jid))).await
    }

    /// Fetch metadata of a group the account belongs to.
    pub async fn get_group_info(&self, jid: &Jid) -> Result<GroupInfo, BridgeError> {
        self.rpc_call("getGroupInfo", Some(self.jid_params(jid))).await
    }

    /// Download and decrypt a media object.
    ///
    /// The daemon performs the fetch and decryption; the plaintext is
    /// checked here against the declared length and SHA-256.
    pub async fn download_media(&self, request: &MediaRequest) -> Result<Vec<u8>, BridgeError> {
        if !request.is_complete() {
            return Err(BridgeError::IncompleteMedia);
        }

        let mut request = request.clone();
        if request.direct_path.is_empty() {
            request.direct_path = direct_path_from_url(&request.url);
        }

        debug!(
            "Downloading {:?} media ({} bytes) from {}",
            request.kind, request.file_length, request.direct_path
        );

        let params = DownloadParams {
            account: self.config.account.clone(),
            request: &request,
        };
        let resp: DownloadResponse = self.rpc_call("downloadMedia", Some(params)).await?;

        verify_media(&resp.data, &request)?;
        Ok(resp.data)
    }

    /// Start a background health monitor that periodically checks the daemon.
    pub fn start_health_monitor(&self, interval: Duration) -> JoinHandle<()> {
        let client = self.clone();

        tokio::spawn(async move {
            let mut consecutive_failures = 0u32;

            loop {
                tokio::time::sleep(interval).await;

                match client.health_check().await {
                    Ok(true) => {
                        if consecutive_failures > 0 {
                            info!("Bridge connection restored");
                        }
                        consecutive_failures = 0;
                    }
                    Ok(false) => {
                        consecutive_failures += 1;
                        warn!(
                            "Health check returned not OK (failures: {})",
                            consecutive_failures
                        );
                    }
                    Err(e) => {
                        consecutive_failures += 1;
                        error!(
                            "Health check failed: {} (failures: {})",
                            e, consecutive_failures
                        );
                    }
                }
            }
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    fn jid_params(&self, jid: &Jid) -> JidParams {
        JidParams {
            account: self.config.account.clone(),
            jid: jid.to_string(),
        }
    }

    /// Make a JSON-RPC call to the daemon.
    async fn rpc_call<P: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: Option<P>,
    ) -> Result<R, BridgeError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let url = self.config.rpc_url();

        let request = RpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id,
        };

        debug!("RPC call: {} (id={})", method, id);

        let response = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(BridgeError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::Connection(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        let rpc_response: RpcResponse<R> = response.json().await.map_err(BridgeError::Http)?;

        if let Some(error) = rpc_response.error {
            return Err(BridgeError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        rpc_response
            .result
            .ok_or_else(|| BridgeError::Rpc {
                code: -1,
                message: "No result in response".to_string(),
            })
    }
}

impl std::fmt::Debug for BridgeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeClient")
            .field("config", &self.config)
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Check decrypted media against the length and SHA-256 it was announced with.
pub fn verify_media(data: &[u8], request: &MediaRequest) -> Result<(), BridgeError> {
    if data.len() as u64 != request.file_length {
        return Err(BridgeError::Integrity(format!(
            "expected {} bytes, got {}",
            request.file_length,
            data.len()
        )));
    }

    let digest = Sha256::digest(data);
    if digest.as_slice() != request.file_sha256.as_slice() {
        return Err(BridgeError::Integrity(format!(
            "sha256 mismatch: expected {}, got {}",
            hex::encode(&request.file_sha256),
            hex::encode(digest)
        )));
    }

    Ok(())
}
