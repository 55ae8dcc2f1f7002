use super::{BackendError, InvoiceBackend};
use async_trait::async_trait;
use lnw_core::parsing::ListInvoicesResponse;
use lnw_core::RawInvoice;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;

/// Client for a lightningd node exposed through its REST plugin, which maps
/// every JSON-RPC method onto `POST /v1/<method>`.
#[derive(Clone)]
pub struct LightningdClient {
    pub base_url: String,
    pub auth: LightningdAuth,
    http_client: reqwest::Client,
}

#[derive(Clone)]
pub enum LightningdAuth {
    Rune { rune: String },
    None,
}

/// Certificate handling for the node's HTTPS endpoint.
#[derive(Clone, Debug, Default)]
pub struct TlsOptions {
    /// PEM bytes of an extra trusted root, usually clnrest's own CA.
    pub ca_cert_pem: Option<Vec<u8>>,
    pub accept_invalid_certs: bool,
}

#[derive(Debug, Deserialize)]
struct GetinfoResponse {
    id: String,
    #[serde(default)]
    alias: Option<String>,
    #[serde(default)]
    blockheight: Option<u64>,
}

impl LightningdClient {
    /// Builds the HTTP client once. `tls.ca_cert_pem` is trusted on top of
    /// the system roots.
    pub fn new(
        base_url: String,
        auth: LightningdAuth,
        tls: TlsOptions,
    ) -> Result<Arc<Self>, BackendError> {
        let mut builder = reqwest::Client::builder();
        if let Some(pem) = &tls.ca_cert_pem {
            let cert = reqwest::Certificate::from_pem(pem)
                .map_err(|e| BackendError::Tls(format!("bad CA certificate: {e}")))?;
            builder = builder.add_root_certificate(cert);
        }
        if tls.accept_invalid_certs {
            tracing::warn!("TLS certificate verification disabled for lightningd");
            builder = builder.danger_accept_invalid_certs(true);
        }
        let http_client = builder
            .build()
            .map_err(|e| BackendError::Tls(e.to_string()))?;

        Ok(Arc::new(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            http_client,
        }))
    }

    fn rpc_url(&self, method: &str) -> String {
        format!("{}/v1/{}", self.base_url, method)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, BackendError> {
        let mut req = self
            .http_client
            .post(self.rpc_url(method))
            .header("Content-Type", "application/json")
            .json(&params);
        if let LightningdAuth::Rune { rune } = &self.auth {
            req = req.header("Rune", rune);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| BackendError::NodeUnavailable(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::Auth(format!("{method}: {body}")));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::Rpc {
                method: method.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        resp.json().await.map_err(|e| BackendError::Decode {
            method: method.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl InvoiceBackend for LightningdClient {
    async fn get_invoices(&self) -> Result<Vec<RawInvoice>, BackendError> {
        let resp: ListInvoicesResponse = self
            .call("listinvoices", serde_json::json!({}))
            .await?;
        tracing::debug!(count = resp.invoices.len(), "listinvoices returned");
        Ok(resp.invoices)
    }

    async fn check_connectivity(&self) -> Result<(), BackendError> {
        let info: GetinfoResponse = self.call("getinfo", serde_json::json!({})).await?;
        tracing::info!(
            node_id = %info.id,
            alias = info.alias.as_deref().unwrap_or(""),
            blockheight = info.blockheight.unwrap_or_default(),
            "Connected to lightningd"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn method_urls_ignore_trailing_slash() {
        let client = LightningdClient::new(
            "https://127.0.0.1:3010/".into(),
            LightningdAuth::None,
            TlsOptions::default(),
        )
        .unwrap();
        assert_eq!(
            client.rpc_url("listinvoices"),
            "https://127.0.0.1:3010/v1/listinvoices"
        );
    }

    #[tokio::test]
    async fn unreachable_node_is_reported_as_unavailable() {
        // Port 9 (discard) is closed on loopback, so the connect is refused.
        let client = LightningdClient::new(
            "http://127.0.0.1:9".into(),
            LightningdAuth::Rune {
                rune: "test".into(),
            },
            TlsOptions::default(),
        )
        .unwrap();
        let err = client.get_invoices().await.unwrap_err();
        assert!(matches!(err, BackendError::NodeUnavailable(_)), "{err}");
    }

    #[test]
    fn tls_options_build_a_client() {
        let client = LightningdClient::new(
            "https://127.0.0.1:3010".into(),
            LightningdAuth::None,
            TlsOptions {
                ca_cert_pem: None,
                accept_invalid_certs: true,
            },
        )
        .unwrap();
        assert_eq!(client.rpc_url("getinfo"), "https://127.0.0.1:3010/v1/getinfo");
    }

    #[test]
    fn garbage_ca_certificate_is_rejected() {
        let result = LightningdClient::new(
            "https://127.0.0.1:3010".into(),
            LightningdAuth::None,
            TlsOptions {
                ca_cert_pem: Some(b"not a certificate".to_vec()),
                accept_invalid_certs: false,
            },
        );
        assert!(matches!(result, Err(BackendError::Tls(_))));
    }
}
