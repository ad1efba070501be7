//! kea control agent over HTTP(S)
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use reqwest::{Certificate, Client, Identity, Url};
use tracing::trace;

use crate::{
    command::{Command, Reply, Response},
    error::{ClientError, ClientResult},
    transport::Transport,
};

/// TLS material for HTTPS control agents. `client_cert` and `client_key` are
/// only used together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsOptions {
    /// PEM client certificate
    pub client_cert: Option<PathBuf>,
    /// PEM private key for `client_cert`
    pub client_key: Option<PathBuf>,
    /// extra PEM root certificate to trust
    pub ca_cert: Option<PathBuf>,
}

/// POSTs commands to a control agent
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    url: Url,
}

fn read(path: &Path) -> ClientResult<Vec<u8>> {
    std::fs::read(path).map_err(|source| ClientError::File {
        path: path.to_owned(),
        source,
    })
}

impl HttpTransport {
    /// Builds the HTTP client. Certificate files are read here so a bad path
    /// fails at startup instead of on every poll.
    pub fn new(url: Url, timeout: Duration, tls: &TlsOptions) -> ClientResult<Self> {
        let mut builder = Client::builder().timeout(timeout).use_rustls_tls();
        if let (Some(cert), Some(key)) = (&tls.client_cert, &tls.client_key) {
            let mut pem = read(cert)?;
            pem.push(b'\n');
            pem.extend(read(key)?);
            builder = builder.identity(Identity::from_pem(&pem)?);
        }
        if let Some(ca) = &tls.ca_cert {
            builder = builder.add_root_certificate(Certificate::from_pem(&read(ca)?)?);
        }
        Ok(Self {
            client: builder.build()?,
            url,
        })
    }

    /// agent URL
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, command: &Command) -> ClientResult<Vec<Response>> {
        let body = self
            .client
            .post(self.url.clone())
            .json(command)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        trace!(url = %self.url, len = body.len(), "read reply");
        Reply::parse(&body)
    }

    fn is_agent(&self) -> bool {
        true
    }
}
