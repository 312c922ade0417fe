//! The XMLA protocol client.
//!
//! Blocking HTTP POST against the provider's XMLA endpoint. One client
//! serves one data source; credentials come from an injected
//! [`CredentialSource`] and are cached per (datasource, principal) for
//! reuse within a session.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::config::DataSource;

use super::cancel::{CancelObservation, CancelToken};
use super::discover::parse_rowset;
use super::soap;
use super::{XmlaError, XmlaResult};

/// HTTP Basic credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Resolves credentials for a (datasource, principal) pair.
///
/// A per-principal delegated credential takes precedence; returning
/// `None` means the request goes out unauthenticated.
pub trait CredentialSource: Send + Sync {
    fn resolve(&self, datasource: &str, principal: Option<&str>) -> Option<Credentials>;
}

/// A data-source-level static credential, the common case.
#[derive(Debug, Clone)]
pub struct StaticCredentials(pub Credentials);

impl StaticCredentials {
    /// The static credential written in the data-source configuration,
    /// if one is set.
    pub fn from_datasource(config: &DataSource) -> Option<Self> {
        match (&config.username, &config.password) {
            (Some(user), Some(pass)) => {
                Some(Self(Credentials::new(user.clone(), pass.clone())))
            }
            _ => None,
        }
    }
}

impl CredentialSource for StaticCredentials {
    fn resolve(&self, _datasource: &str, _principal: Option<&str>) -> Option<Credentials> {
        Some(self.0.clone())
    }
}

/// No credentials at all (anonymous endpoints).
#[derive(Debug, Clone, Copy)]
pub struct NoCredentials;

impl CredentialSource for NoCredentials {
    fn resolve(&self, _datasource: &str, _principal: Option<&str>) -> Option<Credentials> {
        None
    }
}

/// Synchronous XMLA client for one data source.
pub struct XmlaClient {
    http: reqwest::blocking::Client,
    url: String,
    datasource: String,
    catalog: String,
    credentials: Arc<dyn CredentialSource>,
    principal: Option<String>,
    /// Resolved credentials per (datasource, principal).
    resolved: Mutex<HashMap<(String, Option<String>), Option<Credentials>>>,
}

impl XmlaClient {
    pub fn new(config: &DataSource, credentials: Arc<dyn CredentialSource>) -> XmlaResult<Self> {
        let http = reqwest::blocking::Client::builder().build()?;
        Ok(Self {
            http,
            url: config.url.clone(),
            datasource: config.name.clone(),
            catalog: config.catalog.clone(),
            credentials,
            principal: None,
            resolved: Mutex::new(HashMap::new()),
        })
    }

    /// Run requests on behalf of a principal (delegated credentials,
    /// principal-salted cache keys).
    pub fn with_principal(mut self, principal: impl Into<String>) -> Self {
        self.principal = Some(principal.into());
        self
    }

    pub fn datasource(&self) -> &str {
        &self.datasource
    }

    pub fn catalog(&self) -> &str {
        &self.catalog
    }

    pub fn principal(&self) -> Option<&str> {
        self.principal.as_deref()
    }

    /// Issue a Discover call and return the rowset rows.
    pub fn discover(
        &self,
        request_type: &str,
        restrictions: &[(&str, &str)],
    ) -> XmlaResult<Vec<HashMap<String, String>>> {
        let properties = [
            ("Catalog", self.catalog.as_str()),
            ("Format", "Tabular"),
            ("Content", "SchemaData"),
        ];
        let body = soap::discover_envelope(request_type, restrictions, &properties);
        tracing::debug!(request_type, datasource = %self.datasource, "discover");
        let text = self.post(soap::DISCOVER_ACTION, body)?;
        parse_rowset(&text)
    }

    /// Execute one MDX statement and return the raw response body for
    /// the result parser.
    ///
    /// The token's critical section makes the send and a concurrent
    /// cancel mutually exclusive: a cancel marked first means no
    /// network call at all. Failures surfacing after the token was
    /// marked are teardown collateral and collapse into `Cancelled`.
    pub fn execute(&self, statement: &str, token: &CancelToken) -> XmlaResult<String> {
        if !token.try_mark_sent(statement) {
            tracing::debug!(datasource = %self.datasource, "execute skipped, already cancelled");
            return Err(XmlaError::Cancelled);
        }

        let request_id = uuid::Uuid::new_v4();
        tracing::debug!(%request_id, statement, "execute");
        let properties = [
            ("Catalog", self.catalog.as_str()),
            ("Format", "Multidimensional"),
            ("AxisFormat", "TupleFormat"),
        ];
        let body = soap::execute_envelope(statement, &properties);
        let result = self.post(soap::EXECUTE_ACTION, body);
        token.finish();

        match result {
            _ if token.is_cancelled() => Err(XmlaError::Cancelled),
            other => other,
        }
    }

    /// Mark a token cancelled; when a request is already on the wire,
    /// additionally attempt the server-side cancel. Best effort: a
    /// failed server-side cancel is logged and dropped.
    pub fn cancel(&self, token: &CancelToken) {
        match token.cancel() {
            CancelObservation::NotSent => {}
            CancelObservation::InFlight { statement } => {
                if let Err(err) = self.cancel_session(&statement) {
                    tracing::debug!("server-side cancel failed: {}", err);
                }
            }
        }
    }

    /// Find the server session running `statement` and cancel it.
    ///
    /// DISCOVER_SESSIONS reports each session's last command; the match
    /// is by statement text because the provider assigns session ids
    /// server-side.
    fn cancel_session(&self, statement: &str) -> XmlaResult<()> {
        let rows = self.discover("DISCOVER_SESSIONS", &[])?;
        let session_id = rows.iter().find_map(|row| {
            let last = row.get("SESSION_LAST_COMMAND")?;
            if last == statement {
                row.get("SESSION_ID").cloned()
            } else {
                None
            }
        });
        if let Some(id) = session_id {
            tracing::debug!(session = %id, "issuing server-side cancel");
            self.post(soap::EXECUTE_ACTION, soap::cancel_envelope(&id))?;
        }
        Ok(())
    }

    /// The credential for this client's (datasource, principal) pair,
    /// resolved once and reused for the rest of the session.
    fn request_credentials(&self) -> Option<Credentials> {
        let key = (self.datasource.clone(), self.principal.clone());
        let mut resolved = self.resolved.lock().expect("credential lock poisoned");
        resolved
            .entry(key)
            .or_insert_with(|| {
                self.credentials
                    .resolve(&self.datasource, self.principal.as_deref())
            })
            .clone()
    }

    fn post(&self, action: &str, body: String) -> XmlaResult<String> {
        let mut request = self
            .http
            .post(&self.url)
            .header("Content-Type", "text/xml; charset=utf-8")
            .header("SOAPAction", action)
            .body(body);
        if let Some(creds) = self.request_credentials() {
            let token = BASE64.encode(format!("{}:{}", creds.username, creds.password));
            request = request.header("Authorization", format!("Basic {}", token));
        }

        let response = request.send()?;
        let status = response.status();
        let text = response.text()?;
        if !status.is_success() {
            return Err(XmlaError::Http {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .map(str::to_string)
                    .unwrap_or_else(|| text.clone()),
            });
        }
        if let Some(fault) = soap::extract_fault(&text) {
            return Err(XmlaError::Fault(fault));
        }
        Ok(text)
    }
}
