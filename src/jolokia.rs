use parking_lot::RwLock;
use reqwest::header;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::endpoints::{
    self, ComponentKind, Placeholder, ResolveError, Substitutions, TemplateFamily,
};

/// Path the Artemis web console mounts its Jolokia agent under.
pub const JOLOKIA_BASE_PATH: &str = "/console/jolokia";

/// Connection parameters for one broker, as validated at login.
#[derive(Debug, Clone)]
pub struct BrokerIdentity {
    pub host: String,
    pub port: u16,
    pub scheme: String,
    pub username: String,
    pub password: String,
}

impl BrokerIdentity {
    pub fn base_url(&self) -> String {
        format!(
            "{}://{}:{}{}",
            self.scheme, self.host, self.port, JOLOKIA_BASE_PATH
        )
    }

    /// Origin header value the Jolokia agent's CORS check expects.
    pub fn origin(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }
}

#[derive(Debug, Error)]
pub enum JolokiaError {
    /// Programmer error: a kind/family combination with no template, or an
    /// address resolved before the broker name was discovered.
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("configuration error: {0}")]
    Resolve(#[from] ResolveError),
    /// Network or HTTP failure reaching the broker.
    #[error("http request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected http status {0} from jolokia agent")]
    UnexpectedStatus(reqwest::StatusCode),
    /// The transport succeeded but the Jolokia envelope reported a failure;
    /// `error` carries the broker's own exception message.
    #[error("jolokia status {status}: {error}")]
    Protocol {
        status: u16,
        error: String,
        error_type: Option<String>,
    },
    #[error("malformed jolokia response: {0}")]
    Malformed(String),
}

/// Wire-level response unit Jolokia wraps every result in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JolokiaEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    pub status: u16,
}

impl JolokiaEnvelope {
    /// Extract the payload, classifying any non-200 envelope as a protocol
    /// error carrying the broker's error strings verbatim.
    pub fn into_value(self) -> Result<Value, JolokiaError> {
        if self.status == 200 {
            Ok(self.value.unwrap_or(Value::Null))
        } else {
            Err(JolokiaError::Protocol {
                status: self.status,
                error: self
                    .error
                    .unwrap_or_else(|| "unknown jolokia error".to_string()),
                error_type: self.error_type,
            })
        }
    }
}

/// Attribute/operation catalogue of one MBean, as returned by `list`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentDetails {
    #[serde(default)]
    pub op: serde_json::Map<String, Value>,
    #[serde(default)]
    pub attr: serde_json::Map<String, Value>,
    #[serde(default)]
    pub class: String,
    #[serde(default)]
    pub desc: String,
}

/// Authenticated HTTP client for one broker's Jolokia agent.
///
/// The resolved broker name is discovered by the first successful
/// [`JolokiaClient::validate`] and cached for the client's lifetime; every
/// template that mentions it refuses to resolve until then.
pub struct JolokiaClient {
    http: reqwest::Client,
    identity: BrokerIdentity,
    broker_name: RwLock<Option<String>>,
}

impl JolokiaClient {
    pub fn new(identity: BrokerIdentity) -> Self {
        Self {
            http: reqwest::Client::new(),
            identity,
            broker_name: RwLock::new(None),
        }
    }

    pub fn identity(&self) -> &BrokerIdentity {
        &self.identity
    }

    pub fn broker_name(&self) -> Option<String> {
        self.broker_name.read().clone()
    }

    fn resolved_address(
        &self,
        kind: ComponentKind,
        family: TemplateFamily,
        substitutions: &Substitutions,
    ) -> Result<String, JolokiaError> {
        let template = kind.template(family)?;
        let broker_name = self.broker_name();
        if broker_name.is_none() && template.contains(Placeholder::BrokerName.token()) {
            return Err(JolokiaError::Configuration(
                "broker name not discovered yet; credentials must validate first".to_string(),
            ));
        }
        Ok(endpoints::resolve(
            template,
            substitutions,
            broker_name.as_deref(),
        )?)
    }

    async fn get_envelope(&self, url: String) -> Result<JolokiaEnvelope, JolokiaError> {
        let response = self
            .http
            .get(url)
            .basic_auth(&self.identity.username, Some(&self.identity.password))
            .header(header::ORIGIN, self.identity.origin())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(JolokiaError::UnexpectedStatus(response.status()));
        }
        Ok(response.json().await?)
    }

    async fn post_bulk(&self, body: &[Value]) -> Result<Vec<JolokiaEnvelope>, JolokiaError> {
        let response = self
            .http
            .post(self.identity.base_url())
            .basic_auth(&self.identity.username, Some(&self.identity.password))
            .header(header::ORIGIN, self.identity.origin())
            .json(body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(JolokiaError::UnexpectedStatus(response.status()));
        }
        Ok(response.json().await?)
    }

    /// GET `search/<pattern>`: object names matching a wildcard pattern.
    pub async fn search(
        &self,
        kind: ComponentKind,
        substitutions: &Substitutions,
    ) -> Result<Vec<String>, JolokiaError> {
        let pattern = self.resolved_address(kind, TemplateFamily::Search, substitutions)?;
        debug!(%pattern, "jolokia search");
        let url = format!("{}/search/{}", self.identity.base_url(), pattern);
        let value = self.get_envelope(url).await?.into_value()?;
        serde_json::from_value(value)
            .map_err(|err| JolokiaError::Malformed(format!("search result: {err}")))
    }

    /// GET `list/<domain>/<props>`: the attribute/operation catalogue of one
    /// instance. The first `:` of the resolved address becomes the path
    /// separator Jolokia's list endpoint expects.
    pub async fn list_details(
        &self,
        kind: ComponentKind,
        substitutions: &Substitutions,
    ) -> Result<ComponentDetails, JolokiaError> {
        let address = self.resolved_address(kind, TemplateFamily::List, substitutions)?;
        debug!(%address, "jolokia list");
        let path = address.replacen(':', "/", 1);
        let url = format!("{}/list/{}", self.identity.base_url(), path);
        let value = self.get_envelope(url).await?.into_value()?;
        serde_json::from_value(value)
            .map_err(|err| JolokiaError::Malformed(format!("list result: {err}")))
    }

    /// Bulk POST, one `read` item per attribute; envelopes come back in
    /// request order. An empty attribute list is a successful no-op.
    pub async fn read_attributes(
        &self,
        kind: ComponentKind,
        substitutions: &Substitutions,
        attributes: &[String],
    ) -> Result<Vec<JolokiaEnvelope>, JolokiaError> {
        if attributes.is_empty() {
            return Ok(Vec::new());
        }
        let mbean = self.resolved_address(kind, TemplateFamily::Name, substitutions)?;
        let body: Vec<Value> = attributes
            .iter()
            .map(|attribute| {
                json!({
                    "type": "read",
                    "mbean": mbean,
                    "attribute": attribute,
                })
            })
            .collect();
        debug!(%mbean, count = attributes.len(), "jolokia bulk read");
        self.post_bulk(&body).await
    }

    /// Single-element POST invoking one MBean operation.
    pub async fn exec_operation(
        &self,
        kind: ComponentKind,
        substitutions: &Substitutions,
        signature: &str,
        args: &[String],
    ) -> Result<JolokiaEnvelope, JolokiaError> {
        let mbean = self.resolved_address(kind, TemplateFamily::Name, substitutions)?;
        let body = vec![json!({
            "type": "exec",
            "mbean": mbean,
            "operation": signature,
            "arguments": args,
        })];
        debug!(%mbean, operation = signature, "jolokia exec");
        let mut envelopes = self.post_bulk(&body).await?;
        match envelopes.len() {
            1 => Ok(envelopes.remove(0)),
            n => Err(JolokiaError::Malformed(format!(
                "exec returned {n} envelopes, expected 1"
            ))),
        }
    }

    /// Probe the credentials by searching for the broker root bean.
    ///
    /// True iff the search yields exactly one match, in which case the
    /// resolved broker name is cached on this client. Zero or multiple
    /// matches are a boolean `false`, never an error; transport and protocol
    /// failures still surface as errors.
    pub async fn validate(&self) -> Result<bool, JolokiaError> {
        let matches = self
            .search(ComponentKind::Broker, &Substitutions::new())
            .await?;
        if matches.len() != 1 {
            debug!(count = matches.len(), "broker search was not unambiguous");
            return Ok(false);
        }
        match broker_name_from_object_name(&matches[0]) {
            Some(name) => {
                debug!(broker = %name, "resolved broker name");
                *self.broker_name.write() = Some(name);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Unquoted value to the right of the first `=` in an object name, e.g.
/// `org.apache.activemq.artemis:broker="amq-broker"` yields `amq-broker`.
pub fn broker_name_from_object_name(object_name: &str) -> Option<String> {
    let (_, value) = object_name.split_once('=')?;
    let name = value.trim_matches('"');
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
