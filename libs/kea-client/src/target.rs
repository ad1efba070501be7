//! # target
//!
//! A polled kea endpoint: either one daemon's unix socket or a control agent
//! fronting several daemons. [`Target`] hides the difference. The control
//! agent is asked once which dhcp daemons it knows about and every later
//! command is forwarded to exactly those services.
use std::{fmt, path::PathBuf, str::FromStr, time::Duration};

use kea_stats::{Family, Statistics};
use reqwest::Url;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::{
    command::{CONFIG_GET, Command, Response, STATISTIC_GET_ALL},
    daemon::{FamilyConfig, parse_config},
    error::{ClientError, ClientResult},
    http::{HttpTransport, TlsOptions},
    socket::SocketTransport,
    transport::Transport,
};

/// where a target lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    /// daemon control socket
    Socket(PathBuf),
    /// control agent URL
    Http(Url),
}

impl FromStr for Address {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| ClientError::InvalidTarget {
            target: s.to_owned(),
            reason,
        };
        let s = s.trim();
        if s.is_empty() {
            return Err(invalid("empty target".to_owned()));
        }
        if s.starts_with("http://") || s.starts_with("https://") {
            return Url::parse(s)
                .map(Address::Http)
                .map_err(|err| invalid(err.to_string()));
        }
        Ok(Address::Socket(PathBuf::from(s)))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Socket(path) => write!(f, "{}", path.display()),
            Address::Http(url) => write!(f, "{url}"),
        }
    }
}

/// transport settings shared by all targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// per request timeout
    pub timeout: Duration,
    /// HTTPS material, unused for sockets
    pub tls: TlsOptions,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            tls: TlsOptions::default(),
        }
    }
}

/// Build a [`Target`] for `address` with the matching transport.
pub fn connect(address: &Address, opts: &ClientOptions) -> ClientResult<Target> {
    let transport: Box<dyn Transport> = match address {
        Address::Socket(path) => Box::new(SocketTransport::new(path, opts.timeout)?),
        Address::Http(url) => Box::new(HttpTransport::new(url.clone(), opts.timeout, &opts.tls)?),
    };
    Ok(Target::new(address.to_string(), transport))
}

/// one family's newest statistics
#[derive(Debug, Clone, PartialEq)]
pub struct FamilyStatistics {
    /// daemon family
    pub family: Family,
    /// the snapshot
    pub statistics: Statistics,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Services {
    /// agent not asked yet
    Unknown,
    /// the peer is a daemon, commands carry no `service`
    Direct,
    /// control agent forwarding to these daemons
    Agent(Vec<String>),
}

/// Kea protocol state for one endpoint.
#[derive(Debug)]
pub struct Target<T = Box<dyn Transport>> {
    name: String,
    transport: T,
    services: Services,
    /// family of each response position, kept per position across failed refreshes
    families: Vec<Option<Family>>,
}

impl<T: Transport> Target<T> {
    /// new target, nothing is sent until the first refresh
    pub fn new<S: Into<String>>(name: S, transport: T) -> Self {
        let services = if transport.is_agent() {
            Services::Unknown
        } else {
            Services::Direct
        };
        Self {
            name: name.into(),
            transport,
            services,
            families: Vec::new(),
        }
    }

    /// the target as given on the command line
    pub fn name(&self) -> &str {
        &self.name
    }

    /// services the control agent forwards to, `None` for a direct daemon or
    /// before discovery
    pub fn services(&self) -> Option<&[String]> {
        match &self.services {
            Services::Agent(services) => Some(services),
            _ => None,
        }
    }

    /// families seen in the last successful configuration load
    pub fn families(&self) -> impl Iterator<Item = Family> + '_ {
        self.families.iter().flatten().copied()
    }

    async fn discover(&mut self) -> ClientResult<Option<Vec<String>>> {
        if self.services == Services::Unknown {
            let responses = self.transport.send(&Command::new(CONFIG_GET)).await?;
            let arguments = responses
                .into_iter()
                .next()
                .ok_or(ClientError::NoDhcpConfig)?
                .into_arguments(CONFIG_GET)?;
            self.services = discover_services(&arguments)?;
            debug!(addr = %self.name, services = ?self.services, "discovered services");
        }
        Ok(self.services().map(<[String]>::to_vec))
    }

    /// Fetch the configuration of every daemon behind this target. A daemon
    /// answering with an error is logged and left out of the returned configs,
    /// but its statistics are still fetched if an earlier refresh loaded it.
    /// The call only fails if no daemon produced a usable configuration.
    pub async fn refresh_config(&mut self) -> ClientResult<Vec<FamilyConfig>> {
        let service = self.discover().await?;
        let responses = self
            .transport
            .send(&Command::new(CONFIG_GET).service(service.clone()))
            .await?;

        let mut families = Vec::with_capacity(responses.len());
        let mut configs = Vec::with_capacity(responses.len());
        let mut first_err = None;
        for (pos, response) in responses.into_iter().enumerate() {
            let service = service.as_ref().and_then(|s| s.get(pos)).map(String::as_str);
            match response
                .into_arguments(CONFIG_GET)
                .and_then(|arguments| parse_config(&arguments))
            {
                Ok(config) => {
                    families.push(Some(config.family));
                    configs.push(config);
                }
                Err(err) => {
                    // the daemon keeps its previous family and subnets until it answers again
                    let previous = self.families.get(pos).copied().flatten();
                    warn!(addr = %self.name, service, %err, ?previous, "no usable configuration");
                    families.push(previous);
                    first_err.get_or_insert(err);
                }
            }
        }
        if configs.is_empty() {
            return Err(first_err.unwrap_or(ClientError::NoDhcpConfig));
        }
        self.families = families;
        Ok(configs)
    }

    /// Fetch statistics from every daemon whose configuration is loaded.
    pub async fn statistics(&self) -> ClientResult<Vec<FamilyStatistics>> {
        if self.families.iter().all(Option::is_none) {
            return Err(ClientError::NotLoaded);
        }
        let command = Command::new(STATISTIC_GET_ALL)
            .service(self.services().map(<[String]>::to_vec))
            .arguments(json!({}));
        let responses = self.transport.send(&command).await?;

        let mut out = Vec::with_capacity(responses.len());
        let mut first_err = None;
        for (family, response) in self.families.iter().zip(responses) {
            let Some(family) = *family else {
                continue;
            };
            match statistics(response) {
                Ok(statistics) => out.push(FamilyStatistics { family, statistics }),
                Err(err) => {
                    warn!(addr = %self.name, %family, %err, "statistics unavailable");
                    first_err.get_or_insert(err);
                }
            }
        }
        match first_err {
            Some(err) if out.is_empty() => Err(err),
            _ => Ok(out),
        }
    }
}

fn statistics(response: Response) -> ClientResult<Statistics> {
    Ok(Statistics::from_arguments(
        &response.into_arguments(STATISTIC_GET_ALL)?,
    ))
}

/// dhcp services listed by a control agent, or `Direct` if the reply is a
/// daemon configuration
fn discover_services(arguments: &Value) -> ClientResult<Services> {
    if let Some(agent) = arguments.get("Control-agent") {
        let mut services = agent
            .get("control-sockets")
            .and_then(Value::as_object)
            .map(|sockets| {
                sockets
                    .keys()
                    .filter(|name| name.contains("dhcp") && name.parse::<Family>().is_ok())
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        if services.is_empty() {
            return Err(ClientError::NoDhcpConfig);
        }
        services.sort();
        return Ok(Services::Agent(services));
    }
    if Family::ALL
        .iter()
        .any(|family| arguments.get(family.config_key()).is_some())
    {
        return Ok(Services::Direct);
    }
    Err(ClientError::NoDhcpConfig)
}
