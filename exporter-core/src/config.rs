//! exporter configuration

pub mod cli {
    //! Parse from either cli or env var

    /// Default listen address for the metrics endpoint
    pub static DEFAULT_ADDRESS: &str = "0.0.0.0";
    /// Default listen port, registered for kea-exporter on the prometheus wiki
    pub const DEFAULT_PORT: u16 = 9547;
    /// Default seconds between two polls of a target
    pub const DEFAULT_INTERVAL: f64 = 7.5;
    /// Default request timeout in seconds
    pub const DEFAULT_TIMEOUT: f64 = 10.0;
    /// tokio worker thread name
    pub static DEFAULT_THREAD_NAME: &str = "kea-exporter-worker";
    /// default log level. Can use this argument or EXPORTER_LOG env var
    pub const DEFAULT_EXPORTER_LOG: &str = "info";

    use std::{
        net::{IpAddr, SocketAddr},
        path::PathBuf,
        time::Duration,
    };

    use anyhow::{Context, Result, bail, ensure};
    pub use clap::Parser;
    use kea_client::{ClientOptions, TlsOptions};
    use kea_stats::{Catalog, CatalogError, Family};

    #[derive(Parser, Debug, Clone, PartialEq)]
    #[clap(author, name = "kea-exporter", bin_name = "kea-exporter", about, long_about = None)]
    /// parses from cli & environment var. kea-exporter will load `.env` in the same dir as the binary as well
    pub struct Config {
        /// kea control sockets or control agent URLs (http:// or https://)
        #[clap(env = "TARGETS", value_delimiter = ',', required = true)]
        pub targets: Vec<String>,
        /// address the metrics endpoint listens on
        #[clap(short, long, env, value_parser, default_value = DEFAULT_ADDRESS)]
        pub address: IpAddr,
        /// port the metrics endpoint listens on
        #[clap(short, long, env, value_parser, default_value_t = DEFAULT_PORT)]
        pub port: u16,
        /// seconds between two polls of the same target
        #[clap(short, long, env, value_parser, default_value_t = DEFAULT_INTERVAL)]
        pub interval: f64,
        /// request timeout in seconds
        #[clap(long, env, value_parser, default_value_t = DEFAULT_TIMEOUT)]
        pub timeout: f64,
        /// client certificate for mutual TLS with the control agent
        #[clap(long, env, value_parser)]
        pub client_cert: Option<PathBuf>,
        /// private key of the client certificate
        #[clap(long, env, value_parser)]
        pub client_key: Option<PathBuf>,
        /// extra CA certificate to trust when talking HTTPS
        #[clap(long, env, value_parser)]
        pub ca_cert: Option<PathBuf>,
        /// replace the builtin DHCPv4 metric catalog
        #[clap(long, env, value_parser)]
        pub dhcp4_catalog: Option<PathBuf>,
        /// replace the builtin DHCPv6 metric catalog
        #[clap(long, env, value_parser)]
        pub dhcp6_catalog: Option<PathBuf>,
        /// set the log level. All valid RUST_LOG arguments are accepted
        #[clap(long, env, value_parser, default_value = DEFAULT_EXPORTER_LOG)]
        pub exporter_log: String,
        /// number of tokio worker threads, defaults to the number of CPUs
        #[clap(long, env, value_parser)]
        pub threads: Option<usize>,
        /// Worker thread name
        #[clap(long, env, value_parser, default_value = DEFAULT_THREAD_NAME)]
        pub thread_name: String,
    }

    impl Config {
        /// check the values clap cannot check on its own
        pub fn validate(&self) -> Result<()> {
            seconds("interval", self.interval)?;
            seconds("timeout", self.timeout)?;
            match (&self.client_cert, &self.client_key) {
                (Some(_), None) => bail!("--client-cert given without --client-key"),
                (None, Some(_)) => bail!("--client-key given without --client-cert"),
                _ => {}
            }
            ensure!(self.targets().next().is_some(), "no targets given");
            Ok(())
        }

        /// targets with blanks removed
        pub fn targets(&self) -> impl Iterator<Item = &str> {
            self.targets
                .iter()
                .map(|t| t.trim())
                .filter(|t| !t.is_empty())
        }

        /// poll interval as `Duration`, the default if it does not pass `validate`
        pub fn interval(&self) -> Duration {
            seconds("interval", self.interval)
                .unwrap_or(Duration::from_millis((DEFAULT_INTERVAL * 1000.0) as u64))
        }

        /// request timeout as `Duration`, the default if it does not pass `validate`
        pub fn timeout(&self) -> Duration {
            seconds("timeout", self.timeout)
                .unwrap_or(Duration::from_millis((DEFAULT_TIMEOUT * 1000.0) as u64))
        }

        /// where the metrics endpoint binds
        pub fn listen_addr(&self) -> SocketAddr {
            SocketAddr::new(self.address, self.port)
        }

        /// transport settings for every target
        pub fn client_options(&self) -> ClientOptions {
            ClientOptions {
                timeout: self.timeout(),
                tls: TlsOptions {
                    client_cert: self.client_cert.clone(),
                    client_key: self.client_key.clone(),
                    ca_cert: self.ca_cert.clone(),
                },
            }
        }

        /// the metric catalog for `family`, from disk if overridden
        pub fn catalog(&self, family: Family) -> Result<Catalog, CatalogError> {
            let path = match family {
                Family::Dhcp4 => &self.dhcp4_catalog,
                Family::Dhcp6 => &self.dhcp6_catalog,
            };
            match path {
                Some(path) => Catalog::from_path(family, path),
                None => Catalog::builtin(family),
            }
        }
    }

    /// a non-zero `Duration` from a number of seconds
    fn seconds(name: &str, secs: f64) -> Result<Duration> {
        let duration = Duration::try_from_secs_f64(secs)
            .with_context(|| format!("{name} must be a positive number of seconds, got {secs}"))?;
        ensure!(
            !duration.is_zero(),
            "{name} must be a positive number of seconds, got {secs} (zero after rounding)"
        );
        Ok(duration)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn parse(args: &[&str]) -> Config {
            Config::try_parse_from(std::iter::once("kea-exporter").chain(args.iter().copied()))
                .unwrap()
        }

        #[test]
        fn test_defaults() {
            let cfg = parse(&["/run/kea/kea4-ctrl-socket"]);
            cfg.validate().unwrap();
            assert_eq!(cfg.listen_addr(), "0.0.0.0:9547".parse().unwrap());
            assert_eq!(cfg.interval(), Duration::from_millis(7500));
            assert_eq!(cfg.timeout(), Duration::from_secs(10));
            assert_eq!(cfg.exporter_log, "info");
            assert_eq!(cfg.client_options().tls, TlsOptions::default());
        }

        #[test]
        fn test_targets() {
            let cfg = parse(&[
                "http://127.0.0.1:8000/",
                "/run/kea/kea6-ctrl-socket",
                "--port",
                "9100",
                "-i",
                "2",
            ]);
            assert_eq!(
                cfg.targets().collect::<Vec<_>>(),
                ["http://127.0.0.1:8000/", "/run/kea/kea6-ctrl-socket"]
            );
            assert_eq!(cfg.port, 9100);
            assert_eq!(cfg.interval(), Duration::from_secs(2));
        }

        #[test]
        fn test_validation() {
            let mut cfg = parse(&["/run/kea/kea4-ctrl-socket"]);
            cfg.interval = 0.0;
            assert!(cfg.validate().is_err());

            let mut cfg = parse(&["/run/kea/kea4-ctrl-socket"]);
            cfg.timeout = -1.0;
            assert!(cfg.validate().is_err());
            cfg.timeout = 1.0;
            cfg.validate().unwrap();

            for secs in [1e-12, 1e20, f64::NAN, f64::INFINITY] {
                let mut cfg = parse(&["/run/kea/kea4-ctrl-socket"]);
                cfg.interval = secs;
                assert!(cfg.validate().is_err(), "interval {secs} accepted");
                assert_eq!(cfg.interval(), Duration::from_millis(7500));
                cfg.interval = 1.0;
                cfg.timeout = secs;
                assert!(cfg.validate().is_err(), "timeout {secs} accepted");
                assert_eq!(cfg.timeout(), Duration::from_secs(10));
            }

            let cfg = parse(&["/run/kea/kea4-ctrl-socket", "--interval", "1e-12"]);
            assert!(cfg.validate().unwrap_err().to_string().contains("zero"));

            let cfg = parse(&["https://kea:8000", "--client-cert", "/etc/kea/client.pem"]);
            assert!(cfg.validate().unwrap_err().to_string().contains("client-key"));

            let mut cfg = parse(&["/run/kea/kea4-ctrl-socket"]);
            cfg.targets = vec![" ".into()];
            assert!(cfg.validate().is_err());
        }

        #[test]
        fn test_catalog_override() {
            let cfg = parse(&["/run/kea/kea4-ctrl-socket", "--dhcp6-catalog", "/nonexistent.yaml"]);
            assert!(cfg.catalog(Family::Dhcp4).is_ok());
            assert!(matches!(
                cfg.catalog(Family::Dhcp6),
                Err(CatalogError::Io { .. })
            ));
        }
    }
}

pub mod trace {
    //! tracing configuration
    use anyhow::Result;
    use tracing_subscriber::{
        filter::EnvFilter,
        fmt::{
            self,
            format::{Format, PrettyFields},
        },
        prelude::__tracing_subscriber_SubscriberExt,
        util::SubscriberInitExt,
    };

    use std::{fmt as stdfmt, str};

    use crate::env::parse_var_with_err;

    /// log as "json" or "standard" (unstructured)
    static DEFAULT_LOG_FORMAT: &str = "standard";

    /// output format, from the `LOG_FORMAT` env var
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub enum LogFormat {
        /// one line per event
        Standard,
        /// one JSON object per event
        Json,
        /// multi-line, for humans
        Pretty,
    }

    /// `LOG_FORMAT` value we don't know
    #[derive(thiserror::Error, Debug)]
    #[error("unknown log format {0:?}, expected standard, json or pretty")]
    pub struct UnknownLogFormat(String);

    impl str::FromStr for LogFormat {
        type Err = UnknownLogFormat;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            match s {
                "standard" => Ok(LogFormat::Standard),
                "json" => Ok(LogFormat::Json),
                "pretty" => Ok(LogFormat::Pretty),
                other => Err(UnknownLogFormat(other.to_owned())),
            }
        }
    }

    impl stdfmt::Display for LogFormat {
        fn fmt(&self, f: &mut stdfmt::Formatter<'_>) -> stdfmt::Result {
            f.write_str(match self {
                LogFormat::Standard => "standard",
                LogFormat::Json => "json",
                LogFormat::Pretty => "pretty",
            })
        }
    }

    /// Configuration for `tracing`
    #[derive(Debug)]
    pub struct Config {
        /// formatting to apply to logs
        pub log_frmt: LogFormat,
    }

    impl Config {
        /// Install the global subscriber
        pub fn parse(exporter_log: &str) -> Result<Self> {
            let log_frmt: LogFormat = parse_var_with_err("LOG_FORMAT", DEFAULT_LOG_FORMAT)?;

            // Log level comes from EXPORTER_LOG
            let filter = EnvFilter::try_new(exporter_log)
                .or_else(|_| EnvFilter::try_new("info"))?
                .add_directive("hyper=off".parse()?)
                .add_directive("reqwest=warn".parse()?);

            match log_frmt {
                LogFormat::Json => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().json())
                        .init();
                }
                LogFormat::Pretty => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(
                            fmt::layer()
                                .event_format(
                                    Format::default().pretty().with_source_location(false),
                                )
                                .fmt_fields(PrettyFields::new()),
                        )
                        .init();
                }
                LogFormat::Standard => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer())
                        .init();
                }
            }

            Ok(Self { log_frmt })
        }
    }

}
