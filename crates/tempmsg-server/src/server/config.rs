use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use core::time::Duration;
use std::net::SocketAddr;

/// Which key-value store records are written to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// A Redis server at `--redis-url`.
    Redis,
    /// An in-process map. Records are lost on restart.
    Memory,
}

/// Longest share TTL: Redis `PSETEX` takes a signed 64-bit millisecond count.
pub const MAX_SHARE_TTL_SECS: u64 = i64::MAX as u64 / 1000;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct CliArgs {
    /// Address to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "0.0.0.0:8080")]
    pub server_addr: String,

    /// Record store.
    #[arg(long, env = "BACKEND", value_enum, default_value_t = BackendKind::Redis)]
    pub backend: BackendKind,

    /// Redis connection URL, used with `--backend redis`.
    #[arg(long, env = "REDIS_URL", default_value = "redis://127.0.0.1:6379")]
    pub redis_url: String,

    /// Machine ID embedded in every key. Must be unique per running instance.
    /// Derived from the host's private IPv4 address when omitted.
    #[arg(long, env = "MACHINE_ID")]
    pub machine_id: Option<u16>,

    /// How long a shared record stays readable.
    #[arg(long, env = "SHARE_TTL_SECS", default_value_t = 60)]
    pub share_ttl_secs: u64,

    /// Upper bound on each storage call made while serving a request.
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value_t = 2000)]
    pub request_timeout_ms: u64,

    /// Grace period for draining in-flight requests on shutdown.
    #[arg(long, env = "SHUTDOWN_TIMEOUT_SECS", default_value_t = 5)]
    pub shutdown_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub server_addr: SocketAddr,
    pub backend: BackendKind,
    pub redis_url: String,
    pub machine_id: Option<u16>,
    pub share_ttl: Duration,
    pub request_timeout: Duration,
    pub shutdown_timeout: Duration,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let server_addr = args
            .server_addr
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid server address `{}`", args.server_addr))?;

        if args.share_ttl_secs == 0 {
            bail!("share TTL must be at least 1 second");
        }
        if args.share_ttl_secs > MAX_SHARE_TTL_SECS {
            bail!("share TTL must be at most {MAX_SHARE_TTL_SECS} seconds");
        }
        if args.request_timeout_ms == 0 {
            bail!("request timeout must be greater than 0");
        }
        if args.shutdown_timeout_secs == 0 {
            bail!("shutdown timeout must be greater than 0");
        }
        if args.backend == BackendKind::Redis && args.redis_url.is_empty() {
            bail!("redis URL is required with the redis backend");
        }

        Ok(Self {
            server_addr,
            backend: args.backend,
            redis_url: args.redis_url,
            machine_id: args.machine_id,
            share_ttl: Duration::from_secs(args.share_ttl_secs),
            request_timeout: Duration::from_millis(args.request_timeout_ms),
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> anyhow::Result<ServerConfig> {
        let mut argv = vec![
            "tempmsg-server",
            "--server-addr",
            "127.0.0.1:9000",
            "--backend",
            "memory",
        ];
        argv.extend_from_slice(extra);
        ServerConfig::try_from(CliArgs::try_parse_from(argv)?)
    }

    #[test]
    fn explicit_flags_are_applied() {
        let config = parse(&[
            "--machine-id",
            "7",
            "--share-ttl-secs",
            "120",
            "--request-timeout-ms",
            "250",
            "--shutdown-timeout-secs",
            "3",
        ])
        .unwrap();

        assert_eq!(config.server_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.backend, BackendKind::Memory);
        assert_eq!(config.machine_id, Some(7));
        assert_eq!(config.share_ttl, Duration::from_secs(120));
        assert_eq!(config.request_timeout, Duration::from_millis(250));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(3));
    }

    #[test]
    fn rejects_zero_ttl() {
        assert!(parse(&["--share-ttl-secs", "0"]).is_err());
    }

    #[test]
    fn rejects_ttl_past_redis_limit() {
        let too_long = (MAX_SHARE_TTL_SECS + 1).to_string();
        assert!(parse(&["--share-ttl-secs", too_long.as_str()]).is_err());
        let overflowing = u64::MAX.to_string();
        assert!(parse(&["--share-ttl-secs", overflowing.as_str()]).is_err());

        let longest = MAX_SHARE_TTL_SECS.to_string();
        let config = parse(&["--share-ttl-secs", longest.as_str()]).unwrap();
        assert_eq!(config.share_ttl, Duration::from_secs(MAX_SHARE_TTL_SECS));
    }

    #[test]
    fn rejects_zero_shutdown_timeout() {
        assert!(parse(&["--shutdown-timeout-secs", "0"]).is_err());
    }

    #[test]
    fn rejects_bad_address() {
        let args = CliArgs::try_parse_from(["tempmsg-server", "--server-addr", "nowhere"]).unwrap();
        assert!(ServerConfig::try_from(args).is_err());
    }

    #[test]
    fn rejects_machine_id_out_of_range() {
        assert!(parse(&["--machine-id", "65536"]).is_err());
    }
}
