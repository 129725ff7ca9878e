use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use hoard::Error;
use hoard::proxy::{self, ProxyConfig};

#[derive(Parser)]
#[command(name = "hoard")]
#[command(about = "Caching DNS forwarder", long_about = None)]
struct Args {
    /// Local port to listen on
    #[arg(short, long, default_value = "5355")]
    port: u16,

    /// Bind address
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: IpAddr,

    /// Upstream DNS server (host:port), repeat to race several
    #[arg(short, long = "upstream", default_values = ["8.8.8.8:53", "1.1.1.1:53"])]
    upstreams: Vec<SocketAddr>,

    /// Upstream exchange timeout in milliseconds
    #[arg(long, default_value = "2000")]
    timeout_ms: u64,

    /// TTL in seconds for empty answers, and the longest any answer is cached
    #[arg(long, default_value = "3600")]
    default_ttl: u64,

    /// Seconds between expired-entry sweeps (0 disables)
    #[arg(long, default_value = "300")]
    sweep_secs: u64,

    /// Seconds between statistics reports (0 disables)
    #[arg(long, default_value = "60")]
    stats_secs: u64,

    /// Log every query (domain, outcome, timing)
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> ProxyConfig {
        let every = |secs: u64| (secs > 0).then(|| Duration::from_secs(secs));

        ProxyConfig {
            bind_addr: SocketAddr::new(self.bind, self.port),
            upstreams: self.upstreams,
            upstream_timeout: Duration::from_millis(self.timeout_ms),
            default_ttl: Duration::from_secs(self.default_ttl),
            sweep_interval: every(self.sweep_secs),
            stats_interval: every(self.stats_secs),
            verbose: self.verbose,
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<(), Error> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    rt.block_on(proxy::run(args.into_config()))
}
