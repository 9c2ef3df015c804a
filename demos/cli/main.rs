use std::time::Duration;

use ping_probe::{CancellationToken, GenericError, PingConfig, Pinger};

#[derive(argh::FromArgs)]
/// ping - send ICMP ECHO_REQUEST to network hosts
struct Args {
    #[argh(option, short = 'c', default = "0")]
    /// stop after <count> sent ping messages, 0 pings until interrupted
    count: u64,

    #[argh(option, short = 's', default = "56")]
    /// number of payload bytes per echo request
    size: usize,

    #[argh(option, short = 't', default = "5")]
    /// seconds to wait for each reply
    timeout: u64,

    #[argh(option, short = 'v', default = "tracing::Level::WARN")]
    /// log level (trace, debug, info, warn, error)
    log_level: tracing::Level,

    #[argh(positional)]
    /// host names or IP addresses
    hosts: Vec<String>,
}

fn main() -> Result<(), GenericError> {
    let args: Args = argh::from_env();

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if args.hosts.is_empty() {
        return Err("no hosts given".into());
    }

    let config = PingConfig::new(
        args.size,
        args.count,
        Duration::from_secs(args.timeout),
        PingConfig::DEFAULT_INTERVAL,
    )?;

    let token = CancellationToken::new();
    let ctrlc_token = token.clone();
    ctrlc::set_handler(move || ctrlc_token.cancel())?;

    let failures = std::thread::scope(|scope| {
        let sessions: Vec<_> = args
            .hosts
            .iter()
            .map(|host| {
                let pinger = Pinger::new(config.clone());
                let token = &token;
                scope.spawn(move || pinger.ping(host, token, &mut std::io::stdout()))
            })
            .collect();

        sessions
            .into_iter()
            .zip(&args.hosts)
            .filter_map(|(session, host)| match session.join() {
                Ok(Ok(_)) => None,
                Ok(Err(e)) => Some(format!("ping: {e}")),
                Err(_) => Some(format!("ping: session to {host} panicked")),
            })
            .inspect(|message| eprintln!("{message}"))
            .count()
    });

    if failures > 0 {
        std::process::exit(2);
    }
    Ok(())
}
