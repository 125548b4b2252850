use {
    anyhow::{Context, Result},
    log::{info, warn},
    tokio::{signal, sync::watch, task},
};

pub mod config;
pub mod parser;
pub mod reading;
pub mod run;
pub mod session;
pub mod sink;

pub use {
    config::Config,
    reading::{CorrectedReading, RawReading},
    session::Session,
    sink::{InfluxSink, Sink},
};

pub async fn client() -> Result<()> {
    pretty_env_logger::init();
    color_backtrace::install();

    let config = Config::from_env()?;

    let mut session = Session::open(&config)?;
    let mut sink = InfluxSink::new(&config);
    if let Err(e) = sink.connect().await {
        if let Err(close) = session.close() {
            warn!("Failed to stop sensor: {}", close);
        }
        return Err(e);
    }

    let (stop_tx, stop_rx) = watch::channel(false);
    task::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Interrupted, stopping after the current line");
            let _ = stop_tx.send(true);
        }
    });

    info!("Initialization complete");
    let result = run::run(&mut session, &mut sink, stop_rx).await;

    info!("Closing {}", config.device);
    let closed = session
        .close()
        .with_context(|| format!("Failed to close {}", config.device));

    match (result, closed) {
        (Err(e), Err(close)) => {
            warn!("{:#}", close);
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
        (Ok(()), closed) => closed,
    }
}
