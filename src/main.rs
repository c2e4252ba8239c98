use mimalloc::MiMalloc;
use mysql_entrypoint::{Config, Entrypoint, credentials::EnvSnapshot};
use std::process::ExitCode;
use tracing::{Instrument, debug, error, info_span};
use tracing_subscriber::{
    EnvFilter, fmt::time::ChronoLocal, layer::SubscriberExt, util::SubscriberInitExt,
};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cfg = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("[Entrypoint]: invalid entrypoint configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_timer(ChronoLocal::new(TIMESTAMP_FORMAT.to_string()))
                .with_ansi(false)
                .with_level(true)
                .with_target(false),
        )
        .init();

    let span = info_span!("Entrypoint");
    debug!(parent: &span, config = ?cfg);

    let env = EnvSnapshot::capture();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = Entrypoint::new(&cfg, &env)
        .run(args)
        .instrument(span.clone())
        .await;

    let err = match result {
        Ok(outcome) => outcome.handoff.perform(&outcome.env),
        Err(e) => e,
    };
    error!(parent: &span, kind = err.kind(), "{err}");
    ExitCode::FAILURE
}
