use tracing_subscriber::EnvFilter;

/// Default directives keep dependency chatter out of the logs.
const DEFAULT_DIRECTIVES: &str = "info,hyper=warn,mio=warn,notify=warn,lapin=warn,sqlx=warn";

pub fn init_tracer() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
