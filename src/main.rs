use formbuilder::core::error::FormsError;
use formbuilder::core::output;
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "formbuilder=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    if let Err(err) = formbuilder::run() {
        eprintln!("Error: {err}");
        if let FormsError::InvalidFields(errors) = &err {
            eprintln!("{}", output::render_validation_errors(errors));
        }
        std::process::exit(1);
    }
}
