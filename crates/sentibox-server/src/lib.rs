//! HTTP surface for the sentiment pipeline.
//!
//! `GET /` serves the chat page, `POST /predict` classifies one text and
//! `GET /health` reports whether a pipeline is loaded.

pub mod error;
pub mod routes;

pub use error::ApiError;
pub use routes::{AppState, INDEX_HTML, configure};

use actix_web::{App, HttpServer, middleware, web};
use tracing::info;

/// Server bind settings.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub host: String,
    pub port: u16,
    /// Worker threads; `None` lets actix pick one per core.
    pub workers: Option<usize>,
}

/// Bind and run until shutdown (Ctrl-C or SIGTERM).
pub async fn serve(state: AppState, opts: ServeOptions) -> anyhow::Result<()> {
    let loaded = state.is_loaded();
    let data = web::Data::new(state);

    let mut server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .wrap(middleware::Logger::default())
            .configure(configure)
    });
    if let Some(workers) = opts.workers {
        server = server.workers(workers);
    }
    let server = server.bind((opts.host.as_str(), opts.port))?;

    info!(
        host = %opts.host,
        port = opts.port,
        model_loaded = loaded,
        "listening"
    );
    server.run().await?;
    info!("server stopped");
    Ok(())
}
