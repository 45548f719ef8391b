use reqwest_middleware::ClientWithMiddleware;
use reqwest_tracing::TracingMiddleware;

/// HTTP client with request tracing attached.
pub fn new_tracing_client() -> anyhow::Result<ClientWithMiddleware> {
    let client = reqwest::Client::builder().build()?;

    Ok(reqwest_middleware::ClientBuilder::new(client)
        .with(TracingMiddleware::default())
        .build())
}
