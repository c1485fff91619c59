use super::{CacheStorage, Request, Response, WorkerError, WorkerHost};

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Not intercepted, the browser handles the request itself.
    Passthrough,
    Respond(Response),
}

pub fn is_cacheable(request: &Request, response: &Response) -> bool {
    let no_store = response
        .header("cache-control")
        .map_or(false, |value| value.to_ascii_lowercase().contains("no-store"));
    let is_http = request.url.starts_with("http://")
        || request.url.starts_with("https://");

    response.status == 200 && is_http && !no_store
}

/// Fetches from the network and stores cacheable responses under `cache`.
pub async fn fetch_and_cache<H: WorkerHost>(
    host: &H,
    caches: &CacheStorage,
    cache: &str,
    request: &Request,
) -> Result<Response, WorkerError> {
    let response = host.fetch(request).await?;

    if is_cacheable(request, &response) {
        caches.put(cache, &request.url, response.clone());
    }

    Ok(response)
}
