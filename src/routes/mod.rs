pub mod admin;
pub mod cart;
pub mod checkout;
pub mod concierge;
pub mod public;

use rocket::tokio::task;

use crate::error::ApiError;

/// Run blocking work (bcrypt, Gemini over blocking reqwest) off the async workers.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("Background job failed: {}", e)))
}
