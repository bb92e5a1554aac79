//! `Date` response header support.
//!
//! Formatting an RFC 7231 date on every response is wasteful under load, so a
//! [`DateService`] keeps the formatted value in an [`ArcSwap`] and a background task
//! refreshes it periodically. [`DateMiddleware`] copies the current value into each
//! response once the rest of the chain has run.

use crate::middleware::{Middleware, Next};
use crate::{BoxError, RequestContext, WebResponse};
use arc_swap::ArcSwap;
use async_trait::async_trait;
use bytes::Bytes;
use http::HeaderValue;
use once_cell::sync::Lazy;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const UPDATE_INTERVAL: Duration = Duration::from_millis(800);

static DATE_SERVICE: Lazy<DateService> = Lazy::new(|| DateService::with_update_interval(UPDATE_INTERVAL));

/// Maintains the current HTTP date string and refreshes it in the background.
pub struct DateService {
    current: Arc<ArcSwap<Bytes>>,
    handle: tokio::task::JoinHandle<()>,
}

impl DateService {
    /// Returns the process wide instance, created on first use.
    ///
    /// The refresh task is spawned on the tokio runtime of the first caller.
    pub fn global() -> &'static DateService {
        &DATE_SERVICE
    }

    /// Creates a service refreshing its value every `update_interval`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_update_interval(update_interval: Duration) -> Self {
        let current = Arc::new(ArcSwap::from_pointee(now()));
        let current_arc = Arc::clone(&current);

        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(update_interval).await;
                current_arc.store(Arc::new(now()));
            }
        });

        DateService { current, handle }
    }

    /// The current date as a header value.
    pub fn header_value(&self) -> Option<HeaderValue> {
        let date = self.current.load().as_ref().clone();
        match HeaderValue::from_maybe_shared(date) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(cause = %e, "invalid http date value");
                None
            }
        }
    }
}

fn now() -> Bytes {
    let mut buf = faf_http_date::get_date_buff_no_key();
    faf_http_date::get_date_no_key(&mut buf);
    Bytes::from_owner(buf)
}

impl Drop for DateService {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl fmt::Debug for DateService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let current = self.current.load_full();
        f.debug_struct("DateService").field("current", &current).finish_non_exhaustive()
    }
}

/// Sets the `Date` header on every response passing through it.
#[derive(Debug, Default, Clone, Copy)]
pub struct DateMiddleware;

#[async_trait]
impl Middleware for DateMiddleware {
    async fn handle(&self, req: &mut RequestContext, resp: &mut WebResponse, next: Next<'_>) -> Result<(), BoxError> {
        next.run(req, resp).await?;

        if let Some(date) = DateService::global().header_value() {
            resp.headers_mut().insert(http::header::DATE, date);
        }
        Ok(())
    }
}
