//! Response compression driven by the request's `Accept-Encoding` header.
//!
//! Bodies are fully buffered, so the whole payload is compressed in one pass once the
//! rest of the chain has produced it. Supported codings, in order of preference:
//! `zstd`, `br`, `gzip` and `deflate`.

use crate::middleware::{Middleware, Next};
use crate::{BoxError, RequestContext, ResponseBody, WebResponse};
use async_trait::async_trait;
use bytes::Bytes;
use flate2::Compression;
use flate2::write::{GzEncoder, ZlibEncoder};
use http::{HeaderValue, StatusCode};
use std::io;
use std::io::Write;
use tracing::{trace, warn};

const DEFAULT_MIN_SIZE: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Zstd,
    Br,
    Gzip,
    Deflate,
}

impl Encoding {
    fn select(accept_encodings: &str) -> Option<Self> {
        if accept_encodings.contains("zstd") {
            Some(Self::Zstd)
        } else if accept_encodings.contains("br") {
            Some(Self::Br)
        } else if accept_encodings.contains("gzip") {
            Some(Self::Gzip)
        } else if accept_encodings.contains("deflate") {
            Some(Self::Deflate)
        } else {
            None
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Zstd => "zstd",
            Self::Br => "br",
            Self::Gzip => "gzip",
            Self::Deflate => "deflate",
        }
    }

    fn encode(self, data: &[u8]) -> io::Result<Vec<u8>> {
        match self {
            Self::Zstd => zstd::stream::encode_all(data, 6),
            Self::Br => {
                // 32 KiB buffer, quality 3, lgwin 22
                let mut encoder = brotli::CompressorWriter::new(Vec::new(), 32 * 1024, 3, 22);
                encoder.write_all(data)?;
                encoder.flush()?;
                Ok(encoder.into_inner())
            }
            Self::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
                encoder.write_all(data)?;
                encoder.finish()
            }
            Self::Deflate => {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
                encoder.write_all(data)?;
                encoder.finish()
            }
        }
    }
}

/// Compresses response bodies of at least `min_size` bytes.
///
/// Responses that already carry a `Content-Encoding`, `204` and `101` responses, and
/// requests without a supported `Accept-Encoding` are passed through untouched.
#[derive(Debug, Clone, Copy)]
pub struct EncodingMiddleware {
    min_size: usize,
}

impl EncodingMiddleware {
    pub fn new() -> Self {
        Self { min_size: DEFAULT_MIN_SIZE }
    }

    pub fn with_min_size(mut self, min_size: usize) -> Self {
        self.min_size = min_size;
        self
    }

    pub fn min_size(&self) -> usize {
        self.min_size
    }

    fn encode(&self, req: &RequestContext, resp: &mut WebResponse) {
        let status = resp.status();
        if status == StatusCode::NO_CONTENT || status == StatusCode::SWITCHING_PROTOCOLS {
            return;
        }

        // already encoded
        if resp.headers().contains_key(http::header::CONTENT_ENCODING) {
            return;
        }

        let Some(accept_encodings) = req.headers().get(http::header::ACCEPT_ENCODING) else {
            return;
        };
        let Ok(accept_encodings) = accept_encodings.to_str() else {
            return;
        };
        let Some(encoding) = Encoding::select(accept_encodings) else {
            return;
        };

        if resp.body().len() < self.min_size || resp.body().is_empty() {
            return;
        }

        let Some(raw) = resp.body_mut().take_bytes() else {
            return;
        };

        match encoding.encode(&raw) {
            Ok(encoded) => {
                trace!(encoding = encoding.name(), from = raw.len(), to = encoded.len(), "encoded response body");
                *resp.body_mut() = ResponseBody::from(Bytes::from(encoded));

                let headers = resp.headers_mut();
                headers.remove(http::header::CONTENT_LENGTH);
                headers.insert(http::header::CONTENT_ENCODING, HeaderValue::from_static(encoding.name()));
                headers.append(http::header::VARY, HeaderValue::from_static("accept-encoding"));
            }
            Err(e) => {
                warn!(encoding = encoding.name(), cause = %e, "encode response body error, send it raw");
                *resp.body_mut() = ResponseBody::from(raw);
            }
        }
    }
}

impl Default for EncodingMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Middleware for EncodingMiddleware {
    async fn handle(&self, req: &mut RequestContext, resp: &mut WebResponse, next: Next<'_>) -> Result<(), BoxError> {
        next.run(req, resp).await?;
        self.encode(req, resp);
        Ok(())
    }
}
