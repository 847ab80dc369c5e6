// Copyright (c) 2024-2025 Federico G. Schwindt <fgsch@lodoss.net>
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

use reqwest::{Client, StatusCode, header};
use std::error::Error as _;
use thiserror::Error;
use tokio_util::bytes::Bytes;

/// How a failed fetch is reported to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transport,
    Unknown,
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid URL {locator}: {reason}")]
    InvalidLocator { locator: String, reason: String },
    #[error("HTTP error {status_code} for {locator}")]
    Http {
        locator: String,
        status_code: StatusCode,
    },
    #[error("Network error for {locator}: {error}")]
    Network { locator: String, error: String },
    #[error("Unexpected error for {locator}: {error}")]
    Unknown { locator: String, error: String },
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::InvalidLocator { .. }
            | FetchError::Http { .. }
            | FetchError::Network { .. } => FailureKind::Transport,
            FetchError::Unknown { .. } => FailureKind::Unknown,
        }
    }
}

/// Bytes of an accepted image together with where they came from.
#[derive(Debug)]
pub struct FetchedContent {
    pub locator: String,
    pub content_type: String,
    pub data: Bytes,
}

#[derive(Debug)]
pub enum FetchResult {
    Image(FetchedContent),
    /// The server answered, but not with an image. Nothing is kept.
    NotImage { content_type: String },
}

/// Returns true when a Content-Type header value declares an image payload.
pub fn is_image_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
        .starts_with("image/")
}

fn validate_locator(locator: &str) -> Result<url::Url, FetchError> {
    let invalid = |reason: String| FetchError::InvalidLocator {
        locator: locator.to_string(),
        reason,
    };

    let trimmed = locator.trim();
    if trimmed.is_empty() {
        return Err(invalid("empty URL".to_string()));
    }
    let url = url::Url::parse(trimmed).map_err(|err| invalid(err.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(invalid(format!("unsupported scheme `{scheme}`"))),
    }
}

fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn classify(locator: &str, err: reqwest::Error) -> FetchError {
    if err.is_builder() || err.is_decode() {
        FetchError::Unknown {
            locator: locator.to_string(),
            error: describe(&err),
        }
    } else {
        FetchError::Network {
            locator: locator.to_string(),
            error: describe(&err),
        }
    }
}

/// Fetches a single locator once. The client's timeout bounds the whole
/// transfer; there is no retry.
pub async fn fetch_image(client: &Client, locator: &str) -> Result<FetchResult, FetchError> {
    let url = validate_locator(locator)?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|err| classify(locator, err))?;

    let status_code = response.status();
    if !status_code.is_success() {
        return Err(FetchError::Http {
            locator: locator.to_string(),
            status_code,
        });
    }

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|s| s.to_str().ok())
        .unwrap_or_default()
        .to_string();

    if !is_image_content_type(&content_type) {
        return Ok(FetchResult::NotImage { content_type });
    }

    let data = response
        .bytes()
        .await
        .map_err(|err| classify(locator, err))?;

    Ok(FetchResult::Image(FetchedContent {
        locator: locator.to_string(),
        content_type,
        data,
    }))
}

/// Accepts connections and never answers them.
#[cfg(test)]
pub async fn silent_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{addr}")
}
