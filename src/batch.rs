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

//! Runs one batch of locators: fetch, deduplicate, name, write.
//!
//! Fetches may run ahead of each other, but their results are consumed in
//! input order by a single loop that owns the fingerprint set and does every
//! write. The first occurrence of some content in input order is the one
//! that gets saved, whatever the concurrency.

use futures::StreamExt as _;
use reqwest::Client;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::Span;
use tracing_indicatif::span_ext::IndicatifSpanExt as _;

use crate::{
    fetch::{FailureKind, FetchResult, FetchedContent, fetch_image},
    fingerprint::{Fingerprint, FingerprintSet},
    naming::derive_name,
    writer::ImageWriter,
};

/// What happened to a single locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Saved { path: PathBuf },
    NotImage { content_type: String },
    Duplicate {
        filename: String,
        fingerprint: Fingerprint,
    },
    TransportError { message: String },
    UnknownError { message: String },
}

#[derive(Debug, Clone)]
pub struct ItemReport {
    pub locator: String,
    pub outcome: Outcome,
}

impl ItemReport {
    pub fn log(&self) {
        let locator = self.locator.as_str();
        match &self.outcome {
            Outcome::Saved { path } => {
                tracing::info!(locator, path = %path.display(), "Image saved");
            }
            Outcome::NotImage { content_type } => {
                tracing::warn!(locator, %content_type, "Skipped, not an image");
            }
            Outcome::Duplicate {
                filename,
                fingerprint,
            } => {
                tracing::warn!(locator, %filename, %fingerprint, "Duplicate found, not saved");
            }
            Outcome::TransportError { message } => {
                tracing::error!(locator, "Connection error: {message}");
            }
            Outcome::UnknownError { message } => {
                tracing::error!(locator, "An error occurred: {message}");
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    /// One entry per processed locator, in input order.
    pub reports: Vec<ItemReport>,
    /// Locators dropped because the batch was interrupted.
    pub not_processed: usize,
}

impl BatchSummary {
    fn count(&self, predicate: impl Fn(&Outcome) -> bool) -> usize {
        self.reports.iter().filter(|r| predicate(&r.outcome)).count()
    }

    pub fn saved(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Saved { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::NotImage { .. } | Outcome::Duplicate { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| {
            matches!(
                o,
                Outcome::TransportError { .. } | Outcome::UnknownError { .. }
            )
        })
    }

    pub fn log(&self) {
        if self.not_processed > 0 {
            tracing::warn!(
                "Interrupted, {} URL(s) were not processed",
                self.not_processed
            );
        }
        tracing::info!(
            saved = self.saved(),
            skipped = self.skipped(),
            failed = self.failed(),
            "Batch complete"
        );
    }
}

/// Checks a fetched image against the run's fingerprints and writes it if
/// the content is new. The fingerprint is recorded only after the write.
pub async fn save_content<W>(
    writer: &W,
    seen: &mut FingerprintSet,
    content: &FetchedContent,
) -> Outcome
where
    W: ImageWriter + ?Sized,
{
    let fingerprint = Fingerprint::of(&content.data);
    let filename = derive_name(&content.locator);
    tracing::debug!(
        locator = content.locator.as_str(),
        content_type = %content.content_type,
        bytes = content.data.len(),
        %fingerprint,
        "Fetched image"
    );

    if seen.is_duplicate(&fingerprint) {
        return Outcome::Duplicate {
            filename,
            fingerprint,
        };
    }

    match writer.save(&filename, &content.data).await {
        Ok(path) => {
            seen.record(fingerprint);
            Outcome::Saved { path }
        }
        Err(err) => Outcome::UnknownError {
            message: err.to_string(),
        },
    }
}

/// Processes every locator once, in order. Individual failures are
/// reported and never stop the batch; only `cancel` does.
pub async fn run_batch<W>(
    client: &Client,
    writer: &W,
    locators: Vec<String>,
    max_concurrent_requests: usize,
    cancel: &CancellationToken,
    progress: &Span,
) -> BatchSummary
where
    W: ImageWriter + ?Sized,
{
    let total = locators.len();
    let mut seen = FingerprintSet::new();
    let mut summary = BatchSummary::default();

    let results = futures::stream::iter(locators)
        .map(|locator| async move {
            let result = fetch_image(client, &locator).await;
            (locator, result)
        })
        .buffered(max_concurrent_requests.max(1))
        .take_until(cancel.cancelled());
    let mut results = std::pin::pin!(results);

    while let Some((locator, result)) = results.next().await {
        let outcome = match result {
            Ok(FetchResult::Image(content)) => save_content(writer, &mut seen, &content).await,
            Ok(FetchResult::NotImage { content_type }) => Outcome::NotImage { content_type },
            Err(err) => match err.kind() {
                FailureKind::Transport => Outcome::TransportError {
                    message: err.to_string(),
                },
                FailureKind::Unknown => Outcome::UnknownError {
                    message: err.to_string(),
                },
            },
        };

        let report = ItemReport { locator, outcome };
        report.log();
        progress.pb_inc(1);
        summary.reports.push(report);
    }

    summary.not_processed = total - summary.reports.len();
    summary
}
