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

mod args;
mod batch;
mod fetch;
mod fingerprint;
mod input;
mod naming;
mod writer;

use indicatif::ProgressStyle;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use tracing::Level;
use tracing_indicatif::{IndicatifLayer, span_ext::IndicatifSpanExt as _};
use tracing_subscriber::{
    fmt::writer::MakeWriterExt as _, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

use args::{Args, create_output_directory, parse_args};
use batch::run_batch;
use input::{InputError, collect_locators};
use writer::ImageFileWriter;

/// Gathers the batch and creates the output directory for it. Returns `None`
/// when there is nothing to fetch, leaving the filesystem untouched.
async fn prepare_batch<R, W>(
    args: &Args,
    reader: &mut R,
    prompt: &mut W,
) -> Result<Option<(Vec<String>, ImageFileWriter)>, Box<dyn std::error::Error>>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let locators = match collect_locators(&args.urls, reader, prompt).await {
        Ok(locators) => locators,
        Err(err @ InputError::NoLocators) => {
            tracing::error!("{err}");
            return Ok(None);
        }
        Err(err) => return Err(err.into()),
    };

    create_output_directory(args)?;
    let writer = ImageFileWriter::new(args.output_directory.clone());
    Ok(Some((locators, writer)))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, client) = parse_args()?;

    let indicatif_layer = IndicatifLayer::new().with_progress_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{wide_bar}] {pos:>4}/{len:4} ({percent:>3}%) ETA: {eta}",
        )?
        .progress_chars("#>-"),
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(
                    indicatif_layer
                        .get_stderr_writer()
                        .with_max_level(Level::INFO),
                )
                .with_target(false),
        )
        .with(indicatif_layer)
        .init();

    tracing::info!("Welcome to the Ubuntu Image Fetcher");
    tracing::info!("A tool for mindfully collecting images from the web");

    let mut stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let Some((locators, writer)) = prepare_batch(&args, &mut stdin, &mut stdout).await? else {
        return Ok(());
    };

    let span = tracing::info_span!("batch");
    span.pb_set_length(locators.len() as u64);

    // Handle ctrl-c
    let token = CancellationToken::new();
    tokio::task::spawn({
        let token = token.clone();
        async move {
            _ = tokio::signal::ctrl_c().await;
            token.cancel();
        }
    });

    if !args.quiet {
        span.pb_start();
    }

    let summary = run_batch(
        &client,
        &writer,
        locators,
        args.max_concurrent_requests,
        &token,
        &span,
    )
    .await;
    drop(span);

    summary.log();
    tracing::info!("Connection strengthened. Community enriched.");

    Ok(())
}
