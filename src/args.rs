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

use clap::{
    Parser,
    error::{Error, ErrorKind},
};
use reqwest::Client;
use std::{path::PathBuf, time::Duration};
use thiserror::Error;

pub const DEFAULT_OUTPUT_DIRECTORY: &str = "Fetched_Images";

#[derive(Error, Debug)]
pub enum ArgsError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[from] reqwest::Error),
    #[error("Failed to create output directory {path}: {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Parser, Debug, Clone)]
#[command(
    version,
    about,
    long_about = "Download images from the web, skipping non-images and duplicate content"
)]
pub struct Args {
    /// Image URLs to fetch (prompted for on stdin when omitted)
    #[arg(value_name = "URL")]
    pub urls: Vec<String>,

    /// Maximum number of fetches in flight; images are still saved in input order
    #[arg(long, default_value_t = 1, value_parser = parse_greater_than_zero)]
    pub max_concurrent_requests: usize,

    /// Directory for storing fetched images
    #[arg(long, short, default_value = DEFAULT_OUTPUT_DIRECTORY)]
    pub output_directory: PathBuf,

    /// Disable progress bar output
    #[arg(long, short, default_value_t = false)]
    pub quiet: bool,

    /// Request timeout in seconds, covering the whole transfer
    #[arg(long, default_value = "10", value_parser = parse_duration_seconds)]
    pub request_timeout: Duration,

    /// User-Agent string for HTTP requests
    #[arg(long, short, default_value_t = concat!("image-fetcher/",
        env!("CARGO_PKG_VERSION_MAJOR"),
        ".",
        env!("CARGO_PKG_VERSION_MINOR")).to_string())]
    pub user_agent: String,
}

fn parse_greater_than_zero(s: &str) -> Result<usize, Error> {
    let v = s.parse().map_err(|_| {
        Error::raw(
            ErrorKind::InvalidValue,
            format!("`{s}` isn't a valid integer"),
        )
    })?;
    if v == 0 {
        Err(Error::raw(
            ErrorKind::InvalidValue,
            "Value must be greater than 0",
        ))
    } else {
        Ok(v)
    }
}

fn parse_duration_seconds(s: &str) -> Result<Duration, Error> {
    let seconds = parse_greater_than_zero(s)?;
    Ok(Duration::from_secs(seconds as u64))
}

pub fn build_client(args: &Args) -> Result<Client, ArgsError> {
    Ok(Client::builder()
        .timeout(args.request_timeout)
        .user_agent(&args.user_agent)
        .build()?)
}

pub fn parse_args() -> Result<(Args, Client), ArgsError> {
    let args = Args::parse();
    let client = build_client(&args)?;
    Ok((args, client))
}

/// Creates the output directory if it does not exist yet.
pub fn create_output_directory(args: &Args) -> Result<(), ArgsError> {
    std::fs::create_dir_all(&args.output_directory).map_err(|source| {
        ArgsError::CreateDirectory {
            path: args.output_directory.display().to_string(),
            source,
        }
    })
}

#[cfg(test)]
pub fn create_test_args(output_dir: PathBuf) -> Args {
    Args {
        urls: Vec::new(),
        max_concurrent_requests: 1,
        output_directory: output_dir,
        quiet: true,
        request_timeout: Duration::from_secs(30),
        user_agent: "test-agent/1.0".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use std::time::Duration;

    #[test]
    fn parse_greater_than_zero_valid() {
        assert_eq!(parse_greater_than_zero("1").unwrap(), 1);
        assert_eq!(parse_greater_than_zero("16").unwrap(), 16);
    }

    #[test]
    fn parse_greater_than_zero_invalid_zero() {
        let error = parse_greater_than_zero("0").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidValue);
        assert!(error.to_string().contains("Value must be greater than 0"));
    }

    #[test]
    fn parse_greater_than_zero_invalid_non_numeric() {
        let error = parse_greater_than_zero("abc").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidValue);
        assert!(error.to_string().contains("`abc` isn't a valid integer"));
    }

    #[test]
    fn parse_greater_than_zero_invalid_negative() {
        let error = parse_greater_than_zero("-1").unwrap_err();
        assert!(error.to_string().contains("`-1` isn't a valid integer"));
    }

    #[test]
    fn parse_duration_seconds_valid() {
        assert_eq!(
            parse_duration_seconds("10").unwrap(),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn parse_duration_seconds_invalid_zero() {
        let error = parse_duration_seconds("0").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidValue);
    }

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["image-fetcher"]).unwrap();
        assert!(args.urls.is_empty());
        assert_eq!(args.output_directory, PathBuf::from("Fetched_Images"));
        assert_eq!(args.request_timeout, Duration::from_secs(10));
        assert_eq!(args.max_concurrent_requests, 1);
        assert!(!args.quiet);
        assert!(args.user_agent.starts_with("image-fetcher/"));
    }

    #[test]
    fn positional_urls() {
        let args = Args::try_parse_from([
            "image-fetcher",
            "https://example.com/a.png",
            "https://example.com/b.jpg",
            "--output-directory",
            "out",
        ])
        .unwrap();
        assert_eq!(
            args.urls,
            vec!["https://example.com/a.png", "https://example.com/b.jpg"]
        );
        assert_eq!(args.output_directory, PathBuf::from("out"));
    }

    #[test]
    fn create_output_directory_is_idempotent() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let args = create_test_args(temp_dir.path().join("Fetched_Images"));

        create_output_directory(&args).unwrap();
        create_output_directory(&args).unwrap();

        assert!(args.output_directory.is_dir());
    }

    #[test]
    fn create_output_directory_over_file_fails() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let blocker = temp_dir.path().join("Fetched_Images");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let args = create_test_args(blocker);

        let err = create_output_directory(&args).unwrap_err();

        assert!(matches!(err, ArgsError::CreateDirectory { .. }));
    }

    #[test]
    fn build_client_from_test_args() {
        let args = create_test_args(PathBuf::from("."));
        assert!(build_client(&args).is_ok());
    }
}
