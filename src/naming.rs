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

//! Local filenames for fetched images.
//!
//! Names come from the locator alone; the Content-Type of the response
//! never influences the extension.

use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::fs;

/// Used when the URL path has no usable last segment.
pub const DEFAULT_FILENAME: &str = "downloaded_image.jpg";

/// Derives the candidate filename for a locator: the last segment of the
/// URL path, provided it carries an extension.
pub fn derive_name(locator: &str) -> String {
    url::Url::parse(locator.trim())
        .ok()
        .and_then(|url| last_segment(url.path()))
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string())
}

// Length is not capped: a segment longer than the filesystem allows makes
// the later create fail, which is reported as a save error.
fn last_segment(path: &str) -> Option<String> {
    let segment = path.rsplit('/').next()?;
    if segment.trim_start_matches('.').is_empty() || !segment.contains('.') {
        return None;
    }
    Some(segment.to_string())
}

/// Splits a filename into base and extension. The extension keeps its
/// dot; dots leading the name do not start one.
pub fn split_extension(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(idx) if !filename[..idx].chars().all(|c| c == '.') => filename.split_at(idx),
        _ => (filename, ""),
    }
}

/// Claims a free path for `filename` inside `dir`.
///
/// The exact name is tried first, then `base_1.ext`, `base_2.ext`, and so
/// on. Each probe is an exclusive create, so an existing file is never
/// reused or truncated. The returned file is empty and open for writing.
pub async fn resolve_path(dir: &Path, filename: &str) -> io::Result<(PathBuf, fs::File)> {
    let (base, ext) = split_extension(filename);
    let mut path = dir.join(filename);
    let mut counter: u64 = 0;

    loop {
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => return Ok((path, file)),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                counter += 1;
                path = dir.join(format!("{base}_{counter}{ext}"));
            }
            Err(err) => return Err(err),
        }
    }
}
