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

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt as _;

use crate::naming::resolve_path;

#[derive(Error, Debug)]
pub enum SaveError {
    #[error("create of {filename} in {directory} failed: {source}")]
    Create {
        directory: String,
        filename: String,
        #[source]
        source: std::io::Error,
    },
    #[error("write on {path} failed: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Removes a reserved file unless the write into it completed.
struct ReservedFileGuard<'a> {
    path: &'a Path,
    delete_on_drop: bool,
}

impl Drop for ReservedFileGuard<'_> {
    fn drop(&mut self) {
        if self.delete_on_drop {
            let _ = std::fs::remove_file(self.path);
        }
    }
}

#[async_trait]
pub trait ImageWriter: Send + Sync {
    /// Writes `data` under `filename`, or under a suffixed variant if the
    /// name is taken, and returns the path actually used.
    async fn save(&self, filename: &str, data: &[u8]) -> Result<PathBuf, SaveError>;
}

#[derive(Clone, Debug)]
pub struct ImageFileWriter {
    output_directory: PathBuf,
}

impl ImageFileWriter {
    pub fn new(output_directory: PathBuf) -> Self {
        Self { output_directory }
    }
}

#[async_trait]
impl ImageWriter for ImageFileWriter {
    async fn save(&self, filename: &str, data: &[u8]) -> Result<PathBuf, SaveError> {
        let (path, mut file) = resolve_path(&self.output_directory, filename)
            .await
            .map_err(|source| SaveError::Create {
                directory: self.output_directory.display().to_string(),
                filename: filename.to_string(),
                source,
            })?;

        let mut guard = ReservedFileGuard {
            path: path.as_path(),
            delete_on_drop: true,
        };

        let written = async {
            file.write_all(data).await?;
            file.flush().await?;
            file.sync_all().await
        }
        .await;

        match written {
            Ok(()) => {
                guard.delete_on_drop = false;
                drop(guard);
                Ok(path)
            }
            Err(source) => {
                drop(file);
                Err(SaveError::Write {
                    path: path.display().to_string(),
                    source,
                })
            }
        }
    }
}

#[cfg(test)]
pub fn create_test_writer(args: &crate::args::Args) -> ImageFileWriter {
    ImageFileWriter::new(args.output_directory.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::create_test_args;
    use tempfile::TempDir;
    use tokio::fs;

    #[tokio::test]
    async fn save_image_to_file_success() {
        let temp_dir = TempDir::new().unwrap();
        let args = create_test_args(temp_dir.path().to_path_buf());
        let writer = create_test_writer(&args);

        let path = writer.save("photo.png", b"test content").await.unwrap();

        assert_eq!(path, temp_dir.path().join("photo.png"));
        assert_eq!(fs::read(&path).await.unwrap(), b"test content");
    }

    #[tokio::test]
    async fn save_image_never_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let writer = ImageFileWriter::new(temp_dir.path().to_path_buf());
        fs::write(temp_dir.path().join("photo.png"), b"existing")
            .await
            .unwrap();

        let path = writer.save("photo.png", b"new content").await.unwrap();

        assert_eq!(path, temp_dir.path().join("photo_1.png"));
        assert_eq!(fs::read(&path).await.unwrap(), b"new content");
        assert_eq!(
            fs::read(temp_dir.path().join("photo.png")).await.unwrap(),
            b"existing"
        );
    }

    #[tokio::test]
    async fn save_empty_image() {
        let temp_dir = TempDir::new().unwrap();
        let writer = ImageFileWriter::new(temp_dir.path().to_path_buf());

        let path = writer.save("empty.gif", b"").await.unwrap();

        assert!(fs::read(&path).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_image_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let writer = ImageFileWriter::new(temp_dir.path().join("gone"));

        let err = writer.save("photo.png", b"data").await.unwrap_err();

        assert!(matches!(err, SaveError::Create { .. }));
        assert!(err.to_string().contains("photo.png"));
    }
}
