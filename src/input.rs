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

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt as _, AsyncWrite, AsyncWriteExt as _};

const PROMPT: &str = "Please enter image URL(s), separated by spaces: ";

#[derive(Error, Debug)]
pub enum InputError {
    #[error("No URLs provided")]
    NoLocators,
    #[error("Failed to read URLs from standard input: {0}")]
    Read(#[from] std::io::Error),
}

/// Splits whitespace-separated locators, keeping their input order.
pub fn parse_locators<S: AsRef<str>>(tokens: &[S]) -> Result<Vec<String>, InputError> {
    let locators: Vec<String> = tokens
        .iter()
        .flat_map(|token| token.as_ref().split_whitespace())
        .map(String::from)
        .collect();
    if locators.is_empty() {
        return Err(InputError::NoLocators);
    }
    Ok(locators)
}

/// Prompts once and reads a single line of locators.
pub async fn prompt_locators<R, W>(reader: &mut R, prompt: &mut W) -> Result<Vec<String>, InputError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    prompt.write_all(PROMPT.as_bytes()).await?;
    prompt.flush().await?;

    let mut line = String::new();
    reader.read_line(&mut line).await?;
    parse_locators(&[line])
}

/// Locators from the command line, or from one line of `reader` when none
/// were given.
pub async fn collect_locators<R, W>(
    urls: &[String],
    reader: &mut R,
    prompt: &mut W,
) -> Result<Vec<String>, InputError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    if !urls.is_empty() {
        return parse_locators(urls);
    }
    prompt_locators(reader, prompt).await
}
