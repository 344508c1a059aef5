//! File downloads and streamed uploads.
//!
//! Targets on the session's own endpoint go through the authenticated
//! client. Targets on any other origin (pre-signed storage URLs) go through
//! a plain client with default trust roots, no client identity and no
//! overall timeout.

use crate::client::{transport_error, ServiceClient};
use crate::error::{Error, Result};
use crate::response::ErrorPayload;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_LENGTH};
use reqwest::{Body, Client, StatusCode};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

/// How the destination of a download is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileName {
    /// Treat the destination as a directory and take the file name from the
    /// `Content-Disposition` header.
    Discover,
    /// Write to the destination path as given.
    Verbatim,
}

impl From<bool> for FileName {
    fn from(discover: bool) -> Self {
        if discover {
            Self::Discover
        } else {
            Self::Verbatim
        }
    }
}

/// Outcome of a completed download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downloaded {
    /// Where the file was written
    pub path: PathBuf,
    /// HTTP status of the download
    pub status: StatusCode,
    /// Bytes written
    pub bytes: u64,
}

/// Extract the `filename="..."` value of a `Content-Disposition` header.
///
/// Only the final path component is returned, so a hostile header cannot
/// point outside the destination directory.
#[must_use]
pub fn disposition_file_name(header: &str) -> Option<String> {
    const MARKER: &str = "filename=\"";

    let start = header.find(MARKER)? + MARKER.len();
    let rest = &header[start..];
    let end = rest.find('"')?;
    let name = Path::new(&rest[..end]).file_name()?.to_str()?;
    if name.is_empty() || name == ".." {
        return None;
    }
    Some(name.to_string())
}

impl ServiceClient {
    fn route(&self, target: &str) -> Result<(Url, &Client)> {
        match Url::parse(target) {
            Ok(url) if url.origin() == self.base_url().origin() => Ok((url, self.http())),
            Ok(url) => Ok((url, self.transfer_http())),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Ok((self.url_for(target)?, self.http()))
            }
            Err(err) => Err(Error::InvalidEndpoint(format!(
                "Invalid transfer target `{target}`: {err}"
            ))),
        }
    }

    /// Download `target` to disk.
    ///
    /// `target` is a path relative to the endpoint or an absolute URL. The body
    /// is buffered in full before the destination file is created, so a failed
    /// request never leaves a file behind.
    ///
    /// # Errors
    ///
    /// - [`Error::Transport`] if the request cannot be completed
    /// - [`Error::HttpFailure`] for any non-2xx status
    /// - [`Error::InvalidResponse`] when discovery is requested but the header
    ///   carries no usable file name
    /// - [`Error::Io`] naming the resolved path when the file cannot be written
    pub async fn get_file(
        &self,
        target: &str,
        destination: impl AsRef<Path>,
        file_name: FileName,
    ) -> Result<Downloaded> {
        let (url, http) = self.route(target)?;
        debug!(%url, "Downloading file");

        let response = http.get(url).send().await.map_err(transport_error)?;
        let status = response.status();
        let disposition = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response.bytes().await.map_err(transport_error)?;

        if !status.is_success() {
            return Err(ErrorPayload::classify(&body).into_error(status));
        }

        let destination = destination.as_ref();
        let path = match file_name {
            FileName::Verbatim => destination.to_path_buf(),
            FileName::Discover => {
                let name = disposition
                    .as_deref()
                    .and_then(disposition_file_name)
                    .ok_or_else(|| {
                        Error::InvalidResponse(
                            "Content-Disposition header carries no file name".to_string(),
                        )
                    })?;
                destination.join(name)
            }
        };

        let mut file = File::create(&path)
            .await
            .map_err(|err| Error::io(&path, &err))?;
        file.write_all(&body)
            .await
            .map_err(|err| Error::io(&path, &err))?;
        file.flush().await.map_err(|err| Error::io(&path, &err))?;

        info!(path = %path.display(), bytes = body.len(), "Download complete");
        Ok(Downloaded {
            path,
            status,
            bytes: body.len() as u64,
        })
    }

    /// Stream the file at `source` to `target` with a `PUT`.
    ///
    /// The file is opened before any request is made. There is no resume: a
    /// failed upload has to be repeated from the start, and cleaning up any
    /// remote placeholder is the caller's job.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] if the source cannot be opened
    /// - [`Error::Transport`] if the request cannot be completed
    /// - [`Error::HttpFailure`] for any non-2xx status
    pub async fn put_file(&self, source: impl AsRef<Path>, target: &str) -> Result<StatusCode> {
        let source = source.as_ref();
        let file = File::open(source)
            .await
            .map_err(|err| Error::io(source, &err))?;
        let length = file
            .metadata()
            .await
            .map_err(|err| Error::io(source, &err))?
            .len();

        let (url, http) = self.route(target)?;
        debug!(%url, source = %source.display(), bytes = length, "Uploading file");

        let response = http
            .put(url)
            .header(CONTENT_LENGTH, length)
            .body(Body::from(file))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.map_err(transport_error)?;
            return Err(ErrorPayload::classify(&body).into_error(status));
        }

        info!(source = %source.display(), bytes = length, "Upload complete");
        Ok(status)
    }
}
