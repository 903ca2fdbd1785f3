//! Downloads: a response body to a file, or to a decoded image.
//!
//! Both run their I/O on the transport's worker thread and deliver through
//! the dispatcher like any other call. Non-2xx responses are not treated as
//! errors; their body is saved or decoded as received and the status is in
//! the `ResponseHead`.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use tracing::debug;

use crate::callback::Handler;
use crate::dispatch::Dispatcher;
use crate::error::Error;
use crate::http::{HttpRequest, ResponseStream};

/// Size of the buffer used to stream a body to disk.
pub const DOWNLOAD_BUFFER_SIZE: usize = 2048;

impl Dispatcher {
    /// Stream the body of `request` into `dest_dir/dest_name` and deliver
    /// the path of the written file.
    ///
    /// `dest_dir` is created if needed and an existing file is overwritten.
    pub fn download_file(
        &self,
        request: HttpRequest,
        dest_dir: impl Into<PathBuf>,
        dest_name: impl Into<String>,
        handler: Option<Handler<PathBuf>>,
    ) {
        let dest_dir = dest_dir.into();
        let dest_name = dest_name.into();
        self.submit_with(request, handler, move |stream| {
            save_file(stream, &dest_dir, &dest_name)
        });
    }

    /// Decode the body of `request` as an image.
    ///
    /// Bytes that are not a supported image format are delivered as
    /// `Err(Error::Decode)`.
    pub fn download_image(&self, request: HttpRequest, handler: Option<Handler<DynamicImage>>) {
        self.submit_with(request, handler, decode_image);
    }
}

/// Write the body to `dir/name`, creating `dir` if it does not exist.
pub fn save_file(stream: ResponseStream, dir: &Path, name: &str) -> Result<PathBuf, Error> {
    fs::create_dir_all(dir)?;
    let path = dir.join(name);
    let mut file = File::create(&path)?;
    let mut buf = [0u8; DOWNLOAD_BUFFER_SIZE];
    let written = stream.copy_to(&mut file, &mut buf)?;
    file.flush()?;
    debug!(path = %path.display(), bytes = written, "download saved");
    Ok(path)
}

pub fn decode_image(stream: ResponseStream) -> Result<DynamicImage, Error> {
    let bytes = stream.into_bytes()?;
    image::load_from_memory(&bytes).map_err(|e| Error::Decode(e.to_string()))
}
