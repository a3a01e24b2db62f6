//! URL-property facade over [`ImageDownloader`].

use std::sync::Arc;

use pixfetch_core::{DecodedImage, HttpResponse, ImageFetchError};

use crate::downloader::{DownloadPhase, ImageDownloader};

type ImageHandler = Arc<dyn Fn(DecodedImage) + Send + Sync>;
type FailureHandler = Arc<dyn Fn(ImageFetchError, Option<HttpResponse>) + Send + Sync>;

/// Binds a URL to a pair of reusable handlers.
///
/// Assigning a URL starts a download for it, replacing whatever was in
/// flight. Clearing the URL cancels. Dropping the loader cancels.
pub struct ImageLoader {
    downloader: ImageDownloader,
    url: Option<String>,
    on_image: ImageHandler,
    on_failure: FailureHandler,
}

impl ImageLoader {
    /// Create a loader that reports through `on_image` and `on_failure`.
    pub fn new<S, E>(downloader: ImageDownloader, on_image: S, on_failure: E) -> Self
    where
        S: Fn(DecodedImage) + Send + Sync + 'static,
        E: Fn(ImageFetchError, Option<HttpResponse>) + Send + Sync + 'static,
    {
        Self {
            downloader,
            url: None,
            on_image: Arc::new(on_image),
            on_failure: Arc::new(on_failure),
        }
    }

    /// Set or clear the URL.
    pub fn set_url(&mut self, url: Option<String>) {
        match url {
            Some(url) => self.load(url),
            None => self.clear(),
        }
    }

    /// Download `url`, superseding any request in flight.
    pub fn load(&mut self, url: impl Into<String>) {
        let url = url.into();
        let on_image = Arc::clone(&self.on_image);
        let on_failure = Arc::clone(&self.on_failure);

        self.downloader.start(
            url.as_str(),
            move |image| on_image(image),
            move |error, response| on_failure(error, response),
        );
        self.url = Some(url);
    }

    /// Cancel any request in flight and forget the URL.
    pub fn clear(&mut self) {
        self.downloader.cancel();
        self.url = None;
    }

    /// The URL last assigned.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Phase of the underlying downloader.
    pub fn phase(&self) -> DownloadPhase {
        self.downloader.phase()
    }

    /// The underlying downloader.
    pub const fn downloader(&self) -> &ImageDownloader {
        &self.downloader
    }
}

impl std::fmt::Debug for ImageLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageLoader")
            .field("url", &self.url)
            .field("downloader", &self.downloader)
            .finish_non_exhaustive()
    }
}
