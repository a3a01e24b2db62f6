//! Lifecycle tests for `ImageDownloader` driven by a simulated transport.

use std::io::Cursor;
use std::sync::{Arc, Barrier};
use std::time::Duration;

use image::{ImageFormat, Rgba, RgbaImage};
use pixfetch_core::testing::{SimulatedTransport, Simulation};
use pixfetch_core::{ChannelFetchLogger, DecodeError, FetchSettings};
use pixfetch_download::{
    DecodedImage, DownloadPhase, FetchErrorKind, FetchLogEvent, FetchLogKind, FetchLoggerPort,
    FetchRequest, HttpResponse, ImageDecoderPort, ImageDownloader, ImageDownloaderDeps,
    ImageFetchError, TransportError, build_image_downloader,
};
use tokio::sync::mpsc;

const IMAGE_URL: &str = "http://example.com/35px.png";

type Delivered = Result<DecodedImage, (ImageFetchError, Option<HttpResponse>)>;

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    transport: SimulatedTransport,
    simulation: Simulation,
    downloader: ImageDownloader,
    events: mpsc::UnboundedReceiver<FetchLogEvent>,
}

impl Harness {
    fn new() -> Self {
        Self::with_settings(FetchSettings::default())
    }

    fn with_settings(settings: FetchSettings) -> Self {
        let transport = SimulatedTransport::new();
        let simulation = transport.simulate("35px");
        let (logger, events) = ChannelFetchLogger::new();

        let downloader = build_image_downloader(
            ImageDownloaderDeps::new(Arc::new(transport.clone()))
                .with_logger(logger)
                .with_settings(settings),
        );

        Self {
            transport,
            simulation,
            downloader,
            events,
        }
    }

    fn start(&self, url: &str) -> mpsc::UnboundedReceiver<Delivered> {
        start_recording(&self.downloader, url)
    }

    fn drain_events(&mut self) -> Vec<FetchLogEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    fn drain_kinds(&mut self) -> Vec<FetchLogKind> {
        self.drain_events().into_iter().map(|e| e.kind).collect()
    }
}

/// Start `url`; the receiver closes without a value if no callback fires.
fn start_recording(downloader: &ImageDownloader, url: &str) -> mpsc::UnboundedReceiver<Delivered> {
    let (tx, rx) = mpsc::unbounded_channel();
    let error_tx = tx.clone();
    downloader.start(
        url,
        move |image| {
            let _ = tx.send(Ok(image));
        },
        move |error, response| {
            let _ = error_tx.send(Err((error, response)));
        },
    );
    rx
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba([0, 128, 255, 255]));
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
}

async fn expect_error(
    rx: &mut mpsc::UnboundedReceiver<Delivered>,
) -> (ImageFetchError, Option<HttpResponse>) {
    match rx.recv().await {
        Some(Err(failure)) => failure,
        other => panic!("expected error callback, got {other:?}"),
    }
}

async fn expect_no_callback(mut rx: mpsc::UnboundedReceiver<Delivered>) {
    assert!(rx.recv().await.is_none(), "callback fired for a cancelled request");
}

// ============================================================================
// Outcomes
// ============================================================================

#[tokio::test]
async fn success_delivers_image_with_source_dimensions() {
    let mut h = Harness::new();
    let mut rx = h.start(IMAGE_URL);
    assert_eq!(h.downloader.phase(), DownloadPhase::Requesting);
    assert_eq!(h.downloader.current_url().as_deref(), Some(IMAGE_URL));

    h.simulation.wait_for_requests(1).await;
    assert_eq!(h.simulation.respond_with_image(png_bytes(35, 35), "image/png"), 1);

    let image = rx.recv().await.unwrap().unwrap();
    assert_eq!(image.size(), (35, 35));
    assert!(rx.recv().await.is_none());

    assert_eq!(h.downloader.phase(), DownloadPhase::Completed);
    assert!(h.downloader.current_url().is_none());

    let events = h.drain_events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0], FetchLogEvent::request_sent(IMAGE_URL));
    assert_eq!(events[1], FetchLogEvent::response_success(IMAGE_URL, 200));
}

#[tokio::test]
async fn non_200_status_attaches_response() {
    let mut h = Harness::new();
    let mut rx = h.start(IMAGE_URL);

    h.simulation.wait_for_requests(1).await;
    h.simulation.respond_with_status(404);

    let (error, response) = expect_error(&mut rx).await;
    assert_eq!(error.kind(), FetchErrorKind::HttpStatusNot200);
    assert_eq!(error.to_string(), "Response HTTP status code is not 200.");
    let response = response.unwrap();
    assert_eq!(response.status_code, 404);
    assert_eq!(response.url, IMAGE_URL);

    assert_eq!(h.downloader.phase(), DownloadPhase::Failed);
    let events = h.drain_events();
    assert_eq!(events[1].kind, FetchLogKind::ResponseError);
    assert_eq!(events[1].status_code, Some(404));
    assert_eq!(
        events[1].error.as_ref().map(ImageFetchError::kind),
        Some(FetchErrorKind::HttpStatusNot200)
    );
}

#[tokio::test]
async fn missing_content_type_is_its_own_error() {
    let h = Harness::new();
    let mut rx = h.start(IMAGE_URL);

    h.simulation.wait_for_requests(1).await;
    h.simulation
        .respond_with_response(HttpResponse::new("", 200), png_bytes(1, 1));

    let (error, response) = expect_error(&mut rx).await;
    assert_eq!(error.kind(), FetchErrorKind::MissingContentTypeHeader);
    assert_eq!(response.map(|r| r.status_code), Some(200));
}

#[tokio::test]
async fn non_image_content_type_is_rejected() {
    let h = Harness::new();
    let mut rx = h.start(IMAGE_URL);

    h.simulation.wait_for_requests(1).await;
    h.simulation
        .respond_with_image(b"<html></html>".to_vec(), "text/html");

    let (error, response) = expect_error(&mut rx).await;
    assert_eq!(error.kind(), FetchErrorKind::NotAnImageContentType);
    assert_eq!(
        response.as_ref().and_then(HttpResponse::content_type),
        Some("text/html")
    );
}

#[tokio::test]
async fn undecodable_body_is_a_decode_error() {
    let h = Harness::new();
    let mut rx = h.start(IMAGE_URL);

    h.simulation.wait_for_requests(1).await;
    h.simulation
        .respond_with_image(b"definitely not a png".to_vec(), "image/png");

    let (error, response) = expect_error(&mut rx).await;
    assert_eq!(error.kind(), FetchErrorKind::FailedToDecodeImageData);
    assert!(response.is_some());
}

#[tokio::test]
async fn transport_error_passes_through_unmodified() {
    let mut h = Harness::new();
    let mut rx = h.start(IMAGE_URL);

    h.simulation.wait_for_requests(1).await;
    h.simulation.respond_with_error(TransportError::TimedOut);

    let (error, response) = expect_error(&mut rx).await;
    assert_eq!(error.transport_error(), Some(&TransportError::TimedOut));
    assert!(response.is_none());

    let events = h.drain_events();
    assert_eq!(events[1].kind, FetchLogKind::ResponseError);
    assert_eq!(events[1].status_code, None);
}

#[tokio::test]
async fn invalid_url_fails_without_transport_call() {
    let mut h = Harness::new();
    let mut rx = h.start("");

    // Reported before `start` returns
    let Ok(Err((error, response))) = rx.try_recv() else {
        panic!("invalid URL was not reported synchronously");
    };
    assert_eq!(error.kind(), FetchErrorKind::InvalidUrl);
    assert!(response.is_none());
    assert_eq!(h.transport.request_count(), 0);
    assert_eq!(h.downloader.phase(), DownloadPhase::Failed);
    assert_eq!(
        h.drain_kinds(),
        vec![FetchLogKind::RequestSent, FetchLogKind::ResponseError]
    );
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn cancel_before_response_suppresses_callbacks() {
    let mut h = Harness::new();
    let rx = h.start(IMAGE_URL);
    h.simulation.wait_for_requests(1).await;

    h.downloader.cancel();
    assert!(h.downloader.is_cancelled());
    assert_eq!(h.downloader.phase(), DownloadPhase::Cancelled);

    // The late response has nowhere to go
    h.simulation.respond_with_image(png_bytes(35, 35), "image/png");
    expect_no_callback(rx).await;

    assert_eq!(
        h.drain_kinds(),
        vec![FetchLogKind::RequestSent, FetchLogKind::RequestCancelled]
    );
}

#[tokio::test]
async fn cancel_twice_emits_one_event() {
    let mut h = Harness::new();
    let rx = h.start(IMAGE_URL);
    h.simulation.wait_for_requests(1).await;

    h.downloader.cancel();
    h.downloader.cancel();
    expect_no_callback(rx).await;

    let cancelled = h
        .drain_kinds()
        .into_iter()
        .filter(|k| *k == FetchLogKind::RequestCancelled)
        .count();
    assert_eq!(cancelled, 1);
}

#[tokio::test]
async fn cancel_drops_the_transport_call() {
    let h = Harness::new();
    let _rx = h.start(IMAGE_URL);
    h.simulation.wait_for_requests(1).await;

    h.downloader.cancel();

    // Let the request task observe the cancellation
    for _ in 0..10 {
        if h.simulation.cancelled_count() == 1 {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(h.simulation.cancelled_count(), 1);
    assert_eq!(h.simulation.pending_count(), 0);
}

/// Decoder that parks inside `decode` until the test lets it go.
struct ParkedDecoder {
    entered: Arc<Barrier>,
    release: Arc<Barrier>,
}

impl ImageDecoderPort for ParkedDecoder {
    fn decode(
        &self,
        _bytes: &[u8],
        _content_type: Option<&str>,
    ) -> Result<DecodedImage, DecodeError> {
        self.entered.wait();
        self.release.wait();
        Ok(DecodedImage::new(1, 1, vec![0u8; 4]))
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancel_while_decoding_discards_outcome() {
    let transport = SimulatedTransport::new();
    let simulation = transport.simulate("35px");
    let (logger, mut events) = ChannelFetchLogger::new();
    let entered = Arc::new(Barrier::new(2));
    let release = Arc::new(Barrier::new(2));

    let downloader = build_image_downloader(
        ImageDownloaderDeps::new(Arc::new(transport.clone()))
            .with_logger(logger)
            .with_decoder(ParkedDecoder {
                entered: Arc::clone(&entered),
                release: Arc::clone(&release),
            }),
    );

    let rx = start_recording(&downloader, IMAGE_URL);
    simulation.wait_for_requests(1).await;
    simulation.respond_with_image(png_bytes(1, 1), "image/png");

    // The transport call has completed and the decoder holds the request task
    tokio::task::spawn_blocking(move || {
        entered.wait();
    })
    .await
    .unwrap();

    downloader.cancel();

    tokio::task::spawn_blocking(move || {
        release.wait();
    })
    .await
    .unwrap();

    // The event channel closes once the request task lets go of the downloader
    drop(downloader);
    expect_no_callback(rx).await;

    let mut kinds = Vec::new();
    while let Some(event) = events.recv().await {
        kinds.push(event.kind);
    }
    assert_eq!(
        kinds,
        vec![FetchLogKind::RequestSent, FetchLogKind::RequestCancelled]
    );
}

#[tokio::test]
async fn cancel_after_completion_is_noop() {
    let mut h = Harness::new();
    let mut rx = h.start(IMAGE_URL);
    h.simulation.wait_for_requests(1).await;
    h.simulation.respond_with_status(500);
    expect_error(&mut rx).await;

    h.downloader.cancel();

    assert_eq!(h.downloader.phase(), DownloadPhase::Failed);
    assert!(!h.downloader.is_cancelled());
    assert_eq!(
        h.drain_kinds(),
        vec![FetchLogKind::RequestSent, FetchLogKind::ResponseError]
    );
}

#[tokio::test]
async fn new_start_supersedes_request_in_flight() {
    let mut h = Harness::new();
    let first = h.start("http://example.com/35px-first.png");
    h.simulation.wait_for_requests(1).await;

    let mut second = h.start("http://example.com/35px-second.png");
    expect_no_callback(first).await;
    h.simulation.wait_for_requests(2).await;

    h.simulation.respond_with_image(png_bytes(4, 2), "image/png");
    let image = second.recv().await.unwrap().unwrap();
    assert_eq!(image.size(), (4, 2));

    let events = h.drain_events();
    let summary: Vec<_> = events.iter().map(|e| (e.kind, e.url.as_str())).collect();
    assert_eq!(
        summary,
        vec![
            (FetchLogKind::RequestSent, "http://example.com/35px-first.png"),
            (FetchLogKind::RequestCancelled, "http://example.com/35px-first.png"),
            (FetchLogKind::RequestSent, "http://example.com/35px-second.png"),
            (FetchLogKind::ResponseSuccess, "http://example.com/35px-second.png"),
        ]
    );
}

#[tokio::test]
async fn dropping_downloader_mid_flight_cancels() {
    let h = Harness::new();
    let rx = h.start(IMAGE_URL);
    h.simulation.wait_for_requests(1).await;

    let Harness {
        simulation,
        downloader,
        mut events,
        ..
    } = h;
    drop(downloader);

    simulation.respond_with_image(png_bytes(35, 35), "image/png");
    expect_no_callback(rx).await;

    let mut kinds = Vec::new();
    while let Ok(event) = events.try_recv() {
        kinds.push(event.kind);
    }
    assert_eq!(
        kinds,
        vec![FetchLogKind::RequestSent, FetchLogKind::RequestCancelled]
    );
}

#[tokio::test]
async fn callback_may_restart_the_downloader() {
    let transport = SimulatedTransport::new();
    let simulation = transport.simulate("35px");
    let downloader = Arc::new(build_image_downloader(ImageDownloaderDeps::new(Arc::new(
        transport.clone(),
    ))));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let retry = Arc::clone(&downloader);
    downloader.start(
        "http://example.com/35px-broken.png",
        |_| {},
        move |_, _| {
            let pending = retry.fetch("http://example.com/35px-retry.png");
            let _ = tx.send(pending);
        },
    );

    simulation.wait_for_requests(1).await;
    simulation.respond_with_status(503);

    let pending = rx.recv().await.unwrap();
    simulation.wait_for_requests(2).await;
    simulation.respond_with_image(png_bytes(3, 3), "image/png");

    let outcome = pending.await.unwrap();
    assert!(outcome.is_success());
}

// ============================================================================
// Outcome future and configuration
// ============================================================================

#[tokio::test]
async fn fetch_resolves_to_outcome() {
    let h = Harness::new();
    let pending = h.downloader.fetch(IMAGE_URL);

    h.simulation.wait_for_requests(1).await;
    h.simulation.respond_with_image(png_bytes(8, 8), "image/png");

    let image = pending.await.unwrap().into_result().unwrap();
    assert_eq!(image.size(), (8, 8));
}

#[tokio::test]
async fn superseded_fetch_resolves_to_none() {
    let h = Harness::new();
    let first = h.downloader.fetch(IMAGE_URL);
    let _second = h.downloader.fetch(IMAGE_URL);

    assert!(first.await.is_none());
}

#[tokio::test]
async fn default_timeout_comes_from_settings() {
    let h = Harness::with_settings(
        FetchSettings::default().with_request_timeout(Duration::from_secs(7)),
    );
    let _rx = h.start(IMAGE_URL);
    h.simulation.wait_for_requests(1).await;

    assert_eq!(h.downloader.default_timeout(), Duration::from_secs(7));
    assert_eq!(h.transport.timeouts(), vec![Duration::from_secs(7)]);
}

#[tokio::test]
async fn per_request_timeout_overrides_default() {
    let h = Harness::new();
    let _pending = h
        .downloader
        .fetch(FetchRequest::new(IMAGE_URL).with_timeout(Duration::from_millis(1500)));
    h.simulation.wait_for_requests(1).await;

    assert_eq!(h.transport.timeouts(), vec![Duration::from_millis(1500)]);
}

// ============================================================================
// Logger contract
// ============================================================================

mockall::mock! {
    pub Logger {}

    impl FetchLoggerPort for Logger {
        fn log(&self, event: FetchLogEvent);
    }
}

#[tokio::test]
async fn idle_cancel_emits_nothing() {
    let mut logger = MockLogger::new();
    logger.expect_log().never();

    let downloader = build_image_downloader(
        ImageDownloaderDeps::new(Arc::new(SimulatedTransport::new())).with_logger(logger),
    );
    downloader.cancel();
    downloader.cancel();
}

#[tokio::test]
async fn every_request_gets_one_sent_and_one_terminal_event() {
    let mut logger = MockLogger::new();
    let mut seq = mockall::Sequence::new();
    logger
        .expect_log()
        .withf(|e| e.kind == FetchLogKind::RequestSent)
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    logger
        .expect_log()
        .withf(|e| e.kind == FetchLogKind::ResponseSuccess && e.status_code == Some(200))
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());

    let transport = SimulatedTransport::new();
    let simulation = transport.simulate("35px");
    let downloader = build_image_downloader(
        ImageDownloaderDeps::new(Arc::new(transport.clone())).with_logger(logger),
    );

    let pending = downloader.fetch(IMAGE_URL);
    simulation.wait_for_requests(1).await;
    simulation.respond_with_image(png_bytes(2, 2), "image/png");
    assert!(pending.await.is_some());
}

fn failing_sink(event: FetchLogEvent) {
    panic!("sink failure on {}", event.kind.as_str());
}

#[tokio::test]
async fn failing_logger_does_not_affect_callbacks() {
    let transport = SimulatedTransport::new();
    let simulation = transport.simulate("35px");
    let downloader = build_image_downloader(
        ImageDownloaderDeps::new(Arc::new(transport.clone())).with_logger(failing_sink),
    );

    let mut rx = start_recording(&downloader, IMAGE_URL);
    simulation.wait_for_requests(1).await;
    simulation.respond_with_image(png_bytes(2, 2), "image/png");

    let image = rx.recv().await.unwrap().unwrap();
    assert_eq!(image.size(), (2, 2));
    assert_eq!(downloader.phase(), DownloadPhase::Completed);

    let mut rx = start_recording(&downloader, "");
    assert!(matches!(rx.recv().await, Some(Err(_))));

    let rx = start_recording(&downloader, IMAGE_URL);
    downloader.cancel();
    expect_no_callback(rx).await;
    assert_eq!(downloader.phase(), DownloadPhase::Cancelled);
}

// ============================================================================
// Runtime
// ============================================================================

#[test]
fn downloader_can_be_driven_from_outside_the_runtime() {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let transport = SimulatedTransport::new();
    let simulation = transport.simulate("35px");
    let downloader = build_image_downloader(
        ImageDownloaderDeps::new(Arc::new(transport.clone()))
            .with_runtime(runtime.handle().clone()),
    );

    // No runtime context on this thread
    assert!(tokio::runtime::Handle::try_current().is_err());
    let mut rx = start_recording(&downloader, IMAGE_URL);

    let delivered = runtime.block_on(async {
        simulation.wait_for_requests(1).await;
        simulation.respond_with_image(png_bytes(3, 3), "image/png");
        rx.recv().await
    });

    assert_eq!(delivered.unwrap().unwrap().size(), (3, 3));
}
