//! Streaming conversion API: emit pages as they complete.
//!
//! Rasterising and encoding are CPU-bound and pdfium is synchronous, so the
//! whole run executes on one `spawn_blocking` worker. Pages are handed to the
//! async side through a small bounded channel: the worker stays at most a
//! few pages ahead of the consumer, and dropping the stream stops the worker
//! at its next page boundary.
//!
//! Events arrive in document order, then page order. A document that fails
//! yields exactly one `Err` event, after any pages it did produce.

use crate::config::ConversionSettings;
use crate::convert::ConversionPipeline;
use crate::error::{PageError, Pdf2JpgError};
use crate::output::EncodedImage;
use crate::pipeline::archive::assign_namespaces;
use crate::pipeline::encode::ImageEncoder;
use crate::pipeline::input::SourceDocument;
use crate::pipeline::naming::NameRegistry;
use crate::pipeline::render::PageRasterizer;
use futures::Stream;
use std::pin::Pin;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

/// Pages buffered between the worker and the consumer.
const STREAM_BUFFER: usize = 4;

/// One page outcome, tagged with the document it belongs to.
#[derive(Debug, Clone)]
pub struct PageEvent {
    pub document_id: String,
    /// Archive namespace of the document (see [`crate::pipeline::archive`]).
    pub namespace: String,
    pub result: Result<EncodedImage, PageError>,
}

/// A boxed stream of page events.
pub type PageStream = Pin<Box<dyn Stream<Item = PageEvent> + Send>>;

/// Convert documents with pdfium + JPEG, streaming pages as they are ready.
///
/// # Returns
/// - `Ok(PageStream)`: a stream of [`PageEvent`]s
/// - `Err(Pdf2JpgError)`: invalid settings or pdfium could not be bound
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdf2jpg::{convert_stream, load_documents, ConversionSettings};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let documents = load_documents("scans/".as_ref())?;
/// let mut pages = convert_stream(documents, &ConversionSettings::default()).await?;
/// while let Some(event) = pages.next().await {
///     match event.result {
///         Ok(img) => println!("{}/{}: {} bytes", event.namespace, img.filename, img.size_bytes),
///         Err(e) => eprintln!("{}: {e}", event.document_id),
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub async fn convert_stream(
    documents: Vec<SourceDocument>,
    settings: &ConversionSettings,
) -> Result<PageStream, Pdf2JpgError> {
    convert_stream_with(ConversionPipeline::pdfium, documents, settings).await
}

/// Stream a run through any pipeline.
///
/// `make_pipeline` runs on the blocking worker, so the rasteriser never has
/// to cross threads. Its error, if any, is returned from this function.
pub async fn convert_stream_with<R, E, F>(
    make_pipeline: F,
    documents: Vec<SourceDocument>,
    settings: &ConversionSettings,
) -> Result<PageStream, Pdf2JpgError>
where
    R: PageRasterizer + 'static,
    E: ImageEncoder + 'static,
    F: FnOnce() -> Result<ConversionPipeline<R, E>, Pdf2JpgError> + Send + 'static,
{
    settings.validate()?;
    info!("Starting streaming conversion of {} document(s)", documents.len());

    let (tx, rx) = mpsc::channel(STREAM_BUFFER);
    let (ready_tx, ready_rx) = oneshot::channel();
    let settings = settings.clone();

    tokio::task::spawn_blocking(move || {
        let pipeline = match make_pipeline() {
            Ok(p) => {
                let _ = ready_tx.send(Ok(()));
                p
            }
            Err(e) => {
                let _ = ready_tx.send(Err(e));
                return;
            }
        };

        let namespaces = assign_namespaces(documents.iter().map(|d| d.id()));
        let mut registry = NameRegistry::new();

        for (document, namespace) in documents.iter().zip(namespaces) {
            let mut pages =
                pipeline.document_pages(document, namespace.clone(), settings.clone(), registry);
            for result in pages.by_ref() {
                let event = PageEvent {
                    document_id: document.id().to_string(),
                    namespace: namespace.clone(),
                    result,
                };
                if tx.blocking_send(event).is_err() {
                    debug!("Page stream dropped; stopping conversion");
                    return;
                }
            }
            registry = pages.into_registry();
        }
        debug!(
            "Streaming conversion finished: {} page name(s) assigned",
            registry.len()
        );
    });

    ready_rx
        .await
        .map_err(|_| Pdf2JpgError::Internal("conversion worker exited before start".into()))??;

    Ok(Box::pin(ReceiverStream::new(rx)))
}
