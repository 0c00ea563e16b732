//! Background analysis worker.
//!
//! One dedicated thread per coordinator decodes and analyzes photos. The two
//! sides only exchange messages: requests are processed strictly in arrival
//! order and every request produces exactly one response, either the analysis
//! or an error scoped to that photo.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread;

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::analysis::{AnalysisInput, PhotoAnalyzer};
use crate::error::{Result, SmartFillError};
use crate::library::ImageRef;
use crate::model::PhotoAnalysis;

const WORKER_THREAD_NAME: &str = "smartfill-analyzer";

/// `ANALYZE_PHOTO` payload.
#[derive(Debug, Clone)]
pub struct AnalyzePhoto {
    pub image_id: String,
    pub image: ImageRef,
    pub width: u32,
    pub height: u32,
    pub detect_faces: bool,
}

#[derive(Debug, Clone)]
pub struct WorkerRequest {
    pub id: u64,
    /// Coordinator generation at dispatch; echoed back so stale results can
    /// be discarded after a cancel.
    pub generation: u64,
    pub payload: AnalyzePhoto,
}

/// Response body, serialized as `{"type": ..., "payload": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseKind {
    AnalysisComplete(PhotoAnalysis),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerResponse {
    pub id: u64,
    pub generation: u64,
    pub image_id: String,
    #[serde(flatten)]
    pub kind: ResponseKind,
}

/// Handle to the analysis thread. Dropping it closes the request channel;
/// the thread exits once the queued requests are drained or nobody is
/// listening for responses.
#[derive(Debug)]
pub struct AnalysisWorker {
    requests: mpsc::Sender<WorkerRequest>,
}

impl AnalysisWorker {
    pub fn spawn(
        analyzer: PhotoAnalyzer,
        responses: UnboundedSender<WorkerResponse>,
    ) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<WorkerRequest>();

        thread::Builder::new()
            .name(WORKER_THREAD_NAME.into())
            .spawn(move || run(analyzer, rx, responses))
            .map_err(|e| SmartFillError::WorkerUnavailable(format!("Failed to spawn: {e}")))?;

        info!("Analysis worker started");
        Ok(Self { requests: tx })
    }

    /// Queue a request without waiting for it to be processed.
    pub fn post(&self, request: WorkerRequest) -> Result<()> {
        self.requests
            .send(request)
            .map_err(|_| SmartFillError::WorkerUnavailable("Worker thread has stopped".into()))
    }
}

fn run(
    analyzer: PhotoAnalyzer,
    requests: mpsc::Receiver<WorkerRequest>,
    responses: UnboundedSender<WorkerResponse>,
) {
    for request in requests {
        let response = handle(&analyzer, request);
        if responses.send(response).is_err() {
            debug!("Response channel closed, stopping analysis worker");
            return;
        }
    }
    debug!("Request channel closed, stopping analysis worker");
}

fn handle(analyzer: &PhotoAnalyzer, request: WorkerRequest) -> WorkerResponse {
    let WorkerRequest {
        id,
        generation,
        payload,
    } = request;
    let image_id = payload.image_id.clone();

    let input = AnalysisInput {
        photo_id: payload.image_id,
        image: payload.image,
        width: payload.width,
        height: payload.height,
        detect_faces: payload.detect_faces,
    };

    // A panicking decoder must only cost this one photo.
    let outcome = catch_unwind(AssertUnwindSafe(|| analyzer.analyze(input)));
    let kind = match outcome {
        Ok(Ok(analysis)) => ResponseKind::AnalysisComplete(analysis),
        Ok(Err(e)) => ResponseKind::Error(e.to_string()),
        Err(_) => {
            warn!(photo_id = %image_id, "Analyzer panicked");
            ResponseKind::Error(format!("Analyzer panicked on photo {image_id}"))
        }
    };

    WorkerResponse {
        id,
        generation,
        image_id,
        kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SmartFillConfig;
    use crate::face::ModelHandle;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;
    use std::sync::Arc;
    use tokio::sync::mpsc::unbounded_channel;

    fn png(rgb: [u8; 3]) -> Arc<[u8]> {
        let mut buffer = Cursor::new(Vec::new());
        RgbImage::from_pixel(32, 24, Rgb(rgb))
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();
        buffer.into_inner().into()
    }

    fn request(id: u64, bytes: Arc<[u8]>) -> WorkerRequest {
        WorkerRequest {
            id,
            generation: 7,
            payload: AnalyzePhoto {
                image_id: format!("photo-{id}"),
                image: ImageRef::Bytes(bytes),
                width: 32,
                height: 24,
                detect_faces: false,
            },
        }
    }

    fn spawn() -> (AnalysisWorker, tokio::sync::mpsc::UnboundedReceiver<WorkerResponse>) {
        let analyzer = PhotoAnalyzer::new(&SmartFillConfig::default(), ModelHandle::unavailable());
        let (tx, rx) = unbounded_channel();
        (AnalysisWorker::spawn(analyzer, tx).unwrap(), rx)
    }

    #[tokio::test]
    async fn test_responses_follow_dispatch_order() {
        let (worker, mut rx) = spawn();
        for id in 1..=4 {
            worker.post(request(id, png([id as u8 * 40, 10, 10]))).unwrap();
        }

        for expected in 1..=4 {
            let response = rx.recv().await.unwrap();
            assert_eq!(response.id, expected);
            assert_eq!(response.generation, 7);
            assert!(matches!(response.kind, ResponseKind::AnalysisComplete(_)));
        }
    }

    #[tokio::test]
    async fn test_decode_error_does_not_stop_worker() {
        let (worker, mut rx) = spawn();
        worker.post(request(1, vec![9u8, 9, 9].into())).unwrap();
        worker.post(request(2, png([0, 200, 0]))).unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.image_id, "photo-1");
        assert!(matches!(first.kind, ResponseKind::Error(_)));

        let second = rx.recv().await.unwrap();
        assert!(matches!(second.kind, ResponseKind::AnalysisComplete(_)));
    }

    #[test]
    fn test_error_response_wire_shape() {
        let response = WorkerResponse {
            id: 3,
            generation: 1,
            image_id: "p".into(),
            kind: ResponseKind::Error("boom".into()),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["type"], "ERROR");
        assert_eq!(json["payload"], "boom");
        assert_eq!(json["id"], 3);
    }
}
