//! Background I/O: dataset fetches and the prediction upload.
//!
//! Each request runs on its own thread and hands its result back through a
//! [`Job`], which the UI thread polls once per frame. All application state
//! stays on the UI thread.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::{Client, multipart};
use serde::Deserialize;
use thiserror::Error;

use crate::data::loader::{self, LoadOutcome};
use crate::data::model::{Confidence, EventRecord, LocationRecord, PredictionResult, RankedLabel};

// ---------------------------------------------------------------------------
// Job – a result arriving later from a worker thread
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum JobPoll<T> {
    Running,
    Done(T),
    /// The worker went away without answering (it panicked).
    Lost,
}

#[derive(Debug)]
pub struct Job<T> {
    rx: Receiver<T>,
}

impl<T: Send + 'static> Job<T> {
    pub fn spawn(name: &str, work: impl FnOnce() -> T + Send + 'static) -> Self {
        let (tx, rx) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                // The receiver may be gone if the app closed; nothing to do then.
                let _ = tx.send(work());
            });
        if let Err(e) = spawned {
            log::error!("could not start {name} worker: {e}");
        }
        Job { rx }
    }

    /// A job that is already finished.
    #[cfg(test)]
    pub fn ready(value: T) -> Self {
        let (tx, rx) = mpsc::channel();
        let _ = tx.send(value);
        Job { rx }
    }

    pub fn poll(&self) -> JobPoll<T> {
        match self.rx.try_recv() {
            Ok(value) => JobPoll::Done(value),
            Err(TryRecvError::Empty) => JobPoll::Running,
            Err(TryRecvError::Disconnected) => JobPoll::Lost,
        }
    }
}

// ---------------------------------------------------------------------------
// Dataset sources
// ---------------------------------------------------------------------------

/// Where a dataset comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Url(String),
    File(PathBuf),
}

impl DataSource {
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.starts_with("http://") || s.starts_with("https://") {
            DataSource::Url(s.to_string())
        } else {
            DataSource::File(PathBuf::from(s))
        }
    }

    fn fetch_text(&self, client: &Client) -> Result<String> {
        match self {
            DataSource::Url(url) => client
                .get(url)
                .send()
                .and_then(|r| r.error_for_status())
                .with_context(|| format!("GET {url}"))?
                .text()
                .with_context(|| format!("reading body of {url}")),
            DataSource::File(path) => std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display())),
        }
    }
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSource::Url(url) => write!(f, "{url}"),
            DataSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

pub fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .context("building HTTP client")
}

pub type LocationsJob = Job<Result<LoadOutcome<LocationRecord>>>;
pub type EventsJob = Job<Result<LoadOutcome<EventRecord>>>;

pub fn spawn_location_load(source: DataSource, client: Client) -> LocationsJob {
    log::info!("Loading locations from {source}");
    Job::spawn("load-locations", move || match &source {
        DataSource::File(path) => loader::load_locations_file(path),
        DataSource::Url(_) => loader::parse_locations(&source.fetch_text(&client)?),
    })
}

pub fn spawn_event_load(source: DataSource, client: Client) -> EventsJob {
    log::info!("Loading wildfire events from {source}");
    Job::spawn("load-events", move || match &source {
        DataSource::File(path) => loader::load_events_file(path),
        DataSource::Url(_) => Ok(loader::parse_events(&source.fetch_text(&client)?)),
    })
}

// ---------------------------------------------------------------------------
// Prediction
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("the selected file is not a PNG or JPEG image")]
    NotAnImage,
    #[error("reading image: {0}")]
    Io(#[from] std::io::Error),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("prediction service answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected prediction response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("no prediction service configured")]
    Unavailable,
    #[error("upload worker stopped unexpectedly")]
    WorkerStopped,
}

/// An image picked by the user, read into memory once.
#[derive(Debug, Clone)]
pub struct SelectedImage {
    pub path: PathBuf,
    pub bytes: Arc<[u8]>,
    pub mime: &'static str,
}

impl SelectedImage {
    pub fn read(path: &Path) -> Result<Self, PredictionError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(path.to_path_buf(), bytes)
    }

    pub fn from_bytes(path: PathBuf, bytes: Vec<u8>) -> Result<Self, PredictionError> {
        let mime = match image::guess_format(&bytes) {
            Ok(image::ImageFormat::Png) => "image/png",
            Ok(image::ImageFormat::Jpeg) => "image/jpeg",
            _ => return Err(PredictionError::NotAnImage),
        };
        Ok(SelectedImage {
            path,
            bytes: bytes.into(),
            mime,
        })
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string())
    }

    /// URI under which the preview is registered with egui's loaders.
    pub fn preview_uri(&self) -> String {
        format!("bytes://{}", self.path.display())
    }
}

// Wire format of the prediction endpoint. The original service answered in
// Spanish; both spellings are accepted.
#[derive(Debug, Deserialize)]
struct PredictionResponse {
    #[serde(alias = "prediccion_principal")]
    primary_prediction: PrimaryPrediction,
    #[serde(default, alias = "top_5_predicciones", alias = "top_5_predictions")]
    top_predictions: Vec<RankedLabel>,
    #[serde(default, alias = "ubicacion")]
    location: ResponseLocation,
}

#[derive(Debug, Deserialize)]
struct PrimaryPrediction {
    animal: String,
    #[serde(alias = "confianza")]
    confidence: Confidence,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseLocation {
    #[serde(default, alias = "parques_encontrados")]
    matched_locations: Vec<String>,
    #[serde(default, alias = "mensaje")]
    message: Option<String>,
}

/// Decode a prediction response body.
pub fn decode_prediction(body: &str) -> Result<PredictionResult, serde_json::Error> {
    let resp: PredictionResponse = serde_json::from_str(body)?;
    Ok(PredictionResult {
        label: resp.primary_prediction.animal,
        confidence: resp.primary_prediction.confidence,
        matched_locations: resp.location.matched_locations,
        top_predictions: resp.top_predictions,
        message: resp.location.message,
    })
}

#[derive(Debug, Clone)]
pub struct PredictionClient {
    client: Client,
    endpoint: String,
}

impl PredictionClient {
    pub fn new(client: Client, endpoint: String) -> Self {
        PredictionClient { client, endpoint }
    }

    /// Upload one image as the multipart field `image` and decode the answer.
    pub fn predict(&self, image: &SelectedImage) -> Result<PredictionResult, PredictionError> {
        let part = multipart::Part::bytes(image.bytes.to_vec())
            .file_name(image.file_name())
            .mime_str(image.mime)?;
        let form = multipart::Form::new().part("image", part);

        let resp = self.client.post(&self.endpoint).multipart(form).send()?;
        let status = resp.status();
        let body = resp.text()?;
        if !status.is_success() {
            return Err(PredictionError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(decode_prediction(&body)?)
    }
}

pub type PredictionJob = Job<Result<PredictionResult, PredictionError>>;

pub fn spawn_prediction(client: PredictionClient, image: SelectedImage) -> PredictionJob {
    log::info!("Uploading {} to {}", image.file_name(), client.endpoint);
    Job::spawn("predict", move || client.predict(&image))
}
