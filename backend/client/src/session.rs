//! Capture session.
//!
//! One photo at a time. Capturing or uploading starts an analysis attempt;
//! every attempt gets a fresh generation and events from older generations
//! are dropped on arrival.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use photolens_core::{ImageDataUrl, Photo, PhotoError};

use crate::analyzer::AnalysisEvent;
use crate::camera::Camera;
use crate::description::DescriptionPanel;
use crate::extraction::ExtractionPanel;

/// How long an error banner stays up unless dismissed.
pub const BANNER_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub id: u64,
    pub message: String,
    pub expires_at: Instant,
}

/// Everything `run_analysis` needs for one attempt.
#[derive(Debug, Clone)]
pub struct AnalysisTicket {
    pub generation: u64,
    pub image: ImageDataUrl,
}

/// What the user can see and do right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiSnapshot {
    pub preview: Option<String>,
    pub camera_start_enabled: bool,
    pub capture_enabled: bool,
    pub panels_visible: bool,
    pub analyze_enabled: bool,
    pub analyze_label: &'static str,
    pub description_html: String,
    pub extraction_html: String,
}

pub struct CaptureSession {
    camera: Box<dyn Camera>,
    camera_active: bool,
    photo: Option<Photo>,
    generation: u64,
    /// Requests of the current generation that have not settled yet.
    outstanding: u8,
    analyzed: bool,
    banners: Vec<Banner>,
    next_banner_id: u64,
    description: DescriptionPanel,
    extraction: ExtractionPanel,
}

impl CaptureSession {
    pub fn new(camera: Box<dyn Camera>) -> Self {
        Self {
            camera,
            camera_active: false,
            photo: None,
            generation: 0,
            outstanding: 0,
            analyzed: false,
            banners: Vec::new(),
            next_banner_id: 0,
            description: DescriptionPanel::new(),
            extraction: ExtractionPanel::new(),
        }
    }

    /// Ask for the camera. A refusal raises a banner and changes nothing else.
    pub async fn start_camera(&mut self, now: Instant) {
        if self.camera_active {
            return;
        }
        match self.camera.start().await {
            Ok(()) => {
                info!("Camera started");
                self.camera_active = true;
            }
            Err(e) => {
                warn!(error = %e, "Camera unavailable");
                self.push_banner(format!("Unable to access camera: {e}"), now);
            }
        }
    }

    /// Grab the current frame, release the camera and start analysis.
    pub async fn capture_frame(&mut self) -> Result<AnalysisTicket, PhotoError> {
        if !self.camera_active {
            return Err(PhotoError::CapabilityDenied("camera is not started".to_string()));
        }
        let jpeg = self.camera.capture_jpeg().await?;
        self.stop_camera();
        let photo = Photo::from_camera_frame(&jpeg)?;
        let image = photo.data_url.clone();
        self.photo = Some(photo);
        Ok(self.begin_analysis(image))
    }

    /// Take an uploaded file. Anything that is not an image is ignored.
    pub fn accept_file(&mut self, mime_type: &str, bytes: &[u8]) -> Option<AnalysisTicket> {
        if !media::is_image(mime_type) {
            debug!(mime_type, "Ignoring non-image upload");
            return None;
        }
        let photo = match Photo::from_upload(mime_type, bytes) {
            Ok(photo) => photo,
            Err(e) => {
                debug!(error = %e, "Ignoring unencodable upload");
                return None;
            }
        };
        self.stop_camera();
        let image = photo.data_url.clone();
        self.photo = Some(photo);
        Some(self.begin_analysis(image))
    }

    /// Run analysis again on the current photo. Not available mid-analysis.
    pub fn reanalyze(&mut self) -> Option<AnalysisTicket> {
        if self.is_analyzing() {
            return None;
        }
        let image = self.photo.as_ref()?.data_url.clone();
        Some(self.begin_analysis(image))
    }

    fn begin_analysis(&mut self, image: ImageDataUrl) -> AnalysisTicket {
        self.generation += 1;
        self.outstanding = 2;
        self.description.begin();
        self.extraction.begin();
        debug!(generation = self.generation, "Analysis started");
        AnalysisTicket {
            generation: self.generation,
            image,
        }
    }

    /// Fold one event into the panels. Returns false for stale events.
    pub fn apply(&mut self, event: AnalysisEvent) -> bool {
        if event.generation() != self.generation || self.outstanding == 0 {
            debug!(
                event_generation = event.generation(),
                current = self.generation,
                "Dropping stale analysis event"
            );
            return false;
        }

        match event {
            AnalysisEvent::DescriptionChunk { bytes, .. } => self.description.push_chunk(&bytes),
            AnalysisEvent::DescriptionFinished { .. } => {
                self.description.finish();
                self.settle();
            }
            AnalysisEvent::DescriptionFailed { .. } => {
                self.description.fail();
                self.settle();
            }
            AnalysisEvent::ExtractionReceived { document, .. } => {
                self.extraction.show_document(&document);
                self.settle();
            }
            AnalysisEvent::ExtractionFailed { .. } => {
                self.extraction.fail();
                self.settle();
            }
        }
        true
    }

    fn settle(&mut self) {
        self.outstanding = self.outstanding.saturating_sub(1);
        if self.outstanding == 0 {
            self.analyzed = true;
        }
    }

    /// Back to the initial state. In-flight responses become stale.
    pub fn reset(&mut self) {
        self.stop_camera();
        self.photo = None;
        self.generation += 1;
        self.outstanding = 0;
        self.analyzed = false;
        self.description.reset();
        self.extraction.reset();
    }

    fn stop_camera(&mut self) {
        if self.camera_active {
            self.camera.stop();
            self.camera_active = false;
        }
    }

    fn push_banner(&mut self, message: String, now: Instant) {
        self.next_banner_id += 1;
        self.banners.push(Banner {
            id: self.next_banner_id,
            message,
            expires_at: now + BANNER_TTL,
        });
    }

    /// Banners still showing at `now`.
    pub fn banners(&mut self, now: Instant) -> &[Banner] {
        self.banners.retain(|banner| banner.expires_at > now);
        &self.banners
    }

    pub fn dismiss_banner(&mut self, id: u64) {
        self.banners.retain(|banner| banner.id != id);
    }

    pub fn photo(&self) -> Option<&Photo> {
        self.photo.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_analyzing(&self) -> bool {
        self.outstanding > 0
    }

    pub fn camera_active(&self) -> bool {
        self.camera_active
    }

    pub fn description(&self) -> &DescriptionPanel {
        &self.description
    }

    pub fn extraction(&self) -> &ExtractionPanel {
        &self.extraction
    }

    pub fn snapshot(&self) -> UiSnapshot {
        let analyze_label = if self.is_analyzing() {
            "Analyzing..."
        } else if self.analyzed {
            "Re-analyze"
        } else {
            "Analyze"
        };
        UiSnapshot {
            preview: self.photo.as_ref().map(|photo| photo.data_url.to_string()),
            camera_start_enabled: !self.camera_active,
            capture_enabled: self.camera_active,
            panels_visible: self.photo.is_some(),
            analyze_enabled: self.photo.is_some() && !self.is_analyzing(),
            analyze_label,
            description_html: self.description.html().to_string(),
            extraction_html: self.extraction.html().to_string(),
        }
    }
}
