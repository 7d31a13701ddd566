//! PhotoLens capture and render client.
//!
//! Holds one photo at a time, fires the description and extraction requests
//! side by side, and turns whatever comes back into two independent panels.

pub mod analyzer;
pub mod camera;
pub mod description;
pub mod extraction;
pub mod report;
pub mod session;

pub use analyzer::{run_analysis, AnalysisEvent, ClientError, PhotoClient};
pub use camera::{Camera, NoCamera};
pub use description::DescriptionPanel;
pub use extraction::{view_document, ExtractionPanel, ExtractionView, Section, SectionBody};
pub use report::render_report;
pub use session::{AnalysisTicket, Banner, CaptureSession, UiSnapshot, BANNER_TTL};
