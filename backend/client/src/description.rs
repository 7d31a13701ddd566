//! Description panel.
//!
//! Network chunks are raw bytes and may end halfway through a multi-byte
//! character, so undecodable tails are held back until the next chunk.

use markdown::markdown_to_html;

pub const PLACEHOLDER_HTML: &str =
    "<p>Processing will automatically start after taking or uploading a photo.</p>";
pub const LOADING_HTML: &str = "<p>Generating description...</p>";
pub const ERROR_HTML: &str = "<p class=\"error\">Failed to analyze image. Please try again.</p>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelState {
    Idle,
    Loading,
    Streaming,
    Done,
    Failed,
}

#[derive(Debug, Clone)]
pub struct DescriptionPanel {
    state: PanelState,
    text: String,
    pending: Vec<u8>,
    html: String,
    follow_tail: bool,
}

impl Default for DescriptionPanel {
    fn default() -> Self {
        Self {
            state: PanelState::Idle,
            text: String::new(),
            pending: Vec::new(),
            html: PLACEHOLDER_HTML.to_string(),
            follow_tail: false,
        }
    }
}

impl DescriptionPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn begin(&mut self) {
        self.state = PanelState::Loading;
        self.text.clear();
        self.pending.clear();
        self.html = LOADING_HTML.to_string();
        self.follow_tail = false;
    }

    /// Append a network chunk and re-render the whole buffer.
    pub fn push_chunk(&mut self, chunk: &[u8]) {
        if matches!(self.state, PanelState::Failed) {
            return;
        }
        self.pending.extend_from_slice(chunk);
        self.decode_pending(false);
        self.state = PanelState::Streaming;
        self.render();
    }

    pub fn finish(&mut self) {
        if matches!(self.state, PanelState::Failed) {
            return;
        }
        self.decode_pending(true);
        self.state = PanelState::Done;
        self.render();
    }

    pub fn fail(&mut self) {
        self.state = PanelState::Failed;
        self.pending.clear();
        self.html = ERROR_HTML.to_string();
        self.follow_tail = false;
    }

    pub fn state(&self) -> PanelState {
        self.state
    }

    /// Raw accumulated Markdown.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    /// Whether the view should stay pinned to the newest content.
    pub fn follows_tail(&self) -> bool {
        self.follow_tail
    }

    fn render(&mut self) {
        if self.state != PanelState::Loading {
            self.html = markdown_to_html(&self.text);
            self.follow_tail = true;
        }
    }

    fn decode_pending(&mut self, flush: bool) {
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(valid) => {
                    self.text.push_str(valid);
                    self.pending.clear();
                    return;
                }
                Err(e) => {
                    let valid_up_to = e.valid_up_to();
                    self.text
                        .push_str(std::str::from_utf8(&self.pending[..valid_up_to]).unwrap_or_default());
                    match e.error_len() {
                        Some(bad) => {
                            self.text.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid_up_to + bad);
                        }
                        None if flush => {
                            self.text.push(char::REPLACEMENT_CHARACTER);
                            self.pending.clear();
                            return;
                        }
                        None => {
                            self.pending.drain(..valid_up_to);
                            return;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rerenders_after_every_chunk() {
        let mut panel = DescriptionPanel::new();
        panel.begin();
        assert_eq!(panel.html(), LOADING_HTML);

        panel.push_chunk(b"A **white");
        assert_eq!(panel.html(), "<p>A **white</p>");
        panel.push_chunk(b"** cup");
        assert_eq!(panel.html(), "<p>A <strong>white</strong> cup</p>");
        assert!(panel.follows_tail());

        panel.finish();
        assert_eq!(panel.state(), PanelState::Done);
        assert_eq!(panel.text(), "A **white** cup");
    }

    #[test]
    fn test_split_multibyte_character() {
        let mut panel = DescriptionPanel::new();
        panel.begin();
        let bytes = "crème brûlée".as_bytes();
        for chunk in bytes.chunks(3) {
            panel.push_chunk(chunk);
        }
        panel.finish();
        assert_eq!(panel.text(), "crème brûlée");
    }

    #[test]
    fn test_invalid_bytes_become_replacement() {
        let mut panel = DescriptionPanel::new();
        panel.begin();
        panel.push_chunk(&[b'a', 0xFF, b'b']);
        assert_eq!(panel.text(), "a\u{FFFD}b");
    }

    #[test]
    fn test_truncated_tail_flushed_on_finish() {
        let mut panel = DescriptionPanel::new();
        panel.begin();
        panel.push_chunk(&[b'x', 0xE2, 0x82]);
        assert_eq!(panel.text(), "x");
        panel.finish();
        assert_eq!(panel.text(), "x\u{FFFD}");
    }

    #[test]
    fn test_failure_replaces_content() {
        let mut panel = DescriptionPanel::new();
        panel.begin();
        panel.push_chunk(b"partial");
        panel.fail();
        assert_eq!(panel.html(), ERROR_HTML);
        panel.push_chunk(b" more");
        assert_eq!(panel.html(), ERROR_HTML);
    }

    #[test]
    fn test_concatenation_matches_stream() {
        let chunks = ["## Scene\n\n", "- a mug\n", "- a *lamp*\n"];
        let mut panel = DescriptionPanel::new();
        panel.begin();
        for chunk in chunks {
            panel.push_chunk(chunk.as_bytes());
        }
        panel.finish();
        assert_eq!(panel.text(), chunks.concat());
        assert_eq!(panel.html(), "<h4>Scene</h4><ul><li>a mug</li><li>a <em>lamp</em></li></ul>");
    }
}
