//! Standalone HTML page with the photo and both panels.

use markdown::escape_text;

use crate::session::CaptureSession;

const STYLE: &str = "body{font-family:system-ui,sans-serif;max-width:960px;margin:2rem auto;padding:0 1rem}\
.preview img{max-width:100%;border-radius:8px}\
.panels{display:grid;grid-template-columns:1fr 1fr;gap:1.5rem}\
.panel{border:1px solid #ddd;border-radius:8px;padding:1rem}\
.error{color:#b00020}\
.color-swatches{display:flex;flex-wrap:wrap;gap:.5rem}\
.color-label{padding:.2rem .6rem;border-radius:4px;border:1px solid #ccc}";

pub fn render_report(session: &CaptureSession) -> String {
    let snapshot = session.snapshot();
    let preview = snapshot
        .preview
        .as_deref()
        .map(|src| format!("<div class=\"preview\"><img src=\"{}\" alt=\"Analyzed photo\" /></div>", escape_text(src)))
        .unwrap_or_default();

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\" />\n\
<title>PhotoLens report</title>\n<style>{STYLE}</style>\n</head>\n<body>\n\
<h1>PhotoLens</h1>\n{preview}\n<div class=\"panels\">\n\
<section class=\"panel\"><h2>Description</h2><div class=\"description\">{description}</div></section>\n\
<section class=\"panel\"><h2>Extracted Data</h2><div class=\"extraction\">{extraction}</div></section>\n\
</div>\n</body>\n</html>\n",
        description = snapshot.description_html,
        extraction = snapshot.extraction_html,
    )
}
