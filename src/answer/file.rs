/// Attached-file context: read from disk or parsed out of an embedded marker.
use std::fs;
use std::path::Path;

use serde::Serialize;

/// Marker opening a file block embedded in the question text.
pub const EMBEDDED_FILE_MARKER: &str = "[محتوى الملف المرفق";

const DEFAULT_FILENAME: &str = "ملف";
const NAME_END: &str = "':\n";

pub const KIND_UPLOADED: &str = "uploaded";
pub const KIND_IMAGE: &str = "image";

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp", "tiff", "tif", "svg"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileContext {
    pub filename: String,
    pub text: String,
    /// Free-form tag (`uploaded`, `image`, ...) used for fallback messaging only.
    pub kind: String,
}

fn has_image_extension(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
}

impl FileContext {
    pub fn new(filename: impl Into<String>, text: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            text: text.into(),
            kind: kind.into(),
        }
    }

    /// Reads `path` as lossy UTF-8. Images are not decoded; their text is a
    /// short description with the size.
    pub fn from_path<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_FILENAME.to_string());

        if has_image_extension(&filename) {
            let size = fs::metadata(path)?.len();
            let ext = path
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            let text = format!("📷 صورة ({ext})\nالحجم: {:.1} KB", size as f64 / 1024.0);
            return Ok(Self::new(filename, text, KIND_IMAGE));
        }

        let bytes = fs::read(path)?;
        let text = String::from_utf8_lossy(&bytes).trim().to_string();
        Ok(Self::new(filename, text, KIND_UPLOADED))
    }

    pub fn looks_like_image(&self) -> bool {
        self.kind == KIND_IMAGE
            || has_image_extension(&self.filename)
            || self.text.contains('📷')
            || self.text.contains("صورة")
            || self.text.to_lowercase().contains("image")
    }
}

/// Splits an embedded file block off the question.
///
/// The clean question is the trimmed text before the marker, or the whole
/// input when nothing precedes it. The filename sits between the first `'`
/// and the first `':\n`; the content follows `':\n` with the closing `]`
/// removed.
pub fn parse_embedded_file(question: &str) -> (String, Option<FileContext>) {
    let Some(start) = question.find(EMBEDDED_FILE_MARKER) else {
        return (question.to_string(), None);
    };

    let clean = question[..start].trim();
    let block = &question[start..];

    let filename = match (block.find('\''), block.find(NAME_END)) {
        (Some(open), Some(close)) if open < close => &block[open + 1..close],
        _ => DEFAULT_FILENAME,
    };
    let content = block
        .find(NAME_END)
        .map(|i| {
            block[i + NAME_END.len()..]
                .trim_end_matches(']')
                .trim()
                .to_string()
        })
        .unwrap_or_default();

    let question = if clean.is_empty() { question } else { clean };
    (
        question.to_string(),
        Some(FileContext::new(filename, content, KIND_UPLOADED)),
    )
}
