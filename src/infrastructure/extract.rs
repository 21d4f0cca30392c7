use tracing::warn;

/// Turns uploaded bytes into plain text for field parsing.
///
/// Extraction failures degrade to empty text rather than propagating:
/// downstream parsing tolerates empty input (zero required fields filled
/// scores Rejected), so a bad scan never aborts intake.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, content: &[u8], file_name: &str) -> String;
}

/// Default extractor: decodes text formats, degrades binary formats.
///
/// PDF and image recognition are handled by an external pipeline when one is
/// deployed; this implementation covers the text path and keeps the
/// degradation contract for everything else.
pub struct BasicExtractor;

impl TextExtractor for BasicExtractor {
    fn extract(&self, content: &[u8], file_name: &str) -> String {
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" | "png" | "jpg" | "jpeg" => {
                warn!(
                    file_name,
                    "no recognizer for binary format, degrading to empty text"
                );
                String::new()
            }
            _ => match std::str::from_utf8(content) {
                Ok(text) => text.to_string(),
                Err(_) => {
                    warn!(file_name, "content is not valid UTF-8, using lossy decode");
                    String::from_utf8_lossy(content).to_string()
                }
            },
        }
    }
}
