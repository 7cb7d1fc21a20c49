use crate::config::OcrConfig;
use crate::error::SplitzyError;
use crate::models::{ReceiptImage, RecognizedText};
use crate::observer::PipelineObserver;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(
        &self,
        image: &ReceiptImage,
        observer: Option<&dyn PipelineObserver>,
    ) -> Result<RecognizedText, SplitzyError>;
}

/// Runs the `tesseract` CLI, feeding the image on stdin and reading plain
/// text from stdout.
pub struct TesseractExtractor {
    binary: String,
    language: String,
    timeout: Duration,
}

impl TesseractExtractor {
    pub fn new(config: &OcrConfig) -> Self {
        tracing::info!(
            "OCR engine: {} (language: {}, timeout: {}s)",
            config.tesseract_bin,
            config.language,
            config.timeout.as_secs()
        );

        Self {
            binary: config.tesseract_bin.clone(),
            language: config.language.clone(),
            timeout: config.timeout,
        }
    }

    async fn run(&self, image: &ReceiptImage) -> Result<std::process::Output, SplitzyError> {
        let mut child = Command::new(&self.binary)
            .args(["stdin", "stdout", "-l", self.language.as_str()])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SplitzyError::ExtractionFailure(format!("failed to start {}: {}", self.binary, e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| SplitzyError::ExtractionFailure("OCR stdin unavailable".to_string()))?;
        let bytes = image.bytes().to_vec();

        let feed = async move {
            stdin.write_all(&bytes).await?;
            stdin.shutdown().await
        };

        let (fed, output) = tokio::join!(feed, child.wait_with_output());

        if let Err(e) = fed {
            tracing::debug!("OCR engine closed stdin early: {}", e);
        }

        output.map_err(|e| SplitzyError::ExtractionFailure(format!("OCR engine failed: {}", e)))
    }
}

#[async_trait]
impl TextExtractor for TesseractExtractor {
    async fn extract(
        &self,
        image: &ReceiptImage,
        observer: Option<&dyn PipelineObserver>,
    ) -> Result<RecognizedText, SplitzyError> {
        if image.is_empty() {
            return Err(SplitzyError::ExtractionFailure("image payload is empty".to_string()));
        }

        if let Some(observer) = observer {
            observer.on_extraction_progress(0);
        }

        tracing::debug!(format = ?image.format(), bytes = image.len(), "Running OCR");

        let output = tokio::time::timeout(self.timeout, self.run(image))
            .await
            .map_err(|_| {
                SplitzyError::ExtractionFailure(format!(
                    "OCR timed out after {}s",
                    self.timeout.as_secs()
                ))
            })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SplitzyError::ExtractionFailure(format!(
                "OCR engine exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).to_string();
        if text.trim().is_empty() {
            return Err(SplitzyError::ExtractionFailure("no text recognized".to_string()));
        }

        if let Some(observer) = observer {
            observer.on_extraction_progress(100);
        }

        tracing::debug!("Extracted text:\n{}", text);

        Ok(RecognizedText(text))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::observer::RecordingObserver;

    const PNG_HEADER: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn extractor(binary: &str) -> TesseractExtractor {
        TesseractExtractor::new(&OcrConfig {
            tesseract_bin: binary.to_string(),
            language: "eng".to_string(),
            timeout: Duration::from_secs(5),
        })
    }

    fn image() -> ReceiptImage {
        ReceiptImage::new(PNG_HEADER.to_vec(), 1024).unwrap()
    }

    #[tokio::test]
    async fn missing_binary_is_extraction_failure() {
        let err = extractor("/nonexistent/tesseract").extract(&image(), None).await.unwrap_err();
        assert!(matches!(err, SplitzyError::ExtractionFailure(_)));
    }

    #[tokio::test]
    async fn non_zero_exit_is_extraction_failure() {
        let err = extractor("false").extract(&image(), None).await.unwrap_err();
        assert!(matches!(err, SplitzyError::ExtractionFailure(_)));
    }

    #[tokio::test]
    async fn empty_output_is_extraction_failure() {
        let err = extractor("true").extract(&image(), None).await.unwrap_err();
        assert_eq!(err, SplitzyError::ExtractionFailure("no text recognized".to_string()));
    }

    #[tokio::test]
    async fn stdout_becomes_recognized_text() {
        // echo prints its arguments, standing in for recognized text.
        let observer = RecordingObserver::new();
        let text = extractor("echo").extract(&image(), Some(&observer)).await.unwrap();
        assert_eq!(text.as_str().trim(), "stdin stdout -l eng");
        assert_eq!(observer.snapshot().progress, vec![0, 100]);
    }
}
