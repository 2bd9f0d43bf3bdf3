use thiserror::Error;

/// Failures that abort a feed ingestion run.
///
/// Image-download failures are deliberately absent from this type: they are
/// logged at the enclosure site and the article proceeds without a picture.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed feed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("invalid pubDate {text:?}: {source}")]
    Date {
        text: String,
        source: chrono::ParseError,
    },
}
