use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::warn;

use crate::error::FeedError;
use crate::images::ImageStore;
use crate::model::Article;

/// Name of the enclosure attribute carrying the image URL.
const ATTRIBUTE_URL: &str = "url";

/// The closed set of tag names the scan recognizes, matched by local name
/// (namespaces are ignored). Everything else clears the current tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Item,
    Title,
    Link,
    Description,
    Enclosure,
    PubDate,
}

impl TagKind {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"item" => Some(Self::Item),
            b"title" => Some(Self::Title),
            b"link" => Some(Self::Link),
            b"description" => Some(Self::Description),
            b"enclosure" => Some(Self::Enclosure),
            b"pubDate" => Some(Self::PubDate),
            _ => None,
        }
    }
}

/// What to do when a `pubDate` value fails to parse.
///
/// Aborting the whole feed over one bad date is the historical behavior and
/// arguably a latent defect, so the choice is exposed to configuration
/// instead of being hardwired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateErrorPolicy {
    /// Abort the whole parse, discarding every article extracted so far.
    #[default]
    Abort,
    /// Log the bad value and leave the article without a publish date.
    SkipField,
}

/// Scans a feed body as a stream of tag-open and character-data events and
/// assembles the articles it describes.
///
/// An article is appended to the output the moment an `item` opens, so a
/// partially-filled record is observably present even if later sub-fields
/// are missing. Enclosure images are downloaded inline, in document order;
/// a failed download is logged and the article proceeds without a picture.
///
/// Malformed XML and (under [`DateErrorPolicy::Abort`]) unparseable
/// `pubDate` values are fatal to the whole operation: no partial results.
pub async fn parse_feed(
    xml: &[u8],
    images: &dyn ImageStore,
    policy: DateErrorPolicy,
) -> Result<Vec<Article>, FeedError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();

    let mut articles: Vec<Article> = Vec::new();
    let mut current_tag: Option<TagKind> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => {
                current_tag = TagKind::from_local_name(e.local_name().as_ref());
                match current_tag {
                    // Unconditional per occurrence: repeated or nested opens
                    // each start a fresh record.
                    Some(TagKind::Item) => articles.push(Article::default()),
                    // The enclosure payload is its `url` attribute, consumed
                    // on the open event; its text content is ignored.
                    Some(TagKind::Enclosure) => {
                        let url = e
                            .try_get_attribute(ATTRIBUTE_URL)?
                            .map(|attr| attr.unescape_value())
                            .transpose()?;
                        if let (Some(url), Some(article)) = (url, articles.last_mut()) {
                            attach_image(article, url.as_ref(), images).await;
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(e) => {
                let text = e.unescape()?;
                apply_text(&mut articles, current_tag, text.as_ref(), policy)?;
            }
            Event::CData(e) => {
                let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                apply_text(&mut articles, current_tag, &text, policy)?;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(articles)
}

/// Applies one character-data event to the current article, if any.
/// Whitespace-only text never overwrites a previously set field.
fn apply_text(
    articles: &mut [Article],
    current_tag: Option<TagKind>,
    text: &str,
    policy: DateErrorPolicy,
) -> Result<(), FeedError> {
    let Some(kind) = current_tag else {
        return Ok(());
    };
    let Some(article) = articles.last_mut() else {
        return Ok(());
    };
    if is_blank(text) {
        return Ok(());
    }

    match kind {
        TagKind::Title => article.title = Some(text.to_string()),
        TagKind::Link => article.link = Some(text.to_string()),
        TagKind::Description => article.description = Some(text.to_string()),
        TagKind::PubDate => match DateTime::parse_from_rfc2822(text) {
            Ok(date) => article.published_at = Some(date.with_timezone(&Utc)),
            Err(source) => match policy {
                DateErrorPolicy::Abort => {
                    return Err(FeedError::Date {
                        text: text.to_string(),
                        source,
                    })
                }
                DateErrorPolicy::SkipField => {
                    warn!(text, %source, "skipping unparseable pubDate");
                }
            },
        },
        // Item text is structural noise; enclosure payload came from its
        // attribute on the open event.
        TagKind::Item | TagKind::Enclosure => {}
    }

    Ok(())
}

async fn attach_image(article: &mut Article, url: &str, images: &dyn ImageStore) {
    match images.store(url).await {
        Ok(path) => article.picture_path = Some(path.to_string_lossy().into_owned()),
        Err(e) => warn!(url, error = %e, "failed to store enclosure image"),
    }
}

fn is_blank(text: &str) -> bool {
    text.chars().all(char::is_whitespace)
}
