use chrono::{DateTime, Utc};

/// Format for user-entered and displayed dates (e.g. "01.01.2024. 10:00").
///
/// This is NOT the feed's date format: `pubDate` values arrive in RFC 2822/1123
/// form ("Mon, 01 Jan 2024 10:00:00 GMT") and are parsed with
/// `DateTime::parse_from_rfc2822`. Values round-tripped through the CLI use
/// this pattern; the two formats are never interchanged.
pub const INPUT_DATE_FORMAT: &str = "%d.%m.%Y. %H:%M";

/// One article extracted from the feed.
///
/// Every field is optional: the parser appends an article the moment an
/// `item` opens and fills fields as their tags are seen, so a record with
/// missing sub-fields is observably present in the output. Identity is
/// assigned later by the repository, not by the parser.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Article {
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    /// Local path of the downloaded enclosure image, if any.
    pub picture_path: Option<String>,
}

/// An article row as persisted in the database.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct StoredArticle {
    pub id: i64,
    pub title: String,
    pub link: String,
    pub description: String,
    pub published_at: DateTime<Utc>,
    pub picture_path: Option<String>,
}
