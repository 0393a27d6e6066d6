use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DraftError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Draft,
    Published,
    Scheduled,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
            PostStatus::Scheduled => "scheduled",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PostStatus::Draft),
            "published" => Ok(PostStatus::Published),
            "scheduled" => Ok(PostStatus::Scheduled),
            other => Err(anyhow::anyhow!(
                "Unknown post status '{}', expected draft, published or scheduled",
                other
            )),
        }
    }
}

/// A post assembled from one Markdown file, ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    title: String,
    html: String,
    tag: String,
    status: PostStatus,
}

impl PostDraft {
    pub fn new(
        title: impl Into<String>,
        html: impl Into<String>,
        tag: impl Into<String>,
        status: PostStatus,
    ) -> Result<Self, DraftError> {
        let (title, html, tag) = (title.into(), html.into(), tag.into());

        if title.trim().is_empty() {
            return Err(DraftError::EmptyTitle);
        }
        if html.trim().is_empty() {
            return Err(DraftError::EmptyHtml);
        }
        if tag.trim().is_empty() {
            return Err(DraftError::EmptyTag);
        }

        Ok(Self {
            title,
            html,
            tag,
            status,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn status(&self) -> PostStatus {
        self.status
    }
}
