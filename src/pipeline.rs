use std::fmt;
use tracing::{error, info, warn};

use crate::error::FileSystemError;
use crate::markdown::TaggedFile;
use crate::post::{PostDraft, PostStatus};
use crate::{MarkdownConversion, PostPublishing};

/// Per-run tally of what happened to each discovered file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub discovered: usize,
    pub published: usize,
    /// Files that never reached the publisher (conversion or draft errors).
    pub skipped: usize,
    /// Files whose publish call failed.
    pub failed: usize,
}

impl RunSummary {
    pub fn is_clean(&self) -> bool {
        self.skipped == 0 && self.failed == 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} found, {} published, {} skipped, {} failed",
            self.discovered, self.published, self.skipped, self.failed
        )
    }
}

/// Converts and publishes every file the walker yields, one at a time.
///
/// Per-file problems are logged and counted; a walker error ends the run.
pub async fn publish_all<I, C, P>(
    files: I,
    converter: &C,
    publisher: &P,
    status: PostStatus,
) -> Result<RunSummary, FileSystemError>
where
    I: IntoIterator<Item = Result<TaggedFile, FileSystemError>>,
    C: MarkdownConversion + ?Sized,
    P: PostPublishing + ?Sized,
{
    let mut summary = RunSummary::default();

    for file in files {
        let file = file?;
        summary.discovered += 1;

        let html = match converter.convert(&file.path).await {
            Ok(html) => html,
            Err(e) => {
                warn!(path = %file.path.display(), "Error converting Markdown to HTML: {}", e);
                summary.skipped += 1;
                continue;
            }
        };

        let draft = match PostDraft::new(file.title(), html, file.tag.clone(), status) {
            Ok(draft) => draft,
            Err(e) => {
                warn!(path = %file.path.display(), "Skipping post: {}", e);
                summary.skipped += 1;
                continue;
            }
        };

        match publisher.publish(&draft).await {
            Ok(post) => {
                info!(
                    title = %post.title,
                    tag = draft.tag(),
                    id = %post.id,
                    slug = post.slug.as_deref().unwrap_or("-"),
                    status = post.status.as_deref().unwrap_or("-"),
                    url = post.url.as_deref().unwrap_or("-"),
                    "Post published"
                );
                summary.published += 1;
            }
            Err(e) => {
                error!(title = draft.title(), "Error publishing post: {}", e);
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConversionError, PublishError};
    use crate::ghost::PublishedPost;
    use crate::markdown::find_tagged_files;
    use async_trait::async_trait;
    use std::fs;
    use std::io;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Fails for any file whose stem is listed, echoes the stem otherwise.
    struct FakeConverter {
        failing: Vec<&'static str>,
        calls: Mutex<Vec<PathBuf>>,
    }

    impl FakeConverter {
        fn failing(failing: &[&'static str]) -> Self {
            Self {
                failing: failing.to_vec(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl MarkdownConversion for FakeConverter {
        async fn convert(&self, markdown_path: &Path) -> Result<String, ConversionError> {
            self.calls.lock().unwrap().push(markdown_path.to_path_buf());
            let stem = markdown_path.file_stem().unwrap().to_string_lossy().into_owned();
            if self.failing.iter().any(|name| *name == stem) {
                return Err(ConversionError::Failed {
                    status: "exit status: 1".into(),
                    stderr: "boom".into(),
                });
            }
            Ok(format!("<p>{}</p>", stem))
        }
    }

    #[derive(Default)]
    struct RecordingPublisher {
        failing_titles: Vec<&'static str>,
        drafts: Mutex<Vec<PostDraft>>,
    }

    #[async_trait]
    impl PostPublishing for RecordingPublisher {
        async fn publish(&self, draft: &PostDraft) -> Result<PublishedPost, PublishError> {
            self.drafts.lock().unwrap().push(draft.clone());
            if self.failing_titles.iter().any(|title| *title == draft.title()) {
                return Err(PublishError::Api {
                    status: 500,
                    message: "nope".into(),
                });
            }
            Ok(PublishedPost {
                id: format!("id-{}", draft.title()),
                title: draft.title().to_string(),
                slug: Some(draft.title().to_string()),
                status: Some(draft.status().to_string()),
                url: None,
            })
        }
    }

    fn tree(files: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for file in files {
            let path = dir.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "text").unwrap();
        }
        dir
    }

    fn published(publisher: &RecordingPublisher) -> Vec<(String, String)> {
        publisher
            .drafts
            .lock()
            .unwrap()
            .iter()
            .map(|d| (d.tag().to_string(), d.title().to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_failed_conversion_skips_only_that_file() {
        let dir = tree(&["news/a.md", "news/b.md", "life/c.md"]);
        let converter = FakeConverter::failing(&["b"]);
        let publisher = RecordingPublisher::default();

        let summary = publish_all(
            find_tagged_files(dir.path()),
            &converter,
            &publisher,
            PostStatus::Draft,
        )
        .await
        .unwrap();

        let mut posts = published(&publisher);
        posts.sort();
        assert_eq!(
            posts,
            vec![
                ("life".to_string(), "c".to_string()),
                ("news".to_string(), "a".to_string()),
            ]
        );
        assert_eq!(converter.calls.lock().unwrap().len(), 3);
        assert_eq!(
            summary,
            RunSummary {
                discovered: 3,
                published: 2,
                skipped: 1,
                failed: 0
            }
        );
        assert!(!summary.is_clean());
    }

    #[tokio::test]
    async fn test_publish_failure_does_not_stop_the_run() {
        let dir = tree(&["news/a.md", "news/b.md", "life/c.md"]);
        let converter = FakeConverter::failing(&[]);
        let publisher = RecordingPublisher {
            failing_titles: vec!["a"],
            ..Default::default()
        };

        let summary = publish_all(
            find_tagged_files(dir.path()),
            &converter,
            &publisher,
            PostStatus::Draft,
        )
        .await
        .unwrap();

        assert_eq!(published(&publisher).len(), 3);
        assert_eq!(summary.published, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 0);
    }

    #[tokio::test]
    async fn test_status_and_body_reach_the_publisher() {
        let dir = tree(&["notes/hello-world.md"]);
        let converter = FakeConverter::failing(&[]);
        let publisher = RecordingPublisher::default();

        let summary = publish_all(
            find_tagged_files(dir.path()),
            &converter,
            &publisher,
            PostStatus::Published,
        )
        .await
        .unwrap();

        let drafts = publisher.drafts.lock().unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].title(), "hello-world");
        assert_eq!(drafts[0].tag(), "notes");
        assert_eq!(drafts[0].html(), "<p>hello-world</p>");
        assert_eq!(drafts[0].status(), PostStatus::Published);
        assert!(summary.is_clean());
    }

    #[tokio::test]
    async fn test_publishes_in_discovery_order() {
        let files = vec![
            Ok(TaggedFile {
                tag: "z".into(),
                path: PathBuf::from("/data/z/second.md"),
            }),
            Ok(TaggedFile {
                tag: "a".into(),
                path: PathBuf::from("/data/a/first.md"),
            }),
        ];
        let publisher = RecordingPublisher::default();

        publish_all(files, &FakeConverter::failing(&[]), &publisher, PostStatus::Draft)
            .await
            .unwrap();

        assert_eq!(
            published(&publisher),
            vec![
                ("z".to_string(), "second".to_string()),
                ("a".to_string(), "first".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_walker_error_aborts_after_earlier_files() {
        let files = vec![
            Ok(TaggedFile {
                tag: "news".into(),
                path: PathBuf::from("/data/news/a.md"),
            }),
            Err(FileSystemError {
                path: PathBuf::from("/data/locked"),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
            }),
            Ok(TaggedFile {
                tag: "news".into(),
                path: PathBuf::from("/data/news/z.md"),
            }),
        ];
        let publisher = RecordingPublisher::default();

        let err = publish_all(files, &FakeConverter::failing(&[]), &publisher, PostStatus::Draft)
            .await
            .unwrap_err();

        assert_eq!(err.path, PathBuf::from("/data/locked"));
        assert_eq!(published(&publisher), vec![("news".to_string(), "a".to_string())]);
    }

    #[tokio::test]
    async fn test_missing_root_is_fatal() {
        let dir = TempDir::new().unwrap();
        let publisher = RecordingPublisher::default();

        let result = publish_all(
            find_tagged_files(&dir.path().join("data")),
            &FakeConverter::failing(&[]),
            &publisher,
            PostStatus::Draft,
        )
        .await;

        assert!(result.is_err());
        assert!(published(&publisher).is_empty());
    }

    #[test]
    fn test_summary_display() {
        let summary = RunSummary {
            discovered: 4,
            published: 2,
            skipped: 1,
            failed: 1,
        };
        assert_eq!(summary.to_string(), "4 found, 2 published, 1 skipped, 1 failed");
    }
}
