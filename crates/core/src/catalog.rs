use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A named content-type partition of the catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Bucket {
    Quiz,
    Poll,
    HotTake,
    ThisOrThat,
    Icebreaker,
    Meme,
}

impl Bucket {
    pub const ALL: [Bucket; 6] = [
        Bucket::Quiz,
        Bucket::Poll,
        Bucket::HotTake,
        Bucket::ThisOrThat,
        Bucket::Icebreaker,
        Bucket::Meme,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quiz => "quiz",
            Self::Poll => "poll",
            Self::HotTake => "hot-take",
            Self::ThisOrThat => "this-or-that",
            Self::Icebreaker => "icebreaker",
            Self::Meme => "meme",
        }
    }

    /// File name of the bucket's catalog source under the content directory.
    fn file_name(&self) -> &'static str {
        match self {
            Self::Quiz => "quizzes.json",
            Self::Poll => "polls.json",
            Self::HotTake => "hot-takes.json",
            Self::ThisOrThat => "this-or-that.json",
            Self::Icebreaker => "icebreakers.json",
            Self::Meme => "memes.json",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Bucket {
    type Err = CatalogError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "quiz" => Ok(Self::Quiz),
            "poll" => Ok(Self::Poll),
            "hot-take" => Ok(Self::HotTake),
            "this-or-that" => Ok(Self::ThisOrThat),
            "icebreaker" => Ok(Self::Icebreaker),
            "meme" => Ok(Self::Meme),
            other => Err(CatalogError::UnknownBucket(other.to_owned())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizContent {
    pub question: String,
    pub options: Vec<String>,
    /// Index into `options`; validated at load time.
    pub answer: usize,
    #[serde(default)]
    pub explanation: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    pub emoji: String,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollContent {
    pub question: String,
    pub options: Vec<PollOption>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotTakeContent {
    pub take: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThisOrThatContent {
    pub prompt: String,
    pub left: String,
    pub right: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IcebreakerContent {
    pub prompt: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemeContent {
    pub prompt: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Bucket-specific payload of a catalog item. Each bucket's file is parsed
/// against its own concrete shape; shapes are too similar (several are just
/// a `prompt`) for untagged guessing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContentPayload {
    Quiz(QuizContent),
    Poll(PollContent),
    ThisOrThat(ThisOrThatContent),
    Meme(MemeContent),
    HotTake(HotTakeContent),
    Icebreaker(IcebreakerContent),
}

/// One immutable catalog entry. Loaded at process start, never mutated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentItem {
    pub id: String,
    pub payload: ContentPayload,
}

impl ContentItem {
    pub fn quiz(&self) -> Option<&QuizContent> {
        match &self.payload {
            ContentPayload::Quiz(quiz) => Some(quiz),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not read catalog file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse catalog file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: serde_json::Error },
    #[error("duplicate content id `{id}` in bucket `{bucket}`")]
    DuplicateId { bucket: Bucket, id: String },
    #[error("quiz `{id}` answer index {answer} is out of range for {options} options")]
    AnswerOutOfRange { id: String, answer: usize, options: usize },
    #[error("item `{id}` in bucket `{bucket}` has a payload of the wrong shape")]
    PayloadMismatch { bucket: Bucket, id: String },
    #[error("unknown bucket `{0}`")]
    UnknownBucket(String),
}

/// The static content catalog, grouped by bucket.
///
/// Missing bucket files load as empty buckets; emptiness only becomes an
/// error at selection time (`RotationError::EmptyCatalog`), which lets a
/// deployment ship a subset of the content types.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    buckets: BTreeMap<Bucket, Vec<ContentItem>>,
}

impl Catalog {
    /// Load every bucket's JSON file from `dir`.
    pub fn load_dir(dir: &Path) -> Result<Self, CatalogError> {
        let mut buckets = BTreeMap::new();
        for bucket in Bucket::ALL {
            let path = dir.join(bucket.file_name());
            let items = if path.exists() { load_bucket_file(bucket, &path)? } else { Vec::new() };
            buckets.insert(bucket, items);
        }
        Ok(Self { buckets })
    }

    /// Build a catalog directly from items; used by tests and fixtures.
    pub fn from_buckets(
        buckets: impl IntoIterator<Item = (Bucket, Vec<ContentItem>)>,
    ) -> Result<Self, CatalogError> {
        let mut catalog = Self::default();
        for (bucket, items) in buckets {
            validate_bucket(bucket, &items)?;
            catalog.buckets.insert(bucket, items);
        }
        Ok(catalog)
    }

    pub fn items(&self, bucket: Bucket) -> &[ContentItem] {
        self.buckets.get(&bucket).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn find(&self, bucket: Bucket, id: &str) -> Option<&ContentItem> {
        self.items(bucket).iter().find(|item| item.id == id)
    }

    pub fn len(&self, bucket: Bucket) -> usize {
        self.items(bucket).len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.values().all(Vec::is_empty)
    }

    pub fn bucket_sizes(&self) -> impl Iterator<Item = (Bucket, usize)> + '_ {
        self.buckets.iter().map(|(bucket, items)| (*bucket, items.len()))
    }
}

#[derive(Deserialize)]
struct RawItem<T> {
    id: String,
    #[serde(flatten)]
    payload: T,
}

fn parse_items<T: serde::de::DeserializeOwned>(
    raw: &str,
    path: &Path,
    wrap: fn(T) -> ContentPayload,
) -> Result<Vec<ContentItem>, CatalogError> {
    let items: Vec<RawItem<T>> = serde_json::from_str(raw)
        .map_err(|source| CatalogError::ParseFile { path: path.to_path_buf(), source })?;
    Ok(items
        .into_iter()
        .map(|item| ContentItem { id: item.id, payload: wrap(item.payload) })
        .collect())
}

fn load_bucket_file(bucket: Bucket, path: &Path) -> Result<Vec<ContentItem>, CatalogError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|source| CatalogError::ReadFile { path: path.to_path_buf(), source })?;

    let items = match bucket {
        Bucket::Quiz => parse_items(&raw, path, ContentPayload::Quiz)?,
        Bucket::Poll => parse_items(&raw, path, ContentPayload::Poll)?,
        Bucket::HotTake => parse_items(&raw, path, ContentPayload::HotTake)?,
        Bucket::ThisOrThat => parse_items(&raw, path, ContentPayload::ThisOrThat)?,
        Bucket::Icebreaker => parse_items(&raw, path, ContentPayload::Icebreaker)?,
        Bucket::Meme => parse_items(&raw, path, ContentPayload::Meme)?,
    };
    validate_bucket(bucket, &items)?;
    Ok(items)
}

fn validate_bucket(bucket: Bucket, items: &[ContentItem]) -> Result<(), CatalogError> {
    let mut seen = HashSet::new();
    for item in items {
        if !seen.insert(item.id.as_str()) {
            return Err(CatalogError::DuplicateId { bucket, id: item.id.clone() });
        }
        if !payload_matches(bucket, &item.payload) {
            return Err(CatalogError::PayloadMismatch { bucket, id: item.id.clone() });
        }
        if let ContentPayload::Quiz(quiz) = &item.payload {
            if quiz.answer >= quiz.options.len() {
                return Err(CatalogError::AnswerOutOfRange {
                    id: item.id.clone(),
                    answer: quiz.answer,
                    options: quiz.options.len(),
                });
            }
        }
    }
    Ok(())
}

fn payload_matches(bucket: Bucket, payload: &ContentPayload) -> bool {
    matches!(
        (bucket, payload),
        (Bucket::Quiz, ContentPayload::Quiz(_))
            | (Bucket::Poll, ContentPayload::Poll(_))
            | (Bucket::HotTake, ContentPayload::HotTake(_))
            | (Bucket::ThisOrThat, ContentPayload::ThisOrThat(_))
            | (Bucket::Icebreaker, ContentPayload::Icebreaker(_))
            | (Bucket::Meme, ContentPayload::Meme(_))
    )
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::{Bucket, Catalog, CatalogError, ContentItem, ContentPayload, QuizContent};

    pub(crate) fn quiz_item(id: &str) -> ContentItem {
        ContentItem {
            id: id.to_owned(),
            payload: ContentPayload::Quiz(QuizContent {
                question: format!("question for {id}"),
                options: vec!["A".to_owned(), "B".to_owned()],
                answer: 0,
                explanation: None,
            }),
        }
    }

    #[test]
    fn loads_buckets_from_directory() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(
            dir.path().join("quizzes.json"),
            r#"[
              {"id": "q1", "question": "What does CDN stand for?",
               "options": ["Content Delivery Network", "Cloud Data Node"], "answer": 0},
              {"id": "q2", "question": "Which port does HTTPS use?",
               "options": ["443", "80", "22"], "answer": 0}
            ]"#,
        )
        .expect("write quizzes");
        fs::write(
            dir.path().join("hot-takes.json"),
            r#"[{"id": "ht1", "take": "YAML is a programming language."}]"#,
        )
        .expect("write hot takes");

        let catalog = Catalog::load_dir(dir.path()).expect("catalog should load");

        assert_eq!(catalog.len(Bucket::Quiz), 2);
        assert_eq!(catalog.len(Bucket::HotTake), 1);
        assert_eq!(catalog.len(Bucket::Poll), 0, "missing files load as empty buckets");
        assert_eq!(catalog.find(Bucket::Quiz, "q2").map(|item| item.id.as_str()), Some("q2"));
    }

    #[test]
    fn rejects_duplicate_ids_within_a_bucket() {
        let error = Catalog::from_buckets([(
            Bucket::Quiz,
            vec![quiz_item("q1"), quiz_item("q1")],
        )])
        .expect_err("duplicate ids should fail");

        assert!(matches!(
            error,
            CatalogError::DuplicateId { bucket: Bucket::Quiz, ref id } if id == "q1"
        ));
    }

    #[test]
    fn rejects_quiz_answer_index_out_of_range() {
        let mut item = quiz_item("q1");
        if let ContentPayload::Quiz(quiz) = &mut item.payload {
            quiz.answer = 7;
        }

        let error = Catalog::from_buckets([(Bucket::Quiz, vec![item])])
            .expect_err("out-of-range answer should fail");

        assert!(matches!(error, CatalogError::AnswerOutOfRange { answer: 7, options: 2, .. }));
    }

    #[test]
    fn rejects_payload_in_the_wrong_bucket() {
        let error = Catalog::from_buckets([(Bucket::Poll, vec![quiz_item("q1")])])
            .expect_err("quiz payload in poll bucket should fail");

        assert!(matches!(error, CatalogError::PayloadMismatch { bucket: Bucket::Poll, .. }));
    }

    #[test]
    fn bucket_names_round_trip() {
        for bucket in Bucket::ALL {
            let parsed: Bucket = bucket.as_str().parse().expect("bucket name should parse");
            assert_eq!(parsed, bucket);
        }
    }
}
