use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use confetti_slack::blocks::{SpeakerRow, TalkView};
use rand::seq::SliceRandom;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("fetch from `{url}` failed: {source}")]
    Http { url: String, source: reqwest::Error },
    #[error("fetch from `{url}` returned status {status}")]
    Status { url: String, status: u16 },
    #[error("response from `{url}` did not parse: {source}")]
    Parse { url: String, source: serde_json::Error },
    #[error("fetch from `{url}` failed and no cached copy exists")]
    NoCache { url: String },
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum SpeakerRef {
    Many(Vec<String>),
    One(String),
}

#[derive(Clone, Debug, Deserialize)]
struct AgendaSession {
    #[serde(default)]
    time: String,
    title: String,
    #[serde(default)]
    speaker: Option<SpeakerRef>,
    #[serde(default)]
    hall: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, Deserialize)]
pub struct SpeakerProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default, rename = "isFeatured")]
    pub is_featured: bool,
    #[serde(default, rename = "isHeroFeature")]
    pub is_hero_feature: bool,
}

impl SpeakerProfile {
    pub fn into_row(self) -> SpeakerRow {
        let featured = self.is_featured || self.is_hero_feature;
        SpeakerRow { name: self.name, role: self.role, featured }
    }
}

/// Join agenda sessions with the speaker directory into displayable talks.
/// Breaks are dropped; unknown speaker ids fall back to the raw id.
fn join_talks(sessions: Vec<AgendaSession>, speakers: &HashMap<String, String>) -> Vec<TalkView> {
    sessions
        .into_iter()
        .filter(|session| session.kind.as_deref() != Some("break"))
        .map(|session| {
            let speaker = match session.speaker {
                Some(SpeakerRef::Many(ids)) if !ids.is_empty() => ids
                    .iter()
                    .map(|id| speakers.get(id).cloned().unwrap_or_else(|| id.clone()))
                    .collect::<Vec<_>>()
                    .join(", "),
                Some(SpeakerRef::One(name)) if !name.is_empty() => name,
                _ => "TBA".to_owned(),
            };
            TalkView {
                time: session.time,
                title: session.title,
                speaker,
                hall: session.hall.unwrap_or_default(),
            }
        })
        .collect()
}

/// Fetches live agenda and speaker data, caching responses on disk.
///
/// A cached copy younger than the TTL short-circuits the network; a fetch
/// failure falls back to whatever cached copy exists, however old.
pub struct ConferenceFetcher {
    http: reqwest::Client,
    agenda_url: String,
    speakers_url: String,
    cache_dir: PathBuf,
    cache_ttl: Duration,
}

impl ConferenceFetcher {
    pub fn new(
        agenda_url: impl Into<String>,
        speakers_url: impl Into<String>,
        cache_dir: impl Into<PathBuf>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            agenda_url: agenda_url.into(),
            speakers_url: speakers_url.into(),
            cache_dir: cache_dir.into(),
            cache_ttl,
        }
    }

    /// The joined schedule: every non-break session with resolved speaker
    /// names, in agenda order.
    pub async fn talks(&self) -> Result<Vec<TalkView>, FetchError> {
        let sessions: Vec<AgendaSession> =
            self.fetch_json(&self.agenda_url, "agenda.json").await?;
        let speakers = self.speaker_names().await.unwrap_or_default();
        Ok(join_talks(sessions, &speakers))
    }

    pub async fn speakers(&self) -> Result<Vec<SpeakerProfile>, FetchError> {
        let speakers: Vec<SpeakerProfile> =
            self.fetch_json(&self.speakers_url, "speakers.json").await?;
        Ok(speakers.into_iter().filter(|speaker| speaker.visible).collect())
    }

    /// A uniformly random announced talk, if any exists yet.
    pub async fn random_talk(&self) -> Result<Option<TalkView>, FetchError> {
        let talks = self.talks().await?;
        let announced: Vec<TalkView> = talks
            .into_iter()
            .filter(|talk| {
                talk.title != "Coming Soon" && !talk.speaker.is_empty() && talk.speaker != "TBA"
            })
            .collect();
        let mut rng = rand::thread_rng();
        Ok(announced.choose(&mut rng).cloned())
    }

    async fn speaker_names(&self) -> Result<HashMap<String, String>, FetchError> {
        let speakers = self.speakers().await?;
        Ok(speakers.into_iter().map(|speaker| (speaker.id, speaker.name)).collect())
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        url: &str,
        cache_name: &str,
    ) -> Result<T, FetchError> {
        let cache_path = self.cache_dir.join(cache_name);

        if self.cache_is_fresh(&cache_path).await {
            if let Some(value) = read_cache(&cache_path).await {
                return Ok(value);
            }
        }

        match self.fetch(url).await {
            Ok(raw) => {
                let value = serde_json::from_slice(&raw)
                    .map_err(|source| FetchError::Parse { url: url.to_owned(), source })?;
                self.write_cache(&cache_path, &raw).await;
                info!(url, "conference data refreshed");
                Ok(value)
            }
            Err(error) => {
                warn!(url, error = %error, "fetch failed; trying cached copy");
                match read_cache(&cache_path).await {
                    Some(value) => Ok(value),
                    None => Err(error),
                }
            }
        }
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Http { url: url.to_owned(), source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { url: url.to_owned(), status: status.as_u16() });
        }

        let raw = response
            .bytes()
            .await
            .map_err(|source| FetchError::Http { url: url.to_owned(), source })?;
        Ok(raw.to_vec())
    }

    async fn cache_is_fresh(&self, path: &PathBuf) -> bool {
        let Ok(metadata) = tokio::fs::metadata(path).await else {
            return false;
        };
        metadata
            .modified()
            .ok()
            .and_then(|modified| modified.elapsed().ok())
            .map(|age| age < self.cache_ttl)
            .unwrap_or(false)
    }

    async fn write_cache(&self, path: &PathBuf, raw: &[u8]) {
        if let Err(error) = tokio::fs::create_dir_all(&self.cache_dir).await {
            warn!(error = %error, "could not create fetcher cache directory");
            return;
        }
        if let Err(error) = tokio::fs::write(path, raw).await {
            warn!(path = %path.display(), error = %error, "could not write fetcher cache");
        }
    }
}

async fn read_cache<T: DeserializeOwned>(path: &PathBuf) -> Option<T> {
    let raw = tokio::fs::read(path).await.ok()?;
    serde_json::from_slice(&raw).ok()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use tempfile::TempDir;

    use super::{join_talks, AgendaSession, ConferenceFetcher, SpeakerProfile};

    fn sessions() -> Vec<AgendaSession> {
        serde_json::from_str(
            r#"[
              {"time": "09:00", "title": "Opening Keynote", "speaker": ["s-ada"], "hall": "Hall A"},
              {"time": "10:00", "title": "Coffee", "type": "break"},
              {"time": "10:30", "title": "Serverless Databases", "speaker": "Guest Speaker", "hall": "Hall B"},
              {"time": "11:30", "title": "Coming Soon"}
            ]"#,
        )
        .expect("sessions parse")
    }

    #[test]
    fn join_resolves_ids_drops_breaks_and_defaults_tba() {
        let mut speakers = HashMap::new();
        speakers.insert("s-ada".to_owned(), "Ada Lovelace".to_owned());

        let talks = join_talks(sessions(), &speakers);

        assert_eq!(talks.len(), 3, "breaks are dropped");
        assert_eq!(talks[0].speaker, "Ada Lovelace");
        assert_eq!(talks[0].hall, "Hall A");
        assert_eq!(talks[1].speaker, "Guest Speaker");
        assert_eq!(talks[2].speaker, "TBA");
    }

    #[test]
    fn unknown_speaker_ids_fall_back_to_the_raw_id() {
        let talks = join_talks(sessions(), &HashMap::new());
        assert_eq!(talks[0].speaker, "s-ada");
    }

    #[test]
    fn speaker_profiles_parse_with_visibility_default() {
        let speakers: Vec<SpeakerProfile> = serde_json::from_str(
            r#"[
              {"id": "s1", "name": "Ada Lovelace", "role": "Engineer", "isFeatured": true},
              {"id": "s2", "name": "Hidden Speaker", "role": "TBD", "visible": false}
            ]"#,
        )
        .expect("parse");

        assert!(speakers[0].visible, "visibility defaults to true");
        assert!(speakers[0].is_featured);
        assert!(!speakers[1].visible);
    }

    #[tokio::test]
    async fn fresh_cache_short_circuits_the_network() {
        let dir = TempDir::new().expect("tempdir");
        let cache_dir = dir.path().join("cache");
        std::fs::create_dir_all(&cache_dir).expect("mkdir");
        std::fs::write(
            cache_dir.join("speakers.json"),
            r#"[{"id": "s1", "name": "Cached Speaker", "role": "Engineer"}]"#,
        )
        .expect("seed cache");

        // The URL is unreachable; only the cache can satisfy this.
        let fetcher = ConferenceFetcher::new(
            "http://127.0.0.1:9/agenda.json",
            "http://127.0.0.1:9/speakers.json",
            cache_dir,
            Duration::from_secs(3600),
        );

        let speakers = fetcher.speakers().await.expect("served from fresh cache");
        assert_eq!(speakers.len(), 1);
        assert_eq!(speakers[0].name, "Cached Speaker");
    }

    #[tokio::test]
    async fn failed_fetch_falls_back_to_stale_cache() {
        let dir = TempDir::new().expect("tempdir");
        let cache_dir = dir.path().join("cache");
        std::fs::create_dir_all(&cache_dir).expect("mkdir");
        std::fs::write(
            cache_dir.join("speakers.json"),
            r#"[{"id": "s1", "name": "Stale Speaker", "role": "Engineer"}]"#,
        )
        .expect("seed cache");

        // Zero TTL makes the cache stale immediately, forcing a fetch that
        // fails and falls back.
        let fetcher = ConferenceFetcher::new(
            "http://127.0.0.1:9/agenda.json",
            "http://127.0.0.1:9/speakers.json",
            cache_dir,
            Duration::from_secs(0),
        );

        let speakers = fetcher.speakers().await.expect("served from stale cache");
        assert_eq!(speakers[0].name, "Stale Speaker");
    }

    #[tokio::test]
    async fn failed_fetch_without_cache_is_an_error() {
        let dir = TempDir::new().expect("tempdir");
        let fetcher = ConferenceFetcher::new(
            "http://127.0.0.1:9/agenda.json",
            "http://127.0.0.1:9/speakers.json",
            dir.path().join("cache"),
            Duration::from_secs(0),
        );

        assert!(fetcher.speakers().await.is_err());
    }
}
