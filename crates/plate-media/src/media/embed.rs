use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static VIDEO_ID_RE: Lazy<Regex> = Lazy::new(|| {
    // `watch?v=<id>`, `youtu.be/<id>` and `/shorts/<id>`.
    Regex::new(r"(?:[?&]v=|youtu\.be/|/shorts/)([A-Za-z0-9_-]+)").expect("valid video id pattern")
});

const EMBED_SEGMENT: &str = "/embed/";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmbedError {
    #[error("video source is empty")]
    EmptySource,
    #[error("no video id found in `{0}`")]
    NoVideoId(String),
}

/// Derives the embeddable URL for a video source. Sources that already point
/// at an embed path are returned unchanged.
pub fn embed_reference(source: &str, base_url: &str) -> Result<String, EmbedError> {
    let source = source.trim();
    if source.is_empty() {
        return Err(EmbedError::EmptySource);
    }
    if source.contains(EMBED_SEGMENT) {
        return Ok(source.to_string());
    }

    let id = VIDEO_ID_RE
        .captures(source)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| EmbedError::NoVideoId(source.to_string()))?;

    let base = base_url.trim_end_matches('/');
    Ok(format!("{base}/{id}"))
}

/// Memoizes `embed_reference` on the source string so unrelated attribute
/// changes do not reload the embedded frame.
#[derive(Debug, Default)]
pub struct EmbedCache {
    entry: Option<(String, Result<String, EmbedError>)>,
    derivations: usize,
}

impl EmbedCache {
    pub fn resolve(&mut self, source: &str, base_url: &str) -> &Result<String, EmbedError> {
        if !matches!(&self.entry, Some((cached, _)) if cached == source) {
            self.entry = None;
        }
        let derivations = &mut self.derivations;
        let (_, resolved) = self.entry.get_or_insert_with(|| {
            *derivations += 1;
            let resolved = embed_reference(source, base_url);
            if let Err(err) = &resolved {
                tracing::debug!(%err, "video source has no embeddable reference");
            }
            (source.to_string(), resolved)
        });
        resolved
    }

    pub fn current(&self) -> Option<&Result<String, EmbedError>> {
        self.entry.as_ref().map(|(_, resolved)| resolved)
    }

    /// How many times the reference was actually derived.
    pub fn derivations(&self) -> usize {
        self.derivations
    }
}
