/// Song catalog
///
/// Read-only snapshot of the station's songlist for the duration of one
/// selection. Freshness and expiry are the caller's concern — there is no
/// in-process cache here. The wire format is the gzipped JSON songlist the
/// song-updater publishes.
use std::collections::HashMap;
use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

fn default_weight() -> f64 {
    1.0
}

/// One catalog entry. `weight` is the relative likelihood of random
/// selection and defaults to 1 when the songlist omits it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongEntry {
    pub song_id: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub genre: String,
    /// Event/set the song belongs to, shown in the stream title.
    #[serde(default)]
    pub event: String,
    /// Duration in seconds.
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub md5: Option<String>,
    /// Storage id resolved to a playable URL by the media pipeline.
    #[serde(default)]
    pub file_id: Option<String>,
}

impl SongEntry {
    /// Title line pushed to the stream metadata.
    pub fn stream_title(&self) -> String {
        format!(
            "[{}] {} - {} [#{}]",
            self.genre, self.artist, self.title, self.event
        )
    }
}

/// Immutable catalog snapshot with id lookup.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    songs: Vec<SongEntry>,
    by_id: HashMap<String, usize>,
}

impl Catalog {
    pub fn new(songs: Vec<SongEntry>) -> Self {
        let by_id = songs
            .iter()
            .enumerate()
            .map(|(i, s)| (s.song_id.clone(), i))
            .collect();
        Self { songs, by_id }
    }

    pub fn songs(&self) -> &[SongEntry] {
        &self.songs
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn get(&self, song_id: &str) -> Option<&SongEntry> {
        self.by_id.get(song_id).map(|&i| &self.songs[i])
    }

    /// Selection weights in catalog order, for the weighted sampler.
    pub fn weights(&self) -> Vec<f64> {
        self.songs.iter().map(|s| s.weight).collect()
    }

    /// Parse a `songlist.json.gz` blob.
    pub fn from_gzip_json(bytes: &[u8]) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let mut json = String::new();
        GzDecoder::new(bytes).read_to_string(&mut json)?;
        let songs: Vec<SongEntry> = serde_json::from_str(&json)?;
        Ok(Self::new(songs))
    }

    /// Serialize back to the gzipped songlist format (level 9, matching the
    /// published blobs).
    pub fn to_gzip_json(&self) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
        let json = serde_json::to_vec(&self.songs)?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(&json)?;
        Ok(encoder.finish()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(song_id: &str, weight: f64) -> SongEntry {
        SongEntry {
            song_id: song_id.to_string(),
            weight,
            title: format!("Title {song_id}"),
            artist: "Artist".to_string(),
            genre: "Genre".to_string(),
            event: "EV1".to_string(),
            duration: 120.0,
            md5: None,
            file_id: None,
        }
    }

    #[test]
    fn missing_weight_defaults_to_one() {
        let json = r#"[{"songId":"a","title":"T","artist":"A","genre":"G","event":"E"}]"#;
        let songs: Vec<SongEntry> = serde_json::from_str(json).unwrap();
        assert_eq!(songs[0].weight, 1.0);
        assert_eq!(songs[0].song_id, "a");
    }

    #[test]
    fn lookup_by_id() {
        let catalog = Catalog::new(vec![entry("a", 1.0), entry("b", 2.0)]);
        assert_eq!(catalog.get("b").unwrap().weight, 2.0);
        assert!(catalog.get("missing").is_none());
        assert_eq!(catalog.weights(), vec![1.0, 2.0]);
    }

    #[test]
    fn stream_title_format() {
        let e = entry("a", 1.0);
        assert_eq!(e.stream_title(), "[Genre] Artist - Title a [#EV1]");
    }

    #[test]
    fn reads_the_published_gzip_songlist() {
        let catalog = Catalog::new(vec![entry("a", 1.0), entry("b", 3.0)]);
        let blob = catalog.to_gzip_json().unwrap();
        // Gzip magic bytes — the blob must be a real gzip stream, not bare JSON.
        assert_eq!(&blob[..2], &[0x1f, 0x8b]);
        let parsed = Catalog::from_gzip_json(&blob).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.get("b").unwrap().weight, 3.0);
    }
}
