use std::collections::HashMap;
use std::error::Error;
use std::fmt::Display;
use std::ops::Range;

use sha2::{Digest, Sha256};

use crate::models::videos::{Guess, GuessEpisode, GuessKind, Video};

pub mod engine;
pub mod rules;

use engine::{Match, MatchValue};

/// The file name could not be turned into an unambiguous guess. The caller
/// reports it as a catalog issue instead of enqueueing the file.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub path: String,
    pub reason: String,
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Could not parse {}: {}", self.path, self.reason)
    }
}

impl Error for ParseError {}

impl ParseError {
    fn new(path: &str, reason: impl ToString) -> Self {
        Self {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Parse a path into a [`Video`] carrying the parsed [`Guess`].
///
/// `expected_titles` are cleaned titles known to the xem mapping, used to
/// rescue titles the tokenizer splits apart.
pub fn identify(path: &str, expected_titles: &[String]) -> Result<Video, ParseError> {
    let mut matches = engine::scan(path);
    rules::apply(
        &mut matches,
        &rules::RuleContext {
            path,
            expected_titles,
        },
    );

    let extra_kind = matches.iter().find_map(|m| match m.value {
        MatchValue::ExtraDir(kind) => Some(kind),
        _ => None,
    });
    let titles: Vec<&str> = matches
        .iter()
        .filter_map(|m| match &m.value {
            MatchValue::Title(t) => Some(t.as_str()),
            _ => None,
        })
        .collect();
    let years: Vec<i32> = matches
        .iter()
        .filter_map(|m| match m.value {
            MatchValue::Year(y) => Some(y),
            _ => None,
        })
        .collect();
    let mut seasons: Vec<u32> = matches
        .iter()
        .filter_map(|m| match m.value {
            MatchValue::Season(s) => Some(s),
            _ => None,
        })
        .collect();
    seasons.dedup();
    let episodes: Vec<u32> = matches
        .iter()
        .filter_map(|m| match m.value {
            MatchValue::Episode(e) => Some(e),
            _ => None,
        })
        .collect();
    let version = matches.iter().find_map(|m| match m.value {
        MatchValue::Version(v) => Some(v),
        _ => None,
    });
    let part = matches.iter().find_map(|m| match m.value {
        MatchValue::Part(p) => Some(p),
        _ => None,
    });

    let title = titles
        .first()
        .copied()
        .ok_or_else(|| ParseError::new(path, "no title found"))?;

    if seasons.len() > 1 {
        return Err(ParseError::new(
            path,
            format!("an episode can't have multiple seasons (found {seasons:?})"),
        ));
    }

    let kind = match extra_kind {
        Some(_) => GuessKind::Extra,
        None if !episodes.is_empty() || !seasons.is_empty() => GuessKind::Episode,
        None => GuessKind::Movie,
    };
    if kind == GuessKind::Episode && episodes.is_empty() {
        return Err(ParseError::new(path, "episode without an episode number"));
    }

    let season = seasons.first().copied();
    let guess_episodes = match kind {
        GuessKind::Episode => episodes
            .iter()
            .map(|&episode| GuessEpisode { season, episode })
            .collect(),
        _ => Vec::new(),
    };

    let strip: Vec<Range<usize>> = matches
        .iter()
        .filter(|m| matches!(m.value, MatchValue::Version(_) | MatchValue::Part(_)))
        .map(|m| m.span.clone())
        .collect();

    let guess = Guess {
        title: title.to_string(),
        kind,
        extra_kind,
        years,
        episodes: guess_episodes,
        external_id: HashMap::new(),
        from_: "parser".to_string(),
        raw: raw_matches(&matches),
        history: Vec::new(),
    };

    Ok(Video {
        path: path.to_string(),
        rendering: rendering_hash(path, &strip),
        part,
        version: version.unwrap_or(1),
        guess,
        for_: Vec::new(),
    })
}

/// Dump of every match for debugging, stored opaque on the guess.
fn raw_matches(matches: &[Match]) -> serde_json::Value {
    let mut raw: HashMap<&'static str, Vec<serde_json::Value>> = HashMap::new();
    for m in matches {
        let (key, value) = match &m.value {
            MatchValue::Title(t) => ("title", serde_json::json!(t)),
            MatchValue::EpisodeTitle(t) => ("episode_title", serde_json::json!(t)),
            MatchValue::Year(y) => ("year", serde_json::json!(y)),
            MatchValue::Season(s) => ("season", serde_json::json!(s)),
            MatchValue::Episode(e) => ("episode", serde_json::json!(e)),
            MatchValue::Version(v) => ("version", serde_json::json!(v)),
            MatchValue::Part(p) => ("part", serde_json::json!(p)),
            MatchValue::ExtraDir(k) => ("extra", serde_json::json!(k)),
            MatchValue::Noise => continue,
        };
        raw.entry(key).or_default().push(value);
    }
    serde_json::json!(raw)
}

/// Hash of the path with the version and part spans removed, so every
/// version/part of one logical release shares a rendering.
fn rendering_hash(path: &str, strip: &[Range<usize>]) -> String {
    let kept: String = path
        .char_indices()
        .filter(|(i, _)| !strip.iter().any(|r| r.contains(i)))
        .map(|(_, c)| c)
        .collect();
    let digest = Sha256::digest(kept.as_bytes());
    let mut out = String::with_capacity(64);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::videos::ExtraKind;

    #[test]
    fn movie_happy_path() {
        let video = identify("/m/Inception (2010).mkv", &[]).unwrap();
        assert_eq!(video.guess.kind, GuessKind::Movie);
        assert_eq!(video.guess.title, "Inception");
        assert_eq!(video.guess.years, vec![2010]);
        assert!(video.guess.episodes.is_empty());
        assert_eq!(video.version, 1);
        assert_eq!(video.part, None);
    }

    #[test]
    fn absolute_numbered_episode() {
        let video = identify("/s/One Piece (1999) 1089.mkv", &[]).unwrap();
        assert_eq!(video.guess.kind, GuessKind::Episode);
        assert_eq!(video.guess.title, "One Piece");
        assert_eq!(video.guess.years, vec![1999]);
        assert_eq!(
            video.guess.episodes,
            vec![GuessEpisode {
                season: None,
                episode: 1089
            }]
        );
    }

    #[test]
    fn marker_episode() {
        let video = identify("/s/Attack on Titan S01E01.mkv", &[]).unwrap();
        assert_eq!(video.guess.kind, GuessKind::Episode);
        assert_eq!(video.guess.title, "Attack on Titan");
        assert_eq!(
            video.guess.episodes,
            vec![GuessEpisode {
                season: Some(1),
                episode: 1
            }]
        );
    }

    #[test]
    fn season_broadcasts_over_episodes() {
        let video = identify("/s/Elementary - S01E23-E24.mkv", &[]).unwrap();
        assert_eq!(
            video.guess.episodes,
            vec![
                GuessEpisode {
                    season: Some(1),
                    episode: 23
                },
                GuessEpisode {
                    season: Some(1),
                    episode: 24
                },
            ]
        );
    }

    #[test]
    fn rendering_ignores_version_and_part() {
        let part1 = identify("/m/Mad Max (1979) part 1.mkv", &[]).unwrap();
        let part2 = identify("/m/Mad Max (1979) part 2.mkv", &[]).unwrap();
        assert_eq!(part1.rendering, part2.rendering);
        assert_eq!(part1.part, Some(1));
        assert_eq!(part2.part, Some(2));

        let v2 = identify("/s/Condor Heroes S01E07 v2.mkv", &[]).unwrap();
        let v3 = identify("/s/Condor Heroes S01E07 v3.mkv", &[]).unwrap();
        assert_eq!(v2.rendering, v3.rendering);
        assert_eq!(v2.version, 2);
        assert_eq!(v3.version, 3);

        let other = identify("/m/Heat (1995).mkv", &[]).unwrap();
        assert_ne!(part1.rendering, other.rendering);
    }

    #[test]
    fn extras_are_not_episodes() {
        let video = identify("/m/Inception (2010)/Trailers/teaser.mkv", &[]).unwrap();
        assert_eq!(video.guess.kind, GuessKind::Extra);
        assert_eq!(video.guess.extra_kind, Some(ExtraKind::Trailer));
        assert!(video.guess.episodes.is_empty());
    }

    #[test]
    fn unparseable_path_is_an_error() {
        let err = identify("/s/S01E02.mkv", &[]).unwrap_err();
        assert!(err.reason.contains("no title"));
    }

    #[test]
    fn conflicting_seasons_are_an_error() {
        let err = identify("/s/Show/Season 2/Show S03E01.mkv", &[]).unwrap_err();
        assert!(err.reason.contains("multiple seasons"));
    }
}
