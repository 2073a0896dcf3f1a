use std::ops::Range;

use crate::models::videos::ExtraKind;

/// Directory names whose files are bonus content instead of entries.
const EXTRAS_FOLDERS: &[(&str, ExtraKind)] = &[
    ("behind the scenes", ExtraKind::BehindTheScene),
    ("deleted scenes", ExtraKind::DeletedScene),
    ("interviews", ExtraKind::Interview),
    ("trailers", ExtraKind::Trailer),
    ("bloopers", ExtraKind::Blooper),
    ("featurettes", ExtraKind::Other),
    ("samples", ExtraKind::Other),
    ("shorts", ExtraKind::Other),
    ("clips", ExtraKind::Other),
    ("extras", ExtraKind::Other),
    ("other", ExtraKind::Other),
];

/// Everything that ends a title and carries no meaning on its own.
const NAME_NOISE: &[&str] = &[
    "3d", "sbs", "tab", "hsbs", "htab", "mvc", "hdr", "hdr-dvt", "hdc", "uhd", "ultrahd", "4k",
    "ac3", "dts", "dubbed", "dc", "divx", "divx5", "dsr", "dsrip", "dvd", "dvdrip", "dvdscr",
    "dvdscreener", "dvdivx", "hdtv", "hdrip", "hdtvrip", "ntsc", "ogg", "ogm", "pal", "pdtv",
    "proper", "repack", "rerip", "r5", "bd5", "bd", "se", "svcd", "nfo", "nfofix", "ws", "ts",
    "tc", "brrip", "bdrip", "webrip", "480p", "480i", "576p", "576i", "720p", "720i", "1080p",
    "1080i", "2160p", "hrhd", "hrhdtv", "hddvd", "bluray", "blu-ray", "x264", "x265", "h264",
    "h265", "xvid", "xvidvd", "www", "kp", "web-dl", "webdl", "web", "aac", "complete", "multi",
    "vostfr", "vf", "remux", "amzn", "nf",
];

#[derive(Debug, Clone, PartialEq)]
pub enum MatchValue {
    Title(String),
    EpisodeTitle(String),
    Year(i32),
    Season(u32),
    Episode(u32),
    Version(u32),
    Part(u32),
    ExtraDir(ExtraKind),
    Noise,
}

/// One semantic region of the path. Spans index bytes of the full path so
/// post-process rules can inspect the text around a match and the rendering
/// hash can strip exact character ranges.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub value: MatchValue,
    pub span: Range<usize>,
    /// Set when one source region expanded into several matches
    /// (`Season 2 - 08` emits two seasons sharing an initiator).
    pub initiator: Option<u32>,
}

impl Match {
    fn new(value: MatchValue, span: Range<usize>) -> Self {
        Self {
            value,
            span,
            initiator: None,
        }
    }
}

#[derive(Debug, Clone)]
struct Token<'a> {
    text: &'a str,
    span: Range<usize>,
    bracketed: bool,
}

const OPEN_BRACKETS: &[char] = &['(', '[', '{'];
const CLOSE_BRACKETS: &[char] = &[')', ']', '}'];
const SEPARATORS: &[char] = &[' ', '.', '_'];

/// Scan a full path into matches. Semantic extraction happens on the file
/// name, parent components only contribute season folders and extras
/// markers.
pub fn scan(path: &str) -> Vec<Match> {
    let mut matches = Vec::new();

    let components: Vec<(usize, &str)> = split_with_offsets(path, '/');
    let Some(&(file_start, file_name)) = components.last() else {
        return matches;
    };

    for &(start, component) in components.iter().take(components.len().saturating_sub(1)) {
        let lowered = component.to_lowercase();
        if let Some((_, kind)) = EXTRAS_FOLDERS.iter().find(|(name, _)| *name == lowered) {
            matches.push(Match::new(
                MatchValue::ExtraDir(*kind),
                start..start + component.len(),
            ));
        } else if let Some(season) = parse_season_dir(&lowered) {
            matches.push(Match::new(
                MatchValue::Season(season),
                start..start + component.len(),
            ));
        } else if let Some((offset, year)) = parse_dir_year(component) {
            matches.push(Match::new(
                MatchValue::Year(year),
                start + offset..start + offset + 4,
            ));
        }
    }

    let stem = match file_name.rfind('.') {
        Some(dot) if is_extension(&file_name[dot + 1..]) => &file_name[..dot],
        _ => file_name,
    };
    let tokens = tokenize(stem, file_start);
    classify(&tokens, path, &mut matches);

    matches.sort_by_key(|m| m.span.start);
    matches
}

fn split_with_offsets(path: &str, sep: char) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut start = 0;
    for (i, c) in path.char_indices() {
        if c == sep {
            if i > start {
                out.push((start, &path[start..i]));
            }
            start = i + c.len_utf8();
        }
    }
    if start < path.len() {
        out.push((start, &path[start..]));
    }
    out
}

fn is_extension(ext: &str) -> bool {
    (2..=4).contains(&ext.len()) && ext.chars().all(|c| c.is_ascii_alphanumeric())
}

/// `Season 2`, `S02`, `Season 2009`, `specials`...
fn parse_season_dir(dir: &str) -> Option<u32> {
    if dir == "specials" {
        return Some(0);
    }
    let rest = dir
        .strip_prefix("season")
        .or_else(|| dir.strip_prefix("s"))?
        .trim_start_matches([' ', '.', '_', '-']);
    if rest.is_empty() || !rest.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    rest.parse().ok()
}

fn tokenize(stem: &str, base: usize) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut chars = stem.char_indices().peekable();
    let mut word_start: Option<usize> = None;

    fn flush<'a>(tokens: &mut Vec<Token<'a>>, stem: &'a str, base: usize, start: Option<usize>, end: usize) {
        if let Some(start) = start {
            if start < end {
                tokens.push(Token {
                    text: &stem[start..end],
                    span: base + start..base + end,
                    bracketed: false,
                });
            }
        }
    }

    while let Some((i, c)) = chars.next() {
        if SEPARATORS.contains(&c) {
            flush(&mut tokens, stem, base, word_start.take(), i);
        } else if let Some(open_idx) = OPEN_BRACKETS.iter().position(|b| *b == c) {
            flush(&mut tokens, stem, base, word_start.take(), i);
            let close = CLOSE_BRACKETS[open_idx];
            let inner_start = i + c.len_utf8();
            let mut inner_end = stem.len();
            for (j, d) in chars.by_ref() {
                if d == close {
                    inner_end = j;
                    break;
                }
            }
            tokens.push(Token {
                text: &stem[inner_start..inner_end],
                span: base + inner_start..base + inner_end,
                bracketed: true,
            });
        } else if word_start.is_none() {
            word_start = Some(i);
        }
    }
    flush(&mut tokens, stem, base, word_start.take(), stem.len());
    tokens
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    /// Collecting title words, nothing anchored yet.
    Title,
    /// An anchor was seen, free text now belongs to the episode title.
    EpisodeTitle,
    /// Release noise was seen, everything left is noise.
    Noise,
}

struct Classifier<'a> {
    path: &'a str,
    matches: Vec<Match>,
    phase: Phase,
    title_start: Option<usize>,
    title_end: usize,
    episode_title_start: Option<usize>,
    episode_title_end: usize,
    next_initiator: u32,
}

fn classify(tokens: &[Token], path: &str, out: &mut Vec<Match>) {
    let mut classifier = Classifier {
        path,
        matches: Vec::new(),
        phase: Phase::Title,
        title_start: None,
        title_end: 0,
        episode_title_start: None,
        episode_title_end: 0,
        next_initiator: 0,
    };
    classifier.run(tokens);
    out.append(&mut classifier.matches);
}

impl<'a> Classifier<'a> {
    fn run(&mut self, tokens: &[Token]) {
        let mut i = 0;
        while i < tokens.len() {
            let token = &tokens[i];
            let lowered = token.text.to_lowercase();

            if token.bracketed {
                self.flush_text(token.span.start);
                self.on_bracket(token, &lowered);
                i += 1;
                continue;
            }
            if lowered == "-" {
                // A dash splits title fragments, numbers after it are
                // episode candidates handled by the number branch.
                self.flush_text(token.span.start);
                i += 1;
                continue;
            }
            if NAME_NOISE.contains(&lowered.as_str()) || lowered.split('-').any(|p| NAME_NOISE.contains(&p)) {
                self.flush_text(token.span.start);
                self.push(Match::new(MatchValue::Noise, token.span.clone()));
                self.phase = Phase::Noise;
                i += 1;
                continue;
            }
            if let Some(consumed) = self.on_keyword(tokens, i, &lowered) {
                i += consumed;
                continue;
            }
            if let Some(marker) = parse_marker(&lowered) {
                self.flush_text(token.span.start);
                self.push_marker(marker, token);
                i += 1;
                continue;
            }
            if lowered.chars().all(|c| c.is_ascii_digit()) && !lowered.is_empty() {
                self.flush_text(token.span.start);
                self.on_number(&lowered, token);
                i += 1;
                continue;
            }
            if let Some(version) = parse_version(&lowered) {
                let anchored = self.phase != Phase::Title
                    || self
                        .matches
                        .iter()
                        .any(|m| !matches!(m.value, MatchValue::Title(_) | MatchValue::ExtraDir(_)));
                if anchored {
                    self.flush_text(token.span.start);
                    self.push(Match::new(MatchValue::Version(version), token.span.clone()));
                    i += 1;
                    continue;
                }
            }

            self.on_word(token);
            i += 1;
        }
        self.flush_text(self.path.len());
    }

    fn on_bracket(&mut self, token: &Token, lowered: &str) {
        if let Some(year) = parse_year(lowered) {
            let already = self
                .matches
                .iter()
                .any(|m| matches!(m.value, MatchValue::Year(_)));
            if !already {
                self.push(Match::new(MatchValue::Year(year), token.span.clone()));
                return;
            }
        }
        // Anime releases put the episode number alone in brackets, but only
        // once a title was seen. A numeric group before any title is a
        // release tag.
        if !lowered.is_empty() && lowered.len() <= 3 && lowered.chars().all(|c| c.is_ascii_digit())
        {
            let has_title = self
                .matches
                .iter()
                .any(|m| matches!(m.value, MatchValue::Title(_)));
            if has_title {
                self.push(Match::new(
                    MatchValue::Episode(lowered.parse().unwrap()),
                    token.span.clone(),
                ));
                self.phase = Phase::EpisodeTitle;
                return;
            }
        }
        self.push(Match::new(MatchValue::Noise, token.span.clone()));
    }

    /// `season`/`episode`/`part` keywords and their number, returns how many
    /// tokens were consumed.
    fn on_keyword(&mut self, tokens: &[Token], i: usize, lowered: &str) -> Option<usize> {
        let number_of = |token: &Token| -> Option<u32> {
            let text = token.text.to_lowercase();
            text.chars()
                .all(|c| c.is_ascii_digit())
                .then(|| text.parse().ok())
                .flatten()
        };

        match lowered {
            "season" | "staffel" | "saison" => {
                let number = tokens.get(i + 1).and_then(number_of)?;
                self.flush_text(tokens[i].span.start);
                let initiator = self.next_initiator;
                self.next_initiator += 1;
                let mut season = Match::new(MatchValue::Season(number), tokens[i + 1].span.clone());
                season.initiator = Some(initiator);
                self.push(season);
                self.phase = Phase::EpisodeTitle;

                // `Season 2 - 08` puts episodes behind dashes, they stay
                // grouped under the same initiator for the season rules.
                let mut consumed = 2;
                let mut j = i + 2;
                while j + 1 < tokens.len()
                    && tokens[j].text == "-"
                    && tokens.get(j + 1).and_then(number_of).is_some()
                {
                    let value = number_of(&tokens[j + 1]).unwrap();
                    let mut extra =
                        Match::new(MatchValue::Season(value), tokens[j + 1].span.clone());
                    extra.initiator = Some(initiator);
                    self.push(extra);
                    consumed += 2;
                    j += 2;
                }
                Some(consumed)
            }
            "episode" | "ep" => {
                let mut j = i + 1;
                // `Episode - 16` style
                if tokens.get(j).map(|t| t.text == "-").unwrap_or(false) {
                    j += 1;
                }
                let number = tokens.get(j).and_then(number_of)?;
                self.flush_text(tokens[i].span.start);
                self.push(Match::new(MatchValue::Episode(number), tokens[j].span.clone()));
                self.phase = Phase::EpisodeTitle;
                Some(j - i + 1)
            }
            "part" | "pt" | "cd" => {
                let number = tokens.get(i + 1).and_then(number_of)?;
                self.flush_text(tokens[i].span.start);
                self.push(Match::new(
                    MatchValue::Part(number),
                    tokens[i].span.start..tokens[i + 1].span.end,
                ));
                Some(2)
            }
            _ => None,
        }
    }

    fn on_number(&mut self, lowered: &str, token: &Token) {
        if let Some(year) = parse_year(lowered) {
            let already = self
                .matches
                .iter()
                .any(|m| matches!(m.value, MatchValue::Year(_)));
            if !already {
                self.push(Match::new(MatchValue::Year(year), token.span.clone()));
                return;
            }
        }
        let has_episode = self
            .matches
            .iter()
            .any(|m| matches!(m.value, MatchValue::Episode(_)));
        if self.phase == Phase::EpisodeTitle && has_episode {
            // A number after the episode anchor reads as an episode title,
            // the promotion rule decides whether it is a second episode.
            self.push(Match::new(
                MatchValue::EpisodeTitle(lowered.to_string()),
                token.span.clone(),
            ));
            return;
        }
        self.push(Match::new(
            MatchValue::Episode(lowered.parse().unwrap()),
            token.span.clone(),
        ));
        if self.phase == Phase::Title {
            self.phase = Phase::EpisodeTitle;
        }
    }

    fn push_marker(&mut self, marker: Marker, token: &Token) {
        let initiator = self.next_initiator;
        self.next_initiator += 1;
        if let Some(season) = marker.season {
            let mut m = Match::new(MatchValue::Season(season), token.span.clone());
            m.initiator = Some(initiator);
            self.push(m);
        }
        for episode in marker.episodes {
            let mut m = Match::new(MatchValue::Episode(episode), token.span.clone());
            m.initiator = Some(initiator);
            self.push(m);
        }
        self.phase = Phase::EpisodeTitle;
    }

    fn on_word(&mut self, token: &Token) {
        match self.phase {
            Phase::Title => {
                if self.title_start.is_none() {
                    self.title_start = Some(token.span.start);
                }
                self.title_end = token.span.end;
            }
            Phase::EpisodeTitle => {
                if self.episode_title_start.is_none() {
                    self.episode_title_start = Some(token.span.start);
                }
                self.episode_title_end = token.span.end;
            }
            Phase::Noise => {
                self.push(Match::new(MatchValue::Noise, token.span.clone()));
            }
        }
    }

    /// Close the pending title / episode-title accumulation before `at`.
    fn flush_text(&mut self, _at: usize) {
        if let Some(start) = self.title_start.take() {
            let text = normalize_text(&self.path[start..self.title_end]);
            self.matches
                .push(Match::new(MatchValue::Title(text), start..self.title_end));
        }
        if let Some(start) = self.episode_title_start.take() {
            let text = normalize_text(&self.path[start..self.episode_title_end]);
            self.matches.push(Match::new(
                MatchValue::EpisodeTitle(text),
                start..self.episode_title_end,
            ));
        }
    }

    fn push(&mut self, m: Match) {
        self.matches.push(m);
    }
}

/// Collapse dot/underscore separators inside a span back to spaces.
fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_space = true;
    for c in text.chars() {
        if SEPARATORS.contains(&c) {
            if !last_space {
                out.push(' ');
                last_space = true;
            }
        } else {
            out.push(c);
            last_space = false;
        }
    }
    out.trim_end().to_string()
}

struct Marker {
    season: Option<u32>,
    episodes: Vec<u32>,
}

/// `s01e02`, `s01e02e03`, `s01e23-e24`, `1x02`, `s01`, `e07`...
fn parse_marker(word: &str) -> Option<Marker> {
    if let Some(rest) = word.strip_prefix('s') {
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() || digits.len() > 4 {
            return None;
        }
        let season: u32 = digits.parse().ok()?;
        let mut tail = &rest[digits.len()..];
        if tail.is_empty() {
            return Some(Marker {
                season: Some(season),
                episodes: Vec::new(),
            });
        }
        let mut episodes = Vec::new();
        while !tail.is_empty() {
            let trimmed = tail.trim_start_matches(['-', 'x', '.']);
            let Some(after_e) = trimmed.strip_prefix('e') else {
                return None;
            };
            let digits: String = after_e.chars().take_while(|c| c.is_ascii_digit()).collect();
            if digits.is_empty() {
                return None;
            }
            episodes.push(digits.parse().ok()?);
            tail = &after_e[digits.len()..];
        }
        return Some(Marker {
            season: Some(season),
            episodes,
        });
    }
    if let Some(rest) = word.strip_prefix('e') {
        if !rest.is_empty() && rest.len() <= 4 && rest.chars().all(|c| c.is_ascii_digit()) {
            return Some(Marker {
                season: None,
                episodes: vec![rest.parse().ok()?],
            });
        }
        return None;
    }
    // NxM
    if let Some(x) = word.find('x') {
        let (season, episode) = (&word[..x], &word[x + 1..]);
        if !season.is_empty()
            && !episode.is_empty()
            && season.chars().all(|c| c.is_ascii_digit())
            && episode.chars().all(|c| c.is_ascii_digit())
        {
            return Some(Marker {
                season: Some(season.parse().ok()?),
                episodes: vec![episode.parse().ok()?],
            });
        }
    }
    None
}

/// `One Piece (1999)` as a directory name carries the show's year.
fn parse_dir_year(dir: &str) -> Option<(usize, i32)> {
    let open = dir.find('(')?;
    let close = dir[open..].find(')')? + open;
    let inner = &dir[open + 1..close];
    parse_year(inner).map(|year| (open + 1, year))
}

fn parse_year(word: &str) -> Option<i32> {
    if word.len() != 4 || !word.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let year: i32 = word.parse().ok()?;
    (1900..=2099).contains(&year).then_some(year)
}

fn parse_version(word: &str) -> Option<u32> {
    let rest = word.strip_prefix('v')?;
    if rest.is_empty() || rest.len() > 2 || !rest.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    rest.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(path: &str) -> Vec<MatchValue> {
        scan(path).into_iter().map(|m| m.value).collect()
    }

    fn find_title(path: &str) -> Option<String> {
        scan(path).into_iter().find_map(|m| match m.value {
            MatchValue::Title(t) => Some(t),
            _ => None,
        })
    }

    #[test]
    fn season_episode_markers() {
        let got = values("/s/Cyberpunk.Edgerunners.S01E02.DUBBED.1080p.WEBRip.x265-RARBG.mkv");
        assert!(got.contains(&MatchValue::Title("Cyberpunk Edgerunners".into())));
        assert!(got.contains(&MatchValue::Season(1)));
        assert!(got.contains(&MatchValue::Episode(2)));
    }

    #[test]
    fn cross_style_marker() {
        let got = values("/s/The Walking Dead 4x01.mp4");
        assert!(got.contains(&MatchValue::Title("The Walking Dead".into())));
        assert!(got.contains(&MatchValue::Season(4)));
        assert!(got.contains(&MatchValue::Episode(1)));
    }

    #[test]
    fn year_and_standalone_number() {
        let got = values("/s/One Piece (1999) 1089.mkv");
        assert!(got.contains(&MatchValue::Title("One Piece".into())));
        assert!(got.contains(&MatchValue::Year(1999)));
        assert!(got.contains(&MatchValue::Episode(1089)));
    }

    #[test]
    fn season_folder() {
        let got = values("/media/One Piece/Season 21/One Piece 1001.mkv");
        assert!(got.contains(&MatchValue::Season(21)));
        assert!(got.contains(&MatchValue::Episode(1001)));
    }

    #[test]
    fn season_dash_group_shares_initiator() {
        let matches = scan("/s/[Erai-raws] Spy x Family Season 2 - 08 [1080p].mkv");
        let seasons: Vec<_> = matches
            .iter()
            .filter(|m| matches!(m.value, MatchValue::Season(_)))
            .collect();
        assert_eq!(seasons.len(), 2);
        assert_eq!(seasons[0].value, MatchValue::Season(2));
        assert_eq!(seasons[1].value, MatchValue::Season(8));
        assert_eq!(seasons[0].initiator, seasons[1].initiator);
        assert!(seasons[0].initiator.is_some());
    }

    #[test]
    fn version_and_part() {
        let got = values("/m/Mad Max (1979) part 2 v2.mkv");
        assert!(got.contains(&MatchValue::Part(2)));
        assert!(got.contains(&MatchValue::Version(2)));
    }

    #[test]
    fn multi_episode_marker() {
        let got = values("/s/Elementary - S01E23-E24.mkv");
        assert!(got.contains(&MatchValue::Season(1)));
        assert!(got.contains(&MatchValue::Episode(23)));
        assert!(got.contains(&MatchValue::Episode(24)));
    }

    #[test]
    fn extras_folder() {
        let got = values("/m/Inception (2010)/Trailers/teaser.mkv");
        assert!(got.contains(&MatchValue::ExtraDir(ExtraKind::Trailer)));
    }

    #[test]
    fn dashed_title_produces_two_fragments() {
        let titles: Vec<_> = scan("/s/Demon Slayer - Kimetsu no Yaiba - S04E10 - Love Hashira.mkv")
            .into_iter()
            .filter(|m| matches!(m.value, MatchValue::Title(_)))
            .collect();
        assert_eq!(titles.len(), 2);
    }

    #[test]
    fn movie_with_noise() {
        assert_eq!(
            find_title("/m/Aladdin.WEB-DL.KP.1080p-SOFCJ.mkv").as_deref(),
            Some("Aladdin")
        );
    }

    #[test]
    fn bracket_episode_number() {
        let got = values("/s/[VCB-Studio] Re Zero kara Hajimeru Isekai Seikatsu [21][1080p].mkv");
        assert!(got.contains(&MatchValue::Episode(21)));
        assert!(got.contains(&MatchValue::Title("Re Zero kara Hajimeru Isekai Seikatsu".into())));
    }
}
