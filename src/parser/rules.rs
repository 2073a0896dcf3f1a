//! Post-process rules applied to the raw engine matches, in a fixed order.
//! Each rule mirrors a quirk of real-world release names.

use crate::models::clean;

use super::engine::{Match, MatchValue};

pub struct RuleContext<'a> {
    pub path: &'a str,
    /// Cleaned titles known to the xem mapping (see
    /// [`crate::providers::thexem`]). Used to glue titles the engine split.
    pub expected_titles: &'a [String],
}

pub fn apply(matches: &mut Vec<Match>, ctx: &RuleContext) {
    unlist_titles(matches, ctx);
    episode_title_promotion(matches);
    title_number_fixup(matches, ctx);
    multiple_season_rule(matches);
    xem_fixup(matches, ctx);
    season_year_dedup(matches);
    matches.sort_by_key(|m| m.span.start);
}

fn gap<'a>(ctx: &RuleContext<'a>, end: usize, start: usize) -> &'a str {
    if end <= start && start <= ctx.path.len() {
        &ctx.path[end..start]
    } else {
        ""
    }
}

/// Join several adjacent title fragments into one, keeping dashed separators
/// as ` - `. Fragments that are not adjacent to the running title are
/// dropped with a warning.
fn unlist_titles(matches: &mut Vec<Match>, ctx: &RuleContext) {
    let title_positions: Vec<usize> = matches
        .iter()
        .enumerate()
        .filter(|(_, m)| matches!(m.value, MatchValue::Title(_)))
        .map(|(i, _)| i)
        .collect();
    if title_positions.len() <= 1 {
        return;
    }

    let first = title_positions[0];
    let mut merged = matches[first].clone();
    let mut last_merged = first;
    let mut dropped = Vec::new();

    for &pos in &title_positions[1..] {
        if pos == last_merged + 1 {
            let joiner = if gap(ctx, merged.span.end, matches[pos].span.start).contains('-') {
                " - "
            } else {
                " "
            };
            if let (MatchValue::Title(acc), MatchValue::Title(next)) =
                (&mut merged.value, &matches[pos].value)
            {
                acc.push_str(joiner);
                acc.push_str(next);
            }
            merged.span.end = matches[pos].span.end;
            last_merged = pos;
        } else if let MatchValue::Title(extra) = &matches[pos].value {
            tracing::warn!("Ignoring potential part of title: {extra}");
        }
        dropped.push(pos);
    }

    for pos in dropped.into_iter().rev() {
        matches.remove(pos);
    }
    matches[first] = merged;
}

/// A purely numeric episode title is really an episode number.
fn episode_title_promotion(matches: &mut [Match]) {
    for m in matches.iter_mut() {
        if let MatchValue::EpisodeTitle(text) = &m.value {
            if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
                m.value = MatchValue::Episode(text.parse().unwrap());
            }
        }
    }
}

/// `Zom 100 Bucket List of the Dead - 05`: the engine reads `100` as an
/// episode glued to the title. When another episode match makes that number
/// redundant, fold it (and any hole text before a dash) back into the title.
fn title_number_fixup(matches: &mut Vec<Match>, ctx: &RuleContext) {
    let Some(title_pos) = matches
        .iter()
        .position(|m| matches!(m.value, MatchValue::Title(_)))
    else {
        return;
    };
    let episode_pos = title_pos + 1;
    let Some(MatchValue::Episode(_)) = matches.get(episode_pos).map(|m| &m.value) else {
        return;
    };

    let anchors = matches
        .iter()
        .enumerate()
        .filter(|(i, m)| {
            *i != episode_pos
                && matches!(m.value, MatchValue::Episode(_) | MatchValue::Season(_))
        })
        .count();
    if anchors == 0 {
        return;
    }
    let separator = gap(
        ctx,
        matches[title_pos].span.end,
        matches[episode_pos].span.start,
    );
    if separator.contains('-') {
        return;
    }

    let number_text = ctx.path[matches[episode_pos].span.clone()].to_string();
    let episode_end = matches[episode_pos].span.end;
    {
        let title = &mut matches[title_pos];
        if let MatchValue::Title(text) = &mut title.value {
            text.push(' ');
            text.push_str(&number_text);
        }
        title.span.end = episode_end;
    }
    matches.remove(episode_pos);

    // Hole text between the number and a dash belongs to the title too.
    let hole_pos = episode_pos;
    let Some(hole) = matches.get(hole_pos) else {
        return;
    };
    if !matches!(hole.value, MatchValue::EpisodeTitle(_)) {
        return;
    }
    let before = gap(ctx, matches[title_pos].span.end, hole.span.start);
    let after_start = hole.span.end;
    let after_end = matches
        .get(hole_pos + 1)
        .map(|m| m.span.start)
        .unwrap_or(ctx.path.len());
    if before.contains('-') || !gap(ctx, after_start, after_end).contains('-') {
        return;
    }
    let hole = matches.remove(hole_pos);
    if let (MatchValue::Title(text), MatchValue::EpisodeTitle(extra)) =
        (&mut matches[title_pos].value, &hole.value)
    {
        text.push(' ');
        text.push_str(extra);
    }
    matches[title_pos].span.end = hole.span.end;
}

/// `Season 2 - 08` expands into several season values from one source
/// region: the first one is the real season, the rest are episodes.
fn multiple_season_rule(matches: &mut [Match]) {
    let seasons: Vec<usize> = matches
        .iter()
        .enumerate()
        .filter(|(_, m)| matches!(m.value, MatchValue::Season(_)))
        .map(|(i, _)| i)
        .collect();
    if seasons.len() < 2 {
        return;
    }
    let initiator = matches[seasons[0]].initiator;
    if initiator.is_none()
        || seasons
            .iter()
            .any(|&pos| matches[pos].initiator != initiator)
    {
        return;
    }
    for &pos in &seasons[1..] {
        if let MatchValue::Season(value) = matches[pos].value {
            matches[pos].value = MatchValue::Episode(value);
        }
    }
}

/// Some shows are only known to the xem mapping under `title + next match`
/// (e.g. a trailing number the engine took for something else). When the
/// combined form is an expected title, merge the two matches.
fn xem_fixup(matches: &mut Vec<Match>, ctx: &RuleContext) {
    if ctx.expected_titles.is_empty() {
        return;
    }
    let Some(title_pos) = matches
        .iter()
        .position(|m| matches!(m.value, MatchValue::Title(_)))
    else {
        return;
    };
    let next_pos = title_pos + 1;
    let next_text = match matches.get(next_pos).map(|m| &m.value) {
        Some(MatchValue::Title(text)) => text.clone(),
        Some(MatchValue::Season(_)) | Some(MatchValue::Episode(_)) => {
            ctx.path[matches[next_pos].span.clone()].to_string()
        }
        _ => return,
    };
    let MatchValue::Title(title) = &matches[title_pos].value else {
        return;
    };
    let candidate = clean(&format!("{title} {next_text}"));
    if !ctx.expected_titles.iter().any(|t| *t == candidate) {
        return;
    }

    let end = matches[next_pos].span.end;
    matches.remove(next_pos);
    if let MatchValue::Title(text) = &mut matches[title_pos].value {
        text.push(' ');
        text.push_str(&next_text);
    }
    matches[title_pos].span.end = end;
}

/// A lone season equal to the lone year is the show's year, not a season.
fn season_year_dedup(matches: &mut Vec<Match>) {
    let seasons: Vec<usize> = matches
        .iter()
        .enumerate()
        .filter(|(_, m)| matches!(m.value, MatchValue::Season(_)))
        .map(|(i, _)| i)
        .collect();
    let years: Vec<i64> = matches
        .iter()
        .filter_map(|m| match m.value {
            MatchValue::Year(y) => Some(y as i64),
            _ => None,
        })
        .collect();
    if seasons.len() == 1 && years.len() == 1 {
        if let MatchValue::Season(season) = matches[seasons[0]].value {
            if season as i64 == years[0] {
                matches.remove(seasons[0]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::engine::scan;

    fn apply_to(path: &str, expected_titles: &[String]) -> Vec<Match> {
        let mut matches = scan(path);
        apply(
            &mut matches,
            &RuleContext {
                path,
                expected_titles,
            },
        );
        matches
    }

    fn title(matches: &[Match]) -> Option<&str> {
        matches.iter().find_map(|m| match &m.value {
            MatchValue::Title(t) => Some(t.as_str()),
            _ => None,
        })
    }

    fn episodes(matches: &[Match]) -> Vec<u32> {
        matches
            .iter()
            .filter_map(|m| match m.value {
                MatchValue::Episode(e) => Some(e),
                _ => None,
            })
            .collect()
    }

    fn seasons(matches: &[Match]) -> Vec<u32> {
        matches
            .iter()
            .filter_map(|m| match m.value {
                MatchValue::Season(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn unlist_titles_joins_with_dash() {
        let matches = apply_to(
            "/s/Demon Slayer - Kimetsu no Yaiba - S04E10 - Love Hashira.mkv",
            &[],
        );
        assert_eq!(title(&matches), Some("Demon Slayer - Kimetsu no Yaiba"));
        assert_eq!(seasons(&matches), vec![4]);
        assert_eq!(episodes(&matches), vec![10]);
    }

    #[test]
    fn multiple_season_becomes_episode() {
        let matches = apply_to("/s/[Erai-raws] Spy x Family Season 2 - 08 [1080p].mkv", &[]);
        assert_eq!(title(&matches), Some("Spy x Family"));
        assert_eq!(seasons(&matches), vec![2]);
        assert_eq!(episodes(&matches), vec![8]);
    }

    #[test]
    fn season_year_dedup_drops_season() {
        let matches = apply_to("/s/One Piece (1999)/Season 1999/One Piece - 152.mkv", &[]);
        assert_eq!(seasons(&matches), Vec::<u32>::new());
        assert_eq!(episodes(&matches), vec![152]);
    }

    #[test]
    fn year_is_not_an_episode() {
        let matches = apply_to("/s/One Piece (1999) 1089.mkv", &[]);
        assert_eq!(seasons(&matches), Vec::<u32>::new());
        assert_eq!(episodes(&matches), vec![1089]);
        assert!(matches
            .iter()
            .any(|m| m.value == MatchValue::Year(1999)));
    }

    #[test]
    fn title_number_fixup_reclaims_glued_number() {
        let matches = apply_to("/s/Zom 100 Bucket List of the Dead - 05.mkv", &[]);
        assert_eq!(title(&matches), Some("Zom 100 Bucket List of the Dead"));
        assert_eq!(episodes(&matches), vec![5]);
    }

    #[test]
    fn title_number_fixup_without_hole() {
        let matches = apply_to("/s/Log Horizon 2 - 03.mkv", &[]);
        assert_eq!(title(&matches), Some("Log Horizon 2"));
        assert_eq!(episodes(&matches), vec![3]);
    }

    #[test]
    fn plain_episode_title_is_not_absorbed() {
        let matches = apply_to("/s/Breaking Bad - 05 Gray Matter.mkv", &[]);
        assert_eq!(title(&matches), Some("Breaking Bad"));
        assert_eq!(episodes(&matches), vec![5]);
    }

    #[test]
    fn numeric_episode_title_is_promoted() {
        let matches = apply_to("/s/The Simpsons 5 - 02 - Ep Name.mkv", &[]);
        assert_eq!(title(&matches), Some("The Simpsons 5"));
        assert_eq!(episodes(&matches), vec![2]);
    }

    #[test]
    fn xem_fixup_merges_expected_title() {
        // A trailing number with no other anchor would read as an episode,
        // unless the xem mapping knows the combined title.
        let expected = vec![clean("Mobile Suit Gundam 00")];
        let matches = apply_to("/s/Mobile Suit Gundam 00.mkv", &expected);
        assert_eq!(title(&matches), Some("Mobile Suit Gundam 00"));
        assert_eq!(episodes(&matches), Vec::<u32>::new());
    }

    #[test]
    fn xem_fixup_requires_known_title() {
        let matches = apply_to("/s/Mobile Suit Gundam 00.mkv", &[]);
        assert_eq!(title(&matches), Some("Mobile Suit Gundam"));
        assert_eq!(episodes(&matches), vec![0]);
    }
}
