use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Client, Method, Request, Url,
};
use serde::Deserialize;

use crate::cache::Cache;
use crate::models::{
    collection::{Collection, CollectionTranslation},
    entry::{Entry, EntryKind},
    genre::Genre,
    metadata_id::{EntryId, EpisodeId, MetadataId, SeasonId},
    movie::{Movie, MovieStatus, MovieTranslation, SearchMovie},
    season::{Season, SeasonTranslation},
    serie::{SearchSerie, Serie, SerieStatus, SerieTranslation},
    studio::{Studio, StudioTranslation},
    to_slug,
};

use super::{
    parse_date, rank_search, request_client::LimitedRequestClient, MetadataProvider,
    ProviderError, SearchScore,
};

const CACHE_TTL: Duration = Duration::from_secs(60 * 60 * 24);

/// A group must hold at least this share of all episodes to be trusted as
/// the absolute ordering.
const ABSOLUTE_GROUP_THRESHOLD: f64 = 0.75;

#[derive(Debug)]
pub struct TheMovieDatabase {
    client: LimitedRequestClient,
    base_url: Url,
    movie_cache: Cache<String, Movie>,
    serie_cache: Cache<(String, bool), Serie>,
    collection_cache: Cache<String, Collection>,
    search_movie_cache: Cache<(String, Option<i32>), Vec<SearchMovie>>,
    search_serie_cache: Cache<(String, Option<i32>), Vec<SearchSerie>>,
}

impl TheMovieDatabase {
    pub const NAME: &'static str = "themoviedatabase";
    const API_URL: &'static str = "https://api.themoviedb.org/3";
    const IMAGE_BASE: &'static str = "https://image.tmdb.org/t/p/original";
    const RATE_LIMIT: usize = 20;

    pub fn new(access_token: &str) -> Self {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {access_token}"))
                .expect("token to be a valid header"),
        );
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .expect("client to build");
        Self {
            client: LimitedRequestClient::new(client, Self::RATE_LIMIT, Duration::from_secs(1)),
            base_url: Url::parse(Self::API_URL).expect("url to parse"),
            movie_cache: Cache::new(CACHE_TTL),
            serie_cache: Cache::new(CACHE_TTL),
            collection_cache: Cache::new(CACHE_TTL),
            search_movie_cache: Cache::new(CACHE_TTL),
            search_serie_cache: Cache::new(CACHE_TTL),
        }
    }

    fn url(&self, segments: &[&str], query: &[(&str, String)]) -> Url {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .expect("base url to be a base")
            .extend(segments);
        url.query_pairs_mut().extend_pairs(query);
        url
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
        not_found: Option<&str>,
    ) -> Result<T, ProviderError> {
        let req = Request::new(Method::GET, self.url(segments, query));
        self.client.request(req, not_found).await
    }

    fn image(path: &Option<String>) -> Option<String> {
        path.as_ref().map(|p| format!("{}{p}", Self::IMAGE_BASE))
    }

    /// Best image for a language: sorted by `(vote_average, width)`, the
    /// requested language first, then textless (language-null), then any.
    fn pick_image(images: &[TmdbImage], language: &str) -> Option<String> {
        let mut sorted: Vec<&TmdbImage> = images.iter().collect();
        sorted.sort_by(|a, b| {
            (b.vote_average, b.width)
                .partial_cmp(&(a.vote_average, a.width))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        sorted
            .iter()
            .find(|i| i.iso_639_1.as_deref() == Some(language))
            .or_else(|| sorted.iter().find(|i| i.iso_639_1.is_none()))
            .or_else(|| sorted.first())
            .map(|i| format!("{}{}", Self::IMAGE_BASE, i.file_path))
    }

    fn map_genres(ids: &[u64]) -> Vec<Genre> {
        let mut out = Vec::new();
        for id in ids {
            match id {
                28 => out.push(Genre::Action),
                12 => out.push(Genre::Adventure),
                16 => out.push(Genre::Animation),
                35 => out.push(Genre::Comedy),
                80 => out.push(Genre::Crime),
                99 => out.push(Genre::Documentary),
                18 => out.push(Genre::Drama),
                10751 => out.push(Genre::Family),
                14 => out.push(Genre::Fantasy),
                36 => out.push(Genre::History),
                27 => out.push(Genre::Horror),
                10402 => out.push(Genre::Music),
                9648 => out.push(Genre::Mystery),
                10749 => out.push(Genre::Romance),
                878 => out.push(Genre::ScienceFiction),
                53 => out.push(Genre::Thriller),
                10752 => out.push(Genre::War),
                37 => out.push(Genre::Western),
                10759 => out.extend([Genre::Action, Genre::Adventure]),
                10762 => out.push(Genre::Kids),
                10764 => out.push(Genre::Reality),
                10765 => out.extend([Genre::ScienceFiction, Genre::Fantasy]),
                10766 => out.push(Genre::Soap),
                10767 => out.push(Genre::Talk),
                10768 => out.extend([Genre::War, Genre::Politics]),
                _ => {}
            }
        }
        out
    }

    fn map_studio(company: &TmdbCompany) -> Studio {
        Studio {
            slug: to_slug(&company.name),
            external_id: HashMap::from([(
                Self::NAME.to_string(),
                MetadataId::with_link(
                    company.id,
                    format!("https://www.themoviedb.org/company/{}", company.id),
                ),
            )]),
            translations: HashMap::from([(
                "en".to_string(),
                StudioTranslation {
                    name: company.name.clone(),
                    logo: Self::image(&company.logo_path),
                },
            )]),
        }
    }

    fn own_id(&self, external_id: &HashMap<String, String>) -> Option<String> {
        external_id.get(Self::NAME).cloned()
    }

    async fn fetch_movie(&self, id: &str) -> Result<Movie, ProviderError> {
        let movie: TmdbMovie = self
            .get(
                &["movie", id],
                &[(
                    "append_to_response",
                    "alternative_titles,keywords,images,translations".to_string(),
                )],
                Some(&format!("no movie with themoviedatabase id {id}")),
            )
            .await?;

        let mut external_id = HashMap::from([(
            Self::NAME.to_string(),
            MetadataId::with_link(movie.id, format!("https://www.themoviedb.org/movie/{}", movie.id)),
        )]);
        if let Some(imdb) = &movie.imdb_id {
            external_id.insert(
                "imdb".to_string(),
                MetadataId::with_link(imdb, format!("https://www.imdb.com/title/{imdb}")),
            );
        }

        let collections = match &movie.belongs_to_collection {
            Some(collection) => vec![self.fetch_collection(&collection.id.to_string()).await?],
            None => Vec::new(),
        };

        let translations = movie
            .translations
            .translations
            .iter()
            .map(|trans| {
                let lang = trans.tag();
                let name = trans
                    .data
                    .title
                    .clone()
                    .filter(|t| !t.is_empty())
                    .or_else(|| {
                        (movie.original_language == trans.iso_639_1)
                            .then(|| movie.original_title.clone())
                    })
                    .unwrap_or_else(|| movie.title.clone());
                let alternative = |kind: Option<&str>| -> Vec<String> {
                    movie
                        .alternative_titles
                        .titles
                        .iter()
                        .filter(|t| {
                            t.iso_3166_1 == trans.iso_3166_1
                                && kind.map(|k| t.title_type.as_deref() == Some(k)).unwrap_or(true)
                        })
                        .map(|t| t.title.clone())
                        .collect()
                };
                let translation = MovieTranslation {
                    name,
                    latin_name: alternative(Some("Romaji")).into_iter().next(),
                    description: trans.data.overview.clone().filter(|o| !o.is_empty()),
                    tagline: trans.data.tagline.clone().filter(|t| !t.is_empty()),
                    aliases: alternative(None),
                    tags: movie
                        .keywords
                        .keywords
                        .iter()
                        .map(|k| k.name.clone())
                        .collect(),
                    poster: Self::pick_image(&movie.images.posters, &trans.iso_639_1),
                    thumbnail: Self::pick_image(&movie.images.backdrops, &trans.iso_639_1),
                    banner: None,
                    logo: Self::pick_image(&movie.images.logos, &trans.iso_639_1),
                    trailer: None,
                };
                (lang, translation)
            })
            .collect();

        Ok(Movie {
            slug: to_slug(&movie.title),
            original_language: Some(movie.original_language.clone()),
            genres: Self::map_genres(&movie.genres.iter().map(|g| g.id).collect::<Vec<_>>()),
            rating: Some((movie.vote_average * 10.0).round() as i32),
            status: if movie.status.as_deref() == Some("Released") {
                MovieStatus::Finished
            } else {
                MovieStatus::Planned
            },
            runtime: movie.runtime,
            air_date: parse_date(movie.release_date.as_deref()),
            external_id,
            translations,
            collections,
            studios: movie.production_companies.iter().map(Self::map_studio).collect(),
            videos: Vec::new(),
        })
    }

    async fn fetch_collection(&self, id: &str) -> Result<Collection, ProviderError> {
        self.collection_cache
            .get_or_fill(id.to_string(), || async {
                let collection: TmdbCollection = self
                    .get(
                        &["collection", id],
                        &[("append_to_response", "images,translations".to_string())],
                        Some(&format!("no collection with themoviedatabase id {id}")),
                    )
                    .await?;
                let rating = {
                    let parts = &collection.parts;
                    if parts.is_empty() {
                        None
                    } else {
                        let mean = parts.iter().map(|p| p.vote_average * 10.0).sum::<f64>()
                            / parts.len() as f64;
                        Some(mean.round() as i32)
                    }
                };
                let translations = collection
                    .translations
                    .translations
                    .iter()
                    .map(|trans| {
                        (
                            trans.tag(),
                            CollectionTranslation {
                                name: trans
                                    .data
                                    .title
                                    .clone()
                                    .filter(|t| !t.is_empty())
                                    .unwrap_or_else(|| collection.name.clone()),
                                latin_name: None,
                                description: trans.data.overview.clone().filter(|o| !o.is_empty()),
                                tagline: None,
                                aliases: Vec::new(),
                                tags: Vec::new(),
                                poster: Self::pick_image(&collection.images.posters, &trans.iso_639_1),
                                thumbnail: Self::pick_image(
                                    &collection.images.backdrops,
                                    &trans.iso_639_1,
                                ),
                                banner: None,
                                logo: None,
                            },
                        )
                    })
                    .collect();
                Ok(Collection {
                    slug: to_slug(&collection.name),
                    original_language: collection
                        .parts
                        .first()
                        .map(|p| p.original_language.clone()),
                    genres: Self::map_genres(
                        &collection
                            .parts
                            .iter()
                            .flat_map(|p| p.genre_ids.clone())
                            .collect::<Vec<_>>(),
                    ),
                    rating,
                    external_id: HashMap::from([(
                        Self::NAME.to_string(),
                        MetadataId::with_link(
                            &collection.id.to_string(),
                            format!("https://www.themoviedb.org/collection/{}", collection.id),
                        ),
                    )]),
                    translations,
                })
            })
            .await
    }

    async fn fetch_serie(&self, id: &str, skip_entries: bool) -> Result<Serie, ProviderError> {
        let serie: TmdbSerie = self
            .get(
                &["tv", id],
                &[(
                    "append_to_response",
                    "alternative_titles,keywords,images,translations,external_ids".to_string(),
                )],
                Some(&format!("no serie with themoviedatabase id {id}")),
            )
            .await?;

        let mut external_id = HashMap::from([(
            Self::NAME.to_string(),
            MetadataId::with_link(serie.id, format!("https://www.themoviedb.org/tv/{}", serie.id)),
        )]);
        if let Some(imdb) = serie.external_ids.imdb_id.as_deref().filter(|v| !v.is_empty()) {
            external_id.insert(
                "imdb".to_string(),
                MetadataId::with_link(imdb, format!("https://www.imdb.com/title/{imdb}")),
            );
        }
        if let Some(tvdb) = serie.external_ids.tvdb_id {
            external_id.insert("tvdb".to_string(), MetadataId::new(tvdb));
        }

        let seasons = serie
            .seasons
            .iter()
            .map(|season| Season {
                season_number: season.season_number,
                start_air: parse_date(season.air_date.as_deref()),
                end_air: None,
                external_id: HashMap::from([(
                    Self::NAME.to_string(),
                    SeasonId {
                        serie_id: serie.id.to_string(),
                        season: season.season_number,
                    },
                )]),
                translations: HashMap::from([(
                    serie.original_language.clone(),
                    SeasonTranslation {
                        name: Some(season.name.clone()),
                        description: season.overview.clone().filter(|o| !o.is_empty()),
                        poster: Self::image(&season.poster_path),
                        thumbnail: None,
                        banner: None,
                    },
                )]),
            })
            .collect();

        let entries = if skip_entries {
            Vec::new()
        } else {
            self.fetch_entries(&serie).await?
        };

        let translations = serie
            .translations
            .translations
            .iter()
            .map(|trans| {
                let name = trans
                    .data
                    .name
                    .clone()
                    .filter(|n| !n.is_empty())
                    .or_else(|| {
                        (serie.original_language == trans.iso_639_1)
                            .then(|| serie.original_name.clone())
                    })
                    .unwrap_or_else(|| serie.name.clone());
                let translation = SerieTranslation {
                    name,
                    latin_name: serie
                        .alternative_titles
                        .results
                        .iter()
                        .find(|t| {
                            t.iso_3166_1 == trans.iso_3166_1
                                && t.title_type.as_deref() == Some("Romaji")
                        })
                        .map(|t| t.title.clone()),
                    description: trans.data.overview.clone().filter(|o| !o.is_empty()),
                    tagline: trans.data.tagline.clone().filter(|t| !t.is_empty()),
                    aliases: serie
                        .alternative_titles
                        .results
                        .iter()
                        .filter(|t| t.iso_3166_1 == trans.iso_3166_1)
                        .map(|t| t.title.clone())
                        .collect(),
                    tags: serie
                        .keywords
                        .results
                        .iter()
                        .map(|k| k.name.clone())
                        .collect(),
                    poster: Self::pick_image(&serie.images.posters, &trans.iso_639_1),
                    thumbnail: Self::pick_image(&serie.images.backdrops, &trans.iso_639_1),
                    banner: None,
                    logo: Self::pick_image(&serie.images.logos, &trans.iso_639_1),
                    trailer: None,
                };
                (trans.tag(), translation)
            })
            .collect();

        Ok(Serie {
            slug: to_slug(&serie.name),
            original_language: Some(serie.original_language.clone()),
            genres: Self::map_genres(&serie.genres.iter().map(|g| g.id).collect::<Vec<_>>()),
            rating: Some((serie.vote_average * 10.0).round() as i32),
            status: match serie.status.as_deref() {
                Some("Ended") | Some("Canceled") => SerieStatus::Finished,
                _ if serie.in_production => SerieStatus::Airing,
                _ => SerieStatus::Planned,
            },
            runtime: None,
            start_air: parse_date(serie.first_air_date.as_deref()),
            end_air: parse_date(serie.last_air_date.as_deref()),
            external_id,
            translations,
            seasons,
            entries,
            extra: Vec::new(),
            collections: Vec::new(),
            studios: serie.production_companies.iter().map(Self::map_studio).collect(),
        })
    }

    /// Fetch every season's episodes in parallel and lay them out in
    /// absolute order.
    async fn fetch_entries(&self, serie: &TmdbSerie) -> Result<Vec<Entry>, ProviderError> {
        let serie_id = serie.id.to_string();
        let numbers: Vec<u32> = serie
            .seasons
            .iter()
            .map(|s| s.season_number)
            .filter(|n| *n != 0)
            .collect();
        let fetches = numbers.iter().map(|number| {
            let serie_id = serie_id.clone();
            async move {
                let season: TmdbSeasonDetail = self
                    .get(
                        &["tv", &serie_id, "season", &number.to_string()],
                        &[],
                        Some(&format!("no season {number} for serie {serie_id}")),
                    )
                    .await?;
                Ok::<_, ProviderError>(season.episodes)
            }
        });
        let episodes: Vec<TmdbEpisode> = futures::future::try_join_all(fetches)
            .await?
            .into_iter()
            .flatten()
            .collect();

        let order = self.absolute_order(&serie_id, &episodes).await;

        let lang = &serie.original_language;
        let entries = order
            .iter()
            .enumerate()
            .filter_map(|(index, (season, episode))| {
                let found = episodes
                    .iter()
                    .find(|e| e.season_number == *season && e.episode_number == *episode)?;
                Some(Entry {
                    kind: EntryKind::Episode,
                    order: index as f64 + 1.0,
                    runtime: found.runtime,
                    air_date: parse_date(found.air_date.as_deref()),
                    thumbnail: Self::image(&found.still_path),
                    slug: None,
                    season_number: Some(*season),
                    episode_number: Some(*episode),
                    number: Some(*episode),
                    external_id: HashMap::from([(
                        Self::NAME.to_string(),
                        EntryId::Episode(EpisodeId {
                            serie_id: serie_id.clone(),
                            season: Some(*season),
                            episode: *episode,
                            link: Some(format!(
                                "https://www.themoviedb.org/tv/{serie_id}/season/{season}/episode/{episode}"
                            )),
                        }),
                    )]),
                    translations: HashMap::from([(
                        lang.clone(),
                        crate::models::entry::EntryTranslation {
                            name: Some(found.name.clone()),
                            description: found.overview.clone().filter(|o| !o.is_empty()),
                            tagline: None,
                            poster: None,
                        },
                    )]),
                    videos: Vec::new(),
                })
            })
            .collect();
        Ok(entries)
    }

    /// Absolute ordering from "episode groups" of type 2, completed with any
    /// episode the group misses in ascending (season, episode) order.
    async fn absolute_order(
        &self,
        serie_id: &str,
        episodes: &[TmdbEpisode],
    ) -> Vec<(u32, u32)> {
        let mut order = match self.fetch_absolute_group(serie_id).await {
            Ok(order) => order,
            Err(e) => {
                tracing::warn!("Could not retrieve absolute ordering for {serie_id}: {e}");
                Vec::new()
            }
        };

        let mut missing: Vec<(u32, u32)> = episodes
            .iter()
            .map(|e| (e.season_number, e.episode_number))
            .filter(|pair| !order.contains(pair))
            .collect();
        if !order.is_empty() && !missing.is_empty() {
            tracing::warn!(
                "Incomplete absolute group for serie {serie_id}, appending {} episodes in (season, episode) order",
                missing.len()
            );
        }
        missing.sort_unstable();
        order.extend(missing);
        order
    }

    async fn fetch_absolute_group(&self, serie_id: &str) -> Result<Vec<(u32, u32)>, ProviderError> {
        let groups: TmdbEpisodeGroups = self
            .get(&["tv", serie_id, "episode_groups"], &[], None)
            .await?;
        let total = groups
            .results
            .iter()
            .map(|g| g.episode_count)
            .max()
            .unwrap_or(0);
        if total == 0 {
            return Ok(Vec::new());
        }
        // Several groups can pass the threshold, the largest one wins.
        let best = groups
            .results
            .iter()
            .filter(|g| g.group_type == 2)
            .filter(|g| g.episode_count as f64 >= total as f64 * ABSOLUTE_GROUP_THRESHOLD)
            .max_by_key(|g| g.episode_count);
        let Some(best) = best else {
            return Ok(Vec::new());
        };
        let group: TmdbEpisodeGroupDetail = self
            .get(&["tv", "episode_group", &best.id], &[], None)
            .await?;
        let mut subgroups = group.groups;
        subgroups.sort_by_key(|g| g.order);
        let mut out = Vec::new();
        for sub in subgroups {
            // Some shows lead with their specials as an absolute group.
            if sub.name == "Specials" {
                continue;
            }
            let mut episodes = sub.episodes;
            episodes.sort_by_key(|e| e.order);
            out.extend(
                episodes
                    .into_iter()
                    .map(|e| (e.season_number, e.episode_number)),
            );
        }
        Ok(out)
    }
}

#[async_trait]
impl MetadataProvider for TheMovieDatabase {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn search_movies(
        &self,
        title: &str,
        year: Option<i32>,
        _languages: &[String],
    ) -> Result<Vec<SearchMovie>, ProviderError> {
        self.search_movie_cache
            .get_or_fill((title.to_string(), year), || async {
                let mut query = vec![("query", title.to_string())];
                if let Some(year) = year {
                    query.push(("year", year.to_string()));
                }
                let results: TmdbSearch<TmdbSearchMovie> =
                    self.get(&["search", "movie"], &query, None).await?;
                let ranked = rank_search(results.results, title, year, |r| SearchScore {
                    name: r.title.clone(),
                    year: parse_date(r.release_date.as_deref()).map(|d| d.year()),
                    vote_count: r.vote_count,
                    popularity: r.popularity,
                });
                Ok(ranked
                    .into_iter()
                    .map(|r| SearchMovie {
                        slug: to_slug(&r.title),
                        name: r.title.clone(),
                        description: r.overview.clone().filter(|o| !o.is_empty()),
                        air_date: parse_date(r.release_date.as_deref()),
                        poster: Self::image(&r.poster_path),
                        original_language: Some(r.original_language),
                        external_id: HashMap::from([(
                            Self::NAME.to_string(),
                            MetadataId::with_link(
                                r.id,
                                format!("https://www.themoviedb.org/movie/{}", r.id),
                            ),
                        )]),
                    })
                    .collect())
            })
            .await
    }

    async fn search_series(
        &self,
        title: &str,
        year: Option<i32>,
        _languages: &[String],
    ) -> Result<Vec<SearchSerie>, ProviderError> {
        self.search_serie_cache
            .get_or_fill((title.to_string(), year), || async {
                let mut query = vec![("query", title.to_string())];
                if let Some(year) = year {
                    query.push(("first_air_date_year", year.to_string()));
                }
                let results: TmdbSearch<TmdbSearchSerie> =
                    self.get(&["search", "tv"], &query, None).await?;
                let ranked = rank_search(results.results, title, year, |r| SearchScore {
                    name: r.name.clone(),
                    year: parse_date(r.first_air_date.as_deref()).map(|d| d.year()),
                    vote_count: r.vote_count,
                    popularity: r.popularity,
                });
                Ok(ranked
                    .into_iter()
                    .map(|r| SearchSerie {
                        slug: to_slug(&r.name),
                        name: r.name.clone(),
                        description: r.overview.clone().filter(|o| !o.is_empty()),
                        start_air: parse_date(r.first_air_date.as_deref()),
                        end_air: None,
                        poster: Self::image(&r.poster_path),
                        original_language: Some(r.original_language),
                        external_id: HashMap::from([(
                            Self::NAME.to_string(),
                            MetadataId::with_link(
                                r.id,
                                format!("https://www.themoviedb.org/tv/{}", r.id),
                            ),
                        )]),
                    })
                    .collect())
            })
            .await
    }

    async fn get_movie(
        &self,
        external_id: &HashMap<String, String>,
    ) -> Result<Option<Movie>, ProviderError> {
        let Some(id) = self.own_id(external_id) else {
            return Ok(None);
        };
        self.movie_cache
            .get_or_fill(id.clone(), || self.fetch_movie(&id))
            .await
            .map(Some)
    }

    async fn get_serie(
        &self,
        external_id: &HashMap<String, String>,
        skip_entries: bool,
    ) -> Result<Option<Serie>, ProviderError> {
        let Some(id) = self.own_id(external_id) else {
            return Ok(None);
        };
        self.serie_cache
            .get_or_fill((id.clone(), skip_entries), || {
                self.fetch_serie(&id, skip_entries)
            })
            .await
            .map(Some)
    }
}

// Types

#[derive(Debug, Clone, Deserialize)]
struct TmdbSearch<T> {
    results: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
struct TmdbSearchMovie {
    id: u64,
    title: String,
    overview: Option<String>,
    release_date: Option<String>,
    poster_path: Option<String>,
    original_language: String,
    vote_count: u64,
    popularity: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct TmdbSearchSerie {
    id: u64,
    name: String,
    overview: Option<String>,
    first_air_date: Option<String>,
    poster_path: Option<String>,
    original_language: String,
    vote_count: u64,
    popularity: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct TmdbGenreRef {
    id: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct TmdbCompany {
    id: u64,
    name: String,
    logo_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TmdbImages {
    #[serde(default)]
    posters: Vec<TmdbImage>,
    #[serde(default)]
    backdrops: Vec<TmdbImage>,
    #[serde(default)]
    logos: Vec<TmdbImage>,
}

#[derive(Debug, Clone, Deserialize)]
struct TmdbImage {
    file_path: String,
    #[serde(default)]
    vote_average: f64,
    #[serde(default)]
    width: u64,
    iso_639_1: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TmdbTranslations {
    #[serde(default)]
    translations: Vec<TmdbTranslation>,
}

#[derive(Debug, Clone, Deserialize)]
struct TmdbTranslation {
    iso_639_1: String,
    iso_3166_1: String,
    data: TmdbTranslationData,
}

impl TmdbTranslation {
    fn tag(&self) -> String {
        if self.iso_3166_1.is_empty() {
            self.iso_639_1.clone()
        } else {
            format!("{}-{}", self.iso_639_1, self.iso_3166_1)
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TmdbTranslationData {
    title: Option<String>,
    name: Option<String>,
    overview: Option<String>,
    tagline: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TmdbAlternativeTitles {
    #[serde(default)]
    titles: Vec<TmdbAlternativeTitle>,
    #[serde(default)]
    results: Vec<TmdbAlternativeTitle>,
}

#[derive(Debug, Clone, Deserialize)]
struct TmdbAlternativeTitle {
    iso_3166_1: String,
    title: String,
    #[serde(rename = "type")]
    title_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TmdbKeywords {
    #[serde(default)]
    keywords: Vec<TmdbKeyword>,
    #[serde(default)]
    results: Vec<TmdbKeyword>,
}

#[derive(Debug, Clone, Deserialize)]
struct TmdbKeyword {
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct TmdbMovie {
    id: u64,
    title: String,
    original_title: String,
    original_language: String,
    imdb_id: Option<String>,
    status: Option<String>,
    runtime: Option<i32>,
    release_date: Option<String>,
    vote_average: f64,
    #[serde(default)]
    genres: Vec<TmdbGenreRef>,
    belongs_to_collection: Option<TmdbCollectionRef>,
    #[serde(default)]
    production_companies: Vec<TmdbCompany>,
    #[serde(default)]
    alternative_titles: TmdbAlternativeTitles,
    #[serde(default)]
    keywords: TmdbKeywords,
    #[serde(default)]
    images: TmdbImages,
    #[serde(default)]
    translations: TmdbTranslations,
}

#[derive(Debug, Clone, Deserialize)]
struct TmdbCollectionRef {
    id: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct TmdbCollection {
    id: u64,
    name: String,
    #[serde(default)]
    parts: Vec<TmdbCollectionPart>,
    #[serde(default)]
    images: TmdbImages,
    #[serde(default)]
    translations: TmdbTranslations,
}

#[derive(Debug, Clone, Deserialize)]
struct TmdbCollectionPart {
    original_language: String,
    vote_average: f64,
    #[serde(default)]
    genre_ids: Vec<u64>,
}

#[derive(Debug, Clone, Deserialize)]
struct TmdbSerie {
    id: u64,
    name: String,
    original_name: String,
    original_language: String,
    status: Option<String>,
    #[serde(default)]
    in_production: bool,
    first_air_date: Option<String>,
    last_air_date: Option<String>,
    vote_average: f64,
    #[serde(default)]
    genres: Vec<TmdbGenreRef>,
    #[serde(default)]
    seasons: Vec<TmdbSeason>,
    #[serde(default)]
    production_companies: Vec<TmdbCompany>,
    #[serde(default)]
    alternative_titles: TmdbAlternativeTitles,
    #[serde(default)]
    keywords: TmdbKeywords,
    #[serde(default)]
    images: TmdbImages,
    #[serde(default)]
    translations: TmdbTranslations,
    #[serde(default)]
    external_ids: TmdbExternalIds,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TmdbExternalIds {
    imdb_id: Option<String>,
    tvdb_id: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
struct TmdbSeason {
    season_number: u32,
    name: String,
    overview: Option<String>,
    air_date: Option<String>,
    poster_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct TmdbSeasonDetail {
    #[serde(default)]
    episodes: Vec<TmdbEpisode>,
}

#[derive(Debug, Clone, Deserialize)]
struct TmdbEpisode {
    season_number: u32,
    episode_number: u32,
    name: String,
    overview: Option<String>,
    air_date: Option<String>,
    runtime: Option<i32>,
    still_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct TmdbEpisodeGroups {
    #[serde(default)]
    results: Vec<TmdbEpisodeGroup>,
}

#[derive(Debug, Clone, Deserialize)]
struct TmdbEpisodeGroup {
    id: String,
    #[serde(rename = "type")]
    group_type: u32,
    episode_count: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct TmdbEpisodeGroupDetail {
    #[serde(default)]
    groups: Vec<TmdbEpisodeSubgroup>,
}

#[derive(Debug, Clone, Deserialize)]
struct TmdbEpisodeSubgroup {
    name: String,
    order: u32,
    #[serde(default)]
    episodes: Vec<TmdbGroupEpisode>,
}

#[derive(Debug, Clone, Deserialize)]
struct TmdbGroupEpisode {
    season_number: u32,
    episode_number: u32,
    order: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compound_genres_flatten() {
        assert_eq!(
            TheMovieDatabase::map_genres(&[10759, 18]),
            vec![Genre::Action, Genre::Adventure, Genre::Drama]
        );
        assert_eq!(TheMovieDatabase::map_genres(&[424242]), vec![]);
    }

    #[test]
    fn image_pick_prefers_language_then_textless() {
        let images = vec![
            TmdbImage {
                file_path: "/any.jpg".into(),
                vote_average: 9.0,
                width: 500,
                iso_639_1: Some("fr".into()),
            },
            TmdbImage {
                file_path: "/notext.jpg".into(),
                vote_average: 2.0,
                width: 500,
                iso_639_1: None,
            },
            TmdbImage {
                file_path: "/en-small.jpg".into(),
                vote_average: 5.0,
                width: 300,
                iso_639_1: Some("en".into()),
            },
            TmdbImage {
                file_path: "/en-big.jpg".into(),
                vote_average: 5.0,
                width: 800,
                iso_639_1: Some("en".into()),
            },
        ];
        assert_eq!(
            TheMovieDatabase::pick_image(&images, "en").unwrap(),
            format!("{}{}", TheMovieDatabase::IMAGE_BASE, "/en-big.jpg")
        );
        assert_eq!(
            TheMovieDatabase::pick_image(&images, "ja").unwrap(),
            format!("{}{}", TheMovieDatabase::IMAGE_BASE, "/notext.jpg")
        );
        assert!(TheMovieDatabase::pick_image(&[], "en").is_none());
    }
}
