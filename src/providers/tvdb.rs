use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, Client, Method, Request, Url};
use serde::Deserialize;

use crate::cache::Cache;
use crate::models::{
    collection::{Collection, CollectionTranslation},
    entry::{Entry, EntryKind, EntryTranslation},
    genre::Genre,
    metadata_id::{EntryId, EpisodeId, MetadataId, SeasonId},
    movie::{Movie, MovieStatus, MovieTranslation, SearchMovie},
    season::{Season, SeasonTranslation},
    serie::{SearchSerie, Serie, SerieStatus, SerieTranslation},
    to_slug,
};

use super::{
    parse_date, rank_search, request_client::LimitedRequestClient, MetadataProvider,
    ProviderError, SearchScore,
};

const CACHE_TTL: Duration = Duration::from_secs(60 * 60 * 24);
/// Login tokens are valid for a month.
const LOGIN_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 30);

#[derive(Debug)]
pub struct TheTvdb {
    client: LimitedRequestClient,
    base_url: Url,
    api_key: String,
    pin: Option<String>,
    login_cache: Cache<(), String>,
    artwork_cache: Cache<(), ArtworkTypes>,
    serie_cache: Cache<(String, bool), Serie>,
    movie_cache: Cache<String, Movie>,
    search_cache: Cache<(String, String, Option<i32>), Vec<TvdbSearchResult>>,
}

/// Artwork type ids differ per record type and are discovered once per
/// session from `/artwork/types`.
#[derive(Debug, Clone)]
struct ArtworkTypes {
    series_banner: u64,
    series_poster: u64,
    series_background: u64,
    series_logo: u64,
    movie_poster: u64,
    movie_background: u64,
}

impl Default for ArtworkTypes {
    fn default() -> Self {
        // Well-known ids, used when discovery fails.
        Self {
            series_banner: 1,
            series_poster: 2,
            series_background: 3,
            series_logo: 5,
            movie_poster: 14,
            movie_background: 15,
        }
    }
}

impl TheTvdb {
    pub const NAME: &'static str = "tvdb";
    const API_URL: &'static str = "https://api4.thetvdb.com/v4";
    const RATE_LIMIT: usize = 10;

    pub fn new(api_key: &str, pin: Option<&str>) -> Self {
        let client = Client::builder().build().expect("client to build");
        Self {
            client: LimitedRequestClient::new(client, Self::RATE_LIMIT, Duration::from_secs(1)),
            base_url: Url::parse(Self::API_URL).expect("url to parse"),
            api_key: api_key.to_string(),
            pin: pin.map(str::to_string),
            login_cache: Cache::new(LOGIN_TTL),
            artwork_cache: Cache::new(LOGIN_TTL),
            serie_cache: Cache::new(CACHE_TTL),
            movie_cache: Cache::new(CACHE_TTL),
            search_cache: Cache::new(CACHE_TTL),
        }
    }

    async fn search(
        &self,
        kind: &'static str,
        title: &str,
        year: Option<i32>,
    ) -> Result<Vec<TvdbSearchResult>, ProviderError> {
        self.search_cache
            .get_or_fill((kind.to_string(), title.to_string(), year), || async {
                let mut query = vec![("query", title.to_string()), ("type", kind.to_string())];
                if let Some(year) = year {
                    query.push(("year", year.to_string()));
                }
                let res: TvdbResponse<Vec<TvdbSearchResult>> =
                    self.get(self.url(&["search"], &query), None).await?;
                Ok(rank_search(res.data, title, year, |r| SearchScore {
                    name: r.name.clone(),
                    year: r.year.as_deref().and_then(|y| y.parse().ok()),
                    vote_count: 0,
                    popularity: 0.0,
                }))
            })
            .await
    }

    async fn token(&self) -> Result<String, ProviderError> {
        self.login_cache
            .get_or_fill((), || async {
                let mut url = self.base_url.clone();
                url.path_segments_mut().expect("base url").push("login");
                let mut body = serde_json::json!({ "apikey": self.api_key });
                if let Some(pin) = &self.pin {
                    body["pin"] = serde_json::json!(pin);
                }
                let mut req = Request::new(Method::POST, url);
                req.headers_mut().insert(
                    reqwest::header::CONTENT_TYPE,
                    reqwest::header::HeaderValue::from_static("application/json"),
                );
                *req.body_mut() = Some(serde_json::to_vec(&body)?.into());
                let res: TvdbResponse<TvdbLogin> = self.client.request(req, None).await?;
                tracing::info!("Logged in on the tvdb");
                Ok(res.data.token)
            })
            .await
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
        not_found: Option<&str>,
    ) -> Result<T, ProviderError> {
        let token = self.token().await?;
        let mut req = Request::new(Method::GET, url);
        req.headers_mut().insert(
            AUTHORIZATION,
            reqwest::header::HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| ProviderError::Other(e.into()))?,
        );
        self.client.request(req, not_found).await
    }

    fn url(&self, segments: &[&str], query: &[(&str, String)]) -> Url {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .expect("base url to be a base")
            .extend(segments);
        url.query_pairs_mut().extend_pairs(query);
        url
    }

    async fn artwork_types(&self) -> ArtworkTypes {
        self.artwork_cache
            .get_or_fill((), || async {
                let res: Result<TvdbResponse<Vec<TvdbArtworkType>>, ProviderError> =
                    self.get(self.url(&["artwork", "types"], &[]), None).await;
                let types = match res {
                    Ok(res) => res.data,
                    Err(e) => {
                        tracing::warn!("Could not discover artwork types: {e}");
                        return Ok::<_, std::convert::Infallible>(ArtworkTypes::default());
                    }
                };
                let find = |name: &str, record: &str| {
                    types
                        .iter()
                        .find(|t| t.name == name && t.record_type == record)
                        .map(|t| t.id)
                };
                let defaults = ArtworkTypes::default();
                Ok(ArtworkTypes {
                    series_banner: find("Banner", "series").unwrap_or(defaults.series_banner),
                    series_poster: find("Poster", "series").unwrap_or(defaults.series_poster),
                    series_background: find("Background", "series")
                        .unwrap_or(defaults.series_background),
                    series_logo: find("ClearLogo", "series").unwrap_or(defaults.series_logo),
                    movie_poster: find("Poster", "movie").unwrap_or(defaults.movie_poster),
                    movie_background: find("Background", "movie")
                        .unwrap_or(defaults.movie_background),
                })
            })
            .await
            .unwrap_or_default()
    }

    /// Highest-scored artwork of a type, preferring the language, then
    /// language-neutral art.
    fn pick_artwork(artworks: &[TvdbArtwork], kind: u64, language: &str) -> Option<String> {
        let mut of_kind: Vec<&TvdbArtwork> = artworks
            .iter()
            .filter(|a| a.artwork_type == kind)
            .collect();
        of_kind.sort_by(|a, b| b.score.cmp(&a.score));
        of_kind
            .iter()
            .find(|a| a.language.as_deref() == Some(language))
            .or_else(|| of_kind.iter().find(|a| a.language.is_none()))
            .map(|a| a.image.clone())
    }

    fn map_genres(genres: &[TvdbGenre]) -> Vec<Genre> {
        genres
            .iter()
            .filter_map(|g| match g.slug.as_str() {
                "action" => Some(Genre::Action),
                "adventure" => Some(Genre::Adventure),
                "animation" | "anime" => Some(Genre::Animation),
                "children" => Some(Genre::Kids),
                "comedy" => Some(Genre::Comedy),
                "crime" => Some(Genre::Crime),
                "documentary" => Some(Genre::Documentary),
                "drama" => Some(Genre::Drama),
                "family" => Some(Genre::Family),
                "fantasy" => Some(Genre::Fantasy),
                "history" => Some(Genre::History),
                "horror" => Some(Genre::Horror),
                "musical" => Some(Genre::Music),
                "mystery" => Some(Genre::Mystery),
                "reality" => Some(Genre::Reality),
                "romance" => Some(Genre::Romance),
                "science-fiction" => Some(Genre::ScienceFiction),
                "soap" => Some(Genre::Soap),
                "talk-show" => Some(Genre::Talk),
                "thriller" => Some(Genre::Thriller),
                "war" => Some(Genre::War),
                "western" => Some(Genre::Western),
                _ => None,
            })
            .collect()
    }

    fn remote_ids(ids: &[TvdbRemoteId]) -> HashMap<String, MetadataId> {
        let mut out = HashMap::new();
        for id in ids {
            match id.source_name.as_str() {
                "IMDB" => {
                    out.insert("imdb".to_string(), MetadataId::new(&id.id));
                }
                "TheMovieDB.com" => {
                    out.insert("themoviedatabase".to_string(), MetadataId::new(&id.id));
                }
                _ => {}
            }
        }
        out
    }

    fn own_id(&self, external_id: &HashMap<String, String>) -> Option<String> {
        external_id.get(Self::NAME).cloned()
    }

    /// Episode list under the default order, following `links.next`.
    async fn fetch_episodes(&self, id: &str) -> Result<Vec<TvdbEpisode>, ProviderError> {
        let mut episodes = Vec::new();
        let mut next = Some(self.url(
            &["series", id, "episodes", "default"],
            &[("page", "0".to_string())],
        ));
        while let Some(url) = next {
            let page: TvdbResponse<TvdbEpisodePage> = self
                .get(url, Some(&format!("no serie with tvdb id {id}")))
                .await?;
            episodes.extend(page.data.episodes);
            next = match page.links.and_then(|l| l.next) {
                Some(link) if !link.is_empty() => {
                    Some(Url::parse(&link).map_err(|e| ProviderError::Other(e.into()))?)
                }
                _ => None,
            };
        }
        Ok(episodes)
    }

    async fn fetch_serie(&self, id: &str, skip_entries: bool) -> Result<Serie, ProviderError> {
        let res: TvdbResponse<TvdbSerieExtended> = self
            .get(
                self.url(
                    &["series", id, "extended"],
                    &[
                        ("meta", "translations".to_string()),
                        ("short", "false".to_string()),
                    ],
                ),
                Some(&format!("no serie with tvdb id {id}")),
            )
            .await?;
        let serie = res.data;
        let artwork = self.artwork_types().await;
        let original_language = serie.original_language.clone().unwrap_or_default();

        let entries = if skip_entries {
            Vec::new()
        } else {
            let episodes = self.fetch_episodes(id).await?;
            self.build_entries(id, episodes).await?
        };

        let seasons = serie
            .seasons
            .iter()
            .filter(|s| s.season_type.as_ref().map(|t| t.kind == "official").unwrap_or(true))
            .map(|season| Season {
                season_number: season.number,
                start_air: None,
                end_air: None,
                external_id: HashMap::from([(
                    Self::NAME.to_string(),
                    SeasonId {
                        serie_id: serie.id.to_string(),
                        season: season.number,
                    },
                )]),
                translations: HashMap::from([(
                    original_language.clone(),
                    SeasonTranslation {
                        name: None,
                        description: None,
                        poster: season.image.clone(),
                        thumbnail: None,
                        banner: None,
                    },
                )]),
            })
            .collect();

        let translations = serie
            .translations
            .name_translations
            .iter()
            .map(|trans| {
                let description = serie
                    .translations
                    .overview_translations
                    .iter()
                    .find(|t| t.language == trans.language)
                    .and_then(|t| t.overview.clone());
                let translation = SerieTranslation {
                    name: trans.name.clone().unwrap_or_else(|| serie.name.clone()),
                    latin_name: None,
                    description,
                    tagline: None,
                    aliases: serie
                        .aliases
                        .iter()
                        .filter(|a| a.language == trans.language)
                        .map(|a| a.name.clone())
                        .collect(),
                    tags: Vec::new(),
                    poster: Self::pick_artwork(&serie.artworks, artwork.series_poster, &trans.language),
                    thumbnail: Self::pick_artwork(
                        &serie.artworks,
                        artwork.series_background,
                        &trans.language,
                    ),
                    banner: Self::pick_artwork(&serie.artworks, artwork.series_banner, &trans.language),
                    logo: Self::pick_artwork(&serie.artworks, artwork.series_logo, &trans.language),
                    trailer: None,
                };
                (trans.language.clone(), translation)
            })
            .collect();

        let mut external_id = HashMap::from([(
            Self::NAME.to_string(),
            MetadataId::with_link(&serie.id, format!("https://thetvdb.com/series/{}", serie.slug)),
        )]);
        external_id.extend(Self::remote_ids(&serie.remote_ids));

        Ok(Serie {
            slug: serie.slug.clone(),
            original_language: serie.original_language.clone(),
            genres: Self::map_genres(&serie.genres),
            rating: None,
            status: match serie.status.as_ref().map(|s| s.name.as_str()) {
                Some("Ended") => SerieStatus::Finished,
                Some("Continuing") => SerieStatus::Airing,
                _ => SerieStatus::Planned,
            },
            runtime: serie.average_runtime,
            start_air: parse_date(serie.first_aired.as_deref()),
            end_air: parse_date(serie.last_aired.as_deref()),
            external_id,
            translations,
            seasons,
            entries,
            extra: Vec::new(),
            collections: Vec::new(),
            studios: Vec::new(),
        })
    }

    /// Entries in absolute order. Specials (`seasonNumber == 0`) are placed
    /// at a fractional position from their `airsAfter`/`airsBefore` hints,
    /// movie episodes are resolved to their own record for the slug.
    async fn build_entries(
        &self,
        serie_id: &str,
        episodes: Vec<TvdbEpisode>,
    ) -> Result<Vec<Entry>, ProviderError> {
        let mut regular: Vec<&TvdbEpisode> =
            episodes.iter().filter(|e| e.season_number != 0).collect();
        regular.sort_by_key(|e| (e.season_number, e.number));

        // Absolute numbers with holes are filled in ascending order.
        let mut orders: HashMap<(u32, u32), f64> = HashMap::new();
        let mut last = 0.0;
        for episode in &regular {
            let order = match episode.absolute_number {
                Some(n) if n > 0 => n as f64,
                _ => last + 1.0,
            };
            last = order;
            orders.insert((episode.season_number, episode.number), order);
        }

        let mut entries = Vec::with_capacity(episodes.len());
        for episode in &episodes {
            let order = if episode.season_number == 0 {
                self.special_order(episode, &regular, &orders)
            } else {
                orders[&(episode.season_number, episode.number)]
            };
            let kind = if episode.is_movie {
                EntryKind::Movie
            } else if episode.season_number == 0 {
                EntryKind::Special
            } else {
                EntryKind::Episode
            };
            let slug = match (kind, episode.linked_movie) {
                (EntryKind::Movie, Some(movie_id)) => {
                    match self.fetch_movie(&movie_id.to_string()).await {
                        Ok(movie) => Some(movie.slug),
                        Err(e) => {
                            tracing::warn!("Could not resolve linked movie {movie_id}: {e}");
                            None
                        }
                    }
                }
                _ => None,
            };
            entries.push(Entry {
                kind,
                order,
                runtime: episode.runtime,
                air_date: parse_date(episode.aired.as_deref()),
                thumbnail: episode
                    .image
                    .as_ref()
                    .map(|i| format!("https://artworks.thetvdb.com{i}")),
                slug,
                season_number: Some(episode.season_number),
                episode_number: Some(episode.number),
                number: Some(episode.number),
                external_id: HashMap::from([(
                    Self::NAME.to_string(),
                    EntryId::Episode(EpisodeId {
                        serie_id: serie_id.to_string(),
                        season: Some(episode.season_number),
                        episode: episode.number,
                        link: None,
                    }),
                )]),
                translations: HashMap::from([(
                    "eng".to_string(),
                    EntryTranslation {
                        name: episode.name.clone(),
                        description: episode.overview.clone(),
                        tagline: None,
                        poster: None,
                    },
                )]),
                videos: Vec::new(),
            });
        }
        entries.sort_by(|a, b| a.order.partial_cmp(&b.order).unwrap_or(std::cmp::Ordering::Equal));
        Ok(entries)
    }

    fn special_order(
        &self,
        special: &TvdbEpisode,
        regular: &[&TvdbEpisode],
        orders: &HashMap<(u32, u32), f64>,
    ) -> f64 {
        let season_orders = |season: u32| -> Vec<f64> {
            regular
                .iter()
                .filter(|e| e.season_number == season)
                .filter_map(|e| orders.get(&(e.season_number, e.number)).copied())
                .collect()
        };
        if let (Some(season), Some(episode)) = (special.airs_before_season, special.airs_before_episode)
        {
            if let Some(order) = orders.get(&(season, episode)) {
                return order - 0.5;
            }
        }
        if let Some(season) = special.airs_before_season {
            let orders = season_orders(season);
            if let Some(min) = orders.iter().cloned().reduce(f64::min) {
                return min - 0.5;
            }
        }
        if let Some(season) = special.airs_after_season {
            let orders = season_orders(season);
            if let Some(max) = orders.iter().cloned().reduce(f64::max) {
                return max + 0.5;
            }
        }
        // No hint, stack it after everything.
        let max = orders.values().cloned().fold(0.0, f64::max);
        max + special.number as f64
    }

    async fn fetch_movie(&self, id: &str) -> Result<Movie, ProviderError> {
        self.movie_cache
            .get_or_fill(id.to_string(), || async {
                let res: TvdbResponse<TvdbMovieExtended> = self
                    .get(
                        self.url(
                            &["movies", id, "extended"],
                            &[
                                ("meta", "translations".to_string()),
                                ("short", "false".to_string()),
                            ],
                        ),
                        Some(&format!("no movie with tvdb id {id}")),
                    )
                    .await?;
                let movie = res.data;
                let artwork = self.artwork_types().await;

                let collections = movie
                    .lists
                    .iter()
                    .filter(|l| l.is_official)
                    .map(|l| Collection {
                        slug: to_slug(&l.name),
                        original_language: movie.original_language.clone(),
                        genres: Vec::new(),
                        rating: None,
                        external_id: HashMap::from([(
                            Self::NAME.to_string(),
                            MetadataId::new(l.id),
                        )]),
                        translations: HashMap::from([(
                            movie.original_language.clone().unwrap_or_default(),
                            CollectionTranslation {
                                name: l.name.clone(),
                                latin_name: None,
                                description: l.overview.clone(),
                                tagline: None,
                                aliases: Vec::new(),
                                tags: Vec::new(),
                                poster: None,
                                thumbnail: None,
                                banner: None,
                                logo: None,
                            },
                        )]),
                    })
                    .collect();

                let translations = movie
                    .translations
                    .name_translations
                    .iter()
                    .map(|trans| {
                        let description = movie
                            .translations
                            .overview_translations
                            .iter()
                            .find(|t| t.language == trans.language)
                            .and_then(|t| t.overview.clone());
                        (
                            trans.language.clone(),
                            MovieTranslation {
                                name: trans.name.clone().unwrap_or_else(|| movie.name.clone()),
                                latin_name: None,
                                description,
                                tagline: None,
                                aliases: Vec::new(),
                                tags: Vec::new(),
                                poster: Self::pick_artwork(
                                    &movie.artworks,
                                    artwork.movie_poster,
                                    &trans.language,
                                ),
                                thumbnail: Self::pick_artwork(
                                    &movie.artworks,
                                    artwork.movie_background,
                                    &trans.language,
                                ),
                                banner: None,
                                logo: None,
                                trailer: None,
                            },
                        )
                    })
                    .collect();

                let mut external_id = HashMap::from([(
                    Self::NAME.to_string(),
                    MetadataId::with_link(
                        &movie.id,
                        format!("https://thetvdb.com/movies/{}", movie.slug),
                    ),
                )]);
                external_id.extend(Self::remote_ids(&movie.remote_ids));

                Ok(Movie {
                    slug: movie.slug.clone(),
                    original_language: movie.original_language.clone(),
                    genres: Self::map_genres(&movie.genres),
                    rating: None,
                    status: MovieStatus::Finished,
                    runtime: movie.runtime,
                    air_date: parse_date(
                        movie.first_release.as_ref().map(|r| r.date.as_str()),
                    ),
                    external_id,
                    translations,
                    collections,
                    studios: Vec::new(),
                    videos: Vec::new(),
                })
            })
            .await
    }
}

#[async_trait]
impl MetadataProvider for TheTvdb {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn search_movies(
        &self,
        title: &str,
        year: Option<i32>,
        _languages: &[String],
    ) -> Result<Vec<SearchMovie>, ProviderError> {
        let ranked = self.search("movie", title, year).await?;
        Ok(ranked
            .into_iter()
            .map(|r| SearchMovie {
                slug: r.slug.clone().unwrap_or_else(|| to_slug(&r.name)),
                name: r.name.clone(),
                description: r.overview.clone(),
                air_date: parse_date(r.first_air_time.as_deref()),
                poster: r.image_url.clone(),
                original_language: r.primary_language.clone(),
                external_id: HashMap::from([(
                    Self::NAME.to_string(),
                    MetadataId::new(&r.tvdb_id),
                )]),
            })
            .collect())
    }

    async fn search_series(
        &self,
        title: &str,
        year: Option<i32>,
        _languages: &[String],
    ) -> Result<Vec<SearchSerie>, ProviderError> {
        let ranked = self.search("series", title, year).await?;
        Ok(ranked
            .into_iter()
            .map(|r| SearchSerie {
                slug: r.slug.clone().unwrap_or_else(|| to_slug(&r.name)),
                name: r.name.clone(),
                description: r.overview.clone(),
                start_air: parse_date(r.first_air_time.as_deref()),
                end_air: None,
                poster: r.image_url.clone(),
                original_language: r.primary_language.clone(),
                external_id: HashMap::from([(
                    Self::NAME.to_string(),
                    MetadataId::new(&r.tvdb_id),
                )]),
            })
            .collect())
    }

    async fn get_movie(
        &self,
        external_id: &HashMap<String, String>,
    ) -> Result<Option<Movie>, ProviderError> {
        let Some(id) = self.own_id(external_id) else {
            return Ok(None);
        };
        self.fetch_movie(&id).await.map(Some)
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
struct TvdbResponse<T> {
    data: T,
    #[serde(default)]
    links: Option<TvdbLinks>,
}

#[derive(Debug, Clone, Deserialize)]
struct TvdbLinks {
    next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct TvdbLogin {
    token: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TvdbArtworkType {
    id: u64,
    name: String,
    record_type: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TvdbSearchResult {
    tvdb_id: String,
    name: String,
    slug: Option<String>,
    overview: Option<String>,
    image_url: Option<String>,
    first_air_time: Option<String>,
    primary_language: Option<String>,
    year: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TvdbGenre {
    slug: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TvdbRemoteId {
    id: String,
    source_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TvdbArtwork {
    image: String,
    #[serde(rename = "type")]
    artwork_type: u64,
    #[serde(default)]
    score: i64,
    language: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TvdbStatus {
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TvdbSeasonType {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TvdbSeasonRef {
    number: u32,
    image: Option<String>,
    #[serde(rename = "type")]
    season_type: Option<TvdbSeasonType>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TvdbAlias {
    language: String,
    name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TvdbTranslations {
    #[serde(default)]
    name_translations: Vec<TvdbTranslation>,
    #[serde(default)]
    overview_translations: Vec<TvdbTranslation>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TvdbTranslation {
    language: String,
    name: Option<String>,
    overview: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TvdbSerieExtended {
    id: u64,
    slug: String,
    name: String,
    original_language: Option<String>,
    first_aired: Option<String>,
    last_aired: Option<String>,
    average_runtime: Option<i32>,
    status: Option<TvdbStatus>,
    #[serde(default)]
    genres: Vec<TvdbGenre>,
    #[serde(default)]
    aliases: Vec<TvdbAlias>,
    #[serde(default)]
    artworks: Vec<TvdbArtwork>,
    #[serde(default)]
    seasons: Vec<TvdbSeasonRef>,
    #[serde(default)]
    remote_ids: Vec<TvdbRemoteId>,
    #[serde(default)]
    translations: TvdbTranslations,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TvdbEpisodePage {
    #[serde(default)]
    episodes: Vec<TvdbEpisode>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TvdbEpisode {
    name: Option<String>,
    overview: Option<String>,
    aired: Option<String>,
    runtime: Option<i32>,
    image: Option<String>,
    number: u32,
    season_number: u32,
    absolute_number: Option<u32>,
    #[serde(default)]
    is_movie: bool,
    linked_movie: Option<u64>,
    airs_after_season: Option<u32>,
    airs_before_season: Option<u32>,
    airs_before_episode: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TvdbRelease {
    date: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TvdbList {
    id: u64,
    name: String,
    overview: Option<String>,
    #[serde(default)]
    is_official: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TvdbMovieExtended {
    id: u64,
    slug: String,
    name: String,
    original_language: Option<String>,
    runtime: Option<i32>,
    first_release: Option<TvdbRelease>,
    #[serde(default)]
    genres: Vec<TvdbGenre>,
    #[serde(default)]
    artworks: Vec<TvdbArtwork>,
    #[serde(default)]
    lists: Vec<TvdbList>,
    #[serde(default)]
    remote_ids: Vec<TvdbRemoteId>,
    #[serde(default)]
    translations: TvdbTranslations,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn episode(season: u32, number: u32, type_absolute: Option<u32>) -> TvdbEpisode {
        TvdbEpisode {
            name: Some(format!("S{season}E{number}")),
            overview: None,
            aired: None,
            runtime: None,
            image: None,
            number,
            season_number: season,
            absolute_number: type_absolute,
            is_movie: false,
            linked_movie: None,
            airs_after_season: None,
            airs_before_season: None,
            airs_before_episode: None,
        }
    }

    #[tokio::test]
    async fn absolute_order_fills_holes() {
        let tvdb = TheTvdb::new("key", None);
        let episodes = vec![
            episode(1, 1, Some(1)),
            episode(1, 2, None),
            episode(2, 1, Some(13)),
        ];
        let entries = tvdb.build_entries("42", episodes).await.unwrap();
        assert_eq!(entries[0].order, 1.0);
        assert_eq!(entries[1].order, 2.0);
        assert_eq!(entries[2].order, 13.0);
        assert!(entries.iter().all(|e| e.order > 0.0));
    }

    #[tokio::test]
    async fn special_sits_between_episodes() {
        let tvdb = TheTvdb::new("key", None);
        let mut special = episode(0, 1, None);
        special.airs_before_season = Some(1);
        special.airs_before_episode = Some(2);
        let episodes = vec![
            episode(1, 1, Some(1)),
            episode(1, 2, Some(2)),
            special,
        ];
        let entries = tvdb.build_entries("42", episodes).await.unwrap();
        let special = entries
            .iter()
            .find(|e| e.kind == EntryKind::Special)
            .unwrap();
        assert_eq!(special.order, 1.5);
        // sorted by order: episode 1, special, episode 2
        assert_eq!(entries[1].kind, EntryKind::Special);
    }

    #[tokio::test]
    async fn unhinted_special_goes_last() {
        let tvdb = TheTvdb::new("key", None);
        let episodes = vec![episode(1, 1, Some(1)), episode(0, 1, None)];
        let entries = tvdb.build_entries("42", episodes).await.unwrap();
        let special = entries
            .iter()
            .find(|e| e.kind == EntryKind::Special)
            .unwrap();
        assert!(special.order > 1.0);
    }

    #[tokio::test]
    async fn special_after_season() {
        let tvdb = TheTvdb::new("key", None);
        let mut special = episode(0, 2, None);
        special.airs_after_season = Some(1);
        let episodes = vec![
            episode(1, 1, Some(1)),
            episode(1, 2, Some(2)),
            episode(2, 1, Some(3)),
            special,
        ];
        let entries = tvdb.build_entries("42", episodes).await.unwrap();
        let special = entries
            .iter()
            .find(|e| e.kind == EntryKind::Special)
            .unwrap();
        assert_eq!(special.order, 2.5);
    }
}
