use std::collections::HashMap;

use async_trait::async_trait;

use crate::models::{
    metadata_id::id_map,
    movie::{Movie, SearchMovie},
    serie::{SearchSerie, Serie},
};

use super::{
    anilist::AniList, thexem::TheXem, tmdb::TheMovieDatabase, tvdb::TheTvdb, MetadataProvider,
    ProviderError,
};

/// Facade over the concrete providers.
///
/// Movies come from themoviedatabase, series from the tvdb (better entry
/// data) overlaid with themoviedatabase's global fields. AniList fills in
/// when the primaries are disabled or empty-handed, the xem mapping
/// translates scene titles.
#[derive(Debug)]
pub struct CompositeProvider {
    tmdb: Option<&'static TheMovieDatabase>,
    tvdb: Option<&'static TheTvdb>,
    anilist: Option<&'static AniList>,
    xem: &'static TheXem,
}

impl CompositeProvider {
    pub fn new(
        tmdb: Option<&'static TheMovieDatabase>,
        tvdb: Option<&'static TheTvdb>,
        anilist: Option<&'static AniList>,
        xem: &'static TheXem,
    ) -> Self {
        Self {
            tmdb,
            tvdb,
            anilist,
            xem,
        }
    }

    /// Resolve ids, falling back to a title search when they lead nowhere.
    pub async fn find_movie(
        &self,
        title: &str,
        year: Option<i32>,
        external_id: &HashMap<String, String>,
    ) -> Result<Movie, ProviderError> {
        if let Some(movie) = self.get_movie(external_id).await? {
            return Ok(movie);
        }
        let results = self.search_movies(title, year, &[]).await?;
        let best = results.first().ok_or_else(|| {
            ProviderError::NotFound(format!("no result for a movie named {title} ({year:?})"))
        })?;
        self.get_movie(&id_map(&best.external_id))
            .await?
            .ok_or_else(|| {
                ProviderError::NotFound(format!("could not identify the movie {title} ({year:?})"))
            })
    }

    pub async fn find_serie(
        &self,
        title: &str,
        year: Option<i32>,
        external_id: &HashMap<String, String>,
    ) -> Result<Serie, ProviderError> {
        let mut external_id = external_id.clone();
        let mut title = title.to_string();
        // Scene releases often use a name only the xem knows, which then
        // hands us the canonical name and the tvdb id directly.
        if !external_id.contains_key(TheTvdb::NAME) {
            match self.xem.get_show_override("tvdb", &title).await {
                Ok(Some((master, tvdb_id))) => {
                    tracing::info!("The xem replaces {title} with {master} ({tvdb_id})");
                    external_id.insert(TheTvdb::NAME.to_string(), tvdb_id);
                    title = master;
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("Ignoring the xem override: {e}"),
            }
        }

        if let Some(serie) = self.get_serie(&external_id, false).await? {
            return Ok(serie);
        }
        let results = self.search_series(&title, year, &[]).await?;
        let best = results.first().ok_or_else(|| {
            ProviderError::NotFound(format!("no result for a serie named {title} ({year:?})"))
        })?;
        self.get_serie(&id_map(&best.external_id), false)
            .await?
            .ok_or_else(|| {
                ProviderError::NotFound(format!("could not identify the serie {title} ({year:?})"))
            })
    }

    /// Translate a scene absolute number into `(season, episode)` via the
    /// xem show map. Used when a serie's entries don't carry the absolute
    /// order a file was named with.
    pub async fn resolve_absolute(
        &self,
        serie: &Serie,
        title: &str,
        episode: u32,
    ) -> Option<(u32, u32)> {
        let tvdb_id = serie.external_id.get(TheTvdb::NAME)?.data_id.clone();
        match self
            .xem
            .get_episode_override("tvdb", &tvdb_id, title, episode)
            .await
        {
            Ok((Some(season), Some(episode), _)) => Some((season, episode)),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Could not consult the xem for {title} ep {episode}: {e}");
                None
            }
        }
    }
}

#[async_trait]
impl MetadataProvider for CompositeProvider {
    fn name(&self) -> &'static str {
        "composite"
    }

    async fn search_movies(
        &self,
        title: &str,
        year: Option<i32>,
        languages: &[String],
    ) -> Result<Vec<SearchMovie>, ProviderError> {
        if let Some(tmdb) = self.tmdb {
            let results = tmdb.search_movies(title, year, languages).await?;
            if !results.is_empty() {
                return Ok(results);
            }
        }
        if let Some(anilist) = self.anilist {
            return anilist.search_movies(title, year, languages).await;
        }
        Ok(Vec::new())
    }

    async fn search_series(
        &self,
        title: &str,
        year: Option<i32>,
        languages: &[String],
    ) -> Result<Vec<SearchSerie>, ProviderError> {
        if let Some(tvdb) = self.tvdb {
            let results = tvdb.search_series(title, year, languages).await?;
            if !results.is_empty() {
                return Ok(results);
            }
        }
        if let Some(anilist) = self.anilist {
            return anilist.search_series(title, year, languages).await;
        }
        Ok(Vec::new())
    }

    async fn get_movie(
        &self,
        external_id: &HashMap<String, String>,
    ) -> Result<Option<Movie>, ProviderError> {
        let movie = match self.tmdb {
            Some(tmdb) => tmdb.get_movie(external_id).await?,
            None => None,
        };
        let Some(movie) = movie else {
            if let Some(anilist) = self.anilist {
                return anilist.get_movie(external_id).await;
            }
            return Ok(None);
        };

        // The tvdb only contributes its collection and ids.
        if let Some(tvdb) = self.tvdb {
            match tvdb.get_movie(&id_map(&movie.external_id)).await {
                Ok(Some(other)) => return Ok(Some(movie.enriched_with(other))),
                Ok(None) => {}
                Err(e) => tracing::warn!("Skipping tvdb movie enrichment: {e}"),
            }
        }
        Ok(Some(movie))
    }

    async fn get_serie(
        &self,
        external_id: &HashMap<String, String>,
        skip_entries: bool,
    ) -> Result<Option<Serie>, ProviderError> {
        let detailed = match self.tvdb {
            Some(tvdb) => tvdb.get_serie(external_id, skip_entries).await?,
            None => None,
        };
        let Some(detailed) = detailed else {
            if let Some(tmdb) = self.tmdb {
                if let Some(serie) = tmdb.get_serie(external_id, skip_entries).await? {
                    return Ok(Some(serie));
                }
            }
            if let Some(anilist) = self.anilist {
                return anilist.get_serie(external_id, skip_entries).await;
            }
            return Ok(None);
        };

        // themoviedatabase has the better global info, tvdb the better
        // entries, stitch them together.
        let Some(tmdb) = self.tmdb else {
            return Ok(Some(detailed));
        };
        match tmdb.get_serie(&id_map(&detailed.external_id), true).await {
            Ok(Some(global)) => Ok(Some(Serie::merged(detailed, global))),
            Ok(None) => Ok(Some(detailed)),
            Err(e) => {
                tracing::warn!("Skipping themoviedatabase serie enrichment: {e}");
                Ok(Some(detailed))
            }
        }
    }
}
