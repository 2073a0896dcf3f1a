use anyhow::{bail, Context};
use reqwest::{header::HeaderMap, header::HeaderValue, Client, StatusCode};
use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::models::{
    movie::Movie,
    serie::Serie,
    videos::{Resource, Video, VideoCreated, VideoInfo, VideoLink},
};

/// Thin typed client for the downstream catalog service. The catalog owns
/// all persistence, we only push and reconcile.
#[derive(Debug)]
pub struct CatalogClient {
    base: String,
    client: Client,
}

impl CatalogClient {
    pub fn new(config: &Config) -> CatalogClient {
        let mut headers = HeaderMap::with_capacity(1);
        if let Ok(key) = HeaderValue::from_str(&config.catalog_api_key) {
            headers.insert("X-API-Key", key);
        }
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .expect("client to build");
        CatalogClient {
            base: config.catalog_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub async fn get_videos_info(&self) -> anyhow::Result<VideoInfo> {
        let res = self
            .client
            .get(format!("{}/videos", self.base))
            .send()
            .await?;
        Self::decode(res).await
    }

    pub async fn create_videos(&self, videos: &[Video]) -> anyhow::Result<Vec<VideoCreated>> {
        let res = self
            .client
            .post(format!("{}/videos", self.base))
            .json(videos)
            .send()
            .await?;
        Self::decode(res).await
    }

    pub async fn delete_videos(&self, paths: &[String]) -> anyhow::Result<()> {
        let res = self
            .client
            .delete(format!("{}/videos", self.base))
            .json(paths)
            .send()
            .await?;
        Self::check(res).await
    }

    pub async fn create_movie(&self, movie: &Movie) -> anyhow::Result<Resource> {
        let body = serde_json::to_value(movie)?;
        let year = movie.air_date.map(|d| d.year());
        self.create_with_conflict_retry("movies", body, year).await
    }

    pub async fn create_serie(&self, serie: &Serie) -> anyhow::Result<Resource> {
        let body = serde_json::to_value(serie)?;
        let year = serie.start_air.map(|d| d.year());
        self.create_with_conflict_retry("series", body, year).await
    }

    pub async fn link_videos(&self, links: &[VideoLink]) -> anyhow::Result<()> {
        if links.is_empty() {
            return Ok(());
        }
        let res = self
            .client
            .post(format!("{}/videos/link", self.base))
            .json(links)
            .send()
            .await?;
        Self::check(res).await
    }

    pub async fn create_issue(&self, path: &str, reason: &str) -> anyhow::Result<()> {
        let body = serde_json::json!({
            "domain": "scanner",
            "cause": path,
            "reason": reason,
        });
        let res = self
            .client
            .post(format!("{}/issues", self.base))
            .json(&body)
            .send()
            .await?;
        Self::check(res).await
    }

    pub async fn delete_issue(&self, path: &str) -> anyhow::Result<()> {
        let res = self
            .client
            .delete(format!("{}/issues", self.base))
            .query(&[("path", path)])
            .send()
            .await?;
        Self::check(res).await
    }

    /// A 409 means a work with the same slug but another year already
    /// exists, retrying with a year-suffixed slug lets both coexist.
    async fn create_with_conflict_retry(
        &self,
        path: &str,
        mut body: serde_json::Value,
        year: Option<i32>,
    ) -> anyhow::Result<Resource> {
        let res = self
            .client
            .post(format!("{}/{path}", self.base))
            .json(&body)
            .send()
            .await?;
        if res.status() != StatusCode::CONFLICT {
            return Self::decode(res).await;
        }

        let slug = body
            .get("slug")
            .and_then(|s| s.as_str())
            .context("created resource has no slug")?;
        let Some(suffixed) = year_suffixed_slug(slug, year) else {
            bail!("catalog conflict on /{path} for {slug} and no year to disambiguate");
        };
        tracing::info!("Catalog conflict on /{path}, retrying with slug {suffixed}");
        body["slug"] = suffixed.into();
        let res = self
            .client
            .post(format!("{}/{path}", self.base))
            .json(&body)
            .send()
            .await?;
        Self::decode(res).await
    }

    async fn decode<T: DeserializeOwned>(res: reqwest::Response) -> anyhow::Result<T> {
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            bail!("catalog responded with {status}: {body}");
        }
        res.json().await.context("decoding catalog response")
    }

    async fn check(res: reqwest::Response) -> anyhow::Result<()> {
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            bail!("catalog responded with {status}: {body}");
        }
        Ok(())
    }
}

fn year_suffixed_slug(slug: &str, year: Option<i32>) -> Option<String> {
    year.map(|year| format!("{slug}-{year}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_slug_needs_a_year() {
        assert_eq!(
            year_suffixed_slug("inception", Some(2010)).as_deref(),
            Some("inception-2010")
        );
        assert_eq!(year_suffixed_slug("inception", None), None);
    }
}
