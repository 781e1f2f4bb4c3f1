//! Samehadaku site scraper implementation
//!
//! Samehadaku is a WordPress anime site. Anime pages list their episodes
//! newest first, episode pages offer a list of video servers, and a server is
//! turned into an embeddable player URL through the WordPress ajax endpoint.

use super::{AnimePage, Listing, ListingEntry, ScraperError, ServerResource, ServerSelector, SiteScraper};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Prefix the site puts in front of every anime title
const TITLE_PREFIX: &str = "Nonton Anime ";

/// Path of the WordPress ajax endpoint resolving video servers
const PLAYER_ENDPOINT: &str = "wp-admin/admin-ajax.php";

/// Path of the filterable anime index
const ANIME_INDEX_PATH: &str = "daftar-anime-2/";

/// Scraper for the Samehadaku streaming site.
pub struct SamehadakuScraper {
    client: reqwest::Client,
    base_url: Url,
}

impl SamehadakuScraper {
    /// Creates a scraper for the site rooted at `base_url`.
    ///
    /// The base may carry a sub-path, e.g. `https://mirror.example/sub/`.
    /// The client is expected to carry the User-Agent the site accepts.
    pub fn new(client: reqwest::Client, base_url: &str) -> Result<Self, ScraperError> {
        let mut base_url = Url::parse(base_url).map_err(|source| ScraperError::InvalidUrl {
            url: base_url.to_string(),
            source,
        })?;

        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { client, base_url })
    }

    /// Resolves a site-local path against the base URL
    ///
    /// Site-local paths are relative to the base, leading slash or not.
    fn url_for(&self, path: &str) -> Result<Url, ScraperError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|source| ScraperError::InvalidUrl {
                url: path.to_string(),
                source,
            })
    }

    /// Sends a request and returns the body of a successful response
    async fn fetch_html(&self, request: reqwest::RequestBuilder, subject: &str) -> Result<String, ScraperError> {
        let response = request
            .send()
            .await
            .map_err(|e| ScraperError::RequestError(e.to_string()))?;

        if response.status() == 404 {
            return Err(ScraperError::PageNotFound(subject.to_string()));
        }

        if !response.status().is_success() {
            return Err(ScraperError::RequestError(format!(
                "HTTP {} {} for {}",
                response.status().as_u16(),
                response.status().canonical_reason().unwrap_or("Unknown"),
                subject
            )));
        }

        response
            .text()
            .await
            .map_err(|e| ScraperError::RequestError(e.to_string()))
    }
}

#[async_trait]
impl SiteScraper for SamehadakuScraper {
    async fn anime_page(&self, anime_id: &str) -> Result<AnimePage, ScraperError> {
        let path = anime_path(anime_id);
        let url = self.url_for(&path)?;
        let html = self.fetch_html(self.client.get(url), &path).await?;

        let page = parse_anime_page(&self.base_url, &html)?;
        tracing::debug!(anime_id, title = %page.title, episodes = page.episodes.len(), "scraped anime page");
        Ok(page)
    }

    async fn listing(&self, listing: &Listing) -> Result<Vec<ListingEntry>, ScraperError> {
        let request = match listing {
            Listing::TopTen | Listing::LatestUpdates => self.client.get(self.base_url.clone()),
            Listing::PopularByGenre(genres) => {
                let mut query = vec![("order", "popular")];
                query.extend(genres.iter().map(|genre| ("genre[]", genre.as_str())));
                self.client.get(self.url_for(ANIME_INDEX_PATH)?).query(&query)
            }
            Listing::Search(keyword) => self
                .client
                .get(self.base_url.clone())
                .query(&[("s", keyword.as_str())]),
        };

        let html = self.fetch_html(request, &format!("{:?}", listing)).await?;
        parse_listing(&self.base_url, &html, listing)
    }

    async fn server_list(&self, video_id: &str) -> Result<Vec<ServerResource>, ScraperError> {
        let url = self.url_for(video_id)?;
        let html = self.fetch_html(self.client.get(url), video_id).await?;

        parse_server_list(&html)
    }

    async fn embed_url(&self, selector: &ServerSelector) -> Result<String, ScraperError> {
        let url = self.url_for(PLAYER_ENDPOINT)?;
        let request = self.client.post(url).form(&selector.form_fields());
        let html = self.fetch_html(request, PLAYER_ENDPOINT).await?;

        parse_embed_url(&html)
    }
}

/// Turns an anime slug or path into the path of its anime page
fn anime_path(anime_id: &str) -> String {
    let trimmed = anime_id.trim_matches('/');
    if trimmed.starts_with("anime/") {
        format!("{}/", trimmed)
    } else {
        format!("anime/{}/", trimmed)
    }
}

fn selector(css: &str) -> Result<Selector, ScraperError> {
    Selector::parse(css).map_err(|e| ScraperError::Selector(e.to_string()))
}

/// Whitespace-trimmed text content of an element
fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Resolves a link on the page to its site-local path
///
/// The base URL's own path is stripped, so the result resolves back to the
/// same page through [`SamehadakuScraper::url_for`]. Links outside the base
/// keep their full path.
fn site_path(base: &Url, href: &str) -> Result<String, ScraperError> {
    let url = base.join(href).map_err(|source| ScraperError::InvalidUrl {
        url: href.to_string(),
        source,
    })?;

    let path = url.path();
    let local = path
        .strip_prefix(base.path().trim_end_matches('/'))
        .filter(|rest| rest.starts_with('/'))
        .unwrap_or(path);

    Ok(local.to_string())
}

/// Extracts the title and the newest-first episode links from an anime page
fn parse_anime_page(base: &Url, html: &str) -> Result<AnimePage, ScraperError> {
    let document = Html::parse_document(html);
    let title_selector = selector(".infoanime .entry-title")?;
    let episode_selector = selector(".epsleft a")?;

    let raw_title = document
        .select(&title_selector)
        .next()
        .map(text_of)
        .ok_or(ScraperError::MissingField {
            field: "title",
            context: "anime page".to_string(),
        })?;
    let title = raw_title
        .strip_prefix(TITLE_PREFIX)
        .unwrap_or(&raw_title)
        .trim()
        .to_string();

    let mut episodes = Vec::new();
    for link in document.select(&episode_selector) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        episodes.push(site_path(base, href)?);
    }

    Ok(AnimePage { title, episodes })
}

/// Extracts the entries of a listing page in page order
///
/// Entries without a link or a title are skipped.
fn parse_listing(base: &Url, html: &str, listing: &Listing) -> Result<Vec<ListingEntry>, ScraperError> {
    let (link_css, title_css) = match listing {
        Listing::TopTen => (".topten-animesu a", Some(".judul")),
        Listing::LatestUpdates => (".widget_senction .post-show .entry-title a", None),
        Listing::PopularByGenre(_) | Listing::Search(_) => ("article .animepost a", Some(".title")),
    };

    let document = Html::parse_document(html);
    let link_selector = selector(link_css)?;
    let title_selector = title_css.map(selector).transpose()?;

    let mut entries = Vec::new();
    for link in document.select(&link_selector) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };

        let title = match &title_selector {
            Some(title_selector) => link.select(title_selector).next().map(text_of).unwrap_or_default(),
            None => text_of(link),
        };

        if title.is_empty() {
            continue;
        }

        match site_path(base, href) {
            Ok(path) => entries.push(ListingEntry { title, path }),
            Err(e) => tracing::debug!(href, error = %e, "skipping listing entry"),
        }
    }

    Ok(entries)
}

/// Extracts the video servers offered on an episode page
///
/// Entries missing any of the `data-post`, `data-nume` or `data-type`
/// attributes cannot be resolved and are skipped.
fn parse_server_list(html: &str) -> Result<Vec<ServerResource>, ScraperError> {
    let document = Html::parse_document(html);
    let server_selector = selector("#server ul li div")?;

    let servers = document
        .select(&server_selector)
        .filter_map(|server| {
            let attrs = server.value();
            Some(ServerResource {
                post: attrs.attr("data-post")?.to_string(),
                nume: attrs.attr("data-nume")?.to_string(),
                kind: attrs.attr("data-type")?.to_string(),
                name: text_of(server),
            })
        })
        .collect();

    Ok(servers)
}

/// Extracts the player URL from the ajax endpoint's response
fn parse_embed_url(html: &str) -> Result<String, ScraperError> {
    let fragment = Html::parse_fragment(html);
    let iframe_selector = selector("iframe")?;

    fragment
        .select(&iframe_selector)
        .next()
        .and_then(|iframe| iframe.value().attr("src"))
        .map(|src| src.trim().to_string())
        .filter(|src| !src.is_empty())
        .ok_or(ScraperError::MissingField {
            field: "iframe src",
            context: "player response".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local_http::{LocalServer, Reply};

    fn base() -> Url {
        Url::parse("https://samehadaku.now/").unwrap()
    }

    const ANIME_PAGE: &str = r#"
        <html><body>
          <div class="infoanime">
            <h2 class="entry-title">Nonton Anime Shingeki no Kyojin </h2>
          </div>
          <div class="lstepsiode listeps">
            <ul>
              <li><div class="epsleft"><span class="lchx"><a href="https://samehadaku.now/shingeki-no-kyojin-episode-3/">Episode 3</a></span></div></li>
              <li><div class="epsleft"><span class="lchx"><a href="/shingeki-no-kyojin-episode-2/">Episode 2</a></span></div></li>
              <li><div class="epsleft"><span class="lchx"><a href="https://samehadaku.now/shingeki-no-kyojin-episode-1/">Episode 1</a></span></div></li>
            </ul>
          </div>
        </body></html>
    "#;

    const HOME_PAGE: &str = r#"
        <html><body>
          <div class="topten-animesu">
            <ul>
              <li><a href="https://samehadaku.now/anime/one-piece/"><span class="judul">One Piece</span></a></li>
              <li><a href="https://samehadaku.now/anime/kimetsu-no-yaiba/"><span class="judul"> Kimetsu no Yaiba </span></a></li>
              <li><a><span class="judul">No Link</span></a></li>
            </ul>
          </div>
          <div class="widget_senction">
            <div class="post-show">
              <ul>
                <li><h2 class="entry-title"><a href="https://samehadaku.now/anime/spy-x-family/">Spy x Family</a></h2></li>
                <li><h2 class="entry-title"><a href="https://samehadaku.now/anime/empty/"> </a></h2></li>
              </ul>
            </div>
          </div>
        </body></html>
    "#;

    const SEARCH_PAGE: &str = r#"
        <html><body>
          <article><div class="animepost"><a href="https://samehadaku.now/anime/one-piece/"><div class="title">One Piece</div></a></div></article>
          <article><div class="animepost"><a href="https://samehadaku.now/anime/one-piece-film-red/"><div class="title">One Piece Film: Red</div></a></div></article>
        </body></html>
    "#;

    const EPISODE_PAGE: &str = r#"
        <html><body>
          <div id="server">
            <ul>
              <li><div class="east_player_option" data-post="29771" data-nume="1" data-type="schtml"><span>Blogspot 360p</span></div></li>
              <li><div class="east_player_option" data-post="29771" data-nume="2" data-type="schtml"><span>Pixeldrain 720p</span></div></li>
              <li><div class="east_player_option" data-nume="3"><span>Broken</span></div></li>
            </ul>
          </div>
        </body></html>
    "#;

    #[test]
    fn test_anime_path() {
        assert_eq!(anime_path("shingeki-no-kyojin"), "anime/shingeki-no-kyojin/");
        assert_eq!(anime_path("/anime/shingeki-no-kyojin/"), "anime/shingeki-no-kyojin/");
        assert_eq!(anime_path("anime/one-piece"), "anime/one-piece/");
    }

    #[test]
    fn test_site_path() {
        assert_eq!(site_path(&base(), "https://samehadaku.now/anime/x/").unwrap(), "/anime/x/");
        assert_eq!(site_path(&base(), "/anime/y/").unwrap(), "/anime/y/");
        assert_eq!(site_path(&base(), "https://mirror.example/z/").unwrap(), "/z/");
    }

    #[test]
    fn test_parse_anime_page() {
        let page = parse_anime_page(&base(), ANIME_PAGE).unwrap();

        assert_eq!(page.title, "Shingeki no Kyojin");
        assert_eq!(
            page.episodes,
            vec![
                "/shingeki-no-kyojin-episode-3/",
                "/shingeki-no-kyojin-episode-2/",
                "/shingeki-no-kyojin-episode-1/",
            ]
        );
    }

    #[test]
    fn test_anime_page_without_title() {
        let result = parse_anime_page(&base(), "<html><body><p>gone</p></body></html>");

        assert!(matches!(result, Err(ScraperError::MissingField { field: "title", .. })));
    }

    #[test]
    fn test_parse_top_ten() {
        let entries = parse_listing(&base(), HOME_PAGE, &Listing::TopTen).unwrap();

        assert_eq!(
            entries,
            vec![
                ListingEntry {
                    title: "One Piece".to_string(),
                    path: "/anime/one-piece/".to_string(),
                },
                ListingEntry {
                    title: "Kimetsu no Yaiba".to_string(),
                    path: "/anime/kimetsu-no-yaiba/".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_parse_latest_updates() {
        let entries = parse_listing(&base(), HOME_PAGE, &Listing::LatestUpdates).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Spy x Family");
        assert_eq!(entries[0].path, "/anime/spy-x-family/");
    }

    #[test]
    fn test_parse_search_results() {
        let entries = parse_listing(&base(), SEARCH_PAGE, &Listing::Search("one piece".into())).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].title, "One Piece Film: Red");
        assert_eq!(entries[1].path, "/anime/one-piece-film-red/");
    }

    #[test]
    fn test_parse_server_list() {
        let servers = parse_server_list(EPISODE_PAGE).unwrap();

        assert_eq!(servers.len(), 2);
        assert_eq!(
            servers[1],
            ServerResource {
                post: "29771".to_string(),
                nume: "2".to_string(),
                kind: "schtml".to_string(),
                name: "Pixeldrain 720p".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_embed_url() {
        let html = r#"<div class="player-embed"><iframe src=" https://www.blogger.com/video.g?token=AD6v5dx " frameborder="0"></iframe></div>"#;

        assert_eq!(
            parse_embed_url(html).unwrap(),
            "https://www.blogger.com/video.g?token=AD6v5dx"
        );
        assert!(matches!(
            parse_embed_url("<p>no player</p>"),
            Err(ScraperError::MissingField { field: "iframe src", .. })
        ));
    }

    #[test]
    fn test_site_path_under_sub_path() {
        let scraper = SamehadakuScraper::new(reqwest::Client::new(), "https://mirror.example/sub").unwrap();
        let base = scraper.base_url.clone();

        let path = site_path(&base, "https://mirror.example/sub/anime/x/").unwrap();
        assert_eq!(path, "/anime/x/");
        assert_eq!(scraper.url_for(&path).unwrap().as_str(), "https://mirror.example/sub/anime/x/");

        assert_eq!(site_path(&base, "/subway/").unwrap(), "/subway/");
        assert_eq!(site_path(&base, "ep-1/").unwrap(), "/ep-1/");
    }

    #[tokio::test]
    async fn test_missing_page_is_page_not_found() {
        let mut server = LocalServer::bind().await;
        server.serve(Vec::new());
        let scraper = SamehadakuScraper::new(reqwest::Client::new(), &server.url("/")).unwrap();

        let result = scraper.anime_page("unknown").await;

        assert!(matches!(result, Err(ScraperError::PageNotFound(_))));
        assert_eq!(server.requests()[0].target, "/anime/unknown/");
    }

    #[tokio::test]
    async fn test_embed_url_posts_player_form_without_name() {
        let mut server = LocalServer::bind().await;
        server.serve(vec![(
            "/wp-admin/admin-ajax.php",
            Reply::html(r#"<iframe src="https://www.blogger.com/video.g?token=AD6" allowfullscreen></iframe>"#),
        )]);
        let scraper = SamehadakuScraper::new(reqwest::Client::new(), &server.url("/")).unwrap();
        let resource = ServerResource {
            post: "29771".to_string(),
            nume: "1".to_string(),
            kind: "schtml".to_string(),
            name: "Blogspot 360p".to_string(),
        };

        let embed = scraper.embed_url(&ServerSelector::from(&resource)).await.unwrap();
        assert_eq!(embed, "https://www.blogger.com/video.g?token=AD6");

        let requests = server.requests();
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].target, "/wp-admin/admin-ajax.php");
        assert_eq!(
            requests[0].header("content-type"),
            Some("application/x-www-form-urlencoded")
        );
        let fields: Vec<(String, String)> = url::form_urlencoded::parse(&requests[0].body).into_owned().collect();
        assert_eq!(
            fields,
            vec![
                ("action".to_string(), "player_ajax".to_string()),
                ("post".to_string(), "29771".to_string()),
                ("nume".to_string(), "1".to_string()),
                ("type".to_string(), "schtml".to_string()),
            ]
        );
        assert!(!requests[0].body_text().contains("Blogspot"));
    }

    #[tokio::test]
    async fn test_genre_listing_query() {
        let mut server = LocalServer::bind().await;
        server.serve(vec![("/daftar-anime-2/", Reply::html(SEARCH_PAGE))]);
        let scraper = SamehadakuScraper::new(reqwest::Client::new(), &server.url("/")).unwrap();

        let entries = scraper
            .listing(&Listing::PopularByGenre(vec!["action".to_string(), "comedy".to_string()]))
            .await
            .unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(
            server.requests()[0].target,
            "/daftar-anime-2/?order=popular&genre%5B%5D=action&genre%5B%5D=comedy"
        );
    }

    #[tokio::test]
    async fn test_paths_round_trip_under_sub_path() {
        let mut server = LocalServer::bind().await;
        server.serve(vec![
            (
                "/sub/anime/snk/",
                Reply::html(
                    r#"<div class="infoanime"><h1 class="entry-title">Nonton Anime SnK</h1></div>
                       <div class="epsleft"><a href="/sub/snk-episode-1/">Episode 1</a></div>"#,
                ),
            ),
            ("/sub/snk-episode-1/", Reply::html(EPISODE_PAGE)),
        ]);
        let scraper = SamehadakuScraper::new(reqwest::Client::new(), &server.url("/sub/")).unwrap();

        let page = scraper.anime_page("snk").await.unwrap();
        assert_eq!(page.episodes, vec!["/snk-episode-1/"]);

        let servers = scraper.server_list(&page.episodes[0]).await.unwrap();
        assert_eq!(servers.len(), 2);

        let targets: Vec<String> = server.requests().into_iter().map(|r| r.target).collect();
        assert_eq!(targets, vec!["/sub/anime/snk/", "/sub/snk-episode-1/"]);
    }

    #[test]
    fn test_scraper_rejects_invalid_base_url() {
        let result = SamehadakuScraper::new(reqwest::Client::new(), "not a url");

        assert!(matches!(result, Err(ScraperError::InvalidUrl { .. })));
    }
}
