use std::io::{Read, Write};
use std::time::Duration;

use engine_logging::{engine_debug, engine_trace};
use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use pagetree_core::{
    Attachment, AttachmentSource, DocumentSource, Page, PageUpdater, SourceError, Space,
    SpaceListing,
};

/// 4 MiB. Downloads run one at a time, so this can be raised freely.
pub const DOWNLOAD_CHUNK_SIZE: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub token: String,
    pub connect_timeout: Duration,
    /// Whole-request timeout; `None` lets large attachments take as long as they need.
    pub request_timeout: Option<Duration>,
    pub child_page_limit: usize,
    pub attachment_page_limit: usize,
    pub download_chunk_size: usize,
}

impl ClientSettings {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            ..Self::default()
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8090/".to_string(),
            token: String::new(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: None,
            child_page_limit: 200,
            attachment_page_limit: 500,
            download_chunk_size: DOWNLOAD_CHUNK_SIZE,
        }
    }
}

/// Blocking client for the Confluence REST API (`rest/api/...`).
#[derive(Debug, Clone)]
pub struct ConfluenceClient {
    settings: ClientSettings,
    base: Url,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct ContentDto {
    id: String,
    title: String,
    #[serde(default)]
    body: Option<BodyDto>,
    #[serde(default)]
    version: Option<VersionDto>,
}

#[derive(Debug, Deserialize)]
struct BodyDto {
    #[serde(default)]
    storage: Option<StorageDto>,
}

#[derive(Debug, Deserialize)]
struct StorageDto {
    value: String,
}

#[derive(Debug, Deserialize)]
struct VersionDto {
    number: u64,
}

#[derive(Debug, Deserialize)]
struct ResultsDto<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
    #[serde(default)]
    size: usize,
}

#[derive(Debug, Deserialize)]
struct IdDto {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SpaceDto {
    key: String,
    #[serde(default)]
    homepage: Option<IdDto>,
}

#[derive(Debug, Deserialize)]
struct AttachmentDto {
    title: String,
    #[serde(rename = "_links")]
    links: AttachmentLinksDto,
}

#[derive(Debug, Deserialize)]
struct AttachmentLinksDto {
    download: String,
}

impl ConfluenceClient {
    pub fn new(settings: ClientSettings) -> Result<Self, SourceError> {
        let mut base = Url::parse(settings.base_url.trim())
            .map_err(|err| SourceError::InvalidUrl(format!("{}: {err}", settings.base_url)))?;
        // Url::join drops the last path segment unless the base ends with a slash.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(map_reqwest_error)?;
        Ok(Self {
            settings,
            base,
            http,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, SourceError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|err| SourceError::InvalidUrl(format!("{path}: {err}")))
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, SourceError> {
        let url = self.endpoint(path)?;
        engine_trace!("GET {} {:?}", url, query);
        let response = self
            .http
            .get(url.clone())
            .bearer_auth(&self.settings.token)
            .query(query)
            .send()
            .map_err(map_reqwest_error)?;
        let response = check_status(response, &url)?;
        response
            .json::<T>()
            .map_err(|err| SourceError::Decode(format!("{url}: {err}")))
    }

    fn fetch_content(&self, id: &str, expand: &str) -> Result<ContentDto, SourceError> {
        self.get_json(
            &format!("rest/api/content/{id}"),
            &[("expand", expand.to_string())],
        )
    }

    /// Walk a paginated `results` listing until the server returns a short page.
    fn collect_paged<T: DeserializeOwned>(
        &self,
        path: &str,
        limit: usize,
    ) -> Result<Vec<T>, SourceError> {
        let limit = limit.max(1);
        let mut start = 0;
        let mut all = Vec::new();
        loop {
            let page: ResultsDto<T> = self.get_json(
                path,
                &[("start", start.to_string()), ("limit", limit.to_string())],
            )?;
            let fetched = page.results.len();
            all.extend(page.results);
            if fetched < limit {
                return Ok(all);
            }
            start += fetched;
        }
    }
}

impl DocumentSource for ConfluenceClient {
    fn fetch_page(&self, id: &str) -> Result<Page, SourceError> {
        let content = self.fetch_content(id, "body.storage")?;
        let body = content
            .body
            .and_then(|b| b.storage)
            .map(|s| s.value)
            .unwrap_or_default();
        Ok(Page {
            id: content.id,
            title: content.title,
            body,
        })
    }

    fn child_ids(&self, id: &str) -> Result<Vec<String>, SourceError> {
        let children: Vec<IdDto> = self.collect_paged(
            &format!("rest/api/content/{id}/child/page"),
            self.settings.child_page_limit,
        )?;
        Ok(children.into_iter().map(|c| c.id).collect())
    }

    fn list_spaces(&self, start: usize, limit: usize) -> Result<SpaceListing, SourceError> {
        let page: ResultsDto<SpaceDto> = self.get_json(
            "rest/api/space",
            &[
                ("start", start.to_string()),
                ("limit", limit.to_string()),
                ("expand", "description.plain,homepage".to_string()),
            ],
        )?;
        Ok(SpaceListing {
            size: page.size,
            spaces: page
                .results
                .into_iter()
                .map(|s| Space {
                    key: s.key,
                    homepage_id: s.homepage.map(|h| h.id),
                })
                .collect(),
        })
    }
}

impl AttachmentSource for ConfluenceClient {
    fn list_attachments(&self, page_id: &str) -> Result<Vec<Attachment>, SourceError> {
        let attachments: Vec<AttachmentDto> = self.collect_paged(
            &format!("rest/api/content/{page_id}/child/attachment"),
            self.settings.attachment_page_limit,
        )?;
        Ok(attachments
            .into_iter()
            .map(|a| Attachment {
                title: a.title,
                download_path: a.links.download,
            })
            .collect())
    }

    fn download_attachment(
        &self,
        attachment: &Attachment,
        sink: &mut dyn Write,
    ) -> Result<u64, SourceError> {
        let url = self.endpoint(&attachment.download_path)?;
        engine_debug!("Downloading attachment {} from {}", attachment.title, url);
        let response = self
            .http
            .get(url.clone())
            .bearer_auth(&self.settings.token)
            .send()
            .map_err(map_reqwest_error)?;
        let mut response = check_status(response, &url)?;

        let mut buf = vec![0u8; self.settings.download_chunk_size.max(1)];
        let mut written = 0u64;
        loop {
            let read = response.read(&mut buf)?;
            if read == 0 {
                break;
            }
            sink.write_all(&buf[..read])?;
            written += read as u64;
        }
        sink.flush()?;
        Ok(written)
    }
}

impl PageUpdater for ConfluenceClient {
    fn update_page(&self, id: &str, title: &str, body: &str) -> Result<(), SourceError> {
        let current = self.fetch_content(id, "version")?;
        let next_version = current.version.map(|v| v.number).unwrap_or(0) + 1;
        let url = self.endpoint(&format!("rest/api/content/{id}"))?;
        let payload = json!({
            "id": id,
            "type": "page",
            "title": title,
            "version": { "number": next_version },
            "body": {
                "storage": { "value": body, "representation": "storage" }
            }
        });
        engine_debug!("PUT {} version={}", url, next_version);
        let response = self
            .http
            .put(url.clone())
            .bearer_auth(&self.settings.token)
            .json(&payload)
            .send()
            .map_err(map_reqwest_error)?;
        check_status(response, &url)?;
        Ok(())
    }
}

fn check_status(response: Response, url: &Url) -> Result<Response, SourceError> {
    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(SourceError::NotFound {
            url: url.to_string(),
        });
    }
    if !status.is_success() {
        return Err(SourceError::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    Ok(response)
}

fn map_reqwest_error(err: reqwest::Error) -> SourceError {
    if err.is_timeout() {
        return SourceError::Network(format!("timeout: {err}"));
    }
    if err.is_decode() {
        return SourceError::Decode(err.to_string());
    }
    SourceError::Network(err.to_string())
}
