use anyhow::{Context, Result, anyhow, bail};
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use reqwest::header::{CONTENT_DISPOSITION, HeaderMap, HeaderValue, LOCATION, USER_AGENT};
use reqwest::{StatusCode, Url, redirect};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::load_config;
use crate::download::{progress_bar, stream_copy};
use crate::error::ApiError;
use crate::list::{ListRequest, ListResponse, Pages};
use crate::model::{Campaign, Dataset, Order, Resource};
use crate::util::{filename_from_disposition, guess_filename_from_url, same_origin, urljoin};

/// API version this client speaks.
pub const API_VERSION: &str = "2020-12";

const MAX_REDIRECTS: usize = 10;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL, typically `https://api.arlula.com`.
    pub url: String,
    /// API key.
    pub key: String,
    /// API secret.
    pub secret: String,
    /// Whether to verify TLS certificates.
    pub verify: bool,
}

#[derive(Debug, Clone)]
pub struct Client {
    url: String,
    key: String,
    secret: String,

    timeout: Duration,
    progress: bool,

    http: HttpClient,
}

struct DataResponse {
    response: Response,
    filename: Option<String>,
}

impl Client {
    /// Creates a client using environment variables and/or `.arlularc`.
    ///
    /// This is equivalent to `Client::new(None, None, None, None)`.
    pub fn from_env() -> Result<Self> {
        Self::new(None, None, None, None)
    }

    /// Creates a client using (in order of precedence):
    /// - explicit arguments
    /// - environment variables `ARLULA_URL` / `ARLULA_API_KEY` / `ARLULA_API_SECRET`
    /// - config file from `ARLULA_RC` or `.arlularc`
    ///
    /// No request is made; call [`Client::validate_credentials`] to check the
    /// key and secret.
    pub fn new(
        url: Option<String>,
        key: Option<String>,
        secret: Option<String>,
        verify: Option<bool>,
    ) -> Result<Self> {
        let cfg = load_config(url, key, secret, verify)?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("arlula-rs/{}", env!("CARGO_PKG_VERSION")))
                .unwrap_or(HeaderValue::from_static("arlula-rs")),
        );
        default_headers.insert("X-API-Version", HeaderValue::from_static(API_VERSION));

        // Downloads can run for a long time, so only API calls get a timeout.
        let mut builder = HttpClient::builder()
            .default_headers(default_headers)
            .redirect(redirect::Policy::none())
            .connect_timeout(Duration::from_secs(30))
            .timeout(None);

        if !cfg.verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder.build().context("failed to build HTTP client")?;

        Ok(Self {
            url: cfg.url,
            key: cfg.key,
            secret: cfg.secret,
            timeout: Duration::from_secs(60),
            progress: true,
            http,
        })
    }

    /// Timeout for API calls. Resource downloads are not affected.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Show a progress bar on stderr while downloading to a file.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Checks the key and secret against the API.
    ///
    /// Only a `200 OK` counts as valid.
    pub fn validate_credentials(&self) -> Result<()> {
        let url = self.endpoint("/test");
        let req = self.apply_auth(self.http.get(&url).timeout(self.timeout));
        let resp = self.send(req, &url)?;
        let status = resp.status();
        if status != StatusCode::OK {
            let text = read_body(resp, &url)?;
            return Err(ApiError::from_body(status, &url, &text).into());
        }
        Ok(())
    }

    /// Lists one page of the datasets this account has access to.
    ///
    /// Listed datasets don't have their resources populated.
    pub fn list_datasets(&self, req: Option<ListRequest>) -> Result<ListResponse<Dataset>> {
        self.list("/datasets", req)
    }

    /// Iterates over every dataset, fetching `size` per page.
    pub fn datasets(&self, size: Option<u32>) -> impl Iterator<Item = Result<Dataset>> + '_ {
        self.pages("/datasets", size)
    }

    /// Lists one page of orders. Listed orders don't carry their campaigns or
    /// datasets.
    pub fn list_orders(&self, req: Option<ListRequest>) -> Result<ListResponse<Order>> {
        self.list("/orders", req)
    }

    /// Iterates over every order, fetching `size` per page.
    pub fn orders(&self, size: Option<u32>) -> impl Iterator<Item = Result<Order>> + '_ {
        self.pages("/orders", size)
    }

    pub fn get_order(&self, order: impl AsRef<str>) -> Result<Order> {
        let url = self.endpoint(&format!("/order/{}", order.as_ref()));
        self.get_json(&url, &[])
    }

    /// Campaigns placed by an order. This listing is not paged.
    pub fn list_order_campaigns(&self, order: impl AsRef<str>) -> Result<ListResponse<Campaign>> {
        let url = self.endpoint(&format!("/order/{}/campaigns", order.as_ref()));
        self.get_json(&url, &[])
    }

    /// Datasets delivered for an order. This listing is not paged.
    pub fn list_order_datasets(&self, order: impl AsRef<str>) -> Result<ListResponse<Dataset>> {
        let url = self.endpoint(&format!("/order/{}/datasets", order.as_ref()));
        self.get_json(&url, &[])
    }

    /// Lists one page of tasking campaigns.
    pub fn list_campaigns(&self, req: Option<ListRequest>) -> Result<ListResponse<Campaign>> {
        self.list("/campaigns", req)
    }

    /// Iterates over every campaign, fetching `size` per page.
    pub fn campaigns(&self, size: Option<u32>) -> impl Iterator<Item = Result<Campaign>> + '_ {
        self.pages("/campaigns", size)
    }

    pub fn get_campaign(&self, campaign: impl AsRef<str>) -> Result<Campaign> {
        let url = self.endpoint(&format!("/campaign/{}", campaign.as_ref()));
        self.get_json(&url, &[])
    }

    /// Datasets captured by a campaign. This listing is not paged.
    pub fn list_campaign_datasets(
        &self,
        campaign: impl AsRef<str>,
    ) -> Result<ListResponse<Dataset>> {
        let url = self.endpoint(&format!("/campaign/{}/datasets", campaign.as_ref()));
        self.get_json(&url, &[])
    }

    /// Gets a dataset with its resources.
    pub fn get_dataset(&self, dataset: impl AsRef<str>) -> Result<Dataset> {
        let url = self.endpoint(&format!("/dataset/{}", dataset.as_ref()));
        self.get_json(&url, &[])
    }

    pub fn get_resource(&self, resource: impl AsRef<str>) -> Result<Resource> {
        let url = self.endpoint(&format!("/resource/{}", resource.as_ref()));
        self.get_json(&url, &[])
    }

    /// Streams a resource to disk and returns the path written.
    ///
    /// Without `filepath` the file is named by the supplier (through the
    /// `Content-Disposition` header) and placed in `directory`, or the current
    /// directory if that is also `None`. `directory` is ignored when
    /// `filepath` is given.
    pub fn download_resource_as_file(
        &self,
        resource: impl AsRef<str>,
        filepath: Option<&Path>,
        directory: Option<&Path>,
    ) -> Result<PathBuf> {
        self.download_resource_with_progress(resource, filepath, directory, |_| {})
    }

    /// Like [`Client::download_resource_as_file`], calling `on_progress` with
    /// the completed fraction (0.0 to 1.0) after every chunk.
    ///
    /// `on_progress` is never called if the server does not send the size.
    pub fn download_resource_with_progress(
        &self,
        resource: impl AsRef<str>,
        filepath: Option<&Path>,
        directory: Option<&Path>,
        on_progress: impl FnMut(f64),
    ) -> Result<PathBuf> {
        let resource = resource.as_ref();
        let DataResponse {
            mut response,
            filename,
        } = self.open_resource_data(resource)?;

        let target = match filepath {
            Some(path) => path.to_path_buf(),
            None => {
                let name = filename.unwrap_or_else(|| resource.to_string());
                match directory {
                    Some(dir) => dir.join(name),
                    None => std::env::current_dir()
                        .context("failed to resolve current directory")?
                        .join(name),
                }
            }
        };

        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create directory {}", parent.display()))?;
            }
        }

        let total = response.content_length();
        let mut out = File::create(&target)
            .with_context(|| format!("failed to open {}", target.display()))?;

        let pb = self.progress.then(|| progress_bar(total));
        let downloaded = stream_copy(
            &mut response,
            &mut out,
            total,
            |n| {
                if let Some(pb) = &pb {
                    pb.set_position(n);
                }
            },
            on_progress,
        )
        .with_context(|| format!("failed to download resource {}", resource))?;

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }

        if let Some(total) = total {
            if downloaded < total {
                bail!(
                    "download failed: downloaded {} byte(s) out of {}",
                    downloaded,
                    total
                );
            }
        }

        tracing::info!(
            "downloaded resource {} ({} bytes) to {}",
            resource,
            downloaded,
            target.display()
        );
        Ok(target)
    }

    /// Downloads a resource into memory. Prefer
    /// [`Client::download_resource_as_file`] for large files.
    pub fn download_resource_as_memory(&self, resource: impl AsRef<str>) -> Result<Vec<u8>> {
        let resource = resource.as_ref();
        let data = self.open_resource_data(resource)?;
        let bytes = data
            .response
            .bytes()
            .with_context(|| format!("failed to download resource {}", resource))?;
        Ok(bytes.to_vec())
    }

    /// Downloads every resource of a dataset into `directory`.
    pub fn download_dataset(
        &self,
        dataset: impl AsRef<str>,
        directory: Option<&Path>,
    ) -> Result<Vec<PathBuf>> {
        let dataset = self.get_dataset(dataset)?;
        dataset
            .resources
            .iter()
            .map(|r| self.download_resource_as_file(r, None, directory))
            .collect()
    }

    // The data endpoint redirects to storage; the supplier's filename is only
    // on the first response, so redirects are walked by hand.
    fn open_resource_data(&self, resource: &str) -> Result<DataResponse> {
        let start = Url::parse(&self.endpoint(&format!("/resource/{}/data", resource)))
            .context("invalid API url")?;
        let mut url = start.clone();
        let mut disposition: Option<String> = None;

        for _ in 0..=MAX_REDIRECTS {
            let mut req = self.http.get(url.clone());
            if same_origin(&start, &url) {
                req = self.apply_auth(req);
            }
            let resp = self.send(req, url.as_str())?;

            if disposition.is_none() {
                disposition = resp
                    .headers()
                    .get(CONTENT_DISPOSITION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
            }

            let status = resp.status();
            if status.is_redirection() {
                let location = resp
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| anyhow!("redirect from {} without a Location header", url))?;
                url = url
                    .join(location)
                    .with_context(|| format!("invalid redirect location {}", location))?;
                continue;
            }

            if !status.is_success() {
                let text = read_body(resp, url.as_str())?;
                return Err(ApiError::from_body(status, url.as_str(), &text).into());
            }

            let filename = disposition
                .as_deref()
                .and_then(filename_from_disposition)
                .or_else(|| {
                    if url != start {
                        guess_filename_from_url(url.as_str())
                    } else {
                        None
                    }
                });
            return Ok(DataResponse {
                response: resp,
                filename,
            });
        }

        bail!("too many redirects downloading resource {}", resource)
    }

    fn list<T: DeserializeOwned>(
        &self,
        path: &str,
        req: Option<ListRequest>,
    ) -> Result<ListResponse<T>> {
        let req = req.unwrap_or_default();
        self.get_json(&self.endpoint(path), &req.query())
    }

    fn pages<'a, T: DeserializeOwned + 'a>(
        &'a self,
        path: &'static str,
        size: Option<u32>,
    ) -> impl Iterator<Item = Result<T>> + 'a {
        Pages::new(ListRequest::new(None, size), move |req| {
            self.list::<T>(path, Some(req))
        })
    }

    fn endpoint(&self, path: &str) -> String {
        urljoin(&self.url, &format!("/api{}", path))
    }

    fn apply_auth(&self, req: RequestBuilder) -> RequestBuilder {
        req.basic_auth(&self.key, Some(&self.secret))
    }

    fn send(&self, req: RequestBuilder, url: &str) -> Result<Response> {
        tracing::debug!("GET {}", url);
        req.send()
            .with_context(|| format!("could not connect to {}", url))
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        let mut req = self.http.get(url).timeout(self.timeout);
        if !query.is_empty() {
            req = req.query(query);
        }
        let req = self.apply_auth(req);
        let resp = self.send(req, url)?;

        let status = resp.status();
        let text = read_body(resp, url)?;
        if !status.is_success() {
            return Err(ApiError::from_body(status, url, &text).into());
        }

        serde_json::from_str::<T>(&text)
            .with_context(|| format!("failed to parse API JSON (url={}, status={})", url, status))
    }
}

fn read_body(resp: Response, url: &str) -> Result<String> {
    resp.text()
        .with_context(|| format!("failed to read response body from {}", url))
}
