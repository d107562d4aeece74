// src/session.rs

//! Composes the HTTP session used for every GitHub API call.
//!
//! Three concerns are decided independently, each by a fixed precedence:
//!
//! * **TLS trust**: explicit CA bundle > auto-detected system bundle > verification
//!   disabled > default trust store.
//! * **Proxy**: proxy given in the configuration > `HTTPS_PROXY`/`HTTP_PROXY`
//!   environment variables > auto-detected proxy. The environment always beats
//!   auto-detection.
//! * **Auth**: bearer token header when a token is present.
//!
//! The decisions are made by [`SessionBuilder::plan`] as plain data, and only then
//! turned into a `reqwest` client by [`SessionBuilder::build`]. Auto-detection
//! failures are logged and ignored; they never prevent a session from being built.

use crate::constants::{GITHUB_JSON_MEDIA_TYPE, USER_AGENT};
use crate::errors::{io_error_with_path, ConfigError, Error, Result};
use crate::http::ReqwestTransport;
use crate::security::{validate_proxy_url, ProxySettings};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Certificate, Proxy};
use std::collections::BTreeSet;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How server certificates are verified.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TlsTrust {
    /// Use the default trust store.
    #[default]
    Verify,
    /// Accept any certificate. Only used when explicitly requested.
    Disabled,
    /// Trust only the certificates in this PEM bundle.
    Bundle(PathBuf),
}

/// Immutable inputs for building a session.
#[derive(Clone)]
pub struct SessionConfig {
    pub token: Option<String>,
    pub tls: TlsTrust,
    /// A proxy given explicitly (already validated).
    pub proxy: Option<ProxySettings>,
    pub timeout: Duration,
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("tls", &self.tls)
            .field("proxy", &self.proxy.as_ref().map(|p| &p.server))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token: None,
            tls: TlsTrust::Verify,
            proxy: None,
            timeout: Duration::from_secs(crate::constants::DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Proxy URLs reported by a [`ProxyProvider`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyEndpoints {
    pub http: Option<String>,
    pub https: Option<String>,
}

impl ProxyEndpoints {
    fn is_empty(&self) -> bool {
        self.http.is_none() && self.https.is_none()
    }
}

/// Source of an auto-detected proxy (OS settings, PAC evaluation, ...).
pub trait ProxyProvider: Send + Sync {
    fn detect(&self) -> Result<ProxyEndpoints>;
}

impl<F> ProxyProvider for F
where
    F: Fn() -> Result<ProxyEndpoints> + Send + Sync,
{
    fn detect(&self) -> Result<ProxyEndpoints> {
        self()
    }
}

/// Source of an auto-detected CA bundle.
pub trait CertificateProvider: Send + Sync {
    /// Returns the path of a PEM bundle, or `None` when nothing was found.
    fn bundle_path(&self) -> Result<Option<PathBuf>>;
}

impl<F> CertificateProvider for F
where
    F: Fn() -> Result<Option<PathBuf>> + Send + Sync,
{
    fn bundle_path(&self) -> Result<Option<PathBuf>> {
        self()
    }
}

/// Proxy provider backed by the `ALL_PROXY` convention used by curl.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllProxyEnvProvider;

impl ProxyProvider for AllProxyEnvProvider {
    fn detect(&self) -> Result<ProxyEndpoints> {
        let value = std::env::var("ALL_PROXY")
            .or_else(|_| std::env::var("all_proxy"))
            .ok()
            .filter(|v| !v.trim().is_empty());
        Ok(ProxyEndpoints {
            http: value.clone(),
            https: value,
        })
    }
}

/// Tracks temporary certificate files so they are removed when the owner goes away.
///
/// Safe to share between engine instances in one process. `cleanup_all` removes
/// every tracked file best-effort, ignores files that are already gone, and can
/// be called any number of times. Dropping the registry cleans up as well.
#[derive(Debug, Default)]
pub struct TempCertRegistry {
    files: Mutex<BTreeSet<PathBuf>>,
}

impl TempCertRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking `path`.
    pub fn add(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        log::debug!("Tracking temporary certificate file {}", path.display());
        self.lock().insert(path);
    }

    /// Currently tracked files.
    pub fn tracked(&self) -> Vec<PathBuf> {
        self.lock().iter().cloned().collect()
    }

    /// Removes every tracked file and returns how many were actually deleted.
    pub fn cleanup_all(&self) -> usize {
        let files = std::mem::take(&mut *self.lock());
        let mut removed = 0;
        for path in files {
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => log::warn!(
                    "Failed to remove temporary certificate file {}: {}",
                    path.display(),
                    e
                ),
            }
        }
        removed
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeSet<PathBuf>> {
        // A panic while holding the lock cannot leave the set half-updated.
        self.files.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for TempCertRegistry {
    fn drop(&mut self) {
        self.cleanup_all();
    }
}

/// Well-known locations of the system CA bundle on Unix-like systems.
const SYSTEM_BUNDLE_LOCATIONS: &[&str] = &[
    "/etc/ssl/certs/ca-certificates.crt",
    "/etc/pki/tls/certs/ca-bundle.crt",
    "/etc/ssl/ca-bundle.pem",
    "/etc/pki/ca-trust/extracted/pem/tls-ca-bundle.pem",
    "/etc/ssl/cert.pem",
    "/usr/local/etc/openssl/cert.pem",
];

const PEM_CERT_MARKER: &str = "-----BEGIN CERTIFICATE-----";

/// Builds a combined PEM bundle from the system trust store plus extra PEM files
/// (e.g. a corporate root exported by IT), written to a registered temp file.
pub struct SystemBundleProvider {
    registry: Arc<TempCertRegistry>,
    sources: Vec<PathBuf>,
}

impl SystemBundleProvider {
    /// Uses `SSL_CERT_FILE` (when set) and the well-known system locations.
    pub fn new(registry: Arc<TempCertRegistry>) -> Self {
        let mut sources: Vec<PathBuf> = std::env::var_os("SSL_CERT_FILE")
            .map(PathBuf::from)
            .into_iter()
            .collect();
        sources.extend(SYSTEM_BUNDLE_LOCATIONS.iter().map(PathBuf::from));
        Self { registry, sources }
    }

    /// Uses exactly the given source files.
    pub fn with_sources(registry: Arc<TempCertRegistry>, sources: Vec<PathBuf>) -> Self {
        Self { registry, sources }
    }

    /// Appends extra PEM files to the bundle.
    pub fn with_extra(mut self, extra: impl IntoIterator<Item = PathBuf>) -> Self {
        self.sources.extend(extra);
        self
    }
}

impl CertificateProvider for SystemBundleProvider {
    fn bundle_path(&self) -> Result<Option<PathBuf>> {
        let mut seen = BTreeSet::new();
        let mut bundle = String::new();
        for source in &self.sources {
            let canonical = source.canonicalize().unwrap_or_else(|_| source.clone());
            if !seen.insert(canonical) {
                continue;
            }
            match std::fs::read_to_string(source) {
                Ok(pem) if pem.contains(PEM_CERT_MARKER) => {
                    log::debug!("Adding certificates from {}", source.display());
                    bundle.push_str(pem.trim_end());
                    bundle.push('\n');
                }
                Ok(_) => log::debug!("No PEM certificates in {}", source.display()),
                Err(_) => {}
            }
        }
        if bundle.is_empty() {
            return Ok(None);
        }

        let mut file = tempfile::Builder::new()
            .prefix("treesync-ca-")
            .suffix(".pem")
            .tempfile()
            .map_err(|e| io_error_with_path(e, std::env::temp_dir()))?;
        file.write_all(bundle.as_bytes())
            .map_err(|e| io_error_with_path(e, file.path()))?;
        let path = file
            .into_temp_path()
            .keep()
            .map_err(|e| io_error_with_path(e.error, std::env::temp_dir()))?;
        self.registry.add(&path);
        Ok(Some(path))
    }
}

/// The TLS decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsPlan {
    DefaultStore,
    Disabled,
    ExplicitBundle(PathBuf),
    /// `verify` is false when `--no-ssl-verify` was also requested; it picks
    /// the fallback if the bundle cannot be loaded.
    DetectedBundle { path: PathBuf, verify: bool },
}

/// Where the chosen proxy came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxySource {
    None,
    Configured,
    Environment,
    Detected,
}

/// The proxy decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyPlan {
    pub source: ProxySource,
    pub http: Option<ProxySettings>,
    pub https: Option<ProxySettings>,
}

impl ProxyPlan {
    fn none() -> Self {
        Self {
            source: ProxySource::None,
            http: None,
            https: None,
        }
    }
}

/// Every decision needed to construct the HTTP client.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionPlan {
    /// Default headers, lowercase names.
    pub headers: Vec<(String, String)>,
    pub tls: TlsPlan,
    pub proxy: ProxyPlan,
    pub timeout: Duration,
}

impl SessionPlan {
    /// Header lookup by lowercase name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Debug for SessionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(n, v)| {
                if n == "authorization" {
                    (n.as_str(), "<redacted>")
                } else {
                    (n.as_str(), v.as_str())
                }
            })
            .collect();
        f.debug_struct("SessionPlan")
            .field("headers", &headers)
            .field("tls", &self.tls)
            .field("proxy", &self.proxy)
            .field("timeout", &self.timeout)
            .finish()
    }
}

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Builds the session in a fixed precedence order. See the module docs.
pub struct SessionBuilder {
    config: SessionConfig,
    proxy_provider: Option<Box<dyn ProxyProvider>>,
    cert_provider: Option<Box<dyn CertificateProvider>>,
    env: EnvLookup,
}

impl SessionBuilder {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            proxy_provider: None,
            cert_provider: None,
            env: Box::new(|key| std::env::var(key).ok()),
        }
    }

    /// Enables proxy auto-detection through `provider`.
    pub fn auto_proxy(mut self, provider: impl ProxyProvider + 'static) -> Self {
        self.proxy_provider = Some(Box::new(provider));
        self
    }

    /// Enables CA bundle auto-detection through `provider`.
    pub fn auto_cert(mut self, provider: impl CertificateProvider + 'static) -> Self {
        self.cert_provider = Some(Box::new(provider));
        self
    }

    /// Replaces the environment lookup used for `HTTP(S)_PROXY`.
    pub fn env_lookup(mut self, lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        self.env = Box::new(lookup);
        self
    }

    /// Decides headers, TLS trust, and proxy without touching the network.
    pub fn plan(&self) -> SessionPlan {
        let mut headers = vec![
            ("accept".to_string(), GITHUB_JSON_MEDIA_TYPE.to_string()),
            ("user-agent".to_string(), USER_AGENT.to_string()),
        ];
        if let Some(token) = self.config.token.as_deref().filter(|t| !t.is_empty()) {
            log::debug!("Using token for authentication.");
            headers.push(("authorization".to_string(), format!("Bearer {}", token)));
        }

        SessionPlan {
            headers,
            tls: self.plan_tls(),
            proxy: self.plan_proxy(),
            timeout: self.config.timeout,
        }
    }

    fn plan_tls(&self) -> TlsPlan {
        if let TlsTrust::Bundle(path) = &self.config.tls {
            log::debug!("Using CA bundle {}", path.display());
            return TlsPlan::ExplicitBundle(path.clone());
        }
        if let Some(provider) = &self.cert_provider {
            match provider.bundle_path() {
                Ok(Some(path)) => {
                    log::info!("Using auto-detected certificate bundle {}", path.display());
                    return TlsPlan::DetectedBundle {
                        path,
                        verify: self.config.tls != TlsTrust::Disabled,
                    };
                }
                Ok(None) => log::debug!("No certificate bundle detected; using default trust."),
                Err(e) => log::warn!("Certificate detection failed, using default trust: {}", e),
            }
        }
        if self.config.tls == TlsTrust::Disabled {
            log::warn!("SSL certificate verification is disabled.");
            return TlsPlan::Disabled;
        }
        TlsPlan::DefaultStore
    }

    fn plan_proxy(&self) -> ProxyPlan {
        if let Some(proxy) = &self.config.proxy {
            log::debug!("Using configured proxy {}", proxy.server);
            return ProxyPlan {
                source: ProxySource::Configured,
                http: Some(proxy.clone()),
                https: Some(proxy.clone()),
            };
        }

        let from_env = ProxyEndpoints {
            http: self.lookup_env(&["HTTP_PROXY", "http_proxy"]),
            https: self.lookup_env(&["HTTPS_PROXY", "https_proxy"]),
        };
        if !from_env.is_empty() {
            let plan = validated_plan(ProxySource::Environment, &from_env);
            if plan.http.is_some() || plan.https.is_some() {
                return plan;
            }
        }

        if let Some(provider) = &self.proxy_provider {
            match provider.detect() {
                Ok(endpoints) if !endpoints.is_empty() => {
                    let plan = validated_plan(ProxySource::Detected, &endpoints);
                    if plan.http.is_some() || plan.https.is_some() {
                        log::info!("Using auto-detected proxy.");
                        return plan;
                    }
                }
                Ok(_) => log::debug!("No proxy detected."),
                Err(e) => log::warn!("Proxy detection failed, continuing without proxy: {}", e),
            }
        }
        ProxyPlan::none()
    }

    fn lookup_env(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .find_map(|key| (self.env)(key))
            .filter(|v| !v.trim().is_empty())
    }

    /// Builds a transport from [`Self::plan`].
    pub fn build(&self) -> Result<ReqwestTransport> {
        let plan = self.plan();
        build_client(&plan).map(ReqwestTransport::new)
    }
}

fn validated_plan(source: ProxySource, endpoints: &ProxyEndpoints) -> ProxyPlan {
    let check = |raw: &Option<String>| {
        raw.as_deref().and_then(|url| match validate_proxy_url(url) {
            Ok(settings) => Some(settings),
            Err(e) => {
                log::warn!("Ignoring proxy from {:?}: {}", source, e);
                None
            }
        })
    };
    ProxyPlan {
        source,
        http: check(&endpoints.http),
        https: check(&endpoints.https),
    }
}

/// Turns a [`SessionPlan`] into a configured blocking client.
///
/// An auto-detected bundle that fails to load is dropped with a warning and the
/// client falls back to the default store, or to no verification if requested.
pub fn build_client(plan: &SessionPlan) -> Result<Client> {
    match &plan.tls {
        TlsPlan::DetectedBundle { path, verify } => {
            client_with_tls(plan, &plan.tls).or_else(|e| {
                log::warn!(
                    "Ignoring auto-detected certificate bundle {}: {}",
                    path.display(),
                    e
                );
                let fallback = if *verify {
                    TlsPlan::DefaultStore
                } else {
                    TlsPlan::Disabled
                };
                client_with_tls(plan, &fallback)
            })
        }
        tls => client_with_tls(plan, tls),
    }
}

fn client_with_tls(plan: &SessionPlan, tls: &TlsPlan) -> Result<Client> {
    let mut headers = HeaderMap::new();
    for (name, value) in &plan.headers {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(name, e))?;
        let mut header_value = HeaderValue::from_str(value).map_err(|e| invalid(name, e))?;
        if header_name == reqwest::header::AUTHORIZATION {
            header_value.set_sensitive(true);
        }
        headers.insert(header_name, header_value);
    }

    // Proxies come only from the plan, never from reqwest's own env lookup.
    let mut builder = Client::builder()
        .default_headers(headers)
        .timeout(plan.timeout)
        .no_proxy();

    match tls {
        TlsPlan::DefaultStore => {}
        TlsPlan::Disabled => builder = builder.danger_accept_invalid_certs(true),
        TlsPlan::ExplicitBundle(path) | TlsPlan::DetectedBundle { path, .. } => {
            for cert in load_pem_bundle(path)? {
                builder = builder.add_root_certificate(cert);
            }
            builder = builder.tls_built_in_root_certs(false);
        }
    }

    if let Some(settings) = &plan.proxy.http {
        builder = builder.proxy(to_proxy(settings, |url| Proxy::http(url))?);
    }
    if let Some(settings) = &plan.proxy.https {
        builder = builder.proxy(to_proxy(settings, |url| Proxy::https(url))?);
    }

    builder.build().map_err(|e| {
        Error::Config(ConfigError::InvalidValue {
            option: "session".to_string(),
            reason: e.to_string(),
        })
    })
}

fn load_pem_bundle(path: &Path) -> Result<Vec<Certificate>> {
    let pem = std::fs::read(path).map_err(|e| io_error_with_path(e, path))?;
    Certificate::from_pem_bundle(&pem).map_err(|e| {
        ConfigError::InvalidValue {
            option: "--ca-bundle".to_string(),
            reason: format!("{}: {}", path.display(), e),
        }
        .into()
    })
}

fn to_proxy(
    settings: &ProxySettings,
    ctor: impl Fn(&str) -> reqwest::Result<Proxy>,
) -> Result<Proxy> {
    let proxy = ctor(&settings.server).map_err(|e| ConfigError::InvalidValue {
        option: "proxy".to_string(),
        reason: e.to_string(),
    })?;
    Ok(match (&settings.username, &settings.password) {
        (Some(user), pass) => proxy.basic_auth(user, pass.as_deref().unwrap_or_default()),
        _ => proxy,
    })
}

fn invalid(name: &str, e: impl fmt::Display) -> Error {
    ConfigError::InvalidValue {
        option: name.to_string(),
        reason: e.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + Send + Sync + 'static {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn detected(url: &'static str) -> impl Fn() -> Result<ProxyEndpoints> + Send + Sync {
        move || {
            Ok(ProxyEndpoints {
                http: Some(url.to_string()),
                https: Some(url.to_string()),
            })
        }
    }

    #[test]
    fn test_token_sets_bearer_header() {
        let builder = SessionBuilder::new(SessionConfig {
            token: Some("abc123".to_string()),
            ..Default::default()
        })
        .env_lookup(env(&[]));
        let plan = builder.plan();
        assert_eq!(plan.header("authorization"), Some("Bearer abc123"));
        assert_eq!(plan.header("accept"), Some(GITHUB_JSON_MEDIA_TYPE));
        assert!(!format!("{:?}", plan).contains("abc123"));
    }

    #[test]
    fn test_no_token_means_no_auth_header() {
        let plan = SessionBuilder::new(SessionConfig::default())
            .env_lookup(env(&[]))
            .plan();
        assert_eq!(plan.header("authorization"), None);
    }

    #[test]
    fn test_environment_proxy_beats_detected() {
        let plan = SessionBuilder::new(SessionConfig::default())
            .env_lookup(env(&[("HTTPS_PROXY", "http://env-proxy:3128")]))
            .auto_proxy(detected("http://pac-proxy:8080"))
            .plan();
        assert_eq!(plan.proxy.source, ProxySource::Environment);
        assert_eq!(
            plan.proxy.https.map(|p| p.server).as_deref(),
            Some("http://env-proxy:3128")
        );
        assert_eq!(plan.proxy.http, None);
    }

    #[test]
    fn test_detected_proxy_used_without_environment() {
        let plan = SessionBuilder::new(SessionConfig::default())
            .env_lookup(env(&[]))
            .auto_proxy(detected("http://pac-proxy:8080"))
            .plan();
        assert_eq!(plan.proxy.source, ProxySource::Detected);
        assert_eq!(
            plan.proxy.http.map(|p| p.server).as_deref(),
            Some("http://pac-proxy:8080")
        );
    }

    #[test]
    fn test_configured_proxy_beats_environment() {
        let configured = validate_proxy_url("http://cfg-proxy:9000").unwrap();
        let plan = SessionBuilder::new(SessionConfig {
            proxy: Some(configured.clone()),
            ..Default::default()
        })
        .env_lookup(env(&[("HTTPS_PROXY", "http://env-proxy:3128")]))
        .plan();
        assert_eq!(plan.proxy.source, ProxySource::Configured);
        assert_eq!(plan.proxy.https, Some(configured));
    }

    #[test]
    fn test_proxy_detection_failure_is_swallowed() {
        let plan = SessionBuilder::new(SessionConfig::default())
            .env_lookup(env(&[]))
            .auto_proxy(|| -> Result<ProxyEndpoints> {
                Err(ConfigError::MissingValue {
                    option: "pac".into(),
                }
                .into())
            })
            .plan();
        assert_eq!(plan.proxy, ProxyPlan::none());
    }

    #[test]
    fn test_invalid_environment_proxy_is_ignored() {
        let plan = SessionBuilder::new(SessionConfig::default())
            .env_lookup(env(&[("HTTPS_PROXY", "file:///etc/passwd")]))
            .plan();
        assert_eq!(plan.proxy.source, ProxySource::None);
    }

    #[test]
    fn test_tls_precedence() {
        let bundle = PathBuf::from("/corp/ca.pem");
        let detected_path = PathBuf::from("/tmp/auto.pem");

        let explicit = SessionBuilder::new(SessionConfig {
            tls: TlsTrust::Bundle(bundle.clone()),
            ..Default::default()
        })
        .env_lookup(env(&[]))
        .auto_cert({
            let p = detected_path.clone();
            move || -> Result<Option<PathBuf>> { Ok(Some(p.clone())) }
        })
        .plan();
        assert_eq!(explicit.tls, TlsPlan::ExplicitBundle(bundle));

        let auto = SessionBuilder::new(SessionConfig {
            tls: TlsTrust::Disabled,
            ..Default::default()
        })
        .env_lookup(env(&[]))
        .auto_cert({
            let p = detected_path.clone();
            move || -> Result<Option<PathBuf>> { Ok(Some(p.clone())) }
        })
        .plan();
        assert_eq!(
            auto.tls,
            TlsPlan::DetectedBundle {
                path: detected_path,
                verify: false,
            }
        );

        let disabled = SessionBuilder::new(SessionConfig {
            tls: TlsTrust::Disabled,
            ..Default::default()
        })
        .env_lookup(env(&[]))
        .auto_cert(|| -> Result<Option<PathBuf>> {
            Err(ConfigError::MissingValue {
                option: "cert".into(),
            }
            .into())
        })
        .plan();
        assert_eq!(disabled.tls, TlsPlan::Disabled);

        let default = SessionBuilder::new(SessionConfig::default())
            .env_lookup(env(&[]))
            .plan();
        assert_eq!(default.tls, TlsPlan::DefaultStore);
    }

    #[test]
    fn test_build_with_defaults_succeeds() {
        let builder = SessionBuilder::new(SessionConfig::default()).env_lookup(env(&[]));
        assert!(builder.build().is_ok());
    }

    #[test]
    fn test_build_falls_back_when_detected_bundle_is_unusable() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let bad = dir.path().join("auto.pem");
        std::fs::write(
            &bad,
            "-----BEGIN CERTIFICATE-----\nnot a certificate\n-----END CERTIFICATE-----\n",
        )?;

        for tls in [TlsTrust::Verify, TlsTrust::Disabled] {
            let builder = SessionBuilder::new(SessionConfig {
                tls,
                ..Default::default()
            })
            .env_lookup(env(&[]))
            .auto_cert({
                let p = bad.clone();
                move || -> Result<Option<PathBuf>> { Ok(Some(p.clone())) }
            });
            assert!(matches!(builder.plan().tls, TlsPlan::DetectedBundle { .. }));
            assert!(builder.build().is_ok());
        }
        Ok(())
    }

    #[test]
    fn test_build_with_missing_detected_bundle_falls_back() {
        let builder = SessionBuilder::new(SessionConfig::default())
            .env_lookup(env(&[]))
            .auto_cert(|| -> Result<Option<PathBuf>> {
                Ok(Some(PathBuf::from("/definitely/not/here/auto.pem")))
            });
        assert!(builder.build().is_ok());
    }

    #[test]
    fn test_build_with_missing_bundle_fails() {
        let builder = SessionBuilder::new(SessionConfig {
            tls: TlsTrust::Bundle(PathBuf::from("/definitely/not/here.pem")),
            ..Default::default()
        })
        .env_lookup(env(&[]));
        assert!(matches!(builder.build(), Err(Error::Io { .. })));
    }

    #[test]
    fn test_registry_cleanup_is_idempotent() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.pem");
        let b = dir.path().join("b.pem");
        std::fs::write(&a, "x").unwrap();
        std::fs::write(&b, "y").unwrap();

        let registry = TempCertRegistry::new();
        registry.add(&a);
        registry.add(&b);
        registry.add(dir.path().join("never-created.pem"));
        std::fs::remove_file(&b).unwrap();

        assert_eq!(registry.cleanup_all(), 1);
        assert!(!a.exists());
        assert_eq!(registry.cleanup_all(), 0);
        assert!(registry.tracked().is_empty());
    }

    #[test]
    fn test_registry_concurrent_add_and_drop_cleanup() {
        let dir = tempdir().unwrap();
        let registry = Arc::new(TempCertRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                let path = dir.path().join(format!("cert-{}.pem", i));
                std::thread::spawn(move || {
                    std::fs::write(&path, "pem").unwrap();
                    registry.add(path);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.tracked().len(), 8);

        drop(Arc::try_unwrap(registry).unwrap());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_system_bundle_provider_concatenates_and_registers() {
        let dir = tempdir().unwrap();
        let system = dir.path().join("system.pem");
        let corp = dir.path().join("corp.pem");
        let junk = dir.path().join("junk.txt");
        std::fs::write(&system, "-----BEGIN CERTIFICATE-----\nSYS\n-----END CERTIFICATE-----\n").unwrap();
        std::fs::write(&corp, "-----BEGIN CERTIFICATE-----\nCORP\n-----END CERTIFICATE-----\n").unwrap();
        std::fs::write(&junk, "not a certificate").unwrap();

        let registry = Arc::new(TempCertRegistry::new());
        let provider = SystemBundleProvider::with_sources(
            Arc::clone(&registry),
            vec![system, dir.path().join("missing.pem"), junk],
        )
        .with_extra(vec![corp]);

        let bundle = provider.bundle_path().unwrap().unwrap();
        let content = std::fs::read_to_string(&bundle).unwrap();
        assert!(content.contains("SYS") && content.contains("CORP"));
        assert!(!content.contains("not a certificate"));
        assert_eq!(registry.tracked(), vec![bundle.clone()]);

        registry.cleanup_all();
        assert!(!bundle.exists());
    }

    #[test]
    fn test_system_bundle_provider_without_sources_yields_none() {
        let registry = Arc::new(TempCertRegistry::new());
        let provider = SystemBundleProvider::with_sources(Arc::clone(&registry), vec![]);
        assert_eq!(provider.bundle_path().unwrap(), None);
        assert!(registry.tracked().is_empty());
    }
}
