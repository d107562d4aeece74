// tests/common.rs

#![allow(dead_code)] // Each test binary uses a different subset of these helpers.

use std::collections::HashMap;
use std::io::Read;
use std::process::Command;
use std::sync::{Arc, Mutex};
use treesync::http::{HttpResponse, HttpTransport};
use treesync::{Config, ConfigBuilder, Result};

pub const API: &str = "https://api.github.com";
pub const REPO: &str = "https://api.github.com/repos/octo/hello";
pub const MAIN_SHA: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
pub const MASTER_SHA: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

// Helper function to get the binary command
pub fn treesync_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("treesync"));
    for var in [
        "GITHUB_TOKEN",
        "GITHUB_REPO_URL",
        "GITHUB_REF",
        "TREESYNC_LOCAL_PATH",
        "HTTP_PROXY",
        "HTTPS_PROXY",
        "ALL_PROXY",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

/// A config for `octo/hello` mirrored into `local`, with throttling pauses off.
pub fn config_builder(local: &std::path::Path) -> ConfigBuilder {
    ConfigBuilder::new()
        .repo_url("https://github.com/octo/hello")
        .local_path(local.to_string_lossy())
        .throttle_pause(std::time::Duration::ZERO)
}

pub fn config(local: &std::path::Path) -> Config {
    config_builder(local).build().expect("valid test config")
}

type BodyFactory = Box<dyn Fn() -> Box<dyn Read + Send> + Send + Sync>;

struct Route {
    status: u16,
    headers: Vec<(String, String)>,
    body: BodyFactory,
}

/// Serves a body in fixed-size pieces, like a network stream.
pub struct ChunkedBody {
    data: Vec<u8>,
    pos: usize,
    chunk: usize,
}

impl ChunkedBody {
    pub fn new(data: Vec<u8>, chunk: usize) -> Self {
        Self { data, pos: 0, chunk }
    }
}

impl Read for ChunkedBody {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let end = (self.pos + self.chunk.min(buf.len())).min(self.data.len());
        let n = end - self.pos;
        buf[..n].copy_from_slice(&self.data[self.pos..end]);
        self.pos = end;
        Ok(n)
    }
}

/// In-memory GitHub API. Unknown URLs answer 404 `{}`; HEAD is never scripted.
#[derive(Default)]
pub struct ScriptedApi {
    routes: HashMap<String, Route>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn json(mut self, url: &str, status: u16, body: serde_json::Value) -> Self {
        let bytes = body.to_string().into_bytes();
        self.routes.insert(
            url.to_string(),
            Route {
                status,
                headers: vec![],
                body: Box::new(move || Box::new(std::io::Cursor::new(bytes.clone()))),
            },
        );
        self
    }

    pub fn raw(mut self, url: &str, status: u16, headers: &[(&str, &str)], body: Vec<u8>, chunk: usize) -> Self {
        self.routes.insert(
            url.to_string(),
            Route {
                status,
                headers: headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                body: Box::new(move || Box::new(ChunkedBody::new(body.clone(), chunk))),
            },
        );
        self
    }

    /// Repository metadata plus a branch pointing at `sha` with `entries` as its tree.
    pub fn repo_with_branch(self, branch: &str, sha: &str, entries: serde_json::Value) -> Self {
        self.json(REPO, 200, serde_json::json!({"full_name": "octo/hello", "default_branch": branch}))
            .json(
                &format!("{}/git/ref/heads/{}", REPO, branch),
                200,
                serde_json::json!({"object": {"sha": sha, "type": "commit"}}),
            )
            .json(
                &format!("{}/git/trees/{}", REPO, sha),
                200,
                serde_json::json!({"sha": sha, "tree": entries, "truncated": false}),
            )
    }

    /// Answers `contents/<path>` inline with `body`.
    pub fn inline(self, path: &str, body: &[u8]) -> Self {
        use base64::Engine;
        self.json(
            &format!("{}/contents/{}", REPO, path),
            200,
            serde_json::json!({
                "type": "file",
                "size": body.len(),
                "encoding": "base64",
                "content": base64::engine::general_purpose::STANDARD.encode(body),
            }),
        )
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, needle: &str) -> usize {
        self.calls().iter().filter(|c| c.contains(needle)).count()
    }
}

impl HttpTransport for ScriptedApi {
    fn get(&self, url: &str, _params: &[(&str, &str)], _headers: &[(&str, &str)]) -> Result<HttpResponse> {
        self.calls.lock().unwrap().push(url.to_string());
        Ok(match self.routes.get(url) {
            Some(route) => HttpResponse::new(route.status, route.headers.clone(), (route.body)()),
            None => HttpResponse::from_bytes(404, vec![], b"{}".to_vec()),
        })
    }
}
