#![allow(dead_code)]
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::Path;

use async_trait::async_trait;
use dotgit_core::DumpJob;
use dotgit_dump::{
    DumpError, FetchResponse, LooseObject, ObjectId, ObjectKind, Result, Transport,
};
use flate2::Compression;
use flate2::write::ZlibEncoder;
use parking_lot::Mutex;

pub const BASE_URL: &str = "http://fake.test/app";

/// In-memory server. Unknown paths answer 404; failing paths never answer.
pub struct FakeTransport {
    routes: HashMap<String, FetchResponse>,
    failing: HashSet<String>,
    requests: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            failing: HashSet::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn route(mut self, path: &str, response: FetchResponse) -> Self {
        self.routes.insert(path.to_string(), response);
        self
    }

    pub fn file(self, path: &str, body: impl Into<Vec<u8>>) -> Self {
        let response =
            FetchResponse::new(200, body.into()).with_content_type("application/octet-stream");
        self.route(path, response)
    }

    pub fn html(self, path: &str, body: impl Into<String>) -> Self {
        let response = FetchResponse::new(200, body.into()).with_content_type("text/html");
        self.route(path, response)
    }

    pub fn listing(self, path: &str, entries: &[&str]) -> Self {
        self.html(path, listing_page(path, entries))
    }

    pub fn redirect(self, path: &str, location: &str) -> Self {
        let response = FetchResponse::new(301, "")
            .with_content_type("text/html")
            .with_location(format!("{BASE_URL}/{location}"));
        self.route(path, response)
    }

    pub fn status(self, path: &str, status: u16) -> Self {
        let response = FetchResponse::new(status, "denied").with_content_type("text/html");
        self.route(path, response)
    }

    /// Makes `path` fail at the transport level, as if retries ran out.
    pub fn fail(mut self, path: &str) -> Self {
        self.failing.insert(path.to_string());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self, path: &str) -> usize {
        self.requests.lock().iter().filter(|p| *p == path).count()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    fn base_url(&self) -> &str {
        BASE_URL
    }

    async fn get(&self, path: &str) -> Result<FetchResponse> {
        self.requests.lock().push(path.to_string());
        if self.failing.contains(path) {
            return Err(DumpError::transport(path, "connection reset by peer"));
        }
        Ok(self
            .routes
            .get(path)
            .cloned()
            .unwrap_or_else(|| FetchResponse::new(404, "Not Found").with_content_type("text/html")))
    }
}

/// An Apache-style index page.
pub fn listing_page(path: &str, entries: &[&str]) -> String {
    let mut html = format!(
        "<html><head><title>Index of /{path}</title></head><body><h1>Index of /{path}</h1>\n\
         <a href=\"?C=N;O=D\">Name</a>\n<a href=\"../\">Parent Directory</a>\n"
    );
    for entry in entries {
        html.push_str(&format!("<a href=\"{entry}\">{entry}</a>\n"));
    }
    html.push_str("</body></html>");
    html
}

pub fn job(dest: &Path, git: &str) -> DumpJob {
    DumpJob::builder()
        .url(format!("{BASE_URL}/.git/"))
        .destination(dest)
        .retries(0)
        .git_executable(git)
        .build()
        .expect("valid test job")
}

pub fn id(n: u8) -> ObjectId {
    ObjectId::new([n; 20])
}

pub fn loose(kind: ObjectKind, payload: impl Into<Vec<u8>>) -> Vec<u8> {
    LooseObject {
        kind,
        payload: payload.into(),
    }
    .encode()
    .expect("encode loose object")
}

pub fn commit_payload(tree: ObjectId, parents: &[ObjectId]) -> Vec<u8> {
    let mut text = format!("tree {tree}\n");
    for parent in parents {
        text.push_str(&format!("parent {parent}\n"));
    }
    text.push_str("author Jane <jane@example.com> 1700000000 +0000\n");
    text.push_str("committer Jane <jane@example.com> 1700000000 +0000\n\ninitial\n");
    text.into_bytes()
}

pub fn tree_payload(entries: &[(&str, &str, ObjectId)]) -> Vec<u8> {
    let mut out = Vec::new();
    for (mode, name, id) in entries {
        out.extend_from_slice(format!("{mode} {name}\0").as_bytes());
        out.extend_from_slice(id.as_bytes());
    }
    out
}

fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn type_code(kind: ObjectKind) -> u8 {
    match kind {
        ObjectKind::Commit => 1,
        ObjectKind::Tree => 2,
        ObjectKind::Blob => 3,
        ObjectKind::Tag => 4,
    }
}

pub fn size_header(code: u8, mut size: usize) -> Vec<u8> {
    let mut out = vec![(code << 4) | (size & 0x0f) as u8];
    size >>= 4;
    while size > 0 {
        *out.last_mut().unwrap() |= 0x80;
        out.push((size & 0x7f) as u8);
        size >>= 7;
    }
    out
}

/// Builds a version 2 index and pack holding undeltified objects.
pub fn pack_pair(members: &[(ObjectId, ObjectKind, Vec<u8>)]) -> (Vec<u8>, Vec<u8>) {
    let mut pack = b"PACK".to_vec();
    pack.extend_from_slice(&2u32.to_be_bytes());
    pack.extend_from_slice(&(members.len() as u32).to_be_bytes());

    let mut entries = Vec::new();
    for (id, kind, data) in members {
        entries.push((*id, pack.len() as u32));
        pack.extend(size_header(type_code(*kind), data.len()));
        pack.extend(zlib(data));
    }
    pack.extend_from_slice(&[0; 20]);
    entries.sort();

    let mut idx = vec![0xff, b't', b'O', b'c', 0, 0, 0, 2];
    for bucket in 0..256usize {
        let n = entries
            .iter()
            .filter(|(id, _)| id.as_bytes()[0] as usize <= bucket)
            .count();
        idx.extend_from_slice(&(n as u32).to_be_bytes());
    }
    for (id, _) in &entries {
        idx.extend_from_slice(id.as_bytes());
    }
    idx.extend(std::iter::repeat_n(0u8, entries.len() * 4));
    for (_, offset) in &entries {
        idx.extend_from_slice(&offset.to_be_bytes());
    }
    idx.extend_from_slice(&[0; 40]);

    (idx, pack)
}
