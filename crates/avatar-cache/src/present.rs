//! URL presentation strategies
//!
//! Converts a cached file path into a URL the caller's UI layer can load:
//! a direct file reference, or a loopback HTTP URL with the path encoded as
//! a query argument.

use std::net::SocketAddr;

#[derive(Debug, Clone, Copy)]
pub enum UrlPresenter {
    DirectFile,
    Loopback { addr: SocketAddr },
}

impl UrlPresenter {
    pub fn present(&self, path: &str) -> String {
        match self {
            UrlPresenter::DirectFile => format!("file://{}", path),
            UrlPresenter::Loopback { addr } => {
                format!("http://{}/avatar?path={}", addr, urlencoding::encode(path))
            }
        }
    }
}
