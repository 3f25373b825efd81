//! Utilities for configuration and build.
#![warn(missing_docs)]

use ringlet_core::dht::PeerRecord;

use crate::error::Error;
use crate::error::Result;

/// Version string of this build, with the git hash when known.
pub fn build_version() -> String {
    let mut infos = vec![env!("CARGO_PKG_VERSION")];
    if let Some(git_hash) = option_env!("GIT_SHORT_HASH") {
        infos.push(git_hash);
    }
    infos.join("-")
}

/// Expand path with "~" to absolute path.
pub fn expand_home<P>(path: P) -> Result<std::path::PathBuf>
where P: AsRef<std::path::Path> {
    let Ok(stripped) = path.as_ref().strip_prefix("~") else {
        return Ok(path.as_ref().to_path_buf());
    };
    let Some(mut p) = home::home_dir() else {
        return Err(Error::HomeDirError);
    };
    p.push(stripped);
    Ok(p)
}

/// Create parent directory of a path if not exists.
pub fn ensure_parent_dir<P>(path: P) -> Result<()>
where P: AsRef<std::path::Path> {
    let path = expand_home(path)?;
    let parent = path.parent().ok_or(Error::ParentDirError)?;
    if !parent.as_os_str().is_empty() && !parent.is_dir() {
        std::fs::create_dir_all(parent).map_err(|e| Error::CreateFileError(e.to_string()))?;
    };
    Ok(())
}

/// Parse `host:port` into a [PeerRecord].
pub fn parse_peer(address: &str) -> Result<PeerRecord> {
    let (host, port) = address
        .rsplit_once(':')
        .ok_or_else(|| Error::InvalidAddress(address.to_string()))?;
    if host.is_empty() {
        return Err(Error::InvalidAddress(address.to_string()));
    }
    let port = port
        .parse::<u16>()
        .map_err(|_| Error::InvalidAddress(address.to_string()))?;
    Ok(PeerRecord::new(host, port))
}
