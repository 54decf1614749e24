//! Reading playlist bytes from disk or the network

use std::fs;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use flate2::read::GzDecoder;

use crate::error::ImportError;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Download a playlist (supports HTTP and HTTPS)
pub fn download(url: &str, user_agent: &str) -> Result<String, ImportError> {
    let agent = ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(120)))
        .timeout_connect(Some(Duration::from_secs(30)))
        .http_status_as_error(false)
        .build()
        .new_agent();

    let mut response = agent
        .get(url)
        .header("User-Agent", user_agent)
        .call()
        .map_err(|e| ImportError::Http(e.to_string()))?;

    let status = response.status().as_u16();
    if status != 200 {
        return Err(ImportError::Status(status));
    }

    let bytes = response
        .body_mut()
        .with_config()
        .limit(64 * 1024 * 1024)
        .read_to_vec()
        .map_err(|e| ImportError::Http(e.to_string()))?;

    decode_bytes(&bytes)
}

pub fn read_file(path: &Path) -> Result<String, ImportError> {
    let bytes = fs::read(path)?;
    decode_bytes(&bytes)
}

/// Inflate gzip payloads, then decode as UTF-8 (lossy for stray bytes).
pub fn decode_bytes(bytes: &[u8]) -> Result<String, ImportError> {
    if bytes.starts_with(&GZIP_MAGIC) {
        let mut inflated = Vec::with_capacity(bytes.len() * 4);
        GzDecoder::new(bytes).read_to_end(&mut inflated)?;
        return Ok(String::from_utf8_lossy(&inflated).into_owned());
    }
    Ok(String::from_utf8_lossy(bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_decode_plain_and_gzip() {
        let text = "#EXTM3U\n#EXTINF:-1,A\nhttp://a\n";
        assert_eq!(decode_bytes(text.as_bytes()).unwrap(), text);

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();
        assert_eq!(decode_bytes(&compressed).unwrap(), text);
    }

    #[test]
    fn test_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.m3u");
        fs::write(&path, "#EXTM3U\n").unwrap();
        assert_eq!(read_file(&path).unwrap(), "#EXTM3U\n");

        assert!(matches!(read_file(&dir.path().join("missing.m3u")), Err(ImportError::Io(_))));
    }
}
