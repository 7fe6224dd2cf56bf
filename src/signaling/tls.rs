use rustls::{
    ClientConfig, RootCertStore, ServerConfig,
    pki_types::{CertificateDer, PrivateKeyDer},
};
use rustls_pemfile::{certs, private_key};
use std::{
    fs::File,
    io::{self, BufReader},
    path::Path,
    sync::Arc,
};

/// Loads a certificate chain from a PEM file.
///
/// # Errors
///
/// Returns an `io::Error` if the file cannot be opened or holds no certificates.
pub fn load_certs(path: &Path) -> io::Result<Vec<CertificateDer<'static>>> {
    let file = File::open(path).map_err(|e| {
        io::Error::new(e.kind(), format!("opening cert {}: {e}", path.display()))
    })?;
    let mut reader = BufReader::new(file);

    let chain: Vec<CertificateDer<'static>> = certs(&mut reader)
        .collect::<Result<_, _>>()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("invalid certs: {e}")))?;

    if chain.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("no certificates found in {}", path.display()),
        ));
    }
    Ok(chain)
}

/// Loads the first private key (PKCS#8, PKCS#1 or SEC1) from a PEM file.
///
/// # Errors
///
/// Returns an `io::Error` if the file cannot be opened or holds no key.
pub fn load_private_key(path: &Path) -> io::Result<PrivateKeyDer<'static>> {
    let file = File::open(path).map_err(|e| {
        io::Error::new(e.kind(), format!("opening key {}: {e}", path.display()))
    })?;
    let mut reader = BufReader::new(file);

    private_key(&mut reader)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("invalid key: {e}")))?
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("no private key found in {}", path.display()),
            )
        })
}

/// ServerConfig for the signaling server: no client auth, one certificate.
///
/// Built once at startup and shared by every accepted connection.
pub fn build_signaling_server_config(cert_path: &Path, key_path: &Path) -> io::Result<Arc<ServerConfig>> {
    let chain = load_certs(cert_path)?;
    let key = load_private_key(key_path)?;

    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(chain, key)
        .map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("TLS config error: {e}"))
        })?;

    Ok(Arc::new(config))
}

/// ClientConfig that trusts only the CA certificates in `ca_path`.
pub fn build_signaling_client_config(ca_path: &Path) -> io::Result<Arc<ClientConfig>> {
    let mut root_store = RootCertStore::empty();
    for cert in load_certs(ca_path)? {
        root_store
            .add(cert)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("bad CA cert: {e}")))?;
    }

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Ok(Arc::new(config))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use std::fs;

    fn temp_file(name: &str, contents: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("meshroom-tls-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn missing_cert_file_is_not_found() {
        let err = load_certs(Path::new("/definitely/not/here.pem")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn pem_without_certificates_is_invalid_data() {
        let path = temp_file("empty.pem", "not a pem file\n");
        let err = load_certs(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        let err = load_private_key(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
