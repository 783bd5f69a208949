//! HTTP Basic authentication against a static bcrypt credential file.
//!
//! The credential file is a JSON object mapping usernames to bcrypt
//! hashes:
//!
//! ```json
//! { "alex": "$2a$10$/iEmHzBrsGbxT9Jx2KIReOPlnYs4ee7al3c234QQsnGslRix/hKQe" }
//! ```
//!
//! The server loads it once at startup and never writes it; the
//! `camgate-passwd` tool maintains it offline. Verification of an
//! unknown username still runs a full bcrypt check against a stored hash so
//! that "no such user" and "wrong password" cost the same.

use anyhow::Context;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Hash prefixes accepted as bcrypt.
const BCRYPT_PREFIXES: &[&str] = &["$2a$", "$2b$", "$2x$", "$2y$"];

/// Username/password pair taken from an `Authorization: Basic` header.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Parse the value of an `Authorization` header carrying Basic credentials.
///
/// Returns `None` for any other scheme, bad base64, non-UTF-8 payloads,
/// or a payload without a `:` separator.
pub fn parse_basic_auth(header_value: &str) -> Option<BasicCredentials> {
    let (scheme, payload) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(payload.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some(BasicCredentials {
        username: username.to_string(),
        password: password.to_string(),
    })
}

/// Read-only username -> bcrypt hash map.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    hashes: HashMap<String, String>,
    /// Hash checked when the username is unknown.
    decoy: Option<String>,
}

impl CredentialStore {
    /// Build a store from an in-memory map, rejecting non-bcrypt values.
    pub fn from_map(hashes: HashMap<String, String>) -> anyhow::Result<Self> {
        for (user, hash) in &hashes {
            if !BCRYPT_PREFIXES.iter().any(|p| hash.starts_with(p)) {
                anyhow::bail!("password hash for user '{user}' is not a bcrypt hash");
            }
        }
        let decoy = hashes.values().min().cloned();
        Ok(Self { hashes, decoy })
    }

    /// Load the JSON credential file at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading credential file {}", path.display()))?;
        let hashes: HashMap<String, String> = serde_json::from_str(&contents)
            .with_context(|| format!("parsing credential file {}", path.display()))?;
        Self::from_map(hashes)
    }

    /// Number of known users.
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    /// Whether no users are configured.
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// Check `password` for `username`.
    ///
    /// This is CPU-bound (bcrypt); async callers should run it on the
    /// blocking pool.
    pub fn verify(&self, username: &str, password: &str) -> bool {
        match self.hashes.get(username) {
            Some(hash) => bcrypt::verify(password, hash).unwrap_or(false),
            None => {
                if let Some(decoy) = &self.decoy {
                    let _ = bcrypt::verify(password, decoy);
                }
                false
            }
        }
    }
}

/// Hash `password` with bcrypt at `cost`.
pub fn hash_password(password: &str, cost: u32) -> anyhow::Result<String> {
    bcrypt::hash(password, cost).context("hashing password")
}

/// Insert or replace `username` in the credential file at `path`.
///
/// The file is created if missing. Entries are written sorted by
/// username.
pub fn upsert_credential<P: AsRef<Path>>(
    path: P,
    username: &str,
    hash: &str,
) -> anyhow::Result<()> {
    let path = path.as_ref();
    let mut entries: BTreeMap<String, String> = if path.exists() {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading credential file {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("parsing credential file {}", path.display()))?
    } else {
        BTreeMap::new()
    };
    entries.insert(username.to_string(), hash.to_string());

    let mut out = serde_json::to_string_pretty(&entries)?;
    out.push('\n');
    std::fs::write(path, out)
        .with_context(|| format!("writing credential file {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn encode(raw: &str) -> String {
        format!("Basic {}", STANDARD.encode(raw))
    }

    fn store_with(user: &str, password: &str) -> CredentialStore {
        let hash = bcrypt::hash(password, 4).unwrap();
        CredentialStore::from_map(HashMap::from([(user.to_string(), hash)])).unwrap()
    }

    #[test]
    fn test_parse_basic_auth() {
        let creds = parse_basic_auth(&encode("alex:hunter2")).unwrap();
        assert_eq!(creds.username, "alex");
        assert_eq!(creds.password, "hunter2");
    }

    #[test]
    fn test_parse_basic_auth_password_with_colon() {
        let creds = parse_basic_auth(&encode("alex:a:b:c")).unwrap();
        assert_eq!(creds.username, "alex");
        assert_eq!(creds.password, "a:b:c");
    }

    #[test]
    fn test_parse_basic_auth_scheme_case_insensitive() {
        let value = format!("basic {}", STANDARD.encode("alex:pw"));
        assert!(parse_basic_auth(&value).is_some());
    }

    #[test]
    fn test_parse_basic_auth_rejects_malformed() {
        assert!(parse_basic_auth("").is_none());
        assert!(parse_basic_auth("Basic").is_none());
        assert!(parse_basic_auth("Bearer abc.def").is_none());
        assert!(parse_basic_auth("Basic !!!notbase64").is_none());
        assert!(parse_basic_auth(&encode("no-separator")).is_none());
        let not_utf8 = format!("Basic {}", STANDARD.encode([0xff, 0xfe, b':', b'x']));
        assert!(parse_basic_auth(&not_utf8).is_none());
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = parse_basic_auth(&encode("alex:hunter2")).unwrap();
        let printed = format!("{creds:?}");
        assert!(printed.contains("alex"));
        assert!(!printed.contains("hunter2"));
    }

    #[test]
    fn test_verify() {
        let store = store_with("alex", "correct horse");
        assert!(store.verify("alex", "correct horse"));
        assert!(!store.verify("alex", "wrong"));
        assert!(!store.verify("bob", "correct horse"));
    }

    #[test]
    fn test_verify_empty_store() {
        let store = CredentialStore::default();
        assert!(store.is_empty());
        assert!(!store.verify("alex", "anything"));
    }

    #[test]
    fn test_from_map_rejects_non_bcrypt() {
        let err = CredentialStore::from_map(HashMap::from([(
            "alex".to_string(),
            "plaintext".to_string(),
        )]))
        .unwrap_err();
        assert!(err.to_string().contains("alex"));
    }

    #[test]
    fn test_load_from_file() {
        let hash = bcrypt::hash("pw", 4).unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", serde_json::json!({ "alex": hash })).unwrap();

        let store = CredentialStore::load(file.path()).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.verify("alex", "pw"));
    }

    #[test]
    fn test_load_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(CredentialStore::load(file.path()).is_err());
        assert!(CredentialStore::load("/nonexistent/passwords.json").is_err());
    }

    #[test]
    fn test_upsert_credential_creates_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("passwords.json");

        upsert_credential(&path, "alex", &hash_password("one", 4).unwrap()).unwrap();
        upsert_credential(&path, "bob", &hash_password("two", 4).unwrap()).unwrap();
        upsert_credential(&path, "alex", &hash_password("three", 4).unwrap()).unwrap();

        let store = CredentialStore::load(&path).unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.verify("alex", "three"));
        assert!(!store.verify("alex", "one"));
        assert!(store.verify("bob", "two"));
    }
}
