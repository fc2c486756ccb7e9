// brewtap-core/src/build/env.rs
use std::collections::BTreeMap;
use std::env;

use brewtap_common::config::Config;

use crate::toolchain::Toolchain;

// Passed through from the user's environment; everything else is dropped.
const ENV_VARS_TO_KEEP: &[&str] = &[
    "USER", "LOGNAME", "HOME", "TMPDIR", "TERM", "SHELL", "LANG", "LC_ALL", "LC_CTYPE", "TZ",
    "SSL_CERT_FILE", "SSL_CERT_DIR", "HTTP_PROXY", "HTTPS_PROXY", "NO_PROXY", "http_proxy",
    "https_proxy", "no_proxy",
    // Go settings that decide how modules are fetched and whether cgo is used.
    "CGO_ENABLED", "GOPROXY", "GOFLAGS", "GOPRIVATE", "GONOPROXY", "GONOSUMDB",
    "GOINSECURE", "GOSUMDB",
];

/// Sanitized environment for build commands. PATH is rebuilt from the resolved toolchain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildEnvironment {
    vars: BTreeMap<String, String>,
}

impl BuildEnvironment {
    pub fn new(toolchain: &Toolchain) -> Self {
        let mut vars = BTreeMap::new();
        for key in ENV_VARS_TO_KEEP {
            if let Ok(value) = env::var(key) {
                vars.insert((*key).to_string(), value);
            }
        }
        vars.insert("PATH".to_string(), toolchain.search_path_string());
        Self { vars }
    }

    /// Go caches live under the brewtap cache so repeated builds reuse modules.
    pub fn with_go(mut self, config: &Config) -> Self {
        let go_root = config.go_cache_dir();
        self.set("GOPATH", go_root.join("path").to_string_lossy());
        self.set("GOCACHE", go_root.join("build").to_string_lossy());
        self.set("GOMODCACHE", go_root.join("mod").to_string_lossy());
        // Never let `go` swap itself for a downloaded toolchain mid-build.
        self.set("GOTOOLCHAIN", "local");
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }
}
