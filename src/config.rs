use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};

use crate::client::ClientConfig;

pub(crate) const DEFAULT_URL: &str = "https://api.arlula.com";

#[derive(Debug, Default, PartialEq)]
struct RcConfig {
    url: Option<String>,
    key: Option<String>,
    secret: Option<String>,
    verify: Option<bool>,
}

pub(crate) fn load_config(
    url: Option<String>,
    key: Option<String>,
    secret: Option<String>,
    verify: Option<bool>,
) -> Result<ClientConfig> {
    let mut url = url.or_else(|| std::env::var("ARLULA_URL").ok());
    let mut key = key.or_else(|| std::env::var("ARLULA_API_KEY").ok());
    let mut secret = secret.or_else(|| std::env::var("ARLULA_API_SECRET").ok());

    let rc_candidates = rc_candidates();
    let mut file_verify: Option<bool> = None;

    if url.is_none() || key.is_none() || secret.is_none() || verify.is_none() {
        for rc_path in &rc_candidates {
            if rc_path.exists() {
                let cfg = read_rc(rc_path).with_context(|| {
                    format!("failed to read configuration file {}", rc_path.display())
                })?;
                tracing::debug!("loaded configuration from {}", rc_path.display());

                url = url.or(cfg.url);
                key = key.or(cfg.key);
                secret = secret.or(cfg.secret);
                file_verify = cfg.verify;
                break;
            }
        }
    }

    let key = require(key, "key", "ARLULA_API_KEY", &rc_candidates)?;
    let secret = require(secret, "secret", "ARLULA_API_SECRET", &rc_candidates)?;
    let url = url.unwrap_or_else(|| DEFAULT_URL.to_string());
    let verify = verify.or(file_verify).unwrap_or(true);

    Ok(ClientConfig {
        url,
        key,
        secret,
        verify,
    })
}

fn require(
    value: Option<String>,
    name: &str,
    env: &str,
    rc_candidates: &[PathBuf],
) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ if rc_candidates.is_empty() => {
            bail!("Missing configuration: {name} (set {env} or create .arlularc)")
        }
        _ => bail!(
            "Missing configuration: {} (set {} or put `{}:` in one of: {})",
            name,
            env,
            name,
            rc_candidates
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

fn read_rc(path: &Path) -> Result<RcConfig> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_rc(&text))
}

fn parse_rc(text: &str) -> RcConfig {
    let mut cfg = RcConfig::default();

    // A key may be written as `key:` with its value alone on the next line.
    let mut pending_key: Option<&str> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(pk) = pending_key.take() {
            if !line.contains(':') {
                set(&mut cfg, pk, strip_quotes(line));
                continue;
            }
        }

        if let Some((k, v)) = line.split_once(':') {
            let k = k.trim();
            let v = strip_quotes(v.trim());
            match k {
                "url" | "key" | "secret" => {
                    if v.is_empty() {
                        pending_key = Some(k);
                    } else {
                        set(&mut cfg, k, v);
                    }
                }
                "verify" => {
                    if !v.is_empty() {
                        cfg.verify = Some(v != "0");
                    }
                }
                _ => {}
            }
        }
    }

    cfg
}

fn set(cfg: &mut RcConfig, key: &str, value: &str) {
    let value = Some(value.to_string());
    match key {
        "url" => cfg.url = value,
        "key" => cfg.key = value,
        "secret" => cfg.secret = value,
        _ => {}
    }
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    if (s.starts_with('"') && s.ends_with('"') && s.len() >= 2)
        || (s.starts_with('\'') && s.ends_with('\'') && s.len() >= 2)
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn rc_candidates() -> Vec<PathBuf> {
    // 1) ARLULA_RC (explicit)
    // 2) ./.arlularc
    // 3) ~/.arlularc
    if let Ok(p) = std::env::var("ARLULA_RC") {
        return vec![PathBuf::from(p)];
    }

    let mut v = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        v.push(cwd.join(".arlularc"));
    }
    if let Some(home) = dirs::home_dir() {
        v.push(home.join(".arlularc"));
    }
    v
}
