//! Hidden-data scan: base64 runs, encrypted-looking blocks, execution
//! indicators, embedded URLs and IPv4 addresses.

use regex::bytes::Regex;
use serde::{Deserialize, Serialize};

use super::entropy::high_entropy_blocks;
use crate::config::AnomalyConfig;
use crate::error::EngineError;

/// Points added per exceeded category
pub const RISK_PER_CATEGORY: u32 = 25;

const BASE64_THRESHOLD: usize = 5;
const ENCRYPTED_THRESHOLD: usize = 2;
const SUSPICIOUS_THRESHOLD: usize = 0;
const URL_THRESHOLD: usize = 3;

/// Reported matches are truncated to this many bytes
const MAX_MATCH_LEN: usize = 256;

const SUSPICIOUS_PATTERN: &str = r"(?i-u)(?:eval|exec|cmd\.exe|powershell|base64_decode|/bin/sh|/bin/bash|wscript\.shell|createobject|shell_exec|passthru|fromcharcode|unescape|document\.write|system\()";
const URL_PATTERN: &str = r"(?i-u)\bhttps?://[a-z0-9\-._~:/?#\[\]@!$&'()*+,;=%]+";
const IPV4_PATTERN: &str =
    r"(?-u)\b(?:(?:25[0-5]|2[0-4][0-9]|1[0-9][0-9]|[1-9]?[0-9])\.){3}(?:25[0-5]|2[0-4][0-9]|1[0-9][0-9]|[1-9]?[0-9])\b";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HiddenDataReport {
    pub base64_strings: Vec<String>,
    pub encrypted_regions: Vec<EncryptedRegion>,
    pub suspicious_strings: Vec<String>,
    /// URLs followed by bare IPv4 addresses
    pub hidden_urls: Vec<String>,
    /// 25 per category over its threshold, 0 to 100
    pub risk_score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncryptedRegion {
    pub offset: u64,
    pub size: u64,
    pub entropy: f64,
}

/// Compiled patterns for one configuration
pub struct HiddenDataScanner {
    base64: Regex,
    suspicious: Regex,
    url: Regex,
    ipv4: Regex,
    config: AnomalyConfig,
}

impl HiddenDataScanner {
    pub fn new(config: &AnomalyConfig) -> Result<Self, EngineError> {
        let base64 = format!(r"(?-u)[A-Za-z0-9+/]{{{},}}={{0,2}}", config.min_base64_len);
        Ok(Self {
            base64: compile(&base64)?,
            suspicious: compile(SUSPICIOUS_PATTERN)?,
            url: compile(URL_PATTERN)?,
            ipv4: compile(IPV4_PATTERN)?,
            config: config.clone(),
        })
    }

    pub fn scan(&self, data: &[u8]) -> HiddenDataReport {
        let cap = self.config.max_reported_strings;

        let base64_strings = collect(&self.base64, data, cap, false);

        let encrypted_regions = high_entropy_blocks(
            data,
            self.config.entropy_block_size,
            self.config.entropy_threshold,
            self.config.max_entropy_regions,
        )
        .into_iter()
        .map(|(offset, size, entropy)| EncryptedRegion {
            offset: offset as u64,
            size: size as u64,
            entropy,
        })
        .collect::<Vec<_>>();

        let suspicious_strings = collect(&self.suspicious, data, cap, true);

        let mut hidden_urls = collect(&self.url, data, cap, true);
        let remaining = cap.saturating_sub(hidden_urls.len());
        for ip in collect(&self.ipv4, data, remaining, true) {
            if !hidden_urls.iter().any(|u| u.contains(&ip)) {
                hidden_urls.push(ip);
            }
        }

        let exceeded = [
            base64_strings.len() > BASE64_THRESHOLD,
            encrypted_regions.len() > ENCRYPTED_THRESHOLD,
            suspicious_strings.len() > SUSPICIOUS_THRESHOLD,
            hidden_urls.len() > URL_THRESHOLD,
        ]
        .iter()
        .filter(|&&hit| hit)
        .count() as u32;

        HiddenDataReport {
            base64_strings,
            encrypted_regions,
            suspicious_strings,
            hidden_urls,
            risk_score: exceeded * RISK_PER_CATEGORY,
        }
    }
}

fn compile(pattern: &str) -> Result<Regex, EngineError> {
    Regex::new(pattern).map_err(|e| EngineError::Config(format!("invalid pattern: {e}")))
}

/// Up to `cap` matches in scan order, optionally lowercased and deduplicated
fn collect(re: &Regex, data: &[u8], cap: usize, unique: bool) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for m in re.find_iter(data) {
        if out.len() >= cap {
            break;
        }
        let bytes = &m.as_bytes()[..m.len().min(MAX_MATCH_LEN)];
        let text = String::from_utf8_lossy(bytes);
        let text = if unique {
            text.to_lowercase()
        } else {
            text.into_owned()
        };
        if unique && out.contains(&text) {
            continue;
        }
        out.push(text);
    }
    out
}
