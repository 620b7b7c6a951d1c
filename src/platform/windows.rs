//! Windows registry access through the stock `reg.exe`.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use super::{parse_reg_sz, RegistryQuery};
use crate::core::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, Default)]
pub struct RegQuery;

#[async_trait]
impl RegistryQuery for RegQuery {
    async fn query_value(&self, key: &str, value: &str, timeout: Duration) -> CoreResult<String> {
        let child = Command::new("reg")
            .args(["query", key, "/v", value])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(timeout, child).await {
            Ok(result) => result.map_err(|e| CoreError::io(e, "reg"))?,
            Err(_) => {
                return Err(CoreError::Timeout {
                    what: format!("reg query {key} /v {value}"),
                    after: timeout,
                })
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            tracing::debug!("reg query {} /v {} exited with {}", key, value, output.status);
            return Err(CoreError::NotFound {
                what: "Registry value",
                path: format!("{key}\\{value}").into(),
            });
        }

        parse_reg_sz(&stdout).ok_or_else(|| CoreError::Parse {
            source_name: "reg query",
            detail: stdout.trim().to_string(),
        })
    }
}
