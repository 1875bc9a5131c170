//! Kubernetes client-configuration (YAML) sensitive-field extraction.

use std::fs::File;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use crate::{bounded, error::ArtifactError, vpath};

use super::{emission_budget_tripped, emit_whole_file, ExtractCtx};

lazy_static! {
    static ref LOOKS_LIKE_KUBECONFIG: Regex =
        Regex::new(r"(?m)^(apiVersion|clusters|users)\s*:").expect("valid regex");
}

#[derive(Debug, Default, Deserialize)]
struct KubeConfig {
    #[serde(default)]
    users: Vec<UserEntry>,
    #[serde(default)]
    clusters: Vec<ClusterEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct UserEntry {
    #[serde(default)]
    user: UserDetail,
}

#[derive(Debug, Default, Deserialize)]
struct UserDetail {
    #[serde(default)]
    token: Option<String>,
    #[serde(default, rename = "client-certificate-data")]
    client_certificate_data: Option<String>,
    #[serde(default, rename = "client-key-data")]
    client_key_data: Option<String>,
    #[serde(default, rename = "auth-provider")]
    auth_provider: Option<AuthProvider>,
}

#[derive(Debug, Default, Deserialize)]
struct AuthProvider {
    #[serde(default)]
    config: Option<AuthProviderConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct AuthProviderConfig {
    #[serde(default, rename = "access-token")]
    access_token: Option<String>,
    #[serde(default, rename = "refresh-token")]
    refresh_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ClusterEntry {
    #[serde(default)]
    cluster: ClusterDetail,
}

#[derive(Debug, Default, Deserialize)]
struct ClusterDetail {
    #[serde(default, rename = "certificate-authority-data")]
    certificate_authority_data: Option<String>,
}

/// Read `file` through the bounded reader; gate structured parsing on a
/// cheap regex sniff, then emit the recognized sensitive fields under
/// `users`/`clusters`. Falls back to a whole-file emission when the sniff
/// fails, the YAML doesn't parse, or no recognized field was present.
pub fn extract(mut file: File, ctx: &ExtractCtx<'_>) -> Result<(), ArtifactError> {
    let blob = match bounded::read_all_bounded(&mut file, ctx.counters, ctx.limits) {
        Ok(blob) => blob,
        Err(ArtifactError::BudgetExceeded(kind)) => {
            ctx.stats.record(kind);
            return Ok(());
        }
        Err(err) => return Err(err),
    };

    let text = String::from_utf8_lossy(&blob);
    if !LOOKS_LIKE_KUBECONFIG.is_match(&text) {
        emit_whole_file(ctx, &blob);
        return Ok(());
    }

    let config: KubeConfig = match serde_yaml::from_slice(&blob) {
        Ok(config) => config,
        Err(_) => {
            emit_whole_file(ctx, &blob);
            return Ok(());
        }
    };

    let mut emitted_any = false;
    let mut aborted = false;

    for (index, entry) in config.users.iter().enumerate() {
        if aborted {
            break;
        }
        emitted_any |= emit_user_fields(index, &entry.user, ctx, &mut aborted);
    }
    for (index, entry) in config.clusters.iter().enumerate() {
        if aborted {
            break;
        }
        emitted_any |= emit_cluster_fields(index, &entry.cluster, ctx, &mut aborted);
    }

    if !emitted_any {
        emit_whole_file(ctx, &blob);
    }
    Ok(())
}

fn emit_user_fields(index: usize, user: &UserDetail, ctx: &ExtractCtx<'_>, aborted: &mut bool) -> bool {
    let mut any = false;

    any |= emit_if_present(&user.token, &format!("users[{index}].user.token"), ctx, aborted);
    if *aborted {
        return any;
    }
    any |= emit_if_present(
        &user.client_certificate_data,
        &format!("users[{index}].user.client-certificate-data"),
        ctx,
        aborted,
    );
    if *aborted {
        return any;
    }
    any |= emit_if_present(
        &user.client_key_data,
        &format!("users[{index}].user.client-key-data"),
        ctx,
        aborted,
    );
    if *aborted {
        return any;
    }

    if let Some(config) = user.auth_provider.as_ref().and_then(|provider| provider.config.as_ref()) {
        any |= emit_if_present(
            &config.access_token,
            &format!("users[{index}].user.auth-provider.config.access-token"),
            ctx,
            aborted,
        );
        if *aborted {
            return any;
        }
        any |= emit_if_present(
            &config.refresh_token,
            &format!("users[{index}].user.auth-provider.config.refresh-token"),
            ctx,
            aborted,
        );
    }

    any
}

fn emit_cluster_fields(index: usize, cluster: &ClusterDetail, ctx: &ExtractCtx<'_>, aborted: &mut bool) -> bool {
    emit_if_present(
        &cluster.certificate_authority_data,
        &format!("clusters[{index}].cluster.certificate-authority-data"),
        ctx,
        aborted,
    )
}

fn emit_if_present(value: &Option<String>, segment: &str, ctx: &ExtractCtx<'_>, aborted: &mut bool) -> bool {
    let Some(text) = value else {
        return false;
    };
    if text.is_empty() {
        return false;
    }
    if let Some(kind) = emission_budget_tripped(ctx.counters, ctx.limits) {
        ctx.stats.record(kind);
        *aborted = true;
        return false;
    }

    let virtual_path = vpath::join(ctx.outer_rel, &format!("yaml:{segment}"));
    ctx.sink.emit(&virtual_path, text.as_bytes());
    ctx.counters.record_entry();
    true
}
