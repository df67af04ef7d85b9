use thiserror::Error;
use url::Url;

use super::{AddressRewrite, Dashboard, Panel};

/// Failures while deriving panels from the template.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// No panel title contained the template token.
    #[error("no panel titled with template token {0:?}")]
    TemplateNotFound(String),

    /// The template panel carries no `url` field to rewrite.
    #[error("template panel {0:?} has no url")]
    MissingUrl(String),

    /// The template URL did not parse after token substitution.
    #[error("template url {url:?} is not valid: {source}")]
    InvalidUrl {
        /// The offending URL text.
        url: String,
        /// Parse failure detail.
        #[source]
        source: url::ParseError,
    },

    /// The template URL has no explicit port to shard on.
    #[error("template url {0:?} has no explicit port")]
    MissingPort(String),

    /// A rewrite step (host, scheme or port) was rejected by the URL.
    #[error("failed to rewrite url {url:?}: {reason}")]
    Rewrite {
        /// The URL being rewritten.
        url: String,
        /// Which step failed.
        reason: &'static str,
    },
}

/// Number of stream-server listeners needed for `topic_count` topics when
/// each listener carries at most `streams_per_port` concurrently viewable
/// streams. Always at least one so the HTTP surface comes up even with an
/// empty topic set.
pub fn shard_count(topic_count: usize, streams_per_port: usize) -> usize {
    topic_count.div_ceil(streams_per_port.max(1)).max(1)
}

/// Derive one panel per topic from the template panel.
///
/// The template is the panel whose title contains `template_token`. It is
/// removed from the collection and, for each topic index `i`, a copy is
/// appended with:
///
/// - `title` and `url` token-substituted for the topic,
/// - the URL host and scheme rewritten per `rewrite`,
/// - the URL port advanced to the topic's shard
///   (`base + ceil((i + 1) / streams_per_port) - 1`),
/// - `id = template_id + i`,
/// - `gridPos.y = template_y * (i + 1)` for a stacked layout.
///
/// Panels unrelated to the template are preserved untouched. The output is
/// deterministic; generated ids and y-coordinates are strictly increasing
/// (the latter provided the template's y is non-zero).
pub fn generate_panels(
    dashboard: &mut Dashboard,
    template_token: &str,
    topics: &[String],
    rewrite: &AddressRewrite,
    streams_per_port: usize,
) -> Result<(), DashboardError> {
    let position = dashboard
        .panels
        .iter()
        .position(|panel| panel.title.contains(template_token))
        .ok_or_else(|| {
            DashboardError::TemplateNotFound(template_token.to_string())
        })?;
    let template = dashboard.panels.remove(position);

    let template_url = template
        .url
        .as_deref()
        .ok_or_else(|| DashboardError::MissingUrl(template.title.clone()))?;
    let base_port = Url::parse(template_url)
        .map_err(|source| DashboardError::InvalidUrl {
            url: template_url.to_string(),
            source,
        })?
        .port()
        .ok_or_else(|| {
            DashboardError::MissingPort(template_url.to_string())
        })?;

    let streams_per_port = streams_per_port.max(1);
    let mut generated = Vec::with_capacity(topics.len());
    for (index, topic) in topics.iter().enumerate() {
        let mut panel = template.clone();
        panel.id = template.id + index as u64;
        panel.title = template.title.replace(template_token, topic);
        panel.grid_pos.y = template.grid_pos.y * (index as u32 + 1);
        panel.url = Some(rewrite_url(
            template_url,
            template_token,
            topic,
            rewrite,
            base_port + (index / streams_per_port) as u16,
        )?);
        generated.push(panel);
    }

    dashboard.panels.extend(generated);
    Ok(())
}

fn rewrite_url(
    template_url: &str,
    template_token: &str,
    topic: &str,
    rewrite: &AddressRewrite,
    port: u16,
) -> Result<String, DashboardError> {
    let substituted = template_url.replace(template_token, topic);
    let mut url = Url::parse(&substituted).map_err(|source| {
        DashboardError::InvalidUrl {
            url: substituted.clone(),
            source,
        }
    })?;

    url.set_host(Some(&rewrite.host)).map_err(|_| {
        DashboardError::Rewrite {
            url: substituted.clone(),
            reason: "host substitution rejected",
        }
    })?;
    if rewrite.https && url.scheme() == "http" {
        url.set_scheme("https").map_err(|()| DashboardError::Rewrite {
            url: substituted.clone(),
            reason: "scheme upgrade rejected",
        })?;
    }
    url.set_port(Some(port)).map_err(|()| DashboardError::Rewrite {
        url: substituted,
        reason: "port substitution rejected",
    })?;

    Ok(url.to_string())
}
