// HLS playlist model and line-oriented parser.
//
// A document is either a master playlist (stream-info entries pointing at
// renditions) or a media playlist (segment references in play order).

use std::fmt;

use tracing::{debug, trace};
use url::Url;

use crate::hls::HlsDownloaderError;

const STREAM_INF_TAG: &str = "#EXT-X-STREAM-INF";

/// Raw playlist text together with the URL it was served from.
#[derive(Debug, Clone)]
pub struct PlaylistDocument {
    pub text: String,
    /// Base for resolving relative references, normally the final response URL.
    pub base: Url,
}

impl PlaylistDocument {
    pub fn new(text: impl Into<String>, base: Url) -> Self {
        Self {
            text: text.into(),
            base,
        }
    }

    /// First `n` lines of the document, for diagnostics.
    pub fn preview(&self, n: usize) -> Vec<&str> {
        self.text.lines().take(n).collect()
    }

    pub fn parse(&self) -> Result<PlaylistKind, HlsDownloaderError> {
        parse_playlist(&self.text, &self.base)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantDescriptor {
    pub uri: Url,
    /// Declared BANDWIDTH in bits/sec, 0 when absent or unparsable.
    pub bandwidth: u64,
    /// Declared RESOLUTION, e.g. `1920x1080`.
    pub resolution: Option<String>,
}

impl VariantDescriptor {
    /// Pixel area when the resolution is a well-formed `WxH`.
    pub fn resolution_area(&self) -> Option<u64> {
        let (w, h) = self.resolution.as_deref()?.split_once(['x', 'X'])?;
        let w: u64 = w.trim().parse().ok()?;
        let h: u64 = h.trim().parse().ok()?;
        w.checked_mul(h)
    }
}

impl fmt::Display for VariantDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {} bps ({})",
            self.resolution.as_deref().unwrap_or("unknown"),
            self.bandwidth,
            self.uri
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Zero-based position in the media playlist.
    pub index: usize,
    pub uri: Url,
}

impl Segment {
    /// Local file name; zero-padded so lexical order equals play order.
    pub fn file_name(&self) -> String {
        format!("segment_{:010}.ts", self.index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPlaylist {
    pub segments: Vec<Segment>,
}

impl MediaPlaylist {
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistKind {
    Variant(Vec<VariantDescriptor>),
    Media(MediaPlaylist),
}

/// Parse playlist text, resolving relative references against `base`.
pub fn parse_playlist(text: &str, base: &Url) -> Result<PlaylistKind, HlsDownloaderError> {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();

    if lines.iter().any(|line| line.starts_with(STREAM_INF_TAG)) {
        debug!("Variant playlist detected");
        parse_variants(&lines, base).map(PlaylistKind::Variant)
    } else {
        debug!("Media playlist detected");
        parse_media(&lines, base).map(PlaylistKind::Media)
    }
}

fn is_reference(line: &str) -> bool {
    !line.is_empty() && !line.starts_with('#')
}

fn resolve(base: &Url, reference: &str) -> Result<Url, HlsDownloaderError> {
    base.join(reference).map_err(|e| {
        HlsDownloaderError::ParseError(format!(
            "Could not resolve '{reference}' against {base}: {e}"
        ))
    })
}

fn parse_variants(lines: &[&str], base: &Url) -> Result<Vec<VariantDescriptor>, HlsDownloaderError> {
    let mut variants = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let Some(rest) = line.strip_prefix(STREAM_INF_TAG) else {
            continue;
        };
        let attributes = rest.strip_prefix(':').unwrap_or(rest);

        // The target is the next reference line; directives in between are skipped.
        let Some(target) = lines[i + 1..]
            .iter()
            .take_while(|next| !next.starts_with(STREAM_INF_TAG))
            .find(|next| is_reference(next))
        else {
            debug!(line = %line, "Stream-info entry without a target URI, skipping");
            continue;
        };

        let mut bandwidth = 0;
        let mut resolution = None;
        for (key, value) in split_attributes(attributes) {
            match key {
                "BANDWIDTH" => bandwidth = value.parse().unwrap_or(0),
                "RESOLUTION" => resolution = Some(value.to_string()),
                _ => {}
            }
        }

        let variant = VariantDescriptor {
            uri: resolve(base, target)?,
            bandwidth,
            resolution,
        };
        trace!(%variant, "Parsed variant");
        variants.push(variant);
    }

    if variants.is_empty() {
        return Err(HlsDownloaderError::ParseError(
            "Variant playlist has no usable streams".to_string(),
        ));
    }
    Ok(variants)
}

fn parse_media(lines: &[&str], base: &Url) -> Result<MediaPlaylist, HlsDownloaderError> {
    let segments = lines
        .iter()
        .filter(|line| is_reference(line))
        .enumerate()
        .map(|(index, line)| resolve(base, line).map(|uri| Segment { index, uri }))
        .collect::<Result<Vec<_>, _>>()?;

    if segments.is_empty() {
        return Err(HlsDownloaderError::EmptyPlaylistError);
    }
    Ok(MediaPlaylist { segments })
}

/// Split an attribute list (`KEY=value,KEY="quoted,value"`) into pairs.
/// Quotes around values are stripped.
fn split_attributes(attributes: &str) -> Vec<(&str, &str)> {
    let mut pairs = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (i, c) in attributes.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                push_attribute(&mut pairs, &attributes[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    push_attribute(&mut pairs, &attributes[start..]);
    pairs
}

fn push_attribute<'a>(pairs: &mut Vec<(&'a str, &'a str)>, item: &'a str) {
    if let Some((key, value)) = item.split_once('=') {
        pairs.push((key.trim(), value.trim().trim_matches('"')));
    }
}
