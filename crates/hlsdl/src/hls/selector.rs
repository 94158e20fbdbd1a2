// Rendition selection: picks exactly one variant from a master playlist.
// Every policy is deterministic; ties go to the first-listed variant.

use tracing::{debug, info};

use crate::hls::HlsDownloaderError;
use crate::hls::config::HlsVariantSelectionPolicy;
use crate::hls::playlist::VariantDescriptor;

#[derive(Debug, Clone, Default)]
pub struct RenditionSelector {
    policy: HlsVariantSelectionPolicy,
}

impl RenditionSelector {
    pub fn new(policy: HlsVariantSelectionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &HlsVariantSelectionPolicy {
        &self.policy
    }

    pub fn select<'a>(
        &self,
        variants: &'a [VariantDescriptor],
    ) -> Result<&'a VariantDescriptor, HlsDownloaderError> {
        let first = variants.first().ok_or_else(|| {
            HlsDownloaderError::ParseError("Master playlist has no variants".to_string())
        })?;

        let selected = match &self.policy {
            HlsVariantSelectionPolicy::HighestBitrate => {
                first_best_by(variants, |v| Some(v.bandwidth), |a: &u64, b: &u64| a > b)
            }
            HlsVariantSelectionPolicy::LowestBitrate => {
                first_best_by(variants, |v| Some(v.bandwidth), |a: &u64, b: &u64| a < b)
            }
            HlsVariantSelectionPolicy::ClosestToBitrate(target) => first_best_by(
                variants,
                |v| Some(v.bandwidth.abs_diff(*target)),
                |a: &u64, b: &u64| a < b,
            ),
            HlsVariantSelectionPolicy::HighestResolution => {
                first_best_by(variants, VariantDescriptor::resolution_area, |a: &u64, b: &u64| a > b)
            }
        }
        .unwrap_or(first);

        debug!(policy = ?self.policy, candidates = variants.len(), "Variant selection");
        info!(variant = %selected, "Selected rendition");
        Ok(selected)
    }
}

/// First variant whose key strictly beats every earlier one; variants
/// without a key are never chosen.
fn first_best_by<'a, K, F, B>(
    variants: &'a [VariantDescriptor],
    key: F,
    better: B,
) -> Option<&'a VariantDescriptor>
where
    F: Fn(&VariantDescriptor) -> Option<K>,
    B: Fn(&K, &K) -> bool,
{
    let mut best: Option<(&VariantDescriptor, K)> = None;
    for variant in variants {
        let Some(k) = key(variant) else { continue };
        match &best {
            Some((_, current)) if !better(&k, current) => {}
            _ => best = Some((variant, k)),
        }
    }
    best.map(|(variant, _)| variant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn variant(name: &str, bandwidth: u64, resolution: Option<&str>) -> VariantDescriptor {
        VariantDescriptor {
            uri: Url::parse(&format!("https://example.com/{name}.m3u8")).unwrap(),
            bandwidth,
            resolution: resolution.map(str::to_string),
        }
    }

    #[test]
    fn highest_bitrate_wins() {
        let variants = vec![
            variant("360p", 500_000, Some("640x360")),
            variant("1080p", 3_000_000, Some("1920x1080")),
            variant("720p", 1_500_000, Some("1280x720")),
        ];
        let selected = RenditionSelector::default().select(&variants).unwrap();
        assert!(selected.uri.as_str().ends_with("1080p.m3u8"));
    }

    #[test]
    fn bitrate_ties_go_to_first_listed() {
        let variants = vec![
            variant("a", 800_000, None),
            variant("b", 2_000_000, None),
            variant("c", 2_000_000, None),
        ];
        let selected = RenditionSelector::default().select(&variants).unwrap();
        assert!(selected.uri.as_str().ends_with("/b.m3u8"));
    }

    #[test]
    fn all_zero_bitrates_pick_first() {
        let variants = vec![variant("a", 0, None), variant("b", 0, None), variant("c", 0, None)];
        let selected = RenditionSelector::default().select(&variants).unwrap();
        assert!(selected.uri.as_str().ends_with("/a.m3u8"));
    }

    #[test]
    fn empty_set_is_parse_error() {
        assert!(matches!(
            RenditionSelector::default().select(&[]),
            Err(HlsDownloaderError::ParseError(_))
        ));
    }

    #[test]
    fn lowest_and_closest_policies() {
        let variants = vec![
            variant("mid", 1_000_000, None),
            variant("low", 300_000, None),
            variant("high", 4_000_000, None),
        ];

        let lowest = RenditionSelector::new(HlsVariantSelectionPolicy::LowestBitrate)
            .select(&variants)
            .unwrap();
        assert!(lowest.uri.as_str().ends_with("/low.m3u8"));

        let closest = RenditionSelector::new(HlsVariantSelectionPolicy::ClosestToBitrate(3_000_000))
            .select(&variants)
            .unwrap();
        assert!(closest.uri.as_str().ends_with("/high.m3u8"));
    }

    #[test]
    fn highest_resolution_ignores_bitrate() {
        let variants = vec![
            variant("odd", 9_000_000, Some("garbage")),
            variant("720p", 5_000_000, Some("1280x720")),
            variant("1080p", 2_000_000, Some("1920x1080")),
        ];
        let selected = RenditionSelector::new(HlsVariantSelectionPolicy::HighestResolution)
            .select(&variants)
            .unwrap();
        assert!(selected.uri.as_str().ends_with("/1080p.m3u8"));
    }

    #[test]
    fn highest_resolution_without_data_picks_first() {
        let variants = vec![variant("a", 100, None), variant("b", 200, None)];
        let selected = RenditionSelector::new(HlsVariantSelectionPolicy::HighestResolution)
            .select(&variants)
            .unwrap();
        assert!(selected.uri.as_str().ends_with("/a.m3u8"));
    }

    #[test]
    fn overflowing_resolution_never_wins() {
        let variants = vec![
            variant("bogus", 100, Some("99999999999x99999999999")),
            variant("720p", 200, Some("1280x720")),
        ];
        let selected = RenditionSelector::new(HlsVariantSelectionPolicy::HighestResolution)
            .select(&variants)
            .unwrap();
        assert!(selected.uri.as_str().ends_with("/720p.m3u8"));
    }
}
