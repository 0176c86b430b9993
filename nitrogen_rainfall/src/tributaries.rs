/// Tributary registry for the nitrogen / rainfall analysis.
///
/// Defines the canonical list of sampled tributaries along with the names
/// they appear under in the chemistry sheet. This is the single source of
/// truth for site identity; other modules should reference `Tributary`
/// values rather than matching on raw site names.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Tributary identity
// ---------------------------------------------------------------------------

/// One of the three sampled tributaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tributary {
    LewisCreek,
    LaPlatteRiver,
    OtterCreek,
}

impl Tributary {
    pub const ALL: [Tributary; 3] = [
        Tributary::LewisCreek,
        Tributary::LaPlatteRiver,
        Tributary::OtterCreek,
    ];

    /// Registry metadata for this tributary.
    pub fn site(self) -> &'static TributarySite {
        // The registry holds exactly one entry per variant, in `ALL` order.
        &TRIBUTARY_REGISTRY[self.index()]
    }

    /// Position of this tributary in `ALL`, used for fixed-size tables.
    pub fn index(self) -> usize {
        match self {
            Tributary::LewisCreek => 0,
            Tributary::LaPlatteRiver => 1,
            Tributary::OtterCreek => 2,
        }
    }

    pub fn code(self) -> &'static str {
        self.site().code
    }
}

impl std::fmt::Display for Tributary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.site().name)
    }
}

// ---------------------------------------------------------------------------
// Site metadata
// ---------------------------------------------------------------------------

/// Metadata for a single sampled tributary.
pub struct TributarySite {
    pub tributary: Tributary,
    /// Short code used in log lines and report column headers.
    pub code: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Spellings accepted in the chemistry sheet's site column, already
    /// normalized (see `normalize_site_name`).
    pub aliases: &'static [&'static str],
}

/// All sampled tributaries, in `Tributary::ALL` order.
pub static TRIBUTARY_REGISTRY: &[TributarySite] = &[
    TributarySite {
        tributary: Tributary::LewisCreek,
        code: "LEW",
        name: "Lewis Creek",
        aliases: &["lewiscreek", "lewis", "lew"],
    },
    TributarySite {
        tributary: Tributary::LaPlatteRiver,
        code: "LAP",
        name: "LaPlatte River",
        aliases: &["laplatteriver", "laplatte", "lap"],
    },
    TributarySite {
        tributary: Tributary::OtterCreek,
        code: "OTT",
        name: "Otter Creek",
        aliases: &["ottercreek", "otter", "ott"],
    },
];

/// Lowercases and strips everything but ASCII letters and digits, so that
/// "La Platte R." and "LaPlatte River" compare on the same footing.
pub fn normalize_site_name(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Looks up a tributary by a site name as it appears in input data.
/// Returns `None` if no registry alias matches.
pub fn find_tributary(raw_name: &str) -> Option<Tributary> {
    let key = normalize_site_name(raw_name);
    if key.is_empty() {
        return None;
    }
    TRIBUTARY_REGISTRY
        .iter()
        .find(|site| site.aliases.iter().any(|alias| *alias == key))
        .map(|site| site.tributary)
}

/// Returns the short codes for all tributaries, in registry order.
pub fn all_codes() -> Vec<&'static str> {
    TRIBUTARY_REGISTRY.iter().map(|s| s.code).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_order_matches_enum_order() {
        for (i, tributary) in Tributary::ALL.iter().enumerate() {
            assert_eq!(TRIBUTARY_REGISTRY[i].tributary, *tributary);
            assert_eq!(tributary.index(), i);
        }
        assert_eq!(TRIBUTARY_REGISTRY.len(), Tributary::ALL.len());
    }

    #[test]
    fn test_no_alias_shared_between_tributaries() {
        let mut seen = std::collections::HashSet::new();
        for site in TRIBUTARY_REGISTRY {
            for alias in site.aliases {
                assert!(seen.insert(*alias), "alias '{}' used by more than one site", alias);
            }
        }
    }

    #[test]
    fn test_aliases_are_already_normalized() {
        for site in TRIBUTARY_REGISTRY {
            for alias in site.aliases {
                assert_eq!(normalize_site_name(alias), *alias);
            }
        }
    }

    #[test]
    fn test_find_tributary_ignores_case_and_punctuation() {
        assert_eq!(find_tributary("La Platte River"), Some(Tributary::LaPlatteRiver));
        assert_eq!(find_tributary("LEWIS CREEK"), Some(Tributary::LewisCreek));
        assert_eq!(find_tributary(" otter "), Some(Tributary::OtterCreek));
        assert_eq!(find_tributary("OTT"), Some(Tributary::OtterCreek));
    }

    #[test]
    fn test_find_tributary_returns_none_for_unknown_name() {
        assert!(find_tributary("Winooski River").is_none());
        assert!(find_tributary("").is_none());
        assert!(find_tributary("--").is_none());
    }

    #[test]
    fn test_all_codes_helper_matches_registry_length() {
        assert_eq!(all_codes(), vec!["LEW", "LAP", "OTT"]);
    }
}
