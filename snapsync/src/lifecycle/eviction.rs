//! Victim selection for snapshot cleanup.
//!
//! Pure functions over the preferences; the lifecycle manager performs the
//! actual removal. A version the webview is serving is never selected.

use std::cmp::Reverse;

use crate::preferences::Preferences;

/// Installed versions built for a binary other than the running one.
///
/// The current version is included when stale; the caller clears the
/// current reference when it removes it.
pub fn stale_versions(prefs: &Preferences, is_active: impl Fn(&str) -> bool) -> Vec<String> {
    let mut stale: Vec<String> = prefs
        .updates
        .values()
        .filter(|u| !u.matches_binary(&prefs.binary_version_name, &prefs.binary_version_code))
        .map(|u| u.version_id.clone())
        .filter(|id| !is_active(id))
        .collect();
    stale.sort();
    stale
}

/// Versions beyond the `max_versions` most recently used.
///
/// The current version and the active version are excluded from both the
/// candidates and the count.
pub fn excess_versions(prefs: &Preferences, is_active: impl Fn(&str) -> bool) -> Vec<String> {
    let current = prefs.current_version_id.as_deref();
    let mut candidates: Vec<_> = prefs
        .updates
        .values()
        .filter(|u| Some(u.version_id.as_str()) != current && !is_active(&u.version_id))
        .collect();

    // Newest first; ties broken by id for a stable choice.
    candidates.sort_by(|a, b| {
        Reverse(a.last_used)
            .cmp(&Reverse(b.last_used))
            .then_with(|| a.version_id.cmp(&b.version_id))
    });

    candidates
        .into_iter()
        .skip(prefs.max_versions)
        .map(|u| u.version_id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::config::InitialConfig;
    use crate::preferences::tests::update;

    fn prefs_with(codes: &[(&str, &str, i64)]) -> Preferences {
        let mut prefs = Preferences::from_initial(&InitialConfig::new("app", "1.0.0", "2"));
        let epoch = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        for (id, code, minutes) in codes {
            prefs.updates.insert(
                id.to_string(),
                update(id, code, epoch + Duration::minutes(*minutes)),
            );
        }
        prefs
    }

    #[test]
    fn test_stale_selects_other_binaries() {
        let prefs = prefs_with(&[("v1", "1", 0), ("v2", "2", 1), ("v3", "1", 2)]);
        assert_eq!(stale_versions(&prefs, |_| false), vec!["v1", "v3"]);
    }

    #[test]
    fn test_stale_never_selects_active() {
        let prefs = prefs_with(&[("v1", "1", 0), ("v3", "1", 2)]);
        assert_eq!(stale_versions(&prefs, |id| id == "v1"), vec!["v3"]);
    }

    #[test]
    fn test_stale_ignores_version_name_only_match() {
        let mut prefs = prefs_with(&[("v1", "2", 0)]);
        prefs.updates.get_mut("v1").unwrap().binary_version_name = "0.9.0".to_string();
        assert_eq!(stale_versions(&prefs, |_| false), vec!["v1"]);
    }

    #[test]
    fn test_excess_keeps_most_recent() {
        let mut prefs = prefs_with(&[("v1", "2", 0), ("v2", "2", 10), ("v3", "2", 20), ("v4", "2", 30)]);
        prefs.current_version_id = Some("v4".to_string());
        prefs.max_versions = 2;

        // v4 is current; of v1..v3 the two newest survive.
        assert_eq!(excess_versions(&prefs, |_| false), vec!["v1"]);
    }

    #[test]
    fn test_excess_excludes_active_from_count() {
        let mut prefs = prefs_with(&[("v1", "2", 0), ("v2", "2", 10), ("v3", "2", 20)]);
        prefs.max_versions = 1;

        assert_eq!(excess_versions(&prefs, |id| id == "v3"), vec!["v1"]);
    }

    #[test]
    fn test_excess_within_limit_is_empty() {
        let prefs = prefs_with(&[("v1", "2", 0), ("v2", "2", 10)]);
        assert!(excess_versions(&prefs, |_| false).is_empty());
    }
}
