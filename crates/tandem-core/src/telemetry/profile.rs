use std::time::{Duration, Instant};

#[cfg(feature = "profiling")]
use crate::telemetry::tags;
#[cfg(feature = "profiling")]
use std::collections::BTreeSet;
#[cfg(feature = "profiling")]
use std::sync::{OnceLock, RwLock};

/// Microseconds elapsed since `started_at`, clamped to `u64::MAX`.
#[inline]
pub fn elapsed_us(started_at: Instant) -> u64 {
    duration_us(started_at.elapsed())
}

/// Converts a duration to whole microseconds, clamped to `u64::MAX`.
#[inline]
pub fn duration_us(duration: Duration) -> u64 {
    duration.as_micros().min(u64::MAX as u128) as u64
}

#[cfg(feature = "profiling")]
const PROFILE_TAGS_ENV: &str = "TANDEM_PROFILE_TAGS";

// `None` enables every tag.
#[cfg(feature = "profiling")]
type EnabledTags = Option<BTreeSet<String>>;

#[cfg(feature = "profiling")]
fn normalize<'a, I>(tokens: I) -> EnabledTags
where
    I: IntoIterator<Item = &'a str>,
{
    let mut enabled = BTreeSet::new();
    for token in tokens.into_iter().map(str::trim).filter(|t| !t.is_empty()) {
        let token = token.to_ascii_lowercase();
        if token == "*" || token == "all" {
            return None;
        }
        enabled.insert(token);
    }

    if enabled.is_empty() { None } else { Some(enabled) }
}

#[cfg(feature = "profiling")]
fn tags_from_env() -> EnabledTags {
    std::env::var(PROFILE_TAGS_ENV)
        .ok()
        .and_then(|raw| normalize(raw.split(',')))
}

#[cfg(feature = "profiling")]
fn filter() -> &'static RwLock<EnabledTags> {
    static FILTER: OnceLock<RwLock<EnabledTags>> = OnceLock::new();
    FILTER.get_or_init(|| RwLock::new(tags_from_env()))
}

#[cfg(feature = "profiling")]
fn replace_filter(enabled: EnabledTags) {
    let mut guard = match filter().write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    *guard = enabled;
}

/// Enables every profiling tag.
pub fn enable_all_tags() {
    #[cfg(feature = "profiling")]
    replace_filter(None);
}

/// Restricts profiling output to the given tags.
///
/// An empty slice, `"*"` or `"all"` enables everything. Matching is
/// case-insensitive.
pub fn set_enabled_tags(tags: &[&str]) {
    #[cfg(feature = "profiling")]
    replace_filter(normalize(tags.iter().copied()));

    let _ = tags;
}

/// Re-reads the comma separated tag list from `TANDEM_PROFILE_TAGS`.
pub fn reload_enabled_tags_from_env() {
    #[cfg(feature = "profiling")]
    replace_filter(tags_from_env());
}

/// Returns true when any tag of `tag_stack` is enabled.
///
/// Always false without the `profiling` feature.
pub fn is_tag_stack_enabled(tag_stack: &[&str]) -> bool {
    #[cfg(feature = "profiling")]
    {
        let guard = match filter().read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        return match guard.as_ref() {
            None => true,
            Some(enabled) => tag_stack
                .iter()
                .any(|tag| enabled.contains(&tag.to_ascii_lowercase())),
        };
    }

    #[cfg(not(feature = "profiling"))]
    {
        let _ = tag_stack;
        false
    }
}

/// Emits a profiling event on `target` when its tag stack is enabled.
#[inline]
pub fn event(
    target: &'static str,
    tag_stack: &[&str],
    op: &'static str,
    result: &'static str,
    elapsed_us: u64,
    message: &'static str,
) {
    #[cfg(feature = "profiling")]
    {
        if !is_tag_stack_enabled(tag_stack) {
            return;
        }

        // tracing needs a literal target per call site.
        match target {
            tags::PROFILE_QUEUE => {
                tracing::debug!(target: "tandem.profile.queue", op, result, elapsed_us, tags = ?tag_stack, "{message}");
            }
            tags::PROFILE_PIPELINE => {
                tracing::debug!(target: "tandem.profile.pipeline", op, result, elapsed_us, tags = ?tag_stack, "{message}");
            }
            tags::PROFILE_WORKER => {
                tracing::debug!(target: "tandem.profile.worker", op, result, elapsed_us, tags = ?tag_stack, "{message}");
            }
            tags::PROFILE_SORT => {
                tracing::debug!(target: "tandem.profile.sort", op, result, elapsed_us, tags = ?tag_stack, "{message}");
            }
            _ => {
                tracing::debug!(target: "tandem.profile", op, result, elapsed_us, original_target = target, tags = ?tag_stack, "{message}");
            }
        }
    }

    #[cfg(not(feature = "profiling"))]
    let _ = (target, tag_stack, op, result, elapsed_us, message);
}
