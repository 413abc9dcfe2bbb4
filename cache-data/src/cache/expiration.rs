//! Expiration policy

use crate::cache::headers::Headers;
use crate::cache::profile::CacheProfile;
use chrono::{DateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;

/// Compute when an entry fetched at `fetched_at` expires.
///
/// Order of preference:
/// 1. the origin's `cache-control`/`expires` hint, unless the profile overrides
///    it or it is not in the future;
/// 2. the next interval boundary in `time_zone` for interval profiles;
/// 3. `fetched_at + default_expiration_seconds`.
pub fn compute_expiration(
    profile: &CacheProfile,
    fetched_at: i64,
    origin_headers: &Headers,
    time_zone: Tz,
) -> i64 {
    if !profile.override_origin_header_expiration {
        if let Some(expires_at) = origin_expiration(origin_headers, fetched_at) {
            return expires_at;
        }
    }

    let interval = profile.default_expiration_seconds as i64;
    if profile.expiration_is_on_interval {
        next_interval_boundary(fetched_at, interval, time_zone)
    } else {
        fetched_at + interval
    }
}

/// Expiration advertised by the origin, if it lies after `fetched_at`
pub fn origin_expiration(headers: &Headers, fetched_at: i64) -> Option<i64> {
    let from_cache_control = headers
        .get("cache-control")
        .and_then(|value| value.as_str().map(str::to_owned))
        .and_then(|value| max_age(&value))
        .map(|seconds| fetched_at + seconds);

    let from_expires = || {
        headers
            .get("expires")
            .and_then(|value| value.as_str().map(str::to_owned))
            .and_then(|value| parse_http_date(&value))
    };

    from_cache_control
        .or_else(from_expires)
        .filter(|expires_at| *expires_at > fetched_at)
}

/// `s-maxage` wins over `max-age`, as this cache is shared between callers
fn max_age(cache_control: &str) -> Option<i64> {
    let directive = |name: &str| {
        cache_control.split(',').find_map(|part| {
            let (key, value) = part.trim().split_once('=')?;
            if key.trim().eq_ignore_ascii_case(name) {
                value.trim().trim_matches('"').parse::<i64>().ok()
            } else {
                None
            }
        })
    };
    directive("s-maxage").or_else(|| directive("max-age"))
}

/// Next boundary of `interval` seconds strictly after `fetched_at`, counted
/// from local midnight of the epoch in `time_zone`.
pub fn next_interval_boundary(fetched_at: i64, interval: i64, time_zone: Tz) -> i64 {
    if interval <= 0 {
        return fetched_at;
    }
    let offset = DateTime::<Utc>::from_timestamp(fetched_at, 0)
        .map(|utc| {
            time_zone
                .offset_from_utc_datetime(&utc.naive_utc())
                .fix()
                .local_minus_utc() as i64
        })
        .unwrap_or(0);

    let local = fetched_at + offset;
    let next_local = (local.div_euclid(interval) + 1) * interval;
    next_local - offset
}

/// Format epoch seconds as an IMF-fixdate (`Sun, 06 Nov 1994 08:49:37 GMT`)
pub fn http_date(epoch_seconds: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(epoch_seconds, 0)
        .map(|dt| dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
}

pub fn parse_http_date(value: &str) -> Option<i64> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|dt| dt.timestamp())
}
