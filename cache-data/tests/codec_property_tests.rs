//! Property-based tests for the entry codec and header boundary
//!
//! Properties:
//! - `get_header` never hands back an unusable value
//! - `is_valid_outgoing_header_value` accepts exactly non-empty strings other
//!   than the no-value token, and finite numbers
//! - not-modified updates keep the body and advance expiry
//! - oversized entries round-trip through the blob store byte-for-byte
//! - key derivation ignores parameter insertion order and the response hook
//! - `extend_expires` only moves expiry

use cache_data::cache::{
    get_header, is_valid_outgoing_header_value, BodyUpdate, CacheEntry, CacheKey,
    Classification, DataCipher, DigestAlgorithm, EncryptionAlgorithm, EntryCodec, EntryUpdate,
    Headers, SecureDataKey, NO_VALUE_TOKEN,
};
use cache_data::{Connection, FetchResponse};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

// ============================================================================
// STRATEGIES
// ============================================================================

fn arb_header_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        Just(json!(NO_VALUE_TOKEN)),
        Just(json!("null")),
        Just(json!("")),
        Just(json!("   ")),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        (-1.0e9f64..1.0e9f64).prop_map(|n| json!(n)),
        "[ -~]{0,24}".prop_map(Value::String),
        Just(json!({"nested": true})),
        Just(json!(["a", "b"])),
    ]
}

fn arb_header_name() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z-]{0,15}"
}

fn arb_parameters() -> impl Strategy<Value = Vec<(String, i64)>> {
    prop::collection::btree_map("[a-z]{1,8}", any::<i64>(), 0..8)
        .prop_map(|map| map.into_iter().collect())
}

fn arb_entry(body_len: std::ops::Range<usize>) -> impl Strategy<Value = CacheEntry> {
    (
        prop::collection::vec(any::<char>(), body_len),
        0i64..1_000_000,
        0u64..86_400,
        prop_oneof![Just(Classification::Public), Just(Classification::Private)],
    )
        .prop_map(|(chars, expires_at, purge_after, classification)| {
            CacheEntry::new(
                CacheKey::from_raw("prop-key"),
                Some(chars.into_iter().collect()),
                Headers::from_pairs([("etag", "\"abc\""), ("content-type", "text/plain")]),
                200,
                classification,
                expires_at,
                expires_at + purge_after as i64,
            )
        })
}

fn codec(max_inline_bytes: usize) -> EntryCodec {
    let cipher =
        DataCipher::new(EncryptionAlgorithm::Aes256Gcm, &SecureDataKey::new([42u8; 32])).ok();
    EntryCodec::new(cipher, max_inline_bytes, "cache")
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    #[test]
    fn prop_get_header_never_returns_unusable_value(
        name in arb_header_name(),
        value in arb_header_value(),
    ) {
        let mut raw = BTreeMap::new();
        raw.insert(name.clone(), value.clone());

        let found = get_header(&raw, &name.to_ascii_uppercase());
        match found {
            Some(header) => {
                prop_assert!(is_valid_outgoing_header_value(&value));
                prop_assert!(is_valid_outgoing_header_value(&header.to_json()));
                prop_assert_ne!(header.as_str(), Some(NO_VALUE_TOKEN));
            }
            None => prop_assert!(!is_valid_outgoing_header_value(&value)),
        }
    }

    #[test]
    fn prop_outgoing_value_validity(value in arb_header_value()) {
        let expected = match &value {
            Value::String(text) => !text.is_empty() && text != NO_VALUE_TOKEN,
            Value::Number(number) => number.as_f64().is_some_and(f64::is_finite),
            _ => false,
        };
        prop_assert_eq!(is_valid_outgoing_header_value(&value), expected);
    }

    #[test]
    fn prop_sanitized_headers_hold_only_valid_values(
        pairs in prop::collection::vec((arb_header_name(), arb_header_value()), 0..10),
    ) {
        let raw: BTreeMap<String, Value> = pairs.into_iter().collect();
        let headers = Headers::from_raw(&raw);
        for (name, value) in headers.iter() {
            prop_assert_eq!(name, name.to_ascii_lowercase());
            prop_assert!(is_valid_outgoing_header_value(&value.to_json()));
        }
    }

    #[test]
    fn prop_not_modified_update_keeps_body(
        entry in arb_entry(0..64),
        advance in 1i64..100_000,
    ) {
        let mut updated = entry.clone();
        let expires_at = entry.expires_at + advance;
        updated.update(EntryUpdate {
            body: BodyUpdate::Keep,
            headers: Headers::from_pairs([("cache-control", "max-age=60")]),
            status_code: entry.status_code,
            expires_at,
            purge_at: expires_at,
            classification: entry.classification,
        });

        prop_assert_eq!(&updated.body, &entry.body);
        prop_assert!(updated.expires_at > entry.expires_at);
        prop_assert!(updated.purge_at >= updated.expires_at);
    }

    #[test]
    fn prop_oversized_entries_round_trip(entry in arb_entry(1200..4000)) {
        let codec = codec(1024);
        let encoded = codec.encode(&entry).unwrap();

        let blob = encoded.blob.as_ref();
        prop_assert!(blob.is_some());
        prop_assert!(encoded.record.data.in_blob_store);
        prop_assert_eq!(
            encoded.record.blob_pointer(),
            blob.map(|b| b.key.as_str())
        );

        let decoded = codec
            .decode(&encoded.record, blob.map(|b| b.bytes.as_slice()))
            .unwrap();
        prop_assert_eq!(decoded.body, entry.body);
        prop_assert_eq!(decoded.headers, entry.headers);
        prop_assert_eq!(decoded.expires_at, entry.expires_at);
    }

    #[test]
    fn prop_small_entries_stay_inline(entry in arb_entry(0..64)) {
        let codec = codec(64 * 1024);
        let encoded = codec.encode(&entry).unwrap();
        prop_assert!(encoded.blob.is_none());
        prop_assert!(!encoded.record.data.in_blob_store);

        let decoded = codec.decode(&encoded.record, None).unwrap();
        prop_assert_eq!(decoded, entry);
    }

    #[test]
    fn prop_key_ignores_parameter_order_and_hook(params in arb_parameters()) {
        let forward = params.iter().fold(
            Connection::get("api.example.com", "/data"),
            |conn, (name, value)| conn.parameter(name.clone(), *value),
        );
        let reversed = params
            .iter()
            .rev()
            .fold(Connection::get("API.example.com", "/data"), |conn, (name, value)| {
                conn.parameter(name.clone(), *value)
            })
            .with_response_hook(Arc::new(|response: &mut FetchResponse| {
                response.success = true;
            }));

        let a = CacheKey::derive(&forward, DigestAlgorithm::Sha256, Some("salt")).unwrap();
        let b = CacheKey::derive(&reversed, DigestAlgorithm::Sha256, Some("salt")).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn prop_extend_expires_touches_only_expiry(
        entry in arb_entry(0..64),
        grace in 1u64..3600,
        now in 0i64..2_000_000,
    ) {
        let mut once = entry.clone();
        once.extend_expires(grace, now);
        let mut twice = once.clone();
        twice.extend_expires(grace, now);

        prop_assert_eq!(&twice.body, &entry.body);
        prop_assert_eq!(&twice.headers, &entry.headers);
        prop_assert!(once.expires_at >= now + grace as i64);
        prop_assert!(twice.expires_at > once.expires_at);
        prop_assert!(twice.purge_at >= twice.expires_at);
    }
}
