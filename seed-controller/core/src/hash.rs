//! Short digests of resource specs.
//!
//! Installations carry a digest of their registration's spec and of their
//! seed's spec as labels. Extensions compare these labels to notice that they
//! must re-render without deep-comparing the specs, so the digest must only
//! depend on spec content and must be stable across releases.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// The number of hex characters kept from the SHA-256 digest.
pub const SPEC_HASH_LEN: usize = 16;

/// Computes the truncated SHA-256 of the canonical JSON form of `spec`.
pub fn spec_hash<T: Serialize>(spec: &T) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(spec)?;
    let mut canonical = String::new();
    write_canonical(&value, &mut canonical)?;

    let digest = Sha256::digest(canonical.as_bytes());
    let mut hash = hex::encode(digest);
    hash.truncate(SPEC_HASH_LEN);
    Ok(hash)
}

/// Writes compact JSON with object keys in lexicographic order, independent
/// of how the map was built.
fn write_canonical(value: &Value, out: &mut String) -> Result<(), serde_json::Error> {
    match value {
        Value::Object(map) => {
            let mut entries = map.iter().collect::<Vec<_>>();
            entries.sort_by_key(|(k, _)| *k);
            out.push('{');
            for (i, (k, v)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(k)?);
                out.push(':');
                write_canonical(v, out)?;
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, v) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(v, out)?;
            }
            out.push(']');
        }
        scalar => out.push_str(&serde_json::to_string(scalar)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_seed_controller_k8s_api::{
        seed::{SeedBackup, SeedProvider},
        ControllerRegistrationSpec, ObjectMeta, Seed, SeedSpec,
    };

    fn seed(name: &str, provider: &str) -> Seed {
        Seed {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            spec: SeedSpec {
                provider: SeedProvider {
                    type_: provider.to_string(),
                    region: Some("eu-west-1".to_string()),
                    extra: Default::default(),
                },
                backup: Some(SeedBackup {
                    provider: provider.to_string(),
                    region: None,
                    extra: Default::default(),
                }),
                dns: None,
                settings: None,
                extra: Default::default(),
            },
        }
    }

    #[test]
    fn short_hex_digest() {
        let hash = spec_hash(&seed("a", "aws").spec).unwrap();
        assert_eq!(hash.len(), SPEC_HASH_LEN);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn stable_for_equal_specs() {
        assert_eq!(
            spec_hash(&seed("a", "aws").spec).unwrap(),
            spec_hash(&seed("a", "aws").spec).unwrap(),
        );
    }

    #[test]
    fn ignores_metadata() {
        let mut labeled = seed("b", "aws");
        labeled.metadata.resource_version = Some("42".to_string());
        assert_eq!(
            spec_hash(&seed("a", "aws").spec).unwrap(),
            spec_hash(&labeled.spec).unwrap(),
        );
    }

    #[test]
    fn changes_with_spec() {
        assert_ne!(
            spec_hash(&seed("a", "aws").spec).unwrap(),
            spec_hash(&seed("a", "gcp").spec).unwrap(),
        );
    }

    #[test]
    fn covers_unmodeled_fields() {
        let registration = |deployment: &str, primary: bool| {
            serde_json::from_value::<ControllerRegistrationSpec>(serde_json::json!({
                "resources": [{ "kind": "Worker", "type": "aws", "primary": primary }],
                "deployment": {
                    "policy": "OnDemand",
                    "deploymentRefs": [{ "name": deployment }],
                },
            }))
            .unwrap()
        };
        let v1 = spec_hash(&registration("provider-aws-v1", true)).unwrap();
        assert_ne!(v1, spec_hash(&registration("provider-aws-v2", true)).unwrap());
        assert_ne!(v1, spec_hash(&registration("provider-aws-v1", false)).unwrap());
        assert_eq!(v1, spec_hash(&registration("provider-aws-v1", true)).unwrap());

        let seed = |pods: &str| {
            serde_json::from_value::<SeedSpec>(serde_json::json!({
                "provider": { "type": "aws", "region": "eu-west-1" },
                "networks": { "pods": pods, "services": "10.1.0.0/16" },
            }))
            .unwrap()
        };
        assert_ne!(
            spec_hash(&seed("10.0.0.0/16")).unwrap(),
            spec_hash(&seed("10.2.0.0/16")).unwrap(),
        );
    }

    #[test]
    fn independent_of_key_order() {
        let a = serde_json::json!({ "b": 1, "a": { "d": [1, 2], "c": null } });
        let mut b = serde_json::Map::new();
        b.insert(
            "a".to_string(),
            serde_json::json!({ "c": null, "d": [1, 2] }),
        );
        b.insert("b".to_string(), serde_json::json!(1));
        assert_eq!(spec_hash(&a).unwrap(), spec_hash(&Value::Object(b)).unwrap());
    }

    #[test]
    fn known_digest() {
        // sha256(`{"a":"b"}`)
        assert_eq!(
            spec_hash(&serde_json::json!({ "a": "b" })).unwrap(),
            "db4a7ecb114bc66c"
        );
    }
}
