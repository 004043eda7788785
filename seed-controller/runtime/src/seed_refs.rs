use crate::k8s::{self, Resource, ResourceExt, Seed};
use kube::runtime::reflector::ObjectRef;
use parking_lot::Mutex;
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

/// Maps watched objects onto the seeds they reference, including the seeds
/// they referenced when they were last seen.
///
/// A watch event only carries the new state of an object, so a shoot moving
/// from one seed to another would otherwise only trigger its new seed.
#[derive(Clone, Debug, Default)]
pub(crate) struct SeedRefs(Arc<Mutex<BTreeMap<String, BTreeSet<String>>>>);

// === impl SeedRefs ===

impl SeedRefs {
    pub(crate) fn map<K>(
        &self,
        object: &K,
        seeds: impl IntoIterator<Item = String>,
    ) -> Vec<ObjectRef<Seed>>
    where
        K: Resource<DynamicType = ()>,
    {
        let name = object.name_unchecked();
        let current = seeds.into_iter().collect::<BTreeSet<_>>();

        let previous = {
            let mut seen = self.0.lock();
            if k8s::is_deleting(object) {
                seen.remove(&name)
            } else {
                seen.insert(name, current.clone())
            }
        };

        current
            .into_iter()
            .chain(previous.into_iter().flatten())
            .collect::<BTreeSet<_>>()
            .iter()
            .map(|seed| ObjectRef::new(seed))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8s::{
        apimachinery::pkg::apis::meta::v1::Time,
        shoot::{ShootProvider, ShootStatus},
        ObjectMeta, Shoot, ShootSpec,
    };

    fn shoot(spec_seed: &str, status_seed: Option<&str>) -> Shoot {
        Shoot {
            metadata: ObjectMeta {
                name: Some("shoot".to_string()),
                ..Default::default()
            },
            spec: ShootSpec {
                seed_name: Some(spec_seed.to_string()),
                provider: ShootProvider {
                    type_: "aws".to_string(),
                    workers: vec![],
                },
                networking: None,
                extensions: vec![],
                dns: None,
            },
            status: status_seed.map(|seed| ShootStatus {
                seed_name: Some(seed.to_string()),
            }),
        }
    }

    fn map(refs: &SeedRefs, shoot: &Shoot) -> Vec<String> {
        refs.map(shoot, shoot.seed_names().map(str::to_string))
            .into_iter()
            .map(|r| r.name)
            .collect()
    }

    #[test]
    fn triggers_seeds_a_shoot_moved_away_from() {
        let refs = SeedRefs::default();
        assert_eq!(map(&refs, &shoot("a", Some("a"))), ["a"]);

        // Migrating: scheduled to b while still running on a.
        assert_eq!(map(&refs, &shoot("b", Some("a"))), ["a", "b"]);

        // Settled on b; a must still learn that the shoot left.
        assert_eq!(map(&refs, &shoot("b", Some("b"))), ["a", "b"]);
        assert_eq!(map(&refs, &shoot("b", Some("b"))), ["b"]);
    }

    #[test]
    fn forgets_deleted_objects() {
        let refs = SeedRefs::default();
        assert_eq!(map(&refs, &shoot("a", None)), ["a"]);

        let mut deleting = shoot("b", None);
        deleting.metadata.deletion_timestamp = Some(Time(Default::default()));
        assert_eq!(map(&refs, &deleting), ["a", "b"]);
        assert!(refs.0.lock().is_empty());

        assert_eq!(map(&refs, &shoot("c", None)), ["c"]);
    }
}
