use apollo_compiler::Name;
use apollo_compiler::collections::IndexMap;
use apollo_compiler::collections::IndexSet;
use tracing::trace;

use super::Lookup;
use super::MappedSlot;
use crate::source::TypeDescriptor;

/// A record that a concrete schema type satisfies a composite type for a given source type.
#[derive(Debug, Clone)]
pub struct CovariantEntry {
    pub source: TypeDescriptor,
    pub slot: MappedSlot,
}

impl CovariantEntry {
    pub fn name(&self) -> &Name {
        self.slot.name()
    }
}

/// Composite (interface or union) name to the concrete types known to satisfy it, keyed by
/// concrete name.
#[derive(Debug, Clone, Default)]
pub struct CovariantRegistry {
    entries: IndexMap<Name, IndexMap<Name, CovariantEntry>>,
}

impl CovariantRegistry {
    /// Records `slot` under `composite`. Only a forward slot is ever replaced; the first resolved
    /// registration for a concrete name wins.
    pub(crate) fn register(&mut self, composite: Name, source: TypeDescriptor, slot: MappedSlot) {
        let concretes = self.entries.entry(composite.clone()).or_default();
        match concretes.get_mut(slot.name()) {
            Some(existing) if existing.slot.is_forward() => {
                existing.source = source;
                existing.slot = slot;
            }
            Some(existing) => {
                trace!(
                    "Keeping `{}` under `{composite}`, ignoring later registration",
                    existing.name()
                );
            }
            None => {
                trace!("Registering `{}` under `{composite}`", slot.name());
                concretes.insert(slot.name().clone(), CovariantEntry { source, slot });
            }
        }
    }

    pub fn get(&self, composite: &Name) -> Option<&IndexMap<Name, CovariantEntry>> {
        self.entries.get(composite)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Name, &IndexMap<Name, CovariantEntry>)> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every entry under `composite` whose source type the runtime type is assignable to, given
    /// the runtime type's capability set.
    pub fn candidates(
        &self,
        composite: &Name,
        capabilities: &IndexSet<Name>,
    ) -> Lookup<&CovariantEntry> {
        let Some(concretes) = self.entries.get(composite) else {
            return Lookup::NotFound;
        };
        Lookup::from_candidates(
            concretes
                .values()
                .filter(|entry| {
                    entry
                        .source
                        .ty
                        .declared_name()
                        .is_some_and(|name| capabilities.contains(name))
                })
                .collect(),
        )
    }

    pub(crate) fn entries_mut(&mut self) -> &mut IndexMap<Name, IndexMap<Name, CovariantEntry>> {
        &mut self.entries
    }
}
