//! Probe kinds, the default address table, and bus discovery.
//!
//! Atlas ships each EZO circuit on a fixed factory address, so a full bus
//! sweep plus the default table is enough to know which probes are wired up
//! and what each one measures.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::bus::{BusAddress, BusTransport};
use crate::error::Result;

/// The kind of measurement a probe provides.
///
/// Closed set matching the EZO circuit family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProbeKind {
    /// Dissolved oxygen (EZO DO, factory address 97).
    DissolvedOxygen,
    /// Oxidation-reduction potential (EZO ORP, factory address 98).
    OxidationReductionPotential,
    /// pH (EZO pH, factory address 99).
    Ph,
    /// Electrical conductivity (EZO EC, factory address 100).
    Conductivity,
    /// Temperature (EZO RTD, factory address 102).
    Temperature,
    /// Peristaltic pump (EZO PMP, factory address 103).
    Pump,
}

impl ProbeKind {
    /// All probe kinds, in canonical registry order.
    pub const ALL: [ProbeKind; 6] = [
        Self::DissolvedOxygen,
        Self::OxidationReductionPotential,
        Self::Ph,
        Self::Conductivity,
        Self::Temperature,
        Self::Pump,
    ];

    /// The factory default bus address for this kind.
    pub fn default_address(&self) -> BusAddress {
        let raw = match self {
            Self::DissolvedOxygen => 97,
            Self::OxidationReductionPotential => 98,
            Self::Ph => 99,
            Self::Conductivity => 100,
            Self::Temperature => 102,
            Self::Pump => 103,
        };
        BusAddress::from_known(raw)
    }

    /// Look up the kind assigned to an address in the default table.
    pub fn from_default_address(address: BusAddress) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.default_address() == address)
    }

    /// The device name this kind's firmware reports to an "I" query.
    pub fn firmware_name(&self) -> &'static str {
        match self {
            Self::DissolvedOxygen => "DO",
            Self::OxidationReductionPotential => "ORP",
            Self::Ph => "pH",
            Self::Conductivity => "EC",
            Self::Temperature => "RTD",
            Self::Pump => "PMP",
        }
    }

    /// Match a firmware-reported device name back to a kind.
    ///
    /// Comparison is case-insensitive; firmware revisions differ in casing.
    pub fn from_firmware_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.firmware_name().eq_ignore_ascii_case(name.trim()))
    }
}

impl std::fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.firmware_name())
    }
}

/// The set of probes confirmed present on the bus.
///
/// Built once per session by [`ProbeRegistry::discover`]; treat it as
/// immutable afterwards and rediscover explicitly if the wiring changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeRegistry {
    /// Present probes with a kind from the default address table.
    typed: BTreeMap<ProbeKind, BusAddress>,
    /// Present addresses with no entry in the default table.
    ///
    /// These are excluded from typed polling but can be queried ad hoc.
    unclassified: Vec<BusAddress>,
}

impl ProbeRegistry {
    /// Sweep the whole bus and record which addresses answer.
    ///
    /// Probes every address in 0..=127 with a select plus a minimal read; a
    /// transport fault just means "nothing there" and is not surfaced. The
    /// previously selected address is restored afterwards regardless of what
    /// the sweep finds. This is a 128-round-trip operation intended to run
    /// once per session, not per polling cycle.
    pub async fn discover<T>(transport: &mut T) -> Result<Self>
    where
        T: BusTransport + ?Sized,
    {
        let previous = transport.selected();
        let mut registry = Self::default();

        for address in BusAddress::scan_range() {
            if transport.select(address).await.is_err() {
                continue;
            }
            if transport.read_raw(1).await.is_err() {
                continue;
            }

            match ProbeKind::from_default_address(address) {
                Some(kind) => {
                    debug!("Found {} probe at address {}", kind, address);
                    registry.typed.insert(kind, address);
                }
                None => {
                    debug!("Found unclassified device at address {}", address);
                    registry.unclassified.push(address);
                }
            }
        }

        if let Some(address) = previous {
            transport.select(address).await?;
        }

        info!(
            "Discovery complete: {} typed probes, {} unclassified devices",
            registry.typed.len(),
            registry.unclassified.len()
        );
        Ok(registry)
    }

    /// Whether a probe of this kind is present.
    pub fn contains(&self, kind: ProbeKind) -> bool {
        self.typed.contains_key(&kind)
    }

    /// The address of a present probe of this kind.
    pub fn address_of(&self, kind: ProbeKind) -> Option<BusAddress> {
        self.typed.get(&kind).copied()
    }

    /// Present typed probes in registry order.
    pub fn probes(&self) -> impl Iterator<Item = (ProbeKind, BusAddress)> + '_ {
        self.typed.iter().map(|(&kind, &address)| (kind, address))
    }

    /// Present addresses with no kind in the default table.
    pub fn unclassified(&self) -> &[BusAddress] {
        &self.unclassified
    }

    /// Every present address, typed first, in registry order.
    pub fn all_addresses(&self) -> Vec<BusAddress> {
        self.typed
            .values()
            .copied()
            .chain(self.unclassified.iter().copied())
            .collect()
    }

    /// Number of typed probes present.
    pub fn len(&self) -> usize {
        self.typed.len()
    }

    /// Whether no typed probes were found.
    pub fn is_empty(&self) -> bool {
        self.typed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::MockBus;

    fn addr(value: u8) -> BusAddress {
        BusAddress::new(value).unwrap()
    }

    #[test]
    fn test_default_addresses_are_distinct() {
        let mut seen = std::collections::HashSet::new();
        for kind in ProbeKind::ALL {
            assert!(seen.insert(kind.default_address()));
        }
    }

    #[test]
    fn test_firmware_name_round_trip() {
        for kind in ProbeKind::ALL {
            assert_eq!(ProbeKind::from_firmware_name(kind.firmware_name()), Some(kind));
        }
        assert_eq!(ProbeKind::from_firmware_name("ph"), Some(ProbeKind::Ph));
        assert_eq!(ProbeKind::from_firmware_name(" rtd "), Some(ProbeKind::Temperature));
        assert_eq!(ProbeKind::from_firmware_name("XYZ"), None);
    }

    #[tokio::test]
    async fn test_discover_classifies_by_default_table() {
        let mut bus = MockBus::new();
        bus.attach_probe(addr(99), MockBus::success_frame("7.00"));
        bus.attach_probe(addr(102), MockBus::success_frame("21.5"));
        bus.attach_probe(addr(42), MockBus::success_frame("?"));

        let registry = ProbeRegistry::discover(&mut bus).await.unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.address_of(ProbeKind::Ph), Some(addr(99)));
        assert_eq!(registry.address_of(ProbeKind::Temperature), Some(addr(102)));
        assert!(!registry.contains(ProbeKind::DissolvedOxygen));
        assert_eq!(registry.unclassified(), &[addr(42)]);
    }

    #[tokio::test]
    async fn test_discover_restores_selected_address() {
        let mut bus = MockBus::new();
        bus.attach_probe(addr(99), MockBus::success_frame("7.00"));
        bus.select(addr(99)).await.unwrap();
        assert_eq!(bus.selected(), Some(addr(99)));

        let _ = ProbeRegistry::discover(&mut bus).await.unwrap();

        assert_eq!(bus.selected(), Some(addr(99)));
    }

    #[tokio::test]
    async fn test_discover_empty_bus_is_not_an_error() {
        let mut bus = MockBus::new();
        let registry = ProbeRegistry::discover(&mut bus).await.unwrap();
        assert!(registry.is_empty());
        assert!(registry.unclassified().is_empty());
    }

    #[tokio::test]
    async fn test_probes_iterate_in_registry_order() {
        let mut bus = MockBus::new();
        for kind in ProbeKind::ALL {
            bus.attach_probe(kind.default_address(), MockBus::success_frame("1"));
        }

        let registry = ProbeRegistry::discover(&mut bus).await.unwrap();
        let kinds: Vec<ProbeKind> = registry.probes().map(|(kind, _)| kind).collect();
        assert_eq!(kinds, ProbeKind::ALL.to_vec());
    }
}
