use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use thiserror::Error;

use super::product::{PowerSupply, SystemType};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0} is not one of the selected systems")]
pub struct SystemNotSelected(pub SystemType);

/// What the customer has asked for so far: which systems, which supply and
/// which product per system.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSelection {
    systems: BTreeSet<SystemType>,
    power_supply: Option<PowerSupply>,
    products: BTreeMap<SystemType, i64>,
}

impl QuoteSelection {
    pub fn new(systems: impl IntoIterator<Item = SystemType>, power_supply: Option<PowerSupply>) -> Self {
        Self {
            systems: systems.into_iter().collect(),
            power_supply,
            products: BTreeMap::new(),
        }
    }

    /// Selection with products already chosen. Products named for systems that
    /// are not selected are dropped.
    pub fn with_products(
        systems: impl IntoIterator<Item = SystemType>,
        power_supply: Option<PowerSupply>,
        products: impl IntoIterator<Item = (SystemType, i64)>,
    ) -> Self {
        let mut selection = Self::new(systems, power_supply);
        let chosen: BTreeMap<SystemType, i64> = products
            .into_iter()
            .filter(|(system, _)| selection.is_selected(*system))
            .collect();
        selection.products = chosen;
        selection
    }

    pub fn systems(&self) -> &BTreeSet<SystemType> {
        &self.systems
    }

    pub fn power_supply(&self) -> Option<PowerSupply> {
        self.power_supply
    }

    pub fn is_selected(&self, system: SystemType) -> bool {
        self.systems.contains(&system)
    }

    /// Replaces the systems and supply. Chosen products of systems that are no
    /// longer selected are dropped.
    pub fn set_requirements(&mut self, systems: BTreeSet<SystemType>, power_supply: Option<PowerSupply>) {
        self.products.retain(|system, _| systems.contains(system));
        self.systems = systems;
        self.power_supply = power_supply;
    }

    pub fn choose_product(&mut self, system: SystemType, product_id: i64) -> Result<(), SystemNotSelected> {
        if !self.is_selected(system) {
            return Err(SystemNotSelected(system));
        }
        self.products.insert(system, product_id);
        Ok(())
    }

    pub fn clear_product(&mut self, system: SystemType) {
        self.products.remove(&system);
    }

    pub fn product_for(&self, system: SystemType) -> Option<i64> {
        self.products.get(&system).copied()
    }

    /// Chosen products, in breakdown order.
    pub fn chosen_products(&self) -> impl Iterator<Item = (SystemType, i64)> + '_ {
        self.products.iter().map(|(system, id)| (*system, *id))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn cannot_choose_product_for_unselected_system() {
        let mut selection = QuoteSelection::new([SystemType::Solar], Some(PowerSupply::Single));

        let err = selection.choose_product(SystemType::Battery, 7).unwrap_err();

        assert_eq!(err, SystemNotSelected(SystemType::Battery));
        assert_eq!(selection.product_for(SystemType::Battery), None);
    }

    #[test]
    fn deselecting_a_system_drops_its_product() {
        let mut selection =
            QuoteSelection::new([SystemType::Solar, SystemType::Battery], Some(PowerSupply::Three));
        selection.choose_product(SystemType::Solar, 1).unwrap();
        selection.choose_product(SystemType::Battery, 2).unwrap();

        selection.set_requirements([SystemType::Solar].into_iter().collect(), Some(PowerSupply::Three));

        assert_eq!(selection.chosen_products().collect::<Vec<_>>(), vec![(SystemType::Solar, 1)]);
    }

    #[test]
    fn with_products_ignores_unselected_systems() {
        let selection = QuoteSelection::with_products(
            [SystemType::Battery],
            Some(PowerSupply::Single),
            [(SystemType::Solar, 1), (SystemType::Battery, 2)],
        );

        assert_eq!(selection.chosen_products().collect::<Vec<_>>(), vec![(SystemType::Battery, 2)]);
    }
}
