//! Resource value types shared by storage and the cooking process.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of resource types the storage knows how to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Meat,
    Grill,
    Sauce,
    Rosemary,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [Self::Meat, Self::Grill, Self::Sauce, Self::Rosemary];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Meat => "meat",
            Self::Grill => "grill",
            Self::Sauce => "sauce",
            Self::Rosemary => "rosemary",
        }
    }

    /// Which slot behaviour backs this resource type.
    pub fn slot_kind(&self) -> SlotKind {
        match self {
            Self::Meat => SlotKind::Pack,
            Self::Grill | Self::Sauce => SlotKind::Weight,
            Self::Rosemary => SlotKind::Piece,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Slot behaviour families.
///
/// `Weight` and `Piece` are disposable: one generation of stock, replaced
/// wholesale on every supply. `Pack` is reusable and versioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    Weight,
    Piece,
    Pack,
}

impl SlotKind {
    pub fn is_disposable(&self) -> bool {
        matches!(self, Self::Weight | Self::Piece)
    }

    /// Unit in which pull requests against this slot are expressed.
    ///
    /// Packs are searched by the weight of their entries.
    pub fn request_unit(&self) -> Unit {
        match self {
            Self::Weight | Self::Pack => Unit::Weight,
            Self::Piece => Unit::Piece,
        }
    }

    /// Unit in which the fill level is reported. Packs count entries.
    pub fn size_unit(&self) -> Unit {
        match self {
            Self::Weight => Unit::Weight,
            Self::Piece | Self::Pack => Unit::Piece,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Weight,
    Piece,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Weight => f.write_str("weight"),
            Unit::Piece => f.write_str("piece"),
        }
    }
}

/// Amount of a resource: grams for weighed goods, a count for pieces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "unit", content = "amount", rename_all = "lowercase")]
pub enum Quantity {
    Weight(u64),
    Piece(u64),
}

impl Quantity {
    pub fn zero(unit: Unit) -> Self {
        Self::of(unit, 0)
    }

    pub fn of(unit: Unit, amount: u64) -> Self {
        match unit {
            Unit::Weight => Self::Weight(amount),
            Unit::Piece => Self::Piece(amount),
        }
    }

    pub fn amount(&self) -> u64 {
        match *self {
            Self::Weight(v) | Self::Piece(v) => v,
        }
    }

    pub fn unit(&self) -> Unit {
        match self {
            Self::Weight(_) => Unit::Weight,
            Self::Piece(_) => Unit::Piece,
        }
    }

    /// Grow by a percentage, rounding half up. `percent` is whole percents.
    pub fn add_percent(&self, percent: u64) -> Self {
        let amount = self.amount();
        let grown = amount + (amount * percent + 50) / 100;
        Self::of(self.unit(), grown)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Weight(v) => write!(f, "{v}g"),
            Self::Piece(v) => write!(f, "{v}pcs"),
        }
    }
}

/// Proteins, fats, carbohydrates per 100 g and energy value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Macronutrients {
    pub proteins: f64,
    pub fats: f64,
    pub carbs: f64,
    pub calories: f64,
}

impl Macronutrients {
    pub fn new(proteins: f64, fats: f64, carbs: f64, calories: f64) -> Self {
        Self {
            proteins,
            fats,
            carbs,
            calories,
        }
    }
}

/// A concrete portion of a resource, as stocked or as handed out by storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub kind: ResourceKind,
    pub macronutrients: Macronutrients,
    pub quantity: Quantity,
    pub expiration: DateTime<Utc>,
}

impl Resource {
    pub fn new(
        kind: ResourceKind,
        macronutrients: Macronutrients,
        quantity: Quantity,
        expiration: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            macronutrients,
            quantity,
            expiration,
        }
    }

    /// Expiration already passed at `now`.
    pub fn is_rotten(&self, now: DateTime<Utc>) -> bool {
        self.expiration < now
    }
}
