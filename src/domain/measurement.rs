use crate::shared::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// One fluid ounce in millilitres. The fixed dimensional-conversion table
/// referenced by §4.1 ("a small fixed table of dimensional conversions").
const ML_PER_OZ: f64 = 29.5735;
const G_PER_KG: f64 = 1000.0;

/// An item's base unit of measure — the unit its ledger deltas are stored
/// in (§3 InventoryItem.base_uom, GLOSSARY).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Uom {
    Unit,
    Ml,
    Oz,
    G,
    Kg,
}

impl Uom {
    pub fn from_str(s: &str) -> AppResult<Self> {
        match s.to_lowercase().as_str() {
            "unit" => Ok(Self::Unit),
            "ml" => Ok(Self::Ml),
            "oz" => Ok(Self::Oz),
            "g" => Ok(Self::G),
            "kg" => Ok(Self::Kg),
            _ => Err(AppError::validation(format!("Invalid UOM: {s}"))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Ml => "ml",
            Self::Oz => "oz",
            Self::G => "g",
            Self::Kg => "kg",
        }
    }

    fn is_volume(&self) -> bool {
        matches!(self, Self::Ml | Self::Oz)
    }

    fn is_weight(&self) -> bool {
        matches!(self, Self::G | Self::Kg)
    }

    /// Converts `value` (in `self` units) into `target` units. Volume <->
    /// volume and weight <-> weight conversions use the fixed factors
    /// above; volume <-> weight requires a `density_g_per_ml` (from a
    /// `BottleTemplate` or the item's `Category` default) per §4.1.
    pub fn convert(
        &self,
        value: f64,
        target: Uom,
        density_g_per_ml: Option<f64>,
    ) -> AppResult<f64> {
        if *self == target {
            return Ok(value);
        }

        // Normalize to a canonical unit for each dimension, then to target.
        let ml_value = match self {
            Self::Ml => Some(value),
            Self::Oz => Some(value * ML_PER_OZ),
            _ => None,
        };
        let g_value = match self {
            Self::G => Some(value),
            Self::Kg => Some(value * G_PER_KG),
            _ => None,
        };

        if self.is_volume() && target.is_volume() {
            let ml = ml_value.expect("volume source always yields ml");
            return Ok(match target {
                Self::Ml => ml,
                Self::Oz => ml / ML_PER_OZ,
                _ => unreachable!(),
            });
        }

        if self.is_weight() && target.is_weight() {
            let g = g_value.expect("weight source always yields g");
            return Ok(match target {
                Self::G => g,
                Self::Kg => g / G_PER_KG,
                _ => unreachable!(),
            });
        }

        let density = density_g_per_ml.ok_or_else(|| {
            AppError::validation(format!(
                "Converting {} to {} requires a liquid density",
                self.as_str(),
                target.as_str()
            ))
        })?;
        if density <= 0.0 || !density.is_finite() {
            return Err(AppError::validation("Density must be a positive, finite g/ml value"));
        }

        if self.is_volume() && target.is_weight() {
            let ml = ml_value.expect("volume source always yields ml");
            let g = ml * density;
            return Ok(match target {
                Self::G => g,
                Self::Kg => g / G_PER_KG,
                _ => unreachable!(),
            });
        }

        if self.is_weight() && target.is_volume() {
            let g = g_value.expect("weight source always yields g");
            let ml = g / density;
            return Ok(match target {
                Self::Ml => ml,
                Self::Oz => ml / ML_PER_OZ,
                _ => unreachable!(),
            });
        }

        Err(AppError::validation(format!(
            "Cannot convert {} to {}",
            self.as_str(),
            target.as_str()
        )))
    }
}

impl std::fmt::Display for Uom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oz_to_ml_round_trips() {
        let ml = Uom::Oz.convert(1.0, Uom::Ml, None).unwrap();
        assert!((ml - 29.5735).abs() < 1e-6);
        let back = Uom::Ml.convert(ml, Uom::Oz, None).unwrap();
        assert!((back - 1.0).abs() < 1e-9);
    }

    #[test]
    fn g_to_kg() {
        assert_eq!(Uom::G.convert(2000.0, Uom::Kg, None).unwrap(), 2.0);
    }

    #[test]
    fn weight_to_volume_requires_density() {
        assert!(Uom::G.convert(500.0, Uom::Ml, None).is_err());
        let ml = Uom::G.convert(500.0, Uom::Ml, Some(0.5)).unwrap();
        assert_eq!(ml, 1000.0);
    }

    #[test]
    fn same_unit_is_identity() {
        assert_eq!(Uom::Unit.convert(5.0, Uom::Unit, None).unwrap(), 5.0);
    }
}
