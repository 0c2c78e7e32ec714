use crate::domain::measurement::Uom;
use crate::domain::money::Money;
use crate::shared::{
    AppError, AppResult, BottleTemplateId, BusinessId, CategoryId, InventoryItemId, LocationId,
    PriceHistoryId, VendorId,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// How a category's items are physically counted during a session (§3
/// Category, §4.5 step 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountingMethod {
    Weighable,
    UnitCount,
    Keg,
}

impl CountingMethod {
    pub fn from_str(s: &str) -> AppResult<Self> {
        match s.to_lowercase().as_str() {
            "weighable" => Ok(Self::Weighable),
            "unit_count" | "unitcount" => Ok(Self::UnitCount),
            "keg" => Ok(Self::Keg),
            _ => Err(AppError::validation(format!("Invalid counting method: {s}"))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weighable => "weighable",
            Self::UnitCount => "unit_count",
            Self::Keg => "keg",
        }
    }
}

/// Business-scoped grouping of items; carries the counting method and a
/// fallback liquid density for weighable items lacking a specific
/// `BottleTemplate` (§3 Category).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub business_id: BusinessId,
    pub name: String,
    pub counting_method: CountingMethod,
    pub default_density_g_per_ml: Option<f64>,
}

impl Category {
    pub fn new(
        business_id: BusinessId,
        name: String,
        counting_method: CountingMethod,
        default_density_g_per_ml: Option<f64>,
    ) -> AppResult<Self> {
        if name.trim().is_empty() {
            return Err(AppError::validation("Category name cannot be empty"));
        }
        Ok(Self {
            id: CategoryId::new(),
            business_id,
            name: name.trim().to_string(),
            counting_method,
            default_density_g_per_ml,
        })
    }
}

/// Per-item calibration used by the weigh flow to convert gross grams to
/// remaining millilitres (§3 BottleTemplate, §4.5 step 2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BottleTemplate {
    pub id: BottleTemplateId,
    pub inventory_item_id: InventoryItemId,
    pub container_size_ml: f64,
    pub empty_weight_g: f64,
    pub full_weight_g: f64,
    pub measured_density_g_per_ml: Option<f64>,
}

impl BottleTemplate {
    pub fn new(
        inventory_item_id: InventoryItemId,
        container_size_ml: f64,
        empty_weight_g: f64,
        full_weight_g: f64,
        measured_density_g_per_ml: Option<f64>,
    ) -> AppResult<Self> {
        if container_size_ml <= 0.0 || empty_weight_g < 0.0 || full_weight_g <= empty_weight_g {
            return Err(AppError::validation(
                "Bottle template weights must satisfy full > empty >= 0, with a positive container size",
            ));
        }
        Ok(Self {
            id: BottleTemplateId::new(),
            inventory_item_id,
            container_size_ml,
            empty_weight_g,
            full_weight_g,
            measured_density_g_per_ml,
        })
    }

    /// Density implied by a full bottle, used when no `measured_density` is
    /// recorded directly.
    pub fn implied_density_g_per_ml(&self) -> f64 {
        (self.full_weight_g - self.empty_weight_g) / self.container_size_ml
    }

    pub fn density_g_per_ml(&self) -> f64 {
        self.measured_density_g_per_ml
            .unwrap_or_else(|| self.implied_density_g_per_ml())
    }

    /// Converts a gross (bottle + liquid) weight in grams to remaining
    /// millilitres. Round-trips to within 1g per §8's round-trip law.
    pub fn gross_weight_to_ml(&self, gross_weight_g: f64) -> AppResult<f64> {
        let net_g = gross_weight_g - self.empty_weight_g;
        if net_g < 0.0 {
            return Err(AppError::validation(
                "Gross weight is below the bottle's empty weight",
            ));
        }
        Ok(net_g / self.density_g_per_ml())
    }

    pub fn ml_to_gross_weight(&self, ml: f64) -> f64 {
        self.empty_weight_g + ml * self.density_g_per_ml()
    }
}

/// Business-scoped supplier (§3 Ownership).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vendor {
    pub id: VendorId,
    pub business_id: BusinessId,
    pub name: String,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub notes: Option<String>,
}

impl Vendor {
    pub fn new(business_id: BusinessId, name: String) -> AppResult<Self> {
        if name.trim().is_empty() {
            return Err(AppError::validation("Vendor name cannot be empty"));
        }
        Ok(Self {
            id: VendorId::new(),
            business_id,
            name: name.trim().to_string(),
            contact_email: None,
            contact_phone: None,
            notes: None,
        })
    }
}

/// An immutable price point. A later insert closes the prior row's
/// `effective_to` (§3 PriceHistory) — enforced by the repository, not the
/// domain type, since it requires seeing the existing row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceHistory {
    pub id: PriceHistoryId,
    pub inventory_item_id: InventoryItemId,
    pub unit_cost: Money,
    pub effective_from: OffsetDateTime,
    pub effective_to: Option<OffsetDateTime>,
    pub currency: String,
}

impl PriceHistory {
    pub fn new(
        inventory_item_id: InventoryItemId,
        unit_cost: Money,
        effective_from: OffsetDateTime,
        currency: String,
    ) -> Self {
        Self {
            id: PriceHistoryId::new(),
            inventory_item_id,
            unit_cost,
            effective_from,
            effective_to: None,
            currency,
        }
    }
}

/// An SKU at a location (§3 InventoryItem). Soft-delete only: `active =
/// false` preserves history, since ledger entries reference items by id
/// forever.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: InventoryItemId,
    pub location_id: LocationId,
    pub name: String,
    pub barcode: Option<String>,
    pub category_id: CategoryId,
    pub base_uom: Uom,
    pub container_size_ml: Option<f64>,
    pub pack_size: Option<i32>,
    pub vendor_id: Option<VendorId>,
    pub active: bool,
    pub created_at: OffsetDateTime,
}

impl InventoryItem {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        location_id: LocationId,
        name: String,
        barcode: Option<String>,
        category_id: CategoryId,
        base_uom: Uom,
        container_size_ml: Option<f64>,
        pack_size: Option<i32>,
        vendor_id: Option<VendorId>,
    ) -> AppResult<Self> {
        if name.trim().is_empty() {
            return Err(AppError::validation("Inventory item name cannot be empty"));
        }
        if let Some(size) = container_size_ml {
            if size <= 0.0 {
                return Err(AppError::validation("Container size must be positive"));
            }
        }
        Ok(Self {
            id: InventoryItemId::new(),
            location_id,
            name: name.trim().to_string(),
            barcode,
            category_id,
            base_uom,
            container_size_ml,
            pack_size,
            vendor_id,
            active: true,
            created_at: OffsetDateTime::now_utc(),
        })
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(location: LocationId, category: CategoryId) -> InventoryItem {
        InventoryItem::new(
            location,
            "Jameson".into(),
            None,
            category,
            Uom::Ml,
            Some(750.0),
            None,
            None,
        )
        .unwrap()
    }

    #[test]
    fn bottle_template_weight_round_trip() {
        let jameson = item(LocationId::new(), CategoryId::new());
        let template =
            BottleTemplate::new(jameson.id, 750.0, 500.0, 1250.0, Some(1.0)).unwrap();
        let ml = template.gross_weight_to_ml(1000.0).unwrap();
        assert!((ml - 500.0).abs() < 1e-9);
        let back = template.ml_to_gross_weight(ml);
        assert!((back - 1000.0).abs() < 1.0);
    }

    #[test]
    fn bottle_template_rejects_full_below_empty() {
        let jameson = item(LocationId::new(), CategoryId::new());
        assert!(BottleTemplate::new(jameson.id, 750.0, 900.0, 800.0, None).is_err());
    }

    #[test]
    fn deactivate_preserves_identity() {
        let mut jameson = item(LocationId::new(), CategoryId::new());
        let id = jameson.id;
        jameson.deactivate();
        assert!(!jameson.active);
        assert_eq!(jameson.id, id);
    }
}
