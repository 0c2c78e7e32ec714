use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Generates a UUID newtype with the constructor/accessor surface every
/// id in this crate needs. Mirrors the hand-written `BusinessId`/`UserId`
/// shape below but without repeating it ~20 times.
macro_rules! id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

// Tenancy
id_type!(BusinessId);
id_type!(UserId);
id_type!(LocationId);
id_type!(RefreshTokenId);

// Catalog
id_type!(InventoryItemId);
id_type!(CategoryId);
id_type!(BottleTemplateId);
id_type!(VendorId);
id_type!(PriceHistoryId);

// Ledger
id_type!(ConsumptionEventId);

// Mapping
id_type!(SalesLineId);
id_type!(PosItemMappingId);
id_type!(RecipeId);
id_type!(RecipeIngredientId);
id_type!(TapLineId);
id_type!(KegInstanceId);
id_type!(TapAssignmentId);

// Sessions
id_type!(InventorySessionId);
id_type!(InventorySessionLineId);
id_type!(SessionParticipantId);
id_type!(VarianceReasonEntryId);

// Par / purchasing
id_type!(ParLevelId);
id_type!(PurchaseOrderId);
id_type!(PoLineId);

// Alerts / audit
id_type!(NotificationId);
id_type!(AuditLogEntryId);
