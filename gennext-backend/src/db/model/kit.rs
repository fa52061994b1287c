use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use valuable::Valuable;

use crate::db::{
    Tables, error,
    model::{FetchAll, Write, WriteContext, utc_now},
};

#[derive(Serialize, Deserialize, Valuable, Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
pub enum KitStatus {
    Allocated,
}

/// A physical collection kit issued to a clinic, identified by its QR code.
#[derive(Serialize, Clone, Debug)]
pub struct Kit {
    pub id: String,
    pub qr_code: String,
    pub clinic_id: Option<String>,
    pub status: KitStatus,
    #[serde(skip_serializing)]
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, Validate, Valuable, Debug)]
pub struct NewKit {
    #[garde(skip)]
    pub clinic_id: Option<String>,
}

impl Write for NewKit {
    type Returns = Kit;

    fn write(self, db: &mut Tables, _ctx: &WriteContext<'_>) -> error::Result<Kit> {
        let (id, qr_code) = db.next_kit_ids();

        let kit = Kit {
            id: id.clone(),
            qr_code,
            clinic_id: self.clinic_id,
            status: KitStatus::Allocated,
            created_at: utc_now(),
        };
        db.kits.insert(id, kit.clone());

        Ok(kit)
    }
}

impl FetchAll for Kit {
    fn fetch_all(db: &Tables) -> Vec<Self> {
        db.kits.values().cloned().collect()
    }
}
