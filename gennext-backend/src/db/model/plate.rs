use std::collections::HashSet;

use chrono::{DateTime, Utc};
use garde::Validate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use valuable::Valuable;

use crate::{
    db::{
        Tables, error,
        model::{FetchAll, Write, WriteContext, utc_now},
    },
    lifecycle::SampleStatus,
};

#[derive(Clone, Debug)]
pub struct Plate {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct PlateWell {
    pub id: String,
    pub plate_id: String,
    pub aliquot_id: String,
    pub well: String,
    pub sentrix_barcode: String,
    pub sentrix_position: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, Validate, Valuable, Debug)]
pub struct NewPlate {
    #[garde(length(min = 1))]
    pub name: String,
    #[garde(length(min = 1), dive)]
    pub wells: Vec<NewPlateWell>,
}

#[derive(Deserialize, Validate, Valuable, Debug)]
pub struct NewPlateWell {
    #[garde(length(min = 1))]
    pub well: String,
    #[garde(length(min = 1))]
    pub aliquot_id: String,
    #[garde(length(min = 1))]
    pub sentrix_barcode: String,
    #[garde(length(min = 1))]
    pub sentrix_position: String,
}

#[derive(Serialize, Valuable, Clone, Debug)]
pub struct PlateSummary {
    pub id: String,
    pub name: String,
    pub well_count: usize,
}

impl Write for NewPlate {
    type Returns = PlateSummary;

    fn write(self, db: &mut Tables, _ctx: &WriteContext<'_>) -> error::Result<PlateSummary> {
        let unknown: Vec<_> = self
            .wells
            .iter()
            .map(|w| &w.aliquot_id)
            .filter(|id| !db.aliquots.contains_key(*id))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(error::Error::not_found("aliquot", unknown.join(", ")));
        }

        // The whole request is validated before anything is created: every
        // consent and uniqueness violation is collected so the caller sees
        // the full list, and any violation rejects the entire plate.
        let mut reasons = Vec::new();

        let sample_ids: Vec<String> = self
            .wells
            .iter()
            .map(|w| Ok(db.aliquot(&w.aliquot_id)?.sample_id.clone()))
            .collect::<error::Result<_>>()?;
        reasons.extend(
            db.samples_missing_consent(&sample_ids)
                .into_iter()
                .map(|id| format!("sample {id} has no consent record")),
        );

        let mut seen_positions = HashSet::new();
        let mut seen_aliquots = HashSet::new();
        for well in &self.wells {
            if !seen_positions.insert((&well.sentrix_barcode, &well.sentrix_position)) {
                reasons.push(format!(
                    "duplicate sentrix position {}/{}",
                    well.sentrix_barcode, well.sentrix_position
                ));
            }
            if !seen_aliquots.insert(&well.aliquot_id) {
                reasons.push(format!(
                    "aliquot {} assigned to more than one well",
                    well.aliquot_id
                ));
            }
        }

        let reasons: Vec<_> = reasons.into_iter().unique().collect();
        if !reasons.is_empty() {
            return Err(error::Error::validation(reasons));
        }

        let plate_id = db.next_plate_id();
        db.plates.insert(
            plate_id.clone(),
            Plate {
                id: plate_id.clone(),
                name: self.name.clone(),
                created_at: utc_now(),
            },
        );

        let well_count = self.wells.len();
        for (new_well, sample_id) in self.wells.into_iter().zip(sample_ids) {
            let well_id = db.next_well_id();
            db.plate_wells.insert(
                well_id.clone(),
                PlateWell {
                    id: well_id,
                    plate_id: plate_id.clone(),
                    aliquot_id: new_well.aliquot_id,
                    well: new_well.well,
                    sentrix_barcode: new_well.sentrix_barcode,
                    sentrix_position: new_well.sentrix_position,
                    created_at: utc_now(),
                },
            );
            db.sample_mut(&sample_id)?.status = SampleStatus::Plated;
        }

        Ok(PlateSummary {
            id: plate_id,
            name: self.name,
            well_count,
        })
    }
}

impl FetchAll for PlateSummary {
    fn fetch_all(db: &Tables) -> Vec<Self> {
        db.plates
            .values()
            .map(|p| Self {
                id: p.id.clone(),
                name: p.name.clone(),
                well_count: db.wells_of_plate(&p.id).count(),
            })
            .collect()
    }
}
