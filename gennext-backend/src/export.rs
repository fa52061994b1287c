//! Derived-data artifacts: the PRS package bundle and the plate sample sheet.
//!
//! The sample-sheet layout is consumed verbatim by the genotyping
//! instrument's software, so field names and section ordering are a fixed
//! external contract.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Local, Utc};

use crate::{
    db::{Tables, error},
    lifecycle::{QcFlag, SampleStatus},
};

/// One eligible sample in a PRS package; feeds both the samples and the
/// metrics table.
pub struct PrsSampleRow {
    pub sample_id: String,
    pub subject_pseudoid: String,
    pub status: SampleStatus,
    pub call_rate: f64,
    pub dish_qc: f64,
    pub heterozygosity: Option<f64>,
    pub sex_call: Option<String>,
    pub final_qc_flag: QcFlag,
}

pub struct PrsPackage {
    pub job_id: String,
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub total_samples: usize,
    pub rows: Vec<PrsSampleRow>,
}

/// Write `samples.tsv`, `metrics.tsv` and `manifest.md` under
/// `<output_dir>/<job_id>/` and return that directory.
pub fn write_prs_package(
    output_dir: &Utf8Path,
    package: &PrsPackage,
) -> error::Result<Utf8PathBuf> {
    let job_dir = output_dir.join(&package.job_id);
    fs::create_dir_all(&job_dir)?;

    let mut samples = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(job_dir.join("samples.tsv"))?;
    samples.write_record(["sample_id", "subject_pseudoid", "status", "final_qc_flag"])?;
    for row in &package.rows {
        samples.write_record([
            row.sample_id.as_str(),
            row.subject_pseudoid.as_str(),
            &row.status.to_string(),
            &row.final_qc_flag.to_string(),
        ])?;
    }
    samples.flush()?;

    let mut metrics = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(job_dir.join("metrics.tsv"))?;
    metrics.write_record([
        "sample_id",
        "call_rate",
        "dish_qc",
        "heterozygosity",
        "sex_call",
        "final_qc_flag",
    ])?;
    for row in &package.rows {
        metrics.write_record([
            row.sample_id.as_str(),
            &row.call_rate.to_string(),
            &row.dish_qc.to_string(),
            &row.heterozygosity.map_or_else(na, |h| h.to_string()),
            row.sex_call.as_deref().unwrap_or("NA"),
            &row.final_qc_flag.to_string(),
        ])?;
    }
    metrics.flush()?;

    fs::write(job_dir.join("manifest.md"), manifest(package))?;

    Ok(job_dir)
}

fn na() -> String {
    "NA".to_string()
}

fn manifest(package: &PrsPackage) -> String {
    let PrsPackage {
        job_id,
        run_id,
        created_at,
        total_samples,
        rows,
    } = package;

    let count_of = |flag: QcFlag| rows.iter().filter(|r| r.final_qc_flag == flag).count();

    format!(
        "# PRS Package Manifest\n\n\
         Job ID: {job_id}\n\
         Run ID: {run_id}\n\
         Created: {created}\n\
         Total Samples: {total_samples}\n\
         Eligible Samples (Pass/Warn): {eligible}\n\
         Pass: {pass}\n\
         Warn: {warn}\n",
        created = created_at.to_rfc3339(),
        eligible = rows.len(),
        pass = count_of(QcFlag::Pass),
        warn = count_of(QcFlag::Warn),
    )
}

/// Render the Illumina-style sample sheet for one plate, rows in
/// well-insertion order.
pub fn samplesheet(db: &Tables, plate_id: &str) -> error::Result<String> {
    let plate = db.plate(plate_id)?;

    let mut sheet = String::from("[Header]\n");
    sheet.push_str(&format!("Date,{}\n", Local::now().format("%m/%d/%Y")));
    sheet.push_str("Workflow,GenerateFASTQ\n");
    sheet.push_str("Application,FASTQ Only\n");
    sheet.push_str("Instrument Type,iScan\n");
    sheet.push_str("Assay,Infinium Global Screening Array-24 v3.0\n");
    sheet.push_str("Index Adapters,Illumina Infinium\n\n");
    sheet.push_str("[Manifests]\n");
    sheet.push_str("A,GSA-24v3-0_A1.bpm\n\n");
    sheet.push_str("[Data]\n");
    sheet.push_str("Sample_ID,SentrixBarcode_A,SentrixPosition_A,Sample_Plate,Sample_Well\n");

    for well in db.wells_of_plate(plate_id) {
        let sample_id = &db.aliquot(&well.aliquot_id)?.sample_id;
        sheet.push_str(&format!(
            "{sample_id},{},{},{},{}\n",
            well.sentrix_barcode, well.sentrix_position, plate.name, well.well
        ));
    }

    Ok(sheet)
}
