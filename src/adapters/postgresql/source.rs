//! MIMIC-III data source
//!
//! Reads the relational MIMIC-III schema into [`PatientRecord`] graphs. Every
//! numeric key is cast to `bigint` in SQL so the decoding side does not depend
//! on the column widths of a particular MIMIC build.

use super::client::PostgreSQLClient;
use crate::adapters::source::ClinicalDataSource;
use crate::domain::errors::SourceError;
use crate::domain::ids::{CaregiverId, PatientId, WardId};
use crate::domain::records::{
    AdmissionRecord, CaregiverRecord, ChartEventRecord, DiagnosisRecord, LabEventRecord,
    NoteEventRecord, PatientRecord, PrescriptionRecord, ProcedureRecord, TransferRecord,
    WardRecord,
};
use crate::domain::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::collections::HashMap;
use tokio_postgres::types::FromSql;
use tokio_postgres::Row;

/// SQL text with the schema name already substituted
#[derive(Debug, Clone)]
struct Queries {
    patient_ids: String,
    patient: String,
    admissions: String,
    diagnoses: String,
    procedures: String,
    prescriptions: String,
    chart_events: String,
    lab_events: String,
    note_events: String,
    transfers: String,
    caregivers: String,
    wards: String,
}

impl Queries {
    fn for_schema(s: &str) -> Self {
        Self {
            patient_ids: format!("SELECT row_id::bigint AS row_id FROM {s}.patients ORDER BY row_id"),
            patient: format!(
                "SELECT row_id::bigint AS row_id, subject_id::bigint AS subject_id, gender, dob, dod \
                 FROM {s}.patients WHERE row_id = $1"
            ),
            admissions: format!(
                "SELECT hadm_id::bigint AS hadm_id, admittime, dischtime, admission_type, \
                 admission_location, discharge_location, marital_status, language \
                 FROM {s}.admissions WHERE subject_id = $1 ORDER BY admittime"
            ),
            diagnoses: format!(
                "SELECT d.seq_num::bigint AS seq_num, d.icd9_code, t.short_title, t.long_title \
                 FROM {s}.diagnoses_icd d \
                 LEFT JOIN {s}.d_icd_diagnoses t ON t.icd9_code = d.icd9_code \
                 WHERE d.hadm_id = $1 AND d.icd9_code IS NOT NULL ORDER BY d.seq_num"
            ),
            procedures: format!(
                "SELECT p.seq_num::bigint AS seq_num, p.icd9_code, t.short_title, t.long_title \
                 FROM {s}.procedures_icd p \
                 LEFT JOIN {s}.d_icd_procedures t ON t.icd9_code = p.icd9_code \
                 WHERE p.hadm_id = $1 ORDER BY p.seq_num"
            ),
            prescriptions: format!(
                "SELECT startdate, enddate, drug, drug_name_generic, formulary_drug_cd, ndc, \
                 prod_strength, dose_val_rx, dose_unit_rx, route \
                 FROM {s}.prescriptions WHERE hadm_id = $1 ORDER BY row_id"
            ),
            chart_events: format!(
                "SELECT c.itemid::bigint AS itemid, i.label, c.charttime, c.value, \
                 c.valuenum::float8 AS valuenum, c.valueuom, c.cgid::bigint AS cgid, \
                 c.error::bigint AS error \
                 FROM {s}.chartevents c JOIN {s}.d_items i ON i.itemid = c.itemid \
                 WHERE c.hadm_id = $1 AND c.charttime IS NOT NULL ORDER BY c.charttime"
            ),
            lab_events: format!(
                "SELECT l.itemid::bigint AS itemid, i.label, i.fluid, i.loinc_code, l.charttime, \
                 l.value, l.valuenum::float8 AS valuenum, l.valueuom, l.flag \
                 FROM {s}.labevents l JOIN {s}.d_labitems i ON i.itemid = l.itemid \
                 WHERE l.hadm_id = $1 AND l.charttime IS NOT NULL ORDER BY l.charttime"
            ),
            note_events: format!(
                "SELECT chartdate, category, description, cgid::bigint AS cgid, text, iserror \
                 FROM {s}.noteevents WHERE hadm_id = $1 ORDER BY chartdate, row_id"
            ),
            transfers: format!(
                "SELECT eventtype, curr_careunit, curr_wardid::bigint AS curr_wardid, intime, outtime \
                 FROM {s}.transfers WHERE hadm_id = $1 ORDER BY intime"
            ),
            caregivers: format!(
                "SELECT cgid::bigint AS cgid, label, description FROM {s}.caregivers ORDER BY cgid"
            ),
            wards: format!(
                "SELECT DISTINCT ON (curr_wardid) curr_wardid::bigint AS curr_wardid, curr_careunit \
                 FROM {s}.transfers WHERE curr_wardid IS NOT NULL ORDER BY curr_wardid, intime"
            ),
        }
    }
}

/// [`ClinicalDataSource`] over a MIMIC-III PostgreSQL database
pub struct PostgresSource {
    client: PostgreSQLClient,
    queries: Queries,
}

impl PostgresSource {
    pub fn new(client: PostgreSQLClient) -> Self {
        let queries = Queries::for_schema(client.schema());
        Self { client, queries }
    }

    async fn load_admission(&self, row: &Row) -> Result<AdmissionRecord> {
        let mut admission = admission_from_row(row)?;
        let hadm_id = admission.hadm_id;

        let (diagnoses, procedures, prescriptions, chart_events, lab_events, note_events, transfers) =
            futures::try_join!(
                self.rows(&self.queries.diagnoses, hadm_id, diagnosis_from_row),
                self.rows(&self.queries.procedures, hadm_id, procedure_from_row),
                self.rows(&self.queries.prescriptions, hadm_id, prescription_from_row),
                self.rows(&self.queries.chart_events, hadm_id, chart_event_from_row),
                self.rows(&self.queries.lab_events, hadm_id, lab_event_from_row),
                self.rows(&self.queries.note_events, hadm_id, note_event_from_row),
                self.rows(&self.queries.transfers, hadm_id, transfer_from_row),
            )?;

        admission.diagnoses = diagnoses;
        admission.procedures = procedures;
        admission.prescriptions = prescriptions;
        admission.chart_events = chart_events;
        admission.lab_events = lab_events;
        admission.note_events = note_events;
        admission.transfers = transfers;
        Ok(admission)
    }

    /// Run a child-table query for one admission and decode every row
    async fn rows<T>(
        &self,
        query: &str,
        hadm_id: i64,
        decode: fn(&Row) -> Result<T>,
    ) -> Result<Vec<T>> {
        let hadm_id = narrow(hadm_id, "admissions", "hadm_id")?;
        let rows = self.client.query(query, &[&hadm_id]).await?;
        rows.iter().map(decode).collect()
    }
}

#[async_trait]
impl ClinicalDataSource for PostgresSource {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    async fn test_connection(&self) -> Result<()> {
        self.client.test_connection().await
    }

    async fn list_patient_ids(&self) -> Result<Vec<PatientId>> {
        let rows = self.client.query(&self.queries.patient_ids, &[]).await?;
        rows.iter()
            .map(|row| -> Result<PatientId> {
                let raw: i64 = column(row, "patients", "row_id")?;
                PatientId::new(raw).map_err(|e| invalid_row("patients", e))
            })
            .collect()
    }

    async fn load_patient(&self, id: PatientId) -> Result<Option<PatientRecord>> {
        let row_id = narrow(id.value(), "patients", "row_id")?;
        let rows = self.client.query(&self.queries.patient, &[&row_id]).await?;
        let Some(row) = rows.first() else {
            return Ok(None);
        };

        let mut patient = patient_from_row(row)?;
        let subject_id = narrow(patient.subject_id, "patients", "subject_id")?;

        let admission_rows = self
            .client
            .query(&self.queries.admissions, &[&subject_id])
            .await?;
        for admission_row in &admission_rows {
            patient
                .admissions
                .push(self.load_admission(admission_row).await?);
        }

        tracing::trace!(
            patient_id = %id,
            admissions = patient.admissions.len(),
            "Loaded patient record"
        );
        Ok(Some(patient))
    }

    async fn preload_caregivers(&self) -> Result<HashMap<CaregiverId, CaregiverRecord>> {
        let rows = self.client.query(&self.queries.caregivers, &[]).await?;
        let mut caregivers = HashMap::with_capacity(rows.len());
        for row in &rows {
            let raw: i64 = column(row, "caregivers", "cgid")?;
            let Some(id) = CaregiverId::new(raw) else {
                continue;
            };
            caregivers.insert(
                id,
                CaregiverRecord {
                    id,
                    label: column(row, "caregivers", "label")?,
                    description: column(row, "caregivers", "description")?,
                },
            );
        }
        Ok(caregivers)
    }

    async fn preload_wards(&self) -> Result<HashMap<WardId, WardRecord>> {
        let rows = self.client.query(&self.queries.wards, &[]).await?;
        rows.iter()
            .map(|row| -> Result<(WardId, WardRecord)> {
                let id = WardId::new(column(row, "transfers", "curr_wardid")?);
                let careunit = column(row, "transfers", "curr_careunit")?;
                Ok((id, WardRecord { id, careunit }))
            })
            .collect()
    }
}

fn invalid_row(table: &str, message: impl Into<String>) -> crate::domain::MedBundleError {
    SourceError::InvalidRow {
        table: table.to_string(),
        message: message.into(),
    }
    .into()
}

fn column<'a, T: FromSql<'a>>(row: &'a Row, table: &str, name: &str) -> Result<T> {
    row.try_get(name)
        .map_err(|e| invalid_row(table, format!("column {name}: {e}")))
}

/// MIMIC keys are `integer` columns; parameters must match that width
fn narrow(value: i64, table: &str, name: &str) -> Result<i32> {
    i32::try_from(value).map_err(|_| invalid_row(table, format!("{name} {value} out of range")))
}

fn seq_num(row: &Row, table: &str) -> Result<Option<u32>> {
    let raw: Option<i64> = column(row, table, "seq_num")?;
    Ok(raw.and_then(|n| u32::try_from(n).ok()))
}

fn is_error_flag(raw: Option<i64>) -> bool {
    raw == Some(1)
}

fn is_error_marker(raw: Option<&str>) -> bool {
    raw.map(str::trim) == Some("1")
}

fn patient_from_row(row: &Row) -> Result<PatientRecord> {
    const T: &str = "patients";
    let row_id: i64 = column(row, T, "row_id")?;
    let dob: Option<NaiveDateTime> = column(row, T, "dob")?;
    Ok(PatientRecord {
        row_id: PatientId::new(row_id).map_err(|e| invalid_row(T, e))?,
        subject_id: column(row, T, "subject_id")?,
        gender: column::<Option<String>>(row, T, "gender")?.unwrap_or_default(),
        birth_date: dob.map(|d| d.date()),
        death_date: column(row, T, "dod")?,
        admissions: Vec::new(),
    })
}

fn admission_from_row(row: &Row) -> Result<AdmissionRecord> {
    const T: &str = "admissions";
    Ok(AdmissionRecord {
        hadm_id: column(row, T, "hadm_id")?,
        admit_time: column(row, T, "admittime")?,
        discharge_time: column(row, T, "dischtime")?,
        admission_type: column::<Option<String>>(row, T, "admission_type")?.unwrap_or_default(),
        admission_location: column(row, T, "admission_location")?,
        discharge_location: column(row, T, "discharge_location")?,
        marital_status: column(row, T, "marital_status")?,
        language: column(row, T, "language")?,
        ..Default::default()
    })
}

fn diagnosis_from_row(row: &Row) -> Result<DiagnosisRecord> {
    const T: &str = "diagnoses_icd";
    Ok(DiagnosisRecord {
        seq_num: seq_num(row, T)?,
        icd9_code: column(row, T, "icd9_code")?,
        short_title: column(row, T, "short_title")?,
        long_title: column(row, T, "long_title")?,
    })
}

fn procedure_from_row(row: &Row) -> Result<ProcedureRecord> {
    const T: &str = "procedures_icd";
    Ok(ProcedureRecord {
        seq_num: seq_num(row, T)?,
        icd9_code: column(row, T, "icd9_code")?,
        short_title: column(row, T, "short_title")?,
        long_title: column(row, T, "long_title")?,
    })
}

fn prescription_from_row(row: &Row) -> Result<PrescriptionRecord> {
    const T: &str = "prescriptions";
    Ok(PrescriptionRecord {
        start_date: column(row, T, "startdate")?,
        end_date: column(row, T, "enddate")?,
        drug: column::<Option<String>>(row, T, "drug")?.unwrap_or_default(),
        drug_name_generic: column(row, T, "drug_name_generic")?,
        formulary_drug_cd: column(row, T, "formulary_drug_cd")?,
        ndc: column(row, T, "ndc")?,
        prod_strength: column(row, T, "prod_strength")?,
        dose_value: column(row, T, "dose_val_rx")?,
        dose_unit: column(row, T, "dose_unit_rx")?,
        route: column(row, T, "route")?,
    })
}

fn chart_event_from_row(row: &Row) -> Result<ChartEventRecord> {
    const T: &str = "chartevents";
    let cgid: Option<i64> = column(row, T, "cgid")?;
    Ok(ChartEventRecord {
        item_id: column(row, T, "itemid")?,
        label: column::<Option<String>>(row, T, "label")?.unwrap_or_default(),
        chart_time: column(row, T, "charttime")?,
        value: column(row, T, "value")?,
        value_num: column(row, T, "valuenum")?,
        value_unit: column(row, T, "valueuom")?,
        caregiver_id: cgid.and_then(CaregiverId::new),
        error: is_error_flag(column(row, T, "error")?),
    })
}

fn lab_event_from_row(row: &Row) -> Result<LabEventRecord> {
    const T: &str = "labevents";
    Ok(LabEventRecord {
        item_id: column(row, T, "itemid")?,
        label: column::<Option<String>>(row, T, "label")?.unwrap_or_default(),
        fluid: column(row, T, "fluid")?,
        loinc_code: column(row, T, "loinc_code")?,
        chart_time: column(row, T, "charttime")?,
        value: column(row, T, "value")?,
        value_num: column(row, T, "valuenum")?,
        value_unit: column(row, T, "valueuom")?,
        flag: column(row, T, "flag")?,
    })
}

fn note_event_from_row(row: &Row) -> Result<NoteEventRecord> {
    const T: &str = "noteevents";
    let cgid: Option<i64> = column(row, T, "cgid")?;
    let iserror: Option<String> = column(row, T, "iserror")?;
    Ok(NoteEventRecord {
        chart_date: column(row, T, "chartdate")?,
        category: column::<Option<String>>(row, T, "category")?.unwrap_or_default(),
        description: column::<Option<String>>(row, T, "description")?.unwrap_or_default(),
        caregiver_id: cgid.and_then(CaregiverId::new),
        text: column::<Option<String>>(row, T, "text")?.unwrap_or_default(),
        has_error: is_error_marker(iserror.as_deref()),
    })
}

fn transfer_from_row(row: &Row) -> Result<TransferRecord> {
    const T: &str = "transfers";
    let ward: Option<i64> = column(row, T, "curr_wardid")?;
    Ok(TransferRecord {
        event_type: column(row, T, "eventtype")?,
        careunit: column(row, T, "curr_careunit")?,
        ward_id: ward.map(WardId::new),
        in_time: column(row, T, "intime")?,
        out_time: column(row, T, "outtime")?,
    })
}
