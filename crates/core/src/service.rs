//! Patient record operations over the flat-file store.
//!
//! [`PatientService`] is the single object handlers operate through: it owns
//! the [`RecordStore`] and a writer lock. Every mutation is an unbroken
//! load–modify–save cycle under that lock, closing the lost-update window
//! two concurrent writers would otherwise race through. Reads take no lock;
//! a whole-file read is already a consistent snapshot.

use crate::error::{PatientError, PatientResult};
use crate::record::{NewPatient, RecordDraft, RecordPatch};
use crate::store::{Collection, RecordStore};
use serde_json::Value;
use std::cmp::Ordering;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Numeric record field a listing can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Height,
    Weight,
    Bmi,
}

impl SortKey {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SortKey::Height => "height",
            SortKey::Weight => "weight",
            SortKey::Bmi => "bmi",
        }
    }
}

impl FromStr for SortKey {
    type Err = PatientError;

    fn from_str(raw: &str) -> PatientResult<Self> {
        match raw {
            "height" => Ok(SortKey::Height),
            "weight" => Ok(SortKey::Weight),
            "bmi" => Ok(SortKey::Bmi),
            other => Err(PatientError::InvalidQuery(format!(
                "invalid sort field '{other}': select from height, weight, bmi"
            ))),
        }
    }
}

/// Direction of an ordered listing. Defaults to ascending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = PatientError;

    fn from_str(raw: &str) -> PatientResult<Self> {
        match raw {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(PatientError::InvalidQuery(format!(
                "invalid order '{other}': select between asc and desc"
            ))),
        }
    }
}

/// Record operations shared by all request handlers.
#[derive(Debug)]
pub struct PatientService {
    store: RecordStore,
    write_lock: Mutex<()>,
}

impl PatientService {
    pub fn new(store: RecordStore) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the full collection unmodified.
    pub fn view_all(&self) -> PatientResult<Collection> {
        self.store.load()
    }

    /// Returns the stored record for `id`.
    ///
    /// # Errors
    ///
    /// Returns `PatientError::NotFound` if `id` is absent.
    pub fn view_one(&self, id: &str) -> PatientResult<Value> {
        let collection = self.store.load()?;
        collection
            .get(id)
            .cloned()
            .ok_or_else(|| PatientError::NotFound(id.to_owned()))
    }

    /// Returns all records ordered by the chosen numeric field.
    ///
    /// The sort is stable: ties keep their insertion order. A record missing
    /// the field (or holding a non-numeric value) compares as 0.
    pub fn sorted(&self, sort_by: SortKey, order: SortOrder) -> PatientResult<Vec<Value>> {
        let collection = self.store.load()?;
        let mut records: Vec<Value> = collection.into_iter().map(|(_, record)| record).collect();
        records.sort_by(|a, b| {
            let ordering = sort_field(a, sort_by)
                .partial_cmp(&sort_field(b, sort_by))
                .unwrap_or(Ordering::Equal);
            match order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });
        Ok(records)
    }

    /// Validates and stores a new record, persisting the whole collection.
    ///
    /// # Errors
    ///
    /// Returns `PatientError::Validation` if a field invariant is violated,
    /// or `PatientError::AlreadyExists` if the id is already taken.
    pub fn create(&self, new: NewPatient) -> PatientResult<()> {
        let (id, draft) = new.into_parts();
        let record = draft.validate()?;

        let _guard = self.write_guard();
        let mut collection = self.store.load()?;
        if collection.contains_key(&id) {
            return Err(PatientError::AlreadyExists(id));
        }
        collection.insert(id, record.to_stored()?);
        self.store.save(&collection)
    }

    /// Applies a partial patch to an existing record.
    ///
    /// The stored fields are overlaid with the fields present in the patch,
    /// the merged result is re-validated as a whole (recomputing bmi and
    /// verdict from the merged height/weight), and the collection is
    /// persisted.
    ///
    /// # Errors
    ///
    /// Returns `PatientError::NotFound` if `id` is absent, or
    /// `PatientError::Validation` if the merged record violates a field
    /// invariant.
    pub fn update(&self, id: &str, patch: RecordPatch) -> PatientResult<()> {
        let _guard = self.write_guard();
        let mut collection = self.store.load()?;
        let mut value = collection
            .get(id)
            .cloned()
            .ok_or_else(|| PatientError::NotFound(id.to_owned()))?;

        if let Value::Object(fields) = &mut value {
            patch.apply_to(fields);
        }
        let merged: RecordDraft =
            serde_json::from_value(value).map_err(PatientError::Deserialization)?;
        let record = merged.validate()?;

        collection.insert(id.to_owned(), record.to_stored()?);
        self.store.save(&collection)
    }

    /// Removes the record for `id` and persists the collection.
    ///
    /// # Errors
    ///
    /// Returns `PatientError::NotFound` if `id` is absent.
    pub fn delete(&self, id: &str) -> PatientResult<()> {
        let _guard = self.write_guard();
        let mut collection = self.store.load()?;
        // shift_remove keeps the remaining records in their original order.
        if collection.shift_remove(id).is_none() {
            return Err(PatientError::NotFound(id.to_owned()));
        }
        self.store.save(&collection)
    }

    fn write_guard(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn sort_field(record: &Value, key: SortKey) -> f64 {
    record.get(key.as_str()).and_then(Value::as_f64).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Gender;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn new_patient(id: &str, height: f64, weight: f64) -> NewPatient {
        NewPatient {
            id: id.into(),
            name: "A".into(),
            city: "X".into(),
            age: 30,
            gender: Gender::Male,
            height,
            weight,
        }
    }

    fn service_with(contents: &str) -> (TempDir, PatientService) {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("patients.json");
        fs::write(&path, contents).unwrap();
        (temp, PatientService::new(RecordStore::new(path)))
    }

    #[test]
    fn create_then_view_round_trips_with_derived_fields() {
        let (_temp, service) = service_with("{}");
        service.create(new_patient("P001", 1.75, 70.0)).unwrap();

        let record = service.view_one("P001").unwrap();
        assert_eq!(record["name"], json!("A"));
        assert_eq!(record["city"], json!("X"));
        assert_eq!(record["age"], json!(30));
        assert_eq!(record["gender"], json!("male"));
        assert_eq!(record["bmi"], json!(22.86));
        assert_eq!(record["verdict"], json!("Normal"));
        assert!(record.get("id").is_none());
    }

    #[test]
    fn create_duplicate_id_fails_regardless_of_payload() {
        let (_temp, service) = service_with("{}");
        service.create(new_patient("P001", 1.75, 70.0)).unwrap();

        let err = service.create(new_patient("P001", 1.6, 50.0)).unwrap_err();
        assert!(matches!(err, PatientError::AlreadyExists(_)));
    }

    #[test]
    fn view_one_absent_id_fails() {
        let (_temp, service) = service_with("{}");
        assert!(matches!(
            service.view_one("P404"),
            Err(PatientError::NotFound(_))
        ));
    }

    #[test]
    fn repeated_views_are_identical_without_mutation() {
        let (_temp, service) = service_with("{}");
        service.create(new_patient("P001", 1.75, 70.0)).unwrap();
        service.create(new_patient("P002", 1.6, 80.0)).unwrap();

        assert_eq!(service.view_all().unwrap(), service.view_all().unwrap());
        assert_eq!(
            service.sorted(SortKey::Bmi, SortOrder::Asc).unwrap(),
            service.sorted(SortKey::Bmi, SortOrder::Asc).unwrap()
        );
    }

    #[test]
    fn update_absent_id_fails() {
        let (_temp, service) = service_with("{}");
        let err = service
            .update("P404", RecordPatch::default())
            .unwrap_err();
        assert!(matches!(err, PatientError::NotFound(_)));
    }

    #[test]
    fn partial_update_keeps_unspecified_fields_and_recomputes() {
        let (_temp, service) = service_with("{}");
        service.create(new_patient("P001", 1.75, 70.0)).unwrap();

        service
            .update(
                "P001",
                RecordPatch {
                    weight: Some(95.0),
                    ..Default::default()
                },
            )
            .unwrap();

        let record = service.view_one("P001").unwrap();
        assert_eq!(record["name"], json!("A"));
        assert_eq!(record["height"], json!(1.75));
        assert_eq!(record["weight"], json!(95.0));
        assert_eq!(record["bmi"], json!(31.02));
        assert_eq!(record["verdict"], json!("Obese"));
    }

    #[test]
    fn update_without_height_or_weight_keeps_bmi() {
        let (_temp, service) = service_with("{}");
        service.create(new_patient("P001", 1.75, 70.0)).unwrap();

        service
            .update(
                "P001",
                RecordPatch {
                    city: Some("Y".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        let record = service.view_one("P001").unwrap();
        assert_eq!(record["city"], json!("Y"));
        assert_eq!(record["bmi"], json!(22.86));
        assert_eq!(record["verdict"], json!("Normal"));
    }

    #[test]
    fn update_rejects_invalid_merged_record() {
        let (_temp, service) = service_with("{}");
        service.create(new_patient("P001", 1.75, 70.0)).unwrap();

        let err = service
            .update(
                "P001",
                RecordPatch {
                    height: Some(-1.0),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(
            err,
            PatientError::Validation { field: "height", .. }
        ));

        // the failed update must not have touched the stored record
        let record = service.view_one("P001").unwrap();
        assert_eq!(record["height"], json!(1.75));
    }

    #[test]
    fn delete_then_view_one_fails() {
        let (_temp, service) = service_with("{}");
        service.create(new_patient("P001", 1.75, 70.0)).unwrap();

        service.delete("P001").unwrap();
        assert!(matches!(
            service.view_one("P001"),
            Err(PatientError::NotFound(_))
        ));
        assert!(matches!(
            service.delete("P001"),
            Err(PatientError::NotFound(_))
        ));
    }

    #[test]
    fn delete_preserves_order_of_remaining_records() {
        let (_temp, service) = service_with("{}");
        for id in ["P001", "P002", "P003"] {
            service.create(new_patient(id, 1.75, 70.0)).unwrap();
        }

        service.delete("P002").unwrap();
        let ids: Vec<String> = service.view_all().unwrap().keys().cloned().collect();
        assert_eq!(ids, ["P001", "P003"]);
    }

    #[test]
    fn sorted_orders_by_field_in_both_directions() {
        let (_temp, service) = service_with("{}");
        service.create(new_patient("P001", 1.75, 70.0)).unwrap(); // bmi 22.86
        service.create(new_patient("P002", 1.6, 80.0)).unwrap(); // bmi 31.25
        service.create(new_patient("P003", 1.9, 55.0)).unwrap(); // bmi 15.24

        let asc = service.sorted(SortKey::Bmi, SortOrder::Asc).unwrap();
        let bmis: Vec<f64> = asc.iter().map(|r| r["bmi"].as_f64().unwrap()).collect();
        assert_eq!(bmis, [15.24, 22.86, 31.25]);

        let desc = service.sorted(SortKey::Bmi, SortOrder::Desc).unwrap();
        let bmis: Vec<f64> = desc.iter().map(|r| r["bmi"].as_f64().unwrap()).collect();
        assert_eq!(bmis, [31.25, 22.86, 15.24]);
    }

    #[test]
    fn sorted_ties_keep_insertion_order() {
        let (_temp, service) = service_with("{}");
        for (id, name) in [("P002", "B"), ("P001", "A"), ("P003", "C")] {
            let mut patient = new_patient(id, 1.75, 70.0);
            patient.name = name.into();
            service.create(patient).unwrap();
        }

        for order in [SortOrder::Asc, SortOrder::Desc] {
            let sorted = service.sorted(SortKey::Weight, order).unwrap();
            let names: Vec<&str> = sorted.iter().map(|r| r["name"].as_str().unwrap()).collect();
            assert_eq!(names, ["B", "A", "C"]);
        }
    }

    #[test]
    fn sorted_defaults_missing_field_to_zero() {
        let (_temp, service) = service_with(
            r#"{"P001": {"name": "A", "height": 1.75}, "P002": {"name": "B"}}"#,
        );

        let sorted = service.sorted(SortKey::Height, SortOrder::Asc).unwrap();
        let names: Vec<&str> = sorted.iter().map(|r| r["name"].as_str().unwrap()).collect();
        assert_eq!(names, ["B", "A"]);
    }

    #[test]
    fn sort_key_and_order_parse_from_query_values() {
        assert_eq!("bmi".parse::<SortKey>().unwrap(), SortKey::Bmi);
        assert_eq!("desc".parse::<SortOrder>().unwrap(), SortOrder::Desc);
        assert!(matches!(
            "name".parse::<SortKey>(),
            Err(PatientError::InvalidQuery(_))
        ));
        assert!(matches!(
            "up".parse::<SortOrder>(),
            Err(PatientError::InvalidQuery(_))
        ));
    }
}
