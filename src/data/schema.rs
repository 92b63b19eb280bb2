//! Canonical cycling-table schema and the validator that gates every table.

use std::sync::{Arc, OnceLock};

use arrow::array::StringArray;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;

use super::error::{DataError, Result};
use super::model::Mode;

/// The eight canonical columns, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Datetime,
    TimeSec,
    PotentialV,
    CapacityMah,
    CapacityMahPerG,
    Cycle,
    Step,
    Mode,
}

impl Column {
    pub const ALL: [Column; 8] = [
        Column::Datetime,
        Column::TimeSec,
        Column::PotentialV,
        Column::CapacityMah,
        Column::CapacityMahPerG,
        Column::Cycle,
        Column::Step,
        Column::Mode,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Column::Datetime => "datetime",
            Column::TimeSec => "time_sec",
            Column::PotentialV => "potential_v",
            Column::CapacityMah => "capacity_mah",
            Column::CapacityMahPerG => "capacity_mah_per_g",
            Column::Cycle => "cycle",
            Column::Step => "step",
            Column::Mode => "mode",
        }
    }

    /// Position in the canonical schema.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn data_type(self) -> DataType {
        match self {
            Column::Datetime => DataType::Timestamp(TimeUnit::Millisecond, None),
            Column::TimeSec
            | Column::PotentialV
            | Column::CapacityMah
            | Column::CapacityMahPerG => DataType::Float64,
            Column::Cycle | Column::Step => DataType::Int32,
            Column::Mode => DataType::Utf8,
        }
    }

    pub fn nullable(self) -> bool {
        matches!(
            self,
            Column::Datetime | Column::CapacityMah | Column::CapacityMahPerG
        )
    }
}

/// The canonical Arrow schema shared by every table.
pub fn canonical_schema() -> SchemaRef {
    static SCHEMA: OnceLock<SchemaRef> = OnceLock::new();
    SCHEMA
        .get_or_init(|| {
            Arc::new(Schema::new(
                Column::ALL
                    .iter()
                    .map(|c| Field::new(c.name(), c.data_type(), c.nullable()))
                    .collect::<Vec<_>>(),
            ))
        })
        .clone()
}

/// Check that every canonical column is present with its expected type.
///
/// Columns are checked in declaration order and the first violation is
/// reported. Extra columns are allowed.
pub fn validate(schema: &Schema) -> Result<()> {
    for column in Column::ALL {
        let name = column.name();
        let Some((_, field)) = schema.column_with_name(name) else {
            return Err(DataError::validation(format!(
                "{name} is not in the table columns"
            )));
        };
        let expected = column.data_type();
        if field.data_type() != &expected {
            return Err(DataError::validation(format!(
                "Invalid data type for {name}. Expected {expected}, but found {}.",
                field.data_type()
            )));
        }
    }
    Ok(())
}

/// Check that non-nullable columns hold no nulls.
///
/// `batch` must already be in canonical column order.
pub fn validate_nulls(batch: &RecordBatch) -> Result<()> {
    for column in Column::ALL {
        if column.nullable() {
            continue;
        }
        let nulls = batch.column(column.index()).null_count();
        if nulls > 0 {
            return Err(DataError::validation(format!(
                "{} must not contain nulls, but found {nulls}",
                column.name()
            )));
        }
    }
    Ok(())
}

/// Check that the `mode` column only holds canonical mode names.
pub fn validate_modes(modes: &StringArray) -> Result<Vec<Mode>> {
    modes
        .iter()
        .enumerate()
        .map(|(row, value)| match value {
            Some("Rest") => Ok(Mode::Rest),
            Some("Charge") => Ok(Mode::Charge),
            Some("Discharge") => Ok(Mode::Discharge),
            Some(other) => Err(DataError::validation(format!(
                "row {row}: mode '{other}' is not one of Rest, Charge, Discharge"
            ))),
            None => Err(DataError::validation(format!("row {row}: mode is null"))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema_without(skip: Column) -> Schema {
        Schema::new(
            Column::ALL
                .iter()
                .filter(|&&c| c != skip)
                .map(|c| Field::new(c.name(), c.data_type(), true))
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn test_canonical_schema_is_valid() {
        assert!(validate(&canonical_schema()).is_ok());
    }

    #[test]
    fn test_column_indices_follow_declaration_order() {
        let schema = canonical_schema();
        for column in Column::ALL {
            assert_eq!(schema.index_of(column.name()).unwrap(), column.index());
        }
    }

    #[test]
    fn test_every_missing_column_is_named() {
        for column in Column::ALL {
            let err = validate(&schema_without(column)).unwrap_err();
            assert!(err.is_format_mismatch());
            assert!(
                err.to_string().contains(column.name()),
                "{err} should mention {}",
                column.name()
            );
        }
    }

    #[test]
    fn test_first_violation_wins() {
        // Both cycle (wrong type) and mode (missing) are broken; cycle comes first.
        let fields: Vec<Field> = Column::ALL
            .iter()
            .filter(|&&c| c != Column::Mode)
            .map(|&c| {
                let dt = if c == Column::Cycle {
                    DataType::Int64
                } else {
                    c.data_type()
                };
                Field::new(c.name(), dt, true)
            })
            .collect();
        let err = validate(&Schema::new(fields)).unwrap_err().to_string();
        assert!(err.contains("Invalid data type for cycle"), "{err}");
        assert!(err.contains("Expected Int32, but found Int64"), "{err}");
    }

    #[test]
    fn test_timezone_aware_datetime_is_rejected() {
        let fields: Vec<Field> = Column::ALL
            .iter()
            .map(|&c| {
                let dt = if c == Column::Datetime {
                    DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into()))
                } else {
                    c.data_type()
                };
                Field::new(c.name(), dt, true)
            })
            .collect();
        assert!(validate(&Schema::new(fields)).is_err());
    }

    #[test]
    fn test_extra_columns_are_allowed() {
        let mut fields: Vec<Field> = canonical_schema()
            .fields()
            .iter()
            .map(|f| f.as_ref().clone())
            .collect();
        fields.insert(0, Field::new("current_ma", DataType::Float64, true));
        assert!(validate(&Schema::new(fields)).is_ok());
    }

    /// Canonical batch with one null in `target` and valid values elsewhere.
    fn batch_with_null_in(target: Column) -> RecordBatch {
        use arrow::array::{
            ArrayRef, Float64Array, Int32Array, TimestampMillisecondArray,
        };

        let columns: Vec<ArrayRef> = Column::ALL
            .iter()
            .map(|&c| -> ArrayRef {
                let hole = c == target;
                match c {
                    Column::Datetime => Arc::new(TimestampMillisecondArray::from(vec![None, Some(0)])),
                    Column::TimeSec | Column::PotentialV | Column::CapacityMah | Column::CapacityMahPerG => {
                        Arc::new(Float64Array::from(vec![if hole { None } else { Some(1.0) }, Some(2.0)]))
                    }
                    Column::Cycle | Column::Step => {
                        Arc::new(Int32Array::from(vec![if hole { None } else { Some(1) }, Some(1)]))
                    }
                    Column::Mode => Arc::new(StringArray::from(vec!["Charge", "Charge"])),
                }
            })
            .collect();
        let fields: Vec<Field> = Column::ALL
            .iter()
            .map(|c| Field::new(c.name(), c.data_type(), true))
            .collect();
        RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).unwrap()
    }

    #[test]
    fn test_nulls_in_required_columns_are_rejected() {
        for column in [Column::TimeSec, Column::PotentialV, Column::Cycle, Column::Step] {
            let err = validate_nulls(&batch_with_null_in(column)).unwrap_err();
            assert!(err.is_format_mismatch());
            assert!(
                err.to_string().contains(&format!("{} must not contain nulls", column.name())),
                "{err}"
            );
        }
    }

    #[test]
    fn test_nulls_in_optional_columns_are_allowed() {
        for column in [Column::Datetime, Column::CapacityMah, Column::CapacityMahPerG] {
            assert!(validate_nulls(&batch_with_null_in(column)).is_ok());
        }
    }

    #[test]
    fn test_mode_values_are_checked() {
        let ok = StringArray::from(vec!["Rest", "Charge", "Discharge"]);
        assert_eq!(
            validate_modes(&ok).unwrap(),
            vec![Mode::Rest, Mode::Charge, Mode::Discharge]
        );
        let bad = StringArray::from(vec![Some("Charge"), Some("充電")]);
        assert!(validate_modes(&bad).is_err());
        let null = StringArray::from(vec![Some("Charge"), None]);
        assert!(validate_modes(&null).is_err());
    }
}
