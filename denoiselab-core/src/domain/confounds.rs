//! Raw confound tables — per-timepoint nuisance signals as named columns.
//!
//! A `RawConfoundTable` is immutable once constructed: one f64 column per
//! named nuisance signal, all columns the same length. Canonical column
//! names follow the preprocessing pipeline's confound file convention.

use std::collections::HashMap;

use thiserror::Error;

/// Canonical confound column names.
pub mod columns {
    /// The six rigid-body motion parameters, in their fixed order.
    pub const MOTION: [&str; 6] = [
        "trans_x", "trans_y", "trans_z", "rot_x", "rot_y", "rot_z",
    ];

    pub const WHITE_MATTER: &str = "white_matter";
    pub const CSF: &str = "csf";
    pub const GLOBAL_SIGNAL: &str = "global_signal";
    pub const FRAMEWISE_DISPLACEMENT: &str = "framewise_displacement";
    pub const STD_DVARS: &str = "std_dvars";

    /// Number of anatomical noise components retained (top 5 per CSF/WM mask).
    pub const N_ACOMPCOR: usize = 10;

    /// The anatomical noise-component column names, `a_comp_cor_00..09`.
    pub fn acompcor() -> Vec<String> {
        (0..N_ACOMPCOR).map(|i| format!("a_comp_cor_{i:02}")).collect()
    }
}

/// Errors from confound-table construction.
#[derive(Debug, Error)]
pub enum ConfoundTableError {
    #[error("confound table has no timepoints")]
    Empty,

    #[error("column '{column}' has {len} timepoints, expected {expected}")]
    UnequalLength {
        column: String,
        len: usize,
        expected: usize,
    },

    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),
}

/// An immutable table of named per-timepoint nuisance signals.
#[derive(Debug, Clone, PartialEq)]
pub struct RawConfoundTable {
    names: Vec<String>,
    data: Vec<Vec<f64>>,
    index: HashMap<String, usize>,
    n_timepoints: usize,
}

impl RawConfoundTable {
    /// Build a table from ordered (name, values) pairs.
    ///
    /// All columns must have the same non-zero length and distinct names.
    pub fn new(columns: Vec<(String, Vec<f64>)>) -> Result<Self, ConfoundTableError> {
        let n_timepoints = columns
            .first()
            .map(|(_, v)| v.len())
            .ok_or(ConfoundTableError::Empty)?;
        if n_timepoints == 0 {
            return Err(ConfoundTableError::Empty);
        }

        let mut names = Vec::with_capacity(columns.len());
        let mut data = Vec::with_capacity(columns.len());
        let mut index = HashMap::with_capacity(columns.len());

        for (name, values) in columns {
            if values.len() != n_timepoints {
                return Err(ConfoundTableError::UnequalLength {
                    column: name,
                    len: values.len(),
                    expected: n_timepoints,
                });
            }
            if index.insert(name.clone(), data.len()).is_some() {
                return Err(ConfoundTableError::DuplicateColumn(name));
            }
            names.push(name);
            data.push(values);
        }

        Ok(Self {
            names,
            data,
            index,
            n_timepoints,
        })
    }

    pub fn n_timepoints(&self) -> usize {
        self.n_timepoints
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Signal values for a column, if present.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.index.get(name).map(|&i| self.data[i].as_slice())
    }
}
