//! The in-memory event table.
//!
//! One row per event, one column per configured feature, plus the raw and
//! adjusted event weights, the source process name, and the binary
//! signal/background label. Built fresh per run and discarded afterwards.

use crate::error::{DataError, Result};

/// Row-aligned columnar event data.
#[derive(Debug, Clone)]
pub struct EventTable {
    /// Feature column names, fixed at construction.
    pub features: Vec<String>,
    /// One column per feature, all of equal length.
    pub columns: Vec<Vec<f64>>,
    /// Raw event weights as stored in the source trees.
    pub weight: Vec<f64>,
    /// Weights after negative-weight treatment and balancing.
    pub mva_weight: Vec<f64>,
    /// Source process name per row.
    pub process: Vec<String>,
    /// 1 for signal rows, 0 for background.
    pub label: Vec<u8>,
}

impl EventTable {
    /// An empty table with the given feature schema.
    pub fn new(features: Vec<String>) -> Self {
        let columns = vec![Vec::new(); features.len()];
        Self {
            features,
            columns,
            weight: Vec::new(),
            mva_weight: Vec::new(),
            process: Vec::new(),
            label: Vec::new(),
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.weight.len()
    }

    /// True when the table holds no rows.
    pub fn is_empty(&self) -> bool {
        self.weight.is_empty()
    }

    /// The column for a named feature.
    pub fn feature_column(&self, name: &str) -> Option<&[f64]> {
        self.features
            .iter()
            .position(|f| f == name)
            .map(|i| self.columns[i].as_slice())
    }

    /// Append all rows of `other`. Schemas must match.
    pub fn append(&mut self, mut other: EventTable) -> Result<()> {
        if self.features != other.features {
            return Err(DataError::Input(format!(
                "cannot concatenate tables with schemas {:?} and {:?}",
                self.features, other.features
            )));
        }
        for (dst, src) in self.columns.iter_mut().zip(other.columns.iter_mut()) {
            dst.append(src);
        }
        self.weight.append(&mut other.weight);
        self.mva_weight.append(&mut other.mva_weight);
        self.process.append(&mut other.process);
        self.label.append(&mut other.label);
        debug_assert!(self.columns.iter().all(|c| c.len() == self.weight.len()));
        Ok(())
    }

    /// A new table holding the rows at `indices`, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> EventTable {
        let pick = |col: &Vec<f64>| indices.iter().map(|&i| col[i]).collect::<Vec<_>>();
        EventTable {
            features: self.features.clone(),
            columns: self.columns.iter().map(pick).collect(),
            weight: pick(&self.weight),
            mva_weight: pick(&self.mva_weight),
            process: indices.iter().map(|&i| self.process[i].clone()).collect(),
            label: indices.iter().map(|&i| self.label[i]).collect(),
        }
    }

    /// Rows whose label is 1.
    pub fn signal_rows(&self) -> Vec<usize> {
        (0..self.len()).filter(|&i| self.label[i] == 1).collect()
    }

    /// Rows whose label is 0.
    pub fn background_rows(&self) -> Vec<usize> {
        (0..self.len()).filter(|&i| self.label[i] == 0).collect()
    }
}
