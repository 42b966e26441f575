//! Rules-based reference answers ("Todd's rules") per NDC and SetID.

use std::collections::{BTreeSet, HashMap};

use crate::config::Level;
use crate::error::ReconError;
use crate::model::IngredientId;
use crate::table::CsvTable;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Package {
    ndc11: String,
    raw_ndc: String,
    set_id: String,
}

/// The label a raw NDC belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NdcResolution {
    pub set_id: String,
    pub ndc11: String,
    /// Every raw NDC under the same SetID, table order.
    pub raw_ndcs: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct GroundTruth {
    packages: Vec<Package>,
    ids_by_ndc11: HashMap<String, Vec<IngredientId>>,
}

impl GroundTruth {
    /// Load the NDC -> SPL table (`NDC11`, `RawNDC`, `SetID`) and the
    /// NDC -> reported-inactive table (`NDC11`, `ReportedInactiveID`).
    pub fn from_csv(ndc_spl_csv: &str, ndc_ri_csv: &str) -> Result<Self, ReconError> {
        let spl = CsvTable::parse("ndc_spl", ndc_spl_csv)?;
        let ndc11_idx = spl.column("NDC11")?;
        let raw_idx = spl.column("RawNDC")?;
        let set_idx = spl.column("SetID")?;

        let packages = spl
            .rows()
            .map(|row| Package {
                ndc11: row.text(ndc11_idx).to_string(),
                raw_ndc: row.text(raw_idx).to_string(),
                set_id: row.text(set_idx).to_string(),
            })
            .collect();

        let ri = CsvTable::parse("ndc_ri", ndc_ri_csv)?;
        let ri_ndc_idx = ri.column("NDC11")?;
        let ri_id_idx = ri.column("ReportedInactiveID")?;

        let mut ids_by_ndc11: HashMap<String, Vec<IngredientId>> = HashMap::new();
        for row in ri.rows() {
            let id: IngredientId = row.parse(ri_id_idx)?;
            ids_by_ndc11
                .entry(row.text(ri_ndc_idx).to_string())
                .or_default()
                .push(id);
        }

        Ok(Self {
            packages,
            ids_by_ndc11,
        })
    }

    /// SetID, NDC11 and sibling raw NDCs of a raw NDC. First row wins.
    pub fn resolve_ndc(&self, raw_ndc: &str) -> Option<NdcResolution> {
        let package = self.packages.iter().find(|p| p.raw_ndc == raw_ndc)?;
        let raw_ndcs = self
            .packages
            .iter()
            .filter(|p| p.set_id == package.set_id)
            .map(|p| p.raw_ndc.clone())
            .collect();
        Some(NdcResolution {
            set_id: package.set_id.clone(),
            ndc11: package.ndc11.clone(),
            raw_ndcs,
        })
    }

    /// Reference identifiers for a search, restricted to `valid_ids`.
    ///
    /// At SetID level every NDC11 of the label counts and `search` is the
    /// SetID; at NDC level only `ndc11` counts.
    pub fn expected_ids(
        &self,
        search: &str,
        level: Level,
        ndc11: &str,
        valid_ids: &BTreeSet<IngredientId>,
    ) -> BTreeSet<IngredientId> {
        let ndc_list: Vec<&str> = match level {
            Level::SetId => self
                .packages
                .iter()
                .filter(|p| p.set_id == search)
                .map(|p| p.ndc11.as_str())
                .collect(),
            Level::Ndc => vec![ndc11],
        };

        ndc_list
            .iter()
            .filter_map(|ndc| self.ids_by_ndc11.get(*ndc))
            .flatten()
            .copied()
            .filter(|id| valid_ids.contains(id))
            .collect()
    }
}
