//! Unit catalog endpoint
//!
//! Returns every unit definition for the UI, keyed by code.

use axum::Json;
use hexlands_core::{UnitDefinition, UNIT_TYPES};
use std::collections::BTreeMap;

pub async fn get_units() -> Json<BTreeMap<&'static str, &'static UnitDefinition>> {
    Json(UNIT_TYPES.iter().map(|def| (def.code, def)).collect())
}
