//! The estimate service: one request in, one structured response out.
//!
//! `Estimator::estimate` runs the inference transform against the currently
//! published snapshot, normalizing with the lookup tables recorded in that
//! snapshot. Every failure is typed (`EstimateError`) and turns
//! into a `success: false` response; nothing here panics or exits.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::{Column, CostCategory, SpeedCategory, Tier};
use crate::error::EstimateError;
use crate::features::price_range;
use crate::preprocess::preprocess_input;
use crate::snapshot::SnapshotStore;
use crate::tree::Classifier;

/// An estimate request as received from a caller.
///
/// Fields are optional at the wire level so absence can be reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimateRequest {
    pub brand: Option<String>,
    #[serde(rename = "type")]
    pub model_type: Option<String>,
    pub damage: Option<String>,
}

impl EstimateRequest {
    pub fn new(brand: &str, model_type: &str, damage: &str) -> Self {
        Self {
            brand: Some(brand.to_string()),
            model_type: Some(model_type.to_string()),
            damage: Some(damage.to_string()),
        }
    }

    /// Fail with `MissingInput` naming every absent or blank field.
    pub fn check_required(&self) -> Result<(), EstimateError> {
        required_fields(self).map(|_| ())
    }
}

/// A successful estimate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Estimate {
    pub cost_category: CostCategory,
    pub price_range: String,
    pub brand: String,
    /// The caller's original model text.
    pub model_type: String,
    pub tier: Tier,
    pub damage: String,
    pub speed: SpeedCategory,
    pub duration: String,
    pub run_id: String,
}

/// The response document, for both outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EstimateResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_cost_category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub model_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub damage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl EstimateResponse {
    pub fn from_result(result: &Result<Estimate, EstimateError>) -> Self {
        match result {
            Ok(e) => Self::success(e),
            Err(err) => Self::failure(err),
        }
    }

    pub fn success(e: &Estimate) -> Self {
        Self {
            success: true,
            estimated_cost_category: Some(e.price_range.clone()),
            cost_category: Some(e.cost_category.label().to_string()),
            brand: Some(e.brand.clone()),
            model_type: Some(e.model_type.clone()),
            tier: Some(e.tier.label().to_string()),
            damage: Some(e.damage.clone()),
            estimated_time: Some(e.speed.label().to_string()),
            estimated_duration: Some(e.duration.clone()),
            message: None,
            field: None,
        }
    }

    pub fn failure(err: &EstimateError) -> Self {
        Self {
            success: false,
            estimated_cost_category: None,
            cost_category: None,
            brand: None,
            model_type: None,
            tier: None,
            damage: None,
            estimated_time: None,
            estimated_duration: None,
            message: Some(err.to_string()),
            field: err.field().map(str::to_string),
        }
    }
}

/// Scores requests against whatever snapshot `store` currently holds.
pub struct Estimator {
    store: Arc<SnapshotStore>,
}

impl Estimator {
    pub fn new(store: Arc<SnapshotStore>) -> Self {
        Self { store }
    }

    pub fn estimate(&self, request: &EstimateRequest) -> Result<Estimate, EstimateError> {
        let result = self.try_estimate(request);
        if let Err(err) = &result {
            tracing::warn!(field = err.field(), "estimate rejected: {err}");
        }
        result
    }

    fn try_estimate(&self, request: &EstimateRequest) -> Result<Estimate, EstimateError> {
        let (brand, model_type, damage) = required_fields(request)?;
        let snapshot = self.store.current()?;

        let input = preprocess_input(&snapshot.tables, brand, model_type, damage);
        tracing::debug!(
            brand = %input.brand,
            tier = input.tier.label(),
            damage = %input.damage,
            "normalized request"
        );

        let encoders = &snapshot.encoders;
        let row = encoders.encode_features(&input.brand, input.tier.label(), &input.damage)?;
        let code = snapshot.model.predict(&row);
        let label = encoders.decode(Column::CostCategory, code)?;
        let cost_category = CostCategory::from_label(label)
            .ok_or_else(|| EstimateError::Artifact(format!("unrecognized cost category label '{label}'")))?;

        Ok(Estimate {
            cost_category,
            price_range: price_range(cost_category, &snapshot.breakpoints),
            brand: input.brand,
            model_type: model_type.to_string(),
            tier: input.tier,
            damage: input.damage,
            speed: input.speed,
            duration: input.duration,
            run_id: snapshot.run_id.clone(),
        })
    }
}

fn required_fields(request: &EstimateRequest) -> Result<(&str, &str, &str), EstimateError> {
    let brand = present(&request.brand);
    let model_type = present(&request.model_type);
    let damage = present(&request.damage);

    match (brand, model_type, damage) {
        (Some(b), Some(t), Some(d)) => Ok((b, t, d)),
        _ => {
            let fields = [("brand", brand), ("type", model_type), ("damage", damage)]
                .into_iter()
                .filter(|(_, v)| v.is_none())
                .map(|(name, _)| name)
                .collect();
            Err(EstimateError::MissingInput { fields })
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}
