//! Shape normalization for backend output.
//!
//! Different models return the "same" report under different key
//! conventions (`dish_name` vs `dishName`, `weight_g` vs `weightGrams`),
//! with floats where integers were asked for, or with whole sub-objects
//! missing. `normalize_report` is a total function: whatever comes in, a
//! fully-populated canonical report comes out. Alias candidates are listed
//! explicitly per field and checked in priority order, so the coercion rules
//! stay auditable.

use serde_json::Value;

use crate::models::{
    Analysis, Carbohydrates, Fat, FoodItem, MacroNutrients, MicroNutrients, NutritionReport,
};

const DEFAULT_CONFIDENCE: u8 = 75;

/// Normalize an arbitrary parsed JSON value into a canonical report.
/// Never fails; missing or malformed fields get named defaults.
pub fn normalize_report(response: &Value) -> NutritionReport {
    let analysis = pick(response, &["analysis"]);

    NutritionReport {
        dish_name: string_or(pick(response, &["dish_name", "dishName"]), "Unknown Dish"),
        total_calories: int_or_zero(pick(
            response,
            &["total_calories", "totalCalories", "calories"],
        )),
        macro_nutrients: normalize_macros(pick(response, &["macroNutrients", "macro_nutrients"])),
        micro_nutrients: normalize_micros(pick(response, &["microNutrients", "micro_nutrients"])),
        items: array_items(pick(response, &["items"])),
        notes: string_list(pick(response, &["notes"])),
        analysis: Analysis {
            visual_observations: string_or(
                field(analysis, &["visualObservations", "visual_observations"]),
                "Visual analysis performed on food image",
            ),
            portion_estimate: string_or(
                field(analysis, &["portionEstimate", "portion_estimate"]),
                "Estimated based on visual analysis",
            ),
            confidence: confidence_or_default(field(analysis, &["confidence"])),
            confidence_narrative: string_or(
                field(analysis, &["confidenceNarrative", "confidence_narrative"]),
                "Analysis confidence based on image clarity",
            ),
            cautions: string_list(field(analysis, &["cautions"])),
        },
    }
}

/// Best-effort repair of JSON truncated mid-stream. Counts braces; when opens
/// exceed closes, strips one dangling trailing comma and appends the missing
/// closers. Balanced braces mean the parse failed for some other reason, so
/// no fix is offered.
pub fn repair_truncated_json(text: &str) -> Option<String> {
    let trimmed = text.trim();
    let opens = trimmed.matches('{').count();
    let closes = trimmed.matches('}').count();
    if opens <= closes {
        return None;
    }

    let mut fixed = trimmed.trim_end_matches(|c: char| c.is_whitespace() || c == ',').to_string();
    fixed.push_str(&"}".repeat(opens - closes));
    Some(fixed)
}

/// Zeroed placeholder carried by error-tagged outcomes.
pub fn failed_report() -> NutritionReport {
    NutritionReport {
        dish_name: "Analysis Failed".to_string(),
        total_calories: 0,
        macro_nutrients: empty_macros(),
        micro_nutrients: MicroNutrients {
            vitamins: "Not available".to_string(),
            minerals: "Not available".to_string(),
        },
        items: vec![],
        notes: vec![],
        analysis: Analysis {
            visual_observations: "Analysis failed".to_string(),
            portion_estimate: "Unable to estimate".to_string(),
            confidence: 0,
            confidence_narrative: "Analysis was not successful".to_string(),
            cautions: vec![],
        },
    }
}

fn normalize_macros(value: Option<&Value>) -> MacroNutrients {
    let carbs = field(value, &["carbohydrates", "carbs"]);
    let fat = field(value, &["fat", "fats"]);

    MacroNutrients {
        protein: int_or_zero(field(value, &["protein"])),
        carbohydrates: Carbohydrates {
            total: int_or_zero(field(carbs, &["total"])),
            fiber: int_or_zero(field(carbs, &["fiber"])),
            sugars: int_or_zero(field(carbs, &["sugars"])),
        },
        fat: Fat {
            total: int_or_zero(field(fat, &["total"])),
            saturated: int_or_zero(field(fat, &["saturated"])),
            unsaturated: int_or_zero(field(fat, &["unsaturated"])),
        },
    }
}

fn normalize_micros(value: Option<&Value>) -> MicroNutrients {
    MicroNutrients {
        vitamins: string_or(field(value, &["vitamins"]), "Not specified"),
        minerals: string_or(field(value, &["minerals"]), "Not specified"),
    }
}

fn normalize_item(value: &Value) -> FoodItem {
    FoodItem {
        name: string_or(pick(value, &["name"]), "Unknown Item"),
        calories: int_or_zero(pick(value, &["calories"])),
        weight_grams: int_or_zero(pick(value, &["weightGrams", "weight_g", "weight_grams"])),
        macronutrients: normalize_macros(pick(
            value,
            &["macronutrients", "macroNutrients", "macro_nutrients"],
        )),
    }
}

fn empty_macros() -> MacroNutrients {
    MacroNutrients {
        protein: 0,
        carbohydrates: Carbohydrates { total: 0, fiber: 0, sugars: 0 },
        fat: Fat { total: 0, saturated: 0, unsaturated: 0 },
    }
}

/// First present key from `candidates`, in priority order.
fn pick<'a>(value: &'a Value, candidates: &[&str]) -> Option<&'a Value> {
    let object = value.as_object()?;
    candidates.iter().find_map(|key| object.get(*key))
}

fn field<'a>(value: Option<&'a Value>, candidates: &[&str]) -> Option<&'a Value> {
    value.and_then(|v| pick(v, candidates))
}

/// Non-empty string as-is (trimmed); array of strings joined with ", ";
/// anything else falls back to the default.
fn string_or(value: Option<&Value>, default: &str) -> String {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Array(parts)) if !parts.is_empty() => {
            let joined: Vec<&str> = parts.iter().filter_map(|p| p.as_str()).collect();
            if joined.is_empty() {
                default.to_string()
            } else {
                joined.join(", ")
            }
        }
        _ => default.to_string(),
    }
}

/// Round to the nearest non-negative integer. Numeric strings are parsed;
/// everything else is 0.
fn int_or_zero(value: Option<&Value>) -> u32 {
    let number = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match number {
        Some(n) if n.is_finite() && n > 0.0 => n.round().min(f64::from(u32::MAX)) as u32,
        _ => 0,
    }
}

fn confidence_or_default(value: Option<&Value>) -> u8 {
    let number = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match number {
        Some(n) if n.is_finite() => n.round().clamp(0.0, 100.0) as u8,
        _ => DEFAULT_CONFIDENCE,
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(|entry| entry.as_str().map(str::to_string))
            .collect(),
        _ => vec![],
    }
}

fn array_items(value: Option<&Value>) -> Vec<FoodItem> {
    match value {
        Some(Value::Array(entries)) => entries.iter().map(normalize_item).collect(),
        _ => vec![],
    }
}
