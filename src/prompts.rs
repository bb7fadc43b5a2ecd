//! Prompt text and the response schema sent to the formatting backend.

use serde_json::{json, Value};

pub const SYSTEM_PROMPT: &str = "\
You are a certified clinical nutritionist with deep expertise in visual nutritional analysis and regional cuisine knowledge. Your mission is to analyze food images and provide accurate, scientifically-based nutritional calculations.

REQUIRED EXPERTISE:
- Deep knowledge of validated nutritional databases (USDA, CIQUAL, etc.)
- Expertise in visual food identification and portion estimation
- Understanding of cooking methods and their nutritional impact
- Knowledge of micronutrients, fiber, and bioactive compounds
- Expertise in allergens and dietary considerations

METHODOLOGY:
- Precisely identify each visible food and ingredient with regional context
- Estimate portions based on precise visual references and regional standards
- Calculate macronutrients and micronutrients based on composition and preparation
- Consider cooking method impact on nutritional density
- Assess confidence based on visual clarity, dish complexity, and cultural context

Provide ONLY valid JSON matching the schema.";

pub const FORMATTING_SYSTEM_PROMPT: &str = "\
You are a JSON formatting assistant. Format nutritional data into the exact \
schema provided. Ensure the JSON is complete and valid.";

/// First-stage prompt: free-form extraction of everything visible in the
/// image. Optional hints from the user are interpolated as extra context.
pub fn extraction_prompt(food_name: Option<&str>, measurement_cues: Option<&str>) -> String {
    let food_name_context = food_name
        .map(|name| {
            format!(
                "\n\nIMPORTANT CONTEXT: The user has indicated this dish may be called \"{}\". \
                 Please use this information to help identify regional or cultural variations, \
                 traditional preparation methods, and authentic ingredients.",
                name
            )
        })
        .unwrap_or_default();

    let cues_context = measurement_cues
        .map(|cues| {
            format!(
                "\n\nUSER-PROVIDED MEASUREMENT CUES:\n{}\n\n\
                 Use these cues as PRIMARY measurement anchors for portion estimation.",
                cues
            )
        })
        .unwrap_or_default();

    format!(
        "As an expert nutritionist, analyze this food image and extract ALL nutritional \
         information in a detailed, structured format.{}{}\n\n\
         Provide a comprehensive analysis including:\n\
         - Dish name and description\n\
         - All visible foods and ingredients\n\
         - Estimated portion sizes and weights\n\
         - Complete macronutrient breakdown (protein, carbs with fiber/sugars, fats with saturated/unsaturated)\n\
         - Micronutrients (vitamins and minerals as descriptive text)\n\
         - Visual observations\n\
         - Portion estimation methodology\n\
         - Confidence assessment\n\
         - Allergens and cautions\n\n\
         Format your response as detailed text or flexible JSON. Focus on completeness and accuracy.",
        food_name_context, cues_context
    )
}

/// Second-stage prompt: convert the extracted text into the strict schema.
pub fn formatting_prompt(extracted_info: &str) -> String {
    format!(
        "You are a nutritionist assistant. Format the following nutritional information \
         into the exact JSON schema required.\n\n\
         EXTRACTED INFORMATION:\n{}\n\n\
         REQUIREMENTS:\n\
         - ALL numeric values MUST be whole integers (no decimals)\n\
         - Follow the exact schema structure\n\
         - Ensure all required fields are present\n\
         - Break down each food component in items[] with individual calories\n\
         - Include professional nutritional insights in notes[]\n\
         - Provide detailed visual observations in analysis.visualObservations\n\
         - Explain portion estimation methodology in analysis.portionEstimate\n\
         - Detail confidence reasoning in analysis.confidenceNarrative\n\
         - List allergens and cautions in analysis.cautions\n\n\
         Return ONLY valid JSON matching the schema.",
        extracted_info
    )
}

/// JSON schema for the strict `response_format` of the formatting stage.
/// Mirrors the canonical `NutritionReport` shape.
pub fn response_schema() -> Value {
    let macronutrients = json!({
        "type": "object",
        "properties": {
            "protein": { "type": "integer" },
            "carbohydrates": {
                "type": "object",
                "properties": {
                    "total": { "type": "integer" },
                    "fiber": { "type": "integer" },
                    "sugars": { "type": "integer" }
                },
                "required": ["total", "fiber", "sugars"]
            },
            "fat": {
                "type": "object",
                "properties": {
                    "total": { "type": "integer" },
                    "saturated": { "type": "integer" },
                    "unsaturated": { "type": "integer" }
                },
                "required": ["total", "saturated", "unsaturated"]
            }
        },
        "required": ["protein", "carbohydrates", "fat"]
    });

    json!({
        "type": "object",
        "properties": {
            "dishName": {
                "type": "string",
                "description": "A concise, descriptive name for the dish shown in the image."
            },
            "totalCalories": {
                "type": "integer",
                "description": "The total estimated calories for the entire meal, as an integer."
            },
            "macroNutrients": macronutrients.clone(),
            "microNutrients": {
                "type": "object",
                "properties": {
                    "vitamins": { "type": "string", "description": "A summary of key vitamins present in the meal." },
                    "minerals": { "type": "string", "description": "A summary of key minerals present in the meal." }
                },
                "required": ["vitamins", "minerals"]
            },
            "items": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string", "description": "Name of the individual food item." },
                        "calories": { "type": "integer", "description": "Estimated calories for this item." },
                        "weightGrams": { "type": "integer", "description": "Estimated weight in grams for this item." },
                        "macronutrients": macronutrients
                    },
                    "required": ["name", "calories", "weightGrams", "macronutrients"]
                }
            },
            "notes": {
                "type": "array",
                "items": { "type": "string" },
                "description": "An array of professional nutritional insights, tips, or comments about the meal."
            },
            "analysis": {
                "type": "object",
                "properties": {
                    "visualObservations": { "type": "string", "description": "Detailed visual observations about the food's appearance, cooking method, etc." },
                    "portionEstimate": { "type": "string", "description": "Explanation of the methodology used for portion size estimation." },
                    "confidence": { "type": "integer", "description": "Confidence score (0-100) in the accuracy of the analysis." },
                    "confidenceNarrative": { "type": "string", "description": "A narrative explaining the reasoning behind the confidence score." },
                    "cautions": { "type": "array", "items": { "type": "string" }, "description": "A list of potential allergens or dietary cautions." }
                },
                "required": ["visualObservations", "portionEstimate", "confidence", "confidenceNarrative", "cautions"]
            }
        },
        "required": ["dishName", "totalCalories", "macroNutrients", "microNutrients", "items", "notes", "analysis"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_prompt_includes_hints() {
        let prompt = extraction_prompt(Some("Menemen"), Some("fork for scale"));
        assert!(prompt.contains("\"Menemen\""));
        assert!(prompt.contains("fork for scale"));
    }

    #[test]
    fn test_extraction_prompt_without_hints() {
        let prompt = extraction_prompt(None, None);
        assert!(!prompt.contains("IMPORTANT CONTEXT"));
        assert!(!prompt.contains("MEASUREMENT CUES"));
    }

    #[test]
    fn test_response_schema_requires_all_top_level_fields() {
        let schema = response_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        for field in [
            "dishName",
            "totalCalories",
            "macroNutrients",
            "microNutrients",
            "items",
            "notes",
            "analysis",
        ] {
            assert!(required.contains(&field), "missing {}", field);
        }
    }
}
